pub mod credential;
pub mod dump;
pub mod export;
pub mod io;
pub mod leak;
pub mod notify;
pub mod parser;
pub mod report;
pub mod schema;
pub mod stats;
pub mod store;
pub mod table;

pub mod prelude {
    pub use crate::credential::{Credentials, Password, User};
    pub use crate::leak::{BadActor, DateInSeconds, Import, Leak, Platform};
    pub use crate::parser::DumpParser;
    pub use crate::store::Store;
    pub use crate::table::AutoGenKey;
}
