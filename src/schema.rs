//! The fixed relational layout: [`Record`] descriptors for every persisted
//! type, the derived hash and association rows, and the DDL that creates them.
use rusqlite::types::Value;

use crate::credential::{Credentials, HashDigest, User};
use crate::leak::{BadActor, Leak, Platform};
use crate::table::{AutoGenKey, PrimaryRecord, Record, TableKind};

/// Idempotent schema bootstrap. Primary tables carry a UNIQUE constraint on
/// their natural key so `INSERT OR IGNORE` skips known rows. Hash and
/// association tables have no uniqueness constraint.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS User (
    userid INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS Credentials (
    credid INTEGER PRIMARY KEY AUTOINCREMENT,
    password TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS BadActor (
    baid INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS Platform (
    platid INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS Leak (
    leakid INTEGER PRIMARY KEY AUTOINCREMENT,
    sharedatesc INTEGER NOT NULL,
    context TEXT NOT NULL,
    UNIQUE (sharedatesc, context)
);
CREATE TABLE IF NOT EXISTS HashUser (
    userid INTEGER NOT NULL REFERENCES User (userid),
    hsha256 TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS HashCredentials (
    credid INTEGER NOT NULL REFERENCES Credentials (credid),
    hsha256 TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS LeakUser (
    userid INTEGER NOT NULL REFERENCES User (userid),
    leakid INTEGER NOT NULL REFERENCES Leak (leakid)
);
CREATE TABLE IF NOT EXISTS LeakCredentials (
    credid INTEGER NOT NULL REFERENCES Credentials (credid),
    leakid INTEGER NOT NULL REFERENCES Leak (leakid)
);
CREATE TABLE IF NOT EXISTS LeakBadActor (
    baid INTEGER NOT NULL REFERENCES BadActor (baid),
    leakid INTEGER NOT NULL REFERENCES Leak (leakid)
);
CREATE TABLE IF NOT EXISTS LeakPlatform (
    platid INTEGER NOT NULL REFERENCES Platform (platid),
    leakid INTEGER NOT NULL REFERENCES Leak (leakid)
);
CREATE TABLE IF NOT EXISTS UserCredentials (
    credid INTEGER NOT NULL REFERENCES Credentials (credid),
    userid INTEGER NOT NULL REFERENCES User (userid)
);
CREATE INDEX IF NOT EXISTS HashUser_hsha256 ON HashUser (hsha256);
CREATE INDEX IF NOT EXISTS HashCredentials_hsha256 ON HashCredentials (hsha256);
"#;

impl Record for User {
    const NAME: &'static str = "User";
    const COLUMNS: &'static [&'static str] = &["userid", "email"];
    const KIND: TableKind = TableKind::Primary;

    fn values(&self) -> Vec<Value> {
        vec![self.user_id.into(), Value::Text(self.email.clone())]
    }
}

impl PrimaryRecord for User {
    fn key(&self) -> AutoGenKey {
        self.user_id
    }

    fn copy_with_key(&self, key: AutoGenKey) -> Self {
        Self {
            user_id: key,
            email: self.email.clone(),
        }
    }
}

impl Record for Credentials {
    const NAME: &'static str = "Credentials";
    const COLUMNS: &'static [&'static str] = &["credid", "password"];
    const KIND: TableKind = TableKind::Primary;

    fn values(&self) -> Vec<Value> {
        vec![
            self.cred_id.into(),
            Value::Text(self.password.as_str().to_string()),
        ]
    }
}

impl PrimaryRecord for Credentials {
    fn key(&self) -> AutoGenKey {
        self.cred_id
    }

    fn copy_with_key(&self, key: AutoGenKey) -> Self {
        Self {
            cred_id: key,
            password: self.password.clone(),
        }
    }
}

impl Record for BadActor {
    const NAME: &'static str = "BadActor";
    const COLUMNS: &'static [&'static str] = &["baid", "identifier"];
    const KIND: TableKind = TableKind::Primary;

    fn values(&self) -> Vec<Value> {
        vec![self.ba_id.into(), Value::Text(self.identifier.clone())]
    }
}

impl PrimaryRecord for BadActor {
    fn key(&self) -> AutoGenKey {
        self.ba_id
    }

    fn copy_with_key(&self, key: AutoGenKey) -> Self {
        Self {
            ba_id: key,
            identifier: self.identifier.clone(),
        }
    }
}

impl Record for Platform {
    const NAME: &'static str = "Platform";
    const COLUMNS: &'static [&'static str] = &["platid", "name"];
    const KIND: TableKind = TableKind::Primary;

    fn values(&self) -> Vec<Value> {
        vec![self.plat_id.into(), Value::Text(self.name.clone())]
    }
}

impl PrimaryRecord for Platform {
    fn key(&self) -> AutoGenKey {
        self.plat_id
    }

    fn copy_with_key(&self, key: AutoGenKey) -> Self {
        Self {
            plat_id: key,
            name: self.name.clone(),
        }
    }
}

impl Record for Leak {
    const NAME: &'static str = "Leak";
    const COLUMNS: &'static [&'static str] = &["leakid", "sharedatesc", "context"];
    const KIND: TableKind = TableKind::Primary;

    fn values(&self) -> Vec<Value> {
        vec![
            self.leak_id.into(),
            Value::Integer(self.share_date.0),
            Value::Text(self.context.clone()),
        ]
    }
}

impl PrimaryRecord for Leak {
    fn key(&self) -> AutoGenKey {
        self.leak_id
    }

    fn copy_with_key(&self, key: AutoGenKey) -> Self {
        Self {
            leak_id: key,
            share_date: self.share_date,
            context: self.context.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashUser {
    pub user_id: AutoGenKey,
    pub hsha256: HashDigest,
}

impl HashUser {
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            hsha256: HashDigest::of(&user.email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCredentials {
    pub cred_id: AutoGenKey,
    pub hsha256: HashDigest,
}

impl HashCredentials {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            cred_id: credentials.cred_id,
            hsha256: HashDigest::of(credentials.password.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakUser {
    pub user_id: AutoGenKey,
    pub leak_id: AutoGenKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakCredentials {
    pub cred_id: AutoGenKey,
    pub leak_id: AutoGenKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakBadActor {
    pub ba_id: AutoGenKey,
    pub leak_id: AutoGenKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakPlatform {
    pub plat_id: AutoGenKey,
    pub leak_id: AutoGenKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub cred_id: AutoGenKey,
    pub user_id: AutoGenKey,
}

impl Record for HashUser {
    const NAME: &'static str = "HashUser";
    const COLUMNS: &'static [&'static str] = &["userid", "hsha256"];
    const KIND: TableKind = TableKind::Foreign;

    fn values(&self) -> Vec<Value> {
        vec![
            self.user_id.into(),
            Value::Text(self.hsha256.as_str().to_string()),
        ]
    }
}

impl Record for HashCredentials {
    const NAME: &'static str = "HashCredentials";
    const COLUMNS: &'static [&'static str] = &["credid", "hsha256"];
    const KIND: TableKind = TableKind::Foreign;

    fn values(&self) -> Vec<Value> {
        vec![
            self.cred_id.into(),
            Value::Text(self.hsha256.as_str().to_string()),
        ]
    }
}

/// Association rows are a pair of foreign keys in declaration order.
macro_rules! association_record {
    ($ty:ident, $name:literal, [$a:ident => $col_a:literal, $b:ident => $col_b:literal]) => {
        impl Record for $ty {
            const NAME: &'static str = $name;
            const COLUMNS: &'static [&'static str] = &[$col_a, $col_b];
            const KIND: TableKind = TableKind::Foreign;

            fn values(&self) -> Vec<Value> {
                vec![self.$a.into(), self.$b.into()]
            }
        }
    };
}

association_record!(LeakUser, "LeakUser", [user_id => "userid", leak_id => "leakid"]);
association_record!(LeakCredentials, "LeakCredentials", [cred_id => "credid", leak_id => "leakid"]);
association_record!(LeakBadActor, "LeakBadActor", [ba_id => "baid", leak_id => "leakid"]);
association_record!(LeakPlatform, "LeakPlatform", [plat_id => "platid", leak_id => "leakid"]);
association_record!(UserCredentials, "UserCredentials", [cred_id => "credid", user_id => "userid"]);
