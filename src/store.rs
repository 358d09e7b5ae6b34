//! Persistence engine: normalizes an [`Import`] into the SQLite schema inside
//! one transaction.
//!
//! Primary tables go through insert-then-resolve: every record is inserted
//! with `INSERT OR IGNORE`, and the key of any row that already existed is
//! looked up by natural key. Hash and association rows are derived from the
//! resolved keys afterwards and inserted as-is. Nothing is visible to other
//! connections unless every step succeeds.
use std::path::Path;

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Transaction, params_from_iter};

use crate::credential::{Credentials, User};
use crate::leak::{Import, Leak};
use crate::schema::{
    HashCredentials, HashUser, LeakBadActor, LeakCredentials, LeakPlatform, LeakUser,
    SCHEMA_SQL, UserCredentials,
};
use crate::table::{AutoGenKey, PrimaryRecord, Record, Table};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("could not open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("could not initialise schema: {0}")]
    Schema(#[source] rusqlite::Error),
    #[error("could not begin transaction: {0}")]
    Begin(#[source] rusqlite::Error),
    #[error("could not prepare statement for {table}: {source}")]
    Prepare {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("insert into {table} failed: {source}")]
    Exec {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("key lookup in {table} failed: {source}")]
    Find {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("{table} row was ignored on insert but could not be found by natural key")]
    Unresolved { table: &'static str },
    #[error("could not commit transaction: {0}")]
    Commit(#[source] rusqlite::Error),
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path` and make sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(&path).map_err(|source| PersistenceError::Open {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(|source| PersistenceError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(PersistenceError::Schema)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(PersistenceError::Schema)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Write the whole import atomically and return the key of its leak.
    pub fn insert(&mut self, import: &Import) -> Result<AutoGenKey, PersistenceError> {
        let tx = self.conn.transaction().map_err(PersistenceError::Begin)?;

        let (users, credentials): (Vec<User>, Vec<Credentials>) = import
            .affected_users
            .iter()
            .map(|(u, c)| (u.clone(), c.clone()))
            .unzip();

        let users = resolve(&tx, Table::new(users))?;
        let credentials = resolve(&tx, Table::new(credentials))?;
        let bad_actors = resolve(&tx, Table::new(import.leakers.clone()))?;
        let leaks = resolve(&tx, Table::new(vec![import.leak.clone()]))?;
        let platforms = resolve(&tx, Table::new(import.affected_platforms.clone()))?;

        let leak_id = leaks
            .records()
            .first()
            .map(|leak| leak.leak_id)
            .ok_or(PersistenceError::Unresolved { table: Leak::NAME })?;

        let hash_users: Table<HashUser> = users.records().iter().map(HashUser::new).collect();
        let hash_credentials: Table<HashCredentials> = credentials
            .records()
            .iter()
            .map(HashCredentials::new)
            .collect();
        let leak_users: Table<LeakUser> = users
            .records()
            .iter()
            .map(|u| LeakUser {
                user_id: u.user_id,
                leak_id,
            })
            .collect();
        let leak_credentials: Table<LeakCredentials> = credentials
            .records()
            .iter()
            .map(|c| LeakCredentials {
                cred_id: c.cred_id,
                leak_id,
            })
            .collect();
        let leak_bad_actors: Table<LeakBadActor> = bad_actors
            .records()
            .iter()
            .map(|ba| LeakBadActor {
                ba_id: ba.ba_id,
                leak_id,
            })
            .collect();
        let leak_platforms: Table<LeakPlatform> = platforms
            .records()
            .iter()
            .map(|p| LeakPlatform {
                plat_id: p.plat_id,
                leak_id,
            })
            .collect();
        // users and credentials were unzipped from the same map entries
        let user_credentials: Table<UserCredentials> = users
            .records()
            .iter()
            .zip(credentials.records())
            .map(|(u, c)| UserCredentials {
                cred_id: c.cred_id,
                user_id: u.user_id,
            })
            .collect();

        insert_all(&tx, &hash_users)?;
        insert_all(&tx, &hash_credentials)?;
        insert_all(&tx, &leak_users)?;
        insert_all(&tx, &leak_credentials)?;
        insert_all(&tx, &leak_bad_actors)?;
        insert_all(&tx, &leak_platforms)?;
        insert_all(&tx, &user_credentials)?;

        tx.commit().map_err(PersistenceError::Commit)?;
        info!(
            "committed leak {} with {} users, {} platforms, {} leakers",
            leak_id,
            users.len(),
            platforms.len(),
            bad_actors.len()
        );
        Ok(leak_id)
    }
}

/// Give every record of a primary table a key, inserting the ones the
/// database does not know yet.
fn resolve<R: PrimaryRecord>(
    tx: &Transaction<'_>,
    table: Table<R>,
) -> Result<Table<R>, PersistenceError> {
    if table.is_empty() {
        return Ok(table);
    }
    let name = table.name();
    let mut insert = tx
        .prepare_cached(&table.insert_statement())
        .map_err(|source| PersistenceError::Prepare { table: name, source })?;
    let mut find = tx
        .prepare_cached(&table.find_statement())
        .map_err(|source| PersistenceError::Prepare { table: name, source })?;

    let mut resolved = Vec::with_capacity(table.len());
    let (mut inserted, mut existing) = (0usize, 0usize);
    for record in table.records() {
        let key = record.key();
        if !key.is_unassigned() {
            resolved.push(record.copy_with_key(key));
            continue;
        }
        let values = table.insert_values(record);
        let changed = insert
            .execute(params_from_iter(values.iter()))
            .map_err(|source| PersistenceError::Exec { table: name, source })?;
        let key = if changed > 0 {
            inserted += 1;
            AutoGenKey(tx.last_insert_rowid())
        } else {
            existing += 1;
            find.query_row(params_from_iter(values.iter()), |row| row.get::<_, i64>(0))
                .optional()
                .map_err(|source| PersistenceError::Find { table: name, source })?
                .map(AutoGenKey)
                .ok_or(PersistenceError::Unresolved { table: name })?
        };
        resolved.push(record.copy_with_key(key));
    }
    debug!("{name}: {inserted} inserted, {existing} already present");
    Ok(table.with_records(resolved))
}

fn insert_all<R: Record>(tx: &Transaction<'_>, table: &Table<R>) -> Result<(), PersistenceError> {
    if table.is_empty() {
        return Ok(());
    }
    let name = table.name();
    let mut stmt = tx
        .prepare_cached(&table.insert_statement())
        .map_err(|source| PersistenceError::Prepare { table: name, source })?;
    for record in table.records() {
        stmt.execute(params_from_iter(table.insert_values(record)))
            .map_err(|source| PersistenceError::Exec { table: name, source })?;
    }
    debug!("{name}: {} rows", table.len());
    Ok(())
}
