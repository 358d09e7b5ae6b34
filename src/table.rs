//! Table and record descriptors used to generate SQL for the fixed schema.
//!
//! Each persisted type implements [`Record`], naming its table, its columns in
//! declaration order and how to turn an instance into positional values.
//! Primary records own an auto-generated key in their first column and also
//! implement [`PrimaryRecord`]; foreign (hash and association) records only
//! reference keys owned elsewhere.
use std::fmt;

use rusqlite::types::Value;

const INSERT_OR_IGNORE_SQL: &str = "INSERT OR IGNORE INTO";
const INSERT_SQL: &str = "INSERT INTO";
const PLACEHOLDER: &str = "?";
const FIELD_SEPARATOR: &str = ", ";

/// Database generated row key. Zero means the record has not been resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AutoGenKey(pub i64);

impl AutoGenKey {
    pub const UNASSIGNED: Self = Self(0);

    pub fn is_unassigned(self) -> bool {
        self == Self::UNASSIGNED
    }
}

impl fmt::Display for AutoGenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AutoGenKey> for Value {
    fn from(key: AutoGenKey) -> Self {
        Value::Integer(key.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Owns an auto-generated key and is deduplicated by natural key.
    Primary,
    /// References keys owned by primary tables.
    Foreign,
}

pub trait Record {
    const NAME: &'static str;
    /// Lower-case column names in declaration order.
    const COLUMNS: &'static [&'static str];
    const KIND: TableKind;

    /// Column values, in the same order as [`Record::COLUMNS`].
    fn values(&self) -> Vec<Value>;
}

pub trait PrimaryRecord: Record + Sized {
    fn key(&self) -> AutoGenKey;

    /// Same record with its key replaced.
    fn copy_with_key(&self, key: AutoGenKey) -> Self;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    records: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R> FromIterator<R> for Table<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<R: Record> Table<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New table of the same type holding `records`.
    pub fn with_records(&self, records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn name(&self) -> &'static str {
        R::NAME
    }

    pub fn columns(&self) -> &'static [&'static str] {
        R::COLUMNS
    }

    pub fn is_primary(&self) -> bool {
        R::KIND == TableKind::Primary
    }

    /// Columns written on insert. The key column of a primary table is left
    /// for the database to generate.
    pub fn insert_columns(&self) -> &'static [&'static str] {
        match R::KIND {
            TableKind::Primary => &R::COLUMNS[1..],
            TableKind::Foreign => R::COLUMNS,
        }
    }

    pub fn insert_values(&self, record: &R) -> Vec<Value> {
        let mut values = record.values();
        if self.is_primary() {
            values.remove(0);
        }
        values
    }

    /// Primary tables silently skip rows whose natural key already exists.
    pub fn insert_statement(&self) -> String {
        let verb = match R::KIND {
            TableKind::Primary => INSERT_OR_IGNORE_SQL,
            TableKind::Foreign => INSERT_SQL,
        };
        let columns = self.insert_columns();
        format!(
            "{} {} ({}) VALUES ({})",
            verb,
            R::NAME,
            columns.join(FIELD_SEPARATOR),
            placeholders(columns.len())
        )
    }
}

impl<R: PrimaryRecord> Table<R> {
    pub fn key_column(&self) -> &'static str {
        R::COLUMNS[0]
    }

    /// Looks up the key of the row sharing a record's natural key.
    pub fn find_statement(&self) -> String {
        let columns = self.insert_columns();
        format!(
            "SELECT {} FROM {} WHERE ({}) = ({}) LIMIT 1",
            self.key_column(),
            R::NAME,
            columns.join(FIELD_SEPARATOR),
            placeholders(columns.len())
        )
    }
}

fn placeholders(n: usize) -> String {
    vec![PLACEHOLDER; n].join(FIELD_SEPARATOR)
}
