//! Durable key-value slot contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide `get/set/remove` over opaque string slots.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `set` is an upsert; the last writer wins.
//! - `remove` of an absent key is not an error.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type KvResult<T> = Result<T, KvError>;

/// Slot access failures.
#[derive(Debug)]
pub enum KvError {
    Db(DbError),
    Encode { key: String, source: serde_json::Error },
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode { key, source } => write!(f, "failed to encode slot `{key}`: {source}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable string slots keyed by name.
pub trait KvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    fn remove(&self, key: &str) -> KvResult<()>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        (**self).remove(key)
    }
}

/// SQLite-backed slot store over the `kv_slots` table.
pub struct SqliteKvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvStore<'conn> {
    /// Wraps a connection returned by [`crate::db::open_db`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KvStore for SqliteKvStore<'_> {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.conn
            .execute("DELETE FROM kv_slots WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Outcome of reading a JSON slot.
#[derive(Debug, PartialEq, Eq)]
pub enum SlotRead<T> {
    Absent,
    Malformed(String),
    Present(T),
}

impl<T> SlotRead<T> {
    /// Collapses absent and malformed slots into `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent | Self::Malformed(_) => None,
        }
    }
}

/// Reads and decodes a JSON slot without failing on bad content.
pub fn read_json<T, S>(store: &S, key: &str) -> KvResult<SlotRead<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(SlotRead::Absent);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(SlotRead::Present(value)),
        Err(err) => Ok(SlotRead::Malformed(err.to_string())),
    }
}

/// Encodes `value` as JSON and writes it to `key`.
pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> KvResult<()>
where
    T: Serialize + ?Sized,
    S: KvStore + ?Sized,
{
    let encoded = serde_json::to_string(value).map_err(|source| KvError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &encoded)
}
