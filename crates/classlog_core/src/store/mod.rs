//! Durable load/save of the full history envelope.
//!
//! # Responsibility
//! - Define the [`Store`] gateway used by the history manager.
//! - Provide JSON-file, SQLite and in-memory implementations.
//!
//! # Invariants
//! - `save` always writes a complete envelope; there are no partial updates.
//! - A save whose sequence number is not greater than the last accepted one
//!   is rejected with [`StoreError::StaleSave`].
//! - `load` returns `Ok(None)` for a store that does not exist yet and
//!   `Err(StoreError::Corrupt)` for one that cannot be parsed.

mod envelope;
mod json_file;
mod memory;
mod sqlite;

pub use envelope::{EnvelopeSettings, HistoryEnvelope, DATA_VERSION};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Db(DbError),
    /// Envelope could not be encoded for writing.
    Encode(serde_json::Error),
    /// Stored content exists but is not a readable envelope.
    Corrupt(String),
    StaleSave { seq: u64, last_accepted: u64 },
    /// Injected failure from [`MemoryStore`].
    Unavailable(String),
}

impl StoreError {
    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "store_io",
            Self::Db(DbError::UnsupportedSchemaVersion { .. }) => "store_schema_too_new",
            Self::Db(_) => "store_db",
            Self::Encode(_) => "store_encode",
            Self::Corrupt(_) => "store_corrupt",
            Self::StaleSave { .. } => "store_stale_save",
            Self::Unavailable(_) => "store_unavailable",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "store I/O failed: {err}"),
            Self::Db(err) => write!(f, "snapshot database failed: {err}"),
            Self::Encode(err) => write!(f, "failed to encode envelope: {err}"),
            Self::Corrupt(message) => write!(f, "store content is corrupt: {message}"),
            Self::StaleSave { seq, last_accepted } => write!(
                f,
                "stale save rejected: seq {seq} is not newer than {last_accepted}"
            ),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Corrupt(_) | Self::StaleSave { .. } | Self::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence gateway consumed by the history manager.
pub trait Store {
    /// Short backend name for log lines (`json`, `sqlite`, `memory`).
    fn backend(&self) -> &'static str;

    /// Writes the full envelope under sequence number `seq`.
    fn save(&mut self, seq: u64, envelope: &HistoryEnvelope) -> StoreResult<()>;

    /// Reads the most recent envelope, `None` when nothing was saved yet.
    fn load(&mut self) -> StoreResult<Option<HistoryEnvelope>>;

    /// Highest sequence number accepted so far, if known.
    fn last_seq(&self) -> Option<u64>;
}

/// Shared stale-save guard for store implementations.
pub(crate) fn check_seq(last: Option<u64>, seq: u64) -> StoreResult<()> {
    match last {
        Some(last_accepted) if seq <= last_accepted => Err(StoreError::StaleSave {
            seq,
            last_accepted,
        }),
        _ => Ok(()),
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn save(&mut self, seq: u64, envelope: &HistoryEnvelope) -> StoreResult<()> {
        (**self).save(seq, envelope)
    }

    fn load(&mut self) -> StoreResult<Option<HistoryEnvelope>> {
        (**self).load()
    }

    fn last_seq(&self) -> Option<u64> {
        (**self).last_seq()
    }
}
