//! SQLite snapshot store.
//!
//! Each save inserts a full envelope row; only the newest `max_snapshots`
//! rows are kept.

use crate::db::{open_db, open_db_in_memory};
use crate::model::timestamp::format_timestamp;
use crate::store::{check_seq, HistoryEnvelope, Store, StoreError, StoreResult};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Instant;

pub struct SqliteStore {
    conn: Connection,
    max_snapshots: u32,
    last_seq: Option<u64>,
}

impl SqliteStore {
    /// Opens (creating and migrating if needed) the snapshot database.
    pub fn open(path: impl AsRef<Path>, max_snapshots: u32) -> StoreResult<Self> {
        Self::with_connection(open_db(path)?, max_snapshots)
    }

    pub fn open_in_memory(max_snapshots: u32) -> StoreResult<Self> {
        Self::with_connection(open_db_in_memory()?, max_snapshots)
    }

    fn with_connection(conn: Connection, max_snapshots: u32) -> StoreResult<Self> {
        let last_seq: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM snapshots;", [], |row| row.get(0))?;
        Ok(Self {
            conn,
            max_snapshots: max_snapshots.max(1),
            last_seq: last_seq.map(|seq| seq as u64),
        })
    }

    /// Number of snapshot rows currently retained.
    pub fn snapshot_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots;", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn insert_and_trim(
        &mut self,
        seq: u64,
        envelope: &HistoryEnvelope,
        body: &str,
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (seq, saved_at, data_version, body) VALUES (?1, ?2, ?3, ?4);",
            params![
                seq as i64,
                format_timestamp(&Utc::now()),
                envelope.data_version,
                body
            ],
        )?;
        tx.execute(
            "DELETE FROM snapshots WHERE seq NOT IN (
                SELECT seq FROM snapshots ORDER BY seq DESC LIMIT ?1
            );",
            params![self.max_snapshots],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn save(&mut self, seq: u64, envelope: &HistoryEnvelope) -> StoreResult<()> {
        check_seq(self.last_seq, seq)?;
        let started_at = Instant::now();
        let body = serde_json::to_string(envelope).map_err(StoreError::Encode)?;
        match self.insert_and_trim(seq, envelope, &body) {
            Ok(()) => {
                self.last_seq = Some(seq);
                info!(
                    "event=store_save module=store status=ok backend=sqlite seq={seq} bytes={} duration_ms={}",
                    body.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_save module=store status=error backend=sqlite seq={seq} error_code={} error={}",
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    fn load(&mut self) -> StoreResult<Option<HistoryEnvelope>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM snapshots ORDER BY seq DESC LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            None => Ok(None),
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|err| StoreError::Corrupt(err.to_string())),
        }
    }

    fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::store::{HistoryEnvelope, Store, StoreError};

    #[test]
    fn keeps_only_newest_snapshots() {
        let mut store = SqliteStore::open_in_memory(3).unwrap();
        for seq in 1..=5 {
            let mut envelope = HistoryEnvelope::default();
            envelope.settings.counters.next_student_id = seq;
            store.save(seq, &envelope).unwrap();
        }
        assert_eq!(store.snapshot_count().unwrap(), 3);
        let latest = store.load().unwrap().expect("latest snapshot");
        assert_eq!(latest.settings.counters.next_student_id, 5);
    }

    #[test]
    fn reopened_file_remembers_last_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.sqlite3");
        {
            let mut store = SqliteStore::open(&path, 10).unwrap();
            store.save(7, &HistoryEnvelope::default()).unwrap();
        }
        let mut store = SqliteStore::open(&path, 10).unwrap();
        assert_eq!(store.last_seq(), Some(7));
        let err = store.save(6, &HistoryEnvelope::default()).unwrap_err();
        assert!(matches!(err, StoreError::StaleSave { seq: 6, last_accepted: 7 }));
    }

    #[test]
    fn empty_database_loads_as_none() {
        let mut store = SqliteStore::open_in_memory(5).unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
