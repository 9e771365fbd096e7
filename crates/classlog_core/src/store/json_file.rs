//! Single-file JSON store with atomic replace.
//!
//! # Invariants
//! - Writes go to a sibling temp file that is renamed over the target, so a
//!   crash never leaves a half-written envelope behind.

use crate::store::{check_seq, HistoryEnvelope, Store, StoreError, StoreResult};
use log::{error, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct JsonFileStore {
    path: PathBuf,
    last_seq: Option<u64>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seq: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "classlog.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomic(&self, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    fn save(&mut self, seq: u64, envelope: &HistoryEnvelope) -> StoreResult<()> {
        check_seq(self.last_seq, seq)?;
        let started_at = Instant::now();
        let bytes = serde_json::to_vec_pretty(envelope).map_err(StoreError::Encode)?;
        match self.write_atomic(&bytes) {
            Ok(()) => {
                self.last_seq = Some(seq);
                info!(
                    "event=store_save module=store status=ok backend=json seq={seq} bytes={} duration_ms={}",
                    bytes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_save module=store status=error backend=json seq={seq} error_code={} error={}",
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    fn load(&mut self) -> StoreResult<Option<HistoryEnvelope>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }
}

#[cfg(test)]
mod tests {
    use super::JsonFileStore;
    use crate::store::{HistoryEnvelope, Store, StoreError};
    use std::fs;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_and_no_temp_file_left() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("classroom.json");
        let mut store = JsonFileStore::new(&path);

        let mut envelope = HistoryEnvelope::default();
        envelope.settings.counters.next_furniture_id = 3;
        store.save(1, &envelope).unwrap();

        assert!(path.exists());
        assert!(!path.with_file_name("classroom.json.tmp").exists());
        let loaded = store.load().unwrap().expect("saved envelope");
        assert_eq!(loaded, envelope);
    }

    #[test]
    fn stale_sequence_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("c.json"));
        store.save(5, &HistoryEnvelope::default()).unwrap();
        let err = store.save(5, &HistoryEnvelope::default()).unwrap_err();
        assert!(matches!(err, StoreError::StaleSave { seq: 5, last_accepted: 5 }));
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
