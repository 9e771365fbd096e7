//! In-memory store for state-machine tests and dry runs.

use crate::store::{check_seq, HistoryEnvelope, Store, StoreError, StoreResult};

/// Keeps every accepted save; failures can be injected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saves: Vec<(u64, HistoryEnvelope)>,
    seeded: Option<HistoryEnvelope>,
    corrupt: bool,
    fail_saves: bool,
    last_seq: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose first `load` returns `envelope`.
    pub fn seeded(envelope: HistoryEnvelope) -> Self {
        Self {
            seeded: Some(envelope),
            ..Self::default()
        }
    }

    /// Store whose `load` reports corrupt content.
    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Self::default()
        }
    }

    /// Makes every following `save` fail until switched off.
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn save_count(&self) -> usize {
        self.saves.len()
    }

    pub fn last_saved(&self) -> Option<&HistoryEnvelope> {
        self.saves.last().map(|(_, envelope)| envelope)
    }

    pub fn saved_seqs(&self) -> Vec<u64> {
        self.saves.iter().map(|(seq, _)| *seq).collect()
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn save(&mut self, seq: u64, envelope: &HistoryEnvelope) -> StoreResult<()> {
        check_seq(self.last_seq, seq)?;
        if self.fail_saves {
            return Err(StoreError::Unavailable("save failure injected".to_string()));
        }
        self.saves.push((seq, envelope.clone()));
        self.last_seq = Some(seq);
        Ok(())
    }

    fn load(&mut self) -> StoreResult<Option<HistoryEnvelope>> {
        if self.corrupt {
            return Err(StoreError::Corrupt("corrupt content injected".to_string()));
        }
        Ok(self
            .last_saved()
            .cloned()
            .or_else(|| self.seeded.clone()))
    }

    fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }
}
