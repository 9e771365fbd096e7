//! Core mutation and undo/redo engine for classlog.
//! Every classroom change flows through a reversible command owned by
//! [`HistoryManager`].

pub mod command;
pub mod config;
pub mod db;
pub mod history;
pub mod logging;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;

pub use command::{
    Command, CommandAction, CommandError, CommandRecord, CommandRegistry, CommandResult,
    DeserializationWarning, Reversible,
};
pub use config::{ConfigError, EngineConfig, StoreBackend, StoreConfig};
pub use history::{HistoryEntry, HistoryError, HistoryManager, HistoryResult, LoadReport};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::classroom::{ClassroomState, ItemData};
pub use model::guide::{Guide, GuideOrientation};
pub use model::ids::{IdKind, ItemKind};
pub use notify::{NotificationSink, NullSink, RecordingSink};
pub use service::{ClassroomService, NewFurnitureRequest, NewStudentRequest};
pub use store::{
    HistoryEnvelope, JsonFileStore, MemoryStore, SqliteStore, Store, StoreError, StoreResult,
    DATA_VERSION,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
