//! Classroom domain model.
//!
//! # Responsibility
//! - Define the plain records mutated by commands: students, furniture,
//!   groups, guides, behavior/homework logs, display settings and ID counters.
//! - Hold the ephemeral live-session state that never reaches the store.
//!
//! # Invariants
//! - Entity IDs are stable string keys of the form `<prefix>_<n>`.
//! - A student's `group_id` references an existing group or is absent.
//! - Log collections are kept sorted by timestamp.

pub mod classroom;
pub mod furniture;
pub mod group;
pub mod guide;
pub mod ids;
pub mod live;
pub mod log_entry;
pub mod settings;
pub mod student;
pub mod timestamp;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that distinguishes "absent" from "explicit null".
///
/// Used with `#[serde(default, deserialize_with = "...")]` so a missing key
/// stays `None` while `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
