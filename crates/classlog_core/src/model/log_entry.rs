//! Behavior/quiz and homework log records.
//!
//! # Invariants
//! - Entries are never edited in place; commands add or remove them whole.
//! - Equality is structural, which is what duplicate-safe restore relies on.

use crate::model::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Behavior log channel (`type` on the wire).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorLogType {
    #[default]
    Behavior,
    Quiz,
}

/// Quiz result attached to quiz log entries and live quiz sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: u32,
    pub total_asked: u32,
}

impl QuizScore {
    pub fn is_empty(&self) -> bool {
        self.correct == 0 && self.total_asked == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorLogEntry {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub student_id: String,
    #[serde(default)]
    pub student_first_name: String,
    #[serde(default)]
    pub student_last_name: String,
    pub behavior: String,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "type", default)]
    pub log_type: BehaviorLogType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_details: Option<QuizScore>,
}

/// Homework log channel (`type` on the wire).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomeworkLogType {
    #[default]
    #[serde(rename = "homework")]
    Manual,
    #[serde(rename = "homework_session_y")]
    SessionYesNo,
    #[serde(rename = "homework_session_s")]
    SessionSelect,
}

/// Marks collected for one student in a homework check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HomeworkMarks {
    /// Options picked in "Select" mode.
    Select { selected_options: Vec<String> },
    /// Homework type -> "yes"/"no" in "Yes/No" mode.
    YesNo(BTreeMap<String, String>),
}

impl HomeworkMarks {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Select { selected_options } => selected_options.is_empty(),
            Self::YesNo(statuses) => statuses.is_empty(),
        }
    }

    /// Short human-readable summary, e.g. `Reading:yes, Math:no`.
    pub fn summary(&self) -> String {
        match self {
            Self::Select { selected_options } => selected_options.join(", "),
            Self::YesNo(statuses) => statuses
                .iter()
                .map(|(name, value)| format!("{name}:{value}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkLogEntry {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub student_id: String,
    #[serde(default)]
    pub student_first_name: String,
    #[serde(default)]
    pub student_last_name: String,
    #[serde(alias = "behavior")]
    pub homework_type: String,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "type", default)]
    pub log_type: HomeworkLogType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homework_details: Option<HomeworkMarks>,
}

/// Either kind of log entry, as carried by append commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Behavior(BehaviorLogEntry),
    Homework(HomeworkLogEntry),
}

impl LogEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Behavior(entry) => entry.timestamp,
            Self::Homework(entry) => entry.timestamp,
        }
    }

    pub fn student_id(&self) -> &str {
        match self {
            Self::Behavior(entry) => entry.student_id.as_str(),
            Self::Homework(entry) => entry.student_id.as_str(),
        }
    }
}

/// Inserts `entry` unless an identical record exists, then re-sorts.
///
/// Returns whether the entry was inserted.
pub(crate) fn insert_unique_sorted<T, F>(log: &mut Vec<T>, entry: &T, timestamp_of: F) -> bool
where
    T: Clone + PartialEq,
    F: Fn(&T) -> DateTime<Utc>,
{
    if log.iter().any(|existing| existing == entry) {
        return false;
    }
    log.push(entry.clone());
    log.sort_by_key(|item| timestamp_of(item));
    true
}

/// Removes the first record equal to `entry`. Returns whether one was found.
pub(crate) fn remove_first_match<T: PartialEq>(log: &mut Vec<T>, entry: &T) -> bool {
    match log.iter().position(|existing| existing == entry) {
        Some(index) => {
            log.remove(index);
            true
        }
        None => false,
    }
}
