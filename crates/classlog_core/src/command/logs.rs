//! Behavior/quiz and homework log appends.

use crate::command::{
    CommandError, CommandResult, Reversible, TAG_LOG_ENTRY, TAG_LOG_HOMEWORK_ENTRY,
};
use crate::model::classroom::ClassroomState;
use crate::model::log_entry::{
    insert_unique_sorted, remove_first_match, BehaviorLogEntry, BehaviorLogType,
    HomeworkLogEntry, LogEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Appends one log entry; undo removes the first exact match.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendLogEntry {
    pub student_id: String,
    pub entry: LogEntry,
}

#[derive(Deserialize)]
struct LogWire<T> {
    log_entry: T,
    #[serde(default)]
    student_id: Option<String>,
}

impl AppendLogEntry {
    pub fn behavior(entry: BehaviorLogEntry) -> Self {
        Self {
            student_id: entry.student_id.clone(),
            entry: LogEntry::Behavior(entry),
        }
    }

    pub fn homework(entry: HomeworkLogEntry) -> Self {
        Self {
            student_id: entry.student_id.clone(),
            entry: LogEntry::Homework(entry),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self.entry {
            LogEntry::Behavior(_) => TAG_LOG_ENTRY,
            LogEntry::Homework(_) => TAG_LOG_HOMEWORK_ENTRY,
        }
    }

    pub(crate) fn to_data(&self) -> serde_json::Result<Value> {
        let log_entry = match &self.entry {
            LogEntry::Behavior(entry) => serde_json::to_value(entry)?,
            LogEntry::Homework(entry) => serde_json::to_value(entry)?,
        };
        Ok(json!({ "log_entry": log_entry, "student_id": self.student_id }))
    }

    pub(crate) fn decode_behavior(data: &Value) -> serde_json::Result<Self> {
        let wire = LogWire::<BehaviorLogEntry>::deserialize(data)?;
        let student_id = wire
            .student_id
            .unwrap_or_else(|| wire.log_entry.student_id.clone());
        Ok(Self {
            student_id,
            entry: LogEntry::Behavior(wire.log_entry),
        })
    }

    pub(crate) fn decode_homework(data: &Value) -> serde_json::Result<Self> {
        let wire = LogWire::<HomeworkLogEntry>::deserialize(data)?;
        let student_id = wire
            .student_id
            .unwrap_or_else(|| wire.log_entry.student_id.clone());
        Ok(Self {
            student_id,
            entry: LogEntry::Homework(wire.log_entry),
        })
    }
}

impl Reversible for AppendLogEntry {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if !state.students.contains_key(self.entry.student_id()) {
            return Err(CommandError::StudentNotFound(
                self.entry.student_id().to_string(),
            ));
        }
        match &self.entry {
            LogEntry::Behavior(entry) => {
                insert_unique_sorted(&mut state.behavior_log, entry, |e| e.timestamp);
            }
            LogEntry::Homework(entry) => {
                insert_unique_sorted(&mut state.homework_log, entry, |e| e.timestamp);
            }
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        match &self.entry {
            LogEntry::Behavior(entry) => {
                remove_first_match(&mut state.behavior_log, entry);
            }
            LogEntry::Homework(entry) => {
                remove_first_match(&mut state.homework_log, entry);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.entry {
            LogEntry::Behavior(entry) => {
                let kind = match entry.log_type {
                    BehaviorLogType::Behavior => "Behavior",
                    BehaviorLogType::Quiz => "Quiz",
                };
                format!(
                    "Log {kind}: '{}' for {}",
                    entry.behavior, entry.student_first_name
                )
            }
            LogEntry::Homework(entry) => format!(
                "Log Homework: '{}' for {}",
                entry.homework_type, entry.student_first_name
            ),
        }
    }
}
