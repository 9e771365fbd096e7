//! Ephemeral live quiz/homework session state.
//!
//! # Invariants
//! - Never serialized into the store; a restart starts with no session.
//! - Discarding a session touches only this state, never the undo/redo stacks.

use crate::model::log_entry::{HomeworkMarks, QuizScore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome recorded for one live quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMark {
    Correct,
    Incorrect,
}

impl QuizMark {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveQuizSession {
    pub session_id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub scores: BTreeMap<String, QuizScore>,
}

impl LiveQuizSession {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            name: name.into(),
            started_at: Utc::now(),
            scores: BTreeMap::new(),
        }
    }
}

/// How homework is marked during a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomeworkSessionMode {
    #[serde(rename = "Yes/No")]
    YesNo,
    #[serde(rename = "Select")]
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveHomeworkSession {
    pub session_id: Uuid,
    pub name: String,
    pub mode: HomeworkSessionMode,
    pub started_at: DateTime<Utc>,
    pub marks: BTreeMap<String, HomeworkMarks>,
}

impl LiveHomeworkSession {
    pub fn start(name: impl Into<String>, mode: HomeworkSessionMode) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            name: name.into(),
            mode,
            started_at: Utc::now(),
            marks: BTreeMap::new(),
        }
    }
}
