//! Live quiz/homework marks.
//!
//! # Invariants
//! - These commands are ephemeral: they sit on the undo stack like any other
//!   command but are never written to the store.
//! - Execute requires an active session; undo is a no-op unless the session
//!   that received the mark is still the active one.
//! - Undo restores the previous entry exactly, empty entries included.

use crate::command::{CommandError, CommandResult, Reversible};
use crate::model::classroom::ClassroomState;
use crate::model::live::{HomeworkSessionMode, QuizMark};
use crate::model::log_entry::{HomeworkMarks, QuizScore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Records one quiz question outcome for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkLiveQuiz {
    pub student_id: String,
    pub action_taken: QuizMark,
    /// Score before the last execute; `None` when the student had none.
    #[serde(default)]
    pub previous_student_score_state: Option<QuizScore>,
    /// Session that received the mark.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

impl MarkLiveQuiz {
    pub fn new(student_id: impl Into<String>, action_taken: QuizMark) -> Self {
        Self {
            student_id: student_id.into(),
            action_taken,
            previous_student_score_state: None,
            session_id: None,
        }
    }
}

impl Reversible for MarkLiveQuiz {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if !state.students.contains_key(&self.student_id) {
            return Err(CommandError::StudentNotFound(self.student_id.clone()));
        }
        let session = state
            .live_quiz
            .as_mut()
            .ok_or(CommandError::NoLiveSession("quiz"))?;
        let previous = session.scores.get(&self.student_id).copied();
        let mut score = previous.unwrap_or_default();
        score.total_asked += 1;
        if self.action_taken == QuizMark::Correct {
            score.correct += 1;
        }
        session.scores.insert(self.student_id.clone(), score);
        self.previous_student_score_state = previous;
        self.session_id = Some(session.session_id);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        let Some(session) = state
            .live_quiz
            .as_mut()
            .filter(|session| Some(session.session_id) == self.session_id)
        else {
            return Ok(());
        };
        match self.previous_student_score_state {
            Some(score) => {
                session.scores.insert(self.student_id.clone(), score);
            }
            None => {
                session.scores.remove(&self.student_id);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "Mark Quiz: {} for {}",
            self.action_taken.as_str(),
            self.student_id
        )
    }
}

/// Records homework marks for a student in the live homework session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkLiveHomework {
    pub student_id: String,
    pub homework_actions: HomeworkMarks,
    pub session_mode: HomeworkSessionMode,
    #[serde(default)]
    pub previous_homework_state: Option<HomeworkMarks>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

impl MarkLiveHomework {
    pub fn new(
        student_id: impl Into<String>,
        homework_actions: HomeworkMarks,
        session_mode: HomeworkSessionMode,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            homework_actions,
            session_mode,
            previous_homework_state: None,
            session_id: None,
        }
    }

    /// Yes/No marks merge into existing statuses; anything else replaces them.
    fn merged(&self, previous: Option<&HomeworkMarks>) -> HomeworkMarks {
        match (self.session_mode, previous, &self.homework_actions) {
            (
                HomeworkSessionMode::YesNo,
                Some(HomeworkMarks::YesNo(existing)),
                HomeworkMarks::YesNo(update),
            ) => {
                let mut statuses = existing.clone();
                statuses.extend(update.iter().map(|(k, v)| (k.clone(), v.clone())));
                HomeworkMarks::YesNo(statuses)
            }
            _ => self.homework_actions.clone(),
        }
    }
}

impl Reversible for MarkLiveHomework {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if !state.students.contains_key(&self.student_id) {
            return Err(CommandError::StudentNotFound(self.student_id.clone()));
        }
        let session = state
            .live_homework
            .as_mut()
            .ok_or(CommandError::NoLiveSession("homework"))?;
        let previous = session.marks.get(&self.student_id).cloned();
        let marks = self.merged(previous.as_ref());
        session.marks.insert(self.student_id.clone(), marks);
        self.previous_homework_state = previous;
        self.session_id = Some(session.session_id);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        let Some(session) = state
            .live_homework
            .as_mut()
            .filter(|session| Some(session.session_id) == self.session_id)
        else {
            return Ok(());
        };
        match &self.previous_homework_state {
            Some(marks) => {
                session.marks.insert(self.student_id.clone(), marks.clone());
            }
            None => {
                session.marks.remove(&self.student_id);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let mode = match self.session_mode {
            HomeworkSessionMode::YesNo => "Yes/No",
            HomeworkSessionMode::Select => "Select",
        };
        format!(
            "Mark HW ({mode}): {} for {}",
            self.homework_actions.summary(),
            self.student_id
        )
    }
}
