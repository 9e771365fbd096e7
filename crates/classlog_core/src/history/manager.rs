//! History manager state machine.

use crate::command::{Command, CommandRecord, CommandRegistry, DeserializationWarning};
use crate::history::prune::prune_stack;
use crate::history::{HistoryError, HistoryResult};
use crate::logging::sanitize_message;
use crate::model::classroom::ClassroomState;
use crate::model::ids::IdKind;
use crate::model::live::{
    HomeworkSessionMode, LiveHomeworkSession, LiveQuizSession,
};
use crate::notify::NotificationSink;
use crate::store::{HistoryEnvelope, Store, StoreError, StoreResult};
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use std::time::Instant;
use uuid::Uuid;

const MAX_LOGGED_MESSAGE_CHARS: usize = 200;

/// One row of the undo history listing.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Position in the undo stack, `0` being the oldest command.
    pub index: usize,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// What happened while opening the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// A saved envelope was found and used.
    pub loaded: bool,
    /// The store held unreadable content and defaults were used instead.
    pub corrupt: bool,
    pub pruned: usize,
    pub warnings: Vec<DeserializationWarning>,
    /// `(kind, stored, healed)` for every counter that had to move.
    pub healed_counters: Vec<(IdKind, u64, u64)>,
    /// Students whose dangling group reference was cleared.
    pub detached_students: Vec<String>,
}

/// Owns classroom state, the undo/redo stacks and the store.
pub struct HistoryManager<S: Store, N: NotificationSink> {
    state: ClassroomState,
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    store: S,
    sink: N,
    save_seq: u64,
    unsaved: bool,
    report: LoadReport,
}

impl<S: Store, N: NotificationSink> HistoryManager<S, N> {
    /// Loads `store` and prunes history older than `retention`.
    pub fn open(store: S, sink: N, retention: Duration) -> Self {
        Self::open_at(store, sink, retention, Utc::now())
    }

    /// Same as [`HistoryManager::open`] with an explicit clock.
    pub fn open_at(mut store: S, sink: N, retention: Duration, now: DateTime<Utc>) -> Self {
        let started_at = Instant::now();
        let backend = store.backend();
        let mut report = LoadReport::default();

        let envelope = match store.load() {
            Ok(Some(envelope)) => {
                report.loaded = true;
                envelope
            }
            Ok(None) => {
                info!("event=history_load module=history status=skip backend={backend} reason=missing");
                HistoryEnvelope::default()
            }
            Err(err) => {
                report.corrupt = true;
                warn!(
                    "event=history_load module=history status=error backend={backend} error_code={} error={}",
                    err.code(),
                    sanitize_message(&err.to_string(), MAX_LOGGED_MESSAGE_CHARS)
                );
                HistoryEnvelope::default()
            }
        };

        let (mut state, undo_records, redo_records) = envelope.into_parts();
        state.sort_logs();
        report.healed_counters = state.heal_counters();
        report.detached_students = state.detach_dangling_groups();
        for (kind, stored, healed) in &report.healed_counters {
            warn!(
                "event=counter_heal module=history status=ok kind={} stored={stored} healed={healed}",
                kind.prefix()
            );
        }
        if !report.detached_students.is_empty() {
            warn!(
                "event=group_detach module=history status=ok students={}",
                report.detached_students.len()
            );
        }

        let registry = CommandRegistry::new();
        let (mut undo_stack, mut warnings) = registry.decode_stack(&undo_records);
        let (mut redo_stack, redo_warnings) = registry.decode_stack(&redo_records);
        warnings.extend(redo_warnings);
        for warning in &warnings {
            warn!(
                "event=record_skip module=history status=error error_code={} tag={} error={}",
                warning.code(),
                sanitize_message(warning.tag(), MAX_LOGGED_MESSAGE_CHARS),
                sanitize_message(&warning.to_string(), MAX_LOGGED_MESSAGE_CHARS)
            );
        }
        report.warnings = warnings;
        report.pruned = prune_stack(&mut undo_stack, now, retention)
            + prune_stack(&mut redo_stack, now, retention);

        info!(
            "event=history_load module=history status=ok backend={backend} loaded={} undo={} redo={} pruned={} warnings={} duration_ms={}",
            report.loaded,
            undo_stack.len(),
            redo_stack.len(),
            report.pruned,
            report.warnings.len(),
            started_at.elapsed().as_millis()
        );

        let save_seq = store.last_seq().unwrap_or(0);
        Self {
            state,
            undo_stack,
            redo_stack,
            store,
            sink,
            save_seq,
            unsaved: false,
            report,
        }
    }

    pub fn state(&self) -> &ClassroomState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Records skipped while loading the stacks.
    pub fn load_warnings(&self) -> &[DeserializationWarning] {
        &self.report.warnings
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// `true` when the last save attempt failed and has not been retried.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Forwards a status line to the sink.
    pub fn report_status(&mut self, text: &str) {
        self.sink.on_status(text);
    }

    /// Undo stack listing, most recent first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.undo_stack
            .iter()
            .enumerate()
            .rev()
            .map(|(index, command)| HistoryEntry {
                index,
                description: command.describe(),
                timestamp: command.timestamp,
            })
            .collect()
    }

    /// Runs `command`, pushes it and clears the redo stack.
    pub fn execute(&mut self, command: impl Into<Command>) -> HistoryResult<()> {
        let mut command = command.into();
        let tag = command.tag();
        if let Err(err) = command.execute(&mut self.state) {
            warn!(
                "event=history_execute module=history status=error tag={tag} error_code={}",
                err.code()
            );
            self.sink.on_status(&format!("Action failed: {err}"));
            return Err(HistoryError::Command(err));
        }

        let description = command.describe();
        let ephemeral = command.is_ephemeral();
        let dropped_redo = self.redo_stack.len();
        self.undo_stack.push(command);
        self.redo_stack.clear();
        debug!(
            "event=history_execute module=history status=ok tag={tag} ephemeral={ephemeral} dropped_redo={dropped_redo}"
        );

        if !ephemeral || dropped_redo > 0 {
            self.persist();
        }
        self.sink.on_state_changed();
        self.sink.on_status(&description);
        Ok(())
    }

    /// Reverses the latest command. Returns `false` when there was none.
    pub fn undo(&mut self) -> HistoryResult<bool> {
        let Some(mut command) = self.undo_stack.pop() else {
            self.sink.on_status("Nothing to undo.");
            return Ok(false);
        };
        let tag = command.tag();
        if let Err(err) = command.undo(&mut self.state) {
            error!(
                "event=history_undo module=history status=error tag={tag} error_code={}",
                err.code()
            );
            self.undo_stack.push(command);
            self.sink.on_status(&format!("Undo failed: {err}"));
            return Err(HistoryError::UndoFailed(err));
        }

        let description = command.describe();
        let ephemeral = command.is_ephemeral();
        self.redo_stack.push(command);
        debug!("event=history_undo module=history status=ok tag={tag}");
        if !ephemeral {
            self.persist();
        }
        self.sink.on_state_changed();
        self.sink.on_status(&format!("Undid: {description}"));
        Ok(true)
    }

    /// Re-applies the latest undone command. Returns `false` when there was none.
    pub fn redo(&mut self) -> HistoryResult<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            self.sink.on_status("Nothing to redo.");
            return Ok(false);
        };
        let tag = command.tag();
        if let Err(err) = command.execute(&mut self.state) {
            error!(
                "event=history_redo module=history status=error tag={tag} error_code={}",
                err.code()
            );
            self.redo_stack.push(command);
            self.sink.on_status(&format!("Redo failed: {err}"));
            return Err(HistoryError::RedoFailed(err));
        }

        let description = command.describe();
        let ephemeral = command.is_ephemeral();
        self.undo_stack.push(command);
        debug!("event=history_redo module=history status=ok tag={tag}");
        if !ephemeral {
            self.persist();
        }
        self.sink.on_state_changed();
        self.sink.on_status(&format!("Redid: {description}"));
        Ok(true)
    }

    /// Undoes every command above `index` and discards the redo branch.
    ///
    /// The command at `index` stays applied. On an undo failure the failing
    /// command stays on the undo stack and the commands already reverted are
    /// discarded.
    pub fn revert_to(&mut self, index: usize) -> HistoryResult<usize> {
        let len = self.undo_stack.len();
        if index >= len {
            return Err(HistoryError::IndexOutOfRange { index, len });
        }

        let mut reverted = 0;
        let mut failure = None;
        while self.undo_stack.len() > index + 1 {
            let Some(mut command) = self.undo_stack.pop() else {
                break;
            };
            if let Err(err) = command.undo(&mut self.state) {
                error!(
                    "event=history_revert module=history status=error tag={} error_code={}",
                    command.tag(),
                    err.code()
                );
                self.undo_stack.push(command);
                failure = Some(err);
                break;
            }
            reverted += 1;
        }
        self.redo_stack.clear();

        info!(
            "event=history_revert module=history status={} index={index} reverted={reverted}",
            if failure.is_some() { "error" } else { "ok" }
        );
        self.persist();
        self.sink.on_state_changed();
        match failure {
            Some(err) => {
                self.sink.on_status(&format!("Revert stopped: {err}"));
                Err(HistoryError::UndoFailed(err))
            }
            None => {
                self.sink
                    .on_status(&format!("Reverted {reverted} action(s)."));
                Ok(reverted)
            }
        }
    }

    /// Saves the full envelope now, whether or not a save is pending.
    pub fn flush(&mut self) -> HistoryResult<()> {
        self.try_persist().map_err(|err| {
            error!(
                "event=history_flush module=history status=error error_code={}",
                err.code()
            );
            HistoryError::Store(err)
        })
    }

    /// Persistable view: live sessions and ephemeral commands are left out.
    pub fn envelope(&self) -> serde_json::Result<HistoryEnvelope> {
        Ok(HistoryEnvelope::from_state(
            &self.state,
            durable_records(&self.undo_stack)?,
            durable_records(&self.redo_stack)?,
        ))
    }

    pub fn start_live_quiz(&mut self, name: impl Into<String>) -> HistoryResult<Uuid> {
        if self.state.live_quiz.is_some() {
            return Err(HistoryError::SessionActive("quiz"));
        }
        let session = LiveQuizSession::start(name);
        let session_id = session.session_id;
        self.sink
            .on_status(&format!("Live quiz '{}' started.", session.name));
        self.state.live_quiz = Some(session);
        info!("event=live_session_start module=history status=ok kind=quiz");
        self.sink.on_state_changed();
        Ok(session_id)
    }

    pub fn start_live_homework(
        &mut self,
        name: impl Into<String>,
        mode: HomeworkSessionMode,
    ) -> HistoryResult<Uuid> {
        if self.state.live_homework.is_some() {
            return Err(HistoryError::SessionActive("homework"));
        }
        let session = LiveHomeworkSession::start(name, mode);
        let session_id = session.session_id;
        self.sink
            .on_status(&format!("Live homework '{}' started.", session.name));
        self.state.live_homework = Some(session);
        info!("event=live_session_start module=history status=ok kind=homework");
        self.sink.on_state_changed();
        Ok(session_id)
    }

    /// Ends the live quiz and hands back its scores for logging.
    pub fn take_live_quiz(&mut self) -> HistoryResult<LiveQuizSession> {
        let session = self
            .state
            .live_quiz
            .take()
            .ok_or(HistoryError::NoLiveSession("quiz"))?;
        info!(
            "event=live_session_end module=history status=ok kind=quiz students={}",
            session.scores.len()
        );
        self.sink.on_state_changed();
        Ok(session)
    }

    /// Ends the live homework session and hands back its marks for logging.
    pub fn take_live_homework(&mut self) -> HistoryResult<LiveHomeworkSession> {
        let session = self
            .state
            .live_homework
            .take()
            .ok_or(HistoryError::NoLiveSession("homework"))?;
        info!(
            "event=live_session_end module=history status=ok kind=homework students={}",
            session.marks.len()
        );
        self.sink.on_state_changed();
        Ok(session)
    }

    /// Drops the live quiz without logging. The stacks are left untouched.
    pub fn discard_live_quiz(&mut self) -> bool {
        let discarded = self.state.live_quiz.take().is_some();
        if discarded {
            info!("event=live_session_discard module=history status=ok kind=quiz");
            self.sink.on_state_changed();
            self.sink.on_status("Live quiz discarded.");
        }
        discarded
    }

    /// Drops the live homework session without logging.
    pub fn discard_live_homework(&mut self) -> bool {
        let discarded = self.state.live_homework.take().is_some();
        if discarded {
            info!("event=live_session_discard module=history status=ok kind=homework");
            self.sink.on_state_changed();
            self.sink.on_status("Live homework session discarded.");
        }
        discarded
    }

    fn persist(&mut self) {
        if let Err(err) = self.try_persist() {
            self.sink
                .on_status(&format!("Could not save changes: {err}"));
        }
    }

    fn try_persist(&mut self) -> StoreResult<()> {
        let envelope = self.envelope().map_err(StoreError::Encode)?;
        let seq = self.save_seq + 1;
        match self.store.save(seq, &envelope) {
            Ok(()) => {
                self.save_seq = seq;
                self.unsaved = false;
                Ok(())
            }
            Err(err) => {
                self.unsaved = true;
                error!(
                    "event=history_persist module=history status=error backend={} seq={seq} error_code={}",
                    self.store.backend(),
                    err.code()
                );
                Err(err)
            }
        }
    }
}

fn durable_records(stack: &[Command]) -> serde_json::Result<Vec<CommandRecord>> {
    stack
        .iter()
        .filter(|command| !command.is_ephemeral())
        .map(Command::to_record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::HistoryManager;
    use crate::command::{AddItem, CommandAction, ResetSettings};
    use crate::history::HistoryError;
    use crate::model::classroom::ItemData;
    use crate::model::student::Student;
    use crate::notify::RecordingSink;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn manager() -> HistoryManager<MemoryStore, RecordingSink> {
        HistoryManager::open(MemoryStore::new(), RecordingSink::new(), Duration::days(90))
    }

    fn add(n: u64) -> CommandAction {
        let student = Student::new(format!("student_{n}"), "S", format!("{n}"), 0.0, 0.0);
        CommandAction::AddItem(AddItem::new(ItemData::Student(student), n))
    }

    #[test]
    fn empty_undo_reports_status() {
        let mut history = manager();
        assert!(!history.undo().unwrap());
        assert_eq!(history.sink().last_status(), Some("Nothing to undo."));
    }

    #[test]
    fn rejected_command_is_not_pushed_or_saved() {
        let mut history = manager();
        history.execute(add(1)).unwrap();
        let err = history.execute(add(1)).unwrap_err();
        assert!(matches!(err, HistoryError::Command(_)));
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.store().save_count(), 1);
    }

    #[test]
    fn save_failure_keeps_state_and_flush_retries() {
        let mut history = manager();
        history.store_mut().set_fail_saves(true);
        history
            .execute(CommandAction::ResetSettings(ResetSettings::new()))
            .unwrap();
        assert!(history.has_unsaved_changes());
        assert_eq!(history.undo_len(), 1);
        assert!(history
            .sink()
            .statuses
            .iter()
            .any(|status| status.starts_with("Could not save changes")));

        history.store_mut().set_fail_saves(false);
        history.flush().unwrap();
        assert!(!history.has_unsaved_changes());
        assert_eq!(history.store().saved_seqs(), vec![1]);
    }

    #[test]
    fn revert_to_keeps_target_and_drops_redo() {
        let mut history = manager();
        for n in 1..=4 {
            history.execute(add(n)).unwrap();
        }
        history.undo().unwrap();
        assert_eq!(history.redo_len(), 1);

        assert_eq!(history.revert_to(0).unwrap(), 2);
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
        assert_eq!(history.state().students.len(), 1);
        assert_eq!(history.state().counters.next_student_id, 2);

        let err = history.revert_to(5).unwrap_err();
        assert!(matches!(err, HistoryError::IndexOutOfRange { index: 5, len: 1 }));
    }

    #[test]
    fn history_lists_most_recent_first() {
        let mut history = manager();
        history.execute(add(1)).unwrap();
        history.execute(add(2)).unwrap();
        let entries = history.history();
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[0].description, "Add student: S 2");
        assert_eq!(entries[1].index, 0);
    }
}
