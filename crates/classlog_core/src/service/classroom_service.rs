//! Classroom use-case service.
//!
//! # Responsibility
//! - Turn user intents into fully captured commands.
//! - Allocate IDs and resolve layout collisions before execution.
//!
//! # Invariants
//! - Every mutation goes through [`HistoryManager::execute`]; the service never
//!   touches classroom state directly.
//! - Commit of a live session is one history entry, whatever the class size.

use crate::command::{
    AddGuide, AddItem, AppendLogEntry, ChangeItemsSize, ChangeStudentStyle, Command,
    CommandAction, CommandError, CompoundCommand, DeleteGuide, DeleteItem, EditItem, ItemPatch,
    MarkLiveHomework, MarkLiveQuiz, MoveGuides, MoveItems, ReassignGroups, ResetSettings,
    Reversible,
};
use crate::history::{HistoryEntry, HistoryError, HistoryManager, HistoryResult};
use crate::model::classroom::{ClassroomState, ItemData};
use crate::model::furniture::{FurnitureItem, FurniturePatch};
use crate::model::group::{default_group_color, Group};
use crate::model::guide::{Guide, GuideOrientation};
use crate::model::ids::{IdKind, ItemKind};
use crate::model::live::{HomeworkSessionMode, QuizMark};
use crate::model::log_entry::{
    BehaviorLogEntry, BehaviorLogType, HomeworkLogEntry, HomeworkLogType, HomeworkMarks,
    QuizScore,
};
use crate::model::student::{
    Student, StudentPatch, StyleValue, MIN_STUDENT_BOX_HEIGHT, MIN_STUDENT_BOX_WIDTH,
};
use crate::notify::NotificationSink;
use crate::service::layout::collision_shifts;
use crate::store::Store;
use chrono::Utc;
use log::info;
use uuid::Uuid;

/// Request model for a new student box.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewStudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub gender: String,
    pub x: f64,
    pub y: f64,
    pub group_id: Option<String>,
}

/// Request model for a new furniture item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFurnitureRequest {
    pub name: String,
    pub furniture_type: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Use-case facade over a [`HistoryManager`].
pub struct ClassroomService<S: Store, N: NotificationSink> {
    history: HistoryManager<S, N>,
}

impl<S: Store, N: NotificationSink> ClassroomService<S, N> {
    pub fn new(history: HistoryManager<S, N>) -> Self {
        Self { history }
    }

    pub fn state(&self) -> &ClassroomState {
        self.history.state()
    }

    pub fn history_manager(&self) -> &HistoryManager<S, N> {
        &self.history
    }

    pub fn history_manager_mut(&mut self) -> &mut HistoryManager<S, N> {
        &mut self.history
    }

    pub fn into_history_manager(self) -> HistoryManager<S, N> {
        self.history
    }

    /// Adds a student sized from the display defaults. Returns its new ID.
    pub fn add_student(&mut self, request: NewStudentRequest) -> HistoryResult<String> {
        let state = self.history.state();
        let counter = state.counters.get(IdKind::Student);
        let id = IdKind::Student.format_id(counter);
        let mut student = Student::new(
            id.clone(),
            request.first_name,
            request.last_name,
            request.x,
            request.y,
        );
        student.nickname = request.nickname.filter(|name| !name.trim().is_empty());
        student.gender = request.gender;
        student.width = state.settings.default_student_box_width;
        student.height = state.settings.default_student_box_height;
        student.group_id = request.group_id;

        self.run(CommandAction::AddItem(AddItem::new(
            ItemData::Student(student),
            counter,
        )))?;
        Ok(id)
    }

    /// Adds a furniture item. Returns its new ID.
    pub fn add_furniture(&mut self, request: NewFurnitureRequest) -> HistoryResult<String> {
        let counter = self.history.state().counters.get(IdKind::Furniture);
        let id = IdKind::Furniture.format_id(counter);
        let item = FurnitureItem::new(
            id.clone(),
            request.name,
            request.furniture_type,
            request.x,
            request.y,
            request.width,
            request.height,
        );
        self.run(CommandAction::AddItem(AddItem::new(
            ItemData::Furniture(item),
            counter,
        )))?;
        Ok(id)
    }

    /// Deletes an item together with every log entry that references it.
    pub fn delete_item(&mut self, kind: ItemKind, item_id: &str) -> HistoryResult<()> {
        let command = DeleteItem::capture(self.history.state(), kind, item_id)?;
        self.run(CommandAction::DeleteItem(command))
    }

    /// Applies `patch`; returns `false` without recording anything when the
    /// patch is empty.
    pub fn edit_student(&mut self, student_id: &str, patch: StudentPatch) -> HistoryResult<bool> {
        if patch.is_empty() {
            self.history.report_status("No changes made.");
            return Ok(false);
        }
        self.edit(student_id, ItemPatch::Student(patch))
    }

    pub fn edit_furniture(
        &mut self,
        furniture_id: &str,
        patch: FurniturePatch,
    ) -> HistoryResult<bool> {
        if patch.is_empty() {
            self.history.report_status("No changes made.");
            return Ok(false);
        }
        self.edit(furniture_id, ItemPatch::Furniture(patch))
    }

    fn edit(&mut self, item_id: &str, patch: ItemPatch) -> HistoryResult<bool> {
        let command = EditItem::capture(self.history.state(), item_id, patch)?;
        self.run(CommandAction::EditItem(command))?;
        Ok(true)
    }

    /// Moves items to absolute positions as one history entry.
    ///
    /// Items the moved students now overlap are pushed down in the same
    /// entry. Returns how many items were pushed.
    pub fn move_items(
        &mut self,
        targets: Vec<(ItemKind, String, f64, f64)>,
    ) -> HistoryResult<usize> {
        let moved_keys: Vec<(ItemKind, String)> = targets
            .iter()
            .map(|(kind, id, _, _)| (*kind, id.clone()))
            .collect();
        let mut requested = MoveItems::capture(self.history.state(), targets);
        if requested.items_moves.is_empty() {
            self.history.report_status("Nothing to move.");
            return Ok(0);
        }

        let mut preview = self.history.state().clone();
        requested.execute(&mut preview)?;
        let shifts = collision_shifts(&preview, &moved_keys);
        if shifts.is_empty() {
            self.run(CommandAction::MoveItems(requested))?;
            return Ok(0);
        }

        let adjustment = MoveItems::capture(&preview, shifts);
        let pushed = adjustment.items_moves.len();
        let label = format!(
            "Move {} item(s), adjust {pushed}",
            requested.items_moves.len()
        );
        let compound = CompoundCommand::new(
            label,
            vec![
                Command::new(CommandAction::MoveItems(requested)),
                Command::new(CommandAction::MoveItems(adjustment)),
            ],
        );
        self.run(CommandAction::Compound(compound))?;
        info!("event=layout_adjust module=service status=ok pushed={pushed}");
        Ok(pushed)
    }

    /// Resizes items as one history entry; student boxes are clamped to the
    /// minimum box size.
    pub fn resize_items(&mut self, targets: Vec<(ItemKind, String, f64, f64)>) -> HistoryResult<()> {
        let clamped = targets.into_iter().map(|(kind, id, w, h)| match kind {
            ItemKind::Student => (
                kind,
                id,
                w.max(MIN_STUDENT_BOX_WIDTH),
                h.max(MIN_STUDENT_BOX_HEIGHT),
            ),
            ItemKind::Furniture => (kind, id, w.max(1.0), h.max(1.0)),
        });
        let command = ChangeItemsSize::capture(self.history.state(), clamped);
        if command.items_sizes_changes.is_empty() {
            self.history.report_status("Nothing to resize.");
            return Ok(());
        }
        self.run(CommandAction::ChangeItemsSize(command))
    }

    pub fn log_behavior(
        &mut self,
        student_id: &str,
        behavior: impl Into<String>,
        comment: impl Into<String>,
    ) -> HistoryResult<()> {
        let entry = self.behavior_entry(student_id, behavior.into(), comment.into())?;
        self.run(CommandAction::AppendLogEntry(AppendLogEntry::behavior(entry)))
    }

    /// Logs a quiz result outside of a live session.
    pub fn log_quiz(
        &mut self,
        student_id: &str,
        quiz_name: impl Into<String>,
        score: QuizScore,
        comment: impl Into<String>,
    ) -> HistoryResult<()> {
        let mut entry = self.behavior_entry(student_id, quiz_name.into(), comment.into())?;
        entry.log_type = BehaviorLogType::Quiz;
        entry.score_details = Some(score);
        self.run(CommandAction::AppendLogEntry(AppendLogEntry::behavior(entry)))
    }

    pub fn log_homework(
        &mut self,
        student_id: &str,
        homework_type: impl Into<String>,
        comment: impl Into<String>,
        details: Option<HomeworkMarks>,
    ) -> HistoryResult<()> {
        let student = self.student(student_id)?;
        let entry = HomeworkLogEntry {
            timestamp: Utc::now(),
            student_id: student.id.clone(),
            student_first_name: student.first_name.clone(),
            student_last_name: student.last_name.clone(),
            homework_type: homework_type.into(),
            comment: comment.into(),
            log_type: HomeworkLogType::Manual,
            homework_details: details,
        };
        self.run(CommandAction::AppendLogEntry(AppendLogEntry::homework(entry)))
    }

    /// Sets (`Some`) or clears (`None`) one style override.
    pub fn set_student_style(
        &mut self,
        student_id: &str,
        property: &str,
        value: Option<StyleValue>,
    ) -> HistoryResult<()> {
        let command = ChangeStudentStyle::capture(self.history.state(), student_id, property, value)?;
        self.run(CommandAction::ChangeStudentStyle(command))
    }

    pub fn reset_settings(&mut self) -> HistoryResult<()> {
        self.run(CommandAction::ResetSettings(ResetSettings::new()))
    }

    /// Places a ruler guide. Returns its new ID, e.g. `guide_v_1`.
    pub fn add_guide(
        &mut self,
        orientation: GuideOrientation,
        world_coord: f64,
    ) -> HistoryResult<String> {
        let counter = self.history.state().counters.get(IdKind::Guide);
        let id = orientation.format_id(counter);
        let guide = Guide::new(id.clone(), orientation, world_coord);
        self.run(CommandAction::AddGuide(AddGuide::new(guide, counter)))?;
        Ok(id)
    }

    /// Moves guides as one history entry. Unknown IDs are ignored.
    pub fn move_guides(&mut self, targets: Vec<(String, f64)>) -> HistoryResult<()> {
        let command = MoveGuides::capture(self.history.state(), targets);
        if command.items_moves.is_empty() {
            self.history.report_status("Nothing to move.");
            return Ok(());
        }
        self.run(CommandAction::MoveGuides(command))
    }

    pub fn delete_guide(&mut self, guide_id: &str) -> HistoryResult<()> {
        let command = DeleteGuide::capture(self.history.state(), guide_id)?;
        self.run(CommandAction::DeleteGuide(command))
    }

    /// Creates an empty group. Returns its new ID.
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        color: Option<String>,
    ) -> HistoryResult<String> {
        let state = self.history.state();
        let counter = state.counters.get(IdKind::Group);
        let id = IdKind::Group.format_id(counter);
        let color = color.unwrap_or_else(|| default_group_color(counter).to_string());
        let mut groups = state.groups.clone();
        groups.insert(id.clone(), Group::new(id.clone(), name, color));
        let command =
            ReassignGroups::capture(state, groups, state.group_assignments(), counter + 1);
        self.run(CommandAction::ReassignGroups(command))?;
        Ok(id)
    }

    /// Deletes a group; its members end up with no group.
    pub fn delete_group(&mut self, group_id: &str) -> HistoryResult<()> {
        let state = self.history.state();
        if !state.groups.contains_key(group_id) {
            return Err(CommandError::GroupNotFound(group_id.to_string()).into());
        }
        let mut groups = state.groups.clone();
        groups.remove(group_id);
        let mut assignments = state.group_assignments();
        assignments.retain(|_, assigned| assigned != group_id);
        let command = ReassignGroups::capture(
            state,
            groups,
            assignments,
            state.counters.get(IdKind::Group),
        );
        self.run(CommandAction::ReassignGroups(command))
    }

    /// Puts `student_ids` into `group_id`, or removes them from any group.
    pub fn assign_students(
        &mut self,
        group_id: Option<&str>,
        student_ids: &[String],
    ) -> HistoryResult<()> {
        let state = self.history.state();
        if let Some(group_id) = group_id {
            if !state.groups.contains_key(group_id) {
                return Err(CommandError::GroupNotFound(group_id.to_string()).into());
            }
        }
        if let Some(missing) = student_ids
            .iter()
            .find(|id| !state.students.contains_key(id.as_str()))
        {
            return Err(CommandError::StudentNotFound(missing.clone()).into());
        }

        let mut assignments = state.group_assignments();
        for student_id in student_ids {
            match group_id {
                Some(group_id) => {
                    assignments.insert(student_id.clone(), group_id.to_string());
                }
                None => {
                    assignments.remove(student_id);
                }
            }
        }
        let command = ReassignGroups::capture(
            state,
            state.groups.clone(),
            assignments,
            state.counters.get(IdKind::Group),
        );
        self.run(CommandAction::ReassignGroups(command))
    }

    /// Starts a live quiz; `None` uses the configured default name.
    pub fn start_live_quiz(&mut self, name: Option<String>) -> HistoryResult<Uuid> {
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.history.state().settings.default_quiz_name.clone());
        self.history.start_live_quiz(name.trim())
    }

    pub fn mark_live_quiz(&mut self, student_id: &str, mark: QuizMark) -> HistoryResult<()> {
        self.run(CommandAction::MarkLiveQuiz(MarkLiveQuiz::new(student_id, mark)))
    }

    /// Logs every collected score as one history entry and ends the session.
    ///
    /// Students deleted during the session and students never asked are
    /// skipped. Returns how many scores were logged.
    pub fn end_live_quiz(&mut self) -> HistoryResult<usize> {
        let state = self.history.state();
        let session = state
            .live_quiz
            .as_ref()
            .ok_or(HistoryError::NoLiveSession("quiz"))?;
        let now = Utc::now();
        let commands: Vec<Command> = session
            .scores
            .iter()
            .filter(|(_, score)| score.total_asked > 0)
            .filter_map(|(student_id, score)| {
                let student = state.students.get(student_id)?;
                let entry = BehaviorLogEntry {
                    timestamp: now,
                    student_id: student.id.clone(),
                    student_first_name: student.first_name.clone(),
                    student_last_name: student.last_name.clone(),
                    behavior: session.name.clone(),
                    comment: "From Class Quiz session.".to_string(),
                    log_type: BehaviorLogType::Quiz,
                    score_details: Some(*score),
                };
                Some(Command::with_timestamp(
                    CommandAction::AppendLogEntry(AppendLogEntry::behavior(entry)),
                    now,
                ))
            })
            .collect();
        let name = session.name.clone();
        let logged = commands.len();

        if !commands.is_empty() {
            let label = format!("End Class Quiz: {name}");
            self.run(CommandAction::Compound(CompoundCommand::new(label, commands)))?;
        }
        self.history.take_live_quiz()?;
        self.history.report_status(&format!(
            "Class Quiz '{name}' ended. {logged} student scores logged."
        ));
        Ok(logged)
    }

    pub fn discard_live_quiz(&mut self) -> bool {
        self.history.discard_live_quiz()
    }

    /// Starts a live homework session; `None` uses the configured default name.
    pub fn start_live_homework(
        &mut self,
        name: Option<String>,
        mode: HomeworkSessionMode,
    ) -> HistoryResult<Uuid> {
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.history.state().settings.default_homework_name.clone());
        self.history.start_live_homework(name.trim(), mode)
    }

    pub fn mark_live_homework(
        &mut self,
        student_id: &str,
        marks: HomeworkMarks,
    ) -> HistoryResult<()> {
        let mode = self
            .history
            .state()
            .live_homework
            .as_ref()
            .map(|session| session.mode)
            .ok_or(HistoryError::NoLiveSession("homework"))?;
        self.run(CommandAction::MarkLiveHomework(MarkLiveHomework::new(
            student_id, marks, mode,
        )))
    }

    /// Logs every collected mark as one history entry and ends the session.
    pub fn end_live_homework(&mut self) -> HistoryResult<usize> {
        let state = self.history.state();
        let session = state
            .live_homework
            .as_ref()
            .ok_or(HistoryError::NoLiveSession("homework"))?;
        let (log_type, mode_label) = match session.mode {
            HomeworkSessionMode::YesNo => (HomeworkLogType::SessionYesNo, "Yes/No"),
            HomeworkSessionMode::Select => (HomeworkLogType::SessionSelect, "Select"),
        };
        let now = Utc::now();
        let commands: Vec<Command> = session
            .marks
            .iter()
            .filter(|(_, marks)| !marks.is_empty())
            .filter_map(|(student_id, marks)| {
                let student = state.students.get(student_id)?;
                let entry = HomeworkLogEntry {
                    timestamp: now,
                    student_id: student.id.clone(),
                    student_first_name: student.first_name.clone(),
                    student_last_name: student.last_name.clone(),
                    homework_type: session.name.clone(),
                    comment: format!("From Live Homework Session ({mode_label} mode)."),
                    log_type,
                    homework_details: Some(marks.clone()),
                };
                Some(Command::with_timestamp(
                    CommandAction::AppendLogEntry(AppendLogEntry::homework(entry)),
                    now,
                ))
            })
            .collect();
        let name = session.name.clone();
        let logged = commands.len();

        if !commands.is_empty() {
            let label = format!("End Homework Session: {name}");
            self.run(CommandAction::Compound(CompoundCommand::new(label, commands)))?;
        }
        self.history.take_live_homework()?;
        self.history.report_status(&format!(
            "Homework Session '{name}' ended. {logged} student entries logged."
        ));
        Ok(logged)
    }

    pub fn discard_live_homework(&mut self) -> bool {
        self.history.discard_live_homework()
    }

    pub fn undo(&mut self) -> HistoryResult<bool> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> HistoryResult<bool> {
        self.history.redo()
    }

    pub fn revert_to(&mut self, index: usize) -> HistoryResult<usize> {
        self.history.revert_to(index)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.history()
    }

    pub fn flush(&mut self) -> HistoryResult<()> {
        self.history.flush()
    }

    fn run(&mut self, action: CommandAction) -> HistoryResult<()> {
        self.history.execute(Command::new(action))
    }

    fn student(&self, student_id: &str) -> HistoryResult<&Student> {
        self.history
            .state()
            .students
            .get(student_id)
            .ok_or_else(|| CommandError::StudentNotFound(student_id.to_string()).into())
    }

    fn behavior_entry(
        &self,
        student_id: &str,
        behavior: String,
        comment: String,
    ) -> HistoryResult<BehaviorLogEntry> {
        let student = self.student(student_id)?;
        Ok(BehaviorLogEntry {
            timestamp: Utc::now(),
            student_id: student.id.clone(),
            student_first_name: student.first_name.clone(),
            student_last_name: student.last_name.clone(),
            behavior,
            comment,
            log_type: BehaviorLogType::Behavior,
            score_details: None,
        })
    }
}
