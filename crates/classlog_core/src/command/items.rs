//! Add, delete and edit commands for canvas items.
//!
//! # Invariants
//! - Undoing an add restores every ID counter to its pre-add value.
//! - Undoing a delete restores the entity and every captured log entry exactly
//!   once, even after repeated undo/redo cycles.
//! - Undoing an edit restores only the fields the edit touched.

use crate::command::{CommandError, CommandResult, Reversible};
use crate::model::classroom::{ClassroomState, ItemData};
use crate::model::furniture::FurniturePatch;
use crate::model::ids::{id_suffix, ItemKind};
use crate::model::log_entry::{insert_unique_sorted, BehaviorLogEntry, HomeworkLogEntry};
use crate::model::student::StudentPatch;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn ensure_group_exists(state: &ClassroomState, group_id: Option<&str>) -> CommandResult<()> {
    match group_id {
        Some(id) if !state.groups.contains_key(id) => {
            Err(CommandError::GroupNotFound(id.to_string()))
        }
        _ => Ok(()),
    }
}

fn snapshot_group(data: &ItemData) -> Option<&str> {
    match data {
        ItemData::Student(student) => student.group_id.as_deref(),
        ItemData::Furniture(_) => None,
    }
}

/// Inserts a new student or furniture item and advances its ID counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddItem {
    pub item_id: String,
    pub item_type: ItemKind,
    pub item_data: ItemData,
    #[serde(rename = "old_next_id_num")]
    pub old_next_id: u64,
    /// Counter value after the add. `None` only for legacy records that
    /// carried no value; execute then keeps the counter above the new ID.
    #[serde(rename = "next_id_num_after_add", skip_serializing_if = "Option::is_none")]
    pub next_id_after_add: Option<u64>,
}

#[derive(Deserialize)]
struct AddItemWire {
    item_id: String,
    item_type: ItemKind,
    item_data: Value,
    #[serde(default)]
    old_next_id_num: Option<u64>,
    #[serde(default)]
    next_id_num_after_add: Option<u64>,
}

impl AddItem {
    /// Builds the add for a freshly allocated item.
    ///
    /// `old_next_id` is the counter value the item's ID was taken from.
    pub fn new(item_data: ItemData, old_next_id: u64) -> Self {
        Self {
            item_id: item_data.id().to_string(),
            item_type: item_data.kind(),
            item_data,
            old_next_id,
            next_id_after_add: Some(old_next_id.saturating_add(1)),
        }
    }

    pub(crate) fn decode(data: &Value) -> serde_json::Result<Self> {
        let wire = AddItemWire::deserialize(data)?;
        // Older records kept the post-add counter inside the item snapshot.
        let embedded = wire
            .item_data
            .get("original_next_id_num_after_add")
            .and_then(Value::as_u64);
        let item_data = ItemData::deserialize(&wire.item_data)?;
        if item_data.kind() != wire.item_type {
            return Err(serde_json::Error::custom(format!(
                "item_data is not a {}",
                wire.item_type
            )));
        }
        let old_next_id = wire
            .old_next_id_num
            .or_else(|| id_suffix(wire.item_type.id_kind(), &wire.item_id))
            .unwrap_or(1);
        Ok(Self {
            item_id: wire.item_id,
            item_type: wire.item_type,
            item_data,
            old_next_id,
            next_id_after_add: wire.next_id_num_after_add.or(embedded),
        })
    }
}

impl Reversible for AddItem {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if self.item_data.kind() != self.item_type {
            return Err(CommandError::KindMismatch {
                expected: self.item_type,
                actual: self.item_data.kind(),
            });
        }
        if self.item_data.id() != self.item_id {
            return Err(CommandError::IdMismatch {
                expected: self.item_id.clone(),
                actual: self.item_data.id().to_string(),
            });
        }
        if state.contains_item(self.item_type, &self.item_id) {
            return Err(CommandError::DuplicateItem {
                kind: self.item_type,
                id: self.item_id.clone(),
            });
        }
        ensure_group_exists(state, snapshot_group(&self.item_data))?;

        let id_kind = self.item_type.id_kind();
        let next = match self.next_id_after_add {
            Some(value) => value,
            None => {
                let floor = id_suffix(id_kind, &self.item_id).map_or(0, |n| n.saturating_add(1));
                state.counters.get(id_kind).max(floor)
            }
        };
        state.insert_item(self.item_data.clone());
        state.counters.set(id_kind, next);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        state.remove_item(self.item_type, &self.item_id);
        state.counters.set(self.item_type.id_kind(), self.old_next_id);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Add {}: {}", self.item_type, self.item_data.display_name())
    }
}

/// Removes an item; for students also removes every log entry referencing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub item_id: String,
    pub item_type: ItemKind,
    pub item_data: ItemData,
    #[serde(default)]
    pub associated_logs: Vec<BehaviorLogEntry>,
    #[serde(default)]
    pub associated_homework_logs: Vec<HomeworkLogEntry>,
}

impl DeleteItem {
    /// Captures the item and its dependent logs before deletion.
    pub fn capture(state: &ClassroomState, kind: ItemKind, item_id: &str) -> CommandResult<Self> {
        let item_data = state
            .item_snapshot(kind, item_id)
            .ok_or_else(|| CommandError::ItemNotFound {
                kind,
                id: item_id.to_string(),
            })?;
        let (associated_logs, associated_homework_logs) = match kind {
            ItemKind::Student => (
                state.behavior_entries_for(item_id),
                state.homework_entries_for(item_id),
            ),
            ItemKind::Furniture => (Vec::new(), Vec::new()),
        };
        Ok(Self {
            item_id: item_id.to_string(),
            item_type: kind,
            item_data,
            associated_logs,
            associated_homework_logs,
        })
    }

    pub(crate) fn decode(data: &Value) -> serde_json::Result<Self> {
        let command = Self::deserialize(data)?;
        if command.item_data.kind() != command.item_type {
            return Err(serde_json::Error::custom(format!(
                "item_data is not a {}",
                command.item_type
            )));
        }
        Ok(command)
    }
}

impl Reversible for DeleteItem {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if !state.contains_item(self.item_type, &self.item_id) {
            return Err(CommandError::ItemNotFound {
                kind: self.item_type,
                id: self.item_id.clone(),
            });
        }
        state.remove_item(self.item_type, &self.item_id);
        if self.item_type == ItemKind::Student {
            let id = self.item_id.as_str();
            state.behavior_log.retain(|entry| entry.student_id != id);
            state.homework_log.retain(|entry| entry.student_id != id);
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        state.insert_item(self.item_data.clone());
        for entry in &self.associated_logs {
            insert_unique_sorted(&mut state.behavior_log, entry, |e| e.timestamp);
        }
        for entry in &self.associated_homework_logs {
            insert_unique_sorted(&mut state.homework_log, entry, |e| e.timestamp);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Delete {}: {}", self.item_type, self.item_data.display_name())
    }
}

/// Changed-fields-only update for either item kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPatch {
    Student(StudentPatch),
    Furniture(FurniturePatch),
}

impl ItemPatch {
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Student(_) => ItemKind::Student,
            Self::Furniture(_) => ItemKind::Furniture,
        }
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        match self {
            Self::Student(patch) => patch.changed_fields(),
            Self::Furniture(patch) => patch.changed_fields(),
        }
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Self::Student(patch) => serde_json::to_value(patch),
            Self::Furniture(patch) => serde_json::to_value(patch),
        }
    }

    /// `full_name` in student changes is derived from the name fields and is
    /// dropped; any other unknown key fails the decode.
    fn from_value(kind: ItemKind, value: &Value) -> serde_json::Result<Self> {
        match kind {
            ItemKind::Student => {
                let mut changes = value.clone();
                if let Some(map) = changes.as_object_mut() {
                    map.remove("full_name");
                }
                StudentPatch::deserialize(&changes).map(Self::Student)
            }
            ItemKind::Furniture => FurniturePatch::deserialize(value).map(Self::Furniture),
        }
    }

    /// Patch that restores the touched fields from `snapshot`.
    fn inverse_from(&self, snapshot: &ItemData) -> Option<ItemPatch> {
        match (self, snapshot) {
            (Self::Student(patch), ItemData::Student(student)) => {
                Some(Self::Student(patch.inverse_from(student)))
            }
            (Self::Furniture(patch), ItemData::Furniture(item)) => {
                Some(Self::Furniture(patch.inverse_from(item)))
            }
            _ => None,
        }
    }

    /// Applies to the live item. Returns `false` when the item is gone.
    fn apply(&self, state: &mut ClassroomState, item_id: &str) -> bool {
        match self {
            Self::Student(patch) => state
                .students
                .get_mut(item_id)
                .map(|student| patch.apply_to(student))
                .is_some(),
            Self::Furniture(patch) => state
                .furniture
                .get_mut(item_id)
                .map(|item| patch.apply_to(item))
                .is_some(),
        }
    }

    fn assigned_group(&self) -> Option<&str> {
        match self {
            Self::Student(patch) => patch.assigned_group(),
            Self::Furniture(_) => None,
        }
    }

    fn unsupported_style_property(&self) -> Option<&str> {
        match self {
            Self::Student(patch) => patch.unsupported_style_property(),
            Self::Furniture(_) => None,
        }
    }
}

/// Field-level edit of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct EditItem {
    pub item_id: String,
    pub item_type: ItemKind,
    /// Full item as it was before the edit.
    pub old_snapshot: ItemData,
    pub changes: ItemPatch,
}

#[derive(Deserialize)]
struct EditItemWire {
    item_id: String,
    item_type: ItemKind,
    old_item_data_snapshot: Value,
    new_item_data_changes: Value,
}

impl EditItem {
    /// Captures the current item and pairs it with `changes`.
    pub fn capture(state: &ClassroomState, item_id: &str, changes: ItemPatch) -> CommandResult<Self> {
        let kind = changes.kind();
        let old_snapshot = state
            .item_snapshot(kind, item_id)
            .ok_or_else(|| CommandError::ItemNotFound {
                kind,
                id: item_id.to_string(),
            })?;
        Ok(Self {
            item_id: item_id.to_string(),
            item_type: kind,
            old_snapshot,
            changes,
        })
    }

    pub(crate) fn to_data(&self) -> serde_json::Result<Value> {
        Ok(json!({
            "item_id": self.item_id,
            "item_type": self.item_type,
            "old_item_data_snapshot": serde_json::to_value(&self.old_snapshot)?,
            "new_item_data_changes": self.changes.to_value()?,
        }))
    }

    pub(crate) fn decode(data: &Value) -> serde_json::Result<Self> {
        let wire = EditItemWire::deserialize(data)?;
        let old_snapshot = ItemData::deserialize(&wire.old_item_data_snapshot)?;
        if old_snapshot.kind() != wire.item_type {
            return Err(serde_json::Error::custom(format!(
                "old_item_data_snapshot is not a {}",
                wire.item_type
            )));
        }
        let changes = ItemPatch::from_value(wire.item_type, &wire.new_item_data_changes)?;
        Ok(Self {
            item_id: wire.item_id,
            item_type: wire.item_type,
            old_snapshot,
            changes,
        })
    }
}

impl Reversible for EditItem {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if self.changes.kind() != self.item_type {
            return Err(CommandError::KindMismatch {
                expected: self.item_type,
                actual: self.changes.kind(),
            });
        }
        if !state.contains_item(self.item_type, &self.item_id) {
            return Err(CommandError::ItemNotFound {
                kind: self.item_type,
                id: self.item_id.clone(),
            });
        }
        if let Some(property) = self.changes.unsupported_style_property() {
            return Err(CommandError::InvalidStyleProperty(property.to_string()));
        }
        ensure_group_exists(state, self.changes.assigned_group())?;
        self.changes.apply(state, &self.item_id);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        let inverse = self
            .changes
            .inverse_from(&self.old_snapshot)
            .ok_or(CommandError::KindMismatch {
                expected: self.item_type,
                actual: self.old_snapshot.kind(),
            })?;
        ensure_group_exists(state, inverse.assigned_group())?;
        // A vanished item has nothing left to restore.
        inverse.apply(state, &self.item_id);
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "Edit {}: {} ({})",
            self.item_type,
            self.old_snapshot.display_name(),
            self.changes.changed_fields().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AddItem, DeleteItem, EditItem, ItemPatch};
    use crate::command::{CommandError, Reversible};
    use crate::model::classroom::{ClassroomState, ItemData};
    use crate::model::student::{Student, StudentPatch};
    use serde_json::json;

    fn add_student(state: &mut ClassroomState, n: u64, first: &str) -> AddItem {
        let student = Student::new(format!("student_{n}"), first, "Test", 0.0, 0.0);
        let mut add = AddItem::new(ItemData::Student(student), n);
        add.execute(state).expect("add student");
        add
    }

    #[test]
    fn add_rejects_duplicate_id_without_touching_counters() {
        let mut state = ClassroomState::new();
        add_student(&mut state, 1, "Ada");
        let before = state.clone();

        let mut dup = AddItem::new(
            ItemData::Student(Student::new("student_1", "Other", "Kid", 0.0, 0.0)),
            1,
        );
        let err = dup.execute(&mut state).expect_err("duplicate must fail");
        assert!(matches!(err, CommandError::DuplicateItem { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn add_undo_restores_counter_even_after_later_moves() {
        let mut state = ClassroomState::new();
        let mut add = add_student(&mut state, 1, "Ada");
        assert_eq!(state.counters.next_student_id, 2);
        state.counters.next_student_id = 9;

        add.undo(&mut state).expect("undo add");
        assert!(state.students.is_empty());
        assert_eq!(state.counters.next_student_id, 1);
    }

    #[test]
    fn add_decode_reads_counter_embedded_in_item_data() {
        let data = json!({
            "item_id": "student_3",
            "item_type": "student",
            "item_data": {
                "id": "student_3", "first_name": "Grace", "last_name": "Hopper",
                "x": 5.0, "y": 6.0, "original_next_id_num_after_add": 4
            },
            "old_next_id_num": 3
        });
        let add = AddItem::decode(&data).expect("legacy add");
        assert_eq!(add.next_id_after_add, Some(4));
        assert_eq!(add.old_next_id, 3);
    }

    #[test]
    fn delete_undo_redo_keeps_logs_single() {
        let mut state = ClassroomState::new();
        add_student(&mut state, 1, "Ada");
        state.behavior_log.push(crate::model::log_entry::BehaviorLogEntry {
            timestamp: chrono::Utc::now(),
            student_id: "student_1".to_string(),
            student_first_name: "Ada".to_string(),
            student_last_name: "Test".to_string(),
            behavior: "Talking".to_string(),
            comment: String::new(),
            log_type: Default::default(),
            score_details: None,
        });

        let mut delete =
            DeleteItem::capture(&state, crate::model::ids::ItemKind::Student, "student_1")
                .expect("capture");
        for _ in 0..3 {
            delete.execute(&mut state).expect("delete");
            assert!(state.behavior_log.is_empty());
            delete.undo(&mut state).expect("restore");
        }
        assert_eq!(state.behavior_log.len(), 1);
        assert!(state.students.contains_key("student_1"));
    }

    #[test]
    fn edit_undo_leaves_untouched_fields_alone() {
        let mut state = ClassroomState::new();
        add_student(&mut state, 1, "Ada");
        let patch = ItemPatch::Student(StudentPatch {
            first_name: Some("Augusta".to_string()),
            ..StudentPatch::default()
        });
        let mut edit = EditItem::capture(&state, "student_1", patch).expect("capture edit");
        edit.execute(&mut state).expect("edit");
        state.students.get_mut("student_1").expect("student").x = 42.0;

        edit.undo(&mut state).expect("undo edit");
        let student = &state.students["student_1"];
        assert_eq!(student.first_name, "Ada");
        assert_eq!(student.x, 42.0);
    }

    #[test]
    fn edit_rejects_unknown_group() {
        let mut state = ClassroomState::new();
        add_student(&mut state, 1, "Ada");
        let patch = ItemPatch::Student(StudentPatch {
            group_id: Some(Some("group_7".to_string())),
            ..StudentPatch::default()
        });
        let mut edit = EditItem::capture(&state, "student_1", patch).expect("capture edit");
        assert_eq!(
            edit.execute(&mut state),
            Err(CommandError::GroupNotFound("group_7".to_string()))
        );
    }
}
