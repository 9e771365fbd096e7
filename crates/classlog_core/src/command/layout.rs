//! Position, size and style commands.
//!
//! Batch commands skip entries whose item no longer exists, so one stale
//! entry never blocks the rest of the batch.

use crate::command::{CommandError, CommandResult, Reversible};
use crate::model::classroom::ClassroomState;
use crate::model::ids::ItemKind;
use crate::model::student::{is_style_property, StyleValue};
use serde::{Deserialize, Serialize};

/// One item's move inside a [`MoveItems`] batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemKind,
    pub old_x: f64,
    pub old_y: f64,
    pub new_x: f64,
    pub new_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveItems {
    pub items_moves: Vec<MoveEntry>,
}

impl MoveItems {
    pub fn new(items_moves: Vec<MoveEntry>) -> Self {
        Self { items_moves }
    }

    /// Builds a batch from target positions, reading old positions from `state`.
    ///
    /// Targets whose item does not exist are dropped.
    pub fn capture<I>(state: &ClassroomState, targets: I) -> Self
    where
        I: IntoIterator<Item = (ItemKind, String, f64, f64)>,
    {
        let items_moves = targets
            .into_iter()
            .filter_map(|(item_type, id, new_x, new_y)| {
                let (old_x, old_y) = state.item_position(item_type, &id)?;
                Some(MoveEntry {
                    id,
                    item_type,
                    old_x,
                    old_y,
                    new_x,
                    new_y,
                })
            })
            .collect();
        Self { items_moves }
    }

    fn apply(&self, state: &mut ClassroomState, use_new: bool) {
        for entry in &self.items_moves {
            let (x, y) = if use_new {
                (entry.new_x, entry.new_y)
            } else {
                (entry.old_x, entry.old_y)
            };
            state.set_item_position(entry.item_type, &entry.id, x, y);
        }
    }
}

impl Reversible for MoveItems {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.apply(state, true);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.apply(state, false);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Move {} item(s)", self.items_moves.len())
    }
}

/// One item's resize inside a [`ChangeItemsSize`] batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemKind,
    pub old_w: f64,
    pub old_h: f64,
    pub new_w: f64,
    pub new_h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeItemsSize {
    pub items_sizes_changes: Vec<SizeEntry>,
}

impl ChangeItemsSize {
    pub fn new(items_sizes_changes: Vec<SizeEntry>) -> Self {
        Self {
            items_sizes_changes,
        }
    }

    /// Builds a batch from target sizes, reading old sizes from `state`.
    pub fn capture<I>(state: &ClassroomState, targets: I) -> Self
    where
        I: IntoIterator<Item = (ItemKind, String, f64, f64)>,
    {
        let items_sizes_changes = targets
            .into_iter()
            .filter_map(|(item_type, id, new_w, new_h)| {
                let (_, _, old_w, old_h) = state.item_bounds(item_type, &id)?;
                Some(SizeEntry {
                    id,
                    item_type,
                    old_w,
                    old_h,
                    new_w,
                    new_h,
                })
            })
            .collect();
        Self {
            items_sizes_changes,
        }
    }

    fn apply(&self, state: &mut ClassroomState, use_new: bool) {
        for entry in &self.items_sizes_changes {
            let (w, h) = if use_new {
                (entry.new_w, entry.new_h)
            } else {
                (entry.old_w, entry.old_h)
            };
            state.set_item_size(entry.item_type, &entry.id, w, h);
        }
    }
}

impl Reversible for ChangeItemsSize {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.apply(state, true);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.apply(state, false);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Resize {} item(s)", self.items_sizes_changes.len())
    }
}

/// Sets (`Some`) or clears (`None`) one per-student style override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStudentStyle {
    pub student_id: String,
    pub style_property: String,
    #[serde(default)]
    pub old_value: Option<StyleValue>,
    #[serde(default)]
    pub new_value: Option<StyleValue>,
}

impl ChangeStudentStyle {
    /// Reads the current override so undo can restore it.
    pub fn capture(
        state: &ClassroomState,
        student_id: &str,
        style_property: &str,
        new_value: Option<StyleValue>,
    ) -> CommandResult<Self> {
        let student = state
            .students
            .get(student_id)
            .ok_or_else(|| CommandError::StudentNotFound(student_id.to_string()))?;
        Ok(Self {
            student_id: student_id.to_string(),
            style_property: style_property.to_string(),
            old_value: student.style_overrides.get(style_property).cloned(),
            new_value,
        })
    }

    fn apply(&self, state: &mut ClassroomState, value: Option<&StyleValue>) {
        let Some(student) = state.students.get_mut(&self.student_id) else {
            return;
        };
        match value {
            Some(value) => {
                student
                    .style_overrides
                    .insert(self.style_property.clone(), value.clone());
            }
            None => {
                student.style_overrides.remove(&self.style_property);
            }
        }
    }
}

impl Reversible for ChangeStudentStyle {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if !is_style_property(&self.style_property) {
            return Err(CommandError::InvalidStyleProperty(
                self.style_property.clone(),
            ));
        }
        if !state.students.contains_key(&self.student_id) {
            return Err(CommandError::StudentNotFound(self.student_id.clone()));
        }
        let value = self.new_value.clone();
        self.apply(state, value.as_ref());
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        let value = self.old_value.clone();
        self.apply(state, value.as_ref());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Style change: {} for {}", self.style_property, self.student_id)
    }
}
