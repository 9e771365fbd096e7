//! Add, move and delete commands for ruler guides.
//!
//! # Invariants
//! - Undoing an add removes the guide and restores the guide counter.
//! - Guide moves skip guides that no longer exist, like item moves do.

use crate::command::{CommandError, CommandResult, Reversible};
use crate::model::classroom::ClassroomState;
use crate::model::guide::Guide;
use crate::model::ids::{id_suffix, IdKind};
use serde::{Deserialize, Serialize};

fn orientation_label(guide: &Guide) -> String {
    guide.orientation.as_str().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddGuide {
    pub item_id: String,
    pub item_type: String,
    pub item_data: Guide,
    #[serde(rename = "old_next_id_num")]
    pub old_next_id: u64,
    #[serde(rename = "next_id_num_after_add", skip_serializing_if = "Option::is_none")]
    pub next_id_after_add: Option<u64>,
}

#[derive(Deserialize)]
struct AddGuideWire {
    item_id: String,
    item_data: Guide,
    #[serde(default)]
    old_next_id_num: Option<u64>,
    #[serde(default)]
    next_id_num_after_add: Option<u64>,
}

impl AddGuide {
    /// `old_next_id` is the counter value the guide's ID was taken from.
    pub fn new(guide: Guide, old_next_id: u64) -> Self {
        Self {
            item_id: guide.id.clone(),
            item_type: orientation_label(&guide),
            item_data: guide,
            old_next_id,
            next_id_after_add: Some(old_next_id.saturating_add(1)),
        }
    }

    pub(crate) fn decode(data: &serde_json::Value) -> serde_json::Result<Self> {
        let wire = AddGuideWire::deserialize(data)?;
        let old_next_id = wire
            .old_next_id_num
            .or_else(|| id_suffix(IdKind::Guide, &wire.item_id))
            .unwrap_or(1);
        Ok(Self {
            item_id: wire.item_id,
            item_type: orientation_label(&wire.item_data),
            item_data: wire.item_data,
            old_next_id,
            next_id_after_add: wire.next_id_num_after_add,
        })
    }
}

impl Reversible for AddGuide {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if self.item_data.id != self.item_id {
            return Err(CommandError::IdMismatch {
                expected: self.item_id.clone(),
                actual: self.item_data.id.clone(),
            });
        }
        if state.guides.contains_key(&self.item_id) {
            return Err(CommandError::DuplicateGuide(self.item_id.clone()));
        }
        let next = match self.next_id_after_add {
            Some(value) => value,
            None => {
                let floor =
                    id_suffix(IdKind::Guide, &self.item_id).map_or(0, |n| n.saturating_add(1));
                state.counters.get(IdKind::Guide).max(floor)
            }
        };
        state
            .guides
            .insert(self.item_id.clone(), self.item_data.clone());
        state.counters.set(IdKind::Guide, next);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        state.guides.remove(&self.item_id);
        state.counters.set(IdKind::Guide, self.old_next_id);
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "Add {} guide at {}",
            self.item_data.orientation, self.item_data.world_coord
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideMove {
    pub id: String,
    pub old_coord: f64,
    pub new_coord: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveGuides {
    pub items_moves: Vec<GuideMove>,
}

impl MoveGuides {
    /// Builds a batch from target coordinates. Unknown guides are dropped.
    pub fn capture<I>(state: &ClassroomState, targets: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let items_moves = targets
            .into_iter()
            .filter_map(|(id, new_coord)| {
                let old_coord = state.guides.get(&id)?.world_coord;
                Some(GuideMove {
                    id,
                    old_coord,
                    new_coord,
                })
            })
            .collect();
        Self { items_moves }
    }

    fn apply(&self, state: &mut ClassroomState, use_new: bool) {
        for entry in &self.items_moves {
            if let Some(guide) = state.guides.get_mut(&entry.id) {
                guide.world_coord = if use_new {
                    entry.new_coord
                } else {
                    entry.old_coord
                };
            }
        }
    }
}

impl Reversible for MoveGuides {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.apply(state, true);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.apply(state, false);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Move {} guide(s)", self.items_moves.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteGuide {
    pub item_id: String,
    pub item_type: String,
    pub item_data: Guide,
}

#[derive(Deserialize)]
struct DeleteGuideWire {
    item_id: String,
    item_data: Guide,
}

impl DeleteGuide {
    pub fn capture(state: &ClassroomState, guide_id: &str) -> CommandResult<Self> {
        let guide = state
            .guides
            .get(guide_id)
            .ok_or_else(|| CommandError::GuideNotFound(guide_id.to_string()))?;
        Ok(Self {
            item_id: guide.id.clone(),
            item_type: orientation_label(guide),
            item_data: guide.clone(),
        })
    }

    pub(crate) fn decode(data: &serde_json::Value) -> serde_json::Result<Self> {
        let wire = DeleteGuideWire::deserialize(data)?;
        Ok(Self {
            item_id: wire.item_id,
            item_type: orientation_label(&wire.item_data),
            item_data: wire.item_data,
        })
    }
}

impl Reversible for DeleteGuide {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if state.guides.remove(&self.item_id).is_none() {
            return Err(CommandError::GuideNotFound(self.item_id.clone()));
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if state.guides.contains_key(&self.item_id) {
            return Err(CommandError::DuplicateGuide(self.item_id.clone()));
        }
        state
            .guides
            .insert(self.item_id.clone(), self.item_data.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "Delete {} guide at {}",
            self.item_data.orientation, self.item_data.world_coord
        )
    }
}
