//! Aggregate classroom state mutated by commands.
//!
//! # Responsibility
//! - Own every entity collection plus settings and counters.
//! - Provide lookup helpers shared by command implementations.
//!
//! # Invariants
//! - Map keys equal the `id` field of the stored record.
//! - `behavior_log` and `homework_log` are sorted by timestamp.

use crate::model::furniture::FurnitureItem;
use crate::model::group::Group;
use crate::model::guide::Guide;
use crate::model::ids::{IdCounters, IdKind, ItemKind};
use crate::model::live::{LiveHomeworkSession, LiveQuizSession};
use crate::model::log_entry::{BehaviorLogEntry, HomeworkLogEntry};
use crate::model::settings::{DisplaySettings, PreservedKeys};
use crate::model::student::Student;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of one canvas item, as carried by add/delete commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemData {
    Student(Student),
    Furniture(FurnitureItem),
}

impl ItemData {
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Student(_) => ItemKind::Student,
            Self::Furniture(_) => ItemKind::Furniture,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Student(student) => student.id.as_str(),
            Self::Furniture(item) => item.id.as_str(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Student(student) => student.full_name(),
            Self::Furniture(item) => item.name.clone(),
        }
    }
}

/// Mutable in-memory classroom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassroomState {
    pub students: BTreeMap<String, Student>,
    pub furniture: BTreeMap<String, FurnitureItem>,
    pub behavior_log: Vec<BehaviorLogEntry>,
    pub homework_log: Vec<HomeworkLogEntry>,
    pub groups: BTreeMap<String, Group>,
    pub guides: BTreeMap<String, Guide>,
    pub settings: DisplaySettings,
    pub counters: IdCounters,
    /// Loaded keys with no model counterpart; commands never touch them.
    pub preserved: PreservedKeys,
    pub live_quiz: Option<LiveQuizSession>,
    pub live_homework: Option<LiveHomeworkSession>,
}

impl ClassroomState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_item(&self, kind: ItemKind, id: &str) -> bool {
        match kind {
            ItemKind::Student => self.students.contains_key(id),
            ItemKind::Furniture => self.furniture.contains_key(id),
        }
    }

    /// Owned snapshot of a live item.
    pub fn item_snapshot(&self, kind: ItemKind, id: &str) -> Option<ItemData> {
        match kind {
            ItemKind::Student => self.students.get(id).cloned().map(ItemData::Student),
            ItemKind::Furniture => self.furniture.get(id).cloned().map(ItemData::Furniture),
        }
    }

    pub fn insert_item(&mut self, data: ItemData) {
        match data {
            ItemData::Student(student) => {
                self.students.insert(student.id.clone(), student);
            }
            ItemData::Furniture(item) => {
                self.furniture.insert(item.id.clone(), item);
            }
        }
    }

    pub fn remove_item(&mut self, kind: ItemKind, id: &str) -> Option<ItemData> {
        match kind {
            ItemKind::Student => self.students.remove(id).map(ItemData::Student),
            ItemKind::Furniture => self.furniture.remove(id).map(ItemData::Furniture),
        }
    }

    /// Current `(x, y)` of an item.
    pub fn item_position(&self, kind: ItemKind, id: &str) -> Option<(f64, f64)> {
        match kind {
            ItemKind::Student => self.students.get(id).map(|s| (s.x, s.y)),
            ItemKind::Furniture => self.furniture.get(id).map(|f| (f.x, f.y)),
        }
    }

    /// Current `(x, y, width, height)` of an item.
    pub fn item_bounds(&self, kind: ItemKind, id: &str) -> Option<(f64, f64, f64, f64)> {
        match kind {
            ItemKind::Student => self.students.get(id).map(|s| (s.x, s.y, s.width, s.height)),
            ItemKind::Furniture => self
                .furniture
                .get(id)
                .map(|f| (f.x, f.y, f.width, f.height)),
        }
    }

    /// Sets an item's position. Returns `false` when the item is gone.
    pub fn set_item_position(&mut self, kind: ItemKind, id: &str, x: f64, y: f64) -> bool {
        match kind {
            ItemKind::Student => self.students.get_mut(id).map(|s| {
                s.x = x;
                s.y = y;
            }),
            ItemKind::Furniture => self.furniture.get_mut(id).map(|f| {
                f.x = x;
                f.y = y;
            }),
        }
        .is_some()
    }

    /// Sets an item's size. Returns `false` when the item is gone.
    pub fn set_item_size(&mut self, kind: ItemKind, id: &str, width: f64, height: f64) -> bool {
        match kind {
            ItemKind::Student => self.students.get_mut(id).map(|s| {
                s.width = width;
                s.height = height;
            }),
            ItemKind::Furniture => self.furniture.get_mut(id).map(|f| {
                f.width = width;
                f.height = height;
            }),
        }
        .is_some()
    }

    /// Behavior/quiz entries referencing `student_id`, in log order.
    pub fn behavior_entries_for(&self, student_id: &str) -> Vec<BehaviorLogEntry> {
        self.behavior_log
            .iter()
            .filter(|entry| entry.student_id == student_id)
            .cloned()
            .collect()
    }

    /// Homework entries referencing `student_id`, in log order.
    pub fn homework_entries_for(&self, student_id: &str) -> Vec<HomeworkLogEntry> {
        self.homework_log
            .iter()
            .filter(|entry| entry.student_id == student_id)
            .cloned()
            .collect()
    }

    /// Current student -> group mapping for students that have a group.
    pub fn group_assignments(&self) -> BTreeMap<String, String> {
        self.students
            .values()
            .filter_map(|student| {
                student
                    .group_id
                    .as_ref()
                    .map(|group_id| (student.id.clone(), group_id.clone()))
            })
            .collect()
    }

    pub fn sort_logs(&mut self) {
        self.behavior_log.sort_by_key(|entry| entry.timestamp);
        self.homework_log.sort_by_key(|entry| entry.timestamp);
    }

    /// Re-derives every counter from live IDs. Returns the kinds that moved.
    pub fn heal_counters(&mut self) -> Vec<(IdKind, u64, u64)> {
        let mut healed = Vec::new();
        let kinds = [
            (IdKind::Student, self.students.keys().map(String::as_str).collect::<Vec<_>>()),
            (IdKind::Furniture, self.furniture.keys().map(String::as_str).collect()),
            (IdKind::Group, self.groups.keys().map(String::as_str).collect()),
            (IdKind::Guide, self.guides.keys().map(String::as_str).collect()),
        ];
        let mut counters = self.counters;
        for (kind, ids) in kinds {
            if let Some(previous) = counters.heal(kind, ids) {
                healed.push((kind, previous, counters.get(kind)));
            }
        }
        self.counters = counters;
        healed
    }

    /// Clears `group_id` on students whose group no longer exists.
    ///
    /// Returns the IDs of students that were detached.
    pub fn detach_dangling_groups(&mut self) -> Vec<String> {
        let mut detached = Vec::new();
        for student in self.students.values_mut() {
            let dangling = student
                .group_id
                .as_ref()
                .is_some_and(|group_id| !self.groups.contains_key(group_id));
            if dangling {
                student.group_id = None;
                detached.push(student.id.clone());
            }
        }
        detached
    }
}
