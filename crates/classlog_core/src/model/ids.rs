//! ID allocation counters.
//!
//! # Invariants
//! - For every kind, the counter is strictly greater than the largest numeric
//!   suffix among live IDs of that kind once [`IdCounters::heal`] has run.
//! - IDs that do not match `<prefix>_<digits>` never move a counter. Guide IDs
//!   may carry an orientation letter: `guide_v_<digits>`, `guide_h_<digits>`.
//! - A stored counter that is not a positive integer reads as 1 and is
//!   re-derived by `heal`; it never fails a load.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

static ID_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z]+)(?:_([vh]))?_(\d+)$").expect("valid id suffix regex")
});

/// Canvas item families addressed by add/delete/edit/move commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Student,
    Furniture,
}

impl ItemKind {
    pub fn id_kind(self) -> IdKind {
        match self {
            Self::Student => IdKind::Student,
            Self::Furniture => IdKind::Furniture,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Furniture => "furniture",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity families that own an ID counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Student,
    Furniture,
    Group,
    Guide,
}

impl IdKind {
    pub const ALL: [IdKind; 4] = [Self::Student, Self::Furniture, Self::Group, Self::Guide];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Furniture => "furniture",
            Self::Group => "group",
            Self::Guide => "guide",
        }
    }

    /// Settings key the counter is written under, plus its legacy alias.
    fn counter_keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Student => ("next_student_id", "next_student_id_num"),
            Self::Furniture => ("next_furniture_id", "next_furniture_id_num"),
            Self::Group => ("next_group_id", "next_group_id_num"),
            Self::Guide => ("next_guide_id", "next_guide_id_num"),
        }
    }

    /// Formats the ID handed out for counter value `n`.
    pub fn format_id(self, n: u64) -> String {
        format!("{}_{n}", self.prefix())
    }
}

/// Numeric suffix of `id` when it has the shape `<kind prefix>_<n>`.
pub fn id_suffix(kind: IdKind, id: &str) -> Option<u64> {
    let captures = ID_SUFFIX_RE.captures(id)?;
    if captures.get(1)?.as_str() != kind.prefix() {
        return None;
    }
    if captures.get(2).is_some() && kind != IdKind::Guide {
        return None;
    }
    captures.get(3)?.as_str().parse().ok()
}

/// Reads a stored counter. Anything but a positive integer becomes 1.
pub fn counter_from_value(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n >= 1.0 && *n < u64::MAX as f64)
                .map(|n| n as u64)
        })
        .filter(|n| *n >= 1)
        .unwrap_or(1)
}

fn lenient_counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| counter_from_value(&value))
}

/// Next-ID counters, persisted inside the envelope `settings` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    #[serde(
        default = "first_id",
        alias = "next_student_id_num",
        deserialize_with = "lenient_counter"
    )]
    pub next_student_id: u64,
    #[serde(
        default = "first_id",
        alias = "next_furniture_id_num",
        deserialize_with = "lenient_counter"
    )]
    pub next_furniture_id: u64,
    #[serde(
        default = "first_id",
        alias = "next_group_id_num",
        deserialize_with = "lenient_counter"
    )]
    pub next_group_id: u64,
    #[serde(
        default = "first_id",
        alias = "next_guide_id_num",
        deserialize_with = "lenient_counter"
    )]
    pub next_guide_id: u64,
}

fn first_id() -> u64 {
    1
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            next_student_id: 1,
            next_furniture_id: 1,
            next_group_id: 1,
            next_guide_id: 1,
        }
    }
}

impl IdCounters {
    pub fn get(&self, kind: IdKind) -> u64 {
        match kind {
            IdKind::Student => self.next_student_id,
            IdKind::Furniture => self.next_furniture_id,
            IdKind::Group => self.next_group_id,
            IdKind::Guide => self.next_guide_id,
        }
    }

    pub fn set(&mut self, kind: IdKind, value: u64) {
        match kind {
            IdKind::Student => self.next_student_id = value,
            IdKind::Furniture => self.next_furniture_id = value,
            IdKind::Group => self.next_group_id = value,
            IdKind::Guide => self.next_guide_id = value,
        }
    }

    /// Removes every counter key (current and legacy names) from a settings
    /// map. The current name wins when both are present.
    pub fn take_from(map: &mut Map<String, Value>) -> Self {
        let mut counters = Self::default();
        for kind in IdKind::ALL {
            let (key, legacy) = kind.counter_keys();
            let current = map.remove(key);
            let old = map.remove(legacy);
            if let Some(value) = current.or(old) {
                counters.set(kind, counter_from_value(&value));
            }
        }
        counters
    }

    /// Writes every counter under its current key.
    pub fn write_into(&self, map: &mut Map<String, Value>) {
        for kind in IdKind::ALL {
            let (key, _) = kind.counter_keys();
            map.insert(key.to_string(), Value::from(self.get(kind)));
        }
    }

    /// Raises the counter to `1 + max suffix` among `ids` when it is stale.
    ///
    /// Returns the previous value when the counter had to move.
    pub fn heal<'a, I>(&mut self, kind: IdKind, ids: I) -> Option<u64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max_suffix = ids
            .into_iter()
            .filter_map(|id| id_suffix(kind, id))
            .max()
            .unwrap_or(0);
        let stored = self.get(kind);
        let healed = stored.max(max_suffix.saturating_add(1)).max(1);
        if healed == stored {
            return None;
        }
        self.set(kind, healed);
        Some(stored)
    }
}
