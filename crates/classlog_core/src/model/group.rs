//! Student group record.

use serde::{Deserialize, Serialize};

/// Palette offered for new groups, cycled by group number.
pub const DEFAULT_GROUP_COLORS: &[&str] = &[
    "#FFADAD", "#FFD6A5", "#FDFFB6", "#CAFFBF", "#9BF6FF", "#A0C4FF", "#BDB2FF", "#FFC6FF",
    "#E0E0E0",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub notes: String,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            notes: String::new(),
        }
    }
}

/// Palette color for the `n`-th group (1-based numbering wraps around).
pub fn default_group_color(n: u64) -> &'static str {
    let index = (n.saturating_sub(1) as usize) % DEFAULT_GROUP_COLORS.len();
    DEFAULT_GROUP_COLORS[index]
}
