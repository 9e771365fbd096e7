//! Alignment guide lines placed on the canvas rulers.

use crate::model::ids::IdKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// `v` guides are vertical lines at an x coordinate, `h` guides horizontal
/// lines at a y coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideOrientation {
    #[serde(rename = "v", alias = "vertical")]
    Vertical,
    #[serde(rename = "h", alias = "horizontal")]
    Horizontal,
}

impl GuideOrientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        }
    }

    fn letter(self) -> &'static str {
        match self {
            Self::Vertical => "v",
            Self::Horizontal => "h",
        }
    }

    /// Guide ID for counter value `n`, e.g. `guide_v_3`.
    pub fn format_id(self, n: u64) -> String {
        format!("{}_{}_{n}", IdKind::Guide.prefix(), self.letter())
    }
}

impl Display for GuideOrientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub id: String,
    #[serde(rename = "type")]
    pub orientation: GuideOrientation,
    pub world_coord: f64,
    /// Renderer-owned keys (canvas handles and the like), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Guide {
    pub fn new(id: impl Into<String>, orientation: GuideOrientation, world_coord: f64) -> Self {
        Self {
            id: id.into(),
            orientation,
            world_coord,
            extra: Map::new(),
        }
    }
}
