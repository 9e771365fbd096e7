//! Furniture record and partial-update patch.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FURNITURE_FILL_COLOR: &str = "lightgray";
pub const DEFAULT_FURNITURE_OUTLINE_COLOR: &str = "dimgray";

/// Non-student item on the seating chart (desk, table, door...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureItem {
    pub id: String,
    pub name: String,
    #[serde(default = "default_furniture_type", alias = "type")]
    pub furniture_type: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_fill_color")]
    pub fill_color: String,
    #[serde(default = "default_outline_color")]
    pub outline_color: String,
}

fn default_furniture_type() -> String {
    "desk".to_string()
}

fn default_fill_color() -> String {
    DEFAULT_FURNITURE_FILL_COLOR.to_string()
}

fn default_outline_color() -> String {
    DEFAULT_FURNITURE_OUTLINE_COLOR.to_string()
}

impl FurnitureItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        furniture_type: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            furniture_type: furniture_type.into(),
            x,
            y,
            width,
            height,
            fill_color: default_fill_color(),
            outline_color: default_outline_color(),
        }
    }
}

/// Changed-fields-only update for a [`FurnitureItem`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FurniturePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub furniture_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<String>,
}

impl FurniturePatch {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("furniture_type", self.furniture_type.is_some()),
            ("x", self.x.is_some()),
            ("y", self.y.is_some()),
            ("width", self.width.is_some()),
            ("height", self.height.is_some()),
            ("fill_color", self.fill_color.is_some()),
            ("outline_color", self.outline_color.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, touched)| touched.then_some(name))
        .collect()
    }

    pub fn apply_to(&self, item: &mut FurnitureItem) {
        if let Some(value) = &self.name {
            item.name = value.clone();
        }
        if let Some(value) = &self.furniture_type {
            item.furniture_type = value.clone();
        }
        if let Some(value) = self.x {
            item.x = value;
        }
        if let Some(value) = self.y {
            item.y = value;
        }
        if let Some(value) = self.width {
            item.width = value;
        }
        if let Some(value) = self.height {
            item.height = value;
        }
        if let Some(value) = &self.fill_color {
            item.fill_color = value.clone();
        }
        if let Some(value) = &self.outline_color {
            item.outline_color = value.clone();
        }
    }

    pub fn inverse_from(&self, snapshot: &FurnitureItem) -> FurniturePatch {
        FurniturePatch {
            name: self.name.as_ref().map(|_| snapshot.name.clone()),
            furniture_type: self
                .furniture_type
                .as_ref()
                .map(|_| snapshot.furniture_type.clone()),
            x: self.x.map(|_| snapshot.x),
            y: self.y.map(|_| snapshot.y),
            width: self.width.map(|_| snapshot.width),
            height: self.height.map(|_| snapshot.height),
            fill_color: self.fill_color.as_ref().map(|_| snapshot.fill_color.clone()),
            outline_color: self
                .outline_color
                .as_ref()
                .map(|_| snapshot.outline_color.clone()),
        }
    }
}
