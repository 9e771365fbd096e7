//! Student record and partial-update patch.
//!
//! # Invariants
//! - `id` is `student_<n>` and never changes after creation.
//! - `style_overrides` keys come from [`STYLE_PROPERTIES`].
//! - Box size lives in `width`/`height` only; it is not duplicated as a style.

use crate::model::double_option;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_STUDENT_BOX_WIDTH: f64 = 130.0;
pub const DEFAULT_STUDENT_BOX_HEIGHT: f64 = 80.0;
pub const MIN_STUDENT_BOX_WIDTH: f64 = 60.0;
pub const MIN_STUDENT_BOX_HEIGHT: f64 = 40.0;

/// Per-student style properties that may be overridden.
pub const STYLE_PROPERTIES: &[&str] = &[
    "fill_color",
    "outline_color",
    "font_family",
    "font_size",
    "font_color",
];

/// Returns whether `property` is a supported style override key.
pub fn is_style_property(property: &str) -> bool {
    STYLE_PROPERTIES.contains(&property)
}

/// A single style override value (color/font name or numeric size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

/// Seating-chart student box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub gender: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style_overrides: BTreeMap<String, StyleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

fn default_width() -> f64 {
    DEFAULT_STUDENT_BOX_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_STUDENT_BOX_HEIGHT
}

impl Student {
    /// Creates a student box at `(x, y)` with default size and no overrides.
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            nickname: None,
            gender: String::new(),
            x,
            y,
            width: DEFAULT_STUDENT_BOX_WIDTH,
            height: DEFAULT_STUDENT_BOX_HEIGHT,
            style_overrides: BTreeMap::new(),
            group_id: None,
        }
    }

    /// Display name, with the nickname quoted between first and last name.
    pub fn full_name(&self) -> String {
        match self.nickname.as_deref().map(str::trim) {
            Some(nickname) if !nickname.is_empty() => {
                format!("{} \"{}\" {}", self.first_name, nickname, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// Changed-fields-only update for a [`Student`].
///
/// `None` means "field untouched". For optional fields, `Some(None)` clears
/// the value. `style_overrides` replaces the whole override map. Unknown keys
/// are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub nickname: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_overrides: Option<BTreeMap<String, StyleValue>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub group_id: Option<Option<String>>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this patch touches, in declaration order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.first_name.is_some() {
            fields.push("first_name");
        }
        if self.last_name.is_some() {
            fields.push("last_name");
        }
        if self.nickname.is_some() {
            fields.push("nickname");
        }
        if self.gender.is_some() {
            fields.push("gender");
        }
        if self.x.is_some() {
            fields.push("x");
        }
        if self.y.is_some() {
            fields.push("y");
        }
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.style_overrides.is_some() {
            fields.push("style_overrides");
        }
        if self.group_id.is_some() {
            fields.push("group_id");
        }
        fields
    }

    /// Merges the touched fields into `student`.
    pub fn apply_to(&self, student: &mut Student) {
        if let Some(value) = &self.first_name {
            student.first_name = value.clone();
        }
        if let Some(value) = &self.last_name {
            student.last_name = value.clone();
        }
        if let Some(value) = &self.nickname {
            student.nickname = value.clone();
        }
        if let Some(value) = &self.gender {
            student.gender = value.clone();
        }
        if let Some(value) = self.x {
            student.x = value;
        }
        if let Some(value) = self.y {
            student.y = value;
        }
        if let Some(value) = self.width {
            student.width = value;
        }
        if let Some(value) = self.height {
            student.height = value;
        }
        if let Some(value) = &self.style_overrides {
            student.style_overrides = value.clone();
        }
        if let Some(value) = &self.group_id {
            student.group_id = value.clone();
        }
    }

    /// Builds the patch that restores this patch's fields from `snapshot`.
    pub fn inverse_from(&self, snapshot: &Student) -> StudentPatch {
        StudentPatch {
            first_name: self.first_name.as_ref().map(|_| snapshot.first_name.clone()),
            last_name: self.last_name.as_ref().map(|_| snapshot.last_name.clone()),
            nickname: self.nickname.as_ref().map(|_| snapshot.nickname.clone()),
            gender: self.gender.as_ref().map(|_| snapshot.gender.clone()),
            x: self.x.map(|_| snapshot.x),
            y: self.y.map(|_| snapshot.y),
            width: self.width.map(|_| snapshot.width),
            height: self.height.map(|_| snapshot.height),
            style_overrides: self
                .style_overrides
                .as_ref()
                .map(|_| snapshot.style_overrides.clone()),
            group_id: self.group_id.as_ref().map(|_| snapshot.group_id.clone()),
        }
    }

    /// First override key that is not in [`STYLE_PROPERTIES`].
    pub fn unsupported_style_property(&self) -> Option<&str> {
        self.style_overrides
            .as_ref()?
            .keys()
            .map(String::as_str)
            .find(|key| !is_style_property(key))
    }

    /// Group the patch assigns, when it assigns one.
    pub fn assigned_group(&self) -> Option<&str> {
        self.group_id.as_ref().and_then(|value| value.as_deref())
    }
}
