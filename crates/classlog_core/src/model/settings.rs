//! Display settings persisted alongside the classroom entities.

use crate::model::student::{DEFAULT_STUDENT_BOX_HEIGHT, DEFAULT_STUDENT_BOX_WIDTH};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User-adjustable presentation defaults.
///
/// The engine only stores and restores these; the GUI interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub default_student_box_width: f64,
    pub default_student_box_height: f64,
    pub student_box_fill_color: String,
    pub student_box_outline_color: String,
    pub student_font_family: String,
    pub student_font_size: u32,
    pub student_font_color: String,
    pub grid_size: u32,
    pub show_grid: bool,
    pub show_rulers: bool,
    pub default_quiz_name: String,
    pub default_homework_name: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            default_student_box_width: DEFAULT_STUDENT_BOX_WIDTH,
            default_student_box_height: DEFAULT_STUDENT_BOX_HEIGHT,
            student_box_fill_color: "skyblue".to_string(),
            student_box_outline_color: "blue".to_string(),
            student_font_family: "TkDefaultFont".to_string(),
            student_font_size: 10,
            student_font_color: "black".to_string(),
            grid_size: 20,
            show_grid: false,
            show_rulers: false,
            default_quiz_name: "Class Quiz".to_string(),
            default_homework_name: "Homework Check".to_string(),
        }
    }
}

/// Stored keys this build does not model, written back unchanged on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreservedKeys {
    /// Top-level envelope keys.
    pub envelope: Map<String, Value>,
    /// Keys of the `settings` object.
    pub settings: Map<String, Value>,
}
