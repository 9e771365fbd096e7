//! Persisted envelope: entity collections, settings and both history stacks.
//!
//! # Invariants
//! - Stack elements stay raw JSON until the registry decodes them, so one
//!   damaged record is skipped on its own instead of failing the envelope.
//! - A damaged `settings` value or counter falls back to its default.
//! - Keys this build does not model are written back unchanged.

use crate::command::CommandRecord;
use crate::model::classroom::ClassroomState;
use crate::model::furniture::FurnitureItem;
use crate::model::group::Group;
use crate::model::guide::Guide;
use crate::model::ids::IdCounters;
use crate::model::log_entry::{BehaviorLogEntry, HomeworkLogEntry};
use crate::model::settings::{DisplaySettings, PreservedKeys};
use crate::model::student::Student;
use log::warn;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Data format tag written into every envelope.
pub const DATA_VERSION: &str = "v10";

fn default_data_version() -> String {
    DATA_VERSION.to_string()
}

/// `settings` object: display settings, ID counters and unmodeled keys share
/// one flat map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvelopeSettings {
    pub display: DisplaySettings,
    pub counters: IdCounters,
    pub extra: Map<String, Value>,
}

impl Serialize for EnvelopeSettings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = self.extra.clone();
        match serde_json::to_value(&self.display).map_err(S::Error::custom)? {
            Value::Object(display) => map.extend(display),
            _ => return Err(S::Error::custom("display settings must be an object")),
        }
        self.counters.write_into(&mut map);
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EnvelopeSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut map = match Value::deserialize(deserializer)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                warn!("event=settings_load module=store status=error error_code=settings_not_object");
                Map::new()
            }
        };
        let counters = IdCounters::take_from(&mut map);
        let display = take_display(&mut map);
        Ok(Self {
            display,
            counters,
            extra: map,
        })
    }
}

/// Moves every display key out of `map`, dropping values of the wrong shape.
fn take_display(map: &mut Map<String, Value>) -> DisplaySettings {
    let Ok(Value::Object(defaults)) = serde_json::to_value(DisplaySettings::default()) else {
        return DisplaySettings::default();
    };
    let mut accepted = defaults.clone();
    for key in defaults.keys() {
        let Some(value) = map.remove(key) else {
            continue;
        };
        let mut candidate = accepted.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<DisplaySettings>(Value::Object(candidate.clone())).is_ok() {
            accepted = candidate;
        } else {
            warn!("event=settings_load module=store status=skip error_code=bad_setting key={key}");
        }
    }
    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

/// Accepts any JSON for a stack; a non-array reads as empty.
fn lenient_stack<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        _ => {
            warn!("event=stack_load module=store status=error error_code=stack_not_array");
            Ok(Vec::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEnvelope {
    #[serde(default)]
    pub students: BTreeMap<String, Student>,
    #[serde(default)]
    pub furniture: BTreeMap<String, FurnitureItem>,
    #[serde(default)]
    pub behavior_log: Vec<BehaviorLogEntry>,
    #[serde(default)]
    pub homework_log: Vec<HomeworkLogEntry>,
    #[serde(default)]
    pub student_groups: BTreeMap<String, Group>,
    #[serde(default)]
    pub guides: BTreeMap<String, Guide>,
    #[serde(default)]
    pub settings: EnvelopeSettings,
    /// Raw `{type, timestamp, data}` records, oldest first.
    #[serde(default, deserialize_with = "lenient_stack")]
    pub undo_stack: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_stack")]
    pub redo_stack: Vec<Value>,
    #[serde(default = "default_data_version")]
    pub data_version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HistoryEnvelope {
    fn default() -> Self {
        Self::from_state(&ClassroomState::default(), Vec::new(), Vec::new())
    }
}

impl HistoryEnvelope {
    /// Snapshot of durable state. Live sessions are left out.
    pub fn from_state(
        state: &ClassroomState,
        undo_stack: Vec<CommandRecord>,
        redo_stack: Vec<CommandRecord>,
    ) -> Self {
        Self {
            students: state.students.clone(),
            furniture: state.furniture.clone(),
            behavior_log: state.behavior_log.clone(),
            homework_log: state.homework_log.clone(),
            student_groups: state.groups.clone(),
            guides: state.guides.clone(),
            settings: EnvelopeSettings {
                display: state.settings.clone(),
                counters: state.counters,
                extra: state.preserved.settings.clone(),
            },
            undo_stack: undo_stack.into_iter().map(CommandRecord::into_value).collect(),
            redo_stack: redo_stack.into_iter().map(CommandRecord::into_value).collect(),
            data_version: default_data_version(),
            extra: state.preserved.envelope.clone(),
        }
    }

    /// Splits into classroom state and the raw undo/redo records.
    pub fn into_parts(self) -> (ClassroomState, Vec<Value>, Vec<Value>) {
        let state = ClassroomState {
            students: self.students,
            furniture: self.furniture,
            behavior_log: self.behavior_log,
            homework_log: self.homework_log,
            groups: self.student_groups,
            guides: self.guides,
            settings: self.settings.display,
            counters: self.settings.counters,
            preserved: PreservedKeys {
                envelope: self.extra,
                settings: self.settings.extra,
            },
            live_quiz: None,
            live_homework: None,
        };
        (state, self.undo_stack, self.redo_stack)
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryEnvelope, DATA_VERSION};
    use serde_json::json;

    #[test]
    fn legacy_settings_keys_and_missing_sections_load() {
        let json = r#"{
            "students": {},
            "settings": {
                "grid_size": 30,
                "next_student_id_num": 4,
                "theme": "dark"
            },
            "undo_stack": [{"type": "MoveItemsCommand", "timestamp": "2024-01-01T00:00:00", "data": {"items_moves": []}}]
        }"#;
        let envelope: HistoryEnvelope = serde_json::from_str(json).expect("legacy envelope");
        assert_eq!(envelope.settings.display.grid_size, 30);
        assert_eq!(envelope.settings.counters.next_student_id, 4);
        assert_eq!(envelope.settings.counters.next_group_id, 1);
        assert_eq!(envelope.settings.extra["theme"], "dark");
        assert_eq!(envelope.undo_stack.len(), 1);
        assert!(envelope.redo_stack.is_empty());
        assert_eq!(envelope.data_version, DATA_VERSION);
    }

    #[test]
    fn counters_serialize_inside_settings() {
        let value = serde_json::to_value(HistoryEnvelope::default()).expect("envelope json");
        assert_eq!(value["settings"]["next_student_id"], 1);
        assert_eq!(value["settings"]["next_guide_id"], 1);
        assert_eq!(value["settings"]["show_grid"], false);
        assert!(value.get("live_quiz").is_none());
    }

    #[test]
    fn damaged_settings_values_fall_back_individually() {
        let envelope: HistoryEnvelope = serde_json::from_value(json!({
            "settings": {
                "grid_size": "wide",
                "show_grid": true,
                "next_student_id": null,
                "next_furniture_id": 6
            },
            "undo_stack": {"not": "a list"}
        }))
        .expect("damaged settings still load");
        assert_eq!(envelope.settings.display.grid_size, 20);
        assert!(envelope.settings.display.show_grid);
        assert_eq!(envelope.settings.counters.next_student_id, 1);
        assert_eq!(envelope.settings.counters.next_furniture_id, 6);
        assert!(envelope.undo_stack.is_empty());
        assert!(!envelope.settings.extra.contains_key("grid_size"));
    }

    #[test]
    fn unknown_top_level_and_settings_keys_round_trip() {
        let source = json!({
            "students": {},
            "quiz_templates": {"t1": {"name": "Weekly"}},
            "settings": {"theme": "dark", "behavior_types": ["Talking"]}
        });
        let envelope: HistoryEnvelope = serde_json::from_value(source).expect("envelope");
        let (state, undo, redo) = envelope.into_parts();
        let saved = serde_json::to_value(HistoryEnvelope::from_state(
            &state,
            Vec::new(),
            Vec::new(),
        ))
        .expect("saved json");
        assert!(undo.is_empty() && redo.is_empty());
        assert_eq!(saved["quiz_templates"]["t1"]["name"], "Weekly");
        assert_eq!(saved["settings"]["theme"], "dark");
        assert_eq!(saved["settings"]["behavior_types"][0], "Talking");
        assert_eq!(saved["settings"]["grid_size"], 20);
    }
}
