//! Tag -> factory map used to rebuild commands from stored records.
//!
//! # Responsibility
//! - Own the fixed set of wire tags this build understands.
//! - Turn each bad record into a [`DeserializationWarning`] instead of failing
//!   the whole load.
//!
//! # Invariants
//! - The map is populated once at construction and never changes.
//! - Decoding never touches classroom state.

use crate::command::compound::CompoundCommand;
use crate::command::guides::{AddGuide, DeleteGuide, MoveGuides};
use crate::command::items::{AddItem, DeleteItem, EditItem};
use crate::command::logs::AppendLogEntry;
use crate::command::{
    ChangeItemsSize, ChangeStudentStyle, Command, CommandAction, CommandRecord, MarkLiveHomework,
    MarkLiveQuiz, MoveItems, ReassignGroups, ResetSettings, TAG_ADD_GUIDE, TAG_ADD_ITEM, TAG_CHANGE_ITEMS_SIZE,
    TAG_CHANGE_STUDENT_STYLE, TAG_COMPOUND, TAG_DELETE_GUIDE, TAG_DELETE_ITEM, TAG_EDIT_ITEM, TAG_LOG_ENTRY,
    TAG_LOG_HOMEWORK_ENTRY, TAG_MANAGE_GROUPS, TAG_MARK_LIVE_HOMEWORK, TAG_MARK_LIVE_QUIZ,
    TAG_MOVE_GUIDE, TAG_MOVE_ITEMS, TAG_RESET_SETTINGS,
};
use crate::model::timestamp::parse_timestamp;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rebuilds one command payload. Receives the registry for nested records.
pub type CommandFactory = fn(&CommandRegistry, &Value) -> serde_json::Result<CommandAction>;

/// A stored record that could not be turned back into a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeserializationWarning {
    UnknownTag { tag: String },
    MalformedData { tag: String, message: String },
    BadTimestamp { tag: String, value: String },
}

impl DeserializationWarning {
    pub fn tag(&self) -> &str {
        match self {
            Self::UnknownTag { tag }
            | Self::MalformedData { tag, .. }
            | Self::BadTimestamp { tag, .. } => tag.as_str(),
        }
    }

    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTag { .. } => "unknown_tag",
            Self::MalformedData { .. } => "malformed_data",
            Self::BadTimestamp { .. } => "bad_timestamp",
        }
    }
}

impl Display for DeserializationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTag { tag } => write!(f, "unknown command type `{tag}`"),
            Self::MalformedData { tag, message } if tag.is_empty() => {
                write!(f, "malformed record: {message}")
            }
            Self::MalformedData { tag, message } => {
                write!(f, "malformed `{tag}` record: {message}")
            }
            Self::BadTimestamp { tag, value } => {
                write!(f, "`{tag}` record has invalid timestamp `{value}`")
            }
        }
    }
}

impl Error for DeserializationWarning {}

/// Fixed registry of every command type this build can decode.
pub struct CommandRegistry {
    factories: BTreeMap<&'static str, CommandFactory>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Builds the registry with every built-in command tag.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: BTreeMap::new(),
        };
        registry.register(TAG_ADD_ITEM, |_, data| {
            AddItem::decode(data).map(CommandAction::AddItem)
        });
        registry.register(TAG_DELETE_ITEM, |_, data| {
            DeleteItem::decode(data).map(CommandAction::DeleteItem)
        });
        registry.register(TAG_EDIT_ITEM, |_, data| {
            EditItem::decode(data).map(CommandAction::EditItem)
        });
        registry.register(TAG_MOVE_ITEMS, |_, data| {
            MoveItems::deserialize(data).map(CommandAction::MoveItems)
        });
        registry.register(TAG_CHANGE_ITEMS_SIZE, |_, data| {
            ChangeItemsSize::deserialize(data).map(CommandAction::ChangeItemsSize)
        });
        registry.register(TAG_LOG_ENTRY, |_, data| {
            AppendLogEntry::decode_behavior(data).map(CommandAction::AppendLogEntry)
        });
        registry.register(TAG_LOG_HOMEWORK_ENTRY, |_, data| {
            AppendLogEntry::decode_homework(data).map(CommandAction::AppendLogEntry)
        });
        registry.register(TAG_MANAGE_GROUPS, |_, data| {
            ReassignGroups::deserialize(data).map(CommandAction::ReassignGroups)
        });
        registry.register(TAG_CHANGE_STUDENT_STYLE, |_, data| {
            ChangeStudentStyle::deserialize(data).map(CommandAction::ChangeStudentStyle)
        });
        registry.register(TAG_RESET_SETTINGS, |_, data| {
            ResetSettings::deserialize(data).map(CommandAction::ResetSettings)
        });
        registry.register(TAG_MARK_LIVE_QUIZ, |_, data| {
            MarkLiveQuiz::deserialize(data).map(CommandAction::MarkLiveQuiz)
        });
        registry.register(TAG_MARK_LIVE_HOMEWORK, |_, data| {
            MarkLiveHomework::deserialize(data).map(CommandAction::MarkLiveHomework)
        });
        registry.register(TAG_ADD_GUIDE, |_, data| {
            AddGuide::decode(data).map(CommandAction::AddGuide)
        });
        registry.register(TAG_MOVE_GUIDE, |_, data| {
            MoveGuides::deserialize(data).map(CommandAction::MoveGuides)
        });
        registry.register(TAG_DELETE_GUIDE, |_, data| {
            DeleteGuide::decode(data).map(CommandAction::DeleteGuide)
        });
        registry.register(TAG_COMPOUND, |registry, data| {
            CompoundCommand::decode(registry, data).map(CommandAction::Compound)
        });
        registry
    }

    fn register(&mut self, tag: &'static str, factory: CommandFactory) {
        self.factories.insert(tag, factory);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Rebuilds one command from its stored record.
    pub fn from_record(&self, record: &CommandRecord) -> Result<Command, DeserializationWarning> {
        let factory =
            self.factories
                .get(record.tag.as_str())
                .ok_or_else(|| DeserializationWarning::UnknownTag {
                    tag: record.tag.clone(),
                })?;
        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| DeserializationWarning::BadTimestamp {
                tag: record.tag.clone(),
                value: record.timestamp.clone(),
            })?;
        let action =
            factory(self, &record.data).map_err(|err| DeserializationWarning::MalformedData {
                tag: record.tag.clone(),
                message: err.to_string(),
            })?;
        Ok(Command::with_timestamp(action, timestamp))
    }

    /// Rebuilds one command from a raw stack element.
    pub fn from_value(&self, value: &Value) -> Result<Command, DeserializationWarning> {
        self.from_record(&CommandRecord::from_value(value)?)
    }

    /// Decodes a whole stack, keeping order and collecting per-record warnings.
    pub fn decode_stack(&self, records: &[Value]) -> (Vec<Command>, Vec<DeserializationWarning>) {
        let mut commands = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();
        for record in records {
            match self.from_value(record) {
                Ok(command) => commands.push(command),
                Err(warning) => warnings.push(warning),
            }
        }
        (commands, warnings)
    }
}
