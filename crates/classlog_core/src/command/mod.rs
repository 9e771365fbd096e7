//! Reversible, serializable classroom mutations.
//!
//! # Responsibility
//! - Wrap every state change in a command that can apply and reverse itself.
//! - Convert commands to and from the `{type, timestamp, data}` record shape.
//!
//! # Invariants
//! - `execute`/`undo` validate before mutating; an `Err` leaves state as-is.
//! - Commands own their snapshots; nothing aliases the live model.
//! - Only bookkeeping fields (remembered "old" values) change after creation.
//!
//! # See also
//! - `registry` for record decoding.

pub mod compound;
pub mod groups;
pub mod guides;
pub mod items;
pub mod layout;
pub mod live;
pub mod logs;
pub mod registry;
pub mod settings;

use crate::model::classroom::ClassroomState;
use crate::model::ids::ItemKind;
use crate::model::timestamp::format_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use compound::CompoundCommand;
pub use groups::ReassignGroups;
pub use guides::{AddGuide, DeleteGuide, GuideMove, MoveGuides};
pub use items::{AddItem, DeleteItem, EditItem, ItemPatch};
pub use layout::{ChangeItemsSize, ChangeStudentStyle, MoveEntry, MoveItems, SizeEntry};
pub use live::{MarkLiveHomework, MarkLiveQuiz};
pub use logs::AppendLogEntry;
pub use registry::{CommandRegistry, DeserializationWarning};
pub use settings::ResetSettings;

pub const TAG_ADD_ITEM: &str = "AddItemCommand";
pub const TAG_DELETE_ITEM: &str = "DeleteItemCommand";
pub const TAG_EDIT_ITEM: &str = "EditItemCommand";
pub const TAG_MOVE_ITEMS: &str = "MoveItemsCommand";
pub const TAG_CHANGE_ITEMS_SIZE: &str = "ChangeItemsSizeCommand";
pub const TAG_LOG_ENTRY: &str = "LogEntryCommand";
pub const TAG_LOG_HOMEWORK_ENTRY: &str = "LogHomeworkEntryCommand";
pub const TAG_MANAGE_GROUPS: &str = "ManageStudentGroupCommand";
pub const TAG_CHANGE_STUDENT_STYLE: &str = "ChangeStudentStyleCommand";
pub const TAG_RESET_SETTINGS: &str = "ResetSettingsCommand";
pub const TAG_MARK_LIVE_QUIZ: &str = "MarkLiveQuizQuestionCommand";
pub const TAG_MARK_LIVE_HOMEWORK: &str = "MarkLiveHomeworkCommand";
pub const TAG_ADD_GUIDE: &str = "AddGuideCommand";
pub const TAG_MOVE_GUIDE: &str = "MoveGuideCommand";
pub const TAG_DELETE_GUIDE: &str = "DeleteGuideCommand";
pub const TAG_COMPOUND: &str = "CompoundCommand";

pub type CommandResult<T> = Result<T, CommandError>;

/// Failure raised by a command before it mutated anything.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    ItemNotFound { kind: ItemKind, id: String },
    DuplicateItem { kind: ItemKind, id: String },
    /// Snapshot or patch shape does not match the declared item type.
    KindMismatch { expected: ItemKind, actual: ItemKind },
    /// Declared ID differs from the ID inside the snapshot.
    IdMismatch { expected: String, actual: String },
    StudentNotFound(String),
    GroupNotFound(String),
    GuideNotFound(String),
    DuplicateGuide(String),
    InvalidStyleProperty(String),
    /// No live session of the named kind (`quiz` or `homework`) is running.
    NoLiveSession(&'static str),
    /// Undo needs a snapshot the record never captured.
    MissingSnapshot(&'static str),
    /// Sub-command `index` of a compound failed.
    Compound { index: usize, source: Box<CommandError> },
}

impl CommandError {
    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ItemNotFound { .. } => "item_not_found",
            Self::DuplicateItem { .. } => "duplicate_item",
            Self::KindMismatch { .. } => "kind_mismatch",
            Self::IdMismatch { .. } => "id_mismatch",
            Self::StudentNotFound(_) => "student_not_found",
            Self::GroupNotFound(_) => "group_not_found",
            Self::GuideNotFound(_) => "guide_not_found",
            Self::DuplicateGuide(_) => "duplicate_guide",
            Self::InvalidStyleProperty(_) => "invalid_style_property",
            Self::NoLiveSession(_) => "no_live_session",
            Self::MissingSnapshot(_) => "missing_snapshot",
            Self::Compound { .. } => "compound_failed",
        }
    }
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DuplicateItem { kind, id } => write!(f, "{kind} already exists: {id}"),
            Self::KindMismatch { expected, actual } => {
                write!(f, "item type mismatch: expected {expected}, got {actual}")
            }
            Self::IdMismatch { expected, actual } => {
                write!(f, "item id mismatch: expected `{expected}`, got `{actual}`")
            }
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::GuideNotFound(id) => write!(f, "guide not found: {id}"),
            Self::DuplicateGuide(id) => write!(f, "guide already exists: {id}"),
            Self::InvalidStyleProperty(name) => write!(f, "unsupported style property `{name}`"),
            Self::NoLiveSession(kind) => write!(f, "no live {kind} session is active"),
            Self::MissingSnapshot(what) => write!(f, "cannot undo: no {what} snapshot recorded"),
            Self::Compound { index, source } => {
                write!(f, "step {} of compound command failed: {source}", index + 1)
            }
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Compound { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Apply/reverse contract shared by every command variant.
pub trait Reversible {
    /// Applies the mutation. Must not mutate `state` when returning `Err`.
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()>;
    /// Reverses a previous successful `execute`.
    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()>;
    /// Short user-facing label for history listings.
    fn describe(&self) -> String;
}

/// Serialized command as stored in `undo_stack`/`redo_stack`.
///
/// Stores keep records as raw JSON; [`CommandRecord::from_value`] is the only
/// way in, so a damaged element is reported on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    #[serde(rename = "type", default)]
    pub tag: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CommandRecord {
    /// Reads the `{type, timestamp, data}` shape out of one stack element.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, DeserializationWarning> {
        let Some(object) = value.as_object() else {
            return Err(DeserializationWarning::MalformedData {
                tag: String::new(),
                message: format!("record is not an object: {}", json_kind(value)),
            });
        };
        let tag = match object.get("type") {
            Some(serde_json::Value::String(tag)) => tag.clone(),
            Some(other) => {
                return Err(DeserializationWarning::MalformedData {
                    tag: String::new(),
                    message: format!("`type` is not a string: {}", json_kind(other)),
                })
            }
            None => {
                return Err(DeserializationWarning::MalformedData {
                    tag: String::new(),
                    message: "record has no `type`".to_string(),
                })
            }
        };
        let timestamp = match object.get("timestamp") {
            Some(serde_json::Value::String(timestamp)) => timestamp.clone(),
            Some(other) => {
                return Err(DeserializationWarning::BadTimestamp {
                    tag,
                    value: other.to_string(),
                })
            }
            None => String::new(),
        };
        let data = object.get("data").cloned().unwrap_or(serde_json::Value::Null);
        Ok(Self {
            tag,
            timestamp,
            data,
        })
    }

    pub fn into_value(self) -> serde_json::Value {
        serde_json::json!({
            "type": self.tag,
            "timestamp": self.timestamp,
            "data": self.data,
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Closed set of command variants.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    AddItem(AddItem),
    DeleteItem(DeleteItem),
    EditItem(EditItem),
    MoveItems(MoveItems),
    ChangeItemsSize(ChangeItemsSize),
    AppendLogEntry(AppendLogEntry),
    ReassignGroups(ReassignGroups),
    ChangeStudentStyle(ChangeStudentStyle),
    ResetSettings(ResetSettings),
    MarkLiveQuiz(MarkLiveQuiz),
    MarkLiveHomework(MarkLiveHomework),
    AddGuide(AddGuide),
    MoveGuides(MoveGuides),
    DeleteGuide(DeleteGuide),
    Compound(CompoundCommand),
}

impl CommandAction {
    fn as_reversible(&mut self) -> &mut dyn Reversible {
        match self {
            Self::AddItem(inner) => inner,
            Self::DeleteItem(inner) => inner,
            Self::EditItem(inner) => inner,
            Self::MoveItems(inner) => inner,
            Self::ChangeItemsSize(inner) => inner,
            Self::AppendLogEntry(inner) => inner,
            Self::ReassignGroups(inner) => inner,
            Self::ChangeStudentStyle(inner) => inner,
            Self::ResetSettings(inner) => inner,
            Self::MarkLiveQuiz(inner) => inner,
            Self::MarkLiveHomework(inner) => inner,
            Self::AddGuide(inner) => inner,
            Self::MoveGuides(inner) => inner,
            Self::DeleteGuide(inner) => inner,
            Self::Compound(inner) => inner,
        }
    }

    /// Stable wire tag for this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AddItem(_) => TAG_ADD_ITEM,
            Self::DeleteItem(_) => TAG_DELETE_ITEM,
            Self::EditItem(_) => TAG_EDIT_ITEM,
            Self::MoveItems(_) => TAG_MOVE_ITEMS,
            Self::ChangeItemsSize(_) => TAG_CHANGE_ITEMS_SIZE,
            Self::AppendLogEntry(inner) => inner.tag(),
            Self::ReassignGroups(_) => TAG_MANAGE_GROUPS,
            Self::ChangeStudentStyle(_) => TAG_CHANGE_STUDENT_STYLE,
            Self::ResetSettings(_) => TAG_RESET_SETTINGS,
            Self::MarkLiveQuiz(_) => TAG_MARK_LIVE_QUIZ,
            Self::MarkLiveHomework(_) => TAG_MARK_LIVE_HOMEWORK,
            Self::AddGuide(_) => TAG_ADD_GUIDE,
            Self::MoveGuides(_) => TAG_MOVE_GUIDE,
            Self::DeleteGuide(_) => TAG_DELETE_GUIDE,
            Self::Compound(_) => TAG_COMPOUND,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::AddItem(inner) => inner.describe(),
            Self::DeleteItem(inner) => inner.describe(),
            Self::EditItem(inner) => inner.describe(),
            Self::MoveItems(inner) => inner.describe(),
            Self::ChangeItemsSize(inner) => inner.describe(),
            Self::AppendLogEntry(inner) => inner.describe(),
            Self::ReassignGroups(inner) => inner.describe(),
            Self::ChangeStudentStyle(inner) => inner.describe(),
            Self::ResetSettings(inner) => inner.describe(),
            Self::MarkLiveQuiz(inner) => inner.describe(),
            Self::MarkLiveHomework(inner) => inner.describe(),
            Self::AddGuide(inner) => inner.describe(),
            Self::MoveGuides(inner) => inner.describe(),
            Self::DeleteGuide(inner) => inner.describe(),
            Self::Compound(inner) => inner.describe(),
        }
    }

    fn to_data(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::AddItem(inner) => serde_json::to_value(inner),
            Self::DeleteItem(inner) => serde_json::to_value(inner),
            Self::EditItem(inner) => inner.to_data(),
            Self::MoveItems(inner) => serde_json::to_value(inner),
            Self::ChangeItemsSize(inner) => serde_json::to_value(inner),
            Self::AppendLogEntry(inner) => inner.to_data(),
            Self::ReassignGroups(inner) => serde_json::to_value(inner),
            Self::ChangeStudentStyle(inner) => serde_json::to_value(inner),
            Self::ResetSettings(inner) => serde_json::to_value(inner),
            Self::MarkLiveQuiz(inner) => serde_json::to_value(inner),
            Self::MarkLiveHomework(inner) => serde_json::to_value(inner),
            Self::AddGuide(inner) => serde_json::to_value(inner),
            Self::MoveGuides(inner) => serde_json::to_value(inner),
            Self::DeleteGuide(inner) => serde_json::to_value(inner),
            Self::Compound(inner) => inner.to_data(),
        }
    }

    fn is_ephemeral(&self) -> bool {
        match self {
            Self::MarkLiveQuiz(_) | Self::MarkLiveHomework(_) => true,
            Self::Compound(inner) => inner.is_ephemeral(),
            _ => false,
        }
    }
}

/// One timestamped command instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub timestamp: DateTime<Utc>,
    pub action: CommandAction,
}

impl Command {
    /// Wraps `action`, stamping it with the current time.
    pub fn new(action: CommandAction) -> Self {
        Self::with_timestamp(action, Utc::now())
    }

    pub fn with_timestamp(action: CommandAction, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, action }
    }

    pub fn tag(&self) -> &'static str {
        self.action.tag()
    }

    /// Live-session marks are excluded from the persisted history.
    pub fn is_ephemeral(&self) -> bool {
        self.action.is_ephemeral()
    }

    pub fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.action.as_reversible().execute(state)
    }

    pub fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        self.action.as_reversible().undo(state)
    }

    pub fn describe(&self) -> String {
        self.action.describe()
    }

    /// Serializes to the `{type, timestamp, data}` record shape.
    pub fn to_record(&self) -> serde_json::Result<CommandRecord> {
        Ok(CommandRecord {
            tag: self.tag().to_string(),
            timestamp: format_timestamp(&self.timestamp),
            data: self.action.to_data()?,
        })
    }
}

impl From<CommandAction> for Command {
    fn from(action: CommandAction) -> Self {
        Command::new(action)
    }
}
