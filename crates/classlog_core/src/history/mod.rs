//! Undo/redo history with persistence.
//!
//! # Responsibility
//! - Own the classroom state and both history stacks.
//! - Enforce execute/undo/redo transition rules and drive saves.
//! - Rebuild and prune history when a store is loaded.
//!
//! # Invariants
//! - `redo` is non-empty only right after one or more `undo` calls with no
//!   intervening `execute`.
//! - A failed command never reaches a stack; a failed undo/redo returns the
//!   command to the stack it came from.
//! - Save failures never roll back in-memory state.
//!
//! # See also
//! - `crate::store` for the persistence gateway.

mod manager;
mod prune;

pub use manager::{HistoryEntry, HistoryManager, LoadReport};
pub use prune::prune_stack;

use crate::command::CommandError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HistoryResult<T> = Result<T, HistoryError>;

#[derive(Debug)]
pub enum HistoryError {
    /// Command rejected by `execute`; nothing was pushed.
    Command(CommandError),
    /// Undo failed; the command stays on the undo stack.
    UndoFailed(CommandError),
    /// Redo failed; the command stays on the redo stack.
    RedoFailed(CommandError),
    IndexOutOfRange { index: usize, len: usize },
    /// A live session of this kind is already running.
    SessionActive(&'static str),
    NoLiveSession(&'static str),
    Store(StoreError),
}

impl Display for HistoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(err) => write!(f, "{err}"),
            Self::UndoFailed(err) => write!(f, "undo failed: {err}"),
            Self::RedoFailed(err) => write!(f, "redo failed: {err}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "history index {index} out of range (len {len})")
            }
            Self::SessionActive(kind) => write!(f, "a live {kind} session is already active"),
            Self::NoLiveSession(kind) => write!(f, "no live {kind} session is active"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HistoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Command(err) | Self::UndoFailed(err) | Self::RedoFailed(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::IndexOutOfRange { .. } | Self::SessionActive(_) | Self::NoLiveSession(_) => None,
        }
    }
}

impl From<CommandError> for HistoryError {
    fn from(value: CommandError) -> Self {
        Self::Command(value)
    }
}

impl From<StoreError> for HistoryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
