//! Age-based history pruning applied when a store is loaded.

use crate::command::Command;
use chrono::{DateTime, Duration, Utc};

/// Drops commands older than `now - retention` and every ephemeral command.
///
/// Keeps the relative order of the survivors. Returns how many were dropped.
pub fn prune_stack(stack: &mut Vec<Command>, now: DateTime<Utc>, retention: Duration) -> usize {
    let cutoff = now - retention;
    let before = stack.len();
    stack.retain(|command| command.timestamp >= cutoff && !command.is_ephemeral());
    before - stack.len()
}
