//! Ordered group of commands applied and reversed as one history entry.
//!
//! # Invariants
//! - Execute runs children in order; undo runs them in reverse.
//! - A child failure rolls back the children already applied, so the
//!   compound as a whole either applies fully or not at all.

use crate::command::registry::CommandRegistry;
use crate::command::{Command, CommandError, CommandResult, Reversible};
use crate::model::classroom::ClassroomState;
use log::warn;
use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundCommand {
    pub label: String,
    pub commands: Vec<Command>,
}

#[derive(Deserialize)]
struct CompoundWire {
    #[serde(default)]
    label: String,
    commands: Vec<Value>,
}

impl CompoundCommand {
    pub fn new(label: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            label: label.into(),
            commands,
        }
    }

    /// Ephemeral only when every child is.
    pub fn is_ephemeral(&self) -> bool {
        !self.commands.is_empty() && self.commands.iter().all(Command::is_ephemeral)
    }

    pub(crate) fn to_data(&self) -> serde_json::Result<Value> {
        let records = self
            .commands
            .iter()
            .map(Command::to_record)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(json!({ "label": self.label, "commands": records }))
    }

    /// Decodes children through `registry`; any bad child rejects the whole
    /// compound.
    pub(crate) fn decode(registry: &CommandRegistry, data: &Value) -> serde_json::Result<Self> {
        let wire = CompoundWire::deserialize(data)?;
        let mut commands = Vec::with_capacity(wire.commands.len());
        for (index, record) in wire.commands.iter().enumerate() {
            let command = registry.from_value(record).map_err(|warning| {
                serde_json::Error::custom(format!("child {index}: {warning}"))
            })?;
            commands.push(command);
        }
        Ok(Self {
            label: wire.label,
            commands,
        })
    }
}

impl Reversible for CompoundCommand {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        for index in 0..self.commands.len() {
            if let Err(err) = self.commands[index].execute(state) {
                for applied in self.commands[..index].iter_mut().rev() {
                    if let Err(rollback) = applied.undo(state) {
                        warn!(
                            "event=compound_rollback module=command status=error tag={} error={}",
                            applied.tag(),
                            rollback
                        );
                    }
                }
                return Err(CommandError::Compound {
                    index,
                    source: Box::new(err),
                });
            }
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        for index in (0..self.commands.len()).rev() {
            if let Err(err) = self.commands[index].undo(state) {
                for reverted in self.commands[index + 1..].iter_mut() {
                    if let Err(reapply) = reverted.execute(state) {
                        warn!(
                            "event=compound_rollback module=command status=error tag={} error={}",
                            reverted.tag(),
                            reapply
                        );
                    }
                }
                return Err(CommandError::Compound {
                    index,
                    source: Box::new(err),
                });
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.label.is_empty() {
            format!("{} action(s)", self.commands.len())
        } else {
            self.label.clone()
        }
    }
}
