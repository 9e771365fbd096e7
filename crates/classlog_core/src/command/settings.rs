//! Display settings reset.

use crate::command::{CommandError, CommandResult, Reversible};
use crate::model::classroom::ClassroomState;
use crate::model::settings::DisplaySettings;
use serde::{Deserialize, Serialize};

/// Replaces display settings with defaults. ID counters are untouched.
///
/// `old_settings` is captured on first execute and reused on redo. A record
/// that never captured it cannot be undone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetSettings {
    #[serde(default)]
    pub old_settings: Option<DisplaySettings>,
    #[serde(default)]
    pub new_settings: Option<DisplaySettings>,
}

impl ResetSettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reversible for ResetSettings {
    fn execute(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        if self.old_settings.is_none() {
            self.old_settings = Some(state.settings.clone());
        }
        let defaults = DisplaySettings::default();
        state.settings = defaults.clone();
        self.new_settings = Some(defaults);
        Ok(())
    }

    fn undo(&mut self, state: &mut ClassroomState) -> CommandResult<()> {
        let old = self
            .old_settings
            .as_ref()
            .ok_or(CommandError::MissingSnapshot("settings"))?;
        state.settings = old.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "Reset All Settings".to_string()
    }
}
