//! State-change and status notifications.
//!
//! The history manager calls the sink after every mutation so a UI can
//! redraw and show a status line. Sinks must not call back into the manager.

pub trait NotificationSink {
    /// Classroom state or the history stacks changed.
    fn on_state_changed(&mut self);
    /// Short user-facing status text.
    fn on_status(&mut self, text: &str);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn on_state_changed(&mut self) {}

    fn on_status(&mut self, _text: &str) {}
}

/// Remembers everything it receives. Used by tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub state_changes: usize,
    pub statuses: Vec<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }
}

impl NotificationSink for RecordingSink {
    fn on_state_changed(&mut self) {
        self.state_changes += 1;
    }

    fn on_status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }
}

impl<N: NotificationSink + ?Sized> NotificationSink for Box<N> {
    fn on_state_changed(&mut self) {
        (**self).on_state_changed();
    }

    fn on_status(&mut self, text: &str) {
        (**self).on_status(text);
    }
}
