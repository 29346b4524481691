use std::{fmt, sync::Arc};

use tracing::info;

use crate::deps::Notifier;

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Informational.
    Info,
    /// A requested change took effect.
    Success,
    /// The action failed.
    Error,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Sends notifications to the configured sink, logging each one.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    /// Create a new dispatcher around a notification sink.
    pub fn new(sink: Arc<dyn Notifier>) -> Self {
        Self { sink }
    }

    /// Send a notification with the given kind, title, and text.
    pub fn send_notification(&self, kind: NotifyKind, title: &str, text: &str) {
        // Always log notification displays at info level, regardless of urgency.
        info!(kind = %kind, title = %title, text = %text, "notification_display");
        self.sink.notify(kind, title, text);
    }

    /// Convenience helper to send an error notification.
    pub fn send_error(&self, title: &str, text: &str) {
        self.send_notification(NotifyKind::Error, title, text);
    }

    /// Convenience helper to send an info notification.
    pub fn send_info(&self, title: &str, text: &str) {
        self.send_notification(NotifyKind::Info, title, text);
    }
}
