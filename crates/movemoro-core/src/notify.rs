//! Notification seam.
//!
//! The core only says *that* something happened. Sounds, desktop popups
//! and message wording belong to whoever implements [`Notifier`]. Calls
//! must return promptly; the session machine makes them from inside its
//! periodic check.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    WorkComplete,
    BreakComplete,
    /// Low-key acknowledgement, e.g. after settings were saved.
    GenericTick,
}

pub trait Notifier {
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for std::rc::Rc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Emits notifications as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(?notification, "notify");
    }
}
