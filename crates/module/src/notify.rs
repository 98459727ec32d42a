//! User-facing notifications raised by modules.
//!
//! The framework only produces notifications; presenting them (toasts,
//! banners, a log panel) belongs to the host. [`TracingNotifier`] is the
//! default sink, [`InMemoryNotifier`] records them for tests and dev tooling.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use erpmod_core::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub module_id: ModuleId,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn error(module_id: ModuleId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            module_id,
            severity: Severity::Error,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Sink for notifications. Implementations must not call back into the
/// module that raised the notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Emits every notification as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Info => {
                tracing::info!(module_id = %n.module_id, title = %n.title, "{}", n.message)
            }
            Severity::Warning => {
                tracing::warn!(module_id = %n.module_id, title = %n.title, "{}", n.message)
            }
            Severity::Error => {
                tracing::error!(module_id = %n.module_id, title = %n.title, "{}", n.message)
            }
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}
