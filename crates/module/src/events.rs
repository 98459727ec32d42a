//! Host-facing callbacks and the props a module instance is mounted with.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use erpmod_core::{ModuleConfig, ModuleId};

pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A module asked its host to act (`on_action`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    pub module_id: ModuleId,
    pub action: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// A module failed to load (`on_error`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub module_id: ModuleId,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// `data` replaced the module's data payload.
    Data,
    /// `data` was merged into the module info.
    Metadata,
    /// `data` was merged into the module's store.
    Store,
}

/// A module's state changed (`on_update`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub module_id: ModuleId,
    pub kind: UpdateKind,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Props passed to a module instance at mount: `{moduleId, config, onAction,
/// onError, onUpdate, className}`.
///
/// Props are a snapshot; the instance never sees later changes. Callbacks do
/// not take part in equality, only `module_id` and `config` decide whether a
/// slot remounts.
#[derive(Clone)]
pub struct ModuleProps {
    pub module_id: ModuleId,
    pub config: ModuleConfig,
    pub on_action: Option<Callback<ActionEvent>>,
    pub on_error: Option<Callback<ErrorEvent>>,
    pub on_update: Option<Callback<UpdateEvent>>,
    pub class_name: Option<String>,
}

impl core::fmt::Debug for ModuleProps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleProps")
            .field("module_id", &self.module_id)
            .field("config", &self.config)
            .field("on_action", &self.on_action.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("class_name", &self.class_name)
            .finish()
    }
}

impl ModuleProps {
    /// Props for `config.module_id` with no callbacks.
    pub fn new(config: ModuleConfig) -> Self {
        Self {
            module_id: config.module_id.clone(),
            config,
            on_action: None,
            on_error: None,
            on_update: None,
            class_name: None,
        }
    }

    pub fn on_action(mut self, f: impl Fn(&ActionEvent) + Send + Sync + 'static) -> Self {
        self.on_action = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ErrorEvent) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(&UpdateEvent) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(f));
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// `true` when mounting `other` requires a remount.
    pub fn requires_remount(&self, other: &ModuleProps) -> bool {
        self.module_id != other.module_id || self.config != other.config
    }

    /// The `props` render scope.
    pub fn to_scope(&self) -> Value {
        json!({
            "moduleId": self.module_id,
            "className": self.class_name,
            "config": self.config,
        })
    }
}
