//! Module config contract shared by the factory, registry and bridge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameworkResult;
use crate::id::{ModuleId, StoreKey};
use crate::validation;

/// Default version reported for modules that do not declare one.
pub const DEFAULT_MODULE_VERSION: &str = "1.0.0";

/// Descriptive metadata stored with a registered module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub api_endpoints: BTreeMap<String, String>,
}

impl ModuleMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_endpoint(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.api_endpoints.insert(name.into(), path.into());
        self
    }

    pub fn version_or_default(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_MODULE_VERSION)
    }
}

/// Per-mount module configuration.
///
/// Equality is structural; the bridge remounts whenever the config of a slot
/// changes, so two configs that compare equal never cause a remount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    pub module_id: ModuleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub api_endpoints: BTreeMap<String, String>,
    /// Attach to an existing store instead of the instance-private one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_store: Option<StoreKey>,
    /// Free-form module settings (e.g. `showRetryButton`).
    #[serde(default = "empty_options", skip_serializing_if = "is_empty_options")]
    pub options: Value,
}

fn empty_options() -> Value {
    Value::Object(Default::default())
}

fn is_empty_options(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

impl ModuleConfig {
    pub fn new(module_id: impl Into<ModuleId>) -> Self {
        Self {
            module_id: module_id.into(),
            title: None,
            description: None,
            version: None,
            api_endpoints: BTreeMap::new(),
            container_store: None,
            options: empty_options(),
        }
    }

    /// Parse a raw JSON config, reporting every shape violation at once.
    pub fn from_json(value: &Value) -> FrameworkResult<Self> {
        validation::validate_config_json(value).into_result()?;
        let config: ModuleConfig = serde_json::from_value(value.clone())
            .map_err(|e| crate::error::FrameworkError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the typed config, collecting all violations.
    pub fn validate(&self) -> FrameworkResult<()> {
        validation::validate_module_config(self).into_result()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_endpoint(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.api_endpoints.insert(name.into(), path.into());
        self
    }

    pub fn with_container_store(mut self, key: impl Into<StoreKey>) -> Self {
        self.container_store = Some(key.into());
        self
    }

    /// Set one entry of `options`.
    pub fn with_option(mut self, name: impl Into<String>, value: Value) -> Self {
        if !self.options.is_object() {
            self.options = empty_options();
        }
        if let Value::Object(map) = &mut self.options {
            map.insert(name.into(), value);
        }
        self
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Boolean option with a default for absent or non-boolean values.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.option(name).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Metadata view of this config (used when a config seeds a registration).
    pub fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            version: self.version.clone(),
            api_endpoints: self.api_endpoints.clone(),
        }
    }
}
