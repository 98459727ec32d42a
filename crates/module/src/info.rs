use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use erpmod_core::{DEFAULT_MODULE_VERSION, ModuleConfig, ModuleId, StateMap};

/// Display settings of a mounted module, derived from its config.
///
/// Flags read from `config.options`; the `show*` chrome flags default to on
/// except the header actions and save button.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub module_id: ModuleId,
    pub title: String,
    pub description: String,
    pub version: String,
    pub show_retry_button: bool,
    pub show_footer: bool,
    pub show_status: bool,
    pub show_actions: bool,
    pub show_header_actions: bool,
    pub show_save_button: bool,
    pub api_endpoints: BTreeMap<String, String>,
    /// Remaining module options, visible to templates under `module.*`.
    #[serde(skip)]
    pub options: StateMap,
}

impl ModuleInfo {
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self {
            module_id: config.module_id.clone(),
            title: config.title.clone().unwrap_or_default(),
            description: config.description.clone().unwrap_or_default(),
            version: config
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_MODULE_VERSION.to_string()),
            show_retry_button: config.flag("showRetryButton", true),
            show_footer: config.flag("showFooter", true),
            show_status: config.flag("showStatus", true),
            show_actions: config.flag("showActions", true),
            show_header_actions: config.flag("showHeaderActions", false),
            show_save_button: config.flag("showSaveButton", false),
            api_endpoints: config.api_endpoints.clone(),
            options: config.options.as_object().cloned().unwrap_or_default(),
        }
    }

    /// Merge a metadata patch: known keys update the typed fields, the rest
    /// land in `options`.
    pub fn apply_patch(&mut self, patch: &Value) {
        let Some(patch) = patch.as_object() else {
            return;
        };
        for (key, value) in patch {
            match (key.as_str(), value) {
                ("title", Value::String(s)) => self.title = s.clone(),
                ("description", Value::String(s)) => self.description = s.clone(),
                ("version", Value::String(s)) => self.version = s.clone(),
                ("showRetryButton", Value::Bool(b)) => self.show_retry_button = *b,
                ("showFooter", Value::Bool(b)) => self.show_footer = *b,
                ("showStatus", Value::Bool(b)) => self.show_status = *b,
                ("showActions", Value::Bool(b)) => self.show_actions = *b,
                ("showHeaderActions", Value::Bool(b)) => self.show_header_actions = *b,
                ("showSaveButton", Value::Bool(b)) => self.show_save_button = *b,
                _ => {
                    self.options.insert(key.clone(), value.clone());
                }
            }
        }
    }

    pub fn endpoint(&self, name: &str) -> Option<&str> {
        self.api_endpoints.get(name).map(String::as_str)
    }

    /// The `module` render scope: options first, typed fields on top.
    pub fn to_scope(&self) -> Value {
        let mut scope = self.options.clone();
        if let Ok(Value::Object(typed)) = serde_json::to_value(self) {
            scope.extend(typed);
        }
        Value::Object(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_follow_module_conventions() {
        let info = ModuleInfo::from_config(&ModuleConfig::new("inventory"));
        assert_eq!(info.version, "1.0.0");
        assert!(info.show_retry_button);
        assert!(info.show_footer);
        assert!(!info.show_header_actions);
        assert!(!info.show_save_button);
    }

    #[test]
    fn options_override_flags_and_stay_visible() {
        let config = ModuleConfig::new("inventory")
            .with_title("Inventory")
            .with_option("showRetryButton", json!(false))
            .with_option("showToolbar", json!(true));
        let info = ModuleInfo::from_config(&config);

        assert!(!info.show_retry_button);
        let scope = info.to_scope();
        assert_eq!(scope["title"], json!("Inventory"));
        assert_eq!(scope["showRetryButton"], json!(false));
        assert_eq!(scope["showToolbar"], json!(true));
        assert_eq!(scope["moduleId"], json!("inventory"));
    }

    #[test]
    fn metadata_patch_updates_typed_and_free_fields() {
        let mut info = ModuleInfo::from_config(&ModuleConfig::new("m"));
        info.apply_patch(&json!({"title": "Renamed", "showFooter": false, "theme": "dark"}));
        assert_eq!(info.title, "Renamed");
        assert!(!info.show_footer);
        assert_eq!(info.options.get("theme"), Some(&json!("dark")));
    }
}
