//! Validation predicates for module ids, configs and props.
//!
//! Every validator collects all violations instead of stopping at the first
//! one; callers turn the result into an error with
//! [`ValidationErrors::into_result`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ModuleConfig, ModuleMetadata};
use crate::error::ValidationErrors;

/// Check the shape of a module id.
pub fn validate_module_id(id: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if id.trim().is_empty() {
        errors.push("moduleId is required");
        return errors;
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        errors.push(format!("moduleId `{id}` contains invalid character `{bad}`"));
    }
    errors
}

/// `MAJOR.MINOR.PATCH` with numeric components.
pub fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn is_valid_endpoint(path: &str) -> bool {
    path.starts_with('/') || path.starts_with("http://") || path.starts_with("https://")
}

fn check_endpoints<'a>(
    errors: &mut ValidationErrors,
    endpoints: impl IntoIterator<Item = (&'a String, &'a String)>,
) {
    for (name, path) in endpoints {
        if name.trim().is_empty() {
            errors.push("apiEndpoints keys must not be empty");
        }
        if !is_valid_endpoint(path) {
            errors.push(format!(
                "apiEndpoints.{name} must be an absolute path or http(s) URL, got `{path}`"
            ));
        }
    }
}

/// Validate registration metadata.
pub fn validate_metadata(metadata: &ModuleMetadata) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if let Some(version) = &metadata.version {
        if !is_valid_version(version) {
            errors.push(format!("version must look like MAJOR.MINOR.PATCH, got `{version}`"));
        }
    }
    check_endpoints(&mut errors, &metadata.api_endpoints);
    errors
}

/// Validate a typed module config.
pub fn validate_module_config(config: &ModuleConfig) -> ValidationErrors {
    let mut errors = validate_module_id(config.module_id.as_str());

    if let Some(title) = &config.title {
        if title.trim().is_empty() {
            errors.push("title must not be blank when present");
        }
    }
    if let Some(version) = &config.version {
        if !is_valid_version(version) {
            errors.push(format!("version must look like MAJOR.MINOR.PATCH, got `{version}`"));
        }
    }
    check_endpoints(&mut errors, &config.api_endpoints);
    if let Some(key) = &config.container_store {
        if key.as_str().trim().is_empty() {
            errors.push("containerStore must not be empty when present");
        }
    }
    if !config.options.is_object() {
        errors.push("options must be an object");
    }
    errors
}

/// Shape-check a raw JSON config before it is deserialized.
pub fn validate_config_json(value: &Value) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let Some(map) = value.as_object() else {
        errors.push("config must be an object");
        return errors;
    };

    match map.get("moduleId") {
        None | Some(Value::Null) => errors.push("moduleId is required"),
        Some(Value::String(_)) => {}
        Some(_) => errors.push("moduleId must be a string"),
    }
    for field in ["title", "description", "version", "containerStore"] {
        if let Some(v) = map.get(field) {
            if !v.is_string() && !v.is_null() {
                errors.push(format!("{field} must be a string"));
            }
        }
    }
    match map.get("apiEndpoints") {
        None | Some(Value::Null) => {}
        Some(Value::Object(endpoints)) => {
            for (name, path) in endpoints {
                if !path.is_string() {
                    errors.push(format!("apiEndpoints.{name} must be a string"));
                }
            }
        }
        Some(_) => errors.push("apiEndpoints must be an object of strings"),
    }
    if let Some(options) = map.get("options") {
        if !options.is_object() && !options.is_null() {
            errors.push("options must be an object");
        }
    }
    errors
}

/// JSON type expected for a declared prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl PropKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            PropKind::String => value.is_string(),
            PropKind::Number => value.is_number(),
            PropKind::Boolean => value.is_boolean(),
            PropKind::Object => value.is_object(),
            PropKind::Array => value.is_array(),
            PropKind::Any => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PropKind::String => "string",
            PropKind::Number => "number",
            PropKind::Boolean => "boolean",
            PropKind::Object => "object",
            PropKind::Array => "array",
            PropKind::Any => "any",
        }
    }
}

/// Declaration of one module option a component class accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropSpec {
    pub name: String,
    pub kind: PropKind,
    pub required: bool,
}

impl PropSpec {
    pub fn required(name: impl Into<String>, kind: PropKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: PropKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Check `props` (a JSON object) against declared specs.
///
/// Undeclared props are allowed; declared ones must have the right type and
/// required ones must be present.
pub fn validate_props(props: &Value, specs: &[PropSpec]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let empty = serde_json::Map::new();
    let map = props.as_object().unwrap_or(&empty);

    for spec in specs {
        match map.get(&spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    errors.push(format!("required prop `{}` is missing", spec.name));
                }
            }
            Some(value) if !spec.kind.matches(value) => {
                errors.push(format!("prop `{}` must be of type {}", spec.name, spec.kind.as_str()));
            }
            Some(_) => {}
        }
    }
    errors
}

/// Duplicate names in a prop declaration list.
pub fn validate_prop_specs(specs: &[PropSpec]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let mut seen = std::collections::BTreeSet::new();
    for spec in specs {
        if spec.name.trim().is_empty() {
            errors.push("prop names must not be empty");
        } else if !seen.insert(spec.name.as_str()) {
            errors.push(format!("prop `{}` is declared more than once", spec.name));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn module_id_rules() {
        assert!(validate_module_id("dashboard").is_empty());
        assert!(validate_module_id("finance.ledger-v2_x").is_empty());
        assert_eq!(validate_module_id("").violations(), ["moduleId is required"]);
        assert_eq!(validate_module_id("has space").len(), 1);
    }

    #[test]
    fn config_validation_collects_everything() {
        let mut config = ModuleConfig::new("bad id")
            .with_title("   ")
            .with_version("1.0")
            .with_endpoint("list", "api/list");
        config.options = json!([]);

        let errors = validate_module_config(&config);
        assert_eq!(errors.len(), 5, "{errors}");
    }

    #[test]
    fn valid_config_passes() {
        let config = ModuleConfig::new("inventory")
            .with_title("Inventory")
            .with_version("2.1.0")
            .with_endpoint("list", "/api/inventory")
            .with_endpoint("remote", "https://erp.example/api");
        assert!(validate_module_config(&config).is_empty());
    }

    #[test]
    fn props_are_checked_against_specs() {
        let specs = vec![
            PropSpec::required("pageSize", PropKind::Number),
            PropSpec::optional("showFooter", PropKind::Boolean),
            PropSpec::required("columns", PropKind::Array),
        ];

        let errors = validate_props(&json!({"pageSize": "20", "showFooter": true}), &specs);
        assert_eq!(
            errors.violations(),
            [
                "prop `pageSize` must be of type number",
                "required prop `columns` is missing"
            ]
        );

        assert!(validate_props(&json!({"pageSize": 20, "columns": [], "extra": 1}), &specs).is_empty());
    }

    #[test]
    fn duplicate_prop_specs_are_reported() {
        let specs = vec![
            PropSpec::optional("a", PropKind::Any),
            PropSpec::optional("a", PropKind::String),
        ];
        assert_eq!(validate_prop_specs(&specs).len(), 1);
    }

    proptest! {
        #[test]
        fn numeric_triples_are_valid_versions(a in 0u32..1000, b in 0u32..1000, c in 0u32..1000) {
            let version = format!("{a}.{b}.{c}");
            prop_assert!(is_valid_version(&version));
        }

        #[test]
        fn ids_with_whitespace_are_rejected(prefix in "[a-z]{1,8}", suffix in "[a-z]{1,8}") {
            let id = format!("{prefix} {suffix}");
            prop_assert!(!validate_module_id(&id).is_empty());
        }
    }
}
