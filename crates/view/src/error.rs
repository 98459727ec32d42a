use thiserror::Error;

use erpmod_core::{FrameworkError, ValidationErrors};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template `{id}` is invalid: {violations}")]
    Invalid {
        id: String,
        violations: ValidationErrors,
    },

    #[error("template not found: {0}")]
    NotFound(String),

    #[error("template `{template}` has no slot named `{slot}`")]
    UnknownSlot { template: String, slot: String },
}

impl From<TemplateError> for FrameworkError {
    fn from(value: TemplateError) -> Self {
        match value {
            TemplateError::NotFound(id) => FrameworkError::TemplateNotFound(id),
            TemplateError::Invalid { id, violations } => {
                let mut errors = ValidationErrors::new();
                for violation in violations.violations() {
                    errors.push(format!("template `{id}`: {violation}"));
                }
                FrameworkError::ConfigValidation(errors)
            }
            other @ TemplateError::UnknownSlot { .. } => FrameworkError::invalid_config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_template_not_found() {
        let err: FrameworkError = TemplateError::NotFound("module.missing".into()).into();
        assert_eq!(err, FrameworkError::TemplateNotFound("module.missing".into()));
    }

    #[test]
    fn invalid_maps_each_violation() {
        let violations = ValidationErrors::from(vec!["a".to_string(), "b".to_string()]);
        let err: FrameworkError = TemplateError::Invalid {
            id: "t".into(),
            violations,
        }
        .into();
        assert_eq!(err.violations().unwrap(), ["template `t`: a", "template `t`: b"]);
    }
}
