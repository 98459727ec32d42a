//! Framework error model.

use thiserror::Error;

use crate::id::ModuleId;

/// Result type used across the framework crates.
pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// Every violation found while validating a config, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: impl Into<String>) {
        self.0.push(violation.into());
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn violations(&self) -> &[String] {
        &self.0
    }

    /// `Ok(())` when nothing was collected, otherwise a `ConfigValidation` error
    /// carrying the full list.
    pub fn into_result(self) -> FrameworkResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(FrameworkError::ConfigValidation(self))
        }
    }
}

impl From<Vec<String>> for ValidationErrors {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

/// Framework-level error.
///
/// Construction-time variants (`ConfigValidation`, `ModuleNotFound`,
/// `DuplicateModule`, `Mount`, `TemplateNotFound`) and `StoreAction` propagate
/// to the immediate caller. `DataLoad` is absorbed into the failing module's `Error` state and
/// never reaches the host page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    /// A module config or definition is malformed.
    #[error("config validation failed: {0}")]
    ConfigValidation(ValidationErrors),

    /// Lookup of an id that is not registered.
    #[error("module not found: {0}")]
    ModuleNotFound(ModuleId),

    /// An id is already registered with a different component class.
    #[error("module already registered with a different component class: {0}")]
    DuplicateModule(ModuleId),

    /// A module's data-loading hook failed.
    #[error("data load failed: {0}")]
    DataLoad(String),

    /// Invalid component class or unavailable container at mount time.
    #[error("mount failed: {0}")]
    Mount(String),

    /// A template id was referenced before it was registered.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A named store action could not be run.
    #[error("store action failed: {0}")]
    StoreAction(String),

    /// A lifecycle transition that the state machine does not allow.
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl FrameworkError {
    /// A validation error with a single violation.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(msg);
        Self::ConfigValidation(errors)
    }

    pub fn mount(msg: impl Into<String>) -> Self {
        Self::Mount(msg.into())
    }

    pub fn template_not_found(id: impl Into<String>) -> Self {
        Self::TemplateNotFound(id.into())
    }

    /// The violation list when this is a `ConfigValidation` error.
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            FrameworkError::ConfigValidation(errors) => Some(errors.violations()),
            _ => None,
        }
    }
}

/// Error raised inside a module's data-loading hook.
///
/// Data-access clients are external collaborators; whatever they fail with is
/// wrapped here and caught at the lifecycle boundary.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl DataLoadError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}

impl From<DataLoadError> for FrameworkError {
    fn from(value: DataLoadError) -> Self {
        FrameworkError::DataLoad(value.to_string())
    }
}
