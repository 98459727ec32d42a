//! Framework options, from code or from the environment.

use serde_json::{Map, Value};

use erpmod_observability::{LOG_FORMAT_ENV, LogFormat, UnknownLogFormat};

pub const DEBUG_ENV: &str = "ERPMOD_DEBUG";
pub const DEFAULT_OPTIONS_ENV: &str = "ERPMOD_DEFAULT_OPTIONS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("ERPMOD_DEBUG must be a boolean, got `{0}`")]
    InvalidDebug(String),

    #[error(transparent)]
    LogFormat(#[from] UnknownLogFormat),

    #[error("ERPMOD_DEFAULT_OPTIONS must be a JSON object: {0}")]
    InvalidDefaultOptions(String),
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkOptions {
    /// Verbose logging (`debug` instead of `info` when `RUST_LOG` is unset).
    pub debug: bool,
    pub log_format: LogFormat,
    /// Module options applied under every mounted config's own `options`.
    pub default_options: Map<String, Value>,
}

impl Default for FrameworkOptions {
    fn default() -> Self {
        let mut default_options = Map::new();
        default_options.insert("showRetryButton".to_string(), Value::Bool(true));
        Self {
            debug: false,
            log_format: LogFormat::default(),
            default_options,
        }
    }
}

impl FrameworkOptions {
    /// Read `ERPMOD_DEBUG`, `ERPMOD_LOG_FORMAT` and `ERPMOD_DEFAULT_OPTIONS`.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OptionsError> {
        let mut options = Self::default();

        if let Some(raw) = lookup(DEBUG_ENV) {
            options.debug = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "" | "0" | "false" | "no" | "off" => false,
                _ => return Err(OptionsError::InvalidDebug(raw)),
            };
        }
        if let Some(raw) = lookup(LOG_FORMAT_ENV) {
            options.log_format = raw.parse()?;
        }
        if let Some(raw) = lookup(DEFAULT_OPTIONS_ENV) {
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(extra)) => options.default_options.extend(extra),
                Ok(other) => return Err(OptionsError::InvalidDefaultOptions(format!("got {other}"))),
                Err(err) => return Err(OptionsError::InvalidDefaultOptions(err.to_string())),
            }
        }
        Ok(options)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_default_option(mut self, name: impl Into<String>, value: Value) -> Self {
        self.default_options.insert(name.into(), value);
        self
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
