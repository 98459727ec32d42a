//! `erpmod-host`
//!
//! **Responsibility:** assemble the framework for a host application.
//!
//! [`Framework`] is the dependency-injection root (registry, stores,
//! templates, factory, notifier, host page); [`FrameworkOptions`] carries the
//! application-wide settings, from code or from the environment.

pub mod framework;
pub mod options;

pub use framework::Framework;
pub use options::{FrameworkOptions, OptionsError};
