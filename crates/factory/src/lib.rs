//! `erpmod-factory`
//!
//! **Responsibility:** turn templates and module definitions into component
//! classes ready for `ModuleRegistry::register`.

pub mod definition;
pub mod factory;

pub use definition::{ModuleDefinition, TemplateRef};
pub use factory::{ComponentFactory, MODULE_BASE};
