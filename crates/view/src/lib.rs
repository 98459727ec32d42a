//! `erpmod-view`
//!
//! **Responsibility:** typed view descriptions for module templates.
//!
//! - [`node`]: the tree (`ViewNode`) and its builders
//! - [`compile`]: validation and action/slot discovery
//! - [`render`]: HTML output against a JSON scope
//! - [`TemplateRegistry`]: compiled templates by id
//! - [`layouts`]: the built-in module layouts

pub mod compile;
pub mod error;
pub mod layouts;
pub mod node;
pub mod registry;
pub mod render;

pub use compile::{CompiledTemplate, SCOPE_ROOTS, compile};
pub use error::TemplateError;
pub use node::{
    Attr, Binding, Condition, Element, ViewNode, bind, each, el, fragment, slot, slot_or, text, when,
    when_else,
};
pub use registry::TemplateRegistry;
pub use render::escape_html;
