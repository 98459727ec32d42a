//! `erpmod-core`: framework foundation building blocks.
//!
//! Identifiers, the error taxonomy, the module config contract, state maps
//! and stateless validation/helper functions. Nothing in here holds state.

pub mod config;
pub mod error;
pub mod helpers;
pub mod id;
pub mod state;
pub mod validation;

pub use config::{DEFAULT_MODULE_VERSION, ModuleConfig, ModuleMetadata};
pub use error::{DataLoadError, FrameworkError, FrameworkResult, ValidationErrors};
pub use id::{ContainerId, InstanceId, ModuleId, StoreKey};
pub use state::{StateMap, shallow_merge, state_from};
pub use validation::{PropKind, PropSpec};
