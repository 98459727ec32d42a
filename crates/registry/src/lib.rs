//! `erpmod-registry`
//!
//! **Responsibility:** map module ids to component classes and metadata.
//!
//! The registry is pure in-memory state with no I/O. It is an explicit value
//! constructed by the host and passed to whoever mounts modules.

pub mod descriptor;
pub mod registry;

pub use descriptor::{MetadataPatch, ModuleDescriptor};
pub use registry::{ListenerHandle, ModuleRegistry, RegistryEvent};
