//! `erpmod-bridge`
//!
//! **Responsibility:** mount registered modules into a host page and tear
//! them down again.
//!
//! A [`ModuleSlot`] resolves a module id through the registry, allocates a
//! fresh [`Container`] on the [`HostPage`], and drives one
//! `ModuleInstance` through its lifecycle. Failures of a module's data load
//! stay inside that module; only construction-time errors reach the caller.

pub mod page;
pub mod slot;

pub use page::{Container, ContainerState, HostPage};
pub use slot::{ModuleBridge, ModuleSlot, SlotView};
