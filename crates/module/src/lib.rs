//! `erpmod-module`
//!
//! **Responsibility:** the lifecycle contract shared by every module.
//!
//! A module is a [`Module`] implementation (behaviour hooks) bound to a
//! [`ComponentClass`] (template, methods, prop specs, initial store state).
//! [`ModuleInstance`] drives one mounted instance through
//! [`LifecycleState`] and supplies the cross-cutting parts: store wiring,
//! loading/error bookkeeping, host callbacks and user notifications.

pub mod behavior;
pub mod class;
pub mod context;
pub mod events;
pub mod info;
pub mod instance;
pub mod lifecycle;
pub mod notify;

pub use behavior::{Module, ModuleBase};
pub use class::{BUILTIN_METHODS, ComponentClass, Constructor, Method, MethodTable};
pub use context::{ModuleContext, ModuleStatus, RenderFrame, RenderTarget};
pub use events::{ActionEvent, Callback, ErrorEvent, ModuleProps, UpdateEvent, UpdateKind};
pub use info::ModuleInfo;
pub use instance::{LoadFuture, ModuleInstance};
pub use lifecycle::LifecycleState;
pub use notify::{InMemoryNotifier, Notification, Notifier, Severity, TracingNotifier};
