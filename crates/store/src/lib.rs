//! `erpmod-store`
//!
//! **Responsibility:** keyed reactive state containers with synchronous,
//! ordered subscriber notification.
//!
//! Stores are the only shared mutable state between module instances. They
//! are keyed independently of instances, survive unmounts, and are removed
//! only through [`StoreManager::destroy_store`].

pub mod action;
pub mod error;
pub mod manager;
pub mod store;

pub use action::{Reducer, StoreActions};
pub use error::StoreError;
pub use manager::StoreManager;
pub use store::{Store, StoreChange, StoreSnapshot, Subscriber, Unsubscribe};
