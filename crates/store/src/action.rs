//! Named reducers attached to a store at creation time.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use erpmod_core::StateMap;

/// Reducer: current state + payload → partial state to shallow-merge.
pub type Reducer = Arc<dyn Fn(&StateMap, &Value) -> StateMap + Send + Sync>;

/// Table of actions a store accepts through `dispatch`.
#[derive(Clone, Default)]
pub struct StoreActions(BTreeMap<String, Reducer>);

impl StoreActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an action.
    pub fn with<F>(mut self, name: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&StateMap, &Value) -> StateMap + Send + Sync + 'static,
    {
        self.0.insert(name.into(), Arc::new(reducer));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Reducer> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for StoreActions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}
