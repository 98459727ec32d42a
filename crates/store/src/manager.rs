//! Keyed store registry.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use serde_json::Value;

use erpmod_core::{StateMap, StoreKey};

use crate::action::StoreActions;
use crate::error::StoreError;
use crate::store::{Store, StoreSnapshot, Unsubscribe};

/// Creates, retrieves and destroys keyed stores.
///
/// - At most one live store per key: `create_store` on an existing key returns
///   the existing store and discards the supplied initial state.
/// - Only `destroy_store` removes a store. Module instances call it for
///   their private store on dispose; keyed shared stores stay until the host
///   destroys them.
/// - One manager is constructed by the host and shared (`Arc`) with every
///   module instance; there is no process-wide global.
#[derive(Debug, Default)]
pub struct StoreManager {
    stores: RwLock<IndexMap<StoreKey, Arc<Store>>>,
}

impl StoreManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<StoreKey, Arc<Store>>> {
        self.stores.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<StoreKey, Arc<Store>>> {
        self.stores.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create the store for `key`, or return the existing one unchanged.
    pub fn create_store(&self, key: impl Into<StoreKey>, initial: StateMap) -> Arc<Store> {
        self.create_store_with_actions(key, initial, StoreActions::new())
    }

    /// Like [`create_store`](Self::create_store) with a table of named actions.
    ///
    /// On an existing key both `initial` and `actions` are discarded.
    pub fn create_store_with_actions(
        &self,
        key: impl Into<StoreKey>,
        initial: StateMap,
        actions: StoreActions,
    ) -> Arc<Store> {
        let key = key.into();
        let mut stores = self.write();
        if let Some(existing) = stores.get(&key) {
            tracing::debug!(store = %key, "store already exists; supplied initial state discarded");
            return Arc::clone(existing);
        }

        let store = Arc::new(Store::new(key.clone(), initial, actions));
        stores.insert(key.clone(), Arc::clone(&store));
        tracing::debug!(store = %key, "store created");
        store
    }

    pub fn get_store(&self, key: &str) -> Option<Arc<Store>> {
        self.read().get(key).cloned()
    }

    pub fn has_store(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Remove the store. Lingering subscribers are dropped without a final
    /// notification. Returns `false` if there was nothing to destroy.
    pub fn destroy_store(&self, key: &str) -> bool {
        let removed = self.write().shift_remove(key);
        match removed {
            Some(store) => {
                store.destroy();
                tracing::debug!(store = %key, "store destroyed");
                true
            }
            None => {
                tracing::debug!(store = %key, "destroy_store: no such store");
                false
            }
        }
    }

    /// Shallow-merge `partial` into `store` and notify its subscribers before
    /// returning.
    pub fn update(&self, store: &Store, partial: StateMap) -> StoreSnapshot {
        store.update(partial)
    }

    /// Subscribe to `store`; see [`Store::subscribe`].
    pub fn subscribe<F>(&self, store: &Arc<Store>, callback: F) -> Unsubscribe
    where
        F: Fn(&StoreSnapshot) + Send + Sync + 'static,
    {
        store.subscribe(callback)
    }

    /// Dispatch a named action on `store`.
    pub fn dispatch(
        &self,
        store: &Store,
        action: &str,
        payload: Value,
    ) -> Result<StoreSnapshot, StoreError> {
        store.dispatch(action, payload)
    }

    /// Dispatch by key.
    pub fn dispatch_by_key(
        &self,
        key: &str,
        action: &str,
        payload: Value,
    ) -> Result<StoreSnapshot, StoreError> {
        let store = self
            .get_store(key)
            .ok_or_else(|| StoreError::NotFound(StoreKey::from(key)))?;
        store.dispatch(action, payload)
    }

    /// Update by key; `false` if the store does not exist.
    pub fn update_by_key(&self, key: &str, partial: StateMap) -> bool {
        match self.get_store(key) {
            Some(store) => {
                store.update(partial);
                true
            }
            None => false,
        }
    }

    /// Reset a store to its initial state; `false` if it does not exist.
    pub fn reset_store(&self, key: &str) -> bool {
        match self.get_store(key) {
            Some(store) => {
                store.reset();
                true
            }
            None => false,
        }
    }

    /// Copy of a store's current state.
    pub fn snapshot(&self, key: &str) -> Option<StateMap> {
        self.get_store(key).map(|store| store.state())
    }

    /// Keys of all live stores, in creation order.
    pub fn store_keys(&self) -> Vec<StoreKey> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpmod_core::state_from;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn create_store_is_idempotent_per_key() {
        let manager = StoreManager::new();
        let first = manager.create_store("k", state_from(json!({"s": 1})));
        let second = manager.create_store("k", state_from(json!({"s": 2, "other": true})));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(Value::Object(second.state()), json!({"s": 1}));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn get_store_returns_none_for_unknown_key() {
        let manager = StoreManager::new();
        assert!(manager.get_store("missing").is_none());
        assert!(manager.snapshot("missing").is_none());
        assert!(!manager.update_by_key("missing", StateMap::new()));
        assert!(!manager.reset_store("missing"));
    }

    #[test]
    fn destroy_removes_and_silences_subscribers() {
        let manager = StoreManager::new();
        let store = manager.create_store("k", StateMap::new());
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let _sub = manager.subscribe(&store, move |_| *counter.lock().unwrap() += 1);

        assert!(manager.destroy_store("k"));
        assert!(!manager.destroy_store("k"));
        manager.update(&store, state_from(json!({"late": 1})));

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(!manager.has_store("k"));

        let fresh = manager.create_store("k", state_from(json!({"fresh": true})));
        assert!(!Arc::ptr_eq(&store, &fresh));
        assert_eq!(fresh.get("fresh"), Some(json!(true)));
    }

    #[test]
    fn actions_reduce_into_partial_state() {
        let manager = StoreManager::new();
        let actions = StoreActions::new()
            .with("increment", |state, payload| {
                let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
                let by = payload.as_i64().unwrap_or(1);
                state_from(json!({"count": count + by}))
            })
            .with("reset", |_, _| state_from(json!({"count": 0})));
        let store = manager.create_store_with_actions("counter", state_from(json!({"count": 0})), actions);

        manager.dispatch(&store, "increment", Value::Null).unwrap();
        manager.dispatch(&store, "increment", json!(5)).unwrap();
        assert_eq!(store.get("count"), Some(json!(6)));

        let snap = manager.dispatch_by_key("counter", "reset", Value::Null).unwrap();
        assert_eq!(snap.get("count"), Some(&json!(0)));

        let err = manager.dispatch(&store, "unknown-action", Value::Null).unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownAction {
                store: StoreKey::from("counter"),
                action: "unknown-action".to_string()
            }
        );
        assert!(matches!(
            manager.dispatch_by_key("nope", "reset", Value::Null),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn subscriber_can_drive_another_store() {
        let manager = Arc::new(StoreManager::new());
        let counter = manager.create_store("counter", state_from(json!({"count": 0})));
        let history = manager.create_store("history", state_from(json!({"actions": []})));

        let _sub = {
            let history = Arc::clone(&history);
            counter.subscribe(move |snap| {
                let mut actions = history
                    .get("actions")
                    .and_then(|v| v.as_array().cloned())
                    .unwrap_or_default();
                actions.push(json!({"type": "counter-updated", "revision": snap.revision}));
                history.update(state_from(json!({"actions": actions})));
            })
        };

        manager.update(&counter, state_from(json!({"count": 1})));
        manager.update(&counter, state_from(json!({"count": 0})));

        let actions = history.get("actions").unwrap();
        assert_eq!(actions.as_array().unwrap().len(), 2);
    }

    #[test]
    fn store_keys_are_listed_in_creation_order() {
        let manager = StoreManager::new();
        manager.create_store("b", StateMap::new());
        manager.create_store("a", StateMap::new());
        manager.create_store("c", StateMap::new());
        manager.destroy_store("a");

        let keys: Vec<String> = manager.store_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
