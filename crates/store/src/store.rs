//! A single keyed, reactive state container.
//!
//! ## Notification model
//!
//! Every mutation (`update`, `dispatch`, `reset`) produces exactly one
//! notification sweep:
//!
//! 1. the change is applied under the store lock and a snapshot is taken
//! 2. the subscriber list is copied and the lock is released
//! 3. every copied subscriber is invoked, in subscription order, before the
//!    mutating call returns
//!
//! Because the sweep iterates over a copy, a callback may subscribe or
//! unsubscribe (on this or any store) while it runs. A subscription removed
//! during a sweep still receives the in-flight snapshot; one added during a
//! sweep receives the next one.
//!
//! There is no batching: two sequential updates produce two sequential
//! sweeps, the second snapshot containing every field from the first that
//! the second did not overwrite.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

use erpmod_core::{StateMap, StoreKey, shallow_merge};

use crate::action::StoreActions;
use crate::error::StoreError;

/// Subscriber callback.
pub type Subscriber = Arc<dyn Fn(&StoreSnapshot) + Send + Sync>;

/// What caused a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// Direct shallow-merge update touching `fields`.
    Update { fields: Vec<String> },
    /// A named action (reducer) was dispatched.
    Action { name: String, payload: Value },
    /// The store was reset to its initial state.
    Reset,
}

/// Immutable view of a store delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub key: StoreKey,
    /// Incremented once per mutation, starting at 0 for the initial state.
    pub revision: u64,
    pub state: StateMap,
    pub change: StoreChange,
}

impl StoreSnapshot {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.state.get(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SubscriptionId(u64);

struct StoreInner {
    state: StateMap,
    initial: StateMap,
    revision: u64,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    actions: StoreActions,
    destroyed: bool,
}

/// Keyed reactive state container.
///
/// Stores are shared (`Arc<Store>`): any holder may read and write, and
/// writes are unsynchronized in the optimistic-concurrency sense (last write
/// wins).
pub struct Store {
    key: StoreKey,
    inner: Mutex<StoreInner>,
}

impl core::fmt::Debug for Store {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Store")
            .field("key", &self.key)
            .field("revision", &inner.revision)
            .field("state", &inner.state)
            .field("subscribers", &inner.subscribers.len())
            .field("actions", &inner.actions)
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

impl Store {
    pub(crate) fn new(key: StoreKey, initial: StateMap, actions: StoreActions) -> Self {
        Self {
            key,
            inner: Mutex::new(StoreInner {
                state: initial.clone(),
                initial,
                revision: 0,
                next_subscription: 0,
                subscribers: Vec::new(),
                actions,
                destroyed: false,
            }),
        }
    }

    // A panic inside a reducer poisons the lock; the state it guards is still
    // a valid map, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Copy of the current state.
    pub fn state(&self) -> StateMap {
        self.lock().state.clone()
    }

    /// Copy of one field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.lock().state.get(field).cloned()
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// `true` once the owning manager destroyed this store.
    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    /// Snapshot of the current state without mutating anything.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.lock();
        StoreSnapshot {
            key: self.key.clone(),
            revision: inner.revision,
            state: inner.state.clone(),
            change: StoreChange::Update { fields: Vec::new() },
        }
    }

    /// Shallow-merge `partial` and notify every subscriber synchronously.
    pub fn update(&self, partial: StateMap) -> StoreSnapshot {
        let Ok(snapshot) = self.mutate::<Infallible, _>(|inner| {
            let fields = shallow_merge(&mut inner.state, partial);
            Ok(StoreChange::Update { fields })
        });
        snapshot
    }

    /// Run the named reducer and merge the partial state it returns.
    ///
    /// Reducers run while the store is locked and must not call back into the
    /// store.
    pub fn dispatch(&self, action: &str, payload: Value) -> Result<StoreSnapshot, StoreError> {
        self.mutate(|inner| {
            let reducer = inner.actions.get(action).cloned().ok_or_else(|| {
                StoreError::UnknownAction {
                    store: self.key.clone(),
                    action: action.to_string(),
                }
            })?;
            let partial = reducer(&inner.state, &payload);
            shallow_merge(&mut inner.state, partial);
            Ok(StoreChange::Action {
                name: action.to_string(),
                payload,
            })
        })
    }

    /// Restore the initial state (fields added since creation are removed).
    pub fn reset(&self) -> StoreSnapshot {
        let Ok(snapshot) = self.mutate::<Infallible, _>(|inner| {
            inner.state = inner.initial.clone();
            Ok(StoreChange::Reset)
        });
        snapshot
    }

    /// Register `callback` for every future notification.
    ///
    /// Each call creates an independent subscription; subscribing the same
    /// closure twice needs two unsubscribes.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Unsubscribe
    where
        F: Fn(&StoreSnapshot) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        if inner.destroyed {
            tracing::warn!(store = %self.key, "subscribing to a destroyed store; it will never notify");
        } else {
            let subscriber: Subscriber = Arc::new(callback);
            inner.subscribers.push((id, subscriber));
        }
        Unsubscribe {
            store: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    /// Drop all subscribers without a final notification.
    pub(crate) fn destroy(&self) {
        let mut inner = self.lock();
        inner.subscribers.clear();
        inner.destroyed = true;
    }

    fn mutate<E, F>(&self, apply: F) -> Result<StoreSnapshot, E>
    where
        F: FnOnce(&mut StoreInner) -> Result<StoreChange, E>,
    {
        let (snapshot, subscribers) = {
            let mut inner = self.lock();
            let change = apply(&mut inner)?;
            inner.revision += 1;
            if inner.destroyed {
                tracing::warn!(store = %self.key, "write to a destroyed store; no subscriber is notified");
            }
            let snapshot = StoreSnapshot {
                key: self.key.clone(),
                revision: inner.revision,
                state: inner.state.clone(),
                change,
            };
            let subscribers: Vec<Subscriber> =
                inner.subscribers.iter().map(|(_, s)| Arc::clone(s)).collect();
            (snapshot, subscribers)
        };

        for subscriber in &subscribers {
            subscriber(&snapshot);
        }
        Ok(snapshot)
    }
}

/// Handle returned by [`Store::subscribe`].
///
/// Dropping the handle does **not** unsubscribe; call [`Unsubscribe::unsubscribe`].
#[derive(Debug)]
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Unsubscribe {
    store: Weak<Store>,
    id: SubscriptionId,
}

impl Unsubscribe {
    /// Remove the subscription. Returns `false` if it was already gone
    /// (store destroyed or dropped).
    pub fn unsubscribe(self) -> bool {
        match self.store.upgrade() {
            Some(store) => store.unsubscribe(self.id),
            None => false,
        }
    }
}
