//! Per-instance context handed to every module hook.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use erpmod_core::{
    DataLoadError, FrameworkError, FrameworkResult, InstanceId, ModuleConfig, ModuleId, StateMap,
};
use erpmod_store::{Store, StoreManager, Unsubscribe};
use erpmod_view::CompiledTemplate;

use crate::behavior::Module;
use crate::class::ComponentClass;
use crate::events::{ActionEvent, ErrorEvent, ModuleProps, UpdateEvent, UpdateKind};
use crate::info::ModuleInfo;
use crate::lifecycle::LifecycleState;
use crate::notify::{Notification, Notifier};

/// Where rendered HTML goes: a container on the host page.
pub trait RenderTarget: Send + Sync {
    /// `true` while the target is part of the visible document.
    fn is_attached(&self) -> bool;

    fn write(&self, html: String);
}

/// Loading and error bookkeeping of one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub lifecycle: LifecycleState,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub data: Value,
}

impl ModuleStatus {
    fn new() -> Self {
        Self {
            lifecycle: LifecycleState::Constructed,
            is_loading: false,
            error: None,
            last_updated: None,
            data: Value::Null,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == LifecycleState::Ready
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The `state` render scope.
    pub fn to_scope(&self) -> Value {
        json!({
            "lifecycle": self.lifecycle,
            "isLoading": self.is_loading,
            "isReady": self.is_ready(),
            "hasError": self.has_error(),
            "error": self.error,
            "lastUpdated": self.last_updated.map(|t| t.to_rfc3339()),
            "data": self.data,
        })
    }
}

/// Everything a render needs: the class template and the JSON scope
/// `{props, module, state, store}`.
pub struct RenderFrame<'a> {
    pub template: &'a CompiledTemplate,
    pub scope: Value,
}

impl RenderFrame<'_> {
    pub fn render_template(&self) -> String {
        self.template.render(&self.scope)
    }

    pub fn store(&self) -> &Value {
        &self.scope["store"]
    }

    pub fn state(&self) -> &Value {
        &self.scope["state"]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadKind {
    Initial,
    Refresh,
}

pub(crate) struct Shared {
    pub(crate) instance_id: InstanceId,
    pub(crate) props: ModuleProps,
    pub(crate) class: Arc<ComponentClass>,
    pub(crate) module: Arc<dyn Module>,
    pub(crate) stores: Arc<StoreManager>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) store: OnceLock<Arc<Store>>,
    pub(crate) info: Mutex<ModuleInfo>,
    pub(crate) status: Mutex<ModuleStatus>,
    pub(crate) target: Mutex<Option<Arc<dyn RenderTarget>>>,
    pub(crate) subscription: Mutex<Option<Unsubscribe>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle on one module instance, passed to every [`Module`] hook and method.
///
/// Cheap to clone. Writes through a context whose instance was disposed are
/// dropped, so late async work cannot touch an unmounted module.
#[derive(Clone)]
pub struct ModuleContext {
    pub(crate) shared: Arc<Shared>,
}

impl core::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("instance_id", &self.shared.instance_id)
            .field("module_id", &self.shared.props.module_id)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl ModuleContext {
    pub(crate) fn new(
        class: Arc<ComponentClass>,
        props: ModuleProps,
        stores: Arc<StoreManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let info = ModuleInfo::from_config(&props.config);
        let module = class.construct();
        Self {
            shared: Arc::new(Shared {
                instance_id: InstanceId::new(),
                props,
                class,
                module,
                stores,
                notifier,
                store: OnceLock::new(),
                info: Mutex::new(info),
                status: Mutex::new(ModuleStatus::new()),
                target: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.shared.instance_id
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.shared.props.module_id
    }

    pub fn props(&self) -> &ModuleProps {
        &self.shared.props
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.shared.props.config
    }

    pub fn class(&self) -> &Arc<ComponentClass> {
        &self.shared.class
    }

    pub fn info(&self) -> ModuleInfo {
        lock(&self.shared.info).clone()
    }

    pub fn status(&self) -> ModuleStatus {
        lock(&self.shared.status).clone()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        lock(&self.shared.status).lifecycle
    }

    /// `false` once the instance is disposed.
    pub fn is_live(&self) -> bool {
        !self.lifecycle().is_disposed()
    }

    /// The instance's store; `None` before setup.
    pub fn store(&self) -> Option<&Arc<Store>> {
        self.shared.store.get()
    }

    pub fn stores(&self) -> &Arc<StoreManager> {
        &self.shared.stores
    }

    /// One field of the instance's store.
    pub fn store_value(&self, field: &str) -> Option<Value> {
        self.store().and_then(|store| store.get(field))
    }

    /// Path of a configured API endpoint.
    pub fn endpoint(&self, name: &str) -> Option<String> {
        lock(&self.shared.info).endpoint(name).map(str::to_string)
    }

    /// Shallow-merge into the instance's store.
    ///
    /// Returns `false` (and writes nothing) before setup or after dispose.
    pub fn update_store(&self, partial: StateMap) -> bool {
        if !self.is_live() {
            tracing::warn!(
                module_id = %self.module_id(),
                instance_id = %self.instance_id(),
                "store write after unmount dropped"
            );
            return false;
        }
        match self.store() {
            Some(store) => {
                store.update(partial);
                true
            }
            None => false,
        }
    }

    /// Run a named store action on the instance's store.
    ///
    /// An action the store does not define is a `StoreAction` error.
    pub fn dispatch(&self, action: &str, payload: Value) -> FrameworkResult<bool> {
        if !self.is_live() {
            return Ok(false);
        }
        let Some(store) = self.store() else {
            return Ok(false);
        };
        store
            .dispatch(action, payload)
            .map(|_| true)
            .map_err(|e| FrameworkError::StoreAction(e.to_string()))
    }

    /// Forward an action to the host's `on_action` callback.
    pub fn trigger_action(&self, action: impl Into<String>, payload: Value) {
        let event = ActionEvent {
            module_id: self.module_id().clone(),
            action: action.into(),
            payload,
            timestamp: Utc::now(),
        };
        tracing::debug!(module_id = %event.module_id, action = %event.action, "module action");
        if let Some(on_action) = &self.shared.props.on_action {
            on_action(&event);
        }
    }

    /// Record a state change and report it to the host's `on_update`
    /// callback.
    pub fn update_state(&self, kind: UpdateKind, data: Value) {
        if !self.is_live() {
            return;
        }
        let timestamp = Utc::now();
        match kind {
            UpdateKind::Data => {
                let mut status = lock(&self.shared.status);
                status.data = data.clone();
                status.last_updated = Some(timestamp);
            }
            UpdateKind::Metadata => {
                lock(&self.shared.info).apply_patch(&data);
                lock(&self.shared.status).last_updated = Some(timestamp);
            }
            UpdateKind::Store => {
                if let (Some(store), Value::Object(partial)) = (self.store(), &data) {
                    store.update(partial.clone());
                }
                lock(&self.shared.status).last_updated = Some(timestamp);
            }
        }
        self.emit_update(kind, data, timestamp);
        if kind != UpdateKind::Store {
            self.rerender();
        }
    }

    fn emit_update(&self, kind: UpdateKind, data: Value, timestamp: DateTime<Utc>) {
        if let Some(on_update) = &self.shared.props.on_update {
            on_update(&UpdateEvent {
                module_id: self.module_id().clone(),
                kind,
                data,
                timestamp,
            });
        }
    }

    /// Render with the current state.
    pub fn render(&self) -> String {
        let frame = self.frame();
        self.shared.module.render(&frame)
    }

    fn frame(&self) -> RenderFrame<'_> {
        let store = self
            .store()
            .map(|store| Value::Object(store.state()))
            .unwrap_or_else(|| json!({}));
        let module = lock(&self.shared.info).to_scope();
        let state = lock(&self.shared.status).to_scope();
        let scope = json!({
            "props": self.shared.props.to_scope(),
            "module": module,
            "state": state,
            "store": store,
        });
        RenderFrame {
            template: self.shared.class.template(),
            scope,
        }
    }

    /// Re-render into the attached target, if any.
    pub(crate) fn rerender(&self) {
        let target = lock(&self.shared.target).clone();
        match target {
            Some(target) if target.is_attached() && self.is_live() => target.write(self.render()),
            _ => {}
        }
    }

    /// Move to `next`, or fail with `InvalidTransition`.
    pub(crate) fn transition(&self, next: LifecycleState) -> FrameworkResult<LifecycleState> {
        let mut status = lock(&self.shared.status);
        let previous = status.lifecycle;
        status.lifecycle = previous.transition(next)?;
        tracing::debug!(
            module_id = %self.module_id(),
            instance_id = %self.instance_id(),
            from = %previous,
            to = %next,
            "lifecycle transition"
        );
        Ok(previous)
    }

    /// Mark loading. `false` if this kind of load is not possible now.
    pub(crate) fn begin_load(&self, kind: LoadKind) -> bool {
        {
            let mut status = lock(&self.shared.status);
            let expected = match kind {
                LoadKind::Initial => LifecycleState::Initializing,
                LoadKind::Refresh => LifecycleState::Ready,
            };
            if status.lifecycle != expected {
                tracing::debug!(
                    module_id = %self.module_id(),
                    lifecycle = %status.lifecycle,
                    ?kind,
                    "load skipped"
                );
                return false;
            }
            status.is_loading = true;
            status.error = None;
        }
        self.rerender();
        true
    }

    /// Apply a load outcome. Results arriving after dispose are dropped.
    pub(crate) fn finish_load(&self, kind: LoadKind, result: Result<(), DataLoadError>) {
        let failure = {
            let mut status = lock(&self.shared.status);
            if status.lifecycle.is_disposed() {
                tracing::debug!(
                    module_id = %self.module_id(),
                    instance_id = %self.instance_id(),
                    "load finished after unmount; result dropped"
                );
                return;
            }
            status.is_loading = false;
            match result {
                Ok(()) => {
                    if kind == LoadKind::Initial {
                        status.lifecycle = LifecycleState::Ready;
                    }
                    status.error = None;
                    status.last_updated = Some(Utc::now());
                    None
                }
                Err(err) => {
                    let message = err.to_string();
                    status.lifecycle = LifecycleState::Error;
                    status.error = Some(message.clone());
                    Some(message)
                }
            }
        };

        if let Some(message) = failure {
            self.handle_error(message);
        }
        self.rerender();
    }

    /// Report a load failure: log, notify the user, call `on_error`.
    fn handle_error(&self, message: String) {
        tracing::error!(
            module_id = %self.module_id(),
            instance_id = %self.instance_id(),
            error = %message,
            "module data load failed"
        );
        self.shared.notifier.notify(Notification::error(
            self.module_id().clone(),
            format!("Error in module {}", self.module_id()),
            message.clone(),
        ));
        if let Some(on_error) = &self.shared.props.on_error {
            on_error(&ErrorEvent {
                module_id: self.module_id().clone(),
                error: message,
                timestamp: Utc::now(),
            });
        }
    }
}
