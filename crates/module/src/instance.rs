//! A mounted module: behaviour plus the lifecycle bookkeeping around it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use erpmod_core::{FrameworkError, FrameworkResult, InstanceId, ModuleId, StoreKey};
use erpmod_store::{Store, StoreManager};

use crate::class::ComponentClass;
use crate::context::{LoadKind, ModuleContext, ModuleStatus, RenderTarget};
use crate::events::ModuleProps;
use crate::lifecycle::LifecycleState;
use crate::notify::Notifier;

/// A data load in flight. Owns what it needs, so it may outlive the
/// [`ModuleInstance`] that started it; its result is dropped if the instance
/// was disposed in the meantime. Resolves to the lifecycle state afterwards.
pub type LoadFuture = Pin<Box<dyn Future<Output = LifecycleState> + Send + 'static>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks the instance loading right away; the hook itself runs when the
/// returned future is polled.
fn load_future(ctx: ModuleContext, kind: LoadKind) -> LoadFuture {
    let started = ctx.begin_load(kind);
    Box::pin(async move {
        if started {
            let module = Arc::clone(&ctx.shared.module);
            let result = module.load_initial_data(&ctx).await;
            ctx.finish_load(kind, result);
        }
        ctx.lifecycle()
    })
}

/// One instance of a component class, exclusively owned by whoever mounted
/// it (normally a bridge slot).
///
/// Driving order: [`setup`](Self::setup), [`attach`](Self::attach), then
/// await [`load`](Self::load); [`dispose`](Self::dispose) at any point.
#[derive(Debug)]
pub struct ModuleInstance {
    ctx: ModuleContext,
}

impl ModuleInstance {
    /// Instantiate `class` with `props`. Nothing runs until `setup`.
    pub fn construct(
        class: Arc<ComponentClass>,
        props: ModuleProps,
        stores: Arc<StoreManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ctx = ModuleContext::new(class, props, stores, notifier);
        tracing::debug!(
            module_id = %ctx.module_id(),
            instance_id = %ctx.instance_id(),
            class = ctx.class().name(),
            "module instance constructed"
        );
        Self { ctx }
    }

    pub fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    pub fn instance_id(&self) -> InstanceId {
        self.ctx.instance_id()
    }

    pub fn module_id(&self) -> &ModuleId {
        self.ctx.module_id()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.ctx.lifecycle()
    }

    pub fn status(&self) -> ModuleStatus {
        self.ctx.status()
    }

    pub fn store(&self) -> Option<&Arc<Store>> {
        self.ctx.store()
    }

    /// `Constructed -> Initializing`: create (or attach to) the store,
    /// subscribe rendering to it and run the module's `setup` hook. The
    /// instance reports loading from here until its first load settles.
    ///
    /// The store key is `config.container_store` when set, otherwise the
    /// instance-private `"{module_id}:{instance_id}"`.
    pub fn setup(&self) -> FrameworkResult<()> {
        self.ctx.transition(LifecycleState::Initializing)?;

        let shared = &self.ctx.shared;
        lock(&shared.status).is_loading = true;
        let key = shared
            .props
            .config
            .container_store
            .clone()
            .unwrap_or_else(|| StoreKey::for_instance(self.module_id(), self.instance_id()));
        let store = shared.stores.create_store_with_actions(
            key,
            shared.class.initial_state().clone(),
            shared.class.store_actions().clone(),
        );

        let weak = Arc::downgrade(&self.ctx.shared);
        let subscription = store.subscribe(move |_| {
            if let Some(shared) = weak.upgrade() {
                ModuleContext { shared }.rerender();
            }
        });
        *lock(&shared.subscription) = Some(subscription);
        if shared.store.set(store).is_err() {
            tracing::warn!(module_id = %self.module_id(), "store already set up");
        }

        shared.module.setup(&self.ctx)
    }

    /// Attach to a container on the visible document and run
    /// `initialize_component`.
    pub fn attach(&self, target: Arc<dyn RenderTarget>) -> FrameworkResult<()> {
        let lifecycle = self.lifecycle();
        if lifecycle != LifecycleState::Initializing {
            return Err(FrameworkError::mount(format!(
                "cannot attach module `{}` in state {lifecycle}",
                self.module_id()
            )));
        }
        if !target.is_attached() {
            return Err(FrameworkError::mount(format!(
                "container for module `{}` is not attached to the page",
                self.module_id()
            )));
        }

        *lock(&self.ctx.shared.target) = Some(target);
        self.ctx.shared.module.initialize_component(&self.ctx);
        self.ctx.rerender();
        Ok(())
    }

    /// The initial data load (`Initializing -> Ready | Error`).
    ///
    /// A failure never escapes: it lands in `state.error`, the notifier and
    /// `on_error`.
    pub fn load(&self) -> LoadFuture {
        load_future(self.ctx.clone(), LoadKind::Initial)
    }

    /// `Error -> Initializing`, then load again.
    pub fn retry(&self) -> FrameworkResult<LoadFuture> {
        let lifecycle = self.lifecycle();
        if lifecycle != LifecycleState::Error {
            return Err(FrameworkError::InvalidTransition {
                from: lifecycle.as_str().to_string(),
                to: LifecycleState::Initializing.as_str().to_string(),
            });
        }
        self.ctx.transition(LifecycleState::Initializing)?;
        tracing::info!(module_id = %self.module_id(), "retrying module load");
        Ok(load_future(self.ctx.clone(), LoadKind::Initial))
    }

    /// Reload data while staying `Ready`; a failure moves to `Error`.
    pub fn refresh(&self) -> FrameworkResult<LoadFuture> {
        let lifecycle = self.lifecycle();
        if lifecycle != LifecycleState::Ready {
            return Err(FrameworkError::InvalidTransition {
                from: lifecycle.as_str().to_string(),
                to: LifecycleState::Ready.as_str().to_string(),
            });
        }
        Ok(load_future(self.ctx.clone(), LoadKind::Refresh))
    }

    /// Run a class method, the built-in `retry` / `refresh`, or forward an
    /// action the template emits to the host's `on_action`.
    ///
    /// Invoking on a disposed instance does nothing.
    pub async fn invoke(&self, name: &str, payload: Value) -> FrameworkResult<()> {
        if !self.ctx.is_live() {
            tracing::warn!(module_id = %self.module_id(), method = name, "invoke after unmount ignored");
            return Ok(());
        }
        match name {
            "retry" => {
                self.retry()?.await;
                Ok(())
            }
            "refresh" => {
                self.refresh()?.await;
                Ok(())
            }
            _ => {
                let class = self.ctx.class();
                if let Some(method) = class.methods().get(name).cloned() {
                    return method(&self.ctx, &payload);
                }
                if class.template().emitted_actions().contains(name) {
                    self.ctx.trigger_action(name, payload);
                    return Ok(());
                }
                Err(FrameworkError::invalid_config(format!(
                    "module `{}` has no method `{name}`",
                    self.module_id()
                )))
            }
        }
    }

    /// Render with the current state.
    pub fn render(&self) -> String {
        self.ctx.render()
    }

    /// Tear down: unsubscribe from the store, detach from the container, run
    /// `teardown`. Idempotent.
    ///
    /// An instance-private store is destroyed with the instance; a shared
    /// `container_store` is kept for the other instances using it.
    pub fn dispose(&self) {
        if self.ctx.transition(LifecycleState::Disposed).is_err() {
            return;
        }
        let shared = &self.ctx.shared;
        let subscription = lock(&shared.subscription).take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        let target = lock(&shared.target).take();
        drop(target);
        shared.module.teardown(&self.ctx);
        if shared.props.config.container_store.is_none() {
            if let Some(store) = shared.store.get() {
                shared.stores.destroy_store(store.key().as_str());
            }
        }
        tracing::debug!(
            module_id = %self.module_id(),
            instance_id = %self.instance_id(),
            "module instance disposed"
        );
    }
}
