//! The capability interface every module implements.

use async_trait::async_trait;

use erpmod_core::{DataLoadError, FrameworkResult};

use crate::context::{ModuleContext, RenderFrame};

/// Module behaviour.
///
/// Every hook has a default, so a module overrides only what it needs.
/// Loading/error bookkeeping, callbacks and notifications are handled by
/// [`crate::ModuleInstance`] around these hooks; a module never manages its
/// own lifecycle state.
///
/// Hook order for one mount:
///
/// 1. `setup`: the store exists, the container is not attached yet
/// 2. `initialize_component`: the container is attached
/// 3. `load_initial_data`: async; `Ok` moves the instance to `Ready`, `Err`
///    to `Error`
/// 4. `teardown`: on unmount, in any state
///
/// `render` is called on every store change while attached.
#[async_trait]
pub trait Module: Send + Sync {
    fn setup(&self, _ctx: &ModuleContext) -> FrameworkResult<()> {
        Ok(())
    }

    fn initialize_component(&self, _ctx: &ModuleContext) {}

    async fn load_initial_data(&self, _ctx: &ModuleContext) -> Result<(), DataLoadError> {
        Ok(())
    }

    fn render(&self, frame: &RenderFrame<'_>) -> String {
        frame.render_template()
    }

    fn teardown(&self, _ctx: &ModuleContext) {}
}

/// Behaviour of the base component class: every hook defaulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleBase;

impl Module for ModuleBase {}
