//! Mounting registered modules into the host page.

use std::sync::Arc;

use serde_json::Value;

use erpmod_core::validation::{validate_module_config, validate_props};
use erpmod_core::{ContainerId, FrameworkError, FrameworkResult, ModuleId, ModuleMetadata};
use erpmod_module::{LifecycleState, LoadFuture, ModuleInstance, ModuleProps, Notifier};
use erpmod_registry::ModuleRegistry;
use erpmod_store::StoreManager;
use erpmod_view::escape_html;

use crate::page::{Container, HostPage};

/// What a slot currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotView {
    /// Nothing mounted.
    Empty,
    Mounted {
        module_id: ModuleId,
        container_id: ContainerId,
        lifecycle: LifecycleState,
    },
    /// The module could not be resolved; the slot renders an inert notice.
    Failed { module_id: ModuleId, message: String },
}

impl SlotView {
    pub fn is_mounted(&self) -> bool {
        matches!(self, SlotView::Mounted { .. })
    }
}

/// Everything a slot needs to mount modules. Cheap to clone.
#[derive(Clone)]
pub struct ModuleBridge {
    registry: Arc<ModuleRegistry>,
    stores: Arc<StoreManager>,
    notifier: Arc<dyn Notifier>,
    page: Arc<HostPage>,
}

impl core::fmt::Debug for ModuleBridge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleBridge")
            .field("registry", &self.registry)
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

impl ModuleBridge {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        stores: Arc<StoreManager>,
        notifier: Arc<dyn Notifier>,
        page: Arc<HostPage>,
    ) -> Self {
        Self {
            registry,
            stores,
            notifier,
            page,
        }
    }

    /// An empty slot on this bridge's page.
    pub fn slot(&self) -> ModuleSlot {
        ModuleSlot {
            bridge: self.clone(),
            mounted: None,
            failed: None,
            pending: None,
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn stores(&self) -> &Arc<StoreManager> {
        &self.stores
    }

    pub fn page(&self) -> &Arc<HostPage> {
        &self.page
    }
}

struct Mounted {
    props: ModuleProps,
    instance: ModuleInstance,
    container: Arc<Container>,
}

/// A place on the host page that shows at most one module instance.
///
/// The slot owns its instance exclusively. Rendering with props whose
/// `module_id` or `config` differ tears the instance down and mounts a new
/// one into a fresh container; there is no partial update. Dropping the slot
/// unmounts.
///
/// Data loads are not spawned: the slot keeps the pending load, and the host
/// either awaits it with [`settle`](Self::settle) or takes it with
/// [`take_pending_load`](Self::take_pending_load) to drive it elsewhere.
pub struct ModuleSlot {
    bridge: ModuleBridge,
    mounted: Option<Mounted>,
    failed: Option<(ModuleId, String)>,
    pending: Option<LoadFuture>,
}

impl core::fmt::Debug for ModuleSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleSlot")
            .field("view", &self.view())
            .field("pending_load", &self.pending.is_some())
            .finish()
    }
}

impl ModuleSlot {
    /// Mount (or keep) the module described by `props`.
    ///
    /// - unchanged `module_id` and `config`: no-op
    /// - invalid config or props: `Err(ConfigValidation)`, nothing mounted
    /// - unknown module: `Ok(SlotView::Failed)`
    /// - no usable container: `Err(Mount)`
    pub fn render(&mut self, props: ModuleProps) -> FrameworkResult<SlotView> {
        if let Some(mounted) = &self.mounted {
            if !mounted.props.requires_remount(&props) {
                return Ok(self.view());
            }
        }
        self.unmount();
        self.mount(props)?;
        Ok(self.view())
    }

    fn mount(&mut self, props: ModuleProps) -> FrameworkResult<()> {
        let mut errors = validate_module_config(&props.config);
        if props.module_id != props.config.module_id {
            errors.push(format!(
                "props moduleId `{}` does not match config moduleId `{}`",
                props.module_id, props.config.module_id
            ));
        }
        errors.into_result()?;

        let descriptor = match self.bridge.registry.get(props.module_id.as_str()) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!(module_id = %props.module_id, error = %err, "module could not be resolved");
                self.failed = Some((props.module_id, err.to_string()));
                return Ok(());
            }
        };

        let class = Arc::clone(&descriptor.component_class);
        validate_props(&props.config.options, class.prop_specs()).into_result()?;

        let container = self.bridge.page.allocate();
        let instance = ModuleInstance::construct(
            class,
            with_registered_defaults(props.clone(), &descriptor.metadata),
            Arc::clone(&self.bridge.stores),
            Arc::clone(&self.bridge.notifier),
        );

        let attached = instance
            .setup()
            .and_then(|()| self.bridge.page.attach(container.id()))
            .and_then(|container| instance.attach(container));
        if let Err(err) = attached {
            tracing::error!(module_id = %props.module_id, error = %err, "module mount failed");
            instance.dispose();
            self.bridge.page.detach(container.id());
            return Err(err);
        }

        tracing::info!(
            module_id = %props.module_id,
            container_id = %container.id(),
            instance_id = %instance.instance_id(),
            "module mounted"
        );
        self.pending = Some(instance.load());
        self.mounted = Some(Mounted {
            props,
            instance,
            container,
        });
        Ok(())
    }

    /// Tear down the mounted instance and drop its container from the page.
    ///
    /// A load still pending in the slot is abandoned. Returns `false` when
    /// nothing was mounted.
    pub fn unmount(&mut self) -> bool {
        self.failed = None;
        self.pending = None;
        let Some(mounted) = self.mounted.take() else {
            return false;
        };
        mounted.instance.dispose();
        self.bridge.page.detach(mounted.container.id());
        tracing::info!(
            module_id = %mounted.props.module_id,
            container_id = %mounted.container.id(),
            "module unmounted"
        );
        true
    }

    /// Await the pending load, if any. Returns the lifecycle afterwards.
    pub async fn settle(&mut self) -> Option<LifecycleState> {
        if let Some(load) = self.pending.take() {
            load.await;
        }
        self.mounted.as_ref().map(|m| m.instance.lifecycle())
    }

    /// Hand the pending load to the caller (e.g. to spawn it).
    pub fn take_pending_load(&mut self) -> Option<LoadFuture> {
        self.pending.take()
    }

    pub fn has_pending_load(&self) -> bool {
        self.pending.is_some()
    }

    /// Retry a failed load; [`settle`](Self::settle) runs it.
    pub fn retry(&mut self) -> FrameworkResult<()> {
        let instance = self.instance().ok_or_else(not_mounted)?;
        self.pending = Some(instance.retry()?);
        Ok(())
    }

    /// Reload the data of a ready module; [`settle`](Self::settle) runs it.
    pub fn refresh(&mut self) -> FrameworkResult<()> {
        let instance = self.instance().ok_or_else(not_mounted)?;
        self.pending = Some(instance.refresh()?);
        Ok(())
    }

    /// Call a method of the mounted module.
    pub async fn invoke(&self, method: &str, payload: Value) -> FrameworkResult<()> {
        let instance = self.instance().ok_or_else(not_mounted)?;
        instance.invoke(method, payload).await
    }

    pub fn instance(&self) -> Option<&ModuleInstance> {
        self.mounted.as_ref().map(|m| &m.instance)
    }

    pub fn container_id(&self) -> Option<ContainerId> {
        self.mounted.as_ref().map(|m| m.container.id())
    }

    pub fn view(&self) -> SlotView {
        if let Some(mounted) = &self.mounted {
            return SlotView::Mounted {
                module_id: mounted.props.module_id.clone(),
                container_id: mounted.container.id(),
                lifecycle: mounted.instance.lifecycle(),
            };
        }
        match &self.failed {
            Some((module_id, message)) => SlotView::Failed {
                module_id: module_id.clone(),
                message: message.clone(),
            },
            None => SlotView::Empty,
        }
    }

    /// What the slot shows on the page.
    pub fn html(&self) -> String {
        if let Some(mounted) = &self.mounted {
            return mounted.container.html();
        }
        match &self.failed {
            Some((module_id, message)) => format!(
                r#"<div class="erp-module-unavailable" role="alert" data-module-id="{}"><p>{}</p></div>"#,
                escape_html(module_id.as_str()),
                escape_html(message)
            ),
            None => String::new(),
        }
    }
}

impl Drop for ModuleSlot {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Fill what the mount config leaves out from the registration metadata.
/// The config wins wherever it sets a value.
fn with_registered_defaults(mut props: ModuleProps, metadata: &ModuleMetadata) -> ModuleProps {
    let config = &mut props.config;
    if config.title.is_none() && !metadata.title.is_empty() {
        config.title = Some(metadata.title.clone());
    }
    if config.description.is_none() && !metadata.description.is_empty() {
        config.description = Some(metadata.description.clone());
    }
    if config.version.is_none() {
        config.version = metadata.version.clone();
    }
    for (name, path) in &metadata.api_endpoints {
        config
            .api_endpoints
            .entry(name.clone())
            .or_insert_with(|| path.clone());
    }
    props
}

fn not_mounted() -> FrameworkError {
    FrameworkError::mount("no module is mounted in this slot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use erpmod_core::{DataLoadError, ModuleConfig, ModuleMetadata, PropKind, PropSpec, state_from};
    use erpmod_factory::{ComponentFactory, ModuleDefinition, TemplateRef};
    use erpmod_module::{ComponentClass, InMemoryNotifier, Module, ModuleContext};
    use erpmod_view::{bind, el, layouts};
    use serde_json::json;

    struct Counter;

    #[async_trait]
    impl Module for Counter {
        async fn load_initial_data(&self, ctx: &ModuleContext) -> Result<(), DataLoadError> {
            ctx.update_store(state_from(json!({"count": 1})));
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Module for Broken {
        async fn load_initial_data(&self, _ctx: &ModuleContext) -> Result<(), DataLoadError> {
            Err(DataLoadError::message("backend unavailable"))
        }
    }

    fn class(factory: &ComponentFactory, id: &str, module: fn() -> Arc<dyn Module>) -> Arc<ComponentClass> {
        let definition = ModuleDefinition::new(
            id,
            ModuleConfig::new(id),
            TemplateRef::layout(layouts::DEFAULT)
                .with_slot("default", el("span").class("count").child(bind("store.count"))),
        )
        .with_props([PropSpec::optional("pageSize", PropKind::Number)])
        .with_behavior(move || module());
        factory.create_module(definition).unwrap()
    }

    struct Fixture {
        bridge: ModuleBridge,
        notifier: Arc<InMemoryNotifier>,
    }

    fn fixture(page: HostPage) -> Fixture {
        let factory = ComponentFactory::with_builtin_layouts();
        let registry = Arc::new(ModuleRegistry::new());
        registry
            .register(
                "dashboard",
                class(&factory, "dashboard", || Arc::new(Counter) as Arc<dyn Module>),
                ModuleMetadata::titled("Dashboard"),
            )
            .unwrap();
        registry
            .register(
                "finance",
                class(&factory, "finance", || Arc::new(Broken) as Arc<dyn Module>),
                ModuleMetadata::titled("Finance"),
            )
            .unwrap();
        let notifier = Arc::new(InMemoryNotifier::new());
        let bridge = ModuleBridge::new(
            registry,
            Arc::new(StoreManager::new()),
            notifier.clone(),
            Arc::new(page),
        );
        Fixture { bridge, notifier }
    }

    fn props(id: &str, title: &str) -> ModuleProps {
        ModuleProps::new(ModuleConfig::new(id).with_title(title))
    }

    #[tokio::test]
    async fn mount_then_settle_renders_loaded_data() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();

        let view = slot.render(props("dashboard", "Dashboard")).unwrap();
        assert!(matches!(
            view,
            SlotView::Mounted { lifecycle: LifecycleState::Initializing, .. }
        ));
        assert!(slot.has_pending_load());

        assert_eq!(slot.settle().await, Some(LifecycleState::Ready));
        assert!(slot.html().contains(r#"<span class="count">1</span>"#));
        assert_eq!(fx.bridge.page().attached_count(), 1);
    }

    #[tokio::test]
    async fn config_change_remounts_into_a_fresh_container() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();

        slot.render(props("dashboard", "C1")).unwrap();
        slot.settle().await;
        let first_container = slot.container_id().unwrap();
        let first_store = slot.instance().unwrap().store().unwrap().clone();
        assert_eq!(first_store.subscriber_count(), 1);

        slot.render(props("dashboard", "C2")).unwrap();
        slot.settle().await;
        let second_container = slot.container_id().unwrap();

        assert_ne!(first_container, second_container);
        assert!(!fx.bridge.page().is_attached(first_container));
        assert_eq!(fx.bridge.page().attached_count(), 1);
        assert_eq!(first_store.subscriber_count(), 0);
        assert_eq!(slot.instance().unwrap().context().config().title.as_deref(), Some("C2"));
        assert!(slot.html().contains("<h3>C2</h3>"));
    }

    #[tokio::test]
    async fn identical_props_do_not_remount() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();

        slot.render(props("dashboard", "Dashboard")).unwrap();
        slot.settle().await;
        let container = slot.container_id().unwrap();
        let instance = slot.instance().unwrap().instance_id();

        let view = slot
            .render(props("dashboard", "Dashboard").with_class_name("wide"))
            .unwrap();
        assert!(!slot.has_pending_load());
        assert_eq!(slot.container_id(), Some(container));
        assert_eq!(slot.instance().unwrap().instance_id(), instance);
        assert!(matches!(view, SlotView::Mounted { lifecycle: LifecycleState::Ready, .. }));
    }

    #[tokio::test]
    async fn unknown_module_renders_inert_failure() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();

        let view = slot.render(props("ghost", "Ghost")).unwrap();
        assert!(matches!(view, SlotView::Failed { ref module_id, .. } if module_id.as_str() == "ghost"));
        assert!(slot.html().contains("module not found: ghost"));
        assert_eq!(fx.bridge.page().attached_count(), 0);
        assert!(matches!(slot.invoke("refresh", Value::Null).await, Err(FrameworkError::Mount(_))));
    }

    #[tokio::test]
    async fn invalid_props_surface_to_the_caller() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();

        let bad_option = ModuleProps::new(ModuleConfig::new("dashboard").with_option("pageSize", json!("ten")));
        assert!(matches!(slot.render(bad_option), Err(FrameworkError::ConfigValidation(_))));

        let mut mismatched = props("dashboard", "Dashboard");
        mismatched.module_id = ModuleId::from("finance");
        let err = slot.render(mismatched).unwrap_err();
        assert_eq!(err.violations().unwrap().len(), 1);

        assert_eq!(slot.view(), SlotView::Empty);
        assert!(fx.bridge.page().container_ids().is_empty());
    }

    #[tokio::test]
    async fn failing_module_is_isolated_from_its_neighbours() {
        let fx = fixture(HostPage::new());
        let mut finance = fx.bridge.slot();
        let mut dashboard = fx.bridge.slot();

        finance.render(props("finance", "Finance")).unwrap();
        assert_eq!(finance.settle().await, Some(LifecycleState::Error));
        assert!(finance.html().contains("backend unavailable"));
        assert!(finance.html().contains(r#"data-on-click="retry""#));
        assert_eq!(fx.notifier.len(), 1);

        dashboard.render(props("dashboard", "Dashboard")).unwrap();
        assert_eq!(dashboard.settle().await, Some(LifecycleState::Ready));

        finance.retry().unwrap();
        assert_eq!(finance.settle().await, Some(LifecycleState::Error));
        assert_eq!(fx.notifier.len(), 2);
    }

    #[tokio::test]
    async fn unavailable_container_is_a_mount_error() {
        let fx = fixture(HostPage::with_max_attached(1));
        let mut first = fx.bridge.slot();
        let mut second = fx.bridge.slot();

        first.render(props("dashboard", "One")).unwrap();
        let err = second.render(props("dashboard", "Two")).unwrap_err();
        assert!(matches!(err, FrameworkError::Mount(_)));
        assert_eq!(second.view(), SlotView::Empty);
        assert_eq!(fx.bridge.page().container_ids().len(), 1);
    }

    #[tokio::test]
    async fn dropping_the_slot_unmounts() {
        let fx = fixture(HostPage::new());
        let store = {
            let mut slot = fx.bridge.slot();
            slot.render(props("dashboard", "Dashboard")).unwrap();
            slot.settle().await;
            slot.instance().unwrap().store().unwrap().clone()
        };
        assert_eq!(fx.bridge.page().attached_count(), 0);
        assert_eq!(store.subscriber_count(), 0);
        assert!(!fx.bridge.stores().has_store(store.key().as_str()));
    }

    #[tokio::test]
    async fn remounts_do_not_leave_private_stores_behind() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();
        for n in 0..20 {
            slot.render(props("dashboard", &format!("Dashboard {n}"))).unwrap();
            slot.settle().await;
            assert_eq!(fx.bridge.stores().len(), 1);
        }
        assert!(slot.unmount());
        assert!(fx.bridge.stores().is_empty());
    }

    #[tokio::test]
    async fn loading_marker_shows_until_the_load_settles() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();

        slot.render(props("dashboard", "Dashboard")).unwrap();
        assert!(slot.instance().unwrap().status().is_loading);
        let html = slot.html();
        assert!(html.contains("module-loading"), "{html}");
        assert!(!html.contains(r#"class="count""#), "{html}");

        slot.settle().await;
        assert!(!slot.html().contains("module-loading"));

        let mut finance = fx.bridge.slot();
        finance.render(props("finance", "Finance")).unwrap();
        finance.settle().await;
        finance.retry().unwrap();
        let html = finance.html();
        assert!(html.contains("module-loading"), "{html}");
        assert!(!html.contains("backend unavailable"), "{html}");
    }

    #[tokio::test]
    async fn form_save_button_reaches_the_host() {
        let fx = fixture(HostPage::new());
        let factory = ComponentFactory::with_builtin_layouts();
        let form = factory
            .create_module(ModuleDefinition::new(
                "orders",
                ModuleConfig::new("orders"),
                TemplateRef::layout(layouts::FORM),
            ))
            .unwrap();
        fx.bridge
            .registry()
            .register("orders", form, ModuleMetadata::titled("Orders"))
            .unwrap();

        let actions = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&actions);
        let mut slot = fx.bridge.slot();
        slot.render(
            ModuleProps::new(ModuleConfig::new("orders"))
                .on_action(move |event| sink.lock().unwrap().push(event.action.clone())),
        )
        .unwrap();
        slot.settle().await;
        assert!(slot.html().contains(r#"data-emit-click="save""#));

        slot.invoke("save", Value::Null).await.unwrap();
        assert_eq!(*actions.lock().unwrap(), vec!["save".to_string()]);
    }

    #[test]
    fn registration_metadata_fills_gaps_in_the_mount_config() {
        let metadata = ModuleMetadata::titled("Dashboard")
            .with_version("2.1.0")
            .with_endpoint("widgets", "/api/widgets")
            .with_endpoint("list", "/api/list");
        let props = ModuleProps::new(
            ModuleConfig::new("dashboard")
                .with_title("My dashboard")
                .with_endpoint("list", "/custom/list"),
        );

        let config = with_registered_defaults(props, &metadata).config;
        assert_eq!(config.title.as_deref(), Some("My dashboard"));
        assert_eq!(config.version.as_deref(), Some("2.1.0"));
        assert_eq!(config.api_endpoints["widgets"], "/api/widgets");
        assert_eq!(config.api_endpoints["list"], "/custom/list");
    }

    #[tokio::test]
    async fn late_load_after_unmount_is_dropped() {
        let fx = fixture(HostPage::new());
        let mut slot = fx.bridge.slot();
        slot.render(props("dashboard", "Dashboard")).unwrap();
        let load = slot.take_pending_load().unwrap();
        let store = slot.instance().unwrap().store().unwrap().clone();

        assert!(slot.unmount());
        assert_eq!(load.await, LifecycleState::Disposed);
        assert_eq!(store.get("count"), None);
    }
}
