//! The framework context: one explicit value wiring every service together.

use std::sync::Arc;

use serde_json::Value;

use erpmod_bridge::{HostPage, ModuleBridge, ModuleSlot};
use erpmod_core::helpers::deep_merge;
use erpmod_core::{FrameworkResult, ModuleConfig};
use erpmod_factory::{ComponentFactory, ModuleDefinition};
use erpmod_module::{ModuleProps, Notifier, TracingNotifier};
use erpmod_registry::{ModuleDescriptor, ModuleRegistry};
use erpmod_store::StoreManager;
use erpmod_view::TemplateRegistry;

use crate::options::FrameworkOptions;

/// Dependency-injection root of a host application.
///
/// Owns the registry, store manager, template registry/factory, notifier and
/// host page. Nothing here is global: tests build as many isolated
/// frameworks as they like.
#[derive(Clone)]
pub struct Framework {
    options: FrameworkOptions,
    registry: Arc<ModuleRegistry>,
    stores: Arc<StoreManager>,
    factory: Arc<ComponentFactory>,
    notifier: Arc<dyn Notifier>,
    page: Arc<HostPage>,
    bridge: ModuleBridge,
}

impl core::fmt::Debug for Framework {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Framework")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

impl Framework {
    /// A framework reporting notifications through tracing.
    pub fn new(options: FrameworkOptions) -> Self {
        Self::with_notifier(options, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(options: FrameworkOptions, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_parts(options, notifier, HostPage::new())
    }

    /// Full control over the notifier and the host page.
    pub fn with_parts(options: FrameworkOptions, notifier: Arc<dyn Notifier>, page: HostPage) -> Self {
        let registry = Arc::new(ModuleRegistry::new());
        let stores = StoreManager::arc();
        let templates = Arc::new(TemplateRegistry::with_builtin_layouts());
        let factory = Arc::new(ComponentFactory::new(templates));
        let page = Arc::new(page);
        let bridge = ModuleBridge::new(
            Arc::clone(&registry),
            Arc::clone(&stores),
            Arc::clone(&notifier),
            Arc::clone(&page),
        );

        tracing::debug!(
            debug = options.debug,
            templates = factory.template_ids().len(),
            "framework initialized"
        );

        Self {
            options,
            registry,
            stores,
            factory,
            notifier,
            page,
            bridge,
        }
    }

    pub fn options(&self) -> &FrameworkOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn stores(&self) -> &Arc<StoreManager> {
        &self.stores
    }

    pub fn factory(&self) -> &Arc<ComponentFactory> {
        &self.factory
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn page(&self) -> &Arc<HostPage> {
        &self.page
    }

    pub fn bridge(&self) -> &ModuleBridge {
        &self.bridge
    }

    /// Build a module class from `definition` and register it under the
    /// definition's `module_id`, with the config's metadata.
    pub fn register_module(&self, definition: ModuleDefinition) -> FrameworkResult<Arc<ModuleDescriptor>> {
        let module_id = definition.config.module_id.clone();
        let metadata = definition.config.metadata();
        let class = self.factory.create_module(definition)?;
        self.registry.register(module_id, class, metadata)
    }

    /// A new, empty slot on the host page.
    pub fn slot(&self) -> ModuleSlot {
        self.bridge.slot()
    }

    /// Mount props for `config`, with the framework's default options laid
    /// under the config's own.
    pub fn props(&self, mut config: ModuleConfig) -> ModuleProps {
        let defaults = Value::Object(self.options.default_options.clone());
        let own = std::mem::take(&mut config.options);
        config.options = deep_merge(defaults, own);
        ModuleProps::new(config)
    }
}

impl Default for Framework {
    fn default() -> Self {
        Self::new(FrameworkOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpmod_factory::TemplateRef;
    use erpmod_view::layouts;
    use serde_json::json;

    #[test]
    fn built_in_layouts_are_available() {
        let framework = Framework::default();
        for id in layouts::BUILTIN_IDS {
            assert!(framework.factory().get_template(id).is_ok(), "{id}");
        }
    }

    #[test]
    fn register_module_uses_config_metadata() {
        let framework = Framework::default();
        let descriptor = framework
            .register_module(ModuleDefinition::new(
                "Inventory",
                ModuleConfig::new("inventory")
                    .with_title("Inventory")
                    .with_endpoint("list", "/api/inventory"),
                TemplateRef::layout(layouts::LIST),
            ))
            .unwrap();
        assert_eq!(descriptor.title(), "Inventory");
        assert_eq!(descriptor.api_endpoints()["list"], "/api/inventory");
        assert!(framework.registry().is_registered("inventory"));
    }

    #[test]
    fn props_layer_default_options_under_config_options() {
        let framework = Framework::new(
            FrameworkOptions::default().with_default_option("theme", json!({"density": "compact", "accent": "blue"})),
        );
        let props = framework.props(
            ModuleConfig::new("sales")
                .with_option("showRetryButton", json!(false))
                .with_option("theme", json!({"accent": "red"})),
        );
        assert_eq!(
            props.config.options,
            json!({
                "showRetryButton": false,
                "theme": {"density": "compact", "accent": "red"}
            })
        );
    }

    #[test]
    fn frameworks_are_isolated() {
        let a = Framework::default();
        let b = Framework::default();
        a.register_module(ModuleDefinition::new(
            "Sales",
            ModuleConfig::new("sales"),
            TemplateRef::layout(layouts::DEFAULT),
        ))
        .unwrap();
        assert!(!b.registry().is_registered("sales"));
    }
}
