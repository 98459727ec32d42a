use std::collections::BTreeMap;
use std::sync::Arc;

use erpmod_core::{ModuleConfig, PropSpec, StateMap};
use erpmod_module::{Constructor, MethodTable, Module};
use erpmod_store::StoreActions;
use erpmod_view::ViewNode;

/// How a class names its template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRef {
    /// A template already registered with the factory.
    Registered(String),
    /// A template compiled for this class only.
    Inline(ViewNode),
    /// A registered layout with its slots filled.
    Layout {
        layout: String,
        slots: BTreeMap<String, ViewNode>,
    },
}

impl TemplateRef {
    pub fn layout(layout: impl Into<String>) -> Self {
        TemplateRef::Layout {
            layout: layout.into(),
            slots: BTreeMap::new(),
        }
    }

    /// Fill one slot of a `Layout` reference; other variants are unchanged.
    pub fn with_slot(mut self, name: impl Into<String>, content: impl Into<ViewNode>) -> Self {
        if let TemplateRef::Layout { slots, .. } = &mut self {
            slots.insert(name.into(), content.into());
        }
        self
    }
}

impl From<&str> for TemplateRef {
    fn from(value: &str) -> Self {
        TemplateRef::Registered(value.to_string())
    }
}

impl From<ViewNode> for TemplateRef {
    fn from(value: ViewNode) -> Self {
        TemplateRef::Inline(value)
    }
}

/// Everything needed to build a module class.
#[derive(Clone)]
pub struct ModuleDefinition {
    pub name: String,
    /// Default config; validated with the definition.
    pub config: ModuleConfig,
    pub template: TemplateRef,
    pub methods: MethodTable,
    pub props: Vec<PropSpec>,
    pub initial_state: StateMap,
    pub store_actions: StoreActions,
    pub behavior: Option<Constructor>,
}

impl core::fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("template", &self.template)
            .field("methods", &self.methods)
            .field("props", &self.props)
            .field("behavior", &self.behavior.is_some())
            .finish_non_exhaustive()
    }
}

impl ModuleDefinition {
    pub fn new(name: impl Into<String>, config: ModuleConfig, template: impl Into<TemplateRef>) -> Self {
        Self {
            name: name.into(),
            config,
            template: template.into(),
            methods: MethodTable::new(),
            props: Vec::new(),
            initial_state: StateMap::new(),
            store_actions: StoreActions::new(),
            behavior: None,
        }
    }

    pub fn with_methods(mut self, methods: MethodTable) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_props(mut self, props: impl IntoIterator<Item = PropSpec>) -> Self {
        self.props.extend(props);
        self
    }

    pub fn with_initial_state(mut self, state: StateMap) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_store_actions(mut self, actions: StoreActions) -> Self {
        self.store_actions = actions;
        self
    }

    pub fn with_behavior<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn Module> + Send + Sync + 'static,
    {
        self.behavior = Some(Arc::new(constructor));
        self
    }
}
