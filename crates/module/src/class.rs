//! Component classes: a template bound to behaviour, methods and defaults.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use erpmod_core::{FrameworkResult, PropSpec, StateMap, shallow_merge};
use erpmod_store::StoreActions;
use erpmod_view::CompiledTemplate;

use crate::behavior::{Module, ModuleBase};
use crate::context::ModuleContext;

/// Actions every instance handles without a method.
pub const BUILTIN_METHODS: [&str; 2] = ["retry", "refresh"];

/// Template event handler bound to a component class.
pub type Method = Arc<dyn Fn(&ModuleContext, &Value) -> FrameworkResult<()> + Send + Sync>;

/// Produces the behaviour object for a new instance.
pub type Constructor = Arc<dyn Fn() -> Arc<dyn Module> + Send + Sync>;

/// Methods by name.
#[derive(Clone, Default)]
pub struct MethodTable(BTreeMap<String, Method>);

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&ModuleContext, &Value) -> FrameworkResult<()> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(method));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, method: Method) {
        self.0.insert(name.into(), method);
    }

    /// Add every entry of `other`, replacing same-named methods.
    pub fn override_with(&mut self, other: MethodTable) {
        self.0.extend(other.0);
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// An instantiable component class.
///
/// Classes are immutable once built and shared as `Arc<ComponentClass>`;
/// identity (e.g. for registry re-registration) is pointer identity.
#[derive(Clone)]
pub struct ComponentClass {
    name: String,
    template: Arc<CompiledTemplate>,
    methods: MethodTable,
    props: Vec<PropSpec>,
    initial_state: StateMap,
    store_actions: StoreActions,
    constructor: Constructor,
    base: Option<Arc<ComponentClass>>,
}

impl core::fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.name)
            .field("template", &self.template.id())
            .field("methods", &self.methods)
            .field("props", &self.props)
            .field("base", &self.base.as_ref().map(|b| b.name.clone()))
            .finish_non_exhaustive()
    }
}

impl ComponentClass {
    /// A root class with [`ModuleBase`] behaviour.
    pub fn new(name: impl Into<String>, template: Arc<CompiledTemplate>) -> Self {
        Self {
            name: name.into(),
            template,
            methods: MethodTable::new(),
            props: Vec::new(),
            initial_state: StateMap::new(),
            store_actions: StoreActions::new(),
            constructor: Arc::new(|| Arc::new(ModuleBase)),
            base: None,
        }
    }

    /// A class inheriting everything from `base`, bound to `template`.
    pub fn derive(base: &Arc<ComponentClass>, name: impl Into<String>, template: Arc<CompiledTemplate>) -> Self {
        Self {
            name: name.into(),
            template,
            base: Some(Arc::clone(base)),
            ..(**base).clone()
        }
    }

    /// Add or override methods.
    pub fn with_methods(mut self, methods: MethodTable) -> Self {
        self.methods.override_with(methods);
        self
    }

    /// Add prop specs; a spec replaces an inherited one with the same name.
    pub fn with_props(mut self, props: impl IntoIterator<Item = PropSpec>) -> Self {
        for spec in props {
            match self.props.iter_mut().find(|p| p.name == spec.name) {
                Some(existing) => *existing = spec,
                None => self.props.push(spec),
            }
        }
        self
    }

    /// Shallow-merge into the inherited initial store state.
    pub fn with_initial_state(mut self, state: StateMap) -> Self {
        shallow_merge(&mut self.initial_state, state);
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
        self.constructor = Arc::new(constructor);
        self
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Arc<CompiledTemplate> {
        &self.template
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn prop_specs(&self) -> &[PropSpec] {
        &self.props
    }

    pub fn initial_state(&self) -> &StateMap {
        &self.initial_state
    }

    pub fn store_actions(&self) -> &StoreActions {
        &self.store_actions
    }

    pub fn base(&self) -> Option<&Arc<ComponentClass>> {
        self.base.as_ref()
    }

    /// `true` if `ancestor` is this class's base, transitively.
    pub fn extends(&self, ancestor: &Arc<ComponentClass>) -> bool {
        let mut current = self.base.as_ref();
        while let Some(class) = current {
            if Arc::ptr_eq(class, ancestor) {
                return true;
            }
            current = class.base.as_ref();
        }
        false
    }

    /// `true` if the class (or the framework) handles the method `name`.
    pub fn handles(&self, name: &str) -> bool {
        self.methods.contains(name) || BUILTIN_METHODS.contains(&name)
    }

    /// Template methods with no handler.
    pub fn unhandled_methods(&self) -> Vec<String> {
        self.template
            .methods()
            .iter()
            .filter(|m| !self.handles(m))
            .cloned()
            .collect()
    }

    /// Fresh behaviour object for one instance.
    pub fn construct(&self) -> Arc<dyn Module> {
        (self.constructor)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpmod_core::{PropKind, state_from};
    use erpmod_view::{compile, el, text};
    use serde_json::json;

    fn template(id: &str, method: &str) -> Arc<CompiledTemplate> {
        Arc::new(compile(id, el("button").on("click", method).child(text("go")).into()).unwrap())
    }

    #[test]
    fn derived_class_inherits_and_overrides() {
        let base = Arc::new(
            ComponentClass::new("Base", template("base", "retry"))
                .with_methods(MethodTable::new().with("save", |_, _| Ok(())))
                .with_props([PropSpec::optional("pageSize", PropKind::Number)])
                .with_initial_state(state_from(json!({"items": [], "page": 1}))),
        );

        let derived = ComponentClass::derive(&base, "Orders", template("orders", "save"))
            .with_methods(MethodTable::new().with("reload", |_, _| Ok(())))
            .with_props([PropSpec::required("pageSize", PropKind::Number)])
            .with_initial_state(state_from(json!({"page": 2})));

        assert!(derived.methods().contains("save"));
        assert!(derived.methods().contains("reload"));
        assert_eq!(derived.prop_specs().len(), 1);
        assert!(derived.prop_specs()[0].required);
        assert_eq!(
            Value::Object(derived.initial_state().clone()),
            json!({"items": [], "page": 2})
        );
        assert!(derived.extends(&base));
        assert!(!base.extends(&base));
        assert_eq!(derived.template().id(), "orders");
    }

    #[test]
    fn unhandled_methods_ignore_builtins() {
        let class = ComponentClass::new("C", template("c", "retry"));
        assert!(class.unhandled_methods().is_empty());

        let class = ComponentClass::new("C", template("c", "archive"));
        assert_eq!(class.unhandled_methods(), vec!["archive".to_string()]);
    }
}
