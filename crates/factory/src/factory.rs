//! Builds component classes from templates, base classes and methods.

use std::sync::{Arc, OnceLock};

use erpmod_core::validation::{validate_module_config, validate_prop_specs};
use erpmod_core::{FrameworkError, FrameworkResult, ValidationErrors};
use erpmod_module::{ComponentClass, MethodTable};
use erpmod_view::{CompiledTemplate, TemplateError, TemplateRegistry, ViewNode, compile, layouts};

use crate::definition::{ModuleDefinition, TemplateRef};

/// Name of the root class every module extends.
pub const MODULE_BASE: &str = "ModuleBase";

/// Template compilation and class construction.
///
/// Owns (a handle to) the template registry; templates are compiled once at
/// registration and shared by every class and instance that uses them.
#[derive(Debug)]
pub struct ComponentFactory {
    templates: Arc<TemplateRegistry>,
    base: OnceLock<Arc<ComponentClass>>,
}

impl ComponentFactory {
    pub fn new(templates: Arc<TemplateRegistry>) -> Self {
        Self {
            templates,
            base: OnceLock::new(),
        }
    }

    /// A factory over a fresh registry holding the built-in layouts.
    pub fn with_builtin_layouts() -> Self {
        Self::new(Arc::new(TemplateRegistry::with_builtin_layouts()))
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Compile and store a template; re-registration overwrites.
    pub fn register_template(
        &self,
        id: impl Into<String>,
        root: ViewNode,
    ) -> FrameworkResult<Arc<CompiledTemplate>> {
        Ok(self.templates.register_template(id, root)?)
    }

    pub fn get_template(&self, id: &str) -> FrameworkResult<Arc<CompiledTemplate>> {
        Ok(self.templates.get_template(id)?)
    }

    pub fn template_ids(&self) -> Vec<String> {
        self.templates.template_ids()
    }

    /// The root module class, bound to the `module.default` layout.
    ///
    /// Built once per factory, so every call returns the same class.
    pub fn module_base(&self) -> FrameworkResult<Arc<ComponentClass>> {
        if let Some(base) = self.base.get() {
            return Ok(Arc::clone(base));
        }
        let template = self.get_template(layouts::DEFAULT)?;
        let base = Arc::new(ComponentClass::new(MODULE_BASE, template));
        Ok(Arc::clone(self.base.get_or_init(|| base)))
    }

    fn resolve(&self, class_name: &str, template: &TemplateRef) -> Result<Arc<CompiledTemplate>, TemplateError> {
        let id = format!("{class_name}.template");
        match template {
            TemplateRef::Registered(id) => self.templates.get_template(id),
            TemplateRef::Inline(root) => compile(id, root.clone()).map(Arc::new),
            TemplateRef::Layout { layout, slots } => self
                .templates
                .get_template(layout)?
                .fill(id, slots.clone())
                .map(Arc::new),
        }
    }

    /// A new class extending `base`, bound to `template`, with `methods`
    /// added on top of the inherited ones.
    ///
    /// Fails with `TemplateNotFound` for an unknown template id and with
    /// `ConfigValidation` when the template references methods nobody
    /// handles.
    pub fn create_component(
        &self,
        base: &Arc<ComponentClass>,
        name: impl Into<String>,
        template: impl Into<TemplateRef>,
        methods: MethodTable,
    ) -> FrameworkResult<Arc<ComponentClass>> {
        let name = name.into();
        let template = self.resolve(&name, &template.into())?;
        let class = ComponentClass::derive(base, name, template).with_methods(methods);

        let mut errors = ValidationErrors::new();
        for method in class.unhandled_methods() {
            errors.push(format!(
                "template `{}` calls method `{method}` which `{}` does not define",
                class.template().id(),
                class.name()
            ));
        }
        errors.into_result()?;

        tracing::debug!(class = class.name(), base = base.name(), "component class created");
        Ok(Arc::new(class))
    }

    /// Validate a module definition and build its class on top of
    /// [`module_base`](Self::module_base).
    ///
    /// Every problem (config, prop specs, template, method coverage) is
    /// collected into one `ConfigValidation` error.
    pub fn create_module(&self, definition: ModuleDefinition) -> FrameworkResult<Arc<ComponentClass>> {
        let base = self.module_base()?;
        let mut errors = ValidationErrors::new();

        if definition.name.trim().is_empty() {
            errors.push("module name must not be empty");
        }
        errors.extend(validate_module_config(&definition.config));
        errors.extend(validate_prop_specs(&definition.props));

        let template = match self.resolve(&definition.name, &definition.template) {
            Ok(template) => Some(template),
            Err(err) => {
                match FrameworkError::from(err) {
                    FrameworkError::ConfigValidation(violations) => errors.extend(violations),
                    other => errors.push(other.to_string()),
                }
                None
            }
        };

        let Some(template) = template else {
            return Err(FrameworkError::ConfigValidation(errors));
        };

        let mut class = ComponentClass::derive(&base, definition.name, template)
            .with_methods(definition.methods)
            .with_props(definition.props)
            .with_initial_state(definition.initial_state)
            .with_store_actions(definition.store_actions);
        if let Some(constructor) = definition.behavior {
            class = class.with_constructor(constructor);
        }

        for method in class.unhandled_methods() {
            errors.push(format!(
                "template `{}` calls method `{method}` which `{}` does not define",
                class.template().id(),
                class.name()
            ));
        }
        errors.into_result()?;

        tracing::debug!(
            class = class.name(),
            module_id = %definition.config.module_id,
            "module class created"
        );
        Ok(Arc::new(class))
    }
}
