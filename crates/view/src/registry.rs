//! Compiled template storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::compile::{CompiledTemplate, compile};
use crate::error::TemplateError;
use crate::layouts;
use crate::node::ViewNode;

/// Templates by id. Registration compiles once; re-registration overwrites.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in module layouts.
    pub fn with_builtin_layouts() -> Self {
        let registry = Self::new();
        for (id, root) in layouts::builtin() {
            if let Err(err) = registry.register_template(id, root) {
                tracing::error!(template = id, error = %err, "built-in layout failed to compile");
            }
        }
        registry
    }

    /// Compile `root` and store it under `id`.
    pub fn register_template(
        &self,
        id: impl Into<String>,
        root: ViewNode,
    ) -> Result<Arc<CompiledTemplate>, TemplateError> {
        let compiled = Arc::new(compile(id, root)?);
        self.insert(Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Store an already compiled template (e.g. a filled layout).
    pub fn insert(&self, template: Arc<CompiledTemplate>) {
        let id = template.id().to_string();
        let previous = self
            .templates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), template);
        if previous.is_some() {
            tracing::warn!(template = %id, "template re-registered; previous definition replaced");
        } else {
            tracing::debug!(template = %id, "template registered");
        }
    }

    pub fn get_template(&self, id: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        self.templates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn template_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .templates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
