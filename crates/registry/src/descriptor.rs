use std::collections::BTreeMap;
use std::sync::Arc;

use erpmod_core::{ModuleId, ModuleMetadata};
use erpmod_module::ComponentClass;

/// A registered module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    pub component_class: Arc<ComponentClass>,
    pub metadata: ModuleMetadata,
}

impl ModuleDescriptor {
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn version(&self) -> &str {
        self.metadata.version_or_default()
    }

    pub fn api_endpoints(&self) -> &BTreeMap<String, String> {
        &self.metadata.api_endpoints
    }
}

/// Partial metadata update; `None` fields are left alone, endpoints are
/// merged key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub api_endpoints: BTreeMap<String, String>,
}

impl MetadataPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn endpoint(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.api_endpoints.insert(name.into(), path.into());
        self
    }

    pub(crate) fn apply(self, metadata: &ModuleMetadata) -> ModuleMetadata {
        let mut next = metadata.clone();
        if let Some(title) = self.title {
            next.title = title;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if self.version.is_some() {
            next.version = self.version;
        }
        next.api_endpoints.extend(self.api_endpoints);
        next
    }
}
