//! The module registry.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use indexmap::IndexMap;

use erpmod_core::validation::{validate_metadata, validate_module_id};
use erpmod_core::{FrameworkError, FrameworkResult, ModuleId, ModuleMetadata};
use erpmod_module::ComponentClass;

use crate::descriptor::{MetadataPatch, ModuleDescriptor};

/// Change notification delivered to registry listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(ModuleId),
    /// Same class registered again; metadata replaced.
    Reregistered(ModuleId),
    Unregistered(ModuleId),
    MetadataUpdated(ModuleId),
}

impl RegistryEvent {
    pub fn module_id(&self) -> &ModuleId {
        match self {
            RegistryEvent::Registered(id)
            | RegistryEvent::Reregistered(id)
            | RegistryEvent::Unregistered(id)
            | RegistryEvent::MetadataUpdated(id) => id,
        }
    }
}

type Listener = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Registry of module ids to component classes.
///
/// One explicit instance per application, shared as `Arc<ModuleRegistry>`.
///
/// Re-registration policy:
/// - an id holding a *different* class (pointer identity) is rejected with
///   `DuplicateModule`; `unregister` first to replace a module
/// - the *same* class replaces the metadata in place and keeps the original
///   registration position
#[derive(Default)]
pub struct ModuleRegistry {
    entries: RwLock<IndexMap<ModuleId, Arc<ModuleDescriptor>>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl core::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.module_ids())
            .finish_non_exhaustive()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<ModuleId, Arc<ModuleDescriptor>>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<ModuleId, Arc<ModuleDescriptor>>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `class` under `id`.
    pub fn register(
        &self,
        id: impl Into<ModuleId>,
        class: Arc<ComponentClass>,
        metadata: ModuleMetadata,
    ) -> FrameworkResult<Arc<ModuleDescriptor>> {
        let id = id.into();
        let mut errors = validate_module_id(id.as_str());
        errors.extend(validate_metadata(&metadata));
        errors.into_result()?;

        let descriptor = Arc::new(ModuleDescriptor {
            id: id.clone(),
            component_class: Arc::clone(&class),
            metadata,
        });

        let event = {
            let mut entries = self.write();
            match entries.get_mut(&id) {
                Some(existing) if !Arc::ptr_eq(&existing.component_class, &class) => {
                    tracing::warn!(module_id = %id, "module id already registered with a different class");
                    return Err(FrameworkError::DuplicateModule(id));
                }
                Some(existing) => {
                    *existing = Arc::clone(&descriptor);
                    RegistryEvent::Reregistered(id.clone())
                }
                None => {
                    entries.insert(id.clone(), Arc::clone(&descriptor));
                    RegistryEvent::Registered(id.clone())
                }
            }
        };

        tracing::debug!(module_id = %id, class = class.name(), ?event, "module registered");
        self.emit(&event);
        Ok(descriptor)
    }

    /// The descriptor for `id`, or `ModuleNotFound`.
    pub fn get(&self, id: &str) -> FrameworkResult<Arc<ModuleDescriptor>> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| FrameworkError::ModuleNotFound(ModuleId::from(id)))
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Snapshot of every descriptor in registration order.
    ///
    /// The returned `Vec` is owned by the caller; changing it does not affect
    /// the registry.
    pub fn list(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.read().values().cloned().collect()
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove `id`. Absent ids are a no-op; returns whether anything was
    /// removed.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.write().shift_remove(id);
        match removed {
            Some(descriptor) => {
                tracing::debug!(module_id = %descriptor.id, "module unregistered");
                self.emit(&RegistryEvent::Unregistered(descriptor.id.clone()));
                true
            }
            None => {
                tracing::debug!(module_id = id, "unregister: module not registered");
                false
            }
        }
    }

    /// Patch the metadata of a registered module.
    pub fn update_metadata(&self, id: &str, patch: MetadataPatch) -> FrameworkResult<Arc<ModuleDescriptor>> {
        let descriptor = {
            let mut entries = self.write();
            let existing = entries
                .get_mut(id)
                .ok_or_else(|| FrameworkError::ModuleNotFound(ModuleId::from(id)))?;
            let metadata = patch.apply(&existing.metadata);
            validate_metadata(&metadata).into_result()?;
            let descriptor = Arc::new(ModuleDescriptor {
                metadata,
                ..(**existing).clone()
            });
            *existing = Arc::clone(&descriptor);
            descriptor
        };
        self.emit(&RegistryEvent::MetadataUpdated(descriptor.id.clone()));
        Ok(descriptor)
    }

    /// Call `listener` on every registry change until the handle is used to
    /// remove it.
    pub fn on_change<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        ListenerHandle {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    // Listeners run on a copy of the list with no registry lock held, so
    // they may call back into the registry.
    fn emit(&self, event: &RegistryEvent) {
        let listeners: Vec<Listener> = self
            .listeners()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// Removes a registry listener.
#[must_use = "dropping the handle keeps the listener registered"]
pub struct ListenerHandle {
    listeners: Weak<Mutex<Listeners>>,
    id: u64,
}

impl ListenerHandle {
    pub fn remove(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.entries.len();
        listeners.entries.retain(|(id, _)| *id != self.id);
        listeners.entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpmod_view::{compile, text};
    use proptest::prelude::*;

    fn class(name: &str) -> Arc<ComponentClass> {
        let template = compile(format!("{name}.template"), text(name)).unwrap();
        Arc::new(ComponentClass::new(name, Arc::new(template)))
    }

    #[test]
    fn register_get_unregister_round_trip() {
        let registry = ModuleRegistry::new();
        let foo = class("Foo");
        registry
            .register("dashboard", Arc::clone(&foo), ModuleMetadata::titled("Dashboard"))
            .unwrap();

        let descriptor = registry.get("dashboard").unwrap();
        assert_eq!(descriptor.metadata.title, "Dashboard");
        assert!(Arc::ptr_eq(&descriptor.component_class, &foo));
        assert_eq!(descriptor.version(), "1.0.0");

        assert!(registry.unregister("dashboard"));
        assert_eq!(
            registry.get("dashboard").unwrap_err(),
            FrameworkError::ModuleNotFound(ModuleId::from("dashboard"))
        );
    }

    #[test]
    fn unregister_of_unknown_id_is_a_no_op() {
        let registry = ModuleRegistry::new();
        assert!(!registry.unregister("nope"));
    }

    #[test]
    fn different_class_under_same_id_is_rejected() {
        let registry = ModuleRegistry::new();
        registry.register("sales", class("A"), ModuleMetadata::titled("Sales")).unwrap();
        let err = registry
            .register("sales", class("B"), ModuleMetadata::titled("Sales 2"))
            .unwrap_err();
        assert_eq!(err, FrameworkError::DuplicateModule(ModuleId::from("sales")));
        assert_eq!(registry.get("sales").unwrap().component_class.name(), "A");
    }

    #[test]
    fn same_class_replaces_metadata_and_keeps_position() {
        let registry = ModuleRegistry::new();
        let a = class("A");
        registry.register("first", Arc::clone(&a), ModuleMetadata::titled("One")).unwrap();
        registry.register("second", class("B"), ModuleMetadata::titled("Two")).unwrap();
        registry.register("first", a, ModuleMetadata::titled("One again")).unwrap();

        let ids: Vec<String> = registry.module_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(registry.get("first").unwrap().title(), "One again");
    }

    #[test]
    fn list_is_a_detached_snapshot() {
        let registry = ModuleRegistry::new();
        registry.register("a", class("A"), ModuleMetadata::default()).unwrap();
        registry.register("b", class("B"), ModuleMetadata::default()).unwrap();

        let mut listed = registry.list();
        listed.clear();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list()[0].id.as_str(), "a");
    }

    #[test]
    fn invalid_registration_collects_violations() {
        let registry = ModuleRegistry::new();
        let metadata = ModuleMetadata::titled("X")
            .with_version("v1")
            .with_endpoint("list", "relative/path");
        let err = registry.register("bad id", class("X"), metadata).unwrap_err();
        assert_eq!(err.violations().unwrap().len(), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn metadata_patch_merges_endpoints() {
        let registry = ModuleRegistry::new();
        registry
            .register(
                "inventory",
                class("Inv"),
                ModuleMetadata::titled("Inventory").with_endpoint("list", "/api/items"),
            )
            .unwrap();

        let updated = registry
            .update_metadata(
                "inventory",
                MetadataPatch::default().title("Stock").endpoint("detail", "/api/items/{id}"),
            )
            .unwrap();
        assert_eq!(updated.title(), "Stock");
        assert_eq!(updated.api_endpoints().len(), 2);

        assert!(matches!(
            registry.update_metadata("inventory", MetadataPatch::default().version("bad")),
            Err(FrameworkError::ConfigValidation(_))
        ));
        assert!(matches!(
            registry.update_metadata("missing", MetadataPatch::default()),
            Err(FrameworkError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn listeners_see_changes_and_may_reenter() {
        let registry = Arc::new(ModuleRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let seen = Arc::clone(&seen);
            let inner = Arc::downgrade(&registry);
            registry.on_change(move |event| {
                let registered = inner.upgrade().map(|r| r.len()).unwrap_or_default();
                seen.lock().unwrap().push((event.clone(), registered));
            })
        };

        let a = class("A");
        registry.register("a", Arc::clone(&a), ModuleMetadata::default()).unwrap();
        registry.register("a", a, ModuleMetadata::titled("A")).unwrap();
        registry.update_metadata("a", MetadataPatch::default().title("AA")).unwrap();
        registry.unregister("a");
        assert!(handle.remove());
        registry.register("b", class("B"), ModuleMetadata::default()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (RegistryEvent::Registered("a".into()), 1),
                (RegistryEvent::Reregistered("a".into()), 1),
                (RegistryEvent::MetadataUpdated("a".into()), 1),
                (RegistryEvent::Unregistered("a".into()), 0),
            ]
        );
    }

    proptest! {
        #[test]
        fn valid_ids_resolve_to_the_registered_class(id in "[A-Za-z0-9][A-Za-z0-9._-]{0,24}") {
            let registry = ModuleRegistry::new();
            let c = class("C");
            registry.register(id.as_str(), Arc::clone(&c), ModuleMetadata::default()).unwrap();
            prop_assert!(Arc::ptr_eq(&registry.get(&id).unwrap().component_class, &c));
        }
    }
}
