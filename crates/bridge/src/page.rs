//! The host page: containers (attachment points) and what they show.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use erpmod_core::{ContainerId, FrameworkError, FrameworkResult};
use erpmod_module::RenderTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Allocated, not yet part of the visible document.
    Allocated,
    Attached,
    /// Removed from the page. Terminal.
    Detached,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One attachment point on the host page.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    state: Mutex<ContainerState>,
    html: Mutex<String>,
    renders: AtomicUsize,
}

impl Container {
    fn new() -> Self {
        Self {
            id: ContainerId::new(),
            state: Mutex::new(ContainerState::Allocated),
            html: Mutex::new(String::new()),
            renders: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn state(&self) -> ContainerState {
        *lock(&self.state)
    }

    /// Last HTML written into the container.
    pub fn html(&self) -> String {
        lock(&self.html).clone()
    }

    /// Number of writes so far.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl RenderTarget for Container {
    fn is_attached(&self) -> bool {
        self.state() == ContainerState::Attached
    }

    fn write(&self, html: String) {
        if !self.is_attached() {
            tracing::warn!(container_id = %self.id, "write to a container that is not attached ignored");
            return;
        }
        *lock(&self.html) = html;
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

/// The visible document modules are mounted into.
///
/// Container ids are never reused: every mount allocates a fresh container
/// and a detached container is dropped from the page for good.
#[derive(Debug, Default)]
pub struct HostPage {
    containers: RwLock<IndexMap<ContainerId, Arc<Container>>>,
    max_attached: Option<usize>,
}

impl HostPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page with room for at most `max` attached containers.
    pub fn with_max_attached(max: usize) -> Self {
        Self {
            max_attached: Some(max),
            ..Self::default()
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<ContainerId, Arc<Container>>> {
        self.containers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<ContainerId, Arc<Container>>> {
        self.containers.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A fresh, not yet attached container.
    pub fn allocate(&self) -> Arc<Container> {
        let container = Arc::new(Container::new());
        self.write().insert(container.id, Arc::clone(&container));
        tracing::debug!(container_id = %container.id, "container allocated");
        container
    }

    /// Put an allocated container into the visible document.
    ///
    /// Fails with `Mount` for unknown or detached containers and when the
    /// page has no room left.
    pub fn attach(&self, id: ContainerId) -> FrameworkResult<Arc<Container>> {
        let containers = self.read();
        let container = containers
            .get(&id)
            .ok_or_else(|| FrameworkError::mount(format!("container {id} is not on the page")))?;

        let attached = containers
            .values()
            .filter(|c| c.state() == ContainerState::Attached)
            .count();

        let mut state = lock(&container.state);
        match *state {
            ContainerState::Attached => return Ok(Arc::clone(container)),
            ContainerState::Detached => {
                return Err(FrameworkError::mount(format!("container {id} was detached")));
            }
            ContainerState::Allocated => {}
        }
        if let Some(max) = self.max_attached {
            if attached >= max {
                return Err(FrameworkError::mount(format!(
                    "no attachment point available ({max} containers attached)"
                )));
            }
        }
        *state = ContainerState::Attached;
        Ok(Arc::clone(container))
    }

    /// Remove a container from the page. Returns `false` if it was unknown.
    pub fn detach(&self, id: ContainerId) -> bool {
        let removed = self.write().shift_remove(&id);
        match removed {
            Some(container) => {
                *lock(&container.state) = ContainerState::Detached;
                tracing::debug!(container_id = %id, "container detached");
                true
            }
            None => false,
        }
    }

    pub fn container(&self, id: ContainerId) -> Option<Arc<Container>> {
        self.read().get(&id).cloned()
    }

    pub fn is_attached(&self, id: ContainerId) -> bool {
        self.container(id).is_some_and(|c| c.is_attached())
    }

    pub fn html_of(&self, id: ContainerId) -> Option<String> {
        self.container(id).map(|c| c.html())
    }

    pub fn attached_count(&self) -> usize {
        self.read().values().filter(|c| c.is_attached()).count()
    }

    /// Ids of every container on the page, in allocation order.
    pub fn container_ids(&self) -> Vec<ContainerId> {
        self.read().keys().copied().collect()
    }
}
