use crate::ecs::component::{Component, ComponentId};
use crate::ecs::execution_group::ExecutionGroup;
use crate::ecs::lock::SystemLock;
use crate::ecs::system::SystemTick;
use crate::message::Message;
use std::fmt;
use std::sync::Arc;

/// Caller-chosen numeric system id, unique across all groups.
pub type SystemId = u32;

pub type SystemUpdate = Box<dyn Fn(&mut SystemTick<'_>) + Send + Sync>;
pub type SystemMessageHandler = Box<dyn Fn(&SystemTick<'_>, &Message) + Send + Sync>;
pub type ComponentPredicate = Box<dyn Fn(ComponentId) -> bool + Send + Sync>;
pub type ComponentHook = Box<dyn Fn(&Component) + Send + Sync>;

/// Everything the scheduler needs to know about a component system.
pub struct SystemDescriptor {
    id: SystemId,
    group: ExecutionGroup,
    update: Option<SystemUpdate>,
    message_handler: Option<SystemMessageHandler>,
    handles_component: Option<ComponentPredicate>,
    adding_component: Option<ComponentHook>,
    removing_component: Option<ComponentHook>,
    lock: Option<Arc<dyn SystemLock>>,
}

impl SystemDescriptor {
    /// Create a descriptor with no callbacks for the given id and group.
    pub fn new(id: SystemId, group: ExecutionGroup) -> Self {
        Self {
            id,
            group,
            update: None,
            message_handler: None,
            handles_component: None,
            adding_component: None,
            removing_component: None,
            lock: None,
        }
    }

    /// Called once per group tick, after the mailbox has been drained.
    pub fn on_update<F>(mut self, update: F) -> Self
    where
        F: Fn(&mut SystemTick<'_>) + Send + Sync + 'static,
    {
        self.update = Some(Box::new(update));
        self
    }

    /// Handler for messages routed to the system itself.
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SystemTick<'_>, &Message) + Send + Sync + 'static,
    {
        self.message_handler = Some(Box::new(handler));
        self
    }

    /// Predicate deciding which component types this system claims.
    pub fn handles<F>(mut self, predicate: F) -> Self
    where
        F: Fn(ComponentId) -> bool + Send + Sync + 'static,
    {
        self.handles_component = Some(Box::new(predicate));
        self
    }

    /// Claim a fixed set of component types.
    pub fn handles_ids<I>(self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let ids = Self::sanitize(components);
        self.handles(move |id| ids.binary_search(&id).is_ok())
    }

    /// Called before a component is inserted directly into the active set.
    /// Without this hook additions are staged until the system's next tick.
    pub fn on_adding<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Component) + Send + Sync + 'static,
    {
        self.adding_component = Some(Box::new(hook));
        self
    }

    /// Counterpart of [`SystemDescriptor::on_adding`] for removals.
    pub fn on_removing<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Component) + Send + Sync + 'static,
    {
        self.removing_component = Some(Box::new(hook));
        self
    }

    /// Lock taken around each tick and around direct insertions.
    pub fn with_lock(mut self, lock: Arc<dyn SystemLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn group(&self) -> ExecutionGroup {
        self.group
    }

    pub fn handles_component(&self, id: ComponentId) -> bool {
        self.handles_component
            .as_ref()
            .is_some_and(|predicate| predicate(id))
    }

    pub(crate) fn update(&self) -> Option<&SystemUpdate> {
        self.update.as_ref()
    }

    pub(crate) fn message_handler(&self) -> Option<&SystemMessageHandler> {
        self.message_handler.as_ref()
    }

    pub(crate) fn adding_component(&self) -> Option<&ComponentHook> {
        self.adding_component.as_ref()
    }

    pub(crate) fn removing_component(&self) -> Option<&ComponentHook> {
        self.removing_component.as_ref()
    }

    pub(crate) fn lock(&self) -> Option<&dyn SystemLock> {
        self.lock.as_deref()
    }

    fn sanitize<I>(components: I) -> Vec<ComponentId>
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let mut list: Vec<ComponentId> = components.into_iter().collect();
        list.sort_unstable();
        list.dedup();
        list
    }
}

impl fmt::Debug for SystemDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDescriptor")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("update", &self.update.is_some())
            .field("lock", &self.lock.is_some())
            .finish_non_exhaustive()
    }
}
