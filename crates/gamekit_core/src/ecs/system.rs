// system.rs - Runtime state of a registered component system

use crate::ecs::component::{Component, ComponentId};
use crate::ecs::entity::Entity;
use crate::ecs::execution_group::ExecutionGroup;
use crate::ecs::lock::LockHold;
use crate::ecs::staging::Staging;
use crate::ecs::system_descriptor::{SystemDescriptor, SystemId};
use crate::ecs::world::World;
use crate::message::{Mailbox, Message};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::trace;

enum ActiveChange {
    Insert(Component),
    Remove(Component),
}

impl ActiveChange {
    fn apply(self, active: &mut Vec<Component>) {
        match self {
            ActiveChange::Insert(component) => active.push(component),
            ActiveChange::Remove(component) => active.retain(|c| *c != component),
        }
    }
}

#[derive(Default)]
struct OwnedComponents {
    active: Vec<Component>,
    // Removed last tick; handed back by the next `removed_components` call.
    destroy: Vec<Component>,
}

/// A registered system: its descriptor plus the component sets and mailbox
/// it owns.
pub struct ComponentSystem {
    descriptor: SystemDescriptor,
    owned: Mutex<OwnedComponents>,
    staging: Staging<Component>,
    mailbox: Mailbox,
    // Thread running this system's tick, if any.
    ticking: Mutex<Option<ThreadId>>,
    // Hook-driven changes made from inside the tick; applied when it ends.
    deferred: Mutex<Vec<ActiveChange>>,
}

impl ComponentSystem {
    pub(crate) fn new(descriptor: SystemDescriptor) -> Self {
        Self {
            descriptor,
            owned: Mutex::new(OwnedComponents::default()),
            staging: Staging::new(),
            mailbox: Mailbox::new(),
            ticking: Mutex::new(None),
            deferred: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> SystemId {
        self.descriptor.id()
    }

    pub fn group(&self) -> ExecutionGroup {
        self.descriptor.group()
    }

    pub fn descriptor(&self) -> &SystemDescriptor {
        &self.descriptor
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn handles_component(&self, id: ComponentId) -> bool {
        self.descriptor.handles_component(id)
    }

    /// Snapshot of the active set.
    ///
    /// Must not be called from inside this system's own tick; use
    /// [`SystemTick::components`] there.
    pub fn components(&self) -> Vec<Component> {
        self.owned.lock().active.clone()
    }

    pub fn pending_additions(&self) -> usize {
        self.staging.pending_added()
    }

    pub fn pending_removals(&self) -> usize {
        self.staging.pending_removed()
    }

    pub fn is_removal_pending(&self, component: &Component) -> bool {
        self.staging.is_removal_pending(component)
    }

    /// Returns `true` when the system has no lock hook.
    pub fn try_lock(&self) -> bool {
        self.descriptor.lock().map_or(true, |lock| lock.try_lock())
    }

    pub fn lock(&self) {
        if let Some(lock) = self.descriptor.lock() {
            lock.lock();
        }
    }

    pub fn unlock(&self) {
        if let Some(lock) = self.descriptor.lock() {
            lock.unlock();
        }
    }

    fn hold_lock(&self) -> LockHold<'_> {
        LockHold::acquire(self.descriptor.lock())
    }

    fn is_ticking_on_current_thread(&self) -> bool {
        *self.ticking.lock() == Some(thread::current().id())
    }

    /// Apply a hook-driven change to the active set. From inside this
    /// system's own tick the change waits until the tick ends, since the
    /// tick already holds the active set.
    fn change_active(&self, change: ActiveChange) {
        if self.is_ticking_on_current_thread() {
            self.deferred.lock().push(change);
            return;
        }
        let _lock = self.hold_lock();
        change.apply(&mut self.owned.lock().active);
    }

    pub(crate) fn add_component(&self, component: &Component) {
        assert!(
            !component.is_managed(),
            "Component must not already be managed by a system"
        );
        component.set_managed(true);

        match self.descriptor.adding_component() {
            Some(adding) => {
                adding(component);
                self.change_active(ActiveChange::Insert(component.clone()));
            }
            None => self.staging.stage_added(component.clone()),
        }
    }

    pub(crate) fn remove_component(&self, component: &Component) {
        if !component.is_managed() {
            return;
        }

        match self.descriptor.removing_component() {
            Some(removing) => {
                removing(component);
                self.change_active(ActiveChange::Remove(component.clone()));
                component.set_managed(false);
            }
            None => {
                self.staging.stage_removed(component.clone());
            }
        }
    }

    /// One tick: take the lock hook, drain the mailbox, then update.
    pub(crate) fn run(&self, world: &World, delta: Option<Duration>) {
        let _lock = self.hold_lock();
        let owned = self.owned.lock();
        *self.ticking.lock() = Some(thread::current().id());
        let mut tick = SystemTick {
            world,
            system: self,
            owned,
            delta,
        };

        for message in self.mailbox.drain() {
            message.router().deliver(&message, &tick);
        }

        if let Some(update) = self.descriptor.update() {
            update(&mut tick);
        }
    }
}

impl fmt::Debug for ComponentSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSystem")
            .field("id", &self.id())
            .field("group", &self.group())
            .field("mailbox", &self.mailbox.len())
            .finish_non_exhaustive()
    }
}

/// Access to a system's state while it is ticking.
///
/// Holds the system's component lock for its whole lifetime, so the active
/// set cannot change underneath an update. Components the tick itself adds
/// or removes through the system's hooks show up in the active set once the
/// tick ends.
pub struct SystemTick<'a> {
    world: &'a World,
    system: &'a ComponentSystem,
    owned: MutexGuard<'a, OwnedComponents>,
    delta: Option<Duration>,
}

impl<'a> SystemTick<'a> {
    pub fn world(&self) -> &'a World {
        self.world
    }

    pub fn system(&self) -> &'a ComponentSystem {
        self.system
    }

    pub fn system_id(&self) -> SystemId {
        self.system.id()
    }

    pub fn group(&self) -> ExecutionGroup {
        self.system.group()
    }

    /// Time since the group's previous run. `None` for untimed groups and
    /// zero on a timed group's first run.
    pub fn delta(&self) -> Option<Duration> {
        self.delta
    }

    pub fn components(&self) -> &[Component] {
        &self.owned.active
    }

    /// The active component of type `id` attached to `entity`.
    pub fn find_component(&self, id: ComponentId, entity: &Entity) -> Option<&Component> {
        self.owned
            .active
            .iter()
            .find(|component| component.id() == id && component.is_attached_to(entity))
    }

    /// Merge staged additions into the active set and return them.
    pub fn added_components(&mut self) -> Vec<Component> {
        let added = self.system.staging.take_added();
        self.owned.active.extend(added.iter().cloned());
        added
    }

    /// Apply staged removals and return the batch removed on the previous
    /// call. Removed components stop being managed immediately but stay
    /// alive for one more tick.
    pub fn removed_components(&mut self) -> Vec<Component> {
        let staged = self.system.staging.take_removed();
        if !staged.is_empty() {
            self.system.staging.discard_added(&staged);
            self.owned.active.retain(|component| !staged.contains(component));
            for component in &staged {
                component.set_managed(false);
            }
            trace!(
                system = self.system.id(),
                count = staged.len(),
                "removed components"
            );
        }
        std::mem::replace(&mut self.owned.destroy, staged)
    }

    /// Run this system's message handler for `message`.
    pub fn handle_system_message(&self, message: &Message) {
        match self.system.descriptor.message_handler() {
            Some(handler) => handler(self, message),
            None => trace!(
                system = self.system.id(),
                message = message.id(),
                "system has no message handler; message dropped"
            ),
        }
    }
}

impl Drop for SystemTick<'_> {
    fn drop(&mut self) {
        let deferred = std::mem::take(&mut *self.system.deferred.lock());
        for change in deferred {
            change.apply(&mut self.owned.active);
        }
        *self.system.ticking.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentDescriptor;

    fn world() -> World {
        let world = World::new();
        world.components().register(ComponentDescriptor::typed::<u32>(5));
        world
    }

    #[test]
    fn staged_additions_merge_on_request() {
        let world = world();
        let system = ComponentSystem::new(
            SystemDescriptor::new(1, ExecutionGroup::Manual).handles_ids([5]),
        );
        let component = world.components().create(5).unwrap();

        system.add_component(&component);
        assert!(component.is_managed());
        assert_eq!(system.pending_additions(), 1);
        assert!(system.components().is_empty());

        system.run(&world, None);
        assert!(system.components().is_empty(), "no update merged the staging");
    }

    #[test]
    fn removal_is_reported_one_tick_later() {
        let world = world();
        let reported = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let system = ComponentSystem::new(
            SystemDescriptor::new(1, ExecutionGroup::Manual)
                .handles_ids([5])
                .on_update(move |tick| {
                    tick.added_components();
                    let removed = tick.removed_components();
                    sink.lock().push(removed.len());
                }),
        );
        let component = world.components().create(5).unwrap();

        system.add_component(&component);
        system.run(&world, None);
        assert_eq!(system.components(), vec![component.clone()]);

        system.remove_component(&component);
        system.remove_component(&component);
        assert_eq!(system.pending_removals(), 1);

        system.run(&world, None);
        assert!(!component.is_managed());
        assert!(system.components().is_empty());

        system.run(&world, None);
        assert_eq!(*reported.lock(), vec![0, 0, 1]);
    }

    #[test]
    fn hooks_bypass_staging() {
        let world = world();
        let system = ComponentSystem::new(
            SystemDescriptor::new(1, ExecutionGroup::Manual)
                .handles_ids([5])
                .on_adding(|_| {})
                .on_removing(|_| {}),
        );
        let component = world.components().create(5).unwrap();

        system.add_component(&component);
        assert_eq!(system.components(), vec![component.clone()]);

        system.remove_component(&component);
        assert!(system.components().is_empty());
        assert!(!component.is_managed());
    }

    #[test]
    fn hooked_changes_from_own_tick_land_when_it_ends() {
        let world = world();
        let spawned = std::sync::Arc::new(Mutex::new(None::<Component>));
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let (slot, sink) = (spawned.clone(), seen.clone());
        world
            .scheduler()
            .register(
                SystemDescriptor::new(1, ExecutionGroup::Manual)
                    .handles_ids([5])
                    .on_adding(|_| {})
                    .on_removing(|_| {})
                    .on_update(move |tick| {
                        sink.lock().push(tick.components().len());
                        let scheduler = tick.world().scheduler();
                        let mut slot = slot.lock();
                        match slot.take() {
                            None => {
                                let component = tick.world().components().create(5).unwrap();
                                scheduler.add_component(&component);
                                *slot = Some(component);
                            }
                            Some(component) => scheduler.remove_component(&component),
                        }
                    }),
            )
            .unwrap();

        world.run_group(ExecutionGroup::Manual);
        let component = spawned.lock().clone().unwrap();
        assert!(component.is_managed());
        assert_eq!(
            world.scheduler().components_for_system(1).unwrap(),
            vec![component.clone()]
        );

        world.run_group(ExecutionGroup::Manual);
        assert!(!component.is_managed());
        assert!(world.scheduler().components_for_system(1).unwrap().is_empty());
        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    #[should_panic(expected = "already be managed")]
    fn adding_managed_component_panics() {
        let world = world();
        let system = ComponentSystem::new(SystemDescriptor::new(1, ExecutionGroup::Manual));
        let component = world.components().create(5).unwrap();
        system.add_component(&component);
        system.add_component(&component);
    }
}
