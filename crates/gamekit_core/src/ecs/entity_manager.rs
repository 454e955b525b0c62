// entity_manager.rs - Staged entity lifecycle with deferred destruction
//
// Removing an entity does not free it. The entity waits in the destroy
// list until every system has released its components, which can take
// several ticks when those systems run on other threads.

use crate::ecs::component::Component;
use crate::ecs::entity::Entity;
use crate::ecs::lock::RecursiveLock;
use crate::ecs::scheduler::Scheduler;
use crate::ecs::staging::Staging;
use parking_lot::{Mutex, ReentrantMutexGuard};
use tracing::{debug, trace};

#[derive(Default)]
struct ManagedEntities {
    active: Vec<Entity>,
    destroy: Vec<Entity>,
}

pub struct EntityManager {
    lock: RecursiveLock,
    staging: Staging<Entity>,
    state: Mutex<ManagedEntities>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            lock: RecursiveLock::new(),
            staging: Staging::new(),
            state: Mutex::new(ManagedEntities::default()),
        }
    }

    /// Stage an entity for addition. Safe from any thread.
    pub fn add_entity(&self, entity: &Entity) {
        self.staging.stage_added(entity.clone());
    }

    /// Stage an entity for removal. Repeated removals are ignored.
    pub fn remove_entity(&self, entity: &Entity) {
        self.staging.stage_removed(entity.clone());
    }

    /// Apply staged changes and advance pending destructions.
    ///
    /// Entities whose components are all unmanaged are finalized; the rest
    /// have their managed components handed back to their systems and wait
    /// for a later update.
    pub fn update(&self, scheduler: &Scheduler) {
        let _guard = self.lock.guard();

        let added = self.staging.take_added();
        let removed = self.staging.take_removed();
        let mut managed: Vec<Component> = Vec::new();
        let mut finalized: Vec<Entity> = Vec::new();

        {
            let mut state = self.state.lock();
            let state = &mut *state;
            state.active.extend(added);

            if !removed.is_empty() {
                state.active.retain(|entity| !removed.contains(entity));
                for entity in removed {
                    if !state.destroy.contains(&entity) {
                        state.destroy.push(entity);
                    }
                }
            }

            state.destroy.retain(|entity| {
                let owned: Vec<Component> = entity
                    .components()
                    .into_iter()
                    .filter(Component::is_managed)
                    .collect();
                if owned.is_empty() {
                    finalized.push(entity.clone());
                    false
                } else {
                    managed.extend(owned);
                    true
                }
            });
        }

        for component in &managed {
            scheduler.remove_component(component);
        }

        if !finalized.is_empty() {
            debug!(count = finalized.len(), "finalizing destroyed entities");
        }
        for entity in finalized {
            entity.finalize();
        }
        trace!(pending = managed.len(), "entity update complete");
    }

    /// Snapshot of the active entities.
    pub fn entities(&self) -> Vec<Entity> {
        self.state.lock().active.clone()
    }

    pub fn is_pending_destruction(&self, entity: &Entity) -> bool {
        self.state.lock().destroy.contains(entity)
    }

    pub fn pending_destruction(&self) -> usize {
        self.state.lock().destroy.len()
    }

    /// Hold the manager lock; blocks concurrent `update` calls.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.guard()
    }

    pub fn try_lock(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        self.lock.try_guard()
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{ComponentDescriptor, ExecutionGroup, SystemDescriptor, World};

    #[test]
    fn staged_entities_become_active_on_update() {
        let world = World::new();
        let entity = Entity::with_id("e");
        world.entities().add_entity(&entity);
        assert!(world.entities().entities().is_empty());

        world.update_entities();
        assert_eq!(world.entities().entities(), vec![entity]);
    }

    #[test]
    fn entity_without_managed_components_is_freed_at_once() {
        let world = World::new();
        let entity = Entity::new();
        world.entities().add_entity(&entity);
        world.update_entities();

        world.entities().remove_entity(&entity);
        world.entities().remove_entity(&entity);
        world.update_entities();

        assert!(world.entities().entities().is_empty());
        assert_eq!(world.entities().pending_destruction(), 0);
        assert_eq!(entity.ref_count(), 1);
    }

    #[test]
    fn managed_components_delay_destruction() {
        let world = World::new();
        world.components().register(ComponentDescriptor::typed::<u32>(5));
        world
            .scheduler()
            .register(SystemDescriptor::new(1, ExecutionGroup::Manual).handles_ids([5]))
            .unwrap();

        let entity = Entity::new();
        let component = world.components().create(5).unwrap();
        entity.attach_component(&component);
        world.scheduler().add_component(&component);
        world.entities().add_entity(&entity);
        world.update_entities();

        world.entities().remove_entity(&entity);
        world.update_entities();
        assert!(world.entities().is_pending_destruction(&entity));

        // The system never ticks, so the component is never released.
        world.update_entities();
        assert!(world.entities().is_pending_destruction(&entity));
        assert_eq!(world.scheduler().system(1).unwrap().pending_removals(), 1);
    }

    #[test]
    fn lock_is_reentrant_and_exclusive() {
        let manager = EntityManager::new();
        let _outer = manager.lock();
        assert!(manager.try_lock().is_some());
        let blocked = std::thread::scope(|scope| {
            scope.spawn(|| manager.try_lock().is_none()).join().unwrap()
        });
        assert!(blocked);
    }
}
