// scheduler.rs - Runs execution groups and routes components to systems

use crate::config::CoreConfig;
use crate::ecs::component::{Component, ComponentId};
use crate::ecs::execution_group::ExecutionGroup;
use crate::ecs::system::ComponentSystem;
use crate::ecs::system_descriptor::{SystemDescriptor, SystemId};
use crate::ecs::system_registration_error::SystemRegistrationError;
use crate::ecs::system_registry::SystemRegistry;
use crate::ecs::world::World;
use crate::time::GroupClock;
use gamekit_metrics::{SystemProfiler, TickTimer};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Owns every component system and drives them group by group.
pub struct Scheduler {
    registry: SystemRegistry,
    clocks: [Mutex<GroupClock>; ExecutionGroup::COUNT],
    tick_timers: [Mutex<TickTimer>; ExecutionGroup::COUNT],
    profilers: [Mutex<SystemProfiler>; ExecutionGroup::COUNT],
}

impl Scheduler {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            registry: SystemRegistry::new(),
            clocks: std::array::from_fn(|_| Mutex::new(GroupClock::new())),
            tick_timers: std::array::from_fn(|_| Mutex::new(TickTimer::new(config.tick_history))),
            profilers: std::array::from_fn(|_| Mutex::new(SystemProfiler::new())),
        }
    }

    pub fn register(&self, descriptor: SystemDescriptor) -> Result<(), SystemRegistrationError> {
        let system = self.registry.register(descriptor)?;
        debug!(id = system.id(), group = %system.group(), "registered system");
        Ok(())
    }

    /// Remove a system. Components it still manages stay flagged as managed.
    pub fn deregister(
        &self,
        id: SystemId,
        group: ExecutionGroup,
    ) -> Result<(), SystemRegistrationError> {
        self.registry.deregister(id, group)?;
        self.profilers[group.index()].lock().forget(id);
        debug!(id, %group, "deregistered system");
        Ok(())
    }

    pub fn system(&self, id: SystemId) -> Option<Arc<ComponentSystem>> {
        self.registry.system(id)
    }

    pub fn system_handling(&self, component: ComponentId) -> Option<Arc<ComponentSystem>> {
        self.registry.system_handling(component)
    }

    pub fn systems(&self, group: ExecutionGroup) -> Vec<Arc<ComponentSystem>> {
        self.registry.systems(group)
    }

    pub fn system_count(&self) -> usize {
        self.registry.len()
    }

    /// Run every system of `group` once, in registration order.
    pub(crate) fn run_group(&self, world: &World, group: ExecutionGroup) {
        let delta = group
            .is_timed()
            .then(|| self.clocks[group.index()].lock().advance());
        let systems = self.registry.systems(group);

        self.tick_timers[group.index()].lock().begin();
        for system in &systems {
            let start = Instant::now();
            system.run(world, delta);
            self.profilers[group.index()]
                .lock()
                .record(system.id(), start.elapsed());
        }
        self.tick_timers[group.index()].lock().end();
    }

    /// Hand `component` to the first system that claims its type.
    /// Unclaimed components stay unmanaged.
    pub fn add_component(&self, component: &Component) {
        match self.registry.system_handling(component.id()) {
            Some(system) => system.add_component(component),
            None => trace!(component = component.id(), "no system claims component"),
        }
    }

    /// Take `component` away from the system managing its type.
    pub fn remove_component(&self, component: &Component) {
        if let Some(system) = self.registry.system_handling(component.id()) {
            system.remove_component(component);
        }
    }

    /// Snapshot of a system's active set. Must not be called from inside
    /// that system's own tick.
    pub fn components_for_system(&self, id: SystemId) -> Option<Vec<Component>> {
        self.registry.system(id).map(|system| system.components())
    }

    /// Returns `true` if the system is unknown or has no lock hook.
    pub fn try_lock(&self, id: SystemId) -> bool {
        self.registry.system(id).map_or(true, |system| system.try_lock())
    }

    pub fn lock(&self, id: SystemId) {
        if let Some(system) = self.registry.system(id) {
            system.lock();
        }
    }

    pub fn unlock(&self, id: SystemId) {
        if let Some(system) = self.registry.system(id) {
            system.unlock();
        }
    }

    /// Rolling average duration of one run of `group`.
    pub fn group_tick_time(&self, group: ExecutionGroup) -> Duration {
        self.tick_timers[group.index()].lock().tick_time()
    }

    /// Shortest and longest recent run of `group`.
    pub fn group_tick_range(&self, group: ExecutionGroup) -> (Duration, Duration) {
        self.tick_timers[group.index()].lock().tick_time_range()
    }

    pub fn group_ticks(&self, group: ExecutionGroup) -> u64 {
        self.tick_timers[group.index()].lock().ticks()
    }

    /// Total time spent in the system's updates. `None` for unknown systems.
    pub fn system_time(&self, id: SystemId) -> Option<Duration> {
        let system = self.registry.system(id)?;
        Some(self.profilers[system.group().index()].lock().timing(id))
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}
