use crate::ecs::component::ComponentId;
use crate::ecs::execution_group::ExecutionGroup;
use crate::ecs::system::ComponentSystem;
use crate::ecs::system_descriptor::{SystemDescriptor, SystemId};
use crate::ecs::system_registration_error::SystemRegistrationError;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registered systems, kept in registration order per execution group.
pub(crate) struct SystemRegistry {
    groups: [RwLock<Vec<Arc<ComponentSystem>>>; ExecutionGroup::COUNT],
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            groups: std::array::from_fn(|_| RwLock::new(Vec::new())),
        }
    }

    pub fn register(
        &self,
        descriptor: SystemDescriptor,
    ) -> Result<Arc<ComponentSystem>, SystemRegistrationError> {
        if let Some(existing) = self.system(descriptor.id()) {
            return Err(SystemRegistrationError::DuplicateId {
                id: existing.id(),
                group: existing.group(),
            });
        }

        let system = Arc::new(ComponentSystem::new(descriptor));
        self.groups[system.group().index()]
            .write()
            .push(Arc::clone(&system));
        Ok(system)
    }

    pub fn deregister(
        &self,
        id: SystemId,
        group: ExecutionGroup,
    ) -> Result<Arc<ComponentSystem>, SystemRegistrationError> {
        let mut systems = self.groups[group.index()].write();
        let index = systems
            .iter()
            .position(|system| system.id() == id)
            .ok_or(SystemRegistrationError::UnknownSystem { id, group })?;
        Ok(systems.remove(index))
    }

    /// Snapshot of a group's systems, in registration order.
    pub fn systems(&self, group: ExecutionGroup) -> Vec<Arc<ComponentSystem>> {
        self.groups[group.index()].read().clone()
    }

    pub fn system(&self, id: SystemId) -> Option<Arc<ComponentSystem>> {
        self.groups.iter().find_map(|systems| {
            systems
                .read()
                .iter()
                .find(|system| system.id() == id)
                .cloned()
        })
    }

    /// First system, in group then registration order, that claims `component`.
    pub fn system_handling(&self, component: ComponentId) -> Option<Arc<ComponentSystem>> {
        self.groups.iter().find_map(|systems| {
            systems
                .read()
                .iter()
                .find(|system| system.handles_component(component))
                .cloned()
        })
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|systems| systems.read().len()).sum()
    }
}
