// world.rs - Owner of all shared substrate state

use crate::config::CoreConfig;
use crate::ecs::component_registry::ComponentRegistry;
use crate::ecs::entity_manager::EntityManager;
use crate::ecs::execution_group::ExecutionGroup;
use crate::ecs::scheduler::Scheduler;
use crate::script::ExpressionRegistry;

/// Component types, systems, entities and expression bindings for one
/// simulation. Share it between lane threads behind an `Arc`.
pub struct World {
    config: CoreConfig,
    components: ComponentRegistry,
    scheduler: Scheduler,
    entities: EntityManager,
    expressions: ExpressionRegistry,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            components: ComponentRegistry::new(),
            scheduler: Scheduler::new(&config),
            entities: EntityManager::new(),
            expressions: ExpressionRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub fn expressions(&self) -> &ExpressionRegistry {
        &self.expressions
    }

    /// Run every system of `group` once. Call from the group's own thread.
    pub fn run_group(&self, group: ExecutionGroup) {
        self.scheduler.run_group(self, group);
    }

    /// Advance the entity manager one step.
    pub fn update_entities(&self) {
        self.entities.update(&self.scheduler);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
