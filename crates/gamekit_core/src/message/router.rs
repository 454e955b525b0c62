// router.rs - Message routing strategies

use crate::ecs::{ComponentId, Entity, SystemId, SystemTick, World};
use crate::message::Message;
use std::sync::Arc;
use tracing::trace;

/// Decides where a message goes.
///
/// `post` runs on the posting thread and picks the mailboxes; `deliver`
/// runs inside the receiving system's tick and picks the final recipients.
pub trait MessageRouter: Send + Sync {
    fn post(&self, world: &World, message: &Arc<Message>);
    fn deliver(&self, message: &Message, tick: &SystemTick<'_>);
}

/// Delivers to every active component of one type.
#[derive(Debug, Clone, Copy)]
pub struct ComponentRouter {
    component: ComponentId,
}

impl ComponentRouter {
    pub fn new(component: ComponentId) -> Self {
        Self { component }
    }
}

impl MessageRouter for ComponentRouter {
    fn post(&self, world: &World, message: &Arc<Message>) {
        match world.scheduler().system_handling(self.component) {
            Some(system) => system.mailbox().push(Arc::clone(message)),
            None => trace!(
                message = message.id(),
                component = self.component,
                "no system claims component; message dropped"
            ),
        }
    }

    fn deliver(&self, message: &Message, tick: &SystemTick<'_>) {
        for component in tick.components() {
            if component.id() == self.component {
                component.handle_message(message);
            }
        }
    }
}

/// Delivers to the component of one type attached to a specific entity.
#[derive(Debug, Clone)]
pub struct EntityComponentRouter {
    component: ComponentId,
    entity: Entity,
}

impl EntityComponentRouter {
    pub fn new(component: ComponentId, entity: &Entity) -> Self {
        Self {
            component,
            entity: entity.clone(),
        }
    }
}

impl MessageRouter for EntityComponentRouter {
    fn post(&self, world: &World, message: &Arc<Message>) {
        ComponentRouter::new(self.component).post(world, message);
    }

    fn deliver(&self, message: &Message, tick: &SystemTick<'_>) {
        if let Some(component) = tick.find_component(self.component, &self.entity) {
            component.handle_message(message);
        }
    }
}

/// Delivers to a system's own message handler.
#[derive(Debug, Clone, Copy)]
pub struct SystemRouter {
    system: SystemId,
}

impl SystemRouter {
    pub fn new(system: SystemId) -> Self {
        Self { system }
    }
}

impl MessageRouter for SystemRouter {
    fn post(&self, world: &World, message: &Arc<Message>) {
        match world.scheduler().system(self.system) {
            Some(system) => system.mailbox().push(Arc::clone(message)),
            None => trace!(
                message = message.id(),
                system = self.system,
                "unknown system; message dropped"
            ),
        }
    }

    fn deliver(&self, message: &Message, tick: &SystemTick<'_>) {
        tick.handle_system_message(message);
    }
}
