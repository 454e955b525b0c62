//! Messages posted from any thread and delivered inside system ticks.
//!
//! A message carries its own router. Posting asks the router which system
//! mailboxes should receive it; when a receiving system next ticks, it
//! drains its mailbox in posting order and asks the router to deliver each
//! message to its final recipients (components or the system itself).

mod mailbox;
mod router;

pub use mailbox::Mailbox;
pub use router::{
    ComponentRouter, EntityComponentRouter, MessageRouter, SystemRouter,
};

use crate::ecs::World;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub type MessageId = u32;

/// Type-erased message payload.
pub type MessagePayload = Box<dyn Any + Send + Sync>;

/// A routed message. Shared between every mailbox it was posted to and
/// freed once the last of them has delivered it.
pub struct Message {
    id: MessageId,
    router: Box<dyn MessageRouter>,
    payload: Option<MessagePayload>,
}

impl Message {
    pub fn new(id: MessageId, router: impl MessageRouter + 'static) -> Self {
        Self {
            id,
            router: Box::new(router),
            payload: None,
        }
    }

    pub fn with_payload<P: Any + Send + Sync>(mut self, payload: P) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    /// Hand the message to its router, which enqueues it in the mailboxes
    /// of the systems that should receive it.
    pub fn post(self, world: &World) -> Arc<Message> {
        let message = Arc::new(self);
        message.router.post(world, &message);
        message
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn router(&self) -> &dyn MessageRouter {
        self.router.as_ref()
    }

    /// Borrow the payload as `P`.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.as_deref()?.downcast_ref::<P>()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("has_payload", &self.has_payload())
            .finish_non_exhaustive()
    }
}

/// Post message `id` to the system claiming `component` type components.
pub fn post_to_component<P: Any + Send + Sync>(
    world: &World,
    id: MessageId,
    component: crate::ecs::ComponentId,
    payload: P,
) -> Arc<Message> {
    Message::new(id, ComponentRouter::new(component))
        .with_payload(payload)
        .post(world)
}
