//! GameKit Core
//!
//! The concurrent component-system substrate:
//! - Component type registry and reference-counted components
//! - Entities and the staged, multi-tick entity manager
//! - Component systems grouped into execution lanes and the scheduler
//! - Message routing into per-system mailboxes
//! - Epoch-based reclamation and the concurrent index map
//! - Scriptable dynamic fields published across execution groups

pub mod config;
pub mod ecs;
pub mod gc;
pub mod message;
pub mod script;
pub mod time;

pub use config::CoreConfig;
pub use ecs::{
    ByteAllocator, Component, ComponentAllocator, ComponentData, ComponentDescriptor, ComponentId,
    ComponentRegistry, ComponentSystem, Entity, EntityManager, ExecutionGroup, RecursiveLock,
    Scheduler, SystemDescriptor, SystemId, SystemLock, SystemRegistrationError, SystemTick,
    TypedAllocator, World, COMPONENT_ID_RESERVED_MASK,
};
pub use gc::{ConcurrentIndexMap, Epoch, EpochCollector};
pub use message::{Mailbox, Message, MessageId, MessageRouter};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
