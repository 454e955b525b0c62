//! Component system core types.
//!
//! Components are created from a runtime registry, attached to entities and
//! handed to the component system that claims their type. Systems are
//! grouped into execution lanes; each lane runs its systems in order on
//! its own thread, while any thread may stage additions, removals and
//! messages for them.

mod component;
mod component_registry;
mod entity;
mod entity_manager;
mod execution_group;
mod lock;
mod scheduler;
mod staging;
mod system;
mod system_descriptor;
mod system_registration_error;
mod system_registry;
mod world;

pub use component::{Component, ComponentData, ComponentId, COMPONENT_ID_RESERVED_MASK};
pub use component_registry::{
    ByteAllocator, ComponentAllocator, ComponentDescriptor, ComponentDestructor,
    ComponentInitializer, ComponentMessageHandler, ComponentRegistry, TypedAllocator,
};
pub use entity::Entity;
pub use entity_manager::EntityManager;
pub use execution_group::ExecutionGroup;
pub use lock::{RecursiveLock, SystemLock};
pub use scheduler::Scheduler;
pub use system::{ComponentSystem, SystemTick};
pub use system_descriptor::{
    ComponentHook, ComponentPredicate, SystemDescriptor, SystemId, SystemMessageHandler,
    SystemUpdate,
};
pub use system_registration_error::SystemRegistrationError;
pub use world::World;
