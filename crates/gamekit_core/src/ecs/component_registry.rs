// component_registry.rs - Runtime component type registration
//
// Types are registered with a numeric id and an optional name. Any layer
// (Rust code, scripts, data files) can then create instances by id or name.

use crate::ecs::component::{
    Component, ComponentData, ComponentId, COMPONENT_ID_RESERVED_MASK,
};
use crate::message::Message;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub type ComponentInitializer = Arc<dyn Fn(&mut ComponentData, ComponentId) + Send + Sync>;
pub type ComponentDestructor = Arc<dyn Fn(&mut ComponentData) + Send + Sync>;
pub type ComponentMessageHandler = Arc<dyn Fn(&Component, &Message) + Send + Sync>;

/// Source of payload storage for new component instances.
pub trait ComponentAllocator: Send + Sync {
    /// Allocate `size` bytes worth of payload. `None` means out of memory.
    fn allocate(&self, size: usize) -> Option<ComponentData>;
}

/// Allocates a zeroed byte buffer of the registered size.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteAllocator;

impl ComponentAllocator for ByteAllocator {
    fn allocate(&self, size: usize) -> Option<ComponentData> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).ok()?;
        bytes.resize(size, 0u8);
        Some(Box::new(bytes.into_boxed_slice()))
    }
}

/// Allocates a default-initialized `T`.
pub struct TypedAllocator<T>(PhantomData<fn() -> T>);

impl<T> TypedAllocator<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Any + Send + Sync> ComponentAllocator for TypedAllocator<T> {
    fn allocate(&self, _size: usize) -> Option<ComponentData> {
        Some(Box::new(T::default()))
    }
}

/// Describes how instances of one component type are built and torn down.
#[derive(Clone)]
pub struct ComponentDescriptor {
    id: ComponentId,
    name: Option<String>,
    size: usize,
    allocator: Arc<dyn ComponentAllocator>,
    initializer: Option<ComponentInitializer>,
    destructor: Option<ComponentDestructor>,
    message_handler: Option<ComponentMessageHandler>,
}

impl ComponentDescriptor {
    /// Raw byte component of `size` bytes.
    pub fn new(id: ComponentId, size: usize) -> Self {
        Self {
            id,
            name: None,
            size,
            allocator: Arc::new(ByteAllocator),
            initializer: None,
            destructor: None,
            message_handler: None,
        }
    }

    /// Component whose payload is a default-initialized `T`.
    pub fn typed<T: Default + Any + Send + Sync>(id: ComponentId) -> Self {
        Self::new(id, size_of::<T>()).with_allocator(TypedAllocator::<T>::new())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_allocator(mut self, allocator: impl ComponentAllocator + 'static) -> Self {
        self.allocator = Arc::new(allocator);
        self
    }

    pub fn with_initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn(&mut ComponentData, ComponentId) + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    pub fn with_destructor<F>(mut self, destructor: F) -> Self
    where
        F: Fn(&mut ComponentData) + Send + Sync + 'static,
    {
        self.destructor = Some(Arc::new(destructor));
        self
    }

    pub fn with_message_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Component, &Message) + Send + Sync + 'static,
    {
        self.message_handler = Some(Arc::new(handler));
        self
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn destructor(&self) -> Option<&ComponentDestructor> {
        self.destructor.as_ref()
    }

    pub fn message_handler(&self) -> Option<&ComponentMessageHandler> {
        self.message_handler.as_ref()
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Table of component types, looked up by id or by name.
#[derive(Default)]
pub struct ComponentRegistry {
    descriptors: RwLock<HashMap<ComponentId, Arc<ComponentDescriptor>>>,
    names: RwLock<HashMap<String, ComponentId>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a component type.
    ///
    /// # Panics
    /// If the id uses any of the reserved bits.
    pub fn register(&self, descriptor: ComponentDescriptor) {
        assert_eq!(
            descriptor.id() & COMPONENT_ID_RESERVED_MASK,
            0,
            "Component ID {:#x} must not include any reserved bits",
            descriptor.id()
        );

        debug!(id = descriptor.id(), name = ?descriptor.name(), "registered component type");

        let id = descriptor.id();
        let name = descriptor.name().map(str::to_owned);
        let previous = self.descriptors.write().insert(id, Arc::new(descriptor));

        let mut names = self.names.write();
        if let Some(old_name) = previous.as_ref().and_then(|prev| prev.name()) {
            if names.get(old_name) == Some(&id) {
                names.remove(old_name);
            }
        }
        if let Some(name) = name {
            names.insert(name, id);
        }
    }

    /// Remove a component type. Existing instances stay valid.
    pub fn deregister(&self, id: ComponentId) -> bool {
        let Some(descriptor) = self.descriptors.write().remove(&id) else {
            return false;
        };
        if let Some(name) = descriptor.name() {
            let mut names = self.names.write();
            if names.get(name) == Some(&id) {
                names.remove(name);
            }
        }
        debug!(id, "deregistered component type");
        true
    }

    pub fn descriptor(&self, id: ComponentId) -> Option<Arc<ComponentDescriptor>> {
        self.descriptors.read().get(&id).cloned()
    }

    pub fn id_of_name(&self, name: &str) -> Option<ComponentId> {
        self.names.read().get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create an instance of a registered type.
    pub fn create(&self, id: ComponentId) -> Option<Component> {
        let Some(descriptor) = self.descriptor(id) else {
            warn!(id, "cannot create component of unregistered type");
            return None;
        };
        Self::instantiate(descriptor)
    }

    /// Create an instance of a registered type by its name.
    pub fn create_by_name(&self, name: &str) -> Option<Component> {
        let Some(id) = self.id_of_name(name) else {
            warn!(name, "cannot create component of unregistered type");
            return None;
        };
        self.create(id)
    }

    fn instantiate(descriptor: Arc<ComponentDescriptor>) -> Option<Component> {
        let Some(mut data) = descriptor.allocator.allocate(descriptor.size()) else {
            error!(
                id = descriptor.id(),
                size = descriptor.size(),
                "failed to allocate component"
            );
            return None;
        };
        if let Some(initializer) = &descriptor.initializer {
            initializer(&mut data, descriptor.id());
        }
        Some(Component::new(descriptor, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Health(i32);

    struct FailingAllocator;

    impl ComponentAllocator for FailingAllocator {
        fn allocate(&self, _size: usize) -> Option<ComponentData> {
            None
        }
    }

    #[test]
    fn create_by_id_and_name() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::typed::<Health>(10).with_name("health"));

        let by_id = registry.create(10).unwrap();
        let by_name = registry.create_by_name("health").unwrap();
        assert_eq!(by_id.id(), 10);
        assert_eq!(by_name.id(), 10);
        assert!(!by_id.is_managed());
        assert_eq!(by_name.read(|h: &Health| h.0), Some(0));
    }

    #[test]
    fn byte_components_are_zeroed() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::new(2, 16));

        let component = registry.create(2).unwrap();
        let bytes = component.read(|bytes: &Box<[u8]>| bytes.to_vec()).unwrap();
        assert_eq!(bytes, vec![0u8; 16]);
    }

    #[test]
    fn initializer_receives_type_id() {
        let registry = ComponentRegistry::new();
        registry.register(
            ComponentDescriptor::typed::<Health>(4).with_initializer(|data, id| {
                if let Some(health) = data.downcast_mut::<Health>() {
                    health.0 = id as i32 * 25;
                }
            }),
        );

        let component = registry.create(4).unwrap();
        assert_eq!(component.read(|h: &Health| h.0), Some(100));
    }

    #[test]
    fn unknown_types_yield_none() {
        let registry = ComponentRegistry::new();
        assert!(registry.create(99).is_none());
        assert!(registry.create_by_name("missing").is_none());
    }

    #[test]
    fn failed_allocation_yields_none() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::new(5, 8).with_allocator(FailingAllocator));
        assert!(registry.create(5).is_none());
    }

    #[test]
    fn deregister_removes_name() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::new(6, 4).with_name("six"));
        assert!(registry.deregister(6));
        assert!(!registry.deregister(6));
        assert!(registry.id_of_name("six").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistering_replaces_name() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::new(8, 4).with_name("old"));
        registry.register(ComponentDescriptor::new(8, 4).with_name("new"));
        assert!(registry.id_of_name("old").is_none());
        assert_eq!(registry.id_of_name("new"), Some(8));
    }

    #[test]
    #[should_panic(expected = "reserved bits")]
    fn reserved_bits_are_rejected() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::new(COMPONENT_ID_RESERVED_MASK | 1, 4));
    }
}
