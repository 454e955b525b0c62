// entity.rs - Entities are reference-counted component containers

use crate::ecs::component::{Component, ComponentId};
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::trace;

/// A shared handle to an entity: an optional string id plus the
/// components attached to it.
#[derive(Clone)]
pub struct Entity(Arc<EntityInner>);

struct EntityInner {
    id: Option<String>,
    components: Mutex<Vec<Component>>,
}

/// Non-owning back reference from a component to its entity.
#[derive(Clone)]
pub(crate) struct WeakEntity(Weak<EntityInner>);

impl WeakEntity {
    pub(crate) fn upgrade(&self) -> Option<Entity> {
        self.0.upgrade().map(Entity)
    }

    pub(crate) fn points_to(&self, entity: &Entity) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&entity.0))
    }
}

impl Entity {
    pub fn new() -> Self {
        Self::from_id(None)
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self::from_id(Some(id.into()))
    }

    fn from_id(id: Option<String>) -> Self {
        Self(Arc::new(EntityInner {
            id,
            components: Mutex::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.id.as_deref()
    }

    /// Attach a component. The entity keeps it alive while attached.
    ///
    /// # Panics
    /// If the component is already attached to an entity.
    pub fn attach_component(&self, component: &Component) {
        assert!(
            !component.is_attached(),
            "Component must not already be attached to an entity"
        );
        component.set_entity(Some(self.downgrade()));
        self.0.components.lock().push(component.clone());
    }

    /// Detach a component previously attached to this entity.
    ///
    /// # Panics
    /// If the component belongs to another entity.
    pub fn detach_component(&self, component: &Component) {
        assert!(
            component.is_attached_to(self),
            "Component must be attached to the entity it is detached from"
        );
        let mut components = self.0.components.lock();
        if let Some(index) = components.iter().position(|c| c == component) {
            let detached = components.remove(index);
            drop(components);
            detached.set_entity(None);
        }
    }

    /// Snapshot of the attached components.
    pub fn components(&self) -> Vec<Component> {
        self.0.components.lock().clone()
    }

    /// First attached component of the given type.
    pub fn component(&self, id: ComponentId) -> Option<Component> {
        self.0
            .components
            .lock()
            .iter()
            .find(|component| component.id() == id)
            .cloned()
    }

    pub fn has_managed_components(&self) -> bool {
        self.0.components.lock().iter().any(Component::is_managed)
    }

    /// Number of live handles to this entity.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Release this handle after all systems have let go of the entity.
    ///
    /// # Panics
    /// If any attached component is still managed by a system.
    pub fn finalize(self) {
        assert!(
            !self.has_managed_components(),
            "Entity must not be finalized while a system still manages its components"
        );
        trace!(entity = ?self.id(), "finalized entity");
    }

    pub(crate) fn downgrade(&self) -> WeakEntity {
        WeakEntity(Arc::downgrade(&self.0))
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id())
            .field("components", &self.0.components.lock().len())
            .finish()
    }
}

impl Drop for EntityInner {
    fn drop(&mut self) {
        for component in self.components.get_mut().drain(..) {
            component.set_entity(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{ComponentDescriptor, ComponentRegistry};

    fn registry() -> ComponentRegistry {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::typed::<u32>(1));
        registry.register(ComponentDescriptor::typed::<u32>(2));
        registry
    }

    #[test]
    fn attach_sets_back_reference() {
        let registry = registry();
        let entity = Entity::with_id("player");
        let component = registry.create(1).unwrap();

        entity.attach_component(&component);
        assert_eq!(component.entity(), Some(entity.clone()));
        assert_eq!(entity.component(1), Some(component.clone()));
        assert_eq!(entity.id(), Some("player"));

        entity.detach_component(&component);
        assert!(component.entity().is_none());
        assert!(entity.components().is_empty());
    }

    #[test]
    fn entity_keeps_components_alive() {
        let registry = registry();
        let entity = Entity::new();
        let component = registry.create(2).unwrap();
        entity.attach_component(&component);
        assert_eq!(component.ref_count(), 2);

        drop(entity);
        assert_eq!(component.ref_count(), 1);
        assert!(component.entity().is_none());
    }

    #[test]
    #[should_panic(expected = "already be attached")]
    fn double_attach_panics() {
        let registry = registry();
        let component = registry.create(1).unwrap();
        let owner = Entity::new();
        owner.attach_component(&component);
        let other = Entity::new();
        other.attach_component(&component);
    }

    #[test]
    #[should_panic(expected = "attached to the entity it is detached from")]
    fn detach_from_wrong_entity_panics() {
        let registry = registry();
        let component = registry.create(1).unwrap();
        let owner = Entity::new();
        owner.attach_component(&component);
        Entity::new().detach_component(&component);
    }

    #[test]
    #[should_panic(expected = "still manages")]
    fn finalize_with_managed_component_panics() {
        let registry = registry();
        let component = registry.create(1).unwrap();
        let entity = Entity::new();
        entity.attach_component(&component);
        component.set_managed(true);
        entity.finalize();
    }
}
