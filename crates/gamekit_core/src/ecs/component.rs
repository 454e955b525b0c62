// component.rs - Reference-counted runtime components
//
// Components are identified by u32 IDs, not Rust TypeIds. The top bit of
// the stored id is reserved for the "managed by a system" flag, so the
// public id space is 31 bits wide.

use crate::ecs::component_registry::ComponentDescriptor;
use crate::ecs::entity::{Entity, WeakEntity};
use crate::message::Message;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub type ComponentId = u32;

/// Bits of a component id reserved for internal flags.
pub const COMPONENT_ID_RESERVED_MASK: ComponentId = !(ComponentId::MAX >> 1);

/// Type-erased component payload.
pub type ComponentData = Box<dyn Any + Send + Sync>;

/// Shared handle to a component instance.
///
/// Cloning retains, dropping releases. The payload is freed (running the
/// type's destructor) when the last handle goes away.
#[derive(Clone)]
pub struct Component(Arc<ComponentInner>);

struct ComponentInner {
    tagged_id: AtomicU32,
    entity: Mutex<Option<WeakEntity>>,
    data: RwLock<ComponentData>,
    descriptor: Arc<ComponentDescriptor>,
}

impl Component {
    pub(crate) fn new(descriptor: Arc<ComponentDescriptor>, data: ComponentData) -> Self {
        Self(Arc::new(ComponentInner {
            tagged_id: AtomicU32::new(descriptor.id() & !COMPONENT_ID_RESERVED_MASK),
            entity: Mutex::new(None),
            data: RwLock::new(data),
            descriptor,
        }))
    }

    /// Type id with the reserved bits stripped.
    pub fn id(&self) -> ComponentId {
        self.0.tagged_id.load(Ordering::Acquire) & !COMPONENT_ID_RESERVED_MASK
    }

    /// Whether a component system currently owns this component.
    pub fn is_managed(&self) -> bool {
        self.0.tagged_id.load(Ordering::Acquire) & COMPONENT_ID_RESERVED_MASK != 0
    }

    pub(crate) fn set_managed(&self, managed: bool) {
        if managed {
            self.0
                .tagged_id
                .fetch_or(COMPONENT_ID_RESERVED_MASK, Ordering::AcqRel);
        } else {
            self.0
                .tagged_id
                .fetch_and(!COMPONENT_ID_RESERVED_MASK, Ordering::AcqRel);
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.descriptor.name()
    }

    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.0.descriptor
    }

    /// Entity this component is attached to, if it is still alive.
    pub fn entity(&self) -> Option<Entity> {
        self.0.entity.lock().as_ref().and_then(WeakEntity::upgrade)
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.0.entity.lock().is_some()
    }

    pub(crate) fn is_attached_to(&self, entity: &Entity) -> bool {
        self.0
            .entity
            .lock()
            .as_ref()
            .is_some_and(|weak| weak.points_to(entity))
    }

    pub(crate) fn set_entity(&self, entity: Option<WeakEntity>) {
        *self.0.entity.lock() = entity;
    }

    /// Borrow the payload as `T`. Returns `None` if the payload has another type.
    pub fn read<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let data = self.0.data.read();
        (**data).downcast_ref::<T>().map(f)
    }

    /// Mutably borrow the payload as `T`.
    pub fn write<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut data = self.0.data.write();
        (**data).downcast_mut::<T>().map(f)
    }

    /// Run the type's message handler, if it has one.
    pub fn handle_message(&self, message: &Message) {
        if let Some(handler) = self.0.descriptor.message_handler() {
            handler(self, message);
        }
    }

    /// Number of live handles to this component.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("managed", &self.is_managed())
            .finish()
    }
}

impl Drop for ComponentInner {
    fn drop(&mut self) {
        if let Some(destructor) = self.descriptor.destructor() {
            destructor(self.data.get_mut());
        }
    }
}
