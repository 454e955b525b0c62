// interface.rs - Systems that carry dynamic fields across execution groups
//
// One interface system is registered per execution group. The update-group
// instance owns every dynamic field: it indexes each field under the group
// of the system that owns the field's target, and republishes script state
// every tick. Every instance then applies the fields indexed under its own
// group, on that group's thread.

use crate::ecs::{
    Component, ExecutionGroup, RecursiveLock, SystemDescriptor, SystemId,
    SystemLock, SystemRegistrationError, SystemTick, World,
};
use crate::gc::{ConcurrentIndexMap, EpochCollector};
use crate::script::dynamic_field::{
    self, DynamicField, FieldOutcome, DYNAMIC_FIELD_COMPONENT_ID, DYNAMIC_FIELD_NAME,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Id of the manual-group interface system; the other groups follow in
/// [`ExecutionGroup`] order.
pub const SCRIPTABLE_INTERFACE_SYSTEM_ID: SystemId = 0x5c00_0000;

struct GroupFields {
    lock: Arc<RecursiveLock>,
    fields: ConcurrentIndexMap<Component>,
    available: Mutex<VecDeque<usize>>,
}

pub struct ScriptableInterface {
    groups: [GroupFields; ExecutionGroup::COUNT],
    // Where each bound field lives: owning group and slot.
    slots: DashMap<Component, (ExecutionGroup, usize)>,
    gc: Arc<EpochCollector>,
}

impl ScriptableInterface {
    /// Register the dynamic field type, its script binding and one
    /// interface system per execution group.
    pub fn register(world: &World) -> Result<Arc<Self>, SystemRegistrationError> {
        let gc = Arc::new(EpochCollector::new());
        let capacity = world.config().index_map_segment_capacity;
        let interface = Arc::new(Self {
            groups: std::array::from_fn(|_| GroupFields {
                lock: Arc::new(RecursiveLock::new()),
                fields: ConcurrentIndexMap::new(capacity, Arc::clone(&gc)),
                available: Mutex::new(VecDeque::new()),
            }),
            slots: DashMap::new(),
            gc,
        });

        world
            .components()
            .register(dynamic_field::component_descriptor());
        world
            .expressions()
            .register(DYNAMIC_FIELD_NAME, dynamic_field::expression_descriptor());

        for group in ExecutionGroup::ALL {
            let this = Arc::clone(&interface);
            let lock: Arc<dyn SystemLock> = interface.groups[group.index()].lock.clone();
            let descriptor = SystemDescriptor::new(Self::system_id(group), group).with_lock(lock);
            let descriptor = if group == ExecutionGroup::Update {
                descriptor
                    .handles_ids([DYNAMIC_FIELD_COMPONENT_ID])
                    .on_update(move |tick| {
                        this.update(tick);
                        this.apply(tick);
                    })
            } else {
                descriptor.on_update(move |tick| this.apply(tick))
            };
            world.scheduler().register(descriptor)?;
        }

        debug!("registered scriptable interface");
        Ok(interface)
    }

    /// Remove the interface systems and release every bound dynamic field.
    /// Call once the execution group threads have stopped.
    pub fn deregister(&self, world: &World) {
        for group in ExecutionGroup::ALL {
            if let Err(err) = world.scheduler().deregister(Self::system_id(group), group) {
                warn!(%err, "failed to deregister scriptable interface system");
            }
        }
        world.expressions().deregister(DYNAMIC_FIELD_NAME);
        world.components().deregister(DYNAMIC_FIELD_COMPONENT_ID);
        let released = self.slots.len();
        for group in ExecutionGroup::ALL {
            let fields = &self.groups[group.index()];
            for index in 0..fields.fields.len() {
                fields.fields.replace(index, None);
            }
            fields.available.lock().clear();
        }
        self.slots.clear();
        if !self.gc.synchronize() {
            warn!("dynamic fields still observed by an open epoch after deregistration");
        }
        debug!(released, "deregistered scriptable interface");
    }

    pub fn system_id(group: ExecutionGroup) -> SystemId {
        SCRIPTABLE_INTERFACE_SYSTEM_ID + group.index() as SystemId
    }

    /// Lock guarding the interface system of `group`.
    pub fn lock(&self, group: ExecutionGroup) -> &Arc<RecursiveLock> {
        &self.groups[group.index()].lock
    }

    /// Group a bound dynamic field is applied on, if it is bound.
    pub fn bound_group(&self, scriptable: &Component) -> Option<ExecutionGroup> {
        self.slots.get(scriptable).map(|entry| entry.value().0)
    }

    pub fn bound_count(&self, group: ExecutionGroup) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().0 == group)
            .count()
    }

    fn update(&self, tick: &mut SystemTick<'_>) {
        for scriptable in tick.removed_components() {
            self.unbind(&scriptable);
        }
        let world = tick.world();
        for scriptable in tick.added_components() {
            self.bind(world, scriptable);
        }
        for scriptable in tick.components() {
            scriptable.read(DynamicField::publish);
        }
    }

    fn bind(&self, world: &World, scriptable: Component) {
        let target = scriptable
            .read(|field: &DynamicField| field.target().cloned())
            .flatten();
        let Some(target) = target else {
            trace!("dynamic field has no target; not bound");
            return;
        };
        let Some(owner) = world.scheduler().system_handling(target.id()) else {
            trace!(target = target.id(), "no system owns dynamic field target; not bound");
            return;
        };

        let group = owner.group();
        let fields = &self.groups[group.index()];
        let recycled = fields.available.lock().pop_front();
        let index = match recycled {
            Some(index) => {
                fields.fields.replace(index, Some(scriptable.clone()));
                index
            }
            None => fields.fields.append(scriptable.clone()),
        };
        self.slots.insert(scriptable, (group, index));
    }

    fn unbind(&self, scriptable: &Component) {
        if let Some((_, (group, index))) = self.slots.remove(scriptable) {
            let fields = &self.groups[group.index()];
            fields.fields.replace(index, None);
            fields.available.lock().push_back(index);
        }
    }

    fn apply(&self, tick: &SystemTick<'_>) {
        let world = tick.world();
        let fields = &self.groups[tick.group().index()].fields;

        let mut orphaned = Vec::new();
        let epoch = self.gc.begin();
        for (_, scriptable) in fields.iter(&epoch) {
            let outcome = scriptable
                .read(|field: &DynamicField| field.apply(world))
                .flatten();
            if let Some(FieldOutcome::Orphaned) = outcome {
                orphaned.push(scriptable.clone());
            }
        }
        epoch.end();

        for scriptable in orphaned {
            world.scheduler().remove_component(&scriptable);
        }
    }
}
