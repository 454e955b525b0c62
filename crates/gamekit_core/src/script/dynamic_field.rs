// dynamic_field.rs - Expressions re-evaluated into components of other groups
//
// A dynamic field binds an expression to a target component. The update
// group publishes a fresh snapshot of the script state every tick; the
// target's own group picks up the latest snapshot, evaluates the expression
// and writes the result into the target through its expression binding on
// every one of its ticks.

use crate::ecs::{Component, ComponentDescriptor, ComponentId, World};
use crate::script::expression::{Expression, ExpressionState, SharedState, Value};
use crate::script::expression_registry::ComponentExpressionDescriptor;
use crossbeam_utils::atomic::AtomicCell;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub const DYNAMIC_FIELD_COMPONENT_ID: ComponentId = 0x5c00_0001;
pub const DYNAMIC_FIELD_NAME: &str = "dynamic-field";

#[derive(Default)]
pub struct DynamicField {
    target: OnceCell<Component>,
    field: Mutex<Option<Arc<dyn Expression>>>,
    reference_state: Mutex<Option<SharedState>>,
    // Published by the update group, not yet seen by the target's group.
    state: AtomicCell<Option<Box<ExpressionState>>>,
    // Last snapshot the target's group picked up. Only that group touches it.
    current: Mutex<Option<Box<ExpressionState>>>,
}

pub(crate) enum FieldOutcome {
    Applied,
    /// The target is unmanaged and nothing else references it.
    Orphaned,
}

impl DynamicField {
    /// # Panics
    /// If a target was already set.
    pub fn set_target(&self, target: Component) {
        assert!(
            self.target.set(target).is_ok(),
            "Dynamic field target must not be changed once set"
        );
    }

    pub fn target(&self) -> Option<&Component> {
        self.target.get()
    }

    pub fn set_field(&self, field: Arc<dyn Expression>) {
        *self.field.lock() = Some(field);
    }

    pub fn field(&self) -> Option<Arc<dyn Expression>> {
        self.field.lock().clone()
    }

    pub fn set_reference_state(&self, state: Option<SharedState>) {
        *self.reference_state.lock() = state;
    }

    pub fn reference_state(&self) -> Option<SharedState> {
        self.reference_state.lock().clone()
    }

    /// Replace the published snapshot with `state`.
    pub fn set_state(&self, state: &ExpressionState) {
        self.state.store(Some(Box::new(state.clone())));
    }

    /// The snapshot the field is applied with: the latest publication, or
    /// the previous one when nothing new was published since.
    pub fn current_state(&self) -> Option<ExpressionState> {
        self.refresh().as_deref().cloned()
    }

    fn refresh(&self) -> MutexGuard<'_, Option<Box<ExpressionState>>> {
        let mut current = self.current.lock();
        if let Some(fresh) = self.state.take() {
            *current = Some(fresh);
        }
        current
    }

    /// Publish a snapshot of the reference state, if one is bound.
    pub(crate) fn publish(&self) {
        if let Some(reference) = self.reference_state() {
            let snapshot = reference.read();
            self.set_state(&snapshot);
        }
    }

    /// Evaluate into the target with the current snapshot, if there is one.
    pub(crate) fn apply(&self, world: &World) -> Option<FieldOutcome> {
        let target = self.target()?;
        if !target.is_managed() {
            // Only this field still refers to the target.
            return (target.ref_count() == 1).then_some(FieldOutcome::Orphaned);
        }

        let field = self.field()?;
        let current = self.refresh();
        let state = current.as_deref()?;
        let Some(binding) = world.expressions().descriptor_for_id(target.id()) else {
            warn!(target = target.id(), "dynamic field target has no expression binding");
            return None;
        };
        let value = field.evaluate(state);
        binding.deserialize(target, &value, false);
        Some(FieldOutcome::Applied)
    }
}

impl fmt::Debug for DynamicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicField")
            .field("target", &self.target())
            .field("field", &self.field())
            .finish_non_exhaustive()
    }
}

/// Component type for dynamic fields.
pub(crate) fn component_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::typed::<DynamicField>(DYNAMIC_FIELD_COMPONENT_ID)
        .with_name(DYNAMIC_FIELD_NAME)
}

/// Script binding: `(target: component)` and `(field: expression)` arguments.
pub(crate) fn expression_descriptor() -> ComponentExpressionDescriptor {
    ComponentExpressionDescriptor::new(DYNAMIC_FIELD_COMPONENT_ID, |component, argument, _| {
        component.read(|dynamic: &DynamicField| {
            for item in argument.items() {
                match item {
                    Value::Field(name, value) => match (name.as_str(), &**value) {
                        ("target", Value::Component(target)) => {
                            dynamic.set_target(target.clone())
                        }
                        ("field", Value::Expression(field)) => {
                            dynamic.set_field(Arc::clone(field))
                        }
                        _ => warn!(option = %name, "unsupported dynamic field option"),
                    },
                    other => warn!(argument = ?other, "dynamic field expects named options"),
                }
            }
        });
    })
}

/// Create a dynamic field that drives `target` from `field` evaluated
/// against snapshots of `reference_state`.
///
/// The field is attached to the target's entity (if any) and handed to the
/// scheduler, so the scriptable interface must already be registered.
pub fn bind_dynamic_field(
    world: &World,
    target: &Component,
    field: Arc<dyn Expression>,
    reference_state: SharedState,
) -> Option<Component> {
    let scriptable = world.components().create(DYNAMIC_FIELD_COMPONENT_ID)?;
    scriptable.read(|dynamic: &DynamicField| {
        dynamic.set_target(target.clone());
        dynamic.set_field(field);
        dynamic.set_reference_state(Some(reference_state));
    })?;

    if let Some(entity) = target.entity() {
        entity.attach_component(&scriptable);
    }
    world.scheduler().add_component(&scriptable);
    Some(scriptable)
}
