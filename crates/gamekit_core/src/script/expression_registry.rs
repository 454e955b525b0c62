// expression_registry.rs - Binds component types to script expressions

use crate::ecs::{Component, ComponentId, ComponentRegistry};
use crate::script::expression::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub type ExpressionInitializer = Arc<dyn Fn(&Component) + Send + Sync>;
/// `(component, argument, deferred)`. `deferred` is set when the argument
/// still has to be evaluated against the component's owning state.
pub type ExpressionDeserializer = Arc<dyn Fn(&Component, &Value, bool) + Send + Sync>;
pub type ExpressionSerializer = Arc<dyn Fn(&Component) -> Option<Value> + Send + Sync>;

/// How scripts create, fill and read back one component type.
#[derive(Clone)]
pub struct ComponentExpressionDescriptor {
    id: ComponentId,
    initialize: Option<ExpressionInitializer>,
    deserialize: ExpressionDeserializer,
    serialize: Option<ExpressionSerializer>,
}

impl ComponentExpressionDescriptor {
    pub fn new<F>(id: ComponentId, deserialize: F) -> Self
    where
        F: Fn(&Component, &Value, bool) + Send + Sync + 'static,
    {
        Self {
            id,
            initialize: None,
            deserialize: Arc::new(deserialize),
            serialize: None,
        }
    }

    pub fn with_initializer<F>(mut self, initialize: F) -> Self
    where
        F: Fn(&Component) + Send + Sync + 'static,
    {
        self.initialize = Some(Arc::new(initialize));
        self
    }

    pub fn with_serializer<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Component) -> Option<Value> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(serialize));
        self
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn initialize(&self, component: &Component) {
        if let Some(initialize) = &self.initialize {
            initialize(component);
        }
    }

    pub fn deserialize(&self, component: &Component, argument: &Value, deferred: bool) {
        (self.deserialize)(component, argument, deferred);
    }

    pub fn serialize(&self, component: &Component) -> Option<Value> {
        self.serialize.as_ref().and_then(|serialize| serialize(component))
    }
}

impl fmt::Debug for ComponentExpressionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentExpressionDescriptor")
            .field("id", &self.id)
            .field("serializable", &self.serialize.is_some())
            .finish_non_exhaustive()
    }
}

/// Expression bindings, looked up by script name or by component type.
#[derive(Default)]
pub struct ExpressionRegistry {
    by_name: DashMap<String, Arc<ComponentExpressionDescriptor>>,
    by_id: DashMap<ComponentId, Arc<ComponentExpressionDescriptor>>,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, descriptor: ComponentExpressionDescriptor) {
        let name = name.into();
        let descriptor = Arc::new(descriptor);
        debug!(name = %name, id = descriptor.id(), "registered component expression");
        self.by_id.insert(descriptor.id(), Arc::clone(&descriptor));
        self.by_name.insert(name, descriptor);
    }

    pub fn deregister(&self, name: &str) -> bool {
        let Some((_, descriptor)) = self.by_name.remove(name) else {
            return false;
        };
        self.by_id
            .remove_if(&descriptor.id(), |_, current| Arc::ptr_eq(current, &descriptor));
        true
    }

    pub fn descriptor_for_name(&self, name: &str) -> Option<Arc<ComponentExpressionDescriptor>> {
        self.by_name.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn descriptor_for_id(&self, id: ComponentId) -> Option<Arc<ComponentExpressionDescriptor>> {
        self.by_id.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Create a component from its script name and argument.
    pub fn instantiate(
        &self,
        components: &ComponentRegistry,
        name: &str,
        argument: &Value,
    ) -> Option<Component> {
        let Some(descriptor) = self.descriptor_for_name(name) else {
            warn!(name, "no component expression with this name");
            return None;
        };
        let component = components.create(descriptor.id())?;
        descriptor.initialize(&component);
        descriptor.deserialize(&component, argument, false);
        Some(component)
    }

    /// Read a component back as a value, if its type supports that.
    pub fn serialize(&self, component: &Component) -> Option<Value> {
        self.descriptor_for_id(component.id())?.serialize(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentDescriptor;

    #[derive(Default)]
    struct Speed(f64);

    fn speed_expression() -> ComponentExpressionDescriptor {
        ComponentExpressionDescriptor::new(20, |component, argument, _deferred| {
            if let Some(value) = argument.as_float() {
                component.write(|speed: &mut Speed| speed.0 = value);
            }
        })
        .with_initializer(|component| {
            component.write(|speed: &mut Speed| speed.0 = 1.0);
        })
        .with_serializer(|component| component.read(|speed: &Speed| Value::Float(speed.0)))
    }

    #[test]
    fn instantiate_runs_initializer_then_deserializer() {
        let components = ComponentRegistry::new();
        components.register(ComponentDescriptor::typed::<Speed>(20));
        let expressions = ExpressionRegistry::new();
        expressions.register("speed", speed_expression());

        let component = expressions
            .instantiate(&components, "speed", &Value::Integer(4))
            .unwrap();
        assert_eq!(expressions.serialize(&component), Some(Value::Float(4.0)));

        let defaulted = expressions
            .instantiate(&components, "speed", &Value::Unit)
            .unwrap();
        assert_eq!(expressions.serialize(&defaulted), Some(Value::Float(1.0)));
    }

    #[test]
    fn lookup_by_name_and_id() {
        let expressions = ExpressionRegistry::new();
        expressions.register("speed", speed_expression());
        assert!(expressions.descriptor_for_name("speed").is_some());
        assert_eq!(expressions.descriptor_for_id(20).unwrap().id(), 20);

        assert!(expressions.deregister("speed"));
        assert!(expressions.descriptor_for_id(20).is_none());
        assert!(!expressions.deregister("speed"));
    }

    #[test]
    fn unknown_names_yield_none() {
        let components = ComponentRegistry::new();
        let expressions = ExpressionRegistry::new();
        assert!(expressions
            .instantiate(&components, "missing", &Value::Unit)
            .is_none());
    }
}
