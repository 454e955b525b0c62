//! Script-facing pieces: expression values, per-type expression bindings,
//! and dynamic fields that publish evaluated expressions into components
//! owned by other execution groups.

mod dynamic_field;
mod expression;
mod expression_registry;
mod interface;

pub use dynamic_field::{bind_dynamic_field, DynamicField, DYNAMIC_FIELD_COMPONENT_ID};
pub use expression::{
    Expression, ExpressionState, FieldExpression, Literal, SharedState, Value, Variable,
};
pub use expression_registry::{
    ComponentExpressionDescriptor, ExpressionDeserializer, ExpressionInitializer,
    ExpressionRegistry, ExpressionSerializer,
};
pub use interface::{ScriptableInterface, SCRIPTABLE_INTERFACE_SYSTEM_ID};
