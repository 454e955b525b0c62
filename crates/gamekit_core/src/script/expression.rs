// expression.rs - Values and the minimal expression vocabulary

use crate::ecs::Component;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result of evaluating an expression.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    /// A named argument, e.g. `(target: ...)`.
    Field(String, Box<Value>),
    Component(Component),
    /// An unevaluated expression.
    Expression(Arc<dyn Expression>),
}

impl Value {
    pub fn field(name: impl Into<String>, value: Value) -> Self {
        Value::Field(name.into(), Box::new(value))
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(value) => Some(value),
            Value::Integer(value) => Some(value as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// The items of a list, or the value itself as a single item.
    pub fn items(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Field(na, a), Value::Field(nb, b)) => na == nb && a == b,
            (Value::Component(a), Value::Component(b)) => a == b,
            (Value::Expression(a), Value::Expression(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

/// Variables visible to an expression while it is evaluated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionState {
    variables: HashMap<String, Value>,
}

/// State shared between a script and the dynamic fields bound to it.
pub type SharedState = Arc<RwLock<ExpressionState>>;

impl ExpressionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Something that evaluates to a [`Value`] against a state.
pub trait Expression: Send + Sync + fmt::Debug {
    fn evaluate(&self, state: &ExpressionState) -> Value;
}

/// Evaluates to a fixed value.
#[derive(Clone, Debug, PartialEq)]
pub struct Literal(pub Value);

impl Expression for Literal {
    fn evaluate(&self, _state: &ExpressionState) -> Value {
        self.0.clone()
    }
}

/// Evaluates to a state variable, or [`Value::Unit`] if unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable(pub String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Expression for Variable {
    fn evaluate(&self, state: &ExpressionState) -> Value {
        state.get(&self.0).cloned().unwrap_or_default()
    }
}

/// Wraps the result of an inner expression in a named field.
#[derive(Debug)]
pub struct FieldExpression {
    name: String,
    value: Arc<dyn Expression>,
}

impl FieldExpression {
    pub fn new(name: impl Into<String>, value: impl Expression + 'static) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(value),
        }
    }
}

impl Expression for FieldExpression {
    fn evaluate(&self, state: &ExpressionState) -> Value {
        Value::field(self.name.clone(), self.value.evaluate(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_read_from_state() {
        let mut state = ExpressionState::new();
        state.set("speed", Value::Float(2.5));

        assert_eq!(Variable::new("speed").evaluate(&state), Value::Float(2.5));
        assert_eq!(Variable::new("missing").evaluate(&state), Value::Unit);
    }

    #[test]
    fn field_expression_names_its_result() {
        let state = ExpressionState::new();
        let field = FieldExpression::new("position", Literal(Value::Integer(3)));
        assert_eq!(
            field.evaluate(&state),
            Value::field("position", Value::Integer(3))
        );
    }

    #[test]
    fn expression_values_compare_by_identity() {
        let a: Arc<dyn Expression> = Arc::new(Literal(Value::Unit));
        let b: Arc<dyn Expression> = Arc::new(Literal(Value::Unit));
        assert_eq!(Value::Expression(a.clone()), Value::Expression(a.clone()));
        assert_ne!(Value::Expression(a), Value::Expression(b));
    }

    #[test]
    fn single_values_act_as_one_item_lists() {
        assert_eq!(Value::Integer(1).items(), &[Value::Integer(1)]);
        assert_eq!(Value::List(vec![]).items().len(), 0);
    }
}
