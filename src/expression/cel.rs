//! CEL-backed expression engine.

use super::{ExpressionEngine, ExpressionError};
use crate::core::Environment;

use cel_interpreter::{objects::Map, Context, Program, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Expression engine compiling conditions as CEL programs.
///
/// Attribute values map onto CEL as follows: strings, booleans and null map
/// directly, integral numbers become `int` (or `uint` above `i64::MAX`),
/// other numbers become `double`, arrays become lists and objects become
/// string-keyed maps. Every builtin becomes a unary function.
#[derive(Debug, Clone, Copy, Default)]
pub struct CelEngine;

impl CelEngine {
    /// Create a CEL engine.
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for CelEngine {
    type Program = Program;
    type Context = Context<'static>;
    type Value = Value;

    fn compile(&self, source: &str) -> Result<Program, ExpressionError> {
        Program::compile(source).map_err(|e| ExpressionError::parse(e.to_string()))
    }

    fn prepare(&self, environment: &Environment) -> Context<'static> {
        build_cel_context(environment)
    }

    fn evaluate(&self, program: &Program, context: &Context<'static>) -> Result<Value, ExpressionError> {
        program
            .execute(context)
            .map_err(|e| ExpressionError::execution(e.to_string()))
    }

    fn as_bool(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            _ => "value",
        }
    }
}

fn build_cel_context(environment: &Environment) -> Context<'static> {
    let mut context = Context::default();

    for (name, value) in environment.variables() {
        context.add_variable_from_value(name.as_str(), to_cel_value(value));
    }

    for (name, builtin) in environment.builtins().iter() {
        let builtin = Arc::clone(builtin);
        context.add_function(name, move |value: Value| -> bool { builtin(&format!("{value:?}")) });
    }

    context
}

/// Convert a JSON attribute value to a CEL value.
fn to_cel_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(Arc::new(s.clone())),
        serde_json::Value::Array(items) => {
            Value::List(Arc::new(items.iter().map(to_cel_value).collect()))
        }
        serde_json::Value::Object(fields) => {
            let fields: HashMap<Arc<String>, Value> = fields
                .iter()
                .map(|(key, value)| (Arc::new(key.clone()), to_cel_value(value)))
                .collect();
            Value::Map(Map::from(fields))
        }
    }
}
