//! Per-request evaluation environments.

use crate::api::{Attributes, Request};

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A builtin function callable from condition text.
///
/// It receives a diagnostic rendering of its single argument and returns the
/// boolean the call evaluates to.
pub type BuiltinFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Registry of builtin functions merged into every environment.
#[derive(Clone)]
pub struct Builtins {
    functions: Arc<BTreeMap<String, BuiltinFn>>,
}

impl Builtins {
    /// A registry without any function.
    pub fn empty() -> Self {
        Self {
            functions: Arc::new(BTreeMap::new()),
        }
    }

    /// Register (or replace) a builtin under `name`.
    pub fn register<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.functions).insert(name.into(), Arc::new(function));
        self
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.functions.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Iterate over every registered builtin.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BuiltinFn)> {
        self.functions.iter().map(|(name, f)| (name.as_str(), f))
    }
}

/// The default registry holds `debug(value)`, which logs its argument and
/// evaluates to `true`.
impl Default for Builtins {
    fn default() -> Self {
        Self::empty().register("debug", |value| {
            tracing::debug!(target: "abac_engine::debug", %value, "condition debug");
            true
        })
    }
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Everything a condition is evaluated against: shared definitions, the
/// request's `subject` and `object`, and builtin functions.
#[derive(Debug, Clone)]
pub struct Environment {
    variables: Attributes,
    builtins: Builtins,
}

impl Environment {
    /// Build a fresh environment for `request`.
    ///
    /// `definitions` is only read; `subject` and `object` override any
    /// definition of the same name.
    pub fn build(definitions: &Attributes, request: &Request, builtins: &Builtins) -> Self {
        let mut variables = definitions.clone();
        variables.insert("subject".to_string(), Value::Object(request.subject.clone()));
        variables.insert("object".to_string(), Value::Object(request.object.clone()));

        Self {
            variables,
            builtins: builtins.clone(),
        }
    }

    /// Variable bindings.
    pub fn variables(&self) -> &Attributes {
        &self.variables
    }

    /// Builtin functions.
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn attributes(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test attributes must be objects"),
        }
    }

    #[test]
    fn test_build_merges_definitions_and_request() {
        let definitions = attributes(json!({"threshold": "5", "region": "eu"}));
        let request = Request::builder()
            .action("READ")
            .subject("id", "user1")
            .object("type", "session")
            .build();

        let env = Environment::build(&definitions, &request, &Builtins::default());
        assert_eq!(env.variables().get("threshold"), Some(&json!("5")));
        assert_eq!(env.variables().get("subject"), Some(&json!({"id": "user1"})));
        assert_eq!(env.variables().get("object"), Some(&json!({"type": "session"})));
        assert_eq!(env.variables().len(), 4);
    }

    #[test]
    fn test_request_overrides_definitions() {
        let definitions = attributes(json!({"subject": "shadowed", "object": 1}));
        let request = Request::builder().action("READ").subject("k", "v").object("k", "w").build();

        let env = Environment::build(&definitions, &request, &Builtins::empty());
        assert_eq!(env.variables().get("subject"), Some(&json!({"k": "v"})));
        assert_eq!(env.variables().get("object"), Some(&json!({"k": "w"})));

        // the caller's map is untouched
        assert_eq!(definitions.get("subject"), Some(&json!("shadowed")));
        assert_eq!(definitions.len(), 2);
    }

    #[test]
    fn test_default_builtins() {
        let builtins = Builtins::default();
        assert_eq!(builtins.names().collect::<Vec<_>>(), vec!["debug"]);
        let debug = builtins.get("debug").unwrap();
        assert!(debug("anything"));
    }

    #[test]
    fn test_register_captures_output() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let builtins = Builtins::default().register("debug", move |value| {
            sink.lock().push(value.to_string());
            true
        });

        let debug = builtins.get("debug").unwrap();
        assert!(debug("first"));
        assert_eq!(*seen.lock(), vec!["first".to_string()]);
        assert_eq!(format!("{builtins:?}"), r#"{"debug"}"#);
    }
}
