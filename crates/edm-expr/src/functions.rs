//! Native function registry
//!
//! `Apply` expressions call functions by qualified name. Implementations are
//! supplied by the caller; the canonical `odata.*` helpers are opt-in.

use crate::value::Value;
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Native implementation of a function
pub type NativeFunction = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Namespace reserved for canonical functions
pub const CANONICAL_NAMESPACE: &str = "odata";

/// Functions available to `Apply` expressions, keyed by qualified name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, NativeFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `odata.concat` and `odata.matchesPattern`
    pub fn with_canonical_functions() -> Self {
        let mut registry = Self::new();
        registry
            .register("odata.concat", concat)
            .register("odata.matchesPattern", matches_pattern);
        registry
    }

    /// Register a function, replacing an earlier one of the same name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        let name = name.into();
        debug!(function = %name, "registering native function");
        self.functions.insert(name, Arc::new(function));
        self
    }

    pub fn get(&self, name: &str) -> Option<NativeFunction> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call `name` with already evaluated arguments
    pub fn call(&self, name: &str, arguments: &[Value]) -> Result<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| Error::FunctionNotRegistered(name.to_string()))?;
        function(arguments)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Whether `name` lives in the canonical function namespace
pub fn is_canonical(name: &str) -> bool {
    name.strip_prefix(CANONICAL_NAMESPACE)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn concat(arguments: &[Value]) -> Result<Value> {
    let mut result = String::new();
    for argument in arguments {
        match argument {
            Value::Null => {}
            Value::Structured(_) | Value::Collection(_) => {
                return Err(Error::FunctionFailed {
                    function: "odata.concat".to_string(),
                    reason: format!("cannot concatenate {}", argument.type_description()),
                });
            }
            other => result.push_str(&other.to_string()),
        }
    }
    Ok(Value::String(result))
}

fn matches_pattern(arguments: &[Value]) -> Result<Value> {
    let [Value::String(text), Value::String(pattern)] = arguments else {
        return Err(Error::FunctionFailed {
            function: "odata.matchesPattern".to_string(),
            reason: "expected a string and a pattern".to_string(),
        });
    };
    let regex = Regex::new(pattern).map_err(|e| Error::FunctionFailed {
        function: "odata.matchesPattern".to_string(),
        reason: e.to_string(),
    })?;
    Ok(Value::Boolean(regex.is_match(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_call() {
        let mut registry = FunctionRegistry::new();
        registry.register("NS.Twice", |args: &[Value]| match args {
            [Value::Integer(i)] => Ok(Value::Integer(i * 2)),
            _ => Err(Error::FunctionFailed {
                function: "NS.Twice".to_string(),
                reason: "expected one integer".to_string(),
            }),
        });

        assert!(registry.contains("NS.Twice"));
        assert_eq!(
            registry.call("NS.Twice", &[Value::Integer(21)]).unwrap(),
            Value::Integer(42)
        );
        assert!(matches!(
            registry.call("NS.Missing", &[]),
            Err(Error::FunctionNotRegistered(_))
        ));
    }

    #[test]
    fn test_canonical_functions() {
        let registry = FunctionRegistry::with_canonical_functions();
        assert_eq!(registry.names(), vec!["odata.concat", "odata.matchesPattern"]);

        let joined = registry
            .call("odata.concat", &[Value::from("a"), Value::Integer(1), Value::Null])
            .unwrap();
        assert_eq!(joined, Value::from("a1"));

        let matched = registry
            .call("odata.matchesPattern", &[Value::from("abc123"), Value::from("^[a-z]+\\d+$")])
            .unwrap();
        assert_eq!(matched, Value::Boolean(true));
        assert!(registry
            .call("odata.matchesPattern", &[Value::from("x"), Value::from("(")])
            .is_err());
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("odata.concat"));
        assert!(!is_canonical("odatax.concat"));
        assert!(!is_canonical("NS.concat"));
    }
}
