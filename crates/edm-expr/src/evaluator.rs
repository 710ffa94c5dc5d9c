//! Expression evaluator
//!
//! Reduces an annotation expression to a [`Value`]. Bad input never panics:
//! malformed constants, unbound references, unknown functions and failed
//! casts come back as [`Error`] values.

use crate::functions::FunctionRegistry;
use crate::typing::{static_type, value_conforms};
use crate::value::{StructuredValue, Value};
use crate::{Error, Result};
use edm_binding::Resolver;
use edm_model::{Expression, LabelHandle, Model, PathExpression, TypeAssertion};
use tracing::trace;

/// Ambient state a path expression is evaluated against
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    current: Option<Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose paths start at `value`
    pub fn with_current(value: Value) -> Self {
        Self {
            current: Some(value),
        }
    }

    pub fn current(&self) -> Option<&Value> {
        self.current.as_ref()
    }
}

/// Evaluates expressions of one model with a set of native functions
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'m> {
    resolver: Resolver<'m>,
    functions: &'m FunctionRegistry,
}

impl<'m> Evaluator<'m> {
    pub fn new(model: &'m Model, functions: &'m FunctionRegistry) -> Self {
        Self {
            resolver: Resolver::new(model),
            functions,
        }
    }

    /// Evaluate `expression` against `context`
    pub fn evaluate(&self, expression: &Expression, context: &EvaluationContext) -> Result<Value> {
        trace!(kind = %expression.kind(), "evaluating expression");
        self.eval(expression, context, &mut Vec::new())
    }

    fn eval(
        &self,
        expression: &Expression,
        context: &EvaluationContext,
        active: &mut Vec<LabelHandle>,
    ) -> Result<Value> {
        match expression {
            Expression::Constant(constant) => Value::from_constant(constant)
                .ok_or_else(|| Error::Malformed(constant.error().into_iter().collect())),
            Expression::Record(record) => {
                let mut value =
                    StructuredValue::new(record.declared_type.as_ref().map(|t| t.type_name()));
                for property in &record.properties {
                    let evaluated = self.eval(&property.value, context, active)?;
                    value.properties.push((property.property.clone(), evaluated));
                }
                Ok(Value::Structured(value))
            }
            Expression::Collection(collection) => collection
                .elements
                .iter()
                .map(|element| self.eval(element, context, active))
                .collect::<Result<Vec<_>>>()
                .map(Value::Collection),
            Expression::Path(path) => evaluate_path(path, context),
            Expression::Cast(assertion) => {
                let value = self.eval(&assertion.operand, context, active)?;
                if self.satisfies(assertion, &value) {
                    Ok(value)
                } else {
                    Err(Error::InvalidCast {
                        value: value.type_description(),
                        target: assertion.asserted_type.type_name(),
                    })
                }
            }
            Expression::IsType(assertion) => {
                let value = self.eval(&assertion.operand, context, active)?;
                Ok(Value::Boolean(self.satisfies(assertion, &value)))
            }
            Expression::If(cond) => {
                let test = self.eval(&cond.test, context, active)?;
                match test.as_bool() {
                    Some(true) => self.eval(&cond.if_true, context, active),
                    Some(false) => self.eval(&cond.if_false, context, active),
                    None => Err(Error::TypeMismatch {
                        expected: "Edm.Boolean".to_string(),
                        actual: test.type_description(),
                    }),
                }
            }
            Expression::Apply(apply) => {
                let arguments = apply
                    .arguments
                    .iter()
                    .map(|argument| self.eval(argument, context, active))
                    .collect::<Result<Vec<_>>>()?;
                let function = self.resolver.normalize(&apply.function);
                self.functions.call(&function, &arguments)
            }
            Expression::LabeledElement(handle) => self.eval_label(*handle, context, active),
            Expression::LabeledElementReference(reference) => {
                let handle = reference
                    .target()
                    .ok_or_else(|| Error::UnboundLabeledElement(reference.name().to_string()))?;
                self.eval_label(handle, context, active)
            }
        }
    }

    fn eval_label(
        &self,
        handle: LabelHandle,
        context: &EvaluationContext,
        active: &mut Vec<LabelHandle>,
    ) -> Result<Value> {
        let element = self
            .resolver
            .model()
            .labeled_elements()
            .get(handle)
            .ok_or_else(|| Error::UnboundLabeledElement(format!("#{}", handle.index())))?;
        if active.contains(&handle) {
            return Err(Error::CyclicLabeledElement(element.name.clone()));
        }
        active.push(handle);
        let result = self.eval(&element.expression, context, active);
        active.pop();
        result
    }

    /// Whether the operand satisfies the asserted type
    ///
    /// The operand's static type decides when it is known and assignable;
    /// otherwise the evaluated value is checked, which lets integer literals
    /// assert any integral type they fit.
    fn satisfies(&self, assertion: &TypeAssertion, value: &Value) -> bool {
        let by_static_type = static_type(&self.resolver, &assertion.operand)
            .is_some_and(|actual| self.resolver.is_assignable(&assertion.asserted_type, &actual));
        by_static_type || value_conforms(&self.resolver, value, &assertion.asserted_type)
    }
}

fn evaluate_path(path: &PathExpression, context: &EvaluationContext) -> Result<Value> {
    let mut current = context
        .current()
        .cloned()
        .ok_or_else(|| Error::NoContext(path.path()))?;

    for segment in &path.segments {
        // type cast segment
        if segment.contains('.') {
            continue;
        }
        current = match current {
            Value::Null => return Ok(Value::Null),
            Value::Collection(items) if segment == "$count" => {
                Value::Integer(i64::try_from(items.len()).unwrap_or(i64::MAX))
            }
            Value::Structured(record) => record
                .property(segment)
                .cloned()
                .ok_or_else(|| Error::PathNotFound(path.path()))?,
            Value::Collection(items) => Value::Collection(
                items
                    .iter()
                    .filter_map(|item| item.as_structured()?.property(segment).cloned())
                    .collect(),
            ),
            _ => return Err(Error::PathNotFound(path.path())),
        };
    }
    Ok(current)
}
