//! Action and function rules
//!
//! Overload rules compare an operation only with the overloads declared
//! before it, so each conflict is reported once, on the later declaration.

use crate::engine::ValidationContext;
use edm_binding::Resolver;
use edm_model::{EdmErrorCode, Operation, OperationKind, Property};

pub(crate) fn operation_types_resolve<'m>(
    context: &mut ValidationContext<'m>,
    operation: &'m Operation,
) {
    let resolver = context.resolver();
    for parameter in &operation.parameters {
        if let Some(name) = resolver.resolve_type(&parameter.type_ref).unresolved_name() {
            context.report(
                EdmErrorCode::BadUnresolvedType,
                format!(
                    "type '{name}' of parameter '{}' of '{}' cannot be resolved",
                    parameter.name,
                    operation.full_name()
                ),
                parameter.location.as_ref(),
            );
        }
    }
    if let Some(return_type) = &operation.return_type {
        if let Some(name) = resolver.resolve_type(&return_type.type_ref).unresolved_name() {
            context.report(
                EdmErrorCode::BadUnresolvedType,
                format!(
                    "return type '{name}' of '{}' cannot be resolved",
                    operation.full_name()
                ),
                return_type.location.as_ref().or(operation.location.as_ref()),
            );
        }
    }
}

pub(crate) fn bound_operation_parameters<'m>(
    context: &mut ValidationContext<'m>,
    operation: &'m Operation,
) {
    if operation.is_bound && operation.parameters.is_empty() {
        context.report(
            EdmErrorCode::BoundOperationMustHaveParameters,
            format!(
                "bound {} '{}' has no binding parameter",
                operation.kind.as_str().to_lowercase(),
                operation.full_name()
            ),
            operation.location.as_ref(),
        );
    }
}

pub(crate) fn function_return_type<'m>(context: &mut ValidationContext<'m>, operation: &'m Operation) {
    if operation.kind == OperationKind::Function && operation.return_type.is_none() {
        context.report(
            EdmErrorCode::FunctionMustHaveReturnType,
            format!("function '{}' has no return type", operation.full_name()),
            operation.location.as_ref(),
        );
    }
}

pub(crate) fn unique_parameter_names<'m>(
    context: &mut ValidationContext<'m>,
    operation: &'m Operation,
) {
    for (i, parameter) in operation.parameters.iter().enumerate() {
        if operation.parameters[..i].iter().any(|p| p.name == parameter.name) {
            context.report(
                EdmErrorCode::AlreadyDefined,
                format!(
                    "parameter '{}' is already defined on '{}'",
                    parameter.name,
                    operation.full_name()
                ),
                parameter.location.as_ref(),
            );
        }
    }
}

/// `EntitySetPath` starts at the binding parameter and follows navigation properties
pub(crate) fn entity_set_path<'m>(context: &mut ValidationContext<'m>, operation: &'m Operation) {
    let Some(path) = operation.entity_set_path.as_deref() else {
        return;
    };
    let reason = match operation.binding_parameter() {
        None => Some("only bound operations may declare an entity set path".to_string()),
        Some(binding) => {
            let mut segments = path.split('/');
            if segments.next() == Some(binding.name.as_str()) {
                let rest: Vec<&str> = segments.collect();
                navigation_path_problem(context.resolver(), binding, &rest)
            } else {
                Some(format!(
                    "the path must start with binding parameter '{}'",
                    binding.name
                ))
            }
        }
    };
    if let Some(reason) = reason {
        context.report(
            EdmErrorCode::InvalidEntitySetPath,
            format!(
                "entity set path '{path}' of '{}' is invalid: {reason}",
                operation.full_name()
            ),
            operation.location.as_ref(),
        );
    }
}

fn navigation_path_problem(
    resolver: Resolver<'_>,
    binding: &edm_model::Parameter,
    rest: &[&str],
) -> Option<String> {
    if rest.is_empty() {
        return None;
    }
    let resolved = resolver.resolve_type(&binding.type_ref);
    if resolved.is_unresolved() {
        return None;
    }
    let Some(structure) = resolved.element().as_structured() else {
        return Some("the binding parameter is not structured".to_string());
    };
    match resolver.resolve_property_path(structure, &rest.join("/")) {
        Some(Property::Navigation(_)) => None,
        _ => Some(format!("'{}' is not a navigation path", rest.join("/"))),
    }
}

/// Earlier overloads of the same kind, local model first
fn earlier_overloads<'m>(
    context: &ValidationContext<'m>,
    operation: &'m Operation,
) -> Vec<&'m Operation> {
    context
        .resolver()
        .find_operations(&operation.full_name())
        .into_iter()
        .filter(|other| other.kind == operation.kind)
        .take_while(|other| other.id != operation.id)
        .collect()
}

/// Unbound function overloads must agree on their return type
pub(crate) fn unbound_function_return_types<'m>(
    context: &mut ValidationContext<'m>,
    operation: &'m Operation,
) {
    if operation.kind != OperationKind::Function || operation.is_bound {
        return;
    }
    let resolver = context.resolver();
    let first = earlier_overloads(context, operation)
        .into_iter()
        .find(|other| !other.is_bound);
    let Some(first) = first else {
        return;
    };
    let type_name = |op: &Operation| {
        op.return_type_ref()
            .map(|t| resolver.normalize_type_name(&t.type_name()))
    };
    if type_name(first) != type_name(operation) {
        context.report(
            EdmErrorCode::UnboundFunctionOverloadHasIncorrectReturnType,
            format!(
                "overload of unbound function '{}' returns a different type than the first overload",
                operation.full_name()
            ),
            operation.location.as_ref(),
        );
    }
}

/// Two overloads may not share a parameter type signature
pub(crate) fn duplicate_overloads<'m>(context: &mut ValidationContext<'m>, operation: &'m Operation) {
    let resolver = context.resolver();
    let signature = |op: &Operation| -> Vec<String> {
        op.signature()
            .iter()
            .map(|t| resolver.normalize_type_name(t))
            .collect()
    };
    let own = signature(operation);
    let duplicate = earlier_overloads(context, operation)
        .into_iter()
        .any(|other| other.is_bound == operation.is_bound && signature(other) == own);
    if duplicate {
        context.report(
            EdmErrorCode::DuplicateFunctions,
            format!(
                "an overload of '{}' with signature ({}) is already defined",
                operation.full_name(),
                own.join(", ")
            ),
            operation.location.as_ref(),
        );
    }
}
