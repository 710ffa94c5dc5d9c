//! Static types of expressions and value conformance

use crate::value::Value;
use edm_binding::{AbstractType, ResolvedType, Resolver};
use edm_model::{Constant, Expression, LabelHandle, PrimitiveKind, TypeReference};

/// Static type of `expression`, when it can be known without evaluation
///
/// Paths and nulls have no static type. Labeled element cycles yield `None`.
pub fn static_type(resolver: &Resolver<'_>, expression: &Expression) -> Option<TypeReference> {
    static_type_guarded(resolver, expression, &mut Vec::new())
}

fn static_type_guarded(
    resolver: &Resolver<'_>,
    expression: &Expression,
    active: &mut Vec<LabelHandle>,
) -> Option<TypeReference> {
    match expression {
        Expression::Constant(constant) => constant
            .kind()
            .primitive_kind()
            .filter(|_| !constant.is_malformed())
            .map(|kind| TypeReference::primitive(kind, false)),
        Expression::Record(record) => record.declared_type.clone(),
        Expression::Collection(collection) => collection.declared_type.clone(),
        Expression::Path(_) => None,
        Expression::Cast(assertion) => Some(assertion.asserted_type.clone()),
        Expression::IsType(_) => Some(TypeReference::primitive(PrimitiveKind::Boolean, false)),
        Expression::If(cond) => static_type_guarded(resolver, &cond.if_true, active)
            .or_else(|| static_type_guarded(resolver, &cond.if_false, active)),
        Expression::Apply(apply) => resolver
            .find_operations(&apply.function)
            .into_iter()
            .find(|op| op.parameters.len() == apply.arguments.len())
            .and_then(|op| op.return_type_ref().cloned()),
        Expression::LabeledElement(handle) => labeled_type(resolver, *handle, active),
        Expression::LabeledElementReference(reference) => reference
            .target()
            .and_then(|handle| labeled_type(resolver, handle, active)),
    }
}

fn labeled_type(
    resolver: &Resolver<'_>,
    handle: LabelHandle,
    active: &mut Vec<LabelHandle>,
) -> Option<TypeReference> {
    if active.contains(&handle) {
        return None;
    }
    let element = resolver.model().labeled_elements().get(handle)?;
    active.push(handle);
    let ty = static_type_guarded(resolver, &element.expression, active);
    active.pop();
    ty
}

/// Whether an integer literal fits `kind`
pub fn integer_fits(value: i64, kind: PrimitiveKind) -> bool {
    match kind.integral_range() {
        Some((min, max)) => (min..=max).contains(&value),
        None => matches!(
            kind,
            PrimitiveKind::Single
                | PrimitiveKind::Double
                | PrimitiveKind::Decimal
                | PrimitiveKind::PrimitiveType
        ),
    }
}

/// Whether `constant` may stand where a value of kind `expected` is required
pub fn constant_kind_fits(constant: &Constant, expected: PrimitiveKind) -> bool {
    use PrimitiveKind as P;
    if expected == P::PrimitiveType {
        return true;
    }
    match constant {
        Constant::Integer(i) => integer_fits(*i, expected),
        Constant::Floating(_) => matches!(expected, P::Single | P::Double | P::Decimal),
        Constant::Decimal(_) => matches!(expected, P::Decimal | P::Single | P::Double),
        Constant::Null | Constant::Malformed { .. } => true,
        other => other.kind().primitive_kind() == Some(expected),
    }
}

/// Whether an evaluated value conforms to `expected`
pub fn value_conforms(resolver: &Resolver<'_>, value: &Value, expected: &TypeReference) -> bool {
    let resolved = resolver.resolve_type(expected);
    value_conforms_resolved(resolver, value, &resolved, expected.nullable())
}

fn value_conforms_resolved(
    resolver: &Resolver<'_>,
    value: &Value,
    expected: &ResolvedType<'_>,
    nullable: bool,
) -> bool {
    match (value, expected) {
        (_, ResolvedType::Unresolved(_) | ResolvedType::Abstract(AbstractType::Untyped)) => true,
        (Value::Null, _) => nullable,
        (Value::Collection(items), ResolvedType::Collection(element)) => items
            .iter()
            .all(|item| value_conforms_resolved(resolver, item, element, true)),
        (Value::Structured(record), _) => match expected.as_structured() {
            Some(expected_structure) => record.type_name.as_deref().is_none_or(|name| {
                resolver
                    .find_structured_type(name)
                    .first()
                    .is_some_and(|actual| resolver.is_derived_from(actual, expected_structure))
            }),
            None => matches!(
                expected,
                ResolvedType::Abstract(AbstractType::EntityType | AbstractType::ComplexType)
            ),
        },
        (Value::String(_) | Value::Integer(_), ResolvedType::Enum(_)) => true,
        (Value::Integer(i), _) => expected
            .primitive_kind()
            .is_some_and(|kind| integer_fits(*i, kind)),
        (Value::String(_), ResolvedType::Abstract(kind)) => kind.is_path(),
        (scalar, _) => match (scalar.primitive_kind(), expected.primitive_kind()) {
            (Some(actual), Some(wanted)) => edm_binding::primitive_promotes(actual, wanted),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StructuredValue;
    use edm_model::{ComplexType, Model};

    #[test]
    fn test_integer_fits() {
        assert!(integer_fits(127, PrimitiveKind::SByte));
        assert!(!integer_fits(-129, PrimitiveKind::SByte));
        assert!(!integer_fits(256, PrimitiveKind::Byte));
        assert!(integer_fits(i64::MAX, PrimitiveKind::Decimal));
        assert!(!integer_fits(1, PrimitiveKind::String));
    }

    #[test]
    fn test_static_types() {
        let model = Model::default();
        let resolver = Resolver::new(&model);
        let int = TypeReference::primitive(PrimitiveKind::Int32, true);

        assert_eq!(
            static_type(&resolver, &Expression::string("x")).and_then(|t| t.primitive_kind()),
            Some(PrimitiveKind::String)
        );
        assert!(static_type(&resolver, &Expression::null()).is_none());
        assert!(static_type(&resolver, &Expression::path("A/B")).is_none());
        assert_eq!(
            static_type(&resolver, &Expression::cast(Expression::path("A"), int.clone())),
            Some(int)
        );
    }

    #[test]
    fn test_value_conformance() {
        let mut model = Model::default();
        model.add_element(ComplexType::new("NS", "Base")).unwrap();
        model
            .add_element(ComplexType::new("NS", "Derived").with_base_type("NS.Base"))
            .unwrap();
        let resolver = Resolver::new(&model);

        let base = TypeReference::named("NS.Base", false);
        let derived = Value::from(StructuredValue::new(Some("NS.Derived".to_string())));
        assert!(value_conforms(&resolver, &derived, &base));
        assert!(!value_conforms(&resolver, &Value::Null, &base));
        assert!(value_conforms(&resolver, &Value::Null, &base.clone().with_nullable(true)));

        let bytes = TypeReference::collection(TypeReference::primitive(PrimitiveKind::Byte, true));
        assert!(value_conforms(
            &resolver,
            &Value::Collection(vec![Value::Integer(1), Value::Integer(200)]),
            &bytes
        ));
        assert!(!value_conforms(
            &resolver,
            &Value::Collection(vec![Value::Integer(300)]),
            &bytes
        ));
    }
}
