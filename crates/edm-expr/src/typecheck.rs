//! Checking annotation expressions against the type they are asserted to have
//!
//! The checker never evaluates anything. It compares each node with the
//! expected type, descending into records, collections and branches, and
//! collects every mismatch.

use crate::functions::is_canonical;
use crate::typing::{constant_kind_fits, integer_fits};
use edm_binding::{AbstractType, ResolvedType, Resolver};
use edm_model::{
    Constant, EdmError, EdmErrorCode, Expression, FunctionApplication, LabelHandle, MaxLength,
    PrimitiveKind, Property, RecordExpression, StructuredType, TypeReference,
};
use tracing::trace;

/// Type-checks expressions of one model
#[derive(Debug, Clone, Copy)]
pub struct TypeChecker<'m> {
    resolver: Resolver<'m>,
}

impl<'m> TypeChecker<'m> {
    pub fn new(resolver: Resolver<'m>) -> Self {
        Self { resolver }
    }

    /// Errors of `expression` used where `expected` is required
    ///
    /// `context` is the structured type paths are relative to, if known.
    pub fn check(
        &self,
        expression: &Expression,
        expected: &TypeReference,
        context: Option<&'m StructuredType>,
    ) -> Vec<EdmError> {
        let mut errors = Vec::new();
        self.check_node(expression, expected, context, &mut Vec::new(), &mut errors);
        trace!(expected = %expected, errors = errors.len(), "type-checked expression");
        errors
    }

    fn check_node(
        &self,
        expression: &Expression,
        expected: &TypeReference,
        context: Option<&'m StructuredType>,
        active: &mut Vec<LabelHandle>,
        errors: &mut Vec<EdmError>,
    ) {
        let resolved = self.resolver.resolve_type(expected);
        if matches!(
            resolved,
            ResolvedType::Unresolved(_) | ResolvedType::Abstract(AbstractType::Untyped)
        ) {
            return;
        }

        match expression {
            Expression::Constant(constant) => {
                Self::check_constant(constant, expected, &resolved, errors);
            }
            Expression::Record(record) => {
                self.check_record(record, expected, &resolved, context, active, errors);
            }
            Expression::Collection(collection) => {
                if !resolved.is_collection() {
                    errors.push(EdmError::new(
                        EdmErrorCode::CollectionExpressionNotValidForNonCollectionType,
                        format!("a collection is not valid for non-collection type '{expected}'"),
                    ));
                    return;
                }
                let element_type = expected.element_type();
                for element in &collection.elements {
                    self.check_node(element, element_type, context, active, errors);
                }
            }
            Expression::Path(path) => {
                if matches!(resolved, ResolvedType::Abstract(kind) if kind.is_path()) {
                    return;
                }
                let Some(context) = context else { return };
                let property = self.resolver.resolve_property_path(context, &path.path());
                if let Some(property) = property {
                    self.check_assignable(&property.type_reference(), expected, errors);
                }
            }
            Expression::Cast(assertion) => {
                self.check_assignable(&assertion.asserted_type, expected, errors);
            }
            Expression::IsType(_) => {
                let boolean = TypeReference::primitive(PrimitiveKind::Boolean, false);
                self.check_assignable(&boolean, expected, errors);
            }
            Expression::If(cond) => {
                let boolean = TypeReference::primitive(PrimitiveKind::Boolean, false);
                self.check_node(&cond.test, &boolean, context, active, errors);
                self.check_node(&cond.if_true, expected, context, active, errors);
                self.check_node(&cond.if_false, expected, context, active, errors);
            }
            Expression::Apply(apply) => self.check_apply(apply, expected, context, active, errors),
            Expression::LabeledElement(handle) => {
                self.check_label(*handle, expected, context, active, errors);
            }
            Expression::LabeledElementReference(reference) => {
                if let Some(handle) = reference.target() {
                    self.check_label(handle, expected, context, active, errors);
                }
            }
        }
    }

    fn check_constant(
        constant: &Constant,
        expected: &TypeReference,
        resolved: &ResolvedType<'_>,
        errors: &mut Vec<EdmError>,
    ) {
        match constant {
            Constant::Malformed { .. } => return,
            Constant::Null => {
                if !expected.nullable() {
                    errors.push(EdmError::new(
                        EdmErrorCode::NullCannotBeAssertedToBeANonNullableType,
                        format!("null is not valid for non-nullable type '{expected}'"),
                    ));
                }
                return;
            }
            _ => {}
        }

        let kind = match resolved {
            ResolvedType::Abstract(abstract_type) if abstract_type.is_path() => {
                if !matches!(constant, Constant::String(_)) {
                    errors.push(primitive_kind_error(constant, expected));
                }
                return;
            }
            ResolvedType::Enum(_) => {
                if !matches!(constant, Constant::String(_) | Constant::Integer(_)) {
                    errors.push(primitive_kind_error(constant, expected));
                }
                return;
            }
            other => match other.primitive_kind() {
                Some(kind) => kind,
                None => {
                    errors.push(EdmError::new(
                        EdmErrorCode::PrimitiveConstantExpressionNotValidForNonPrimitiveType,
                        format!(
                            "a {} constant is not valid for non-primitive type '{expected}'",
                            constant.kind()
                        ),
                    ));
                    return;
                }
            },
        };

        if let Constant::Integer(value) = constant {
            if kind.is_integral() {
                if !integer_fits(*value, kind) {
                    errors.push(EdmError::new(
                        EdmErrorCode::IntegerConstantValueOutOfRange,
                        format!("{value} is out of range for '{kind}'"),
                    ));
                }
                return;
            }
        }

        if !constant_kind_fits(constant, kind) {
            errors.push(primitive_kind_error(constant, expected));
            return;
        }

        let max_length = match (expected.facets().max_length, resolved) {
            (Some(max_length), _) => Some(max_length),
            (None, ResolvedType::Definition(definition)) => definition.facets.max_length,
            (None, _) => None,
        };
        let Some(MaxLength::Bounded(limit)) = max_length else {
            return;
        };
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        match constant {
            Constant::String(text) if text.chars().count() > limit => {
                errors.push(EdmError::new(
                    EdmErrorCode::StringConstantLengthOutOfRange,
                    format!("string of length {} exceeds MaxLength {limit}", text.chars().count()),
                ));
            }
            Constant::Binary(bytes) if bytes.len() > limit => {
                errors.push(EdmError::new(
                    EdmErrorCode::BinaryConstantLengthOutOfRange,
                    format!("binary of length {} exceeds MaxLength {limit}", bytes.len()),
                ));
            }
            _ => {}
        }
    }

    fn check_record(
        &self,
        record: &RecordExpression,
        expected: &TypeReference,
        resolved: &ResolvedType<'m>,
        context: Option<&'m StructuredType>,
        active: &mut Vec<LabelHandle>,
        errors: &mut Vec<EdmError>,
    ) {
        let expected_structure = match resolved {
            ResolvedType::Entity(_) | ResolvedType::Complex(_) => resolved.as_structured(),
            ResolvedType::Abstract(AbstractType::EntityType | AbstractType::ComplexType) => None,
            _ => {
                errors.push(EdmError::new(
                    EdmErrorCode::RecordExpressionNotValidForNonStructuredType,
                    format!("a record is not valid for non-structured type '{expected}'"),
                ));
                return;
            }
        };

        let mut structure = expected_structure;
        if let Some(declared) = &record.declared_type {
            if !self.resolver.is_assignable(expected, declared) {
                errors.push(EdmError::new(
                    EdmErrorCode::ExpressionNotValidForTheAssertedType,
                    format!("record of type '{declared}' is not valid for type '{expected}'"),
                ));
                return;
            }
            if let Some(declared_structure) = self.resolver.resolve_type(declared).as_structured() {
                structure = Some(declared_structure);
            }
        }
        let Some(structure) = structure else { return };

        for property_value in &record.properties {
            match self.resolver.find_property(structure, &property_value.property) {
                Some(property) => self.check_node(
                    &property_value.value,
                    &property.type_reference(),
                    context,
                    active,
                    errors,
                ),
                None if !structure.is_open => errors.push(EdmError::new(
                    EdmErrorCode::RecordExpressionHasExtraProperties,
                    format!(
                        "'{}' is not a property of '{}'",
                        property_value.property,
                        structure.full_name()
                    ),
                )),
                None => {}
            }
        }

        for property in self.resolver.all_properties(structure) {
            let Property::Structural(structural) = property else {
                continue;
            };
            let required = !structural.type_ref.nullable() && structural.default_value.is_none();
            if required && record.property(&structural.name).is_none() {
                errors.push(EdmError::new(
                    EdmErrorCode::RecordExpressionMissingRequiredProperty,
                    format!(
                        "record is missing required property '{}' of '{}'",
                        structural.name,
                        structure.full_name()
                    ),
                ));
            }
        }
    }

    fn check_apply(
        &self,
        apply: &FunctionApplication,
        expected: &TypeReference,
        context: Option<&'m StructuredType>,
        active: &mut Vec<LabelHandle>,
        errors: &mut Vec<EdmError>,
    ) {
        let name = self.resolver.normalize(&apply.function);
        if is_canonical(&name) {
            return;
        }
        let overloads = self.resolver.find_operations(&name);
        if overloads.is_empty() {
            errors.push(EdmError::new(
                EdmErrorCode::FunctionNotRegistered,
                format!("function '{name}' is not defined"),
            ));
            return;
        }
        let Some(function) = overloads
            .iter()
            .find(|op| op.parameters.len() == apply.arguments.len())
        else {
            errors.push(EdmError::new(
                EdmErrorCode::FunctionArgumentsMismatch,
                format!(
                    "no overload of '{name}' takes {} arguments",
                    apply.arguments.len()
                ),
            ));
            return;
        };

        for (argument, parameter) in apply.arguments.iter().zip(&function.parameters) {
            self.check_node(argument, &parameter.type_ref, context, active, errors);
        }
        if let Some(return_type) = function.return_type_ref() {
            self.check_assignable(return_type, expected, errors);
        }
    }

    fn check_label(
        &self,
        handle: LabelHandle,
        expected: &TypeReference,
        context: Option<&'m StructuredType>,
        active: &mut Vec<LabelHandle>,
        errors: &mut Vec<EdmError>,
    ) {
        if active.contains(&handle) {
            return;
        }
        let Some(element) = self.resolver.model().labeled_elements().get(handle) else {
            return;
        };
        active.push(handle);
        self.check_node(&element.expression, expected, context, active, errors);
        active.pop();
    }

    fn check_assignable(
        &self,
        actual: &TypeReference,
        expected: &TypeReference,
        errors: &mut Vec<EdmError>,
    ) {
        if !self.resolver.is_assignable(expected, actual) {
            errors.push(EdmError::new(
                EdmErrorCode::ExpressionNotValidForTheAssertedType,
                format!("an expression of type '{actual}' is not valid for type '{expected}'"),
            ));
        }
    }
}

fn primitive_kind_error(constant: &Constant, expected: &TypeReference) -> EdmError {
    EdmError::new(
        EdmErrorCode::ExpressionPrimitiveKindNotValidForAssertedType,
        format!(
            "a {} constant is not valid for type '{expected}'",
            constant.kind()
        ),
    )
}
