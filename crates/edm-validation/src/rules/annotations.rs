//! Vocabulary annotation rules
//!
//! Rules that need the term's type skip annotations whose term does not
//! resolve; `annotation_term` reports those once.

use crate::engine::ValidationContext;
use edm_binding::ResolvedTarget;
use edm_expr::TypeChecker;
use edm_expr::functions::is_canonical;
use edm_model::names::is_simple_identifier;
use edm_model::{EdmErrorCode, Expression, SourceLocation, StructuredType, VocabularyAnnotation};

/// Unknown asserted types and functions anywhere beneath `expression`
pub(crate) fn check_expression_references<'m>(
    context: &mut ValidationContext<'m>,
    expression: &Expression,
    location: Option<&SourceLocation>,
) {
    let resolver = context.resolver();
    let unresolved_type = match expression {
        Expression::Cast(assertion) | Expression::IsType(assertion) => {
            Some(&assertion.asserted_type)
        }
        Expression::Record(record) => record.declared_type.as_ref(),
        Expression::Collection(collection) => collection.declared_type.as_ref(),
        _ => None,
    }
    .and_then(|type_ref| {
        resolver
            .resolve_type(type_ref)
            .unresolved_name()
            .map(str::to_string)
    });
    if let Some(name) = unresolved_type {
        context.report(
            EdmErrorCode::BadUnresolvedType,
            format!("type '{name}' used in an expression cannot be resolved"),
            location,
        );
    }

    if let Expression::Apply(apply) = expression {
        let function = resolver.normalize(&apply.function);
        if !apply.function.is_empty()
            && !is_canonical(&function)
            && resolver.find_operations(&function).is_empty()
        {
            context.report(
                EdmErrorCode::FunctionNotRegistered,
                format!("function '{}' cannot be resolved", apply.function),
                location,
            );
        }
    }

    for child in expression.children() {
        check_expression_references(context, child, location);
    }
}

pub(crate) fn annotation_target<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    let errors = context
        .resolver()
        .resolve_target(&annotation.target)
        .errors(&annotation.target);
    context.report_all(errors, annotation.location.as_ref());
}

pub(crate) fn annotation_term<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    if context.resolver().find_term(&annotation.term).is_not_found() {
        context.report(
            EdmErrorCode::BadUnresolvedTerm,
            format!(
                "term '{}' applied to '{}' cannot be resolved",
                annotation.term, annotation.target
            ),
            annotation.location.as_ref(),
        );
    }
}

/// One value per (target, term, qualifier)
pub(crate) fn unique_annotations<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    let resolver = context.resolver();
    let term = resolver.normalize(&annotation.term);
    let duplicate = context
        .model()
        .vocabulary_annotations()
        .iter()
        .take_while(|other| other.id != annotation.id)
        .any(|other| {
            other.target == annotation.target
                && other.qualifier == annotation.qualifier
                && resolver.normalize(&other.term) == term
        });
    if duplicate {
        let qualifier = annotation
            .qualifier
            .as_deref()
            .map(|q| format!(" with qualifier '{q}'"))
            .unwrap_or_default();
        context.report(
            EdmErrorCode::DuplicateAnnotation,
            format!(
                "term '{}' is applied to '{}'{qualifier} more than once",
                annotation.term, annotation.target
            ),
            annotation.location.as_ref(),
        );
    }
}

pub(crate) fn annotation_qualifier<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    let Some(qualifier) = annotation.qualifier.as_deref() else {
        return;
    };
    if !is_simple_identifier(qualifier) {
        context.report(
            EdmErrorCode::InvalidQualifierName,
            format!("qualifier '{qualifier}' is not a simple identifier"),
            annotation.location.as_ref(),
        );
    }
}

/// The target's kind must be listed in the term's `AppliesTo`, when given
pub(crate) fn term_applicability<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    let resolver = context.resolver();
    let Some(term) = resolver.find_term(&annotation.term).first() else {
        return;
    };
    if term.applies_to.is_empty() {
        return;
    }
    let Some(kind) = resolver.resolve_target(&annotation.target).applies_to_name() else {
        return;
    };
    if !term.applies_to.iter().any(|allowed| allowed == kind) {
        context.report(
            EdmErrorCode::AnnotationInapplicableTerm,
            format!(
                "term '{}' does not apply to {kind} '{}' (applies to {})",
                term.full_name(),
                annotation.target,
                term.applies_to.join(", ")
            ),
            annotation.location.as_ref(),
        );
    }
}

/// Structural badness of the value plus references the model cannot satisfy
pub(crate) fn annotation_expression<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    let location = annotation.location.as_ref();
    context.report_all(annotation.value.errors(), location);
    check_expression_references(context, &annotation.value, location);
}

/// Type-check the value against the term's type
pub(crate) fn annotation_type<'m>(
    context: &mut ValidationContext<'m>,
    annotation: &'m VocabularyAnnotation,
) {
    let resolver = context.resolver();
    let Some(term) = resolver.find_term(&annotation.term).first() else {
        return;
    };
    let target = resolver.resolve_target(&annotation.target);
    let errors: Vec<_> = TypeChecker::new(resolver)
        .check(&annotation.value, &term.type_ref, path_context(context, &target))
        .into_iter()
        .filter(|error| error.code != EdmErrorCode::FunctionNotRegistered)
        .collect();
    context.report_all(errors, annotation.location.as_ref());
}

/// Structured type that paths in the value are relative to
fn path_context<'m>(
    context: &ValidationContext<'m>,
    target: &ResolvedTarget<'m>,
) -> Option<&'m StructuredType> {
    let resolver = context.resolver();
    match target {
        ResolvedTarget::Element(element) => element.as_structured(),
        ResolvedTarget::Property { property, .. } => resolver.property_structure(property),
        ResolvedTarget::ContainerElement { element, .. } => element
            .entity_type()
            .and_then(|name| resolver.find_structured_type(name).first()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{
        EntityType, Model, PrimitiveKind, StructuralProperty, TargetPath, Term, TypeReference,
    };

    fn vocabulary() -> Model {
        let mut model = Model::default();
        model
            .add_element(Term::new(
                "Vocab",
                "Description",
                TypeReference::primitive(PrimitiveKind::String, true),
            ))
            .unwrap();
        model
            .add_element(
                Term::new(
                    "Vocab",
                    "Computed",
                    TypeReference::primitive(PrimitiveKind::Boolean, true),
                )
                .with_applies_to(["Property"]),
            )
            .unwrap();
        model
            .add_element(EntityType::new("NS", "Customer").with_property(
                StructuralProperty::new(
                    "Name",
                    TypeReference::primitive(PrimitiveKind::String, true),
                ),
            ))
            .unwrap();
        model
    }

    fn run(model: &Model) -> Vec<EdmErrorCode> {
        let mut context = ValidationContext::new(model, model.version());
        for annotation in model.vocabulary_annotations() {
            annotation_target(&mut context, annotation);
            annotation_term(&mut context, annotation);
            unique_annotations(&mut context, annotation);
            annotation_qualifier(&mut context, annotation);
            term_applicability(&mut context, annotation);
            annotation_expression(&mut context, annotation);
            annotation_type(&mut context, annotation);
        }
        context.into_errors().into_iter().map(|e| e.code).collect()
    }

    fn annotate(model: &mut Model, target: TargetPath, term: &str, value: Expression) {
        model
            .add_vocabulary_annotation(VocabularyAnnotation::new(target, term, value))
            .unwrap();
    }

    #[test]
    fn test_valid_annotations() {
        let mut model = vocabulary();
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Description",
            Expression::string("A customer"),
        );
        annotate(
            &mut model,
            TargetPath::member("NS.Customer", "Name"),
            "Vocab.Computed",
            Expression::boolean(true),
        );
        assert!(run(&model).is_empty());
    }

    #[test]
    fn test_unresolved_target_and_term() {
        let mut model = vocabulary();
        annotate(
            &mut model,
            TargetPath::element("NS.Nobody"),
            "Vocab.Description",
            Expression::string("x"),
        );
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Unknown",
            Expression::string("x"),
        );
        assert_eq!(
            run(&model),
            vec![EdmErrorCode::BadUnresolvedTarget, EdmErrorCode::BadUnresolvedTerm]
        );
    }

    #[test]
    fn test_duplicate_and_qualifier() {
        let mut model = vocabulary();
        let target = TargetPath::element("NS.Customer");
        annotate(&mut model, target.clone(), "Vocab.Description", Expression::string("a"));
        annotate(&mut model, target.clone(), "Vocab.Description", Expression::string("b"));
        model
            .add_vocabulary_annotation(
                VocabularyAnnotation::new(target.clone(), "Vocab.Description", Expression::string("c"))
                    .with_qualifier("Tablet"),
            )
            .unwrap();
        model
            .add_vocabulary_annotation(
                VocabularyAnnotation::new(target, "Vocab.Description", Expression::string("d"))
                    .with_qualifier("not valid"),
            )
            .unwrap();
        assert_eq!(
            run(&model),
            vec![EdmErrorCode::DuplicateAnnotation, EdmErrorCode::InvalidQualifierName]
        );
    }

    #[test]
    fn test_inapplicable_term() {
        let mut model = vocabulary();
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Computed",
            Expression::boolean(true),
        );
        assert_eq!(run(&model), vec![EdmErrorCode::AnnotationInapplicableTerm]);
    }

    #[test]
    fn test_expression_references() {
        let mut model = vocabulary();
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Description",
            Expression::apply("NS.Unknown", vec![Expression::string("x")]),
        );
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Computed",
            Expression::cast(Expression::path("Name"), TypeReference::named("NS.Missing", true)),
        );
        let codes = run(&model);
        assert!(codes.contains(&EdmErrorCode::FunctionNotRegistered));
        assert!(codes.contains(&EdmErrorCode::BadUnresolvedType));
        assert_eq!(
            codes
                .iter()
                .filter(|code| **code == EdmErrorCode::FunctionNotRegistered)
                .count(),
            1
        );
    }

    #[test]
    fn test_canonical_function_is_known() {
        let mut model = vocabulary();
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Description",
            Expression::apply(
                "odata.concat",
                vec![Expression::string("a"), Expression::string("b")],
            ),
        );
        assert!(!run(&model).contains(&EdmErrorCode::FunctionNotRegistered));
    }

    #[test]
    fn test_value_type_mismatch() {
        let mut model = vocabulary();
        annotate(
            &mut model,
            TargetPath::element("NS.Customer"),
            "Vocab.Description",
            Expression::integer(42),
        );
        assert_eq!(run(&model), vec![EdmErrorCode::ExpressionPrimitiveKindNotValidForAssertedType]);
    }
}
