//! Model-wide rules: containers, duplicate names and labeled elements

use super::annotations::check_expression_references;
use crate::engine::ValidationContext;
use edm_model::{EdmErrorCode, Model, SchemaElement};

/// At most one entity container per model
pub(crate) fn single_entity_container<'m>(context: &mut ValidationContext<'m>, model: &'m Model) {
    let mut containers = model.entity_containers();
    let Some(first) = containers.next() else {
        return;
    };
    for extra in containers {
        context.report(
            EdmErrorCode::MultipleEntityContainers,
            format!(
                "entity container '{}' is not allowed, '{}' is already defined",
                extra.full_name(),
                first.full_name()
            ),
            extra.location.as_ref(),
        );
    }
}

/// Overloads of one operation kind may share a name; nothing else may
fn conflicts(a: &SchemaElement, b: &SchemaElement) -> bool {
    !(a.kind().is_operation() && a.kind() == b.kind())
}

pub(crate) fn unique_element_names<'m>(
    context: &mut ValidationContext<'m>,
    element: &'m SchemaElement,
) {
    let name = element.full_name();
    let model = context.model();

    let clashes_locally = model
        .declared(&name)
        .take_while(|other| other.id() != element.id())
        .any(|other| conflicts(other, element));
    if clashes_locally {
        context.report(
            EdmErrorCode::AlreadyDefined,
            format!("an element named '{name}' is already defined"),
            element.location(),
        );
        return;
    }

    let clashes_with_reference = model
        .references()
        .iter()
        .any(|reference| reference.declared(&name).any(|other| conflicts(other, element)));
    if clashes_with_reference {
        context.report(
            EdmErrorCode::AlreadyDefined,
            format!("an element named '{name}' is already defined in a referenced model"),
            element.location(),
        );
    }
}

/// Problems inside labeled element bodies, reported once per label
pub(crate) fn labeled_element_expressions<'m>(
    context: &mut ValidationContext<'m>,
    model: &'m Model,
) {
    for (_, labeled) in model.labeled_elements().iter() {
        context.report_all(labeled.expression.errors(), labeled.location.as_ref());
        check_expression_references(context, &labeled.expression, labeled.location.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{
        ComplexType, EntityContainer, EntityType, Expression, LabeledElement, Operation,
        PrimitiveKind, TypeReference,
    };
    use std::sync::Arc;

    fn codes(context: ValidationContext<'_>) -> Vec<EdmErrorCode> {
        context.into_errors().into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_multiple_containers() {
        let mut model = Model::default();
        model.add_element(EntityContainer::new("NS", "One")).unwrap();
        model.add_element(EntityContainer::new("NS", "Two")).unwrap();
        model.add_element(EntityContainer::new("NS", "Three")).unwrap();

        let mut context = ValidationContext::new(&model, model.version());
        single_entity_container(&mut context, &model);
        assert_eq!(
            codes(context),
            vec![
                EdmErrorCode::MultipleEntityContainers,
                EdmErrorCode::MultipleEntityContainers
            ]
        );
    }

    #[test]
    fn test_duplicate_elements() {
        let mut model = Model::default();
        model.add_element(EntityType::new("NS", "Thing")).unwrap();
        model.add_element(ComplexType::new("NS", "Thing")).unwrap();

        let mut context = ValidationContext::new(&model, model.version());
        for element in model.elements() {
            unique_element_names(&mut context, element);
        }
        assert_eq!(codes(context), vec![EdmErrorCode::AlreadyDefined]);
    }

    #[test]
    fn test_overloads_are_not_duplicates() {
        let int = TypeReference::primitive(PrimitiveKind::Int32, false);
        let mut model = Model::default();
        model
            .add_element(
                Operation::function("NS", "F")
                    .with_parameter("a", int.clone())
                    .with_return_type(int.clone()),
            )
            .unwrap();
        model
            .add_element(Operation::function("NS", "F").with_return_type(int))
            .unwrap();
        model.add_element(Operation::action("NS", "F")).unwrap();

        let mut context = ValidationContext::new(&model, model.version());
        for element in model.elements() {
            unique_element_names(&mut context, element);
        }
        assert_eq!(codes(context), vec![EdmErrorCode::AlreadyDefined]);
    }

    #[test]
    fn test_duplicate_against_reference() {
        let mut referenced = Model::default();
        referenced.add_element(EntityType::new("NS", "Thing")).unwrap();

        let mut model = Model::default();
        model.add_reference(Arc::new(referenced));
        model.add_element(EntityType::new("NS", "Thing")).unwrap();

        let mut context = ValidationContext::new(&model, model.version());
        for element in model.elements() {
            unique_element_names(&mut context, element);
        }
        assert_eq!(codes(context), vec![EdmErrorCode::AlreadyDefined]);
    }

    #[test]
    fn test_unbound_label_reference_reported_once() {
        let mut model = Model::default();
        model.add_labeled_element(LabeledElement::new(
            "Outer",
            Expression::label_reference("Missing"),
        ));

        let mut context = ValidationContext::new(&model, model.version());
        labeled_element_expressions(&mut context, &model);
        assert_eq!(codes(context), vec![EdmErrorCode::BadUnresolvedLabeledElement]);
    }
}
