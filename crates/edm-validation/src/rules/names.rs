//! Identifier syntax and length

use crate::engine::ValidationContext;
use edm_model::names::{MAX_NAME_LENGTH, MAX_NAMESPACE_LENGTH, is_namespace, is_simple_identifier};
use edm_model::{
    ContainerElement, EdmErrorCode, EntityContainer, EnumType, Model, Operation, SchemaElement,
    SourceLocation, StructuredType,
};

fn check_simple_name(
    context: &mut ValidationContext<'_>,
    what: &str,
    name: &str,
    location: Option<&SourceLocation>,
) {
    if name.chars().count() > MAX_NAME_LENGTH {
        context.report(
            EdmErrorCode::NameTooLong,
            format!("{what} name '{name}' is longer than {MAX_NAME_LENGTH} characters"),
            location,
        );
    } else if !is_simple_identifier(name) {
        context.report(
            EdmErrorCode::InvalidName,
            format!("{what} name '{name}' is not a valid simple identifier"),
            location,
        );
    }
}

pub(crate) fn namespace_names<'m>(context: &mut ValidationContext<'m>, model: &'m Model) {
    for declared in model.namespaces() {
        let namespace = &declared.namespace;
        if namespace.len() > MAX_NAMESPACE_LENGTH {
            context.report(
                EdmErrorCode::NameTooLong,
                format!("namespace '{namespace}' is longer than {MAX_NAMESPACE_LENGTH} characters"),
                None,
            );
        } else if !is_namespace(namespace) {
            context.report(
                EdmErrorCode::InvalidNamespaceName,
                format!("'{namespace}' is not a valid namespace"),
                None,
            );
        }
        if let Some(alias) = &declared.alias {
            check_simple_name(context, "alias", alias, None);
        }
    }
}

pub(crate) fn element_name<'m>(context: &mut ValidationContext<'m>, element: &'m SchemaElement) {
    check_simple_name(
        context,
        element.kind().as_str(),
        element.name(),
        element.location(),
    );
}

pub(crate) fn property_names<'m>(context: &mut ValidationContext<'m>, ty: &'m StructuredType) {
    for property in &ty.properties {
        check_simple_name(context, "property", property.name(), property.location());
    }
}

pub(crate) fn member_names<'m>(context: &mut ValidationContext<'m>, enum_type: &'m EnumType) {
    for member in &enum_type.members {
        check_simple_name(context, "member", &member.name, member.location.as_ref());
    }
}

pub(crate) fn parameter_names<'m>(context: &mut ValidationContext<'m>, operation: &'m Operation) {
    for parameter in &operation.parameters {
        check_simple_name(context, "parameter", &parameter.name, parameter.location.as_ref());
    }
}

pub(crate) fn container_member_name<'m>(
    context: &mut ValidationContext<'m>,
    _container: &'m EntityContainer,
    member: &'m ContainerElement,
) {
    check_simple_name(context, member.kind_name(), member.name(), member.location());
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{EntityType, PrimitiveKind, StructuralProperty, TypeReference};

    fn run(model: &Model) -> Vec<EdmErrorCode> {
        let mut context = ValidationContext::new(model, model.version());
        namespace_names(&mut context, model);
        for element in model.elements() {
            element_name(&mut context, element);
            if let Some(structure) = element.as_structured() {
                property_names(&mut context, structure);
            }
        }
        context.into_errors().into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_valid_names() {
        let mut model = Model::default();
        model.add_element(EntityType::new("Org.Example", "Customer")).unwrap();
        assert!(run(&model).is_empty());
    }

    #[test]
    fn test_invalid_names() {
        let mut model = Model::default();
        model
            .add_element(EntityType::new("Org.Example", "1Customer").with_property(
                StructuralProperty::new(
                    "has space",
                    TypeReference::primitive(PrimitiveKind::String, true),
                ),
            ))
            .unwrap();
        assert_eq!(run(&model), vec![EdmErrorCode::InvalidName, EdmErrorCode::InvalidName]);
    }

    #[test]
    fn test_long_names() {
        let mut model = Model::default();
        model
            .add_element(EntityType::new("NS", "N".repeat(MAX_NAME_LENGTH + 1)))
            .unwrap();
        assert_eq!(run(&model), vec![EdmErrorCode::NameTooLong]);
    }

    #[test]
    fn test_invalid_namespace() {
        let mut model = Model::default();
        model.declare_namespace("Org..Example", None);
        assert_eq!(run(&model), vec![EdmErrorCode::InvalidNamespaceName]);
    }
}
