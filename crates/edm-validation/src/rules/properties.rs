//! Structural property rules

use crate::engine::ValidationContext;
use edm_binding::ResolvedType;
use edm_model::{EdmErrorCode, StructuralProperty, StructuredType};

pub(crate) fn property_type_resolves<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m StructuralProperty,
) {
    let resolved = context.resolver().resolve_type(&property.type_ref);
    if let Some(name) = resolved.unresolved_name() {
        context.report(
            EdmErrorCode::BadUnresolvedType,
            format!(
                "type '{name}' of property '{}.{}' cannot be resolved",
                owner.full_name(),
                property.name
            ),
            property.location.as_ref(),
        );
    }
}

/// Facets on a type definition reference must suit its underlying primitive
pub(crate) fn property_facets_applicable<'m>(
    context: &mut ValidationContext<'m>,
    _owner: &'m StructuredType,
    property: &'m StructuralProperty,
) {
    let resolved = context.resolver().resolve_type(&property.type_ref);
    let ResolvedType::Definition(definition) = resolved.element() else {
        return;
    };
    let Some(kind) = definition.underlying_kind() else {
        return;
    };
    let facets = property.type_ref.element_type().facets();
    if let Some(facet) = facets.first_inapplicable(kind) {
        context.report(
            EdmErrorCode::FacetNotApplicable,
            format!(
                "facet {facet} of property '{}' does not apply to '{}' (underlying type {kind})",
                property.name,
                definition.full_name()
            ),
            property.location.as_ref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{
        ComplexType, EdmType, Facets, MaxLength, Model, PrimitiveKind, TypeDefinition,
        TypeReference,
    };

    fn run(model: &Model) -> Vec<EdmErrorCode> {
        let mut context = ValidationContext::new(model, model.version());
        for element in model.elements() {
            if let Some(structure) = element.as_structured() {
                for property in structure.structural_properties() {
                    property_type_resolves(&mut context, structure, property);
                    property_facets_applicable(&mut context, structure, property);
                }
            }
        }
        context.into_errors().into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_unresolved_property_type() {
        let mut model = Model::default();
        model
            .add_element(ComplexType::new("NS", "Address").with_property(StructuralProperty::new(
                "Tags",
                TypeReference::collection(TypeReference::named("NS.Tag", true)),
            )))
            .unwrap();
        assert_eq!(run(&model), vec![EdmErrorCode::BadUnresolvedType]);
    }

    #[test]
    fn test_facet_on_type_definition() {
        let mut model = Model::default();
        model
            .add_element(TypeDefinition::new("NS", "Counter", "Edm.Int32"))
            .unwrap();
        model
            .add_element(TypeDefinition::new("NS", "Code", "Edm.String"))
            .unwrap();

        let max_length = Facets {
            max_length: Some(MaxLength::Bounded(10)),
            ..Facets::default()
        };
        let counter = TypeReference::new(EdmType::Named("NS.Counter".into()), true)
            .with_facets(max_length.clone())
            .unwrap();
        let code = TypeReference::new(EdmType::Named("NS.Code".into()), true)
            .with_facets(max_length)
            .unwrap();
        model
            .add_element(
                ComplexType::new("NS", "Row")
                    .with_property(StructuralProperty::new("Count", counter))
                    .with_property(StructuralProperty::new("Code", code)),
            )
            .unwrap();

        assert_eq!(run(&model), vec![EdmErrorCode::FacetNotApplicable]);
    }

    #[test]
    fn test_primitive_property_is_fine() {
        let mut model = Model::default();
        model
            .add_element(ComplexType::new("NS", "Row").with_property(StructuralProperty::new(
                "Name",
                TypeReference::primitive(PrimitiveKind::String, true),
            )))
            .unwrap();
        assert!(run(&model).is_empty());
    }
}
