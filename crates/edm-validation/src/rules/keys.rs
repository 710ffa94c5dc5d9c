//! Entity key rules
//!
//! Only a declared key is checked, on the type declaring it. Entity types
//! without a key anywhere in their base chain are legal; entity sets over
//! them are not.

use crate::engine::ValidationContext;
use edm_binding::ResolvedType;
use edm_model::{EdmErrorCode, EntityType, PrimitiveKind, Property, StructuralProperty};

/// Declared key properties that resolve to structural properties
fn declared_key_properties<'m>(
    context: &ValidationContext<'m>,
    entity: &'m EntityType,
) -> Vec<&'m StructuralProperty> {
    let resolver = context.resolver();
    entity
        .key
        .iter()
        .filter_map(|key| resolver.resolve_property_path(&entity.structure, &key.name))
        .filter_map(Property::as_structural)
        .collect()
}

pub(crate) fn key_properties_exist<'m>(context: &mut ValidationContext<'m>, entity: &'m EntityType) {
    let resolver = context.resolver();
    for key in &entity.key {
        match resolver.resolve_property_path(&entity.structure, &key.name) {
            Some(Property::Structural(_)) => {}
            Some(Property::Navigation(_)) => context.report(
                EdmErrorCode::InvalidKey,
                format!(
                    "key of '{}' refers to navigation property '{}'",
                    entity.full_name(),
                    key.name
                ),
                entity.structure.location.as_ref(),
            ),
            None => context.report(
                EdmErrorCode::InvalidKey,
                format!(
                    "key of '{}' refers to undefined property '{}'",
                    entity.full_name(),
                    key.name
                ),
                entity.structure.location.as_ref(),
            ),
        }
    }
}

pub(crate) fn key_properties_not_nullable<'m>(
    context: &mut ValidationContext<'m>,
    entity: &'m EntityType,
) {
    for property in declared_key_properties(context, entity) {
        if property.type_ref.nullable() {
            context.report(
                EdmErrorCode::InvalidKey,
                format!(
                    "key property '{}' of '{}' must not be nullable",
                    property.name,
                    entity.full_name()
                ),
                property.location.as_ref(),
            );
        }
    }
}

fn is_key_primitive(kind: PrimitiveKind) -> bool {
    !kind.is_spatial() && !matches!(kind, PrimitiveKind::Stream | PrimitiveKind::PrimitiveType)
}

/// Primitive, type definition or enum typed
pub(crate) fn key_properties_scalar<'m>(context: &mut ValidationContext<'m>, entity: &'m EntityType) {
    let resolver = context.resolver();
    for property in declared_key_properties(context, entity) {
        let scalar = match resolver.resolve_type(&property.type_ref) {
            ResolvedType::Unresolved(_) | ResolvedType::Enum(_) => true,
            ResolvedType::Primitive(kind) => is_key_primitive(kind),
            ResolvedType::Definition(definition) => {
                definition.underlying_kind().is_some_and(is_key_primitive)
            }
            _ => false,
        };
        if !scalar {
            context.report(
                EdmErrorCode::EntityKeyMustBeScalar,
                format!(
                    "key property '{}' of '{}' has non-scalar type '{}'",
                    property.name,
                    entity.full_name(),
                    property.type_ref
                ),
                property.location.as_ref(),
            );
        }
    }
}

/// Enum-typed keys arrived with 4.01
pub(crate) fn enum_key_properties<'m>(context: &mut ValidationContext<'m>, entity: &'m EntityType) {
    let resolver = context.resolver();
    for property in declared_key_properties(context, entity) {
        if let ResolvedType::Enum(_) = resolver.resolve_type(&property.type_ref) {
            context.report(
                EdmErrorCode::EntityKeyMustBeScalar,
                format!(
                    "key property '{}' of '{}' is enum-typed, which requires version 4.01",
                    property.name,
                    entity.full_name()
                ),
                property.location.as_ref(),
            );
        }
    }
}

pub(crate) fn key_not_redefined<'m>(context: &mut ValidationContext<'m>, entity: &'m EntityType) {
    if entity.key.is_empty() {
        return;
    }
    let resolver = context.resolver();
    if resolver.has_cyclic_base(&entity.structure) {
        return;
    }
    let Some(base) = resolver.base_entity_type(entity) else {
        return;
    };
    if let Some((declaring, _)) = resolver.declared_key(base) {
        context.report(
            EdmErrorCode::InvalidKey,
            format!(
                "'{}' redefines the key inherited from '{}'",
                entity.full_name(),
                declaring.full_name()
            ),
            entity.structure.location.as_ref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{
        ComplexType, EdmVersion, EnumType, Model, Multiplicity, NavigationProperty,
        SchemaElement, TypeReference,
    };

    fn property(name: &str, kind: PrimitiveKind, nullable: bool) -> StructuralProperty {
        StructuralProperty::new(name, TypeReference::primitive(kind, nullable))
    }

    fn run(model: &Model, version: EdmVersion) -> Vec<EdmErrorCode> {
        let mut context = ValidationContext::new(model, version);
        for element in model.elements() {
            if let SchemaElement::EntityType(entity) = element {
                key_properties_exist(&mut context, entity);
                key_properties_not_nullable(&mut context, entity);
                key_properties_scalar(&mut context, entity);
                if version == EdmVersion::V4 {
                    enum_key_properties(&mut context, entity);
                }
                key_not_redefined(&mut context, entity);
            }
        }
        context.into_errors().into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_valid_key() {
        let mut model = Model::default();
        model
            .add_element(
                EntityType::new("NS", "Customer")
                    .with_key(["Id"])
                    .with_property(property("Id", PrimitiveKind::Int32, false)),
            )
            .unwrap();
        assert!(run(&model, EdmVersion::V401).is_empty());
    }

    #[test]
    fn test_keyless_entity_is_legal() {
        let mut model = Model::default();
        model.add_element(EntityType::new("NS", "Log")).unwrap();
        assert!(run(&model, EdmVersion::V401).is_empty());
    }

    #[test]
    fn test_key_problems() {
        let mut model = Model::default();
        model.add_element(ComplexType::new("NS", "Address")).unwrap();
        model
            .add_element(
                EntityType::new("NS", "Customer")
                    .with_key(["Missing", "Nullable", "Home", "Orders", "Shape"])
                    .with_property(property("Nullable", PrimitiveKind::String, true))
                    .with_property(StructuralProperty::new(
                        "Home",
                        TypeReference::named("NS.Address", false),
                    ))
                    .with_property(NavigationProperty::new(
                        "Orders",
                        "NS.Order",
                        Multiplicity::Many,
                    ))
                    .with_property(property("Shape", PrimitiveKind::GeographyPoint, false)),
            )
            .unwrap();

        assert_eq!(
            run(&model, EdmVersion::V401),
            vec![
                EdmErrorCode::InvalidKey,
                EdmErrorCode::InvalidKey,
                EdmErrorCode::InvalidKey,
                EdmErrorCode::EntityKeyMustBeScalar,
                EdmErrorCode::EntityKeyMustBeScalar
            ]
        );
    }

    #[test]
    fn test_enum_keys_require_401() {
        let mut model = Model::default();
        model
            .add_element(EnumType::new("NS", "Color").with_member("Red", None))
            .unwrap();
        model
            .add_element(
                EntityType::new("NS", "Paint")
                    .with_key(["Color"])
                    .with_property(StructuralProperty::new(
                        "Color",
                        TypeReference::named("NS.Color", false),
                    )),
            )
            .unwrap();

        assert!(run(&model, EdmVersion::V401).is_empty());
        assert_eq!(
            run(&model, EdmVersion::V4),
            vec![EdmErrorCode::EntityKeyMustBeScalar]
        );
    }

    #[test]
    fn test_redefined_key() {
        let mut model = Model::default();
        model
            .add_element(
                EntityType::new("NS", "Base")
                    .with_key(["Id"])
                    .with_property(property("Id", PrimitiveKind::Int32, false)),
            )
            .unwrap();
        model
            .add_element(
                EntityType::new("NS", "Derived")
                    .with_base_type("NS.Base")
                    .with_key(["Id"]),
            )
            .unwrap();
        assert_eq!(run(&model, EdmVersion::V401), vec![EdmErrorCode::InvalidKey]);
    }
}
