//! Entity and complex type rules

use crate::engine::ValidationContext;
use edm_binding::ResolvedType;
use edm_model::{ComplexType, EdmErrorCode, EntityType, StructuredType};

pub(crate) fn entity_base_type<'m>(context: &mut ValidationContext<'m>, entity: &'m EntityType) {
    let structure = &entity.structure;
    let Some(base) = structure.base_type.as_deref() else {
        return;
    };
    let resolver = context.resolver();
    match resolver.resolve_type_name(base) {
        ResolvedType::Unresolved(name) => context.report(
            EdmErrorCode::BadUnresolvedType,
            format!("base type '{name}' of '{}' cannot be resolved", entity.full_name()),
            structure.location.as_ref(),
        ),
        ResolvedType::Entity(_) => {
            if resolver.has_cyclic_base(structure) {
                context.report(
                    EdmErrorCode::BadCyclicEntity,
                    format!("entity type '{}' derives from itself", entity.full_name()),
                    structure.location.as_ref(),
                );
            }
        }
        _ => context.report(
            EdmErrorCode::EntityMustHaveEntityBaseType,
            format!(
                "base type '{base}' of entity type '{}' is not an entity type",
                entity.full_name()
            ),
            structure.location.as_ref(),
        ),
    }
}

pub(crate) fn complex_base_type<'m>(context: &mut ValidationContext<'m>, complex: &'m ComplexType) {
    let structure = &complex.structure;
    let Some(base) = structure.base_type.as_deref() else {
        return;
    };
    let resolver = context.resolver();
    match resolver.resolve_type_name(base) {
        ResolvedType::Unresolved(name) => context.report(
            EdmErrorCode::BadUnresolvedType,
            format!("base type '{name}' of '{}' cannot be resolved", complex.full_name()),
            structure.location.as_ref(),
        ),
        ResolvedType::Complex(_) => {
            if resolver.has_cyclic_base(structure) {
                context.report(
                    EdmErrorCode::BadCyclicComplex,
                    format!("complex type '{}' derives from itself", complex.full_name()),
                    structure.location.as_ref(),
                );
            }
        }
        _ => context.report(
            EdmErrorCode::ComplexTypeMustHaveComplexBaseType,
            format!(
                "base type '{base}' of complex type '{}' is not a complex type",
                complex.full_name()
            ),
            structure.location.as_ref(),
        ),
    }
}

/// Declared property names are unique and do not hide inherited ones
pub(crate) fn unique_property_names<'m>(context: &mut ValidationContext<'m>, ty: &'m StructuredType) {
    let resolver = context.resolver();
    let base = resolver
        .base_type(ty)
        .filter(|_| !resolver.has_cyclic_base(ty));

    for (i, property) in ty.properties.iter().enumerate() {
        let name = property.name();
        if ty.properties[..i].iter().any(|p| p.name() == name) {
            context.report(
                EdmErrorCode::AlreadyDefined,
                format!("property '{name}' is already defined on '{}'", ty.full_name()),
                property.location(),
            );
        } else if let Some(base) = base {
            if resolver.find_property(base, name).is_some() {
                context.report(
                    EdmErrorCode::AlreadyDefined,
                    format!(
                        "property '{name}' of '{}' is already defined on base type '{}'",
                        ty.full_name(),
                        base.full_name()
                    ),
                    property.location(),
                );
            }
        }
    }
}

pub(crate) fn member_name_not_type_name<'m>(
    context: &mut ValidationContext<'m>,
    ty: &'m StructuredType,
) {
    for property in &ty.properties {
        if property.name() == ty.name {
            context.report(
                EdmErrorCode::InvalidMemberNameMatchesTypeName,
                format!("property '{}' has the same name as its declaring type", ty.name),
                property.location(),
            );
        }
    }
}
