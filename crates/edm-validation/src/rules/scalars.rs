//! Enum type and type definition rules

use crate::engine::ValidationContext;
use edm_expr::typing::integer_fits;
use edm_model::{EdmErrorCode, EnumType, PrimitiveKind, TypeDefinition};

pub(crate) fn enum_underlying_type<'m>(context: &mut ValidationContext<'m>, enum_type: &'m EnumType) {
    if !enum_type.underlying_kind().is_some_and(PrimitiveKind::is_integral) {
        context.report(
            EdmErrorCode::EnumMustHaveIntegerUnderlyingType,
            format!(
                "underlying type '{}' of enum '{}' is not an integer type",
                enum_type.underlying_type,
                enum_type.full_name()
            ),
            enum_type.location.as_ref(),
        );
    }
}

pub(crate) fn enum_member_values<'m>(context: &mut ValidationContext<'m>, enum_type: &'m EnumType) {
    let Some(kind) = enum_type.underlying_kind().filter(|k| k.is_integral()) else {
        return;
    };
    for (member, value) in enum_type.member_values() {
        if !integer_fits(value, kind) {
            context.report(
                EdmErrorCode::EnumMemberValueOutOfRange,
                format!(
                    "value {value} of member '{}' is out of range for {kind}",
                    member.name
                ),
                member.location.as_ref(),
            );
        }
    }
}

pub(crate) fn unique_enum_members<'m>(context: &mut ValidationContext<'m>, enum_type: &'m EnumType) {
    for (i, member) in enum_type.members.iter().enumerate() {
        if enum_type.members[..i].iter().any(|m| m.name == member.name) {
            context.report(
                EdmErrorCode::AlreadyDefined,
                format!(
                    "member '{}' is already defined on '{}'",
                    member.name,
                    enum_type.full_name()
                ),
                member.location.as_ref(),
            );
        }
    }
}

/// The underlying type is a concrete primitive, not `Edm.PrimitiveType` or a schema type
pub(crate) fn type_definition_underlying_type<'m>(
    context: &mut ValidationContext<'m>,
    definition: &'m TypeDefinition,
) {
    let concrete = definition
        .underlying_kind()
        .is_some_and(|kind| kind != PrimitiveKind::PrimitiveType);
    if !concrete {
        context.report(
            EdmErrorCode::TypeDefinitionUnderlyingTypeMustBePrimitive,
            format!(
                "underlying type '{}' of '{}' is not a concrete primitive type",
                definition.underlying_type,
                definition.full_name()
            ),
            definition.location.as_ref(),
        );
    }
}

pub(crate) fn type_definition_facets<'m>(
    context: &mut ValidationContext<'m>,
    definition: &'m TypeDefinition,
) {
    let Some(kind) = definition.underlying_kind() else {
        return;
    };
    if let Some(facet) = definition.facets.first_inapplicable(kind) {
        context.report(
            EdmErrorCode::FacetNotApplicable,
            format!(
                "facet {facet} of '{}' does not apply to {kind}",
                definition.full_name()
            ),
            definition.location.as_ref(),
        );
    }
}
