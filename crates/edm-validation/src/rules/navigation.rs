//! Navigation property rules: targets, partners, constraints and containment
//!
//! The source multiplicity of a relationship is the multiplicity of the
//! partner property. Containment rules only run when a partner was declared
//! on either side; synthesized partners always satisfy them.

use crate::engine::ValidationContext;
use edm_binding::{PartnerBinding, ResolvedType};
use edm_model::{
    EdmErrorCode, Multiplicity, NavigationProperty, Property, StructuralProperty, StructuredType,
};
use std::collections::HashSet;

fn qualified(owner: &StructuredType, property: &NavigationProperty) -> String {
    format!("{}/{}", owner.full_name(), property.name)
}

pub(crate) fn navigation_target_type<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    match context.resolver().resolve_type_name(&property.target_type) {
        ResolvedType::Entity(_) => {}
        ResolvedType::Unresolved(name) => context.report(
            EdmErrorCode::BadUnresolvedType,
            format!(
                "target type '{name}' of navigation property '{}' cannot be resolved",
                qualified(owner, property)
            ),
            property.location.as_ref(),
        ),
        _ => context.report(
            EdmErrorCode::InvalidNavigationPropertyType,
            format!(
                "target '{}' of navigation property '{}' is not an entity type",
                property.target_type,
                qualified(owner, property)
            ),
            property.location.as_ref(),
        ),
    }
}

/// Declared partners exist and point back at this property and type
pub(crate) fn navigation_partner<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    let resolver = context.resolver();
    match resolver.partner(owner, property) {
        PartnerBinding::Unresolved(path) => context.report(
            EdmErrorCode::BadUnresolvedNavigationPropertyPartner,
            format!(
                "partner '{path}' of navigation property '{}' cannot be resolved on '{}'",
                qualified(owner, property),
                property.target_type
            ),
            property.location.as_ref(),
        ),
        PartnerBinding::Declared(partner) => {
            let points_back = partner
                .partner
                .as_deref()
                .is_none_or(|name| name == property.name);
            let same_type = resolver
                .navigation_target(partner)
                .is_some_and(|back| resolver.is_derived_from(owner, back));
            if !points_back || !same_type {
                context.report(
                    EdmErrorCode::NavigationPartnerMismatch,
                    format!(
                        "partner '{}' of navigation property '{}' does not point back at it",
                        partner.name,
                        qualified(owner, property)
                    ),
                    property.location.as_ref(),
                );
            }
        }
        _ => {}
    }
}

/// Dependent and principal properties of each constraint, when both resolve
fn constraint_pairs<'m>(
    context: &ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) -> Option<Vec<(&'m StructuralProperty, &'m StructuralProperty)>> {
    let resolver = context.resolver();
    let target = resolver.navigation_target(property)?;
    property
        .referential_constraints
        .iter()
        .map(|constraint| {
            let dependent = resolver
                .resolve_property_path(owner, &constraint.property)
                .and_then(Property::as_structural)?;
            let principal = resolver
                .resolve_property_path(target, &constraint.referenced_property)
                .and_then(Property::as_structural)?;
            Some((dependent, principal))
        })
        .collect()
}

pub(crate) fn referential_constraints<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    let resolver = context.resolver();
    let Some(target) = resolver.navigation_target(property) else {
        return;
    };

    for constraint in &property.referential_constraints {
        let dependent = resolver
            .resolve_property_path(owner, &constraint.property)
            .and_then(Property::as_structural);
        let principal = resolver
            .resolve_property_path(target, &constraint.referenced_property)
            .and_then(Property::as_structural);

        if dependent.is_none() {
            context.report(
                EdmErrorCode::BadUnresolvedProperty,
                format!(
                    "dependent property '{}' of constraint on '{}' is not defined on '{}'",
                    constraint.property,
                    qualified(owner, property),
                    owner.full_name()
                ),
                property.location.as_ref(),
            );
        }
        if principal.is_none() {
            context.report(
                EdmErrorCode::BadUnresolvedProperty,
                format!(
                    "principal property '{}' of constraint on '{}' is not defined on '{}'",
                    constraint.referenced_property,
                    qualified(owner, property),
                    target.full_name()
                ),
                property.location.as_ref(),
            );
        }
        let (Some(dependent), Some(principal)) = (dependent, principal) else {
            continue;
        };

        let dependent_type = resolver.resolve_type(&dependent.type_ref);
        let principal_type = resolver.resolve_type(&principal.type_ref);
        if dependent_type.is_unresolved() || principal_type.is_unresolved() {
            continue;
        }
        let matches = match (dependent_type.primitive_kind(), principal_type.primitive_kind()) {
            (Some(a), Some(b)) => a == b,
            _ => {
                resolver.normalize_type_name(&dependent.type_ref.type_name())
                    == resolver.normalize_type_name(&principal.type_ref.type_name())
            }
        };
        if !matches {
            context.report(
                EdmErrorCode::TypeMismatchRelationshipConstraint,
                format!(
                    "dependent property '{}' ({}) does not match principal property '{}' ({})",
                    dependent.name, dependent.type_ref, principal.name, principal.type_ref
                ),
                property.location.as_ref(),
            );
        }
    }
}

/// The navigation target is the principal end of its constraints
pub(crate) fn principal_multiplicity<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    if property.referential_constraints.is_empty() {
        return;
    }
    let Some(pairs) = constraint_pairs(context, owner, property) else {
        return;
    };
    let any_nullable = pairs
        .iter()
        .any(|(dependent, _)| dependent.type_ref.nullable());

    let expected = if any_nullable {
        Multiplicity::ZeroOrOne
    } else {
        Multiplicity::One
    };
    if property.multiplicity != expected {
        let reason = match property.multiplicity {
            Multiplicity::Many => "a collection cannot be the principal end".to_string(),
            _ => format!("the principal end must have multiplicity {expected}"),
        };
        context.report(
            EdmErrorCode::InvalidMultiplicityOfPrincipalEnd,
            format!(
                "invalid multiplicity {} of principal end '{}': {reason}",
                property.multiplicity,
                qualified(owner, property)
            ),
            property.location.as_ref(),
        );
    }
}

/// Multiplicity of the containing end, if a partner was declared
fn declared_source_multiplicity<'m>(
    context: &ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) -> Option<Multiplicity> {
    match context.resolver().partner(owner, property) {
        PartnerBinding::Declared(partner) | PartnerBinding::Implicit(partner) => {
            Some(partner.multiplicity)
        }
        _ => None,
    }
}

fn report_non_recursive_source(
    context: &mut ValidationContext<'_>,
    owner: &StructuredType,
    property: &NavigationProperty,
    source: Multiplicity,
    allowed: &str,
) {
    context.report(
        EdmErrorCode::NavigationPropertyWithNonRecursiveContainmentSourceMustBeFromOne,
        format!(
            "containment '{}' has source multiplicity {source}; a non-recursive containment source must be {allowed}",
            qualified(owner, property)
        ),
        property.location.as_ref(),
    );
}

/// 4.0: a non-recursive containment source is exactly one
pub(crate) fn containment_source_from_one<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    if !property.contains_target || context.resolver().is_recursive(owner, property) {
        return;
    }
    if let Some(source) = declared_source_multiplicity(context, owner, property) {
        if source != Multiplicity::One {
            report_non_recursive_source(context, owner, property, source, "1");
        }
    }
}

/// 4.01: a non-recursive containment source is one or optional
pub(crate) fn containment_source_from_one_or_optional<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    if !property.contains_target || context.resolver().is_recursive(owner, property) {
        return;
    }
    if let Some(source) = declared_source_multiplicity(context, owner, property) {
        if source == Multiplicity::Many {
            report_non_recursive_source(context, owner, property, source, "1 or 0..1");
        }
    }
}

pub(crate) fn recursive_containment<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    if !property.contains_target || !context.resolver().is_recursive(owner, property) {
        return;
    }
    if let Some(source) = declared_source_multiplicity(context, owner, property) {
        if source != Multiplicity::ZeroOrOne {
            context.report(
                EdmErrorCode::NavigationPropertyWithRecursiveContainmentSourceMustBeFromZeroOrOne,
                format!(
                    "recursive containment '{}' has source multiplicity {source}, expected 0..1",
                    qualified(owner, property)
                ),
                property.location.as_ref(),
            );
        }
    }
    if property.multiplicity == Multiplicity::One {
        context.report(
            EdmErrorCode::NavigationPropertyWithRecursiveContainmentTargetMustBeOptional,
            format!(
                "recursive containment '{}' must have target multiplicity 0..1 or *",
                qualified(owner, property)
            ),
            property.location.as_ref(),
        );
    }
}

/// Following containment from the target must never lead back to `owner`
pub(crate) fn indirect_containment<'m>(
    context: &mut ValidationContext<'m>,
    owner: &'m StructuredType,
    property: &'m NavigationProperty,
) {
    let resolver = context.resolver();
    if !property.contains_target || resolver.is_recursive(owner, property) {
        return;
    }
    let Some(target) = resolver.navigation_target(property) else {
        return;
    };

    let mut visited = HashSet::from([target.id]);
    let mut pending = vec![target];
    while let Some(current) = pending.pop() {
        let contained = resolver
            .all_properties(current)
            .into_iter()
            .filter_map(Property::as_navigation)
            .filter(|p| p.contains_target);
        for next in contained.filter_map(|p| resolver.navigation_target(p)) {
            if resolver.is_derived_from(owner, next) {
                context.report(
                    EdmErrorCode::NavigationPropertyEntityMustNotIndirectlyContainItself,
                    format!(
                        "'{}' indirectly contains itself through '{}'",
                        owner.full_name(),
                        qualified(owner, property)
                    ),
                    property.location.as_ref(),
                );
                return;
            }
            if visited.insert(next.id) {
                pending.push(next);
            }
        }
    }
}
