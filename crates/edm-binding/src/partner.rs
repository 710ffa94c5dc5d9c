//! Navigation property partners
//!
//! Every navigation property has a partner view so both directions of a
//! relationship are traversable even when only one was declared.

use crate::resolver::Resolver;
use edm_model::{Multiplicity, NavigationProperty, StructuredType};

/// Partner computed for a navigation property without a declared one
#[derive(Debug, Clone, Copy)]
pub struct SynthesizedPartner<'m> {
    /// Type declaring the original property; the partner points back at it
    pub source_type: &'m StructuredType,
    pub source_property: &'m NavigationProperty,
    pub multiplicity: Multiplicity,
}

impl SynthesizedPartner<'_> {
    /// Synthesized partners never contain their target
    pub fn contains_target(&self) -> bool {
        false
    }

    pub fn target_type_name(&self) -> String {
        self.source_type.full_name()
    }
}

/// Outcome of partner resolution
#[derive(Debug, Clone)]
pub enum PartnerBinding<'m> {
    /// Named by the property's `Partner` attribute
    Declared(&'m NavigationProperty),
    /// A property on the target names this one as its partner
    Implicit(&'m NavigationProperty),
    Synthesized(SynthesizedPartner<'m>),
    /// `Partner` names nothing navigable on the target
    Unresolved(String),
    /// The target type itself did not bind
    UnresolvedTarget,
}

impl<'m> PartnerBinding<'m> {
    /// Declared or implicit partner property
    pub fn property(&self) -> Option<&'m NavigationProperty> {
        match self {
            Self::Declared(p) | Self::Implicit(p) => Some(p),
            _ => None,
        }
    }

    /// Multiplicity of the partner end, i.e. of the source seen from the target
    pub fn multiplicity(&self) -> Option<Multiplicity> {
        match self {
            Self::Declared(p) | Self::Implicit(p) => Some(p.multiplicity),
            Self::Synthesized(s) => Some(s.multiplicity),
            Self::Unresolved(_) | Self::UnresolvedTarget => None,
        }
    }
}

impl<'m> Resolver<'m> {
    /// Structured target type of a navigation property
    pub fn navigation_target(&self, property: &NavigationProperty) -> Option<&'m StructuredType> {
        self.find_structured_type(&property.target_type).first()
    }

    /// Resolve the partner of `property` declared on `owner`
    pub fn partner(
        &self,
        owner: &'m StructuredType,
        property: &'m NavigationProperty,
    ) -> PartnerBinding<'m> {
        let Some(target) = self.navigation_target(property) else {
            return PartnerBinding::UnresolvedTarget;
        };

        if let Some(path) = property.partner.as_deref() {
            return match self
                .resolve_property_path(target, path)
                .and_then(|p| p.as_navigation())
            {
                Some(partner) => PartnerBinding::Declared(partner),
                None => PartnerBinding::Unresolved(path.to_string()),
            };
        }

        let implicit = self
            .all_properties(target)
            .into_iter()
            .filter_map(|p| p.as_navigation())
            .find(|candidate| {
                candidate.partner.as_deref() == Some(property.name.as_str())
                    && self
                        .navigation_target(candidate)
                        .is_some_and(|back| self.is_derived_from(owner, back))
            });
        if let Some(partner) = implicit {
            return PartnerBinding::Implicit(partner);
        }

        PartnerBinding::Synthesized(SynthesizedPartner {
            source_type: owner,
            source_property: property,
            multiplicity: if property.contains_target {
                Multiplicity::ZeroOrOne
            } else {
                Multiplicity::Many
            },
        })
    }

    /// Whether `property` targets (a base of) the type that declares it
    pub fn is_recursive(&self, owner: &'m StructuredType, property: &NavigationProperty) -> bool {
        self.navigation_target(property)
            .is_some_and(|target| self.is_derived_from(owner, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{EntityType, Model};

    fn pair(with_partner: bool) -> Model {
        let mut orders = NavigationProperty::new("Orders", "NS.Order", Multiplicity::Many);
        if with_partner {
            orders = orders.with_partner("Customer");
        }
        let mut model = Model::default();
        model
            .add_element(EntityType::new("NS", "Customer").with_property(orders))
            .unwrap();
        model
            .add_element(EntityType::new("NS", "Order").with_property(
                NavigationProperty::new("Customer", "NS.Customer", Multiplicity::One)
                    .with_partner("Orders"),
            ))
            .unwrap();
        model
    }

    #[test]
    fn test_declared_partner() {
        let model = pair(true);
        let resolver = Resolver::new(&model);
        let customer = resolver.find_structured_type("NS.Customer").first().unwrap();
        let orders = customer
            .declared_property("Orders")
            .and_then(|p| p.as_navigation())
            .unwrap();

        let partner = resolver.partner(customer, orders);
        assert!(matches!(partner, PartnerBinding::Declared(p) if p.name == "Customer"));
        assert_eq!(partner.multiplicity(), Some(Multiplicity::One));
    }

    #[test]
    fn test_implicit_partner() {
        let model = pair(false);
        let resolver = Resolver::new(&model);
        let customer = resolver.find_structured_type("NS.Customer").first().unwrap();
        let orders = customer
            .declared_property("Orders")
            .and_then(|p| p.as_navigation())
            .unwrap();

        assert!(matches!(
            resolver.partner(customer, orders),
            PartnerBinding::Implicit(p) if p.name == "Customer"
        ));
    }

    #[test]
    fn test_synthesized_partner_multiplicity() {
        let mut model = Model::default();
        model
            .add_element(EntityType::new("NS", "Folder").with_property(
                NavigationProperty::new("Files", "NS.File", Multiplicity::Many).with_containment(true),
            ))
            .unwrap();
        model
            .add_element(EntityType::new("NS", "Tag").with_property(NavigationProperty::new(
                "Files",
                "NS.File",
                Multiplicity::Many,
            )))
            .unwrap();
        model.add_element(EntityType::new("NS", "File")).unwrap();
        let resolver = Resolver::new(&model);

        let folder = resolver.find_structured_type("NS.Folder").first().unwrap();
        let files = folder.navigation_properties().next().unwrap();
        match resolver.partner(folder, files) {
            PartnerBinding::Synthesized(partner) => {
                assert_eq!(partner.multiplicity, Multiplicity::ZeroOrOne);
                assert!(!partner.contains_target());
                assert_eq!(partner.target_type_name(), "NS.Folder");
            }
            other => panic!("unexpected partner {other:?}"),
        }

        let tag = resolver.find_structured_type("NS.Tag").first().unwrap();
        let files = tag.navigation_properties().next().unwrap();
        assert_eq!(
            resolver.partner(tag, files).multiplicity(),
            Some(Multiplicity::Many)
        );
    }

    #[test]
    fn test_unresolved_partner_and_target() {
        let mut model = Model::default();
        model
            .add_element(EntityType::new("NS", "A").with_property(
                NavigationProperty::new("ToB", "NS.B", Multiplicity::One).with_partner("Nope"),
            ))
            .unwrap();
        model
            .add_element(EntityType::new("NS", "B").with_property(NavigationProperty::new(
                "ToMissing",
                "NS.Missing",
                Multiplicity::One,
            )))
            .unwrap();
        let resolver = Resolver::new(&model);

        let a = resolver.find_structured_type("NS.A").first().unwrap();
        let to_b = a.navigation_properties().next().unwrap();
        assert!(matches!(resolver.partner(a, to_b), PartnerBinding::Unresolved(ref p) if p == "Nope"));

        let b = resolver.find_structured_type("NS.B").first().unwrap();
        let missing = b.navigation_properties().next().unwrap();
        assert!(matches!(resolver.partner(b, missing), PartnerBinding::UnresolvedTarget));
    }
}
