//! Entity and complex types with their properties
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use crate::element::NodeId;
use crate::location::SourceLocation;
use crate::names::qualify;
use crate::types::TypeReference;
use std::fmt;

/// Shared shape of entity and complex types
#[derive(Debug, Clone)]
pub struct StructuredType {
    pub id: NodeId,
    pub namespace: String,
    pub name: String,

    /// Qualified name of the base type, bound lazily
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub is_open: bool,

    /// Declared properties, in declaration order
    pub properties: Vec<Property>,
    pub location: Option<SourceLocation>,
}

impl StructuredType {
    /// Create a new structured type
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            namespace: namespace.into(),
            name: name.into(),
            base_type: None,
            is_abstract: false,
            is_open: false,
            properties: Vec::new(),
            location: None,
        }
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// Declared (not inherited) property by name
    pub fn declared_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn structural_properties(&self) -> impl Iterator<Item = &StructuralProperty> {
        self.properties.iter().filter_map(Property::as_structural)
    }

    pub fn navigation_properties(&self) -> impl Iterator<Item = &NavigationProperty> {
        self.properties.iter().filter_map(Property::as_navigation)
    }
}

/// Key property reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRef {
    /// Property name or path
    pub name: String,
    pub alias: Option<String>,
}

impl PropertyRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }
}

/// Entity type declaration
#[derive(Debug, Clone)]
pub struct EntityType {
    pub structure: StructuredType,

    /// Declared key; empty when inherited or missing
    pub key: Vec<PropertyRef>,
    pub has_stream: bool,
}

impl EntityType {
    /// Create a new entity type
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            structure: StructuredType::new(namespace, name),
            key: Vec::new(),
            has_stream: false,
        }
    }

    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.structure.base_type = Some(base_type.into());
        self
    }

    pub fn abstract_type(mut self, is_abstract: bool) -> Self {
        self.structure.is_abstract = is_abstract;
        self
    }

    pub fn open(mut self, is_open: bool) -> Self {
        self.structure.is_open = is_open;
        self
    }

    pub fn with_property(mut self, property: impl Into<Property>) -> Self {
        self.structure.properties.push(property.into());
        self
    }

    pub fn with_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = names.into_iter().map(PropertyRef::new).collect();
        self
    }

    pub fn with_stream(mut self, has_stream: bool) -> Self {
        self.has_stream = has_stream;
        self
    }

    pub fn full_name(&self) -> String {
        self.structure.full_name()
    }
}

/// Complex type declaration
#[derive(Debug, Clone)]
pub struct ComplexType {
    pub structure: StructuredType,
}

impl ComplexType {
    /// Create a new complex type
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            structure: StructuredType::new(namespace, name),
        }
    }

    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.structure.base_type = Some(base_type.into());
        self
    }

    pub fn abstract_type(mut self, is_abstract: bool) -> Self {
        self.structure.is_abstract = is_abstract;
        self
    }

    pub fn open(mut self, is_open: bool) -> Self {
        self.structure.is_open = is_open;
        self
    }

    pub fn with_property(mut self, property: impl Into<Property>) -> Self {
        self.structure.properties.push(property.into());
        self
    }

    pub fn full_name(&self) -> String {
        self.structure.full_name()
    }
}

/// A structural or navigation property
#[derive(Debug, Clone)]
pub enum Property {
    Structural(StructuralProperty),
    Navigation(NavigationProperty),
}

impl Property {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Structural(p) => p.id,
            Self::Navigation(p) => p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Structural(p) => &p.name,
            Self::Navigation(p) => &p.name,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Structural(p) => p.location.as_ref(),
            Self::Navigation(p) => p.location.as_ref(),
        }
    }

    /// Type of the property as a reference
    pub fn type_reference(&self) -> TypeReference {
        match self {
            Self::Structural(p) => p.type_ref.clone(),
            Self::Navigation(p) => p.type_reference(),
        }
    }

    pub fn as_structural(&self) -> Option<&StructuralProperty> {
        match self {
            Self::Structural(p) => Some(p),
            Self::Navigation(_) => None,
        }
    }

    pub fn as_navigation(&self) -> Option<&NavigationProperty> {
        match self {
            Self::Navigation(p) => Some(p),
            Self::Structural(_) => None,
        }
    }
}

impl From<StructuralProperty> for Property {
    fn from(property: StructuralProperty) -> Self {
        Self::Structural(property)
    }
}

impl From<NavigationProperty> for Property {
    fn from(property: NavigationProperty) -> Self {
        Self::Navigation(property)
    }
}

/// Property holding a primitive, enum, type definition or complex value
#[derive(Debug, Clone)]
pub struct StructuralProperty {
    pub id: NodeId,
    pub name: String,
    pub type_ref: TypeReference,
    pub default_value: Option<String>,
    pub location: Option<SourceLocation>,
}

impl StructuralProperty {
    /// Create a new structural property
    pub fn new(name: impl Into<String>, type_ref: TypeReference) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            type_ref,
            default_value: None,
            location: None,
        }
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Cardinality of a navigation end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    One,
    ZeroOrOne,
    Many,
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::ZeroOrOne => "0..1",
            Self::Many => "*",
        })
    }
}

/// Dependent/principal property pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferentialConstraint {
    pub property: String,
    pub referenced_property: String,
}

/// `OnDelete` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDeleteAction {
    Cascade,
    None,
    SetNull,
    SetDefault,
}

impl OnDeleteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cascade => "Cascade",
            Self::None => "None",
            Self::SetNull => "SetNull",
            Self::SetDefault => "SetDefault",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "Cascade" => Some(Self::Cascade),
            "None" => Some(Self::None),
            "SetNull" => Some(Self::SetNull),
            "SetDefault" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// Navigation property to another entity type
#[derive(Debug, Clone)]
pub struct NavigationProperty {
    pub id: NodeId,
    pub name: String,

    /// Qualified name of the target entity type
    pub target_type: String,
    pub multiplicity: Multiplicity,
    pub contains_target: bool,

    /// Declared partner path on the target type
    pub partner: Option<String>,
    pub referential_constraints: Vec<ReferentialConstraint>,
    pub on_delete: Option<OnDeleteAction>,
    pub location: Option<SourceLocation>,
}

impl NavigationProperty {
    /// Create a new navigation property
    pub fn new(
        name: impl Into<String>,
        target_type: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            target_type: target_type.into(),
            multiplicity,
            contains_target: false,
            partner: None,
            referential_constraints: Vec::new(),
            on_delete: None,
            location: None,
        }
    }

    pub fn with_partner(mut self, partner: impl Into<String>) -> Self {
        self.partner = Some(partner.into());
        self
    }

    pub fn with_containment(mut self, contains_target: bool) -> Self {
        self.contains_target = contains_target;
        self
    }

    pub fn with_constraint(
        mut self,
        property: impl Into<String>,
        referenced_property: impl Into<String>,
    ) -> Self {
        self.referential_constraints.push(ReferentialConstraint {
            property: property.into(),
            referenced_property: referenced_property.into(),
        });
        self
    }

    pub fn with_on_delete(mut self, action: OnDeleteAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// `Type`/`Nullable` as written in CSDL: a collection for `Many`
    pub fn type_reference(&self) -> TypeReference {
        match self.multiplicity {
            Multiplicity::Many => {
                TypeReference::collection(TypeReference::named(&self.target_type, false))
            }
            Multiplicity::One => TypeReference::named(&self.target_type, false),
            Multiplicity::ZeroOrOne => TypeReference::named(&self.target_type, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveKind;

    #[test]
    fn test_entity_type_builder() {
        let entity = EntityType::new("NS", "Customer")
            .with_key(["Id"])
            .with_property(StructuralProperty::new(
                "Id",
                TypeReference::primitive(PrimitiveKind::Int32, false),
            ))
            .with_property(NavigationProperty::new(
                "Orders",
                "NS.Order",
                Multiplicity::Many,
            ));

        assert_eq!(entity.full_name(), "NS.Customer");
        assert_eq!(entity.key[0].name, "Id");
        assert_eq!(entity.structure.structural_properties().count(), 1);
        assert_eq!(entity.structure.navigation_properties().count(), 1);
        assert!(entity.structure.declared_property("Orders").is_some());
        assert!(entity.structure.declared_property("Missing").is_none());
    }

    #[test]
    fn test_navigation_type_reference() {
        let many = NavigationProperty::new("Orders", "NS.Order", Multiplicity::Many);
        assert_eq!(many.type_reference().type_name(), "Collection(NS.Order)");

        let optional = NavigationProperty::new("Manager", "NS.Employee", Multiplicity::ZeroOrOne);
        assert!(optional.type_reference().nullable());

        let required = NavigationProperty::new("Owner", "NS.Employee", Multiplicity::One);
        assert!(!required.type_reference().nullable());
    }

    #[test]
    fn test_property_ids_are_unique() {
        let a = StructuralProperty::new("A", TypeReference::primitive(PrimitiveKind::String, true));
        let b = StructuralProperty::new("A", TypeReference::primitive(PrimitiveKind::String, true));
        assert_ne!(a.id, b.id);
    }
}
