//! Schema elements: the top-level declarations of a model
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use crate::container::EntityContainer;
use crate::location::SourceLocation;
use crate::names::qualify;
use crate::operation::{Operation, OperationKind};
use crate::structured::{ComplexType, EntityType, StructuredType};
use crate::types::{CoreModel, Facets, PrimitiveKind, TypeReference};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a model node
///
/// Direct annotations are keyed by this id, so two structurally equal
/// declarations still carry distinct annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Kind tag of a schema element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    EntityType,
    ComplexType,
    EnumType,
    TypeDefinition,
    Term,
    Action,
    Function,
    EntityContainer,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntityType => "EntityType",
            Self::ComplexType => "ComplexType",
            Self::EnumType => "EnumType",
            Self::TypeDefinition => "TypeDefinition",
            Self::Term => "Term",
            Self::Action => "Action",
            Self::Function => "Function",
            Self::EntityContainer => "EntityContainer",
        }
    }

    /// Entity, complex, enum or type definition
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::EntityType | Self::ComplexType | Self::EnumType | Self::TypeDefinition
        )
    }

    pub fn is_operation(self) -> bool {
        matches!(self, Self::Action | Self::Function)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enum member; `value` is assigned implicitly when absent
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub id: NodeId,
    pub name: String,
    pub value: Option<i64>,
    pub location: Option<SourceLocation>,
}

impl EnumMember {
    pub fn new(name: impl Into<String>, value: Option<i64>) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            value,
            location: None,
        }
    }
}

/// Enumeration type
#[derive(Debug, Clone)]
pub struct EnumType {
    pub id: NodeId,
    pub namespace: String,
    pub name: String,

    /// Qualified underlying type name, `Edm.Int32` by default
    pub underlying_type: String,
    pub is_flags: bool,
    pub members: Vec<EnumMember>,
    pub location: Option<SourceLocation>,
}

impl EnumType {
    /// Create a new enum type over `Edm.Int32`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            namespace: namespace.into(),
            name: name.into(),
            underlying_type: PrimitiveKind::Int32.qualified_name(),
            is_flags: false,
            members: Vec::new(),
            location: None,
        }
    }

    pub fn with_underlying_type(mut self, underlying_type: impl Into<String>) -> Self {
        self.underlying_type = underlying_type.into();
        self
    }

    pub fn flags(mut self, is_flags: bool) -> Self {
        self.is_flags = is_flags;
        self
    }

    pub fn with_member(mut self, name: impl Into<String>, value: Option<i64>) -> Self {
        self.members.push(EnumMember::new(name, value));
        self
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// Underlying primitive kind, when it names one
    pub fn underlying_kind(&self) -> Option<PrimitiveKind> {
        CoreModel::instance().primitive(&self.underlying_type)
    }

    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Members with their effective values; implicit values continue from the previous member
    pub fn member_values(&self) -> Vec<(&EnumMember, i64)> {
        let mut next = 0_i64;
        self.members
            .iter()
            .map(|member| {
                let value = member.value.unwrap_or(next);
                next = value.saturating_add(1);
                (member, value)
            })
            .collect()
    }
}

/// Named primitive type with facets
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub id: NodeId,
    pub namespace: String,
    pub name: String,
    pub underlying_type: String,
    pub facets: Facets,
    pub location: Option<SourceLocation>,
}

impl TypeDefinition {
    /// Create a new type definition
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        underlying_type: impl Into<String>,
    ) -> Self {
        Self {
            id: NodeId::next(),
            namespace: namespace.into(),
            name: name.into(),
            underlying_type: underlying_type.into(),
            facets: Facets::default(),
            location: None,
        }
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    pub fn underlying_kind(&self) -> Option<PrimitiveKind> {
        CoreModel::instance().primitive(&self.underlying_type)
    }
}

/// Vocabulary term
#[derive(Debug, Clone)]
pub struct Term {
    pub id: NodeId,
    pub namespace: String,
    pub name: String,
    pub type_ref: TypeReference,
    pub base_term: Option<String>,
    pub default_value: Option<String>,

    /// Element kinds the term may be applied to; empty means any
    pub applies_to: Vec<String>,
    pub location: Option<SourceLocation>,
}

impl Term {
    /// Create a new term
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, type_ref: TypeReference) -> Self {
        Self {
            id: NodeId::next(),
            namespace: namespace.into(),
            name: name.into(),
            type_ref,
            base_term: None,
            default_value: None,
            applies_to: Vec::new(),
            location: None,
        }
    }

    pub fn with_applies_to<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applies_to = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

/// Element of an unrecognised kind that still participates in naming
#[derive(Debug, Clone)]
pub struct CustomElement {
    pub id: NodeId,
    pub namespace: String,
    pub name: String,
    pub kind: ElementKind,
    pub location: Option<SourceLocation>,
}

impl CustomElement {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: NodeId::next(),
            namespace: namespace.into(),
            name: name.into(),
            kind,
            location: None,
        }
    }
}

/// Top-level declaration in a schema
#[derive(Debug, Clone)]
pub enum SchemaElement {
    EntityType(EntityType),
    ComplexType(ComplexType),
    EnumType(EnumType),
    TypeDefinition(TypeDefinition),
    Term(Term),
    /// Action or function; see [`Operation::kind`]
    Operation(Operation),
    EntityContainer(EntityContainer),
    Custom(CustomElement),
}

impl SchemaElement {
    pub fn id(&self) -> NodeId {
        match self {
            Self::EntityType(e) => e.structure.id,
            Self::ComplexType(e) => e.structure.id,
            Self::EnumType(e) => e.id,
            Self::TypeDefinition(e) => e.id,
            Self::Term(e) => e.id,
            Self::Operation(e) => e.id,
            Self::EntityContainer(e) => e.id,
            Self::Custom(e) => e.id,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::EntityType(e) => &e.structure.namespace,
            Self::ComplexType(e) => &e.structure.namespace,
            Self::EnumType(e) => &e.namespace,
            Self::TypeDefinition(e) => &e.namespace,
            Self::Term(e) => &e.namespace,
            Self::Operation(e) => &e.namespace,
            Self::EntityContainer(e) => &e.namespace,
            Self::Custom(e) => &e.namespace,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::EntityType(e) => &e.structure.name,
            Self::ComplexType(e) => &e.structure.name,
            Self::EnumType(e) => &e.name,
            Self::TypeDefinition(e) => &e.name,
            Self::Term(e) => &e.name,
            Self::Operation(e) => &e.name,
            Self::EntityContainer(e) => &e.name,
            Self::Custom(e) => &e.name,
        }
    }

    pub fn full_name(&self) -> String {
        qualify(self.namespace(), self.name())
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::EntityType(_) => ElementKind::EntityType,
            Self::ComplexType(_) => ElementKind::ComplexType,
            Self::EnumType(_) => ElementKind::EnumType,
            Self::TypeDefinition(_) => ElementKind::TypeDefinition,
            Self::Term(_) => ElementKind::Term,
            Self::Operation(op) => match op.kind {
                OperationKind::Action => ElementKind::Action,
                OperationKind::Function => ElementKind::Function,
            },
            Self::EntityContainer(_) => ElementKind::EntityContainer,
            Self::Custom(e) => e.kind,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::EntityType(e) => e.structure.location.as_ref(),
            Self::ComplexType(e) => e.structure.location.as_ref(),
            Self::EnumType(e) => e.location.as_ref(),
            Self::TypeDefinition(e) => e.location.as_ref(),
            Self::Term(e) => e.location.as_ref(),
            Self::Operation(e) => e.location.as_ref(),
            Self::EntityContainer(e) => e.location.as_ref(),
            Self::Custom(e) => e.location.as_ref(),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Shared structure of entity and complex types
    pub fn as_structured(&self) -> Option<&StructuredType> {
        match self {
            Self::EntityType(e) => Some(&e.structure),
            Self::ComplexType(e) => Some(&e.structure),
            _ => None,
        }
    }

    pub fn as_entity_type(&self) -> Option<&EntityType> {
        match self {
            Self::EntityType(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_complex_type(&self) -> Option<&ComplexType> {
        match self {
            Self::ComplexType(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_enum_type(&self) -> Option<&EnumType> {
        match self {
            Self::EnumType(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_type_definition(&self) -> Option<&TypeDefinition> {
        match self {
            Self::TypeDefinition(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Self::Term(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&EntityContainer> {
        match self {
            Self::EntityContainer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EntityType> for SchemaElement {
    fn from(e: EntityType) -> Self {
        Self::EntityType(e)
    }
}

impl From<ComplexType> for SchemaElement {
    fn from(e: ComplexType) -> Self {
        Self::ComplexType(e)
    }
}

impl From<EnumType> for SchemaElement {
    fn from(e: EnumType) -> Self {
        Self::EnumType(e)
    }
}

impl From<TypeDefinition> for SchemaElement {
    fn from(e: TypeDefinition) -> Self {
        Self::TypeDefinition(e)
    }
}

impl From<Term> for SchemaElement {
    fn from(e: Term) -> Self {
        Self::Term(e)
    }
}

impl From<Operation> for SchemaElement {
    fn from(e: Operation) -> Self {
        Self::Operation(e)
    }
}

impl From<EntityContainer> for SchemaElement {
    fn from(e: EntityContainer) -> Self {
        Self::EntityContainer(e)
    }
}

impl From<CustomElement> for SchemaElement {
    fn from(e: CustomElement) -> Self {
        Self::Custom(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_increase() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert!(b > a);
    }

    #[test]
    fn test_element_kind_dispatch() {
        let element: SchemaElement = Operation::function("NS", "F").into();
        assert_eq!(element.kind(), ElementKind::Function);
        assert!(element.kind().is_operation());
        assert_eq!(element.full_name(), "NS.F");

        let custom: SchemaElement = CustomElement::new("NS", "X", ElementKind::ComplexType).into();
        assert!(custom.is_custom());
        assert!(custom.kind().is_type());
        assert!(custom.as_structured().is_none());
    }

    #[test]
    fn test_enum_member_values() {
        let color = EnumType::new("NS", "Color")
            .with_member("Red", None)
            .with_member("Green", Some(10))
            .with_member("Blue", None);

        let values: Vec<i64> = color.member_values().iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 10, 11]);
        assert_eq!(color.underlying_kind(), Some(PrimitiveKind::Int32));
    }

    #[test]
    fn test_type_definition_underlying_kind() {
        let def = TypeDefinition::new("NS", "Weight", "Edm.Decimal");
        assert_eq!(def.underlying_kind(), Some(PrimitiveKind::Decimal));

        let bad = TypeDefinition::new("NS", "Wrapped", "NS.Other");
        assert_eq!(bad.underlying_kind(), None);
    }
}
