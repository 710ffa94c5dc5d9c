//! Resolved types and the assignability relation between them

use crate::resolver::Resolver;
use edm_model::{
    ComplexType, EntityType, EnumType, PrimitiveKind, SchemaElement, StructuredType,
    TypeDefinition, TypeReference,
};

/// Built-in abstract types outside the primitive catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractType {
    Untyped,
    EntityType,
    ComplexType,
    AnnotationPath,
    PropertyPath,
    NavigationPropertyPath,
    AnyPropertyPath,
    ModelElementPath,
}

impl AbstractType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Edm.Untyped" => Some(Self::Untyped),
            "Edm.EntityType" => Some(Self::EntityType),
            "Edm.ComplexType" => Some(Self::ComplexType),
            "Edm.AnnotationPath" => Some(Self::AnnotationPath),
            "Edm.PropertyPath" => Some(Self::PropertyPath),
            "Edm.NavigationPropertyPath" => Some(Self::NavigationPropertyPath),
            "Edm.AnyPropertyPath" => Some(Self::AnyPropertyPath),
            "Edm.ModelElementPath" => Some(Self::ModelElementPath),
            _ => None,
        }
    }

    pub fn is_path(self) -> bool {
        !matches!(self, Self::Untyped | Self::EntityType | Self::ComplexType)
    }
}

/// A type reference after name binding
#[derive(Debug, Clone)]
pub enum ResolvedType<'m> {
    Primitive(PrimitiveKind),
    Entity(&'m EntityType),
    Complex(&'m ComplexType),
    Enum(&'m EnumType),
    Definition(&'m TypeDefinition),
    Collection(Box<ResolvedType<'m>>),
    EntityReference(&'m EntityType),
    Abstract(AbstractType),
    /// Custom element declared with a type kind
    Opaque(&'m SchemaElement),
    /// Name that did not bind
    Unresolved(String),
}

impl<'m> ResolvedType<'m> {
    /// Whether this type or its element type failed to bind
    pub fn is_unresolved(&self) -> bool {
        match self {
            Self::Unresolved(_) => true,
            Self::Collection(element) => element.is_unresolved(),
            _ => false,
        }
    }

    /// Name that failed to bind
    pub fn unresolved_name(&self) -> Option<&str> {
        match self {
            Self::Unresolved(name) => Some(name),
            Self::Collection(element) => element.unresolved_name(),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&'m StructuredType> {
        match self {
            Self::Entity(e) => Some(&e.structure),
            Self::Complex(c) => Some(&c.structure),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&'m EntityType> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Element type of a collection, or `self`
    pub fn element(&self) -> &ResolvedType<'m> {
        match self {
            Self::Collection(element) => element,
            _ => self,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Primitive kind, looking through type definitions
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            Self::Definition(d) => d.underlying_kind(),
            _ => None,
        }
    }

    /// Primitive, enum or type definition
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::Enum(_) | Self::Definition(_))
    }
}

/// Whether a value of primitive kind `from` may be used where `to` is expected
pub fn primitive_promotes(from: PrimitiveKind, to: PrimitiveKind) -> bool {
    use PrimitiveKind as P;
    if from == to || to == P::PrimitiveType {
        return true;
    }
    match from {
        P::Byte | P::SByte => matches!(
            to,
            P::Int16 | P::Int32 | P::Int64 | P::Single | P::Double | P::Decimal
        ),
        P::Int16 => matches!(to, P::Int32 | P::Int64 | P::Single | P::Double | P::Decimal),
        P::Int32 => matches!(to, P::Int64 | P::Single | P::Double | P::Decimal),
        P::Int64 => matches!(to, P::Single | P::Double | P::Decimal),
        P::Single => to == P::Double,
        _ if from.is_geography() => to == P::Geography,
        _ if from.is_geometry() => to == P::Geometry,
        _ => false,
    }
}

impl<'m> Resolver<'m> {
    /// Whether a value of type `actual` may be used where `expected` is required
    ///
    /// Unresolved names on either side are accepted; they are reported once
    /// where they are declared.
    pub fn is_assignable(&self, expected: &TypeReference, actual: &TypeReference) -> bool {
        let expected = self.resolve_type(expected);
        let actual = self.resolve_type(actual);
        self.is_resolved_assignable(&expected, &actual)
    }

    pub fn is_resolved_assignable(
        &self,
        expected: &ResolvedType<'m>,
        actual: &ResolvedType<'m>,
    ) -> bool {
        use ResolvedType as R;
        match (expected, actual) {
            (R::Unresolved(_), _) | (_, R::Unresolved(_)) => true,
            (R::Abstract(AbstractType::Untyped), _) => true,
            (R::Abstract(AbstractType::EntityType), a) => {
                matches!(a, R::Entity(_) | R::Abstract(AbstractType::EntityType))
            }
            (R::Abstract(AbstractType::ComplexType), a) => {
                matches!(a, R::Complex(_) | R::Abstract(AbstractType::ComplexType))
            }
            (R::Abstract(e), R::Abstract(a)) => e == a,
            (R::Abstract(e), R::Primitive(PrimitiveKind::String)) => e.is_path(),
            (R::Primitive(e), R::Primitive(a)) => primitive_promotes(*a, *e),
            (R::Primitive(e), R::Definition(d)) => d
                .underlying_kind()
                .is_some_and(|kind| primitive_promotes(kind, *e)),
            (R::Definition(e), R::Definition(a)) => e.id == a.id,
            (R::Definition(e), R::Primitive(a)) => e
                .underlying_kind()
                .is_some_and(|kind| primitive_promotes(*a, kind)),
            (R::Enum(e), R::Enum(a)) => e.id == a.id,
            (R::Entity(e), R::Entity(a)) | (R::EntityReference(e), R::EntityReference(a)) => {
                self.is_derived_from(&a.structure, &e.structure)
            }
            (R::Complex(e), R::Complex(a)) => self.is_derived_from(&a.structure, &e.structure),
            (R::Collection(e), R::Collection(a)) => self.is_resolved_assignable(e, a),
            (R::Opaque(e), R::Opaque(a)) => e.id() == a.id(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{Model, StructuralProperty};

    #[test]
    fn test_primitive_promotion() {
        use PrimitiveKind as P;
        assert!(primitive_promotes(P::Byte, P::Int32));
        assert!(primitive_promotes(P::Int32, P::Decimal));
        assert!(primitive_promotes(P::Single, P::Double));
        assert!(primitive_promotes(P::GeographyPoint, P::Geography));
        assert!(primitive_promotes(P::Guid, P::PrimitiveType));
        assert!(!primitive_promotes(P::Int64, P::Int32));
        assert!(!primitive_promotes(P::Double, P::Single));
        assert!(!primitive_promotes(P::String, P::Int32));
        assert!(!primitive_promotes(P::GeometryPoint, P::Geography));
    }

    #[test]
    fn test_derived_entity_is_assignable_to_base() {
        let mut model = Model::default();
        model.add_element(EntityType::new("NS", "Base")).unwrap();
        model
            .add_element(EntityType::new("NS", "Derived").with_base_type("NS.Base"))
            .unwrap();
        let resolver = Resolver::new(&model);

        let base = TypeReference::named("NS.Base", true);
        let derived = TypeReference::named("NS.Derived", true);
        assert!(resolver.is_assignable(&base, &derived));
        assert!(!resolver.is_assignable(&derived, &base));
    }

    #[test]
    fn test_collections_and_definitions() {
        let mut model = Model::default();
        model
            .add_element(TypeDefinition::new("NS", "Money", "Edm.Decimal"))
            .unwrap();
        model
            .add_element(
                ComplexType::new("NS", "Price").with_property(StructuralProperty::new(
                    "Amount",
                    TypeReference::named("NS.Money", false),
                )),
            )
            .unwrap();
        let resolver = Resolver::new(&model);

        let ints = TypeReference::collection(TypeReference::primitive(PrimitiveKind::Int32, true));
        let longs = TypeReference::collection(TypeReference::primitive(PrimitiveKind::Int64, true));
        assert!(resolver.is_assignable(&longs, &ints));
        assert!(!resolver.is_assignable(&ints, &longs));

        let money = TypeReference::named("NS.Money", true);
        let int = TypeReference::primitive(PrimitiveKind::Int32, true);
        assert!(resolver.is_assignable(&money, &int));
        assert!(!resolver.is_assignable(&money, &TypeReference::named("NS.Price", true)));
    }
}
