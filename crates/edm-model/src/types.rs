//! Primitive kinds, the built-in core model, facets and type references
//!
//! A [`TypeReference`] names a type by value: a primitive kind, a
//! qualified schema type, a collection of another reference, or an entity
//! reference. Named types are resolved on demand through the binding layer,
//! so references stay valid regardless of the order elements are added in.

use crate::{ContractError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Namespace of the built-in core model
pub const EDM_NAMESPACE: &str = "Edm";

/// Built-in primitive type kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    Stream,
    String,
    TimeOfDay,
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyMultiPoint,
    GeographyMultiLineString,
    GeographyMultiPolygon,
    GeographyCollection,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryMultiPoint,
    GeometryMultiLineString,
    GeometryMultiPolygon,
    GeometryCollection,
    /// Abstract `Edm.PrimitiveType`
    PrimitiveType,
}

impl PrimitiveKind {
    /// Every primitive kind in declaration order
    pub const ALL: [Self; 34] = [
        Self::Binary,
        Self::Boolean,
        Self::Byte,
        Self::Date,
        Self::DateTimeOffset,
        Self::Decimal,
        Self::Double,
        Self::Duration,
        Self::Guid,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::SByte,
        Self::Single,
        Self::Stream,
        Self::String,
        Self::TimeOfDay,
        Self::Geography,
        Self::GeographyPoint,
        Self::GeographyLineString,
        Self::GeographyPolygon,
        Self::GeographyMultiPoint,
        Self::GeographyMultiLineString,
        Self::GeographyMultiPolygon,
        Self::GeographyCollection,
        Self::Geometry,
        Self::GeometryPoint,
        Self::GeometryLineString,
        Self::GeometryPolygon,
        Self::GeometryMultiPoint,
        Self::GeometryMultiLineString,
        Self::GeometryMultiPolygon,
        Self::GeometryCollection,
        Self::PrimitiveType,
    ];

    /// Simple name within the `Edm` namespace
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Date => "Date",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::Duration => "Duration",
            Self::Guid => "Guid",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::SByte => "SByte",
            Self::Single => "Single",
            Self::Stream => "Stream",
            Self::String => "String",
            Self::TimeOfDay => "TimeOfDay",
            Self::Geography => "Geography",
            Self::GeographyPoint => "GeographyPoint",
            Self::GeographyLineString => "GeographyLineString",
            Self::GeographyPolygon => "GeographyPolygon",
            Self::GeographyMultiPoint => "GeographyMultiPoint",
            Self::GeographyMultiLineString => "GeographyMultiLineString",
            Self::GeographyMultiPolygon => "GeographyMultiPolygon",
            Self::GeographyCollection => "GeographyCollection",
            Self::Geometry => "Geometry",
            Self::GeometryPoint => "GeometryPoint",
            Self::GeometryLineString => "GeometryLineString",
            Self::GeometryPolygon => "GeometryPolygon",
            Self::GeometryMultiPoint => "GeometryMultiPoint",
            Self::GeometryMultiLineString => "GeometryMultiLineString",
            Self::GeometryMultiPolygon => "GeometryMultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
            Self::PrimitiveType => "PrimitiveType",
        }
    }

    /// Qualified name, e.g. `Edm.Int32`
    #[must_use]
    pub fn qualified_name(self) -> String {
        format!("{EDM_NAMESPACE}.{}", self.name())
    }

    /// Byte, SByte, Int16, Int32 or Int64
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::SByte | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Integral, Decimal, Single or Double
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, Self::Decimal | Self::Single | Self::Double)
    }

    #[must_use]
    pub const fn is_geography(self) -> bool {
        matches!(
            self,
            Self::Geography
                | Self::GeographyPoint
                | Self::GeographyLineString
                | Self::GeographyPolygon
                | Self::GeographyMultiPoint
                | Self::GeographyMultiLineString
                | Self::GeographyMultiPolygon
                | Self::GeographyCollection
        )
    }

    #[must_use]
    pub const fn is_geometry(self) -> bool {
        matches!(
            self,
            Self::Geometry
                | Self::GeometryPoint
                | Self::GeometryLineString
                | Self::GeometryPolygon
                | Self::GeometryMultiPoint
                | Self::GeometryMultiLineString
                | Self::GeometryMultiPolygon
                | Self::GeometryCollection
        )
    }

    #[must_use]
    pub const fn is_spatial(self) -> bool {
        self.is_geography() || self.is_geometry()
    }

    /// Inclusive value range of an integral kind
    #[must_use]
    pub const fn integral_range(self) -> Option<(i64, i64)> {
        match self {
            Self::Byte => Some((0, 255)),
            Self::SByte => Some((-128, 127)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Default SRID for spatial kinds
    #[must_use]
    pub const fn default_srid(self) -> Option<i32> {
        if self.is_geography() {
            Some(4326)
        } else if self.is_geometry() {
            Some(0)
        } else {
            None
        }
    }

    pub(crate) const fn supports_max_length(self) -> bool {
        matches!(self, Self::Binary | Self::String | Self::Stream)
    }

    pub(crate) const fn supports_unicode(self) -> bool {
        matches!(self, Self::String)
    }

    pub(crate) const fn supports_precision(self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::DateTimeOffset | Self::Duration | Self::TimeOfDay
        )
    }

    pub(crate) const fn supports_scale(self) -> bool {
        matches!(self, Self::Decimal)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{EDM_NAMESPACE}.{}", self.name())
    }
}

/// Built-in model holding the `Edm` primitive types
///
/// A single process-wide instance is shared by every [`crate::Model`].
#[derive(Debug)]
pub struct CoreModel {
    primitives: HashMap<String, PrimitiveKind>,
}

static CORE_MODEL: LazyLock<CoreModel> = LazyLock::new(CoreModel::build);

impl CoreModel {
    fn build() -> Self {
        let primitives = PrimitiveKind::ALL
            .iter()
            .map(|kind| (kind.qualified_name(), *kind))
            .collect();
        Self { primitives }
    }

    /// The shared instance
    pub fn instance() -> &'static Self {
        &CORE_MODEL
    }

    /// Look up a primitive kind by qualified name
    #[must_use]
    pub fn primitive(&self, qualified_name: &str) -> Option<PrimitiveKind> {
        self.primitives.get(qualified_name).copied()
    }

    /// Whether `qualified_name` lives in the `Edm` namespace
    #[must_use]
    pub fn is_core_name(&self, qualified_name: &str) -> bool {
        qualified_name
            .strip_prefix(EDM_NAMESPACE)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Every primitive kind known to the core model
    pub fn primitives(&self) -> impl Iterator<Item = PrimitiveKind> + '_ {
        PrimitiveKind::ALL.iter().copied()
    }
}

/// `MaxLength` facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxLength {
    Bounded(u32),
    Max,
}

impl fmt::Display for MaxLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Max => f.write_str("max"),
        }
    }
}

impl MaxLength {
    /// Parse the attribute form
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("max") {
            Some(Self::Max)
        } else {
            text.parse().ok().map(Self::Bounded)
        }
    }
}

/// `Scale` facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scale {
    Fixed(u32),
    Variable,
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Variable => f.write_str("variable"),
        }
    }
}

impl Scale {
    /// Parse the attribute form
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "variable" | "floating" => Some(Self::Variable),
            _ => text.parse().ok().map(Self::Fixed),
        }
    }
}

/// `SRID` facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Srid {
    Fixed(i32),
    Variable,
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Variable => f.write_str("variable"),
        }
    }
}

impl Srid {
    /// Parse the attribute form
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("variable") {
            Some(Self::Variable)
        } else {
            text.parse().ok().map(Self::Fixed)
        }
    }
}

/// Facets carried by a type reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Facets {
    pub max_length: Option<MaxLength>,
    pub precision: Option<u32>,
    pub scale: Option<Scale>,
    pub unicode: Option<bool>,
    pub srid: Option<Srid>,
}

impl Facets {
    /// No facet set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Name of the first set facet that `kind` does not support
    #[must_use]
    pub fn first_inapplicable(&self, kind: PrimitiveKind) -> Option<&'static str> {
        if self.max_length.is_some() && !kind.supports_max_length() {
            return Some("MaxLength");
        }
        if self.unicode.is_some() && !kind.supports_unicode() {
            return Some("Unicode");
        }
        if self.precision.is_some() && !kind.supports_precision() {
            return Some("Precision");
        }
        if self.scale.is_some() && !kind.supports_scale() {
            return Some("Scale");
        }
        if self.srid.is_some() && !kind.is_spatial() {
            return Some("SRID");
        }
        None
    }
}

/// The referenced type, without nullability
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdmType {
    Primitive(PrimitiveKind),
    /// Qualified name of a schema type, bound lazily
    Named(String),
    Collection(Box<TypeReference>),
    /// `Ref(Namespace.Entity)`
    EntityReference(String),
}

impl EdmType {
    /// Parse a `Type` attribute value
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(inner) = text
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::Collection(Box::new(TypeReference::new(Self::parse(inner), true)));
        }
        if let Some(inner) = text
            .strip_prefix("Ref(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::EntityReference(inner.trim().to_string());
        }
        match CoreModel::instance().primitive(text) {
            Some(kind) => Self::Primitive(kind),
            None => Self::Named(text.to_string()),
        }
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Named(name) => f.write_str(name),
            Self::Collection(element) => write!(f, "Collection({})", element.ty),
            Self::EntityReference(name) => write!(f, "Ref({name})"),
        }
    }
}

/// A use of a type: the type itself, nullability and facets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    ty: EdmType,
    nullable: bool,
    facets: Facets,
}

impl TypeReference {
    /// Create a new reference without facets
    #[must_use]
    pub fn new(ty: EdmType, nullable: bool) -> Self {
        Self {
            ty,
            nullable,
            facets: Facets::default(),
        }
    }

    #[must_use]
    pub fn primitive(kind: PrimitiveKind, nullable: bool) -> Self {
        Self::new(EdmType::Primitive(kind), nullable)
    }

    #[must_use]
    pub fn named(name: impl Into<String>, nullable: bool) -> Self {
        Self::new(EdmType::Named(name.into()), nullable)
    }

    /// Collection of `element`; collections themselves are never null
    #[must_use]
    pub fn collection(element: TypeReference) -> Self {
        Self::new(EdmType::Collection(Box::new(element)), false)
    }

    #[must_use]
    pub fn entity_reference(entity_type: impl Into<String>, nullable: bool) -> Self {
        Self::new(EdmType::EntityReference(entity_type.into()), nullable)
    }

    /// Parse a `Type` attribute value
    #[must_use]
    pub fn parse(text: &str, nullable: bool) -> Self {
        match EdmType::parse(text) {
            EdmType::Collection(element) => {
                Self::collection(Self::new(element.ty, nullable))
            }
            ty => Self::new(ty, nullable),
        }
    }

    #[must_use]
    pub fn ty(&self) -> &EdmType {
        &self.ty
    }

    #[must_use]
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    /// Copy with a different nullability
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Attach facets, rejecting any the referenced type cannot carry
    ///
    /// Facets on a collection apply to its element type.
    pub fn with_facets(self, facets: Facets) -> Result<Self> {
        if facets.is_empty() {
            return Ok(self);
        }
        match self.ty {
            EdmType::Collection(element) => {
                let element = (*element).with_facets(facets)?;
                Ok(Self {
                    ty: EdmType::Collection(Box::new(element)),
                    nullable: self.nullable,
                    facets: Facets::default(),
                })
            }
            EdmType::Primitive(kind) => {
                if let Some(facet) = facets.first_inapplicable(kind) {
                    return Err(ContractError::FacetNotApplicable {
                        facet,
                        type_name: kind.qualified_name(),
                    });
                }
                Ok(Self { facets, ..self })
            }
            EdmType::Named(_) => Ok(Self { facets, ..self }),
            EdmType::EntityReference(name) => Err(ContractError::FacetNotApplicable {
                facet: first_set_facet(&facets),
                type_name: format!("Ref({name})"),
            }),
        }
    }

    pub fn with_max_length(self, max_length: MaxLength) -> Result<Self> {
        let facets = Facets {
            max_length: Some(max_length),
            ..self.element_type().facets.clone()
        };
        self.with_facets(facets)
    }

    pub fn with_precision(self, precision: u32) -> Result<Self> {
        let facets = Facets {
            precision: Some(precision),
            ..self.element_type().facets.clone()
        };
        self.with_facets(facets)
    }

    pub fn with_scale(self, scale: Scale) -> Result<Self> {
        let facets = Facets {
            scale: Some(scale),
            ..self.element_type().facets.clone()
        };
        self.with_facets(facets)
    }

    pub fn with_unicode(self, unicode: bool) -> Result<Self> {
        let facets = Facets {
            unicode: Some(unicode),
            ..self.element_type().facets.clone()
        };
        self.with_facets(facets)
    }

    pub fn with_srid(self, srid: Srid) -> Result<Self> {
        let facets = Facets {
            srid: Some(srid),
            ..self.element_type().facets.clone()
        };
        self.with_facets(facets)
    }

    /// Primitive kind when the reference (not its element) is primitive
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.ty {
            EdmType::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Qualified name for named and entity reference types
    #[must_use]
    pub fn named_type(&self) -> Option<&str> {
        match &self.ty {
            EdmType::Named(name) | EdmType::EntityReference(name) => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self.ty, EdmType::Collection(_))
    }

    /// Element type of a collection, or `self`
    #[must_use]
    pub fn element_type(&self) -> &TypeReference {
        match &self.ty {
            EdmType::Collection(element) => element,
            _ => self,
        }
    }

    /// Textual type name as written in CSDL
    #[must_use]
    pub fn type_name(&self) -> String {
        self.ty.to_string()
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}

fn first_set_facet(facets: &Facets) -> &'static str {
    if facets.max_length.is_some() {
        "MaxLength"
    } else if facets.precision.is_some() {
        "Precision"
    } else if facets.scale.is_some() {
        "Scale"
    } else if facets.unicode.is_some() {
        "Unicode"
    } else {
        "SRID"
    }
}
