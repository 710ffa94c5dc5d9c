//! Diagnostic codes and the structured error record shared by every layer
//!
//! Parsing, binding, validation and serialization all report problems as
//! [`EdmError`] values. Each carries a stable [`EdmErrorCode`], a human
//! readable message and, when the node came from a document, its location.

use crate::location::SourceLocation;
use serde::Serialize;
use std::fmt;

/// Broad class an error code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorCategory {
    /// The document could not be read as CSDL
    Structural,
    /// A name or path did not bind to exactly one element
    Resolution,
    /// The model is well formed but breaks an EDM rule
    Semantic,
    /// The model cannot be written out
    Serialization,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Stable identifier for every diagnostic the library can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EdmErrorCode {
    // Document structure
    XmlError,
    UnexpectedXmlElement,
    UnexpectedXmlAttribute,
    MissingAttribute,
    InvalidAttributeValue,
    InvalidVersionNumber,
    IncompatibleVersions,

    // Constant literals
    InvalidBinary,
    InvalidBoolean,
    InvalidDate,
    InvalidDateTimeOffset,
    InvalidDecimal,
    InvalidDuration,
    InvalidFloatingPoint,
    InvalidGuid,
    InvalidInteger,
    InvalidTimeOfDay,

    // Name binding
    AmbiguousElementBinding,
    BadUnresolvedType,
    BadUnresolvedTerm,
    BadUnresolvedTarget,
    BadUnresolvedOperation,
    BadUnresolvedProperty,
    BadUnresolvedEntitySet,
    BadUnresolvedEntityContainer,
    BadUnresolvedNavigationPropertyPartner,
    BadUnresolvedNavigationPropertyPath,
    BadUnresolvedLabeledElement,
    BadCyclicEntityContainer,
    BadCyclicEntity,
    BadCyclicComplex,
    CyclicLabeledElement,

    // Model semantics
    AlreadyDefined,
    MultipleEntityContainers,
    InvalidName,
    InvalidNamespaceName,
    NameTooLong,
    InvalidMemberNameMatchesTypeName,
    EntityMustHaveEntityBaseType,
    ComplexTypeMustHaveComplexBaseType,
    InvalidKey,
    EntityKeyMustBeScalar,
    FacetNotApplicable,
    InvalidNavigationPropertyType,
    NavigationPartnerMismatch,
    InvalidMultiplicityOfPrincipalEnd,
    TypeMismatchRelationshipConstraint,
    NavigationPropertyWithNonRecursiveContainmentSourceMustBeFromOne,
    NavigationPropertyWithRecursiveContainmentSourceMustBeFromZeroOrOne,
    NavigationPropertyWithRecursiveContainmentTargetMustBeOptional,
    NavigationPropertyEntityMustNotIndirectlyContainItself,
    EnumMustHaveIntegerUnderlyingType,
    EnumMemberValueOutOfRange,
    TypeDefinitionUnderlyingTypeMustBePrimitive,
    BoundOperationMustHaveParameters,
    FunctionMustHaveReturnType,
    InvalidEntitySetPath,
    UnboundFunctionOverloadHasIncorrectReturnType,
    DuplicateFunctions,
    EntitySetTypeMustBeEntityType,
    EntitySetTypeHasNoKeys,
    OperationImportCannotImportBoundOperation,
    OperationImportKindMismatch,
    DuplicateAnnotation,
    InvalidQualifierName,
    AnnotationInapplicableTerm,

    // Expressions
    IntegerConstantValueOutOfRange,
    StringConstantLengthOutOfRange,
    BinaryConstantLengthOutOfRange,
    ExpressionPrimitiveKindNotValidForAssertedType,
    ExpressionNotValidForTheAssertedType,
    PrimitiveConstantExpressionNotValidForNonPrimitiveType,
    NullCannotBeAssertedToBeANonNullableType,
    RecordExpressionNotValidForNonStructuredType,
    RecordExpressionMissingRequiredProperty,
    RecordExpressionHasExtraProperties,
    CollectionExpressionNotValidForNonCollectionType,
    PathIsNotValidForTheGivenContext,
    FunctionNotRegistered,
    FunctionArgumentsMismatch,
    InvalidCast,

    // Serialization
    ReferencedTypeMustHaveValidName,
    ElementNameMustBeSimpleIdentifier,
    NamespaceNameMustBeValid,
}

impl EdmErrorCode {
    /// Category this code belongs to
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        use EdmErrorCode as C;
        match self {
            C::XmlError
            | C::UnexpectedXmlElement
            | C::UnexpectedXmlAttribute
            | C::MissingAttribute
            | C::InvalidAttributeValue
            | C::InvalidVersionNumber
            | C::IncompatibleVersions
            | C::InvalidBinary
            | C::InvalidBoolean
            | C::InvalidDate
            | C::InvalidDateTimeOffset
            | C::InvalidDecimal
            | C::InvalidDuration
            | C::InvalidFloatingPoint
            | C::InvalidGuid
            | C::InvalidInteger
            | C::InvalidTimeOfDay => ErrorCategory::Structural,

            C::AmbiguousElementBinding
            | C::BadUnresolvedType
            | C::BadUnresolvedTerm
            | C::BadUnresolvedTarget
            | C::BadUnresolvedOperation
            | C::BadUnresolvedProperty
            | C::BadUnresolvedEntitySet
            | C::BadUnresolvedEntityContainer
            | C::BadUnresolvedNavigationPropertyPartner
            | C::BadUnresolvedNavigationPropertyPath
            | C::BadUnresolvedLabeledElement
            | C::BadCyclicEntityContainer
            | C::BadCyclicEntity
            | C::BadCyclicComplex
            | C::CyclicLabeledElement => ErrorCategory::Resolution,

            C::ReferencedTypeMustHaveValidName
            | C::ElementNameMustBeSimpleIdentifier
            | C::NamespaceNameMustBeValid => ErrorCategory::Serialization,

            _ => ErrorCategory::Semantic,
        }
    }
}

impl fmt::Display for EdmErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdmError {
    /// Stable code
    pub code: EdmErrorCode,

    /// Human-readable message
    pub message: String,

    /// Where the offending node was declared, if known
    pub location: Option<SourceLocation>,
}

impl EdmError {
    /// Create a new error without location
    pub fn new(code: EdmErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a source location
    #[must_use]
    pub fn at(mut self, location: Option<&SourceLocation>) -> Self {
        self.location = location.cloned();
        self
    }

    /// Category of this error's code
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Display for EdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EdmError {}
