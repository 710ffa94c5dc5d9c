#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! # edm-model
//!
//! In-memory representation of an Entity Data Model.
//!
//! This crate holds the type system (primitive kinds, type references and
//! facets), schema elements (entity, complex and enum types, type
//! definitions, terms, operations and containers), vocabulary and direct
//! annotations, and the annotation expression tree. Names between elements
//! are stored as qualified strings and bound on demand by `edm-binding`.

/// Vocabulary annotations and the direct annotation store.
pub mod annotation;
/// Constant expression values and literal forms.
pub mod constant;
/// Entity containers, entity sets, singletons and imports.
pub mod container;
/// Schema element union and simple element kinds.
pub mod element;
/// Diagnostic codes and error records.
pub mod error;
/// Annotation expression tree and labeled elements.
pub mod expression;
/// Source positions of parsed nodes.
pub mod location;
/// The model container.
pub mod model;
/// Identifier and qualified-name rules.
pub mod names;
/// Actions and functions.
pub mod operation;
/// Entity and complex types with their properties.
pub mod structured;
/// Annotation target paths.
pub mod target;
/// Primitive kinds, core model, facets and type references.
pub mod types;
/// EDM version tags.
pub mod version;

pub use annotation::{
    AnnotationKey, AnnotationValue, DirectAnnotationStore, SerializationLocation,
    VocabularyAnnotation,
};
pub use constant::{Constant, ConstantKind};
pub use container::{
    ContainerElement, EntityContainer, EntitySet, NavigationPropertyBinding, OperationImport,
    Singleton,
};
pub use element::{
    CustomElement, ElementKind, EnumMember, EnumType, NodeId, SchemaElement, Term, TypeDefinition,
};
pub use error::{EdmError, EdmErrorCode, ErrorCategory};
pub use expression::{
    CollectionExpression, Expression, ExpressionKind, FunctionApplication, IfExpression,
    LabelHandle, LabeledElement, LabeledElementArena, LabeledElementReference, PathExpression,
    PropertyValue, RecordExpression, TypeAssertion,
};
pub use location::SourceLocation;
pub use model::{DocumentReference, IncludeAnnotations, Model, ReferenceInclude, SchemaNamespace};
pub use operation::{Operation, OperationKind, Parameter, ReturnType};
pub use structured::{
    ComplexType, EntityType, Multiplicity, NavigationProperty, OnDeleteAction, Property,
    PropertyRef, ReferentialConstraint, StructuralProperty, StructuredType,
};
pub use target::TargetPath;
pub use types::{
    CoreModel, EDM_NAMESPACE, EdmType, Facets, MaxLength, PrimitiveKind, Scale, Srid,
    TypeReference,
};
pub use version::EdmVersion;

use thiserror::Error;

/// Misuse of the model API
///
/// These are programming errors on the caller's side. Problems in a model's
/// content are reported as [`EdmError`] diagnostics instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("{what} must not be empty")]
    EmptyName { what: &'static str },

    #[error("facet {facet} is not applicable to {type_name}")]
    FacetNotApplicable {
        facet: &'static str,
        type_name: String,
    },

    #[error("labeled element reference '{name}' is already bound")]
    LabeledElementAlreadyBound { name: String },

    #[error("annotation {namespace}:{name} does not hold a value of type {expected}")]
    AnnotationTypeMismatch {
        namespace: String,
        name: String,
        expected: &'static str,
    },

    #[error("invalid target path '{path}': {reason}")]
    InvalidTargetPath { path: String, reason: String },

    #[error("unsupported EDM version '{0}'")]
    UnsupportedVersion(String),
}

/// Crate-local result type for model API calls.
pub type Result<T> = std::result::Result<T, ContractError>;
