#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]

//! # edm-expr
//!
//! Evaluation and type-checking of annotation expressions.
//!
//! The [`Evaluator`] reduces an expression to a [`Value`] using caller
//! supplied native functions; the [`TypeChecker`] compares an expression with
//! the type a term or property asserts for it.

pub mod evaluator;
pub mod functions;
pub mod typecheck;
pub mod typing;
pub mod value;

pub use evaluator::{EvaluationContext, Evaluator};
pub use functions::{FunctionRegistry, NativeFunction};
pub use typecheck::TypeChecker;
pub use value::{StructuredValue, Value};

use edm_model::{EdmError, EdmErrorCode};
use thiserror::Error;

/// Errors that can occur during evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed expression ({} errors)", .0.len())]
    Malformed(Vec<EdmError>),

    #[error("Function not registered: {0}")]
    FunctionNotRegistered(String),

    #[error("Function {function} failed: {reason}")]
    FunctionFailed { function: String, reason: String },

    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Cannot cast {value} to {target}")]
    InvalidCast { value: String, target: String },

    #[error("Path {0} evaluated without a current value")]
    NoContext(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Unbound labeled element reference: {0}")]
    UnboundLabeledElement(String),

    #[error("Cyclic labeled element: {0}")]
    CyclicLabeledElement(String),
}

impl Error {
    /// Diagnostic records describing this failure
    pub fn to_edm_errors(&self) -> Vec<EdmError> {
        let code = match self {
            Self::Malformed(errors) => return errors.clone(),
            Self::FunctionNotRegistered(_) => EdmErrorCode::FunctionNotRegistered,
            Self::FunctionFailed { .. } => EdmErrorCode::FunctionArgumentsMismatch,
            Self::TypeMismatch { .. } => EdmErrorCode::ExpressionNotValidForTheAssertedType,
            Self::InvalidCast { .. } => EdmErrorCode::InvalidCast,
            Self::NoContext(_) | Self::PathNotFound(_) => {
                EdmErrorCode::PathIsNotValidForTheGivenContext
            }
            Self::UnboundLabeledElement(_) => EdmErrorCode::BadUnresolvedLabeledElement,
            Self::CyclicLabeledElement(_) => EdmErrorCode::CyclicLabeledElement,
        };
        vec![EdmError::new(code, self.to_string())]
    }
}

pub type Result<T> = std::result::Result<T, Error>;
