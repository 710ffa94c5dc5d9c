#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! # edm-binding
//!
//! Name binding for EDM models.
//!
//! Resolution is computed on every query from the current contents of the
//! model and its references, so it never goes stale after further
//! mutation. Several elements sharing a name bind as [`Binding::Ambiguous`]
//! rather than failing.

pub mod binding;
pub mod extends;
pub mod partner;
pub mod resolver;
pub mod structure;
pub mod target;
pub mod types;

pub use binding::Binding;
pub use partner::{PartnerBinding, SynthesizedPartner};
pub use resolver::Resolver;
pub use target::{BadTarget, BadTargetKind, ResolvedTarget};
pub use types::{AbstractType, ResolvedType, primitive_promotes};

use edm_model::{EdmError, EdmErrorCode};
use thiserror::Error;

/// Errors raised while walking inheritance or `Extends` chains
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Cyclic entity container: {container} ({})", chain.join(" -> "))]
    CyclicContainer { container: String, chain: Vec<String> },

    #[error("Cyclic base type: {type_name}")]
    CyclicBaseType { type_name: String },
}

impl Error {
    /// Diagnostic record for the validator
    pub fn to_edm_error(&self) -> EdmError {
        let code = match self {
            Self::CyclicContainer { .. } => EdmErrorCode::BadCyclicEntityContainer,
            Self::CyclicBaseType { .. } => EdmErrorCode::BadCyclicEntity,
        };
        EdmError::new(code, self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
