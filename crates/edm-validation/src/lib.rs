#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! # edm-validation
//!
//! Versioned semantic validation of EDM models.
//!
//! A [`RuleSet`] is selected by EDM version. The [`ValidationEngine`] walks
//! every element of a model once and applies the rules for its kind,
//! collecting every error instead of stopping at the first one. Validation
//! only reads the model.
//!
//! ## Example Usage
//!
//! ```rust
//! use edm_model::{EntityType, Model, PrimitiveKind, StructuralProperty, TypeReference};
//! use edm_validation::ValidationEngine;
//!
//! let mut model = Model::default();
//! model
//!     .add_element(
//!         EntityType::new("NS", "Customer")
//!             .with_key(["Id"])
//!             .with_property(StructuralProperty::new(
//!                 "Id",
//!                 TypeReference::primitive(PrimitiveKind::Int32, false),
//!             )),
//!     )
//!     .unwrap();
//!
//! let result = ValidationEngine::new().validate(&model).unwrap();
//! assert!(result.is_valid);
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;

pub use engine::{ValidationConfig, ValidationContext, ValidationEngine, ValidationResult};
pub use reporter::ValidationReport;
pub use rules::{Check, Rule, RuleSet};

use edm_model::Model;
use thiserror::Error;

/// Errors that can occur when running validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown validation rule: {0}")]
    UnknownRule(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Validate a model with default settings
///
/// # Errors
///
/// Never fails with the default configuration; see [`ValidationEngine::validate`].
pub fn validate(model: &Model) -> Result<ValidationResult> {
    ValidationEngine::new().validate(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{EdmErrorCode, EntityContainer};

    #[test]
    fn test_convenience_validate() {
        let model = Model::default();
        let result = validate(&model).unwrap();
        assert!(result.is_valid);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_convenience_validate_reports_errors() {
        let mut model = Model::default();
        model.add_element(EntityContainer::new("NS", "A")).unwrap();
        model.add_element(EntityContainer::new("NS", "B")).unwrap();

        let result = validate(&model).unwrap();
        assert!(!result.is_valid);
        assert!(result.has_code(EdmErrorCode::MultipleEntityContainers));
    }
}
