#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! # edm-csdl
//!
//! CSDL XML reader and writer for EDM models.
//!
//! The reader turns one or more CSDL documents into a single [`Model`]:
//! every document is read into provisional elements first, then one
//! resolution pass binds deferred references across the whole unit.
//! Dangling references never fail a read; they are reported alongside the
//! model. Only structural problems (malformed XML, unexpected elements or
//! attributes, bad versions) make [`CsdlReader::read`] fail.
//!
//! The writer emits one document per namespace and refuses to write a
//! model whose names cannot be expressed in CSDL.
//!
//! [`Model`]: edm_model::Model

pub mod reader;
pub mod settings;
pub mod syntax;
pub mod writer;

pub use reader::{CsdlReader, ParseOutcome};
pub use settings::{ReaderSettings, WriterSettings};
pub use writer::{CsdlDocument, CsdlWriter};

use edm_model::EdmError;
use thiserror::Error;

/// Structural errors that stopped a read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("CSDL could not be read: {}", summarize(.errors))]
pub struct ParseFailure {
    pub errors: Vec<EdmError>,
}

/// Serialization-blocking errors; no document was produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("model cannot be written as CSDL: {}", summarize(.errors))]
pub struct SerializationFailure {
    pub errors: Vec<EdmError>,
}

/// Errors that can occur when reading or writing CSDL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Serialization(#[from] SerializationFailure),

    #[error("XML output error: {0}")]
    Output(String),
}

impl Error {
    /// Diagnostics carried by the failure
    pub fn errors(&self) -> &[EdmError] {
        match self {
            Self::Parse(failure) => &failure.errors,
            Self::Serialization(failure) => &failure.errors,
            Self::Output(_) => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn summarize(errors: &[EdmError]) -> String {
    match errors {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
