//! Reader and writer settings

use edm_model::EdmVersion;

/// Configuration for [`crate::CsdlReader`]
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    /// Version assumed for bare `<Schema>` documents without an `edmx:Edmx` wrapper
    pub default_version: EdmVersion,

    /// Names used in source locations, by document position
    pub source_names: Vec<String>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            default_version: EdmVersion::LATEST,
            source_names: Vec::new(),
        }
    }
}

impl ReaderSettings {
    /// Name of the `index`th document, if one was given
    pub fn source_name(&self, index: usize) -> Option<&str> {
        self.source_names.get(index).map(String::as_str)
    }
}

/// Configuration for [`crate::CsdlWriter`]
#[derive(Debug, Clone)]
pub struct WriterSettings {
    /// Version written to `edmx:Edmx`; the model's version when unset
    pub version: Option<EdmVersion>,

    /// Spaces per nesting level; 0 writes compact output
    pub indent: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            version: None,
            indent: 2,
        }
    }
}
