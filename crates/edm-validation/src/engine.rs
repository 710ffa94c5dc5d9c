//! Validation engine

use crate::rules::RuleSet;
use crate::{Error, Result};
use edm_binding::Resolver;
use edm_model::{EdmError, EdmErrorCode, EdmVersion, Model, SourceLocation};
use tracing::{debug, info};

/// Validation configuration
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    /// Version whose rule catalog is applied; the model's version when unset
    pub version: Option<EdmVersion>,

    /// Names of rules to skip
    pub disabled_rules: Vec<String>,
}

impl ValidationConfig {
    /// Validate against a specific version
    #[must_use]
    pub fn for_version(version: EdmVersion) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    /// Skip the rule called `name`
    #[must_use]
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.disabled_rules.push(name.into());
        self
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether validation passed
    pub is_valid: bool,

    /// Version the model was validated against
    pub version: EdmVersion,

    /// Errors in the order they were found
    pub errors: Vec<EdmError>,
}

impl ValidationResult {
    /// Create a new valid result
    pub fn valid(version: EdmVersion) -> Self {
        Self {
            is_valid: true,
            version,
            errors: Vec::new(),
        }
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, error: EdmError) {
        self.errors.push(error);
        self.is_valid = false;
    }

    /// Whether any error carries `code`
    pub fn has_code(&self, code: EdmErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Errors carrying `code`
    pub fn errors_with_code(&self, code: EdmErrorCode) -> impl Iterator<Item = &EdmError> {
        self.errors.iter().filter(move |e| e.code == code)
    }
}

/// State shared by the rules during one validation run
pub struct ValidationContext<'m> {
    resolver: Resolver<'m>,
    version: EdmVersion,
    errors: Vec<EdmError>,
}

impl<'m> ValidationContext<'m> {
    pub fn new(model: &'m Model, version: EdmVersion) -> Self {
        Self {
            resolver: Resolver::new(model),
            version,
            errors: Vec::new(),
        }
    }

    pub fn resolver(&self) -> Resolver<'m> {
        self.resolver
    }

    pub fn model(&self) -> &'m Model {
        self.resolver.model()
    }

    pub fn version(&self) -> EdmVersion {
        self.version
    }

    /// Record an error raised at `location`
    pub fn report(
        &mut self,
        code: EdmErrorCode,
        message: impl Into<String>,
        location: Option<&SourceLocation>,
    ) {
        self.errors.push(EdmError::new(code, message).at(location));
    }

    /// Record errors computed elsewhere; those without a location get `location`
    pub fn report_all(
        &mut self,
        errors: impl IntoIterator<Item = EdmError>,
        location: Option<&SourceLocation>,
    ) {
        for mut error in errors {
            if error.location.is_none() {
                error.location = location.cloned();
            }
            self.errors.push(error);
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn into_errors(self) -> Vec<EdmError> {
        self.errors
    }
}

/// Main validation engine
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Create a new validation engine
    pub fn new() -> Self {
        Self {
            config: ValidationConfig::default(),
        }
    }

    /// Create with specific configuration
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a complete model
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRule`] when the configuration disables a rule
    /// the selected catalog does not know. Problems in the model itself are
    /// reported in the result, never as an error.
    pub fn validate(&self, model: &Model) -> Result<ValidationResult> {
        let version = self.config.version.unwrap_or_else(|| model.version());
        let mut rules = RuleSet::for_version(version);
        for name in &self.config.disabled_rules {
            if !rules.disable(name) && !RuleSet::knows(name) {
                return Err(Error::UnknownRule(name.clone()));
            }
        }
        debug!(version = %version, rules = rules.len(), "selected rule set");

        let mut context = ValidationContext::new(model, version);
        rules.run(&mut context);

        let mut result = ValidationResult::valid(version);
        for error in context.into_errors() {
            result.add_error(error);
        }
        info!(
            version = %version,
            errors = result.errors.len(),
            "validation finished"
        );
        Ok(result)
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}
