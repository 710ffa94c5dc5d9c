//! Validation reporting
//!
//! Groups the errors of a [`ValidationResult`] by code for display or export.

use crate::engine::ValidationResult;
use crate::Result;
use edm_model::{EdmError, EdmErrorCode, ErrorCategory};
use serde::Serialize;
use std::fmt;

/// Errors sharing one code
#[derive(Debug, Clone, Serialize)]
pub struct ErrorGroup {
    pub code: EdmErrorCode,
    pub category: ErrorCategory,
    pub count: usize,
    pub errors: Vec<EdmError>,
}

/// Errors grouped by code, in the order each code was first reported
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub version: String,
    pub is_valid: bool,
    pub total: usize,
    pub groups: Vec<ErrorGroup>,
}

impl ValidationReport {
    pub fn from_result(result: &ValidationResult) -> Self {
        let mut groups: Vec<ErrorGroup> = Vec::new();
        for error in &result.errors {
            match groups.iter_mut().find(|group| group.code == error.code) {
                Some(group) => {
                    group.count += 1;
                    group.errors.push(error.clone());
                }
                None => groups.push(ErrorGroup {
                    code: error.code,
                    category: error.category(),
                    count: 1,
                    errors: vec![error.clone()],
                }),
            }
        }

        Self {
            version: result.version.to_string(),
            is_valid: result.is_valid,
            total: result.errors.len(),
            groups,
        }
    }

    /// Number of errors with `code`
    pub fn count(&self, code: EdmErrorCode) -> usize {
        self.groups
            .iter()
            .find(|group| group.code == code)
            .map_or(0, |group| group.count)
    }

    /// Number of errors in `category`
    pub fn category_count(&self, category: ErrorCategory) -> usize {
        self.groups
            .iter()
            .filter(|group| group.category == category)
            .map(|group| group.count)
            .sum()
    }

    /// One-line summary such as `EDM 4.0: 3 errors (2 InvalidKey, 1 BadUnresolvedType)`
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return format!("EDM {}: valid", self.version);
        }
        let codes: Vec<String> = self
            .groups
            .iter()
            .map(|group| format!("{} {}", group.count, group.code))
            .collect();
        let noun = if self.total == 1 { "error" } else { "errors" };
        format!(
            "EDM {}: {} {noun} ({})",
            self.version,
            self.total,
            codes.join(", ")
        )
    }

    /// Pretty-printed JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for group in &self.groups {
            for error in &group.errors {
                writeln!(f, "  {error}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{EdmVersion, SourceLocation};

    fn result_with(errors: Vec<EdmError>) -> ValidationResult {
        let mut result = ValidationResult::valid(EdmVersion::V4);
        for error in errors {
            result.add_error(error);
        }
        result
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::from_result(&ValidationResult::valid(EdmVersion::V4));
        assert!(report.is_valid);
        assert_eq!(report.total, 0);
        assert_eq!(report.summary(), "EDM 4.0: valid");
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let report = ValidationReport::from_result(&result_with(vec![
            EdmError::new(EdmErrorCode::InvalidKey, "a"),
            EdmError::new(EdmErrorCode::BadUnresolvedType, "b"),
            EdmError::new(EdmErrorCode::InvalidKey, "c"),
        ]));

        assert!(!report.is_valid);
        assert_eq!(report.total, 3);
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].code, EdmErrorCode::InvalidKey);
        assert_eq!(report.count(EdmErrorCode::InvalidKey), 2);
        assert_eq!(report.count(EdmErrorCode::DuplicateAnnotation), 0);
        assert_eq!(report.category_count(ErrorCategory::Resolution), 1);
        assert_eq!(
            report.summary(),
            "EDM 4.0: 3 errors (2 InvalidKey, 1 BadUnresolvedType)"
        );
    }

    #[test]
    fn test_json_export() {
        let error = EdmError::new(EdmErrorCode::InvalidKey, "no key")
            .at(Some(&SourceLocation::new(4, 7)));
        let report = ValidationReport::from_result(&result_with(vec![error]));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["groups"][0]["code"], "InvalidKey");
        assert_eq!(json["groups"][0]["category"], "Semantic");
        assert_eq!(json["groups"][0]["errors"][0]["location"]["line"], 4);
    }
}
