//! Core error types for `odmr-config`
//!
//! Configuration and validation error types shared across the workspace.
//! Every variant that concerns a single field names it by its dotted path
//! inside the document (e.g. `synchroniser.channel_mapping.MW`).

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// The first five variants are the load failure kinds a consumer is
/// expected to distinguish: parse, missing field, type mismatch,
/// cross-field inconsistency and pulse-sequence path not found.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not syntactically valid YAML, is empty, or its root
    /// is not a mapping.
    #[error("parse error{}: {message}", location_suffix(*line, *column))]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Column number where the error occurred (if available)
        column: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// A required field is absent.
    #[error("missing required field '{field}'{}", suggestion_suffix(suggestion.as_deref()))]
    MissingField {
        /// Dotted path of the missing field
        field: String,
        /// A present key that looks like a misspelling of `field`
        suggestion: Option<String>,
    },

    /// A field's value does not match its semantic type or range.
    #[error("type mismatch at '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Dotted path of the offending field
        field: String,
        /// Description of what was expected
        expected: String,
        /// Description of what the document contains
        found: String,
    },

    /// One or more cross-field invariants are violated.
    #[error("inconsistent configuration: {}", summarize_issues(issues))]
    InconsistentField {
        /// Every violated invariant, in discovery order
        issues: Vec<ValidationIssue>,
    },

    /// `ps_path` does not reference an existing, readable file.
    #[error("pulse sequence file not found: {}", path.display())]
    PathNotFound {
        /// The resolved path that was checked
        path: PathBuf,
    },

    /// The configuration file itself could not be read.
    #[error("file not found: {}", path.display())]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// A value is outside a loader limit.
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// One or more configuration files failed validation.
    #[error("{count} file(s) failed validation")]
    ValidationFailed {
        /// Number of files that failed validation.
        count: usize,
    },
}

impl ConfigError {
    /// Returns the dotted path of the field this error is about, if any.
    ///
    /// For [`ConfigError::InconsistentField`] this is the first issue's path.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::InvalidValue { field, .. } => Some(field.as_str()),
            Self::InconsistentField { issues } => issues.first().map(|i| i.path.as_str()),
            Self::PathNotFound { .. } => Some("ps_path"),
            Self::Parse { .. } | Self::MissingFile { .. } | Self::ValidationFailed { .. } => None,
        }
    }

    /// Shorthand for a [`ConfigError::TypeMismatch`].
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

fn location_suffix(line: Option<usize>, column: Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!(" at line {l}, column {c}"),
        (Some(l), None) => format!(" at line {l}"),
        _ => String::new(),
    }
}

fn suggestion_suffix(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| {
        format!(" (found '{s}', is it misspelled?)")
    })
}

fn summarize_issues(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no details".to_string(),
        [only] => format!("{} at {}", only.message, only.path),
        [first, rest @ ..] => format!(
            "{} at {} (and {} more)",
            first.message,
            first.path,
            rest.len()
        ),
    }
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path to the problematic field (e.g., "data.dynamic_steps")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

/// Result of a validation pass.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records an error-severity issue.
    pub fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    /// Records a warning-severity issue.
    pub fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }

    /// Every issue, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings)
    }
}
