//! Engine error types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, PredictionError>;

/// A single offending input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Canonical snake_case field name
    pub field: String,

    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    /// Create a field error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every problem found while validating one payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}", join_field_errors(.errors))]
pub struct ValidationErrors {
    /// Offending fields in the order they were checked
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Record one offending field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// True when no field was rejected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of rejected fields
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether a given field was rejected
    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when empty, the collected errors otherwise
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures of the classifier capability itself
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model artifact could not be read
    #[error("failed to read model artifact {path:?}")]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying read failure
        #[source]
        source: std::io::Error,
    },

    /// Model artifact is not valid JSON for the expected layout
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// Model artifact parsed but is unusable
    #[error("invalid model artifact: {0}")]
    InvalidModel(String),

    /// Inference failed or timed out
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Prediction pipeline errors
#[derive(Debug, Error)]
pub enum PredictionError {
    /// One or more input fields are missing or out of range
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Numeric input that makes a computation meaningless
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Classifier produced a label outside the seven known values
    #[error("unknown classification label: {0:?}")]
    UnknownLabel(String),

    /// Classifier output does not satisfy the label/probability contract
    #[error("inconsistent classifier output: {0}")]
    InconsistentClassifierOutput(String),

    /// Classifier invocation failed
    #[error("classifier failure: {0}")]
    Classifier(#[from] ClassifierError),
}

impl PredictionError {
    /// Whether the caller can fix the request and try again
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictionError::Validation(_) | PredictionError::InvalidInput(_)
        )
    }
}

impl From<ValidationErrors> for PredictionError {
    fn from(errors: ValidationErrors) -> Self {
        PredictionError::Validation(errors)
    }
}
