//! Prediction & risk engine
//!
//! Everything in here is pure given its inputs, except the single call into
//! the injected [`Classifier`].

/// Body mass index calculation and the BMI-only category table
pub mod bmi;

/// Classifier capability and the shipped implementations
pub mod classifier;

/// Engine error types
pub mod error;

/// Validated questionnaire input and feature encoding
pub mod input;

/// Classification labels and risk tiers
pub mod labels;

/// Prediction orchestrator
pub mod predict;

/// Rule-based recommendations
pub mod recommend;

pub use bmi::{bmi, bmi_category};
pub use classifier::{
    load_classifier, BmiReferenceClassifier, Classifier, ClassifierOutput, FeatureImportance,
    LinearClassifier,
};
pub use error::{ClassifierError, FieldError, PredictionError, Result, ValidationErrors};
pub use input::{
    FeatureVector, Frequency, Gender, PredictionInput, Transport, FEATURE_COUNT, FEATURE_NAMES,
};
pub use labels::{risk_tier, ObesityLabel, RiskTier};
pub use predict::{PredictionResult, Predictor};
pub use recommend::recommendations;
