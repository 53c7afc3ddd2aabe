//! ObesiTrack - Obesity Risk Prediction Service
//!
//! Turns a sixteen-field health and lifestyle questionnaire into an obesity
//! classification, a risk tier and ordered recommendations, keeps a
//! per-user prediction history and serves dashboard analytics.
//!
//! # Module layout
//!
//! - [`engine`] - BMI, label and risk mapping, recommendations, classifier
//!   capability and the prediction orchestrator (always built)
//! - [`preview`] - client-side live BMI preview, kept as a separate code path
//! - `storage` - SQLite prediction history and analytics (feature `storage`)
//! - `server` - axum HTTP API (feature `server`)
//! - `cli` - command-line interface (feature `cli`)

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Prediction and risk engine
pub mod engine;

/// Live BMI preview mirroring the browser form script
pub mod preview;

/// Prediction history persistence and dashboard analytics
#[cfg(feature = "storage")]
pub mod storage;

/// HTTP API server
#[cfg(feature = "server")]
pub mod server;

/// Command-line interface
#[cfg(feature = "cli")]
pub mod cli;

pub use engine::{
    bmi, bmi_category, recommendations, risk_tier, Classifier, ObesityLabel, PredictionError,
    PredictionInput, PredictionResult, Predictor, RiskTier,
};
