//! API response types matching the form page contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::bmi::round2;
use crate::engine::{FeatureImportance, ObesityLabel, PredictionInput, PredictionResult, RiskTier};
use crate::storage::PredictionRecord;

/// Body of a successful `POST /api/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Classifier label
    pub prediction: ObesityLabel,

    /// Probability of `prediction`
    pub confidence: f64,

    /// BMI rounded to two decimals
    pub bmi: f64,

    /// BMI-only category
    pub bmi_category: ObesityLabel,

    /// Risk tier of `prediction`
    pub risk_level: RiskTier,

    /// Ordered suggestions
    pub recommendations: Vec<String>,

    /// Probability of every label
    pub probabilities: BTreeMap<ObesityLabel, f64>,
}

impl From<&PredictionResult> for PredictionResponse {
    fn from(result: &PredictionResult) -> Self {
        Self {
            prediction: result.label,
            confidence: result.confidence,
            bmi: round2(result.bmi),
            bmi_category: result.bmi_category,
            risk_level: result.risk_tier,
            recommendations: result.recommendations.clone(),
            probabilities: result.probability_distribution.clone(),
        }
    }
}

/// One stored prediction in a history listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    /// Record id
    pub id: i64,

    /// Questionnaire as submitted
    pub input: PredictionInput,

    /// Prediction fields
    #[serde(flatten)]
    pub result: PredictionResponse,

    /// Insert time
    pub created_at: DateTime<Utc>,
}

impl From<&PredictionRecord> for HistoryEntryResponse {
    fn from(record: &PredictionRecord) -> Self {
        Self {
            id: record.id,
            input: record.input.clone(),
            result: PredictionResponse::from(&record.result),
            created_at: record.created_at,
        }
    }
}

/// Prediction history of one user, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Owner of the listed predictions
    pub user_id: String,

    /// Entries, newest first
    pub predictions: Vec<HistoryEntryResponse>,

    /// All predictions stored for the user
    pub total: i64,

    /// Page number, on paginated listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    /// Page size, on paginated listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
}

impl HistoryResponse {
    /// Build a listing from stored records
    pub fn new(user_id: impl Into<String>, records: &[PredictionRecord], total: i64) -> Self {
        Self {
            user_id: user_id.into(),
            predictions: records.iter().map(HistoryEntryResponse::from).collect(),
            total,
            page: None,
            per_page: None,
        }
    }

    /// Echo the requested page
    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

/// Result of removing a user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// User whose predictions were removed
    pub user_id: String,

    /// Number of removed predictions
    pub deleted: usize,
}

/// Classifier in service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatusResponse {
    /// Always `"loaded"` once the server is up
    pub status: String,

    /// Classifier name
    pub classifier: String,

    /// Artifact path, when a trained model is in use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// Labels the service can return
    pub labels: Vec<ObesityLabel>,

    /// Feature order fed to the classifier
    pub features: Vec<String>,
}

/// Body of `GET /api/model/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    /// Classifier name
    pub classifier: String,

    /// Model family
    pub algorithm: String,

    /// Number of input features
    pub feature_count: usize,

    /// Number of labels the model emits
    pub class_count: usize,

    /// Feature order fed to the classifier
    pub features: Vec<String>,

    /// Labels the model emits
    pub classes: Vec<String>,

    /// Whether `GET /api/model/feature-importance` has data
    pub supports_feature_importance: bool,
}

/// Body of `GET /api/model/feature-importance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceResponse {
    /// Classifier name
    pub classifier: String,

    /// Every feature, most important first
    pub feature_importance: Vec<FeatureImportance>,

    /// Names of the three leading features
    pub top_features: Vec<String>,

    /// Number of ranked features
    pub total_features: usize,

    /// Report time
    pub timestamp: DateTime<Utc>,
}

impl FeatureImportanceResponse {
    /// Number of features listed in `top_features`
    pub const TOP: usize = 3;

    /// Wrap a ranking produced by the classifier
    pub fn new(classifier: impl Into<String>, ranking: Vec<FeatureImportance>) -> Self {
        Self {
            classifier: classifier.into(),
            top_features: ranking
                .iter()
                .take(Self::TOP)
                .map(|f| f.feature.clone())
                .collect(),
            total_features: ranking.len(),
            feature_importance: ranking,
            timestamp: Utc::now(),
        }
    }
}

/// Canned prediction outcome of `GET /api/model/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPrediction {
    /// Whether the canned prediction succeeded
    pub successful: bool,

    /// Label of the canned prediction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<ObesityLabel>,

    /// Confidence of the canned prediction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Body of `GET /api/model/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHealthResponse {
    /// `"healthy"` or `"unhealthy"`
    pub status: String,

    /// Classifier name
    pub classifier: String,

    /// Canned prediction outcome
    pub test_prediction: TestPrediction,

    /// Check time
    pub timestamp: DateTime<Utc>,
}

impl ModelHealthResponse {
    /// Healthy report from a successful canned prediction
    pub fn healthy(classifier: impl Into<String>, result: &PredictionResult) -> Self {
        Self {
            status: "healthy".to_string(),
            classifier: classifier.into(),
            test_prediction: TestPrediction {
                successful: true,
                prediction: Some(result.label),
                confidence: Some(result.confidence),
            },
            timestamp: Utc::now(),
        }
    }

    /// Unhealthy report; failure details stay in the logs
    pub fn unhealthy(classifier: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            classifier: classifier.into(),
            test_prediction: TestPrediction {
                successful: false,
                prediction: None,
                confidence: None,
            },
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BmiReferenceClassifier, Predictor};
    use std::sync::Arc;

    fn result() -> PredictionResult {
        Predictor::new(Arc::new(BmiReferenceClassifier::new()))
            .predict(&PredictionInput {
                weight: 80.0,
                height: 175.0,
                ..PredictionInput::reference_sample()
            })
            .unwrap()
    }

    #[test]
    fn test_prediction_response_rounds_bmi() {
        let result = result();
        let response = PredictionResponse::from(&result);

        assert_eq!(response.bmi, 26.12);
        assert_eq!(response.prediction, result.label);
        assert_eq!(response.probabilities.len(), 7);
    }

    #[test]
    fn test_prediction_response_wire_names() {
        let json = serde_json::to_value(PredictionResponse::from(&result())).unwrap();

        assert_eq!(json["prediction"], "Overweight_Level_I");
        assert_eq!(json["bmi_category"], "Overweight_Level_I");
        assert_eq!(json["risk_level"], "Moderate");
        assert!(json["probabilities"]["Obesity_Type_III"].is_number());
    }

    #[test]
    fn test_paginated_history_echoes_page() {
        let plain = serde_json::to_value(HistoryResponse::new("alice", &[], 0)).unwrap();
        assert!(plain.get("page").is_none());

        let paged =
            serde_json::to_value(HistoryResponse::new("alice", &[], 12).with_page(2, 5)).unwrap();
        assert_eq!(paged["page"], 2);
        assert_eq!(paged["per_page"], 5);
    }

    #[test]
    fn test_feature_importance_top_three() {
        let ranking = ["weight", "faf", "age", "gender"]
            .iter()
            .zip([0.4, 0.3, 0.2, 0.1])
            .map(|(f, importance)| FeatureImportance {
                feature: f.to_string(),
                importance,
            })
            .collect();
        let response = FeatureImportanceResponse::new("linear", ranking);

        assert_eq!(response.top_features, vec!["weight", "faf", "age"]);
        assert_eq!(response.total_features, 4);
    }

    #[test]
    fn test_unhealthy_report_hides_prediction() {
        let json = serde_json::to_value(ModelHealthResponse::unhealthy("fixed")).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["test_prediction"]["successful"], false);
        assert!(json["test_prediction"].get("prediction").is_none());
    }
}
