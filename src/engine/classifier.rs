//! Classifier capability and the shipped implementations
//!
//! The trained model is an external collaborator. The orchestrator only
//! sees the [`Classifier`] trait and receives an implementation through its
//! constructor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::bmi::{bmi_category, CATEGORY_UPPER_BOUNDS};
use super::error::ClassifierError;
use super::input::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use super::labels::ObesityLabel;

/// Raw classifier answer, before the orchestrator checks it against the
/// label contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// Predicted label as emitted by the model
    pub label: String,

    /// Probability per label as emitted by the model
    pub probabilities: BTreeMap<String, f64>,
}

/// Trained-model capability
pub trait Classifier: Send + Sync {
    /// Identifier reported by model status endpoints
    fn name(&self) -> &str;

    /// Classify one encoded questionnaire
    fn infer(&self, features: &FeatureVector) -> Result<ClassifierOutput, ClassifierError>;

    /// Model family, for introspection
    fn algorithm(&self) -> &str {
        "custom"
    }

    /// Labels the model can emit
    fn classes(&self) -> Vec<String> {
        ObesityLabel::ALL
            .iter()
            .map(|l| l.as_str().to_string())
            .collect()
    }

    /// Relative weight of each feature, most important first
    ///
    /// `None` when the model has no notion of feature importance.
    fn feature_importance(&self) -> Option<Vec<FeatureImportance>> {
        None
    }
}

/// Share of the model's decision attributed to one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name, see [`FEATURE_NAMES`]
    pub feature: String,
    /// Normalised importance; all features sum to 1
    pub importance: f64,
}

/// Mass assigned to the band label by [`BmiReferenceClassifier`]
pub const REFERENCE_CONFIDENCE: f64 = 0.85;

const BAND_CENTRES: [f64; 7] = [16.0, 21.75, 27.5, 32.5, 37.5, 42.5, 48.0];

/// Fallback classifier used when no trained model is configured
///
/// Picks the BMI band label, gives it [`REFERENCE_CONFIDENCE`], and spreads
/// the remainder over the other labels by distance to their band centre.
#[derive(Debug, Clone, Default)]
pub struct BmiReferenceClassifier;

impl BmiReferenceClassifier {
    /// Create the reference classifier
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for BmiReferenceClassifier {
    fn name(&self) -> &str {
        "bmi_reference"
    }

    fn algorithm(&self) -> &str {
        "bmi_bands"
    }

    fn infer(&self, features: &FeatureVector) -> Result<ClassifierOutput, ClassifierError> {
        let (Some(height), Some(weight)) = (features.get("height"), features.get("weight")) else {
            return Err(ClassifierError::Inference(
                "height and weight features are required".into(),
            ));
        };
        if height <= 0.0 || weight <= 0.0 {
            return Err(ClassifierError::Inference(format!(
                "cannot classify height={height} weight={weight}"
            )));
        }

        let height_m = height / 100.0;
        let bmi = weight / (height_m * height_m);
        let band = bmi_category(bmi);

        let others: Vec<(ObesityLabel, f64)> = ObesityLabel::ALL
            .into_iter()
            .filter(|l| *l != band)
            .map(|l| (l, (-(bmi - BAND_CENTRES[l.index()]).abs() / 2.0).exp()))
            .collect();
        let total: f64 = others.iter().map(|(_, w)| w).sum();

        let mut probabilities = BTreeMap::new();
        probabilities.insert(band.as_str().to_string(), REFERENCE_CONFIDENCE);
        for (label, weight) in others {
            let share = if total > 0.0 {
                (1.0 - REFERENCE_CONFIDENCE) * weight / total
            } else {
                (1.0 - REFERENCE_CONFIDENCE) / 6.0
            };
            probabilities.insert(label.as_str().to_string(), share);
        }

        debug!(bmi, label = band.as_str(), "reference classification");
        Ok(ClassifierOutput {
            label: band.as_str().to_string(),
            probabilities,
        })
    }
}

/// One class row of a linear model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClass {
    /// Label emitted when this class wins
    pub label: String,
    /// One weight per feature
    pub weights: Vec<f64>,
    /// Intercept
    pub bias: f64,
}

/// Multinomial logistic model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    /// Artifact name
    pub name: String,
    /// Per-feature training mean
    pub feature_means: Vec<f64>,
    /// Per-feature training standard deviation
    pub feature_scales: Vec<f64>,
    /// Class rows
    pub classes: Vec<LinearClass>,
}

/// Softmax-over-linear-scores classifier loaded from a JSON artifact
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    model: LinearModel,
}

impl LinearClassifier {
    /// Validate and wrap a model artifact
    pub fn new(model: LinearModel) -> Result<Self, ClassifierError> {
        if model.classes.is_empty() {
            return Err(ClassifierError::InvalidModel("model has no classes".into()));
        }
        if model.feature_means.len() != FEATURE_COUNT || model.feature_scales.len() != FEATURE_COUNT
        {
            return Err(ClassifierError::InvalidModel(format!(
                "expected {} feature means and scales, got {} and {}",
                FEATURE_COUNT,
                model.feature_means.len(),
                model.feature_scales.len()
            )));
        }
        if let Some(class) = model
            .classes
            .iter()
            .find(|c| c.weights.len() != FEATURE_COUNT)
        {
            return Err(ClassifierError::InvalidModel(format!(
                "class {} has {} weights, expected {}",
                class.label,
                class.weights.len(),
                FEATURE_COUNT
            )));
        }
        if model.feature_scales.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ClassifierError::InvalidModel(
                "feature scales must be finite and non-zero".into(),
            ));
        }

        Ok(Self { model })
    }

    /// Load a model artifact from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ClassifierError> {
        let content = fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: LinearModel = serde_json::from_str(&content)?;
        Self::new(model)
    }

    /// Class labels in artifact order
    pub fn labels(&self) -> Vec<&str> {
        self.model.classes.iter().map(|c| c.label.as_str()).collect()
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        &self.model.name
    }

    fn algorithm(&self) -> &str {
        "multinomial_logistic"
    }

    fn classes(&self) -> Vec<String> {
        self.labels().into_iter().map(str::to_string).collect()
    }

    /// Mean absolute standardized weight per feature across classes
    fn feature_importance(&self) -> Option<Vec<FeatureImportance>> {
        let class_count = self.model.classes.len() as f64;
        let raw: Vec<f64> = (0..FEATURE_COUNT)
            .map(|f| {
                self.model
                    .classes
                    .iter()
                    .map(|c| c.weights[f].abs())
                    .sum::<f64>()
                    / class_count
            })
            .collect();
        let total: f64 = raw.iter().sum();

        let mut ranked: Vec<FeatureImportance> = FEATURE_NAMES
            .iter()
            .zip(raw)
            .map(|(name, weight)| FeatureImportance {
                feature: name.to_string(),
                importance: if total > 0.0 { weight / total } else { 0.0 },
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Some(ranked)
    }

    fn infer(&self, features: &FeatureVector) -> Result<ClassifierOutput, ClassifierError> {
        let standardized: Vec<f64> = features
            .as_slice()
            .iter()
            .zip(self.model.feature_means.iter().zip(&self.model.feature_scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();

        let scores: Vec<f64> = self
            .model
            .classes
            .iter()
            .map(|class| {
                class
                    .weights
                    .iter()
                    .zip(&standardized)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + class.bias
            })
            .collect();

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(ClassifierError::Inference("non-finite class scores".into()));
        }
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        let mut best = 0;
        for (i, e) in exps.iter().enumerate() {
            if *e > exps[best] {
                best = i;
            }
        }

        let probabilities = self
            .model
            .classes
            .iter()
            .zip(&exps)
            .map(|(class, e)| (class.label.clone(), e / total))
            .collect();

        Ok(ClassifierOutput {
            label: self.model.classes[best].label.clone(),
            probabilities,
        })
    }
}

/// Pick the classifier for a deployment
///
/// A configured artifact path loads [`LinearClassifier`]; without one the
/// service runs on [`BmiReferenceClassifier`].
pub fn load_classifier(model_path: Option<&Path>) -> Result<Arc<dyn Classifier>, ClassifierError> {
    match model_path {
        Some(path) => {
            let classifier = LinearClassifier::from_json_file(path)?;
            info!(
                "Loaded linear model {} from {:?} ({} classes)",
                classifier.name(),
                path,
                classifier.labels().len()
            );
            Ok(Arc::new(classifier))
        }
        None => {
            info!(
                "No model artifact configured, using BMI reference classifier (band bounds {:?})",
                CATEGORY_UPPER_BOUNDS
            );
            Ok(Arc::new(BmiReferenceClassifier::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::PredictionInput;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn features(weight: f64, height: f64) -> FeatureVector {
        let input = PredictionInput {
            weight,
            height,
            ..PredictionInput::reference_sample()
        };
        input.to_features()
    }

    fn two_class_model() -> LinearModel {
        let mut heavy = vec![0.0; FEATURE_COUNT];
        heavy[3] = 1.0;
        let mut light = vec![0.0; FEATURE_COUNT];
        light[3] = -1.0;
        LinearModel {
            name: "test_linear".into(),
            feature_means: vec![0.0; FEATURE_COUNT],
            feature_scales: vec![1.0; FEATURE_COUNT],
            classes: vec![
                LinearClass {
                    label: "Normal_Weight".into(),
                    weights: light,
                    bias: 80.0,
                },
                LinearClass {
                    label: "Obesity_Type_I".into(),
                    weights: heavy,
                    bias: -80.0,
                },
            ],
        }
    }

    #[test]
    fn test_reference_classifier_distribution() {
        let output = BmiReferenceClassifier::new()
            .infer(&features(80.0, 175.0))
            .unwrap();

        assert_eq!(output.label, "Overweight_Level_I");
        assert_eq!(output.probabilities.len(), 7);
        assert_eq!(output.probabilities["Overweight_Level_I"], REFERENCE_CONFIDENCE);
        let sum: f64 = output.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        // Neighbouring bands get more of the remainder than distant ones.
        assert!(output.probabilities["Normal_Weight"] > output.probabilities["Obesity_Type_III"]);
    }

    #[test]
    fn test_reference_classifier_rejects_degenerate_features() {
        let zeroed = FeatureVector::from_values([0.0; FEATURE_COUNT]);
        assert!(matches!(
            BmiReferenceClassifier::new().infer(&zeroed),
            Err(ClassifierError::Inference(_))
        ));
    }

    #[test]
    fn test_linear_classifier_softmax() {
        let classifier = LinearClassifier::new(two_class_model()).unwrap();

        let light = classifier.infer(&features(50.0, 170.0)).unwrap();
        assert_eq!(light.label, "Normal_Weight");
        let heavy = classifier.infer(&features(120.0, 170.0)).unwrap();
        assert_eq!(heavy.label, "Obesity_Type_I");

        let sum: f64 = heavy.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_classifier_rejects_bad_artifacts() {
        let mut model = two_class_model();
        model.classes[0].weights.pop();
        assert!(matches!(
            LinearClassifier::new(model),
            Err(ClassifierError::InvalidModel(_))
        ));

        let mut model = two_class_model();
        model.classes.clear();
        assert!(LinearClassifier::new(model).is_err());

        let mut model = two_class_model();
        model.feature_scales[4] = 0.0;
        assert!(LinearClassifier::new(model).is_err());
    }

    #[test]
    fn test_linear_feature_importance_ranking() {
        let mut model = two_class_model();
        model.classes[0].weights[0] = 0.5;
        model.classes[1].weights[0] = -0.5;
        model.classes[1].weights[12] = 0.5;
        let classifier = LinearClassifier::new(model).unwrap();

        let ranked = classifier.feature_importance().unwrap();
        assert_eq!(ranked.len(), FEATURE_COUNT);
        assert_eq!(ranked[0].feature, "weight");
        assert_eq!(ranked[1].feature, "gender");
        assert_eq!(ranked[2].feature, "faf");
        // weight 1.0, gender 0.5, faf 0.25 over a total of 1.75
        assert!((ranked[0].importance - 1.0 / 1.75).abs() < 1e-12);
        let sum: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((sum - 1.0).abs() < 1e-12);

        assert_eq!(classifier.algorithm(), "multinomial_logistic");
        assert_eq!(classifier.classes(), vec!["Normal_Weight", "Obesity_Type_I"]);
    }

    #[test]
    fn test_reference_classifier_has_no_importance() {
        let classifier = BmiReferenceClassifier::new();
        assert!(classifier.feature_importance().is_none());
        assert_eq!(classifier.classes().len(), 7);
        assert_eq!(classifier.algorithm(), "bmi_bands");
    }

    #[test]
    fn test_load_classifier_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&two_class_model()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let classifier = load_classifier(Some(file.path())).unwrap();
        assert_eq!(classifier.name(), "test_linear");

        let fallback = load_classifier(None).unwrap();
        assert_eq!(fallback.name(), "bmi_reference");

        let missing = load_classifier(Some(Path::new("/nonexistent/model.json")));
        assert!(matches!(missing, Err(ClassifierError::Io { .. })));
    }
}
