//! Prediction orchestrator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::bmi::{bmi, bmi_category};
use super::classifier::{Classifier, ClassifierOutput};
use super::error::{PredictionError, Result};
use super::input::PredictionInput;
use super::labels::{ObesityLabel, RiskTier};
use super::recommend::recommendations;

/// Allowed drift of the probability sum away from 1
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-4;

/// Outcome of one prediction; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Classifier label
    pub label: ObesityLabel,

    /// Probability mass the classifier gave to `label`
    pub confidence: f64,

    /// Probability of every label, in tier order
    pub probability_distribution: BTreeMap<ObesityLabel, f64>,

    /// Unrounded BMI
    pub bmi: f64,

    /// BMI-only category; may disagree with `label`
    pub bmi_category: ObesityLabel,

    /// Risk tier of `label`
    pub risk_tier: RiskTier,

    /// Ordered suggestions
    pub recommendations: Vec<String>,
}

/// Prediction service holding the injected classifier
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl Predictor {
    /// Create a predictor around a classifier capability
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Name of the wrapped classifier
    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// The wrapped classifier, for introspection
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Run the full pipeline for one questionnaire
    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult> {
        predict(input, self.classifier.as_ref())
    }
}

/// Validate, compute BMI, classify, check the classifier contract, and
/// derive tier and recommendations.
///
/// Nothing is retried: a classifier failure is returned as is.
pub fn predict(input: &PredictionInput, classifier: &dyn Classifier) -> Result<PredictionResult> {
    input.validate()?;

    let bmi = bmi(input.weight, input.height)?;
    let category = bmi_category(bmi);

    let output = classifier.infer(&input.to_features()).map_err(|e| {
        warn!("Classifier {} failed: {}", classifier.name(), e);
        PredictionError::from(e)
    })?;

    let (label, probability_distribution) = check_output(&output).map_err(|e| {
        warn!(
            "Classifier {} broke the output contract: {}",
            classifier.name(),
            e
        );
        e
    })?;
    let confidence = probability_distribution[&label];

    debug!(
        label = label.as_str(),
        confidence,
        bmi,
        bmi_category = category.as_str(),
        "prediction complete"
    );

    Ok(PredictionResult {
        label,
        confidence,
        probability_distribution,
        bmi,
        bmi_category: category,
        risk_tier: label.risk_tier(),
        recommendations: recommendations(label, input),
    })
}

fn check_output(
    output: &ClassifierOutput,
) -> Result<(ObesityLabel, BTreeMap<ObesityLabel, f64>)> {
    let label: ObesityLabel = output.label.parse()?;

    let mut distribution: BTreeMap<ObesityLabel, f64> =
        ObesityLabel::ALL.into_iter().map(|l| (l, 0.0)).collect();
    for (raw, &p) in &output.probabilities {
        let key: ObesityLabel = raw.parse()?;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PredictionError::InconsistentClassifierOutput(format!(
                "probability for {raw} is {p}"
            )));
        }
        distribution.insert(key, p);
    }

    if !output.probabilities.contains_key(&output.label) {
        return Err(PredictionError::InconsistentClassifierOutput(format!(
            "label {} missing from probability distribution",
            output.label
        )));
    }

    let sum: f64 = distribution.values().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(PredictionError::InconsistentClassifierOutput(format!(
            "probabilities sum to {sum}"
        )));
    }

    Ok((label, distribution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ClassifierError;
    use crate::engine::input::FeatureVector;

    struct FixedClassifier(ClassifierOutput);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn infer(&self, _: &FeatureVector) -> std::result::Result<ClassifierOutput, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn infer(&self, _: &FeatureVector) -> std::result::Result<ClassifierOutput, ClassifierError> {
            Err(ClassifierError::Inference("model server timed out".into()))
        }
    }

    fn output(label: &str, probabilities: &[(&str, f64)]) -> ClassifierOutput {
        ClassifierOutput {
            label: label.to_string(),
            probabilities: probabilities
                .iter()
                .map(|(l, p)| (l.to_string(), *p))
                .collect(),
        }
    }

    fn predictor(out: ClassifierOutput) -> Predictor {
        Predictor::new(Arc::new(FixedClassifier(out)))
    }

    #[test]
    fn test_missing_labels_reported_as_zero() {
        let p = predictor(output(
            "Normal_Weight",
            &[("Normal_Weight", 0.9), ("Overweight_Level_I", 0.1)],
        ));
        let result = p.predict(&PredictionInput::reference_sample()).unwrap();

        assert_eq!(result.probability_distribution.len(), 7);
        assert_eq!(
            result.probability_distribution[&ObesityLabel::ObesityTypeIII],
            0.0
        );
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.risk_tier, RiskTier::Low);
    }

    #[test]
    fn test_label_absent_from_distribution() {
        let p = predictor(output("Obesity_Type_I", &[("Normal_Weight", 1.0)]));
        assert!(matches!(
            p.predict(&PredictionInput::reference_sample()),
            Err(PredictionError::InconsistentClassifierOutput(_))
        ));
    }

    #[test]
    fn test_unknown_distribution_key() {
        let p = predictor(output(
            "Normal_Weight",
            &[("Normal_Weight", 0.5), ("Obese", 0.5)],
        ));
        match p.predict(&PredictionInput::reference_sample()) {
            Err(PredictionError::UnknownLabel(raw)) => assert_eq!(raw, "Obese"),
            other => panic!("expected UnknownLabel, got {:?}", other),
        }
    }

    #[test]
    fn test_distribution_must_sum_to_one() {
        let p = predictor(output(
            "Normal_Weight",
            &[("Normal_Weight", 0.5), ("Overweight_Level_I", 0.3)],
        ));
        assert!(matches!(
            p.predict(&PredictionInput::reference_sample()),
            Err(PredictionError::InconsistentClassifierOutput(_))
        ));

        let p = predictor(output(
            "Normal_Weight",
            &[("Normal_Weight", 1.2), ("Overweight_Level_I", -0.2)],
        ));
        assert!(matches!(
            p.predict(&PredictionInput::reference_sample()),
            Err(PredictionError::InconsistentClassifierOutput(_))
        ));
    }

    #[test]
    fn test_probability_sum_tolerance_boundary() {
        let within = predictor(output(
            "Normal_Weight",
            &[("Normal_Weight", 0.9), ("Overweight_Level_I", 0.1 + 5e-5)],
        ));
        let result = within.predict(&PredictionInput::reference_sample()).unwrap();
        assert_eq!(result.confidence, 0.9);

        let beyond = predictor(output(
            "Normal_Weight",
            &[("Normal_Weight", 0.9), ("Overweight_Level_I", 0.1 + 2e-4)],
        ));
        assert!(matches!(
            beyond.predict(&PredictionInput::reference_sample()),
            Err(PredictionError::InconsistentClassifierOutput(_))
        ));
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let p = Predictor::new(Arc::new(FailingClassifier));
        assert!(matches!(
            p.predict(&PredictionInput::reference_sample()),
            Err(PredictionError::Classifier(ClassifierError::Inference(_)))
        ));
    }

    #[test]
    fn test_invalid_input_never_reaches_classifier() {
        let p = Predictor::new(Arc::new(FailingClassifier));
        let input = PredictionInput {
            weight: -1.0,
            ncp: 9.0,
            ..PredictionInput::reference_sample()
        };
        match p.predict(&input) {
            Err(PredictionError::Validation(errors)) => {
                assert!(errors.contains("weight"));
                assert!(errors.contains("ncp"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_shows_classifier_name() {
        let p = Predictor::new(Arc::new(FailingClassifier));
        assert_eq!(format!("{:?}", p), "Predictor { classifier: \"failing\" }");
    }
}
