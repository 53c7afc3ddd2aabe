//! Body mass index calculation and the BMI-only category table
//!
//! The category table is a deterministic cross-check; it is never merged
//! with the classifier's own label.

use super::error::{PredictionError, Result};
use super::labels::ObesityLabel;

/// Upper bounds (exclusive) of each category band, lightest first.
/// Anything at or above the last bound is Obesity_Type_III.
pub const CATEGORY_UPPER_BOUNDS: [f64; 6] = [18.5, 25.0, 30.0, 35.0, 40.0, 45.0];

/// Compute BMI from weight in kilograms and height in centimetres
pub fn bmi(weight_kg: f64, height_cm: f64) -> Result<f64> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(PredictionError::InvalidInput(format!(
            "weight must be greater than 0, got {weight_kg}"
        )));
    }
    if !height_cm.is_finite() || height_cm <= 0.0 {
        return Err(PredictionError::InvalidInput(format!(
            "height must be greater than 0, got {height_cm}"
        )));
    }

    let height_m = height_cm / 100.0;
    Ok(weight_kg / (height_m * height_m))
}

/// Map a BMI value onto the seven-band category table
pub fn bmi_category(bmi: f64) -> ObesityLabel {
    CATEGORY_UPPER_BOUNDS
        .iter()
        .position(|&upper| bmi < upper)
        .map(|i| ObesityLabel::ALL[i])
        .unwrap_or(ObesityLabel::ObesityTypeIII)
}

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_bmi_formula() {
        let value = bmi(68.0, 170.0).unwrap();
        assert!((value - 68.0 / (1.7 * 1.7)).abs() < 1e-9);
    }

    #[test]
    fn test_bmi_scenarios() {
        assert_eq!(round2(bmi(80.0, 175.0).unwrap()), 26.12);
        assert_eq!(round2(bmi(60.0, 165.0).unwrap()), 22.04);
    }

    #[rstest]
    #[case(0.0, 170.0)]
    #[case(-5.0, 170.0)]
    #[case(70.0, 0.0)]
    #[case(70.0, -170.0)]
    #[case(f64::NAN, 170.0)]
    #[case(70.0, f64::INFINITY)]
    fn test_bmi_rejects_non_positive(#[case] weight: f64, #[case] height: f64) {
        assert!(matches!(
            bmi(weight, height),
            Err(PredictionError::InvalidInput(_))
        ));
    }

    #[rstest]
    #[case(10.0, ObesityLabel::InsufficientWeight)]
    #[case(18.49, ObesityLabel::InsufficientWeight)]
    #[case(18.5, ObesityLabel::NormalWeight)]
    #[case(24.9, ObesityLabel::NormalWeight)]
    #[case(25.0, ObesityLabel::OverweightLevelI)]
    #[case(29.9, ObesityLabel::OverweightLevelI)]
    #[case(30.0, ObesityLabel::OverweightLevelII)]
    #[case(34.9, ObesityLabel::OverweightLevelII)]
    #[case(35.0, ObesityLabel::ObesityTypeI)]
    #[case(39.9, ObesityLabel::ObesityTypeI)]
    #[case(40.0, ObesityLabel::ObesityTypeII)]
    #[case(44.9, ObesityLabel::ObesityTypeII)]
    #[case(45.0, ObesityLabel::ObesityTypeIII)]
    #[case(70.0, ObesityLabel::ObesityTypeIII)]
    fn test_category_boundaries(#[case] value: f64, #[case] expected: ObesityLabel) {
        assert_eq!(bmi_category(value), expected);
    }
}
