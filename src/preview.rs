//! Live BMI preview mirroring the browser form script
//!
//! The form page recomputes BMI as the user types, before anything is sent
//! to the server. This module is that second code path, written against
//! raw form text with its own threshold table, so tests can check it
//! agrees with [`crate::engine::bmi`] instead of assuming so.

use serde::Serialize;

use crate::engine::ObesityLabel;

/// Threshold table of the preview widget: (lower bound, label), heaviest
/// first, scanned top down.
const PREVIEW_BANDS: [(f64, ObesityLabel); 6] = [
    (45.0, ObesityLabel::ObesityTypeIII),
    (40.0, ObesityLabel::ObesityTypeII),
    (35.0, ObesityLabel::ObesityTypeI),
    (30.0, ObesityLabel::OverweightLevelII),
    (25.0, ObesityLabel::OverweightLevelI),
    (18.5, ObesityLabel::NormalWeight),
];

/// What the preview widget shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewReading {
    /// Unrounded BMI
    pub bmi: f64,

    /// BMI band
    pub category: ObesityLabel,

    /// BMI with one decimal, as rendered next to the form
    pub display: String,
}

/// Compute the preview from the raw weight (kg) and height (cm) fields
///
/// Returns `None` while either field is blank, unparsable or not positive;
/// the widget simply stays empty in that case.
pub fn live_preview(weight_text: &str, height_text: &str) -> Option<PreviewReading> {
    let weight: f64 = weight_text.trim().parse().ok()?;
    let height_cm: f64 = height_text.trim().parse().ok()?;
    if !(weight.is_finite() && height_cm.is_finite()) || weight <= 0.0 || height_cm <= 0.0 {
        return None;
    }

    let height_m = height_cm / 100.0;
    let bmi = weight / (height_m * height_m);

    Some(PreviewReading {
        bmi,
        category: preview_category(bmi),
        display: format!("{:.1}", bmi),
    })
}

fn preview_category(bmi: f64) -> ObesityLabel {
    for (lower, label) in PREVIEW_BANDS {
        if bmi >= lower {
            return label;
        }
    }
    ObesityLabel::InsufficientWeight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{bmi, bmi_category};
    use proptest::prelude::*;

    #[test]
    fn test_preview_scenarios() {
        let a = live_preview("80", "175").unwrap();
        assert_eq!(a.display, "26.1");
        assert_eq!(a.category, ObesityLabel::OverweightLevelI);

        let b = live_preview(" 60 ", "165.0").unwrap();
        assert_eq!(b.display, "22.0");
        assert_eq!(b.category, ObesityLabel::NormalWeight);
    }

    #[test]
    fn test_preview_stays_empty_on_bad_fields() {
        assert!(live_preview("", "175").is_none());
        assert!(live_preview("80", "abc").is_none());
        assert!(live_preview("0", "175").is_none());
        assert!(live_preview("80", "-1").is_none());
        assert!(live_preview("NaN", "175").is_none());
    }

    #[test]
    fn test_preview_boundaries_match_engine_table() {
        for value in [18.49, 18.5, 24.9, 25.0, 29.9, 30.0, 34.9, 35.0, 39.9, 40.0, 44.9, 45.0] {
            assert_eq!(preview_category(value), bmi_category(value), "bmi {value}");
        }
    }

    proptest! {
        #[test]
        fn prop_preview_agrees_with_engine(weight in 1.0f64..400.0, height in 50.0f64..250.0) {
            let reading = live_preview(&weight.to_string(), &height.to_string()).unwrap();
            let server = bmi(weight, height).unwrap();

            prop_assert!((reading.bmi - server).abs() < 1e-6);
            prop_assert_eq!(reading.category, bmi_category(server));
        }
    }
}
