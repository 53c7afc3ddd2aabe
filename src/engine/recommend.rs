//! Rule-based recommendations
//!
//! Output order is a display contract: the branch's base list first, then
//! the conditional suggestions in the order the checks appear below.

use super::input::{Frequency, PredictionInput};
use super::labels::ObesityLabel;

/// Base suggestions for any Obesity_Type_* label
pub const OBESITY_BASE: [&str; 4] = [
    "Consult a healthcare professional for a personalized weight management plan",
    "Aim for at least 150 minutes of moderate physical activity per week",
    "Focus on a balanced diet with plenty of fruits and vegetables",
    "Monitor caloric intake and portion sizes",
];

/// Base suggestions for any Overweight_Level_* label
pub const OVERWEIGHT_BASE: [&str; 4] = [
    "Increase daily physical activity, for example brisk walking",
    "Reduce portion sizes and limit sugary drinks",
    "Favour vegetables, whole grains and lean proteins",
    "Track your weight regularly",
];

/// Base suggestions for Normal_Weight
pub const NORMAL_BASE: [&str; 4] = [
    "Maintain your current healthy lifestyle",
    "Continue regular physical activity",
    "Keep a balanced and varied diet",
    "Regular health check-ups are recommended",
];

/// Base suggestions for Insufficient_Weight
pub const INSUFFICIENT_BASE: [&str; 4] = [
    "Consult a healthcare professional",
    "Ensure adequate caloric intake",
    "Focus on nutrient-dense foods",
    "Consider strength training exercises",
];

/// Appended when the user often eats high-calorie food
pub const REDUCE_HIGH_CALORIE: &str = "Reduce consumption of high-calorie foods";

/// Appended when daily water intake is under two litres
pub const HYDRATION: &str = "Drink at least 2 litres of water per day";

/// Appended when the user reports no physical activity
pub const START_EXERCISE: &str =
    "Start with light exercise such as a 20 minute walk three times a week";

/// Appended for smokers
pub const QUIT_SMOKING: &str = "Consider a smoking cessation programme";

/// Appended for frequent alcohol consumption
pub const REDUCE_ALCOHOL: &str = "Limit alcohol consumption";

/// Build the ordered recommendation list for a label and questionnaire
pub fn recommendations(label: ObesityLabel, input: &PredictionInput) -> Vec<String> {
    let name = label.as_str();
    let base: &[&str] = if name.contains("Obesity") {
        &OBESITY_BASE
    } else if name.contains("Overweight") {
        &OVERWEIGHT_BASE
    } else if label == ObesityLabel::NormalWeight {
        &NORMAL_BASE
    } else {
        &INSUFFICIENT_BASE
    };

    let mut out: Vec<String> = base.iter().map(|s| s.to_string()).collect();

    if input.favc {
        out.push(REDUCE_HIGH_CALORIE.to_string());
    }
    if input.ch2o < 2.0 {
        out.push(HYDRATION.to_string());
    }
    if input.faf == 0.0 {
        out.push(START_EXERCISE.to_string());
    }
    if input.smoke {
        out.push(QUIT_SMOKING.to_string());
    }
    if matches!(input.calc, Frequency::Frequently | Frequency::Always) {
        out.push(REDUCE_ALCOHOL.to_string());
    }

    out
}
