//! Classification labels and risk tiers
//!
//! The seven label strings and four tier names are part of the wire
//! contract shared with the browser script and the admin dashboard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{PredictionError, Result};

/// Obesity classification label, ordered from lightest to heaviest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObesityLabel {
    /// BMI below 18.5
    #[serde(rename = "Insufficient_Weight")]
    InsufficientWeight,
    /// Healthy weight
    #[serde(rename = "Normal_Weight")]
    NormalWeight,
    /// First overweight level
    #[serde(rename = "Overweight_Level_I")]
    OverweightLevelI,
    /// Second overweight level
    #[serde(rename = "Overweight_Level_II")]
    OverweightLevelII,
    /// Obesity class I
    #[serde(rename = "Obesity_Type_I")]
    ObesityTypeI,
    /// Obesity class II
    #[serde(rename = "Obesity_Type_II")]
    ObesityTypeII,
    /// Obesity class III
    #[serde(rename = "Obesity_Type_III")]
    ObesityTypeIII,
}

impl ObesityLabel {
    /// All labels in tier order
    pub const ALL: [ObesityLabel; 7] = [
        ObesityLabel::InsufficientWeight,
        ObesityLabel::NormalWeight,
        ObesityLabel::OverweightLevelI,
        ObesityLabel::OverweightLevelII,
        ObesityLabel::ObesityTypeI,
        ObesityLabel::ObesityTypeII,
        ObesityLabel::ObesityTypeIII,
    ];

    /// Wire representation of the label
    pub fn as_str(&self) -> &'static str {
        match self {
            ObesityLabel::InsufficientWeight => "Insufficient_Weight",
            ObesityLabel::NormalWeight => "Normal_Weight",
            ObesityLabel::OverweightLevelI => "Overweight_Level_I",
            ObesityLabel::OverweightLevelII => "Overweight_Level_II",
            ObesityLabel::ObesityTypeI => "Obesity_Type_I",
            ObesityLabel::ObesityTypeII => "Obesity_Type_II",
            ObesityLabel::ObesityTypeIII => "Obesity_Type_III",
        }
    }

    /// Coarse risk grouping used for display
    pub fn risk_tier(&self) -> RiskTier {
        match self {
            ObesityLabel::InsufficientWeight | ObesityLabel::NormalWeight => RiskTier::Low,
            ObesityLabel::OverweightLevelI | ObesityLabel::OverweightLevelII => {
                RiskTier::Moderate
            }
            ObesityLabel::ObesityTypeI => RiskTier::High,
            ObesityLabel::ObesityTypeII | ObesityLabel::ObesityTypeIII => RiskTier::Critical,
        }
    }

    /// Position in tier order, 0 for Insufficient_Weight
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ObesityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObesityLabel {
    type Err = PredictionError;

    /// Exact match only; a near miss means the model and code disagree.
    fn from_str(s: &str) -> Result<Self> {
        ObesityLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| PredictionError::UnknownLabel(s.to_string()))
    }
}

/// Four-level risk grouping of the seven labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// Insufficient or normal weight
    Low,
    /// Overweight
    Moderate,
    /// Obesity class I
    High,
    /// Obesity class II and III
    Critical,
}

impl RiskTier {
    /// All tiers, lowest first
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Moderate,
        RiskTier::High,
        RiskTier::Critical,
    ];

    /// Wire representation of the tier
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RiskTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| format!("unknown risk tier: {s}"))
    }
}

/// Map a raw classifier label to its risk tier
///
/// Fails with [`PredictionError::UnknownLabel`] for anything outside the
/// seven known labels.
pub fn risk_tier(label: &str) -> Result<RiskTier> {
    label.parse::<ObesityLabel>().map(|l| l.risk_tier())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Insufficient_Weight", RiskTier::Low)]
    #[case("Normal_Weight", RiskTier::Low)]
    #[case("Overweight_Level_I", RiskTier::Moderate)]
    #[case("Overweight_Level_II", RiskTier::Moderate)]
    #[case("Obesity_Type_I", RiskTier::High)]
    #[case("Obesity_Type_II", RiskTier::Critical)]
    #[case("Obesity_Type_III", RiskTier::Critical)]
    fn test_risk_tier_mapping(#[case] label: &str, #[case] expected: RiskTier) {
        assert_eq!(risk_tier(label).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("Obese")]
    #[case("normal_weight")]
    #[case("Obesity_Type_IV")]
    #[case(" Normal_Weight")]
    fn test_risk_tier_rejects_unknown(#[case] label: &str) {
        match risk_tier(label) {
            Err(PredictionError::UnknownLabel(raw)) => assert_eq!(raw, label),
            other => panic!("expected UnknownLabel, got {:?}", other),
        }
    }

    #[test]
    fn test_label_round_trip_through_str() {
        for label in ObesityLabel::ALL {
            assert_eq!(label.as_str().parse::<ObesityLabel>().unwrap(), label);
        }
    }

    #[test]
    fn test_label_order_matches_index() {
        for (i, label) in ObesityLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
        assert!(ObesityLabel::InsufficientWeight < ObesityLabel::ObesityTypeIII);
    }

    #[test]
    fn test_label_serializes_as_wire_string() {
        let json = serde_json::to_string(&ObesityLabel::OverweightLevelII).unwrap();
        assert_eq!(json, "\"Overweight_Level_II\"");
        let tier = serde_json::to_string(&RiskTier::Critical).unwrap();
        assert_eq!(tier, "\"Critical\"");
    }
}
