//! Validated questionnaire input and feature encoding
//!
//! Payloads arrive as loosely typed JSON from the form page and from older
//! clients that still send the dataset's upper-case column names.
//! [`PredictionInput::from_json`] is the only way in from the boundary and
//! reports every offending field at once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::error::ValidationErrors;

/// Number of encoded features passed to the classifier
pub const FEATURE_COUNT: usize = 16;

/// Feature order of the encoded vector; this is the documented contract
/// with the trained model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "gender",
    "age",
    "height",
    "weight",
    "family_history_with_overweight",
    "favc",
    "fcvc",
    "ncp",
    "caec",
    "smoke",
    "ch2o",
    "scc",
    "faf",
    "tue",
    "calc",
    "mtrans",
];

/// Biological sex as recorded by the questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
}

impl Gender {
    /// Accepted spellings, canonical first
    pub const VALUES: &'static str = "male, female";

    /// Case-insensitive parse
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    fn code(&self) -> f64 {
        match self {
            Gender::Female => 0.0,
            Gender::Male => 1.0,
        }
    }
}

/// Frequency scale shared by snacking (caec) and alcohol (calc)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Never (the dataset spells it "no")
    Never,
    /// Sometimes
    Sometimes,
    /// Frequently
    Frequently,
    /// Always
    Always,
}

impl Frequency {
    /// Accepted spellings, canonical first
    pub const VALUES: &'static str = "never, sometimes, frequently, always";

    /// Case-insensitive parse, accepting the dataset's "no"
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "never" | "no" => Some(Frequency::Never),
            "sometimes" => Some(Frequency::Sometimes),
            "frequently" => Some(Frequency::Frequently),
            "always" => Some(Frequency::Always),
            _ => None,
        }
    }

    fn code(&self) -> f64 {
        *self as u8 as f64
    }
}

/// Usual transport mode (mtrans)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Walking
    Walking,
    /// Bicycle
    Bike,
    /// Bus, train, metro
    PublicTransport,
    /// Car
    Automobile,
    /// Motorbike
    Motorbike,
}

impl Transport {
    /// Accepted spellings, canonical first
    pub const VALUES: &'static str = "walking, bike, public_transport, automobile, motorbike";

    /// Case-insensitive parse, accepting the dataset spellings
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "walking" => Some(Transport::Walking),
            "bike" => Some(Transport::Bike),
            "public_transport" | "public_transportation" => Some(Transport::PublicTransport),
            "automobile" => Some(Transport::Automobile),
            "motorbike" => Some(Transport::Motorbike),
            _ => None,
        }
    }

    fn code(&self) -> f64 {
        *self as u8 as f64
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// One validated questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionInput {
    /// Gender
    pub gender: Gender,
    /// Age in years
    pub age: u32,
    /// Height in centimetres
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
    /// A family member is or was overweight
    pub family_history_with_overweight: bool,
    /// Frequent consumption of high-calorie food
    pub favc: bool,
    /// Vegetable consumption frequency, 1 to 3
    pub fcvc: f64,
    /// Main meals per day, 1 to 4
    pub ncp: f64,
    /// Eating between meals
    pub caec: Frequency,
    /// Smoker
    pub smoke: bool,
    /// Daily water intake in litres, 1 to 3
    pub ch2o: f64,
    /// Monitors calorie intake
    pub scc: bool,
    /// Physical activity frequency, 0 to 3
    pub faf: f64,
    /// Time using technology devices, 0 to 2
    pub tue: f64,
    /// Alcohol consumption
    pub calc: Frequency,
    /// Usual transport
    pub mtrans: Transport,
}

/// Inclusive numeric bounds; `min_exclusive` turns the lower bound strict.
struct Range {
    min: f64,
    max: Option<f64>,
    min_exclusive: bool,
}

fn numeric_range(field: &str) -> Option<Range> {
    let (min, max, min_exclusive) = match field {
        "age" => (1.0, Some(120.0), false),
        "height" | "weight" => (0.0, None, true),
        "fcvc" => (1.0, Some(3.0), false),
        "ncp" => (1.0, Some(4.0), false),
        "ch2o" => (1.0, Some(3.0), false),
        "faf" => (0.0, Some(3.0), false),
        "tue" => (0.0, Some(2.0), false),
        _ => return None,
    };
    Some(Range {
        min,
        max,
        min_exclusive,
    })
}

fn check_numeric(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() {
        return Err("must be a finite number".to_string());
    }
    let Some(range) = numeric_range(field) else {
        return Ok(());
    };

    let below = if range.min_exclusive {
        value <= range.min
    } else {
        value < range.min
    };
    let above = range.max.is_some_and(|max| value > max);

    match (below || above, range.max) {
        (false, _) => Ok(()),
        (true, Some(max)) => Err(format!("must be between {} and {}", range.min, max)),
        (true, None) => Err(format!("must be greater than {}", range.min)),
    }
}

/// Map an incoming key onto its canonical field name
///
/// Legacy clients send the dataset column names (`Gender`, `FAVC`, `CH2O`,
/// `MTRANS`) and some still carry the `matrans` typo.
fn canonical_field(key: &str) -> Option<&'static str> {
    let lowered = key.trim().to_ascii_lowercase();
    if lowered == "matrans" {
        return Some("mtrans");
    }
    FEATURE_NAMES.iter().copied().find(|name| *name == lowered)
}

struct FieldReader<'a> {
    fields: HashMap<&'static str, &'a Value>,
    errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
    fn require(&mut self, field: &'static str) -> Option<&'a Value> {
        let value = self.fields.get(field).copied();
        if value.is_none() {
            self.errors.push(field, "field required");
        }
        value
    }

    fn number(&mut self, field: &'static str) -> Option<f64> {
        let value = self.require(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(x) = parsed else {
            self.errors.push(field, "expected a number");
            return None;
        };
        if let Err(message) = check_numeric(field, x) {
            self.errors.push(field, message);
            return None;
        }
        Some(x)
    }

    fn whole_number(&mut self, field: &'static str) -> Option<u32> {
        let x = self.number(field)?;
        if x.fract() != 0.0 {
            self.errors.push(field, "expected a whole number");
            return None;
        }
        Some(x as u32)
    }

    fn flag(&mut self, field: &'static str) -> Option<bool> {
        let value = self.require(field)?;
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match normalize_token(s).as_str() {
                "yes" | "true" => Some(true),
                "no" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            self.errors
                .push(field, "expected a boolean or \"yes\"/\"no\"");
        }
        parsed
    }

    fn choice<T>(
        &mut self,
        field: &'static str,
        parse: fn(&str) -> Option<T>,
        allowed: &str,
    ) -> Option<T> {
        let value = self.require(field)?;
        let Value::String(raw) = value else {
            self.errors
                .push(field, format!("expected a string, one of: {allowed}"));
            return None;
        };
        let parsed = parse(raw);
        if parsed.is_none() {
            self.errors.push(
                field,
                format!("unknown value {raw:?}, expected one of: {allowed}"),
            );
        }
        parsed
    }
}

impl PredictionInput {
    /// Build a validated input from an untyped JSON payload
    ///
    /// Unknown, duplicate and missing keys, wrong JSON types, enum values
    /// outside their sets and out-of-range numbers are all collected before
    /// returning.
    pub fn from_json(payload: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(object) = payload.as_object() else {
            errors.push("body", "expected a JSON object");
            return Err(errors);
        };

        let mut fields = HashMap::with_capacity(object.len());
        for (key, value) in object {
            match canonical_field(key) {
                Some(name) => {
                    if fields.insert(name, value).is_some() {
                        errors.push(name, "field supplied more than once");
                    }
                }
                None => errors.push(key.as_str(), "unknown field"),
            }
        }

        let mut reader = FieldReader { fields, errors };
        let gender = reader.choice("gender", Gender::parse, Gender::VALUES);
        let age = reader.whole_number("age");
        let height = reader.number("height");
        let weight = reader.number("weight");
        let family_history = reader.flag("family_history_with_overweight");
        let favc = reader.flag("favc");
        let fcvc = reader.number("fcvc");
        let ncp = reader.number("ncp");
        let caec = reader.choice("caec", Frequency::parse, Frequency::VALUES);
        let smoke = reader.flag("smoke");
        let ch2o = reader.number("ch2o");
        let scc = reader.flag("scc");
        let faf = reader.number("faf");
        let tue = reader.number("tue");
        let calc = reader.choice("calc", Frequency::parse, Frequency::VALUES);
        let mtrans = reader.choice("mtrans", Transport::parse, Transport::VALUES);
        let errors = reader.errors;

        let (
            Some(gender),
            Some(age),
            Some(height),
            Some(weight),
            Some(family_history_with_overweight),
            Some(favc),
            Some(fcvc),
            Some(ncp),
            Some(caec),
            Some(smoke),
            Some(ch2o),
            Some(scc),
            Some(faf),
            Some(tue),
            Some(calc),
            Some(mtrans),
        ) = (
            gender,
            age,
            height,
            weight,
            family_history,
            favc,
            fcvc,
            ncp,
            caec,
            smoke,
            ch2o,
            scc,
            faf,
            tue,
            calc,
            mtrans,
        )
        else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(Self {
            gender,
            age,
            height,
            weight,
            family_history_with_overweight,
            favc,
            fcvc,
            ncp,
            caec,
            smoke,
            ch2o,
            scc,
            faf,
            tue,
            calc,
            mtrans,
        })
    }

    /// Check numeric ranges of an already typed input
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let numeric = [
            ("age", f64::from(self.age)),
            ("height", self.height),
            ("weight", self.weight),
            ("fcvc", self.fcvc),
            ("ncp", self.ncp),
            ("ch2o", self.ch2o),
            ("faf", self.faf),
            ("tue", self.tue),
        ];
        for (field, value) in numeric {
            if let Err(message) = check_numeric(field, value) {
                errors.push(field, message);
            }
        }
        errors.into_result()
    }

    /// Encode all sixteen fields in [`FEATURE_NAMES`] order
    pub fn to_features(&self) -> FeatureVector {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        FeatureVector {
            values: [
                self.gender.code(),
                f64::from(self.age),
                self.height,
                self.weight,
                flag(self.family_history_with_overweight),
                flag(self.favc),
                self.fcvc,
                self.ncp,
                self.caec.code(),
                flag(self.smoke),
                self.ch2o,
                flag(self.scc),
                self.faf,
                self.tue,
                self.calc.code(),
                self.mtrans.code(),
            ],
        }
    }

    /// Fixed questionnaire used by model health probes
    pub fn reference_sample() -> Self {
        Self {
            gender: Gender::Male,
            age: 25,
            height: 170.0,
            weight: 70.0,
            family_history_with_overweight: true,
            favc: true,
            fcvc: 2.0,
            ncp: 3.0,
            caec: Frequency::Sometimes,
            smoke: false,
            ch2o: 2.0,
            scc: false,
            faf: 1.0,
            tue: 1.0,
            calc: Frequency::Sometimes,
            mtrans: Transport::PublicTransport,
        }
    }
}

/// Numeric feature vector handed to the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Wrap raw values already in [`FEATURE_NAMES`] order
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Values in [`FEATURE_NAMES`] order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Look a feature up by name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}
