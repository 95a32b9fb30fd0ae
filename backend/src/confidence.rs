use serde_json::Value;
use shared::{ConfidenceLevel, NormalizedPrediction};
use std::cmp::Ordering;

pub const HIGH_CONFIDENCE_PERCENT: f64 = 80.0;
pub const MEDIUM_CONFIDENCE_PERCENT: f64 = 50.0;

/// A label paired with a confidence of unknown scale (fraction or percent).
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub label: String,
    pub confidence: f64,
}

impl RawPrediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceProfile {
    pub level: ConfidenceLevel,
    pub explanation: &'static str,
    pub bar_class: &'static str,
}

/// Coerces an arbitrary JSON value into a float, falling back to 0.0.
pub fn coerce_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// Maps a raw confidence onto `(score, percent)`.
///
/// Values above 1.0 are read as percentages and capped at 100; values in
/// `[0, 1]` are read as fractional scores. Exactly 1.0 is a score of 100%.
pub fn normalize_confidence(raw: f64) -> (f64, f64) {
    let value = if raw.is_nan() { 0.0 } else { raw.max(0.0) };

    if value > 1.0 {
        let percent = value.min(100.0);
        (percent / 100.0, percent)
    } else {
        (value, value * 100.0)
    }
}

pub fn confidence_profile(confidence_percent: f64) -> ConfidenceProfile {
    if confidence_percent >= HIGH_CONFIDENCE_PERCENT {
        ConfidenceProfile {
            level: ConfidenceLevel::High,
            explanation: "Very strong match. The model is highly confident in this fruit label.",
            bar_class: "success",
        }
    } else if confidence_percent >= MEDIUM_CONFIDENCE_PERCENT {
        ConfidenceProfile {
            level: ConfidenceLevel::Medium,
            explanation: "Moderate confidence. The prediction is plausible but not definitive.",
            bar_class: "warning",
        }
    } else {
        ConfidenceProfile {
            level: ConfidenceLevel::Low,
            explanation: "Low confidence. The image may be unclear or outside model training patterns.",
            bar_class: "danger",
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn normalize_prediction(raw: RawPrediction) -> NormalizedPrediction {
    let (score, percent) = normalize_confidence(raw.confidence);
    NormalizedPrediction {
        label: raw.label,
        confidence: round_to(score, 4),
        confidence_percent: round_to(percent, 2),
    }
}

/// Normalizes every prediction and ranks them by descending percent.
/// Ties keep their input order.
pub fn rank_predictions(raw: Vec<RawPrediction>) -> Vec<NormalizedPrediction> {
    let mut predictions: Vec<NormalizedPrediction> =
        raw.into_iter().map(normalize_prediction).collect();
    predictions.sort_by(|a, b| {
        b.confidence_percent
            .partial_cmp(&a.confidence_percent)
            .unwrap_or(Ordering::Equal)
    });
    predictions
}
