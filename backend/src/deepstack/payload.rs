use serde_json::{Map, Value};
use shared::NormalizedPrediction;

use crate::confidence::{RawPrediction, coerce_confidence, rank_predictions};
use crate::error::ClassifierError;

/// Loose truthiness for the `error` field: empty strings, zero, null and false are all "no error".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Label text as the service's own clients print it: an absent label is
/// "Unknown", an explicit null is "None", booleans are capitalized.
fn label_text(value: Option<&Value>) -> String {
    match value {
        None => "Unknown".to_string(),
        Some(Value::Null) => "None".to_string(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn raw_prediction(entry: &Map<String, Value>) -> RawPrediction {
    RawPrediction::new(
        label_text(entry.get("label")),
        coerce_confidence(entry.get("confidence")),
    )
}

/// Pulls a ranked prediction list out of a vision-service payload.
///
/// Accepts a top-level `label`/`confidence` pair, a `predictions` list, or
/// both at once. Non-object list entries are skipped.
pub fn extract_predictions(payload: &Value) -> Result<Vec<NormalizedPrediction>, ClassifierError> {
    let fields = payload
        .as_object()
        .ok_or_else(|| ClassifierError::new("DeepStack response format is invalid.", 502))?;

    if let Some(error) = fields.get("error").filter(|e| is_truthy(e)) {
        let reported = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(ClassifierError::new(
            format!("DeepStack reported an error: {}", reported),
            502,
        )
        .with_detail("response", payload.clone()));
    }

    let mut raw = Vec::new();

    if fields.contains_key("label") {
        raw.push(raw_prediction(fields));
    }

    if let Some(Value::Array(items)) = fields.get("predictions") {
        raw.extend(items.iter().filter_map(Value::as_object).map(raw_prediction));
    }

    if raw.is_empty() {
        return Err(
            ClassifierError::new("DeepStack returned no predictions for this image.", 502)
                .with_detail("response", payload.clone()),
        );
    }

    Ok(rank_predictions(raw))
}
