use chrono::{SecondsFormat, Utc};
use shared::{NormalizedPrediction, PredictionResponse, RuntimeInfo};

use crate::confidence::confidence_profile;
use crate::error::ClassifierError;

pub const MAX_LISTED_PREDICTIONS: usize = 5;

/// Builds the response document from an already ranked prediction list.
///
/// `base_url` is carried in `runtime` for observability only.
pub fn build_prediction_response(
    mut predictions: Vec<NormalizedPrediction>,
    endpoint: &str,
    model_name: &str,
    base_url: &str,
) -> Result<PredictionResponse, ClassifierError> {
    let top = predictions
        .first()
        .cloned()
        .ok_or_else(|| ClassifierError::new("DeepStack returned no predictions for this image.", 502))?;
    let profile = confidence_profile(top.confidence_percent);
    predictions.truncate(MAX_LISTED_PREDICTIONS);

    Ok(PredictionResponse {
        model_name: model_name.to_string(),
        endpoint: endpoint.to_string(),
        fruit: top.label,
        confidence: top.confidence,
        confidence_percent: top.confidence_percent,
        confidence_level: profile.level,
        confidence_bar_class: profile.bar_class.to_string(),
        confidence_explanation: profile.explanation.to_string(),
        predictions,
        timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        runtime: RuntimeInfo {
            deepstack_base_url: base_url.to_string(),
            model_name: model_name.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepstack::extract_predictions;
    use chrono::DateTime;
    use serde_json::json;
    use shared::ConfidenceLevel;

    #[test]
    fn test_single_label_response() {
        let predictions = extract_predictions(&json!({"label": "Apple", "confidence": 0.92})).unwrap();
        let response = build_prediction_response(
            predictions,
            "http://localhost:5050/v1/vision/custom/FruitsRecognition",
            "FruitsRecognition",
            "http://localhost:5050",
        )
        .unwrap();

        assert_eq!(response.fruit, "Apple");
        assert_eq!(response.confidence, 0.92);
        assert_eq!(response.confidence_percent, 92.0);
        assert_eq!(response.confidence_level, ConfidenceLevel::High);
        assert_eq!(response.confidence_bar_class, "success");
        assert_eq!(response.predictions.len(), 1);
        assert_eq!(response.runtime.model_name, "FruitsRecognition");
        assert_eq!(response.runtime.deepstack_base_url, "http://localhost:5050");
        assert!(DateTime::parse_from_rfc3339(&response.timestamp_utc).is_ok());
    }

    #[test]
    fn test_medium_tier_from_list() {
        let predictions = extract_predictions(&json!({
            "predictions": [
                {"label": "Pear", "confidence": 30},
                {"label": "Plum", "confidence": 70}
            ]
        }))
        .unwrap();
        let response = build_prediction_response(predictions, "e", "m", "b").unwrap();
        assert_eq!(response.fruit, "Plum");
        assert_eq!(response.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(response.predictions[1].label, "Pear");
    }

    #[test]
    fn test_list_truncated_to_five() {
        let items: Vec<_> = (0..8)
            .map(|i| json!({"label": format!("fruit-{}", i), "confidence": 10 + i}))
            .collect();
        let predictions = extract_predictions(&json!({ "predictions": items })).unwrap();
        let response = build_prediction_response(predictions, "e", "m", "b").unwrap();
        assert_eq!(response.predictions.len(), 5);
        assert_eq!(response.fruit, "fruit-7");
        assert_eq!(response.predictions[4].label, "fruit-3");
        assert_eq!(response.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_empty_list_fails() {
        let err = build_prediction_response(Vec::new(), "e", "m", "b").unwrap_err();
        assert_eq!(err.status_code, 502);
    }

    #[test]
    fn test_serialized_field_names() {
        let predictions = extract_predictions(&json!({"label": "Fig", "confidence": 0.1})).unwrap();
        let response = build_prediction_response(predictions, "e", "m", "b").unwrap();
        let document = serde_json::to_value(&response).unwrap();
        assert_eq!(document["confidence_level"], "low");
        assert_eq!(document["predictions"][0]["confidence_percent"], 10.0);
        assert!(document["timestamp_utc"].is_string());
        assert_eq!(document["runtime"]["deepstack_base_url"], "b");
    }
}
