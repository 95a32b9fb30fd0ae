use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// Qualitative bucket for a confidence percentage.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NormalizedPrediction {
    pub label: String,
    /// Score in `[0, 1]`, rounded to 4 decimals.
    pub confidence: f64,
    /// Score in `[0, 100]`, rounded to 2 decimals.
    pub confidence_percent: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RuntimeInfo {
    pub deepstack_base_url: String,
    pub model_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub model_name: String,
    pub endpoint: String,
    pub fruit: String,
    pub confidence: f64,
    pub confidence_percent: f64,
    pub confidence_level: ConfidenceLevel,
    pub confidence_bar_class: String,
    pub confidence_explanation: String,
    pub predictions: Vec<NormalizedPrediction>,
    pub timestamp_utc: String,
    pub runtime: RuntimeInfo,
}

/// Body of a successful `/api/predict` call.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub data: PredictionResponse,
}

/// Body of a failed `/api/predict` call.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub success: bool,
    pub service: String,
    pub deepstack_base_url: String,
    pub model_name: String,
    pub local_onnx_fallback_enabled: bool,
}
