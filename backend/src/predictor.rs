use actix_web::web;
use log::{error, info, warn};
use shared::PredictionResponse;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::confidence::{RawPrediction, rank_predictions};
use crate::deepstack::{RemoteResponse, extract_predictions};
use crate::error::{ClassifierError, LocalModelError, PredictError};
use crate::response::build_prediction_response;
use crate::upload::{UploadedImage, validate_image_upload};

pub const FALLBACK_WARNING: &str =
    "DeepStack custom endpoint was not found. Used local ONNX fallback model.";

/// A remote vision service that classifies an uploaded image.
pub trait RemoteClassifier {
    fn classify(
        &self,
        image: &UploadedImage,
    ) -> impl Future<Output = Result<RemoteResponse, ClassifierError>>;

    fn base_url(&self) -> &str;

    fn model_name(&self) -> &str;
}

/// An in-process model used when the remote endpoint is missing.
pub trait LocalClassifier: Send + Sync + 'static {
    fn classify(&self, image: &UploadedImage) -> Result<Vec<RawPrediction>, LocalModelError>;

    /// Identifier reported as `endpoint` in fallback responses.
    fn endpoint(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub data: PredictionResponse,
    pub fallback: bool,
    pub warning: Option<String>,
}

/// Validates an upload, asks the remote service, and falls back to the local
/// model when (and only when) the remote endpoint answers 404.
pub struct PredictionService<R, L> {
    remote: R,
    local: Arc<L>,
    fallback_enabled: bool,
}

impl<R: RemoteClassifier, L: LocalClassifier> PredictionService<R, L> {
    pub fn new(remote: R, local: L, fallback_enabled: bool) -> Self {
        Self {
            remote,
            local: Arc::new(local),
            fallback_enabled,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    pub async fn predict(&self, upload: Option<UploadedImage>) -> Result<PredictionOutcome, PredictError> {
        let request_id = Uuid::new_v4();
        let image = validate_image_upload(upload)?;

        match self.remote.classify(&image).await {
            Ok(remote) => {
                info!(
                    "[{}] DeepStack response status={} endpoint={} preview={}",
                    request_id, remote.status_code, remote.endpoint, remote.response_preview
                );
                let predictions = extract_predictions(&remote.payload)
                    .inspect_err(|e| self.log_classifier_error(request_id, e))?;
                let data = build_prediction_response(
                    predictions,
                    &remote.endpoint,
                    self.remote.model_name(),
                    self.remote.base_url(),
                )?;
                info!(
                    "[{}] Predicted {} at {}% ({} confidence)",
                    request_id, data.fruit, data.confidence_percent, data.confidence_level
                );
                Ok(PredictionOutcome {
                    data,
                    fallback: false,
                    warning: None,
                })
            }
            Err(err) if err.is_endpoint_missing() && self.fallback_enabled => {
                warn!(
                    "[{}] DeepStack endpoint missing, trying local ONNX fallback",
                    request_id
                );
                match self.predict_locally(image).await? {
                    Ok(data) => {
                        info!(
                            "[{}] Local ONNX predicted {} at {}% ({} confidence)",
                            request_id, data.fruit, data.confidence_percent, data.confidence_level
                        );
                        Ok(PredictionOutcome {
                            data,
                            fallback: true,
                            warning: Some(FALLBACK_WARNING.to_string()),
                        })
                    }
                    Err(local_err) => {
                        error!("[{}] Local ONNX fallback failed: {}", request_id, local_err);
                        self.log_classifier_error(request_id, &err);
                        Err(err.into())
                    }
                }
            }
            Err(err) => {
                self.log_classifier_error(request_id, &err);
                Err(err.into())
            }
        }
    }

    /// Runs the local model off the async executor. The outer error is reserved
    /// for failures of the blocking pool itself.
    async fn predict_locally(
        &self,
        image: UploadedImage,
    ) -> Result<Result<PredictionResponse, LocalModelError>, PredictError> {
        let local = Arc::clone(&self.local);
        let endpoint = local.endpoint();

        let raw = web::block(move || local.classify(&image))
            .await
            .map_err(|e| PredictError::Unexpected(e.to_string()))?;

        Ok(raw.and_then(|raw| {
            build_prediction_response(
                rank_predictions(raw),
                &endpoint,
                self.remote.model_name(),
                self.remote.base_url(),
            )
            .map_err(|e| LocalModelError::Inference(e.message))
        }))
    }

    fn log_classifier_error(&self, request_id: Uuid, err: &ClassifierError) {
        error!(
            "[{}] DeepStack error: {} | details={}",
            request_id,
            err,
            serde_json::Value::Object(err.details.clone())
        );
    }
}
