use log::{debug, warn};
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

use crate::error::ClassifierError;
use crate::predictor::RemoteClassifier;
use crate::upload::UploadedImage;

const PREVIEW_CHARS: usize = 500;
const IMAGE_FIELD: &str = "image";

/// A successful (HTTP 200, JSON body) reply from the vision service.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub endpoint: String,
    pub status_code: u16,
    pub payload: Value,
    pub response_preview: String,
}

/// Client for a DeepStack custom-model endpoint.
#[derive(Clone)]
pub struct DeepstackClient {
    http_client: HttpClient,
    base_url: String,
    model_name: String,
}

/// First 500 characters of a body, newlines collapsed to spaces.
pub fn response_preview(body: &str) -> String {
    body.chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', " ")
        .trim()
        .to_string()
}

pub fn custom_model_endpoint(base_url: &str, model_name: &str) -> String {
    format!(
        "{}/v1/vision/custom/{}",
        base_url.trim_end_matches('/'),
        model_name
    )
}

impl DeepstackClient {
    pub fn new(
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
            model_name: model_name.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        custom_model_endpoint(&self.base_url, &self.model_name)
    }

    fn image_part(image: &UploadedImage) -> Part {
        let filename = image.upload_filename();
        let mime = image.upload_mime_type();

        match Part::bytes(image.data.clone())
            .file_name(filename.clone())
            .mime_str(&mime)
        {
            Ok(part) => part,
            Err(e) => {
                warn!("Ignoring unparseable media type '{}': {}", mime, e);
                Part::bytes(image.data.clone()).file_name(filename)
            }
        }
    }

    pub async fn call_custom_model(&self, image: &UploadedImage) -> Result<RemoteResponse, ClassifierError> {
        let endpoint = self.endpoint();
        let form = Form::new().part(IMAGE_FIELD, Self::image_part(image));

        debug!("Posting {} bytes to {}", image.data.len(), endpoint);

        let transport_error = |e: reqwest::Error| {
            ClassifierError::new("Could not reach DeepStack service.", 503)
                .with_detail("endpoint", endpoint.clone())
                .with_detail("exception", e.to_string())
        };

        let response = self
            .http_client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        let preview = response_preview(&body);

        if status_code == 404 {
            return Err(ClassifierError::new("DeepStack custom endpoint was not found.", 404)
                .with_detail("endpoint", endpoint)
                .with_detail("response_preview", preview)
                .with_detail(
                    "hint",
                    "Current DeepStack build may not expose /v1/vision/custom/<model> for ONNX custom models.",
                ));
        }

        if status_code != 200 {
            return Err(ClassifierError::new(
                format!("DeepStack returned HTTP {}.", status_code),
                status_code,
            )
            .with_detail("endpoint", endpoint)
            .with_detail("response_preview", preview));
        }

        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) => {
                return Err(ClassifierError::new("DeepStack returned a non-JSON response.", 502)
                    .with_detail("endpoint", endpoint)
                    .with_detail("response_preview", preview));
            }
        };

        Ok(RemoteResponse {
            endpoint,
            status_code,
            payload,
            response_preview: preview,
        })
    }
}

impl RemoteClassifier for DeepstackClient {
    async fn classify(&self, image: &UploadedImage) -> Result<RemoteResponse, ClassifierError> {
        self.call_custom_model(image).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
