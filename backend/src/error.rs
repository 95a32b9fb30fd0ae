use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

use crate::upload::ALLOWED_EXTENSIONS;

/// Rejections raised before any network or inference work happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file was uploaded.")]
    NoFile,
    #[error("Please choose an image file first.")]
    EmptyFilename,
    #[error("Uploaded file has no extension.")]
    NoExtension,
    #[error("Unsupported file type '{extension}'. Allowed: {}.", allowed_extensions_text())]
    UnsupportedType { extension: String },
    #[error("Invalid file MIME type '{mime}'. Only images are supported.")]
    InvalidMimeType { mime: String },
    #[error("Uploaded file exceeds the {limit_mb} MB limit.")]
    TooLarge { limit_mb: u64 },
}

impl ValidationError {
    pub fn status_code(&self) -> u16 {
        match self {
            ValidationError::TooLarge { .. } => 413,
            _ => 400,
        }
    }
}

fn allowed_extensions_text() -> String {
    let mut allowed = ALLOWED_EXTENSIONS.to_vec();
    allowed.sort_unstable();
    allowed.join(", ")
}

/// Failure reported by the remote vision service, or while interpreting its reply.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ClassifierError {
    pub message: String,
    pub status_code: u16,
    pub details: Map<String, Value>,
}

impl ClassifierError {
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// The only condition that hands the request over to the local engine.
    pub fn is_endpoint_missing(&self) -> bool {
        self.status_code == 404
    }
}

#[derive(Debug, Error)]
pub enum LocalModelError {
    #[error("Local model config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Local model config is invalid: {0}")]
    ConfigParse(String),
    #[error("Local ONNX model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("Could not create ONNX session: {0}")]
    Session(String),
    #[error("Could not read image for local ONNX inference: {0}")]
    Image(String),
    #[error("Local ONNX inference failed: {0}")]
    Inference(String),
}

impl From<image::ImageError> for LocalModelError {
    fn from(err: image::ImageError) -> Self {
        LocalModelError::Image(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid DEEPSTACK_BASE_URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("Invalid numeric value for {key}: '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// Everything a prediction request can end in, short of success.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
