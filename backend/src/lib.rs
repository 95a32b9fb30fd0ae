//! Fruit recognition service: a DeepStack custom-model client with a local
//! ONNX fallback, both answering with the same prediction document.

pub mod confidence;
pub mod config;
pub mod deepstack;
pub mod error;
pub mod onnx;
pub mod predictor;
pub mod response;
pub mod routes;
pub mod upload;

pub use config::AppConfig;
pub use deepstack::DeepstackClient;
pub use error::{ClassifierError, LocalModelError, PredictError, ValidationError};
pub use onnx::OnnxClassifier;
pub use predictor::{LocalClassifier, PredictionOutcome, PredictionService, RemoteClassifier};
pub use routes::configure_routes;
pub use upload::UploadedImage;

/// The service wiring used by the binary.
pub type FruitPredictor = PredictionService<DeepstackClient, OnnxClassifier>;
