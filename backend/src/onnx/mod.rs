//! Local ONNX fallback classifier.

pub mod config;
pub mod model;
pub mod preprocess;
pub mod session_cache;

pub use config::LocalModelConfig;
pub use model::{OnnxClassifier, softmax};
pub use session_cache::SessionCache;
