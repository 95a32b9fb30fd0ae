use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::config::LocalModelConfig;
use super::preprocess::preprocess_image;
use super::session_cache::{DEFAULT_SESSION_CAPACITY, SessionCache};
use crate::confidence::RawPrediction;
use crate::error::LocalModelError;
use crate::predictor::LocalClassifier;
use crate::upload::UploadedImage;

/// Softmax with the maximum subtracted first.
///
/// Returns all zeros when the exponentiated sum is not a positive finite number.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exp.iter().sum();

    if !(sum > 0.0 && sum.is_finite()) {
        return vec![0.0; logits.len()];
    }
    exp.into_iter().map(|v| v / sum).collect()
}

/// Pairs probabilities with their labels, highest first.
pub fn rank_probabilities(probabilities: &[f32], config: &LocalModelConfig) -> Vec<RawPrediction> {
    let mut ranked: Vec<RawPrediction> = probabilities
        .iter()
        .enumerate()
        .map(|(index, p)| RawPrediction::new(config.label_for(index), f64::from(*p)))
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

fn session_error(e: impl Display) -> LocalModelError {
    LocalModelError::Session(e.to_string())
}

fn inference_error(e: impl Display) -> LocalModelError {
    LocalModelError::Inference(e.to_string())
}

fn load_session(path: &Path) -> Result<Mutex<Session>, LocalModelError> {
    log::info!("Loading local ONNX model from {}", path.display());
    let session = Session::builder()
        .map_err(session_error)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(session_error)?
        .commit_from_file(path)
        .map_err(session_error)?;
    Ok(Mutex::new(session))
}

/// Local fruit classifier backed by an ONNX model on disk.
pub struct OnnxClassifier {
    model_path: PathBuf,
    config_path: PathBuf,
    sessions: SessionCache<Mutex<Session>>,
}

impl OnnxClassifier {
    pub fn new(model_path: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            config_path: config_path.into(),
            sessions: SessionCache::new(DEFAULT_SESSION_CAPACITY),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn session(&self) -> Result<Arc<Mutex<Session>>, LocalModelError> {
        let canonical = self
            .model_path
            .canonicalize()
            .map_err(|_| LocalModelError::ModelNotFound(self.model_path.clone()))?;
        self.sessions.get_or_load(&canonical, load_session)
    }

    fn run(session: &Mutex<Session>, input: ndarray::Array4<f32>) -> Result<Vec<f32>, LocalModelError> {
        let tensor = Tensor::from_array(input).map_err(inference_error)?;
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| LocalModelError::Inference("model declares no inputs".into()))?;

        let outputs = session
            .run(ort::inputs![input_name => tensor])
            .map_err(inference_error)?;
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| LocalModelError::Inference("model produced no outputs".into()))?;
        let (_, logits) = output
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        Ok(logits.to_vec())
    }

    pub fn predict(&self, image: &UploadedImage) -> Result<Vec<RawPrediction>, LocalModelError> {
        let config = LocalModelConfig::load(&self.config_path)?;
        let session = self.session()?;

        let input = preprocess_image(&image.data, &config)?;
        let logits = Self::run(&session, input)?;
        let probabilities = softmax(&logits);

        log::debug!(
            "Local ONNX inference produced {} class scores",
            probabilities.len()
        );

        Ok(rank_probabilities(&probabilities, &config))
    }
}

impl LocalClassifier for OnnxClassifier {
    fn classify(&self, image: &UploadedImage) -> Result<Vec<RawPrediction>, LocalModelError> {
        self.predict(image)
    }

    fn endpoint(&self) -> String {
        let name = self
            .model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.model_path.display().to_string());
        format!("local://onnx/{}", name)
    }
}
