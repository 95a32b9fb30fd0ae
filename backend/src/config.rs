use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5050";
pub const DEFAULT_MODEL_NAME: &str = "FruitsRecognition";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 45;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;
pub const DEFAULT_PORT: u16 = 81;
pub const DEFAULT_LOCAL_MODEL_PATH: &str = "Fruits.onnx";
pub const DEFAULT_LOCAL_CONFIG_PATH: &str = "config.json";

/// Service configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub deepstack_base_url: String,
    pub deepstack_model_name: String,
    pub deepstack_timeout: Duration,
    pub max_upload_mb: u64,
    pub port: u16,
    pub enable_local_onnx_fallback: bool,
    pub local_model_path: PathBuf,
    pub local_config_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deepstack_base_url: DEFAULT_BASE_URL.to_string(),
            deepstack_model_name: DEFAULT_MODEL_NAME.to_string(),
            deepstack_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            port: DEFAULT_PORT,
            enable_local_onnx_fallback: true,
            local_model_path: PathBuf::from(DEFAULT_LOCAL_MODEL_PATH),
            local_config_path: PathBuf::from(DEFAULT_LOCAL_CONFIG_PATH),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(&trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(trimmed)
}

impl AppConfig {
    /// Builds the config from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let deepstack_base_url = validate_base_url(
            &lookup("DEEPSTACK_BASE_URL").unwrap_or(defaults.deepstack_base_url),
        )?;

        let deepstack_timeout = match lookup("DEEPSTACK_TIMEOUT_SECONDS") {
            Some(value) => Duration::from_secs(parse_number("DEEPSTACK_TIMEOUT_SECONDS", value)?),
            None => defaults.deepstack_timeout,
        };

        let max_upload_mb = match lookup("MAX_UPLOAD_MB") {
            Some(value) => parse_number("MAX_UPLOAD_MB", value)?,
            None => defaults.max_upload_mb,
        };

        let port = match lookup("PORT") {
            Some(value) => parse_number("PORT", value)?,
            None => defaults.port,
        };

        Ok(Self {
            deepstack_base_url,
            deepstack_model_name: lookup("DEEPSTACK_MODEL_NAME").unwrap_or(defaults.deepstack_model_name),
            deepstack_timeout,
            max_upload_mb,
            port,
            enable_local_onnx_fallback: lookup("ENABLE_LOCAL_ONNX_FALLBACK")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_local_onnx_fallback),
            local_model_path: lookup("LOCAL_ONNX_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_model_path),
            local_config_path: lookup("LOCAL_ONNX_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_config_path),
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}
