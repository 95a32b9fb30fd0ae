use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::LocalModelError;

pub const DEFAULT_WIDTH: u32 = 224;
pub const DEFAULT_HEIGHT: u32 = 224;
pub const DEFAULT_MEAN: f32 = 0.5;
pub const DEFAULT_STD: f32 = 255.0;

/// Preprocessing parameters and class labels for the local model.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalModelConfig {
    pub width: u32,
    pub height: u32,
    pub mean: f32,
    pub std: f32,
    pub labels: HashMap<String, String>,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            mean: DEFAULT_MEAN,
            std: DEFAULT_STD,
            labels: HashMap::new(),
        }
    }
}

impl LocalModelConfig {
    /// Reads the config file; `.yaml`/`.yml` is parsed as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, LocalModelError> {
        if !path.is_file() {
            return Err(LocalModelError::ConfigNotFound(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| LocalModelError::ConfigParse(format!("{}: {}", path.display(), e)))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let document: Value = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|e| LocalModelError::ConfigParse(e.to_string()))?
        } else {
            serde_json::from_str(&raw).map_err(|e| LocalModelError::ConfigParse(e.to_string()))?
        };

        Self::from_value(&document)
    }

    pub fn from_value(document: &Value) -> Result<Self, LocalModelError> {
        let fields = document
            .as_object()
            .ok_or_else(|| LocalModelError::ConfigParse("expected a mapping at the top level".into()))?;

        let std = float_field(fields.get("std"), DEFAULT_STD);

        let labels = match fields.get("map") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(index, label)| {
                    let label = match label {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (index.clone(), label)
                })
                .collect(),
            _ => HashMap::new(),
        };

        Ok(Self {
            width: dimension_field(fields.get("width"), "width", DEFAULT_WIDTH)?,
            height: dimension_field(fields.get("height"), "height", DEFAULT_HEIGHT)?,
            mean: float_field(fields.get("mean"), DEFAULT_MEAN),
            std: if std == 0.0 { DEFAULT_STD } else { std },
            labels,
        })
    }

    /// Label for a class index, `class_<index>` when the map has none.
    pub fn label_for(&self, index: usize) -> String {
        self.labels
            .get(&index.to_string())
            .cloned()
            .unwrap_or_else(|| format!("class_{}", index))
    }
}

fn float_field(value: Option<&Value>, default: f32) -> f32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(|v| v as f32).unwrap_or(default)
}

fn dimension_field(value: Option<&Value>, key: &str, default: u32) -> Result<u32, LocalModelError> {
    let parsed = match value {
        None => return Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v.trunc() as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    match parsed.and_then(|v| u32::try_from(v).ok()) {
        Some(v) if v > 0 => Ok(v),
        _ => Err(LocalModelError::ConfigParse(format!(
            "'{}' must be a positive integer, got {}",
            key,
            value.map(Value::to_string).unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults_apply() {
        let config = LocalModelConfig::from_value(&json!({})).unwrap();
        assert_eq!(config, LocalModelConfig::default());
        assert_eq!(config.label_for(3), "class_3");
    }

    #[test]
    fn test_zero_std_resets() {
        let config = LocalModelConfig::from_value(&json!({"std": 0})).unwrap();
        assert_eq!(config.std, 255.0);
    }

    #[test]
    fn test_lenient_numbers() {
        let config = LocalModelConfig::from_value(&json!({
            "width": "128",
            "height": 96.0,
            "mean": "0.25",
            "std": "oops"
        }))
        .unwrap();
        assert_eq!(config.width, 128);
        assert_eq!(config.height, 96);
        assert_eq!(config.mean, 0.25);
        assert_eq!(config.std, 255.0);
    }

    #[test]
    fn test_bad_dimension_rejected() {
        assert!(LocalModelConfig::from_value(&json!({"width": "wide"})).is_err());
        assert!(LocalModelConfig::from_value(&json!({"height": 0})).is_err());
    }

    #[test]
    fn test_label_map() {
        let config = LocalModelConfig::from_value(&json!({"map": {"0": "Apple", "1": 7}})).unwrap();
        assert_eq!(config.label_for(0), "Apple");
        assert_eq!(config.label_for(1), "7");
        assert_eq!(config.label_for(2), "class_2");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalModelConfig::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, LocalModelError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("config.json");
        let mut file = fs::File::create(&json_path).unwrap();
        write!(file, r#"{{"width": 64, "height": 64, "map": {{"0": "Banana"}}}}"#).unwrap();
        let config = LocalModelConfig::load(&json_path).unwrap();
        assert_eq!((config.width, config.height), (64, 64));
        assert_eq!(config.label_for(0), "Banana");

        let yaml_path = dir.path().join("config.yaml");
        fs::write(&yaml_path, "width: 32\nmean: 0.0\nstd: 1\nmap:\n  \"0\": Cherry\n").unwrap();
        let config = LocalModelConfig::load(&yaml_path).unwrap();
        assert_eq!(config.width, 32);
        assert_eq!(config.height, 224);
        assert_eq!(config.mean, 0.0);
        assert_eq!(config.std, 1.0);
        assert_eq!(config.label_for(0), "Cherry");
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            LocalModelConfig::load(&path).unwrap_err(),
            LocalModelError::ConfigParse(_)
        ));
    }
}
