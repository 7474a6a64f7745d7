use crate::error::AppError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MOBILENET_MODEL_URL: &str =
    "https://huggingface.co/Xenova/mobilenet_v2_1.0_224/resolve/main/onnx/model.onnx";
const MOBILENET_CONFIG_URL: &str =
    "https://huggingface.co/Xenova/mobilenet_v2_1.0_224/resolve/main/config.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub top_k: usize,
    pub http_timeout_secs: u64,
    /// Largest encoded image accepted from a file, `data:` URL or HTTP response.
    pub max_image_bytes: u64,
    pub event_capacity: usize,
    pub model: ModelConfig,
}

/// The single remote model artifact and how to feed it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_url: String,
    pub config_url: String,
    pub model_file: String,
    pub config_file: String,
    pub crop_size: u32,
    pub crop_pct: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub use_gpu: bool,
    pub intra_threads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            top_k: 3,
            http_timeout_secs: 30,
            max_image_bytes: 20 * 1024 * 1024,
            event_capacity: 64,
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_url: MOBILENET_MODEL_URL.to_string(),
            config_url: MOBILENET_CONFIG_URL.to_string(),
            model_file: "mobilenet_v2_1.0_224.onnx".to_string(),
            config_file: "mobilenet_v2_1.0_224-config.json".to_string(),
            crop_size: 224,
            crop_pct: 0.875,
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
            use_gpu: false,
            intra_threads: 4,
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file, or returns defaults when no path is given.
    /// Missing fields fall back to their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        if self.max_image_bytes == 0 {
            return Err(AppError::Config("max_image_bytes must be at least 1".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(AppError::Config("event_capacity must be at least 1".to_string()));
        }
        let crop_pct = self.model.crop_pct;
        if self.model.crop_size == 0 || !(crop_pct > 0.0 && crop_pct <= 1.0) {
            return Err(AppError::Config(
                "model.crop_size must be positive and model.crop_pct in (0, 1]".to_string(),
            ));
        }
        if self.model.std.iter().any(|s| *s == 0.0) {
            return Err(AppError::Config("model.std must not contain zeros".to_string()));
        }
        Ok(())
    }

    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("image-lens"))
        .unwrap_or_else(|| PathBuf::from(".image-lens"))
}
