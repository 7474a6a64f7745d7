use crate::config::{AppConfig, ModelConfig};
use crate::error::AppError;
use crate::models::classify_types::Prediction;
use crate::services::classifier::inference;
use crate::services::classifier::{ImageClassifier, ModelHandle, ModelLoader};
use async_trait::async_trait;
use futures::StreamExt;
use image::DynamicImage;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Downloads the fixed model artifact on first use and turns it into an
/// ONNX Runtime session.
#[derive(Clone)]
pub struct ModelManager {
    pub model_dir: PathBuf,
    config: ModelConfig,
    top_k: usize,
}

impl ModelManager {
    pub fn new(app_config: &AppConfig) -> Self {
        Self {
            model_dir: app_config.model_dir(),
            config: app_config.model.clone(),
            top_k: app_config.top_k,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.config.model_file)
    }

    pub fn config_path(&self) -> PathBuf {
        self.model_dir.join(&self.config.config_file)
    }

    pub fn is_downloaded(&self) -> bool {
        self.model_path().exists() && self.config_path().exists()
    }

    pub async fn download_model(&self) -> Result<(), AppError> {
        if self.is_downloaded() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.model_dir).await.map_err(|e| {
            AppError::model_load(format!("Failed to create model directory: {}", e))
        })?;

        // Config first, then the model weights
        let client = reqwest::Client::new();
        let config_path = self.config_path();
        if !config_path.exists() {
            download_file(&client, &self.config.config_url, &config_path).await?;
        }

        let model_path = self.model_path();
        if !model_path.exists() {
            download_file(&client, &self.config.model_url, &model_path).await?;
        }

        Ok(())
    }

    async fn load_labels(&self) -> Result<Vec<String>, AppError> {
        let config_path = self.config_path();
        let content = tokio::fs::read_to_string(&config_path).await.map_err(|e| {
            AppError::model_load(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;
        parse_labels(&content)
    }

    async fn build_session(&self) -> Result<Session, AppError> {
        let model_path = self.model_path();
        let use_gpu = self.config.use_gpu;
        let intra_threads = self.config.intra_threads;

        tokio::task::spawn_blocking(move || -> Result<Session, AppError> {
            let _ = ort::init().with_name("image-lens").commit();

            let mut builder = Session::builder()
                .map_err(|e| AppError::model_load(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
                .map_err(|e| AppError::model_load(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(intra_threads)
                .map_err(|e| AppError::model_load(format!("Failed to set intra threads: {}", e)))?;

            if use_gpu {
                builder = builder
                    .with_execution_providers([
                        ort::execution_providers::CUDAExecutionProvider::default().build(),
                        ort::execution_providers::CoreMLExecutionProvider::default().build(),
                        ort::execution_providers::CPUExecutionProvider::default().build(),
                    ])
                    .map_err(|e| {
                        AppError::model_load(format!("Failed to register GPU execution providers: {}", e))
                    })?;
            }

            builder
                .commit_from_file(model_path)
                .map_err(|e| AppError::model_load(format!("Failed to load ONNX model: {}", e)))
        })
        .await
        .map_err(|e| AppError::model_load(format!("Failed to spawn model loading task: {}", e)))?
    }
}

#[async_trait]
impl ModelLoader for ModelManager {
    async fn load(&self) -> Result<ModelHandle, AppError> {
        if !self.is_downloaded() {
            info!(dir = %self.model_dir.display(), "Model not cached, downloading");
            self.download_model().await?;
        }

        // Load labels from config.json id2label field
        let labels = self.load_labels().await?;
        // Initialize ONNX Runtime and load model
        let session = self.build_session().await?;
        info!(labels = labels.len(), "Model loaded");

        Ok(Arc::new(OnnxClassifier {
            session: Arc::new(Mutex::new(session)),
            labels: Arc::new(labels),
            config: self.config.clone(),
            top_k: self.top_k,
        }))
    }
}

/// Reads the `id2label` map of a Hugging Face `config.json`, ordered by class id.
pub fn parse_labels(config_json: &str) -> Result<Vec<String>, AppError> {
    let config: serde_json::Value = serde_json::from_str(config_json)
        .map_err(|e| AppError::model_load(format!("Failed to parse config JSON: {}", e)))?;

    let id2label = config["id2label"]
        .as_object()
        .ok_or_else(|| AppError::model_load("Config missing id2label field"))?;

    let mut labels: Vec<(usize, String)> = id2label
        .iter()
        .map(|(k, v)| {
            let idx = k
                .parse::<usize>()
                .map_err(|_| AppError::model_load(format!("Non-numeric label id {:?}", k)))?;
            let label = v.as_str().unwrap_or("unknown").to_string();
            Ok((idx, label))
        })
        .collect::<Result<_, AppError>>()?;
    labels.sort_by_key(|(idx, _)| *idx);

    Ok(labels.into_iter().map(|(_, label)| label).collect())
}

/// Where a download is staged until it has been written completely.
fn partial_path(dest: &Path) -> PathBuf {
    dest.with_extension("part")
}

async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), AppError> {
    let part = partial_path(dest);
    // Leftover from an interrupted run
    let _ = tokio::fs::remove_file(&part).await;

    let result = stream_to_file(client, url, &part).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
        return result;
    }

    // Only a fully flushed file ever appears under the final name
    tokio::fs::rename(&part, dest).await.map_err(|e| {
        AppError::model_load(format!("Failed to move {} into place: {}", dest.display(), e))
    })
}

async fn stream_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::model_load(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AppError::model_load(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut last_progress = 0;

    let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
        AppError::model_load(format!("Failed to create file {}: {}", dest.display(), e))
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::model_load(format!("Download interrupted: {}", e)))?;
        downloaded += chunk.len() as u64;
        tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
            .await
            .map_err(|e| AppError::model_load(format!("Failed to write to file: {}", e)))?;

        if total_size > 0 {
            let progress = (downloaded * 100) / total_size;
            // Log every 10%
            if progress >= last_progress + 10 {
                debug!(url, progress, "Downloading");
                last_progress = progress;
            }
        }
    }
    tokio::io::AsyncWriteExt::flush(&mut file)
        .await
        .map_err(|e| AppError::model_load(format!("Failed to write to file: {}", e)))?;

    info!(url, bytes = downloaded, "Download complete");
    Ok(())
}

/// ONNX-backed classifier handed out by [`ModelManager`].
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    labels: Arc<Vec<String>>,
    config: ModelConfig,
    top_k: usize,
}

#[async_trait]
impl ImageClassifier for OnnxClassifier {
    async fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, AppError> {
        let image = image.clone();
        let session = self.session.clone();
        let labels = self.labels.clone();
        let config = self.config.clone();
        let top_k = self.top_k;

        tokio::task::spawn_blocking(move || {
            let tensor = inference::preprocess_image(&image, &config)?;
            let mut guard = session
                .lock()
                .map_err(|_| AppError::classification("Model session lock poisoned"))?;
            inference::run_inference(&mut guard, tensor, &labels, top_k)
        })
        .await
        .map_err(|e| AppError::classification(format!("Classification task failed: {}", e)))?
    }
}
