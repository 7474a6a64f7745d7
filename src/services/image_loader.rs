use crate::error::AppError;
use crate::models::image_types::ImageRef;
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use image::DynamicImage;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Turns an image reference into decoded pixels, the way a browser `<img>`
/// would before the classifier reads it.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, image: &ImageRef) -> Result<DynamicImage, AppError>;
}

pub struct ImageLoader {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ImageLoader {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, max_bytes })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::invalid_image(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::invalid_image(format!(
                "Failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }

        // Reject early when the server announces the size
        if let Some(len) = response.content_length() {
            ensure_within(url, len, self.max_bytes)?;
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AppError::invalid_image(format!("Failed to read {}: {}", url, e)))?;
            ensure_within(url, (body.len() + chunk.len()) as u64, self.max_bytes)?;
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    async fn read_bytes(&self, image: &ImageRef) -> Result<Vec<u8>, AppError> {
        match image {
            ImageRef::Blob { path, .. } => read_file(path, self.max_bytes).await,
            ImageRef::Url { url } => {
                if url.starts_with("data:") {
                    let bytes = decode_data_url(url)?;
                    ensure_within("data URL", bytes.len() as u64, self.max_bytes)?;
                    Ok(bytes)
                } else if url.starts_with("http://") || url.starts_with("https://") {
                    self.fetch(url).await
                } else {
                    let path = url.strip_prefix("file://").unwrap_or(url);
                    read_file(Path::new(path), self.max_bytes).await
                }
            }
        }
    }
}

#[async_trait]
impl ImageRenderer for ImageLoader {
    async fn render(&self, image: &ImageRef) -> Result<DynamicImage, AppError> {
        let bytes = self.read_bytes(image).await?;
        debug!(image = %image, bytes = bytes.len(), "Decoding image");

        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| AppError::invalid_image(format!("Decode task failed: {}", e)))?;

        decoded.map_err(|e| AppError::invalid_image(format!("Failed to decode {}: {}", image, e)))
    }
}

fn ensure_within(source: &str, len: u64, max_bytes: u64) -> Result<(), AppError> {
    if len > max_bytes {
        return Err(AppError::invalid_image(format!(
            "{} is larger than the {} byte limit",
            source, max_bytes
        )));
    }
    Ok(())
}

async fn read_file(path: &Path, max_bytes: u64) -> Result<Vec<u8>, AppError> {
    let read_err =
        |e: std::io::Error| AppError::invalid_image(format!("Failed to read {}: {}", path.display(), e));

    let len = tokio::fs::metadata(path).await.map_err(read_err)?.len();
    ensure_within(&path.display().to_string(), len, max_bytes)?;
    tokio::fs::read(path).await.map_err(read_err)
}

/// Decodes `data:[<mime>];base64,<payload>`.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, AppError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::invalid_image("Not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::invalid_image("Data URL has no payload"))?;

    if !meta.ends_with(";base64") {
        return Err(AppError::invalid_image("Only base64 data URLs are supported"));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::invalid_image(format!("Invalid base64 payload: {}", e)))
}
