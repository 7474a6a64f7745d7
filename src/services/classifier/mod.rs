pub mod inference;
pub mod model_manager;

use crate::error::AppError;
use crate::models::classify_types::Prediction;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;

/// A loaded classification service.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Ranked predictions for the decoded image, highest confidence first.
    async fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, AppError>;
}

/// Shared handle to the one classifier a session uses.
pub type ModelHandle = Arc<dyn ImageClassifier>;

/// Acquires the classification service.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<ModelHandle, AppError>;
}
