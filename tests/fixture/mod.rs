use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use image_lens_lib::error::AppError;
use image_lens_lib::models::classify_types::Prediction;
use image_lens_lib::models::image_types::ImageRef;
use image_lens_lib::models::session_types::SessionEvent;
use image_lens_lib::services::classifier::{ImageClassifier, ModelHandle, ModelLoader};
use image_lens_lib::services::image_loader::ImageRenderer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

/// Answers with a fixed ranking, optionally waiting for a permit per call.
pub struct FakeClassifier {
    answer: Result<Vec<Prediction>, AppError>,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn tabby() -> Self {
        Self {
            answer: Ok(vec![Prediction::new("tabby", 0.87)]),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            answer: Err(AppError::classification(msg)),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Like [`FakeClassifier::tabby`], but each call waits for a permit on `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::tabby()
        }
    }
}

#[async_trait]
impl ImageClassifier for FakeClassifier {
    async fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| AppError::classification("gate closed"))?;
            permit.forget();
        }
        self.answer.clone()
    }
}

pub struct FakeLoader {
    handle: Result<ModelHandle, AppError>,
}

impl FakeLoader {
    pub fn ok(classifier: Arc<FakeClassifier>) -> Self {
        Self {
            handle: Ok(classifier),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            handle: Err(AppError::model_load(msg)),
        }
    }
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self) -> Result<ModelHandle, AppError> {
        self.handle.clone()
    }
}

pub struct FakeRenderer;

impl FakeRenderer {
    pub fn ok() -> Self {
        Self
    }
}

#[async_trait]
impl ImageRenderer for FakeRenderer {
    async fn render(&self, _image: &ImageRef) -> Result<DynamicImage, AppError> {
        Ok(DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
    }
}

pub async fn wait_for(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event stream ended: {}", e),
            }
        }
    })
    .await
    .expect("expected event did not arrive")
}
