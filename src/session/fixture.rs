use crate::error::AppError;
use crate::models::classify_types::Prediction;
use crate::models::image_types::ImageRef;
use crate::services::classifier::{ImageClassifier, ModelHandle, ModelLoader};
use crate::services::image_loader::ImageRenderer;
use crate::session::Session;
use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;

pub struct FakeClassifier {
    result: Result<Vec<Prediction>, AppError>,
    panics: bool,
}

impl FakeClassifier {
    pub fn tabby() -> Self {
        Self {
            result: Ok(vec![Prediction::new("tabby", 0.87)]),
            panics: false,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            result: Err(AppError::classification(msg)),
            panics: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::tabby()
        }
    }
}

#[async_trait]
impl ImageClassifier for FakeClassifier {
    async fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>, AppError> {
        if self.panics {
            panic!("fake classifier blew up");
        }
        self.result.clone()
    }
}

pub struct FakeLoader {
    result: Result<ModelHandle, AppError>,
    panics: bool,
}

impl FakeLoader {
    pub fn ok(classifier: FakeClassifier) -> Self {
        Self {
            result: Ok(Arc::new(classifier)),
            panics: false,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            result: Err(AppError::model_load(msg)),
            panics: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::failing("unreachable")
        }
    }
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self) -> Result<ModelHandle, AppError> {
        if self.panics {
            panic!("fake loader blew up");
        }
        self.result.clone()
    }
}

pub struct FakeRenderer {
    fail: bool,
}

impl FakeRenderer {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl ImageRenderer for FakeRenderer {
    async fn render(&self, image: &ImageRef) -> Result<DynamicImage, AppError> {
        if self.fail {
            return Err(AppError::invalid_image(format!("cannot render {}", image)));
        }
        Ok(DynamicImage::ImageRgb8(RgbImage::new(2, 2)))
    }
}

pub async fn ready_session(classifier: FakeClassifier) -> Session {
    let mut session = Session::default();
    session
        .load(&FakeLoader::ok(classifier))
        .await
        .expect("fake loader succeeds");
    session
}
