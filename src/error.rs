use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail")]
pub enum AppError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("invalid image reference: {0}")]
    InvalidImageReference(String),

    #[error("model is not loaded")]
    ModelNotReady,

    #[error("no image selected")]
    NoImageSelected,

    #[error("a classification is already running")]
    ClassificationInProgress,

    #[error("model is already loading")]
    ModelLoading,

    #[error("history index {index} out of range (history has {len} entries)")]
    HistoryIndexOutOfRange { index: usize, len: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl AppError {
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImageReference(msg.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}
