use crate::models::classify_types::DisplayPrediction;
use serde::Serialize;
use std::path::PathBuf;

/// Something the user did in the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    FileSelected(Vec<PathBuf>),
    TextChanged(String),
    IdentifyClicked,
    HistoryItemClicked(usize),
    ReloadModel,
    Shutdown,
}

/// Change notification emitted by the session after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    ModelLoading,
    ModelReady,
    ModelLoadFailed { message: String },
    CurrentImageChanged { image: Option<String> },
    ResultsCleared,
    HistoryPrepended { image: String, len: usize },
    UrlInputCleared,
    ClassificationStarted { image: String },
    ResultsReady { image: String, results: Vec<DisplayPrediction> },
    ClassificationFailed { image: String, message: String },
    StaleResultDiscarded { image: String },
    IntentRejected { reason: String },
}

/// Everything a rendering layer needs to draw the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub is_loading: bool,
    pub model_ready: bool,
    pub current_image: Option<String>,
    pub results: Vec<DisplayPrediction>,
    pub history: Vec<String>,
    pub url_input: String,
    pub can_identify: bool,
    pub classifying: bool,
    pub error: Option<String>,
}
