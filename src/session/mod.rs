pub mod runtime;

#[cfg(test)]
pub(crate) mod fixture;

use crate::error::AppError;
use crate::models::classify_types::{DisplayPrediction, Prediction};
use crate::models::image_types::ImageRef;
use crate::models::session_types::{SessionEvent, ViewState};
use crate::services::classifier::{ModelHandle, ModelLoader};
use crate::services::history::History;
use crate::services::image_loader::ImageRenderer;
use crate::services::image_source::ImageSource;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoImage,
    Unclassified,
    Classified,
}

/// One classification request, tagged with the selection it was made for.
pub struct ClassifyTicket {
    pub generation: u64,
    pub image: ImageRef,
    pub model: ModelHandle,
}

impl ClassifyTicket {
    /// Renders the image and asks the model about it. Never touches the session.
    pub async fn run(self, renderer: &dyn ImageRenderer) -> ClassifyReport {
        let result = match renderer.render(&self.image).await {
            Ok(pixels) => self.model.classify(&pixels).await,
            Err(e) => Err(e),
        };
        ClassifyReport {
            generation: self.generation,
            image: self.image,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyReport {
    pub generation: u64,
    pub image: ImageRef,
    pub result: Result<Vec<Prediction>, AppError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdentifyOutcome {
    Applied,
    Failed(AppError),
    /// The selection changed while the call was running; the result was dropped.
    Discarded,
}

/// The whole mutable state of one interactive session.
///
/// Every mutation goes through the methods below and is announced on the event
/// channel, so a rendering layer only has to subscribe and redraw.
pub struct Session {
    model: Option<ModelHandle>,
    loading: bool,
    load_error: Option<String>,
    current: Option<ImageRef>,
    generation: u64,
    results: Vec<Prediction>,
    in_flight: Option<u64>,
    classify_error: Option<String>,
    url_input: String,
    history: History,
    source: ImageSource,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl Session {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            model: None,
            loading: false,
            load_error: None,
            current: None,
            generation: 0,
            results: Vec::new(),
            in_flight: None,
            classify_error: None,
            url_input: String::new(),
            history: History::new(),
            source: ImageSource::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ---- model loader ----

    /// Marks a load as started. `Ok(false)` means the model is already ready
    /// and there is nothing to do.
    pub fn begin_load(&mut self) -> Result<bool, AppError> {
        if self.loading {
            return Err(AppError::ModelLoading);
        }
        if self.model.is_some() {
            return Ok(false);
        }

        self.loading = true;
        self.load_error = None;
        info!("Loading model");
        self.emit(SessionEvent::ModelLoading);
        Ok(true)
    }

    pub fn complete_load(&mut self, result: Result<ModelHandle, AppError>) {
        self.loading = false;
        match result {
            Ok(model) => {
                self.model = Some(model);
                info!("Model ready");
                self.emit(SessionEvent::ModelReady);
            }
            Err(e) => {
                warn!(error = %e, "Model failed to load, classification unavailable until reload");
                let message = e.to_string();
                self.load_error = Some(message.clone());
                self.emit(SessionEvent::ModelLoadFailed { message });
            }
        }
    }

    /// Loads through `loader` and applies the outcome in one step.
    pub async fn load(&mut self, loader: &dyn ModelLoader) -> Result<(), AppError> {
        if !self.begin_load()? {
            return Ok(());
        }
        let result = loader.load().await;
        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        };
        self.complete_load(result);
        outcome
    }

    // ---- image source ----

    pub fn select_from_files(&mut self, files: &[PathBuf]) -> Option<&ImageRef> {
        let next = self.source.from_files(files);
        self.replace_current(next);
        self.current.as_ref()
    }

    pub fn select_from_text(&mut self, raw: &str) -> Option<&ImageRef> {
        self.url_input = raw.to_string();
        let next = self.source.from_text(raw);
        self.replace_current(next);
        self.current.as_ref()
    }

    // ---- history ----

    /// Makes a history entry current again. This is a fresh selection, so it is
    /// recorded at the front of the history too.
    pub fn reselect(&mut self, index: usize) -> Result<ImageRef, AppError> {
        let image = self
            .history
            .get(index)
            .map(|entry| entry.image.clone())
            .ok_or(AppError::HistoryIndexOutOfRange {
                index,
                len: self.history.len(),
            })?;
        self.replace_current(Some(image.clone()));
        Ok(image)
    }

    fn replace_current(&mut self, next: Option<ImageRef>) {
        self.generation += 1;
        if let Some(stale) = self.in_flight.take() {
            debug!(generation = stale, "Selection changed during classification");
        }
        self.results.clear();
        self.classify_error = None;
        self.emit(SessionEvent::ResultsCleared);

        debug!(image = ?next.as_ref().map(ToString::to_string), "Image selected");
        self.current = next;
        self.emit(SessionEvent::CurrentImageChanged {
            image: self.current.as_ref().map(ToString::to_string),
        });

        if let Some(image) = self.current.clone() {
            let label = image.to_string();
            self.history.record(image);
            self.emit(SessionEvent::HistoryPrepended {
                image: label,
                len: self.history.len(),
            });
        }
    }

    // ---- classifier invoker ----

    pub fn begin_identify(&mut self) -> Result<ClassifyTicket, AppError> {
        let model = self.model.clone().ok_or(AppError::ModelNotReady)?;
        let image = self.current.clone().ok_or(AppError::NoImageSelected)?;
        if self.in_flight.is_some() {
            return Err(AppError::ClassificationInProgress);
        }

        self.url_input.clear();
        self.emit(SessionEvent::UrlInputCleared);

        if !self.results.is_empty() {
            self.results.clear();
            self.emit(SessionEvent::ResultsCleared);
        }
        self.classify_error = None;
        self.in_flight = Some(self.generation);

        info!(image = %image, "Identifying image");
        self.emit(SessionEvent::ClassificationStarted {
            image: image.to_string(),
        });

        Ok(ClassifyTicket {
            generation: self.generation,
            image,
            model,
        })
    }

    /// Applies a finished classification, unless the selection has moved on.
    pub fn complete_identify(&mut self, report: ClassifyReport) -> IdentifyOutcome {
        let label = report.image.to_string();
        if report.generation != self.generation || self.in_flight != Some(report.generation) {
            debug!(image = %label, generation = report.generation, "Discarding stale classification");
            self.emit(SessionEvent::StaleResultDiscarded { image: label });
            return IdentifyOutcome::Discarded;
        }
        self.in_flight = None;

        match report.result {
            Ok(predictions) => {
                info!(image = %label, predictions = predictions.len(), "Classification finished");
                self.results = predictions;
                self.emit(SessionEvent::ResultsReady {
                    image: label,
                    results: self.display_results(),
                });
                IdentifyOutcome::Applied
            }
            Err(e) => {
                warn!(image = %label, error = %e, "Classification failed");
                self.results.clear();
                let message = e.to_string();
                self.classify_error = Some(message.clone());
                self.emit(SessionEvent::ClassificationFailed {
                    image: label,
                    message,
                });
                IdentifyOutcome::Failed(e)
            }
        }
    }

    /// Runs one classification of the current image to completion.
    pub async fn identify(
        &mut self,
        renderer: &dyn ImageRenderer,
    ) -> Result<IdentifyOutcome, AppError> {
        let ticket = self.begin_identify()?;
        let report = ticket.run(renderer).await;
        Ok(self.complete_identify(report))
    }

    /// Reports an intent that could not be carried out.
    pub fn reject(&self, err: &AppError) {
        warn!(error = %err, "Rejected user action");
        self.emit(SessionEvent::IntentRejected {
            reason: err.to_string(),
        });
    }

    // ---- read side ----

    pub fn phase(&self) -> Phase {
        match (&self.current, self.results.is_empty()) {
            (None, _) => Phase::NoImage,
            (Some(_), true) => Phase::Unclassified,
            (Some(_), false) => Phase::Classified,
        }
    }

    pub fn current(&self) -> Option<&ImageRef> {
        self.current.as_ref()
    }

    pub fn results(&self) -> &[Prediction] {
        &self.results
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn url_input(&self) -> &str {
        &self.url_input
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_model_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn is_classifying(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn can_identify(&self) -> bool {
        self.model.is_some() && self.current.is_some() && self.in_flight.is_none()
    }

    fn display_results(&self) -> Vec<DisplayPrediction> {
        self.results.iter().map(DisplayPrediction::from).collect()
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            is_loading: self.loading,
            model_ready: self.model.is_some(),
            current_image: self.current.as_ref().map(ToString::to_string),
            results: self.display_results(),
            history: self.history.iter().map(|e| e.image.to_string()).collect(),
            url_input: self.url_input.clone(),
            can_identify: self.can_identify(),
            classifying: self.in_flight.is_some(),
            error: self.classify_error.clone().or_else(|| self.load_error.clone()),
        }
    }
}
