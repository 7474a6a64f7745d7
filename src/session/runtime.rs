use crate::error::AppError;
use crate::models::session_types::{SessionEvent, UserIntent, ViewState};
use crate::services::classifier::{ModelHandle, ModelLoader};
use crate::services::image_loader::ImageRenderer;
use crate::session::{ClassifyReport, Session};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error};

/// Results of the asynchronous work the loop spawned.
enum Completion {
    ModelLoaded(Result<ModelHandle, AppError>),
    Classified(ClassifyReport),
}

/// Single-task event loop that owns a [`Session`].
///
/// User intents come in on one channel, finished loads and classifications on
/// another. Only this loop mutates the session.
pub struct SessionRuntime {
    session: Session,
    loader: Arc<dyn ModelLoader>,
    renderer: Arc<dyn ImageRenderer>,
    view: watch::Sender<ViewState>,
}

impl SessionRuntime {
    pub fn new(
        session: Session,
        loader: Arc<dyn ModelLoader>,
        renderer: Arc<dyn ImageRenderer>,
    ) -> Self {
        let (view, _) = watch::channel(session.view());
        Self {
            session,
            loader,
            renderer,
            view,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Latest [`ViewState`], refreshed after every handled intent or completion.
    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// Starts the model load and processes intents until the channel closes or
    /// `Shutdown` arrives. Hands the session back at the end.
    pub async fn run(mut self, mut intents: mpsc::Receiver<UserIntent>) -> Session {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        self.start_load(&done_tx);
        self.publish_view();

        loop {
            tokio::select! {
                Some(done) = done_rx.recv() => self.handle_completion(done),
                intent = intents.recv() => match intent {
                    None | Some(UserIntent::Shutdown) => break,
                    Some(intent) => self.handle_intent(intent, &done_tx),
                },
            }
            self.publish_view();
        }

        debug!("Session loop finished");
        self.session
    }

    fn publish_view(&self) {
        self.view.send_replace(self.session.view());
    }

    fn handle_intent(&mut self, intent: UserIntent, done_tx: &mpsc::UnboundedSender<Completion>) {
        match intent {
            UserIntent::FileSelected(files) => {
                self.session.select_from_files(&files);
            }
            UserIntent::TextChanged(text) => {
                self.session.select_from_text(&text);
            }
            UserIntent::IdentifyClicked => self.start_identify(done_tx),
            UserIntent::HistoryItemClicked(index) => {
                if let Err(e) = self.session.reselect(index) {
                    self.session.reject(&e);
                }
            }
            UserIntent::ReloadModel => self.start_load(done_tx),
            UserIntent::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::ModelLoaded(result) => self.session.complete_load(result),
            Completion::Classified(report) => {
                self.session.complete_identify(report);
            }
        }
    }

    fn start_load(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) {
        match self.session.begin_load() {
            Ok(true) => {
                let loader = self.loader.clone();
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let result = match AssertUnwindSafe(loader.load()).catch_unwind().await {
                        Ok(result) => result,
                        Err(_) => {
                            error!("Model loader panicked");
                            Err(AppError::model_load("model loader panicked"))
                        }
                    };
                    let _ = done_tx.send(Completion::ModelLoaded(result));
                });
            }
            Ok(false) => debug!("Model already loaded"),
            Err(e) => self.session.reject(&e),
        }
    }

    fn start_identify(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) {
        let ticket = match self.session.begin_identify() {
            Ok(ticket) => ticket,
            Err(e) => {
                self.session.reject(&e);
                return;
            }
        };

        let renderer = self.renderer.clone();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let generation = ticket.generation;
            let image = ticket.image.clone();
            let report = match AssertUnwindSafe(ticket.run(renderer.as_ref()))
                .catch_unwind()
                .await
            {
                Ok(report) => report,
                Err(_) => {
                    error!(image = %image, "Classifier panicked");
                    ClassifyReport {
                        generation,
                        image,
                        result: Err(AppError::classification("classifier panicked")),
                    }
                }
            };
            let _ = done_tx.send(Completion::Classified(report));
        });
    }
}
