use crate::models::session_types::{SessionEvent, ViewState};
use tokio::sync::broadcast;
use tracing::warn;

pub fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::ModelLoading => "Loading...".to_string(),
        SessionEvent::ModelReady => "Model ready.".to_string(),
        SessionEvent::ModelLoadFailed { message } => {
            format!("Model unavailable: {} (type `reload` to retry)", message)
        }
        SessionEvent::CurrentImageChanged { image: Some(image) } => format!("Image: {}", image),
        SessionEvent::CurrentImageChanged { image: None } => "Image: (none)".to_string(),
        SessionEvent::ResultsCleared => String::new(),
        SessionEvent::HistoryPrepended { image, len } => {
            format!("Recent images ({}): {} ...", len, image)
        }
        SessionEvent::UrlInputCleared => String::new(),
        SessionEvent::ClassificationStarted { image } => format!("Identifying {}...", image),
        SessionEvent::ResultsReady { image, results } => {
            let mut out = format!("Results for {}:", image);
            for result in results {
                out.push_str(&format!(
                    "\n  {} - Accuracy level: {}",
                    result.label, result.confidence_percent
                ));
            }
            out
        }
        SessionEvent::ClassificationFailed { image, message } => {
            format!("Could not identify {}: {}", image, message)
        }
        SessionEvent::StaleResultDiscarded { .. } => String::new(),
        SessionEvent::IntentRejected { reason } => format!("Not now: {}", reason),
    }
}

pub fn describe_view(view: &ViewState) -> String {
    serde_json::to_string_pretty(view).unwrap_or_else(|e| format!("<unprintable view: {}>", e))
}

/// Prints events until the session goes away.
pub async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let line = describe_event(&event);
                if !line.is_empty() {
                    println!("{}", line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Display fell behind, some updates were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
