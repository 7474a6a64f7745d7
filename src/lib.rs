pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

use commands::intent::{parse_command, Command, HELP};
use commands::render;
use config::AppConfig;
use error::AppError;
use models::session_types::UserIntent;
use services::classifier::model_manager::ModelManager;
use services::image_loader::ImageLoader;
use session::runtime::SessionRuntime;
use session::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

/// Runs one interactive session on stdin/stdout until `quit` or end of input.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let model_manager = Arc::new(ModelManager::new(&config));
    let image_loader = Arc::new(ImageLoader::new(
        Duration::from_secs(config.http_timeout_secs),
        config.max_image_bytes,
    )?);

    let runtime = SessionRuntime::new(
        Session::new(config.event_capacity),
        model_manager,
        image_loader,
    );
    let view = runtime.view();
    let printer = tokio::spawn(render::print_events(runtime.subscribe()));

    let (intent_tx, intent_rx) = mpsc::channel(32);
    let session_task = tokio::spawn(runtime.run(intent_rx));

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Intent(UserIntent::Shutdown)) => break,
            Ok(Command::Intent(intent)) => {
                if intent_tx.send(intent).await.is_err() {
                    break;
                }
            }
            Ok(Command::Status) => println!("{}", render::describe_view(&view.borrow())),
            Ok(Command::Help) => println!("{}", HELP),
            Err(msg) => println!("{}", msg),
        }
    }

    let _ = intent_tx.send(UserIntent::Shutdown).await;
    let session = session_task
        .await
        .map_err(|e| AppError::Io(format!("Session task failed: {}", e)))?;
    info!(history = session.history().len(), "Session ended");
    drop(session);

    let _ = printer.await;
    Ok(())
}
