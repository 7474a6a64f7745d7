use clap::Parser;
use image_lens_lib::cli::Cli;
use image_lens_lib::error::AppError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.resolve_config()?;
    image_lens_lib::run(config).await
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "image_lens_lib=debug,image_lens=debug"
    } else {
        "image_lens_lib=info,image_lens=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
