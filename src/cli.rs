use crate::config::AppConfig;
use crate::error::AppError;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "image-lens")]
#[command(author, version, about = "Identify images with a pretrained classifier")]
pub struct Cli {
    /// JSON config file
    #[arg(short, long, env = "IMAGE_LENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where the model is cached
    #[arg(long, env = "IMAGE_LENS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// How many labels to show per image
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Try GPU execution providers before the CPU
    #[arg(long)]
    pub gpu: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<AppConfig, AppError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if self.gpu {
            config.model.use_gpu = true;
        }
        config.validate()?;
        Ok(config)
    }
}
