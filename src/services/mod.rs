pub mod classifier;
pub mod history;
pub mod image_loader;
pub mod image_source;
