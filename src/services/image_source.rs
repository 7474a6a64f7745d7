use crate::models::image_types::ImageRef;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "ico",
];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolves file picks and typed text into image references. Owns the
/// session's blob id counter.
#[derive(Debug, Default)]
pub struct ImageSource {
    next_blob_id: u64,
}

impl ImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the first picked file; an empty pick resolves to no image.
    pub fn from_files(&mut self, files: &[PathBuf]) -> Option<ImageRef> {
        let path = files.first()?;
        if !is_image_file(path) {
            // Not rejected here; decoding will surface it.
            debug!(path = %path.display(), "Picked file does not look like an image");
        }

        let id = self.next_blob_id;
        self.next_blob_id += 1;
        Some(ImageRef::Blob {
            id,
            path: path.clone(),
        })
    }

    /// The raw text is the reference. Empty text means no image.
    pub fn from_text(&self, raw: &str) -> Option<ImageRef> {
        if raw.is_empty() {
            None
        } else {
            Some(ImageRef::url(raw))
        }
    }
}
