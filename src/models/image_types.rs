use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Reference to an image the user picked.
///
/// `Blob` is a session-scoped handle to a local file (ids are never reused within a
/// session, so picking the same file twice yields two distinct blobs). `Url` holds
/// whatever text the user typed, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImageRef {
    Blob { id: u64, path: PathBuf },
    Url { url: String },
}

impl ImageRef {
    pub fn url(url: impl Into<String>) -> Self {
        ImageRef::Url { url: url.into() }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Blob { id, path } => {
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                write!(f, "blob:{}/{}", id, name)
            }
            ImageRef::Url { url } => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub image: ImageRef,
    /// Insertion sequence number, starting at 0 for the first selection.
    pub seq: u64,
}
