//! Selected media and the media validator
//!
//! The declared MIME type is derived from the file extension at selection
//! time; the validator itself only inspects that declared type's prefix
//! and never opens the file.

use signscan_common::{Error, MediaKind, Result};
use std::path::{Path, PathBuf};

/// Extension → declared MIME type table for supported image formats
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Extension → declared MIME type table for supported video formats
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
];

/// A user-selected file with its declared type and size
///
/// Created on selection, replaced wholesale on re-selection or reset,
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMedia {
    /// Filesystem location of the selection
    pub path: PathBuf,
    /// Bare file name, used for the multipart part and result display
    pub file_name: String,
    /// Declared MIME type derived from the extension
    pub mime_type: String,
    /// File size in bytes
    pub byte_size: u64,
}

impl SelectedMedia {
    /// Build a selection from a path, reading only filesystem metadata
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            mime_type: declared_mime_type(path).to_string(),
            file_name,
            byte_size: metadata.len(),
            path: path.to_path_buf(),
        })
    }

    /// Declared kind of this selection, if the type is recognized
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime_type)
    }

    /// Extension of the selected file, lowercased (empty if none)
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Declared MIME type for a path, from the extension tables
fn declared_mime_type(path: &Path) -> &'static str {
    let ext = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return "application/octet-stream",
    };

    IMAGE_TYPES
        .iter()
        .chain(VIDEO_TYPES.iter())
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

/// Validate that a selection's declared kind matches the active flow
///
/// Pure and synchronous: inspects only the declared MIME type prefix.
/// The caller stores the error state.
pub fn validate(media: &SelectedMedia, expected: MediaKind) -> Result<()> {
    match media.kind() {
        Some(kind) if kind == expected => Ok(()),
        _ => Err(Error::Validation(expected.wrong_kind_message().to_string())),
    }
}
