//! Shared detection types
//!
//! These are the normalized types every module agrees on. Raw server
//! response shapes live in the client crate; only the reconciled records
//! defined here cross module boundaries.

use crate::handle::MediaHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declared media kind of a selected file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Derive the kind from a declared MIME type prefix
    /// (`image/*` or `video/*`); anything else is neither.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        if mime_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// User-facing message for a selection of the wrong kind
    pub fn wrong_kind_message(&self) -> &'static str {
        match self {
            MediaKind::Image => "Please select an image file (jpg, png, jpeg)",
            MediaKind::Video => "Please select a video file (mp4, avi, mov)",
        }
    }

    /// User-facing message for submitting with no selection
    pub fn no_selection_message(&self) -> &'static str {
        match self {
            MediaKind::Image => "Please select an image first",
            MediaKind::Video => "Please select a video first",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Axis-aligned bounding box: top-left corner plus width/height,
/// in source-image pixel units. Never clamped by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One normalized detection
///
/// Produced only by the response normalizer; immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Class label as reported by the server
    pub label: String,
    /// Confidence score in [0, 1]
    pub confidence: f64,
    /// Location in the source image
    pub bbox: BoundingBox,
}

/// Locally renderable representation of a selected file (a `data:` URL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewReference {
    /// MIME type the data URL was built with
    pub mime_type: String,
    /// `data:<mime>;base64,<payload>` string
    pub data_url: String,
}

/// Terminal result of a successful submission, discriminated by flow
#[derive(Debug, Clone)]
pub enum DetectionResult {
    /// Image flow: normalized detections plus optional annotated image
    Image {
        /// Detections in server-reported order
        detections: Vec<DetectionRecord>,
        /// Base64-encoded annotated image, carried through verbatim
        annotated_image: Option<String>,
        /// Preview of the submitted image, if one was generated
        source_preview: Option<PreviewReference>,
        /// Source image width in pixels, when the server reports it
        image_width: Option<u32>,
        /// Source image height in pixels, when the server reports it
        image_height: Option<u32>,
    },
    /// Video flow: processed media held as a local object reference
    Video {
        /// Temp-file handle over the returned binary payload
        processed: Arc<MediaHandle>,
        /// Preview of the submitted video, if one was generated
        original_preview: Option<PreviewReference>,
        /// Name of the originally selected file
        file_name: String,
    },
}

impl DetectionResult {
    /// Flow this result belongs to
    pub fn kind(&self) -> MediaKind {
        match self {
            DetectionResult::Image { .. } => MediaKind::Image,
            DetectionResult::Video { .. } => MediaKind::Video,
        }
    }

    /// Number of detections, where that makes sense (image flow only)
    pub fn detection_count(&self) -> Option<usize> {
        match self {
            DetectionResult::Image { detections, .. } => Some(detections.len()),
            DetectionResult::Video { .. } => None,
        }
    }
}
