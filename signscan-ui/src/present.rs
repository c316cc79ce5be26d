//! Result presentation
//!
//! `present` is a pure selector from the published result (or its absence)
//! to one of three render states; `render_text` writes a selected state to
//! the terminal. All aggregate statistics are computed here, not stored.

use base64::{engine::general_purpose, Engine as _};
use signscan_common::handle::MediaHandle;
use signscan_common::types::{BoundingBox, DetectionRecord, DetectionResult};
use signscan_common::Error;
use std::io::{self, Write};
use std::sync::Arc;

/// Fixed download name for processed videos
pub const VIDEO_DOWNLOAD_NAME: &str = "detected_video.mp4";

/// Coarse confidence bucket, for display purposes only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Tier cutoffs: above 0.7 is high, above 0.5 is medium, else low
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            ConfidenceTier::High
        } else if confidence > 0.5 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "high"),
            ConfidenceTier::Medium => write!(f, "medium"),
            ConfidenceTier::Low => write!(f, "low"),
        }
    }
}

/// One detection prepared for display
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    pub label: String,
    pub confidence: f64,
    pub tier: ConfidenceTier,
    pub bbox: BoundingBox,
}

impl DetectionRow {
    fn from_record(record: &DetectionRecord) -> Self {
        Self {
            label: record.label.clone(),
            confidence: record.confidence,
            tier: ConfidenceTier::from_confidence(record.confidence),
            bbox: record.bbox,
        }
    }

    /// Confidence as a percentage with one decimal place
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}", self.confidence * 100.0)
    }
}

/// Aggregate view over an image result
#[derive(Debug, Clone)]
pub struct ImageReport {
    /// Number of detections
    pub total: usize,
    /// Arithmetic mean confidence; exactly 0.0 when `total` is 0
    pub mean_confidence: f64,
    /// Annotated image carried through from the response
    pub annotated_image: Option<String>,
    /// Source image dimensions, when the server reports them
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    /// Per-detection rows in server-reported order
    pub rows: Vec<DetectionRow>,
}

impl ImageReport {
    fn from_parts(
        detections: &[DetectionRecord],
        annotated_image: Option<&String>,
        image_width: Option<u32>,
        image_height: Option<u32>,
    ) -> Self {
        let total = detections.len();
        let mean_confidence = if total == 0 {
            0.0
        } else {
            detections.iter().map(|d| d.confidence).sum::<f64>() / total as f64
        };

        Self {
            total,
            mean_confidence,
            annotated_image: annotated_image.cloned(),
            image_width,
            image_height,
            rows: detections.iter().map(DetectionRow::from_record).collect(),
        }
    }

    /// Mean confidence as a percentage with one decimal place
    pub fn mean_confidence_percent(&self) -> String {
        format!("{:.1}", self.mean_confidence * 100.0)
    }
}

/// View over a processed-video result
#[derive(Debug, Clone)]
pub struct VideoReport {
    /// Handle over the processed media, playable from its temp path
    pub processed: Arc<MediaHandle>,
    /// Name of the originally submitted file
    pub source_file_name: String,
    /// Fixed name offered for download
    pub download_name: &'static str,
}

/// The three render states
#[derive(Debug, Clone)]
pub enum RenderState {
    /// Nothing to show yet: idle placeholder
    Empty,
    /// Image result with statistics and per-detection rows
    Image(ImageReport),
    /// Processed video offered for playback and download
    Video(VideoReport),
}

/// Select the render state for a result (or its absence)
///
/// Pure: the state is entirely a function of the input.
pub fn present(result: Option<&DetectionResult>) -> RenderState {
    match result {
        None => RenderState::Empty,
        Some(DetectionResult::Image {
            detections,
            annotated_image,
            image_width,
            image_height,
            ..
        }) => RenderState::Image(ImageReport::from_parts(
            detections,
            annotated_image.as_ref(),
            *image_width,
            *image_height,
        )),
        Some(DetectionResult::Video {
            processed,
            file_name,
            ..
        }) => RenderState::Video(VideoReport {
            processed: processed.clone(),
            source_file_name: file_name.clone(),
            download_name: VIDEO_DOWNLOAD_NAME,
        }),
    }
}

/// Write a render state as terminal text
pub fn render_text<W: Write>(state: &RenderState, out: &mut W) -> io::Result<()> {
    match state {
        RenderState::Empty => {
            writeln!(out, "Detection results will appear here.")?;
            writeln!(out, "Submit an image or video to get started.")?;
        }
        RenderState::Image(report) => {
            writeln!(out, "Detection results")?;
            if let (Some(w), Some(h)) = (report.image_width, report.image_height) {
                writeln!(out, "Source image: {}x{} px", w, h)?;
            }
            writeln!(out, "Total signs: {}", report.total)?;
            writeln!(out, "Mean confidence: {}%", report.mean_confidence_percent())?;
            if report.annotated_image.is_some() {
                writeln!(out, "Annotated image included in response.")?;
            }

            if report.total == 0 {
                // Single well-defined zero-detections state
                writeln!(out, "No traffic signs detected.")?;
            } else {
                for (index, row) in report.rows.iter().enumerate() {
                    writeln!(
                        out,
                        "{:>3}. {}  {}% ({})  at ({:.0}, {:.0})  size {:.0} x {:.0}",
                        index + 1,
                        row.label,
                        row.confidence_percent(),
                        row.tier,
                        row.bbox.x,
                        row.bbox.y,
                        row.bbox.width,
                        row.bbox.height,
                    )?;
                }
            }
        }
        RenderState::Video(report) => {
            writeln!(out, "Processed video ready.")?;
            writeln!(out, "Source: {}", report.source_file_name)?;
            writeln!(out, "Playback: {}", report.processed.path().display())?;
            writeln!(out, "Download as: {}", report.download_name)?;
        }
    }
    Ok(())
}

/// Decode an annotated image for saving to disk
///
/// The service sends either a bare base64 string or a full
/// `data:image/...;base64,` URL; the prefix is stripped before decoding.
pub fn decode_annotated_image(encoded: &str) -> signscan_common::Result<Vec<u8>> {
    let payload = if encoded.starts_with("data:image") {
        encoded.split_once(',').map(|(_, p)| p).unwrap_or(encoded)
    } else {
        encoded
    };

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::Service(format!("Malformed annotated image: {}", e)))
}
