//! Detection response normalization (image flow)
//!
//! The detection service reports in either a simplified shape
//! (`objects_simple`: corner-array bboxes with `label`/`confidence`) or a
//! raw/legacy shape (`detections`: `box {x,y,w,h}` with `cls_name` and
//! `conf`/`score`). The normalizer reconciles both into one uniform
//! `DetectionRecord` list so callers never know which shape was used.

use serde::Deserialize;
use signscan_common::types::{BoundingBox, DetectionRecord};

/// Raw JSON body of `POST /api/detect/image`
///
/// Every field is optional; the server sends many more fields than these
/// (statistics, echo of inference parameters) which are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageDetectResponse {
    /// Simplified detection list, preferred when present and non-empty
    #[serde(default)]
    pub objects_simple: Option<Vec<RawRecord>>,

    /// Raw/legacy detection list, the fallback source
    #[serde(default)]
    pub detections: Option<Vec<RawRecord>>,

    /// Base64-encoded annotated image, carried through verbatim
    #[serde(default)]
    pub annotated_image: Option<String>,

    /// Source image width in pixels
    #[serde(default)]
    pub image_width: Option<u32>,

    /// Source image height in pixels
    #[serde(default)]
    pub image_height: Option<u32>,
}

/// One detection as the server reports it, tolerating both record shapes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    /// Simplified-shape class label
    #[serde(default)]
    pub label: Option<String>,

    /// Legacy-shape class label
    #[serde(default)]
    pub cls_name: Option<String>,

    /// Simplified-shape confidence
    #[serde(default)]
    pub confidence: Option<f64>,

    /// Legacy-shape confidence
    #[serde(default)]
    pub conf: Option<f64>,

    /// Alternate legacy confidence field
    #[serde(default)]
    pub score: Option<f64>,

    /// Corner-array bbox `[x1, y1, x2, y2]`
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,

    /// Object bbox `{x, y, w, h}`
    #[serde(default, rename = "box")]
    pub box_xywh: Option<RawBox>,
}

/// Legacy `{x, y, w, h}` bbox object; absent fields default to 0
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawBox {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub w: f64,
    #[serde(default)]
    pub h: f64,
}

/// Reconcile a raw response into the uniform detection list
///
/// Output order matches the chosen source list; no sorting or
/// de-duplication.
pub fn normalize(response: &ImageDetectResponse) -> Vec<DetectionRecord> {
    source_records(response)
        .iter()
        .map(normalize_record)
        .collect()
}

/// Deterministic source selector: prefer a non-empty `objects_simple`,
/// otherwise fall back to `detections` (possibly empty).
fn source_records(response: &ImageDetectResponse) -> &[RawRecord] {
    if let Some(simple) = response.objects_simple.as_deref() {
        if !simple.is_empty() {
            return simple;
        }
    }
    response.detections.as_deref().unwrap_or(&[])
}

/// Derive the uniform record from either raw shape
fn normalize_record(raw: &RawRecord) -> DetectionRecord {
    let bbox = match raw.bbox.as_deref() {
        Some(corners) => bbox_from_corners(corners),
        None => bbox_from_box(raw.box_xywh.unwrap_or_default()),
    };

    DetectionRecord {
        label: raw
            .label
            .clone()
            .or_else(|| raw.cls_name.clone())
            .unwrap_or_default(),
        confidence: raw.confidence.or(raw.conf).or(raw.score).unwrap_or(0.0),
        bbox,
    }
}

/// `[x1, y1, x2, y2]` corners → top-left + width/height
///
/// Absent elements default to 0. Malformed input producing negative
/// widths/heights passes through unmodified; the normalizer does not
/// clamp.
fn bbox_from_corners(corners: &[f64]) -> BoundingBox {
    let x1 = corners.first().copied().unwrap_or(0.0);
    let y1 = corners.get(1).copied().unwrap_or(0.0);
    let x2 = corners.get(2).copied().unwrap_or(0.0);
    let y2 = corners.get(3).copied().unwrap_or(0.0);

    BoundingBox {
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
    }
}

/// `{x, y, w, h}` object → uniform bbox, direct mapping
fn bbox_from_box(b: RawBox) -> BoundingBox {
    BoundingBox {
        x: b.x,
        y: b.y,
        width: b.w,
        height: b.h,
    }
}
