//! Detection service HTTP client
//!
//! One multipart POST per submission; JSON body back on the image
//! endpoint, raw media bytes on the video endpoint. The client does not
//! limit concurrency or retry - the controller state machine enforces one
//! request in flight per flow, and every failure is terminal for the
//! attempt.

use crate::media::SelectedMedia;
use crate::normalize::ImageDetectResponse;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use signscan_common::config::ClientConfig;
use signscan_common::{Error, Result};

const IMAGE_ENDPOINT: &str = "/api/detect/image";
const VIDEO_ENDPOINT: &str = "/api/detect/video";
const HEALTH_ENDPOINT: &str = "/api/health";

const USER_AGENT: &str = concat!("signscan/", env!("CARGO_PKG_VERSION"));

/// Optional inference parameters forwarded to the image endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions {
    /// Confidence threshold override (`conf` query parameter)
    pub conf: Option<f64>,
    /// Inference image size override (`imgsz` query parameter)
    pub imgsz: Option<u32>,
}

impl DetectOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(conf) = self.conf {
            query.push(("conf", conf.to_string()));
        }
        if let Some(imgsz) = self.imgsz {
            query.push(("imgsz", imgsz.to_string()));
        }
        query
    }
}

/// Service health report (`GET /api/health`)
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    /// Service status string ("ok" when healthy)
    pub status: String,
    /// Name of the loaded model checkpoint
    #[serde(default)]
    pub model: Option<String>,
}

/// Error body the service sends on failure
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// Detection service client
pub struct DetectClient {
    http: reqwest::Client,
    base_url: String,
}

impl DetectClient {
    /// Create a new client against `config.server_url`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        Ok(Self {
            http,
            base_url: config.server_url.clone(),
        })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit an image and return the raw parsed detection response
    pub async fn detect_image(
        &self,
        media: &SelectedMedia,
        options: &DetectOptions,
    ) -> Result<ImageDetectResponse> {
        let url = format!("{}{}", self.base_url, IMAGE_ENDPOINT);

        tracing::debug!(
            url = %url,
            file_name = %media.file_name,
            byte_size = media.byte_size,
            "Submitting image for detection"
        );

        let form = self.media_form(media).await?;
        let response = self
            .http
            .post(&url)
            .query(&options.query())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), &body));
        }

        let parsed: ImageDetectResponse = response
            .json()
            .await
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        tracing::info!(
            file_name = %media.file_name,
            simple = parsed.objects_simple.as_ref().map(|v| v.len()),
            raw = parsed.detections.as_ref().map(|v| v.len()),
            annotated = parsed.annotated_image.is_some(),
            "Image detection response received"
        );

        Ok(parsed)
    }

    /// Submit a video and return the processed media payload
    pub async fn detect_video(&self, media: &SelectedMedia) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, VIDEO_ENDPOINT);

        tracing::debug!(
            url = %url,
            file_name = %media.file_name,
            byte_size = media.byte_size,
            "Submitting video for detection"
        );

        let form = self.media_form(media).await?;
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        tracing::info!(
            file_name = %media.file_name,
            byte_size = bytes.len(),
            "Processed video received"
        );

        Ok(bytes.to_vec())
    }

    /// Query service health and loaded model
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}{}", self.base_url, HEALTH_ENDPOINT);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))
    }

    /// Build the single-part multipart form carrying the file
    async fn media_form(&self, media: &SelectedMedia) -> Result<Form> {
        let bytes = tokio::fs::read(&media.path).await?;

        let part = Part::bytes(bytes)
            .file_name(media.file_name.clone())
            .mime_str(&media.mime_type)
            .map_err(|e| Error::Service(connectivity_message(&e.to_string())))?;

        Ok(Form::new().part("file", part))
    }
}

/// Generic connectivity message carrying the raw failure text
fn connectivity_message(raw: &str) -> String {
    format!("Cannot reach the detection server: {}", raw)
}

/// Error for a non-2xx response: prefer the server-supplied `detail`
/// field, fall back to the generic message with status and body text.
fn service_error(status: u16, body: &str) -> Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(detail) = parsed.detail {
            return Error::Service(detail);
        }
    }
    Error::Service(connectivity_message(&format!("HTTP {}: {}", status, body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_prefers_detail_field() {
        let err = service_error(413, r#"{"detail": "file too large"}"#);
        assert_eq!(err.to_string(), "file too large");
    }

    #[test]
    fn service_error_falls_back_to_status_and_body() {
        let err = service_error(500, "boom");
        assert_eq!(
            err.to_string(),
            "Cannot reach the detection server: HTTP 500: boom"
        );

        // JSON without a detail field also falls back
        let err = service_error(500, r#"{"error": "x"}"#);
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn detect_options_build_expected_query() {
        let options = DetectOptions { conf: Some(0.25), imgsz: Some(640) };
        assert_eq!(
            options.query(),
            vec![("conf", "0.25".to_string()), ("imgsz", "640".to_string())]
        );

        assert!(DetectOptions::default().query().is_empty());
    }
}
