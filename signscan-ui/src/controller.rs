//! Per-flow submission controller
//!
//! # State Progression
//! Idle → FileSelected → Submitting → Succeeded / Failed
//!
//! One controller instance exists per flow (image, video) and is the sole
//! owner of its SubmissionState, selection and preview. Terminal results
//! are published to the parent as messages on an mpsc channel; lifecycle
//! transitions are emitted on the shared EventBus.
//!
//! A monotonically increasing generation counter is captured in a
//! `SubmissionTicket` when a submission starts and compared again when its
//! outcome is applied. A reset or re-selection bumps the counter, so a
//! late-arriving response for a superseded attempt is discarded instead of
//! overwriting newer state.

use crate::client::{DetectClient, DetectOptions};
use crate::media::{self, SelectedMedia};
use crate::normalize::{normalize, ImageDetectResponse};
use crate::preview::generate_preview;
use chrono::Utc;
use signscan_common::events::{DetectEvent, EventBus};
use signscan_common::handle::MediaHandle;
use signscan_common::types::{DetectionResult, MediaKind, PreviewReference};
use signscan_common::{Error, ErrorCategory, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Submission lifecycle state, owned exclusively by one controller
#[derive(Debug)]
pub enum SubmissionState {
    /// No selection, nothing in flight
    Idle,
    /// A validated selection is waiting for submit
    FileSelected,
    /// One request is in flight; further submits are rejected
    Submitting,
    /// Terminal: the applied result of the last submission
    Succeeded(DetectionResult),
    /// Terminal: the error of the last attempt (validation or service)
    Failed(Error),
}

impl SubmissionState {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "Idle",
            SubmissionState::FileSelected => "FileSelected",
            SubmissionState::Submitting => "Submitting",
            SubmissionState::Succeeded(_) => "Succeeded",
            SubmissionState::Failed(_) => "Failed",
        }
    }
}

/// Message published to the parent: the terminal result, or `None` after
/// a reset. Always a fresh value, never a shared mutable reference.
#[derive(Debug, Clone)]
pub struct ResultUpdate {
    pub flow: MediaKind,
    pub result: Option<DetectionResult>,
}

/// Token for one submission attempt, captured at begin time
#[derive(Debug)]
pub struct SubmissionTicket {
    generation: u64,
    media: SelectedMedia,
}

impl SubmissionTicket {
    /// The selection this attempt submits
    pub fn media(&self) -> &SelectedMedia {
        &self.media
    }

    /// Generation the attempt was issued under
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Raw successful outcome of a submission, before applying
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// Image flow: parsed JSON body for the normalizer
    Image(ImageDetectResponse),
    /// Video flow: raw processed media bytes
    Video(Vec<u8>),
}

/// Per-flow submission controller
pub struct SubmissionController {
    flow: MediaKind,
    state: SubmissionState,
    selection: Option<SelectedMedia>,
    preview: Option<PreviewReference>,
    generation: u64,
    events: EventBus,
    result_tx: mpsc::UnboundedSender<ResultUpdate>,
}

impl SubmissionController {
    /// Create a controller for one flow
    pub fn new(
        flow: MediaKind,
        events: EventBus,
        result_tx: mpsc::UnboundedSender<ResultUpdate>,
    ) -> Self {
        Self {
            flow,
            state: SubmissionState::Idle,
            selection: None,
            preview: None,
            generation: 0,
            events,
            result_tx,
        }
    }

    /// Flow this controller serves
    pub fn flow(&self) -> MediaKind {
        self.flow
    }

    /// Current lifecycle state
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Current selection, if any
    pub fn selection(&self) -> Option<&SelectedMedia> {
        self.selection.as_ref()
    }

    /// Current preview, if one has been generated
    pub fn preview(&self) -> Option<&PreviewReference> {
        self.preview.as_ref()
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Select a file for this flow
    ///
    /// Validates the declared kind against the flow. A rejected selection
    /// moves to `Failed(validation)` with no selection stored; that state
    /// accepts a new `select` exactly like `Idle`. Any pending preview or
    /// submission outcome is invalidated by the generation bump.
    pub async fn select(&mut self, path: &Path) -> Result<()> {
        if matches!(self.state, SubmissionState::Submitting) {
            tracing::warn!(flow = %self.flow, "Ignoring selection while a submission is in flight");
            return Ok(());
        }

        let media = SelectedMedia::from_path(path).await?;

        // Supersede any outstanding preview or late response
        self.generation += 1;
        self.preview = None;

        if let Err(e) = media::validate(&media, self.flow) {
            let reason = e.to_string();
            tracing::warn!(
                flow = %self.flow,
                file_name = %media.file_name,
                reason = %reason,
                "Selection rejected"
            );
            self.events.emit_lossy(DetectEvent::SelectionRejected {
                flow: self.flow,
                file_name: media.file_name,
                reason: reason.clone(),
                timestamp: Utc::now(),
            });
            self.selection = None;
            self.state = SubmissionState::Failed(Error::Validation(reason));
            return Err(e);
        }

        tracing::info!(
            flow = %self.flow,
            file_name = %media.file_name,
            byte_size = media.byte_size,
            "Selection accepted"
        );
        self.events.emit_lossy(DetectEvent::SelectionAccepted {
            flow: self.flow,
            file_name: media.file_name.clone(),
            byte_size: media.byte_size,
            timestamp: Utc::now(),
        });
        self.selection = Some(media);
        self.state = SubmissionState::FileSelected;
        Ok(())
    }

    /// Generate a preview for the current selection
    ///
    /// Suspends until the file is fully read. If the selection changed
    /// while reading, the stale preview is dropped (last write wins).
    pub async fn load_preview(&mut self) -> Result<()> {
        let Some(media) = self.selection.clone() else {
            return Ok(());
        };
        let generation = self.generation;

        let preview = generate_preview(&media).await?;

        if generation != self.generation {
            tracing::debug!(flow = %self.flow, "Dropping superseded preview");
            return Ok(());
        }

        self.preview = Some(preview);
        self.events.emit_lossy(DetectEvent::PreviewReady {
            flow: self.flow,
            generation,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Start a submission attempt
    ///
    /// Moves to `Submitting` and returns the ticket the caller must pass
    /// back to [`apply_outcome`](Self::apply_outcome). Rejected while a
    /// submission is already in flight or when nothing is selected.
    pub fn begin_submit(&mut self) -> Result<SubmissionTicket> {
        if matches!(self.state, SubmissionState::Submitting) {
            return Err(Error::Validation(
                "A submission is already in progress".to_string(),
            ));
        }

        let Some(media) = self.selection.clone() else {
            let message = self.flow.no_selection_message().to_string();
            self.state = SubmissionState::Failed(Error::Validation(message.clone()));
            return Err(Error::Validation(message));
        };

        self.state = SubmissionState::Submitting;
        self.events.emit_lossy(DetectEvent::SubmissionStarted {
            flow: self.flow,
            generation: self.generation,
            file_name: media.file_name.clone(),
            timestamp: Utc::now(),
        });

        Ok(SubmissionTicket {
            generation: self.generation,
            media,
        })
    }

    /// Apply the outcome of a submission attempt
    ///
    /// The ticket's generation is compared against the current one first;
    /// outcomes for superseded attempts are discarded without touching
    /// state, and no media handle is ever created for them.
    pub async fn apply_outcome(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<SubmissionOutcome>,
    ) {
        if ticket.generation != self.generation {
            tracing::info!(
                flow = %self.flow,
                stale_generation = ticket.generation,
                current_generation = self.generation,
                "Discarding response for a superseded submission"
            );
            self.events.emit_lossy(DetectEvent::StaleResponseDiscarded {
                flow: self.flow,
                generation: ticket.generation,
                current_generation: self.generation,
                timestamp: Utc::now(),
            });
            return;
        }

        match outcome {
            Err(e) => self.fail(ticket.generation, e),
            Ok(SubmissionOutcome::Image(response)) => {
                let detections = normalize(&response);
                let count = detections.len();
                let result = DetectionResult::Image {
                    detections,
                    annotated_image: response.annotated_image,
                    source_preview: self.preview.clone(),
                    image_width: response.image_width,
                    image_height: response.image_height,
                };
                self.succeed(ticket.generation, result, Some(count));
            }
            Ok(SubmissionOutcome::Video(bytes)) => {
                match MediaHandle::create(&bytes, "mp4").await {
                    Err(e) => self.fail(ticket.generation, e.into()),
                    Ok(handle) => {
                        let result = DetectionResult::Video {
                            processed: Arc::new(handle),
                            original_preview: self.preview.clone(),
                            file_name: ticket.media.file_name,
                        };
                        self.succeed(ticket.generation, result, None);
                    }
                }
            }
        }
    }

    /// Submit the current selection and apply the outcome
    pub async fn submit(&mut self, client: &DetectClient, options: &DetectOptions) -> Result<()> {
        let ticket = self.begin_submit()?;

        let outcome = match self.flow {
            MediaKind::Image => client
                .detect_image(ticket.media(), options)
                .await
                .map(SubmissionOutcome::Image),
            MediaKind::Video => client
                .detect_video(ticket.media())
                .await
                .map(SubmissionOutcome::Video),
        };

        // Keep the failure for the caller; apply_outcome owns the value
        let failure = outcome
            .as_ref()
            .err()
            .map(|e| (e.category(), e.to_string()));

        self.apply_outcome(ticket, outcome).await;

        match failure {
            None => Ok(()),
            Some((ErrorCategory::Validation, message)) => Err(Error::Validation(message)),
            Some((ErrorCategory::Service, message)) => Err(Error::Service(message)),
        }
    }

    /// Clear selection, preview, error and result
    ///
    /// Publishes `None` to the parent and bumps the generation so any
    /// in-flight response is discarded when it arrives.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.selection = None;
        self.preview = None;
        // Dropping a Succeeded state releases its media handle reference
        self.state = SubmissionState::Idle;

        let _ = self.result_tx.send(ResultUpdate {
            flow: self.flow,
            result: None,
        });
        self.events.emit_lossy(DetectEvent::SelectionCleared {
            flow: self.flow,
            timestamp: Utc::now(),
        });
        tracing::info!(flow = %self.flow, "Controller reset");
    }

    fn succeed(&mut self, generation: u64, result: DetectionResult, count: Option<usize>) {
        self.state = SubmissionState::Succeeded(result.clone());
        let _ = self.result_tx.send(ResultUpdate {
            flow: self.flow,
            result: Some(result),
        });
        self.events.emit_lossy(DetectEvent::SubmissionSucceeded {
            flow: self.flow,
            generation,
            detection_count: count,
            timestamp: Utc::now(),
        });
        tracing::info!(flow = %self.flow, detection_count = ?count, "Submission succeeded");
    }

    fn fail(&mut self, generation: u64, error: Error) {
        let message = error.to_string();
        self.events.emit_lossy(DetectEvent::SubmissionFailed {
            flow: self.flow,
            generation,
            category: error.category(),
            message: message.clone(),
            timestamp: Utc::now(),
        });
        tracing::warn!(flow = %self.flow, error = %message, "Submission failed");
        self.state = SubmissionState::Failed(error);
    }
}
