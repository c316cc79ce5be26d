//! Event types for the signscan event system
//!
//! Every submission controller emits lifecycle events on a shared
//! `EventBus` so observers (the terminal logger, tests) can follow the
//! state machine without holding a reference into it. Events are
//! fire-and-forget; losing them never affects the submission itself.

use crate::error::ErrorCategory;
use crate::types::MediaKind;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// signscan event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag for
/// structured logging or transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DetectEvent {
    /// A selected file passed validation and became the current selection
    SelectionAccepted {
        /// Flow that accepted the selection
        flow: MediaKind,
        /// Name of the selected file
        file_name: String,
        /// Declared size in bytes
        byte_size: u64,
        /// When the selection was accepted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A selected file was rejected by the media validator
    SelectionRejected {
        /// Flow that rejected the selection
        flow: MediaKind,
        /// Name of the rejected file
        file_name: String,
        /// Validation message shown to the user
        reason: String,
        /// When the selection was rejected
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A local preview finished generating for the current selection
    PreviewReady {
        /// Flow the preview belongs to
        flow: MediaKind,
        /// Generation the preview was requested under
        generation: u64,
        /// When the preview completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission left for the detection service
    SubmissionStarted {
        /// Flow that submitted
        flow: MediaKind,
        /// Generation token captured for this attempt
        generation: u64,
        /// Name of the submitted file
        file_name: String,
        /// When the submission started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission completed and its result was applied
    SubmissionSucceeded {
        /// Flow that succeeded
        flow: MediaKind,
        /// Generation token of the applied attempt
        generation: u64,
        /// Number of detections (image flow only)
        detection_count: Option<usize>,
        /// When the result was applied
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission failed; the controller is in the Failed state
    SubmissionFailed {
        /// Flow that failed
        flow: MediaKind,
        /// Generation token of the failed attempt
        generation: u64,
        /// Error category (validation vs. network/server)
        category: ErrorCategory,
        /// Message surfaced to the user
        message: String,
        /// When the failure was recorded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A response arrived for a superseded generation and was dropped
    StaleResponseDiscarded {
        /// Flow the stale response belonged to
        flow: MediaKind,
        /// Generation the response was issued under
        generation: u64,
        /// Generation current at apply time
        current_generation: u64,
        /// When the response was discarded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The controller was reset; selection, preview and result are gone
    SelectionCleared {
        /// Flow that was reset
        flow: MediaKind,
        /// When the reset happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for DetectEvent
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DetectEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// `capacity` is the number of events buffered before old events are
    /// dropped for slow subscribers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DetectEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DetectEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<DetectEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DetectEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
