//! signscan-ui - detection submission frontend
//!
//! Terminal frontend for the remote traffic-sign detection service. Wires
//! the per-flow submission controllers to the HTTP client, normalizes the
//! service's detection responses, and renders results.
//!
//! Exposes public APIs for integration testing.

pub mod client;
pub mod controller;
pub mod media;
pub mod normalize;
pub mod present;
pub mod preview;

pub use client::{DetectClient, DetectOptions};
pub use controller::{ResultUpdate, SubmissionController, SubmissionState};
pub use present::{present, render_text, RenderState};
