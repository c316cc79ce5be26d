//! # signscan Common Library
//!
//! Shared code for the signscan client modules including:
//! - Detection result types (DetectionRecord, DetectionResult)
//! - Event types (DetectEvent enum) and EventBus
//! - Error taxonomy (validation vs. network/server)
//! - Server configuration resolution
//! - Temp-file media handles for binary responses

pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::MediaKind;
