//! crates/hafiz_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the hosted model that identifies recitations.

use async_trait::async_trait;
use crate::domain::AudioClip;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, vendor SDK).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("External service unavailable: {0}")]
    Unavailable(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RecitationMatcher: Send + Sync {
    /// Sends a recording to the model and returns its raw textual reply.
    ///
    /// The reply is expected to be a JSON array of candidate objects, possibly
    /// wrapped in a Markdown code fence. An empty array means no confident match;
    /// a passage repeated verbatim in several places yields one entry per place.
    async fn match_recitation(&self, audio: &AudioClip) -> PortResult<String>;
}
