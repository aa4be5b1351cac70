//! Error types for the client core
//!
//! Negotiation and SDP errors from the lower crates are wrapped as-is so the
//! caller of `produce()`/`consume()` sees the original validation or
//! negotiation failure. Queue rejections keep their [`QueueError`] so callers
//! can tell a stopped transport from a handler failure.

use ortc_infra_common::QueueError;
use thiserror::Error;

/// Result type for client-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by devices, transports and their children
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Capability validation or negotiation failed
    #[error("RTP error: {0}")]
    Rtp(#[from] ortc_rtp_core::Error),

    /// Remote SDP bookkeeping failed
    #[error("SDP error: {0}")]
    Sdp(#[from] ortc_sdp_core::Error),

    /// The operation was rejected by the transport queue
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Method called on a closed or not yet loaded object
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The operation is not possible with the negotiated capabilities
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// No handler is available for the current environment
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// The media engine refused the operation
    #[error("Handler error: {0}")]
    Handler(String),

    /// The application's signaling callback failed
    #[error("Signaling error: {0}")]
    Signaling(String),

    /// The owning transport was closed
    #[error("Transport closed")]
    TransportClosed,
}

impl Error {
    /// Create an invalid state error
    pub fn invalid_state(details: impl Into<String>) -> Self {
        Self::InvalidState(details.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(details: impl Into<String>) -> Self {
        Self::Unsupported(details.into())
    }

    /// Create a handler error
    pub fn handler(details: impl Into<String>) -> Self {
        Self::Handler(details.into())
    }

    /// Create a signaling error
    pub fn signaling(details: impl Into<String>) -> Self {
        Self::Signaling(details.into())
    }

    /// Whether the caller may resubmit the operation
    ///
    /// Only stop and removal rejections qualify: the operation never ran (or
    /// was cut short), so nothing about the object itself is wrong.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Queue(QueueError::Stopped) | Self::Queue(QueueError::Removed)
        )
    }
}
