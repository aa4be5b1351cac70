//! Error handling for capability validation and negotiation
//!
//! Everything in this crate is synchronous and pure, so errors surface
//! immediately to the caller of the failing operation.

use thiserror::Error;

/// Result type alias for rtp-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while validating or negotiating RTP/SCTP capabilities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A capability or parameter object is structurally invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// No compatible codec or profile exists between both sides
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// An H264 `profile-level-id` could not be parsed or combined
    #[error("Invalid profile-level-id: {0}")]
    InvalidProfileLevelId(String),

    /// A media kind other than audio/video was requested
    #[error("Unsupported media kind: {0}")]
    UnsupportedKind(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation(details: impl Into<String>) -> Self {
        Self::Validation(details.into())
    }

    /// Create a new negotiation error
    pub fn negotiation(details: impl Into<String>) -> Self {
        Self::Negotiation(details.into())
    }

    /// Whether this error was raised by the validator
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this error means both sides share no usable codec
    pub fn is_negotiation(&self) -> bool {
        matches!(self, Self::Negotiation(_) | Self::InvalidProfileLevelId(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Validation(error.to_string())
    }
}
