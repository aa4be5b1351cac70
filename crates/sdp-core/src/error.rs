//! Error types for the SDP model

use thiserror::Error;

/// Result type alias for sdp-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or mutating a remote SDP
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No media section carries the given mid
    #[error("no media section found with mid '{mid}'")]
    MediaSectionNotFound {
        /// The unknown mid
        mid: String,
    },

    /// The operation is not allowed in the section's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A codec could not be described in SDP
    #[error("Invalid codec: {0}")]
    InvalidCodec(String),

    /// Parameters required to build a section were not given
    #[error("Missing parameters: {0}")]
    MissingParameters(String),
}

impl Error {
    /// Create a new media-section-not-found error
    pub fn not_found(mid: impl Into<String>) -> Self {
        Self::MediaSectionNotFound { mid: mid.into() }
    }

    /// Create a new invalid state error
    pub fn invalid_state(details: impl Into<String>) -> Self {
        Self::InvalidState(details.into())
    }

    /// Create a new missing parameters error
    pub fn missing(details: impl Into<String>) -> Self {
        Self::MissingParameters(details.into())
    }
}
