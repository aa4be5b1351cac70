//! RTP/SCTP capability negotiation for ORTC transports.
//!
//! This crate holds the pure, synchronous part of the negotiation: the
//! capability/parameter data model, the validator that fills wire-contract
//! defaults, the matcher that pairs local and remote capabilities into
//! [`ExtendedRtpCapabilities`], and the generators that derive concrete send
//! and receive parameter sets from them.
//!
//! ```
//! use ortc_rtp_core::prelude::*;
//!
//! let local = parse_rtp_capabilities(r#"{ "codecs": [
//!     { "mimeType": "audio/opus", "preferredPayloadType": 111, "clockRate": 48000, "channels": 2 }
//! ] }"#).unwrap();
//! let remote = parse_rtp_capabilities(r#"{ "codecs": [
//!     { "mimeType": "audio/opus", "preferredPayloadType": 100, "clockRate": 48000, "channels": 2 }
//! ] }"#).unwrap();
//!
//! let extended = get_extended_rtp_capabilities(&local, &remote);
//! assert!(can_send(MediaKind::Audio, &extended));
//!
//! let params = get_sending_rtp_parameters(MediaKind::Audio, &extended);
//! assert_eq!(params.codecs[0].payload_type, 111);
//! ```

// Error handling
pub mod error;

// Data model
pub mod types;
pub mod sctp;

// Validation and default filling
pub mod validation;

// Codec matching
pub mod h264;
pub mod negotiation;

// Parameter generation
pub mod parameters;
pub mod scalability;

// Public exports
pub use error::{Error, Result};
pub use negotiation::{
    can_receive, can_send, codecs_match, get_extended_rtp_capabilities, match_codecs,
    reduce_codecs, reduce_rtcp_feedback, MatchOptions,
};
pub use parameters::{
    generate_probator_rtp_parameters, get_recv_rtp_capabilities,
    get_sending_remote_rtp_parameters, get_sending_rtp_parameters,
};
pub use scalability::{parse_scalability_mode, ScalabilityMode};
pub use sctp::{NumSctpStreams, SctpCapabilities, SctpParameters, SctpStreamParameters};
pub use types::{
    is_rtx_mime_type, CodecDescriptor, Direction, ExtendedCodec, ExtendedHeaderExtension,
    ExtendedRtpCapabilities, MediaKind, ParameterValue, Parameters, Priority, RtcpFeedback,
    RtcpParameters, RtpCapabilities, RtpCodecCapability, RtpCodecParameters,
    RtpEncodingParameters, RtpHeaderExtension, RtpHeaderExtensionParameters, RtpParameters,
    RtxParameters,
};
pub use validation::{
    parse_rtp_capabilities, parse_rtp_parameters, parse_sctp_stream_parameters,
    validate_num_sctp_streams, validate_rtcp_feedback, validate_rtcp_parameters,
    validate_rtp_capabilities, validate_rtp_codec_capability, validate_rtp_codec_parameters,
    validate_rtp_encoding_parameters, validate_rtp_header_extension,
    validate_rtp_header_extension_parameters, validate_rtp_parameters,
    validate_sctp_capabilities, validate_sctp_parameters, validate_sctp_stream_parameters,
};

/// Re-export of common types and functions
pub mod prelude {
    pub use super::{
        can_receive, can_send, get_extended_rtp_capabilities, get_recv_rtp_capabilities,
        get_sending_remote_rtp_parameters, get_sending_rtp_parameters, parse_rtp_capabilities,
        parse_rtp_parameters, reduce_codecs, validate_rtp_capabilities, validate_rtp_parameters,
        Error, ExtendedRtpCapabilities, MediaKind, ParameterValue, Parameters, Result,
        RtpCapabilities, RtpCodecCapability, RtpCodecParameters, RtpEncodingParameters,
        RtpParameters, SctpCapabilities, SctpStreamParameters,
    };
}

/// Negotiation constants
pub mod constants {
    /// Mid of the bandwidth probing stream
    pub const PROBATOR_MID: &str = "probator";

    /// Payload type of the bandwidth probing stream
    pub const PROBATOR_PAYLOAD_TYPE: u8 = 127;

    /// SSRC of the bandwidth probing stream
    pub const PROBATOR_SSRC: u32 = 1234;

    /// Transport-wide congestion control header extension
    pub const TRANSPORT_WIDE_CC_URI: &str =
        "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

    /// Absolute send time header extension
    pub const ABS_SEND_TIME_URI: &str =
        "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
}
