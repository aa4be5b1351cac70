//! Incremental remote SDP for ORTC transports.
//!
//! A transport negotiates against a native peer that only speaks SDP. This
//! crate keeps the *remote* half of that conversation: a [`RemoteSdp`] made of
//! [`MediaSection`]s that are created per mid, paused, resumed, disabled and
//! recycled as producers and consumers come and go, and rendered to RFC 4566
//! text on demand.
//!
//! ```
//! use ortc_sdp_core::prelude::*;
//!
//! let mut sdp = RemoteSdp::new(TransportContext {
//!     ice_parameters: Some(IceParameters {
//!         username_fragment: "ufrag".into(),
//!         password: "pwd".into(),
//!         ice_lite: Some(true),
//!     }),
//!     ice_candidates: Some(Vec::new()),
//!     dtls_parameters: Some(DtlsParameters {
//!         role: Some(DtlsRole::Auto),
//!         fingerprints: vec![DtlsFingerprint {
//!             algorithm: "sha-256".into(),
//!             value: "AA:BB".into(),
//!         }],
//!     }),
//!     ..Default::default()
//! });
//!
//! let text = sdp.get_sdp();
//! assert!(text.contains("a=ice-lite"));
//! assert!(text.contains("a=group:BUNDLE"));
//! ```

// Error handling
pub mod error;

// SDP object model
pub mod session;
pub mod simulcast;
pub mod transport;
pub mod writer;

// Remote description
pub mod media_section;
pub mod remote_sdp;

// Local description helpers
pub mod utils;

// Public exports
pub use error::{Error, Result};
pub use media_section::{
    codec_name, fmtp_config, AnswerMediaSectionOptions, MediaSection, MediaSectionRole,
    MediaSectionState, OfferMediaSectionOptions, ProducerCodecOptions, TransportContext,
};
pub use remote_sdp::{MediaSectionIdx, RemoteSdp, DATA_CHANNEL_MID};
pub use session::{MediaObject, MediaType, SessionDescription};
pub use simulcast::{parse_simulcast_stream_list, write_simulcast_stream_list, SimulcastFormat};
pub use transport::{
    DtlsFingerprint, DtlsParameters, DtlsRole, IceCandidate, IceCandidateType, IceParameters,
    IceProtocol, IceTcpType, IpVersion, PlainRtpParameters,
};
pub use utils::{
    extract_dtls_parameters, extract_rtp_capabilities, get_cname, get_rtp_encodings,
    parse_fmtp_config,
};

/// Re-export of common types and functions
pub mod prelude {
    pub use super::{
        AnswerMediaSectionOptions, DtlsFingerprint, DtlsParameters, DtlsRole, Error,
        IceCandidate, IceParameters, MediaObject, MediaSection, MediaSectionIdx, MediaType,
        OfferMediaSectionOptions, PlainRtpParameters, ProducerCodecOptions, RemoteSdp, Result,
        TransportContext,
    };
}
