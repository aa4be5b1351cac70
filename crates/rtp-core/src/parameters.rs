//! Parameter generation from extended capabilities

use tracing::debug;

use crate::constants::{
    ABS_SEND_TIME_URI, PROBATOR_MID, PROBATOR_PAYLOAD_TYPE, PROBATOR_SSRC, TRANSPORT_WIDE_CC_URI,
};
use crate::error::{Error, Result};
use crate::types::{
    ExtendedCodec, ExtendedHeaderExtension, ExtendedRtpCapabilities, MediaKind, ParameterValue,
    Parameters, RtcpParameters, RtpCapabilities, RtpCodecCapability, RtpCodecParameters,
    RtpEncodingParameters, RtpHeaderExtension, RtpHeaderExtensionParameters, RtpParameters,
};
use crate::validation::validate_rtp_parameters;

fn rtx_parameters(apt: u8) -> Parameters {
    let mut parameters = Parameters::new();
    parameters.insert("apt".to_string(), ParameterValue::from(apt));
    parameters
}

fn rtx_mime_type(kind: MediaKind) -> String {
    format!("{}/rtx", kind)
}

fn sendable_extensions(
    kind: MediaKind,
    extended: &ExtendedRtpCapabilities,
) -> impl Iterator<Item = &ExtendedHeaderExtension> {
    extended.header_extensions.iter().filter(move |ext| {
        ext.kind.map_or(true, |k| k == kind) && ext.direction.can_send()
    })
}

fn sending_codecs<F>(
    kind: MediaKind,
    extended: &ExtendedRtpCapabilities,
    parameters: F,
) -> Vec<RtpCodecParameters>
where
    F: Fn(&ExtendedCodec) -> &Parameters,
{
    let mut codecs = Vec::new();

    for codec in extended.codecs.iter().filter(|codec| codec.kind == kind) {
        codecs.push(RtpCodecParameters {
            mime_type: codec.mime_type.clone(),
            payload_type: codec.local_payload_type,
            clock_rate: codec.clock_rate,
            channels: codec.channels,
            parameters: parameters(codec).clone(),
            rtcp_feedback: codec.rtcp_feedback.clone(),
        });

        if let Some(rtx_payload_type) = codec.local_rtx_payload_type {
            codecs.push(RtpCodecParameters {
                mime_type: rtx_mime_type(kind),
                payload_type: rtx_payload_type,
                clock_rate: codec.clock_rate,
                channels: None,
                parameters: rtx_parameters(codec.local_payload_type),
                rtcp_feedback: Vec::new(),
            });
        }
    }

    codecs
}

fn sending_header_extensions(
    kind: MediaKind,
    extended: &ExtendedRtpCapabilities,
) -> Vec<RtpHeaderExtensionParameters> {
    sendable_extensions(kind, extended)
        .map(|ext| RtpHeaderExtensionParameters {
            uri: ext.uri.clone(),
            id: ext.send_id,
            encrypt: Some(ext.encrypt),
            parameters: Parameters::new(),
        })
        .collect()
}

/// Parameters for sending media of `kind`
///
/// The result has no mid, no encodings and empty RTCP parameters; the caller
/// fills those per producer.
pub fn get_sending_rtp_parameters(
    kind: MediaKind,
    extended: &ExtendedRtpCapabilities,
) -> RtpParameters {
    RtpParameters {
        mid: None,
        codecs: sending_codecs(kind, extended, |codec| &codec.local_parameters),
        header_extensions: sending_header_extensions(kind, extended),
        encodings: Vec::new(),
        rtcp: RtcpParameters::default(),
    }
}

/// Parameters describing what the remote side receives, used for the answer
///
/// Codecs carry the remote parameters under the local payload types, so the
/// answer echoes the payload types of the local offer. RTCP feedback is then
/// reduced to a single congestion control mechanism:
///
/// - transport-wide-cc extension present: `goog-remb` is dropped
/// - else abs-send-time extension present: `transport-cc` is dropped
/// - else both are dropped
pub fn get_sending_remote_rtp_parameters(
    kind: MediaKind,
    extended: &ExtendedRtpCapabilities,
) -> RtpParameters {
    let mut params = RtpParameters {
        mid: None,
        codecs: sending_codecs(kind, extended, |codec| &codec.remote_parameters),
        header_extensions: sending_header_extensions(kind, extended),
        encodings: Vec::new(),
        rtcp: RtcpParameters::default(),
    };

    let has_extension = |uri: &str| params.header_extensions.iter().any(|ext| ext.uri == uri);

    let dropped: &[&str] = if has_extension(TRANSPORT_WIDE_CC_URI) {
        &["goog-remb"][..]
    } else if has_extension(ABS_SEND_TIME_URI) {
        &["transport-cc"][..]
    } else {
        &["transport-cc", "goog-remb"][..]
    };

    for codec in params.codecs.iter_mut() {
        codec
            .rtcp_feedback
            .retain(|fb| !dropped.contains(&fb.fb_type.as_str()));
    }

    params
}

/// Capabilities for receiving, expressed in remote payload types
pub fn get_recv_rtp_capabilities(extended: &ExtendedRtpCapabilities) -> RtpCapabilities {
    let mut caps = RtpCapabilities::default();

    for codec in &extended.codecs {
        caps.codecs.push(RtpCodecCapability {
            kind: Some(codec.kind),
            mime_type: codec.mime_type.clone(),
            preferred_payload_type: codec.remote_payload_type,
            clock_rate: codec.clock_rate,
            channels: codec.channels,
            parameters: codec.local_parameters.clone(),
            rtcp_feedback: codec.rtcp_feedback.clone(),
        });

        if let Some(rtx_payload_type) = codec.remote_rtx_payload_type {
            caps.codecs.push(RtpCodecCapability {
                kind: Some(codec.kind),
                mime_type: rtx_mime_type(codec.kind),
                preferred_payload_type: rtx_payload_type,
                clock_rate: codec.clock_rate,
                channels: None,
                parameters: rtx_parameters(codec.remote_payload_type),
                rtcp_feedback: Vec::new(),
            });
        }
    }

    for ext in extended
        .header_extensions
        .iter()
        .filter(|ext| ext.direction.can_receive())
    {
        caps.header_extensions.push(RtpHeaderExtension {
            kind: ext.kind,
            uri: ext.uri.clone(),
            preferred_id: ext.recv_id,
            preferred_encrypt: Some(ext.encrypt),
            direction: Some(ext.direction),
        });
    }

    caps
}

/// Parameters of the receive-only bandwidth probing stream
///
/// Built from the first codec of a video parameter set, which is validated
/// first.
pub fn generate_probator_rtp_parameters(video_params: &RtpParameters) -> Result<RtpParameters> {
    let mut video_params = video_params.clone();
    validate_rtp_parameters(&mut video_params)?;

    let mut codec = video_params
        .codecs
        .first()
        .cloned()
        .ok_or_else(|| Error::validation("video parameters have no codecs"))?;
    codec.payload_type = PROBATOR_PAYLOAD_TYPE;

    debug!(mime_type = %codec.mime_type, "generated probator RTP parameters");

    Ok(RtpParameters {
        mid: Some(PROBATOR_MID.to_string()),
        codecs: vec![codec],
        header_extensions: video_params.header_extensions,
        encodings: vec![RtpEncodingParameters {
            ssrc: Some(PROBATOR_SSRC),
            ..Default::default()
        }],
        rtcp: RtcpParameters {
            cname: Some(PROBATOR_MID.to_string()),
            reduced_size: None,
        },
    })
}
