//! Structural validation and default filling
//!
//! Every `validate_*` function checks required fields, fills optional fields
//! with their documented defaults and fails on the first violation. The
//! defaults are part of the wire contract:
//!
//! - audio codecs get `channels = 1`, video codecs never carry `channels`
//! - RTCP feedback `parameter` defaults to `""`
//! - header extension capabilities default to `preferredEncrypt = false` and
//!   `direction = sendrecv`; header extension parameters to `encrypt = false`
//! - `rtcp.reducedSize` defaults to `true`
//! - SCTP streams are ordered unless a partial reliability limit is given
//!
//! Validation is idempotent: running it on an already validated object leaves
//! it untouched.

use std::collections::HashSet;

use tracing::trace;

use crate::error::{Error, Result};
use crate::sctp::{NumSctpStreams, SctpCapabilities, SctpParameters, SctpStreamParameters};
use crate::types::{
    Direction, MediaKind, Parameters, RtcpFeedback, RtcpParameters, RtpCapabilities,
    RtpCodecCapability, RtpCodecParameters, RtpEncodingParameters, RtpHeaderExtension,
    RtpHeaderExtensionParameters, RtpParameters,
};

/// Largest SCTP stream id a data channel may use
pub const MAX_SCTP_STREAM_ID: u16 = 65534;

/// Validate and fill defaults of a full capability set
pub fn validate_rtp_capabilities(caps: &mut RtpCapabilities) -> Result<()> {
    for codec in caps.codecs.iter_mut() {
        validate_rtp_codec_capability(codec)?;
    }

    let mut payload_types = HashSet::new();
    for codec in &caps.codecs {
        if !payload_types.insert(codec.preferred_payload_type) {
            return Err(Error::validation(format!(
                "duplicated codec.preferredPayloadType {}",
                codec.preferred_payload_type
            )));
        }
    }

    for ext in caps.header_extensions.iter_mut() {
        validate_rtp_header_extension(ext)?;
    }

    trace!(
        codecs = caps.codecs.len(),
        header_extensions = caps.header_extensions.len(),
        "validated RTP capabilities"
    );

    Ok(())
}

/// Validate a codec capability
pub fn validate_rtp_codec_capability(codec: &mut RtpCodecCapability) -> Result<()> {
    let kind = kind_from_mime_type(&codec.mime_type)?;

    match codec.kind {
        Some(given) if given != kind => {
            return Err(Error::validation(format!(
                "codec.kind {} does not match mimeType {}",
                given, codec.mime_type
            )));
        }
        _ => codec.kind = Some(kind),
    }

    if codec.clock_rate == 0 {
        return Err(Error::validation("missing codec.clockRate"));
    }

    codec.channels = default_channels(kind, codec.channels);
    validate_codec_parameters_map(&codec.parameters)?;

    for fb in codec.rtcp_feedback.iter_mut() {
        validate_rtcp_feedback(fb)?;
    }

    Ok(())
}

/// Validate an RTCP feedback entry
pub fn validate_rtcp_feedback(fb: &mut RtcpFeedback) -> Result<()> {
    if fb.fb_type.is_empty() {
        return Err(Error::validation("missing fb.type"));
    }

    if fb.parameter.is_none() {
        fb.parameter = Some(String::new());
    }

    Ok(())
}

/// Validate a header extension capability
pub fn validate_rtp_header_extension(ext: &mut RtpHeaderExtension) -> Result<()> {
    if ext.uri.is_empty() {
        return Err(Error::validation("missing ext.uri"));
    }

    if ext.preferred_id == 0 {
        return Err(Error::validation(format!(
            "invalid ext.preferredId 0 for {}",
            ext.uri
        )));
    }

    if ext.preferred_encrypt.is_none() {
        ext.preferred_encrypt = Some(false);
    }

    if ext.direction.is_none() {
        ext.direction = Some(Direction::SendRecv);
    }

    Ok(())
}

/// Validate a full parameter set of one RTP stream
pub fn validate_rtp_parameters(params: &mut RtpParameters) -> Result<()> {
    if matches!(params.mid.as_deref(), Some("")) {
        return Err(Error::validation("empty params.mid"));
    }

    for codec in params.codecs.iter_mut() {
        validate_rtp_codec_parameters(codec)?;
    }

    let mut payload_types = HashSet::new();
    for codec in &params.codecs {
        if !payload_types.insert(codec.payload_type) {
            return Err(Error::validation(format!(
                "duplicated codec.payloadType {}",
                codec.payload_type
            )));
        }
    }

    for ext in params.header_extensions.iter_mut() {
        validate_rtp_header_extension_parameters(ext)?;
    }

    for encoding in params.encodings.iter_mut() {
        validate_rtp_encoding_parameters(encoding)?;
    }

    validate_rtcp_parameters(&mut params.rtcp)
}

/// Validate the parameters of one codec of an RTP stream
pub fn validate_rtp_codec_parameters(codec: &mut RtpCodecParameters) -> Result<()> {
    let kind = kind_from_mime_type(&codec.mime_type)?;

    if codec.clock_rate == 0 {
        return Err(Error::validation("missing codec.clockRate"));
    }

    codec.channels = default_channels(kind, codec.channels);
    validate_codec_parameters_map(&codec.parameters)?;

    for fb in codec.rtcp_feedback.iter_mut() {
        validate_rtcp_feedback(fb)?;
    }

    Ok(())
}

/// Validate a header extension of an RTP stream
pub fn validate_rtp_header_extension_parameters(
    ext: &mut RtpHeaderExtensionParameters,
) -> Result<()> {
    if ext.uri.is_empty() {
        return Err(Error::validation("missing ext.uri"));
    }

    if ext.id == 0 {
        return Err(Error::validation(format!("invalid ext.id 0 for {}", ext.uri)));
    }

    if ext.encrypt.is_none() {
        ext.encrypt = Some(false);
    }

    Ok(())
}

/// Validate one encoding
pub fn validate_rtp_encoding_parameters(encoding: &mut RtpEncodingParameters) -> Result<()> {
    if matches!(encoding.rid.as_deref(), Some("")) {
        return Err(Error::validation("empty encoding.rid"));
    }

    if let Some(scale) = encoding.scale_resolution_down_by {
        if !(scale >= 1.0) {
            return Err(Error::validation(format!(
                "invalid encoding.scaleResolutionDownBy {}",
                scale
            )));
        }
    }

    if matches!(encoding.scalability_mode.as_deref(), Some("")) {
        return Err(Error::validation("empty encoding.scalabilityMode"));
    }

    Ok(())
}

/// Validate RTCP parameters
pub fn validate_rtcp_parameters(rtcp: &mut RtcpParameters) -> Result<()> {
    if matches!(rtcp.cname.as_deref(), Some("")) {
        return Err(Error::validation("empty rtcp.cname"));
    }

    if rtcp.reduced_size.is_none() {
        rtcp.reduced_size = Some(true);
    }

    Ok(())
}

/// Validate SCTP capabilities
pub fn validate_sctp_capabilities(caps: &SctpCapabilities) -> Result<()> {
    validate_num_sctp_streams(&caps.num_streams)
}

/// Validate SCTP stream counts
pub fn validate_num_sctp_streams(streams: &NumSctpStreams) -> Result<()> {
    validate_stream_count("OS", streams.os)?;
    validate_stream_count("MIS", streams.mis)
}

/// Validate SCTP association parameters
pub fn validate_sctp_parameters(params: &SctpParameters) -> Result<()> {
    if params.port == 0 {
        return Err(Error::validation("missing params.port"));
    }

    validate_stream_count("OS", params.os)?;
    validate_stream_count("MIS", params.mis)?;

    if params.max_message_size == 0 {
        return Err(Error::validation("missing params.maxMessageSize"));
    }

    Ok(())
}

/// Validate one SCTP stream, resolving `ordered`
pub fn validate_sctp_stream_parameters(params: &mut SctpStreamParameters) -> Result<()> {
    if params.stream_id > MAX_SCTP_STREAM_ID {
        return Err(Error::validation(format!(
            "invalid params.streamId {}",
            params.stream_id
        )));
    }

    let partially_reliable =
        params.max_packet_life_time.is_some() || params.max_retransmits.is_some();

    if params.max_packet_life_time.is_some() && params.max_retransmits.is_some() {
        return Err(Error::validation(
            "cannot provide both maxPacketLifeTime and maxRetransmits",
        ));
    }

    match params.ordered {
        Some(true) if partially_reliable => {
            return Err(Error::validation(
                "cannot be ordered with maxPacketLifeTime or maxRetransmits",
            ));
        }
        None if partially_reliable => params.ordered = Some(false),
        None => params.ordered = Some(true),
        Some(_) => {}
    }

    if params.label.is_none() {
        params.label = Some(String::new());
    }

    if params.protocol.is_none() {
        params.protocol = Some(String::new());
    }

    Ok(())
}

/// Deserialize and validate a capability document
pub fn parse_rtp_capabilities(json: &str) -> Result<RtpCapabilities> {
    let mut caps: RtpCapabilities = serde_json::from_str(json)?;
    validate_rtp_capabilities(&mut caps)?;
    Ok(caps)
}

/// Deserialize and validate an RTP parameter document
pub fn parse_rtp_parameters(json: &str) -> Result<RtpParameters> {
    let mut params: RtpParameters = serde_json::from_str(json)?;
    validate_rtp_parameters(&mut params)?;
    Ok(params)
}

/// Deserialize and validate an SCTP stream parameter document
pub fn parse_sctp_stream_parameters(json: &str) -> Result<SctpStreamParameters> {
    let mut params: SctpStreamParameters = serde_json::from_str(json)?;
    validate_sctp_stream_parameters(&mut params)?;
    Ok(params)
}

fn kind_from_mime_type(mime_type: &str) -> Result<MediaKind> {
    if mime_type.is_empty() {
        return Err(Error::validation("missing codec.mimeType"));
    }

    MediaKind::from_mime_type(mime_type)
        .ok_or_else(|| Error::validation(format!("invalid codec.mimeType {}", mime_type)))
}

fn default_channels(kind: MediaKind, channels: Option<u8>) -> Option<u8> {
    match kind {
        MediaKind::Audio => Some(channels.unwrap_or(1)),
        MediaKind::Video => None,
    }
}

fn validate_codec_parameters_map(parameters: &Parameters) -> Result<()> {
    if let Some(apt) = parameters.get("apt") {
        if !apt.is_number() {
            return Err(Error::validation("invalid codec apt parameter"));
        }
    }
    Ok(())
}

fn validate_stream_count(name: &str, value: u32) -> Result<()> {
    if !(1..=65535).contains(&value) {
        return Err(Error::validation(format!(
            "invalid numStreams.{} {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterValue;
    use pretty_assertions::assert_eq;

    fn audio_caps_json() -> &'static str {
        r#"{
            "codecs": [
                {
                    "mimeType": "audio/opus",
                    "preferredPayloadType": 100,
                    "clockRate": 48000,
                    "channels": 2,
                    "rtcpFeedback": [{ "type": "transport-cc" }]
                },
                {
                    "mimeType": "video/VP8",
                    "preferredPayloadType": 101,
                    "clockRate": 90000,
                    "channels": 1
                },
                {
                    "mimeType": "video/rtx",
                    "preferredPayloadType": 102,
                    "clockRate": 90000,
                    "parameters": { "apt": 101 }
                }
            ],
            "headerExtensions": [
                { "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 1 }
            ]
        }"#
    }

    #[test]
    fn test_capabilities_defaults() {
        let caps = parse_rtp_capabilities(audio_caps_json()).unwrap();

        assert_eq!(caps.codecs[0].kind, Some(MediaKind::Audio));
        assert_eq!(caps.codecs[0].channels, Some(2));
        assert_eq!(caps.codecs[0].rtcp_feedback[0].parameter.as_deref(), Some(""));
        assert_eq!(caps.codecs[1].kind, Some(MediaKind::Video));
        assert_eq!(caps.codecs[1].channels, None);

        let ext = &caps.header_extensions[0];
        assert_eq!(ext.preferred_encrypt, Some(false));
        assert_eq!(ext.direction, Some(Direction::SendRecv));
    }

    #[test]
    fn test_audio_channels_default_to_one() {
        let mut codec: RtpCodecCapability = serde_json::from_str(
            r#"{ "mimeType": "audio/PCMU", "preferredPayloadType": 0, "clockRate": 8000 }"#,
        )
        .unwrap();
        validate_rtp_codec_capability(&mut codec).unwrap();
        assert_eq!(codec.channels, Some(1));
    }

    #[test]
    fn test_invalid_mime_type() {
        let mut codec: RtpCodecCapability = serde_json::from_str(
            r#"{ "mimeType": "text/plain", "preferredPayloadType": 99, "clockRate": 1000 }"#,
        )
        .unwrap();
        let err = validate_rtp_codec_capability(&mut codec).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_kind_mismatch() {
        let mut codec: RtpCodecCapability = serde_json::from_str(
            r#"{ "kind": "audio", "mimeType": "video/VP8", "preferredPayloadType": 96, "clockRate": 90000 }"#,
        )
        .unwrap();
        assert!(validate_rtp_codec_capability(&mut codec).is_err());
    }

    #[test]
    fn test_non_numeric_apt_rejected() {
        let mut codec: RtpCodecCapability = serde_json::from_str(
            r#"{ "mimeType": "video/rtx", "preferredPayloadType": 97, "clockRate": 90000, "parameters": { "apt": "96" } }"#,
        )
        .unwrap();
        assert!(validate_rtp_codec_capability(&mut codec).is_err());

        codec.parameters.insert("apt".into(), ParameterValue::Integer(96));
        assert!(validate_rtp_codec_capability(&mut codec).is_ok());
    }

    #[test]
    fn test_duplicated_payload_type() {
        let json = r#"{
            "codecs": [
                { "mimeType": "audio/opus", "preferredPayloadType": 100, "clockRate": 48000, "channels": 2 },
                { "mimeType": "audio/PCMU", "preferredPayloadType": 100, "clockRate": 8000 }
            ]
        }"#;
        let err = parse_rtp_capabilities(json).unwrap_err();
        assert!(err.to_string().contains("duplicated"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse_rtp_parameters(r#"{ "codecs": [{ "mimeType": "audio/opus" }] }"#)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_rtp_parameters_defaults() {
        let params = parse_rtp_parameters(
            r#"{
                "codecs": [{ "mimeType": "audio/opus", "payloadType": 111, "clockRate": 48000, "channels": 2 }],
                "headerExtensions": [{ "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "id": 4 }]
            }"#,
        )
        .unwrap();

        assert!(params.encodings.is_empty());
        assert_eq!(params.rtcp.reduced_size, Some(true));
        assert_eq!(params.header_extensions[0].encrypt, Some(false));
        assert!(params.header_extensions[0].parameters.is_empty());
    }

    #[test]
    fn test_rtp_parameters_validation_is_idempotent() {
        let mut params = parse_rtp_parameters(
            r#"{
                "mid": "0",
                "codecs": [
                    { "mimeType": "video/VP8", "payloadType": 96, "clockRate": 90000,
                      "rtcpFeedback": [{ "type": "nack" }, { "type": "nack", "parameter": "pli" }] },
                    { "mimeType": "video/rtx", "payloadType": 97, "clockRate": 90000,
                      "parameters": { "apt": 96 } }
                ],
                "encodings": [{ "ssrc": 1111, "rtx": { "ssrc": 2222 } }],
                "rtcp": { "cname": "abc" }
            }"#,
        )
        .unwrap();

        let first = serde_json::to_string(&params).unwrap();
        validate_rtp_parameters(&mut params).unwrap();
        let second = serde_json::to_string(&params).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_scale_resolution_down_by() {
        let mut encoding = RtpEncodingParameters {
            scale_resolution_down_by: Some(0.5),
            ..Default::default()
        };
        assert!(validate_rtp_encoding_parameters(&mut encoding).is_err());

        encoding.scale_resolution_down_by = Some(2.0);
        assert!(validate_rtp_encoding_parameters(&mut encoding).is_ok());
    }

    #[test]
    fn test_sctp_stream_ordered_defaults() {
        let params = parse_sctp_stream_parameters(r#"{ "streamId": 1 }"#).unwrap();
        assert_eq!(params.ordered, Some(true));
        assert_eq!(params.label.as_deref(), Some(""));
        assert_eq!(params.protocol.as_deref(), Some(""));

        let params =
            parse_sctp_stream_parameters(r#"{ "streamId": 2, "maxRetransmits": 3 }"#).unwrap();
        assert_eq!(params.ordered, Some(false));

        let params = parse_sctp_stream_parameters(
            r#"{ "streamId": 2, "maxPacketLifeTime": 100, "ordered": false }"#,
        )
        .unwrap();
        assert_eq!(params.ordered, Some(false));
    }

    #[test]
    fn test_sctp_stream_conflicts() {
        assert!(parse_sctp_stream_parameters(
            r#"{ "streamId": 1, "maxRetransmits": 3, "maxPacketLifeTime": 100 }"#
        )
        .is_err());

        assert!(parse_sctp_stream_parameters(
            r#"{ "streamId": 1, "ordered": true, "maxRetransmits": 3 }"#
        )
        .is_err());

        assert!(parse_sctp_stream_parameters(r#"{ "streamId": 65535 }"#).is_err());
    }

    #[test]
    fn test_num_sctp_streams_range() {
        assert!(validate_num_sctp_streams(&NumSctpStreams { os: 1024, mis: 1024 }).is_ok());
        assert!(validate_num_sctp_streams(&NumSctpStreams { os: 0, mis: 1024 }).is_err());
        assert!(validate_num_sctp_streams(&NumSctpStreams { os: 1, mis: 70000 }).is_err());
    }
}
