//! RTP capability and parameter types
//!
//! These structures are the JSON contract exchanged with the remote endpoint.
//! Field names serialize in camelCase (`mimeType`, `clockRate`,
//! `preferredPayloadType`, ...). Optional fields that the validator fills in
//! are modelled as `Option` so that "absent" and "defaulted" stay distinct
//! until validation runs.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Codec or header extension parameters, in insertion order
pub type Parameters = IndexMap<String, ParameterValue>;

/// A single codec parameter value (string or number on the wire)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Integral number (`apt`, `packetization-mode`, bitrates, ...)
    Integer(i64),
    /// Non integral number
    Float(f64),
    /// Free-form string (`profile-level-id`, ...)
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value; numeric strings are accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Self::Float(_) => None,
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    /// String view of the value, only for textual values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the value is a JSON number
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u8> for ParameterValue {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Media kind carried by an RTP stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio
    Audio,
    /// Video
    Video,
}

impl MediaKind {
    /// Lowercase name as used in mime types and SDP `m=` lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Extract the kind from a `kind/subtype` mime type
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let (kind, subtype) = mime_type.split_once('/')?;
        if subtype.is_empty() {
            return None;
        }
        kind.parse().ok()
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(Error::UnsupportedKind(other.to_string())),
        }
    }
}

/// Whether a mime type names the RTX retransmission codec
pub fn is_rtx_mime_type(mime_type: &str) -> bool {
    mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype.eq_ignore_ascii_case("rtx"))
        .unwrap_or(false)
}

/// Direction of a header extension or media section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Send and receive
    SendRecv,
    /// Send only
    SendOnly,
    /// Receive only
    RecvOnly,
    /// Neither send nor receive
    Inactive,
}

impl Direction {
    /// SDP attribute name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendRecv => "sendrecv",
            Self::SendOnly => "sendonly",
            Self::RecvOnly => "recvonly",
            Self::Inactive => "inactive",
        }
    }

    /// Direction seen from the other side (recvonly and sendonly swap)
    pub fn reversed(&self) -> Self {
        match self {
            Self::SendRecv => Self::SendRecv,
            Self::SendOnly => Self::RecvOnly,
            Self::RecvOnly => Self::SendOnly,
            Self::Inactive => Self::Inactive,
        }
    }

    /// Whether media may be sent in this direction
    pub fn can_send(&self) -> bool {
        matches!(self, Self::SendRecv | Self::SendOnly)
    }

    /// Whether media may be received in this direction
    pub fn can_receive(&self) -> bool {
        matches!(self, Self::SendRecv | Self::RecvOnly)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sendrecv" => Ok(Self::SendRecv),
            "sendonly" => Ok(Self::SendOnly),
            "recvonly" => Ok(Self::RecvOnly),
            "inactive" => Ok(Self::Inactive),
            other => Err(Error::validation(format!("invalid direction: {}", other))),
        }
    }
}

/// RTCP feedback mechanism supported by a codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcpFeedback {
    /// Feedback type (`nack`, `ccm`, `goog-remb`, `transport-cc`, ...)
    #[serde(rename = "type")]
    pub fb_type: String,
    /// Feedback parameter (`pli`, `fir`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl RtcpFeedback {
    /// Feedback without parameter
    pub fn new(fb_type: impl Into<String>) -> Self {
        Self {
            fb_type: fb_type.into(),
            parameter: None,
        }
    }

    /// Feedback with parameter
    pub fn with_parameter(fb_type: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            fb_type: fb_type.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Parameter, empty when absent
    pub fn parameter(&self) -> &str {
        self.parameter.as_deref().unwrap_or("")
    }
}

/// A codec supported by an endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecCapability {
    /// Media kind, derived from the mime type when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    /// `kind/subtype`
    pub mime_type: String,
    /// Payload type the endpoint prefers for this codec
    pub preferred_payload_type: u8,
    /// Clock rate in Hz
    pub clock_rate: u32,
    /// Channel count, audio only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Codec specific parameters
    #[serde(default)]
    pub parameters: Parameters,
    /// Supported RTCP feedback
    #[serde(default)]
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

impl RtpCodecCapability {
    /// Whether this is an RTX codec
    pub fn is_rtx(&self) -> bool {
        is_rtx_mime_type(&self.mime_type)
    }
}

/// A header extension supported by an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpHeaderExtension {
    /// Media kind the extension applies to; any kind when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    /// Extension URI
    pub uri: String,
    /// Preferred extension id
    pub preferred_id: u8,
    /// Whether the extension should be encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_encrypt: Option<bool>,
    /// Direction in which the extension is supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// Capabilities of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCapabilities {
    /// Supported codecs
    #[serde(default)]
    pub codecs: Vec<RtpCodecCapability>,
    /// Supported header extensions
    #[serde(default)]
    pub header_extensions: Vec<RtpHeaderExtension>,
}

/// A codec used by a concrete RTP stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecParameters {
    /// `kind/subtype`
    pub mime_type: String,
    /// Payload type
    pub payload_type: u8,
    /// Clock rate in Hz
    pub clock_rate: u32,
    /// Channel count, audio only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Codec specific parameters
    #[serde(default)]
    pub parameters: Parameters,
    /// RTCP feedback in use
    #[serde(default)]
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

impl RtpCodecParameters {
    /// Whether this is an RTX codec
    pub fn is_rtx(&self) -> bool {
        is_rtx_mime_type(&self.mime_type)
    }

    /// Kind derived from the mime type
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime_type(&self.mime_type)
    }
}

/// A header extension used by a concrete RTP stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpHeaderExtensionParameters {
    /// Extension URI
    pub uri: String,
    /// Extension id
    pub id: u8,
    /// Whether the extension is encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<bool>,
    /// Extension specific parameters
    #[serde(default)]
    pub parameters: Parameters,
}

/// RTX stream of an encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtxParameters {
    /// RTX SSRC
    pub ssrc: u32,
}

/// Encoding priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    /// Very low
    VeryLow,
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
}

/// One encoding (simulcast layer or single stream) of an RTP stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpEncodingParameters {
    /// Media SSRC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<u32>,
    /// RID (simulcast restriction identifier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    /// Payload type of the codec this encoding uses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_payload_type: Option<u8>,
    /// RTX stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtx: Option<RtxParameters>,
    /// Discontinuous transmission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtx: Option<bool>,
    /// Scalability mode, e.g. `L1T3`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalability_mode: Option<String>,
    /// Resolution scale factor (>= 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_resolution_down_by: Option<f64>,
    /// Maximum bitrate in bps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<u32>,
    /// Maximum framerate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_framerate: Option<f64>,
    /// Adaptive packet time for audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive_ptime: Option<bool>,
    /// Bitrate priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Network (DSCP) priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_priority: Option<Priority>,
    /// Whether the encoding is being sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl RtpEncodingParameters {
    /// Encoding with only a RID
    pub fn with_rid(rid: impl Into<String>) -> Self {
        Self {
            rid: Some(rid.into()),
            ..Default::default()
        }
    }

    /// Whether the encoding is active; absent means active
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

/// RTCP parameters of an RTP stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcpParameters {
    /// Canonical name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    /// Reduced-size RTCP (RFC 5506)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduced_size: Option<bool>,
}

/// Parameters of a concrete RTP stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpParameters {
    /// SDP media id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    /// Codecs, media codec first, optionally followed by its RTX codec
    pub codecs: Vec<RtpCodecParameters>,
    /// Header extensions
    #[serde(default)]
    pub header_extensions: Vec<RtpHeaderExtensionParameters>,
    /// Encodings
    #[serde(default)]
    pub encodings: Vec<RtpEncodingParameters>,
    /// RTCP parameters
    #[serde(default)]
    pub rtcp: RtcpParameters,
}

/// A codec supported by both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedCodec {
    /// Media kind
    pub kind: MediaKind,
    /// `kind/subtype` as announced locally
    pub mime_type: String,
    /// Clock rate in Hz
    pub clock_rate: u32,
    /// Channel count, audio only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    /// Local payload type
    pub local_payload_type: u8,
    /// Local RTX payload type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_rtx_payload_type: Option<u8>,
    /// Remote payload type
    pub remote_payload_type: u8,
    /// Remote RTX payload type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_rtx_payload_type: Option<u8>,
    /// Local codec parameters (after profile negotiation)
    pub local_parameters: Parameters,
    /// Remote codec parameters (after profile negotiation)
    pub remote_parameters: Parameters,
    /// RTCP feedback supported by both sides
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

/// A header extension supported by both sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedHeaderExtension {
    /// Media kind; any kind when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    /// Extension URI
    pub uri: String,
    /// Id used when sending (local preferred id)
    pub send_id: u8,
    /// Id used when receiving (remote preferred id)
    pub recv_id: u8,
    /// Whether the extension is encrypted
    pub encrypt: bool,
    /// Direction seen from the local side
    pub direction: Direction,
}

/// Local/remote paired capabilities, the source for every parameter set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedRtpCapabilities {
    /// Matched codecs, in remote order
    pub codecs: Vec<ExtendedCodec>,
    /// Matched header extensions, in remote order
    pub header_extensions: Vec<ExtendedHeaderExtension>,
}

/// Read access to the fields codec matching looks at
pub trait CodecDescriptor {
    /// `kind/subtype`
    fn mime_type(&self) -> &str;
    /// Clock rate in Hz
    fn clock_rate(&self) -> u32;
    /// Channel count
    fn channels(&self) -> Option<u8>;
    /// Codec parameters
    fn parameters(&self) -> &Parameters;
    /// Mutable codec parameters
    fn parameters_mut(&mut self) -> &mut Parameters;
}

impl CodecDescriptor for RtpCodecCapability {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    fn channels(&self) -> Option<u8> {
        self.channels
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }
}

impl CodecDescriptor for RtpCodecParameters {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    fn channels(&self) -> Option<u8> {
        self.channels
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_mime_type() {
        assert_eq!(MediaKind::from_mime_type("audio/opus"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime_type("VIDEO/VP8"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime_type("video/"), None);
        assert_eq!(MediaKind::from_mime_type("application/data"), None);
        assert_eq!(MediaKind::from_mime_type("opus"), None);
    }

    #[test]
    fn test_rtx_detection() {
        assert!(is_rtx_mime_type("video/rtx"));
        assert!(is_rtx_mime_type("video/RTX"));
        assert!(!is_rtx_mime_type("video/VP8"));
    }

    #[test]
    fn test_direction_reversed() {
        assert_eq!(Direction::RecvOnly.reversed(), Direction::SendOnly);
        assert_eq!(Direction::SendOnly.reversed(), Direction::RecvOnly);
        assert_eq!(Direction::SendRecv.reversed(), Direction::SendRecv);
        assert_eq!(Direction::Inactive.reversed(), Direction::Inactive);
    }

    #[test]
    fn test_parameter_value_json() {
        let params: Parameters = serde_json::from_str(
            r#"{"apt":96,"profile-level-id":"42e01f","x":1.5}"#,
        )
        .unwrap();
        assert_eq!(params["apt"], ParameterValue::Integer(96));
        assert_eq!(params["profile-level-id"].as_str(), Some("42e01f"));
        assert_eq!(params["x"], ParameterValue::Float(1.5));
        assert_eq!(ParameterValue::from("1").as_i64(), Some(1));

        let keys: Vec<&String> = params.keys().collect();
        assert_eq!(keys, vec!["apt", "profile-level-id", "x"]);
    }

    #[test]
    fn test_codec_capability_wire_names() {
        let json = r#"{
            "mimeType": "audio/opus",
            "preferredPayloadType": 100,
            "clockRate": 48000,
            "channels": 2,
            "rtcpFeedback": [{ "type": "transport-cc" }]
        }"#;
        let codec: RtpCodecCapability = serde_json::from_str(json).unwrap();
        assert_eq!(codec.preferred_payload_type, 100);
        assert_eq!(codec.channels, Some(2));
        assert_eq!(codec.rtcp_feedback[0].fb_type, "transport-cc");
        assert!(codec.kind.is_none());

        let value = serde_json::to_value(&codec).unwrap();
        assert_eq!(value["clockRate"], 48000);
        assert!(value.get("kind").is_none());
    }
}
