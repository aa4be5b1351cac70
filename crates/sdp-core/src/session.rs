//! Typed SDP session and media objects
//!
//! The model is the in-memory form of an RFC 4566 document as produced for a
//! WebRTC peer: every attribute the media sections need is a typed field and
//! [`crate::writer`] turns the whole tree into SDP text. There is no grammar
//! parser; local descriptions are handed over already in this form.

use std::fmt;

use ortc_rtp_core::{Direction, MediaKind};

use crate::transport::IpVersion;

/// `m=` media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Audio
    Audio,
    /// Video
    Video,
    /// Data channels
    Application,
}

impl MediaType {
    /// SDP token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Application => "application",
        }
    }

    /// RTP media kind, none for application sections
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            Self::Audio => Some(MediaKind::Audio),
            Self::Video => Some(MediaKind::Video),
            Self::Application => None,
        }
    }
}

impl From<MediaKind> for MediaType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => Self::Audio,
            MediaKind::Video => Self::Video,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `o=` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// User name
    pub username: String,
    /// Session id
    pub session_id: u64,
    /// Session version, bumped on every generated SDP
    pub session_version: u64,
    /// Network type (`IN`)
    pub net_type: String,
    /// Address type
    pub ip_version: IpVersion,
    /// Unicast address
    pub address: String,
}

/// `t=` line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    /// Start time
    pub start: u64,
    /// Stop time
    pub stop: u64,
}

/// `c=` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Address type
    pub ip_version: IpVersion,
    /// Connection address
    pub ip: String,
}

/// `a=fingerprint`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Hash function
    pub hash_type: String,
    /// Digest
    pub hash: String,
}

/// `a=group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Semantics (`BUNDLE`)
    pub group_type: String,
    /// Grouped mids
    pub mids: Vec<String>,
}

/// `a=msid-semantic`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsidSemantic {
    /// Semantic (`WMS`)
    pub semantic: String,
    /// Token (`*`)
    pub token: String,
}

/// `a=rtpmap`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    /// Payload type
    pub payload: u8,
    /// Encoding name
    pub codec: String,
    /// Clock rate
    pub rate: u32,
    /// Channel count, written only when greater than one
    pub encoding: Option<u8>,
}

/// `a=fmtp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fmtp {
    /// Payload type
    pub payload: u8,
    /// `key=value;key=value`
    pub config: String,
}

/// `a=rtcp-fb`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpFb {
    /// Payload type
    pub payload: u8,
    /// Feedback type
    pub fb_type: String,
    /// Feedback parameter
    pub subtype: Option<String>,
}

/// `a=extmap`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtMap {
    /// Extension id
    pub value: u8,
    /// Direction
    pub direction: Option<Direction>,
    /// Extension URI
    pub uri: String,
}

/// `a=candidate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Foundation
    pub foundation: String,
    /// Component id (1 for RTP)
    pub component: u16,
    /// Transport (`udp`, `tcp`)
    pub transport: String,
    /// Priority
    pub priority: u32,
    /// Address
    pub ip: String,
    /// Port
    pub port: u16,
    /// Candidate type
    pub candidate_type: String,
    /// TCP candidate type
    pub tcp_type: Option<String>,
}

/// `a=ssrc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcAttribute {
    /// SSRC
    pub id: u32,
    /// Attribute name (`cname`, `msid`)
    pub attribute: String,
    /// Attribute value
    pub value: Option<String>,
}

/// `a=ssrc-group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcGroup {
    /// Semantics (`FID`, `SIM`)
    pub semantics: String,
    /// Grouped SSRCs
    pub ssrcs: Vec<u32>,
}

/// Direction of a rid or simulcast list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RidDirection {
    /// Sent by the description's author
    Send,
    /// Received by the description's author
    Recv,
}

impl RidDirection {
    /// SDP token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Recv => "recv",
        }
    }
}

/// `a=rid`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rid {
    /// RID
    pub id: String,
    /// Direction
    pub direction: RidDirection,
    /// Restrictions
    pub params: Option<String>,
}

/// `a=simulcast`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulcast {
    /// Direction of the first list
    pub dir1: RidDirection,
    /// First stream list (`a;b,c`, `~` marks a paused stream)
    pub list1: String,
    /// Direction of the second list
    pub dir2: Option<RidDirection>,
    /// Second stream list
    pub list2: Option<String>,
}

/// `a=setup`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupRole {
    /// Active
    Active,
    /// Passive
    Passive,
    /// Active or passive
    Actpass,
}

impl SetupRole {
    /// SDP token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
            Self::Actpass => "actpass",
        }
    }
}

/// Legacy `a=sctpmap`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SctpMap {
    /// SCTP port used as the format number
    pub sctpmap_number: u16,
    /// Application (`webrtc-datachannel`)
    pub app: String,
    /// Maximum message size
    pub max_message_size: u32,
}

/// One `m=` block with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    /// Media type
    pub kind: MediaType,
    /// Port, 0 when the section is closed
    pub port: u16,
    /// Transport protocol
    pub protocol: String,
    /// Format list (payload types or `webrtc-datachannel`)
    pub payloads: String,
    /// `c=` line
    pub connection: Option<Connection>,
    /// `a=mid`
    pub mid: Option<String>,
    /// `a=msid`
    pub msid: Option<String>,
    /// Direction attribute
    pub direction: Option<Direction>,
    /// `a=ice-ufrag`
    pub ice_ufrag: Option<String>,
    /// `a=ice-pwd`
    pub ice_pwd: Option<String>,
    /// `a=ice-options`
    pub ice_options: Option<String>,
    /// Media level fingerprint
    pub fingerprint: Option<Fingerprint>,
    /// Candidates
    pub candidates: Vec<Candidate>,
    /// `a=end-of-candidates`
    pub end_of_candidates: bool,
    /// `a=setup`
    pub setup: Option<SetupRole>,
    /// `a=rtpmap`
    pub rtp: Vec<RtpMap>,
    /// `a=fmtp`
    pub fmtp: Vec<Fmtp>,
    /// `a=rtcp-fb`
    pub rtcp_fb: Vec<RtcpFb>,
    /// `a=extmap`
    pub ext: Vec<ExtMap>,
    /// `a=extmap-allow-mixed`
    pub extmap_allow_mixed: bool,
    /// `a=rtcp-mux`
    pub rtcp_mux: bool,
    /// `a=rtcp-rsize`
    pub rtcp_rsize: bool,
    /// `a=ssrc`
    pub ssrcs: Vec<SsrcAttribute>,
    /// `a=ssrc-group`
    pub ssrc_groups: Vec<SsrcGroup>,
    /// `a=rid`
    pub rids: Vec<Rid>,
    /// `a=simulcast`
    pub simulcast: Option<Simulcast>,
    /// `a=sctp-port`
    pub sctp_port: Option<u16>,
    /// `a=max-message-size`
    pub max_message_size: Option<u32>,
    /// `a=sctpmap`
    pub sctpmap: Option<SctpMap>,
}

impl MediaObject {
    /// Empty section of the given type
    pub fn new(kind: MediaType, port: u16, protocol: impl Into<String>) -> Self {
        Self {
            kind,
            port,
            protocol: protocol.into(),
            payloads: String::new(),
            connection: None,
            mid: None,
            msid: None,
            direction: None,
            ice_ufrag: None,
            ice_pwd: None,
            ice_options: None,
            fingerprint: None,
            candidates: Vec::new(),
            end_of_candidates: false,
            setup: None,
            rtp: Vec::new(),
            fmtp: Vec::new(),
            rtcp_fb: Vec::new(),
            ext: Vec::new(),
            extmap_allow_mixed: false,
            rtcp_mux: false,
            rtcp_rsize: false,
            ssrcs: Vec::new(),
            ssrc_groups: Vec::new(),
            rids: Vec::new(),
            simulcast: None,
            sctp_port: None,
            max_message_size: None,
            sctpmap: None,
        }
    }

    /// Builder-style mid
    pub fn with_mid(mut self, mid: impl Into<String>) -> Self {
        self.mid = Some(mid.into());
        self
    }

    /// Whether the section is closed (port 0)
    pub fn is_closed(&self) -> bool {
        self.port == 0
    }
}

/// A complete session description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    /// `v=`
    pub version: u8,
    /// `o=`
    pub origin: Origin,
    /// `s=`
    pub name: String,
    /// `t=`
    pub timing: Timing,
    /// `a=ice-lite`
    pub ice_lite: bool,
    /// Session level fingerprint
    pub fingerprint: Option<Fingerprint>,
    /// `a=msid-semantic`
    pub msid_semantic: Option<MsidSemantic>,
    /// `a=group`
    pub groups: Vec<Group>,
    /// Media sections in order
    pub media: Vec<MediaObject>,
}

impl SessionDescription {
    /// Description with an origin and no media
    pub fn new(origin: Origin) -> Self {
        Self {
            version: 0,
            origin,
            name: "-".to_string(),
            timing: Timing::default(),
            ice_lite: false,
            fingerprint: None,
            msid_semantic: None,
            groups: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Media section carrying `mid`
    pub fn media_by_mid(&self, mid: &str) -> Option<&MediaObject> {
        self.media.iter().find(|m| m.mid.as_deref() == Some(mid))
    }

    /// Group of the given semantics
    pub fn group(&self, group_type: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.group_type == group_type)
    }
}
