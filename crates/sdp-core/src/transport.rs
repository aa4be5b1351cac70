//! ICE, DTLS and plain RTP transport parameters announced by the remote side

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// ICE credentials of the remote endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceParameters {
    /// `ice-ufrag`
    pub username_fragment: String,
    /// `ice-pwd`
    pub password: String,
    /// Whether the remote endpoint is ICE lite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_lite: Option<bool>,
}

impl IceParameters {
    /// Whether ICE lite is announced
    pub fn is_ice_lite(&self) -> bool {
        self.ice_lite.unwrap_or(false)
    }
}

/// Transport protocol of an ICE candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceProtocol {
    /// UDP
    Udp,
    /// TCP
    Tcp,
}

impl IceProtocol {
    /// SDP token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

/// ICE candidate type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceCandidateType {
    /// Host candidate
    Host,
    /// Server reflexive
    Srflx,
    /// Peer reflexive
    Prflx,
    /// Relayed
    Relay,
}

impl IceCandidateType {
    /// SDP token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Srflx => "srflx",
            Self::Prflx => "prflx",
            Self::Relay => "relay",
        }
    }
}

/// TCP candidate type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTcpType {
    /// Active
    Active,
    /// Passive
    Passive,
    /// Simultaneous open
    So,
}

impl IceTcpType {
    /// SDP token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
            Self::So => "so",
        }
    }
}

/// ICE candidate of the remote endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    /// Foundation
    pub foundation: String,
    /// Priority
    pub priority: u32,
    /// IP address (older peers send `ip`)
    #[serde(alias = "ip")]
    pub address: String,
    /// Transport protocol
    pub protocol: IceProtocol,
    /// Port
    pub port: u16,
    /// Candidate type
    #[serde(rename = "type")]
    pub candidate_type: IceCandidateType,
    /// TCP type, TCP candidates only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_type: Option<IceTcpType>,
}

/// DTLS role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsRole {
    /// Decided during negotiation
    #[default]
    Auto,
    /// DTLS client
    Client,
    /// DTLS server
    Server,
}

impl DtlsRole {
    /// Role name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for DtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DtlsRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            other => Err(Error::invalid_state(format!("invalid DTLS role: {}", other))),
        }
    }
}

/// Certificate fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsFingerprint {
    /// Hash function (`sha-256`, ...)
    pub algorithm: String,
    /// Colon separated hex digest
    pub value: String,
}

/// DTLS parameters of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtlsParameters {
    /// DTLS role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<DtlsRole>,
    /// Certificate fingerprints, the last one is announced in SDP
    pub fingerprints: Vec<DtlsFingerprint>,
}

impl DtlsParameters {
    /// Role, `auto` when unset
    pub fn role(&self) -> DtlsRole {
        self.role.unwrap_or_default()
    }
}

/// IP version of a plain RTP endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IpVersion {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl IpVersion {
    /// Numeric version
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(version: IpVersion) -> Self {
        version.as_u8()
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::V4),
            6 => Ok(Self::V6),
            other => Err(format!("invalid IP version {}", other)),
        }
    }
}

/// Plain (non ICE/DTLS) RTP endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainRtpParameters {
    /// IP address
    pub ip: String,
    /// IP version
    pub ip_version: IpVersion,
    /// RTP port
    pub port: u16,
}
