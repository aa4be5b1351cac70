//! SCTP capability and stream parameter types used by data channels

use serde::{Deserialize, Serialize};

/// Number of SCTP streams an endpoint offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumSctpStreams {
    /// Outgoing streams
    #[serde(rename = "OS")]
    pub os: u32,
    /// Maximum incoming streams
    #[serde(rename = "MIS")]
    pub mis: u32,
}

impl Default for NumSctpStreams {
    fn default() -> Self {
        Self { os: 1024, mis: 1024 }
    }
}

/// SCTP capabilities of an endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SctpCapabilities {
    /// Stream counts
    pub num_streams: NumSctpStreams,
}

/// SCTP association parameters announced by the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SctpParameters {
    /// SCTP port (always 5000 in practice)
    pub port: u16,
    /// Outgoing streams
    #[serde(rename = "OS")]
    pub os: u32,
    /// Maximum incoming streams
    #[serde(rename = "MIS")]
    pub mis: u32,
    /// Largest message the remote accepts
    pub max_message_size: u32,
}

/// Parameters of a single SCTP stream (one data channel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SctpStreamParameters {
    /// Stream id
    pub stream_id: u16,
    /// Ordered delivery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
    /// Partial reliability by lifetime (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_packet_life_time: Option<u32>,
    /// Partial reliability by retransmission count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retransmits: Option<u32>,
    /// Channel label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Sub-protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl SctpStreamParameters {
    /// Reliable ordered stream
    pub fn reliable(stream_id: u16) -> Self {
        Self {
            stream_id,
            ordered: Some(true),
            max_packet_life_time: None,
            max_retransmits: None,
            label: None,
            protocol: None,
        }
    }

    /// Whether delivery is ordered; absent means ordered
    pub fn is_ordered(&self) -> bool {
        self.ordered.unwrap_or(true)
    }
}
