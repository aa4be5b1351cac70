//! Shared client types: tracks, data channels, connection states

use std::fmt;
use std::sync::Arc;

use ortc_rtp_core::{MediaKind, SctpStreamParameters};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Direction of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportDirection {
    /// Carries producers and data producers
    Send,
    /// Carries consumers and data consumers
    Recv,
}

impl TransportDirection {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Recv => "recv",
        }
    }
}

impl fmt::Display for TransportDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ICE/DTLS connection state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Nothing sent or received yet
    #[default]
    New,
    /// Connectivity checks or DTLS handshake in progress
    Connecting,
    /// Media can flow
    Connected,
    /// Connectivity failed
    Failed,
    /// Connectivity lost, may recover
    Disconnected,
    /// Transport closed locally
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// ICE server handed to the media engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServer {
    /// STUN/TURN URLs
    pub urls: Vec<String>,
    /// TURN username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// TURN credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Which candidates the media engine may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    /// Any candidate
    #[default]
    All,
    /// Relayed candidates only
    Relay,
}

/// A local or remote media track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    /// Track id
    pub id: String,
    /// Audio or video
    pub kind: MediaKind,
}

impl MediaTrack {
    /// New track with a random id
    pub fn new(kind: MediaKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
        }
    }

    /// Track with a given id
    pub fn with_id(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A message carried over a data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMessage {
    /// UTF-8 text (PPID 51)
    Text(String),
    /// Binary payload (PPID 53)
    Binary(Vec<u8>),
}

impl DataMessage {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ready state of a data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataChannelState {
    /// Negotiation not finished
    Connecting,
    /// Messages can be sent
    Open,
    /// Closed locally or remotely
    Closed,
}

struct DataChannelInner {
    parameters: SctpStreamParameters,
    state: RwLock<DataChannelState>,
    outbound: mpsc::UnboundedSender<DataMessage>,
    inbound: Mutex<mpsc::UnboundedReceiver<DataMessage>>,
}

/// Engine side of a data channel: what the application sent, and a way to
/// deliver messages to it
#[derive(Debug)]
pub struct DataChannelPeer {
    /// Messages sent by the application
    pub outbound: mpsc::UnboundedReceiver<DataMessage>,
    /// Messages delivered to the application
    pub inbound: mpsc::UnboundedSender<DataMessage>,
}

/// A negotiated SCTP data channel
#[derive(Clone)]
pub struct DataChannel {
    inner: Arc<DataChannelInner>,
}

impl fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataChannel")
            .field("stream_id", &self.inner.parameters.stream_id)
            .field("label", &self.inner.parameters.label)
            .field("state", &*self.inner.state.read())
            .finish()
    }
}

impl DataChannel {
    /// Create an open channel and the engine side feeding it
    pub fn pair(parameters: SctpStreamParameters) -> (Self, DataChannelPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let channel = Self {
            inner: Arc::new(DataChannelInner {
                parameters,
                state: RwLock::new(DataChannelState::Open),
                outbound: outbound_tx,
                inbound: Mutex::new(inbound_rx),
            }),
        };
        let peer = DataChannelPeer {
            outbound: outbound_rx,
            inbound: inbound_tx,
        };
        (channel, peer)
    }

    /// SCTP stream id
    pub fn stream_id(&self) -> u16 {
        self.inner.parameters.stream_id
    }

    /// Channel label
    pub fn label(&self) -> &str {
        self.inner.parameters.label.as_deref().unwrap_or_default()
    }

    /// Sub-protocol
    pub fn protocol(&self) -> &str {
        self.inner.parameters.protocol.as_deref().unwrap_or_default()
    }

    /// Stream parameters the channel was opened with
    pub fn parameters(&self) -> &SctpStreamParameters {
        &self.inner.parameters
    }

    /// Current ready state
    pub fn state(&self) -> DataChannelState {
        *self.inner.state.read()
    }

    /// Send a message to the remote side
    pub fn send(&self, message: DataMessage) -> Result<()> {
        if self.state() != DataChannelState::Open {
            return Err(Error::invalid_state("data channel not open"));
        }
        self.inner
            .outbound
            .send(message)
            .map_err(|_| Error::invalid_state("data channel closed by the remote side"))
    }

    /// Next message from the remote side, `None` once closed
    pub async fn recv(&self) -> Option<DataMessage> {
        if self.state() == DataChannelState::Closed {
            return None;
        }
        self.inner.inbound.lock().await.recv().await
    }

    /// Close the channel
    pub fn close(&self) {
        *self.inner.state.write() = DataChannelState::Closed;
    }
}
