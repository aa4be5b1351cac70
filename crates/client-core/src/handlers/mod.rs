//! Media engine handlers
//!
//! A [`Handler`] adapts one family of native media engines (a browser
//! generation, a mobile runtime, or the in-crate [`FakeHandler`]) to the
//! capability-based operations a [`Transport`](crate::Transport) performs.
//! Every transport owns one handler instance and calls it only from tasks
//! of its queue, so implementations never see two operations at once.
//!
//! The handler family is selected once per device, either explicitly or via
//! [`detect_device`], and instances come from a [`HandlerFactory`] looked up
//! in a [`HandlerRegistry`].

pub mod detect;
pub mod fake;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use ortc_rtp_core::{
    ExtendedRtpCapabilities, MediaKind, RtpCapabilities, RtpCodecCapability,
    RtpEncodingParameters, RtpParameters, SctpCapabilities, SctpParameters,
    SctpStreamParameters,
};
use ortc_sdp_core::{DtlsParameters, IceCandidate, IceParameters, ProducerCodecOptions};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{
    ConnectionState, DataChannel, IceServer, IceTransportPolicy, MediaTrack, TransportDirection,
};

pub use detect::{detect_device, Browser, Engine, UserAgentInfo};
pub use fake::{fake_handler_factory, FakeHandler, HandlerCall};

/// Known handler families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerName {
    Chrome111,
    Chrome74,
    Chrome70,
    Chrome67,
    Chrome55,
    Firefox120,
    Firefox60,
    Safari12,
    Safari11,
    Edge11,
    ReactNative106,
    /// In-crate engine without real media
    Fake,
}

impl HandlerName {
    /// All names, newest first within each family
    pub const ALL: [HandlerName; 12] = [
        Self::Chrome111,
        Self::Chrome74,
        Self::Chrome70,
        Self::Chrome67,
        Self::Chrome55,
        Self::Firefox120,
        Self::Firefox60,
        Self::Safari12,
        Self::Safari11,
        Self::Edge11,
        Self::ReactNative106,
        Self::Fake,
    ];

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome111 => "Chrome111",
            Self::Chrome74 => "Chrome74",
            Self::Chrome70 => "Chrome70",
            Self::Chrome67 => "Chrome67",
            Self::Chrome55 => "Chrome55",
            Self::Firefox120 => "Firefox120",
            Self::Firefox60 => "Firefox60",
            Self::Safari12 => "Safari12",
            Self::Safari11 => "Safari11",
            Self::Edge11 => "Edge11",
            Self::ReactNative106 => "ReactNative106",
            Self::Fake => "Fake",
        }
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnsupportedDevice(format!("unknown handler name {s}")))
    }
}

/// Callbacks from a handler to its transport
#[async_trait]
pub trait HandlerListener: Send + Sync {
    /// The engine needs the transport connected with these local DTLS parameters
    async fn on_connect(&self, dtls_parameters: DtlsParameters) -> Result<()>;

    /// The engine's connection state changed
    async fn on_connection_state_change(&self, state: ConnectionState);
}

/// Everything a handler needs to set up its engine connection
#[derive(Clone)]
pub struct HandlerRunOptions {
    pub direction: TransportDirection,
    pub ice_parameters: IceParameters,
    pub ice_candidates: Vec<IceCandidate>,
    pub dtls_parameters: DtlsParameters,
    pub sctp_parameters: Option<SctpParameters>,
    pub ice_servers: Vec<IceServer>,
    pub ice_transport_policy: Option<IceTransportPolicy>,
    pub extended_rtp_capabilities: ExtendedRtpCapabilities,
    pub listener: Arc<dyn HandlerListener>,
}

impl fmt::Debug for HandlerRunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRunOptions")
            .field("direction", &self.direction)
            .field("ice_parameters", &self.ice_parameters)
            .field("ice_candidates", &self.ice_candidates.len())
            .field("dtls_parameters", &self.dtls_parameters)
            .field("sctp_parameters", &self.sctp_parameters)
            .finish_non_exhaustive()
    }
}

/// A track to start sending
#[derive(Debug, Clone)]
pub struct HandlerSendOptions {
    pub track: MediaTrack,
    /// Empty for a single default encoding
    pub encodings: Vec<RtpEncodingParameters>,
    pub codec_options: Option<ProducerCodecOptions>,
    /// Force this codec instead of the first negotiated one
    pub codec: Option<RtpCodecCapability>,
}

/// Outcome of [`Handler::send`]
#[derive(Debug, Clone)]
pub struct HandlerSendResult {
    /// Local id (the mid of the sending section)
    pub local_id: String,
    /// Parameters the remote side must expect
    pub rtp_parameters: RtpParameters,
}

/// A remote stream to start receiving
#[derive(Debug, Clone)]
pub struct HandlerReceiveOptions {
    /// Id given to the resulting track
    pub track_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    pub stream_id: Option<String>,
}

/// Outcome of one receive
#[derive(Debug, Clone)]
pub struct HandlerReceiveResult {
    /// Local id (the mid of the receiving section)
    pub local_id: String,
    pub track: MediaTrack,
}

/// A data channel to open for sending
#[derive(Debug, Clone, Default)]
pub struct HandlerSendDataChannelOptions {
    pub ordered: bool,
    pub max_packet_life_time: Option<u32>,
    pub max_retransmits: Option<u32>,
    pub label: String,
    pub protocol: String,
}

/// Outcome of [`Handler::send_data_channel`]
#[derive(Debug, Clone)]
pub struct HandlerSendDataChannelResult {
    pub data_channel: DataChannel,
    pub sctp_stream_parameters: SctpStreamParameters,
}

/// A remote data channel to open for receiving
#[derive(Debug, Clone)]
pub struct HandlerReceiveDataChannelOptions {
    pub sctp_stream_parameters: SctpStreamParameters,
    pub label: String,
    pub protocol: String,
}

/// Operations a media engine adapter performs for one transport
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handler family
    fn name(&self) -> HandlerName;

    /// Release the engine connection
    fn close(&self);

    /// RTP capabilities of the engine
    async fn get_native_rtp_capabilities(&self) -> Result<RtpCapabilities>;

    /// SCTP capabilities of the engine
    async fn get_native_sctp_capabilities(&self) -> Result<SctpCapabilities>;

    /// Set up the engine connection for a transport
    async fn run(&self, options: HandlerRunOptions) -> Result<()>;

    async fn update_ice_servers(&self, ice_servers: Vec<IceServer>) -> Result<()>;

    async fn restart_ice(&self, ice_parameters: IceParameters) -> Result<()>;

    async fn send(&self, options: HandlerSendOptions) -> Result<HandlerSendResult>;

    async fn stop_sending(&self, local_id: &str) -> Result<()>;

    async fn pause_sending(&self, local_id: &str) -> Result<()>;

    async fn resume_sending(&self, local_id: &str) -> Result<()>;

    /// Deactivate every simulcast encoding above `spatial_layer`
    async fn set_max_spatial_layer(&self, local_id: &str, spatial_layer: u8) -> Result<()>;

    /// Start receiving a batch of streams in one renegotiation
    async fn receive(
        &self,
        options: Vec<HandlerReceiveOptions>,
    ) -> Result<Vec<HandlerReceiveResult>>;

    async fn stop_receiving(&self, local_ids: &[String]) -> Result<()>;

    async fn pause_receiving(&self, local_ids: &[String]) -> Result<()>;

    async fn resume_receiving(&self, local_ids: &[String]) -> Result<()>;

    async fn send_data_channel(
        &self,
        options: HandlerSendDataChannelOptions,
    ) -> Result<HandlerSendDataChannelResult>;

    async fn receive_data_channel(
        &self,
        options: HandlerReceiveDataChannelOptions,
    ) -> Result<DataChannel>;
}

/// Creates a fresh handler instance
pub type HandlerFactory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// Handler factories by name
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<HandlerName, HandlerFactory>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the fake handler
    pub fn with_fake() -> Self {
        let mut registry = Self::new();
        registry.register(HandlerName::Fake, fake_handler_factory());
        registry
    }

    /// Register or replace the factory for `name`
    pub fn register(&mut self, name: HandlerName, factory: HandlerFactory) -> &mut Self {
        self.factories.insert(name, factory);
        self
    }

    /// Factory registered for `name`
    pub fn factory(&self, name: HandlerName) -> Option<HandlerFactory> {
        self.factories.get(&name).cloned()
    }

    /// Registered names in canonical order
    pub fn names(&self) -> Vec<HandlerName> {
        HandlerName::ALL
            .iter()
            .copied()
            .filter(|name| self.factories.contains_key(name))
            .collect()
    }
}
