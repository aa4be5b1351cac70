//! Client side of ORTC media transports
//!
//! A [`Device`] loads the router's RTP capabilities through a media engine
//! [`Handler`], then creates send and receive [`Transport`]s. Sending
//! transports produce tracks ([`Producer`]) and data channels
//! ([`DataProducer`]); receiving transports consume remote ones
//! ([`Consumer`], [`DataConsumer`]).
//!
//! ## Layering
//! ```text
//! client-core -> sdp-core -> rtp-core
//!             -> infra-common (queue, config, logging)
//! ```
//!
//! Signaling is left to the application: a [`TransportListener`] delivers
//! connect and produce requests to the remote side and returns its answers.

pub mod config;
pub mod consumer;
pub mod data_consumer;
pub mod data_producer;
pub mod device;
pub mod error;
pub mod events;
pub mod handlers;
pub mod producer;
pub mod transport;
pub mod types;

// Public API exports
pub use config::{DeviceOptions, TransportOptions};
pub use consumer::{Consumer, ConsumerOptions};
pub use data_consumer::{DataConsumer, DataConsumerOptions};
pub use data_producer::{DataProducer, DataProducerOptions};
pub use device::Device;
pub use error::{Error, Result};
pub use events::{ProduceDataRequest, ProduceRequest, TransportEvent, TransportListener};
pub use handlers::{
    detect_device, fake_handler_factory, FakeHandler, Handler, HandlerFactory, HandlerName,
    HandlerRegistry, UserAgentInfo,
};
pub use producer::{Producer, ProducerOptions};
pub use transport::Transport;
pub use types::{
    ConnectionState, DataChannel, DataMessage, IceServer, IceTransportPolicy, MediaTrack,
    TransportDirection,
};

/// Client-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types
pub mod prelude {
    pub use super::{
        ConnectionState, Consumer, ConsumerOptions, DataConsumer, DataConsumerOptions,
        DataMessage, DataProducer, DataProducerOptions, Device, DeviceOptions, Error,
        HandlerName, MediaTrack, ProduceDataRequest, ProduceRequest, Producer, ProducerOptions,
        Result, Transport, TransportEvent, TransportListener, TransportOptions,
    };
    pub use ortc_rtp_core::{MediaKind, RtpCapabilities, RtpParameters};
}
