//! Application callbacks and broadcast events
//!
//! A [`TransportListener`] is the signaling seam: the transport asks it to
//! deliver local DTLS parameters and new producers to the remote endpoint,
//! and waits for the answer before going on. [`TransportEvent`]s are
//! informational and go out over a `tokio::sync::broadcast` channel to any
//! number of subscribers.

use async_trait::async_trait;
use ortc_rtp_core::{MediaKind, RtpParameters, SctpStreamParameters};
use ortc_sdp_core::DtlsParameters;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ConnectionState;

/// A new producer the remote endpoint must create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceRequest {
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    pub app_data: serde_json::Value,
}

/// A new data producer the remote endpoint must create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceDataRequest {
    pub sctp_stream_parameters: SctpStreamParameters,
    pub label: String,
    pub protocol: String,
    pub app_data: serde_json::Value,
}

/// Signaling callbacks of a transport
///
/// `on_connect` is required; sending transports also need `on_produce`
/// (and `on_produce_data` for data channels). The defaults reject the
/// request so a missing implementation fails the operation instead of
/// hanging it.
#[async_trait]
pub trait TransportListener: Send + Sync {
    /// Connect the remote transport with these local DTLS parameters
    async fn on_connect(&self, transport_id: &str, dtls_parameters: DtlsParameters)
        -> Result<()>;

    /// Create the remote producer, returning its id
    async fn on_produce(&self, transport_id: &str, request: ProduceRequest) -> Result<String> {
        let _ = request;
        Err(Error::signaling(format!(
            "no produce handler set on transport {transport_id}"
        )))
    }

    /// Create the remote data producer, returning its id
    async fn on_produce_data(
        &self,
        transport_id: &str,
        request: ProduceDataRequest,
    ) -> Result<String> {
        let _ = request;
        Err(Error::signaling(format!(
            "no produce data handler set on transport {transport_id}"
        )))
    }

    /// Connection state changed
    async fn on_connection_state_change(&self, transport_id: &str, state: ConnectionState) {
        let _ = (transport_id, state);
    }
}

/// Informational transport events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    ConnectionStateChanged {
        transport_id: String,
        state: ConnectionState,
    },
    ProducerCreated {
        producer_id: String,
    },
    ProducerClosed {
        producer_id: String,
    },
    ConsumerCreated {
        consumer_id: String,
    },
    ConsumerClosed {
        consumer_id: String,
    },
    DataProducerCreated {
        data_producer_id: String,
    },
    DataConsumerCreated {
        data_consumer_id: String,
    },
    /// The transport was closed locally
    Closed {
        transport_id: String,
    },
}
