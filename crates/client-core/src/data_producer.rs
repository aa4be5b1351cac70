//! Sending side of an SCTP data channel

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ortc_rtp_core::SctpStreamParameters;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::TransportInner;
use crate::types::{DataChannel, DataMessage};

/// Data channel settings
///
/// Setting `max_packet_life_time` or `max_retransmits` makes the channel
/// unordered whatever `ordered` says.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataProducerOptions {
    pub ordered: Option<bool>,
    pub max_packet_life_time: Option<u32>,
    pub max_retransmits: Option<u32>,
    pub label: String,
    pub protocol: String,
    pub app_data: serde_json::Value,
}

impl DataProducerOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = Some(ordered);
        self
    }

    pub fn with_max_packet_life_time(mut self, millis: u32) -> Self {
        self.max_packet_life_time = Some(millis);
        self
    }

    pub fn with_max_retransmits(mut self, retransmits: u32) -> Self {
        self.max_retransmits = Some(retransmits);
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_app_data(mut self, app_data: serde_json::Value) -> Self {
        self.app_data = app_data;
        self
    }
}

struct DataProducerInner {
    id: String,
    data_channel: DataChannel,
    sctp_stream_parameters: SctpStreamParameters,
    app_data: serde_json::Value,
    closed: AtomicBool,
    transport: Weak<TransportInner>,
}

/// A local data channel sending through a transport
#[derive(Clone)]
pub struct DataProducer {
    inner: Arc<DataProducerInner>,
}

impl std::fmt::Debug for DataProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProducer")
            .field("id", &self.inner.id)
            .field("stream_id", &self.inner.sctp_stream_parameters.stream_id)
            .field("closed", &self.closed())
            .finish()
    }
}

impl DataProducer {
    pub(crate) fn new(
        id: String,
        data_channel: DataChannel,
        sctp_stream_parameters: SctpStreamParameters,
        app_data: serde_json::Value,
        transport: Weak<TransportInner>,
    ) -> Self {
        debug!(id = %id, stream_id = sctp_stream_parameters.stream_id, "data producer created");

        Self {
            inner: Arc::new(DataProducerInner {
                id,
                data_channel,
                sctp_stream_parameters,
                app_data,
                closed: AtomicBool::new(false),
                transport,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn sctp_stream_parameters(&self) -> &SctpStreamParameters {
        &self.inner.sctp_stream_parameters
    }

    pub fn label(&self) -> &str {
        self.inner.data_channel.label()
    }

    pub fn protocol(&self) -> &str {
        self.inner.data_channel.protocol()
    }

    pub fn app_data(&self) -> &serde_json::Value {
        &self.inner.app_data
    }

    pub fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Send a message over the channel
    pub fn send(&self, message: DataMessage) -> Result<()> {
        if self.closed() {
            return Err(Error::invalid_state("data producer closed"));
        }
        self.inner.data_channel.send(message)
    }

    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(id = %self.inner.id, "close()");

        self.inner.data_channel.close();
        if let Some(transport) = self.inner.transport.upgrade() {
            transport.remove_data_producer(&self.inner.id);
        }
    }

    pub(crate) fn transport_closed(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.data_channel.close();
    }
}
