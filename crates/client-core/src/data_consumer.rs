//! Receiving side of a remote data producer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ortc_rtp_core::SctpStreamParameters;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport::TransportInner;
use crate::types::{DataChannel, DataMessage};

/// Server side data consumer description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConsumerOptions {
    pub id: String,
    pub data_producer_id: String,
    pub sctp_stream_parameters: SctpStreamParameters,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub app_data: serde_json::Value,
}

pub(crate) struct DataConsumerInit {
    pub id: String,
    pub data_producer_id: String,
    pub data_channel: DataChannel,
    pub sctp_stream_parameters: SctpStreamParameters,
    pub app_data: serde_json::Value,
}

struct DataConsumerInner {
    id: String,
    data_producer_id: String,
    data_channel: DataChannel,
    sctp_stream_parameters: SctpStreamParameters,
    app_data: serde_json::Value,
    closed: AtomicBool,
    transport: Weak<TransportInner>,
}

/// A remote data channel received through a transport
#[derive(Clone)]
pub struct DataConsumer {
    inner: Arc<DataConsumerInner>,
}

impl std::fmt::Debug for DataConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataConsumer")
            .field("id", &self.inner.id)
            .field("data_producer_id", &self.inner.data_producer_id)
            .field("closed", &self.closed())
            .finish()
    }
}

impl DataConsumer {
    pub(crate) fn new(init: DataConsumerInit, transport: Weak<TransportInner>) -> Self {
        debug!(id = %init.id, stream_id = init.sctp_stream_parameters.stream_id, "data consumer created");

        Self {
            inner: Arc::new(DataConsumerInner {
                id: init.id,
                data_producer_id: init.data_producer_id,
                data_channel: init.data_channel,
                sctp_stream_parameters: init.sctp_stream_parameters,
                app_data: init.app_data,
                closed: AtomicBool::new(false),
                transport,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn data_producer_id(&self) -> &str {
        &self.inner.data_producer_id
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

    /// Next message, `None` once closed
    pub async fn recv(&self) -> Option<DataMessage> {
        if self.closed() {
            return None;
        }
        self.inner.data_channel.recv().await
    }

    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(id = %self.inner.id, "close()");

        self.inner.data_channel.close();
        if let Some(transport) = self.inner.transport.upgrade() {
            transport.remove_data_consumer(&self.inner.id);
        }
    }

    pub(crate) fn transport_closed(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.data_channel.close();
    }
}
