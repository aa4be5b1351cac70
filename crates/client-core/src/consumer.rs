//! Receiving side of a remote producer
//!
//! Consumers are created, paused, resumed and closed in batches: the
//! transport collects every request made in the same turn and hands them to
//! the handler as one renegotiation. Pausing and resuming only ask for a
//! batch entry when the local state actually flips, so a pause and a resume
//! in the same turn cancel out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ortc_rtp_core::{MediaKind, RtpParameters};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::TransportInner;
use crate::types::MediaTrack;

/// Server side consumer description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerOptions {
    pub id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    /// Stream to group the track in, defaults to the RTCP CNAME
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub app_data: serde_json::Value,
}

impl ConsumerOptions {
    pub fn new(
        id: impl Into<String>,
        producer_id: impl Into<String>,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Self {
        Self {
            id: id.into(),
            producer_id: producer_id.into(),
            kind,
            rtp_parameters,
            stream_id: None,
            app_data: serde_json::Value::Null,
        }
    }

    pub fn with_stream_id(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = Some(stream_id.into());
        self
    }

    pub fn with_app_data(mut self, app_data: serde_json::Value) -> Self {
        self.app_data = app_data;
        self
    }
}

pub(crate) struct ConsumerInit {
    pub id: String,
    pub local_id: String,
    pub producer_id: String,
    pub rtp_parameters: RtpParameters,
    pub track: MediaTrack,
    pub app_data: serde_json::Value,
}

struct ConsumerInner {
    id: String,
    local_id: String,
    producer_id: String,
    kind: MediaKind,
    rtp_parameters: RtpParameters,
    track: MediaTrack,
    app_data: serde_json::Value,
    paused: AtomicBool,
    closed: AtomicBool,
    transport: Weak<TransportInner>,
}

/// A remote stream received through a transport
#[derive(Clone)]
pub struct Consumer {
    inner: Arc<ConsumerInner>,
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.inner.id)
            .field("local_id", &self.inner.local_id)
            .field("producer_id", &self.inner.producer_id)
            .field("kind", &self.inner.kind)
            .field("paused", &self.paused())
            .field("closed", &self.closed())
            .finish()
    }
}

impl Consumer {
    pub(crate) fn new(init: ConsumerInit, transport: Weak<TransportInner>) -> Self {
        debug!(id = %init.id, local_id = %init.local_id, "consumer created");

        Self {
            inner: Arc::new(ConsumerInner {
                kind: init.track.kind,
                id: init.id,
                local_id: init.local_id,
                producer_id: init.producer_id,
                rtp_parameters: init.rtp_parameters,
                track: init.track,
                app_data: init.app_data,
                paused: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                transport,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Handler local id
    pub fn local_id(&self) -> &str {
        &self.inner.local_id
    }

    pub fn producer_id(&self) -> &str {
        &self.inner.producer_id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.inner.rtp_parameters
    }

    /// Track the handler created for the stream
    pub fn track(&self) -> &MediaTrack {
        &self.inner.track
    }

    pub fn app_data(&self) -> &serde_json::Value {
        &self.inner.app_data
    }

    pub fn paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn transport(&self) -> Result<Arc<TransportInner>> {
        if self.closed() {
            return Err(Error::invalid_state("consumer closed"));
        }
        self.inner.transport.upgrade().ok_or(Error::TransportClosed)
    }

    /// Stop receiving media; applied with the next pause batch
    pub fn pause(&self) -> Result<()> {
        let transport = self.transport()?;
        if self.inner.paused.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(id = %self.inner.id, "pause()");

        transport.pause_consumer(self);
        Ok(())
    }

    /// Receive media again; applied with the next resume batch
    pub fn resume(&self) -> Result<()> {
        let transport = self.transport()?;
        if !self.inner.paused.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(id = %self.inner.id, "resume()");

        transport.resume_consumer(self);
        Ok(())
    }

    /// Stop receiving and release the local section
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(id = %self.inner.id, "close()");

        if let Some(transport) = self.inner.transport.upgrade() {
            transport.close_consumer(self);
        }
    }

    /// The owning transport closed; no handler call is made
    pub(crate) fn transport_closed(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(id = %self.inner.id, "transport closed");
    }
}
