//! Sending side of a media track

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ortc_rtp_core::{MediaKind, RtpCodecCapability, RtpEncodingParameters, RtpParameters};
use ortc_sdp_core::ProducerCodecOptions;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::TransportInner;
use crate::types::MediaTrack;

/// What to produce and how
#[derive(Debug, Clone)]
pub struct ProducerOptions {
    pub track: MediaTrack,
    /// Simulcast encodings; empty sends a single stream
    pub encodings: Vec<RtpEncodingParameters>,
    pub codec_options: Option<ProducerCodecOptions>,
    /// Use this codec instead of the first negotiated one
    pub codec: Option<RtpCodecCapability>,
    pub app_data: serde_json::Value,
}

impl ProducerOptions {
    pub fn new(track: MediaTrack) -> Self {
        Self {
            track,
            encodings: Vec::new(),
            codec_options: None,
            codec: None,
            app_data: serde_json::Value::Null,
        }
    }

    pub fn with_encodings(mut self, encodings: Vec<RtpEncodingParameters>) -> Self {
        self.encodings = encodings;
        self
    }

    pub fn with_codec_options(mut self, codec_options: ProducerCodecOptions) -> Self {
        self.codec_options = Some(codec_options);
        self
    }

    pub fn with_codec(mut self, codec: RtpCodecCapability) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_app_data(mut self, app_data: serde_json::Value) -> Self {
        self.app_data = app_data;
        self
    }
}

pub(crate) struct ProducerInit {
    pub id: String,
    pub local_id: String,
    pub rtp_parameters: RtpParameters,
    pub track: MediaTrack,
    pub app_data: serde_json::Value,
}

struct ProducerInner {
    id: String,
    local_id: String,
    kind: MediaKind,
    rtp_parameters: RtpParameters,
    track: MediaTrack,
    app_data: serde_json::Value,
    paused: AtomicBool,
    closed: AtomicBool,
    max_spatial_layer: Mutex<Option<u8>>,
    transport: Weak<TransportInner>,
}

/// A local track being sent through a transport
#[derive(Clone)]
pub struct Producer {
    inner: Arc<ProducerInner>,
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.inner.id)
            .field("local_id", &self.inner.local_id)
            .field("kind", &self.inner.kind)
            .field("paused", &self.paused())
            .field("closed", &self.closed())
            .finish()
    }
}

impl Producer {
    pub(crate) fn new(init: ProducerInit, transport: Weak<TransportInner>) -> Self {
        debug!(id = %init.id, local_id = %init.local_id, "producer created");

        Self {
            inner: Arc::new(ProducerInner {
                kind: init.track.kind,
                id: init.id,
                local_id: init.local_id,
                rtp_parameters: init.rtp_parameters,
                track: init.track,
                app_data: init.app_data,
                paused: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                max_spatial_layer: Mutex::new(None),
                transport,
            }),
        }
    }

    /// Id assigned by the remote side
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Handler local id
    pub fn local_id(&self) -> &str {
        &self.inner.local_id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    /// Parameters the remote side receives with
    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.inner.rtp_parameters
    }

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

    /// Highest spatial layer last set, if any
    pub fn max_spatial_layer(&self) -> Option<u8> {
        *self.inner.max_spatial_layer.lock()
    }

    fn transport(&self) -> Result<Arc<TransportInner>> {
        if self.closed() {
            return Err(Error::invalid_state("producer closed"));
        }
        self.inner.transport.upgrade().ok_or(Error::TransportClosed)
    }

    /// Stop sending media without tearing the stream down
    pub async fn pause(&self) -> Result<()> {
        let transport = self.transport()?;
        debug!(id = %self.inner.id, "pause()");

        self.inner.paused.store(true, Ordering::SeqCst);
        transport.pause_producer(self.inner.local_id.clone()).await
    }

    /// Start sending media again
    pub async fn resume(&self) -> Result<()> {
        let transport = self.transport()?;
        debug!(id = %self.inner.id, "resume()");

        self.inner.paused.store(false, Ordering::SeqCst);
        transport.resume_producer(self.inner.local_id.clone()).await
    }

    /// Send only the simulcast encodings up to `spatial_layer`
    pub async fn set_max_spatial_layer(&self, spatial_layer: u8) -> Result<()> {
        let transport = self.transport()?;
        if self.inner.kind != MediaKind::Video {
            return Err(Error::unsupported("not a video producer"));
        }
        if self.max_spatial_layer() == Some(spatial_layer) {
            return Ok(());
        }
        debug!(id = %self.inner.id, spatial_layer, "set_max_spatial_layer()");

        transport
            .set_producer_max_spatial_layer(self.inner.local_id.clone(), spatial_layer)
            .await?;
        *self.inner.max_spatial_layer.lock() = Some(spatial_layer);
        Ok(())
    }

    /// Stop sending and release the local section
    ///
    /// The handler is told asynchronously; failures are only logged.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(id = %self.inner.id, "close()");

        if let Some(transport) = self.inner.transport.upgrade() {
            transport.remove_producer(self);
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
