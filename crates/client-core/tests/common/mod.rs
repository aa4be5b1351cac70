//! Shared fixtures for the client-core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use ortc_client_core::prelude::*;
use ortc_client_core::{FakeHandler, Handler, HandlerFactory};
use ortc_rtp_core::{parse_rtp_capabilities, parse_rtp_parameters, SctpParameters};
use ortc_sdp_core::{DtlsParameters, IceParameters};
use parking_lot::Mutex;

/// Router capabilities as a media server would announce them
pub fn router_rtp_capabilities() -> RtpCapabilities {
    parse_rtp_capabilities(
        r#"{
            "codecs": [
                { "kind": "audio", "mimeType": "audio/opus", "preferredPayloadType": 100,
                  "clockRate": 48000, "channels": 2,
                  "rtcpFeedback": [ { "type": "transport-cc" } ] },
                { "kind": "video", "mimeType": "video/VP8", "preferredPayloadType": 101,
                  "clockRate": 90000,
                  "rtcpFeedback": [ { "type": "nack" }, { "type": "nack", "parameter": "pli" },
                                    { "type": "ccm", "parameter": "fir" },
                                    { "type": "goog-remb" }, { "type": "transport-cc" } ] },
                { "kind": "video", "mimeType": "video/rtx", "preferredPayloadType": 102,
                  "clockRate": 90000, "parameters": { "apt": 101 } },
                { "kind": "video", "mimeType": "video/H264", "preferredPayloadType": 103,
                  "clockRate": 90000,
                  "parameters": { "packetization-mode": 1, "level-asymmetry-allowed": 1,
                                  "profile-level-id": "42e01f" },
                  "rtcpFeedback": [ { "type": "nack" }, { "type": "nack", "parameter": "pli" } ] },
                { "kind": "video", "mimeType": "video/rtx", "preferredPayloadType": 104,
                  "clockRate": 90000, "parameters": { "apt": 103 } }
            ],
            "headerExtensions": [
                { "kind": "audio", "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 1 },
                { "kind": "video", "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 1 },
                { "kind": "audio", "uri": "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
                  "preferredId": 4 },
                { "kind": "video", "uri": "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
                  "preferredId": 4 },
                { "kind": "video", "uri": "urn:3gpp:video-orientation", "preferredId": 11 }
            ]
        }"#,
    )
    .unwrap()
}

/// Router capabilities without any video codec
pub fn audio_only_router_rtp_capabilities() -> RtpCapabilities {
    parse_rtp_capabilities(
        r#"{
            "codecs": [
                { "kind": "audio", "mimeType": "audio/opus", "preferredPayloadType": 100,
                  "clockRate": 48000, "channels": 2 }
            ]
        }"#,
    )
    .unwrap()
}

/// Parameters of a server consumer of an audio producer
pub fn audio_consumer_parameters(ssrc: u32) -> RtpParameters {
    parse_rtp_parameters(&format!(
        r#"{{
            "codecs": [
                {{ "mimeType": "audio/opus", "payloadType": 100, "clockRate": 48000, "channels": 2,
                   "rtcpFeedback": [ {{ "type": "transport-cc" }} ] }}
            ],
            "headerExtensions": [
                {{ "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "id": 1 }}
            ],
            "encodings": [ {{ "ssrc": {ssrc} }} ],
            "rtcp": {{ "cname": "remote-{ssrc}" }}
        }}"#
    ))
    .unwrap()
}

/// Parameters of a server consumer of a VP8 producer
pub fn video_consumer_parameters(ssrc: u32) -> RtpParameters {
    parse_rtp_parameters(&format!(
        r#"{{
            "codecs": [
                {{ "mimeType": "video/VP8", "payloadType": 101, "clockRate": 90000,
                   "rtcpFeedback": [ {{ "type": "nack" }}, {{ "type": "nack", "parameter": "pli" }} ] }},
                {{ "mimeType": "video/rtx", "payloadType": 102, "clockRate": 90000,
                   "parameters": {{ "apt": 101 }} }}
            ],
            "headerExtensions": [
                {{ "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "id": 1 }},
                {{ "uri": "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time", "id": 4 }}
            ],
            "encodings": [ {{ "ssrc": {ssrc}, "rtx": {{ "ssrc": {rtx} }} }} ],
            "rtcp": {{ "cname": "remote-{ssrc}" }}
        }}"#,
        rtx = ssrc + 1
    ))
    .unwrap()
}

pub fn audio_consumer(id: &str, ssrc: u32) -> ConsumerOptions {
    ConsumerOptions::new(id, format!("producer-{id}"), MediaKind::Audio, audio_consumer_parameters(ssrc))
}

pub fn video_consumer(id: &str, ssrc: u32) -> ConsumerOptions {
    ConsumerOptions::new(id, format!("producer-{id}"), MediaKind::Video, video_consumer_parameters(ssrc))
}

/// Remote transport parameters, with SCTP enabled
pub fn transport_options(id: &str) -> TransportOptions {
    let ice_parameters: IceParameters = serde_json::from_str(
        r#"{ "usernameFragment": "remoteufrag", "password": "remotepassword", "iceLite": true }"#,
    )
    .unwrap();
    let dtls_parameters: DtlsParameters = serde_json::from_str(
        r#"{ "role": "auto", "fingerprints": [
            { "algorithm": "sha-256",
              "value": "A9:F4:E0:D2:74:D3:0F:D9:CA:A5:2F:9F:7F:47:FA:F0:C4:72:DD:73:49:D0:3B:14:90:20:51:30:1B:90:8E:71" }
        ] }"#,
    )
    .unwrap();

    TransportOptions::new(id, ice_parameters, dtls_parameters).with_sctp_parameters(SctpParameters {
        port: 5000,
        os: 1024,
        mis: 1024,
        max_message_size: 262_144,
    })
}

/// Every handler a factory handed out, in creation order
#[derive(Clone, Default)]
pub struct Handlers(Arc<Mutex<Vec<Arc<FakeHandler>>>>);

impl Handlers {
    pub fn factory(&self) -> HandlerFactory {
        let handlers = self.clone();
        Arc::new(move || {
            let handler = Arc::new(FakeHandler::new());
            handlers.0.lock().push(Arc::clone(&handler));
            handler as Arc<dyn Handler>
        })
    }

    /// The most recently created handler
    pub fn last(&self) -> Arc<FakeHandler> {
        self.0.lock().last().cloned().unwrap()
    }

    pub fn count(&self) -> usize {
        self.0.lock().len()
    }
}

/// Signaling stand-in that accepts everything
#[derive(Default)]
pub struct AcceptingListener {
    pub connects: Mutex<Vec<(String, DtlsParameters)>>,
    pub produced: Mutex<Vec<ProduceRequest>>,
    pub produced_data: Mutex<Vec<ProduceDataRequest>>,
    pub states: Mutex<Vec<ConnectionState>>,
    /// Reject every produce request with this message
    pub reject_produce: Mutex<Option<String>>,
}

#[async_trait]
impl TransportListener for AcceptingListener {
    async fn on_connect(&self, transport_id: &str, dtls_parameters: DtlsParameters) -> Result<()> {
        self.connects
            .lock()
            .push((transport_id.to_string(), dtls_parameters));
        Ok(())
    }

    async fn on_produce(&self, _transport_id: &str, request: ProduceRequest) -> Result<String> {
        if let Some(reason) = self.reject_produce.lock().clone() {
            return Err(Error::signaling(reason));
        }
        let mut produced = self.produced.lock();
        produced.push(request);
        Ok(format!("producer-{}", produced.len()))
    }

    async fn on_produce_data(
        &self,
        _transport_id: &str,
        request: ProduceDataRequest,
    ) -> Result<String> {
        let mut produced = self.produced_data.lock();
        produced.push(request);
        Ok(format!("data-producer-{}", produced.len()))
    }

    async fn on_connection_state_change(&self, _transport_id: &str, state: ConnectionState) {
        self.states.lock().push(state);
    }
}

/// Route crate logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A device loaded against [`router_rtp_capabilities`]
pub async fn loaded_device(handlers: &Handlers) -> Device {
    init_tracing();
    let device = Device::new(DeviceOptions::new().with_handler_factory(handlers.factory())).unwrap();
    device.load(router_rtp_capabilities()).await.unwrap();
    device
}

/// Let spawned batch drains and queued tasks run to completion
pub async fn settle(transport: &Transport) {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
    while !transport.pending_operations().is_empty() {
        tokio::task::yield_now().await;
    }
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
