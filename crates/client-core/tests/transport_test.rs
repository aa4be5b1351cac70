//! Send and receive transports driven by the fake handler

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::*;
use ortc_client_core::handlers::HandlerCall;
use ortc_client_core::prelude::*;
use ortc_client_core::{IceServer, TransportDirection};
use ortc_infra_common::QueueError;
use ortc_rtp_core::RtpEncodingParameters;
use ortc_sdp_core::{DtlsParameters, DtlsRole, IceParameters};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

async fn send_transport(handlers: &Handlers) -> (Device, Transport, Arc<AcceptingListener>) {
    let device = loaded_device(handlers).await;
    let listener = Arc::new(AcceptingListener::default());
    let transport = device
        .create_send_transport(transport_options("send-1"), listener.clone())
        .await
        .unwrap();
    (device, transport, listener)
}

#[tokio::test]
async fn test_produce_audio() {
    let handlers = Handlers::default();
    let (_device, transport, listener) = send_transport(&handlers).await;
    let mut events = transport.subscribe();

    assert_eq!(transport.direction(), TransportDirection::Send);
    assert_eq!(transport.connection_state(), ConnectionState::New);

    let track = MediaTrack::new(MediaKind::Audio);
    let producer = transport
        .produce(ProducerOptions::new(track.clone()))
        .await
        .unwrap();

    assert_eq!(producer.id(), "producer-1");
    assert_eq!(producer.kind(), MediaKind::Audio);
    assert_eq!(producer.track(), &track);
    assert_eq!(producer.rtp_parameters().mid.as_deref(), Some(producer.local_id()));
    assert_eq!(producer.rtp_parameters().codecs[0].mime_type, "audio/opus");
    assert!(!producer.paused());

    // First send connects the transport as DTLS client
    let connects = listener.connects.lock().clone();
    assert_eq!(connects.len(), 1);
    assert_eq!(connects[0].0, "send-1");
    assert_eq!(connects[0].1.role, Some(DtlsRole::Client));
    assert_eq!(transport.connection_state(), ConnectionState::Connected);
    assert_eq!(
        *listener.states.lock(),
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );

    let produced = listener.produced.lock().clone();
    assert_eq!(produced.len(), 1);
    assert_eq!(produced[0].kind, MediaKind::Audio);
    assert_eq!(produced[0].rtp_parameters, *producer.rtp_parameters());

    assert_eq!(
        events.try_recv().unwrap(),
        TransportEvent::ConnectionStateChanged {
            transport_id: "send-1".to_string(),
            state: ConnectionState::Connecting,
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        TransportEvent::ConnectionStateChanged {
            transport_id: "send-1".to_string(),
            state: ConnectionState::Connected,
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        TransportEvent::ProducerCreated {
            producer_id: "producer-1".to_string(),
        }
    );

    assert!(transport.producer("producer-1").is_some());
    let handler = handlers.last();
    assert_eq!(handler.calls_of("send").len(), 1);
    let remote_sdp = handler.remote_sdp().unwrap();
    assert!(remote_sdp.contains("a=setup:passive"));
    assert!(remote_sdp.contains("a=recvonly"));
}

#[tokio::test]
async fn test_concurrent_produce_runs_in_call_order() {
    let handlers = Handlers::default();
    let (_device, transport, _listener) = send_transport(&handlers).await;

    let (audio, video) = tokio::join!(
        transport.produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio))),
        transport.produce(ProducerOptions::new(MediaTrack::new(MediaKind::Video))),
    );
    let audio = audio.unwrap();
    let video = video.unwrap();

    assert_eq!(audio.id(), "producer-1");
    assert_eq!(video.id(), "producer-2");
    assert_eq!(audio.local_id(), "0");
    assert_eq!(video.local_id(), "1");
    assert_eq!(transport.producers().len(), 2);
}

#[tokio::test]
async fn test_produce_rejected_by_signaling_stops_sending() {
    let handlers = Handlers::default();
    let (_device, transport, listener) = send_transport(&handlers).await;
    *listener.reject_produce.lock() = Some("room full".to_string());

    let result = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await;

    assert_eq!(result.unwrap_err(), Error::signaling("room full"));
    assert!(transport.producers().is_empty());
    assert_eq!(
        handlers.last().calls_of("stop_sending"),
        vec![HandlerCall::StopSending {
            local_id: "0".to_string()
        }]
    );
}

#[tokio::test]
async fn test_produce_handler_failure() {
    let handlers = Handlers::default();
    let (_device, transport, listener) = send_transport(&handlers).await;
    handlers.last().fail_next("send");

    let result = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await;

    assert!(matches!(result, Err(Error::Handler(_))));
    assert!(listener.produced.lock().is_empty());

    // The queue keeps going
    transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_produce_on_recv_transport() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let transport = device
        .create_recv_transport(transport_options("recv-1"), Arc::new(AcceptingListener::default()))
        .await
        .unwrap();

    let result = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await;
    assert!(matches!(result, Err(Error::Unsupported(_))));
}

#[tokio::test]
async fn test_producer_pause_resume_close() {
    let handlers = Handlers::default();
    let (_device, transport, _listener) = send_transport(&handlers).await;
    let producer = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await
        .unwrap();
    let handler = handlers.last();

    producer.pause().await.unwrap();
    assert!(producer.paused());
    assert!(handler.remote_sdp().unwrap().contains("a=inactive"));

    producer.resume().await.unwrap();
    assert!(!producer.paused());
    assert_eq!(handler.calls_of("pause_sending").len(), 1);
    assert_eq!(handler.calls_of("resume_sending").len(), 1);

    producer.close();
    producer.close();
    settle(&transport).await;

    assert!(producer.closed());
    assert!(transport.producer(producer.id()).is_none());
    assert_eq!(handler.calls_of("stop_sending").len(), 1);
    assert!(matches!(producer.pause().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_simulcast_max_spatial_layer() {
    let handlers = Handlers::default();
    let (_device, transport, _listener) = send_transport(&handlers).await;

    let encodings = vec![
        RtpEncodingParameters {
            max_bitrate: Some(100_000),
            scale_resolution_down_by: Some(4.0),
            ..Default::default()
        },
        RtpEncodingParameters {
            max_bitrate: Some(300_000),
            scale_resolution_down_by: Some(2.0),
            ..Default::default()
        },
        RtpEncodingParameters {
            max_bitrate: Some(900_000),
            ..Default::default()
        },
    ];
    let producer = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Video)).with_encodings(encodings))
        .await
        .unwrap();

    let rids: Vec<Option<&str>> = producer
        .rtp_parameters()
        .encodings
        .iter()
        .map(|encoding| encoding.rid.as_deref())
        .collect();
    assert_eq!(rids, vec![Some("r0"), Some("r1"), Some("r2")]);
    assert!(producer
        .rtp_parameters()
        .encodings
        .iter()
        .all(|encoding| encoding.active == Some(true)));

    producer.set_max_spatial_layer(1).await.unwrap();
    producer.set_max_spatial_layer(1).await.unwrap();
    assert_eq!(producer.max_spatial_layer(), Some(1));

    let handler = handlers.last();
    assert_eq!(
        handler.calls_of("set_max_spatial_layer"),
        vec![HandlerCall::SetMaxSpatialLayer {
            local_id: producer.local_id().to_string(),
            spatial_layer: 1,
        }]
    );
    assert!(handler.remote_sdp().unwrap().contains("a=simulcast:recv r0;r1;~r2"));

    let audio = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await
        .unwrap();
    assert!(matches!(
        audio.set_max_spatial_layer(0).await,
        Err(Error::Unsupported(_))
    ));
}

#[tokio::test]
async fn test_restart_ice_and_update_ice_servers() {
    let handlers = Handlers::default();
    let (_device, transport, _listener) = send_transport(&handlers).await;

    let ice_parameters: IceParameters = serde_json::from_str(
        r#"{ "usernameFragment": "fresh", "password": "freshpassword", "iceLite": true }"#,
    )
    .unwrap();
    transport.restart_ice(ice_parameters.clone()).await.unwrap();
    transport
        .update_ice_servers(vec![IceServer {
            urls: vec!["stun:stun.example.org:3478".to_string()],
            username: None,
            credential: None,
        }])
        .await
        .unwrap();

    let handler = handlers.last();
    assert_eq!(handler.calls_of("restart_ice"), vec![HandlerCall::RestartIce]);
    assert_eq!(
        handler.calls_of("update_ice_servers"),
        vec![HandlerCall::UpdateIceServers]
    );

    transport.close();
    assert!(matches!(
        transport.restart_ice(ice_parameters).await,
        Err(Error::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_close_transport() {
    let handlers = Handlers::default();
    let (_device, transport, _listener) = send_transport(&handlers).await;
    let producer = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await
        .unwrap();
    let handler = handlers.last();
    let mut events = transport.subscribe();

    transport.close();
    transport.close();

    assert!(transport.closed());
    assert!(handler.is_closed());
    assert_eq!(transport.connection_state(), ConnectionState::Closed);
    assert!(producer.closed());
    assert!(transport.producers().is_empty());

    // Children closed by the transport make no handler calls
    producer.close();
    settle(&transport).await;
    assert!(handler.calls_of("stop_sending").is_empty());

    assert_eq!(
        events.try_recv().unwrap(),
        TransportEvent::ConnectionStateChanged {
            transport_id: "send-1".to_string(),
            state: ConnectionState::Closed,
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        TransportEvent::Closed {
            transport_id: "send-1".to_string(),
        }
    );

    let result = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

/// Signaling that holds every produce request until released
#[derive(Default)]
struct GatedListener {
    gate: Notify,
}

#[async_trait]
impl TransportListener for GatedListener {
    async fn on_connect(&self, _transport_id: &str, _dtls_parameters: DtlsParameters) -> Result<()> {
        Ok(())
    }

    async fn on_produce(&self, _transport_id: &str, _request: ProduceRequest) -> Result<String> {
        self.gate.notified().await;
        Ok("gated".to_string())
    }
}

#[tokio::test]
async fn test_close_rejects_running_and_queued_operations() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let listener = Arc::new(GatedListener::default());
    let transport = device
        .create_send_transport(transport_options("send-1"), listener.clone())
        .await
        .unwrap();

    let first = tokio::spawn({
        let transport = transport.clone();
        async move {
            transport
                .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
                .await
        }
    });
    let second = tokio::spawn({
        let transport = transport.clone();
        async move {
            transport
                .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Video)))
                .await
        }
    });

    while transport.pending_operations().len() < 2 {
        tokio::task::yield_now().await;
    }
    transport.close();

    assert_eq!(
        first.await.unwrap().unwrap_err(),
        Error::Queue(QueueError::Stopped)
    );
    assert_eq!(
        second.await.unwrap().unwrap_err(),
        Error::Queue(QueueError::Stopped)
    );
    assert!(transport.producers().is_empty());
    assert_eq!(handlers.last().calls_of("send").len(), 1);
}
