//! Device handler selection and loading

mod common;

use std::sync::Arc;

use common::*;
use ortc_client_core::prelude::*;
use ortc_client_core::{HandlerRegistry, TransportDirection, UserAgentInfo};
use ortc_rtp_core::parse_rtp_capabilities;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_load() {
    let handlers = Handlers::default();
    let device = Device::new(DeviceOptions::new().with_handler_factory(handlers.factory())).unwrap();
    assert_eq!(device.handler_name(), HandlerName::Fake);

    device.load(router_rtp_capabilities()).await.unwrap();
    assert!(device.loaded());

    assert!(device.can_produce(MediaKind::Audio).unwrap());
    assert!(device.can_produce(MediaKind::Video).unwrap());

    let caps = device.rtp_capabilities().unwrap();
    let mime_types: Vec<&str> = caps
        .codecs
        .iter()
        .map(|codec| codec.mime_type.as_str())
        .collect();
    assert_eq!(
        mime_types,
        vec!["audio/opus", "video/VP8", "video/rtx", "video/H264", "video/rtx"]
    );
    // Receive capabilities carry the router's payload types
    assert_eq!(caps.codecs[0].preferred_payload_type, 100);

    let sctp = device.sctp_capabilities().unwrap();
    assert_eq!(sctp.num_streams.os, 1024);
    assert_eq!(sctp.num_streams.mis, 1024);

    // One handler to learn the name, one for loading; both released
    assert_eq!(handlers.count(), 2);
    assert!(handlers.last().is_closed());
}

#[tokio::test]
async fn test_load_twice() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;

    let result = device.load(router_rtp_capabilities()).await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert!(device.loaded());
}

#[tokio::test]
async fn test_load_invalid_router_capabilities() {
    let handlers = Handlers::default();
    let device = Device::new(DeviceOptions::new().with_handler_factory(handlers.factory())).unwrap();

    let mut caps = router_rtp_capabilities();
    caps.codecs[0].clock_rate = 0;
    assert!(matches!(device.load(caps).await, Err(Error::Rtp(_))));
    assert!(!device.loaded());

    // A failed load can be retried
    device.load(router_rtp_capabilities()).await.unwrap();
}

#[tokio::test]
async fn test_audio_only_router() {
    let handlers = Handlers::default();
    let device = Device::new(DeviceOptions::new().with_handler_factory(handlers.factory())).unwrap();
    device
        .load(audio_only_router_rtp_capabilities())
        .await
        .unwrap();

    assert!(device.can_produce(MediaKind::Audio).unwrap());
    assert!(!device.can_produce(MediaKind::Video).unwrap());

    let transport = device
        .create_send_transport(transport_options("send-1"), Arc::new(AcceptingListener::default()))
        .await
        .unwrap();
    let result = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Video)))
        .await;
    assert!(matches!(result, Err(Error::Unsupported(_))));
}

#[tokio::test]
async fn test_no_common_codec() {
    let handlers = Handlers::default();
    let device = Device::new(DeviceOptions::new().with_handler_factory(handlers.factory())).unwrap();
    let caps = parse_rtp_capabilities(
        r#"{ "codecs": [
            { "mimeType": "audio/PCMU", "preferredPayloadType": 0, "clockRate": 8000 }
        ] }"#,
    )
    .unwrap();

    device.load(caps).await.unwrap();
    assert!(!device.can_produce(MediaKind::Audio).unwrap());
    assert!(device.rtp_capabilities().unwrap().codecs.is_empty());
}

#[tokio::test]
async fn test_transport_needs_loaded_device() {
    let device = Device::new(DeviceOptions::new().with_handler_name(HandlerName::Fake)).unwrap();
    let result = device
        .create_recv_transport(transport_options("recv-1"), Arc::new(AcceptingListener::default()))
        .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_detected_handler_from_registry() {
    let handlers = Handlers::default();
    let mut registry = HandlerRegistry::new();
    registry.register(HandlerName::Chrome111, handlers.factory());

    let info = UserAgentInfo::from_user_agent(
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Safari/537.36",
    );
    let device = Device::new(
        DeviceOptions::new()
            .with_user_agent(info)
            .with_registry(registry),
    )
    .unwrap();

    assert_eq!(device.handler_name(), HandlerName::Chrome111);
    device.load(router_rtp_capabilities()).await.unwrap();
    assert_eq!(handlers.count(), 1);
}

#[tokio::test]
async fn test_recv_transport_run_options() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let transport = device
        .create_recv_transport(transport_options("recv-1"), Arc::new(AcceptingListener::default()))
        .await
        .unwrap();

    assert_eq!(transport.id(), "recv-1");
    assert_eq!(transport.direction(), TransportDirection::Recv);
    assert_eq!(transport.handler_name(), HandlerName::Fake);
    assert!(!transport.extended_rtp_capabilities().codecs.is_empty());
    assert_eq!(
        handlers.last().calls(),
        vec![ortc_client_core::handlers::HandlerCall::Run {
            direction: TransportDirection::Recv
        }]
    );
}
