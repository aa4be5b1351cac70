//! Data producers and data consumers

mod common;

use std::sync::Arc;

use common::*;
use ortc_client_core::prelude::*;
use ortc_client_core::TransportOptions;
use ortc_rtp_core::SctpStreamParameters;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_produce_data() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let listener = Arc::new(AcceptingListener::default());
    let transport = device
        .create_send_transport(transport_options("send-1"), listener.clone())
        .await
        .unwrap();

    let chat = transport
        .produce_data(DataProducerOptions::new("chat").with_protocol("json"))
        .await
        .unwrap();
    let lossy = transport
        .produce_data(DataProducerOptions::new("telemetry").with_max_retransmits(0))
        .await
        .unwrap();

    assert_eq!(chat.id(), "data-producer-1");
    assert_eq!(chat.label(), "chat");
    assert_eq!(chat.protocol(), "json");
    assert_eq!(chat.sctp_stream_parameters().stream_id, 0);
    assert_eq!(chat.sctp_stream_parameters().ordered, Some(true));

    assert_eq!(lossy.sctp_stream_parameters().stream_id, 1);
    assert_eq!(lossy.sctp_stream_parameters().ordered, Some(false));
    assert_eq!(lossy.sctp_stream_parameters().max_retransmits, Some(0));

    let requests = listener.produced_data.lock().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].label, "telemetry");

    // One SCTP association for every channel
    let handler = handlers.last();
    assert_eq!(handler.calls_of("send_data_channel").len(), 2);
    assert!(handler.remote_sdp().unwrap().contains("a=sctp-port:5000"));

    let mut peer = handler.take_data_channel_peer(0).unwrap();
    chat.send(DataMessage::Text("hello".to_string())).unwrap();
    assert_eq!(
        peer.outbound.recv().await,
        Some(DataMessage::Text("hello".to_string()))
    );

    chat.close();
    assert!(matches!(
        chat.send(DataMessage::Binary(vec![1, 2, 3])),
        Err(Error::InvalidState(_))
    ));
    assert!(transport.data_producer("data-producer-1").is_none());
    assert!(transport.data_producer("data-producer-2").is_some());
}

#[tokio::test]
async fn test_data_channel_section_takes_closed_mid() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let transport = device
        .create_send_transport(transport_options("send-1"), Arc::new(AcceptingListener::default()))
        .await
        .unwrap();

    transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await
        .unwrap();
    let second = transport
        .produce(ProducerOptions::new(MediaTrack::new(MediaKind::Audio)))
        .await
        .unwrap();
    second.close();
    settle(&transport).await;

    transport
        .produce_data(DataProducerOptions::new("chat"))
        .await
        .unwrap();

    let sdp = handlers.last().remote_sdp().unwrap();
    let m_lines: Vec<&str> = sdp.lines().filter(|line| line.starts_with("m=")).collect();
    assert_eq!(m_lines.len(), 2);
    assert!(m_lines[1].starts_with("m=application"));

    let mut mids: Vec<&str> = sdp
        .lines()
        .filter(|line| line.starts_with("a=mid:"))
        .collect();
    assert_eq!(mids.len(), 2);
    mids.dedup();
    assert_eq!(mids.len(), 2);
    assert!(sdp.contains(&format!("a=group:BUNDLE 0 {}", second.local_id())));
}

#[tokio::test]
async fn test_produce_data_validation() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let transport = device
        .create_send_transport(transport_options("send-1"), Arc::new(AcceptingListener::default()))
        .await
        .unwrap();

    let both = DataProducerOptions::new("x")
        .with_max_packet_life_time(100)
        .with_max_retransmits(3);
    assert!(matches!(transport.produce_data(both).await, Err(Error::Rtp(_))));
    assert!(handlers.last().calls_of("send_data_channel").is_empty());
}

#[tokio::test]
async fn test_produce_data_without_sctp() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let options = transport_options("send-1");
    let options = TransportOptions {
        sctp_parameters: None,
        ..options
    };
    let transport = device
        .create_send_transport(options, Arc::new(AcceptingListener::default()))
        .await
        .unwrap();

    let result = transport.produce_data(DataProducerOptions::new("chat")).await;
    assert!(matches!(result, Err(Error::Unsupported(_))));
}

#[tokio::test]
async fn test_consume_data() {
    let handlers = Handlers::default();
    let device = loaded_device(&handlers).await;
    let transport = device
        .create_recv_transport(transport_options("recv-1"), Arc::new(AcceptingListener::default()))
        .await
        .unwrap();

    let data_consumer = transport
        .consume_data(DataConsumerOptions {
            id: "dc-1".to_string(),
            data_producer_id: "dp-1".to_string(),
            sctp_stream_parameters: SctpStreamParameters {
                stream_id: 7,
                ordered: None,
                max_packet_life_time: None,
                max_retransmits: None,
                label: None,
                protocol: None,
            },
            label: "chat".to_string(),
            protocol: String::new(),
            app_data: serde_json::json!({ "room": "lobby" }),
        })
        .await
        .unwrap();

    assert_eq!(data_consumer.id(), "dc-1");
    assert_eq!(data_consumer.data_producer_id(), "dp-1");
    assert_eq!(data_consumer.label(), "chat");
    assert_eq!(data_consumer.sctp_stream_parameters().ordered, Some(true));
    assert_eq!(data_consumer.app_data()["room"], "lobby");

    let handler = handlers.last();
    let peer = handler.take_data_channel_peer(7).unwrap();
    peer.inbound
        .send(DataMessage::Binary(vec![0xde, 0xad]))
        .unwrap();
    assert_eq!(
        data_consumer.recv().await,
        Some(DataMessage::Binary(vec![0xde, 0xad]))
    );

    transport.close();
    assert!(data_consumer.closed());
    assert_eq!(data_consumer.recv().await, None);
}
