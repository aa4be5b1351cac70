//! Browser-like local capabilities negotiated against a media server

use ortc_rtp_core::constants::{PROBATOR_MID, PROBATOR_PAYLOAD_TYPE, PROBATOR_SSRC};
use ortc_rtp_core::prelude::*;
use ortc_rtp_core::{generate_probator_rtp_parameters, RtpHeaderExtension};
use pretty_assertions::assert_eq;

const MID_URI: &str = "urn:ietf:params:rtp-hdrext:sdes:mid";
const TWCC_URI: &str = "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn local_caps() -> RtpCapabilities {
    parse_rtp_capabilities(
        r#"{
            "codecs": [
                { "mimeType": "audio/opus", "preferredPayloadType": 111, "clockRate": 48000,
                  "channels": 2, "rtcpFeedback": [ { "type": "transport-cc" } ] },
                { "mimeType": "video/VP8", "preferredPayloadType": 96, "clockRate": 90000,
                  "rtcpFeedback": [ { "type": "nack" }, { "type": "nack", "parameter": "pli" },
                                    { "type": "goog-remb" }, { "type": "transport-cc" } ] },
                { "mimeType": "video/rtx", "preferredPayloadType": 97, "clockRate": 90000,
                  "parameters": { "apt": 96 } }
            ],
            "headerExtensions": [
                { "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 4 },
                { "kind": "video",
                  "uri": "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
                  "preferredId": 3 }
            ]
        }"#,
    )
    .unwrap()
}

fn router_caps() -> RtpCapabilities {
    parse_rtp_capabilities(
        r#"{
            "codecs": [
                { "kind": "audio", "mimeType": "audio/opus", "preferredPayloadType": 100,
                  "clockRate": 48000, "channels": 2, "rtcpFeedback": [ { "type": "transport-cc" } ] },
                { "kind": "video", "mimeType": "video/VP8", "preferredPayloadType": 101,
                  "clockRate": 90000,
                  "rtcpFeedback": [ { "type": "nack" }, { "type": "goog-remb" },
                                    { "type": "transport-cc" } ] },
                { "kind": "video", "mimeType": "video/rtx", "preferredPayloadType": 102,
                  "clockRate": 90000, "parameters": { "apt": 101 } }
            ],
            "headerExtensions": [
                { "kind": "video", "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 1 },
                { "kind": "video",
                  "uri": "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
                  "preferredId": 5 }
            ]
        }"#,
    )
    .unwrap()
}

fn feedback_types(codec: &RtpCodecParameters) -> Vec<&str> {
    codec
        .rtcp_feedback
        .iter()
        .map(|fb| fb.fb_type.as_str())
        .collect()
}

#[test]
fn test_send_side_negotiation() {
    init_tracing();
    let extended = get_extended_rtp_capabilities(&local_caps(), &router_caps());

    assert_eq!(extended.codecs.len(), 2);
    assert_eq!(extended.codecs[1].local_rtx_payload_type, Some(97));
    assert_eq!(extended.codecs[1].remote_rtx_payload_type, Some(102));
    assert!(can_send(MediaKind::Audio, &extended));
    assert!(can_send(MediaKind::Video, &extended));

    let video = get_sending_rtp_parameters(MediaKind::Video, &extended);
    let payload_types: Vec<u8> = video.codecs.iter().map(|c| c.payload_type).collect();
    assert_eq!(payload_types, vec![96, 97]);
    assert_eq!(video.codecs[1].parameters["apt"].as_i64(), Some(96));
    assert_eq!(feedback_types(&video.codecs[0]), vec!["nack", "goog-remb", "transport-cc"]);
    let ids: Vec<(&str, u8)> = video
        .header_extensions
        .iter()
        .map(|ext| (ext.uri.as_str(), ext.id))
        .collect();
    assert_eq!(ids, vec![(MID_URI, 4), (TWCC_URI, 3)]);

    // Transport-wide CC wins over REMB in the answer
    let remote_video = get_sending_remote_rtp_parameters(MediaKind::Video, &extended);
    let remote_payload_types: Vec<u8> =
        remote_video.codecs.iter().map(|c| c.payload_type).collect();
    assert_eq!(remote_payload_types, vec![96, 97]);
    assert_eq!(feedback_types(&remote_video.codecs[0]), vec!["nack", "transport-cc"]);

    // No congestion control extension is negotiated for audio
    let remote_audio = get_sending_remote_rtp_parameters(MediaKind::Audio, &extended);
    assert!(remote_audio.header_extensions.is_empty());
    assert!(remote_audio.codecs[0].rtcp_feedback.is_empty());
}

#[test]
fn test_recv_side_negotiation() {
    init_tracing();
    let extended = get_extended_rtp_capabilities(&local_caps(), &router_caps());

    let recv_caps = get_recv_rtp_capabilities(&extended);
    let payload_types: Vec<u8> = recv_caps
        .codecs
        .iter()
        .map(|c| c.preferred_payload_type)
        .collect();
    assert_eq!(payload_types, vec![100, 101, 102]);
    let ids: Vec<u8> = recv_caps
        .header_extensions
        .iter()
        .map(|ext: &RtpHeaderExtension| ext.preferred_id)
        .collect();
    assert_eq!(ids, vec![1, 5]);

    let mut consumer_params = parse_rtp_parameters(
        r#"{
            "codecs": [ { "mimeType": "video/VP8", "payloadType": 101, "clockRate": 90000 } ],
            "encodings": [ { "ssrc": 4444 } ]
        }"#,
    )
    .unwrap();
    assert!(can_receive(&consumer_params, &extended).unwrap());

    let probator = generate_probator_rtp_parameters(&consumer_params).unwrap();
    assert_eq!(probator.mid.as_deref(), Some(PROBATOR_MID));
    assert_eq!(probator.codecs[0].payload_type, PROBATOR_PAYLOAD_TYPE);
    assert_eq!(probator.encodings[0].ssrc, Some(PROBATOR_SSRC));

    // Local payload types are not receivable
    consumer_params.codecs[0].payload_type = 96;
    assert!(!can_receive(&consumer_params, &extended).unwrap());

    consumer_params.mid = Some(String::new());
    assert!(matches!(
        can_receive(&consumer_params, &extended),
        Err(Error::Validation(_))
    ));
}
