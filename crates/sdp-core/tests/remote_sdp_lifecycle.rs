//! End to end: negotiated parameters flowing into a remote description

use ortc_rtp_core::{
    generate_probator_rtp_parameters, get_extended_rtp_capabilities,
    get_sending_remote_rtp_parameters, get_sending_rtp_parameters, parse_rtp_capabilities,
    MediaKind,
};
use ortc_sdp_core::session::ExtMap;
use ortc_sdp_core::{
    AnswerMediaSectionOptions, DtlsFingerprint, DtlsParameters, DtlsRole, IceParameters,
    MediaObject, MediaType, OfferMediaSectionOptions, ProducerCodecOptions, RemoteSdp,
    TransportContext,
};

const LOCAL_CAPS: &str = r#"{
    "codecs": [
        { "mimeType": "audio/opus", "preferredPayloadType": 111, "clockRate": 48000, "channels": 2,
          "parameters": { "minptime": 10, "useinbandfec": 1 },
          "rtcpFeedback": [{ "type": "transport-cc" }] },
        { "mimeType": "video/VP8", "preferredPayloadType": 96, "clockRate": 90000,
          "rtcpFeedback": [{ "type": "nack" }, { "type": "nack", "parameter": "pli" }, { "type": "transport-cc" }] },
        { "mimeType": "video/rtx", "preferredPayloadType": 97, "clockRate": 90000, "parameters": { "apt": 96 } }
    ],
    "headerExtensions": [
        { "kind": "video", "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 4 },
        { "kind": "video", "uri": "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01", "preferredId": 5 }
    ]
}"#;

const ROUTER_CAPS: &str = r#"{
    "codecs": [
        { "kind": "audio", "mimeType": "audio/opus", "preferredPayloadType": 100, "clockRate": 48000, "channels": 2,
          "rtcpFeedback": [{ "type": "transport-cc" }] },
        { "kind": "video", "mimeType": "video/VP8", "preferredPayloadType": 101, "clockRate": 90000,
          "rtcpFeedback": [{ "type": "nack" }, { "type": "nack", "parameter": "pli" }, { "type": "goog-remb" }, { "type": "transport-cc" }] },
        { "kind": "video", "mimeType": "video/rtx", "preferredPayloadType": 102, "clockRate": 90000, "parameters": { "apt": 101 } }
    ],
    "headerExtensions": [
        { "kind": "video", "uri": "urn:ietf:params:rtp-hdrext:sdes:mid", "preferredId": 1, "direction": "sendrecv" },
        { "kind": "video", "uri": "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01", "preferredId": 5 }
    ]
}"#;

fn transport() -> TransportContext {
    TransportContext {
        ice_parameters: Some(IceParameters {
            username_fragment: "remote".into(),
            password: "remotepwd".into(),
            ice_lite: Some(true),
        }),
        ice_candidates: Some(Vec::new()),
        dtls_parameters: Some(DtlsParameters {
            role: Some(DtlsRole::Auto),
            fingerprints: vec![DtlsFingerprint {
                algorithm: "sha-256".into(),
                value: "AB:CD".into(),
            }],
        }),
        sctp_parameters: None,
        plain_rtp_parameters: None,
    }
}

#[test]
fn send_video_answer_carries_negotiated_parameters() {
    let local = parse_rtp_capabilities(LOCAL_CAPS).unwrap();
    let router = parse_rtp_capabilities(ROUTER_CAPS).unwrap();
    let extended = get_extended_rtp_capabilities(&local, &router);

    let mut offer_params = get_sending_rtp_parameters(MediaKind::Video, &extended);
    let answer_params = get_sending_remote_rtp_parameters(MediaKind::Video, &extended);

    let mut offer_media = MediaObject::new(MediaType::Video, 9, "UDP/TLS/RTP/SAVPF").with_mid("0");
    for ext in &offer_params.header_extensions {
        offer_media.ext.push(ExtMap {
            value: ext.id,
            direction: None,
            uri: ext.uri.clone(),
        });
    }

    let options = ProducerCodecOptions {
        video_google_start_bitrate: Some(1000),
        ..Default::default()
    };

    let mut sdp = RemoteSdp::new(transport());
    let next = sdp.get_next_media_section_idx();
    assert_eq!(next.idx, 0);

    sdp.send(
        AnswerMediaSectionOptions {
            offer_media_object: &offer_media,
            offer_rtp_parameters: Some(&mut offer_params),
            answer_rtp_parameters: Some(&answer_params),
            codec_options: Some(&options),
            extmap_allow_mixed: false,
        },
        next.reuse_mid.as_deref(),
    )
    .unwrap();

    let text = sdp.get_sdp();
    assert!(text.contains("m=video 7 UDP/TLS/RTP/SAVPF 96 97\r\n"));
    assert!(text.contains("a=rtpmap:96 VP8/90000\r\n"));
    assert!(text.contains("a=fmtp:96 x-google-start-bitrate=1000\r\n"));
    assert!(text.contains("a=fmtp:97 apt=96\r\n"));
    assert!(text.contains("a=setup:actpass\r\n"));
    assert!(text.contains("a=recvonly\r\n"));
    assert!(text.contains("a=group:BUNDLE 0\r\n"));
    // transport-cc negotiated, so REMB is stripped
    assert!(!text.contains("goog-remb"));
    assert!(text.contains("a=rtcp-fb:96 transport-cc\r\n"));
}

#[test]
fn probator_receive_and_recycling() {
    let local = parse_rtp_capabilities(LOCAL_CAPS).unwrap();
    let router = parse_rtp_capabilities(ROUTER_CAPS).unwrap();
    let extended = get_extended_rtp_capabilities(&local, &router);
    let video = get_sending_rtp_parameters(MediaKind::Video, &extended);
    let probator = generate_probator_rtp_parameters(&video).unwrap();

    let mut sdp = RemoteSdp::new(transport());

    for mid in ["0", "1"] {
        sdp.receive(OfferMediaSectionOptions {
            mid,
            kind: MediaType::Video,
            offer_rtp_parameters: Some(&video),
            stream_id: Some("stream"),
            track_id: Some(mid),
            legacy_sctpmap: false,
        })
        .unwrap();
    }

    sdp.receive(OfferMediaSectionOptions {
        mid: "probator",
        kind: MediaType::Video,
        offer_rtp_parameters: Some(&probator),
        stream_id: Some("probator"),
        track_id: Some("probator"),
        legacy_sctpmap: false,
    })
    .unwrap();

    let text = sdp.get_sdp();
    assert!(text.contains("a=mid:probator\r\n"));
    assert!(text.contains("a=ssrc:1234 cname:probator\r\n"));
    assert!(text.contains("a=group:BUNDLE 0 1 probator\r\n"));

    assert!(sdp.close_media_section("1").unwrap());
    let next = sdp.get_next_media_section_idx();
    assert_eq!(next.reuse_mid.as_deref(), Some("1"));
    assert!(sdp.get_sdp().contains("a=group:BUNDLE 0 probator\r\n"));
    assert!(sdp.get_sdp().contains("m=video 0 UDP/TLS/RTP/SAVPF"));
}
