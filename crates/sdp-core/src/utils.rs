//! Helpers that read negotiation data back out of a local session model
//!
//! Handler adapters hand over the native peer's description in
//! [`SessionDescription`] form; these functions recover the capabilities,
//! DTLS parameters and sending encodings the negotiation layer works with.

use indexmap::{IndexMap, IndexSet};

use ortc_rtp_core::{
    MediaKind, ParameterValue, Parameters, RtcpFeedback, RtpCapabilities, RtpCodecCapability,
    RtpEncodingParameters, RtpHeaderExtension, RtxParameters,
};

use crate::error::{Error, Result};
use crate::session::{MediaObject, SessionDescription, SetupRole};
use crate::transport::{DtlsFingerprint, DtlsParameters, DtlsRole};

/// Parse a `key=value;key=value` fmtp config
///
/// Integral values without a leading zero become numbers, everything else
/// stays text so identifiers such as `profile-level-id=42e01f` survive.
pub fn parse_fmtp_config(config: &str) -> Parameters {
    let mut parameters = Parameters::new();

    for entry in config.split(';') {
        let entry = entry.trim();
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            continue;
        }

        let numeric = value.len() == 1 || !value.starts_with('0');
        let parsed = match value.parse::<i64>() {
            Ok(number) if numeric => ParameterValue::Integer(number),
            _ => ParameterValue::Text(value.to_string()),
        };
        parameters.insert(key.to_string(), parsed);
    }

    parameters
}

/// Native RTP capabilities announced by a local description
pub fn extract_rtp_capabilities(session: &SessionDescription) -> RtpCapabilities {
    let mut codecs: IndexMap<u8, RtpCodecCapability> = IndexMap::new();
    let mut header_extensions: Vec<RtpHeaderExtension> = Vec::new();

    for media in &session.media {
        let Some(kind) = media.kind.media_kind() else {
            continue;
        };

        for rtp in &media.rtp {
            codecs.entry(rtp.payload).or_insert_with(|| RtpCodecCapability {
                kind: Some(kind),
                mime_type: format!("{}/{}", kind, rtp.codec),
                preferred_payload_type: rtp.payload,
                clock_rate: rtp.rate,
                channels: match kind {
                    MediaKind::Audio => Some(rtp.encoding.unwrap_or(1)),
                    MediaKind::Video => None,
                },
                parameters: Parameters::new(),
                rtcp_feedback: Vec::new(),
            });
        }

        for fmtp in &media.fmtp {
            if let Some(codec) = codecs.get_mut(&fmtp.payload) {
                codec.parameters = parse_fmtp_config(&fmtp.config);
            }
        }

        for fb in &media.rtcp_fb {
            if let Some(codec) = codecs.get_mut(&fb.payload) {
                let feedback = RtcpFeedback {
                    fb_type: fb.fb_type.clone(),
                    parameter: fb.subtype.clone(),
                };
                if !codec.rtcp_feedback.contains(&feedback) {
                    codec.rtcp_feedback.push(feedback);
                }
            }
        }

        for ext in &media.ext {
            let known = header_extensions
                .iter()
                .any(|e| e.kind == Some(kind) && e.preferred_id == ext.value);
            if known {
                continue;
            }
            header_extensions.push(RtpHeaderExtension {
                kind: Some(kind),
                uri: ext.uri.clone(),
                preferred_id: ext.value,
                preferred_encrypt: None,
                direction: None,
            });
        }
    }

    RtpCapabilities {
        codecs: codecs.into_values().collect(),
        header_extensions,
    }
}

/// Local DTLS parameters from the first active section with ICE credentials
pub fn extract_dtls_parameters(session: &SessionDescription) -> Result<DtlsParameters> {
    let media = session
        .media
        .iter()
        .find(|m| m.ice_ufrag.is_some() && !m.is_closed())
        .ok_or_else(|| Error::missing("no active media section found"))?;

    let fingerprint = media
        .fingerprint
        .as_ref()
        .or(session.fingerprint.as_ref())
        .ok_or_else(|| Error::missing("no a=fingerprint found"))?;

    let role = match media.setup {
        Some(SetupRole::Active) => Some(DtlsRole::Client),
        Some(SetupRole::Passive) => Some(DtlsRole::Server),
        Some(SetupRole::Actpass) => Some(DtlsRole::Auto),
        None => None,
    };

    Ok(DtlsParameters {
        role,
        fingerprints: vec![DtlsFingerprint {
            algorithm: fingerprint.hash_type.clone(),
            value: fingerprint.hash.clone(),
        }],
    })
}

/// CNAME of the first `a=ssrc:<id> cname:` line
pub fn get_cname(media: &MediaObject) -> Option<String> {
    media
        .ssrcs
        .iter()
        .find(|line| line.attribute == "cname")
        .and_then(|line| line.value.clone())
}

/// Sending encodings of a section, pairing media and RTX SSRCs via FID groups
pub fn get_rtp_encodings(media: &MediaObject) -> Result<Vec<RtpEncodingParameters>> {
    let mut ssrcs: IndexSet<u32> = media.ssrcs.iter().map(|line| line.id).collect();
    if ssrcs.is_empty() {
        return Err(Error::missing("no a=ssrc lines found"));
    }

    let mut ssrc_to_rtx: IndexMap<u32, Option<u32>> = IndexMap::new();

    for group in media.ssrc_groups.iter().filter(|g| g.semantics == "FID") {
        let (Some(&ssrc), Some(&rtx_ssrc)) = (group.ssrcs.first(), group.ssrcs.get(1)) else {
            continue;
        };
        if ssrcs.shift_remove(&ssrc) {
            ssrcs.shift_remove(&rtx_ssrc);
            ssrc_to_rtx.insert(ssrc, Some(rtx_ssrc));
        }
    }

    for ssrc in ssrcs {
        ssrc_to_rtx.insert(ssrc, None);
    }

    Ok(ssrc_to_rtx
        .into_iter()
        .map(|(ssrc, rtx)| RtpEncodingParameters {
            ssrc: Some(ssrc),
            rtx: rtx.map(|ssrc| RtxParameters { ssrc }),
            ..Default::default()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        Fingerprint, Fmtp, MediaType, Origin, RtcpFb, RtpMap, SsrcAttribute, SsrcGroup,
    };
    use crate::transport::IpVersion;
    use pretty_assertions::assert_eq;

    fn session_with(media: MediaObject) -> SessionDescription {
        let mut session = SessionDescription::new(Origin {
            username: "-".into(),
            session_id: 1,
            session_version: 1,
            net_type: "IN".into(),
            ip_version: IpVersion::V4,
            address: "127.0.0.1".into(),
        });
        session.media.push(media);
        session
    }

    #[test]
    fn test_parse_fmtp_config() {
        let params = parse_fmtp_config("level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f");
        assert_eq!(params["level-asymmetry-allowed"], ParameterValue::Integer(1));
        assert_eq!(params["profile-level-id"], ParameterValue::Text("42e01f".into()));

        let params = parse_fmtp_config("profile-level-id=010000; apt=0");
        assert_eq!(params["profile-level-id"], ParameterValue::Text("010000".into()));
        assert_eq!(params["apt"], ParameterValue::Integer(0));
    }

    #[test]
    fn test_extract_rtp_capabilities() {
        let mut media = MediaObject::new(MediaType::Audio, 9, "UDP/TLS/RTP/SAVPF").with_mid("0");
        media.rtp.push(RtpMap {
            payload: 111,
            codec: "opus".into(),
            rate: 48000,
            encoding: Some(2),
        });
        media.fmtp.push(Fmtp {
            payload: 111,
            config: "minptime=10;useinbandfec=1".into(),
        });
        media.rtcp_fb.push(RtcpFb {
            payload: 111,
            fb_type: "transport-cc".into(),
            subtype: None,
        });

        let caps = extract_rtp_capabilities(&session_with(media));
        assert_eq!(caps.codecs.len(), 1);
        assert_eq!(caps.codecs[0].mime_type, "audio/opus");
        assert_eq!(caps.codecs[0].channels, Some(2));
        assert_eq!(caps.codecs[0].parameters.len(), 2);
        assert_eq!(caps.codecs[0].rtcp_feedback[0].fb_type, "transport-cc");
    }

    #[test]
    fn test_extract_dtls_parameters() {
        let mut media = MediaObject::new(MediaType::Audio, 9, "UDP/TLS/RTP/SAVPF").with_mid("0");
        media.ice_ufrag = Some("u".into());
        media.setup = Some(SetupRole::Active);
        let mut session = session_with(media);
        assert!(extract_dtls_parameters(&session).is_err());

        session.fingerprint = Some(Fingerprint {
            hash_type: "sha-256".into(),
            hash: "AA".into(),
        });
        let params = extract_dtls_parameters(&session).unwrap();
        assert_eq!(params.role, Some(DtlsRole::Client));
        assert_eq!(params.fingerprints[0].value, "AA");
    }

    #[test]
    fn test_get_rtp_encodings_pairs_rtx() {
        let mut media = MediaObject::new(MediaType::Video, 9, "UDP/TLS/RTP/SAVPF").with_mid("0");
        for id in [1111, 2222, 3333] {
            media.ssrcs.push(SsrcAttribute {
                id,
                attribute: "cname".into(),
                value: Some("local".into()),
            });
        }
        media.ssrc_groups.push(SsrcGroup {
            semantics: "FID".into(),
            ssrcs: vec![1111, 2222],
        });

        let encodings = get_rtp_encodings(&media).unwrap();
        assert_eq!(encodings.len(), 2);
        assert_eq!(encodings[0].ssrc, Some(1111));
        assert_eq!(encodings[0].rtx, Some(RtxParameters { ssrc: 2222 }));
        assert_eq!(encodings[1].ssrc, Some(3333));
        assert_eq!(encodings[1].rtx, None);

        assert_eq!(get_cname(&media).as_deref(), Some("local"));
        assert!(get_rtp_encodings(&MediaObject::new(MediaType::Video, 9, "x")).is_err());
    }
}
