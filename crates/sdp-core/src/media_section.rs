//! One mutable `m=` section of the remote SDP
//!
//! A section is either an *answer* section (the local side sends, the remote
//! description answers with `recvonly`) or an *offer* section (the remote side
//! sends, the remote description offers `sendonly`). Both share the same
//! lifecycle:
//!
//! ```text
//! active --pause--> paused --disable--> disabled --close--> closed
//!    ^                |                    |
//!    +-----resume-----+--------------------+
//! ```
//!
//! `closed` (port 0) is terminal: the section can only be replaced by a new
//! one reusing its mid.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use ortc_rtp_core::{
    Direction, ParameterValue, Parameters, RtcpFeedback, RtpCodecParameters,
    RtpEncodingParameters, RtpParameters, SctpParameters,
};

use crate::error::{Error, Result};
use crate::session::{
    Candidate, Connection, ExtMap, Fmtp, MediaObject, MediaType, RidDirection, Rid, RtcpFb, RtpMap,
    SctpMap, SetupRole, Simulcast, SsrcAttribute, SsrcGroup,
};
use crate::simulcast::{parse_simulcast_stream_list, write_simulcast_stream_list};
use crate::transport::{
    DtlsParameters, DtlsRole, IceCandidate, IceParameters, IpVersion, PlainRtpParameters,
};

/// Placeholder connection address of ICE transports
const DUMMY_ADDRESS: &str = "127.0.0.1";

/// Placeholder port of ICE transports
const DUMMY_PORT: u16 = 7;

/// Application name announced for data channels
const DATA_CHANNEL_APP: &str = "webrtc-datachannel";

/// Lifecycle state of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaSectionState {
    /// Sending or receiving
    Active,
    /// Direction `inactive`, content kept
    Paused,
    /// Paused with extensions, SSRCs and simulcast stripped
    Disabled,
    /// Port 0
    Closed,
}

/// Which side sends on this section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaSectionRole {
    /// Local side sends, remote answers `recvonly`
    Answer,
    /// Remote side sends, remote offers `sendonly`
    Offer,
}

/// Per producer codec tweaks merged into the answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerCodecOptions {
    /// Opus stereo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_stereo: Option<bool>,
    /// Opus in-band FEC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_fec: Option<bool>,
    /// Opus DTX
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_dtx: Option<bool>,
    /// Opus maximum playback rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_max_playback_rate: Option<u32>,
    /// Opus maximum average bitrate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_max_average_bitrate: Option<u32>,
    /// Opus packet time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_ptime: Option<u32>,
    /// Keep generic NACK for Opus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_nack: Option<bool>,
    /// Video start bitrate (kbps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_google_start_bitrate: Option<u32>,
    /// Video maximum bitrate (kbps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_google_max_bitrate: Option<u32>,
    /// Video minimum bitrate (kbps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_google_min_bitrate: Option<u32>,
}

/// Remote transport parameters every new section is stamped with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportContext {
    /// ICE credentials
    pub ice_parameters: Option<IceParameters>,
    /// ICE candidates
    pub ice_candidates: Option<Vec<IceCandidate>>,
    /// DTLS parameters
    pub dtls_parameters: Option<DtlsParameters>,
    /// SCTP parameters, required for data channel sections
    pub sctp_parameters: Option<SctpParameters>,
    /// Plain RTP endpoint, replaces ICE/DTLS
    pub plain_rtp_parameters: Option<PlainRtpParameters>,
}

/// Inputs of an answer section
#[derive(Debug)]
pub struct AnswerMediaSectionOptions<'a> {
    /// Matching section of the local offer
    pub offer_media_object: &'a MediaObject,
    /// Local sending parameters; codec options are mirrored into them
    pub offer_rtp_parameters: Option<&'a mut RtpParameters>,
    /// Parameters the remote side will receive with
    pub answer_rtp_parameters: Option<&'a RtpParameters>,
    /// Codec tweaks
    pub codec_options: Option<&'a ProducerCodecOptions>,
    /// Announce `extmap-allow-mixed` when the offer does
    pub extmap_allow_mixed: bool,
}

/// Inputs of an offer section
#[derive(Debug, Clone)]
pub struct OfferMediaSectionOptions<'a> {
    /// Mid of the new section
    pub mid: &'a str,
    /// Media type
    pub kind: MediaType,
    /// Parameters the remote side sends with
    pub offer_rtp_parameters: Option<&'a RtpParameters>,
    /// Stream id for `a=msid`
    pub stream_id: Option<&'a str>,
    /// Track id for `a=msid`
    pub track_id: Option<&'a str>,
    /// Use the legacy `a=sctpmap` data channel format
    pub legacy_sctpmap: bool,
}

/// A media section owned by a [`crate::RemoteSdp`]
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSection {
    mid: String,
    role: MediaSectionRole,
    state: MediaSectionState,
    media: MediaObject,
}

/// Encoding name of a `kind/subtype` mime type
pub fn codec_name(mime_type: &str) -> Result<&str> {
    match mime_type.split_once('/') {
        Some((kind, name))
            if !name.is_empty()
                && (kind.eq_ignore_ascii_case("audio") || kind.eq_ignore_ascii_case("video")) =>
        {
            Ok(name)
        }
        _ => Err(Error::InvalidCodec(mime_type.to_string())),
    }
}

/// `key=value;key=value` in insertion order
pub fn fmtp_config(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(";")
}

fn flag(value: bool) -> ParameterValue {
    ParameterValue::Integer(i64::from(value))
}

fn push_codec(media: &mut MediaObject, codec: &RtpCodecParameters, parameters: &Parameters, rtcp_feedback: &[RtcpFeedback]) -> Result<()> {
    media.rtp.push(RtpMap {
        payload: codec.payload_type,
        codec: codec_name(&codec.mime_type)?.to_string(),
        rate: codec.clock_rate,
        encoding: codec.channels.filter(|channels| *channels > 1),
    });

    let config = fmtp_config(parameters);
    if !config.is_empty() {
        media.fmtp.push(Fmtp {
            payload: codec.payload_type,
            config,
        });
    }

    for fb in rtcp_feedback {
        media.rtcp_fb.push(RtcpFb {
            payload: codec.payload_type,
            fb_type: fb.fb_type.clone(),
            subtype: fb.parameter.clone(),
        });
    }

    Ok(())
}

fn payload_list(codecs: &[RtpCodecParameters]) -> String {
    codecs
        .iter()
        .map(|codec| codec.payload_type.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_generic_nack(fb: &RtcpFeedback) -> bool {
    fb.fb_type == "nack" && fb.parameter().is_empty()
}

/// Merge codec options into the answer parameters and the offer codec copy
fn apply_codec_options(
    codec: &RtpCodecParameters,
    options: &ProducerCodecOptions,
    answer_parameters: &mut Parameters,
    answer_feedback: &mut Vec<RtcpFeedback>,
    mut offer_codec: Option<&mut RtpCodecParameters>,
) {
    match codec.mime_type.to_lowercase().as_str() {
        "audio/opus" | "audio/multiopus" => {
            if let Some(stereo) = options.opus_stereo {
                if let Some(offer) = offer_codec.as_deref_mut() {
                    offer.parameters.insert("sprop-stereo".into(), flag(stereo));
                }
                answer_parameters.insert("stereo".into(), flag(stereo));
            }
            if let Some(fec) = options.opus_fec {
                if let Some(offer) = offer_codec.as_deref_mut() {
                    offer.parameters.insert("useinbandfec".into(), flag(fec));
                }
                answer_parameters.insert("useinbandfec".into(), flag(fec));
            }
            if let Some(dtx) = options.opus_dtx {
                if let Some(offer) = offer_codec.as_deref_mut() {
                    offer.parameters.insert("usedtx".into(), flag(dtx));
                }
                answer_parameters.insert("usedtx".into(), flag(dtx));
            }
            if let Some(rate) = options.opus_max_playback_rate {
                answer_parameters.insert("maxplaybackrate".into(), rate.into());
            }
            if let Some(bitrate) = options.opus_max_average_bitrate {
                answer_parameters.insert("maxaveragebitrate".into(), bitrate.into());
            }
            if let Some(ptime) = options.opus_ptime {
                if let Some(offer) = offer_codec.as_deref_mut() {
                    offer.parameters.insert("ptime".into(), ptime.into());
                }
                answer_parameters.insert("ptime".into(), ptime.into());
            }
            if !options.opus_nack.unwrap_or(false) {
                if let Some(offer) = offer_codec.as_deref_mut() {
                    offer.rtcp_feedback.retain(|fb| !is_generic_nack(fb));
                }
                answer_feedback.retain(|fb| !is_generic_nack(fb));
            }
        }
        "video/vp8" | "video/vp9" | "video/h264" | "video/h265" | "video/av1" => {
            if let Some(bitrate) = options.video_google_start_bitrate {
                answer_parameters.insert("x-google-start-bitrate".into(), bitrate.into());
            }
            if let Some(bitrate) = options.video_google_max_bitrate {
                answer_parameters.insert("x-google-max-bitrate".into(), bitrate.into());
            }
            if let Some(bitrate) = options.video_google_min_bitrate {
                answer_parameters.insert("x-google-min-bitrate".into(), bitrate.into());
            }
        }
        _ => {}
    }
}

impl MediaSection {
    fn with_transport(
        mid: &str,
        role: MediaSectionRole,
        mut media: MediaObject,
        ctx: &TransportContext,
    ) -> Self {
        media.mid = Some(mid.to_string());

        let mut section = Self {
            mid: mid.to_string(),
            role,
            state: MediaSectionState::Active,
            media,
        };

        if let Some(ice_parameters) = &ctx.ice_parameters {
            section.set_ice_parameters(ice_parameters);
        }

        if let Some(candidates) = &ctx.ice_candidates {
            section.media.candidates = candidates
                .iter()
                .map(|candidate| Candidate {
                    foundation: candidate.foundation.clone(),
                    component: 1,
                    transport: candidate.protocol.as_str().to_string(),
                    priority: candidate.priority,
                    ip: candidate.address.clone(),
                    port: candidate.port,
                    candidate_type: candidate.candidate_type.as_str().to_string(),
                    tcp_type: candidate.tcp_type.map(|t| t.as_str().to_string()),
                })
                .collect();
            section.media.end_of_candidates = true;
            section.media.ice_options = Some("renomination".to_string());
        }

        if let Some(dtls_parameters) = &ctx.dtls_parameters {
            section.set_dtls_role(dtls_parameters.role());
        }

        section
    }

    fn connection_and_port(ctx: &TransportContext) -> (Connection, u16) {
        match &ctx.plain_rtp_parameters {
            Some(plain) => (
                Connection {
                    ip_version: plain.ip_version,
                    ip: plain.ip.clone(),
                },
                plain.port,
            ),
            None => (
                Connection {
                    ip_version: IpVersion::V4,
                    ip: DUMMY_ADDRESS.to_string(),
                },
                DUMMY_PORT,
            ),
        }
    }

    /// Build an answer section for something the local side sends
    pub fn answer(ctx: &TransportContext, options: AnswerMediaSectionOptions<'_>) -> Result<Self> {
        let offer = options.offer_media_object;
        let mid = offer
            .mid
            .clone()
            .ok_or_else(|| Error::missing("offer media object has no mid"))?;

        let (connection, port) = Self::connection_and_port(ctx);
        let mut media = MediaObject::new(offer.kind, port, offer.protocol.clone());
        media.connection = Some(connection);

        match offer.kind {
            MediaType::Audio | MediaType::Video => {
                let answer_rtp_parameters = options
                    .answer_rtp_parameters
                    .ok_or_else(|| Error::missing("answer RTP parameters"))?;
                let mut offer_rtp_parameters = options.offer_rtp_parameters;

                media.direction = Some(Direction::RecvOnly);

                for codec in &answer_rtp_parameters.codecs {
                    let mut parameters = codec.parameters.clone();
                    let mut rtcp_feedback = codec.rtcp_feedback.clone();

                    if let Some(codec_options) = options.codec_options {
                        let offer_codec = offer_rtp_parameters.as_deref_mut().and_then(|params| {
                            params
                                .codecs
                                .iter_mut()
                                .find(|c| c.payload_type == codec.payload_type)
                        });
                        apply_codec_options(
                            codec,
                            codec_options,
                            &mut parameters,
                            &mut rtcp_feedback,
                            offer_codec,
                        );
                    }

                    push_codec(&mut media, codec, &parameters, &rtcp_feedback)?;
                }

                media.payloads = payload_list(&answer_rtp_parameters.codecs);

                media.ext = answer_rtp_parameters
                    .header_extensions
                    .iter()
                    .filter(|ext| offer.ext.iter().any(|offered| offered.uri == ext.uri))
                    .map(|ext| ExtMap {
                        value: ext.id,
                        direction: None,
                        uri: ext.uri.clone(),
                    })
                    .collect();

                media.extmap_allow_mixed = options.extmap_allow_mixed && offer.extmap_allow_mixed;

                if let Some(simulcast) = &offer.simulcast {
                    media.simulcast = Some(Simulcast {
                        dir1: RidDirection::Recv,
                        list1: simulcast.list1.clone(),
                        dir2: None,
                        list2: None,
                    });
                    media.rids = offer
                        .rids
                        .iter()
                        .filter(|rid| rid.direction == RidDirection::Send)
                        .map(|rid| Rid {
                            id: rid.id.clone(),
                            direction: RidDirection::Recv,
                            params: None,
                        })
                        .collect();
                }

                media.rtcp_mux = true;
                media.rtcp_rsize = true;
            }
            MediaType::Application => {
                let sctp = ctx
                    .sctp_parameters
                    .ok_or_else(|| Error::missing("SCTP parameters"))?;

                if offer.sctp_port.is_some() {
                    media.payloads = DATA_CHANNEL_APP.to_string();
                    media.sctp_port = Some(sctp.port);
                    media.max_message_size = Some(sctp.max_message_size);
                } else if offer.sctpmap.is_some() {
                    media.payloads = sctp.port.to_string();
                    media.sctpmap = Some(SctpMap {
                        sctpmap_number: sctp.port,
                        app: DATA_CHANNEL_APP.to_string(),
                        max_message_size: sctp.max_message_size,
                    });
                }
            }
        }

        Ok(Self::with_transport(&mid, MediaSectionRole::Answer, media, ctx))
    }

    /// Build an offer section for something the remote side sends
    pub fn offer(ctx: &TransportContext, options: OfferMediaSectionOptions<'_>) -> Result<Self> {
        let (connection, port) = Self::connection_and_port(ctx);

        let protocol = if ctx.plain_rtp_parameters.is_some() {
            "RTP/AVP"
        } else if options.kind == MediaType::Application {
            "UDP/DTLS/SCTP"
        } else {
            "UDP/TLS/RTP/SAVPF"
        };

        let mut media = MediaObject::new(options.kind, port, protocol);
        media.connection = Some(connection);

        match options.kind {
            MediaType::Audio | MediaType::Video => {
                let params = options
                    .offer_rtp_parameters
                    .ok_or_else(|| Error::missing("offer RTP parameters"))?;

                media.direction = Some(Direction::SendOnly);
                media.msid = Some(format!(
                    "{} {}",
                    options.stream_id.unwrap_or("-"),
                    options.track_id.unwrap_or_default()
                ));

                for codec in &params.codecs {
                    push_codec(&mut media, codec, &codec.parameters, &codec.rtcp_feedback)?;
                }
                media.payloads = payload_list(&params.codecs);

                media.ext = params
                    .header_extensions
                    .iter()
                    .map(|ext| ExtMap {
                        value: ext.id,
                        direction: None,
                        uri: ext.uri.clone(),
                    })
                    .collect();

                media.rtcp_mux = true;
                media.rtcp_rsize = true;

                let encoding = params.encodings.first();
                let ssrc = encoding.and_then(|e| e.ssrc);
                let rtx_ssrc = encoding.and_then(|e| e.rtx).map(|rtx| rtx.ssrc);
                let cname = params.rtcp.cname.as_deref();

                if let (Some(ssrc), Some(cname)) = (ssrc, cname) {
                    media.ssrcs.push(SsrcAttribute {
                        id: ssrc,
                        attribute: "cname".to_string(),
                        value: Some(cname.to_string()),
                    });
                }

                if let (Some(ssrc), Some(rtx_ssrc)) = (ssrc, rtx_ssrc) {
                    if let Some(cname) = cname {
                        media.ssrcs.push(SsrcAttribute {
                            id: rtx_ssrc,
                            attribute: "cname".to_string(),
                            value: Some(cname.to_string()),
                        });
                    }
                    media.ssrc_groups.push(SsrcGroup {
                        semantics: "FID".to_string(),
                        ssrcs: vec![ssrc, rtx_ssrc],
                    });
                }
            }
            MediaType::Application => {
                let sctp = ctx
                    .sctp_parameters
                    .ok_or_else(|| Error::missing("SCTP parameters"))?;

                if options.legacy_sctpmap {
                    media.payloads = sctp.port.to_string();
                    media.sctpmap = Some(SctpMap {
                        sctpmap_number: sctp.port,
                        app: DATA_CHANNEL_APP.to_string(),
                        max_message_size: sctp.max_message_size,
                    });
                } else {
                    media.payloads = DATA_CHANNEL_APP.to_string();
                    media.sctp_port = Some(sctp.port);
                    media.max_message_size = Some(sctp.max_message_size);
                }
            }
        }

        Ok(Self::with_transport(
            options.mid,
            MediaSectionRole::Offer,
            media,
            ctx,
        ))
    }

    /// Section mid
    pub fn mid(&self) -> &str {
        &self.mid
    }

    /// Answer or offer
    pub fn role(&self) -> MediaSectionRole {
        self.role
    }

    /// Lifecycle state
    pub fn state(&self) -> MediaSectionState {
        self.state
    }

    /// Whether the section is closed (port 0)
    pub fn closed(&self) -> bool {
        self.media.is_closed()
    }

    /// SDP object of the section
    pub fn object(&self) -> &MediaObject {
        &self.media
    }

    /// Update ICE credentials
    pub fn set_ice_parameters(&mut self, ice_parameters: &IceParameters) {
        self.media.ice_ufrag = Some(ice_parameters.username_fragment.clone());
        self.media.ice_pwd = Some(ice_parameters.password.clone());
    }

    /// Update `a=setup` from the remote DTLS role
    pub fn set_dtls_role(&mut self, role: DtlsRole) {
        self.media.setup = Some(match self.role {
            MediaSectionRole::Answer => match role {
                DtlsRole::Client => SetupRole::Active,
                DtlsRole::Server => SetupRole::Passive,
                DtlsRole::Auto => SetupRole::Actpass,
            },
            MediaSectionRole::Offer => SetupRole::Actpass,
        });
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.state == MediaSectionState::Closed {
            return Err(Error::invalid_state(format!(
                "cannot {} closed media section [mid:{}]",
                operation, self.mid
            )));
        }
        Ok(())
    }

    /// Set direction `inactive`
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_open("pause")?;
        self.media.direction = Some(Direction::Inactive);
        if self.state == MediaSectionState::Active {
            self.state = MediaSectionState::Paused;
        }
        trace!(mid = %self.mid, "media section paused");
        Ok(())
    }

    /// Restore the sending/receiving direction
    pub fn resume(&mut self) -> Result<()> {
        self.ensure_open("resume")?;
        self.media.direction = Some(match self.role {
            MediaSectionRole::Answer => Direction::RecvOnly,
            MediaSectionRole::Offer => Direction::SendOnly,
        });
        self.state = MediaSectionState::Active;
        trace!(mid = %self.mid, "media section resumed");
        Ok(())
    }

    /// Pause and strip extensions, SSRCs, simulcast and rids
    pub fn disable(&mut self) -> Result<()> {
        self.pause()?;

        self.media.ext.clear();
        self.media.ssrcs.clear();
        self.media.ssrc_groups.clear();
        self.media.simulcast = None;
        self.media.rids.clear();
        self.media.extmap_allow_mixed = false;

        self.state = MediaSectionState::Disabled;
        trace!(mid = %self.mid, "media section disabled");
        Ok(())
    }

    /// Disable and set port 0; closing twice is a no-op
    pub fn close(&mut self) {
        if self.state == MediaSectionState::Closed {
            return;
        }

        if let Err(error) = self.disable() {
            warn!(mid = %self.mid, %error, "failed to disable media section before closing");
        }
        self.media.port = 0;
        self.state = MediaSectionState::Closed;
        trace!(mid = %self.mid, "media section closed");
    }

    /// Mark simulcast streams whose encoding is inactive (or gone) as paused
    pub fn mux_simulcast_streams(&mut self, encodings: &[RtpEncodingParameters]) -> Result<()> {
        self.ensure_open("mux simulcast streams of")?;

        let Some(simulcast) = self.media.simulcast.as_mut() else {
            return Ok(());
        };

        let mut streams = parse_simulcast_stream_list(&simulcast.list1);
        for format in streams.iter_mut().flatten() {
            let active = encodings
                .iter()
                .find(|encoding| encoding.rid.as_deref() == Some(format.scid.as_str()))
                .map(|encoding| encoding.is_active())
                .unwrap_or(false);
            format.paused = !active;
        }
        simulcast.list1 = write_simulcast_stream_list(&streams);

        Ok(())
    }
}
