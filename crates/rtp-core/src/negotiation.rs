//! Capability matching
//!
//! Pairs the local device capabilities with the remote endpoint capabilities
//! into [`ExtendedRtpCapabilities`], the single source every parameter set is
//! derived from, and provides the codec predicates used when producing and
//! consuming.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::h264;
use crate::types::{
    CodecDescriptor, Direction, ExtendedCodec, ExtendedHeaderExtension, ExtendedRtpCapabilities,
    MediaKind, Parameters, RtcpFeedback, RtpCapabilities, RtpCodecCapability, RtpCodecParameters,
    RtpParameters,
};
use crate::validation::validate_rtp_parameters;

/// How [`match_codecs`] compares two codecs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Apply the H264 and VP9 profile rules
    pub strict: bool,
    /// Write the negotiated H264 `profile-level-id` into both codecs
    pub modify: bool,
}

impl MatchOptions {
    /// Strict comparison without side effects
    pub fn strict() -> Self {
        Self {
            strict: true,
            modify: false,
        }
    }

    /// Strict comparison that rewrites `profile-level-id`
    pub fn negotiate() -> Self {
        Self {
            strict: true,
            modify: true,
        }
    }
}

/// What a successful comparison does to `profile-level-id`
enum ProfileLevelIdUpdate {
    Untouched,
    Set(String),
    Remove,
}

fn compare_codecs<A, B>(a: &A, b: &B, strict: bool) -> Option<ProfileLevelIdUpdate>
where
    A: CodecDescriptor + ?Sized,
    B: CodecDescriptor + ?Sized,
{
    let a_mime_type = a.mime_type().to_lowercase();
    let b_mime_type = b.mime_type().to_lowercase();

    if a_mime_type != b_mime_type
        || a.clock_rate() != b.clock_rate()
        || a.channels() != b.channels()
    {
        return None;
    }

    if !strict {
        return Some(ProfileLevelIdUpdate::Untouched);
    }

    match a_mime_type.as_str() {
        "video/h264" => {
            if packetization_mode(a.parameters()) != packetization_mode(b.parameters()) {
                return None;
            }

            if !h264::is_same_profile(a.parameters(), b.parameters()) {
                return None;
            }

            match h264::generate_profile_level_id_for_answer(a.parameters(), b.parameters()) {
                Ok(Some(profile_level_id)) => Some(ProfileLevelIdUpdate::Set(profile_level_id)),
                Ok(None) => Some(ProfileLevelIdUpdate::Remove),
                Err(e) => {
                    trace!("H264 profile-level-id negotiation failed: {}", e);
                    None
                }
            }
        }
        "video/vp9" => {
            if vp9_profile_id(a.parameters()) != vp9_profile_id(b.parameters()) {
                return None;
            }
            Some(ProfileLevelIdUpdate::Untouched)
        }
        _ => Some(ProfileLevelIdUpdate::Untouched),
    }
}

fn packetization_mode(params: &Parameters) -> i64 {
    params
        .get("packetization-mode")
        .and_then(|value| value.as_i64())
        .unwrap_or(0)
}

fn vp9_profile_id(params: &Parameters) -> i64 {
    params
        .get("profile-id")
        .and_then(|value| value.as_i64())
        .unwrap_or(0)
}

/// Compare two codecs, optionally rewriting their `profile-level-id`
///
/// With `modify` set and a successful H264 strict match, both parameter maps
/// receive the negotiated `profile-level-id`, or lose it when none is
/// resolvable.
pub fn match_codecs<A, B>(a: &mut A, b: &mut B, options: MatchOptions) -> bool
where
    A: CodecDescriptor + ?Sized,
    B: CodecDescriptor + ?Sized,
{
    let Some(update) = compare_codecs(&*a, &*b, options.strict) else {
        return false;
    };

    if options.modify {
        match update {
            ProfileLevelIdUpdate::Untouched => {}
            ProfileLevelIdUpdate::Set(value) => {
                a.parameters_mut()
                    .insert("profile-level-id".to_string(), value.clone().into());
                b.parameters_mut()
                    .insert("profile-level-id".to_string(), value.into());
            }
            ProfileLevelIdUpdate::Remove => {
                a.parameters_mut().shift_remove("profile-level-id");
                b.parameters_mut().shift_remove("profile-level-id");
            }
        }
    }

    true
}

/// Side-effect free variant of [`match_codecs`]
pub fn codecs_match<A, B>(a: &A, b: &B, strict: bool) -> bool
where
    A: CodecDescriptor + ?Sized,
    B: CodecDescriptor + ?Sized,
{
    compare_codecs(a, b, strict).is_some()
}

/// Feedback present in both lists (same type, same parameter)
pub fn reduce_rtcp_feedback(a: &[RtcpFeedback], b: &[RtcpFeedback]) -> Vec<RtcpFeedback> {
    a.iter()
        .filter_map(|a_fb| {
            b.iter()
                .find(|b_fb| b_fb.fb_type == a_fb.fb_type && b_fb.parameter() == a_fb.parameter())
                .cloned()
        })
        .collect()
}

fn apt_of(codec: &RtpCodecCapability) -> Option<i64> {
    codec.parameters.get("apt").and_then(|apt| apt.as_i64())
}

/// Pair local and remote capabilities
///
/// Codecs keep the remote order. Each remote non-RTX codec is paired with the
/// first local codec that matches it in strict mode; the match rewrites the
/// H264 `profile-level-id` of both. RTX codecs are then linked through their
/// `apt` parameter on each side, and header extensions are paired by URI.
pub fn get_extended_rtp_capabilities(
    local: &RtpCapabilities,
    remote: &RtpCapabilities,
) -> ExtendedRtpCapabilities {
    let mut local_codecs = local.codecs.clone();
    let mut extended = ExtendedRtpCapabilities::default();

    for remote_codec in remote.codecs.iter().filter(|c| !c.is_rtx()) {
        let mut remote_codec = remote_codec.clone();

        let Some(index) = local_codecs.iter_mut().position(|local_codec| {
            match_codecs(local_codec, &mut remote_codec, MatchOptions::negotiate())
        }) else {
            continue;
        };
        let local_codec = &local_codecs[index];

        let Some(kind) = local_codec
            .kind
            .or_else(|| MediaKind::from_mime_type(&local_codec.mime_type))
        else {
            continue;
        };

        extended.codecs.push(ExtendedCodec {
            kind,
            mime_type: local_codec.mime_type.clone(),
            clock_rate: local_codec.clock_rate,
            channels: local_codec.channels,
            local_payload_type: local_codec.preferred_payload_type,
            local_rtx_payload_type: None,
            remote_payload_type: remote_codec.preferred_payload_type,
            remote_rtx_payload_type: None,
            local_parameters: local_codec.parameters.clone(),
            remote_parameters: remote_codec.parameters.clone(),
            rtcp_feedback: reduce_rtcp_feedback(&local_codec.rtcp_feedback, &remote_codec.rtcp_feedback),
        });
    }

    for codec in extended.codecs.iter_mut() {
        let local_rtx = local.codecs.iter().find(|c| {
            c.is_rtx() && apt_of(c) == Some(i64::from(codec.local_payload_type))
        });
        let remote_rtx = remote.codecs.iter().find(|c| {
            c.is_rtx() && apt_of(c) == Some(i64::from(codec.remote_payload_type))
        });

        if let (Some(local_rtx), Some(remote_rtx)) = (local_rtx, remote_rtx) {
            codec.local_rtx_payload_type = Some(local_rtx.preferred_payload_type);
            codec.remote_rtx_payload_type = Some(remote_rtx.preferred_payload_type);
        }
    }

    for remote_ext in &remote.header_extensions {
        let Some(local_ext) = local.header_extensions.iter().find(|local_ext| {
            let same_kind = match (local_ext.kind, remote_ext.kind) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            };
            same_kind && local_ext.uri == remote_ext.uri
        }) else {
            continue;
        };

        let direction = remote_ext.direction.unwrap_or(Direction::SendRecv).reversed();

        extended.header_extensions.push(ExtendedHeaderExtension {
            kind: remote_ext.kind,
            uri: remote_ext.uri.clone(),
            send_id: local_ext.preferred_id,
            recv_id: remote_ext.preferred_id,
            encrypt: local_ext.preferred_encrypt.unwrap_or(false),
            direction,
        });
    }

    debug!(
        codecs = extended.codecs.len(),
        header_extensions = extended.header_extensions.len(),
        "computed extended RTP capabilities"
    );

    extended
}

/// Whether media of `kind` can be sent
pub fn can_send(kind: MediaKind, extended: &ExtendedRtpCapabilities) -> bool {
    extended.codecs.iter().any(|codec| codec.kind == kind)
}

/// Whether a stream with these parameters can be received
///
/// The parameters are validated first; the first codec's payload type must be
/// one of the remote payload types.
pub fn can_receive(params: &RtpParameters, extended: &ExtendedRtpCapabilities) -> Result<bool> {
    let mut params = params.clone();
    validate_rtp_parameters(&mut params)?;

    let Some(first_codec) = params.codecs.first() else {
        return Ok(false);
    };

    Ok(extended
        .codecs
        .iter()
        .any(|codec| codec.remote_payload_type == first_codec.payload_type))
}

/// Reduce a codec list to `[codec]` or `[codec, rtx]`
///
/// Without `cap_codec` the first codec is kept (plus the RTX codec right after
/// it). Otherwise the first codec matching `cap_codec` in strict mode is kept.
pub fn reduce_codecs(
    codecs: &[RtpCodecParameters],
    cap_codec: Option<&RtpCodecCapability>,
) -> Result<Vec<RtpCodecParameters>> {
    let index = match cap_codec {
        None if !codecs.is_empty() => Some(0),
        None => None,
        Some(cap_codec) => codecs
            .iter()
            .position(|codec| codecs_match(codec, cap_codec, true)),
    };

    let Some(index) = index else {
        return Err(Error::negotiation("no matching codec found"));
    };

    let mut filtered = vec![codecs[index].clone()];
    if let Some(next) = codecs.get(index + 1) {
        if next.is_rtx() {
            filtered.push(next.clone());
        }
    }

    Ok(filtered)
}
