//! Headless media engine
//!
//! [`FakeHandler`] behaves like a browser handler without a real peer
//! connection: it keeps a local description of its own, drives a real
//! [`RemoteSdp`] through every send/receive/pause/close, connects the
//! transport on first use and records each call. Tests use the call log to
//! check what reached the engine, headless applications use it as a stand-in
//! engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ortc_rtp_core::{
    get_sending_remote_rtp_parameters, get_sending_rtp_parameters, reduce_codecs, Direction,
    MediaKind, NumSctpStreams, RtpCapabilities, RtpEncodingParameters, RtpParameters,
    SctpCapabilities, SctpStreamParameters,
};
use ortc_sdp_core::session::{
    ExtMap, Fingerprint, Fmtp, Origin, Rid, RidDirection, RtcpFb, RtpMap, SetupRole, Simulcast,
    SsrcAttribute, SsrcGroup,
};
use ortc_sdp_core::{
    codec_name, extract_dtls_parameters, extract_rtp_capabilities, fmtp_config, get_cname,
    get_rtp_encodings, AnswerMediaSectionOptions, DtlsRole, IceParameters, IpVersion, MediaObject,
    MediaType, OfferMediaSectionOptions, RemoteSdp, SessionDescription, TransportContext,
    DATA_CHANNEL_MID,
};
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, trace};

use super::{
    Handler, HandlerFactory, HandlerListener, HandlerName, HandlerReceiveDataChannelOptions,
    HandlerReceiveOptions, HandlerReceiveResult, HandlerRunOptions, HandlerSendDataChannelOptions,
    HandlerSendDataChannelResult, HandlerSendOptions, HandlerSendResult,
};
use crate::error::{Error, Result};
use crate::types::{
    ConnectionState, DataChannel, DataChannelPeer, IceServer, MediaTrack, TransportDirection,
};

const SCTP_NUM_STREAMS: NumSctpStreams = NumSctpStreams { os: 1024, mis: 1024 };
const SCTP_PORT: u16 = 5000;
const SCTP_MAX_MESSAGE_SIZE: u32 = 262_144;
const FINGERPRINT_ALGORITHM: &str = "sha-256";
const FINGERPRINT: &str = "82:5A:68:3D:36:C3:0A:DE:AF:E7:32:43:D2:88:83:57:\
                           AC:2D:65:E5:80:C4:B6:FB:AF:1A:A0:21:9F:6D:0C:AD";

/// One operation that reached the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerCall {
    Run { direction: TransportDirection },
    UpdateIceServers,
    RestartIce,
    Send { track_id: String },
    StopSending { local_id: String },
    PauseSending { local_id: String },
    ResumeSending { local_id: String },
    SetMaxSpatialLayer { local_id: String, spatial_layer: u8 },
    Receive { track_ids: Vec<String> },
    StopReceiving { local_ids: Vec<String> },
    PauseReceiving { local_ids: Vec<String> },
    ResumeReceiving { local_ids: Vec<String> },
    SendDataChannel { label: String },
    ReceiveDataChannel { stream_id: u16 },
    Close,
}

impl HandlerCall {
    /// Method name, as used by [`FakeHandler::fail_next`]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::UpdateIceServers => "update_ice_servers",
            Self::RestartIce => "restart_ice",
            Self::Send { .. } => "send",
            Self::StopSending { .. } => "stop_sending",
            Self::PauseSending { .. } => "pause_sending",
            Self::ResumeSending { .. } => "resume_sending",
            Self::SetMaxSpatialLayer { .. } => "set_max_spatial_layer",
            Self::Receive { .. } => "receive",
            Self::StopReceiving { .. } => "stop_receiving",
            Self::PauseReceiving { .. } => "pause_receiving",
            Self::ResumeReceiving { .. } => "resume_receiving",
            Self::SendDataChannel { .. } => "send_data_channel",
            Self::ReceiveDataChannel { .. } => "receive_data_channel",
            Self::Close => "close",
        }
    }
}

struct Transceiver {
    encodings: Vec<RtpEncodingParameters>,
}

struct EngineState {
    direction: TransportDirection,
    listener: Arc<dyn HandlerListener>,
    remote_sdp: RemoteSdp,
    local_sdp: SessionDescription,
    sending_rtp_parameters_by_kind: HashMap<MediaKind, RtpParameters>,
    sending_remote_rtp_parameters_by_kind: HashMap<MediaKind, RtpParameters>,
    forced_local_dtls_role: Option<DtlsRole>,
    transport_ready: bool,
    transceivers: HashMap<String, Transceiver>,
    next_mid: u32,
    next_send_sctp_stream_id: u16,
    has_data_channel_media_section: bool,
    ice_servers: Vec<IceServer>,
    ice_ufrag: String,
    ice_pwd: String,
    cname: String,
    stream_id: String,
}

impl EngineState {
    fn next_mid(&mut self) -> String {
        let mid = self.next_mid;
        self.next_mid += 1;
        mid.to_string()
    }

    fn local_media(&self, kind: MediaType, mid: &str) -> MediaObject {
        let protocol = match kind {
            MediaType::Application => "UDP/DTLS/SCTP",
            _ => "UDP/TLS/RTP/SAVPF",
        };
        let mut media = MediaObject::new(kind, 9, protocol).with_mid(mid);
        media.ice_ufrag = Some(self.ice_ufrag.clone());
        media.ice_pwd = Some(self.ice_pwd.clone());
        media.fingerprint = Some(Fingerprint {
            hash_type: FINGERPRINT_ALGORITHM.to_string(),
            hash: FINGERPRINT.to_string(),
        });
        media.setup = Some(SetupRole::Actpass);
        if kind == MediaType::Application {
            media.payloads = "webrtc-datachannel".to_string();
            media.sctp_port = Some(SCTP_PORT);
            media.max_message_size = Some(SCTP_MAX_MESSAGE_SIZE);
        } else {
            media.rtcp_mux = true;
            media.rtcp_rsize = true;
        }
        media
    }

    /// Insert or replace the local section carrying the same mid
    fn upsert_local(&mut self, media: MediaObject) {
        let existing = self
            .local_sdp
            .media
            .iter_mut()
            .find(|m| m.mid.is_some() && m.mid == media.mid);
        match existing {
            Some(slot) => *slot = media,
            None => self.local_sdp.media.push(media),
        }
    }

    /// Put a local section in place of the closed one the remote side recycled
    fn replace_local(&mut self, reuse_mid: Option<&str>, media: MediaObject) {
        let slot = reuse_mid.and_then(|reuse_mid| {
            self.local_sdp
                .media
                .iter_mut()
                .find(|m| m.mid.as_deref() == Some(reuse_mid))
        });
        match slot {
            Some(slot) => *slot = media,
            None => self.upsert_local(media),
        }
    }

    fn local_media_mut(&mut self, mid: &str) -> Option<&mut MediaObject> {
        self.local_sdp
            .media
            .iter_mut()
            .find(|m| m.mid.as_deref() == Some(mid))
    }

    fn set_local_direction(&mut self, mid: &str, direction: Direction) {
        if let Some(media) = self.local_media_mut(mid) {
            media.direction = Some(direction);
        }
    }

    fn close_local(&mut self, mid: &str, closed: bool) {
        if let Some(media) = self.local_media_mut(mid) {
            if closed {
                media.port = 0;
            }
            media.direction = Some(Direction::Inactive);
        }
    }

    fn ensure_direction(&self, direction: TransportDirection) -> Result<()> {
        if self.direction != direction {
            return Err(Error::invalid_state(format!(
                "not a {direction} handler"
            )));
        }
        Ok(())
    }

    /// Connect the transport with the local DTLS parameters
    async fn setup_transport(&mut self) -> Result<()> {
        let local_role = self.forced_local_dtls_role.unwrap_or(DtlsRole::Client);
        let mut dtls_parameters = extract_dtls_parameters(&self.local_sdp)?;
        dtls_parameters.role = Some(local_role);

        let remote_role = match local_role {
            DtlsRole::Client => DtlsRole::Server,
            _ => DtlsRole::Client,
        };
        self.remote_sdp.update_dtls_role(remote_role)?;

        let listener = Arc::clone(&self.listener);
        listener.on_connect(dtls_parameters).await?;
        self.transport_ready = true;

        listener
            .on_connection_state_change(ConnectionState::Connecting)
            .await;
        listener
            .on_connection_state_change(ConnectionState::Connected)
            .await;
        Ok(())
    }
}

fn add_rtp(media: &mut MediaObject, params: &RtpParameters) -> Result<()> {
    for codec in &params.codecs {
        media.rtp.push(RtpMap {
            payload: codec.payload_type,
            codec: codec_name(&codec.mime_type)?.to_string(),
            rate: codec.clock_rate,
            encoding: codec.channels.filter(|channels| *channels > 1),
        });
        if !codec.parameters.is_empty() {
            media.fmtp.push(Fmtp {
                payload: codec.payload_type,
                config: fmtp_config(&codec.parameters),
            });
        }
        for fb in &codec.rtcp_feedback {
            media.rtcp_fb.push(RtcpFb {
                payload: codec.payload_type,
                fb_type: fb.fb_type.clone(),
                subtype: fb.parameter.clone().filter(|p| !p.is_empty()),
            });
        }
    }
    media.payloads = params
        .codecs
        .iter()
        .map(|codec| codec.payload_type.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    media.ext = params
        .header_extensions
        .iter()
        .map(|ext| ExtMap {
            value: ext.id,
            direction: None,
            uri: ext.uri.clone(),
        })
        .collect();
    Ok(())
}

/// Local description of a fresh engine offering audio and video
fn native_offer() -> SessionDescription {
    let mut sdp = SessionDescription::new(local_origin());

    let codec = |media: &mut MediaObject, pt: u8, name: &str, rate: u32, channels: Option<u8>| {
        media.rtp.push(RtpMap {
            payload: pt,
            codec: name.to_string(),
            rate,
            encoding: channels,
        });
    };
    let fmtp = |media: &mut MediaObject, pt: u8, config: &str| {
        media.fmtp.push(Fmtp {
            payload: pt,
            config: config.to_string(),
        });
    };
    let fb = |media: &mut MediaObject, pt: u8, fb_type: &str, subtype: Option<&str>| {
        media.rtcp_fb.push(RtcpFb {
            payload: pt,
            fb_type: fb_type.to_string(),
            subtype: subtype.map(str::to_string),
        });
    };
    let ext = |media: &mut MediaObject, id: u8, uri: &str| {
        media.ext.push(ExtMap {
            value: id,
            direction: None,
            uri: uri.to_string(),
        });
    };

    let mut audio = MediaObject::new(MediaType::Audio, 9, "UDP/TLS/RTP/SAVPF").with_mid("0");
    codec(&mut audio, 111, "opus", 48000, Some(2));
    fmtp(&mut audio, 111, "minptime=10;useinbandfec=1");
    fb(&mut audio, 111, "transport-cc", None);
    ext(&mut audio, 1, "urn:ietf:params:rtp-hdrext:ssrc-audio-level");
    ext(&mut audio, 2, "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time");
    ext(
        &mut audio,
        3,
        "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
    );
    ext(&mut audio, 4, "urn:ietf:params:rtp-hdrext:sdes:mid");
    sdp.media.push(audio);

    let mut video = MediaObject::new(MediaType::Video, 9, "UDP/TLS/RTP/SAVPF").with_mid("1");
    for (pt, rtx_pt, name, config) in [
        (96, 97, "VP8", None),
        (
            102,
            103,
            "H264",
            Some("level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f"),
        ),
    ] {
        codec(&mut video, pt, name, 90000, None);
        if let Some(config) = config {
            fmtp(&mut video, pt, config);
        }
        fb(&mut video, pt, "goog-remb", None);
        fb(&mut video, pt, "transport-cc", None);
        fb(&mut video, pt, "ccm", Some("fir"));
        fb(&mut video, pt, "nack", None);
        fb(&mut video, pt, "nack", Some("pli"));
        codec(&mut video, rtx_pt, "rtx", 90000, None);
        fmtp(&mut video, rtx_pt, &format!("apt={pt}"));
    }
    ext(&mut video, 2, "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time");
    ext(
        &mut video,
        3,
        "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01",
    );
    ext(&mut video, 4, "urn:ietf:params:rtp-hdrext:sdes:mid");
    ext(&mut video, 13, "urn:3gpp:video-orientation");
    sdp.media.push(video);

    sdp
}

fn local_origin() -> Origin {
    Origin {
        username: "-".to_string(),
        session_id: rand::thread_rng().gen_range(1_000_000..u32::MAX as u64),
        session_version: 2,
        net_type: "IN".to_string(),
        ip_version: IpVersion::V4,
        address: "127.0.0.1".to_string(),
    }
}

fn random_token(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Media engine stand-in recording every call
pub struct FakeHandler {
    native_rtp_capabilities: Option<RtpCapabilities>,
    state: AsyncMutex<Option<EngineState>>,
    calls: Mutex<Vec<HandlerCall>>,
    failures: Mutex<Vec<&'static str>>,
    peers: Mutex<HashMap<u16, DataChannelPeer>>,
    last_remote_sdp: Mutex<Option<String>>,
    renegotiations: AtomicU32,
    closed: AtomicBool,
}

impl std::fmt::Debug for FakeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeHandler")
            .field("calls", &self.calls.lock().len())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for FakeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHandler {
    /// Engine announcing opus, VP8 and H264
    pub fn new() -> Self {
        Self {
            native_rtp_capabilities: None,
            state: AsyncMutex::new(None),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            peers: Mutex::new(HashMap::new()),
            last_remote_sdp: Mutex::new(None),
            renegotiations: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Engine announcing the given capabilities instead
    pub fn with_native_rtp_capabilities(mut self, caps: RtpCapabilities) -> Self {
        self.native_rtp_capabilities = Some(caps);
        self
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().clone()
    }

    /// Calls of one method
    pub fn calls_of(&self, method: &str) -> Vec<HandlerCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method() == method)
            .cloned()
            .collect()
    }

    /// Make the next call of `method` fail with a handler error
    pub fn fail_next(&self, method: &'static str) {
        self.failures.lock().push(method);
    }

    /// Remote SDP applied by the last renegotiation
    pub fn remote_sdp(&self) -> Option<String> {
        self.last_remote_sdp.lock().clone()
    }

    /// Number of remote descriptions applied so far
    pub fn renegotiations(&self) -> u32 {
        self.renegotiations.load(Ordering::SeqCst)
    }

    /// Engine side of the data channel on `stream_id`
    pub fn take_data_channel_peer(&self, stream_id: u16) -> Option<DataChannelPeer> {
        self.peers.lock().remove(&stream_id)
    }

    /// Whether [`Handler::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: HandlerCall) -> Result<()> {
        let method = call.method();
        trace!(method, "fake handler call");
        self.calls.lock().push(call);

        let mut failures = self.failures.lock();
        if let Some(pos) = failures.iter().position(|m| *m == method) {
            failures.remove(pos);
            return Err(Error::handler(format!("{method}() failed")));
        }
        Ok(())
    }

    async fn engine(&self) -> Result<MappedMutexGuard<'_, EngineState>> {
        if self.is_closed() {
            return Err(Error::invalid_state("handler closed"));
        }
        MutexGuard::try_map(self.state.lock().await, |state| state.as_mut())
            .map_err(|_| Error::invalid_state("handler not running"))
    }

    fn apply_remote(&self, state: &mut EngineState) {
        let sdp = state.remote_sdp.get_sdp();
        *self.last_remote_sdp.lock() = Some(sdp);
        self.renegotiations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Handler for FakeHandler {
    fn name(&self) -> HandlerName {
        HandlerName::Fake
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("close()");
        self.calls.lock().push(HandlerCall::Close);
    }

    async fn get_native_rtp_capabilities(&self) -> Result<RtpCapabilities> {
        Ok(self
            .native_rtp_capabilities
            .clone()
            .unwrap_or_else(|| extract_rtp_capabilities(&native_offer())))
    }

    async fn get_native_sctp_capabilities(&self) -> Result<SctpCapabilities> {
        Ok(SctpCapabilities {
            num_streams: SCTP_NUM_STREAMS,
        })
    }

    async fn run(&self, options: HandlerRunOptions) -> Result<()> {
        self.record(HandlerCall::Run {
            direction: options.direction,
        })?;

        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(Error::invalid_state("handler already running"));
        }

        let forced_local_dtls_role = match options.dtls_parameters.role {
            Some(DtlsRole::Server) => Some(DtlsRole::Client),
            Some(DtlsRole::Client) => Some(DtlsRole::Server),
            _ => None,
        };

        let remote_sdp = RemoteSdp::new(TransportContext {
            ice_parameters: Some(options.ice_parameters),
            ice_candidates: Some(options.ice_candidates),
            dtls_parameters: Some(options.dtls_parameters),
            sctp_parameters: options.sctp_parameters,
            plain_rtp_parameters: None,
        });

        let extended = &options.extended_rtp_capabilities;
        let kinds = [MediaKind::Audio, MediaKind::Video];

        *state = Some(EngineState {
            direction: options.direction,
            listener: options.listener,
            remote_sdp,
            local_sdp: SessionDescription::new(local_origin()),
            sending_rtp_parameters_by_kind: kinds
                .iter()
                .map(|kind| (*kind, get_sending_rtp_parameters(*kind, extended)))
                .collect(),
            sending_remote_rtp_parameters_by_kind: kinds
                .iter()
                .map(|kind| (*kind, get_sending_remote_rtp_parameters(*kind, extended)))
                .collect(),
            forced_local_dtls_role,
            transport_ready: false,
            transceivers: HashMap::new(),
            next_mid: 0,
            next_send_sctp_stream_id: 0,
            has_data_channel_media_section: false,
            ice_servers: options.ice_servers,
            ice_ufrag: random_token(4),
            ice_pwd: random_token(24),
            cname: random_token(16),
            stream_id: random_token(36),
        });

        debug!(direction = %options.direction, "run()");
        Ok(())
    }

    async fn update_ice_servers(&self, ice_servers: Vec<IceServer>) -> Result<()> {
        self.record(HandlerCall::UpdateIceServers)?;
        let mut state = self.engine().await?;
        state.ice_servers = ice_servers;
        Ok(())
    }

    async fn restart_ice(&self, ice_parameters: IceParameters) -> Result<()> {
        self.record(HandlerCall::RestartIce)?;
        let mut state = self.engine().await?;
        state.remote_sdp.update_ice_parameters(ice_parameters);
        if state.transport_ready {
            self.apply_remote(&mut state);
        }
        Ok(())
    }

    async fn send(&self, options: HandlerSendOptions) -> Result<HandlerSendResult> {
        self.record(HandlerCall::Send {
            track_id: options.track.id.clone(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Send)?;

        let kind = options.track.kind;
        debug!(%kind, track_id = %options.track.id, "send()");

        let mut sending = state
            .sending_rtp_parameters_by_kind
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::unsupported(format!("cannot send {kind}")))?;
        sending.codecs = reduce_codecs(&sending.codecs, options.codec.as_ref())?;

        let mut sending_remote = state
            .sending_remote_rtp_parameters_by_kind
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::unsupported(format!("cannot send {kind}")))?;
        sending_remote.codecs = reduce_codecs(&sending_remote.codecs, options.codec.as_ref())?;

        let section_idx = state.remote_sdp.get_next_media_section_idx();
        let local_id = match &section_idx.reuse_mid {
            Some(mid) => mid.clone(),
            None => state.next_mid(),
        };

        let mut offer = state.local_media(kind.into(), &local_id);
        offer.direction = Some(Direction::SendOnly);
        offer.extmap_allow_mixed = true;
        offer.msid = Some(format!("{} {}", state.stream_id, options.track.id));
        add_rtp(&mut offer, &sending)?;

        if options.encodings.len() > 1 {
            let rids: Vec<String> = (0..options.encodings.len())
                .map(|i| format!("r{i}"))
                .collect();
            offer.rids = rids
                .iter()
                .map(|rid| Rid {
                    id: rid.clone(),
                    direction: RidDirection::Send,
                    params: None,
                })
                .collect();
            offer.simulcast = Some(Simulcast {
                dir1: RidDirection::Send,
                list1: rids.join(";"),
                dir2: None,
                list2: None,
            });
        } else {
            let mut rng = rand::thread_rng();
            let ssrc: u32 = rng.gen();
            offer.ssrcs.push(SsrcAttribute {
                id: ssrc,
                attribute: "cname".to_string(),
                value: Some(state.cname.clone()),
            });
            if sending.codecs.iter().any(|codec| codec.is_rtx()) {
                let rtx_ssrc = ssrc.wrapping_add(1);
                offer.ssrcs.push(SsrcAttribute {
                    id: rtx_ssrc,
                    attribute: "cname".to_string(),
                    value: Some(state.cname.clone()),
                });
                offer.ssrc_groups.push(SsrcGroup {
                    semantics: "FID".to_string(),
                    ssrcs: vec![ssrc, rtx_ssrc],
                });
            }
        }

        state.upsert_local(offer.clone());

        if !state.transport_ready {
            state.setup_transport().await?;
        }

        sending.mid = Some(local_id.clone());
        sending.rtcp.cname = get_cname(&offer).or_else(|| Some(state.cname.clone()));
        sending.encodings = match options.encodings.as_slice() {
            [] => get_rtp_encodings(&offer)?,
            [requested] => {
                let mut encodings = get_rtp_encodings(&offer)?;
                if let Some(first) = encodings.first_mut() {
                    *first = RtpEncodingParameters {
                        ssrc: first.ssrc,
                        rtx: first.rtx.take(),
                        ..requested.clone()
                    };
                }
                encodings
            }
            requested => requested
                .iter()
                .enumerate()
                .map(|(i, encoding)| RtpEncodingParameters {
                    rid: Some(format!("r{i}")),
                    ..encoding.clone()
                })
                .collect(),
        };

        state.remote_sdp.send(
            AnswerMediaSectionOptions {
                offer_media_object: &offer,
                offer_rtp_parameters: Some(&mut sending),
                answer_rtp_parameters: Some(&sending_remote),
                codec_options: options.codec_options.as_ref(),
                extmap_allow_mixed: true,
            },
            section_idx.reuse_mid.as_deref(),
        )?;
        self.apply_remote(state);

        state.transceivers.insert(
            local_id.clone(),
            Transceiver {
                encodings: sending.encodings.clone(),
            },
        );

        Ok(HandlerSendResult {
            local_id,
            rtp_parameters: sending,
        })
    }

    async fn stop_sending(&self, local_id: &str) -> Result<()> {
        self.record(HandlerCall::StopSending {
            local_id: local_id.to_string(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Send)?;

        if state.transceivers.remove(local_id).is_none() {
            return Err(Error::invalid_state("associated transceiver not found"));
        }

        let closed = state.remote_sdp.close_media_section(local_id)?;
        state.close_local(local_id, closed);
        self.apply_remote(state);
        debug!(local_id, closed, "stop_sending()");
        Ok(())
    }

    async fn pause_sending(&self, local_id: &str) -> Result<()> {
        self.record(HandlerCall::PauseSending {
            local_id: local_id.to_string(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Send)?;

        if !state.transceivers.contains_key(local_id) {
            return Err(Error::invalid_state("associated transceiver not found"));
        }
        state.remote_sdp.pause_media_section(local_id)?;
        state.set_local_direction(local_id, Direction::Inactive);
        self.apply_remote(state);
        Ok(())
    }

    async fn resume_sending(&self, local_id: &str) -> Result<()> {
        self.record(HandlerCall::ResumeSending {
            local_id: local_id.to_string(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Send)?;

        if !state.transceivers.contains_key(local_id) {
            return Err(Error::invalid_state("associated transceiver not found"));
        }
        state.remote_sdp.resume_sending_media_section(local_id)?;
        state.set_local_direction(local_id, Direction::SendOnly);
        self.apply_remote(state);
        Ok(())
    }

    async fn set_max_spatial_layer(&self, local_id: &str, spatial_layer: u8) -> Result<()> {
        self.record(HandlerCall::SetMaxSpatialLayer {
            local_id: local_id.to_string(),
            spatial_layer,
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Send)?;

        let transceiver = state
            .transceivers
            .get_mut(local_id)
            .ok_or_else(|| Error::invalid_state("associated transceiver not found"))?;
        for (idx, encoding) in transceiver.encodings.iter_mut().enumerate() {
            encoding.active = Some(idx <= usize::from(spatial_layer));
        }
        let encodings = transceiver.encodings.clone();

        state
            .remote_sdp
            .mux_media_section_simulcast(local_id, &encodings)?;
        self.apply_remote(state);
        Ok(())
    }

    async fn receive(
        &self,
        options: Vec<HandlerReceiveOptions>,
    ) -> Result<Vec<HandlerReceiveResult>> {
        self.record(HandlerCall::Receive {
            track_ids: options.iter().map(|o| o.track_id.clone()).collect(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Recv)?;

        let mut local_ids = Vec::with_capacity(options.len());
        for option in &options {
            let local_id = match &option.rtp_parameters.mid {
                Some(mid) => mid.clone(),
                None => state.next_mid(),
            };
            let reuse_mid = match state.remote_sdp.media_section(&local_id) {
                Some(_) => None,
                None => state.remote_sdp.get_next_media_section_idx().reuse_mid,
            };
            let stream_id = option
                .stream_id
                .as_deref()
                .or(option.rtp_parameters.rtcp.cname.as_deref());

            state.remote_sdp.receive(OfferMediaSectionOptions {
                mid: &local_id,
                kind: option.kind.into(),
                offer_rtp_parameters: Some(&option.rtp_parameters),
                stream_id,
                track_id: Some(&option.track_id),
                legacy_sctpmap: false,
            })?;

            let mut answer = state.local_media(option.kind.into(), &local_id);
            answer.direction = Some(Direction::RecvOnly);
            add_rtp(&mut answer, &option.rtp_parameters)?;
            state.replace_local(reuse_mid.as_deref(), answer);

            local_ids.push(local_id);
        }
        self.apply_remote(state);

        if !state.transport_ready {
            state.setup_transport().await?;
        }

        let results = options
            .into_iter()
            .zip(local_ids)
            .map(|(option, local_id)| {
                state.transceivers.insert(
                    local_id.clone(),
                    Transceiver {
                        encodings: option.rtp_parameters.encodings,
                    },
                );
                HandlerReceiveResult {
                    local_id,
                    track: MediaTrack::with_id(option.track_id, option.kind),
                }
            })
            .collect::<Vec<_>>();

        debug!(count = results.len(), "receive()");
        Ok(results)
    }

    async fn stop_receiving(&self, local_ids: &[String]) -> Result<()> {
        self.record(HandlerCall::StopReceiving {
            local_ids: local_ids.to_vec(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Recv)?;

        for local_id in local_ids {
            if state.transceivers.remove(local_id).is_none() {
                return Err(Error::invalid_state("associated transceiver not found"));
            }
            let closed = state.remote_sdp.close_media_section(local_id)?;
            state.close_local(local_id, closed);
        }
        self.apply_remote(state);
        Ok(())
    }

    async fn pause_receiving(&self, local_ids: &[String]) -> Result<()> {
        self.record(HandlerCall::PauseReceiving {
            local_ids: local_ids.to_vec(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Recv)?;

        for local_id in local_ids {
            if !state.transceivers.contains_key(local_id) {
                return Err(Error::invalid_state("associated transceiver not found"));
            }
            state.remote_sdp.pause_media_section(local_id)?;
            state.set_local_direction(local_id, Direction::Inactive);
        }
        self.apply_remote(state);
        Ok(())
    }

    async fn resume_receiving(&self, local_ids: &[String]) -> Result<()> {
        self.record(HandlerCall::ResumeReceiving {
            local_ids: local_ids.to_vec(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Recv)?;

        for local_id in local_ids {
            if !state.transceivers.contains_key(local_id) {
                return Err(Error::invalid_state("associated transceiver not found"));
            }
            state.remote_sdp.resume_receiving_media_section(local_id)?;
            state.set_local_direction(local_id, Direction::RecvOnly);
        }
        self.apply_remote(state);
        Ok(())
    }

    async fn send_data_channel(
        &self,
        options: HandlerSendDataChannelOptions,
    ) -> Result<HandlerSendDataChannelResult> {
        self.record(HandlerCall::SendDataChannel {
            label: options.label.clone(),
        })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Send)?;

        let stream_id = state.next_send_sctp_stream_id;
        state.next_send_sctp_stream_id = ((u32::from(stream_id) + 1) % SCTP_NUM_STREAMS.mis) as u16;

        if !state.has_data_channel_media_section {
            let section_idx = state.remote_sdp.get_next_media_section_idx();
            let mid = match &section_idx.reuse_mid {
                Some(mid) => mid.clone(),
                None => state.next_mid(),
            };
            let offer = state.local_media(MediaType::Application, &mid);
            state.upsert_local(offer.clone());

            if !state.transport_ready {
                state.setup_transport().await?;
            }

            state
                .remote_sdp
                .send_sctp_association(&offer, section_idx.reuse_mid.as_deref())?;
            self.apply_remote(state);
            state.has_data_channel_media_section = true;
        }

        let sctp_stream_parameters = SctpStreamParameters {
            stream_id,
            ordered: Some(options.ordered),
            max_packet_life_time: options.max_packet_life_time,
            max_retransmits: options.max_retransmits,
            label: Some(options.label),
            protocol: Some(options.protocol),
        };
        let (data_channel, peer) = DataChannel::pair(sctp_stream_parameters.clone());
        self.peers.lock().insert(stream_id, peer);

        debug!(stream_id, "send_data_channel()");
        Ok(HandlerSendDataChannelResult {
            data_channel,
            sctp_stream_parameters,
        })
    }

    async fn receive_data_channel(
        &self,
        options: HandlerReceiveDataChannelOptions,
    ) -> Result<DataChannel> {
        let stream_id = options.sctp_stream_parameters.stream_id;
        self.record(HandlerCall::ReceiveDataChannel { stream_id })?;
        let mut guard = self.engine().await?;
        let state = &mut *guard;
        state.ensure_direction(TransportDirection::Recv)?;

        if !state.has_data_channel_media_section {
            state.remote_sdp.receive_sctp_association(false)?;
            self.apply_remote(state);

            let answer = state.local_media(MediaType::Application, DATA_CHANNEL_MID);
            state.upsert_local(answer);

            if !state.transport_ready {
                state.setup_transport().await?;
            }
            state.has_data_channel_media_section = true;
        }

        let parameters = SctpStreamParameters {
            label: Some(options.label),
            protocol: Some(options.protocol),
            ..options.sctp_stream_parameters
        };
        let (data_channel, peer) = DataChannel::pair(parameters);
        self.peers.lock().insert(stream_id, peer);

        debug!(stream_id, "receive_data_channel()");
        Ok(data_channel)
    }
}

/// Factory producing a fresh [`FakeHandler`] per call
pub fn fake_handler_factory() -> HandlerFactory {
    Arc::new(|| Arc::new(FakeHandler::new()) as Arc<dyn Handler>)
}
