//! The remote session description a transport negotiates against
//!
//! [`RemoteSdp`] owns the ordered media sections, the `mid → index` map and
//! the session attributes. Sections are created on first use of a mid,
//! mutated in place, and recycled once closed. The BUNDLE group is recomputed
//! after every structural change as the ordered list of non-closed mids.
//!
//! The first mid ever added anchors the BUNDLE transport and is never given
//! port 0: closing it only disables it.

use std::collections::HashMap;

use tracing::debug;

use ortc_rtp_core::RtpEncodingParameters;

use crate::error::{Error, Result};
use crate::media_section::{
    AnswerMediaSectionOptions, MediaSection, OfferMediaSectionOptions, TransportContext,
};
use crate::session::{
    Fingerprint, Group, MediaObject, MediaType, MsidSemantic, Origin, SessionDescription,
};
use crate::transport::{DtlsParameters, DtlsRole, IceParameters, IpVersion};

/// `o=` user name of generated descriptions
pub const SDP_USERNAME: &str = "ortc-client";

/// `o=` session id of generated descriptions
pub const SDP_SESSION_ID: u64 = 10000;

/// Mid of the data channel section
pub const DATA_CHANNEL_MID: &str = "datachannel";

/// Where the next media section goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSectionIdx {
    /// Position in the description
    pub idx: usize,
    /// Mid of the closed section to recycle
    pub reuse_mid: Option<String>,
}

/// Incrementally built remote SDP
#[derive(Debug, Clone)]
pub struct RemoteSdp {
    transport: TransportContext,
    media_sections: Vec<MediaSection>,
    mid_to_index: HashMap<String, usize>,
    first_mid: Option<String>,
    sdp: SessionDescription,
}

impl RemoteSdp {
    /// Create an empty description for the given remote transport
    pub fn new(transport: TransportContext) -> Self {
        let origin = match &transport.plain_rtp_parameters {
            Some(plain) => Origin {
                username: SDP_USERNAME.to_string(),
                session_id: SDP_SESSION_ID,
                session_version: 0,
                net_type: "IN".to_string(),
                ip_version: plain.ip_version,
                address: plain.ip.clone(),
            },
            None => Origin {
                username: SDP_USERNAME.to_string(),
                session_id: SDP_SESSION_ID,
                session_version: 0,
                net_type: "IN".to_string(),
                ip_version: IpVersion::V4,
                address: "0.0.0.0".to_string(),
            },
        };

        let mut sdp = SessionDescription::new(origin);

        if let Some(ice_parameters) = &transport.ice_parameters {
            sdp.ice_lite = ice_parameters.is_ice_lite();
        }

        if let Some(dtls_parameters) = &transport.dtls_parameters {
            sdp.msid_semantic = Some(MsidSemantic {
                semantic: "WMS".to_string(),
                token: "*".to_string(),
            });
            sdp.fingerprint = Self::fingerprint(dtls_parameters);
            sdp.groups.push(Group {
                group_type: "BUNDLE".to_string(),
                mids: Vec::new(),
            });
        }

        Self {
            transport,
            media_sections: Vec::new(),
            mid_to_index: HashMap::new(),
            first_mid: None,
            sdp,
        }
    }

    fn fingerprint(dtls_parameters: &DtlsParameters) -> Option<Fingerprint> {
        dtls_parameters.fingerprints.last().map(|fp| Fingerprint {
            hash_type: fp.algorithm.clone(),
            hash: fp.value.clone(),
        })
    }

    /// Remote transport parameters
    pub fn transport(&self) -> &TransportContext {
        &self.transport
    }

    /// Replace the ICE credentials of every section (ICE restart)
    pub fn update_ice_parameters(&mut self, ice_parameters: IceParameters) {
        debug!(
            "update_ice_parameters() [ufrag:{}]",
            ice_parameters.username_fragment
        );

        self.sdp.ice_lite = ice_parameters.is_ice_lite();
        for section in &mut self.media_sections {
            section.set_ice_parameters(&ice_parameters);
        }
        self.transport.ice_parameters = Some(ice_parameters);
    }

    /// Change the remote DTLS role of every section
    pub fn update_dtls_role(&mut self, role: DtlsRole) -> Result<()> {
        debug!("update_dtls_role() [role:{}]", role);

        let dtls_parameters = self
            .transport
            .dtls_parameters
            .as_mut()
            .ok_or_else(|| Error::missing("DTLS parameters"))?;
        dtls_parameters.role = Some(role);

        for section in &mut self.media_sections {
            section.set_dtls_role(role);
        }

        Ok(())
    }

    /// First closed section to recycle, else the next free position
    pub fn get_next_media_section_idx(&self) -> MediaSectionIdx {
        self.media_sections
            .iter()
            .position(MediaSection::closed)
            .map(|idx| MediaSectionIdx {
                idx,
                reuse_mid: Some(self.media_sections[idx].mid().to_string()),
            })
            .unwrap_or(MediaSectionIdx {
                idx: self.media_sections.len(),
                reuse_mid: None,
            })
    }

    /// Answer a local send (local offer section already in the local SDP)
    pub fn send(
        &mut self,
        options: AnswerMediaSectionOptions<'_>,
        reuse_mid: Option<&str>,
    ) -> Result<()> {
        let section = MediaSection::answer(&self.transport, options)?;

        if reuse_mid.is_some() {
            self.replace_media_section(section, reuse_mid)
        } else if !self.mid_to_index.contains_key(section.mid()) {
            self.add_media_section(section);
            Ok(())
        } else {
            self.replace_media_section(section, None)
        }
    }

    /// Offer a remote send (local receive)
    ///
    /// A new mid takes the place of the first closed section, if any.
    pub fn receive(&mut self, options: OfferMediaSectionOptions<'_>) -> Result<()> {
        let section = MediaSection::offer(&self.transport, options)?;

        if self.mid_to_index.contains_key(section.mid()) {
            return self.replace_media_section(section, None);
        }

        match self.get_next_media_section_idx().reuse_mid {
            Some(reuse_mid) => {
                debug!(
                    "receive() | recycling closed media section [mid:{}, reuse_mid:{}]",
                    section.mid(),
                    reuse_mid
                );
                self.replace_media_section(section, Some(reuse_mid.as_str()))
            }
            None => {
                self.add_media_section(section);
                Ok(())
            }
        }
    }

    fn section_mut(&mut self, mid: &str) -> Result<&mut MediaSection> {
        let idx = *self
            .mid_to_index
            .get(mid)
            .ok_or_else(|| Error::not_found(mid))?;
        Ok(&mut self.media_sections[idx])
    }

    /// Set a section `inactive`
    pub fn pause_media_section(&mut self, mid: &str) -> Result<()> {
        self.section_mut(mid)?.pause()
    }

    /// Resume a section the local side sends on
    pub fn resume_sending_media_section(&mut self, mid: &str) -> Result<()> {
        self.section_mut(mid)?.resume()
    }

    /// Resume a section the local side receives on
    pub fn resume_receiving_media_section(&mut self, mid: &str) -> Result<()> {
        self.section_mut(mid)?.resume()
    }

    /// Disable a section, keeping its port
    pub fn disable_media_section(&mut self, mid: &str) -> Result<()> {
        self.section_mut(mid)?.disable()
    }

    /// Close a section
    ///
    /// Returns `false` when the section anchors the BUNDLE transport; it is
    /// then only disabled and the caller must not recycle its mid.
    pub fn close_media_section(&mut self, mid: &str) -> Result<bool> {
        if self.first_mid.as_deref() == Some(mid) {
            debug!(
                "close_media_section() | cannot close first media section, disabling it instead [mid:{}]",
                mid
            );
            self.disable_media_section(mid)?;
            return Ok(false);
        }

        self.section_mut(mid)?.close();
        self.regenerate_bundle_mids();

        Ok(true)
    }

    /// Mark inactive simulcast streams of a section as paused
    pub fn mux_media_section_simulcast(
        &mut self,
        mid: &str,
        encodings: &[RtpEncodingParameters],
    ) -> Result<()> {
        self.section_mut(mid)?.mux_simulcast_streams(encodings)
    }

    /// Answer the local data channel offer
    ///
    /// With `reuse_mid` the answer takes the place of that closed section.
    pub fn send_sctp_association(
        &mut self,
        offer_media_object: &MediaObject,
        reuse_mid: Option<&str>,
    ) -> Result<()> {
        let section = MediaSection::answer(
            &self.transport,
            AnswerMediaSectionOptions {
                offer_media_object,
                offer_rtp_parameters: None,
                answer_rtp_parameters: None,
                codec_options: None,
                extmap_allow_mixed: false,
            },
        )?;

        if reuse_mid.is_some() {
            self.replace_media_section(section, reuse_mid)
        } else {
            self.add_media_section(section);
            Ok(())
        }
    }

    /// Offer a data channel association
    pub fn receive_sctp_association(&mut self, legacy_sctpmap: bool) -> Result<()> {
        let section = MediaSection::offer(
            &self.transport,
            OfferMediaSectionOptions {
                mid: DATA_CHANNEL_MID,
                kind: MediaType::Application,
                offer_rtp_parameters: None,
                stream_id: None,
                track_id: None,
                legacy_sctpmap,
            },
        )?;
        self.add_media_section(section);
        Ok(())
    }

    /// Render the description, bumping the session version
    pub fn get_sdp(&mut self) -> String {
        self.sdp.origin.session_version += 1;
        self.sdp.media = self
            .media_sections
            .iter()
            .map(|section| section.object().clone())
            .collect();
        self.sdp.to_string()
    }

    /// Session model as of the last mutation
    pub fn session(&self) -> &SessionDescription {
        &self.sdp
    }

    /// Section carrying `mid`
    pub fn media_section(&self, mid: &str) -> Option<&MediaSection> {
        self.mid_to_index
            .get(mid)
            .map(|idx| &self.media_sections[*idx])
    }

    /// Sections in order
    pub fn media_sections(&self) -> &[MediaSection] {
        &self.media_sections
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.media_sections.len()
    }

    /// Whether no section was added yet
    pub fn is_empty(&self) -> bool {
        self.media_sections.is_empty()
    }

    /// Mids grouped in BUNDLE
    pub fn bundle_mids(&self) -> Vec<String> {
        self.sdp
            .group("BUNDLE")
            .map(|group| group.mids.clone())
            .unwrap_or_default()
    }

    fn add_media_section(&mut self, section: MediaSection) {
        if self.first_mid.is_none() {
            self.first_mid = Some(section.mid().to_string());
        }

        self.mid_to_index
            .insert(section.mid().to_string(), self.media_sections.len());
        self.media_sections.push(section);

        self.regenerate_bundle_mids();
    }

    fn replace_media_section(
        &mut self,
        section: MediaSection,
        reuse_mid: Option<&str>,
    ) -> Result<()> {
        match reuse_mid {
            Some(reuse_mid) => {
                let idx = *self
                    .mid_to_index
                    .get(reuse_mid)
                    .ok_or_else(|| Error::not_found(reuse_mid))?;

                self.mid_to_index.remove(reuse_mid);
                self.mid_to_index.insert(section.mid().to_string(), idx);
                self.media_sections[idx] = section;
            }
            None => {
                let idx = *self
                    .mid_to_index
                    .get(section.mid())
                    .ok_or_else(|| Error::not_found(section.mid()))?;
                self.media_sections[idx] = section;
            }
        }

        self.regenerate_bundle_mids();
        Ok(())
    }

    fn regenerate_bundle_mids(&mut self) {
        if self.transport.dtls_parameters.is_none() {
            return;
        }

        let mids: Vec<String> = self
            .media_sections
            .iter()
            .filter(|section| !section.closed())
            .map(|section| section.mid().to_string())
            .collect();

        if let Some(group) = self
            .sdp
            .groups
            .iter_mut()
            .find(|group| group.group_type == "BUNDLE")
        {
            group.mids = mids;
        }
    }
}
