//! RFC 4566 text output for the session model
//!
//! Lines are CRLF terminated. Media attributes are written in a fixed order
//! so two equal models always produce byte-identical SDP.

use std::fmt::{self, Display, Formatter, Write};

use crate::session::{Connection, MediaObject, SessionDescription};
use crate::transport::IpVersion;

fn ip_token(version: IpVersion) -> &'static str {
    match version {
        IpVersion::V4 => "IP4",
        IpVersion::V6 => "IP6",
    }
}

fn write_connection(f: &mut Formatter<'_>, connection: &Connection) -> fmt::Result {
    write!(
        f,
        "c=IN {} {}\r\n",
        ip_token(connection.ip_version),
        connection.ip
    )
}

impl Display for SessionDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v={}\r\n", self.version)?;
        write!(
            f,
            "o={} {} {} {} {} {}\r\n",
            self.origin.username,
            self.origin.session_id,
            self.origin.session_version,
            self.origin.net_type,
            ip_token(self.origin.ip_version),
            self.origin.address
        )?;
        write!(f, "s={}\r\n", self.name)?;
        write!(f, "t={} {}\r\n", self.timing.start, self.timing.stop)?;

        if self.ice_lite {
            f.write_str("a=ice-lite\r\n")?;
        }
        if let Some(fingerprint) = &self.fingerprint {
            write!(f, "a=fingerprint:{} {}\r\n", fingerprint.hash_type, fingerprint.hash)?;
        }
        if let Some(msid_semantic) = &self.msid_semantic {
            write!(
                f,
                "a=msid-semantic: {} {}\r\n",
                msid_semantic.semantic, msid_semantic.token
            )?;
        }
        for group in &self.groups {
            write!(f, "a=group:{}", group.group_type)?;
            for mid in &group.mids {
                write!(f, " {}", mid)?;
            }
            f.write_str("\r\n")?;
        }

        for media in &self.media {
            write!(f, "{}", media)?;
        }

        Ok(())
    }
}

impl Display for MediaObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={} {} {} {}\r\n",
            self.kind, self.port, self.protocol, self.payloads
        )?;
        if let Some(connection) = &self.connection {
            write_connection(f, connection)?;
        }

        for rtp in &self.rtp {
            write!(f, "a=rtpmap:{} {}/{}", rtp.payload, rtp.codec, rtp.rate)?;
            if let Some(encoding) = rtp.encoding {
                write!(f, "/{}", encoding)?;
            }
            f.write_str("\r\n")?;
        }
        for fb in &self.rtcp_fb {
            write!(f, "a=rtcp-fb:{} {}", fb.payload, fb.fb_type)?;
            match fb.subtype.as_deref() {
                Some(subtype) if !subtype.is_empty() => write!(f, " {}", subtype)?,
                _ => {}
            }
            f.write_str("\r\n")?;
        }
        for fmtp in &self.fmtp {
            write!(f, "a=fmtp:{} {}\r\n", fmtp.payload, fmtp.config)?;
        }
        for ext in &self.ext {
            write!(f, "a=extmap:{}", ext.value)?;
            if let Some(direction) = ext.direction {
                write!(f, "/{}", direction)?;
            }
            write!(f, " {}\r\n", ext.uri)?;
        }
        if self.extmap_allow_mixed {
            f.write_str("a=extmap-allow-mixed\r\n")?;
        }

        if let Some(setup) = self.setup {
            write!(f, "a=setup:{}\r\n", setup.as_str())?;
        }
        if let Some(mid) = &self.mid {
            write!(f, "a=mid:{}\r\n", mid)?;
        }
        if let Some(msid) = &self.msid {
            write!(f, "a=msid:{}\r\n", msid)?;
        }
        if let Some(direction) = self.direction {
            write!(f, "a={}\r\n", direction)?;
        }

        if let Some(ufrag) = &self.ice_ufrag {
            write!(f, "a=ice-ufrag:{}\r\n", ufrag)?;
        }
        if let Some(pwd) = &self.ice_pwd {
            write!(f, "a=ice-pwd:{}\r\n", pwd)?;
        }
        if let Some(fingerprint) = &self.fingerprint {
            write!(f, "a=fingerprint:{} {}\r\n", fingerprint.hash_type, fingerprint.hash)?;
        }
        for candidate in &self.candidates {
            write!(
                f,
                "a=candidate:{} {} {} {} {} {} typ {}",
                candidate.foundation,
                candidate.component,
                candidate.transport,
                candidate.priority,
                candidate.ip,
                candidate.port,
                candidate.candidate_type
            )?;
            if let Some(tcp_type) = &candidate.tcp_type {
                write!(f, " tcptype {}", tcp_type)?;
            }
            f.write_str("\r\n")?;
        }
        if self.end_of_candidates {
            f.write_str("a=end-of-candidates\r\n")?;
        }
        if let Some(options) = &self.ice_options {
            write!(f, "a=ice-options:{}\r\n", options)?;
        }

        for group in &self.ssrc_groups {
            let mut ssrcs = String::new();
            for (i, ssrc) in group.ssrcs.iter().enumerate() {
                if i > 0 {
                    ssrcs.push(' ');
                }
                write!(ssrcs, "{}", ssrc)?;
            }
            write!(f, "a=ssrc-group:{} {}\r\n", group.semantics, ssrcs)?;
        }
        for ssrc in &self.ssrcs {
            write!(f, "a=ssrc:{} {}", ssrc.id, ssrc.attribute)?;
            if let Some(value) = &ssrc.value {
                write!(f, ":{}", value)?;
            }
            f.write_str("\r\n")?;
        }

        for rid in &self.rids {
            write!(f, "a=rid:{} {}", rid.id, rid.direction.as_str())?;
            if let Some(params) = &rid.params {
                write!(f, " {}", params)?;
            }
            f.write_str("\r\n")?;
        }
        if let Some(simulcast) = &self.simulcast {
            write!(f, "a=simulcast:{} {}", simulcast.dir1.as_str(), simulcast.list1)?;
            if let (Some(dir2), Some(list2)) = (simulcast.dir2, &simulcast.list2) {
                write!(f, " {} {}", dir2.as_str(), list2)?;
            }
            f.write_str("\r\n")?;
        }

        if self.rtcp_mux {
            f.write_str("a=rtcp-mux\r\n")?;
        }
        if self.rtcp_rsize {
            f.write_str("a=rtcp-rsize\r\n")?;
        }

        if let Some(port) = self.sctp_port {
            write!(f, "a=sctp-port:{}\r\n", port)?;
        }
        if let Some(size) = self.max_message_size {
            write!(f, "a=max-message-size:{}\r\n", size)?;
        }
        if let Some(sctpmap) = &self.sctpmap {
            write!(
                f,
                "a=sctpmap:{} {} {}\r\n",
                sctpmap.sctpmap_number, sctpmap.app, sctpmap.max_message_size
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        Fingerprint, Group, MediaType, Origin, RtcpFb, RtpMap, SsrcAttribute, SsrcGroup,
    };
    use ortc_rtp_core::Direction;
    use pretty_assertions::assert_eq;

    fn origin() -> Origin {
        Origin {
            username: "ortc".into(),
            session_id: 10000,
            session_version: 1,
            net_type: "IN".into(),
            ip_version: IpVersion::V4,
            address: "0.0.0.0".into(),
        }
    }

    #[test]
    fn test_write_session() {
        let mut session = SessionDescription::new(origin());
        session.ice_lite = true;
        session.fingerprint = Some(Fingerprint {
            hash_type: "sha-256".into(),
            hash: "AA:BB".into(),
        });
        session.groups.push(Group {
            group_type: "BUNDLE".into(),
            mids: vec!["0".into(), "1".into()],
        });

        let mut media = MediaObject::new(MediaType::Video, 7, "UDP/TLS/RTP/SAVPF").with_mid("0");
        media.payloads = "96 97".into();
        media.connection = Some(Connection {
            ip_version: IpVersion::V4,
            ip: "127.0.0.1".into(),
        });
        media.direction = Some(Direction::SendOnly);
        media.rtp.push(RtpMap {
            payload: 96,
            codec: "VP8".into(),
            rate: 90000,
            encoding: None,
        });
        media.rtcp_fb.push(RtcpFb {
            payload: 96,
            fb_type: "nack".into(),
            subtype: Some(String::new()),
        });
        media.rtcp_fb.push(RtcpFb {
            payload: 96,
            fb_type: "nack".into(),
            subtype: Some("pli".into()),
        });
        media.ssrc_groups.push(SsrcGroup {
            semantics: "FID".into(),
            ssrcs: vec![1111, 2222],
        });
        media.ssrcs.push(SsrcAttribute {
            id: 1111,
            attribute: "cname".into(),
            value: Some("abc".into()),
        });
        media.rtcp_mux = true;
        session.media.push(media);

        let expected = "v=0\r\n\
            o=ortc 10000 1 IN IP4 0.0.0.0\r\n\
            s=-\r\n\
            t=0 0\r\n\
            a=ice-lite\r\n\
            a=fingerprint:sha-256 AA:BB\r\n\
            a=group:BUNDLE 0 1\r\n\
            m=video 7 UDP/TLS/RTP/SAVPF 96 97\r\n\
            c=IN IP4 127.0.0.1\r\n\
            a=rtpmap:96 VP8/90000\r\n\
            a=rtcp-fb:96 nack\r\n\
            a=rtcp-fb:96 nack pli\r\n\
            a=mid:0\r\n\
            a=sendonly\r\n\
            a=ssrc-group:FID 1111 2222\r\n\
            a=ssrc:1111 cname:abc\r\n\
            a=rtcp-mux\r\n";

        assert_eq!(session.to_string(), expected);
    }
}
