//! Simulcast stream lists (RFC 8853)
//!
//! A list is `;` separated streams, each a `,` separated set of alternative
//! formats; a `~` prefix marks a paused format: `a;~b,c`.

/// One rid inside a simulcast stream list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulcastFormat {
    /// RID
    pub scid: String,
    /// Paused (`~` prefix)
    pub paused: bool,
}

/// Parse a simulcast stream list
pub fn parse_simulcast_stream_list(list: &str) -> Vec<Vec<SimulcastFormat>> {
    list.split(';')
        .filter(|stream| !stream.is_empty())
        .map(|stream| {
            stream
                .split(',')
                .filter(|format| !format.is_empty())
                .map(|format| match format.strip_prefix('~') {
                    Some(scid) => SimulcastFormat {
                        scid: scid.to_string(),
                        paused: true,
                    },
                    None => SimulcastFormat {
                        scid: format.to_string(),
                        paused: false,
                    },
                })
                .collect()
        })
        .collect()
}

/// Write a simulcast stream list
pub fn write_simulcast_stream_list(streams: &[Vec<SimulcastFormat>]) -> String {
    streams
        .iter()
        .map(|formats| {
            formats
                .iter()
                .map(|format| {
                    if format.paused {
                        format!("~{}", format.scid)
                    } else {
                        format.scid.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let streams = parse_simulcast_stream_list("a;~b,c");
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0][0].scid, "a");
        assert!(!streams[0][0].paused);
        assert_eq!(streams[1][0].scid, "b");
        assert!(streams[1][0].paused);
        assert_eq!(streams[1][1].scid, "c");
        assert!(!streams[1][1].paused);
    }

    #[test]
    fn test_write_list() {
        let streams = parse_simulcast_stream_list("r0;~r1;r2");
        assert_eq!(write_simulcast_stream_list(&streams), "r0;~r1;r2");
        assert!(parse_simulcast_stream_list("").is_empty());
    }
}
