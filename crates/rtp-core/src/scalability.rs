//! Scalability mode parsing (`L1T3`, `S3T3`, `L3T3_KEY`, ...)

use serde::{Deserialize, Serialize};

/// Layer structure described by a scalability mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalabilityMode {
    /// Number of spatial layers
    pub spatial_layers: u8,
    /// Number of temporal layers
    pub temporal_layers: u8,
    /// K-SVC (`_KEY` suffix)
    pub ksvc: bool,
}

impl Default for ScalabilityMode {
    fn default() -> Self {
        Self {
            spatial_layers: 1,
            temporal_layers: 1,
            ksvc: false,
        }
    }
}

fn parse_layer_count(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 2 || digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// Parse a scalability mode; anything unrecognized yields one layer of each
pub fn parse_scalability_mode(mode: Option<&str>) -> ScalabilityMode {
    mode.and_then(parse_mode).unwrap_or_default()
}

fn parse_mode(mode: &str) -> Option<ScalabilityMode> {
    let rest = mode.strip_prefix('L').or_else(|| mode.strip_prefix('S'))?;

    let t_pos = rest.find('T')?;
    let spatial_layers = parse_layer_count(&rest[..t_pos])?;

    let after_t = &rest[t_pos + 1..];
    let digits_end = after_t
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_t.len());
    let temporal_layers = parse_layer_count(&after_t[..digits_end])?;

    let ksvc = after_t[digits_end..].starts_with("_KEY");

    Some(ScalabilityMode {
        spatial_layers,
        temporal_layers,
        ksvc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!(
            parse_scalability_mode(Some("L1T3")),
            ScalabilityMode { spatial_layers: 1, temporal_layers: 3, ksvc: false }
        );
        assert_eq!(
            parse_scalability_mode(Some("S3T3")),
            ScalabilityMode { spatial_layers: 3, temporal_layers: 3, ksvc: false }
        );
        assert_eq!(
            parse_scalability_mode(Some("L3T3_KEY")),
            ScalabilityMode { spatial_layers: 3, temporal_layers: 3, ksvc: true }
        );
        assert_eq!(parse_scalability_mode(Some("L2T2h")).temporal_layers, 2);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(parse_scalability_mode(None), ScalabilityMode::default());
        assert_eq!(parse_scalability_mode(Some("foo")), ScalabilityMode::default());
        assert_eq!(parse_scalability_mode(Some("L0T1")), ScalabilityMode::default());
        assert_eq!(parse_scalability_mode(Some("LT3")), ScalabilityMode::default());
    }
}
