//! H264 `profile-level-id` handling (RFC 6184)
//!
//! A `profile-level-id` is three hex encoded bytes: `profile_idc`,
//! `profile_iop` (constraint flags) and `level_idc`. Profiles are recognized by
//! matching `profile_idc` and a bit pattern over `profile_iop`, as in the table
//! of RFC 6184 section 8.1.
//!
//! ```
//! use ortc_rtp_core::h264::{parse_profile_level_id, Level, Profile};
//!
//! let id = parse_profile_level_id("42e01f").unwrap();
//! assert_eq!(id.profile, Profile::ConstrainedBaseline);
//! assert_eq!(id.level, Level::L3_1);
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::types::Parameters;

/// `constraint_set3_flag` bit of `profile_iop`, marks level 1b when level_idc is 11
const CONSTRAINT_SET3_FLAG: u8 = 0x10;

/// Value used when the `profile-level-id` parameter is absent
pub const DEFAULT_PROFILE_LEVEL_ID: ProfileLevelId = ProfileLevelId {
    profile: Profile::ConstrainedBaseline,
    level: Level::L3_1,
};

/// H264 profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Constrained Baseline
    ConstrainedBaseline,
    /// Baseline
    Baseline,
    /// Main
    Main,
    /// Constrained High
    ConstrainedHigh,
    /// High
    High,
    /// Predictive High 4:4:4
    PredictiveHigh444,
}

/// H264 level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Level {
    /// Level 1b
    L1b = 0,
    /// Level 1
    L1 = 10,
    /// Level 1.1
    L1_1 = 11,
    /// Level 1.2
    L1_2 = 12,
    /// Level 1.3
    L1_3 = 13,
    /// Level 2
    L2 = 20,
    /// Level 2.1
    L2_1 = 21,
    /// Level 2.2
    L2_2 = 22,
    /// Level 3
    L3 = 30,
    /// Level 3.1
    L3_1 = 31,
    /// Level 3.2
    L3_2 = 32,
    /// Level 4
    L4 = 40,
    /// Level 4.1
    L4_1 = 41,
    /// Level 4.2
    L4_2 = 42,
    /// Level 5
    L5 = 50,
    /// Level 5.1
    L5_1 = 51,
    /// Level 5.2
    L5_2 = 52,
}

impl Level {
    /// Level from its `level_idc`; 1b is not representable here
    pub fn from_level_idc(level_idc: u8) -> Option<Self> {
        let level = match level_idc {
            10 => Self::L1,
            11 => Self::L1_1,
            12 => Self::L1_2,
            13 => Self::L1_3,
            20 => Self::L2,
            21 => Self::L2_1,
            22 => Self::L2_2,
            30 => Self::L3,
            31 => Self::L3_1,
            32 => Self::L3_2,
            40 => Self::L4,
            41 => Self::L4_1,
            42 => Self::L4_2,
            50 => Self::L5,
            51 => Self::L5_1,
            52 => Self::L5_2,
            _ => return None,
        };
        Some(level)
    }

    /// Numeric `level_idc` (0 for 1b)
    pub fn level_idc(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L1b => f.write_str("1b"),
            level => {
                let idc = level.level_idc();
                if idc % 10 == 0 {
                    write!(f, "{}", idc / 10)
                } else {
                    write!(f, "{}.{}", idc / 10, idc % 10)
                }
            }
        }
    }
}

/// Parsed `profile-level-id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileLevelId {
    /// Profile
    pub profile: Profile,
    /// Level
    pub level: Level,
}

impl ProfileLevelId {
    /// Create a new profile/level pair
    pub fn new(profile: Profile, level: Level) -> Self {
        Self { profile, level }
    }
}

/// Bit pattern over `profile_iop`; `x` bits are ignored
struct BitPattern {
    mask: u8,
    masked_value: u8,
}

impl BitPattern {
    fn new(pattern: &str) -> Self {
        let mut mask = 0u8;
        let mut masked_value = 0u8;
        for (bit, c) in pattern.bytes().enumerate() {
            let flag = 1u8 << (7 - bit);
            if c != b'x' {
                mask |= flag;
            }
            if c == b'1' {
                masked_value |= flag;
            }
        }
        Self { mask, masked_value }
    }

    fn is_match(&self, value: u8) -> bool {
        self.masked_value == (value & self.mask)
    }
}

const PROFILE_PATTERNS: [(u8, &str, Profile); 9] = [
    (0x42, "x1xx0000", Profile::ConstrainedBaseline),
    (0x4d, "1xxx0000", Profile::ConstrainedBaseline),
    (0x58, "11xx0000", Profile::ConstrainedBaseline),
    (0x42, "x0xx0000", Profile::Baseline),
    (0x58, "10xx0000", Profile::Baseline),
    (0x4d, "0x0x0000", Profile::Main),
    (0x64, "00000000", Profile::High),
    (0x64, "00001100", Profile::ConstrainedHigh),
    (0xf4, "00000000", Profile::PredictiveHigh444),
];

/// Parse a six hex digit `profile-level-id`
pub fn parse_profile_level_id(value: &str) -> Option<ProfileLevelId> {
    if value.len() != 6 {
        return None;
    }

    let numeric = u32::from_str_radix(value, 16).ok()?;
    if numeric == 0 {
        return None;
    }

    let level_idc = (numeric & 0xff) as u8;
    let profile_iop = ((numeric >> 8) & 0xff) as u8;
    let profile_idc = ((numeric >> 16) & 0xff) as u8;

    let level = if level_idc == Level::L1_1.level_idc() && profile_iop & CONSTRAINT_SET3_FLAG != 0
    {
        Level::L1b
    } else {
        Level::from_level_idc(level_idc)?
    };

    PROFILE_PATTERNS
        .iter()
        .find(|(idc, pattern, _)| *idc == profile_idc && BitPattern::new(pattern).is_match(profile_iop))
        .map(|(_, _, profile)| ProfileLevelId::new(*profile, level))
}

/// Encode a profile/level pair; not every level 1b combination is encodable
pub fn profile_level_id_to_string(id: &ProfileLevelId) -> Option<String> {
    if id.level == Level::L1b {
        return match id.profile {
            Profile::ConstrainedBaseline => Some("42f00b".to_string()),
            Profile::Baseline => Some("42100b".to_string()),
            Profile::Main => Some("4d100b".to_string()),
            _ => None,
        };
    }

    let profile_idc_iop = match id.profile {
        Profile::ConstrainedBaseline => "42e0",
        Profile::Baseline => "4200",
        Profile::Main => "4d00",
        Profile::ConstrainedHigh => "640c",
        Profile::High => "6400",
        Profile::PredictiveHigh444 => "f400",
    };

    Some(format!("{}{:02x}", profile_idc_iop, id.level.level_idc()))
}

/// Profile/level of a codec parameter map; absent means Constrained Baseline 3.1
pub fn parse_sdp_profile_level_id(params: &Parameters) -> Option<ProfileLevelId> {
    match params.get("profile-level-id") {
        Some(value) => parse_profile_level_id(&value.to_string()),
        None => Some(DEFAULT_PROFILE_LEVEL_ID),
    }
}

/// Whether both parameter maps describe the same H264 profile
pub fn is_same_profile(params1: &Parameters, params2: &Parameters) -> bool {
    match (
        parse_sdp_profile_level_id(params1),
        parse_sdp_profile_level_id(params2),
    ) {
        (Some(a), Some(b)) => a.profile == b.profile,
        _ => false,
    }
}

/// Whether `level-asymmetry-allowed` is set (as `1` or `"1"`)
pub fn is_level_asymmetry_allowed(params: &Parameters) -> bool {
    params
        .get("level-asymmetry-allowed")
        .and_then(|value| value.as_i64())
        == Some(1)
}

/// Level 1b sorts below every level except 1 and 1b itself
pub fn is_less_level(a: Level, b: Level) -> bool {
    if a == Level::L1b {
        return b != Level::L1 && b != Level::L1b;
    }
    if b == Level::L1b {
        return a != Level::L1;
    }
    a < b
}

/// Lower of two levels
pub fn min_level(a: Level, b: Level) -> Level {
    if is_less_level(a, b) {
        a
    } else {
        b
    }
}

/// Compute the `profile-level-id` to put in an answer
///
/// Returns `Ok(None)` when neither side carries a `profile-level-id`. Fails
/// when either side is unparsable or when the profiles differ.
pub fn generate_profile_level_id_for_answer(
    local_supported: &Parameters,
    remote_offered: &Parameters,
) -> Result<Option<String>> {
    if !local_supported.contains_key("profile-level-id")
        && !remote_offered.contains_key("profile-level-id")
    {
        return Ok(None);
    }

    let local = parse_sdp_profile_level_id(local_supported)
        .ok_or_else(|| Error::InvalidProfileLevelId("invalid local profile-level-id".into()))?;
    let remote = parse_sdp_profile_level_id(remote_offered)
        .ok_or_else(|| Error::InvalidProfileLevelId("invalid remote profile-level-id".into()))?;

    if local.profile != remote.profile {
        return Err(Error::negotiation("H264 profile mismatch"));
    }

    let level_asymmetry_allowed =
        is_level_asymmetry_allowed(local_supported) && is_level_asymmetry_allowed(remote_offered);

    let answer_level = if level_asymmetry_allowed {
        local.level
    } else {
        min_level(local.level, remote.level)
    };

    Ok(profile_level_id_to_string(&ProfileLevelId::new(
        remote.profile,
        answer_level,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterValue;

    fn params(pairs: &[(&str, ParameterValue)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_profiles() {
        let cases = [
            ("42e01f", Profile::ConstrainedBaseline, Level::L3_1),
            ("42001f", Profile::Baseline, Level::L3_1),
            ("4d001f", Profile::Main, Level::L3_1),
            ("64001f", Profile::High, Level::L3_1),
            ("640c1f", Profile::ConstrainedHigh, Level::L3_1),
            ("f4001f", Profile::PredictiveHigh444, Level::L3_1),
            ("58f01f", Profile::ConstrainedBaseline, Level::L3_1),
            ("4de01f", Profile::ConstrainedBaseline, Level::L3_1),
            ("42e034", Profile::ConstrainedBaseline, Level::L5_2),
        ];
        for (value, profile, level) in cases {
            let id = parse_profile_level_id(value).unwrap();
            assert_eq!(id.profile, profile, "{}", value);
            assert_eq!(id.level, level, "{}", value);
        }
    }

    #[test]
    fn test_parse_level_1b() {
        let id = parse_profile_level_id("42f00b").unwrap();
        assert_eq!(id.level, Level::L1b);
        assert_eq!(parse_profile_level_id("42e00b").unwrap().level, Level::L1_1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_profile_level_id("").is_none());
        assert!(parse_profile_level_id("42e01").is_none());
        assert!(parse_profile_level_id("000000").is_none());
        assert!(parse_profile_level_id("zzzzzz").is_none());
        assert!(parse_profile_level_id("42e0ff").is_none());
        assert!(parse_profile_level_id("ff001f").is_none());
    }

    #[test]
    fn test_to_string() {
        let cases = [
            (Profile::ConstrainedBaseline, Level::L3_1, "42e01f"),
            (Profile::Baseline, Level::L1, "42000a"),
            (Profile::Main, Level::L3_1, "4d001f"),
            (Profile::ConstrainedHigh, Level::L4_2, "640c2a"),
            (Profile::High, Level::L4_2, "64002a"),
            (Profile::ConstrainedBaseline, Level::L1b, "42f00b"),
            (Profile::Main, Level::L1b, "4d100b"),
        ];
        for (profile, level, expected) in cases {
            let id = ProfileLevelId::new(profile, level);
            assert_eq!(profile_level_id_to_string(&id).as_deref(), Some(expected));
        }

        let high_1b = ProfileLevelId::new(Profile::High, Level::L1b);
        assert!(profile_level_id_to_string(&high_1b).is_none());
    }

    #[test]
    fn test_level_ordering_with_1b() {
        assert!(is_less_level(Level::L1b, Level::L1_1));
        assert!(!is_less_level(Level::L1b, Level::L1));
        assert!(!is_less_level(Level::L1b, Level::L1b));
        assert!(is_less_level(Level::L1, Level::L1b) == false);
        assert!(is_less_level(Level::L1_1, Level::L1b) == false);
        assert_eq!(min_level(Level::L1b, Level::L3_1), Level::L1b);
        assert_eq!(min_level(Level::L1, Level::L1b), Level::L1);
        assert_eq!(min_level(Level::L4, Level::L3_1), Level::L3_1);
    }

    #[test]
    fn test_default_when_absent() {
        let empty = Parameters::new();
        assert_eq!(parse_sdp_profile_level_id(&empty), Some(DEFAULT_PROFILE_LEVEL_ID));
    }

    #[test]
    fn test_same_profile() {
        let a = params(&[("profile-level-id", "42e01f".into())]);
        let b = params(&[("profile-level-id", "42e00b".into())]);
        let c = params(&[("profile-level-id", "4d001f".into())]);
        assert!(is_same_profile(&a, &b));
        assert!(!is_same_profile(&a, &c));
        assert!(is_same_profile(&a, &Parameters::new()));
    }

    #[test]
    fn test_answer_symmetric() {
        let local = params(&[("profile-level-id", "42e01f".into())]);
        let remote = params(&[("profile-level-id", "42e01f".into())]);
        let answer = generate_profile_level_id_for_answer(&local, &remote).unwrap();
        assert_eq!(answer.as_deref(), Some("42e01f"));
    }

    #[test]
    fn test_answer_min_level_without_asymmetry() {
        let local = params(&[("profile-level-id", "42e02a".into())]);
        let remote = params(&[("profile-level-id", "42e01f".into())]);
        let answer = generate_profile_level_id_for_answer(&local, &remote).unwrap();
        assert_eq!(answer.as_deref(), Some("42e01f"));
    }

    #[test]
    fn test_answer_local_level_with_asymmetry() {
        let local = params(&[
            ("profile-level-id", "42e00d".into()),
            ("level-asymmetry-allowed", ParameterValue::Integer(1)),
        ]);
        let remote = params(&[
            ("profile-level-id", "42e01f".into()),
            ("level-asymmetry-allowed", "1".into()),
        ]);
        let answer = generate_profile_level_id_for_answer(&local, &remote).unwrap();
        assert_eq!(answer.as_deref(), Some("42e00d"));
    }

    #[test]
    fn test_answer_asymmetry_one_side_only() {
        let local = params(&[
            ("profile-level-id", "42e034".into()),
            ("level-asymmetry-allowed", ParameterValue::Integer(1)),
        ]);
        let remote = params(&[("profile-level-id", "42e01f".into())]);
        let answer = generate_profile_level_id_for_answer(&local, &remote).unwrap();
        assert_eq!(answer.as_deref(), Some("42e01f"));
    }

    #[test]
    fn test_answer_absent_on_both_sides() {
        let answer =
            generate_profile_level_id_for_answer(&Parameters::new(), &Parameters::new()).unwrap();
        assert!(answer.is_none());
    }

    #[test]
    fn test_answer_profile_mismatch() {
        let local = params(&[("profile-level-id", "42e01f".into())]);
        let remote = params(&[("profile-level-id", "64001f".into())]);
        assert!(generate_profile_level_id_for_answer(&local, &remote).is_err());

        let bogus = params(&[("profile-level-id", "xyz".into())]);
        assert!(matches!(
            generate_profile_level_id_for_answer(&bogus, &remote),
            Err(Error::InvalidProfileLevelId(_))
        ));
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::L3_1.to_string(), "3.1");
        assert_eq!(Level::L4.to_string(), "4");
        assert_eq!(Level::L1b.to_string(), "1b");
    }
}
