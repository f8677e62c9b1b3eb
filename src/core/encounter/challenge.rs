//! Challenge ratings and their XP values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::EncounterError;

/// XP award per challenge rating, CR 1 through 30.
const XP_BY_CR: [u32; 30] = [
    200, 450, 700, 1_100, 1_800, 2_300, 2_900, 3_900, 5_000, 5_900, 7_200, 8_400, 10_000, 11_500,
    13_000, 15_000, 18_000, 20_000, 22_000, 25_000, 33_000, 41_000, 50_000, 62_000, 75_000,
    90_000, 105_000, 120_000, 135_000, 155_000,
];

/// A creature's challenge rating, stored in eighths so `1/8`, `1/4` and `1/2`
/// are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChallengeRating(u16);

impl ChallengeRating {
    pub const MAX: ChallengeRating = ChallengeRating(30 * 8);

    pub fn whole(cr: u8) -> Result<Self, EncounterError> {
        Self::from_eighths(u16::from(cr) * 8)
    }

    fn from_eighths(eighths: u16) -> Result<Self, EncounterError> {
        let valid = matches!(eighths, 0 | 1 | 2 | 4) || (eighths % 8 == 0 && eighths <= 30 * 8);
        if valid {
            Ok(Self(eighths))
        } else {
            Err(EncounterError::InvalidChallengeRating(format!(
                "{}",
                f64::from(eighths) / 8.0
            )))
        }
    }

    pub fn from_f64(value: f64) -> Result<Self, EncounterError> {
        if !value.is_finite() || value < 0.0 {
            return Err(EncounterError::InvalidChallengeRating(value.to_string()));
        }
        let eighths = (value * 8.0).round();
        if (eighths / 8.0 - value).abs() > f64::EPSILON || eighths > f64::from(u16::MAX) {
            return Err(EncounterError::InvalidChallengeRating(value.to_string()));
        }
        Self::from_eighths(eighths as u16)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 8.0
    }

    pub fn xp(self) -> u32 {
        match self.0 {
            0 => 10,
            1 => 25,
            2 => 50,
            4 => 100,
            n => XP_BY_CR[usize::from(n / 8) - 1],
        }
    }
}

impl fmt::Display for ChallengeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => f.write_str("1/8"),
            2 => f.write_str("1/4"),
            4 => f.write_str("1/2"),
            n => write!(f, "{}", n / 8),
        }
    }
}

impl FromStr for ChallengeRating {
    type Err = EncounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("CR")
            .or_else(|| s.strip_prefix("cr"))
            .map(str::trim)
            .unwrap_or(s);

        if let Some((num, den)) = s.split_once('/') {
            let num: u16 = num.trim().parse().map_err(|_| invalid(s))?;
            let den: u16 = den.trim().parse().map_err(|_| invalid(s))?;
            if den == 0 || 8 % den != 0 {
                return Err(invalid(s));
            }
            let eighths = num.checked_mul(8 / den).ok_or_else(|| invalid(s))?;
            return Self::from_eighths(eighths);
        }

        let value: f64 = s.parse().map_err(|_| invalid(s))?;
        Self::from_f64(value)
    }
}

fn invalid(s: &str) -> EncounterError {
    EncounterError::InvalidChallengeRating(s.to_string())
}

// On the wire a CR is a number (`0.25`) or a string (`"1/4"`).
impl Serialize for ChallengeRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for ChallengeRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(f64),
            Text(String),
        }

        let parsed = match Wire::deserialize(deserializer)? {
            Wire::Number(n) => ChallengeRating::from_f64(n),
            Wire::Text(s) => s.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}
