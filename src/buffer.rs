//! Durable-mode buffer settings.
//!
//! The delivery engine owns the buffer files themselves; this module only
//! describes how they are named and bounded.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;

/// Buffer file pattern used when the caller does not supply one.
pub const DEFAULT_BUFFER_PATH_FORMAT: &str = "Buffer-{Date}.json";

/// Number of historical buffer files kept when the caller does not say otherwise.
pub const DEFAULT_RETAINED_BUFFER_FILE_COUNT: usize = 31;

/// Parse a size string with optional units (K/M/G, case-insensitive).
///
/// A bare number is a byte count.
fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let Some(last) = s.chars().last() else {
        return Err("empty size string".to_string());
    };

    let (num_str, multiplier) = if last.is_alphabetic() {
        let multiplier = match last.to_ascii_uppercase() {
            'K' => 1024,
            'M' => 1024 * 1024,
            'G' => 1024 * 1024 * 1024,
            unit => return Err(format!("invalid unit: {}, supported: K/M/G", unit)),
        };
        (&s[..s.len() - last.len_utf8()], multiplier)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| "size too large".to_string())
}

/// An upper bound that may be switched off entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    /// At most this many items (events, bytes).
    Bounded(u64),
    /// No cap.
    #[default]
    Unbounded,
}

impl Limit {
    /// The bound, or `None` when unbounded.
    pub fn get(&self) -> Option<u64> {
        match self {
            Self::Bounded(n) => Some(*n),
            Self::Unbounded => None,
        }
    }

    /// Check whether this limit has no cap.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Self::Bounded(n)
    }
}

impl From<Option<u64>> for Limit {
    fn from(n: Option<u64>) -> Self {
        n.map_or(Self::Unbounded, Self::Bounded)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{}", n),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bounded(n) => serializer.serialize_u64(*n),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// Limit value that can be a number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum LimitInput {
    Number(u64),
    String(String),
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match LimitInput::deserialize(deserializer)? {
            LimitInput::Number(n) => Ok(Limit::Bounded(n)),
            LimitInput::String(s) if s.eq_ignore_ascii_case("unbounded") => Ok(Limit::Unbounded),
            LimitInput::String(s) => s
                .trim()
                .parse()
                .map(Limit::Bounded)
                .map_err(|_| de::Error::custom(format!("invalid limit: {}", s))),
        }
    }
}

/// Deserialize a byte limit.
///
/// Accepts a plain number of bytes, `"unbounded"`, or a size string with
/// K/M/G units. Examples: 4096, "512K", "10M", "1g"
pub fn deserialize_byte_limit<'de, D>(deserializer: D) -> Result<Limit, D::Error>
where
    D: Deserializer<'de>,
{
    match LimitInput::deserialize(deserializer)? {
        LimitInput::Number(n) => Ok(Limit::Bounded(n)),
        LimitInput::String(s) if s.eq_ignore_ascii_case("unbounded") => Ok(Limit::Unbounded),
        LimitInput::String(s) => parse_size(&s).map(Limit::Bounded).map_err(de::Error::custom),
    }
}

/// Naming granularity of durable buffer files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferMode {
    /// One buffer file per day.
    Date,
    /// One buffer file per half hour.
    HalfHour,
    /// One buffer file per hour.
    #[default]
    Hour,
}

impl BufferMode {
    /// Mode name as the delivery engine spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::HalfHour => "HalfHour",
            Self::Hour => "Hour",
        }
    }

    /// The `{Mode}` placeholder the engine substitutes with a timestamp.
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.as_str())
    }

    /// Buffer file pattern for this mode, e.g. `Buffer-{Hour}.json`.
    pub fn path_format(&self) -> String {
        format!("Buffer-{}.json", self.placeholder())
    }
}

impl fmt::Display for BufferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct SizedLimit {
        #[serde(deserialize_with = "deserialize_byte_limit")]
        limit: Limit,
    }

    #[test]
    fn test_buffer_mode_path_format() {
        assert_eq!(BufferMode::Date.path_format(), "Buffer-{Date}.json");
        assert_eq!(BufferMode::HalfHour.path_format(), "Buffer-{HalfHour}.json");
        assert_eq!(BufferMode::Hour.path_format(), "Buffer-{Hour}.json");
    }

    #[test]
    fn test_buffer_mode_default_is_hour() {
        assert_eq!(BufferMode::default(), BufferMode::Hour);
        assert_eq!(BufferMode::default().to_string(), "Hour");
    }

    #[test]
    fn test_buffer_mode_deserialize() {
        let mode: BufferMode = serde_yaml::from_str("half_hour").unwrap();
        assert_eq!(mode, BufferMode::HalfHour);
        assert!(serde_yaml::from_str::<BufferMode>("minute").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("2k"), Ok(2 * 1024));
        assert_eq!(parse_size("5M"), Ok(5 * 1024 * 1024));
        assert_eq!(parse_size(" 1g "), Ok(1024 * 1024 * 1024));
        assert!(parse_size("").is_err());
        assert!(parse_size("10T").is_err());
        assert!(parse_size("abcM").is_err());
        assert!(parse_size(&format!("{}G", u64::MAX)).is_err());
    }

    #[test]
    fn test_limit_deserialize() {
        let limit: Limit = serde_yaml::from_str("100").unwrap();
        assert_eq!(limit, Limit::Bounded(100));

        let limit: Limit = serde_yaml::from_str("unbounded").unwrap();
        assert_eq!(limit, Limit::Unbounded);

        let limit: Limit = serde_yaml::from_str("\"250\"").unwrap();
        assert_eq!(limit, Limit::Bounded(250));

        assert!(serde_yaml::from_str::<Limit>("lots").is_err());
    }

    #[test]
    fn test_byte_limit_deserialize() {
        let sized: SizedLimit = serde_yaml::from_str("limit: \"10M\"").unwrap();
        assert_eq!(sized.limit, Limit::Bounded(10 * 1024 * 1024));

        let sized: SizedLimit = serde_yaml::from_str("limit: 4096").unwrap();
        assert_eq!(sized.limit, Limit::Bounded(4096));

        let sized: SizedLimit = serde_yaml::from_str("limit: UNBOUNDED").unwrap();
        assert_eq!(sized.limit, Limit::Unbounded);

        assert!(serde_yaml::from_str::<SizedLimit>("limit: \"3X\"").is_err());
    }

    #[test]
    fn test_limit_conversions() {
        assert_eq!(Limit::from(5), Limit::Bounded(5));
        assert_eq!(Limit::from(None), Limit::Unbounded);
        assert_eq!(Limit::Bounded(7).get(), Some(7));
        assert!(Limit::default().is_unbounded());
        assert_eq!(Limit::Unbounded.to_string(), "unbounded");
    }
}
