//! Stop number type.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when parsing an invalid stop number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop number: {reason}")]
pub struct InvalidStopNo {
    reason: &'static str,
}

/// A valid OC Transpo stop number: the numeric code printed on the stop
/// flag, at most 5 digits (e.g. 7659).
///
/// # Examples
///
/// ```
/// use octranspo::domain::StopNo;
///
/// let stop = StopNo::parse("7659").unwrap();
/// assert_eq!(stop.as_u32(), 7659);
///
/// // Non-digits are rejected
/// assert!(StopNo::parse("76A9").is_err());
///
/// // Too long is rejected
/// assert!(StopNo::parse("123456").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopNo(u32);

impl StopNo {
    /// Largest stop code the feed accepts (5 digits).
    const MAX: u32 = 99_999;

    /// Parse a stop number from a string of ASCII digits.
    ///
    /// Leading zeros are accepted; the code is kept numerically.
    pub fn parse(s: &str) -> Result<Self, InvalidStopNo> {
        if s.is_empty() {
            return Err(InvalidStopNo {
                reason: "must not be empty",
            });
        }

        if s.len() > 5 {
            return Err(InvalidStopNo {
                reason: "must be at most 5 digits",
            });
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidStopNo {
                reason: "must be ASCII digits 0-9",
            });
        }

        // At most 5 digits, so this cannot fail or overflow
        let value = s.parse::<u32>().map_err(|_| InvalidStopNo {
            reason: "must be ASCII digits 0-9",
        })?;

        Ok(StopNo(value))
    }

    /// Build a stop number from its numeric value.
    pub fn new(value: u32) -> Result<Self, InvalidStopNo> {
        if value > Self::MAX {
            return Err(InvalidStopNo {
                reason: "must be at most 5 digits",
            });
        }
        Ok(StopNo(value))
    }

    /// Returns the numeric stop code.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for StopNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopNo({})", self.0)
    }
}

impl fmt::Display for StopNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for StopNo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for StopNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        StopNo::new(value).map_err(serde::de::Error::custom)
    }
}
