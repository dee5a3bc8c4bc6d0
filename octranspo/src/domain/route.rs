//! Route number type.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when parsing an invalid route number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route number: {reason}")]
pub struct InvalidRouteNo {
    reason: &'static str,
}

/// A valid OC Transpo route identifier: 1 to 4 ASCII digits or uppercase
/// letters, e.g. "95", "6", "R1".
///
/// Stored inline so route numbers are `Copy` and cheap to use as cache
/// keys.
///
/// # Examples
///
/// ```
/// use octranspo::domain::RouteNo;
///
/// let route = RouteNo::parse("95").unwrap();
/// assert_eq!(route.as_str(), "95");
///
/// // Lowercase is rejected
/// assert!(RouteNo::parse("r1").is_err());
///
/// // Too long is rejected
/// assert!(RouteNo::parse("95950").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteNo {
    bytes: [u8; 4],
    len: u8,
}

impl RouteNo {
    /// Parse a route number from a string.
    ///
    /// The input must be 1 to 4 characters, each an ASCII digit or
    /// uppercase letter.
    pub fn parse(s: &str) -> Result<Self, InvalidRouteNo> {
        let raw = s.as_bytes();

        if raw.is_empty() {
            return Err(InvalidRouteNo {
                reason: "must not be empty",
            });
        }

        if raw.len() > 4 {
            return Err(InvalidRouteNo {
                reason: "must be at most 4 characters",
            });
        }

        for &b in raw {
            if !(b.is_ascii_digit() || b.is_ascii_uppercase()) {
                return Err(InvalidRouteNo {
                    reason: "must be ASCII digits or uppercase letters",
                });
            }
        }

        let mut bytes = [0u8; 4];
        bytes[..raw.len()].copy_from_slice(raw);

        Ok(RouteNo {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// Returns the route number as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: We only store valid ASCII digits and uppercase letters
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap()
    }
}

impl fmt::Debug for RouteNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteNo({})", self.as_str())
    }
}

impl fmt::Display for RouteNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RouteNo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RouteNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RouteNo::parse(&s).map_err(serde::de::Error::custom)
    }
}
