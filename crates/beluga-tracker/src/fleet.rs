//! The set of aircraft being watched.
//!
//! Aircraft are identified by their 24-bit ICAO transponder address, written
//! as six hexadecimal digits. The flight-state provider only matches lower
//! case addresses, so identifiers are normalised on parse.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

static ICAO24_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{6}$").expect("Invalid regex pattern"));

/// A 24-bit ICAO transponder address, e.g. `395d66`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Icao24(String);

impl Icao24 {
    /// Parse and normalise a transponder address.
    ///
    /// Surrounding whitespace is ignored and letters are lower-cased.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the value is not six hex digits.
    pub fn parse(value: &str) -> Result<Self> {
        let normalised = value.trim().to_ascii_lowercase();
        if ICAO24_PATTERN.is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(Error::InvalidIdentifier {
                value: value.to_string(),
            })
        }
    }

    /// The address as sent to the provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Icao24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Icao24 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Icao24 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Icao24 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A named group of aircraft that is reported on together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fleet {
    name: String,
    hashtags: String,
    members: Vec<Icao24>,
}

impl Fleet {
    /// Build a fleet, dropping duplicate identifiers while keeping order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if no identifiers are given.
    pub fn new(
        name: impl Into<String>,
        hashtags: impl Into<String>,
        identifiers: impl IntoIterator<Item = Icao24>,
    ) -> Result<Self> {
        let mut members: Vec<Icao24> = Vec::new();
        for id in identifiers {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        if members.is_empty() {
            return Err(Error::ConfigValidation {
                message: "fleet must contain at least one transponder identifier".to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            hashtags: hashtags.into(),
            members,
        })
    }

    /// Display name used in the status message, e.g. `BelugaXL`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trailing hashtags/mentions appended to every status message.
    #[must_use]
    pub fn hashtags(&self) -> &str {
        &self.hashtags
    }

    /// The tracked transponder identifiers.
    #[must_use]
    pub fn members(&self) -> &[Icao24] {
        &self.members
    }

    /// Check if the given address belongs to this fleet.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.as_str().eq_ignore_ascii_case(id))
    }
}

/// The four BelugaXL airframes operated by Airbus.
#[must_use]
pub fn beluga_xl_identifiers() -> Vec<String> {
    ["395d66", "395d67", "395d68", "395d69"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases() {
        let id = Icao24::parse("395D6A").unwrap();
        assert_eq!(id.as_str(), "395d6a");
        assert_eq!(id.to_string(), "395d6a");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = Icao24::parse("  395d66 ").unwrap();
        assert_eq!(id.as_str(), "395d66");
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        for bad in ["", "395d6", "395d667", "39 d66", "zzzzzz", "0x3956"] {
            assert!(Icao24::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_from_str() {
        let id: Icao24 = "4ca7b4".parse().unwrap();
        assert_eq!(id.as_str(), "4ca7b4");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Icao24 = serde_json::from_str("\"395D69\"").unwrap();
        assert_eq!(ok.as_str(), "395d69");

        let err = serde_json::from_str::<Icao24>("\"nope\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_fleet_deduplicates_in_order() {
        let ids = ["395d67", "395d66", "395D67"]
            .iter()
            .map(|s| Icao24::parse(s).unwrap());
        let fleet = Fleet::new("BelugaXL", "#Beluga", ids).unwrap();
        let members: Vec<&str> = fleet.members().iter().map(Icao24::as_str).collect();
        assert_eq!(members, vec!["395d67", "395d66"]);
    }

    #[test]
    fn test_fleet_rejects_empty() {
        let result = Fleet::new("Empty", "", Vec::new());
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_fleet_contains_is_case_insensitive() {
        let fleet = Fleet::new("BelugaXL", "", [Icao24::parse("395d66").unwrap()]).unwrap();
        assert!(fleet.contains("395D66"));
        assert!(!fleet.contains("395d67"));
    }

    #[test]
    fn test_beluga_xl_identifiers_are_valid() {
        let ids = beluga_xl_identifiers();
        assert_eq!(ids.len(), 4);
        for id in ids {
            assert!(Icao24::parse(&id).is_ok());
        }
    }
}
