//! Strongly-typed ID types for back-office entities.
//!
//! The back-office API hands out numeric identifiers. Some endpoints (and
//! older persisted sessions) encode them as strings, so deserialization
//! accepts either a JSON number or a numeric string.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Wire shape of an identifier before validation.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

/// Macro to generate a strongly-typed numeric ID wrapper.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an ID from its numeric value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the numeric value.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    reason: e.to_string(),
                })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                use serde::de::Error as _;

                match RawId::deserialize(deserializer)? {
                    RawId::Number(n) => Ok(Self(n)),
                    RawId::Text(s) => s.parse().map_err(D::Error::custom),
                }
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a back-office user account.
    UserId
);

define_id!(
    /// Identifier of a role in the remote permission service.
    RoleId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_plain_number() {
        assert_eq!(UserId::new(5).to_string(), "5");
        assert_eq!(RoleId::new(1).to_string(), "1");
    }

    #[test]
    fn parse_numeric_string() {
        let id: UserId = "42".parse().expect("should parse");
        assert_eq!(id.get(), 42);

        let id: UserId = " 7 ".parse().expect("should parse with whitespace");
        assert_eq!(id.get(), 7);
    }

    #[test]
    fn parse_invalid() {
        let result: Result<RoleId, _> = "admin".parse();
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "RoleId");
    }

    #[test]
    fn deserialize_number_or_string() {
        let from_number: UserId = serde_json::from_str("12").expect("number");
        let from_string: UserId = serde_json::from_str("\"12\"").expect("string");
        assert_eq!(from_number, from_string);

        let bad: Result<UserId, _> = serde_json::from_str("\"twelve\"");
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&RoleId::new(2)).expect("serialize");
        assert_eq!(json, "2");
    }
}
