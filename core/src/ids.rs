//! Strong identifier types for requests, attributes and identities.
//!
//! These are newtype wrappers around `String` so a request id can never be
//! confused with an identity address in a function signature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct ParseIdError(String);

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// # Validation
        ///
        /// - `FromStr::from_str()`: Validates input (rejects empty strings)
        /// - `From::from()` and `new()`: No validation (for internal use with trusted input)
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert the identifier into its inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
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
                if s.is_empty() {
                    return Err(ParseIdError(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Unique identifier of a [`LocalRequest`](crate::local_request::LocalRequest).
    ///
    /// Request ids are generated locally for outgoing requests and taken from
    /// the received content for incoming requests. Examples: `"REQ7f3a..."`.
    RequestId
}

string_id! {
    /// Unique identifier of a locally stored attribute.
    AttributeId
}

string_id! {
    /// Address of an identity on the transport layer.
    ///
    /// Used both for the local account ("own address") and for peers.
    CoreAddress
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;

    #[test]
    fn new_and_accessors() {
        let id = RequestId::new("REQ123");
        assert_eq!(id.as_str(), "REQ123");
        assert_eq!(id.to_string(), "REQ123");
        assert_eq!(id.clone().into_inner(), "REQ123");
    }

    #[test]
    fn from_str_rejects_empty() {
        assert!("".parse::<RequestId>().is_err());
        assert!("".parse::<CoreAddress>().is_err());
        let parsed: CoreAddress = "did:e:peer-1".parse().unwrap();
        assert_eq!(parsed, CoreAddress::new("did:e:peer-1"));
    }

    #[test]
    fn serde_roundtrip_is_transparent() {
        let id = AttributeId::new("ATT42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ATT42\"");
        let back: AttributeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
