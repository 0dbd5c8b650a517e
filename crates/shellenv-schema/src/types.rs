//! Newtype wrappers for string identifiers, plus the release [`Channel`] of a package.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Name of an environment source, unique across all loaded documents.
    SourceName
);

string_newtype!(
    /// Name of a package; the deduplication key when merging.
    PackageName
);

string_newtype!(
    /// Platform identifier in `<arch>-<os>` form, e.g. `x86_64-linux`.
    PlatformId
);

string_newtype!(
    /// Full 64-character hex identity of a resolved environment.
    EnvId
);

string_newtype!(
    /// Truncated 12-character prefix of an [`EnvId`], used for display.
    ShortId
);

/// Release track of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Channel {
    #[default]
    Stable,
    Nightly,
    Custom(String),
}

impl Channel {
    /// Parse a channel string. `"stable"` and `"nightly"` select the named
    /// tracks, any other non-empty string is a custom channel.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" => None,
            "stable" => Some(Self::Stable),
            "nightly" => Some(Self::Nightly),
            other => Some(Self::Custom(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stable => "stable",
            Self::Nightly => "nightly",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Channel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "channel must not be empty".to_owned())
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.as_str().to_owned()
    }
}
