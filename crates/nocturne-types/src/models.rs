//! Domain vocabulary shared between the server crates and the client.
//!
//! Row types live in nocturne-db; these are the parsed forms the handlers
//! and the client state machine work with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of self-ends a token gets per night.
pub const SELF_END_CAP: i64 = 2;

/// How a participant describes themself. Stored verbatim in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Man,
    Woman,
    Unspecified,
}

impl Identity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Identity::Man => "man",
            Identity::Woman => "woman",
            Identity::Unspecified => "unspecified",
        }
    }
}

impl FromStr for Identity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "man" => Ok(Identity::Man),
            "woman" => Ok(Identity::Woman),
            "unspecified" => Ok(Identity::Unspecified),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a participant is willing to be paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Men,
    Women,
    Any,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Men => "men",
            Preference::Women => "women",
            Preference::Any => "any",
        }
    }

    /// Whether this preference accepts a counterpart of the given identity.
    /// An unspecified identity satisfies every preference.
    pub fn admits(&self, other: Identity) -> bool {
        match self {
            Preference::Any => true,
            Preference::Men => matches!(other, Identity::Man | Identity::Unspecified),
            Preference::Women => matches!(other, Identity::Woman | Identity::Unspecified),
        }
    }
}

impl FromStr for Preference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "men" => Ok(Preference::Men),
            "women" => Ok(Preference::Women),
            "any" => Ok(Preference::Any),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symmetric pairing rule: each side's preference must admit the other's
/// identity.
pub fn mutually_compatible(
    a_identity: Identity,
    a_preference: Preference,
    b_identity: Identity,
    b_preference: Preference,
) -> bool {
    a_preference.admits(b_identity) && b_preference.admits(a_identity)
}

/// Opaque per-night participant handle. Tokens are client-generated; the
/// server only checks shape, never meaning.
pub fn is_valid_token(token: &str) -> bool {
    let len = token.len();
    (10..=128).contains(&len) && token.bytes().all(|b| b.is_ascii_graphic())
}

/// Which seat of a room an entry occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Side::A),
            "b" => Ok(Side::B),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
