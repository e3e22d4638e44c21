//! Canonical content identifiers.

use crate::error::{Error, Result};
use cid::Cid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A decoded content identifier.
///
/// Equality is equality of the decoded CID, so `bafy...` in base32 and the same CIDv1
/// written in another multibase compare equal. [`Display`](fmt::Display) always renders
/// the canonical form: base58btc for CIDv0, base32 for CIDv1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(Cid);

impl ContentId {
    /// Decode a textual CID.
    pub fn decode(text: &str) -> Result<Self> {
        Cid::try_from(text)
            .map(Self)
            .map_err(|e| Error::MalformedCid {
                input: text.to_string(),
                reason: e.to_string(),
            })
    }

    /// Borrow the underlying CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }

    /// CID version (0 or 1).
    pub fn version(&self) -> u64 {
        self.0.version().into()
    }
}

impl From<Cid> for ContentId {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl FromStr for ContentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// Cluster peers encode CIDs either as a bare string or as an IPLD link `{"/": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireCid {
    Text(String),
    Link {
        #[serde(rename = "/")]
        link: String,
    },
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = match WireCid::deserialize(deserializer)? {
            WireCid::Text(text) => text,
            WireCid::Link { link } => link,
        };
        ContentId::decode(&text).map_err(serde::de::Error::custom)
    }
}
