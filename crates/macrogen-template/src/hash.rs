//! Template content hashing
//!
//! Schemas are derived purely from template text, so the Blake3 digest of
//! that text is the cache key for everything derived from it.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const DIGEST_LEN: usize = blake3::OUT_LEN;

/// Blake3 digest of a template's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; DIGEST_LEN]);

impl ContentHash {
    /// Digest of template text
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(text.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Prefix for log lines
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s.trim(), &mut digest).map_err(|source| HashError::Malformed {
            text: s.to_string(),
            source,
        })?;
        Ok(Self(digest))
    }
}

// Schemas store the hash as hex text.
impl serde::Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash text that is not a template digest
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("malformed content hash '{text}': {source}")]
    Malformed {
        text: String,
        #[source]
        source: hex::FromHexError,
    },
}
