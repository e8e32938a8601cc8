//! Template sources and block identifiers

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::ops::Range;
use std::sync::Arc;

/// Stable identifier of a catalog block
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Create block id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Immutable macro-script template text
///
/// The text is shared behind an `Arc`, so clones are cheap and every
/// component sees the same bytes. The content hash is computed once at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    block_id: BlockId,
    text: Arc<str>,
    hash: ContentHash,
}

impl TemplateSource {
    /// Create a template source for a block
    #[must_use]
    pub fn new(block_id: impl Into<BlockId>, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let hash = ContentHash::of_text(&text);
        Self {
            block_id: block_id.into(),
            text,
            hash,
        }
    }

    /// Block this template belongs to
    #[inline]
    #[must_use]
    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    /// Full template text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Content hash of the text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text of a byte range, if the range is valid for this source
    #[inline]
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Option<&str> {
        self.text.get(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_hash_tracks_text() {
        let a = TemplateSource::new("truss_2d", "parameter_int(\"n\", \"Bays\", 6, 2, 50);");
        let b = TemplateSource::new("other", "parameter_int(\"n\", \"Bays\", 6, 2, 50);");
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.block_id().as_str(), "truss_2d");
    }

    #[test]
    fn slice_checks_bounds() {
        let src = TemplateSource::new("b", "abc");
        assert_eq!(src.slice(1..3), Some("bc"));
        assert_eq!(src.slice(2..9), None);
        assert_eq!(src.len(), 3);
    }
}
