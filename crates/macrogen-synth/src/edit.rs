//! Edit operations and their application
//!
//! An edit replaces a byte range `[start, end)` of the template. Edits of
//! one pass must be pairwise disjoint: ranges `[a, b)` and `[c, d)` overlap
//! iff `a < d && c < b`. Zero-width insertions never overlap each other.

use crate::error::SynthError;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// What produced an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum EditOrigin {
    /// Value of a named parameter
    Parameter(String),
    /// Member-count reconciliation of an array group
    Group(String),
}

impl Display for EditOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(name) => write!(f, "parameter '{name}'"),
            Self::Group(name) => write!(f, "array group '{name}'"),
        }
    }
}

/// Replacement of one byte range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOperation {
    pub range: Range<usize>,
    pub replacement: String,
    pub origin: EditOrigin,
}

impl EditOperation {
    /// Replace `range` with `replacement`
    #[must_use]
    pub fn replace(range: Range<usize>, replacement: impl Into<String>, origin: EditOrigin) -> Self {
        Self {
            range,
            replacement: replacement.into(),
            origin,
        }
    }

    /// Insert `text` at `at`
    #[must_use]
    pub fn insert(at: usize, text: impl Into<String>, origin: EditOrigin) -> Self {
        Self::replace(at..at, text, origin)
    }

    /// Remove `range`
    #[must_use]
    pub fn remove(range: Range<usize>, origin: EditOrigin) -> Self {
        Self::replace(range, String::new(), origin)
    }

    /// Check if this edit only inserts
    #[inline]
    #[must_use]
    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    /// Check if two edits touch a common byte
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.range.start < other.range.end && other.range.start < self.range.end
    }
}

/// Reject any pair of overlapping edits
///
/// # Errors
/// `SynthError::EditConflict` naming the first overlapping pair
pub fn check_conflicts(edits: &[EditOperation]) -> Result<(), SynthError> {
    let mut order: Vec<&EditOperation> = edits.iter().collect();
    order.sort_by_key(|e| (e.range.start, e.range.end));

    // Sorted by start, so each edit only needs comparing with the one
    // reaching furthest among those before it
    let mut reach: Option<&EditOperation> = None;
    for edit in order {
        if let Some(prev) = reach {
            if prev.overlaps(edit) {
                return Err(SynthError::EditConflict {
                    first: prev.origin.to_string(),
                    first_range: prev.range.clone(),
                    second: edit.origin.to_string(),
                    second_range: edit.range.clone(),
                });
            }
        }
        if reach.map_or(true, |r| edit.range.end >= r.range.end) {
            reach = Some(edit);
        }
    }
    Ok(())
}

/// Apply disjoint edits to `text`
///
/// Edits are applied in descending start order, so earlier offsets stay
/// valid. Insertions at the same offset keep their input order. Bytes not
/// covered by an edit are preserved.
///
/// # Errors
/// - `SynthError::EditConflict` if two edits overlap
/// - `SynthError::SchemaMismatch` if a range does not fit the text
pub fn apply_edits(text: &str, edits: &[EditOperation]) -> Result<String, SynthError> {
    check_conflicts(edits)?;

    if let Some(bad) = edits.iter().find(|e| {
        e.range.start > e.range.end
            || e.range.end > text.len()
            || !text.is_char_boundary(e.range.start)
            || !text.is_char_boundary(e.range.end)
    }) {
        return Err(SynthError::SchemaMismatch(format!(
            "edit range {:?} from {} does not fit the template",
            bad.range, bad.origin
        )));
    }

    let mut order: Vec<(usize, &EditOperation)> = edits.iter().enumerate().collect();
    order.sort_by_key(|(i, e)| (e.range.start, *i));

    let mut out = text.to_string();
    for (_, edit) in order.into_iter().rev() {
        out.replace_range(edit.range.clone(), &edit.replacement);
    }
    Ok(out)
}
