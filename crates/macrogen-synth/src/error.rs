//! Synthesis errors

use macrogen_schema::ValidationError;
use std::ops::Range;

/// Errors during code synthesis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthError {
    /// Values or ranges do not fit the schema/template pair
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A value violates its descriptor
    #[error("invalid value: {0}")]
    Validation(#[from] ValidationError),

    /// Two edits of one pass overlap
    #[error("edit conflict between {first} at {first_range:?} and {second} at {second_range:?}")]
    EditConflict {
        first: String,
        first_range: Range<usize>,
        second: String,
        second_range: Range<usize>,
    },
}

impl SynthError {
    /// Value supplied for a name the schema does not declare
    pub fn unknown_parameter(name: &str) -> Self {
        Self::SchemaMismatch(format!("unknown parameter '{name}'"))
    }
}
