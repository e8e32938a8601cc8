//! Error types for schema extraction

use macrogen_template::{BlockId, ScanError};

/// Errors during schema extraction
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    /// Template text cannot be parsed
    #[error("cannot parse template {block_id}: {source}")]
    Parse {
        block_id: BlockId,
        #[source]
        source: ScanError,
    },

    /// Two declarations share a name
    #[error("duplicate parameter '{name}' in {block_id}")]
    DuplicateParameter { block_id: BlockId, name: String },

    /// Declaration is malformed (wrong default literal, bad driver, ...)
    #[error("invalid declaration of '{name}' in {block_id}: {reason}")]
    InvalidDeclaration {
        block_id: BlockId,
        name: String,
        reason: String,
    },
}

impl ExtractError {
    /// Block the error refers to
    #[must_use]
    pub fn block_id(&self) -> &BlockId {
        match self {
            Self::Parse { block_id, .. }
            | Self::DuplicateParameter { block_id, .. }
            | Self::InvalidDeclaration { block_id, .. } => block_id,
        }
    }

    pub(crate) fn invalid(block_id: &BlockId, name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            block_id: block_id.clone(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
