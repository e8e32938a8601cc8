//! Error types for the conversation engine
//!
//! Component errors roll up into [`EngineError`]; each variant carries an
//! [`ErrorContext`] naming the block, parameter and phase involved.

use crate::types::Phase;
use macrogen_catalog::CatalogError;
use macrogen_schema::{ExtractError, ValidationError};
use macrogen_synth::SynthError;
use macrogen_template::BlockId;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub block_id: Option<BlockId>,
    pub parameter: Option<String>,
    pub phase: Option<Phase>,
}

impl ErrorContext {
    /// Empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With block
    #[inline]
    #[must_use]
    pub fn with_block(mut self, block_id: BlockId) -> Self {
        self.block_id = Some(block_id);
        self
    }

    /// With parameter
    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    /// With phase
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Check if nothing is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block_id.is_none() && self.parameter.is_none() && self.phase.is_none()
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::with_capacity(3);
        if let Some(block) = &self.block_id {
            parts.push(format!("block {block}"));
        }
        if let Some(parameter) = &self.parameter {
            parts.push(format!("parameter {parameter}"));
        }
        if let Some(phase) = self.phase {
            parts.push(format!("phase {phase}"));
        }
        write!(f, " ({})", parts.join(", "))
    }
}

/// Language capability errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Call did not finish in time
    #[error("capability call timed out after {0:?}")]
    Timeout(Duration),

    /// Call failed
    #[error("capability call failed: {0}")]
    Failed(String),
}

/// Script writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// IO error on the output path
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write did not finish in time
    #[error("script write timed out after {0:?}")]
    Timeout(Duration),

    /// Blocking write task panicked or was cancelled
    #[error("script write task failed: {0}")]
    Join(String),
}

impl WriteError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Template text cannot be parsed
    #[error("parse error: {message}{context}")]
    Parse {
        message: String,
        context: ErrorContext,
    },

    /// Schema, template and values do not fit together
    #[error("schema mismatch: {message}{context}")]
    SchemaMismatch {
        message: String,
        context: ErrorContext,
    },

    /// A value violates its descriptor
    #[error("invalid value: {source}{context}")]
    Validation {
        #[source]
        source: ValidationError,
        context: ErrorContext,
    },

    /// Two edits of one synthesis pass overlap
    #[error("edit conflict: {message}{context}")]
    EditConflict {
        message: String,
        context: ErrorContext,
    },

    /// Language capability failed or timed out
    #[error("external capability error: {source}{context}")]
    ExternalCapability {
        #[source]
        source: CapabilityError,
        context: ErrorContext,
    },

    /// Block, template or session is unknown
    #[error("not found: {message}{context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// Reading the catalog or writing a script failed
    #[error("storage error: {message}{context}")]
    Storage {
        message: String,
        context: ErrorContext,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Check if the conversation can continue in the same phase
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::ExternalCapability { .. }
        )
    }

    /// Create not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Attached context (none for configuration errors)
    #[must_use]
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Parse { context, .. }
            | Self::SchemaMismatch { context, .. }
            | Self::Validation { context, .. }
            | Self::EditConflict { context, .. }
            | Self::ExternalCapability { context, .. }
            | Self::NotFound { context, .. }
            | Self::Storage { context, .. } => Some(context),
            Self::Config(_) => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            Self::Parse { context, .. }
            | Self::SchemaMismatch { context, .. }
            | Self::Validation { context, .. }
            | Self::EditConflict { context, .. }
            | Self::ExternalCapability { context, .. }
            | Self::NotFound { context, .. }
            | Self::Storage { context, .. } => Some(context),
            Self::Config(_) => None,
        }
    }

    /// Set the block (keeps one already present)
    #[must_use]
    pub fn in_block(mut self, block_id: &BlockId) -> Self {
        if let Some(context) = self.context_mut() {
            context.block_id.get_or_insert_with(|| block_id.clone());
        }
        self
    }

    /// Set the parameter (keeps one already present)
    #[must_use]
    pub fn for_parameter(mut self, parameter: &str) -> Self {
        if let Some(context) = self.context_mut() {
            context
                .parameter
                .get_or_insert_with(|| parameter.to_string());
        }
        self
    }

    /// Set the phase
    #[must_use]
    pub fn in_phase(mut self, phase: Phase) -> Self {
        if let Some(context) = self.context_mut() {
            context.phase = Some(phase);
        }
        self
    }
}

impl From<ExtractError> for EngineError {
    fn from(err: ExtractError) -> Self {
        let context = ErrorContext::new().with_block(err.block_id().clone());
        let message = err.to_string();
        match err {
            ExtractError::Parse { .. } => Self::Parse { message, context },
            ExtractError::DuplicateParameter { name, .. }
            | ExtractError::InvalidDeclaration { name, .. } => Self::SchemaMismatch {
                message,
                context: context.with_parameter(name),
            },
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(source: ValidationError) -> Self {
        let context = ErrorContext::new().with_parameter(source.parameter());
        Self::Validation { source, context }
    }
}

impl From<SynthError> for EngineError {
    fn from(err: SynthError) -> Self {
        match err {
            SynthError::SchemaMismatch(message) => Self::SchemaMismatch {
                message,
                context: ErrorContext::default(),
            },
            SynthError::Validation(source) => source.into(),
            conflict @ SynthError::EditConflict { .. } => Self::EditConflict {
                message: conflict.to_string(),
                context: ErrorContext::default(),
            },
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::BlockNotFound(id) => Self::NotFound {
                message: format!("block {id}"),
                context: ErrorContext::new().with_block(BlockId::from(id)),
            },
            other => Self::Storage {
                message: other.to_string(),
                context: ErrorContext::default(),
            },
        }
    }
}

impl From<CapabilityError> for EngineError {
    fn from(source: CapabilityError) -> Self {
        Self::ExternalCapability {
            source,
            context: ErrorContext::default(),
        }
    }
}

impl From<WriteError> for EngineError {
    fn from(err: WriteError) -> Self {
        Self::Storage {
            message: err.to_string(),
            context: ErrorContext::default(),
        }
    }
}
