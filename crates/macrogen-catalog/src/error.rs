//! Catalog errors

use std::path::PathBuf;

/// Errors while loading or querying the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog root directory does not exist
    #[error("catalog root not found: {0}")]
    RootNotFound(PathBuf),

    /// IO error while reading a catalog file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Database file is not valid JSON of the expected shape
    #[error("invalid catalog database {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Block is not in the catalog or has no template
    #[error("block not found: {0}")]
    BlockNotFound(String),
}

impl CatalogError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
