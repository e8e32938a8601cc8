//! Read-only block catalog and its on-disk loader
//!
//! On-disk layout:
//!
//! ```text
//! <root>/2D/2D_DB.json   {"elements": [ {id, name, dimensionality, main_member, material, metadata}, ... ]}
//! <root>/2D/<id>.js      template of block <id> (or <id>.JS)
//! <root>/3D/3D_DB.json
//! <root>/3D/<id>.js
//! ```

use crate::candidate::BlockCandidate;
use crate::error::CatalogError;
use macrogen_template::{BlockId, TemplateSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Dimensionality directories, in load order
pub const DIMENSIONS: [&str; 2] = ["2D", "3D"];

#[derive(Debug, Deserialize)]
struct Database {
    #[serde(default)]
    elements: Vec<BlockCandidate>,
}

/// Candidates plus their templates
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    candidates: Vec<BlockCandidate>,
    templates: HashMap<BlockId, TemplateSource>,
}

impl Catalog {
    /// Create catalog from candidates (no templates)
    #[must_use]
    pub fn new(candidates: Vec<BlockCandidate>) -> Self {
        Self {
            candidates,
            templates: HashMap::new(),
        }
    }

    /// Builder: attach a template
    #[must_use]
    pub fn with_template(mut self, source: TemplateSource) -> Self {
        self.insert_template(source);
        self
    }

    /// Attach a template, replacing any previous one for the block
    pub fn insert_template(&mut self, source: TemplateSource) {
        self.templates.insert(source.block_id().clone(), source);
    }

    /// Candidates in catalog order
    #[inline]
    #[must_use]
    pub fn candidates(&self) -> &[BlockCandidate] {
        &self.candidates
    }

    /// Candidate by id
    #[must_use]
    pub fn get(&self, id: &BlockId) -> Option<&BlockCandidate> {
        self.candidates.iter().find(|c| &c.id == id)
    }

    /// Template of a block
    #[inline]
    #[must_use]
    pub fn template(&self, id: &BlockId) -> Option<&TemplateSource> {
        self.templates.get(id)
    }

    /// Template of a block
    ///
    /// # Errors
    /// `CatalogError::BlockNotFound` if the block has no template
    pub fn require_template(&self, id: &BlockId) -> Result<&TemplateSource, CatalogError> {
        self.template(id)
            .ok_or_else(|| CatalogError::BlockNotFound(id.to_string()))
    }

    /// Number of candidates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of loaded templates
    #[inline]
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Load a catalog directory
    ///
    /// A missing or invalid database file yields no candidates for that
    /// dimensionality (logged at warn). Blocks without a template file are
    /// kept as candidates.
    ///
    /// # Errors
    /// `CatalogError::RootNotFound` if `root` is not a directory
    pub async fn load_dir(root: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let root = root.as_ref();
        let is_dir = tokio::fs::metadata(root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(CatalogError::RootNotFound(root.to_path_buf()));
        }

        let mut catalog = Self::default();
        for dim in DIMENSIONS {
            let dir = root.join(dim);
            let db_path = dir.join(format!("{dim}_DB.json"));

            let candidates = match read_database(&db_path).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(path = %db_path.display(), error = %e, "catalog database skipped");
                    continue;
                }
            };

            for mut candidate in candidates {
                if candidate.dimensionality.trim().is_empty() {
                    candidate.dimensionality = dim.to_string();
                }
                match read_template(&dir, &candidate.id).await {
                    Ok(Some(source)) => catalog.insert_template(source),
                    Ok(None) => debug!(block = %candidate.id, "block has no template"),
                    Err(e) => warn!(block = %candidate.id, error = %e, "template unreadable"),
                }
                catalog.candidates.push(candidate);
            }
        }

        info!(
            root = %root.display(),
            blocks = catalog.len(),
            templates = catalog.template_count(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

/// Parse a catalog database document
///
/// # Errors
/// `CatalogError::Json` if the text is not a database object
pub fn parse_database(path: &Path, text: &str) -> Result<Vec<BlockCandidate>, CatalogError> {
    serde_json::from_str::<Database>(text)
        .map(|db| db.elements)
        .map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })
}

async fn read_database(path: &Path) -> Result<Vec<BlockCandidate>, CatalogError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::io_error(path, e))?;
    parse_database(path, &text)
}

async fn read_template(dir: &Path, id: &BlockId) -> Result<Option<TemplateSource>, CatalogError> {
    for extension in ["js", "JS"] {
        let path: PathBuf = dir.join(format!("{id}.{extension}"));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => return Ok(Some(TemplateSource::new(id.clone(), text))),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(CatalogError::io_error(path, e)),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_database_reads_elements() {
        let text = r#"{"elements": [{"id": "x", "name": "X", "main_member": "beam", "material": "steel"}]}"#;
        let candidates = parse_database(Path::new("2D_DB.json"), text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].dimensionality, "");
    }

    #[test]
    fn parse_database_rejects_garbage() {
        let err = parse_database(Path::new("db.json"), "[1, 2").unwrap_err();
        assert!(matches!(err, CatalogError::Json { .. }));
    }

    #[test]
    fn require_template_reports_missing() {
        let catalog = Catalog::new(vec![BlockCandidate::new("a", "A", "2D", "beam", "steel")]);
        let err = catalog.require_template(&BlockId::new("a")).unwrap_err();
        assert!(matches!(err, CatalogError::BlockNotFound(id) if id == "a"));
        assert!(catalog.get(&BlockId::new("a")).is_some());
    }
}
