//! Schema cache using moka
//!
//! Extraction is deterministic in the template text, so schemas are cached
//! by block id and content hash and shared as `Arc<BlockSchema>`.

use crate::descriptor::BlockSchema;
use crate::error::ExtractError;
use crate::extract::extract;
use macrogen_template::{BlockId, ContentHash, TemplateSource};
use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

type Key = (BlockId, ContentHash);

/// Concurrent cache of extracted schemas
#[derive(Debug, Clone)]
pub struct SchemaCache {
    inner: Cache<Key, Arc<BlockSchema>>,
}

impl SchemaCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Cached schema of a template, extracting it on a miss
    ///
    /// Concurrent misses for the same key run one extraction and share its
    /// result. Failed extractions are not cached.
    ///
    /// # Errors
    /// Any [`ExtractError`] from [`extract`]
    pub async fn get_or_extract(
        &self,
        source: &TemplateSource,
    ) -> Result<Arc<BlockSchema>, ExtractError> {
        let key = (source.block_id().clone(), source.hash());
        self.inner
            .try_get_with(key, async {
                debug!(block = %source.block_id(), hash = %source.hash().short(), "schema cache miss");
                extract(source).map(Arc::new)
            })
            .await
            .map_err(|e: Arc<ExtractError>| (*e).clone())
    }

    /// Check if a schema for this exact text is cached
    #[inline]
    #[must_use]
    pub async fn contains(&self, source: &TemplateSource) -> bool {
        self.inner
            .get(&(source.block_id().clone(), source.hash()))
            .await
            .is_some()
    }

    /// Drop the cached schema for this exact text
    #[inline]
    pub async fn invalidate(&self, source: &TemplateSource) {
        self.inner
            .invalidate(&(source.block_id().clone(), source.hash()))
            .await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Apply pending maintenance so counts are exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl Default for SchemaCache {
    /// Create cache with default capacity (1,024 schemas)
    fn default() -> Self {
        Self::new(1024)
    }
}
