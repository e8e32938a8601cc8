//! Engine configuration
//!
//! Loaded from TOML; every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```toml
//! capability_timeout_ms = 10000
//! write_timeout_ms = 5000
//! history_limit = 6
//! required_fields = ["dimensionality", "structure_type"]
//! expansion_policy = "duplicate"
//! max_generated_members = 256
//! schema_cache_capacity = 1024
//! output_dir = "generated"
//! ```

use crate::error::EngineError;
use macrogen_catalog::RequirementField;
use macrogen_synth::{policy_with_limit, ExpansionPolicy, DEFAULT_MAX_MEMBERS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Timeout for each language capability call
    pub capability_timeout_ms: u64,
    /// Timeout for writing a generated script
    pub write_timeout_ms: u64,
    /// Number of recent turns kept per session
    pub history_limit: usize,
    /// Requirement fields that must be known before matching
    pub required_fields: Vec<RequirementField>,
    /// Dynamic array policy: `truncate` or `duplicate`
    pub expansion_policy: String,
    /// Upper bound on a dynamic array's member count under `duplicate`
    pub max_generated_members: usize,
    /// Maximum cached schemas
    pub schema_cache_capacity: u64,
    /// Directory for generated scripts (none = do not write)
    pub output_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capability_timeout_ms: 10_000,
            write_timeout_ms: 5_000,
            history_limit: 6,
            required_fields: vec![
                RequirementField::Dimensionality,
                RequirementField::StructureType,
            ],
            expansion_policy: "duplicate".to_string(),
            max_generated_members: DEFAULT_MAX_MEMBERS,
            schema_cache_capacity: 1024,
            output_dir: None,
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `EngineError::Config` for invalid TOML, unknown keys or an unknown policy
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `EngineError::Config` if the file cannot be read or parsed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// `EngineError::Config` describing the first problem
    pub fn validate(&self) -> Result<(), EngineError> {
        self.policy()?;
        if self.history_limit == 0 {
            return Err(EngineError::Config("history_limit must be at least 1".to_string()));
        }
        if self.max_generated_members == 0 {
            return Err(EngineError::Config(
                "max_generated_members must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the configured expansion policy
    ///
    /// # Errors
    /// `EngineError::Config` for an unknown policy name
    pub fn policy(&self) -> Result<Arc<dyn ExpansionPolicy>, EngineError> {
        policy_with_limit(&self.expansion_policy, self.max_generated_members).ok_or_else(|| {
            EngineError::Config(format!(
                "unknown expansion policy '{}' (expected truncate or duplicate)",
                self.expansion_policy
            ))
        })
    }

    /// Capability timeout as a duration
    #[inline]
    #[must_use]
    pub fn capability_timeout(&self) -> Duration {
        Duration::from_millis(self.capability_timeout_ms)
    }

    /// Write timeout as a duration
    #[inline]
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// With capability timeout
    #[inline]
    #[must_use]
    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With write timeout
    #[inline]
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With history limit
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With required requirement fields
    #[inline]
    #[must_use]
    pub fn with_required_fields(mut self, fields: Vec<RequirementField>) -> Self {
        self.required_fields = fields;
        self
    }

    /// With expansion policy name
    #[inline]
    #[must_use]
    pub fn with_expansion_policy(mut self, name: impl Into<String>) -> Self {
        self.expansion_policy = name.into();
        self
    }

    /// With member bound for generated groups
    #[inline]
    #[must_use]
    pub fn with_max_generated_members(mut self, max: usize) -> Self {
        self.max_generated_members = max;
        self
    }

    /// With schema cache capacity
    #[inline]
    #[must_use]
    pub fn with_schema_cache_capacity(mut self, capacity: u64) -> Self {
        self.schema_cache_capacity = capacity;
        self
    }

    /// With output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}
