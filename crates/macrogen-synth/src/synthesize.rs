//! Code synthesis
//!
//! Rewrites only the literal sites of resolved parameters. Every byte of
//! the template outside an edit range is preserved.

use crate::edit::{apply_edits, check_conflicts, EditOperation, EditOrigin};
use crate::error::SynthError;
use crate::policy::{DuplicateBlock, ExpansionPolicy, ReconcileContext};
use crate::render::render;
use indexmap::IndexMap;
use macrogen_schema::{ArrayGroup, BlockSchema, ParamValue, ValidationError};
use macrogen_template::{BlockId, TemplateSource};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of one synthesis pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedScript {
    text: String,
    block_id: BlockId,
    session_id: String,
}

impl SynthesizedScript {
    /// Generated script text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Block the script was generated from
    #[inline]
    #[must_use]
    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    /// Session that requested it
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Take the text
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Synthesizer with a member-count reconciliation policy
#[derive(Debug, Clone)]
pub struct Synthesizer {
    policy: Arc<dyn ExpansionPolicy>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(Arc::new(DuplicateBlock::default()))
    }
}

impl Synthesizer {
    /// Create synthesizer using `policy`
    #[inline]
    #[must_use]
    pub fn new(policy: Arc<dyn ExpansionPolicy>) -> Self {
        Self { policy }
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &dyn ExpansionPolicy {
        self.policy.as_ref()
    }

    /// Maximum member count for the group driven by `driver`, if bounded
    #[must_use]
    pub fn member_capacity(&self, schema: &BlockSchema, driver: &str) -> Option<usize> {
        schema
            .group_driven_by(driver)
            .and_then(|g| self.policy.capacity(g, schema))
    }

    /// Indices of the members generated for `group` at `count`, ascending
    ///
    /// Empty when the policy cannot generate members or `count` is the
    /// template's built-in count.
    #[must_use]
    pub fn generated_members(
        &self,
        schema: &BlockSchema,
        group: &ArrayGroup,
        count: usize,
    ) -> Vec<usize> {
        if !self.policy.generates_members() || count == schema.builtin_count(group) {
            return Vec::new();
        }
        let bounded = self
            .policy
            .capacity(group, schema)
            .map_or(count, |capacity| count.min(capacity));
        schema.undeclared_members(group, bounded)
    }

    /// Produce the edit operations for `values` without applying them
    ///
    /// # Errors
    /// See [`Synthesizer::synthesize`]
    pub fn plan(
        &self,
        source: &TemplateSource,
        schema: &BlockSchema,
        values: &IndexMap<String, ParamValue>,
    ) -> Result<Vec<EditOperation>, SynthError> {
        if schema.source_hash != source.hash() || &schema.block_id != source.block_id() {
            return Err(SynthError::SchemaMismatch(format!(
                "schema of {} does not describe template {}",
                schema.block_id,
                source.block_id()
            )));
        }

        let validated = validate_all(schema, values, self.policy.as_ref())?;
        let counts = member_counts(schema, &validated)?;

        let mut edits = Vec::new();
        for (name, value) in &validated {
            let Some(descriptor) = schema.get(name) else {
                // Generated member, rendered by the policy
                continue;
            };
            if let (Some(driver), Some(k)) = (&descriptor.array_driver, descriptor.member_index) {
                if counts.get(driver.as_str()).is_some_and(|count| k > *count) {
                    debug!(parameter = %name, "value for member beyond driver count ignored");
                    continue;
                }
            }
            edits.push(EditOperation::replace(
                descriptor.default.range.clone(),
                render(descriptor, value),
                EditOrigin::Parameter(name.clone()),
            ));
        }

        for group in &schema.groups {
            let count = counts.get(group.driver.as_str()).copied().unwrap_or(0);
            if count == schema.builtin_count(group) {
                continue;
            }
            if let Some(capacity) = self.policy.capacity(group, schema) {
                if count > capacity {
                    return Err(SynthError::Validation(ValidationError::TooManyMembers {
                        name: group.driver.clone(),
                        value: i64::try_from(count).unwrap_or(i64::MAX),
                        capacity,
                    }));
                }
            }
            let ctx = ReconcileContext {
                source,
                schema,
                group,
                count,
                values: &validated,
            };
            edits.extend(self.policy.reconcile(&ctx)?);
        }

        if let Err(e) = check_conflicts(&edits) {
            error!(block = %schema.block_id, error = %e, "conflicting edits");
            return Err(e);
        }
        Ok(edits)
    }

    /// Synthesize a script from resolved values
    ///
    /// # Errors
    /// - `SynthError::SchemaMismatch` for unknown names or a foreign schema
    /// - `SynthError::Validation` for values violating their descriptor
    /// - `SynthError::EditConflict` if two edits overlap
    pub fn synthesize(
        &self,
        source: &TemplateSource,
        schema: &BlockSchema,
        values: &IndexMap<String, ParamValue>,
        session_id: impl Into<String>,
    ) -> Result<SynthesizedScript, SynthError> {
        let edits = self.plan(source, schema, values)?;
        let text = apply_edits(source.text(), &edits)?;
        let script = SynthesizedScript {
            text,
            block_id: source.block_id().clone(),
            session_id: session_id.into(),
        };
        info!(
            block = %script.block_id,
            session = %script.session_id,
            edits = edits.len(),
            policy = self.policy.name(),
            "script synthesized"
        );
        Ok(script)
    }
}

/// Synthesize with the default (duplicate) policy
///
/// # Errors
/// See [`Synthesizer::synthesize`]
pub fn synthesize(
    source: &TemplateSource,
    schema: &BlockSchema,
    values: &IndexMap<String, ParamValue>,
    session_id: impl Into<String>,
) -> Result<SynthesizedScript, SynthError> {
    Synthesizer::default().synthesize(source, schema, values, session_id)
}

/// Validate every value against its descriptor
///
/// Values for members the template does not declare are checked against
/// the group's last declared member, and only accepted when the policy can
/// generate them.
fn validate_all(
    schema: &BlockSchema,
    values: &IndexMap<String, ParamValue>,
    policy: &dyn ExpansionPolicy,
) -> Result<IndexMap<String, ParamValue>, SynthError> {
    let mut validated = IndexMap::with_capacity(values.len());
    for (name, value) in values {
        let descriptor = schema
            .descriptor_for(name)
            .ok_or_else(|| SynthError::unknown_parameter(name))?;
        if schema.get(name).is_none() && !policy.generates_members() {
            return Err(SynthError::SchemaMismatch(format!(
                "'{name}' is not declared and the {} policy cannot generate it",
                policy.name()
            )));
        }
        validated.insert(name.clone(), descriptor.validate(value)?);
    }
    Ok(validated)
}

/// Requested member count per driver name
fn member_counts<'s>(
    schema: &'s BlockSchema,
    validated: &IndexMap<String, ParamValue>,
) -> Result<IndexMap<&'s str, usize>, SynthError> {
    let mut counts = IndexMap::new();
    for group in &schema.groups {
        let driver = schema
            .get(&group.driver)
            .ok_or_else(|| SynthError::unknown_parameter(&group.driver))?;
        let value = validated
            .get(&group.driver)
            .unwrap_or(driver.default_value());
        let count = value.as_i64().unwrap_or(0).max(0);
        counts.insert(
            group.driver.as_str(),
            usize::try_from(count).unwrap_or(usize::MAX),
        );
    }
    Ok(counts)
}
