//! Dynamic array reconciliation policies
//!
//! A template pre-declares some members `<group>_1..<group>_m` of each
//! dynamic array. When the driver asks for a different count, a policy
//! turns the difference into edit operations.

use crate::edit::{apply_edits, EditOperation, EditOrigin};
use crate::error::SynthError;
use crate::render::{render, requote};
use indexmap::IndexMap;
use macrogen_schema::{ArrayGroup, BlockSchema, ParamValue, ParameterDescriptor, ValidationError};
use macrogen_template::TemplateSource;
use regex::Regex;
use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Inputs of one group reconciliation
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub source: &'a TemplateSource,
    pub schema: &'a BlockSchema,
    pub group: &'a ArrayGroup,
    /// Requested member count
    pub count: usize,
    /// Validated values by name, including generated members
    pub values: &'a IndexMap<String, ParamValue>,
}

impl<'a> ReconcileContext<'a> {
    /// Declared members with their index, ascending by index
    fn declared(&self) -> Vec<(usize, &'a ParameterDescriptor)> {
        let mut members: Vec<_> = self
            .group
            .members
            .iter()
            .filter_map(|name| self.schema.get(name))
            .filter_map(|d| d.member_index.map(|k| (k, d)))
            .collect();
        members.sort_by_key(|(k, _)| *k);
        members
    }

    /// Removal edits for declared members beyond the requested count
    fn remove_surplus(&self) -> Vec<EditOperation> {
        let text = self.source.text();
        self.declared()
            .into_iter()
            .filter(|(k, _)| *k > self.count)
            .map(|(_, d)| {
                debug!(group = %self.group.name, member = %d.name, "surplus member removed");
                EditOperation::remove(
                    line_span(text, &d.statement_range),
                    EditOrigin::Group(self.group.name.clone()),
                )
            })
            .collect()
    }
}

/// Member-count reconciliation strategy
///
/// Only consulted when the requested count differs from the template's
/// built-in count (the driver's default).
pub trait ExpansionPolicy: Send + Sync + Debug {
    /// Largest member count this policy can produce, `None` if unbounded
    fn capacity(&self, group: &ArrayGroup, schema: &BlockSchema) -> Option<usize>;

    /// Whether members the template does not declare can be produced
    fn generates_members(&self) -> bool {
        false
    }

    /// Edits that bring the group to `ctx.count` members
    ///
    /// # Errors
    /// `SynthError::Validation` if the count cannot be produced
    fn reconcile(&self, ctx: &ReconcileContext<'_>) -> Result<Vec<EditOperation>, SynthError>;

    /// Policy name (for configuration)
    fn name(&self) -> &'static str;
}

/// Template declares the maximal member set; surplus members are removed
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncateSuperset;

impl ExpansionPolicy for TruncateSuperset {
    fn capacity(&self, group: &ArrayGroup, schema: &BlockSchema) -> Option<usize> {
        Some(schema.declared_max(group))
    }

    fn reconcile(&self, ctx: &ReconcileContext<'_>) -> Result<Vec<EditOperation>, SynthError> {
        let capacity = ctx.schema.declared_max(ctx.group);
        if ctx.count > capacity {
            return Err(too_many(ctx, capacity));
        }
        Ok(ctx.remove_surplus())
    }

    fn name(&self) -> &'static str {
        "truncate"
    }
}

/// Default bound on the member count of a duplicated group
pub const DEFAULT_MAX_MEMBERS: usize = 256;

/// Missing members are generated by duplicating the last declared one
#[derive(Debug, Clone, Copy)]
pub struct DuplicateBlock {
    max_members: usize,
}

impl Default for DuplicateBlock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMBERS)
    }
}

impl DuplicateBlock {
    /// Create policy producing at most `max_members` members per group
    #[must_use]
    pub const fn new(max_members: usize) -> Self {
        Self { max_members }
    }

    #[inline]
    #[must_use]
    pub const fn max_members(&self) -> usize {
        self.max_members
    }
}

impl ExpansionPolicy for DuplicateBlock {
    fn capacity(&self, group: &ArrayGroup, schema: &BlockSchema) -> Option<usize> {
        Some(self.max_members.max(schema.declared_max(group)))
    }

    fn generates_members(&self) -> bool {
        true
    }

    fn reconcile(&self, ctx: &ReconcileContext<'_>) -> Result<Vec<EditOperation>, SynthError> {
        let Some(last) = ctx.schema.last_member(ctx.group) else {
            if ctx.count > 0 {
                return Err(too_many(ctx, 0));
            }
            return Ok(Vec::new());
        };

        let mut edits = ctx.remove_surplus();
        let missing = ctx.schema.undeclared_members(ctx.group, ctx.count);
        if missing.is_empty() {
            return Ok(edits);
        }

        let text = ctx.source.text();
        let statement = ctx.source.slice(last.statement_range.clone()).ok_or_else(|| {
            SynthError::SchemaMismatch(format!("statement of '{}' outside template", last.name))
        })?;
        let rename = Regex::new(&format!(r"\b{}\b", regex::escape(&last.name)))
            .map_err(|e| SynthError::SchemaMismatch(e.to_string()))?;
        let members = missing
            .iter()
            .map(|&k| {
                debug!(group = %ctx.group.name, member = k, "member generated");
                duplicate_member(ctx, last, statement, &rename, k)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let kept = ctx
            .declared()
            .into_iter()
            .rev()
            .find(|(k, _)| *k <= ctx.count);
        match kept {
            Some((_, anchor)) => {
                let indent = indentation(text, anchor.statement_range.start);
                let mut generated = String::new();
                for member in &members {
                    generated.push('\n');
                    generated.push_str(indent);
                    generated.push_str(member);
                }
                edits.push(EditOperation::insert(
                    anchor.statement_range.end,
                    generated,
                    EditOrigin::Group(ctx.group.name.clone()),
                ));
            }
            None => {
                // Every declared member is surplus; the generated ones take
                // the place of the last
                let span = line_span(text, &last.statement_range);
                let replacement = if span == last.statement_range {
                    members.join(" ")
                } else {
                    let indent = indentation(text, last.statement_range.start);
                    members.iter().map(|m| format!("{indent}{m}\n")).collect()
                };
                if let Some(edit) = edits.iter_mut().find(|e| e.range == span) {
                    edit.replacement = replacement;
                }
            }
        }
        Ok(edits)
    }

    fn name(&self) -> &'static str {
        "duplicate"
    }
}

/// Statement text of member `k`, derived from the last declared member
fn duplicate_member(
    ctx: &ReconcileContext<'_>,
    last: &ParameterDescriptor,
    statement: &str,
    rename: &Regex,
    k: usize,
) -> Result<String, SynthError> {
    let base = last.statement_range.start;
    let relative = |r: &Range<usize>| (r.start - base)..(r.end - base);
    let name = ctx.group.member_name(k);
    let origin = EditOrigin::Group(ctx.group.name.clone());
    let text = ctx.source.text();

    let mut edits = vec![EditOperation::replace(
        relative(&last.name_range),
        requote(text.get(last.name_range.clone()).unwrap_or("\""), &name),
        origin.clone(),
    )];
    if let Some(label_range) = &last.label_range {
        edits.push(EditOperation::replace(
            relative(label_range),
            requote(text.get(label_range.clone()).unwrap_or("\""), &ctx.group.label_for(k)),
            origin.clone(),
        ));
    }
    if let Some(value) = ctx.values.get(&name) {
        edits.push(EditOperation::replace(
            relative(&last.default.range),
            render(last, value),
            origin,
        ));
    }

    let member = apply_edits(statement, &edits)?;
    Ok(rename.replace_all(&member, name.as_str()).into_owned())
}

fn too_many(ctx: &ReconcileContext<'_>, capacity: usize) -> SynthError {
    SynthError::Validation(ValidationError::TooManyMembers {
        name: ctx.group.driver.clone(),
        value: i64::try_from(ctx.count).unwrap_or(i64::MAX),
        capacity,
    })
}

/// Range of a statement widened to its whole line when it stands alone
fn line_span(text: &str, statement: &Range<usize>) -> Range<usize> {
    let before = &text[..statement.start];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let after = &text[statement.end..];
    let line_end = after.find('\n').map_or(text.len(), |i| statement.end + i + 1);

    let leading_blank = before[line_start..].trim().is_empty();
    let trailing_blank = text[statement.end..line_end].trim().is_empty();
    if leading_blank && trailing_blank {
        line_start..line_end
    } else {
        statement.clone()
    }
}

fn indentation(text: &str, at: usize) -> &str {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..at];
    if prefix.trim().is_empty() {
        prefix
    } else {
        ""
    }
}

/// Resolve a policy by configuration name (`truncate` or `duplicate`)
#[must_use]
pub fn policy_by_name(name: &str) -> Option<Arc<dyn ExpansionPolicy>> {
    policy_with_limit(name, DEFAULT_MAX_MEMBERS)
}

/// Resolve a policy by name, bounding generated groups to `max_members`
#[must_use]
pub fn policy_with_limit(name: &str, max_members: usize) -> Option<Arc<dyn ExpansionPolicy>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "truncate" | "truncate_superset" => Some(Arc::new(TruncateSuperset)),
        "duplicate" | "duplicate_block" => Some(Arc::new(DuplicateBlock::new(max_members))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_span_takes_whole_line() {
        let text = "a;\n    var h_2 = f();\nb;";
        let start = text.find("var").unwrap();
        let end = text.find("();").unwrap() + 3;
        assert_eq!(&text[line_span(text, &(start..end))], "    var h_2 = f();\n");
    }

    #[test]
    fn line_span_keeps_shared_lines() {
        let text = "a; var h_2 = f(); b;";
        let start = text.find("var").unwrap();
        let end = text.find("();").unwrap() + 3;
        assert_eq!(line_span(text, &(start..end)), start..end);
    }

    #[test]
    fn indentation_of_statement() {
        let text = "x\n  var a = 1;";
        assert_eq!(indentation(text, text.find("var").unwrap()), "  ");
        assert_eq!(indentation("y; var a = 1;", 3), "");
    }

    #[test]
    fn policies_by_name() {
        assert_eq!(policy_by_name("truncate").map(|p| p.name()), Some("truncate"));
        assert_eq!(policy_by_name(" Duplicate ").map(|p| p.name()), Some("duplicate"));
        assert!(policy_by_name("stretch").is_none());
    }

    #[test]
    fn only_duplicate_generates_members() {
        assert!(policy_by_name("duplicate").is_some_and(|p| p.generates_members()));
        assert!(policy_by_name("truncate").is_some_and(|p| !p.generates_members()));
        assert_eq!(DuplicateBlock::default().max_members(), DEFAULT_MAX_MEMBERS);
        assert_eq!(DuplicateBlock::new(8).max_members(), 8);
    }
}
