//! Candidate matching
//!
//! Exact, case-insensitive field comparison. No fuzzy or synonym matching.

use crate::candidate::BlockCandidate;
use crate::requirements::Requirements;
use std::collections::BTreeSet;

/// Candidates satisfying every set requirement, in catalog order
///
/// Unset requirement fields impose nothing, so empty requirements return
/// the catalog unchanged.
#[must_use]
pub fn filter(catalog: &[BlockCandidate], requirements: &Requirements) -> Vec<BlockCandidate> {
    catalog
        .iter()
        .filter(|c| matches(c, requirements))
        .cloned()
        .collect()
}

/// Check one candidate against requirements
#[must_use]
pub fn matches(candidate: &BlockCandidate, requirements: &Requirements) -> bool {
    field_matches(requirements.dimensionality.as_deref(), &candidate.dimensionality)
        && field_matches(requirements.structure_type.as_deref(), &candidate.main_member)
        && field_matches(requirements.material.as_deref(), &candidate.material)
        && field_matches(
            requirements.application.as_deref(),
            candidate.application.as_deref().unwrap_or(""),
        )
}

/// Distinct structure types (lower-cased, sorted) for a dimensionality
#[must_use]
pub fn structure_types(catalog: &[BlockCandidate], dimensionality: Option<&str>) -> Vec<String> {
    distinct(
        catalog
            .iter()
            .filter(|c| field_matches(dimensionality, &c.dimensionality))
            .map(|c| c.main_member.as_str()),
    )
}

/// Distinct materials (lower-cased, sorted) for a dimensionality and structure type
#[must_use]
pub fn materials(
    catalog: &[BlockCandidate],
    dimensionality: Option<&str>,
    structure_type: Option<&str>,
) -> Vec<String> {
    distinct(
        catalog
            .iter()
            .filter(|c| field_matches(dimensionality, &c.dimensionality))
            .filter(|c| field_matches(structure_type, &c.main_member))
            .map(|c| c.material.as_str()),
    )
}

fn field_matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.map_or(true, |w| w.trim().eq_ignore_ascii_case(actual.trim()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
