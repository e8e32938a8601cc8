//! Language capability
//!
//! The phase machine never interprets free text itself. It asks a
//! [`LanguageCapability`] for the intent of each message, under a timeout,
//! and falls back to the local [`KeywordCapability`] when the call fails.

use crate::error::CapabilityError;
use crate::types::{Phase, Turn};
use indexmap::IndexMap;
use macrogen_catalog::{BlockCandidate, Catalog, Requirements};
use macrogen_schema::{format_decimal, BlockSchema, ParamKind, ParamValue, ParameterDescriptor};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// What the capability sees of the conversation for one message
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// Current user message, trimmed
    pub text: &'a str,
    pub phase: Phase,
    /// Recent turns, oldest first
    pub history: &'a VecDeque<Turn>,
    pub requirements: &'a Requirements,
    /// Candidates offered in Selecting
    pub candidates: &'a [BlockCandidate],
    /// Schema of the selected block
    pub schema: Option<&'a BlockSchema>,
    /// Parameter being collected
    pub descriptor: Option<&'a ParameterDescriptor>,
}

/// Intent of a message in Selecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionIntent {
    /// Choose the k-th candidate (1-based)
    Select(usize),
    /// Explain one candidate (1-based) or all of them
    Describe(Option<usize>),
    /// Change the requirements
    Back,
    Unclear,
}

/// Intent of a message in Collecting
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterIntent {
    /// A value for the current parameter (not yet validated)
    Provide(ParamValue),
    UseDefault,
    Help,
    Stop,
    Unparseable,
}

/// Natural-language understanding used by the phase machine
#[async_trait::async_trait]
pub trait LanguageCapability: Send + Sync + std::fmt::Debug {
    /// Requirement fields mentioned in the message
    async fn requirements(&self, ctx: &TurnContext<'_>) -> Result<Requirements, CapabilityError>;

    /// Intent of a message while candidates are shown
    async fn selection(&self, ctx: &TurnContext<'_>) -> Result<SelectionIntent, CapabilityError>;

    /// Intent of a message while a parameter is collected
    async fn parameter(&self, ctx: &TurnContext<'_>) -> Result<ParameterIntent, CapabilityError>;

    /// Explanation of the candidates or the current parameter
    async fn explain(&self, ctx: &TurnContext<'_>) -> Result<String, CapabilityError>;

    /// Parameter values already mentioned in the selecting message
    async fn prefill(
        &self,
        _ctx: &TurnContext<'_>,
    ) -> Result<IndexMap<String, ParamValue>, CapabilityError> {
        Ok(IndexMap::new())
    }

    /// Name for logs
    fn name(&self) -> &str;
}

static DIMENSIONALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([23])\s*-?\s*d\b").expect("valid regex"));
static ANY_MATERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bany\s+material\b|\bmaterial\s*:?\s*any\b").expect("valid regex"));
static HELP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bwhat\b.*\b(is|are|mean|means|does)\b|\bdescribe\b|\bexplain\b|\btell\b.*\babout\b|\bhelp\b|\bmore\b.*\binfo|\bdetails?\b|\?\s*$",
    )
    .expect("valid regex")
});
static BACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(back|go back|change|something else|start over|none of (these|them))\b")
        .expect("valid regex")
});
static AFFIRM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(yes|y|ok|okay|sure)\s*[.!]?\s*$").expect("valid regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").expect("valid regex"));
static USE_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(default|standard|skip|keep it|as is)\b").expect("valid regex")
});
static STOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(stop|cancel|quit|abort)\b").expect("valid regex"));

/// Local, regex-driven capability
///
/// Understands structure types and materials listed in the catalog, `2D` /
/// `3D`, candidate numbers, and parameter values typed directly.
#[derive(Debug, Clone, Default)]
pub struct KeywordCapability {
    structure_types: Vec<String>,
    materials: Vec<String>,
}

impl KeywordCapability {
    /// Vocabulary taken from the catalog
    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::from_candidates(catalog.candidates())
    }

    /// Vocabulary taken from candidates
    #[must_use]
    pub fn from_candidates(candidates: &[BlockCandidate]) -> Self {
        let collect = |field: fn(&BlockCandidate) -> &str| {
            let mut words: Vec<String> = candidates
                .iter()
                .map(|c| field(c).trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            // Longest first so "space frame" wins over "frame"
            words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            words
        };
        Self {
            structure_types: collect(|c| c.main_member.as_str()),
            materials: collect(|c| c.material.as_str()),
        }
    }

    /// Requirement fields found in the text
    #[must_use]
    pub fn extract_requirements(&self, ctx: &TurnContext<'_>) -> Requirements {
        let text = ctx.text.to_lowercase();
        let mut update = Requirements::new();
        if let Some(caps) = DIMENSIONALITY.captures(&text) {
            update.dimensionality = Some(format!("{}D", &caps[1]));
        }
        update.structure_type = find_word(&text, &self.structure_types);
        update.material = if ANY_MATERIAL.is_match(&text) {
            Some("any".to_string())
        } else {
            find_word(&text, &self.materials)
        };
        debug!(requirements = %update, "keyword requirements");
        update
    }

    /// Selection intent of the text
    #[must_use]
    pub fn classify_selection(&self, ctx: &TurnContext<'_>) -> SelectionIntent {
        let text = ctx.text.trim();
        let number = NUMBER
            .captures(text)
            .and_then(|caps| caps[1].parse::<usize>().ok());

        if BACK.is_match(text) {
            SelectionIntent::Back
        } else if HELP.is_match(text) {
            SelectionIntent::Describe(number)
        } else if let Some(k) = number {
            SelectionIntent::Select(k)
        } else if AFFIRM.is_match(text) && ctx.candidates.len() == 1 {
            SelectionIntent::Select(1)
        } else {
            SelectionIntent::Unclear
        }
    }

    /// Parameter intent of the text
    #[must_use]
    pub fn classify_parameter(&self, ctx: &TurnContext<'_>) -> ParameterIntent {
        let text = ctx.text.trim();
        if text.is_empty() {
            return ParameterIntent::UseDefault;
        }
        if HELP.is_match(text) {
            return ParameterIntent::Help;
        }
        if USE_DEFAULT.is_match(text) {
            return ParameterIntent::UseDefault;
        }
        if STOP.is_match(text) {
            return ParameterIntent::Stop;
        }
        ctx.descriptor
            .and_then(|d| d.coerce_text(text))
            .map_or(ParameterIntent::Unparseable, ParameterIntent::Provide)
    }

    /// Explanation built from catalog and schema data
    #[must_use]
    pub fn describe(&self, ctx: &TurnContext<'_>) -> String {
        if let Some(descriptor) = ctx.descriptor {
            return describe_parameter(descriptor);
        }
        let focus = NUMBER
            .captures(ctx.text)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .and_then(|k| k.checked_sub(1))
            .and_then(|i| ctx.candidates.get(i).map(|c| (i, c)));
        match focus {
            Some((i, candidate)) => describe_candidate(i + 1, candidate),
            None => ctx
                .candidates
                .iter()
                .enumerate()
                .map(|(i, c)| describe_candidate(i + 1, c))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Numeric values written as `name = 4.5` or `<label> 12` in the text
    #[must_use]
    pub fn extract_values(&self, ctx: &TurnContext<'_>) -> IndexMap<String, ParamValue> {
        let mut values = IndexMap::new();
        let Some(schema) = ctx.schema else {
            return values;
        };
        for descriptor in schema.iter().filter(|d| d.kind.is_numeric()) {
            let pattern = format!(
                r"(?:\b{}\s*(?:=|:)|(?i:\b{}\b)\s*(?:=|:|is|to|of)?)\s*(-?\d+(?:\.\d+)?)",
                regex::escape(&descriptor.name),
                regex::escape(&descriptor.label),
            );
            let Ok(re) = Regex::new(&pattern) else {
                continue;
            };
            if let Some(value) = re
                .captures(ctx.text)
                .and_then(|caps| descriptor.coerce_text(&caps[1]))
            {
                values.insert(descriptor.name.clone(), value);
            }
        }
        values
    }
}

#[async_trait::async_trait]
impl LanguageCapability for KeywordCapability {
    async fn requirements(&self, ctx: &TurnContext<'_>) -> Result<Requirements, CapabilityError> {
        Ok(self.extract_requirements(ctx))
    }

    async fn selection(&self, ctx: &TurnContext<'_>) -> Result<SelectionIntent, CapabilityError> {
        Ok(self.classify_selection(ctx))
    }

    async fn parameter(&self, ctx: &TurnContext<'_>) -> Result<ParameterIntent, CapabilityError> {
        Ok(self.classify_parameter(ctx))
    }

    async fn explain(&self, ctx: &TurnContext<'_>) -> Result<String, CapabilityError> {
        Ok(self.describe(ctx))
    }

    async fn prefill(
        &self,
        ctx: &TurnContext<'_>,
    ) -> Result<IndexMap<String, ParamValue>, CapabilityError> {
        Ok(self.extract_values(ctx))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn find_word(text: &str, vocabulary: &[String]) -> Option<String> {
    vocabulary
        .iter()
        .find(|word| {
            Regex::new(&format!(r"\b{}(e?s)?\b", regex::escape(word)))
                .is_ok_and(|re| re.is_match(text))
        })
        .cloned()
}

fn describe_candidate(index: usize, candidate: &BlockCandidate) -> String {
    let mut line = format!(
        "{index}. {} ({} {}, {})",
        candidate.name, candidate.dimensionality, candidate.main_member, candidate.material
    );
    if let Some(summary) = candidate.summary() {
        line.push_str(": ");
        line.push_str(summary);
    }
    line
}

fn describe_parameter(descriptor: &ParameterDescriptor) -> String {
    let unit = descriptor
        .unit
        .as_deref()
        .map(|u| format!(" {u}"))
        .unwrap_or_default();
    let mut text = format!(
        "'{}' ({}) is a {} parameter; default {}{unit}.",
        descriptor.label, descriptor.name, descriptor.kind, descriptor.default.value
    );
    let c = &descriptor.constraints;
    match (c.min, c.max) {
        (Some(min), Some(max)) => text.push_str(&format!(
            " Allowed range {} to {}{unit}.",
            format_decimal(min),
            format_decimal(max)
        )),
        (Some(min), None) => text.push_str(&format!(" At least {}{unit}.", format_decimal(min))),
        (None, Some(max)) => text.push_str(&format!(" At most {}{unit}.", format_decimal(max))),
        (None, None) => {}
    }
    if descriptor.kind == ParamKind::Enumeration && !c.options.is_empty() {
        text.push_str(&format!(" Options: {}.", c.options.join(", ")));
    }
    if let Some(dependency) = &descriptor.dependency {
        text.push_str(&format!(" Only used when {dependency}."));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrogen_schema::extract;
    use macrogen_test_utils as fixtures;
    use pretty_assertions::assert_eq;

    struct Fixture {
        history: VecDeque<Turn>,
        requirements: Requirements,
        candidates: Vec<BlockCandidate>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                history: VecDeque::new(),
                requirements: Requirements::new(),
                candidates: fixtures::candidates(),
            }
        }

        fn ctx<'a>(&'a self, text: &'a str, phase: Phase) -> TurnContext<'a> {
            TurnContext {
                text,
                phase,
                history: &self.history,
                requirements: &self.requirements,
                candidates: &self.candidates,
                schema: None,
                descriptor: None,
            }
        }
    }

    #[test]
    fn extracts_dimension_type_and_material() {
        let f = Fixture::new();
        let keywords = KeywordCapability::from_candidates(&f.candidates);
        let update =
            keywords.extract_requirements(&f.ctx("I need a 2-D steel truss", Phase::Understanding));
        assert_eq!(update.dimensionality.as_deref(), Some("2D"));
        assert_eq!(update.structure_type.as_deref(), Some("truss"));
        assert_eq!(update.material.as_deref(), Some("steel"));

        let update = keywords.extract_requirements(&f.ctx("any material is fine", Phase::Understanding));
        assert_eq!(update.material.as_deref(), Some("any"));
    }

    #[test]
    fn plural_structure_types_are_recognized() {
        let f = Fixture::new();
        let keywords = KeywordCapability::from_candidates(&f.candidates);
        let update = keywords.extract_requirements(&f.ctx("show me 3d frames", Phase::Understanding));
        assert_eq!(update.dimensionality.as_deref(), Some("3D"));
        assert_eq!(update.structure_type.as_deref(), Some("frame"));
    }

    #[test]
    fn selection_intents() {
        let mut f = Fixture::new();
        let keywords = KeywordCapability::from_candidates(&f.candidates);
        let classify = |f: &Fixture, text: &str| keywords.classify_selection(&f.ctx(text, Phase::Selecting));

        assert_eq!(classify(&f, "2"), SelectionIntent::Select(2));
        assert_eq!(classify(&f, "I'll take number 3"), SelectionIntent::Select(3));
        assert_eq!(classify(&f, "what is 1?"), SelectionIntent::Describe(Some(1)));
        assert_eq!(classify(&f, "go back"), SelectionIntent::Back);
        assert_eq!(classify(&f, "yes"), SelectionIntent::Unclear);

        f.candidates.truncate(1);
        assert_eq!(classify(&f, "yes"), SelectionIntent::Select(1));
    }

    #[test]
    fn parameter_intents() {
        let f = Fixture::new();
        let keywords = KeywordCapability::default();
        let schema = extract(&fixtures::span_source()).unwrap();
        let span = schema.get("L").unwrap();
        let classify = |text: &str| {
            let mut ctx = f.ctx(text, Phase::Collecting);
            ctx.descriptor = Some(span);
            keywords.classify_parameter(&ctx)
        };

        assert_eq!(classify("15.5 m"), ParameterIntent::Provide(ParamValue::Float(15.5)));
        assert_eq!(classify(""), ParameterIntent::UseDefault);
        assert_eq!(classify("use the default"), ParameterIntent::UseDefault);
        assert_eq!(classify("what does this mean"), ParameterIntent::Help);
        assert_eq!(classify("cancel this"), ParameterIntent::Stop);
        assert_eq!(classify("banana"), ParameterIntent::Unparseable);
    }

    #[test]
    fn prefill_reads_named_and_labelled_values() {
        let f = Fixture::new();
        let keywords = KeywordCapability::default();
        let schema = extract(&fixtures::truss_source()).unwrap();
        let mut ctx = f.ctx("number 1 please, with span 20 and h_2 = 4.5", Phase::Selecting);
        ctx.schema = Some(&schema);

        let values = keywords.extract_values(&ctx);
        assert_eq!(values.get("L"), Some(&ParamValue::Float(20.0)));
        assert_eq!(values.get("h_2"), Some(&ParamValue::Float(4.5)));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn describes_parameter_from_schema() {
        let schema = extract(&fixtures::span_source()).unwrap();
        let text = describe_parameter(schema.get("L").unwrap());
        assert_eq!(
            text,
            "'Span' (L) is a float parameter; default 10.0 m. Allowed range 1.0 to 50.0 m."
        );
    }
}
