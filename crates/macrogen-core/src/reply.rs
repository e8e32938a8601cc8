//! What the engine answers for one message
//!
//! A [`Reply`] is structured; rendering it as chat text is up to the
//! transport. The `Display` impl gives a plain-text rendering used by the
//! CLI and recorded in the session history.

use crate::types::Phase;
use macrogen_catalog::{BlockCandidate, RequirementField, Requirements};
use macrogen_schema::{format_decimal, ParamKind, ParamValue, ParameterDescriptor};
use macrogen_synth::SynthesizedScript;
use macrogen_template::BlockId;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Question for the parameter under the cursor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterPrompt {
    pub name: String,
    pub label: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub options: Vec<String>,
    /// 1-based position among the parameters of the block
    pub index: usize,
    pub total: usize,
}

impl ParameterPrompt {
    pub(crate) fn new(descriptor: &ParameterDescriptor, index: usize, total: usize) -> Self {
        Self {
            name: descriptor.name.clone(),
            label: descriptor.label.clone(),
            kind: descriptor.kind,
            default: descriptor.default.value.clone(),
            unit: descriptor.unit.clone(),
            min: descriptor.constraints.min,
            max: descriptor.constraints.max,
            options: descriptor.constraints.options.clone(),
            index,
            total,
        }
    }
}

impl Display for ParameterPrompt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.index, self.total, self.label)?;
        if let Some(unit) = &self.unit {
            write!(f, " [{unit}]")?;
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                write!(f, " ({} to {})", format_decimal(min), format_decimal(max))?;
            }
            (Some(min), None) => write!(f, " (at least {})", format_decimal(min))?,
            (None, Some(max)) => write!(f, " (at most {})", format_decimal(max))?,
            (None, None) => {}
        }
        if !self.options.is_empty() {
            write!(f, " options: {}", self.options.join(", "))?;
        }
        write!(f, ", default {}", self.default)
    }
}

/// One observable outcome of a message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplyEvent {
    RequirementsUpdated {
        requirements: Requirements,
    },
    /// Required fields still unknown, with values the catalog offers for the first
    MissingFields {
        fields: Vec<RequirementField>,
        options: Vec<String>,
    },
    NoMatch {
        requirements: Requirements,
    },
    Candidates {
        candidates: Vec<BlockCandidate>,
    },
    Explanation {
        text: String,
    },
    Selected {
        block_id: BlockId,
        name: String,
        parameters: usize,
    },
    InvalidSelection {
        count: usize,
    },
    /// Still waiting for a choice among the listed candidates
    ChooseCandidate {
        count: usize,
    },
    Prompt {
        prompt: ParameterPrompt,
    },
    Stored {
        name: String,
        label: String,
        value: ParamValue,
    },
    /// Value rejected; the same parameter is asked again
    Invalid {
        name: String,
        message: String,
    },
    DefaultUsed {
        name: String,
        label: String,
        value: ParamValue,
    },
    Generated {
        script: SynthesizedScript,
    },
    Written {
        path: PathBuf,
    },
    Restarted,
    Stopped,
    WentBack,
    /// Language capability failed; the keyword fallback answered instead
    CapabilityFallback {
        operation: String,
        reason: String,
    },
}

impl Display for ReplyEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequirementsUpdated { requirements } => write!(f, "Requirements: {requirements}"),
            Self::MissingFields { fields, options } => {
                let names: Vec<&str> = fields.iter().map(|field| field.as_str()).collect();
                write!(f, "Please tell me the {}", names.join(" and "))?;
                if !options.is_empty() {
                    write!(f, " (available: {})", options.join(", "))?;
                }
                Ok(())
            }
            Self::NoMatch { requirements } => {
                write!(f, "No block matches {requirements}. Try different requirements.")
            }
            Self::Candidates { candidates } => {
                writeln!(f, "Matching blocks:")?;
                for (i, c) in candidates.iter().enumerate() {
                    writeln!(f, "  {}. {} ({})", i + 1, c.name, c.material)?;
                }
                write!(f, "Which one would you like? (enter a number)")
            }
            Self::Explanation { text } => f.write_str(text),
            Self::Selected {
                name, parameters, ..
            } => write!(f, "Selected: {name} ({parameters} parameters)"),
            Self::InvalidSelection { count } => write!(f, "Please enter a number (1-{count})"),
            Self::ChooseCandidate { count } => {
                write!(f, "Which one would you like? (1-{count}, or 'back')")
            }
            Self::Prompt { prompt } => write!(f, "{prompt}"),
            Self::Stored { label, value, .. } => write!(f, "{label} = {value}"),
            Self::Invalid { message, .. } => write!(f, "Invalid value: {message}"),
            Self::DefaultUsed { label, value, .. } => write!(f, "{label} = {value} (default)"),
            Self::Generated { script } => write!(f, "Generated script:\n{}", script.text()),
            Self::Written { path } => write!(f, "Saved to {}", path.display()),
            Self::Restarted => f.write_str("Starting over. What structure do you need?"),
            Self::Stopped => f.write_str("Stopped. What else can I help you with?"),
            Self::WentBack => f.write_str("No problem. What would you like instead?"),
            Self::CapabilityFallback { operation, .. } => {
                write!(f, "(answered {operation} locally)")
            }
        }
    }
}

/// Reply to one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// Phase after the message was handled
    pub phase: Phase,
    pub events: Vec<ReplyEvent>,
}

impl Reply {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Understanding,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, event: ReplyEvent) {
        self.events.push(event);
    }

    /// The generated script, if this reply finished a block
    #[must_use]
    pub fn script(&self) -> Option<&SynthesizedScript> {
        self.events.iter().find_map(|e| match e {
            ReplyEvent::Generated { script } => Some(script),
            _ => None,
        })
    }

    /// The prompt for the next parameter, if any
    #[must_use]
    pub fn prompt(&self) -> Option<&ParameterPrompt> {
        self.events.iter().find_map(|e| match e {
            ReplyEvent::Prompt { prompt } => Some(prompt),
            _ => None,
        })
    }

    /// Check if an event matching `pred` was emitted
    pub fn has(&self, pred: impl Fn(&ReplyEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{event}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrogen_schema::extract;
    use macrogen_test_utils as fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn prompt_lists_unit_range_and_default() {
        let schema = extract(&fixtures::span_source()).unwrap();
        let prompt = ParameterPrompt::new(schema.get("L").unwrap(), 1, 3);
        assert_eq!(prompt.to_string(), "[1/3] Span [m] (1.0 to 50.0), default 10.0");
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(ReplyEvent::InvalidSelection { count: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"event": "invalid_selection", "count": 4}));
    }
}
