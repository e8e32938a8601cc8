//! Parameter descriptors and block schemas

use crate::declaration::DeclarationKind;
use crate::value::{ParamKind, ParamValue, ValidationError};
use indexmap::IndexMap;
use macrogen_template::{BlockId, ContentHash};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// How a default literal was written in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralStyle {
    Number,
    /// String literal with its quote character
    Quoted(char),
    /// Bare identifier or member path
    Bare,
    Bool,
}

/// Default value of a descriptor with its exact source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultLiteral {
    /// Original literal text
    pub text: String,
    /// Byte range `[start, end)` of the literal
    pub range: Range<usize>,
    pub style: LiteralStyle,
    /// Parsed value
    pub value: ParamValue,
}

/// Value constraints declared alongside a parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub must_be_even: bool,
    /// Allowed values for enumerations (empty = unrestricted)
    pub options: Vec<String>,
}

/// One tunable parameter discovered in a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Unique within the schema
    pub name: String,
    pub kind: ParamKind,
    pub label: String,
    pub unit: Option<String>,
    pub default: DefaultLiteral,
    pub constraints: Constraints,
    /// Dependency predicate source text
    pub dependency: Option<String>,
    pub is_dynamic_array_member: bool,
    /// Count-type descriptor controlling this member
    pub array_driver: Option<String>,
    /// 1-based member index within its group
    pub member_index: Option<usize>,
    pub declaration: DeclarationKind,
    pub call_range: Range<usize>,
    pub statement_range: Range<usize>,
    pub name_range: Range<usize>,
    pub label_range: Option<Range<usize>>,
}

impl ParameterDescriptor {
    /// Default value
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> &ParamValue {
        &self.default.value
    }

    /// Check a value against kind and constraints
    ///
    /// Returns the value normalized to this descriptor's kind (an integral
    /// float for an integer parameter becomes an integer, and so on).
    ///
    /// # Errors
    /// The first violated rule as a [`ValidationError`]
    pub fn validate(&self, value: &ParamValue) -> Result<ParamValue, ValidationError> {
        match self.kind {
            ParamKind::Float => {
                let v = value.as_f64().ok_or_else(|| self.mismatch(value))?;
                self.check_number(v)?;
                Ok(ParamValue::Float(v))
            }
            ParamKind::Integer => {
                let v = value.as_i64().ok_or_else(|| self.mismatch(value))?;
                #[allow(clippy::cast_precision_loss)]
                self.check_number(v as f64)?;
                if self.constraints.must_be_even && v % 2 != 0 {
                    return Err(ValidationError::NotEven {
                        name: self.name.clone(),
                        value: v,
                    });
                }
                Ok(ParamValue::Integer(v))
            }
            ParamKind::Boolean => value
                .as_bool()
                .map(ParamValue::Boolean)
                .ok_or_else(|| self.mismatch(value)),
            ParamKind::Enumeration => {
                let choice = value.as_choice().ok_or_else(|| self.mismatch(value))?;
                if self.constraints.options.is_empty() {
                    return Ok(ParamValue::Choice(choice.to_string()));
                }
                self.constraints
                    .options
                    .iter()
                    .find(|o| o.eq_ignore_ascii_case(choice.trim()))
                    .map(|o| ParamValue::Choice(o.clone()))
                    .ok_or_else(|| ValidationError::NotAnOption {
                        name: self.name.clone(),
                        value: choice.to_string(),
                        options: self.constraints.options.clone(),
                    })
            }
        }
    }

    /// Interpret free user text as a value of this descriptor's kind
    ///
    /// Returns `None` when nothing in the text can be read as such a value.
    /// The result is not validated.
    #[must_use]
    pub fn coerce_text(&self, text: &str) -> Option<ParamValue> {
        let text = text.trim();
        match self.kind {
            ParamKind::Float => first_number(text).map(ParamValue::Float),
            #[allow(clippy::cast_possible_truncation)]
            ParamKind::Integer => first_number(text)
                .filter(|n| n.fract() == 0.0)
                .map(|n| ParamValue::Integer(n as i64)),
            ParamKind::Boolean => parse_bool(text).map(ParamValue::Boolean),
            ParamKind::Enumeration => self.match_option(text).map(ParamValue::Choice),
        }
    }

    fn match_option(&self, text: &str) -> Option<String> {
        let options = &self.constraints.options;
        if options.is_empty() {
            return (!text.is_empty()).then(|| text.to_string());
        }
        if let Some(exact) = options.iter().find(|o| o.eq_ignore_ascii_case(text)) {
            return Some(exact.clone());
        }
        if let Ok(index) = text.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| options.get(i)).cloned();
        }
        let lowered = text.to_lowercase();
        options
            .iter()
            .filter(|o| lowered.contains(&o.to_lowercase()))
            .max_by_key(|o| o.len())
            .cloned()
    }

    fn check_number(&self, v: f64) -> Result<(), ValidationError> {
        let name = || self.name.clone();
        if !v.is_finite() {
            return Err(ValidationError::NotFinite { name: name() });
        }
        if let Some(min) = self.constraints.min {
            if v < min {
                return Err(ValidationError::BelowMinimum { name: name(), value: v, min });
            }
        }
        if let Some(max) = self.constraints.max {
            if v > max {
                return Err(ValidationError::AboveMaximum { name: name(), value: v, max });
            }
        }
        if let Some(step) = self.constraints.step.filter(|s| *s > 0.0) {
            let base = self.constraints.min.unwrap_or(0.0);
            let q = (v - base) / step;
            if (q - q.round()).abs() > 1e-9 * q.abs().max(1.0) {
                return Err(ValidationError::OffStep { name: name(), value: v, step });
            }
        }
        Ok(())
    }

    fn mismatch(&self, value: &ParamValue) -> ValidationError {
        ValidationError::KindMismatch {
            name: self.name.clone(),
            expected: self.kind,
            found: value.shape().to_string(),
        }
    }
}

/// A dynamic array declaration and its pre-declared members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayGroup {
    pub name: String,
    /// Label with `{i}` standing for the member index
    pub label_template: String,
    /// Integer descriptor holding the member count
    pub driver: String,
    pub declaration_range: Range<usize>,
    /// Member descriptor names in source order
    pub members: Vec<String>,
}

impl ArrayGroup {
    /// Name of the k-th member
    #[must_use]
    pub fn member_name(&self, index: usize) -> String {
        format!("{}_{index}", self.name)
    }

    /// Label of the k-th member
    #[must_use]
    pub fn label_for(&self, index: usize) -> String {
        self.label_template.replace("{i}", &index.to_string())
    }

    /// 1-based index encoded in a member name, if it belongs to this group
    #[must_use]
    pub fn index_of(&self, member: &str) -> Option<usize> {
        member
            .strip_prefix(self.name.as_str())?
            .strip_prefix('_')?
            .parse()
            .ok()
            .filter(|k| *k >= 1)
    }
}

/// Ordered parameter schema of one template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    pub block_id: BlockId,
    pub source_hash: ContentHash,
    pub descriptors: Vec<ParameterDescriptor>,
    pub groups: Vec<ArrayGroup>,
}

impl BlockSchema {
    /// Descriptor by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Position of a descriptor in source order
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    /// Descriptors in source order
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.descriptors.iter()
    }

    /// Number of descriptors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if there are no descriptors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Array group by name
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ArrayGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Array group whose member naming matches `name`
    ///
    /// Also matches members the template does not declare (`h_7` when only
    /// `h_1..h_3` exist).
    #[must_use]
    pub fn group_of(&self, name: &str) -> Option<(&ArrayGroup, usize)> {
        self.groups
            .iter()
            .find_map(|g| g.index_of(name).map(|k| (g, k)))
    }

    /// Array group driven by a count descriptor
    #[must_use]
    pub fn group_driven_by(&self, driver: &str) -> Option<&ArrayGroup> {
        self.groups.iter().find(|g| g.driver == driver)
    }

    /// Default values by name, in source order
    #[must_use]
    pub fn defaults(&self) -> IndexMap<String, ParamValue> {
        self.descriptors
            .iter()
            .map(|d| (d.name.clone(), d.default.value.clone()))
            .collect()
    }

    /// Declared member of a group with the highest index
    ///
    /// Generated members are copies of this one.
    #[must_use]
    pub fn last_member(&self, group: &ArrayGroup) -> Option<&ParameterDescriptor> {
        group
            .members
            .iter()
            .filter_map(|name| self.get(name))
            .filter(|d| d.member_index.is_some())
            .max_by_key(|d| d.member_index)
    }

    /// Highest declared member index of a group (0 without members)
    #[must_use]
    pub fn declared_max(&self, group: &ArrayGroup) -> usize {
        self.last_member(group)
            .and_then(|d| d.member_index)
            .unwrap_or(0)
    }

    /// Member count the template text is written for: the driver's default
    #[must_use]
    pub fn builtin_count(&self, group: &ArrayGroup) -> usize {
        self.get(&group.driver)
            .and_then(|d| d.default_value().as_i64())
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    /// Indices in `1..=count` without a declared member, ascending
    #[must_use]
    pub fn undeclared_members(&self, group: &ArrayGroup, count: usize) -> Vec<usize> {
        (1..=count)
            .filter(|k| self.get(&group.member_name(*k)).is_none())
            .collect()
    }

    /// Descriptor governing a declared or generated parameter
    ///
    /// Undeclared members of a group (`h_7`) share the constraints of the
    /// group's [`last_member`](Self::last_member).
    #[must_use]
    pub fn descriptor_for(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.get(name).or_else(|| {
            self.group_of(name)
                .and_then(|(group, _)| self.last_member(group))
        })
    }
}

fn first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let next_is_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if c.is_ascii_digit() || ((c == b'-' || c == b'.') && next_is_digit) {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b'.') {
                j += 1;
            }
            if let Ok(v) = text[i..j].parse::<f64>() {
                return Some(v);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    None
}

fn parse_bool(text: &str) -> Option<bool> {
    let word = text
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())?
        .to_lowercase();
    match word.as_str() {
        "yes" | "y" | "true" | "on" | "1" | "checked" | "enable" | "enabled" => Some(true),
        "no" | "n" | "false" | "off" | "0" | "unchecked" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: ParamKind, constraints: Constraints) -> ParameterDescriptor {
        let value = match kind {
            ParamKind::Float => ParamValue::Float(10.0),
            ParamKind::Integer => ParamValue::Integer(6),
            ParamKind::Boolean => ParamValue::Boolean(true),
            ParamKind::Enumeration => ParamValue::Choice("steel".to_string()),
        };
        ParameterDescriptor {
            name: "p".to_string(),
            kind,
            label: "P".to_string(),
            unit: None,
            default: DefaultLiteral {
                text: value.to_string(),
                range: 0..1,
                style: LiteralStyle::Number,
                value,
            },
            constraints,
            dependency: None,
            is_dynamic_array_member: false,
            array_driver: None,
            member_index: None,
            declaration: DeclarationKind::Float,
            call_range: 0..1,
            statement_range: 0..1,
            name_range: 0..1,
            label_range: None,
        }
    }

    #[test]
    fn float_bounds() {
        let d = descriptor(
            ParamKind::Float,
            Constraints {
                min: Some(1.0),
                max: Some(50.0),
                ..Constraints::default()
            },
        );
        assert_eq!(d.validate(&ParamValue::Integer(15)), Ok(ParamValue::Float(15.0)));
        assert!(matches!(
            d.validate(&ParamValue::Float(0.5)),
            Err(ValidationError::BelowMinimum { .. })
        ));
        assert!(matches!(
            d.validate(&ParamValue::Float(51.0)),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(matches!(
            d.validate(&ParamValue::Float(f64::NAN)),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn integer_even_and_step() {
        let d = descriptor(
            ParamKind::Integer,
            Constraints {
                min: Some(2.0),
                step: Some(2.0),
                must_be_even: true,
                ..Constraints::default()
            },
        );
        assert_eq!(d.validate(&ParamValue::Float(8.0)), Ok(ParamValue::Integer(8)));
        assert!(matches!(
            d.validate(&ParamValue::Integer(7)),
            Err(ValidationError::OffStep { .. })
        ));
        assert!(matches!(
            d.validate(&ParamValue::Float(6.5)),
            Err(ValidationError::KindMismatch { .. })
        ));
    }

    #[test]
    fn enumeration_options() {
        let d = descriptor(
            ParamKind::Enumeration,
            Constraints {
                options: vec!["steel".to_string(), "timber".to_string()],
                ..Constraints::default()
            },
        );
        assert_eq!(
            d.validate(&ParamValue::Choice("Timber".to_string())),
            Ok(ParamValue::Choice("timber".to_string()))
        );
        assert!(matches!(
            d.validate(&ParamValue::Choice("glass".to_string())),
            Err(ValidationError::NotAnOption { .. })
        ));
        assert_eq!(d.coerce_text("2"), Some(ParamValue::Choice("timber".to_string())));
        assert_eq!(
            d.coerce_text("use timber please"),
            Some(ParamValue::Choice("timber".to_string()))
        );
    }

    #[test]
    fn coerces_free_text() {
        let f = descriptor(ParamKind::Float, Constraints::default());
        assert_eq!(f.coerce_text("make it 15.5 m"), Some(ParamValue::Float(15.5)));
        assert_eq!(f.coerce_text("-2"), Some(ParamValue::Float(-2.0)));
        assert_eq!(f.coerce_text("no idea"), None);

        let i = descriptor(ParamKind::Integer, Constraints::default());
        assert_eq!(i.coerce_text("8 bays"), Some(ParamValue::Integer(8)));
        assert_eq!(i.coerce_text("2.5"), None);

        let b = descriptor(ParamKind::Boolean, Constraints::default());
        assert_eq!(b.coerce_text("Yes, please"), Some(ParamValue::Boolean(true)));
        assert_eq!(b.coerce_text("off"), Some(ParamValue::Boolean(false)));
    }

    #[test]
    fn group_member_naming() {
        let group = ArrayGroup {
            name: "h".to_string(),
            label_template: "Height {i}".to_string(),
            driver: "n".to_string(),
            declaration_range: 0..1,
            members: vec!["h_1".to_string()],
        };
        assert_eq!(group.member_name(4), "h_4");
        assert_eq!(group.label_for(4), "Height 4");
        assert_eq!(group.index_of("h_12"), Some(12));
        assert_eq!(group.index_of("h_0"), None);
        assert_eq!(group.index_of("hx_1"), None);
    }
}
