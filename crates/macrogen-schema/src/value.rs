//! Typed parameter values and their validation errors

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Declared kind of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Real number
    Float,
    /// Whole number
    Integer,
    /// Check box
    Boolean,
    /// One of a fixed set of options
    Enumeration,
}

impl ParamKind {
    /// Human-readable name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Enumeration => "enumeration",
        }
    }

    /// Whether values of this kind are numeric
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Float | Self::Integer)
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved parameter value
///
/// Deserializes untagged: JSON `true` is a boolean, `3` an integer, `3.5`
/// a float and `"define_L1"` a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Choice(String),
}

impl ParamValue {
    /// Numeric view (integers widen to f64)
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view (floats with no fractional part narrow)
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Boolean view
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Choice view
    #[inline]
    #[must_use]
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Short description of the value's shape, for error messages
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Choice(_) => "text",
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&format_decimal(*v)),
            Self::Choice(s) => f.write_str(s),
        }
    }
}

/// Canonical decimal rendering of a float
///
/// Whole numbers keep one fractional digit (`15.0`), everything else uses
/// the shortest round-tripping form (`15.5`). Never uses exponent notation.
#[must_use]
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// A value rejected by a descriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{name}: expected {expected} value, got {found}")]
    KindMismatch {
        name: String,
        expected: ParamKind,
        found: String,
    },

    #[error("{name}: value must be a finite number")]
    NotFinite { name: String },

    #[error("{name}: {value} is below the minimum {min}")]
    BelowMinimum { name: String, value: f64, min: f64 },

    #[error("{name}: {value} is above the maximum {max}")]
    AboveMaximum { name: String, value: f64, max: f64 },

    #[error("{name}: {value} is not a multiple of step {step}")]
    OffStep { name: String, value: f64, step: f64 },

    #[error("{name}: {value} must be an even number")]
    NotEven { name: String, value: i64 },

    #[error("{name}: '{value}' is not one of {options:?}")]
    NotAnOption {
        name: String,
        value: String,
        options: Vec<String>,
    },

    #[error("{name}: {value} members requested but the template declares at most {capacity}")]
    TooManyMembers {
        name: String,
        value: i64,
        capacity: usize,
    },
}

impl ValidationError {
    /// Name of the offending parameter
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::KindMismatch { name, .. }
            | Self::NotFinite { name }
            | Self::BelowMinimum { name, .. }
            | Self::AboveMaximum { name, .. }
            | Self::OffStep { name, .. }
            | Self::NotEven { name, .. }
            | Self::NotAnOption { name, .. }
            | Self::TooManyMembers { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_decimal_forms() {
        assert_eq!(format_decimal(15.5), "15.5");
        assert_eq!(format_decimal(15.0), "15.0");
        assert_eq!(format_decimal(-0.25), "-0.25");
        assert_eq!(format_decimal(0.1), "0.1");
    }

    #[test]
    fn untagged_json_shapes() {
        let values: Vec<ParamValue> = serde_json::from_str(r#"[true, 3, 3.5, "define_L1"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Boolean(true),
                ParamValue::Integer(3),
                ParamValue::Float(3.5),
                ParamValue::Choice("define_L1".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_views() {
        assert_eq!(ParamValue::Integer(4).as_f64(), Some(4.0));
        assert_eq!(ParamValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(ParamValue::Float(4.5).as_i64(), None);
        assert_eq!(ParamValue::Choice("x".into()).as_f64(), None);
    }

    #[test]
    fn validation_error_names_parameter() {
        let err = ValidationError::NotEven {
            name: "n".to_string(),
            value: 5,
        };
        assert_eq!(err.parameter(), "n");
        assert!(err.to_string().contains("even"));
    }
}
