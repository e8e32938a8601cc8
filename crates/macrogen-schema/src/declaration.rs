//! Closed catalog of recognized declaration calls

use crate::value::ParamKind;
use serde::{Deserialize, Serialize};

/// Recognized declaration callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// `parameter_float(name, label, default, min, max, unit, dependency)`
    Float,
    /// `parameter_int(name, label, default, min, max, unit, dependency)`
    Integer,
    /// `parameter_check(name, label, default, dependency)`
    Check,
    /// `combobox(name, label, default, options, dependency)`
    Combobox,
    /// `dynamic_array(name, label_template, driver)`
    DynamicArray,
}

/// Argument role within a declaration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Name,
    Label,
    Default,
    Min,
    Max,
    Unit,
    Options,
    Dependency,
    Driver,
    Step,
    Even,
}

impl DeclarationKind {
    /// Resolve a callee identifier
    #[must_use]
    pub fn from_callee(callee: &str) -> Option<Self> {
        match callee {
            "parameter_float" => Some(Self::Float),
            "parameter_int" | "parameter_integer" => Some(Self::Integer),
            "parameter_check" | "parameter_bool" => Some(Self::Check),
            "combobox" | "parameter_enum" => Some(Self::Combobox),
            "dynamic_array" | "parameter_array" => Some(Self::DynamicArray),
            _ => None,
        }
    }

    /// Parameter kind declared by this call, `None` for array groups
    #[must_use]
    pub fn param_kind(self) -> Option<ParamKind> {
        match self {
            Self::Float => Some(ParamKind::Float),
            Self::Integer => Some(ParamKind::Integer),
            Self::Check => Some(ParamKind::Boolean),
            Self::Combobox => Some(ParamKind::Enumeration),
            Self::DynamicArray => None,
        }
    }

    /// Positional index of a slot
    #[must_use]
    pub fn position(self, slot: Slot) -> Option<usize> {
        use Slot::{Default, Dependency, Driver, Label, Max, Min, Name, Options, Unit};
        // Step and Even are named-only
        let layout: &[Slot] = match self {
            Self::Float | Self::Integer => &[Name, Label, Default, Min, Max, Unit, Dependency],
            Self::Check => &[Name, Label, Default, Dependency],
            Self::Combobox => &[Name, Label, Default, Options, Dependency],
            Self::DynamicArray => &[Name, Label, Driver],
        };
        layout.iter().position(|s| *s == slot)
    }

    /// Named-argument key for a slot
    #[must_use]
    pub fn key(slot: Slot) -> &'static [&'static str] {
        match slot {
            Slot::Name => &["name"],
            Slot::Label => &["label"],
            Slot::Default => &["default"],
            Slot::Min => &["min"],
            Slot::Max => &["max"],
            Slot::Unit => &["unit"],
            Slot::Options => &["options"],
            Slot::Dependency => &["depends_on", "dependency"],
            Slot::Driver => &["driver"],
            Slot::Step => &["step"],
            Slot::Even => &["even", "must_be_even"],
        }
    }
}
