//! Requirement sets gathered during the conversation

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Requirement field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementField {
    Dimensionality,
    StructureType,
    Material,
    Application,
}

impl RequirementField {
    /// All fields in canonical order
    pub const ALL: [Self; 4] = [
        Self::Dimensionality,
        Self::StructureType,
        Self::Material,
        Self::Application,
    ];

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dimensionality => "dimensionality",
            Self::StructureType => "structure_type",
            Self::Material => "material",
            Self::Application => "application",
        }
    }
}

impl Display for RequirementField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| format!("unknown requirement field '{s}'"))
    }
}

/// Partially specified block requirements
///
/// Values are normalized on [`merge`](Self::merge): trimmed,
/// dimensionality upper-case, everything else lower-case. A material of
/// `any` means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensionality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
}

impl Requirements {
    /// Create empty requirements
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set dimensionality
    #[must_use]
    pub fn with_dimensionality(mut self, value: impl Into<String>) -> Self {
        self.dimensionality = Some(value.into());
        self.normalized()
    }

    /// Builder: set structure type
    #[must_use]
    pub fn with_structure_type(mut self, value: impl Into<String>) -> Self {
        self.structure_type = Some(value.into());
        self.normalized()
    }

    /// Builder: set material
    #[must_use]
    pub fn with_material(mut self, value: impl Into<String>) -> Self {
        self.material = Some(value.into());
        self.normalized()
    }

    /// Builder: set application
    #[must_use]
    pub fn with_application(mut self, value: impl Into<String>) -> Self {
        self.application = Some(value.into());
        self.normalized()
    }

    /// Merge an update into these requirements
    ///
    /// Fields set in `update` overwrite ours; a material of `any` clears it.
    pub fn merge(&mut self, update: Self) {
        if let Some(dim) = update.dimensionality.and_then(|v| normalize(&v, true)) {
            self.dimensionality = Some(dim);
        }
        if let Some(kind) = update.structure_type.and_then(|v| normalize(&v, false)) {
            self.structure_type = Some(kind);
        }
        if let Some(material) = update.material.as_deref().map(str::trim) {
            if material.eq_ignore_ascii_case("any") {
                self.material = None;
            } else if let Some(material) = normalize(material, false) {
                self.material = Some(material);
            }
        }
        if let Some(app) = update.application.and_then(|v| normalize(&v, false)) {
            self.application = Some(app);
        }
    }

    /// Normalized copy
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut out = Self::default();
        out.merge(self);
        out
    }

    /// Value of a field
    #[must_use]
    pub fn get(&self, field: RequirementField) -> Option<&str> {
        match field {
            RequirementField::Dimensionality => self.dimensionality.as_deref(),
            RequirementField::StructureType => self.structure_type.as_deref(),
            RequirementField::Material => self.material.as_deref(),
            RequirementField::Application => self.application.as_deref(),
        }
    }

    /// Fields from `required` that are still unset
    #[must_use]
    pub fn missing(&self, required: &[RequirementField]) -> Vec<RequirementField> {
        required
            .iter()
            .copied()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// Check if nothing is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        RequirementField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Unset every field
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Display for Requirements {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = RequirementField::ALL
            .iter()
            .filter_map(|field| self.get(*field).map(|v| format!("{field}={v}")))
            .collect();
        if parts.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

fn normalize(value: &str, upper: bool) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(if upper {
        trimmed.to_uppercase()
    } else {
        trimmed.to_lowercase()
    })
}
