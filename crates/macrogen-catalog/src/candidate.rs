//! Catalog entries

use macrogen_template::BlockId;
use serde::{Deserialize, Serialize};

/// One block of the catalog
///
/// Field names follow the catalog database files (`main_member` is the
/// primary member type, matched against the structure type requirement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCandidate {
    pub id: BlockId,
    pub name: String,
    #[serde(default)]
    pub dimensionality: String,
    #[serde(default)]
    pub main_member: String,
    #[serde(default)]
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form metadata object
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BlockCandidate {
    /// Create candidate
    #[must_use]
    pub fn new(
        id: impl Into<BlockId>,
        name: impl Into<String>,
        dimensionality: impl Into<String>,
        main_member: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dimensionality: dimensionality.into(),
            main_member: main_member.into(),
            material: material.into(),
            application: None,
            description: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Builder: set application
    #[must_use]
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Builder: set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human-readable description, falling back to `metadata.description`
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| self.metadata.get("description").and_then(|v| v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_database_entry() {
        let json = r#"{
            "id": "truss_2d",
            "name": "Pratt truss",
            "dimensionality": "2D",
            "main_member": "Truss",
            "material": "Steel",
            "metadata": {"description": "Parallel chord truss"}
        }"#;
        let candidate: BlockCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.id.as_str(), "truss_2d");
        assert_eq!(candidate.summary(), Some("Parallel chord truss"));
        assert_eq!(candidate.application, None);
    }

    #[test]
    fn description_field_wins() {
        let candidate = BlockCandidate::new("b", "Beam", "2D", "beam", "timber")
            .with_description("Glulam beam");
        assert_eq!(candidate.summary(), Some("Glulam beam"));
    }
}
