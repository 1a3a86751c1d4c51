use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomFacts {
    #[serde(default)]
    pub room_type: String,
    #[serde(default)]
    pub space_description: String,
    #[serde(default)]
    pub lighting_analysis: String,
    #[serde(default)]
    pub structural_elements: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignRecommendations {
    #[serde(default)]
    pub layout_suggestion: String,
    #[serde(default)]
    pub furniture_placement: String,
    #[serde(default)]
    pub lighting_design: String,
    #[serde(default)]
    pub color_scheme: String,
}

impl DesignRecommendations {
    /// Labelled, non-empty recommendation lines in a fixed order.
    pub fn lines(&self) -> Vec<String> {
        [
            ("Furniture layout", &self.layout_suggestion),
            ("Furniture placement", &self.furniture_placement),
            ("Lighting design", &self.lighting_design),
            ("Color scheme", &self.color_scheme),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("{}: {}", label, value.trim()))
        .collect()
    }
}

/// Facts a vision model extracted from the room photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomAnalysis {
    #[serde(default)]
    pub room_analysis: RoomFacts,
    #[serde(default)]
    pub design_recommendations: DesignRecommendations,
    /// Free-form reply kept when the model did not answer with JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}
