//! Builds the instruction text sent with a room photo.
//!
//! Sections always appear in the same order: role and task, the structural
//! constraints, style detail, room detail, analysis recommendations, quality
//! boilerplate and finally the user's own text. Output depends only on the
//! inputs, so identical calls yield identical strings.

pub mod library;

pub use library::{
    decoration_kinds, decoration_prompt, furniture_kinds, furniture_prompt, room_type,
    room_types, style, styles, InpaintPrompt, ObjectKind, RoomProfile, StyleProfile,
    DEFAULT_INPAINT_NEGATIVE,
};

use crate::models::RoomAnalysis;

/// Fixed block that keeps windows, walls and camera untouched. Identical for every style.
pub const STRUCTURAL_CONSTRAINTS: &str = "## CRITICAL STRUCTURAL CONSTRAINTS (MUST FOLLOW STRICTLY):
1. WINDOWS: The exact size, position, and proportions of ALL windows in the input image MUST be preserved. Do NOT enlarge, shrink, move, or change the shape of any window. The window-to-wall ratio must remain identical.
2. WALLS: The original wall positions, room geometry, and all architectural openings are fixed and must not be altered.
3. FLOOR PLAN: Maintain the exact floor plan, ceiling height, and room dimensions.
4. CAMERA: The camera perspective, focal length, and vanishing points must remain 100% consistent with the input image.
5. FOCUS: Do not perform any structural remodeling. Focus ONLY on surface materials, lighting, furniture, and decoration.";

const MAX_FREEFORM_SUGGESTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct PromptInput<'a> {
    pub style: &'a str,
    pub room_type: Option<&'a str>,
    pub custom_text: Option<&'a str>,
    pub analysis: Option<&'a RoomAnalysis>,
}

impl<'a> PromptInput<'a> {
    pub fn new(style: &'a str) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    pub fn with_room_type(mut self, room_type: Option<&'a str>) -> Self {
        self.room_type = room_type;
        self
    }

    pub fn with_custom_text(mut self, custom_text: Option<&'a str>) -> Self {
        self.custom_text = custom_text;
        self
    }

    pub fn with_analysis(mut self, analysis: Option<&'a RoomAnalysis>) -> Self {
        self.analysis = analysis;
        self
    }
}

pub fn assemble_prompt(input: &PromptInput<'_>) -> String {
    let raw_style = input.style.trim();
    let style_profile = style(raw_style);
    let mut sections: Vec<String> = Vec::with_capacity(8);

    let target = match style_profile {
        Some(profile) => profile.core.to_string(),
        None => format!("{} interior", raw_style),
    };
    sections.push("Act as a professional architectural visualization engine.".to_string());
    sections.push(format!(
        "Task: Renovate the provided raw space into a {}.",
        target
    ));

    sections.push(STRUCTURAL_CONSTRAINTS.to_string());

    sections.push(match style_profile {
        Some(profile) => format!(
            "## STYLE: {}\nMaterials: {}\nColors: {}\nFurniture: {}\nLighting: {}\nDetails: {}",
            profile.name,
            profile.materials,
            profile.colors,
            profile.furniture,
            profile.lighting,
            profile.details
        ),
        None => format!("## STYLE: {}", raw_style),
    });

    if let Some(raw_room) = input.room_type.map(str::trim).filter(|r| !r.is_empty()) {
        sections.push(match room_type(raw_room) {
            Some(profile) => format!(
                "## ROOM TYPE: {}\nSpace: {}\nFurniture: {}\nFeatures: {}",
                profile.name, profile.space, profile.furniture, profile.features
            ),
            None => format!("## ROOM TYPE: {}", raw_room),
        });
    }

    if let Some(section) = input.analysis.and_then(analysis_section) {
        sections.push(section);
    }

    sections.push(format!(
        "## QUALITY STANDARDS:\n{}",
        library::QUALITY_LINES.join("\n")
    ));

    if let Some(custom) = input.custom_text.map(sanitize_custom_text).filter(|c| !c.is_empty()) {
        sections.push(format!("## USER REQUIREMENTS:\n{}", custom));
    }

    sections.join("\n\n")
}

fn analysis_section(analysis: &RoomAnalysis) -> Option<String> {
    let mut lines = analysis.design_recommendations.lines();
    let keep = analysis.room_analysis.structural_elements.trim();
    if !keep.is_empty() {
        lines.push(format!("Elements to keep: {}", keep));
    }
    if !lines.is_empty() {
        return Some(format!("## DESIGN RECOMMENDATIONS:\n{}", lines.join("\n")));
    }

    let raw = analysis.raw_response.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    let suggestion: String = raw.chars().take(MAX_FREEFORM_SUGGESTION_CHARS).collect();
    Some(format!("## DESIGN SUGGESTIONS:\n{}", suggestion))
}

/// Drops characters image models read as weighting syntax and collapses whitespace.
pub fn sanitize_custom_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}'))
        .map(|c| if c == ':' { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DesignRecommendations, RoomAnalysis};

    #[test]
    fn test_constraints_precede_style_terms() {
        let prompt = assemble_prompt(&PromptInput::new("modern_minimalist").with_room_type(Some("living_room")));

        let constraints = prompt.find(STRUCTURAL_CONSTRAINTS).unwrap();
        let materials = prompt.find("glass, polished concrete, smooth surfaces").unwrap();
        let colors = prompt.find("white, gray, beige, black accents").unwrap();
        let room = prompt.find("spacious living room").unwrap();
        let quality = prompt.find("## QUALITY STANDARDS:").unwrap();

        assert!(constraints < materials);
        assert!(materials < colors);
        assert!(colors < room);
        assert!(room < quality);
        assert!(!prompt.contains("## USER REQUIREMENTS"));
    }

    #[test]
    fn test_identical_inputs_give_identical_output() {
        let input = PromptInput::new("scandinavian")
            .with_room_type(Some("bedroom"))
            .with_custom_text(Some("a reading nook"));
        assert_eq!(assemble_prompt(&input), assemble_prompt(&input));
    }

    #[test]
    fn test_constraint_block_is_style_independent() {
        for profile in styles() {
            let prompt = assemble_prompt(&PromptInput::new(profile.id));
            assert_eq!(prompt.matches(STRUCTURAL_CONSTRAINTS).count(), 1);
            assert!(prompt.contains(profile.core));
        }
    }

    #[test]
    fn test_unknown_keys_fall_back_to_raw_strings() {
        let prompt = assemble_prompt(&PromptInput::new("art nouveau").with_room_type(Some("wine cellar")));
        assert!(prompt.contains("into a art nouveau interior."));
        assert!(prompt.contains("## STYLE: art nouveau"));
        assert!(prompt.contains("## ROOM TYPE: wine cellar"));
    }

    #[test]
    fn test_custom_text_is_sanitized_and_last() {
        let prompt = assemble_prompt(
            &PromptInput::new("industrial").with_custom_text(Some("  (red sofa:1.5)   [brick]  wall ")),
        );
        assert!(prompt.ends_with("## USER REQUIREMENTS:\nred sofa 1.5 brick wall"));
        assert_eq!(sanitize_custom_text("(  ):"), "");
    }

    #[test]
    fn test_analysis_recommendations_are_included() {
        let analysis = RoomAnalysis {
            design_recommendations: DesignRecommendations {
                lighting_design: "cove lighting".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let prompt = assemble_prompt(&PromptInput::new("light_luxury").with_analysis(Some(&analysis)));
        let recs = prompt.find("## DESIGN RECOMMENDATIONS:\nLighting design: cove lighting").unwrap();
        assert!(recs < prompt.find("## QUALITY STANDARDS:").unwrap());
    }

    #[test]
    fn test_freeform_analysis_is_truncated() {
        let analysis = RoomAnalysis {
            raw_response: Some("x".repeat(1500)),
            ..Default::default()
        };
        let prompt = assemble_prompt(&PromptInput::new("industrial").with_analysis(Some(&analysis)));
        assert!(prompt.contains(&format!("## DESIGN SUGGESTIONS:\n{}\n\n", "x".repeat(1000))));
        assert!(!prompt.contains(&"x".repeat(1001)));
    }
}
