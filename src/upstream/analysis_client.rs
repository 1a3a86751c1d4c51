use serde_json::json;

use super::gemini::{build_parts, GenerateContentResponse};
use super::retry::truncate_text;
use crate::config::AnalysisConfig;
use crate::error::{Result, RoomGenError};
use crate::models::RoomAnalysis;

const MAX_RAW_RESPONSE_CHARS: usize = 1000;

/// Asks a multimodal text model to describe the room before generation.
pub struct VisionAnalysisClient {
    http: reqwest::Client,
    config: AnalysisConfig,
}

impl VisionAnalysisClient {
    pub fn new(http: reqwest::Client, config: AnalysisConfig) -> Self {
        Self { http, config }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Tries each configured text model in order and returns the first usable analysis.
    pub async fn analyze(
        &self,
        image: &[u8],
        style: &str,
        room_type: Option<&str>,
        custom_text: Option<&str>,
    ) -> Result<RoomAnalysis> {
        let api_key = self.config.credential.resolve().ok_or_else(|| {
            RoomGenError::ConfigError(format!(
                "missing analysis API key ({})",
                self.config.credential.describe()
            ))
        })?;
        let instruction = analysis_instruction(style, room_type, custom_text);

        let mut last_error = RoomGenError::ConfigError("no analysis models configured".to_string());
        for model in &self.config.models {
            match self.analyze_with(model, image, &instruction, &api_key).await {
                Ok(analysis) => {
                    log::info!("🔎 Room analysis produced by {}", model);
                    return Ok(analysis);
                }
                Err(e) => {
                    log::warn!("⚠️  Room analysis with {} failed: {}", model, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn analyze_with(
        &self,
        model: &str,
        image: &[u8],
        instruction: &str,
        api_key: &str,
    ) -> Result<RoomAnalysis> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": build_parts(instruction, Some(image)) }],
            "generationConfig": {
                "responseModalities": ["TEXT"],
                "temperature": 0.7,
                "maxOutputTokens": 2048
            }
        });

        let response = self
            .http
            .post(self.endpoint_for_model(model))
            .bearer_auth(api_key)
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RoomGenError::UpstreamError {
                status: status.as_u16(),
                message: truncate_text(&body, 512),
            });
        }

        let reply: GenerateContentResponse = serde_json::from_str(&body)?;
        let text = reply.text();
        if text.trim().is_empty() {
            return Err(RoomGenError::ResponseError("analysis reply had no text".to_string()));
        }
        Ok(parse_analysis(&text))
    }
}

/// Locates the JSON object in a model reply: a fenced json block first, else the outermost braces.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        return Some(body[..end].trim());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Structured analysis when the reply holds valid JSON, otherwise the raw text as suggestions.
pub fn parse_analysis(text: &str) -> RoomAnalysis {
    if let Some(block) = extract_json_block(text) {
        match serde_json::from_str::<RoomAnalysis>(block) {
            Ok(mut analysis) => {
                analysis.raw_response = None;
                return analysis;
            }
            Err(e) => log::debug!("Analysis reply was not valid JSON: {}", e),
        }
    }
    RoomAnalysis {
        raw_response: Some(text.trim().chars().take(MAX_RAW_RESPONSE_CHARS).collect()),
        ..Default::default()
    }
}

fn analysis_instruction(style: &str, room_type: Option<&str>, custom_text: Option<&str>) -> String {
    let mut extra = Vec::new();
    if let Some(room) = room_type.filter(|r| !r.trim().is_empty()) {
        extra.push(format!("- The user says this is a {}; weigh what that room needs.", room.trim()));
    }
    if let Some(custom) = custom_text.filter(|c| !c.trim().is_empty()) {
        extra.push(format!("- Work in this request from the user: \"{}\".", custom.trim()));
    }

    format!(
        r#"You are a professional interior designer and architectural analyst. Study this photo of an unfinished room and plan its renovation.

## Tasks:
1. Space analysis: identify the room type, proportions, window positions and light direction.
2. Structure: list the architectural elements that must be kept as they are.
3. Design: propose a {style} design for the space.
4. Layout: recommend a practical furniture layout.

## Output format (JSON only):
{{
    "room_analysis": {{
        "room_type": "detected room type",
        "space_description": "spatial characteristics",
        "lighting_analysis": "natural light analysis",
        "structural_elements": "structural elements that must be preserved"
    }},
    "design_recommendations": {{
        "layout_suggestion": "layout advice",
        "furniture_placement": "furniture placement advice",
        "lighting_design": "lighting design advice",
        "color_scheme": "color scheme advice"
    }}
}}
{extra}"#,
        style = style.trim(),
        extra = extra.join("\n")
    )
}
