use serde::{Deserialize, Serialize};

/// How the user picked the region to segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentSelector {
    Point {
        x: i32,
        y: i32,
        /// 1 selects the region, 0 excludes it.
        #[serde(default = "default_label")]
        label: i32,
    },
    Box {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        #[serde(default = "default_label")]
        label: i32,
    },
    Text {
        prompt: String,
        #[serde(default = "default_threshold")]
        threshold: f32,
    },
}

fn default_label() -> i32 {
    1
}

fn default_threshold() -> f32 {
    0.5
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    #[serde(default)]
    pub masks: Vec<serde_json::Value>,
    #[serde(default)]
    pub boxes: Vec<serde_json::Value>,
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InpaintRequest {
    pub image: Vec<u8>,
    /// White pixels mark the area to replace.
    pub mask: Vec<u8>,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub strength: f32,
}

impl InpaintRequest {
    pub fn new(image: Vec<u8>, mask: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            image,
            mask,
            prompt: prompt.into(),
            negative_prompt: None,
            strength: 0.85,
        }
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }
}
