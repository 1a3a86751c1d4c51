use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RoomGenError;

/// Upstream image-generation model. Converted to and from its wire string only
/// at the serialization edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gemini-3-pro-image-preview")]
    GeminiProImage,
    #[serde(rename = "gemini-2.5-flash-image")]
    GeminiFlashImage,
    #[serde(rename = "gemini-2.5-flash-image-preview")]
    GeminiFlashImagePreview,
    #[serde(rename = "nano-banana-2")]
    NanoBanana2,
    #[serde(rename = "nano-banana-fast")]
    NanoBananaFast,
    #[serde(rename = "nano-banana")]
    NanoBanana,
    #[serde(rename = "nano-banana-pro")]
    NanoBananaPro,
}

impl ModelId {
    pub const ALL: [ModelId; 7] = [
        ModelId::GeminiProImage,
        ModelId::GeminiFlashImage,
        ModelId::GeminiFlashImagePreview,
        ModelId::NanoBanana2,
        ModelId::NanoBananaFast,
        ModelId::NanoBanana,
        ModelId::NanoBananaPro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::GeminiProImage => "gemini-3-pro-image-preview",
            ModelId::GeminiFlashImage => "gemini-2.5-flash-image",
            ModelId::GeminiFlashImagePreview => "gemini-2.5-flash-image-preview",
            ModelId::NanoBanana2 => "nano-banana-2",
            ModelId::NanoBananaFast => "nano-banana-fast",
            ModelId::NanoBanana => "nano-banana",
            ModelId::NanoBananaPro => "nano-banana-pro",
        }
    }

    pub fn provider(&self) -> ImageProvider {
        match self {
            ModelId::GeminiProImage
            | ModelId::GeminiFlashImage
            | ModelId::GeminiFlashImagePreview
            | ModelId::NanoBanana2 => ImageProvider::Gemini,
            ModelId::NanoBananaFast | ModelId::NanoBanana | ModelId::NanoBananaPro => {
                ImageProvider::Grsai
            }
        }
    }

    pub fn info(&self) -> ModelInfo {
        let (name, description) = match self {
            ModelId::GeminiProImage => (
                "Gemini 3 Pro Image",
                "Highest quality, best structure preservation, supports 1K/2K/4K",
            ),
            ModelId::GeminiFlashImage => ("Gemini 2.5 Flash Image", "Fast generation, fixed 1K"),
            ModelId::GeminiFlashImagePreview => (
                "Gemini 2.5 Flash Image Preview",
                "Preview build of the flash image model",
            ),
            ModelId::NanoBanana2 => ("Nano Banana 2", "Gemini-compatible alternative endpoint"),
            ModelId::NanoBananaFast => ("Nano Banana Fast", "Fast drafts, suited to previews"),
            ModelId::NanoBanana => ("Nano Banana", "Balanced speed and quality"),
            ModelId::NanoBananaPro => ("Nano Banana Pro", "Professional tier, higher quality"),
        };
        ModelInfo {
            id: self.as_str().to_string(),
            name: name.to_string(),
            provider: self.provider(),
            description: description.to_string(),
        }
    }

    /// Quality tier first, cheaper/faster tier second.
    pub fn default_priority(provider: ImageProvider) -> Vec<ModelId> {
        match provider {
            ImageProvider::Gemini => vec![ModelId::GeminiProImage, ModelId::GeminiFlashImage],
            ImageProvider::Grsai => vec![ModelId::NanoBananaPro, ModelId::NanoBanana],
        }
    }

    /// Parses a comma-separated priority list such as `"gemini-3-pro-image-preview, gemini-2.5-flash-image"`.
    pub fn parse_priority(raw: &str) -> Result<Vec<ModelId>, RoomGenError> {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ModelId::from_str)
            .collect()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = RoomGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ModelId::ALL
            .iter()
            .copied()
            .find(|model| model.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RoomGenError::ValidationError(format!("Unknown model id: {}", trimmed)))
    }
}

/// Which upstream API family serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    Gemini,
    Grsai,
}

impl FromStr for ImageProvider {
    type Err = RoomGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "apiyi" | "dmxapi" => Ok(ImageProvider::Gemini),
            "grsai" | "nano-banana" => Ok(ImageProvider::Grsai),
            other => Err(RoomGenError::ConfigError(format!(
                "Unknown image provider: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[default]
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Auto => "auto",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Ultrawide21x9 => "21:9",
        }
    }

    /// Explicit ratio to send upstream; `Auto` lets the provider decide.
    pub fn explicit(&self) -> Option<&'static str> {
        match self {
            AspectRatio::Auto => None,
            other => Some(other.as_str()),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = RoomGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        [
            AspectRatio::Auto,
            AspectRatio::Square,
            AspectRatio::Landscape16x9,
            AspectRatio::Portrait9x16,
            AspectRatio::Landscape4x3,
            AspectRatio::Portrait3x4,
            AspectRatio::Landscape3x2,
            AspectRatio::Portrait2x3,
            AspectRatio::Landscape5x4,
            AspectRatio::Portrait4x5,
            AspectRatio::Ultrawide21x9,
        ]
        .into_iter()
        .find(|ratio| ratio.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| RoomGenError::ValidationError(format!("Unsupported aspect ratio: {}", value)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl FromStr for ImageSize {
    type Err = RoomGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(ImageSize::OneK),
            "2K" => Ok(ImageSize::TwoK),
            "4K" => Ok(ImageSize::FourK),
            other => Err(RoomGenError::ValidationError(format!(
                "Unsupported image size: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: ImageProvider,
    pub description: String,
}
