use serde::Serialize;

use super::common::{AspectRatio, ImageSize, ModelId};
use crate::error::{Result, RoomGenError};

/// Largest reference photo accepted before any upstream call is made.
pub const MAX_REFERENCE_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// One generation job. Only obtainable through [`GenerationRequestBuilder::build`],
/// so every instance has already passed local validation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    prompt_text: String,
    reference_image: Option<Vec<u8>>,
    aspect_ratio: AspectRatio,
    image_size: ImageSize,
    model_priority: Vec<ModelId>,
}

impl GenerationRequest {
    pub fn builder(prompt_text: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            prompt_text: prompt_text.into(),
            reference_image: None,
            aspect_ratio: AspectRatio::default(),
            image_size: ImageSize::default(),
            model_priority: Vec::new(),
        }
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn reference_image(&self) -> Option<&[u8]> {
        self.reference_image.as_deref()
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    /// Empty means "use the orchestrator's default chain".
    pub fn model_priority(&self) -> &[ModelId] {
        &self.model_priority
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    prompt_text: String,
    reference_image: Option<Vec<u8>>,
    aspect_ratio: AspectRatio,
    image_size: ImageSize,
    model_priority: Vec<ModelId>,
}

impl GenerationRequestBuilder {
    pub fn with_reference_image(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.reference_image = Some(bytes.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_image_size(mut self, image_size: ImageSize) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_model_priority(mut self, models: Vec<ModelId>) -> Self {
        self.model_priority = models;
        self
    }

    pub fn build(self) -> Result<GenerationRequest> {
        if self.prompt_text.trim().is_empty() {
            return Err(RoomGenError::ValidationError(
                "Prompt text must not be empty".into(),
            ));
        }

        if let Some(image) = &self.reference_image {
            if image.is_empty() {
                return Err(RoomGenError::ValidationError(
                    "Reference image is empty".into(),
                ));
            }
            if image.len() > MAX_REFERENCE_IMAGE_BYTES {
                return Err(RoomGenError::ValidationError(format!(
                    "Reference image is too large ({} bytes, limit {} bytes)",
                    image.len(),
                    MAX_REFERENCE_IMAGE_BYTES
                )));
            }
        }

        let mut model_priority = Vec::with_capacity(self.model_priority.len());
        for model in self.model_priority {
            if !model_priority.contains(&model) {
                model_priority.push(model);
            }
        }

        Ok(GenerationRequest {
            prompt_text: self.prompt_text,
            reference_image: self.reference_image,
            aspect_ratio: self.aspect_ratio,
            image_size: self.image_size,
            model_priority,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// Normalized outcome of a generation attempt, whatever the upstream wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamResult {
    Success {
        images: Vec<GeneratedImage>,
        model_used: ModelId,
    },
    RetryableFailure {
        reason: String,
    },
    TerminalFailure {
        reason: String,
    },
}

impl UpstreamResult {
    /// Builds a success, normalizing an empty image list to a retryable failure.
    pub fn success(images: Vec<GeneratedImage>, model_used: ModelId) -> Self {
        if images.is_empty() {
            return UpstreamResult::retryable("no image data");
        }
        UpstreamResult::Success { images, model_used }
    }

    pub fn retryable(reason: impl Into<String>) -> Self {
        UpstreamResult::RetryableFailure {
            reason: reason.into(),
        }
    }

    pub fn terminal(reason: impl Into<String>) -> Self {
        UpstreamResult::TerminalFailure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UpstreamResult::Success { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamResult::RetryableFailure { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UpstreamResult::TerminalFailure { .. })
    }

    pub fn model_used(&self) -> Option<ModelId> {
        match self {
            UpstreamResult::Success { model_used, .. } => Some(*model_used),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            UpstreamResult::Success { .. } => None,
            UpstreamResult::RetryableFailure { reason }
            | UpstreamResult::TerminalFailure { reason } => Some(reason),
        }
    }
}
