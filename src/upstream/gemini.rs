use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::codec::{decode_base64, detect_mime_type, encode_base64};
use super::retry::{AttemptError, RetryPolicy};
use super::UpstreamImageClient;
use crate::config::{AuthScheme, GeminiConfig};
use crate::models::{GeneratedImage, GenerationRequest, ImageSize, ModelId, UpstreamResult};

const BLOCKING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum RequestPart<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: OutgoingInlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutgoingInlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'static str>,
    image_size: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    #[serde(default, alias = "inline_data")]
    pub inline_data: Option<IncomingInlineData>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncomingInlineData {
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    pub(crate) fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Inline image part followed by the text part, in that order.
pub(crate) fn build_parts<'a>(
    prompt_text: &'a str,
    reference_image: Option<&[u8]>,
) -> Vec<RequestPart<'a>> {
    let mut parts = Vec::with_capacity(2);
    if let Some(bytes) = reference_image {
        parts.push(RequestPart::Inline {
            inline_data: OutgoingInlineData {
                mime_type: detect_mime_type(bytes),
                data: encode_base64(bytes),
            },
        });
    }
    parts.push(RequestPart::Text { text: prompt_text });
    parts
}

/// Only the pro tier renders above 1K.
fn effective_image_size(model: ModelId, requested: ImageSize) -> ImageSize {
    match model {
        ModelId::GeminiProImage => requested,
        _ => ImageSize::OneK,
    }
}

fn build_payload(request: &GenerationRequest, model: ModelId) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: build_parts(request.prompt_text(), request.reference_image()),
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE"],
            image_config: ImageConfig {
                aspect_ratio: request.aspect_ratio().explicit(),
                image_size: effective_image_size(model, request.image_size()).as_str(),
            },
        },
    }
}

/// Pulls every inline image out of a generateContent reply.
pub(crate) fn parse_images(body: &str) -> Result<Vec<GeneratedImage>, AttemptError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| AttemptError::Parse(e.to_string()))?;

    if response.candidates.is_empty() {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Err(AttemptError::Rejected(format!("prompt blocked ({})", reason)));
        }
        return Err(AttemptError::NoImages("no candidates".to_string()));
    }

    let mut images = Vec::new();
    for candidate in &response.candidates {
        let Some(content) = &candidate.content else {
            continue;
        };
        for part in &content.parts {
            let Some(inline) = &part.inline_data else {
                continue;
            };
            let bytes = decode_base64(&inline.data).map_err(|e| AttemptError::Parse(e.to_string()))?;
            if bytes.is_empty() {
                continue;
            }
            let mime_type = inline
                .mime_type
                .clone()
                .unwrap_or_else(|| detect_mime_type(&bytes).to_string());
            images.push(GeneratedImage::new(bytes, mime_type));
        }
    }

    if images.is_empty() {
        if let Some(reason) = response
            .candidates
            .iter()
            .filter_map(|c| c.finish_reason.as_deref())
            .find(|reason| BLOCKING_FINISH_REASONS.contains(reason))
        {
            return Err(AttemptError::Rejected(format!("generation stopped ({})", reason)));
        }
        let text = response.text();
        if !text.trim().is_empty() {
            log::debug!("Model replied with text only: {}", super::retry::truncate_text(&text, 200));
        }
        return Err(AttemptError::NoImages("no image data".to_string()));
    }

    Ok(images)
}

/// Client for Gemini-compatible `generateContent` image endpoints.
pub struct GeminiImageClient {
    http: reqwest::Client,
    config: GeminiConfig,
    retry: RetryPolicy,
}

impl GeminiImageClient {
    pub fn new(http: reqwest::Client, config: GeminiConfig, retry: RetryPolicy) -> Self {
        Self { http, config, retry }
    }

    pub fn endpoint_for_model(&self, model: ModelId) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model.as_str()
        )
    }

    async fn attempt(
        &self,
        url: &str,
        payload: &GenerateContentRequest<'_>,
        api_key: &str,
    ) -> Result<Vec<GeneratedImage>, AttemptError> {
        let builder = self.http.post(url).json(payload);
        let builder = match self.config.auth_scheme {
            AuthScheme::Bearer => builder.bearer_auth(api_key),
            AuthScheme::GoogApiKey => builder.header("x-goog-api-key", api_key),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AttemptError::from_status(status.as_u16(), &body));
        }
        parse_images(&body)
    }
}

#[async_trait]
impl UpstreamImageClient for GeminiImageClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest, model: ModelId) -> UpstreamResult {
        let Some(api_key) = self.config.credential.resolve() else {
            log::error!("❌ No API key available ({})", self.config.credential.describe());
            return UpstreamResult::terminal(format!(
                "missing API key ({})",
                self.config.credential.describe()
            ));
        };

        let url = self.endpoint_for_model(model);
        let payload = build_payload(request, model);
        log::info!(
            "🎨 Requesting {} (aspect {}, size {}, prompt {} chars, reference {} bytes)",
            model,
            request.aspect_ratio().as_str(),
            effective_image_size(model, request.image_size()).as_str(),
            request.prompt_text().chars().count(),
            request.reference_image().map_or(0, <[u8]>::len)
        );

        self.retry
            .run(model, |_| self.attempt(&url, &payload, &api_key))
            .await
    }
}
