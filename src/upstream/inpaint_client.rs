use serde::{Deserialize, Serialize};

use super::codec::{detect_mime_type, encode_base64};
use super::retry::truncate_text;
use crate::config::InpaintConfig;
use crate::error::{Result, RoomGenError};
use crate::models::{GeneratedImage, InpaintRequest};
use crate::prompt::{decoration_prompt, furniture_prompt, InpaintPrompt, DEFAULT_INPAINT_NEGATIVE};

#[derive(Debug, Serialize)]
struct InpaintPayload<'a> {
    model: &'a str,
    input_image: String,
    mask: String,
    prompt: &'a str,
    negative_prompt: &'a str,
    strength: f32,
    num_inference_steps: u32,
    guidance_scale: f32,
}

#[derive(Debug, Deserialize)]
struct InpaintReply {
    code: i64,
    #[serde(default, alias = "msg")]
    message: String,
    #[serde(default)]
    data: Option<InpaintOutputs>,
}

#[derive(Debug, Deserialize)]
struct InpaintOutputs {
    #[serde(default)]
    output_urls: Vec<String>,
}

/// Replaces the masked region of an image in a single call. No retries.
pub struct InpaintClient {
    http: reqwest::Client,
    config: InpaintConfig,
}

impl InpaintClient {
    pub fn new(http: reqwest::Client, config: InpaintConfig) -> Self {
        Self { http, config }
    }

    pub async fn inpaint(&self, request: &InpaintRequest) -> Result<GeneratedImage> {
        if request.image.is_empty() || request.mask.is_empty() {
            return Err(RoomGenError::ValidationError(
                "Both image and mask are required".to_string(),
            ));
        }
        if request.prompt.trim().is_empty() {
            return Err(RoomGenError::ValidationError("Prompt must not be empty".to_string()));
        }
        let api_key = self.config.credential.resolve().ok_or_else(|| {
            RoomGenError::ConfigError(format!(
                "missing inpaint API key ({})",
                self.config.credential.describe()
            ))
        })?;

        let payload = InpaintPayload {
            model: &self.config.model,
            input_image: encode_base64(&request.image),
            mask: encode_base64(&request.mask),
            prompt: &request.prompt,
            negative_prompt: request
                .negative_prompt
                .as_deref()
                .unwrap_or(DEFAULT_INPAINT_NEGATIVE),
            strength: request.strength,
            num_inference_steps: 30,
            guidance_scale: 7.5,
        };

        log::info!("🖌️  Inpainting region (strength {:.2})", request.strength);
        let response = self
            .http
            .post(format!(
                "{}/api/v1/images/inpaint",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&api_key)
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

        let reply: InpaintReply = serde_json::from_str(&body)?;
        let url = match (reply.code, reply.data.and_then(|d| d.output_urls.into_iter().next())) {
            (0, Some(url)) => url,
            (code, _) => {
                return Err(RoomGenError::ResponseError(format!(
                    "Inpaint failed (code {}): {}",
                    code,
                    if reply.message.is_empty() { "no output returned" } else { reply.message.as_str() }
                )))
            }
        };

        self.download(&url).await
    }

    pub async fn replace_furniture(
        &self,
        image: Vec<u8>,
        mask: Vec<u8>,
        furniture_type: &str,
        style: &str,
    ) -> Result<GeneratedImage> {
        let prompt = furniture_prompt(furniture_type, style);
        self.inpaint(&prompted_request(image, mask, prompt)).await
    }

    pub async fn replace_decoration(
        &self,
        image: Vec<u8>,
        mask: Vec<u8>,
        decoration_type: &str,
        description: Option<&str>,
    ) -> Result<GeneratedImage> {
        let prompt = decoration_prompt(decoration_type, description);
        self.inpaint(&prompted_request(image, mask, prompt)).await
    }

    async fn download(&self, url: &str) -> Result<GeneratedImage> {
        let response = self.http.get(url).timeout(self.config.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RoomGenError::UpstreamError {
                status: status.as_u16(),
                message: format!("failed to download inpaint result from {}", url),
            });
        }
        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(RoomGenError::ResponseError("Inpaint result was empty".to_string()));
        }
        let mime_type = detect_mime_type(&bytes);
        Ok(GeneratedImage::new(bytes, mime_type))
    }
}

fn prompted_request(image: Vec<u8>, mask: Vec<u8>, prompt: InpaintPrompt) -> InpaintRequest {
    InpaintRequest::new(image, mask, prompt.prompt).with_negative_prompt(prompt.negative_prompt)
}
