use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::response::{error_response, ok, ok_with_message};
use super::routes::decode_image_field;
use super::AppState;
use crate::error::Result;
use crate::imaging;
use crate::models::{GeneratedImage, InpaintRequest, SegmentSelector, SegmentationResult};
use crate::prompt::{decoration_kinds, furniture_kinds};
use crate::upstream::codec::to_data_url;

/// Mounted inside the `/api/v1` scope.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/segment")
            .route("/by-point", web::post().to(by_point))
            .route("/by-box", web::post().to(by_box))
            .route("/by-text", web::post().to(by_text))
            .route("/inpaint", web::post().to(inpaint))
            .route("/replace-furniture", web::post().to(replace_furniture))
            .route("/replace-decoration", web::post().to(replace_decoration))
            .route("/preview-mask", web::post().to(preview_mask))
            .route("/furniture-types", web::get().to(list_furniture_types))
            .route("/decoration-types", web::get().to(list_decoration_types)),
    );
}

fn default_label() -> i32 {
    1
}

fn default_threshold() -> f32 {
    0.5
}

fn default_strength() -> f32 {
    0.85
}

fn default_overlay_alpha() -> u8 {
    128
}

fn default_furniture_style() -> String {
    "modern".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PointBody {
    pub image: String,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_label")]
    pub label: i32,
}

#[derive(Debug, Deserialize)]
pub struct BoxBody {
    pub image: String,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    #[serde(default = "default_label")]
    pub label: i32,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub image: String,
    pub text: String,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

#[derive(Debug, Deserialize)]
pub struct InpaintBody {
    pub image: String,
    /// White pixels mark the area to replace.
    pub mask_base64: String,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default = "default_strength")]
    pub strength: f32,
}

#[derive(Debug, Deserialize)]
pub struct FurnitureBody {
    pub image: String,
    pub mask_base64: String,
    pub furniture_type: String,
    #[serde(default = "default_furniture_style")]
    pub style: String,
}

#[derive(Debug, Deserialize)]
pub struct DecorationBody {
    pub image: String,
    pub mask_base64: String,
    pub decoration_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewMaskBody {
    pub image: String,
    pub mask_base64: String,
    /// Highlight opacity, 0-255.
    #[serde(default = "default_overlay_alpha")]
    pub alpha: u8,
}

#[derive(Debug, Serialize)]
pub struct PreviewMaskData {
    pub preview_image: String,
}

#[derive(Debug, Serialize)]
pub struct InpaintData {
    /// Data URL, ready for an `<img>` tag.
    pub result_image: String,
}

impl From<GeneratedImage> for InpaintData {
    fn from(image: GeneratedImage) -> Self {
        Self {
            result_image: to_data_url(&image.bytes, &image.mime_type),
        }
    }
}

async fn segment(state: &AppState, image: &str, selector: SegmentSelector) -> HttpResponse {
    let result: Result<SegmentationResult> = async {
        let image = decode_image_field("image", image)?;
        state.upstream.segmentation().segment(&image, &selector).await
    }
    .await;

    match result {
        Ok(result) => ok_with_message("segmented", result),
        Err(e) => error_response(&e),
    }
}

async fn by_point(state: web::Data<AppState>, body: web::Json<PointBody>) -> HttpResponse {
    let body = body.into_inner();
    let selector = SegmentSelector::Point {
        x: body.x,
        y: body.y,
        label: body.label,
    };
    segment(&state, &body.image, selector).await
}

async fn by_box(state: web::Data<AppState>, body: web::Json<BoxBody>) -> HttpResponse {
    let body = body.into_inner();
    let selector = SegmentSelector::Box {
        x1: body.x1,
        y1: body.y1,
        x2: body.x2,
        y2: body.y2,
        label: body.label,
    };
    segment(&state, &body.image, selector).await
}

async fn by_text(state: web::Data<AppState>, body: web::Json<TextBody>) -> HttpResponse {
    let body = body.into_inner();
    let selector = SegmentSelector::Text {
        prompt: body.text,
        threshold: body.threshold,
    };
    segment(&state, &body.image, selector).await
}

fn replaced(result: Result<GeneratedImage>, message: &str) -> HttpResponse {
    match result {
        Ok(image) => ok_with_message(message, InpaintData::from(image)),
        Err(e) => error_response(&e),
    }
}

async fn run_inpaint(state: &AppState, body: InpaintBody) -> Result<GeneratedImage> {
    let image = decode_image_field("image", &body.image)?;
    let mask = decode_image_field("mask_base64", &body.mask_base64)?;
    let mut request = InpaintRequest::new(image, mask, body.prompt).with_strength(body.strength);
    if let Some(negative) = body.negative_prompt.filter(|n| !n.trim().is_empty()) {
        request = request.with_negative_prompt(negative);
    }
    state.upstream.inpaint().inpaint(&request).await
}

async fn inpaint(state: web::Data<AppState>, body: web::Json<InpaintBody>) -> HttpResponse {
    replaced(run_inpaint(&state, body.into_inner()).await, "inpainted")
}

async fn replace_furniture(state: web::Data<AppState>, body: web::Json<FurnitureBody>) -> HttpResponse {
    let body = body.into_inner();
    let result: Result<GeneratedImage> = async {
        let image = decode_image_field("image", &body.image)?;
        let mask = decode_image_field("mask_base64", &body.mask_base64)?;
        state
            .upstream
            .inpaint()
            .replace_furniture(image, mask, &body.furniture_type, &body.style)
            .await
    }
    .await;
    replaced(result, "furniture replaced")
}

async fn replace_decoration(state: web::Data<AppState>, body: web::Json<DecorationBody>) -> HttpResponse {
    let body = body.into_inner();
    let result: Result<GeneratedImage> = async {
        let image = decode_image_field("image", &body.image)?;
        let mask = decode_image_field("mask_base64", &body.mask_base64)?;
        state
            .upstream
            .inpaint()
            .replace_decoration(image, mask, &body.decoration_type, body.description.as_deref())
            .await
    }
    .await;
    replaced(result, "decoration replaced")
}

async fn preview_mask(body: web::Json<PreviewMaskBody>) -> HttpResponse {
    let result: Result<Vec<u8>> = decode_image_field("image", &body.image).and_then(|image| {
        let mask = decode_image_field("mask_base64", &body.mask_base64)?;
        imaging::mask_overlay(&image, &mask, body.alpha)
    });
    match result {
        Ok(png) => ok_with_message(
            "preview ready",
            PreviewMaskData {
                preview_image: to_data_url(&png, "image/png"),
            },
        ),
        Err(e) => error_response(&e),
    }
}

async fn list_furniture_types() -> HttpResponse {
    ok(furniture_kinds())
}

async fn list_decoration_types() -> HttpResponse {
    ok(decoration_kinds())
}
