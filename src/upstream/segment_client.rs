use serde_json::{json, Value};

use super::codec::encode_base64;
use super::retry::truncate_text;
use crate::config::SegmentationConfig;
use crate::error::{Result, RoomGenError};
use crate::models::{SegmentSelector, SegmentationResult};

/// Single-shot client for a hosted SAM-style segmentation model. No retries.
pub struct SegmentationClient {
    http: reqwest::Client,
    config: SegmentationConfig,
}

impl SegmentationClient {
    pub fn new(http: reqwest::Client, config: SegmentationConfig) -> Self {
        Self { http, config }
    }

    pub async fn segment(&self, image: &[u8], selector: &SegmentSelector) -> Result<SegmentationResult> {
        if image.is_empty() {
            return Err(RoomGenError::ValidationError("Image is empty".to_string()));
        }

        let payload = build_payload(&encode_base64(image), selector);
        let mut request = self
            .http
            .post(self.config.endpoint())
            .timeout(self.config.timeout)
            .json(&payload);
        // the hosted endpoint also serves anonymous callers, with lower limits
        if let Some(token) = self.config.credential.resolve() {
            request = request.bearer_auth(token);
        }

        log::info!("✂️  Segmenting image ({} bytes) by {:?}", image.len(), selector_kind(selector));
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log::error!("❌ Segmentation failed with status {}", status);
            return Err(RoomGenError::UpstreamError {
                status: status.as_u16(),
                message: truncate_text(&body, 512),
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        let result = parse_result(value)?;
        log::info!("✂️  Segmentation returned {} mask(s)", result.masks.len());
        Ok(result)
    }
}

fn selector_kind(selector: &SegmentSelector) -> &'static str {
    match selector {
        SegmentSelector::Point { .. } => "point",
        SegmentSelector::Box { .. } => "box",
        SegmentSelector::Text { .. } => "text",
    }
}

fn build_payload(image_b64: &str, selector: &SegmentSelector) -> Value {
    match selector {
        SegmentSelector::Point { x, y, label } => json!({
            "inputs": {
                "image": image_b64,
                "input_points": [[[x, y]]],
                "input_labels": [[label]]
            }
        }),
        SegmentSelector::Box { x1, y1, x2, y2, label } => json!({
            "inputs": {
                "image": image_b64,
                "input_boxes": [[[x1, y1, x2, y2]]],
                "input_boxes_labels": [[label]]
            }
        }),
        SegmentSelector::Text { prompt, threshold } => json!({
            "inputs": { "image": image_b64, "text": prompt },
            "parameters": { "threshold": threshold }
        }),
    }
}

/// Accepts either the aggregated `{masks, boxes, scores, labels}` object or a
/// list of per-segment `{mask, box, score, label}` rows.
fn parse_result(value: Value) -> Result<SegmentationResult> {
    match value {
        Value::Array(rows) => {
            let mut result = SegmentationResult::default();
            for row in rows {
                if let Some(mask) = row.get("mask") {
                    result.masks.push(mask.clone());
                }
                if let Some(bbox) = row.get("box") {
                    result.boxes.push(bbox.clone());
                }
                if let Some(score) = row.get("score").and_then(Value::as_f64) {
                    result.scores.push(score);
                }
                if let Some(label) = row.get("label").and_then(Value::as_str) {
                    result.labels.push(label.to_string());
                }
            }
            Ok(result)
        }
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(RoomGenError::ResponseError(format!(
            "Unexpected segmentation response: {}",
            truncate_text(&other.to_string(), 200)
        ))),
    }
}
