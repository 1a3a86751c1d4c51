use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::codec::{detect_mime_type, encode_base64};
use super::retry::{AttemptError, RetryPolicy};
use super::UpstreamImageClient;
use crate::config::GrsaiConfig;
use crate::error::{self, RoomGenError};
use crate::models::{GeneratedImage, GenerationRequest, ImageProvider, ModelId, UpstreamResult};

/// Result-endpoint code for an unknown or expired task id.
const TASK_NOT_FOUND: i64 = -22;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawRequest<'a> {
    model: &'static str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    urls: Vec<String>,
    aspect_ratio: &'static str,
    image_size: &'static str,
    shut_progress: bool,
    web_hook: &'static str,
}

/// Envelope shared by the submit and result endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SubmittedTask {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct TaskState {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    results: Vec<TaskOutput>,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    url: String,
}

impl TaskState {
    fn result_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.results.iter().map(|r| r.url.as_str()).collect();
        if urls.is_empty() {
            urls.extend(self.url.as_deref());
        }
        urls
    }

    fn failure_message(&self) -> String {
        let parts: Vec<&str> = [self.failure_reason.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if parts.is_empty() {
            "unknown failure".to_string()
        } else {
            parts.join(" - ")
        }
    }
}

/// Progress of a submitted draw task, for callers that poll on their own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawTask {
    pub task_id: String,
    pub status: String,
    pub progress: f64,
    pub results: Vec<String>,
    pub failure_reason: Option<String>,
    pub error: Option<String>,
}

impl DrawTask {
    fn from_state(task_id: &str, state: TaskState) -> Self {
        let results = state.result_urls().into_iter().map(str::to_string).collect();
        Self {
            task_id: state.id.filter(|id| !id.is_empty()).unwrap_or_else(|| task_id.to_string()),
            status: if state.status.is_empty() {
                "pending".to_string()
            } else {
                state.status
            },
            progress: state.progress.unwrap_or(0.0),
            results,
            failure_reason: state.failure_reason,
            error: state.error,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed")
    }
}

fn draw_request(request: &GenerationRequest, model: ModelId) -> DrawRequest<'_> {
    DrawRequest {
        model: model.as_str(),
        prompt: request.prompt_text(),
        urls: request
            .reference_image()
            .map(|bytes| vec![encode_base64(bytes)])
            .unwrap_or_default(),
        aspect_ratio: request.aspect_ratio().as_str(),
        image_size: request.image_size().as_str(),
        shut_progress: true,
        web_hook: "-1",
    }
}

/// Submit-then-poll draw API. Results arrive as URLs that are downloaded here.
pub struct GrsaiImageClient {
    http: reqwest::Client,
    config: GrsaiConfig,
    retry: RetryPolicy,
}

impl GrsaiImageClient {
    pub fn new(http: reqwest::Client, config: GrsaiConfig, retry: RetryPolicy) -> Self {
        Self { http, config, retry }
    }

    fn api_key(&self) -> error::Result<String> {
        self.config.credential.resolve().ok_or_else(|| {
            RoomGenError::ConfigError(format!("missing API key ({})", self.config.credential.describe()))
        })
    }

    /// Submits one draw task and returns its id without waiting for the result.
    pub async fn submit_task(&self, request: &GenerationRequest, model: ModelId) -> error::Result<String> {
        if model.provider() != ImageProvider::Grsai {
            return Err(RoomGenError::ValidationError(format!(
                "{} cannot run as a background draw task",
                model
            )));
        }
        let api_key = self.api_key()?;
        let task_id = self.submit(&draw_request(request, model), &api_key).await?;
        log::info!("📨 Submitted background draw task {} ({})", task_id, model);
        Ok(task_id)
    }

    /// Looks at a task once. Unknown ids are [`RoomGenError::NotFound`].
    pub async fn task_status(&self, task_id: &str) -> error::Result<DrawTask> {
        let api_key = self.api_key()?;
        let envelope: Envelope<TaskState> = self
            .post_envelope("/v1/draw/result", &json!({ "id": task_id }), &api_key)
            .await?;
        match envelope.code {
            0 => Ok(DrawTask::from_state(task_id, envelope.data.unwrap_or_default())),
            TASK_NOT_FOUND => Err(RoomGenError::NotFound(format!("task {}", task_id))),
            code => Err(RoomGenError::ResponseError(format!(
                "task query failed (code {}): {}",
                code, envelope.msg
            ))),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_envelope<T, B>(&self, path: &str, body: &B, api_key: &str) -> Result<Envelope<T>, AttemptError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AttemptError::from_status(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| AttemptError::Parse(e.to_string()))
    }

    async fn submit(&self, payload: &DrawRequest<'_>, api_key: &str) -> Result<String, AttemptError> {
        let envelope: Envelope<SubmittedTask> =
            self.post_envelope("/v1/draw/nano-banana", payload, api_key).await?;
        if envelope.code != 0 {
            return Err(AttemptError::TaskFailed(format!(
                "submit rejected (code {}): {}",
                envelope.code, envelope.msg
            )));
        }
        envelope
            .data
            .map(|task| task.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AttemptError::Parse("submit response carried no task id".to_string()))
    }

    async fn wait_for_task(&self, task_id: &str, api_key: &str) -> Result<TaskState, AttemptError> {
        let started = Instant::now();
        let body = json!({ "id": task_id });

        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            if started.elapsed() > self.config.max_wait {
                return Err(AttemptError::Timeout(format!(
                    "task {} did not finish within {}s",
                    task_id,
                    self.config.max_wait.as_secs()
                )));
            }

            let envelope: Envelope<TaskState> =
                match self.post_envelope("/v1/draw/result", &body, api_key).await {
                    Ok(envelope) => envelope,
                    Err(e) if e.is_retryable() => {
                        log::debug!("Polling task {} failed, will poll again: {}", task_id, e);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

            if envelope.code != 0 {
                log::debug!("Task {} not ready (code {}): {}", task_id, envelope.code, envelope.msg);
                continue;
            }

            let state = envelope.data.unwrap_or_default();
            match state.status.as_str() {
                "succeeded" => return Ok(state),
                "failed" => return Err(AttemptError::TaskFailed(state.failure_message())),
                other => log::debug!(
                    "Task {} is {} ({}%)",
                    task_id,
                    if other.is_empty() { "pending" } else { other },
                    state.progress.unwrap_or(0.0)
                ),
            }
        }
    }

    async fn download(&self, url: &str) -> Result<GeneratedImage, AttemptError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::from_status(status.as_u16(), &body));
        }
        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.starts_with("image/"))
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
        let bytes = response.bytes().await?.to_vec();
        let mime_type = header_mime.unwrap_or_else(|| detect_mime_type(&bytes).to_string());
        Ok(GeneratedImage::new(bytes, mime_type))
    }

    async fn attempt(&self, payload: &DrawRequest<'_>, api_key: &str) -> Result<Vec<GeneratedImage>, AttemptError> {
        let task_id = self.submit(payload, api_key).await?;
        log::info!("📨 Submitted draw task {}", task_id);

        let state = self.wait_for_task(&task_id, api_key).await?;
        let urls = state.result_urls();
        if urls.is_empty() {
            return Err(AttemptError::NoImages("no image data".to_string()));
        }

        let mut images = Vec::with_capacity(urls.len());
        for url in urls {
            let image = self.download(url).await?;
            if !image.bytes.is_empty() {
                images.push(image);
            }
        }
        Ok(images)
    }
}

#[async_trait]
impl UpstreamImageClient for GrsaiImageClient {
    fn name(&self) -> &str {
        "grsai"
    }

    async fn generate(&self, request: &GenerationRequest, model: ModelId) -> UpstreamResult {
        let Some(api_key) = self.config.credential.resolve() else {
            log::error!("❌ No API key available ({})", self.config.credential.describe());
            return UpstreamResult::terminal(format!(
                "missing API key ({})",
                self.config.credential.describe()
            ));
        };

        let payload = draw_request(request, model);
        log::info!(
            "🎨 Submitting {} draw task (aspect {}, size {})",
            model,
            payload.aspect_ratio,
            payload.image_size
        );

        self.retry
            .run(model, |_| self.attempt(&payload, &api_key))
            .await
    }
}
