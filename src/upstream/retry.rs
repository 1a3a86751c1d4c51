use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::error::RoomGenError;
use crate::models::{GeneratedImage, ModelId, UpstreamResult};

/// Why a single upstream attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("upstream rejected the request ({status}): {body}")]
    Client { status: u16, body: String },
    #[error("{0}")]
    NoImages(String),
    #[error("unexpected response shape: {0}")]
    Parse(String),
    #[error("content rejected: {0}")]
    Rejected(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// Opaque failure text reported by an asynchronous task API.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl AttemptError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = truncate_text(body, 512);
        if status >= 500 {
            AttemptError::Server { status, body }
        } else {
            AttemptError::Client { status, body }
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Timeout(err.to_string())
        } else if err.is_builder() {
            AttemptError::Config(err.to_string())
        } else {
            AttemptError::Transport(err.to_string())
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Timeout(_)
            | AttemptError::Transport(_)
            | AttemptError::Server { .. }
            | AttemptError::NoImages(_)
            | AttemptError::Parse(_) => true,
            AttemptError::Client { status, .. } => matches!(status, 408 | 429),
            AttemptError::TaskFailed(reason) => classify_reason(reason),
            AttemptError::Rejected(_) | AttemptError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        AttemptError::from_reqwest(&err)
    }
}

/// For single-shot calls that report errors directly instead of through a retry loop.
impl From<AttemptError> for RoomGenError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Server { status, body } | AttemptError::Client { status, body } => {
                RoomGenError::UpstreamError { status, message: body }
            }
            AttemptError::Timeout(_) | AttemptError::Transport(_) => RoomGenError::RequestError(err.to_string()),
            AttemptError::Config(message) => RoomGenError::ConfigError(message),
            AttemptError::NoImages(_)
            | AttemptError::Parse(_)
            | AttemptError::Rejected(_)
            | AttemptError::TaskFailed(_) => RoomGenError::ResponseError(err.to_string()),
        }
    }
}

const RETRYABLE_MARKERS: [&str; 9] = [
    "timeout",
    "timed out",
    "503",
    "500",
    "502",
    "504",
    "unavailable",
    "overloaded",
    "no image",
];

/// Classifies a free-text upstream failure. Only for messages that carry no status code.
pub fn classify_reason(reason: &str) -> bool {
    let lowered = reason.to_ascii_lowercase();
    RETRYABLE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Same-model retry loop with linear backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep before the 1-based `attempt`: nothing for the first, then linear.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt.saturating_sub(1)
    }

    /// Runs `attempt` until it yields images, fails terminally or the budget is spent.
    /// The closure receives the 1-based attempt number.
    pub async fn run<F, Fut>(&self, model: ModelId, mut attempt: F) -> UpstreamResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Vec<GeneratedImage>, AttemptError>>,
    {
        let mut last_error: Option<AttemptError> = None;

        for n in 1..=self.max_attempts {
            let delay = self.delay_before(n);
            if !delay.is_zero() {
                log::info!(
                    "⏳ Retrying {} in {}ms (attempt {}/{})",
                    model,
                    delay.as_millis(),
                    n,
                    self.max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            log::debug!("🎨 {} attempt {}/{}", model, n, self.max_attempts);
            let error = match attempt(n).await {
                Ok(images) if !images.is_empty() => {
                    log::info!("✅ {} returned {} image(s) on attempt {}", model, images.len(), n);
                    return UpstreamResult::success(images, model);
                }
                Ok(_) => AttemptError::NoImages("no image data".to_string()),
                Err(e) => e,
            };

            if !error.is_retryable() {
                log::error!("❌ {} failed terminally on attempt {}: {}", model, n, error);
                return UpstreamResult::terminal(error.to_string());
            }

            log::warn!(
                "⚠️  {} attempt {}/{} failed: {}",
                model,
                n,
                self.max_attempts,
                error
            );
            last_error = Some(error);
        }

        match last_error {
            Some(error @ AttemptError::Parse(_)) => {
                log::error!("❌ {} kept returning malformed responses: {}", model, error);
                UpstreamResult::terminal(error.to_string())
            }
            Some(error) => UpstreamResult::retryable(error.to_string()),
            None => UpstreamResult::retryable("no attempts were made"),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_attempts, config.backoff_base)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn image() -> GeneratedImage {
        GeneratedImage::new(vec![1, 2, 3], "image/png")
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[test]
    fn test_status_classification() {
        assert!(AttemptError::from_status(503, "busy").is_retryable());
        assert!(AttemptError::from_status(429, "slow down").is_retryable());
        assert!(AttemptError::from_status(408, "").is_retryable());
        assert!(!AttemptError::from_status(401, "bad key").is_retryable());
        assert!(!AttemptError::from_status(400, "bad payload").is_retryable());
        assert!(!AttemptError::Rejected("SAFETY".into()).is_retryable());
        assert!(AttemptError::NoImages("no candidates".into()).is_retryable());
        assert!(AttemptError::TaskFailed("upstream timeout".into()).is_retryable());
        assert!(!AttemptError::TaskFailed("prompt violates policy".into()).is_retryable());
    }

    #[test]
    fn test_attempt_errors_map_to_route_errors() {
        let err = RoomGenError::from(AttemptError::from_status(401, "bad key"));
        assert!(matches!(err, RoomGenError::UpstreamError { status: 401, .. }));
        let err = RoomGenError::from(AttemptError::Timeout("slow".into()));
        assert_eq!(err.status_code(), 503);
        let err = RoomGenError::from(AttemptError::TaskFailed("moderated".into()));
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_classify_reason() {
        assert!(classify_reason("Gateway Timeout"));
        assert!(classify_reason("HTTP 503 Service Unavailable"));
        assert!(classify_reason("model is overloaded"));
        assert!(!classify_reason("invalid api key"));
    }

    #[test]
    fn test_backoff_is_linear_in_retries() {
        let retry = RetryPolicy::from(&RetryConfig::new(3, Duration::from_millis(500)));
        assert_eq!(retry.delay_before(1), Duration::ZERO);
        assert_eq!(retry.delay_before(2), Duration::from_millis(500));
        assert_eq!(retry.delay_before(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .run(ModelId::GeminiProImage, |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(AttemptError::from_status(500, "oops"))
                    } else {
                        Ok(vec![image()])
                    }
                }
            })
            .await;
        assert_eq!(result.model_used(), Some(ModelId::GeminiProImage));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .run(ModelId::GeminiProImage, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::from_status(401, "invalid key")) }
            })
            .await;
        assert!(result.is_terminal());
        assert!(result.failure_reason().unwrap().contains("401"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_last_error() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .run(ModelId::GeminiFlashImage, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Vec::new()) }
            })
            .await;
        assert!(result.is_retryable());
        assert_eq!(result.failure_reason(), Some("no image data"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_repeated_parse_errors_become_terminal() {
        let result = policy()
            .run(ModelId::GeminiFlashImage, |_| async {
                Err(AttemptError::Parse("expected object".into()))
            })
            .await;
        assert!(result.is_terminal());
    }
}
