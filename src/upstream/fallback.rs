use std::sync::Arc;

use super::UpstreamImageClient;
use crate::logger::Timer;
use crate::models::{GenerationRequest, ModelId, UpstreamResult};

/// Walks a model priority list until one model produces images.
///
/// A terminal failure ends the walk at once; a retryable one moves on to the
/// next model. The order is taken as given, with no shuffling or scoring.
pub struct FallbackOrchestrator {
    client: Arc<dyn UpstreamImageClient>,
    default_priority: Vec<ModelId>,
}

impl FallbackOrchestrator {
    pub fn new(client: Arc<dyn UpstreamImageClient>, default_priority: Vec<ModelId>) -> Self {
        Self {
            client,
            default_priority,
        }
    }

    pub fn default_priority(&self) -> &[ModelId] {
        &self.default_priority
    }

    pub async fn generate_with_fallback(&self, request: &GenerationRequest) -> UpstreamResult {
        let priority = if request.model_priority().is_empty() {
            self.default_priority.as_slice()
        } else {
            request.model_priority()
        };

        if priority.is_empty() {
            return UpstreamResult::terminal("no models configured");
        }

        let _timer = Timer::new("generate_with_fallback");
        let mut last_failure: Option<(ModelId, String)> = None;

        for (index, &model) in priority.iter().enumerate() {
            log::info!(
                "🔄 Trying model {} ({}/{}) via {}",
                model,
                index + 1,
                priority.len(),
                self.client.name()
            );

            match self.client.generate(request, model).await {
                UpstreamResult::Success { images, .. } => {
                    if index > 0 {
                        log::info!("✅ Fallback model {} succeeded", model);
                    }
                    return UpstreamResult::success(images, model);
                }
                UpstreamResult::TerminalFailure { reason } => {
                    log::error!("🛑 {} failed with a terminal error, not falling back: {}", model, reason);
                    return UpstreamResult::terminal(reason);
                }
                UpstreamResult::RetryableFailure { reason } => {
                    log::warn!("⚠️  {} unavailable, moving on: {}", model, reason);
                    last_failure = Some((model, reason));
                }
            }
        }

        match last_failure {
            Some((model, reason)) => {
                log::error!("❌ All {} model(s) failed", priority.len());
                UpstreamResult::retryable(format!(
                    "All models failed, last error ({}): {}",
                    model, reason
                ))
            }
            None => UpstreamResult::retryable("All models failed"),
        }
    }
}
