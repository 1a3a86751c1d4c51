pub mod analysis_client;
pub mod codec;
pub mod fallback;
pub mod gemini;
pub mod grsai;
pub mod inpaint_client;
pub mod retry;
pub mod segment_client;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, TimeoutConfig};
use crate::error::{Result, RoomGenError};
use crate::models::{GenerationRequest, ImageProvider, ModelId, UpstreamResult};

pub use analysis_client::VisionAnalysisClient;
pub use fallback::FallbackOrchestrator;
pub use gemini::GeminiImageClient;
pub use grsai::{DrawTask, GrsaiImageClient};
pub use inpaint_client::InpaintClient;
pub use retry::{classify_reason, AttemptError, RetryPolicy};
pub use segment_client::SegmentationClient;

/// One generation attempt chain against one upstream model.
///
/// Implementations retry the same model internally and always answer with
/// the normalized [`UpstreamResult`], whatever the wire format.
#[async_trait]
pub trait UpstreamImageClient: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest, model: ModelId) -> UpstreamResult;
}

/// Sends each model to the client for its provider, so one priority list may mix providers.
#[derive(Default)]
pub struct ProviderRouter {
    clients: HashMap<ImageProvider, Arc<dyn UpstreamImageClient>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: ImageProvider, client: Arc<dyn UpstreamImageClient>) -> Self {
        self.clients.insert(provider, client);
        self
    }
}

#[async_trait]
impl UpstreamImageClient for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn generate(&self, request: &GenerationRequest, model: ModelId) -> UpstreamResult {
        match self.clients.get(&model.provider()) {
            Some(client) => client.generate(request, model).await,
            None => UpstreamResult::terminal(format!(
                "no client configured for provider {:?} (model {})",
                model.provider(),
                model
            )),
        }
    }
}

pub fn build_http_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .timeout(timeouts.total())
        .user_agent(concat!("roomgen/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RoomGenError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Every network-facing component, built once at startup around one shared connection pool.
#[derive(Clone)]
pub struct UpstreamContext {
    image_client: Arc<dyn UpstreamImageClient>,
    grsai: Arc<GrsaiImageClient>,
    orchestrator: Arc<FallbackOrchestrator>,
    analysis: Arc<VisionAnalysisClient>,
    segmentation: Arc<SegmentationClient>,
    inpaint: Arc<InpaintClient>,
}

impl UpstreamContext {
    pub fn new(config: &Config) -> Result<Self> {
        let http = build_http_client(&config.timeouts)?;
        let grsai = Self::grsai_client(config, &http);

        let router = ProviderRouter::new()
            .with_provider(
                ImageProvider::Gemini,
                Arc::new(GeminiImageClient::new(
                    http.clone(),
                    config.gemini.clone(),
                    RetryPolicy::from(&config.retry),
                )),
            )
            .with_provider(ImageProvider::Grsai, grsai.clone());

        Ok(Self::assemble(config, http, Arc::new(router), grsai))
    }

    /// Same wiring with a caller-supplied image client, e.g. a scripted fake.
    pub fn with_image_client(config: &Config, image_client: Arc<dyn UpstreamImageClient>) -> Result<Self> {
        let http = build_http_client(&config.timeouts)?;
        let grsai = Self::grsai_client(config, &http);
        Ok(Self::assemble(config, http, image_client, grsai))
    }

    fn grsai_client(config: &Config, http: &reqwest::Client) -> Arc<GrsaiImageClient> {
        Arc::new(GrsaiImageClient::new(
            http.clone(),
            config.grsai.clone(),
            RetryPolicy::from(&config.retry),
        ))
    }

    fn assemble(
        config: &Config,
        http: reqwest::Client,
        image_client: Arc<dyn UpstreamImageClient>,
        grsai: Arc<GrsaiImageClient>,
    ) -> Self {
        let orchestrator = FallbackOrchestrator::new(image_client.clone(), config.model_priority.clone());
        Self {
            image_client,
            grsai,
            orchestrator: Arc::new(orchestrator),
            analysis: Arc::new(VisionAnalysisClient::new(http.clone(), config.analysis.clone())),
            segmentation: Arc::new(SegmentationClient::new(http.clone(), config.segmentation.clone())),
            inpaint: Arc::new(InpaintClient::new(http, config.inpaint.clone())),
        }
    }

    pub fn image_client(&self) -> &Arc<dyn UpstreamImageClient> {
        &self.image_client
    }

    /// Direct handle for background draw tasks that callers poll themselves.
    pub fn grsai(&self) -> &GrsaiImageClient {
        &self.grsai
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    pub fn analysis(&self) -> &VisionAnalysisClient {
        &self.analysis
    }

    pub fn segmentation(&self) -> &SegmentationClient {
        &self.segmentation
    }

    pub fn inpaint(&self) -> &InpaintClient {
        &self.inpaint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeneratedImage;

    struct Fixed(&'static str);

    #[async_trait]
    impl UpstreamImageClient for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn generate(&self, _request: &GenerationRequest, model: ModelId) -> UpstreamResult {
            UpstreamResult::success(vec![GeneratedImage::new(self.0.as_bytes().to_vec(), "image/png")], model)
        }
    }

    #[tokio::test]
    async fn test_router_dispatches_by_provider() {
        let router = ProviderRouter::new()
            .with_provider(ImageProvider::Gemini, Arc::new(Fixed("gemini")))
            .with_provider(ImageProvider::Grsai, Arc::new(Fixed("grsai")));
        let request = GenerationRequest::builder("render").build().unwrap();

        match router.generate(&request, ModelId::NanoBananaPro).await {
            UpstreamResult::Success { images, .. } => assert_eq!(images[0].bytes, b"grsai"),
            other => panic!("unexpected result: {:?}", other),
        }
        match router.generate(&request, ModelId::GeminiProImage).await {
            UpstreamResult::Success { images, .. } => assert_eq!(images[0].bytes, b"gemini"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_router_without_provider_is_terminal() {
        let router = ProviderRouter::new().with_provider(ImageProvider::Gemini, Arc::new(Fixed("gemini")));
        let request = GenerationRequest::builder("render").build().unwrap();
        assert!(router.generate(&request, ModelId::NanoBanana).await.is_terminal());
    }

    #[tokio::test]
    async fn test_context_builds_from_default_config() {
        let context = UpstreamContext::new(&Config::default()).unwrap();
        assert_eq!(context.image_client().name(), "router");
        assert_eq!(
            context.orchestrator().default_priority(),
            ModelId::default_priority(ImageProvider::Gemini).as_slice()
        );
    }
}
