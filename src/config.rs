use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{ImageProvider, ModelId};

pub const DEFAULT_PORT: u16 = 8000;

/// Where an API secret comes from. `Env` is looked up on every call so a
/// rotated key takes effect without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Env(String),
    Static(String),
    None,
}

impl Credential {
    pub fn resolve(&self) -> Option<String> {
        match self {
            Credential::Env(name) => env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            Credential::Static(value) if !value.trim().is_empty() => Some(value.clone()),
            Credential::Static(_) | Credential::None => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Credential::Env(name) => format!("env:{}", name),
            Credential::Static(_) => "static".to_string(),
            Credential::None => "none".to_string(),
        }
    }
}

/// How the API key is attached to Gemini-compatible requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    GoogApiKey,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub credential: Credential,
    pub auth_scheme: AuthScheme,
}

#[derive(Debug, Clone)]
pub struct GrsaiConfig {
    pub base_url: String,
    pub credential: Credential,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub credential: Credential,
    pub models: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    pub base_url: String,
    pub model_id: String,
    pub credential: Credential,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InpaintConfig {
    pub base_url: String,
    pub credential: Credential,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Delay before attempt `n` is `(n - 1) * backoff_base`.
    pub backoff_base: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub provider: ImageProvider,
    pub model_priority: Vec<ModelId>,
    pub gemini: GeminiConfig,
    pub grsai: GrsaiConfig,
    pub analysis: AnalysisConfig,
    pub segmentation: SegmentationConfig,
    pub inpaint: InpaintConfig,
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            base_url: "https://api.apiyi.com".to_string(),
            credential: Credential::Env("APIYI_KEY".to_string()),
            auth_scheme: AuthScheme::Bearer,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = env_string("GEMINI_API_BASE") {
            config.base_url = base_url;
        }
        if let Some(var) = env_string("GEMINI_API_KEY_VAR") {
            config.credential = Credential::Env(var);
        }
        if let Some(scheme) = env_string("GEMINI_AUTH") {
            config.auth_scheme = match scheme.to_ascii_lowercase().as_str() {
                "goog" | "x-goog-api-key" => AuthScheme::GoogApiKey,
                _ => AuthScheme::Bearer,
            };
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_auth_scheme(mut self, auth_scheme: AuthScheme) -> Self {
        self.auth_scheme = auth_scheme;
        self
    }
}

impl Default for GrsaiConfig {
    fn default() -> Self {
        GrsaiConfig {
            base_url: "https://grsai.dakka.com.cn".to_string(),
            credential: Credential::Env("GRSAI_API_KEY".to_string()),
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl GrsaiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = env_string("GRSAI_API_URL") {
            config.base_url = base_url;
        }
        if let Some(secs) = env_parse::<f64>("GRSAI_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs_f64(secs.max(0.1));
        }
        if let Some(secs) = env_parse::<u64>("GRSAI_MAX_WAIT_SECS") {
            config.max_wait = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            base_url: "https://api.apiyi.com".to_string(),
            credential: Credential::Env("LLM_APIYI_KEY".to_string()),
            models: vec![
                "gemini-3-flash-preview".to_string(),
                "gemini-2.5-flash-preview".to_string(),
            ],
            timeout: Duration::from_secs(60),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = env_string("LLM_API_BASE") {
            config.base_url = base_url;
        }
        if let Some(models) = env_string("LLM_MODEL_PRIORITY") {
            let models: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
            if !models.is_empty() {
                config.models = models;
            }
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        SegmentationConfig {
            base_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            model_id: "facebook/sam2-hiera-large".to_string(),
            credential: Credential::Env("HF_TOKEN".to_string()),
            timeout: Duration::from_secs(120),
        }
    }
}

impl SegmentationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = env_string("SEGMENT_API_BASE") {
            config.base_url = base_url;
        }
        if let Some(model_id) = env_string("SEGMENT_MODEL_ID") {
            config.model_id = model_id;
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.model_id.trim_start_matches('/')
        )
    }
}

impl Default for InpaintConfig {
    fn default() -> Self {
        InpaintConfig {
            base_url: "https://grsai.dakka.com.cn".to_string(),
            credential: Credential::Env("GRSAI_API_KEY".to_string()),
            model: "nano-banana".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl InpaintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = env_string("GRSAI_API_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = env_string("INPAINT_MODEL") {
            config.model = model;
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        RetryConfig {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self::new(
            env_parse("UPSTREAM_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            env_parse("UPSTREAM_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_base),
        )
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            connect: Duration::from_secs(30),
            read: Duration::from_secs(300),
            write: Duration::from_secs(30),
        }
    }
}

impl TimeoutConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        TimeoutConfig {
            connect: env_parse("CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect),
            read: env_parse("READ_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.read),
            write: env_parse("WRITE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.write),
        }
    }

    /// Upper bound for one whole attempt (connect + upload + slow read).
    pub fn total(&self) -> Duration {
        self.connect + self.write + self.read
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            provider: ImageProvider::Gemini,
            model_priority: ModelId::default_priority(ImageProvider::Gemini),
            gemini: GeminiConfig::default(),
            grsai: GrsaiConfig::default(),
            analysis: AnalysisConfig::default(),
            segmentation: SegmentationConfig::default(),
            inpaint: InpaintConfig::default(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let provider = env_string("IMAGE_PROVIDER")
            .and_then(|raw| match raw.parse::<ImageProvider>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    log::warn!("{}, falling back to gemini", e);
                    None
                }
            })
            .unwrap_or(ImageProvider::Gemini);

        let model_priority = match env_string("MODEL_PRIORITY") {
            Some(raw) => match ModelId::parse_priority(&raw) {
                Ok(models) if !models.is_empty() => models,
                Ok(_) => ModelId::default_priority(provider),
                Err(e) => {
                    log::warn!("Ignoring MODEL_PRIORITY: {}", e);
                    ModelId::default_priority(provider)
                }
            },
            None => ModelId::default_priority(provider),
        };

        Config {
            port,
            input_dir: env_string("INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("input")),
            output_dir: env_string("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            provider,
            model_priority,
            gemini: GeminiConfig::from_env(),
            grsai: GrsaiConfig::from_env(),
            analysis: AnalysisConfig::from_env(),
            segmentation: SegmentationConfig::from_env(),
            inpaint: InpaintConfig::from_env(),
            retry: RetryConfig::from_env(),
            timeouts: TimeoutConfig::from_env(),
        }
    }

    pub fn server_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_provider(mut self, provider: ImageProvider) -> Self {
        self.provider = provider;
        self.model_priority = ModelId::default_priority(provider);
        self
    }

    pub fn with_model_priority(mut self, models: Vec<ModelId>) -> Self {
        self.model_priority = models;
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_grsai(mut self, config: GrsaiConfig) -> Self {
        self.grsai = config;
        self
    }

    pub fn with_analysis(mut self, config: AnalysisConfig) -> Self {
        self.analysis = config;
        self
    }

    pub fn with_segmentation(mut self, config: SegmentationConfig) -> Self {
        self.segmentation = config;
        self
    }

    pub fn with_inpaint(mut self, config: InpaintConfig) -> Self {
        self.inpaint = config;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_storage_dirs(mut self, input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        self.input_dir = input_dir.into();
        self.output_dir = output_dir.into();
        self
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|value| value.parse().ok())
}
