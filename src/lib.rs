pub mod config;
pub mod error;
pub mod imaging;
pub mod logger;
pub mod models;
pub mod prompt;
pub mod storage;
pub mod upstream;

#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, Credential};
pub use error::{Result, RoomGenError};
pub use models::{
    AspectRatio, GeneratedImage, GenerationRequest, ImageProvider, ImageSize, ModelId,
    UpstreamResult,
};
pub use prompt::{assemble_prompt, PromptInput};
pub use storage::{ImageStorageManager, LocalImageStore};
pub use upstream::{FallbackOrchestrator, UpstreamContext, UpstreamImageClient};
