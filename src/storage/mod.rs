pub mod local;
pub mod traits;

use crate::{config::Config, error::Result, models::GeneratedImage};
use std::sync::Arc;
use traits::ImageStore;

pub use local::LocalImageStore;
pub use traits::{ImageStore as ImageStoreTrait, StoredImage};

pub struct ImageStorageManager {
    backend: Arc<dyn ImageStore>,
}

impl ImageStorageManager {
    pub async fn new(config: &Config) -> Result<Self> {
        let backend: Arc<dyn ImageStore> = Arc::new(LocalImageStore::from_config(config).await?);
        Ok(Self { backend })
    }

    pub fn with_backend(backend: Arc<dyn ImageStore>) -> Self {
        Self { backend }
    }

    pub fn storage(&self) -> &Arc<dyn ImageStore> {
        &self.backend
    }

    /// Fresh identifier for one generation or edit job.
    pub fn new_task_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl ImageStorageManager {
    pub async fn save_input(&self, task_id: &str, bytes: &[u8]) -> Result<StoredImage> {
        self.backend.save_input(task_id, bytes).await
    }

    pub async fn save_outputs(&self, task_id: &str, images: &[GeneratedImage]) -> Result<Vec<StoredImage>> {
        self.backend.save_outputs(task_id, images).await
    }

    pub async fn load_output(&self, file_name: &str) -> Result<Vec<u8>> {
        self.backend.load_output(file_name).await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}
