use crate::{error::Result, models::GeneratedImage};
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save_input(&self, task_id: &str, bytes: &[u8]) -> Result<StoredImage>;

    /// Saves every image of one result, numbered in order.
    async fn save_outputs(&self, task_id: &str, images: &[GeneratedImage]) -> Result<Vec<StoredImage>>;

    async fn load_output(&self, file_name: &str) -> Result<Vec<u8>>;

    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredImage {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    /// Path the route layer serves the file under, e.g. `/output/<file_name>`.
    pub url: String,
    pub size_bytes: u64,
}
