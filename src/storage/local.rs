use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;

use super::traits::{ImageStore, StoredImage};
use crate::config::Config;
use crate::error::{Result, RoomGenError};
use crate::models::GeneratedImage;
use crate::upstream::codec::detect_mime_type;

/// Keeps input and output images in two local directories.
pub struct LocalImageStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl LocalImageStore {
    pub async fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        };
        tokio::fs::create_dir_all(&store.input_dir).await?;
        tokio::fs::create_dir_all(&store.output_dir).await?;
        log::info!(
            "📁 Image store ready (input: {}, output: {})",
            store.input_dir.display(),
            store.output_dir.display()
        );
        Ok(store)
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.input_dir.clone(), config.output_dir.clone()).await
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn write(dir: &Path, url_prefix: &str, file_name: String, bytes: &[u8]) -> Result<StoredImage> {
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            RoomGenError::StorageError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        log::debug!("💾 Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(StoredImage {
            url: format!("{}/{}", url_prefix, file_name),
            file_name,
            path,
            size_bytes: bytes.len() as u64,
        })
    }
}

fn task_prefix(task_id: &str) -> String {
    let cleaned: String = task_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    if cleaned.is_empty() {
        "task".to_string()
    } else {
        cleaned
    }
}

fn extension_for(bytes: &[u8]) -> &'static str {
    match detect_mime_type(bytes) {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save_input(&self, task_id: &str, bytes: &[u8]) -> Result<StoredImage> {
        let file_name = format!(
            "{}_{}_input.{}",
            timestamp(),
            task_prefix(task_id),
            extension_for(bytes)
        );
        Self::write(&self.input_dir, "/input", file_name, bytes).await
    }

    async fn save_outputs(&self, task_id: &str, images: &[GeneratedImage]) -> Result<Vec<StoredImage>> {
        let stamp = timestamp();
        let prefix = task_prefix(task_id);
        let mut stored = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let file_name = format!("{}_{}_output_{}.{}", stamp, prefix, index, image.extension());
            stored.push(Self::write(&self.output_dir, "/output", file_name, &image.bytes).await?);
        }
        Ok(stored)
    }

    async fn load_output(&self, file_name: &str) -> Result<Vec<u8>> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.contains("..")
        {
            return Err(RoomGenError::ValidationError(format!(
                "Invalid file name: {}",
                file_name
            )));
        }
        let path = self.output_dir.join(file_name);
        tokio::fs::read(&path).await.map_err(|e| {
            RoomGenError::StorageError(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let input_ok = tokio::fs::metadata(&self.input_dir).await.map(|m| m.is_dir()).unwrap_or(false);
        let output_ok = tokio::fs::metadata(&self.output_dir).await.map(|m| m.is_dir()).unwrap_or(false);
        Ok(input_ok && output_ok)
    }
}
