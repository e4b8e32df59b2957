use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::EnrichResult;

/// Object store for poster images. `upload` returns a retrievable URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, name: &str, data: &[u8]) -> EnrichResult<String>;
}

/// Keep alphanumerics, spaces, hyphens and underscores.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect()
}

pub fn blob_name(title: &str, year: i32) -> String {
    format!("{}-{}.jpg", sanitize_title(title), year)
}

/// Stores blobs as files in a directory served under `base_url`.
pub struct FsBlobStore {
    dir: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, name: &str, data: &[u8]) -> EnrichResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, data).await?;
        debug!(path = %path.display(), bytes = data.len(), "Stored blob");
        Ok(self.url_for(name))
    }
}
