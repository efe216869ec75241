use crate::types::{Credentials, ImageSize, NewPost, Post, Result};
use async_trait::async_trait;
use std::path::Path;

/// Trait for retrieving remote documents over HTTP
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch a document as text (feed XML, HTML)
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Fetch raw bytes (generated images)
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Single-turn chat completion
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Text-to-image generation returning the location of the generated image
#[async_trait]
pub trait ImageGeneration: Send + Sync {
    async fn generate_image(&self, prompt: &str, size: ImageSize) -> Result<String>;
}

/// Upload of a local photo with a caption to the destination account
#[async_trait]
pub trait PhotoUpload: Send + Sync {
    /// Returns the media handle assigned by the destination
    async fn upload_photo(&self, path: &Path, caption: &str, credentials: &Credentials) -> Result<String>;
}

/// Record of already handled posts.
///
/// Every title argument is normalized with [`crate::types::title_key`] by the
/// implementation, so callers pass raw feed titles.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Create the posts relation if needed. Returns `true` when it already existed.
    async fn ensure_schema(&self) -> Result<bool>;

    /// Drop all recorded posts and recreate the relation.
    async fn reset_schema(&self) -> Result<()>;

    async fn exists(&self, title: &str) -> Result<bool>;

    /// Returns `true` only when a new row was written.
    async fn insert_if_absent(&self, post: &NewPost) -> Result<bool>;

    async fn find(&self, title: &str) -> Result<Option<Post>>;

    async fn count(&self) -> Result<i64>;
}
