use crate::traits::{HttpFetch, PhotoUpload};
use crate::types::{Credentials, Result};
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Uploads generated images with their caption to the destination account.
///
/// Every publish call stages the remote image as a JPEG file in the staging
/// directory. The staged file belongs to that call alone and is removed before
/// the call returns, whatever the outcome.
pub struct Publisher {
    fetcher: Arc<dyn HttpFetch>,
    uploader: Arc<dyn PhotoUpload>,
    credentials: Credentials,
    staging_dir: PathBuf,
}

impl Publisher {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        uploader: Arc<dyn PhotoUpload>,
        credentials: Credentials,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            uploader,
            credentials,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Returns the media handle of the new post.
    pub async fn publish(&self, image_url: &str, caption: &str) -> Result<String> {
        let staged = self.stage(image_url).await?;
        debug!("Staged image at {}", staged.path().display());

        let result = self
            .uploader
            .upload_photo(staged.path(), caption, &self.credentials)
            .await;

        release(staged);

        let media = result?;
        info!("Post successfully added: {}", media);
        Ok(media)
    }

    /// Download `image_url` and re-encode it as JPEG into a fresh staged file.
    /// On error the partially written file is dropped, which deletes it.
    async fn stage(&self, image_url: &str) -> Result<NamedTempFile> {
        let bytes = self.fetcher.fetch_bytes(image_url).await?;

        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let mut staged = tempfile::Builder::new()
            .prefix("post-")
            .suffix(".jpg")
            .tempfile_in(&self.staging_dir)?;

        encode_jpeg(&bytes, &mut staged)?;
        Ok(staged)
    }
}

fn encode_jpeg(bytes: &[u8], staged: &mut NamedTempFile) -> Result<()> {
    let decoded = image::load_from_memory(bytes)?;
    // JPEG carries no alpha channel
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    rgb.write_to(staged.as_file_mut(), ImageFormat::Jpeg)?;
    staged.as_file_mut().sync_all()?;
    Ok(())
}

fn release(staged: NamedTempFile) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.close() {
        warn!("Failed to remove staged image {}: {}", path.display(), e);
    } else {
        debug!("Removed staged image {}", path.display());
    }
}
