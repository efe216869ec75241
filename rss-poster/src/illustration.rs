use crate::traits::ImageGeneration;
use crate::types::ImageSize;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

pub const IMAGE_SIZE: ImageSize = ImageSize::Square1024;

/// Produces an illustration for a caption.
pub struct ImageSynthesizer {
    generator: Arc<dyn ImageGeneration>,
}

impl ImageSynthesizer {
    pub fn new(generator: Arc<dyn ImageGeneration>) -> Self {
        Self { generator }
    }

    /// URL of the generated image, or `None` when generation failed.
    pub async fn synthesize(&self, caption: &str) -> Option<String> {
        let prompt = build_prompt(caption);

        let location = match self.generator.generate_image(&prompt, IMAGE_SIZE).await {
            Ok(location) => location,
            Err(e) => {
                error!("Error generating image: {}", e);
                return None;
            }
        };

        match Url::parse(location.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                info!("Generated image at {}", url);
                Some(url.to_string())
            }
            _ => {
                error!("Image generator returned an unusable location: {:?}", location);
                None
            }
        }
    }
}

fn build_prompt(caption: &str) -> String {
    format!(
        "Create an eye-catching image for the following caption to an Instagram post.\n\
         Do not add any text to the image.\n\n\
         Caption:\n\n{}",
        caption
    )
}
