use crate::traits::{ImageGeneration, TextCompletion};
use crate::types::{ImageSize, PosterError, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// Client for an OpenAI-compatible API covering chat completions and image generation
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    text_model: String,
    image_model: String,
    max_retries: u32,
}

impl OpenAiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            max_retries: 2,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Send a request built by `build`, retrying rate limits and server errors.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(2),
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(60),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(180)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let response = build().bearer_auth(&self.api_key).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(PosterError::Auth(format!("API rejected credentials: {}", error_text)));
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("API returned {}, retrying in {:?}", status, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
            }

            return Err(PosterError::Transport(format!("API error {}: {}", status, error_text)));
        }
    }
}

#[async_trait]
impl TextCompletion for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.text_model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 1.0,
        };
        let url = format!("{}/chat/completions", self.api_base);

        debug!("Requesting chat completion from {}", self.text_model);
        let response = self.send(|| self.client.post(&url).json(&request)).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| PosterError::Parse(format!("Failed to parse completion response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PosterError::Parse("completion response contained no message".to_string()))
    }
}

#[async_trait]
impl ImageGeneration for OpenAiClient {
    async fn generate_image(&self, prompt: &str, size: ImageSize) -> Result<String> {
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: size.as_str(),
        };
        let url = format!("{}/images/generations", self.api_base);

        debug!("Requesting {} image from {}", size.as_str(), self.image_model);
        let response = self.send(|| self.client.post(&url).json(&request)).await?;

        let images: ImageResponse = response
            .json()
            .await
            .map_err(|e| PosterError::Parse(format!("Failed to parse image response: {}", e)))?;

        images
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or_else(|| PosterError::Parse("image response contained no URL".to_string()))
    }
}
