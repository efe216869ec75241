use crate::traits::HttpFetch;
use crate::types::{FetchConfig, PosterError, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        }
    }

    /// GET `url`, retrying connection errors and retryable statuses.
    async fn get_with_retries(&self, url: &str) -> Result<Response> {
        let mut backoff = self.backoff();
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        self.check_size(&response)?;
                        return Ok(response);
                    }

                    let err = PosterError::Transport(format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ));
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
                Err(e) => {
                    last_error = Some(PosterError::Http(e));
                }
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        error!("Failed to fetch {} after {} attempts", url, self.config.max_retries + 1);
        Err(last_error.unwrap_or_else(|| PosterError::Transport(format!("Failed to fetch {}", url))))
    }

    fn max_body_bytes(&self) -> usize {
        self.config.max_feed_size_mb * 1024 * 1024
    }

    fn check_size(&self, response: &Response) -> Result<()> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_body_bytes() {
                return Err(too_large(content_length as usize));
            }
        }
        Ok(())
    }

    /// Read the body chunk by chunk, failing as soon as it outgrows the limit.
    async fn read_body(&self, mut response: Response) -> Result<Vec<u8>> {
        let limit = self.max_body_bytes();
        let mut body = Vec::new();

        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

fn too_large(bytes: usize) -> PosterError {
    PosterError::Transport(format!("Response too large: over {}MB", bytes / (1024 * 1024)))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[async_trait]
impl HttpFetch for Fetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("Fetching document: {}", url);
        let response = self.get_with_retries(url).await?;
        let body = self.read_body(response).await?;
        let content = String::from_utf8(body)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        info!("Fetched {} ({} bytes)", url, content.len());
        Ok(content)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching binary content: {}", url);
        let response = self.get_with_retries(url).await?;
        self.read_body(response).await
    }
}
