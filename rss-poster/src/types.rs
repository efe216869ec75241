use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters of a title kept as the storage key.
pub const TITLE_KEY_CHARS: usize = 30;

/// Upper bound for a generated caption.
pub const MAX_CAPTION_CHARS: usize = 2000;

/// Normalize a title into the key used for duplicate detection.
///
/// Counts characters rather than bytes so multi-byte titles never split a code point.
pub fn title_key(title: &str) -> String {
    title.chars().take(TITLE_KEY_CHARS).collect()
}

/// A single item read from a feed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// URL of the feed document the entry came from
    pub feed: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body: String,
    pub link: Option<String>,
}

/// Caption and narration script produced for one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedContent {
    pub caption: String,
    pub script: String,
}

/// A post about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub feed: String,
    pub title: String,
    pub caption: String,
    pub script: String,
    pub image_url: String,
}

impl NewPost {
    pub fn new(entry: &FeedEntry, content: &SynthesizedContent, image_url: &str) -> Self {
        Self {
            feed: entry.feed.clone(),
            title: entry.title.clone(),
            caption: content.caption.clone(),
            script: content.script.clone(),
            image_url: image_url.to_string(),
        }
    }

    pub fn title_key(&self) -> String {
        title_key(&self.title)
    }
}

/// A recorded post as stored in the `posts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i32,
    pub feed: Option<String>,
    pub title: String,
    pub caption: Option<String>,
    pub script: Option<String>,
    pub image_url: Option<String>,
    #[sqlx(rename = "datetime")]
    pub created_at: DateTime<Utc>,
}

/// Resolution requested from the image generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Square1024,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square1024 => "1024x1024",
        }
    }
}

/// Credentials for the destination account.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Poster/1.0".to_string(),
            timeout_seconds: 60,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PosterError>;
