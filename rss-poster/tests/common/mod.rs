#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use image::{ImageBuffer, ImageFormat, Rgba};
use rss_poster::{
    ContentSynthesizer, Credentials, FeedReader, HttpFetch, ImageGeneration, ImageSize,
    ImageSynthesizer, MemoryPostStore, NewPost, PhotoUpload, Pipeline, PipelineConfig, Post,
    PostStore, PosterError, Publisher, PublishMode, Result, RunMode, TextCompletion,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const IMAGE_URL: &str = "https://images.example.com/generated/abc123.png";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

/// `(title, hours before fixed_now, or None for no pubDate)`
pub fn rss_feed(items: &[(&str, Option<i64>)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test feed</title><link>https://news.example.com</link><description>Test</description>"#,
    );
    for (i, (title, age)) in items.iter().enumerate() {
        xml.push_str("<item>");
        xml.push_str(&format!("<title>{}</title>", title));
        xml.push_str(&format!("<link>https://news.example.com/{}</link>", i));
        xml.push_str(&format!("<description>Article body for {}</description>", title));
        if let Some(hours) = age {
            let published = fixed_now() - Duration::hours(*hours);
            xml.push_str(&format!("<pubDate>{}</pubDate>", published.to_rfc2822()));
        }
        xml.push_str("</item>");
    }
    xml.push_str("</channel></rss>");
    xml
}

pub fn png_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(8, 8, Rgba([200u8, 30, 30, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub struct FakeFetcher {
    documents: HashMap<String, String>,
    image: Option<Vec<u8>>,
    pub text_calls: AtomicUsize,
    pub byte_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            image: Some(png_bytes()),
            text_calls: AtomicUsize::new(0),
            byte_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_feed(mut self, url: &str, body: String) -> Self {
        self.documents.insert(url.to_string(), body);
        self
    }

    pub fn with_image(mut self, bytes: Option<Vec<u8>>) -> Self {
        self.image = bytes;
        self
    }
}

#[async_trait]
impl HttpFetch for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| PosterError::Transport(format!("connection refused: {}", url)))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.byte_calls.fetch_add(1, Ordering::SeqCst);
        self.image
            .clone()
            .ok_or_else(|| PosterError::Transport(format!("image unavailable: {}", url)))
    }
}

pub struct FakeCompletion {
    response: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeCompletion {
    pub fn replying(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn valid() -> Self {
        Self::replying(r#"{"caption": "AI just leveled up! #ai", "script": "Big news in artificial intelligence today."}"#)
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletion for FakeCompletion {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| PosterError::Transport("completion service unavailable".to_string()))
    }
}

pub struct FakeImageGenerator {
    location: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeImageGenerator {
    pub fn returning(location: &str) -> Self {
        Self {
            location: Some(location.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn valid() -> Self {
        Self::returning(IMAGE_URL)
    }

    pub fn failing() -> Self {
        Self {
            location: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGeneration for FakeImageGenerator {
    async fn generate_image(&self, _prompt: &str, _size: ImageSize) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.location
            .clone()
            .ok_or_else(|| PosterError::Transport("image service unavailable".to_string()))
    }
}

/// Records every staged path it was handed and whether it held a JPEG at upload time.
pub struct FakeUploader {
    fail_with_auth: bool,
    pub uploads: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeUploader {
    pub fn succeeding() -> Self {
        Self {
            fail_with_auth: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            fail_with_auth: true,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl PhotoUpload for FakeUploader {
    async fn upload_photo(&self, path: &Path, _caption: &str, _credentials: &Credentials) -> Result<String> {
        let is_jpeg = std::fs::read(path)
            .map(|bytes| bytes.starts_with(&[0xFF, 0xD8]))
            .unwrap_or(false);
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((path.to_path_buf(), is_jpeg));

        if self.fail_with_auth {
            Err(PosterError::Auth("bad password".to_string()))
        } else {
            Ok(format!("media-{}", uploads.len()))
        }
    }
}

/// Store whose every operation fails, as when the database is unreachable.
pub struct UnavailableStore;

#[async_trait]
impl PostStore for UnavailableStore {
    async fn ensure_schema(&self) -> Result<bool> {
        Err(PosterError::Transport("database unreachable".to_string()))
    }

    async fn reset_schema(&self) -> Result<()> {
        Err(PosterError::Transport("database unreachable".to_string()))
    }

    async fn exists(&self, _title: &str) -> Result<bool> {
        Err(PosterError::Transport("database unreachable".to_string()))
    }

    async fn insert_if_absent(&self, _post: &NewPost) -> Result<bool> {
        Err(PosterError::Transport("database unreachable".to_string()))
    }

    async fn find(&self, _title: &str) -> Result<Option<Post>> {
        Err(PosterError::Transport("database unreachable".to_string()))
    }

    async fn count(&self) -> Result<i64> {
        Err(PosterError::Transport("database unreachable".to_string()))
    }
}

/// Memory store whose insert fails for one title; everything else works.
pub struct FailingInsertStore {
    inner: MemoryPostStore,
    failing_title: String,
}

impl FailingInsertStore {
    pub fn failing_on(title: &str) -> Self {
        Self {
            inner: MemoryPostStore::new(),
            failing_title: title.to_string(),
        }
    }
}

#[async_trait]
impl PostStore for FailingInsertStore {
    async fn ensure_schema(&self) -> Result<bool> {
        self.inner.ensure_schema().await
    }

    async fn reset_schema(&self) -> Result<()> {
        self.inner.reset_schema().await
    }

    async fn exists(&self, title: &str) -> Result<bool> {
        self.inner.exists(title).await
    }

    async fn insert_if_absent(&self, post: &NewPost) -> Result<bool> {
        if post.title == self.failing_title {
            return Err(PosterError::Transport("connection reset during insert".to_string()));
        }
        self.inner.insert_if_absent(post).await
    }

    async fn find(&self, title: &str) -> Result<Option<Post>> {
        self.inner.find(title).await
    }

    async fn count(&self) -> Result<i64> {
        self.inner.count().await
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "newsbot".to_string(),
        password: "hunter2".to_string(),
    }
}

/// All collaborators of one pipeline, kept so tests can inspect them afterwards.
pub struct Harness {
    pub fetcher: Arc<FakeFetcher>,
    pub completion: Arc<FakeCompletion>,
    pub images: Arc<FakeImageGenerator>,
    pub uploader: Arc<FakeUploader>,
    pub store: Arc<dyn PostStore>,
    pub staging: tempfile::TempDir,
}

impl Harness {
    pub fn new(fetcher: FakeFetcher) -> Self {
        Self::with_store(fetcher, Arc::new(MemoryPostStore::new()))
    }

    pub fn with_store(fetcher: FakeFetcher, store: Arc<dyn PostStore>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            completion: Arc::new(FakeCompletion::valid()),
            images: Arc::new(FakeImageGenerator::valid()),
            uploader: Arc::new(FakeUploader::succeeding()),
            store,
            staging: tempfile::tempdir().unwrap(),
        }
    }

    pub fn pipeline(&self, feeds: &[&str], publish_mode: PublishMode, run_mode: RunMode) -> Pipeline {
        let config = PipelineConfig {
            feeds: feeds.iter().map(|f| f.to_string()).collect(),
            window_hours: 24,
            publish_mode,
            run_mode,
        };
        let publisher = Publisher::new(
            self.fetcher.clone(),
            self.uploader.clone(),
            credentials(),
            self.staging.path(),
        );

        Pipeline::new(
            config,
            FeedReader::new(self.fetcher.clone()),
            self.store.clone(),
            ContentSynthesizer::new(self.completion.clone()),
            ImageSynthesizer::new(self.images.clone()),
            Some(publisher),
        )
        .unwrap()
    }

    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path()).map(|d| d.count()).unwrap_or(0)
    }
}
