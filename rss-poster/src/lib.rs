pub mod types;
pub mod traits;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod freshness;
pub mod feed_reader;
pub mod content;
pub mod illustration;
pub mod publisher;
pub mod openai;
pub mod uploader;
pub mod post_store;
pub mod memory_store;
pub mod pipeline;

pub use types::*;
pub use traits::{HttpFetch, ImageGeneration, PhotoUpload, PostStore, TextCompletion};
pub use config::{Config, DatabaseConfig};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use freshness::FreshnessFilter;
pub use feed_reader::FeedReader;
pub use content::ContentSynthesizer;
pub use illustration::ImageSynthesizer;
pub use publisher::Publisher;
pub use openai::OpenAiClient;
pub use uploader::HttpPhotoUploader;
pub use post_store::PgPostStore;
pub use memory_store::MemoryPostStore;
pub use pipeline::{Pipeline, PipelineConfig, PublishMode, RunMode, RunSummary};
