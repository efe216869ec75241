use crate::parser::FeedParser;
use crate::traits::HttpFetch;
use crate::types::{FeedEntry, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Reads a list of feeds; each feed is fetched and parsed independently.
pub struct FeedReader {
    fetcher: Arc<dyn HttpFetch>,
}

impl FeedReader {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    /// Entries of every reachable feed, in feed order then document order.
    /// A feed that fails to fetch or parse contributes no entries.
    pub async fn read(&self, feed_urls: &[String]) -> Vec<FeedEntry> {
        let mut output = Vec::new();

        for url in feed_urls {
            match self.read_feed(url).await {
                Ok(entries) => {
                    info!("Fetched {} entries from {}", entries.len(), url);
                    output.extend(entries);
                }
                Err(e) => {
                    error!("Failed to read feed {}: {}", url, e);
                }
            }
        }

        output
    }

    pub async fn read_feed(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let content = self.fetcher.fetch_text(url).await?;
        FeedParser::parse(url, &content)
    }
}
