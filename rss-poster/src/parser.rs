use crate::freshness::parse_pub_date;
use crate::types::{FeedEntry, PosterError, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::debug;

/// Turns feed documents into [`FeedEntry`] values in document order.
pub struct FeedParser;

impl FeedParser {
    pub fn parse(feed_url: &str, content: &str) -> Result<Vec<FeedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        match rss::Channel::read_from(content.as_bytes()) {
            Ok(channel) => Ok(Self::from_rss(feed_url, channel)),
            Err(rss_err) => {
                debug!("Not an RSS 2.0 document ({}), trying generic parser", rss_err);
                Self::from_generic(feed_url, content)
            }
        }
    }

    fn from_rss(feed_url: &str, channel: rss::Channel) -> Vec<FeedEntry> {
        channel
            .items()
            .iter()
            .filter_map(|item| {
                let title = match item.title() {
                    Some(title) if !title.trim().is_empty() => title.trim().to_string(),
                    _ => {
                        debug!("Dropping item without title in {}", feed_url);
                        return None;
                    }
                };

                let body = item
                    .description()
                    .or_else(|| item.content())
                    .unwrap_or_default()
                    .to_string();

                Some(FeedEntry {
                    feed: feed_url.to_string(),
                    title,
                    published_at: item.pub_date().and_then(parse_pub_date),
                    body,
                    link: item.link().map(|l| l.trim().to_string()),
                })
            })
            .collect()
    }

    fn from_generic(feed_url: &str, content: &str) -> Result<Vec<FeedEntry>> {
        let feed = parser::parse(content.as_bytes())
            .map_err(|e| PosterError::Parse(format!("Failed to parse feed {}: {}", feed_url, e)))?;

        let entries = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| t.content.trim().to_string())?;
                if title.is_empty() {
                    return None;
                }

                let body = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                Some(FeedEntry {
                    feed: feed_url.to_string(),
                    title,
                    published_at: entry.published.or(entry.updated).map(|dt| dt.with_timezone(&Utc)),
                    body,
                    link: entry.links.first().map(|l| l.href.clone()),
                })
            })
            .collect();

        Ok(entries)
    }
}
