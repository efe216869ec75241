//! Recency filtering of feed entries.
//!
//! An entry is fresh when no more than `window_hours` elapsed hours separate
//! its publication time from `now`. The boundary is inclusive. Entries
//! without a usable publication time are never fresh, so an undated backlog
//! cannot be reposted.

use crate::types::FeedEntry;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

pub fn is_fresh(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>, window_hours: u32) -> bool {
    match published_at {
        Some(published) => now.signed_duration_since(published) <= Duration::hours(window_hours as i64),
        None => false,
    }
}

/// Parse an RFC-822 style `pubDate` such as `Mon, 02 Jan 2006 15:04:05 -0700`.
///
/// Malformed values are logged and yield `None`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match DateTime::parse_from_rfc2822(trimmed) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!("Ignoring malformed publish date {:?}: {}", trimmed, e);
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessFilter {
    window_hours: u32,
}

impl FreshnessFilter {
    pub fn new(window_hours: u32) -> Self {
        Self { window_hours }
    }

    pub fn window_hours(&self) -> u32 {
        self.window_hours
    }

    pub fn is_fresh(&self, entry: &FeedEntry, now: DateTime<Utc>) -> bool {
        is_fresh(entry.published_at, now, self.window_hours)
    }

    /// Keep the fresh entries, preserving their order.
    pub fn filter(&self, entries: Vec<FeedEntry>, now: DateTime<Utc>) -> Vec<FeedEntry> {
        entries
            .into_iter()
            .filter(|entry| {
                let fresh = self.is_fresh(entry, now);
                if !fresh {
                    debug!("Skipping stale or undated entry: {}", entry.title);
                }
                fresh
            })
            .collect()
    }
}
