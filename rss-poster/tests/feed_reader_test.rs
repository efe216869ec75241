mod common;

use common::*;
use rss_poster::{FeedReader, PosterError};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom test</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-05-10T10:00:00Z</updated>
  <entry>
    <title>Atom story</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <link href="https://atom.example.com/story"/>
    <updated>2024-05-10T10:00:00Z</updated>
    <summary>Summary of the atom story</summary>
  </entry>
</feed>"#;

#[tokio::test]
async fn test_entries_keep_feed_and_document_order() {
    init_tracing();

    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_feed("https://a.example.com/rss", rss_feed(&[("A1", Some(1)), ("A2", Some(2))]))
            .with_feed("https://b.example.com/atom", ATOM.to_string()),
    );
    let reader = FeedReader::new(fetcher.clone());

    let entries = reader
        .read(&[
            "https://a.example.com/rss".to_string(),
            "https://b.example.com/atom".to_string(),
        ])
        .await;

    let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["A1", "A2", "Atom story"]);
    assert_eq!(entries[0].feed, "https://a.example.com/rss");
    assert_eq!(entries[2].feed, "https://b.example.com/atom");
    assert!(entries[2].published_at.is_some());
    assert_eq!(entries[0].link.as_deref(), Some("https://news.example.com/0"));
    assert_eq!(fetcher.text_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreachable_feed_is_skipped() {
    init_tracing();

    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_feed("https://broken.example.com/rss", "<rss><channel>".to_string())
            .with_feed("https://ok.example.com/rss", rss_feed(&[("Survivor", Some(1))])),
    );
    let reader = FeedReader::new(fetcher.clone());

    let entries = reader
        .read(&[
            "https://missing.example.com/rss".to_string(),
            "https://broken.example.com/rss".to_string(),
            "https://ok.example.com/rss".to_string(),
        ])
        .await;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Survivor");
    assert_eq!(fetcher.text_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_read_feed_reports_transport_error() {
    init_tracing();

    let reader = FeedReader::new(Arc::new(FakeFetcher::new()));
    let result = reader.read_feed("https://missing.example.com/rss").await;

    assert!(matches!(result, Err(PosterError::Transport(_))));
}

#[tokio::test]
async fn test_empty_feed_list_reads_nothing() {
    let fetcher = Arc::new(FakeFetcher::new());
    let reader = FeedReader::new(fetcher.clone());

    assert!(reader.read(&[]).await.is_empty());
    assert_eq!(fetcher.text_calls.load(Ordering::SeqCst), 0);
}
