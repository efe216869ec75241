use crate::content::ContentSynthesizer;
use crate::feed_reader::FeedReader;
use crate::freshness::FreshnessFilter;
use crate::illustration::ImageSynthesizer;
use crate::publisher::Publisher;
use crate::traits::PostStore;
use crate::types::{FeedEntry, NewPost, PosterError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Whether generated posts are uploaded or only recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Publish,
    DryRun,
}

/// How many qualifying entries a single run handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    ProcessAll,
    StopAfterFirstSuccess,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub feeds: Vec<String>,
    pub window_hours: u32,
    pub publish_mode: PublishMode,
    pub run_mode: RunMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published(String),
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted,
    Duplicate,
    Failed,
}

/// Result of pushing one entry through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    AlreadyExists,
    CheckFailed,
    SynthesisFailed,
    IllustrationFailed,
    Processed {
        publish: PublishOutcome,
        persist: PersistOutcome,
    },
}

impl EntryOutcome {
    /// A complete cycle: newly recorded, and published unless publishing is off.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            EntryOutcome::Processed {
                publish: PublishOutcome::Published(_) | PublishOutcome::Skipped,
                persist: PersistOutcome::Inserted,
            }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub fresh: usize,
    pub skipped_existing: usize,
    pub check_failed: usize,
    pub synthesis_failed: usize,
    pub illustration_failed: usize,
    pub published: usize,
    pub publish_failed: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub persist_failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::AlreadyExists => self.skipped_existing += 1,
            EntryOutcome::CheckFailed => self.check_failed += 1,
            EntryOutcome::SynthesisFailed => self.synthesis_failed += 1,
            EntryOutcome::IllustrationFailed => self.illustration_failed += 1,
            EntryOutcome::Processed { publish, persist } => {
                match publish {
                    PublishOutcome::Published(_) => self.published += 1,
                    PublishOutcome::Failed => self.publish_failed += 1,
                    PublishOutcome::Skipped => {}
                }
                match persist {
                    PersistOutcome::Inserted => self.persisted += 1,
                    PersistOutcome::Duplicate => self.duplicates += 1,
                    PersistOutcome::Failed => self.persist_failed += 1,
                }
            }
        }
    }
}

/// Fetch → filter → check seen → synthesize → illustrate → publish → persist.
pub struct Pipeline {
    config: PipelineConfig,
    reader: FeedReader,
    freshness: FreshnessFilter,
    store: Arc<dyn PostStore>,
    content: ContentSynthesizer,
    illustrator: ImageSynthesizer,
    publisher: Option<Publisher>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        reader: FeedReader,
        store: Arc<dyn PostStore>,
        content: ContentSynthesizer,
        illustrator: ImageSynthesizer,
        publisher: Option<Publisher>,
    ) -> Result<Self> {
        if config.publish_mode == PublishMode::Publish && publisher.is_none() {
            return Err(PosterError::Config(
                "publishing is enabled but no publisher is configured".to_string(),
            ));
        }

        Ok(Self {
            freshness: FreshnessFilter::new(config.window_hours),
            config,
            reader,
            store,
            content,
            illustrator,
            publisher,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run_now(&self) -> RunSummary {
        self.run(Utc::now()).await
    }

    /// Process every qualifying entry, treating `now` as the current time.
    pub async fn run(&self, now: DateTime<Utc>) -> RunSummary {
        let span = info_span!("run", run_id = %Uuid::new_v4());
        self.run_inner(now).instrument(span).await
    }

    async fn run_inner(&self, now: DateTime<Utc>) -> RunSummary {
        let mut summary = RunSummary::default();

        if let Err(e) = self.store.ensure_schema().await {
            error!("Error creating posts table in the database: {}", e);
        }

        let entries = self.reader.read(&self.config.feeds).await;
        summary.fetched = entries.len();
        info!("Fetched {} entries from {} feeds", entries.len(), self.config.feeds.len());

        let fresh = self.freshness.filter(entries, now);
        summary.fresh = fresh.len();
        info!(
            "{} entries published within the last {} hours",
            fresh.len(),
            self.freshness.window_hours()
        );

        for entry in &fresh {
            let outcome = self.process_entry(entry).await;
            summary.record(&outcome);

            if self.config.run_mode == RunMode::StopAfterFirstSuccess && outcome.is_success() {
                info!("Stopping after first successful post");
                break;
            }
        }

        info!("Run finished: {:?}", summary);
        summary
    }

    pub async fn process_entry(&self, entry: &FeedEntry) -> EntryOutcome {
        match self.store.exists(&entry.title).await {
            Ok(true) => {
                info!("Post already exists: {}", entry.title);
                return EntryOutcome::AlreadyExists;
            }
            Ok(false) => {}
            Err(e) => {
                error!("Could not check whether {:?} was posted, skipping: {}", entry.title, e);
                return EntryOutcome::CheckFailed;
            }
        }

        let content = match self.content.synthesize(&entry.title, &entry.body).await {
            Some(content) => content,
            None => {
                warn!("Synthesis failed, skipping: {}", entry.title);
                return EntryOutcome::SynthesisFailed;
            }
        };

        let image_url = match self.illustrator.synthesize(&content.caption).await {
            Some(url) => url,
            None => {
                warn!("Image generation failed, skipping: {}", entry.title);
                return EntryOutcome::IllustrationFailed;
            }
        };

        let publish = self.publish(&image_url, &content.caption).await;

        // Recorded even when publishing failed.
        let post = NewPost::new(entry, &content, &image_url);
        let persist = match self.store.insert_if_absent(&post).await {
            Ok(true) => {
                info!("Saved post to database: {}", post.title_key());
                PersistOutcome::Inserted
            }
            Ok(false) => {
                info!("Post was recorded concurrently: {}", post.title_key());
                PersistOutcome::Duplicate
            }
            Err(e) => {
                error!("Error saving post to database: {}", e);
                PersistOutcome::Failed
            }
        };

        EntryOutcome::Processed { publish, persist }
    }

    async fn publish(&self, image_url: &str, caption: &str) -> PublishOutcome {
        let publisher = match (self.config.publish_mode, &self.publisher) {
            (PublishMode::Publish, Some(publisher)) => publisher,
            _ => {
                info!("Dry run, not publishing");
                return PublishOutcome::Skipped;
            }
        };

        match publisher.publish(image_url, caption).await {
            Ok(media) => PublishOutcome::Published(media),
            Err(e) => {
                error!("Error uploading post: {}", e);
                PublishOutcome::Failed
            }
        }
    }
}
