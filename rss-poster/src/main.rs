use anyhow::Context;
use clap::Parser;
use rss_poster::{
    Config, ContentSynthesizer, DatabaseConfig, FeedReader, Fetcher, HttpPhotoUploader, ImageSynthesizer,
    OpenAiClient, PgPostStore, Pipeline, PostStore, Publisher,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rss-poster")]
#[command(about = "Turn fresh feed articles into illustrated social media posts")]
struct Args {
    /// Generate and record posts without uploading them
    #[arg(long)]
    dry_run: bool,

    /// Handle every qualifying entry instead of stopping after the first post
    #[arg(long)]
    process_all: bool,

    /// Drop and recreate the posts table, then exit
    #[arg(long)]
    reset_schema: bool,
}

const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.reset_schema {
        let database = DatabaseConfig::from_lookup(|key| env::var(key).ok())
            .context("Invalid database configuration")?;
        info!("Resetting posts table on {}", database.describe());

        let store = PgPostStore::connect_lazy(database.connect_options()?, DB_ACQUIRE_TIMEOUT);
        let result = store.reset_schema().await;
        store.close().await;
        result.context("Failed to reset posts table")?;

        info!("Posts table reset");
        return Ok(());
    }

    let config = Config::from_lookup(|key| match key {
        "DRY_RUN" if args.dry_run => Some("true".to_string()),
        "RUN_MODE" if args.process_all => Some("process-all".to_string()),
        _ => env::var(key).ok(),
    })
    .context("Invalid configuration")?;

    info!("Using database: {}", config.database.describe());
    let store = Arc::new(PgPostStore::connect_lazy(
        config.database.connect_options()?,
        DB_ACQUIRE_TIMEOUT,
    ));
    let timeout = Duration::from_secs(config.fetch.timeout_seconds);

    let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);

    let text_client = OpenAiClient::new(config.text_api_key.clone(), timeout)?
        .with_api_base(config.api_base.clone())
        .with_text_model(config.text_model.clone())
        .with_max_retries(config.fetch.max_retries);
    let image_client = OpenAiClient::new(config.image_api_key.clone(), timeout)?
        .with_api_base(config.api_base.clone())
        .with_image_model(config.image_model.clone())
        .with_max_retries(config.fetch.max_retries);

    let publisher = match &config.publish {
        Some(publish) => {
            let uploader = Arc::new(HttpPhotoUploader::new(publish.api_url.clone(), timeout)?);
            Some(Publisher::new(
                fetcher.clone(),
                uploader,
                publish.credentials.clone(),
                publish.staging_dir.clone(),
            ))
        }
        None => None,
    };

    let pipeline = Pipeline::new(
        config.pipeline.clone(),
        FeedReader::new(fetcher.clone()),
        store.clone(),
        ContentSynthesizer::new(Arc::new(text_client)),
        ImageSynthesizer::new(Arc::new(image_client)),
        publisher,
    )?;

    info!(
        "Starting run over {} feeds ({:?}, {:?})",
        pipeline.config().feeds.len(),
        pipeline.config().publish_mode,
        pipeline.config().run_mode
    );
    let summary = pipeline.run_now().await;

    match store.count().await {
        Ok(count) => info!("{} posts recorded, {} new this run", count, summary.persisted),
        Err(e) => error!("Failed to count recorded posts: {}", e),
    }

    store.close().await;
    Ok(())
}
