use crate::openai::{DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::pipeline::{PipelineConfig, PublishMode, RunMode};
use crate::types::{Credentials, FetchConfig, PosterError, Result};
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_FEED: &str = "https://www.artificialintelligence-news.com/feed/";
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

#[derive(Clone)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: Option<String>,
    },
}

impl DatabaseConfig {
    /// Database settings alone, for administrative commands that touch
    /// nothing but the posts table.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = non_empty(&lookup);

        Ok(match get("DATABASE_URL") {
            Some(url) => DatabaseConfig::Url(url),
            None => DatabaseConfig::Parts {
                host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_number(&get, "DB_PORT")?.unwrap_or(5432),
                name: require(&get, "DB_NAME")?,
                user: require(&get, "DB_USER")?,
                password: get("DB_PASSWORD"),
            },
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            DatabaseConfig::Url(url) => PgConnectOptions::from_str(url)
                .map_err(|e| PosterError::Config(format!("invalid DATABASE_URL: {}", e))),
            DatabaseConfig::Parts {
                host,
                port,
                name,
                user,
                password,
            } => {
                let options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .database(name)
                    .username(user);
                Ok(match password {
                    Some(password) => options.password(password),
                    None => options,
                })
            }
        }
    }

    /// Connection target without credentials, for logging.
    pub fn describe(&self) -> String {
        match self {
            DatabaseConfig::Url(url) => match url::Url::parse(url) {
                Ok(mut parsed) => {
                    if parsed.password().is_some() {
                        let _ = parsed.set_password(Some("***"));
                    }
                    parsed.to_string()
                }
                Err(_) => "<unparseable DATABASE_URL>".to_string(),
            },
            DatabaseConfig::Parts {
                host, port, name, user, ..
            } => format!("postgresql://{}@{}:{}/{}", user, host, port, name),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub api_url: String,
    pub credentials: Credentials,
    pub staging_dir: PathBuf,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub text_api_key: String,
    pub image_api_key: String,
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    /// Present only when publishing is enabled
    pub publish: Option<PublishConfig>,
    pub pipeline: PipelineConfig,
    pub fetch: FetchConfig,
}

impl Config {
    /// Build the configuration from a key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = non_empty(&lookup);
        let required = |key: &str| require(&get, key);

        let database = DatabaseConfig::from_lookup(&lookup)?;

        let text_api_key = required("OPENAI_API_KEY")?;
        let image_api_key = get("IMAGE_API_KEY").unwrap_or_else(|| text_api_key.clone());

        let publish_mode = if parse_flag(&get, "DRY_RUN")?.unwrap_or(false) {
            PublishMode::DryRun
        } else {
            PublishMode::Publish
        };

        let run_mode = match get("RUN_MODE").as_deref() {
            None | Some("stop-after-first") => RunMode::StopAfterFirstSuccess,
            Some("process-all") => RunMode::ProcessAll,
            Some(other) => {
                return Err(PosterError::Config(format!(
                    "RUN_MODE must be 'process-all' or 'stop-after-first', got {:?}",
                    other
                )))
            }
        };

        let publish = match publish_mode {
            PublishMode::DryRun => None,
            PublishMode::Publish => Some(PublishConfig {
                api_url: required("PUBLISH_API_URL")?,
                credentials: Credentials {
                    username: required("INSTAGRAM_USERNAME")?,
                    password: required("INSTAGRAM_PASSWORD")?,
                },
                staging_dir: PathBuf::from(get("STAGING_DIR").unwrap_or_else(|| "images".to_string())),
            }),
        };

        let feeds: Vec<String> = get("FEED_URLS")
            .unwrap_or_else(|| DEFAULT_FEED.to_string())
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        for feed in &feeds {
            let parsed = url::Url::parse(feed)
                .map_err(|e| PosterError::Config(format!("invalid feed URL {:?}: {}", feed, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PosterError::Config(format!("feed URL must be http(s): {}", feed)));
            }
        }

        let mut fetch = FetchConfig::default();
        if let Some(timeout) = parse_number(&get, "HTTP_TIMEOUT_SECONDS")? {
            fetch.timeout_seconds = timeout;
        }
        if let Some(retries) = parse_number(&get, "HTTP_MAX_RETRIES")? {
            fetch.max_retries = retries;
        }

        Ok(Self {
            database,
            text_api_key,
            image_api_key,
            api_base: get("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            text_model: get("TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: get("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            publish,
            pipeline: PipelineConfig {
                feeds,
                window_hours: parse_number(&get, "FRESHNESS_WINDOW_HOURS")?.unwrap_or(DEFAULT_WINDOW_HOURS),
                publish_mode,
                run_mode,
            },
            fetch,
        })
    }
}

fn non_empty<F>(lookup: &F) -> impl Fn(&str) -> Option<String> + '_
where
    F: Fn(&str) -> Option<String>,
{
    move |key| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require<G>(get: &G, key: &str) -> Result<String>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).ok_or_else(|| PosterError::Config(format!("{} is not set", key)))
}

fn parse_number<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| PosterError::Config(format!("{} must be a non-negative integer, got {:?}", key, value)))
        })
        .transpose()
}

fn parse_flag<G>(get: &G, key: &str) -> Result<Option<bool>>
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(PosterError::Config(format!("{} must be a boolean, got {:?}", key, value))),
        })
        .transpose()
}
