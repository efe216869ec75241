use crate::traits::PostStore;
use crate::types::{title_key, NewPost, Post, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Pool, Postgres};
use std::time::Duration;
use tracing::{debug, info};

const CREATE_POSTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS posts (
        id SERIAL PRIMARY KEY,
        feed TEXT,
        title TEXT NOT NULL,
        caption TEXT,
        script TEXT,
        image_url TEXT,
        datetime TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (title)
    )
"#;

/// PostgreSQL backed record of published posts.
pub struct PgPostStore {
    db: Pool<Postgres>,
}

impl PgPostStore {
    /// Build the pool without connecting. An unreachable server surfaces as
    /// an `Err` from each store operation.
    pub fn connect_lazy(options: PgConnectOptions, acquire_timeout: Duration) -> Self {
        let db = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        Self { db }
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn ensure_schema(&self) -> Result<bool> {
        let existed: bool = sqlx::query_scalar("SELECT to_regclass('public.posts') IS NOT NULL")
            .fetch_one(&self.db)
            .await?;

        sqlx::query(CREATE_POSTS_TABLE).execute(&self.db).await?;

        if existed {
            info!("posts table already exists");
        } else {
            info!("posts table successfully created");
        }
        Ok(existed)
    }

    async fn reset_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS posts").execute(&self.db).await?;
        info!("Dropped posts table");
        self.ensure_schema().await?;
        Ok(())
    }

    async fn exists(&self, title: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE title = $1)")
            .bind(title_key(title))
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn insert_if_absent(&self, post: &NewPost) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (feed, title, caption, script, image_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(&post.feed)
        .bind(post.title_key())
        .bind(&post.caption)
        .bind(&post.script)
        .bind(&post.image_url)
        .execute(&self.db)
        .await?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!("Post with title {:?} already recorded", post.title_key());
        }
        Ok(inserted)
    }

    async fn find(&self, title: &str) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            // Tables created with a plain TIMESTAMP column read as UTC
            r#"
            SELECT id, feed, title, caption, script, image_url, datetime::timestamptz AS datetime
            FROM posts
            WHERE title = $1
            "#,
        )
        .bind(title_key(title))
        .fetch_optional(&self.db)
        .await?;
        Ok(post)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
