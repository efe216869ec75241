use crate::traits::PostStore;
use crate::types::{title_key, NewPost, Post, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    schema_created: bool,
    next_id: i32,
    posts: Vec<Post>,
}

/// In-process post record with the same key normalization and
/// insert-if-absent semantics as the PostgreSQL store.
#[derive(Default)]
pub struct MemoryPostStore {
    state: RwLock<State>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn ensure_schema(&self) -> Result<bool> {
        let mut state = self.state.write().await;
        let existed = state.schema_created;
        state.schema_created = true;
        Ok(existed)
    }

    async fn reset_schema(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.posts.clear();
        state.schema_created = true;
        Ok(())
    }

    async fn exists(&self, title: &str) -> Result<bool> {
        let key = title_key(title);
        Ok(self.state.read().await.posts.iter().any(|p| p.title == key))
    }

    async fn insert_if_absent(&self, post: &NewPost) -> Result<bool> {
        let key = post.title_key();
        let mut state = self.state.write().await;

        if state.posts.iter().any(|p| p.title == key) {
            return Ok(false);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.posts.push(Post {
            id,
            feed: Some(post.feed.clone()),
            title: key,
            caption: Some(post.caption.clone()),
            script: Some(post.script.clone()),
            image_url: Some(post.image_url.clone()),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn find(&self, title: &str) -> Result<Option<Post>> {
        let key = title_key(title);
        Ok(self.state.read().await.posts.iter().find(|p| p.title == key).cloned())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.read().await.posts.len() as i64)
    }
}
