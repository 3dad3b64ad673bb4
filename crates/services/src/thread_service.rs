//! Thread creation, locking, deletion and the paginated post view.

use std::sync::Arc;

use async_trait::async_trait;
use domains::naming::category_key;
use domains::{
    Anchor, CategoryRepository, DomainError, Post, PostRepository, Result, Thread, ThreadPage,
    ThreadRepository,
};
use uuid::Uuid;

use crate::windowing::{fetch_window, OrdinalSource, PageLimits};

/// Posts of one thread; the ordinal is the post number.
struct PostsInThread<'a> {
    posts: &'a dyn PostRepository,
    thread_id: Uuid,
    total: u64,
}

#[async_trait]
impl OrdinalSource for PostsInThread<'_> {
    type Item = Post;

    async fn total(&self) -> Result<u64> {
        Ok(self.total)
    }

    async fn slice(&self, from: u64, limit: u64) -> Result<Vec<Post>> {
        self.posts.slice(self.thread_id, from, limit).await
    }
}

pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    limits: PageLimits,
}

impl ThreadService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        limits: PageLimits,
    ) -> Self {
        Self {
            threads,
            posts,
            categories,
            limits,
        }
    }

    /// Creates an empty, unlocked thread in the category named `category`
    /// (matched case-insensitively).
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        name: Option<&str>,
        category: &str,
        author_id: Uuid,
    ) -> Result<Thread> {
        let category = self
            .categories
            .find_by_key(&category_key(category))
            .await?
            .ok_or(DomainError::InvalidCategory)?;

        let thread = Thread::new(name, category.id, author_id)?;
        let thread = self.threads.insert(thread).await?;
        tracing::info!(thread_id = %thread.id, slug = %thread.slug, "thread created");
        Ok(thread)
    }

    /// The thread plus one window of its posts.
    ///
    /// `Anchor::Around(n)` returns the post numbered `n` with its neighbours.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        thread_id: Uuid,
        anchor: Anchor,
        limit: Option<i64>,
    ) -> Result<ThreadPage> {
        let limit = self.limits.resolve(limit)?;
        let thread = self
            .threads
            .find_by_id(thread_id)
            .await?
            .ok_or_else(|| DomainError::invalid_parameter("id", "thread does not exist"))?;

        let source = PostsInThread {
            posts: self.posts.as_ref(),
            thread_id: thread.id,
            total: thread.posts_count,
        };
        let window = fetch_window(&source, anchor, limit).await?;

        Ok(ThreadPage {
            thread,
            posts: window.items,
            meta: window.meta.into(),
        })
    }

    /// Locking only gates future posts; existing posts are untouched.
    #[tracing::instrument(skip(self))]
    pub async fn set_locked(&self, thread_id: Uuid, locked: bool) -> Result<Thread> {
        let thread = self
            .threads
            .set_locked(thread_id, locked)
            .await?
            .ok_or_else(|| DomainError::invalid_parameter("threadId", "thread does not exist"))?;
        tracing::info!(thread_id = %thread.id, locked, "thread lock changed");
        Ok(thread)
    }

    /// Deletes the thread together with its posts.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, thread_id: Uuid) -> Result<()> {
        if !self.threads.delete(thread_id).await? {
            return Err(DomainError::invalid_parameter(
                "threadId",
                "thread does not exist",
            ));
        }
        tracing::info!(%thread_id, "thread deleted");
        Ok(())
    }
}
