//! # Ports
//!
//! Any storage or notification adapter must implement these traits to be
//! wired into the services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::events::ForumEvent;
use crate::models::{Category, Post, PostDraft, RenderedContent, Thread, ThreadScope};

/// Persistence contract for categories.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Fails with `CategoryAlreadyExists` when the key is taken.
    async fn insert(&self, category: Category) -> Result<Category>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>>;
    /// `key` is already normalized.
    async fn find_by_key(&self, key: &str) -> Result<Option<Category>>;
    /// All categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>>;
    /// Fails with `CategoryAlreadyExists` when the new key belongs to another category.
    async fn update(&self, category: Category) -> Result<Category>;
    /// Deletes `id` and moves every thread of it into `fallback_id`, atomically
    /// with respect to concurrent thread inserts. Returns the number of threads moved.
    async fn delete_reassigning(&self, id: Uuid, fallback_id: Uuid) -> Result<u64>;
}

/// Persistence contract for threads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Fails with `InvalidCategory` when the category no longer exists.
    async fn insert(&self, thread: Thread) -> Result<Thread>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Thread>>;
    /// Returns the updated thread, `None` if it does not exist.
    async fn set_locked(&self, id: Uuid, locked: bool) -> Result<Option<Thread>>;
    /// Deletes the thread and its posts. Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn count(&self, scope: ThreadScope) -> Result<u64>;
    /// Threads at ordinals `[from, from + limit)` of the most-recent-activity-first order.
    async fn slice(&self, scope: ThreadScope, from: u64, limit: u64) -> Result<Vec<Thread>>;
}

/// Persistence contract for posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Numbers the draft with the thread's current `posts_count`, stores it and
    /// increments the counter, all-or-nothing and serialized per thread.
    ///
    /// Fails with `ThreadLocked` if the thread was locked in the meantime and
    /// with `InvalidParameter("threadId", ..)` if it disappeared.
    async fn append(&self, thread_id: Uuid, draft: PostDraft) -> Result<Post>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>>;
    /// Posts with `post_number` in `[from, from + limit)`, ascending.
    async fn slice(&self, thread_id: Uuid, from: u64, limit: u64) -> Result<Vec<Post>>;
    /// Posts whose reply target is `post_id`, ascending by post number.
    async fn replies_to(&self, post_id: Uuid) -> Result<Vec<Post>>;
    /// Replaces content and sets the removed flag. Returns the updated post.
    async fn mark_removed(&self, post_id: Uuid, content: RenderedContent) -> Result<Post>;
    /// Set semantics: liking twice is a no-op.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<()>;
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<()>;
}

/// Read-only view of the external user store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn username(&self, user_id: Uuid) -> Result<Option<String>>;
}

/// Fire-and-forget real-time side channel.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ForumEvents: Send + Sync {
    fn publish(&self, event: ForumEvent) -> Result<()>;
}
