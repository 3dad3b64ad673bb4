//! # In-memory store
//!
//! DashMap-backed implementation of every repository port. Used by tests, the
//! seed binary and single-process deployments.
//!
//! Post numbering holds the thread's entry guard for the whole
//! read-assign-insert-increment sequence, which serializes appends per thread
//! (and per shard) without any global lock. Guards are only ever taken in the
//! order `category_keys` → `categories` → `threads` → `thread_posts` / `posts`,
//! never the reverse.

use std::cmp::Reverse;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    Category, CategoryRepository, DomainError, Post, PostDraft, PostRepository, RenderedContent,
    Result, Thread, ThreadRepository, ThreadScope, UserDirectory,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    categories: DashMap<Uuid, Category>,
    /// Normalized key → category id, enforces key uniqueness
    category_keys: DashMap<String, Uuid>,
    threads: DashMap<Uuid, Thread>,
    posts: DashMap<Uuid, Post>,
    /// Post ids of each thread, indexed by post number
    thread_posts: DashMap<Uuid, Vec<Uuid>>,
    users: DashMap<Uuid, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so their name can be snapshotted onto replies.
    pub fn add_user(&self, id: Uuid, username: impl Into<String>) {
        self.users.insert(id, username.into());
    }

    fn in_scope(thread: &Thread, scope: ThreadScope) -> bool {
        match scope {
            ThreadScope::All => true,
            ThreadScope::Category(id) => thread.category_id == id,
        }
    }

    fn post_not_found() -> DomainError {
        DomainError::invalid_parameter("id", "post does not exist")
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn insert(&self, category: Category) -> Result<Category> {
        // The key stays reserved by the vacant guard until the row is in place.
        match self.category_keys.entry(category.key.clone()) {
            Entry::Occupied(_) => Err(DomainError::CategoryAlreadyExists),
            Entry::Vacant(slot) => {
                self.categories.insert(category.id, category.clone());
                slot.insert(category.id);
                Ok(category)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.get(&id).map(|c| c.clone()))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Category>> {
        let id = match self.category_keys.get(key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.categories.get(&id).map(|c| c.clone()))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.categories.iter().map(|c| c.clone()).collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn update(&self, category: Category) -> Result<Category> {
        let previous_key = match self.categories.get(&category.id) {
            Some(current) => current.key.clone(),
            None => return Err(DomainError::not_found("category", category.id)),
        };

        if previous_key != category.key {
            match self.category_keys.entry(category.key.clone()) {
                Entry::Occupied(slot) if *slot.get() != category.id => {
                    return Err(DomainError::CategoryAlreadyExists)
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(category.id);
                }
            }
            self.category_keys.remove(&previous_key);
        }

        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    /// Removes the row before sweeping. A concurrent thread insert either
    /// finishes first and is swept, or fails with `InvalidCategory`.
    async fn delete_reassigning(&self, id: Uuid, fallback_id: Uuid) -> Result<u64> {
        if let Some((_, category)) = self.categories.remove(&id) {
            self.category_keys.remove(&category.key);
        }
        let mut moved = 0;
        for mut thread in self.threads.iter_mut() {
            if thread.category_id == id {
                thread.category_id = fallback_id;
                moved += 1;
            }
        }
        Ok(moved)
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn insert(&self, thread: Thread) -> Result<Thread> {
        // Held so the category cannot be removed mid-insert.
        let _category = self
            .categories
            .get(&thread.category_id)
            .ok_or(DomainError::InvalidCategory)?;
        self.thread_posts.insert(thread.id, Vec::new());
        self.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Thread>> {
        Ok(self.threads.get(&id).map(|t| t.clone()))
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> Result<Option<Thread>> {
        Ok(self.threads.get_mut(&id).map(|mut thread| {
            thread.locked = locked;
            thread.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        if self.threads.remove(&id).is_none() {
            return Ok(false);
        }
        if let Some((_, post_ids)) = self.thread_posts.remove(&id) {
            for post_id in post_ids {
                self.posts.remove(&post_id);
            }
        }
        Ok(true)
    }

    async fn count(&self, scope: ThreadScope) -> Result<u64> {
        Ok(self
            .threads
            .iter()
            .filter(|t| Self::in_scope(t.value(), scope))
            .count() as u64)
    }

    async fn slice(&self, scope: ThreadScope, from: u64, limit: u64) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .threads
            .iter()
            .filter(|t| Self::in_scope(t.value(), scope))
            .map(|t| t.clone())
            .collect();
        threads.sort_by_key(|t| Reverse((t.last_bump, t.id)));
        Ok(threads
            .into_iter()
            .skip(from as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn append(&self, thread_id: Uuid, draft: PostDraft) -> Result<Post> {
        let mut thread = self
            .threads
            .get_mut(&thread_id)
            .ok_or_else(|| DomainError::invalid_parameter("threadId", "thread does not exist"))?;
        if thread.locked {
            return Err(DomainError::ThreadLocked);
        }

        let post = draft.into_post(thread_id, thread.posts_count);
        self.thread_posts.entry(thread_id).or_default().push(post.id);
        self.posts.insert(post.id, post.clone());
        thread.posts_count += 1;
        thread.last_bump = post.created_at;

        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn slice(&self, thread_id: Uuid, from: u64, limit: u64) -> Result<Vec<Post>> {
        let ids: Vec<Uuid> = match self.thread_posts.get(&thread_id) {
            Some(ids) => ids
                .iter()
                .skip(from as usize)
                .take(limit as usize)
                .copied()
                .collect(),
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.posts.get(id).map(|p| p.clone()))
            .collect())
    }

    async fn replies_to(&self, post_id: Uuid) -> Result<Vec<Post>> {
        let mut replies: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.reply_id == Some(post_id))
            .map(|p| p.clone())
            .collect();
        replies.sort_by_key(|p| p.post_number);
        Ok(replies)
    }

    async fn mark_removed(&self, post_id: Uuid, content: RenderedContent) -> Result<Post> {
        let mut post = self.posts.get_mut(&post_id).ok_or_else(Self::post_not_found)?;
        post.content = content.html;
        post.plain_text = content.plain_text;
        post.removed = true;
        Ok(post.clone())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut post = self.posts.get_mut(&post_id).ok_or_else(Self::post_not_found)?;
        post.likes.insert(user_id);
        Ok(())
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut post = self.posts.get_mut(&post_id).ok_or_else(Self::post_not_found)?;
        post.likes.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn username(&self, user_id: Uuid) -> Result<Option<String>> {
        Ok(self.users.get(&user_id).map(|name| name.clone()))
    }
}
