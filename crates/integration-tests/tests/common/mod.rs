//! Shared fixtures: a forum wired over the in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use domains::{Category, Post, Thread};
use services::{CategoryService, NewPost, PageLimits, PostService, ThreadService};
use storage_adapters::{BroadcastEvents, MemoryStore};
use uuid::Uuid;

pub struct Forum {
    pub store: Arc<MemoryStore>,
    pub events: Arc<BroadcastEvents>,
    pub categories: CategoryService,
    pub threads: ThreadService,
    pub posts: PostService,
}

impl Forum {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(BroadcastEvents::new(64));
        Self {
            categories: CategoryService::new(store.clone(), store.clone(), PageLimits::default()),
            threads: ThreadService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                PageLimits::default(),
            ),
            posts: PostService::new(store.clone(), store.clone(), store.clone(), events.clone()),
            store,
            events,
        }
    }

    pub fn user(&self, username: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.store.add_user(id, username);
        id
    }

    pub async fn category(&self, name: &str) -> Category {
        self.categories.create(Some(name), None).await.unwrap()
    }

    pub async fn thread(&self, category: &Category, name: &str, author: Uuid) -> Thread {
        self.threads
            .create(Some(name), &category.name, author)
            .await
            .unwrap()
    }

    pub async fn post(&self, thread: &Thread, author: Uuid, content: &str) -> Post {
        self.posts
            .create(author, text(thread, content))
            .await
            .unwrap()
    }

    /// A thread holding `count` posts whose plain text is `POST <n>`.
    pub async fn thread_with_posts(&self, count: u64) -> Thread {
        let author = self.user("author");
        let category = self.category("general").await;
        let thread = self.thread(&category, "numbered", author).await;
        for n in 0..count {
            self.post(&thread, author, &format!("POST {n}")).await;
        }
        thread
    }
}

pub fn text(thread: &Thread, content: &str) -> NewPost {
    NewPost {
        thread_id: Some(thread.id),
        content: Some(content.to_string()),
        ..NewPost::default()
    }
}

pub fn numbers(posts: &[Post]) -> Vec<u64> {
    posts.iter().map(|p| p.post_number).collect()
}
