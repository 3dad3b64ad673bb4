//! Window and page types shared by every paginated listing.
//!
//! The arithmetic lives in `services::windowing`; these are the values it
//! produces and the shapes callers serialize.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Post, Thread};

/// Opaque continuation reference. Callers turn it into a URL however they like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub from: u64,
    pub limit: u64,
}

impl PageRef {
    pub fn new(from: u64, limit: u64) -> Self {
        Self { from, limit }
    }

    /// Query-string form: `limit=<l>&from=<f>`.
    pub fn query(&self) -> String {
        format!("limit={}&from={}", self.limit, self.from)
    }
}

/// Where a window starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Window starts at this ordinal; negative values clamp to 0.
    From(i64),
    /// Window is positioned so that this ordinal falls inside it.
    Around(u64),
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::From(0)
    }
}

/// Continuation metadata of a window, independent of what it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowMeta {
    pub next: Option<PageRef>,
    pub previous: Option<PageRef>,
    pub next_count: u64,
    pub previous_count: u64,
    /// Items after the last one in the window
    pub remaining: u64,
}

/// A contiguous slice of an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window<T> {
    /// Ordinal of `items[0]`
    pub from: u64,
    pub items: Vec<T>,
    pub meta: WindowMeta,
}

impl<T> Window<T> {
    /// Ordinal of the first item, `None` for an empty window.
    pub fn first_key(&self) -> Option<u64> {
        (!self.items.is_empty()).then_some(self.from)
    }

    pub fn last_key(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| self.from + self.items.len() as u64 - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsMeta {
    #[serde(rename = "nextURL")]
    pub next_url: Option<PageRef>,
    #[serde(rename = "previousURL")]
    pub previous_url: Option<PageRef>,
    pub next_posts_count: u64,
    pub previous_posts_count: u64,
    pub posts_remaining: u64,
}

impl From<WindowMeta> for PostsMeta {
    fn from(meta: WindowMeta) -> Self {
        Self {
            next_url: meta.next,
            previous_url: meta.previous,
            next_posts_count: meta.next_count,
            previous_posts_count: meta.previous_count,
            posts_remaining: meta.remaining,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsMeta {
    #[serde(rename = "nextURL")]
    pub next_url: Option<PageRef>,
    #[serde(rename = "previousURL")]
    pub previous_url: Option<PageRef>,
    pub next_threads_count: u64,
    pub previous_threads_count: u64,
    pub threads_remaining: u64,
}

impl From<WindowMeta> for ThreadsMeta {
    fn from(meta: WindowMeta) -> Self {
        Self {
            next_url: meta.next,
            previous_url: meta.previous,
            next_threads_count: meta.next_count,
            previous_threads_count: meta.previous_count,
            threads_remaining: meta.remaining,
        }
    }
}

/// A thread with one window of its posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
    #[serde(flatten)]
    pub thread: Thread,
    pub posts: Vec<Post>,
    pub meta: PostsMeta,
}

/// One window of a category's threads. `category` is `None` for the `ALL` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPage {
    pub category: Option<Category>,
    pub threads: Vec<Thread>,
    pub meta: ThreadsMeta,
}
