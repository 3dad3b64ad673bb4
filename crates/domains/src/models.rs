//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! We use UUID v7 for time-ordered, globally unique identification.
//!
//! Derived fields (slug, category key, rendered HTML, plain text) are computed
//! once by the constructors below; nothing recomputes them on assignment.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, Result};
use crate::naming;

/// Content stored in place of a post removed by an administrator.
pub const REMOVED_POST_TEXT: &str = "[This post has been removed by an administrator]";

/// Colour given to categories created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#cccccc";

/// Minimum and maximum thread title length, in characters.
pub const THREAD_NAME_MIN_CHARS: usize = 4;
pub const THREAD_NAME_MAX_CHARS: usize = 256;

/// A top-level grouping of threads (e.g. "General", "Off topic").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    /// Display name exactly as submitted
    pub name: String,
    /// Case-insensitive lookup key, see [`naming::category_key`]
    pub key: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Threads of a deleted category are moved here.
    pub const FALLBACK_NAME: &'static str = "Other";

    /// Pseudo-key selecting threads of every category.
    pub const ALL_KEY: &'static str = "ALL";

    pub fn new(name: Option<&str>, color: Option<&str>) -> Result<Self> {
        let name = validate_category_name(name)?;
        Ok(Self {
            id: Uuid::now_v7(),
            key: naming::category_key(name),
            name: name.to_string(),
            color: color.unwrap_or(DEFAULT_CATEGORY_COLOR).to_string(),
            created_at: Utc::now(),
        })
    }

    /// Returns a copy with a new name and/or colour; the key follows the name.
    pub fn renamed(&self, name: Option<&str>, color: Option<&str>) -> Result<Self> {
        let mut updated = self.clone();
        if let Some(name) = name {
            let name = validate_category_name(Some(name))?;
            updated.key = naming::category_key(name);
            updated.name = name.to_string();
        }
        if let Some(color) = color {
            updated.color = color.to_string();
        }
        Ok(updated)
    }

    pub fn is_fallback(&self) -> bool {
        self.key == naming::category_key(Self::FALLBACK_NAME)
    }
}

fn validate_category_name(name: Option<&str>) -> Result<&str> {
    let name = name.ok_or_else(|| DomainError::validation("name cannot be null"))?;
    if name.trim().is_empty() {
        return Err(DomainError::validation("The category name can't be empty"));
    }
    if naming::category_key(name) == Category::ALL_KEY {
        return Err(DomainError::validation(format!(
            "The category name \"{}\" is reserved",
            Category::ALL_KEY
        )));
    }
    Ok(name)
}

/// Which threads a category listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadScope {
    All,
    Category(Uuid),
}

/// A Thread contains a contiguous, zero-based sequence of Posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub category_id: Uuid,
    pub author_id: Uuid,
    /// Raw title as submitted
    pub name: String,
    pub slug: String,
    /// Number of posts ever created; also the next post number
    pub posts_count: u64,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    /// The timestamp used for sorting threads by activity
    pub last_bump: DateTime<Utc>,
}

impl Thread {
    /// Validates the title and derives the slug.
    pub fn new(name: Option<&str>, category_id: Uuid, author_id: Uuid) -> Result<Self> {
        let name = name.ok_or_else(|| DomainError::validation("name cannot be null"))?;
        if name.trim().is_empty() {
            return Err(DomainError::validation("The title cannot be empty"));
        }
        let chars = name.chars().count();
        if !(THREAD_NAME_MIN_CHARS..=THREAD_NAME_MAX_CHARS).contains(&chars) {
            return Err(DomainError::validation(format!(
                "The title must be between {} and {} characters",
                THREAD_NAME_MIN_CHARS, THREAD_NAME_MAX_CHARS
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            category_id,
            author_id,
            slug: naming::slugify(name),
            name: name.to_string(),
            posts_count: 0,
            locked: false,
            created_at: now,
            last_bump: now,
        })
    }
}

/// Output of the content pipeline: sanitized HTML plus its text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedContent {
    pub html: String,
    pub plain_text: String,
}

/// Snapshot of the post being replied to, taken at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub post_id: Uuid,
    /// Author name when the reply was written; never re-synced
    pub username: String,
}

/// A fully validated post that has not been numbered yet.
///
/// Storage assigns the post number when it appends the draft to a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: RenderedContent,
    pub reply: Option<ReplyTarget>,
    pub created_at: DateTime<Utc>,
}

impl PostDraft {
    pub fn new(author_id: Uuid, content: RenderedContent, reply: Option<ReplyTarget>) -> Self {
        Self {
            id: Uuid::now_v7(),
            author_id,
            content,
            reply,
            created_at: Utc::now(),
        }
    }

    pub fn into_post(self, thread_id: Uuid, post_number: u64) -> Post {
        let (reply_id, replying_to_username) = match self.reply {
            Some(target) => (Some(target.post_id), Some(target.username)),
            None => (None, None),
        };
        Post {
            id: self.id,
            thread_id,
            author_id: self.author_id,
            post_number,
            content: self.content.html,
            plain_text: self.content.plain_text,
            reply_id,
            replying_to_username,
            removed: false,
            likes: BTreeSet::new(),
            created_at: self.created_at,
        }
    }
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
    /// Zero-based position within the thread
    pub post_number: u64,
    /// Sanitized HTML
    pub content: String,
    pub plain_text: String,
    pub reply_id: Option<Uuid>,
    pub replying_to_username: Option<String>,
    pub removed: bool,
    /// Users who liked this post
    pub likes: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A post together with the posts that reply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub replies: Vec<Post>,
}
