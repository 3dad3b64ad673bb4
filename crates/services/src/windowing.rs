//! # Windowing Engine
//!
//! Forward/backward pagination over a zero-based, gap-free ordinal space
//! (post numbers within a thread, positions within a category listing).
//! The engine only sees `(total, anchor, limit)` and a way to fetch a range of
//! ordinals; it has no idea what the items are.
//!
//! Near the start of the sequence the previous window is deliberately short:
//! it covers exactly the un-fetched prefix `[0, first)` instead of a full
//! `limit`, so consecutive windows never overlap.

use async_trait::async_trait;
use domains::{Anchor, DomainError, PageRef, Result, Window, WindowMeta};

/// Anything that can report its size and hand out a range of ordinals.
#[async_trait]
pub trait OrdinalSource: Send + Sync {
    type Item: Send;

    async fn total(&self) -> Result<u64>;

    /// Items at ordinals `[from, from + limit)`, ascending.
    async fn slice(&self, from: u64, limit: u64) -> Result<Vec<Self::Item>>;
}

/// Page-size policy of one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default: u64,
    pub max: u64,
}

impl PageLimits {
    pub fn new(default: u64, max: u64) -> Self {
        Self { default, max }
    }

    /// Applies the default when absent, rejects non-positive values and caps at `max`.
    pub fn resolve(&self, requested: Option<i64>) -> Result<u64> {
        match requested {
            None => Ok(self.default.min(self.max)),
            Some(limit) if limit <= 0 => Err(DomainError::validation(
                "limit must be a positive integer",
            )),
            Some(limit) => Ok((limit as u64).min(self.max)),
        }
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(10, 100)
    }
}

/// First ordinal of the window described by `anchor`.
///
/// A centered window puts the target at index `(limit - 1) / 2`, so with
/// `limit = 10` a target of 15 yields the window 11..=20.
pub fn window_start(anchor: Anchor, limit: u64) -> u64 {
    match anchor {
        Anchor::From(from) => from.max(0) as u64,
        Anchor::Around(key) => key.saturating_sub(limit.saturating_sub(1) / 2),
    }
}

/// Continuation metadata of the window `[from, from + len)` in a sequence of `total`.
pub fn window_meta(total: u64, from: u64, len: u64, limit: u64) -> WindowMeta {
    if len == 0 {
        return WindowMeta::default();
    }

    let first = from;
    let last = from + len - 1;
    // `total` may be slightly stale relative to the fetched rows.
    let remaining = total.saturating_sub(last + 1);

    let next = (remaining > 0).then(|| PageRef::new(last + 1, limit));
    let (previous, previous_count) = if first == 0 {
        (None, 0)
    } else if first < limit {
        (Some(PageRef::new(0, first)), first)
    } else {
        (Some(PageRef::new(first - limit, limit)), limit)
    };

    WindowMeta {
        next,
        previous,
        next_count: remaining.min(limit),
        previous_count,
        remaining,
    }
}

/// Fetches one window from `source`.
pub async fn fetch_window<S>(source: &S, anchor: Anchor, limit: u64) -> Result<Window<S::Item>>
where
    S: OrdinalSource + ?Sized,
{
    if limit == 0 {
        return Err(DomainError::validation("limit must be a positive integer"));
    }

    let total = source.total().await?;
    let from = window_start(anchor, limit);

    let mut items = if from >= total {
        Vec::new()
    } else {
        source.slice(from, limit).await?
    };
    items.truncate(limit as usize);

    let meta = window_meta(total, from, items.len() as u64, limit);
    tracing::debug!(total, from, limit, len = items.len(), ?meta, "window computed");

    Ok(Window { from, items, meta })
}
