//! # Reply Graph
//!
//! One hop of self-reference between posts: a post may reply to exactly one
//! earlier post of the same thread. The target's author name is copied onto
//! the reply when it is written and never refreshed afterwards.

use domains::{DomainError, Post, PostRepository, ReplyTarget, Result, Thread, UserDirectory};
use uuid::Uuid;

const REPLY_FIELD: &str = "replyingToId";

/// Loads the post `id` and checks that `thread` may reply to it.
pub async fn resolve_reply_target(
    posts: &dyn PostRepository,
    id: Uuid,
    thread: &Thread,
) -> Result<Post> {
    let post = posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::invalid_parameter(REPLY_FIELD, "post does not exist"))?;

    if post.thread_id != thread.id {
        return Err(DomainError::invalid_parameter(
            REPLY_FIELD,
            "replies must be in same thread",
        ));
    }
    if post.removed {
        return Err(DomainError::PostRemoved);
    }
    Ok(post)
}

/// Takes the denormalized snapshot stored on the reply.
pub async fn snapshot(users: &dyn UserDirectory, target: &Post) -> Result<ReplyTarget> {
    let username = users
        .username(target.author_id)
        .await?
        .ok_or_else(|| DomainError::not_found("user", target.author_id))?;

    Ok(ReplyTarget {
        post_id: target.id,
        username,
    })
}
