//! Events handed to the real-time side channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a new post replied to, for reply notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyNotice {
    pub post_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForumEvent {
    /// Emitted exactly once per successful post creation.
    PostCreated {
        thread_id: Uuid,
        post_id: Uuid,
        post_number: u64,
        author_id: Uuid,
        reply_to: Option<ReplyNotice>,
        mentions: Vec<String>,
    },
}

impl ForumEvent {
    /// Channel key: subscribers follow one thread at a time.
    pub fn thread_id(&self) -> Uuid {
        match self {
            ForumEvent::PostCreated { thread_id, .. } => *thread_id,
        }
    }
}
