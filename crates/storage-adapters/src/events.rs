//! In-process fan-out of forum events over a tokio broadcast channel.
//!
//! Delivery is fire-and-forget: publishing with nobody listening is not an
//! error, and slow subscribers observe `Lagged` instead of blocking writers.

use domains::{ForumEvent, ForumEvents, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct BroadcastEvents {
    sender: broadcast::Sender<ForumEvent>,
}

impl BroadcastEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForumEvent> {
        self.sender.subscribe()
    }

    /// Subscription that only yields events of one thread.
    pub fn subscribe_thread(&self, thread_id: Uuid) -> ThreadSubscription {
        ThreadSubscription {
            thread_id,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for BroadcastEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ForumEvents for BroadcastEvents {
    fn publish(&self, event: ForumEvent) -> Result<()> {
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(receivers, "event published"),
            Err(_) => tracing::trace!("event dropped, no subscribers"),
        }
        Ok(())
    }
}

pub struct ThreadSubscription {
    thread_id: Uuid,
    receiver: broadcast::Receiver<ForumEvent>,
}

impl ThreadSubscription {
    /// Next event for the subscribed thread, `None` once the channel closes.
    pub async fn recv(&mut self) -> Option<ForumEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.thread_id() == self.thread_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(thread_id = %self.thread_id, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
