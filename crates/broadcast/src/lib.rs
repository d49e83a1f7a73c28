//! Broadcaster: fans out `ArenaEvent`s to subscribers of the event's group
//! (spec.md §4.6, §6). A subscriber whose channel is closed or full is
//! dropped from the subscriber list on the next publish rather than slowing
//! down or blocking the others.

use std::collections::HashMap;
use std::sync::RwLock;

use arena_types::ArenaEvent;
use tokio::sync::mpsc;
use tracing::debug;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

pub type EventReceiver = mpsc::Receiver<ArenaEvent>;

#[derive(Default)]
pub struct Broadcaster {
    subscribers: RwLock<HashMap<String, Vec<mpsc::Sender<ArenaEvent>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a single group's events.
    pub fn subscribe(&self, group_id: &str) -> EventReceiver {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        self.subscribers
            .write()
            .expect("broadcaster lock poisoned")
            .entry(group_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Sends `event` to every live subscriber of `event.group_id()`. Closed
    /// or full channels are pruned from the subscriber list.
    pub fn publish(&self, event: ArenaEvent) {
        let group_id = event.group_id().to_string();
        let mut subscribers = self.subscribers.write().expect("broadcaster lock poisoned");
        let Some(senders) = subscribers.get_mut(&group_id) else {
            return;
        };
        let before = senders.len();
        senders.retain(|tx| tx.try_send(event.clone()).is_ok());
        let dropped = before - senders.len();
        if dropped > 0 {
            debug!(group_id, dropped, "pruned unreachable broadcaster subscribers");
        }
    }

    pub fn subscriber_count(&self, group_id: &str) -> usize {
        self.subscribers
            .read()
            .expect("broadcaster lock poisoned")
            .get(group_id)
            .map_or(0, Vec::len)
    }
}
