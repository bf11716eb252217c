//! Client event bus.
//!
//! Built on [`tokio::sync::broadcast`] so that every subscriber (one per
//! connected web client) receives every event without any single
//! subscriber blocking the others.  Publication is fire-and-forget: no
//! subscribers is a normal condition, and a slow subscriber lags and
//! loses the oldest events rather than stalling the publisher.

use armada_types::ClientEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity (events buffered per subscriber before the
/// oldest are dropped for laggards).
const DEFAULT_CAPACITY: usize = 256;

/// Shared event bus.  Clone it cheaply – all clones share the same
/// underlying channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `event` to every current subscriber.
    ///
    /// Returns the number of subscribers that were handed the event;
    /// `0` when no client is connected, which is normal and never an
    /// error.
    pub fn publish(&self, event: ClientEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                trace!("no clients subscribed, event dropped");
                0
            }
        }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
