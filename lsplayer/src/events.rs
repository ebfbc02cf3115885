use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::player::PlayerEvent;

/// Fan-out of player events. Dropping a receiver unsubscribes it.
#[derive(Clone, Default)]
pub struct PlayerEventBus {
    subscribers: Arc<Mutex<Vec<UnboundedSender<PlayerEvent>>>>,
}

impl PlayerEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<UnboundedSender<PlayerEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = unbounded_channel::<PlayerEvent>();
        self.subscribers().push(tx);
        rx
    }

    pub fn broadcast(&self, event: PlayerEvent) {
        self.subscribers()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Drops every subscription; receivers observe a closed channel.
    pub fn close(&self) {
        self.subscribers().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let bus = PlayerEventBus::new();
        let mut kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.broadcast(PlayerEvent::Playing);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.recv().await, Some(PlayerEvent::Playing));
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let bus = PlayerEventBus::new();
        let mut rx = bus.subscribe();
        bus.close();
        bus.broadcast(PlayerEvent::Ended);
        assert_eq!(rx.recv().await, None);
    }
}
