//! Notification bus consumed by the presentation layer.
//!
//! These three events are the only outputs the UI is allowed to depend on.
//! Delivery is a single-producer broadcast: each subscriber sees events in
//! publish order (FIFO); slow subscribers may observe lag but never
//! reordering.

use tokio::sync::broadcast;

use crate::error::ClassifiedError;
use crate::model::PlaybackSnapshot;

#[derive(Debug, Clone)]
pub enum Notification {
    /// The observable playback snapshot changed.
    PlaybackChanged(PlaybackSnapshot),
    /// A favorite toggle completed against the remote catalog.
    FavoriteSucceeded { song_id: String },
    /// A favorite toggle failed terminally (after retries, if any).
    FavoriteFailed(ClassifiedError),
}

#[derive(Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        // No subscribers yet is fine; the UI attaches when it is ready.
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let bus = NotificationBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(Notification::FavoriteSucceeded { song_id: "1".into() });
        bus.publish(Notification::FavoriteSucceeded { song_id: "2".into() });

        for expected in ["1", "2"] {
            match rx.recv().await.unwrap() {
                Notification::FavoriteSucceeded { song_id } => {
                    assert_eq!(song_id, expected)
                }
                other => panic!("unexpected notification: {other:?}"),
            }
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = NotificationBus::new(4);
        bus.publish(Notification::FavoriteSucceeded { song_id: "1".into() });
    }
}
