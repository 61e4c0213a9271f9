//! In-process buffer between the notification consumer and the notifier.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::event::NotificationEvent;

/// FIFO of events waiting for the next notifier cycle.
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct PendingNotifications {
    inner: Arc<Mutex<VecDeque<NotificationEvent>>>,
}

impl PendingNotifications {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub async fn push(&self, event: NotificationEvent) {
        self.inner.lock().await.push_back(event);
    }

    /// Take every buffered event, oldest first.
    pub async fn drain(&self) -> Vec<NotificationEvent> {
        self.inner.lock().await.drain(..).collect()
    }

    /// Number of buffered events.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the buffer is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64) -> NotificationEvent {
        NotificationEvent {
            sender: "a@x.com".into(),
            recipient: "b@y.com".into(),
            subject: "Hi".into(),
            id,
        }
    }

    #[tokio::test]
    async fn test_drain_preserves_order() {
        let pending = PendingNotifications::new();
        pending.push(event(1)).await;
        pending.push(event(2)).await;
        pending.push(event(3)).await;
        assert_eq!(pending.len().await, 3);

        let ids: Vec<i64> = pending.drain().await.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_push_and_drain() {
        let pending = PendingNotifications::new();

        let mut producers = Vec::new();
        for task in 0..4 {
            let pending = pending.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25 {
                    pending.push(event(task * 100 + i)).await;
                }
            }));
        }

        let mut drained = Vec::new();
        for producer in producers {
            producer.await.unwrap();
            drained.extend(pending.drain().await);
        }
        drained.extend(pending.drain().await);

        assert_eq!(drained.len(), 100);
        let mut ids: Vec<i64> = drained.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }
}
