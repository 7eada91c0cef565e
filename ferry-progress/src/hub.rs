//! Upload-id to subscriber map.

use crate::message::PushMessage;
use crate::subscriber::Subscriber;
use dashmap::DashMap;
use tracing::{debug, warn};

/// Result of pushing a message to an upload-id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued for the current subscriber.
    Delivered,
    /// Nobody is subscribed.
    NoSubscriber,
    /// The subscriber was gone; it has been dropped from the hub.
    Failed,
}

/// Holds at most one subscriber per upload-id.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    subscribers: DashMap<String, Subscriber>,
}

impl ConnectionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, closing and returning the one it replaces.
    pub fn register(&self, subscriber: Subscriber) -> Option<Subscriber> {
        let upload_id = subscriber.upload_id.clone();
        debug!(upload_id = %upload_id, connection_id = %subscriber.connection_id, "Subscriber registered");
        let previous = self.subscribers.insert(upload_id, subscriber);
        if let Some(previous) = &previous {
            previous.close();
        }
        previous
    }

    /// Remove and close the subscriber for `upload_id`.
    pub fn remove(&self, upload_id: &str) -> Option<Subscriber> {
        let (_, subscriber) = self.subscribers.remove(upload_id)?;
        subscriber.close();
        Some(subscriber)
    }

    /// Remove the subscriber for `upload_id` only if it is still `connection_id`.
    pub fn remove_connection(&self, upload_id: &str, connection_id: &str) -> bool {
        self.subscribers
            .remove_if(upload_id, |_, s| s.connection_id == connection_id)
            .map(|(_, subscriber)| subscriber.close())
            .is_some()
    }

    /// Queue a message for the subscriber of `upload_id`.
    ///
    /// Failures are logged, never returned.
    pub fn push(&self, upload_id: &str, message: PushMessage) -> PushOutcome {
        let Some(subscriber) = self.subscribers.get(upload_id).map(|s| s.clone()) else {
            return PushOutcome::NoSubscriber;
        };

        match subscriber.send(message) {
            Ok(()) => PushOutcome::Delivered,
            Err(e) => {
                warn!(upload_id = %upload_id, error = %e, "Progress push failed");
                self.remove_connection(upload_id, &subscriber.connection_id);
                PushOutcome::Failed
            }
        }
    }

    /// Check if `upload_id` has a subscriber.
    pub fn contains(&self, upload_id: &str) -> bool {
        self.subscribers.contains_key(upload_id)
    }

    /// Subscribed upload-ids.
    pub fn upload_ids(&self) -> Vec<String> {
        self.subscribers.iter().map(|s| s.key().clone()).collect()
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if the hub is empty.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Close and drop every subscriber.
    pub fn clear(&self) {
        for upload_id in self.upload_ids() {
            self.remove(&upload_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_without_subscriber() {
        let hub = ConnectionHub::new();
        assert_eq!(hub.push("x", PushMessage::Text("{}".into())), PushOutcome::NoSubscriber);
    }

    #[test]
    fn test_removed_id_stays_removed_after_push() {
        let hub = ConnectionHub::new();
        let (subscriber, _rx) = Subscriber::channel("X", None);
        hub.register(subscriber);
        assert!(hub.remove("X").is_some());

        assert_eq!(hub.push("X", PushMessage::Text("{}".into())), PushOutcome::NoSubscriber);
        assert!(!hub.contains("X"));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_register_replaces_and_closes_previous() {
        let hub = ConnectionHub::new();
        let (first, mut first_rx) = Subscriber::channel("X", None);
        let (second, mut second_rx) = Subscriber::channel("X", None);
        let first_id = first.connection_id.clone();
        hub.register(first);
        let replaced = hub.register(second).unwrap();
        assert_eq!(replaced.connection_id, first_id);
        assert_eq!(first_rx.try_recv().unwrap(), PushMessage::Close);

        // The old connection cannot evict the new one.
        assert!(!hub.remove_connection("X", &first_id));
        assert_eq!(hub.push("X", PushMessage::Text("p".into())), PushOutcome::Delivered);
        assert_eq!(second_rx.try_recv().unwrap(), PushMessage::Text("p".into()));
    }

    #[test]
    fn test_failed_push_drops_subscriber() {
        let hub = ConnectionHub::new();
        let (subscriber, rx) = Subscriber::channel("X", None);
        hub.register(subscriber);
        drop(rx);

        assert_eq!(hub.push("X", PushMessage::Text("p".into())), PushOutcome::Failed);
        assert!(!hub.contains("X"));
    }
}
