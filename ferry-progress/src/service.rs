//! Progress tracking bound to push delivery.

use crate::hub::{ConnectionHub, PushOutcome};
use crate::message::PushMessage;
use crate::subscriber::Subscriber;
use crate::tracker::{ProgressTracker, UploadProgress};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Records backend progress callbacks and forwards each snapshot to the
/// upload's subscriber.
///
/// Snapshots are queued to the hub while the tracker lock is held, so every
/// subscriber sees `transferred` in non-decreasing order. Queuing never
/// blocks; the socket write happens on the subscriber's writer task.
#[derive(Debug, Default)]
pub struct ProgressService {
    tracker: ProgressTracker,
    hub: ConnectionHub,
}

impl ProgressService {
    /// Create a service with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update and push it to the subscriber, if any.
    pub fn update(
        &self,
        upload_id: &str,
        file_name: &str,
        increment: u64,
        transferred: u64,
        total: u64,
    ) -> Option<UploadProgress> {
        self.update_at(upload_id, file_name, increment, transferred, total, Instant::now())
    }

    /// Record an update observed at `now`.
    pub fn update_at(
        &self,
        upload_id: &str,
        file_name: &str,
        increment: u64,
        transferred: u64,
        total: u64,
        now: Instant,
    ) -> Option<UploadProgress> {
        let mut outcome = PushOutcome::NoSubscriber;
        let recorded = self.tracker.record_at(
            upload_id,
            file_name,
            increment,
            transferred,
            total,
            now,
            |progress| outcome = self.forward(upload_id, progress),
        );
        if recorded.is_none() {
            debug!(upload_id = %upload_id, transferred, "Dropped regressing progress update");
        }
        // The hub dropped a dead channel; its progress goes with it.
        if outcome == PushOutcome::Failed {
            self.tracker.forget(upload_id);
        }
        recorded
    }

    fn forward(&self, upload_id: &str, progress: &UploadProgress) -> PushOutcome {
        if !self.hub.contains(upload_id) {
            return PushOutcome::NoSubscriber;
        }
        match PushMessage::progress(progress) {
            Ok(message) => {
                let outcome = self.hub.push(upload_id, message);
                if outcome == PushOutcome::Delivered {
                    debug!(upload_id = %upload_id, percentage = progress.percentage, "Progress pushed");
                }
                outcome
            }
            Err(e) => {
                warn!(upload_id = %upload_id, error = %e, "Cannot encode progress");
                PushOutcome::NoSubscriber
            }
        }
    }

    /// Backend progress callback bound to an upload-id and file name.
    pub fn callback(
        self: &Arc<Self>,
        upload_id: impl Into<String>,
        file_name: impl Into<String>,
    ) -> impl Fn(u64, u64, u64) + Send + Sync + 'static {
        let service = Arc::clone(self);
        let upload_id = upload_id.into();
        let file_name = file_name.into();
        move |increment, transferred, total| {
            service.update(&upload_id, &file_name, increment, transferred, total);
        }
    }

    /// Register a subscriber for its upload-id.
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.hub.register(subscriber);
    }

    /// Remove the subscriber for `upload_id` and forget its progress.
    pub fn unsubscribe(&self, upload_id: &str) -> bool {
        let removed = self.hub.remove(upload_id).is_some();
        self.tracker.forget(upload_id);
        removed
    }

    /// Remove the subscriber only if it is still `connection_id`; its
    /// progress is forgotten along with it.
    pub fn unsubscribe_connection(&self, upload_id: &str, connection_id: &str) -> bool {
        let removed = self.hub.remove_connection(upload_id, connection_id);
        if removed {
            self.tracker.forget(upload_id);
        }
        removed
    }

    /// Latest snapshot for `upload_id`.
    pub fn progress(&self, upload_id: &str) -> Option<UploadProgress> {
        self.tracker.snapshot(upload_id)
    }

    /// Close every subscriber and drop all progress.
    pub fn clear_all(&self) {
        self.hub.clear();
        self.tracker.clear();
    }

    /// The connection hub.
    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// The progress tracker.
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(message: PushMessage) -> UploadProgress {
        serde_json::from_str(message.as_text().unwrap()).unwrap()
    }

    #[test]
    fn test_update_without_subscriber_keeps_snapshot() {
        let service = ProgressService::new();
        service.update("u1", "a.bin", 10, 10, 100);
        assert_eq!(service.progress("u1").unwrap().percentage, 10);
    }

    #[test]
    fn test_subscriber_receives_updates() {
        let service = ProgressService::new();
        let (subscriber, mut rx) = Subscriber::channel("u1", None);
        service.subscribe(subscriber);

        service.update("u1", "a.bin", 25, 25, 100);
        service.update("u1", "a.bin", 75, 100, 100);

        let first = decode(rx.try_recv().unwrap());
        let last = decode(rx.try_recv().unwrap());
        assert_eq!(first.transferred, 25);
        assert_eq!(last.percentage, 100);
        assert_eq!(last.file_name, "a.bin");
    }

    #[test]
    fn test_unsubscribe_discards_snapshot() {
        let service = ProgressService::new();
        let (subscriber, _rx) = Subscriber::channel("u1", None);
        service.subscribe(subscriber);
        service.update("u1", "a.bin", 10, 10, 100);

        assert!(service.unsubscribe("u1"));
        assert!(service.progress("u1").is_none());

        service.update("u1", "a.bin", 20, 30, 100);
        assert!(!service.hub().contains("u1"));
    }

    #[test]
    fn test_failed_push_discards_snapshot() {
        let service = ProgressService::new();
        let (subscriber, rx) = Subscriber::channel("X", None);
        let connection_id = subscriber.connection_id.clone();
        service.subscribe(subscriber);
        service.update("X", "a.bin", 100, 100, 100);
        drop(rx);

        service.update("X", "a.bin", 0, 100, 100);
        assert!(!service.hub().contains("X"));
        assert!(!service.unsubscribe_connection("X", &connection_id));
        assert!(service.progress("X").is_none());

        let (subscriber, mut rx) = Subscriber::channel("X", None);
        service.subscribe(subscriber);
        let recorded = service.update("X", "b.bin", 10, 10, 50).unwrap();
        assert_eq!(recorded.percentage, 20);
        assert_eq!(decode(rx.try_recv().unwrap()).file_name, "b.bin");
    }

    #[test]
    fn test_callback_routes_to_upload_id() {
        let service = Arc::new(ProgressService::new());
        let callback = service.callback("u9", "movie.mp4");
        callback(512, 512, 1024);
        callback(512, 1024, 1024);
        let progress = service.progress("u9").unwrap();
        assert_eq!(progress.file_name, "movie.mp4");
        assert_eq!(progress.percentage, 100);
    }

    #[test]
    fn test_clear_all() {
        let service = ProgressService::new();
        let (subscriber, mut rx) = Subscriber::channel("u1", None);
        service.subscribe(subscriber);
        service.update("u2", "b", 1, 1, 2);

        service.clear_all();
        assert!(service.hub().is_empty());
        assert!(service.tracker().is_empty());
        assert_eq!(rx.try_recv().unwrap(), PushMessage::Close);
    }
}
