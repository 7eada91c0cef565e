//! Latest progress snapshot per upload-id.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Progress of one upload, as pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    /// Display name of the file being uploaded
    pub file_name: String,
    /// Bytes transferred since the previous update
    pub increment: u64,
    /// Bytes transferred so far
    pub transferred: u64,
    /// Total bytes
    pub total: u64,
    /// `transferred * 100 / total`, rounded down; 0 when `total` is 0
    pub percentage: u64,
    /// Instantaneous speed in KB/s
    pub speed: f64,
}

/// Whole-number percentage, 0 for an empty total.
pub fn percentage(transferred: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((transferred as u128 * 100) / total as u128) as u64
}

#[derive(Debug)]
struct Entry {
    progress: UploadProgress,
    updated_at: Instant,
}

/// Keeps only the most recent snapshot for each upload-id.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ProgressTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update at `now` and hand the new snapshot to `forward`
    /// while the tracker is still locked.
    ///
    /// Updates whose `transferred` is below the stored one are dropped and
    /// `None` is returned, so subscribers never observe progress going back.
    #[allow(clippy::too_many_arguments)]
    pub fn record_at<F>(
        &self,
        upload_id: &str,
        file_name: &str,
        increment: u64,
        transferred: u64,
        total: u64,
        now: Instant,
        forward: F,
    ) -> Option<UploadProgress>
    where
        F: FnOnce(&UploadProgress),
    {
        let mut entries = self.entries.lock();

        let speed = match entries.get(upload_id) {
            Some(previous) if transferred < previous.progress.transferred => return None,
            Some(previous) => {
                let elapsed = now.saturating_duration_since(previous.updated_at).as_secs_f64();
                if elapsed > 0.0 {
                    increment as f64 / elapsed / 1024.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let progress = UploadProgress {
            file_name: file_name.to_string(),
            increment,
            transferred,
            total,
            percentage: percentage(transferred, total),
            speed,
        };

        entries.insert(
            upload_id.to_string(),
            Entry {
                progress: progress.clone(),
                updated_at: now,
            },
        );
        forward(&progress);
        Some(progress)
    }

    /// Record an update now.
    pub fn record(
        &self,
        upload_id: &str,
        file_name: &str,
        increment: u64,
        transferred: u64,
        total: u64,
    ) -> Option<UploadProgress> {
        self.record_at(upload_id, file_name, increment, transferred, total, Instant::now(), |_| {})
    }

    /// Latest snapshot for `upload_id`.
    pub fn snapshot(&self, upload_id: &str) -> Option<UploadProgress> {
        self.entries.lock().get(upload_id).map(|e| e.progress.clone())
    }

    /// Drop the snapshot and timestamp for `upload_id`.
    pub fn forget(&self, upload_id: &str) -> bool {
        self.entries.lock().remove(upload_id).is_some()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of tracked uploads.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
