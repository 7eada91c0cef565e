//! 10% step throttling for progress logging.

use crate::tracker::percentage;
use std::sync::atomic::{AtomicU64, Ordering};

/// Decides which updates of one transfer are worth emitting.
///
/// An update passes when it enters a higher 10% bucket than the last one
/// that passed, or when the transfer is complete.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last_bucket: AtomicU64,
}

impl ProgressThrottle {
    /// Create a throttle for a new transfer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether this update should be emitted.
    pub fn should_emit(&self, transferred: u64, total: u64) -> bool {
        if transferred >= total {
            self.last_bucket.store(10, Ordering::SeqCst);
            return true;
        }
        let bucket = percentage(transferred, total) / 10;
        bucket > self.last_bucket.fetch_max(bucket, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emits_on_ten_percent_boundaries() {
        let throttle = ProgressThrottle::new();
        let emitted: Vec<u64> = (1..=100u64)
            .map(|p| p * 10)
            .filter(|&t| throttle.should_emit(t, 1000))
            .collect();
        assert_eq!(emitted, vec![100, 200, 300, 400, 500, 600, 700, 800, 900, 1000]);
    }

    #[test]
    fn test_skips_within_bucket() {
        let throttle = ProgressThrottle::new();
        assert!(!throttle.should_emit(5, 100));
        assert!(throttle.should_emit(12, 100));
        assert!(!throttle.should_emit(18, 100));
        assert!(throttle.should_emit(55, 100));
        assert!(!throttle.should_emit(59, 100));
    }

    #[test]
    fn test_always_emits_completion() {
        let throttle = ProgressThrottle::new();
        assert!(throttle.should_emit(0, 0));
        let throttle = ProgressThrottle::new();
        assert!(throttle.should_emit(95, 100));
        assert!(throttle.should_emit(100, 100));
    }
}
