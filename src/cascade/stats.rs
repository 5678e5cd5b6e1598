use crate::core::types::CascadeStats;
use chrono::Utc;
use std::sync::Mutex;

/// Internally synchronized operational counters. Owned by whoever builds
/// the cascade and injected into it, so tests get isolated instances and
/// nothing hides behind a process-wide singleton.
pub struct StatsTracker {
    inner: Mutex<CascadeStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CascadeStats::default()),
        }
    }

    /// Record one item whose full pipeline completed. Filtered items never
    /// reach this point.
    pub fn record_item(&self, local_confidence: f64, escalated: bool) {
        let mut s = self.inner.lock().unwrap();
        s.total_analyzed += 1;
        let n = s.total_analyzed as f64;
        s.avg_local_confidence += (local_confidence - s.avg_local_confidence) / n;
        if escalated {
            s.escalated_count += 1;
        }
    }

    /// One failed verification batch counts once, regardless of its size.
    pub fn record_error(&self, msg: &str) {
        let mut s = self.inner.lock().unwrap();
        s.external_errors += 1;
        s.last_error = Some(msg.to_string());
        s.last_error_time = Some(Utc::now());
    }

    pub fn snapshot(&self) -> CascadeStats {
        self.inner.lock().unwrap().clone()
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
