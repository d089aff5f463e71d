use serde::Serialize;
use std::sync::Mutex;

/// Counters describing a feed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedMetrics {
    pub decoded: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub connect_attempts: usize,
    pub disconnects: usize,
}

pub struct MetricsRecorder {
    inner: Mutex<FeedMetrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FeedMetrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut FeedMetrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_decoded(&self) {
        self.update(|m| m.decoded += 1);
    }

    pub fn record_ignored(&self) {
        self.update(|m| m.ignored += 1);
    }

    pub fn record_malformed(&self) {
        self.update(|m| m.malformed += 1);
    }

    pub fn record_connect_attempt(&self) {
        self.update(|m| m.connect_attempts += 1);
    }

    pub fn record_disconnect(&self) {
        self.update(|m| m.disconnects += 1);
    }

    pub fn snapshot(&self) -> FeedMetrics {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
