use log::{debug, info, warn};

/// Station-tagged wrapper over the `log` facade.
pub struct LogManager {
    station: String,
}

impl LogManager {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
        }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.station, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.station, message);
    }

    pub fn debug(&self, message: &str) {
        debug!("[{}] {}", self.station, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("feed")
    }
}
