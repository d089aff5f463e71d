use seisfeed::protocol::{AlignedSample, CHANNEL_LABELS};
use seisfeed::Snapshot;
use serde::Serialize;

const MAX_DIAGNOSTICS: usize = 20;

/// Renderer-facing view of the feed: what a chart and a status panel need.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayModel {
    pub connected: bool,
    pub connection_label: String,
    pub station_label: String,
    pub channel_labels: [&'static str; 3],
    pub rows: Vec<AlignedSample>,
    pub status: String,
    pub magnitude: String,
    pub p_arrival: String,
    pub updates: usize,
    pub diagnostics: Vec<String>,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self {
            connected: false,
            connection_label: "Disconnected".into(),
            station_label: "Connecting...".into(),
            channel_labels: CHANNEL_LABELS,
            rows: Vec::new(),
            status: "-".into(),
            magnitude: "-".into(),
            p_arrival: "-".into(),
            updates: 0,
            diagnostics: Vec::new(),
        }
    }
}

impl DisplayModel {
    /// Folds a snapshot in. The last window stays on display while the feed
    /// is disconnected.
    pub fn apply(&mut self, snapshot: &Snapshot) {
        self.connected = snapshot.connected;
        self.connection_label = if snapshot.connected {
            "Live Connection".into()
        } else {
            "Disconnected".into()
        };
        if let Some(station) = &snapshot.station_id {
            self.station_label = station.clone();
        }
        if let Some(window) = &snapshot.window {
            let prediction = window.prediction();
            self.rows = window.aligned_samples().collect();
            self.status = prediction.status_label().into();
            self.magnitude = prediction.magnitude_label();
            self.p_arrival = prediction.p_arrival_label();
        }
        self.updates += 1;
    }

    pub fn push_diagnostic(&mut self, entry: String) {
        self.diagnostics.push(entry);
        if self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.remove(0);
        }
    }
}
