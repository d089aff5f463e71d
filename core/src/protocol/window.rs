use serde::{Deserialize, Serialize};

/// Conventional seismometer channel labels, in channel A/B/C order.
pub const CHANNEL_LABELS: [&str; 3] = ["BHE", "BHN", "BHZ"];

const PLACEHOLDER: &str = "-";

/// Classifier verdict derived from the feed's 0/1 indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventFlag {
    Normal,
    Event,
}

impl EventFlag {
    pub fn from_indicator(indicator: u8) -> Option<Self> {
        match indicator {
            0 => Some(EventFlag::Normal),
            1 => Some(EventFlag::Event),
            _ => None,
        }
    }

    pub fn is_event(self) -> bool {
        self == EventFlag::Event
    }
}

/// Classification output attached to each window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub is_event: EventFlag,
    pub magnitude: Option<f64>,
    pub p_arrival_sample_index: Option<i64>,
}

impl Prediction {
    pub fn new(
        is_event: EventFlag,
        magnitude: Option<f64>,
        p_arrival_sample_index: Option<i64>,
    ) -> Self {
        Self {
            is_event,
            magnitude,
            p_arrival_sample_index,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.is_event {
            EventFlag::Event => "EVENT",
            EventFlag::Normal => "Normal",
        }
    }

    pub fn magnitude_label(&self) -> String {
        self.magnitude
            .map(|m| format!("{m:.2}"))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn p_arrival_label(&self) -> String {
        self.p_arrival_sample_index
            .map(|idx| idx.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

/// One row of the three channels at a shared sample index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedSample {
    pub index: usize,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// One decoded unit of telemetry: three channel sequences plus a prediction.
///
/// Channel lengths are kept exactly as received; nothing is padded or
/// truncated at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataWindow {
    station_id: String,
    channel_a: Vec<f64>,
    channel_b: Vec<f64>,
    channel_c: Vec<f64>,
    prediction: Prediction,
}

impl DataWindow {
    pub fn new(
        station_id: String,
        channel_a: Vec<f64>,
        channel_b: Vec<f64>,
        channel_c: Vec<f64>,
        prediction: Prediction,
    ) -> Self {
        Self {
            station_id,
            channel_a,
            channel_b,
            channel_c,
            prediction,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn channel_a(&self) -> &[f64] {
        &self.channel_a
    }

    pub fn channel_b(&self) -> &[f64] {
        &self.channel_b
    }

    pub fn channel_c(&self) -> &[f64] {
        &self.channel_c
    }

    pub fn channels(&self) -> [&[f64]; 3] {
        [
            self.channel_a.as_slice(),
            self.channel_b.as_slice(),
            self.channel_c.as_slice(),
        ]
    }

    pub fn prediction(&self) -> &Prediction {
        &self.prediction
    }

    /// Rows indexed over channel A. Channel B/C samples missing at an index
    /// read as `0.0`.
    pub fn aligned_samples(&self) -> impl Iterator<Item = AlignedSample> + '_ {
        self.channel_a
            .iter()
            .enumerate()
            .map(move |(index, &a)| AlignedSample {
                index,
                a,
                b: self.channel_b.get(index).copied().unwrap_or(0.0),
                c: self.channel_c.get(index).copied().unwrap_or(0.0),
            })
    }
}
