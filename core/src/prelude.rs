use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "wss://rafamaritza-eews-creime-monitor.hf.space/ws";
pub const DEFAULT_STATION: &str = "123";

/// Connection settings for a single feed subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the feed, without the station segment.
    pub endpoint: String,
    /// Station/session path segment appended to the endpoint.
    pub station: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            station: DEFAULT_STATION.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl FeedConfig {
    pub fn new(endpoint: impl Into<String>, station: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            station: station.into(),
            ..Default::default()
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Full feed URL: the endpoint joined with the station segment.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.station.trim_matches('/')
        )
    }

    pub fn validate(&self) -> FeedResult<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(FeedError::Config("endpoint must not be empty".into()));
        }
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(FeedError::Config(format!(
                "endpoint must use ws:// or wss://, got {endpoint}"
            )));
        }
        if self.station.trim_matches('/').trim().is_empty() {
            return Err(FeedError::Config("station must not be empty".into()));
        }
        self.reconnect.validate()
    }
}

/// Delay strategy applied between reconnect attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Constant delay between attempts.
    Fixed { delay_ms: u64 },
    /// Capped exponential growth with symmetric jitter.
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        multiplier: f64,
        /// Fraction of the nominal delay used as +/- spread, in `[0, 1]`.
        jitter: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Exponential {
            initial_ms: 1_000,
            max_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.2,
            seed: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed_ms(delay_ms: u64) -> Self {
        ReconnectPolicy::Fixed { delay_ms }
    }

    pub fn validate(&self) -> FeedResult<()> {
        match *self {
            ReconnectPolicy::Fixed { delay_ms: 0 } => Err(FeedError::Config(
                "fixed delay_ms must be greater than zero".into(),
            )),
            ReconnectPolicy::Fixed { .. } => Ok(()),
            ReconnectPolicy::Exponential {
                initial_ms,
                max_ms,
                multiplier,
                jitter,
                ..
            } => {
                if initial_ms > max_ms {
                    return Err(FeedError::Config(format!(
                        "initial_ms ({initial_ms}) exceeds max_ms ({max_ms})"
                    )));
                }
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(FeedError::Config(format!(
                        "multiplier must be >= 1.0, got {multiplier}"
                    )));
                }
                if !(0.0..=1.0).contains(&jitter) {
                    return Err(FeedError::Config(format!(
                        "jitter must lie in [0, 1], got {jitter}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Errors returned to the caller of a misused or misconfigured operation.
///
/// Transport and protocol faults never show up here; the manager recovers
/// from those internally.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("connection manager already stopped")]
    Stopped,
    #[error("no tokio runtime available to drive the feed")]
    NoRuntime,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
