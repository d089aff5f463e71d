use anyhow::Context;
use seisfeed::{FeedConfig, ReconnectPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub feed: FeedConfig,
    /// Address of the `/snapshot` endpoint when serving.
    pub bind: SocketAddr,
    /// Stop after this many seconds instead of waiting for Ctrl+C.
    pub duration_secs: Option<u64>,
    /// File that receives a one-line session summary on exit.
    pub report: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            bind: default_bind_address(),
            duration_secs: None,
            report: None,
        }
    }
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(endpoint: String, station: String, fixed_delay_ms: Option<u64>) -> Self {
        let mut feed = FeedConfig::new(endpoint, station);
        if let Some(delay_ms) = fixed_delay_ms {
            feed.reconnect = ReconnectPolicy::fixed_ms(delay_ms);
        }
        Self {
            feed,
            ..Default::default()
        }
    }
}
