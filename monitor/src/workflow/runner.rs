use crate::display::bridge::DisplayBridge;
use crate::workflow::config::MonitorConfig;
use anyhow::Context;
use seisfeed::connection::{Connector, MemoryConnector, ScriptedFrame, WebSocketConnector};
use seisfeed::telemetry::FeedMetrics;
use seisfeed::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;

pub struct SessionSummary {
    pub station: Option<String>,
    pub metrics: FeedMetrics,
}

impl SessionSummary {
    pub fn report_line(&self) -> String {
        format!(
            "station={} decoded={} ignored={} malformed={} connect_attempts={} disconnects={}\n",
            self.station.as_deref().unwrap_or("-"),
            self.metrics.decoded,
            self.metrics.ignored,
            self.metrics.malformed,
            self.metrics.connect_attempts,
            self.metrics.disconnects
        )
    }
}

enum Exit {
    /// Ctrl+C or the configured duration.
    Interrupt(Option<Duration>),
    /// The first session ended.
    SessionEnd,
}

#[derive(Clone)]
pub struct Runner {
    config: MonitorConfig,
}

impl Runner {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Follows the live feed until Ctrl+C or the configured duration elapses.
    pub async fn run_live(&self, bridge: Arc<DisplayBridge>) -> anyhow::Result<SessionSummary> {
        let duration = self.config.duration_secs.map(Duration::from_secs);
        self.run(Arc::new(WebSocketConnector), bridge, Exit::Interrupt(duration))
            .await
    }

    /// Plays captured frames through the same manager path as a live feed.
    pub async fn run_replay(
        &self,
        frames: Vec<ScriptedFrame>,
        bridge: Arc<DisplayBridge>,
    ) -> anyhow::Result<SessionSummary> {
        let connector = MemoryConnector::new();
        connector.push_frames(frames);
        self.run(Arc::new(connector), bridge, Exit::SessionEnd).await
    }

    async fn run(
        &self,
        connector: Arc<dyn Connector>,
        bridge: Arc<DisplayBridge>,
        exit: Exit,
    ) -> anyhow::Result<SessionSummary> {
        self.config
            .feed
            .validate()
            .context("validating feed config")?;

        let manager = ConnectionManager::new(self.config.feed.clone(), connector);
        let session_end = Arc::new(Notify::new());

        let snapshot_bridge = bridge.clone();
        let ended = session_end.clone();
        let _snapshots = manager
            .subscribe(move |snapshot| {
                snapshot_bridge.publish(snapshot);
                if !snapshot.connected {
                    ended.notify_one();
                }
            })
            .context("subscribing to snapshots")?;
        let diagnostic_bridge = bridge.clone();
        let _diagnostics = manager
            .on_diagnostic(move |diagnostic| diagnostic_bridge.publish_diagnostic(diagnostic))
            .context("subscribing to diagnostics")?;

        bridge.publish_status(&format!("following {}", self.config.feed.url()));
        manager.start().context("starting connection manager")?;

        match exit {
            Exit::Interrupt(duration) => {
                tokio::select! {
                    result = signal::ctrl_c() => result.context("awaiting Ctrl+C to exit")?,
                    _ = sleep_or_pending(duration) => {}
                }
            }
            Exit::SessionEnd => {
                tokio::select! {
                    result = signal::ctrl_c() => result.context("awaiting Ctrl+C to exit")?,
                    _ = session_end.notified() => {}
                }
            }
        }

        manager.stop().context("stopping connection manager")?;
        manager.join().await;
        bridge.publish_status("feed stopped");

        Ok(SessionSummary {
            station: manager.snapshot().station_id,
            metrics: manager.metrics(),
        })
    }
}

async fn sleep_or_pending(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
