use crate::connection::backoff::Backoff;
use crate::connection::clock::{Clock, TokioClock};
use crate::connection::state::{ConnectionState, ConnectionStatus, Diagnostic, Snapshot};
use crate::connection::subscribers::{Dispatcher, Subscription};
use crate::connection::transport::{Connector, Frame, Transport};
use crate::prelude::{FeedConfig, FeedError, FeedResult};
use crate::protocol::{decode_text, Decoded};
use crate::telemetry::{FeedMetrics, LogManager, MetricsRecorder};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Keeps a live connection to the feed and publishes the latest decoded
/// window to subscribers.
///
/// All I/O, decoding and notification run on a single spawned task. Listener
/// callbacks execute on that task while the registry lock is held, so they
/// must not call back into the manager.
pub struct ConnectionManager {
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    /// Bumped to cut a reconnect delay short.
    wake: watch::Sender<u64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    state: Mutex<ConnectionState>,
    dispatcher: Arc<Dispatcher>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `update` unless the manager has been stopped. Returns the
    /// resulting snapshot when the update was applied.
    fn transition(&self, update: impl FnOnce(&mut ConnectionState)) -> Option<Snapshot> {
        let mut state = self.state();
        if state.status == ConnectionStatus::Stopped {
            return None;
        }
        update(&mut state);
        Some(state.snapshot())
    }

    fn publish(&self, snapshot: &Snapshot) {
        for id in self.dispatcher.publish(snapshot) {
            self.logger
                .warn(&format!("snapshot listener {id} panicked; delivery continues"));
        }
    }

    fn report(&self, diagnostic: &Diagnostic) {
        for id in self.dispatcher.report(diagnostic) {
            self.logger
                .warn(&format!("diagnostic listener {id} panicked; delivery continues"));
        }
    }

    fn connecting(&self) {
        self.transition(|state| state.status = ConnectionStatus::Connecting);
        self.metrics.record_connect_attempt();
    }

    fn connected(&self, url: &str) {
        let snapshot = self.transition(|state| {
            state.status = ConnectionStatus::Connected;
            state.reconnect_attempt = 0;
        });
        if let Some(snapshot) = snapshot {
            self.logger.record(&format!("connected to {url}"));
            self.publish(&snapshot);
        }
    }

    fn disconnected(&self, reason: &str, attempt: u32, delay: Duration) {
        let snapshot = self.transition(|state| {
            state.status = ConnectionStatus::ReconnectWait;
            state.reconnect_attempt = attempt;
        });
        if let Some(snapshot) = snapshot {
            self.metrics.record_disconnect();
            self.logger.warn(&format!(
                "disconnected ({reason}); reconnecting in {}ms",
                delay.as_millis()
            ));
            self.publish(&snapshot);
        }
    }

    fn connect_failed(&self, reason: &str, attempt: u32, delay: Duration) {
        let applied = self.transition(|state| {
            state.status = ConnectionStatus::ReconnectWait;
            state.reconnect_attempt = attempt;
        });
        if applied.is_some() {
            self.logger.warn(&format!(
                "connect attempt {attempt} failed ({reason}); retrying in {}ms",
                delay.as_millis()
            ));
        }
    }

    fn handle_text(&self, text: &str) {
        match decode_text(text) {
            Ok(Decoded::Window(window)) => {
                let window = Arc::new(window);
                let snapshot = self.transition(|state| state.window = Some(window));
                if let Some(snapshot) = snapshot {
                    self.metrics.record_decoded();
                    self.publish(&snapshot);
                }
            }
            Ok(Decoded::Ignored { kind }) => {
                self.metrics.record_ignored();
                self.logger.debug(&format!("ignoring message type {kind}"));
            }
            Err(err) => {
                self.metrics.record_malformed();
                self.logger.warn(&format!("dropping frame: {err}"));
                self.report(&Diagnostic::Malformed(err));
            }
        }
    }

    fn undecodable(&self, reason: String) {
        self.metrics.record_malformed();
        self.logger.warn(&format!("dropping frame: {reason}"));
        self.report(&Diagnostic::Undecodable { reason });
    }
}

impl ConnectionManager {
    pub fn new(config: FeedConfig, connector: Arc<dyn Connector>) -> Self {
        Self::with_clock(config, connector, Arc::new(TokioClock))
    }

    pub fn with_clock(
        config: FeedConfig,
        connector: Arc<dyn Connector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (wake, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            state: Mutex::new(ConnectionState::default()),
            dispatcher: Arc::new(Dispatcher::default()),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new(config.station.clone()),
        });
        Self {
            config,
            connector,
            clock,
            shared,
            shutdown,
            wake,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Begins the connect sequence on the current tokio runtime.
    ///
    /// A no-op while connecting or connected. During a reconnect delay the
    /// pending attempt is made immediately. Fails with [`FeedError::Stopped`]
    /// once [`stop`](Self::stop) has been called, and with
    /// [`FeedError::Config`] when the config does not validate.
    pub fn start(&self) -> FeedResult<()> {
        let mut state = self.shared.state();
        match state.status {
            ConnectionStatus::Stopped => return Err(FeedError::Stopped),
            ConnectionStatus::Connecting | ConnectionStatus::Connected => return Ok(()),
            ConnectionStatus::ReconnectWait => {
                self.wake.send_modify(|generation| *generation += 1);
                return Ok(());
            }
            ConnectionStatus::Idle => {}
        }
        self.config.validate()?;
        let handle = Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        state.status = ConnectionStatus::Connecting;
        drop(state);

        let event_loop = EventLoop {
            url: self.config.url(),
            connector: self.connector.clone(),
            clock: self.clock.clone(),
            backoff: Backoff::new(self.config.reconnect.clone()),
            shared: self.shared.clone(),
            shutdown: self.shutdown.subscribe(),
            wake: self.wake.subscribe(),
        };
        let task = handle.spawn(event_loop.run());
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Halts reconnects and releases the transport. No listener is invoked
    /// after this returns.
    pub fn stop(&self) -> FeedResult<()> {
        {
            let mut state = self.shared.state();
            if state.status == ConnectionStatus::Stopped {
                return Err(FeedError::Stopped);
            }
            state.status = ConnectionStatus::Stopped;
        }
        self.shared.dispatcher.halt();
        self.shutdown.send_replace(true);
        self.shared.logger.record("feed stopped");
        Ok(())
    }

    /// Waits for the event loop to finish closing its transport after
    /// [`stop`](Self::stop).
    pub async fn join(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Registers a listener for connectivity changes and accepted windows.
    pub fn subscribe<F>(&self, listener: F) -> FeedResult<Subscription>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.shared.dispatcher.add_snapshot_listener(Box::new(listener))
    }

    /// Registers a listener for non-fatal protocol faults.
    pub fn on_diagnostic<F>(&self, listener: F) -> FeedResult<Subscription>
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.shared
            .dispatcher
            .add_diagnostic_listener(Box::new(listener))
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.state().snapshot()
    }

    pub fn metrics(&self) -> FeedMetrics {
        self.shared.metrics.snapshot()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.state().status = ConnectionStatus::Stopped;
        self.shared.dispatcher.halt();
        self.shutdown.send_replace(true);
    }
}

enum PumpExit {
    Shutdown,
    Closed(String),
}

struct EventLoop {
    url: String,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
    wake: watch::Receiver<u64>,
}

impl EventLoop {
    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn run(mut self) {
        let mut attempt: u32 = 0;
        loop {
            if self.stopping() {
                return;
            }
            // A wake-up that raced the end of the last delay is already spent.
            self.wake.borrow_and_update();
            self.shared.connecting();

            let opened = tokio::select! {
                biased;
                _ = self.shutdown.changed() => return,
                opened = self.connector.connect(&self.url) => opened,
            };

            match opened {
                Ok(mut transport) => {
                    attempt = 0;
                    self.shared.connected(&self.url);
                    let exit = self.pump(transport.as_mut()).await;
                    transport.close().await;
                    match exit {
                        PumpExit::Shutdown => return,
                        PumpExit::Closed(reason) => {
                            attempt += 1;
                            let delay = self.backoff.delay(attempt);
                            self.shared.disconnected(&reason, attempt, delay);
                            if !self.wait(delay).await {
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.backoff.delay(attempt);
                    self.shared.connect_failed(&err.to_string(), attempt, delay);
                    if !self.wait(delay).await {
                        return;
                    }
                }
            }
        }
    }

    async fn pump(&mut self, transport: &mut dyn Transport) -> PumpExit {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.changed() => return PumpExit::Shutdown,
                frame = transport.next_frame() => frame,
            };
            match frame {
                None => return PumpExit::Closed("closed by peer".into()),
                Some(Err(err)) => return PumpExit::Closed(err.to_string()),
                Some(Ok(Frame::Text(text))) => self.shared.handle_text(&text),
                Some(Ok(Frame::Undecodable(reason))) => self.shared.undecodable(reason),
            }
        }
    }

    /// Sleeps out the reconnect delay, or until `start` asks for an early
    /// attempt. Returns false if shutdown won the race.
    async fn wait(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.changed() => false,
            Ok(()) = self.wake.changed() => true,
            _ = self.clock.sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::memory::{MemoryConnector, ScriptedFrame};
    use crate::connection::transport::TransportError;
    use crate::prelude::ReconnectPolicy;
    use crate::protocol::EventFlag;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn window_frame(station: &str, prediction: serde_json::Value) -> ScriptedFrame {
        ScriptedFrame::text(
            json!({
                "type": "new_data_window",
                "data": {
                    "station_id": station,
                    "ch1": [1, 2, 3],
                    "ch2": [4, 5, 6],
                    "ch3": [7, 8, 9],
                    "prediction": prediction,
                }
            })
            .to_string(),
        )
    }

    fn manager_with(connector: &MemoryConnector, policy: ReconnectPolicy) -> ConnectionManager {
        let config = FeedConfig::new("ws://feed.test/ws", "ST1").with_reconnect(policy);
        ConnectionManager::new(config, Arc::new(connector.clone()))
    }

    fn listen(manager: &ConnectionManager) -> (Subscription, mpsc::UnboundedReceiver<Snapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = manager
            .subscribe(move |snapshot| {
                let _ = tx.send(snapshot.clone());
            })
            .unwrap();
        (sub, rx)
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    fn assert_gap(earlier: tokio::time::Instant, later: tokio::time::Instant, expected: Duration) {
        let gap = later - earlier;
        assert!(
            gap >= expected && gap < expected + Duration::from_millis(10),
            "gap {gap:?}, expected {expected:?}"
        );
    }

    async fn wait_for_status(manager: &ConnectionManager, status: ConnectionStatus) {
        for _ in 0..256 {
            if manager.state().status == status {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("manager never reached {status:?}: {:?}", manager.state());
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_decoded_window() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        let opened = rx.recv().await.unwrap();
        assert!(opened.connected);
        assert!(opened.window.is_none());

        feed.send(window_frame("ST1", json!([1, 4.5, 120]))).unwrap();
        let update = rx.recv().await.unwrap();
        assert!(update.connected);
        assert_eq!(update.station_id.as_deref(), Some("ST1"));
        let prediction = *update.window.as_ref().unwrap().prediction();
        assert_eq!(prediction.is_event, EventFlag::Event);
        assert_eq!(prediction.magnitude, Some(4.5));
        assert_eq!(prediction.p_arrival_sample_index, Some(120));

        manager.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn bad_frames_leave_window_and_stream_intact() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);
        let (diag_tx, mut diagnostics) = mpsc::unbounded_channel();
        let _diag = manager
            .on_diagnostic(move |diagnostic| {
                let _ = diag_tx.send(diagnostic.clone());
            })
            .unwrap();

        manager.start().unwrap();
        rx.recv().await.unwrap();
        feed.send(window_frame("ST1", json!([0, null, null]))).unwrap();
        let first = rx.recv().await.unwrap();

        let missing_station = json!({
            "type": "new_data_window",
            "data": {"ch1": [], "ch2": [], "ch3": [], "prediction": [0, null, null]}
        });
        feed.send(ScriptedFrame::text(missing_station.to_string()))
            .unwrap();
        feed.send(window_frame("ST1", json!([7, null, null]))).unwrap();
        feed.send(ScriptedFrame::text(r#"{"type":"heartbeat"}"#))
            .unwrap();

        for expected in ["station_id", "prediction[0]"] {
            match diagnostics.recv().await.unwrap() {
                Diagnostic::Malformed(err) => assert_eq!(err.field, expected),
                other => panic!("unexpected diagnostic {other:?}"),
            }
        }
        settle().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.snapshot(), first);
        assert_eq!(manager.state().status, ConnectionStatus::Connected);

        feed.send(window_frame("ST2", json!([1, 3.1, 40]))).unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.station_id.as_deref(), Some("ST2"));

        let metrics = manager.metrics();
        assert_eq!(metrics.decoded, 2);
        assert_eq!(metrics.malformed, 2);
        assert_eq!(metrics.ignored, 1);
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_frame_is_reported_not_fatal() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (diag_tx, mut diagnostics) = mpsc::unbounded_channel();
        let _diag = manager
            .on_diagnostic(move |diagnostic| {
                let _ = diag_tx.send(diagnostic.clone());
            })
            .unwrap();

        manager.start().unwrap();
        feed.send(ScriptedFrame::Frame(Frame::Undecodable("binary".into())))
            .unwrap();
        assert!(matches!(
            diagnostics.recv().await.unwrap(),
            Diagnostic::Undecodable { .. }
        ));
        assert_eq!(manager.state().status, ConnectionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_waits_then_reconnects_with_single_notification() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        assert!(rx.recv().await.unwrap().connected);
        feed.send(window_frame("ST1", json!([0, null, null]))).unwrap();
        rx.recv().await.unwrap();

        drop(feed);
        let dropped = rx.recv().await.unwrap();
        assert!(!dropped.connected);
        assert_eq!(dropped.station_id.as_deref(), Some("ST1"));
        assert!(dropped.window.is_some());
        let state = manager.state();
        assert_eq!(state.status, ConnectionStatus::ReconnectWait);
        assert_eq!(state.reconnect_attempt, 1);
        assert_eq!(connector.closes(), 1);

        // Subsequent attempts are refused; they must not re-announce the outage.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());

        let times = connector.connect_times();
        assert!(times.len() >= 3, "attempts: {}", times.len());
        assert_gap(times[0], times[1], Duration::from_secs(3));
        assert_gap(times[1], times[2], Duration::from_secs(3));
        assert_eq!(manager.metrics().disconnects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_fault_is_treated_as_disconnect() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        rx.recv().await.unwrap();
        feed.send(ScriptedFrame::Fault(TransportError::Io("reset".into())))
            .unwrap();
        assert!(!rx.recv().await.unwrap().connected);
        assert_eq!(manager.state().status, ConnectionStatus::ReconnectWait);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_reconnect_wait_cancels_attempt() {
        let connector = MemoryConnector::new();
        connector.push_refusal("feed offline");
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        wait_for_status(&manager, ConnectionStatus::ReconnectWait).await;
        manager.stop().unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.connects(), 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.state().status, ConnectionStatus::Stopped);
        manager.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_single_transport() {
        let connector = MemoryConnector::new();
        let _feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        assert!(rx.recv().await.unwrap().connected);
        manager.start().unwrap();
        settle().await;

        assert_eq!(connector.connects(), 1);
        assert!(rx.try_recv().is_err());
        manager.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn start_during_reconnect_wait_reconnects_immediately() {
        let connector = MemoryConnector::new();
        connector.push_refusal("feed offline");
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        wait_for_status(&manager, ConnectionStatus::ReconnectWait).await;
        manager.start().unwrap();
        assert!(rx.recv().await.unwrap().connected);

        let times = connector.connect_times();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] < Duration::from_secs(1));

        // The early wake-up is spent; the next outage waits the full delay.
        drop(feed);
        assert!(!rx.recv().await.unwrap().connected);
        tokio::time::sleep(Duration::from_secs(4)).await;
        let times = connector.connect_times();
        assert_eq!(times.len(), 3);
        assert_gap(times[1], times[2], Duration::from_secs(3));
        manager.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_transport_and_silences_listeners() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        rx.recv().await.unwrap();
        manager.stop().unwrap();
        let _ = feed.send(window_frame("ST1", json!([1, 2.0, 5])));
        manager.join().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(connector.closes(), 1);
        assert!(manager.snapshot().window.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_then_resets_after_open() {
        let connector = MemoryConnector::new();
        connector.push_refusal("down");
        connector.push_refusal("down");
        let _feed = connector.push_live();
        let policy = ReconnectPolicy::Exponential {
            initial_ms: 1_000,
            max_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.0,
            seed: None,
        };
        let manager = manager_with(&connector, policy);
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        assert!(rx.recv().await.unwrap().connected);

        let times = connector.connect_times();
        assert_eq!(times.len(), 3);
        assert_gap(times[0], times[1], Duration::from_secs(1));
        assert_gap(times[1], times[2], Duration::from_secs(2));
        assert_eq!(manager.state().reconnect_attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_does_not_stall_reconnects() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let _next_feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let _faulty = manager
            .subscribe(|snapshot| {
                if !snapshot.connected {
                    panic!("listener bug");
                }
            })
            .unwrap();
        let (_sub, mut rx) = listen(&manager);

        manager.start().unwrap();
        assert!(rx.recv().await.unwrap().connected);
        drop(feed);
        assert!(!rx.recv().await.unwrap().connected);
        assert!(rx.recv().await.unwrap().connected);

        assert_eq!(connector.connects(), 2);
        assert_eq!(manager.state().status, ConnectionStatus::Connected);
        manager.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_fails_start_without_connecting() {
        let connector = MemoryConnector::new();
        let _feed = connector.push_live();
        let policies = [
            ReconnectPolicy::Exponential {
                initial_ms: 1_000,
                max_ms: 30_000,
                multiplier: 2.0,
                jitter: f64::INFINITY,
                seed: None,
            },
            ReconnectPolicy::fixed_ms(0),
        ];
        for policy in policies {
            let manager = manager_with(&connector, policy);
            assert!(matches!(manager.start(), Err(FeedError::Config(_))));
            assert_eq!(manager.state().status, ConnectionStatus::Idle);
        }

        let bad_scheme = FeedConfig::new("http://feed.test/ws", "ST1");
        let manager = ConnectionManager::new(bad_scheme, Arc::new(connector.clone()));
        assert!(matches!(manager.start(), Err(FeedError::Config(_))));
        settle().await;
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn misuse_after_stop_fails_fast() {
        let connector = MemoryConnector::new();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        manager.stop().unwrap();

        assert_eq!(manager.start(), Err(FeedError::Stopped));
        assert_eq!(manager.stop(), Err(FeedError::Stopped));
        assert!(matches!(manager.subscribe(|_| {}), Err(FeedError::Stopped)));
        assert!(matches!(manager.on_diagnostic(|_| {}), Err(FeedError::Stopped)));
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_listener_stops_receiving() {
        let connector = MemoryConnector::new();
        let feed = connector.push_live();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        let (sub, mut rx) = listen(&manager);
        let (_other, mut other_rx) = listen(&manager);

        manager.start().unwrap();
        rx.recv().await.unwrap();
        other_rx.recv().await.unwrap();
        sub.unsubscribe();

        feed.send(window_frame("ST1", json!([0, null, null]))).unwrap();
        assert!(other_rx.recv().await.unwrap().window.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn start_without_runtime_is_rejected() {
        let connector = MemoryConnector::new();
        let manager = manager_with(&connector, ReconnectPolicy::fixed_ms(3_000));
        assert_eq!(manager.start(), Err(FeedError::NoRuntime));
        assert_eq!(manager.state().status, ConnectionStatus::Idle);
    }
}
