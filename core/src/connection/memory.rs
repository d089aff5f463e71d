use crate::connection::transport::{Connector, Frame, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Scripted item delivered by an in-memory session.
#[derive(Debug, Clone)]
pub enum ScriptedFrame {
    Frame(Frame),
    Fault(TransportError),
}

impl ScriptedFrame {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedFrame::Frame(Frame::Text(text.into()))
    }
}

/// Behaviour of one connect cycle against a [`MemoryConnector`].
pub enum MemorySession {
    Refuse(String),
    /// Delivers the frames in order, then closes.
    Frames(Vec<ScriptedFrame>),
    /// Delivers whatever is pushed on the paired sender; dropping the sender
    /// closes the session.
    Live(mpsc::UnboundedReceiver<ScriptedFrame>),
}

#[derive(Default)]
struct Ledger {
    connects: AtomicUsize,
    closes: AtomicUsize,
    connect_times: Mutex<Vec<Instant>>,
}

/// In-memory connector for deterministic playback and tests.
///
/// Each `connect` consumes the next queued session; once the queue is empty
/// every attempt is refused.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    sessions: Arc<Mutex<VecDeque<MemorySession>>>,
    ledger: Arc<Ledger>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, session: MemorySession) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push_back(session);
        }
    }

    pub fn push_frames(&self, frames: impl IntoIterator<Item = ScriptedFrame>) {
        self.push(MemorySession::Frames(frames.into_iter().collect()));
    }

    pub fn push_refusal(&self, reason: impl Into<String>) {
        self.push(MemorySession::Refuse(reason.into()));
    }

    /// Queues a live session and returns the sender that feeds it.
    pub fn push_live(&self) -> mpsc::UnboundedSender<ScriptedFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(MemorySession::Live(rx));
        tx
    }

    pub fn connects(&self) -> usize {
        self.ledger.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.ledger.closes.load(Ordering::SeqCst)
    }

    /// Instants at which connect attempts were made, successful or not.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.ledger
            .connect_times
            .lock()
            .map(|times| times.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.ledger.connects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut times) = self.ledger.connect_times.lock() {
            times.push(Instant::now());
        }

        let session = self
            .sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.pop_front());

        let source = match session {
            Some(MemorySession::Refuse(reason)) => return Err(TransportError::Connect(reason)),
            None => {
                return Err(TransportError::Connect(format!(
                    "no session scripted for {url}"
                )))
            }
            Some(MemorySession::Frames(frames)) => Source::Scripted(frames.into()),
            Some(MemorySession::Live(rx)) => Source::Live(rx),
        };

        Ok(Box::new(MemoryTransport {
            source,
            ledger: self.ledger.clone(),
            closed: false,
        }))
    }
}

enum Source {
    Scripted(VecDeque<ScriptedFrame>),
    Live(mpsc::UnboundedReceiver<ScriptedFrame>),
}

struct MemoryTransport {
    source: Source,
    ledger: Arc<Ledger>,
    closed: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        if self.closed {
            return None;
        }
        let item = match &mut self.source {
            Source::Scripted(frames) => frames.pop_front(),
            Source::Live(rx) => rx.recv().await,
        }?;
        Some(match item {
            ScriptedFrame::Frame(frame) => Ok(frame),
            ScriptedFrame::Fault(err) => Err(err),
        })
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.ledger.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
