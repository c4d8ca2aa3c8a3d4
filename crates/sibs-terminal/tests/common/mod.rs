#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use sibs_core::error::{Result, SibsError};
use sibs_terminal::config::TerminalConfig;
use sibs_terminal::flows::PairingCodeProvider;
use sibs_terminal::transport::{EventSender, Transport, TransportEvent};
use sibs_terminal::TerminalSession;

pub const WAIT: Duration = Duration::from_secs(2);

/// In-memory transport: the test plays the terminal.
pub struct ScriptedTransport {
    events: Mutex<Option<EventSender>>,
    connected: AtomicBool,
    sent_tx: mpsc::UnboundedSender<String>,
    sent_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    sent_count: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            events: Mutex::new(None),
            connected: AtomicBool::new(false),
            sent_tx,
            sent_rx: tokio::sync::Mutex::new(sent_rx),
            sent_count: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        })
    }

    async fn push(&self, ev: TransportEvent) {
        let tx = self.events.lock().unwrap().clone().expect("transport not started");
        tx.send(ev).await.expect("session dropped the event queue");
    }

    /// Attach the terminal. The session answers with a STATUS_REQUEST.
    pub async fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.push(TransportEvent::Connected).await;
    }

    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.push(TransportEvent::Disconnected).await;
    }

    /// Deliver one frame from the terminal.
    pub async fn inject(&self, frame: Value) {
        self.push(TransportEvent::Message(frame.to_string())).await;
    }

    pub async fn inject_raw(&self, raw: &str) {
        self.push(TransportEvent::Message(raw.to_string())).await;
    }

    /// Next frame the session sent (fails the test after `WAIT`).
    pub async fn next_sent(&self) -> Value {
        let mut rx = self.sent_rx.lock().await;
        let raw = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("no frame sent in time")
            .expect("sent channel closed");
        serde_json::from_str(&raw).expect("session sent invalid json")
    }

    /// Asserts nothing else was sent within `window`.
    pub async fn assert_quiet(&self, window: Duration) {
        let mut rx = self.sent_rx.lock().await;
        if let Ok(Some(raw)) = tokio::time::timeout(window, rx.recv()).await {
            panic!("unexpected frame sent: {raw}");
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn start(&self, _endpoint: &str, events: EventSender) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let _ = events.send(TransportEvent::Started).await;
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.events.lock().unwrap().take();
        Ok(())
    }

    async fn send(&self, text: String) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SibsError::Transport("no terminal connected".into()));
        }
        self.sent_count.fetch_add(1, Ordering::SeqCst);
        let _ = self.sent_tx.send(text);
        Ok(())
    }
}

/// Pairing codes from a fixed script; `None` entries cancel.
pub struct ScriptedCodes {
    answers: Mutex<Vec<Option<String>>>,
}

impl ScriptedCodes {
    pub fn new(answers: &[Option<&str>]) -> Arc<Self> {
        let mut answers: Vec<Option<String>> =
            answers.iter().map(|a| a.map(str::to_string)).collect();
        answers.reverse();
        Arc::new(Self {
            answers: Mutex::new(answers),
        })
    }
}

#[async_trait]
impl PairingCodeProvider for ScriptedCodes {
    async fn pairing_code(&self, _displayed: Option<&str>) -> Option<String> {
        self.answers.lock().unwrap().pop().flatten()
    }
}

/// Operator who never gets round to typing the code.
pub struct StalledCodes;

#[async_trait]
impl PairingCodeProvider for StalledCodes {
    async fn pairing_code(&self, _displayed: Option<&str>) -> Option<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        None
    }
}

pub fn test_config() -> TerminalConfig {
    let mut cfg = TerminalConfig::default();
    cfg.session.reply_timeout_ms = 1000;
    cfg.session.pairing_timeout_ms = 2000;
    cfg
}

/// Started session with a connected terminal; the bootstrap STATUS_REQUEST
/// has already been consumed.
pub async fn connected_session(
    build: impl FnOnce(Arc<ScriptedTransport>) -> TerminalSession,
) -> (TerminalSession, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let session = build(Arc::clone(&transport));
    session.start("test").await.unwrap();
    transport.connect().await;
    let status = transport.next_sent().await;
    assert_eq!(status["type"], "STATUS_REQUEST");
    (session, transport)
}

pub fn plain_session(transport: Arc<ScriptedTransport>) -> TerminalSession {
    TerminalSession::new(transport, &test_config())
}
