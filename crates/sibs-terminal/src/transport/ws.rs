//! WebSocket server transport.
//!
//! The payment terminal connects to us as a WebSocket client. Responsibilities:
//! - Bind the endpoint and upgrade HTTP -> WS on the configured path
//! - Keep exactly one terminal link; a second upgrade is closed immediately
//! - Lifecycle: ping + idle timeout
//! - Forward text frames, in order, to the session's event queue

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use sibs_core::error::{Result, SibsError};

use crate::config::TerminalSection;
use crate::transport::codec::{classify, Inbound};
use crate::transport::{EventSender, Transport, TransportEvent};

const OUTBOUND_QUEUE: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The live terminal link (outbound queue of the socket task).
struct Link {
    id: u64,
    tx: mpsc::Sender<Message>,
}

struct Server {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    link: Mutex<Option<Link>>,
    next_link: AtomicU64,
}

impl Shared {
    /// Claim the single link slot. Returns `None` when a terminal is already attached.
    fn attach(&self, tx: mpsc::Sender<Message>) -> Option<u64> {
        let mut slot = lock(&self.link);
        if slot.is_some() {
            return None;
        }
        let id = self.next_link.fetch_add(1, Ordering::Relaxed);
        *slot = Some(Link { id, tx });
        Some(id)
    }

    fn detach(&self, id: u64) {
        let mut slot = lock(&self.link);
        if slot.as_ref().is_some_and(|l| l.id == id) {
            *slot = None;
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<Message>> {
        lock(&self.link).as_ref().map(|l| l.tx.clone())
    }
}

#[derive(Clone)]
struct LinkCtx {
    shared: Arc<Shared>,
    events: EventSender,
    ping_every: Duration,
    idle_timeout: Duration,
}

/// Axum-based server accepting a single terminal connection.
pub struct WsServerTransport {
    cfg: TerminalSection,
    shared: Arc<Shared>,
    server: Mutex<Option<Server>>,
}

impl WsServerTransport {
    pub fn new(cfg: TerminalSection) -> Self {
        Self {
            cfg,
            shared: Arc::new(Shared::default()),
            server: Mutex::new(None),
        }
    }

    /// True while a terminal is attached.
    pub fn is_connected(&self) -> bool {
        lock(&self.shared.link).is_some()
    }
}

#[async_trait]
impl Transport for WsServerTransport {
    async fn start(&self, endpoint: &str, events: EventSender) -> Result<()> {
        if lock(&self.server).is_some() {
            return Err(SibsError::Transport("transport already started".into()));
        }

        let addr: SocketAddr = endpoint
            .parse()
            .map_err(|e| SibsError::Transport(format!("invalid endpoint {endpoint}: {e}")))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| SibsError::Transport(format!("bind {addr} failed: {e}")))?;

        let ctx = LinkCtx {
            shared: Arc::clone(&self.shared),
            events: events.clone(),
            ping_every: self.cfg.ping_interval(),
            idle_timeout: self.cfg.idle_timeout(),
        };
        let app = Router::new()
            .route(&self.cfg.path, get(ws_upgrade))
            .with_state(ctx);

        let (shutdown, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::warn!(error = %e, "terminal endpoint stopped with error");
            }
        });

        *lock(&self.server) = Some(Server { shutdown, task });
        tracing::info!(%addr, path = %self.cfg.path, "waiting for terminal");

        events
            .send(TransportEvent::Started)
            .await
            .map_err(|_| SibsError::Transport("event queue closed".into()))
    }

    async fn stop(&self) -> Result<()> {
        // Dropping the link sender ends the socket task's writer branch.
        lock(&self.shared.link).take();

        let Some(server) = lock(&self.server).take() else {
            return Ok(());
        };
        let _ = server.shutdown.send(());
        let abort = server.task.abort_handle();
        if tokio::time::timeout(SHUTDOWN_GRACE, server.task).await.is_err() {
            tracing::warn!("terminal endpoint did not drain in time, aborting");
            abort.abort();
        }
        Ok(())
    }

    async fn send(&self, text: String) -> Result<()> {
        let tx = self
            .shared
            .sender()
            .ok_or_else(|| SibsError::Transport("no terminal connected".into()))?;
        tx.send(Message::Text(text))
            .await
            .map_err(|_| SibsError::Transport("terminal link closed".into()))
    }
}

async fn ws_upgrade(State(ctx): State<LinkCtx>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_link(ctx, socket))
}

// --------------------
// Link loop
// --------------------
async fn run_link(ctx: LinkCtx, mut socket: WebSocket) {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);

    let Some(link_id) = ctx.shared.attach(out_tx) else {
        tracing::warn!("second terminal connection refused");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let _ = ctx.events.send(TransportEvent::Connected).await;
    tracing::info!(link_id, "terminal connected");

    let mut ping_tick = tokio::time::interval(ctx.ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                if ws_tx.send(m).await.is_err() {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match classify(msg) {
                    Inbound::Text(s) => {
                        if ctx.events.send(TransportEvent::Message(s)).await.is_err() {
                            break;
                        }
                    }
                    Inbound::Ping(payload) => {
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Inbound::Pong => {}
                    Inbound::Binary { bytes_len } => {
                        tracing::debug!(bytes_len, "binary frame ignored");
                    }
                    Inbound::Close => break,
                }
            }

            // ping + idle timeout
            _ = ping_tick.tick() => {
                if last_activity.elapsed() >= ctx.idle_timeout {
                    tracing::warn!(link_id, "terminal idle timeout");
                    break;
                }
                let _ = ws_tx.send(Message::Ping(Vec::new())).await;
            }
        }
    }

    ctx.shared.detach(link_id);
    let _ = ws_tx.send(Message::Close(None)).await;
    let _ = ctx.events.send(TransportEvent::Disconnected).await;
    tracing::info!(link_id, "terminal disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_link_at_a_time() {
        let shared = Shared::default();
        let (a, _ra) = mpsc::channel(1);
        let (b, _rb) = mpsc::channel(1);

        let first = shared.attach(a);
        assert!(first.is_some());
        assert!(shared.attach(b.clone()).is_none());

        // A stale id must not evict the live link.
        shared.detach(first.unwrap_or_default() + 100);
        assert!(shared.sender().is_some());

        shared.detach(first.unwrap_or_default());
        assert!(shared.sender().is_none());
        assert!(shared.attach(b).is_some());
    }

    #[tokio::test]
    async fn send_without_terminal_is_a_transport_error() {
        let t = WsServerTransport::new(TerminalSection::default());
        let err = t.send("{}".into()).await.unwrap_err();
        assert_eq!(err.code().as_str(), "TRANSPORT");
        assert!(t.stop().await.is_ok());
        assert!(!t.is_connected());
    }
}
