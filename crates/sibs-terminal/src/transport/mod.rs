//! Transport layer.
//!
//! The session never touches sockets. A `Transport` pushes lifecycle and
//! text frames into an mpsc queue (`TransportEvent`) and accepts outbound
//! text via `send`. The queue is drained by exactly one dispatch loop, which
//! is what keeps inbound handling ordered and non-reentrant.

pub mod codec;
pub mod ws;

use async_trait::async_trait;
use tokio::sync::mpsc;

use sibs_core::error::Result;

pub use ws::WsServerTransport;

/// Lifecycle and data events raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Listening / ready to accept the terminal.
    Started,
    /// The terminal link is up.
    Connected,
    /// The terminal link went away.
    Disconnected,
    /// One inbound text frame.
    Message(String),
}

pub type EventSender = mpsc::Sender<TransportEvent>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Start serving `endpoint`; events are pushed into `events` until `stop`.
    async fn start(&self, endpoint: &str, events: EventSender) -> Result<()>;

    /// Close the link and release the endpoint. Calling it twice is harmless.
    async fn stop(&self) -> Result<()>;

    /// Transmit one text frame. Fails with `SibsError::Transport` when no
    /// terminal is connected.
    async fn send(&self, text: String) -> Result<()>;
}
