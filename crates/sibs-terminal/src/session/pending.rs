//! Rendezvous gates: callers waiting for a correlated response.
//!
//! The wire carries no correlation id, so a waiter is keyed by the response
//! type it expects and queued FIFO behind earlier waiters of the same type.
//! Each waiter also gets its own id so a timed-out waiter can leave the
//! queue without disturbing the others.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Duration;

use sibs_core::error::{Result, SibsError};
use sibs_core::protocol::{Message, MessageType};

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Result<Message>>,
}

/// Handle for one registered wait.
pub struct Ticket {
    pub id: u64,
    pub kind: MessageType,
    rx: oneshot::Receiver<Result<Message>>,
}

pub struct PendingReplies {
    waiters: DashMap<MessageType, VecDeque<Waiter>>,
    seq: AtomicU64,
}

impl Default for PendingReplies {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingReplies {
    pub fn new() -> Self {
        Self {
            waiters: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Queue a waiter for the next `kind` frame. Register before sending, so
    /// a fast reply can't slip past.
    pub fn register(&self, kind: MessageType) -> Ticket {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.waiters
            .entry(kind)
            .or_default()
            .push_back(Waiter { id, tx });
        Ticket { id, kind, rx }
    }

    /// Hand `msg` to the oldest live waiter of its type. Returns the waiter id.
    pub fn resolve(&self, msg: &Message) -> Option<u64> {
        let kind = msg.message_type();
        let mut queue = self.waiters.get_mut(&kind)?;
        while let Some(w) = queue.pop_front() {
            if w.tx.send(Ok(msg.clone())).is_ok() {
                return Some(w.id);
            }
        }
        None
    }

    /// Drop one waiter (timeout, failed send).
    pub fn cancel(&self, ticket: &Ticket) {
        if let Some(mut queue) = self.waiters.get_mut(&ticket.kind) {
            queue.retain(|w| w.id != ticket.id);
        }
    }

    /// Wake every waiter with an error built by `err`.
    pub fn fail_all(&self, err: impl Fn() -> SibsError) {
        for mut entry in self.waiters.iter_mut() {
            for w in entry.value_mut().drain(..) {
                let _ = w.tx.send(Err(err()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for the ticket's response, at most `limit`.
    pub async fn wait(&self, ticket: Ticket, limit: Duration) -> Result<Message> {
        let Ticket { id, kind, rx } = ticket;
        match tokio::time::timeout(limit, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without an answer: the session went away.
            Ok(Err(_)) => Err(SibsError::Aborted),
            Err(_) => {
                if let Some(mut queue) = self.waiters.get_mut(&kind) {
                    queue.retain(|w| w.id != id);
                }
                Err(SibsError::Timeout)
            }
        }
    }
}
