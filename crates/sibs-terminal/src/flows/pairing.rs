//! Device pairing handshake.
//!
//! ```text
//! Idle -> CodeRequested -> AwaitingUserCode -> Validating -> Paired
//!                                  |                |
//!                                  +----------------+------> Cancelled
//! ```
//!
//! Any state moves to `Cancelled` on an explicit cancel. A new pairing can
//! only begin from `Idle`, `Paired` or `Cancelled`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::oneshot;

use sibs_core::error::{Result, SibsError};
use sibs_core::protocol::messages::{PairingNotification, PairingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    Idle,
    CodeRequested,
    AwaitingUserCode,
    Validating,
    Paired,
    Cancelled,
}

impl PairingState {
    /// A pairing is in flight.
    pub fn is_unresolved(self) -> bool {
        matches!(
            self,
            PairingState::CodeRequested | PairingState::AwaitingUserCode | PairingState::Validating
        )
    }
}

/// How a pairing attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingOutcome {
    Paired,
    Cancelled,
}

/// What to send after the operator answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeDecision {
    Validate(String),
    Cancel,
}

impl CodeDecision {
    pub fn request(&self) -> PairingRequest {
        match self {
            CodeDecision::Validate(code) => PairingRequest::validate(code.clone()),
            CodeDecision::Cancel => PairingRequest::cancel(),
        }
    }
}

/// Supplies the code shown on the terminal display.
///
/// `None` (or anything that isn't a code) cancels the pairing.
#[async_trait]
pub trait PairingCodeProvider: Send + Sync {
    async fn pairing_code(&self, displayed: Option<&str>) -> Option<String>;
}

/// Codes are non-empty runs of ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
}

struct Inner {
    state: PairingState,
    waiters: Vec<oneshot::Sender<PairingOutcome>>,
}

pub struct PairingMachine {
    inner: Mutex<Inner>,
}

impl Default for PairingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingMachine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: PairingState::Idle,
                waiters: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> PairingState {
        self.lock().state
    }

    /// `Idle -> CodeRequested`. Rejected while another pairing is unresolved.
    pub fn begin(&self) -> Result<()> {
        let mut g = self.lock();
        if g.state.is_unresolved() {
            return Err(SibsError::ProtocolViolation(format!(
                "pairing already in progress ({:?})",
                g.state
            )));
        }
        g.state = PairingState::CodeRequested;
        Ok(())
    }

    /// Undo `begin` when the generate request never left.
    pub fn revert_begin(&self) {
        let mut g = self.lock();
        if g.state == PairingState::CodeRequested {
            g.state = PairingState::Idle;
        }
    }

    /// Register for the end of the current (or next) pairing.
    pub fn watch(&self) -> oneshot::Receiver<PairingOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().waiters.push(tx);
        rx
    }

    /// `CodeRequested -> AwaitingUserCode`. Returns false for a response that
    /// doesn't belong to a pairing we started.
    pub fn on_response(&self) -> bool {
        let mut g = self.lock();
        if g.state != PairingState::CodeRequested {
            return false;
        }
        g.state = PairingState::AwaitingUserCode;
        true
    }

    /// Apply operator input. A valid code moves to `Validating`, anything
    /// else cancels.
    pub fn submit_code(&self, input: Option<&str>) -> Result<CodeDecision> {
        let mut g = self.lock();
        if g.state != PairingState::AwaitingUserCode {
            return Err(SibsError::ProtocolViolation(format!(
                "no pairing code expected ({:?})",
                g.state
            )));
        }

        match input.map(str::trim).filter(|c| is_valid_code(c)) {
            Some(code) => {
                g.state = PairingState::Validating;
                Ok(CodeDecision::Validate(code.to_string()))
            }
            None => {
                Self::resolve(&mut g, PairingOutcome::Cancelled);
                Ok(CodeDecision::Cancel)
            }
        }
    }

    /// `Validating -> Paired | Cancelled`. `None` when no validation was pending.
    pub fn on_notification(&self, n: &PairingNotification) -> Option<PairingOutcome> {
        let mut g = self.lock();
        if g.state != PairingState::Validating {
            return None;
        }
        let outcome = if n.is_success() {
            PairingOutcome::Paired
        } else {
            PairingOutcome::Cancelled
        };
        Self::resolve(&mut g, outcome);
        Some(outcome)
    }

    /// Explicit cancel. Returns `Some` when it ended an unresolved pairing.
    pub fn cancel(&self) -> Option<PairingOutcome> {
        let mut g = self.lock();
        let was_unresolved = g.state.is_unresolved();
        Self::resolve(&mut g, PairingOutcome::Cancelled);
        was_unresolved.then_some(PairingOutcome::Cancelled)
    }

    /// Back to `Idle`; pending watchers see their channel closed.
    pub fn reset(&self) {
        let mut g = self.lock();
        g.state = PairingState::Idle;
        g.waiters.clear();
    }

    fn resolve(g: &mut Inner, outcome: PairingOutcome) {
        g.state = match outcome {
            PairingOutcome::Paired => PairingState::Paired,
            PairingOutcome::Cancelled => PairingState::Cancelled,
        };
        for w in g.waiters.drain(..) {
            let _ = w.send(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(status: &str) -> PairingNotification {
        PairingNotification {
            pairing_status: Some(status.into()),
            ..PairingNotification::default()
        }
    }

    #[test]
    fn happy_path_reaches_paired() {
        let m = PairingMachine::new();
        let mut rx = m.watch();

        m.begin().unwrap();
        assert!(m.on_response());
        assert_eq!(m.state(), PairingState::AwaitingUserCode);
        assert_eq!(
            m.submit_code(Some(" 4821\n")).unwrap(),
            CodeDecision::Validate("4821".into())
        );
        assert_eq!(m.on_notification(&notification("SUCCESS")), Some(PairingOutcome::Paired));
        assert_eq!(m.state(), PairingState::Paired);
        assert_eq!(rx.try_recv().unwrap(), PairingOutcome::Paired);
    }

    #[test]
    fn invalid_code_cancels() {
        for input in [None, Some(""), Some("12a4"), Some("-12")] {
            let m = PairingMachine::new();
            let mut rx = m.watch();
            m.begin().unwrap();
            m.on_response();
            let d = m.submit_code(input).unwrap();
            assert_eq!(d, CodeDecision::Cancel, "{input:?}");
            assert_eq!(d.request(), PairingRequest::cancel());
            assert_eq!(m.state(), PairingState::Cancelled);
            assert_eq!(rx.try_recv().unwrap(), PairingOutcome::Cancelled);
        }
    }

    #[test]
    fn second_begin_while_unresolved_is_rejected() {
        let m = PairingMachine::new();
        m.begin().unwrap();
        assert_eq!(m.begin().unwrap_err().code().as_str(), "PROTOCOL_VIOLATION");

        assert_eq!(m.cancel(), Some(PairingOutcome::Cancelled));
        assert!(m.begin().is_ok());
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let m = PairingMachine::new();
        assert!(!m.on_response());
        assert!(m.submit_code(Some("1234")).is_err());
        assert_eq!(m.on_notification(&notification("SUCCESS")), None);
        assert_eq!(m.state(), PairingState::Idle);
    }

    #[test]
    fn failed_notification_cancels_and_signals_once() {
        let m = PairingMachine::new();
        let mut rx = m.watch();
        m.begin().unwrap();
        m.on_response();
        m.submit_code(Some("1")).unwrap();
        assert_eq!(m.on_notification(&notification("FAILED")), Some(PairingOutcome::Cancelled));
        // A late duplicate finds nothing to resolve.
        assert_eq!(m.on_notification(&notification("SUCCESS")), None);
        assert_eq!(rx.try_recv().unwrap(), PairingOutcome::Cancelled);
    }

    #[test]
    fn reset_closes_watchers() {
        let m = PairingMachine::new();
        let mut rx = m.watch();
        m.begin().unwrap();
        m.reset();
        assert!(rx.try_recv().is_err());
        assert_eq!(m.state(), PairingState::Idle);
    }

    #[test]
    fn revert_only_undoes_a_fresh_begin() {
        let m = PairingMachine::new();
        m.begin().unwrap();
        m.revert_begin();
        assert_eq!(m.state(), PairingState::Idle);

        m.begin().unwrap();
        m.on_response();
        m.revert_begin();
        assert_eq!(m.state(), PairingState::AwaitingUserCode);
    }
}
