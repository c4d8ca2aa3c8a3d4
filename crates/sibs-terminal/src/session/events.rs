use sibs_core::protocol::Message;

use crate::flows::PairingOutcome;

/// Something observers of a session may want to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The transport is listening.
    Started,
    /// A terminal attached.
    Connected,
    /// The terminal went away.
    Disconnected,
    /// A decoded inbound frame, after the session applied it.
    Inbound(Message),
    /// The terminal displays a pairing code and nobody supplies it
    /// automatically; answer with `validate_pairing` or `cancel_pairing`.
    AwaitingPairingCode { displayed: Option<String> },
    Pairing(PairingOutcome),
    /// A frame was dropped or a follow-up send failed.
    Diagnostic(Diagnostic),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error code, or a drop reason such as `UNRECOGNIZED`.
    pub code: &'static str,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}
