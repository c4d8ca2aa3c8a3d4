use std::sync::Arc;

use uuid::Uuid;

use sibs_core::error::SibsError;
use sibs_core::protocol::messages::TxResponse;
use sibs_core::protocol::{decode, Decoded, Header, Message};

use crate::obs::SessionMetrics;

/// Label used in `frames_dropped` for frames with no registered type.
pub const UNRECOGNIZED: &str = "UNRECOGNIZED";
/// Label used in `frames_dropped` for outbound-only kinds sent by the terminal.
pub const WRONG_DIRECTION: &str = "WRONG_DIRECTION";

/// What the session has to do with one inbound frame.
#[derive(Debug)]
pub enum Route {
    /// Raise to observers (and to any caller waiting on this kind).
    Notify(Message),
    /// Send `reply` right away, without caller involvement.
    AutoReply { request: Message, reply: Message },
    /// A kind only this side is supposed to emit. Logged and dropped.
    Ignored(Message),
    /// Missing or unregistered type tag. Logged and dropped.
    Unrecognized(Header),
    /// Bad JSON, foreign version, or a payload that doesn't fit its type.
    Malformed(SibsError),
}

impl Route {
    /// Type label for metrics (`"-"` when the frame never resolved to a type).
    pub fn type_label(&self) -> &'static str {
        match self {
            Route::Notify(m) | Route::AutoReply { request: m, .. } | Route::Ignored(m) => {
                m.message_type().as_str()
            }
            Route::Unrecognized(_) | Route::Malformed(_) => "-",
        }
    }
}

/// Fresh id for an auto-generated TX_RESPONSE.
pub fn new_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

/// Decodes inbound frames and picks exactly one reaction per frame.
///
/// Stateless apart from metrics: anything that depends on session state
/// (cache, pairing, gates) is applied by the session after routing.
pub struct Dispatcher {
    metrics: Arc<SessionMetrics>,
}

impl Dispatcher {
    pub fn new(metrics: Arc<SessionMetrics>) -> Self {
        Self { metrics }
    }

    pub fn route(&self, raw: &str) -> Route {
        let decoded = match decode(raw) {
            Ok(d) => d,
            Err(e) => {
                self.metrics
                    .frames_dropped
                    .inc(&[("reason", e.code().as_str())]);
                tracing::warn!(error = %e, "dropping malformed frame");
                return Route::Malformed(e);
            }
        };

        let msg = match decoded {
            Decoded::Message(m) => m,
            Decoded::Unrecognized(header) => {
                self.metrics.frames_dropped.inc(&[("reason", UNRECOGNIZED)]);
                tracing::warn!(type_tag = ?header.type_tag, "dropping unrecognized frame");
                return Route::Unrecognized(header);
            }
        };

        let ty = msg.message_type();
        self.metrics.frames_in.inc(&[("type", ty.as_str())]);
        tracing::debug!(msg_type = %ty, "frame in");

        match msg {
            Message::TxRequest(_) => {
                let reply = Message::TxResponse(TxResponse {
                    transaction_id: new_transaction_id(),
                });
                self.metrics.auto_replies.inc(&[("type", ty.as_str())]);
                Route::AutoReply { request: msg, reply }
            }

            m @ (Message::StatusResponse(_)
            | Message::SetAuthCredentialResponse(_)
            | Message::ProcessPaymentResponse(_)
            | Message::RefundResponse(_)
            | Message::PairingResponse(_)
            | Message::PairingNotification(_)
            | Message::ReconciliationResponse(_)
            | Message::EventNotification(_)
            | Message::ErrorNotification(_)
            | Message::HeartbeatNotification(_)
            | Message::ReceiptNotification(_)
            | Message::CommunicationsResponse(_)
            | Message::GetMerchantDataResponse(_)
            | Message::SetMerchantDataResponse(_)
            | Message::ConfigTerminalResponse(_)
            | Message::CustomerDataResponse(_)
            | Message::LoyaltyInquiryResponse(_)
            | Message::PendingReversalsResponse(_)
            | Message::DeletePendingReversalsResponse(_)) => Route::Notify(m),

            m @ (Message::StatusRequest(_)
            | Message::SetAuthCredentialRequest(_)
            | Message::ProcessPaymentRequest(_)
            | Message::RefundRequest(_)
            | Message::PairingRequest(_)
            | Message::ReconciliationRequest(_)
            | Message::TxResponse(_)
            | Message::CommunicationsRequest(_)
            | Message::GetMerchantDataRequest(_)
            | Message::SetMerchantDataRequest(_)
            | Message::ConfigTerminalRequest(_)
            | Message::CustomerDataRequest(_)
            | Message::LoyaltyInquiryRequest(_)
            | Message::PendingReversalsRequest(_)
            | Message::DeletePendingReversalsRequest(_)) => {
                self.metrics.frames_dropped.inc(&[("reason", WRONG_DIRECTION)]);
                tracing::warn!(msg_type = %ty, "terminal sent an outbound-only kind, ignoring");
                Route::Ignored(m)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sibs_core::protocol::{Direction, MessageType};

    fn dispatcher() -> (Dispatcher, Arc<SessionMetrics>) {
        let metrics = Arc::new(SessionMetrics::default());
        (Dispatcher::new(Arc::clone(&metrics)), metrics)
    }

    #[test]
    fn tx_request_gets_a_fresh_reply_each_time() {
        let (d, m) = dispatcher();
        let raw = r#"{"version":"V_1","type":"TX_REQUEST","anything":1}"#;

        let mut ids = Vec::new();
        for _ in 0..3 {
            match d.route(raw) {
                Route::AutoReply { reply: Message::TxResponse(tx), .. } => ids.push(tx.transaction_id),
                other => panic!("unexpected route {other:?}"),
            }
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_eq!(m.auto_replies.total(), 3);
    }

    #[test]
    fn inbound_kinds_notify_and_outbound_kinds_are_ignored() {
        let (d, _) = dispatcher();

        let r = d.route(r#"{"version":"V_1","type":"HEARTBEAT_NOTIFICATION"}"#);
        assert!(matches!(r, Route::Notify(Message::HeartbeatNotification(_))));

        let r = d.route(r#"{"version":"V_1","type":"STATUS_REQUEST"}"#);
        assert!(matches!(r, Route::Ignored(Message::StatusRequest(_))));
    }

    #[test]
    fn every_inbound_kind_has_a_reaction() {
        let (d, _) = dispatcher();
        for t in MessageType::ALL {
            if t.direction() != Direction::Inbound {
                continue;
            }
            // Minimal bodies for kinds with required fields.
            let body = match t {
                MessageType::StatusResponse => r#","hasCredentials":true"#,
                _ => "",
            };
            let raw = format!(r#"{{"version":"V_1","type":"{}"{}}}"#, t.as_str(), body);
            let r = d.route(&raw);
            assert!(
                matches!(r, Route::Notify(_) | Route::AutoReply { .. }),
                "{t}: {r:?}"
            );
        }
    }

    #[test]
    fn drops_are_counted_by_reason() {
        let (d, m) = dispatcher();
        assert!(matches!(d.route("{"), Route::Malformed(_)));
        assert!(matches!(d.route(r#"{"version":"V_1","type":"NOPE"}"#), Route::Unrecognized(_)));
        assert!(matches!(
            d.route(r#"{"version":"V_9","type":"TX_REQUEST"}"#),
            Route::Malformed(SibsError::UnsupportedVersion(_))
        ));

        assert_eq!(m.frames_dropped.get(&[("reason", "DECODE")]), 1);
        assert_eq!(m.frames_dropped.get(&[("reason", UNRECOGNIZED)]), 1);
        assert_eq!(m.frames_dropped.get(&[("reason", "UNSUPPORTED_VERSION")]), 1);
        assert_eq!(m.frames_in.total(), 0);
    }
}
