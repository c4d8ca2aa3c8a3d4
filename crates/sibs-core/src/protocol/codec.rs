//! Frame codec: two-phase decode and tag-stamping encode.
//!
//! Decode reads the envelope first, then lets the resolved type pick exactly
//! one payload decoder. Encode serializes the payload and stamps `version`
//! and `type` over whatever the payload produced.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SibsError};

use super::envelope::{decode_envelope, Header, PROTOCOL_VERSION};
use super::messages::{Fields, Message};
use super::types::MessageType;

/// Outcome of decoding one text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Registered type with a well-formed payload.
    Message(Message),
    /// Missing or unregistered type tag. Not an error: callers log and drop.
    Unrecognized(Header),
}

/// Decode a text frame.
pub fn decode(raw: &str) -> Result<Decoded> {
    let header = decode_envelope(raw)?;
    match header.kind {
        Some(kind) => decode_as(kind, raw).map(Decoded::Message),
        None => {
            tracing::debug!(type_tag = ?header.type_tag, "unrecognized message type");
            Ok(Decoded::Unrecognized(header))
        }
    }
}

/// Decode the payload of `raw` with the decoder registered for `kind`.
pub fn decode_as(kind: MessageType, raw: &str) -> Result<Message> {
    let mut fields: Fields = serde_json::from_str(raw)
        .map_err(|e| SibsError::Decode(format!("{kind}: invalid json object: {e}")))?;
    fields.remove("version");
    fields.remove("type");
    let body = Value::Object(fields);

    let msg = match kind {
        MessageType::StatusRequest => Message::StatusRequest(payload(kind, body)?),
        MessageType::StatusResponse => Message::StatusResponse(payload(kind, body)?),
        MessageType::SetAuthCredentialRequest => {
            Message::SetAuthCredentialRequest(payload(kind, body)?)
        }
        MessageType::SetAuthCredentialResponse => {
            Message::SetAuthCredentialResponse(payload(kind, body)?)
        }
        MessageType::ProcessPaymentRequest => Message::ProcessPaymentRequest(payload(kind, body)?),
        MessageType::ProcessPaymentResponse => {
            Message::ProcessPaymentResponse(payload(kind, body)?)
        }
        MessageType::RefundRequest => Message::RefundRequest(payload(kind, body)?),
        MessageType::RefundResponse => Message::RefundResponse(payload(kind, body)?),
        MessageType::PairingRequest => Message::PairingRequest(payload(kind, body)?),
        MessageType::PairingResponse => Message::PairingResponse(payload(kind, body)?),
        MessageType::PairingNotification => Message::PairingNotification(payload(kind, body)?),
        MessageType::ReconciliationRequest => Message::ReconciliationRequest(payload(kind, body)?),
        MessageType::ReconciliationResponse => {
            Message::ReconciliationResponse(payload(kind, body)?)
        }
        MessageType::EventNotification => Message::EventNotification(payload(kind, body)?),
        MessageType::ErrorNotification => Message::ErrorNotification(payload(kind, body)?),
        MessageType::HeartbeatNotification => Message::HeartbeatNotification(payload(kind, body)?),
        MessageType::ReceiptNotification => Message::ReceiptNotification(payload(kind, body)?),
        MessageType::TxRequest => Message::TxRequest(payload(kind, body)?),
        MessageType::TxResponse => Message::TxResponse(payload(kind, body)?),
        MessageType::CommunicationsRequest => Message::CommunicationsRequest(payload(kind, body)?),
        MessageType::CommunicationsResponse => {
            Message::CommunicationsResponse(payload(kind, body)?)
        }
        MessageType::GetMerchantDataRequest => {
            Message::GetMerchantDataRequest(payload(kind, body)?)
        }
        MessageType::GetMerchantDataResponse => {
            Message::GetMerchantDataResponse(payload(kind, body)?)
        }
        MessageType::SetMerchantDataRequest => {
            Message::SetMerchantDataRequest(payload(kind, body)?)
        }
        MessageType::SetMerchantDataResponse => {
            Message::SetMerchantDataResponse(payload(kind, body)?)
        }
        MessageType::ConfigTerminalRequest => Message::ConfigTerminalRequest(payload(kind, body)?),
        MessageType::ConfigTerminalResponse => {
            Message::ConfigTerminalResponse(payload(kind, body)?)
        }
        MessageType::CustomerDataRequest => Message::CustomerDataRequest(payload(kind, body)?),
        MessageType::CustomerDataResponse => Message::CustomerDataResponse(payload(kind, body)?),
        MessageType::LoyaltyInquiryRequest => Message::LoyaltyInquiryRequest(payload(kind, body)?),
        MessageType::LoyaltyInquiryResponse => {
            Message::LoyaltyInquiryResponse(payload(kind, body)?)
        }
        MessageType::PendingReversalsRequest => {
            Message::PendingReversalsRequest(payload(kind, body)?)
        }
        MessageType::PendingReversalsResponse => {
            Message::PendingReversalsResponse(payload(kind, body)?)
        }
        MessageType::DeletePendingReversalsRequest => {
            Message::DeletePendingReversalsRequest(payload(kind, body)?)
        }
        MessageType::DeletePendingReversalsResponse => {
            Message::DeletePendingReversalsResponse(payload(kind, body)?)
        }
    };
    Ok(msg)
}

fn payload<P: DeserializeOwned>(kind: MessageType, body: Value) -> Result<P> {
    serde_json::from_value(body).map_err(|e| SibsError::Decode(format!("{kind}: {e}")))
}

fn to_body<P: Serialize>(p: &P) -> Result<Value> {
    serde_json::to_value(p).map_err(|e| SibsError::Internal(format!("json encode failed: {e}")))
}

/// Encode a message into a text frame.
pub fn encode(msg: &Message) -> Result<String> {
    let body = match msg {
        Message::StatusRequest(p) => to_body(p)?,
        Message::StatusResponse(p) => to_body(p)?,
        Message::SetAuthCredentialRequest(p) => to_body(p)?,
        Message::SetAuthCredentialResponse(p) => to_body(p)?,
        Message::ProcessPaymentRequest(p) => to_body(p)?,
        Message::ProcessPaymentResponse(p) => to_body(p)?,
        Message::RefundRequest(p) => to_body(p)?,
        Message::RefundResponse(p) => to_body(p)?,
        Message::PairingRequest(p) => to_body(p)?,
        Message::PairingResponse(p) => to_body(p)?,
        Message::PairingNotification(p) => to_body(p)?,
        Message::ReconciliationRequest(p) => to_body(p)?,
        Message::ReconciliationResponse(p) => to_body(p)?,
        Message::EventNotification(p) => to_body(p)?,
        Message::TxResponse(p) => to_body(p)?,
        Message::ConfigTerminalResponse(p) => to_body(p)?,
        Message::CustomerDataResponse(p) => to_body(p)?,
        Message::DeletePendingReversalsRequest(p) => to_body(p)?,
        Message::ErrorNotification(p)
        | Message::HeartbeatNotification(p)
        | Message::ReceiptNotification(p)
        | Message::TxRequest(p)
        | Message::CommunicationsRequest(p)
        | Message::CommunicationsResponse(p)
        | Message::GetMerchantDataRequest(p)
        | Message::GetMerchantDataResponse(p)
        | Message::SetMerchantDataRequest(p)
        | Message::SetMerchantDataResponse(p)
        | Message::ConfigTerminalRequest(p)
        | Message::CustomerDataRequest(p)
        | Message::LoyaltyInquiryRequest(p)
        | Message::LoyaltyInquiryResponse(p)
        | Message::PendingReversalsRequest(p)
        | Message::PendingReversalsResponse(p)
        | Message::DeletePendingReversalsResponse(p) => to_body(p)?,
    };

    let Value::Object(mut fields) = body else {
        return Err(SibsError::Internal(format!(
            "{} payload did not encode to an object",
            msg.message_type()
        )));
    };
    fields.insert("version".into(), Value::String(PROTOCOL_VERSION.into()));
    fields.insert("type".into(), Value::String(msg.message_type().as_str().into()));

    serde_json::to_string(&Value::Object(fields))
        .map_err(|e| SibsError::Internal(format!("json encode failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::protocol::messages::*;

    fn round_trip(msg: Message) {
        let raw = match encode(&msg) {
            Ok(raw) => raw,
            Err(e) => panic!("encode {:?}: {e}", msg.message_type()),
        };
        match decode(&raw) {
            Ok(Decoded::Message(back)) => assert_eq!(back, msg, "raw={raw}"),
            other => panic!("decode {raw}: {other:?}"),
        }
    }

    #[test]
    fn representative_payloads_round_trip() {
        let mut extra = Fields::new();
        extra.insert("terminalState".into(), Value::String("IDLE".into()));

        round_trip(Message::StatusRequest(StatusRequest {}));
        round_trip(Message::StatusResponse(StatusResponse { has_credentials: false, extra }));
        round_trip(Message::ProcessPaymentRequest(ProcessPaymentRequest {
            amount_data: AmountData::new(99.98),
            reference: Some("ref-1".into()),
        }));
        round_trip(Message::ProcessPaymentResponse(ProcessPaymentResponse {
            payment_data: Some(PaymentData {
                payment_type: Some("PURCHASE".into()),
                server_id: Some("srv".into()),
                ..PaymentData::default()
            }),
            transaction_id: Some("tx-9".into()),
            extra: Fields::new(),
        }));
        round_trip(Message::PairingRequest(PairingRequest::validate("1234")));
        round_trip(Message::RefundResponse(RefundResponse {
            refund_data: Some(RefundData {
                amount: Some(5.5),
                was_online: Some(true),
                period_id: Some(12),
                ..RefundData::default()
            }),
            extra: Fields::new(),
        }));
        round_trip(Message::DeletePendingReversalsRequest(DeletePendingReversalsRequest {
            reversal_id: "r-1".into(),
        }));
        round_trip(Message::HeartbeatNotification(OpenPayload::default()));
    }

    #[test]
    fn encode_stamps_version_and_type() {
        let raw = encode(&Message::TxResponse(TxResponse { transaction_id: "abc".into() }));
        let v: Value = serde_json::from_str(&raw.unwrap_or_default()).unwrap_or(Value::Null);
        assert_eq!(v["version"], "V_1");
        assert_eq!(v["type"], "TX_RESPONSE");
        assert_eq!(v["transactionId"], "abc");
    }

    #[test]
    fn open_payload_cannot_override_the_tag() {
        let mut fields = Fields::new();
        fields.insert("type".into(), Value::String("STATUS_REQUEST".into()));
        let raw = encode(&Message::HeartbeatNotification(OpenPayload { fields }));
        let v: Value = serde_json::from_str(&raw.unwrap_or_default()).unwrap_or(Value::Null);
        assert_eq!(v["type"], "HEARTBEAT_NOTIFICATION");
    }

    #[test]
    fn shape_mismatch_in_known_type_is_decode_error() {
        let e = decode(r#"{"version":"V_1","type":"STATUS_RESPONSE","hasCredentials":"yes"}"#);
        assert!(matches!(e, Err(SibsError::Decode(_))));

        let e = decode(r#"{"version":"V_1","type":"PROCESS_PAYMENT_REQUEST","amountData":7}"#);
        assert!(matches!(e, Err(SibsError::Decode(_))));
    }

    #[test]
    fn status_without_credentials_flag_reads_as_false() {
        match decode(r#"{"version":"V_1","type":"STATUS_RESPONSE"}"#) {
            Ok(Decoded::Message(Message::StatusResponse(s))) => assert!(!s.has_credentials),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_not_an_error() {
        let d = decode(r#"{"version":"V_1","type":"FIRMWARE_UPDATE","x":1}"#);
        assert!(matches!(d, Ok(Decoded::Unrecognized(_))));
    }
}
