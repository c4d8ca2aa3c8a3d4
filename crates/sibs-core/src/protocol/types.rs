//! Message type registry.
//!
//! Every frame carries a `type` tag; the tag alone decides which payload
//! decoder runs. Unknown tags never reach a decoder.

use std::fmt;

/// Every message kind the terminal protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    StatusRequest,
    StatusResponse,
    SetAuthCredentialRequest,
    SetAuthCredentialResponse,
    ProcessPaymentRequest,
    ProcessPaymentResponse,
    RefundRequest,
    RefundResponse,
    PairingRequest,
    PairingResponse,
    PairingNotification,
    ReconciliationRequest,
    ReconciliationResponse,
    EventNotification,
    ErrorNotification,
    HeartbeatNotification,
    ReceiptNotification,
    TxRequest,
    TxResponse,
    CommunicationsRequest,
    CommunicationsResponse,
    GetMerchantDataRequest,
    GetMerchantDataResponse,
    SetMerchantDataRequest,
    SetMerchantDataResponse,
    ConfigTerminalRequest,
    ConfigTerminalResponse,
    CustomerDataRequest,
    CustomerDataResponse,
    LoyaltyInquiryRequest,
    LoyaltyInquiryResponse,
    PendingReversalsRequest,
    PendingReversalsResponse,
    DeletePendingReversalsRequest,
    DeletePendingReversalsResponse,
}

/// Which side emits a message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by this software to the terminal.
    Outbound,
    /// Sent by the terminal.
    Inbound,
}

impl MessageType {
    /// All registered kinds, in declaration order.
    pub const ALL: [MessageType; 35] = [
        MessageType::StatusRequest,
        MessageType::StatusResponse,
        MessageType::SetAuthCredentialRequest,
        MessageType::SetAuthCredentialResponse,
        MessageType::ProcessPaymentRequest,
        MessageType::ProcessPaymentResponse,
        MessageType::RefundRequest,
        MessageType::RefundResponse,
        MessageType::PairingRequest,
        MessageType::PairingResponse,
        MessageType::PairingNotification,
        MessageType::ReconciliationRequest,
        MessageType::ReconciliationResponse,
        MessageType::EventNotification,
        MessageType::ErrorNotification,
        MessageType::HeartbeatNotification,
        MessageType::ReceiptNotification,
        MessageType::TxRequest,
        MessageType::TxResponse,
        MessageType::CommunicationsRequest,
        MessageType::CommunicationsResponse,
        MessageType::GetMerchantDataRequest,
        MessageType::GetMerchantDataResponse,
        MessageType::SetMerchantDataRequest,
        MessageType::SetMerchantDataResponse,
        MessageType::ConfigTerminalRequest,
        MessageType::ConfigTerminalResponse,
        MessageType::CustomerDataRequest,
        MessageType::CustomerDataResponse,
        MessageType::LoyaltyInquiryRequest,
        MessageType::LoyaltyInquiryResponse,
        MessageType::PendingReversalsRequest,
        MessageType::PendingReversalsResponse,
        MessageType::DeletePendingReversalsRequest,
        MessageType::DeletePendingReversalsResponse,
    ];

    /// Wire tag (value of the `type` field).
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::StatusRequest => "STATUS_REQUEST",
            MessageType::StatusResponse => "STATUS_RESPONSE",
            MessageType::SetAuthCredentialRequest => "SET_AUTH_CREDENTIAL_REQUEST",
            MessageType::SetAuthCredentialResponse => "SET_AUTH_CREDENTIAL_RESPONSE",
            MessageType::ProcessPaymentRequest => "PROCESS_PAYMENT_REQUEST",
            MessageType::ProcessPaymentResponse => "PROCESS_PAYMENT_RESPONSE",
            MessageType::RefundRequest => "REFUND_REQUEST",
            MessageType::RefundResponse => "REFUND_RESPONSE",
            MessageType::PairingRequest => "PAIRING_REQUEST",
            MessageType::PairingResponse => "PAIRING_RESPONSE",
            MessageType::PairingNotification => "PAIRING_NOTIFICATION",
            MessageType::ReconciliationRequest => "RECONCILIATION_REQUEST",
            MessageType::ReconciliationResponse => "RECONCILIATION_RESPONSE",
            MessageType::EventNotification => "EVENT_NOTIFICATION",
            MessageType::ErrorNotification => "ERROR_NOTIFICATION",
            MessageType::HeartbeatNotification => "HEARTBEAT_NOTIFICATION",
            MessageType::ReceiptNotification => "RECEIPT_NOTIFICATION",
            MessageType::TxRequest => "TX_REQUEST",
            MessageType::TxResponse => "TX_RESPONSE",
            MessageType::CommunicationsRequest => "COMMUNICATIONS_REQUEST",
            MessageType::CommunicationsResponse => "COMMUNICATIONS_RESPONSE",
            MessageType::GetMerchantDataRequest => "GET_MERCHANT_DATA_REQUEST",
            MessageType::GetMerchantDataResponse => "GET_MERCHANT_DATA_RESPONSE",
            MessageType::SetMerchantDataRequest => "SET_MERCHANT_DATA_REQUEST",
            MessageType::SetMerchantDataResponse => "SET_MERCHANT_DATA_RESPONSE",
            MessageType::ConfigTerminalRequest => "CONFIG_TERMINAL_REQUEST",
            MessageType::ConfigTerminalResponse => "CONFIG_TERMINAL_RESPONSE",
            MessageType::CustomerDataRequest => "CUSTOMER_DATA_REQUEST",
            MessageType::CustomerDataResponse => "CUSTOMER_DATA_RESPONSE",
            MessageType::LoyaltyInquiryRequest => "LOYALTY_INQUIRY_REQUEST",
            MessageType::LoyaltyInquiryResponse => "LOYALTY_INQUIRY_RESPONSE",
            MessageType::PendingReversalsRequest => "PENDING_REVERSALS_REQUEST",
            MessageType::PendingReversalsResponse => "PENDING_REVERSALS_RESPONSE",
            MessageType::DeletePendingReversalsRequest => "DELETE_PENDING_REVERSALS_REQUEST",
            MessageType::DeletePendingReversalsResponse => "DELETE_PENDING_REVERSALS_RESPONSE",
        }
    }

    /// Resolve a wire tag. Returns `None` for tags outside the registry.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// Who emits this kind.
    pub fn direction(self) -> Direction {
        match self {
            MessageType::TxRequest => Direction::Inbound,
            MessageType::TxResponse => Direction::Outbound,
            other if other.as_str().ends_with("_REQUEST") => Direction::Outbound,
            _ => Direction::Inbound,
        }
    }

    /// The response kind that answers an outbound request, if any.
    pub fn response(self) -> Option<MessageType> {
        let rsp = match self {
            MessageType::StatusRequest => MessageType::StatusResponse,
            MessageType::SetAuthCredentialRequest => MessageType::SetAuthCredentialResponse,
            MessageType::ProcessPaymentRequest => MessageType::ProcessPaymentResponse,
            MessageType::RefundRequest => MessageType::RefundResponse,
            MessageType::PairingRequest => MessageType::PairingResponse,
            MessageType::ReconciliationRequest => MessageType::ReconciliationResponse,
            MessageType::CommunicationsRequest => MessageType::CommunicationsResponse,
            MessageType::GetMerchantDataRequest => MessageType::GetMerchantDataResponse,
            MessageType::SetMerchantDataRequest => MessageType::SetMerchantDataResponse,
            MessageType::ConfigTerminalRequest => MessageType::ConfigTerminalResponse,
            MessageType::CustomerDataRequest => MessageType::CustomerDataResponse,
            MessageType::LoyaltyInquiryRequest => MessageType::LoyaltyInquiryResponse,
            MessageType::PendingReversalsRequest => MessageType::PendingReversalsResponse,
            MessageType::DeletePendingReversalsRequest => {
                MessageType::DeletePendingReversalsResponse
            }
            _ => return None,
        };
        Some(rsp)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_resolve_back_to_their_kind() {
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_tag(t.as_str()), Some(t));
        }
        assert_eq!(MessageType::from_tag("status_request"), None);
        assert_eq!(MessageType::from_tag("FOO_REQUEST"), None);
    }

    #[test]
    fn every_outbound_request_has_a_response() {
        for t in MessageType::ALL {
            if t.direction() == Direction::Outbound && t != MessageType::TxResponse {
                let rsp = t.response().unwrap_or(t);
                assert_eq!(rsp.direction(), Direction::Inbound, "{t}");
            }
        }
        assert_eq!(MessageType::TxRequest.direction(), Direction::Inbound);
        assert_eq!(MessageType::TxResponse.response(), None);
        assert_eq!(MessageType::StatusResponse.response(), None);
    }
}
