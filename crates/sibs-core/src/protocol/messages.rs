//! Payload shapes, one per message kind.
//!
//! Payload structs never carry `version` / `type`: the codec writes both
//! from the kind itself, so a payload can't be sent under the wrong tag.
//! Fields the protocol leaves open are kept in a flattened `extra` map so
//! they survive a decode/encode cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::MessageType;

/// Free-form JSON members of a payload.
pub type Fields = Map<String, Value>;

/// Payload with no fixed schema (notifications and vendor extensions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenPayload {
    #[serde(flatten)]
    pub fields: Fields,
}

// --------------------
// Status / credentials
// --------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Whether the terminal already holds auth credentials. Absent reads
    /// as `false`, which triggers the credential bootstrap.
    #[serde(default)]
    pub has_credentials: bool,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Credential bundle. The layout is vendor-defined, so it is carried as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetAuthCredentialRequest {
    #[serde(flatten)]
    pub credentials: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAuthCredentialResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_status: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

// --------------------
// Payment
// --------------------

fn default_other_amount_type() -> String {
    "NONE".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountData {
    #[serde(default = "default_other_amount_type")]
    pub other_amount_type: String,
    pub amount: f64,
    #[serde(default)]
    pub other_amount: f64,
}

impl AmountData {
    /// Plain amount with no secondary amount.
    pub fn new(amount: f64) -> Self {
        Self {
            other_amount_type: default_other_amount_type(),
            amount,
            other_amount: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub amount_data: AmountData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Identity of a completed payment, as reported by the terminal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcc_initiator_id: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<PaymentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

// --------------------
// Refund
// --------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalTransactionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcc_initiator_id: Option<String>,
}

impl From<&PaymentData> for OriginalTransactionData {
    fn from(p: &PaymentData) -> Self {
        Self {
            authorization_type: p.authorization_type.clone(),
            payment_type: p.payment_type.clone(),
            transaction_type: p.transaction_type.clone(),
            server_id: p.server_id.clone(),
            sdk_id: p.sdk_id.clone(),
            server_date_time: p.server_date_time.clone(),
            dcc_initiator_id: p.dcc_initiator_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub original_transaction_data: OriginalTransactionData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_transaction_id: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gratuity_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_texts_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_show_amount_to_cardholder: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_online: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_data: Option<RefundData>,
    #[serde(flatten)]
    pub extra: Fields,
}

// --------------------
// Pairing
// --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairingStep {
    GeneratePairingCode,
    ValidatePairingCode,
    CancelPairing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRequest {
    pub pairing_step: PairingStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
}

impl PairingRequest {
    pub fn generate() -> Self {
        Self { pairing_step: PairingStep::GeneratePairingCode, pairing_code: None }
    }

    pub fn validate(code: impl Into<String>) -> Self {
        Self { pairing_step: PairingStep::ValidatePairingCode, pairing_code: Some(code.into()) }
    }

    pub fn cancel() -> Self {
        Self { pairing_step: PairingStep::CancelPairing, pairing_code: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingResponse {
    /// Code shown on the terminal display, when the terminal echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

const PAIRING_STATUS_SUCCESS: &str = "SUCCESS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_status: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl PairingNotification {
    /// Only the literal `SUCCESS` status counts as paired.
    pub fn is_success(&self) -> bool {
        self.pairing_status.as_deref() == Some(PAIRING_STATUS_SUCCESS)
    }
}

// --------------------
// Reconciliation / notifications / misc
// --------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub transaction_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigTerminalResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_number: Option<String>,
    #[serde(
        default,
        rename = "fiscalNumberCountryISO2Code",
        skip_serializing_if = "Option::is_none"
    )]
    pub fiscal_number_country_iso2_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDataResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_data: Option<CustomerData>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePendingReversalsRequest {
    pub reversal_id: String,
}

// --------------------
// Tagged union
// --------------------

/// A decoded protocol message. The variant is the type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    StatusRequest(StatusRequest),
    StatusResponse(StatusResponse),
    SetAuthCredentialRequest(SetAuthCredentialRequest),
    SetAuthCredentialResponse(SetAuthCredentialResponse),
    ProcessPaymentRequest(ProcessPaymentRequest),
    ProcessPaymentResponse(ProcessPaymentResponse),
    RefundRequest(RefundRequest),
    RefundResponse(RefundResponse),
    PairingRequest(PairingRequest),
    PairingResponse(PairingResponse),
    PairingNotification(PairingNotification),
    ReconciliationRequest(ReconciliationRequest),
    ReconciliationResponse(ReconciliationResponse),
    EventNotification(EventNotification),
    ErrorNotification(OpenPayload),
    HeartbeatNotification(OpenPayload),
    ReceiptNotification(OpenPayload),
    TxRequest(OpenPayload),
    TxResponse(TxResponse),
    CommunicationsRequest(OpenPayload),
    CommunicationsResponse(OpenPayload),
    GetMerchantDataRequest(OpenPayload),
    GetMerchantDataResponse(OpenPayload),
    SetMerchantDataRequest(OpenPayload),
    SetMerchantDataResponse(OpenPayload),
    ConfigTerminalRequest(OpenPayload),
    ConfigTerminalResponse(ConfigTerminalResponse),
    CustomerDataRequest(OpenPayload),
    CustomerDataResponse(CustomerDataResponse),
    LoyaltyInquiryRequest(OpenPayload),
    LoyaltyInquiryResponse(OpenPayload),
    PendingReversalsRequest(OpenPayload),
    PendingReversalsResponse(OpenPayload),
    DeletePendingReversalsRequest(DeletePendingReversalsRequest),
    DeletePendingReversalsResponse(OpenPayload),
}

impl Message {
    /// The fixed type tag of this payload.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::StatusRequest(_) => MessageType::StatusRequest,
            Message::StatusResponse(_) => MessageType::StatusResponse,
            Message::SetAuthCredentialRequest(_) => MessageType::SetAuthCredentialRequest,
            Message::SetAuthCredentialResponse(_) => MessageType::SetAuthCredentialResponse,
            Message::ProcessPaymentRequest(_) => MessageType::ProcessPaymentRequest,
            Message::ProcessPaymentResponse(_) => MessageType::ProcessPaymentResponse,
            Message::RefundRequest(_) => MessageType::RefundRequest,
            Message::RefundResponse(_) => MessageType::RefundResponse,
            Message::PairingRequest(_) => MessageType::PairingRequest,
            Message::PairingResponse(_) => MessageType::PairingResponse,
            Message::PairingNotification(_) => MessageType::PairingNotification,
            Message::ReconciliationRequest(_) => MessageType::ReconciliationRequest,
            Message::ReconciliationResponse(_) => MessageType::ReconciliationResponse,
            Message::EventNotification(_) => MessageType::EventNotification,
            Message::ErrorNotification(_) => MessageType::ErrorNotification,
            Message::HeartbeatNotification(_) => MessageType::HeartbeatNotification,
            Message::ReceiptNotification(_) => MessageType::ReceiptNotification,
            Message::TxRequest(_) => MessageType::TxRequest,
            Message::TxResponse(_) => MessageType::TxResponse,
            Message::CommunicationsRequest(_) => MessageType::CommunicationsRequest,
            Message::CommunicationsResponse(_) => MessageType::CommunicationsResponse,
            Message::GetMerchantDataRequest(_) => MessageType::GetMerchantDataRequest,
            Message::GetMerchantDataResponse(_) => MessageType::GetMerchantDataResponse,
            Message::SetMerchantDataRequest(_) => MessageType::SetMerchantDataRequest,
            Message::SetMerchantDataResponse(_) => MessageType::SetMerchantDataResponse,
            Message::ConfigTerminalRequest(_) => MessageType::ConfigTerminalRequest,
            Message::ConfigTerminalResponse(_) => MessageType::ConfigTerminalResponse,
            Message::CustomerDataRequest(_) => MessageType::CustomerDataRequest,
            Message::CustomerDataResponse(_) => MessageType::CustomerDataResponse,
            Message::LoyaltyInquiryRequest(_) => MessageType::LoyaltyInquiryRequest,
            Message::LoyaltyInquiryResponse(_) => MessageType::LoyaltyInquiryResponse,
            Message::PendingReversalsRequest(_) => MessageType::PendingReversalsRequest,
            Message::PendingReversalsResponse(_) => MessageType::PendingReversalsResponse,
            Message::DeletePendingReversalsRequest(_) => {
                MessageType::DeletePendingReversalsRequest
            }
            Message::DeletePendingReversalsResponse(_) => {
                MessageType::DeletePendingReversalsResponse
            }
        }
    }
}
