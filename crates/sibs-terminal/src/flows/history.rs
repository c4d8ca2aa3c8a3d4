//! Last successful payment, kept to build refunds.

use std::sync::{Mutex, MutexGuard};

use sibs_core::error::{Result, SibsError};
use sibs_core::protocol::messages::{
    OriginalTransactionData, PaymentData, ProcessPaymentResponse, RefundRequest,
};

/// Snapshot of one successful payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub payment_data: PaymentData,
    pub transaction_id: Option<String>,
}

/// Capacity-1 cache, last write wins.
///
/// Written from the dispatch path only, read by the refund builder.
#[derive(Debug, Default)]
pub struct TransactionHistory {
    last: Mutex<Option<PaymentRecord>>,
}

impl TransactionHistory {
    fn slot(&self) -> MutexGuard<'_, Option<PaymentRecord>> {
        self.last.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Store the payment if the response reports one. Returns whether it did.
    pub fn record(&self, rsp: &ProcessPaymentResponse) -> bool {
        let Some(payment_data) = rsp.payment_data.clone() else {
            return false;
        };
        *self.slot() = Some(PaymentRecord {
            payment_data,
            transaction_id: rsp.transaction_id.clone(),
        });
        true
    }

    pub fn last(&self) -> Option<PaymentRecord> {
        self.slot().clone()
    }

    pub fn clear(&self) {
        self.slot().take();
    }

    /// Refund of the cached payment. Fails before anything is sent when the
    /// cache is empty.
    pub fn build_refund(&self, amount: f64, reference: Option<String>) -> Result<RefundRequest> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(SibsError::UserInput(format!("invalid refund amount {amount}")));
        }
        let record = self.last().ok_or_else(|| {
            SibsError::ProtocolViolation("refund requires a previous successful payment".into())
        })?;

        Ok(RefundRequest {
            original_transaction_data: OriginalTransactionData::from(&record.payment_data),
            refund_transaction_id: record.transaction_id,
            amount,
            reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid(server_id: &str, tx: Option<&str>) -> ProcessPaymentResponse {
        ProcessPaymentResponse {
            payment_data: Some(PaymentData {
                payment_type: Some("PURCHASE".into()),
                transaction_type: Some("CARD".into()),
                server_id: Some(server_id.into()),
                sdk_id: Some("sdk-1".into()),
                server_date_time: Some("2024-01-01T10:00:00".into()),
                ..PaymentData::default()
            }),
            transaction_id: tx.map(Into::into),
            ..ProcessPaymentResponse::default()
        }
    }

    #[test]
    fn empty_cache_rejects_refund() {
        let h = TransactionHistory::default();
        let err = h.build_refund(1.0, None).unwrap_err();
        assert_eq!(err.code().as_str(), "PROTOCOL_VIOLATION");
    }

    #[test]
    fn last_write_wins() {
        let h = TransactionHistory::default();
        assert!(h.record(&paid("a", Some("t-1"))));
        assert!(h.record(&paid("b", Some("t-2"))));

        let refund = h.build_refund(2.5, Some("r".into())).unwrap();
        assert_eq!(refund.original_transaction_data.server_id.as_deref(), Some("b"));
        assert_eq!(refund.refund_transaction_id.as_deref(), Some("t-2"));
        assert_eq!(refund.amount, 2.5);
    }

    #[test]
    fn response_without_payment_data_leaves_cache_alone() {
        let h = TransactionHistory::default();
        h.record(&paid("a", None));
        assert!(!h.record(&ProcessPaymentResponse::default()));
        assert_eq!(
            h.last().and_then(|r| r.payment_data.server_id),
            Some("a".to_string())
        );

        h.clear();
        assert!(h.last().is_none());
    }

    #[test]
    fn refund_amount_must_be_positive() {
        let h = TransactionHistory::default();
        h.record(&paid("a", None));
        assert_eq!(h.build_refund(0.0, None).unwrap_err().code().as_str(), "USER_INPUT");
        assert_eq!(h.build_refund(f64::NAN, None).unwrap_err().code().as_str(), "USER_INPUT");
    }
}
