//! Credential bootstrap on connect.
//!
//! The session asks for terminal status as soon as the link is up. A status
//! reporting no credentials triggers the stored credential bundle. With
//! credentials present nothing happens, unless the optional auto-payment
//! hook is configured (once per connection).

use std::sync::atomic::{AtomicBool, Ordering};

use sibs_core::protocol::messages::{AmountData, ProcessPaymentRequest, StatusRequest, StatusResponse};
use sibs_core::protocol::Message;

use crate::config::AutoPayment;

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapAction {
    SendCredentials,
    AutoPayment(ProcessPaymentRequest),
    Nothing,
}

#[derive(Debug, Default)]
pub struct CredentialBootstrap {
    auto_payment: Option<AutoPayment>,
    auto_paid: AtomicBool,
}

impl CredentialBootstrap {
    pub fn new(auto_payment: Option<AutoPayment>) -> Self {
        Self {
            auto_payment,
            auto_paid: AtomicBool::new(false),
        }
    }

    /// First frame of every connection.
    pub fn on_connected(&self) -> Message {
        self.auto_paid.store(false, Ordering::SeqCst);
        Message::StatusRequest(StatusRequest {})
    }

    pub fn on_status(&self, rsp: &StatusResponse) -> BootstrapAction {
        if !rsp.has_credentials {
            return BootstrapAction::SendCredentials;
        }
        let Some(p) = &self.auto_payment else {
            return BootstrapAction::Nothing;
        };
        if self.auto_paid.swap(true, Ordering::SeqCst) {
            return BootstrapAction::Nothing;
        }
        BootstrapAction::AutoPayment(ProcessPaymentRequest {
            amount_data: AmountData::new(p.amount),
            reference: p.reference.clone(),
        })
    }
}
