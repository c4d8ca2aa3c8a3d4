//! Sub-flows that hang off the dispatch path.

pub mod bootstrap;
pub mod history;
pub mod pairing;

pub use bootstrap::{BootstrapAction, CredentialBootstrap};
pub use history::{PaymentRecord, TransactionHistory};
pub use pairing::{
    is_valid_code, CodeDecision, PairingCodeProvider, PairingMachine, PairingOutcome, PairingState,
};
