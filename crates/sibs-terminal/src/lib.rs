//! sibs terminal runtime.
//!
//! Wires the transport, the protocol dispatcher and the session flows
//! (pairing, credential bootstrap, transaction history) into one
//! `TerminalSession`. Consumed by the console binary (`main.rs`) and by
//! integration tests.

pub mod config;
pub mod console;
pub mod credentials;
pub mod dispatch;
pub mod flows;
pub mod obs;
pub mod session;
pub mod transport;

pub use session::{SessionEvent, TerminalSession};
