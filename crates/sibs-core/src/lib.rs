//! sibs core: transport-agnostic protocol primitives and the shared error type.
//!
//! This crate defines the wire contract spoken with the payment terminal:
//! the envelope, the message type registry, payload shapes and the codec.
//! It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `SibsError`, so a malformed frame from the terminal can
//! never take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, Result, SibsError};
