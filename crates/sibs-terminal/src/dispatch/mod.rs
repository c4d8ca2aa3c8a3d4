//! Protocol dispatcher.
//!
//! One exhaustive match over the decoded message decides the reaction class
//! of every inbound frame.

pub mod dispatcher;

pub use dispatcher::{new_transaction_id, Dispatcher, Route};
