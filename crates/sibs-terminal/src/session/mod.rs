//! Terminal session: lifecycle, commands, the dispatch loop and the
//! rendezvous gates that connect them.

pub mod controller;
pub mod events;
pub mod pending;

pub use controller::{SessionBuilder, TerminalSession};
pub use events::{Diagnostic, SessionEvent};
pub use pending::{PendingReplies, Ticket};
