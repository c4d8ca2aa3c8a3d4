//! Operator menu: command id -> label.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Pair,
    CancelPairing,
    Payment,
    Refund,
    Reconciliation,
    PendingReversals,
    Metrics,
    Quit,
}

/// Menu entries in display order.
pub const MENU: [(Command, &str, &str); 9] = [
    (Command::Status, "1", "Terminal status"),
    (Command::Pair, "2", "Pair terminal"),
    (Command::CancelPairing, "3", "Cancel pairing"),
    (Command::Payment, "4", "Payment"),
    (Command::Refund, "5", "Refund last payment"),
    (Command::Reconciliation, "6", "Reconciliation"),
    (Command::PendingReversals, "7", "Pending reversals"),
    (Command::Metrics, "8", "Metrics"),
    (Command::Quit, "0", "Quit"),
];

impl Command {
    pub fn id(self) -> &'static str {
        MENU.iter()
            .find(|(c, _, _)| *c == self)
            .map(|(_, id, _)| *id)
            .unwrap_or("?")
    }

    pub fn label(self) -> &'static str {
        MENU.iter()
            .find(|(c, _, _)| *c == self)
            .map(|(_, _, label)| *label)
            .unwrap_or("")
    }

    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        MENU.iter().find(|(_, id, _)| *id == input).map(|(c, _, _)| *c)
    }
}

pub fn render() -> String {
    let mut out = String::new();
    for (_, id, label) in MENU {
        let _ = writeln!(out, "  {id}) {label}");
    }
    out
}
