//! Interactive operator console (thin front end over `TerminalSession`).

pub mod input;
pub mod menu;

use sibs_core::error::{Result, SibsError};
use sibs_core::protocol::messages::{
    AmountData, OpenPayload, ProcessPaymentRequest, ReconciliationRequest, StatusRequest,
};
use sibs_core::protocol::{encode, Message};

use crate::session::TerminalSession;

pub use input::{ConsolePairingCodes, LineSource};
pub use menu::Command;

/// Parse an operator-entered amount (`12.50`, `12,50`).
pub fn parse_amount(input: &str) -> Result<f64> {
    let normalized = input.trim().replace(',', ".");
    let amount: f64 = normalized
        .parse()
        .map_err(|_| SibsError::UserInput(format!("not an amount: {input:?}")))?;
    if !(amount.is_finite() && amount > 0.0) {
        return Err(SibsError::UserInput(format!("amount must be positive: {input:?}")));
    }
    Ok(amount)
}

/// Read commands until `Quit` or end of input.
pub async fn run(session: &TerminalSession, lines: &LineSource) {
    loop {
        print!("{}", menu::render());
        let Some(line) = lines.next_line().await else {
            break;
        };
        let Some(cmd) = Command::parse(&line) else {
            println!("unknown command {:?}", line.trim());
            continue;
        };
        if cmd == Command::Quit {
            break;
        }

        match execute(session, lines, cmd).await {
            Ok(Some(text)) => println!("{text}"),
            Ok(None) => {}
            Err(e) => println!("error [{}]: {e}", e.code().as_str()),
        }
    }
}

async fn execute(
    session: &TerminalSession,
    lines: &LineSource,
    cmd: Command,
) -> Result<Option<String>> {
    let reply = match cmd {
        Command::Status => session.request(Message::StatusRequest(StatusRequest {})).await?,
        Command::Pair => {
            let outcome = session.pair().await?;
            return Ok(Some(format!("pairing {outcome:?}")));
        }
        Command::CancelPairing => {
            session.cancel_pairing().await?;
            return Ok(None);
        }
        Command::Payment => {
            let amount = ask_amount(lines, "Amount to pay:").await?;
            let req = ProcessPaymentRequest {
                amount_data: AmountData::new(amount),
                reference: None,
            };
            session.request(Message::ProcessPaymentRequest(req)).await?
        }
        Command::Refund => {
            let amount = ask_amount(lines, "Amount to refund:").await?;
            let req = session.build_refund(amount, None)?;
            session.request(Message::RefundRequest(req)).await?
        }
        Command::Reconciliation => {
            let iban = lines
                .prompt("IBAN (empty for none):")
                .await
                .filter(|s| !s.is_empty());
            session
                .request(Message::ReconciliationRequest(ReconciliationRequest { iban }))
                .await?
        }
        Command::PendingReversals => {
            session
                .request(Message::PendingReversalsRequest(OpenPayload::default()))
                .await?
        }
        Command::Metrics => return Ok(Some(session.metrics().render())),
        Command::Quit => return Ok(None),
    };
    encode(&reply).map(Some)
}

async fn ask_amount(lines: &LineSource, prompt: &str) -> Result<f64> {
    let answer = lines
        .prompt(prompt)
        .await
        .ok_or_else(|| SibsError::UserInput("input closed".into()))?;
    parse_amount(&answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts() {
        assert_eq!(parse_amount("12.50").unwrap(), 12.5);
        assert_eq!(parse_amount(" 3,2 ").unwrap(), 3.2);
        assert_eq!(parse_amount("0").unwrap_err().code().as_str(), "USER_INPUT");
        assert_eq!(parse_amount("abc").unwrap_err().code().as_str(), "USER_INPUT");
        assert_eq!(parse_amount("inf").unwrap_err().code().as_str(), "USER_INPUT");
    }
}
