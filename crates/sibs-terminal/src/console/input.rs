//! Operator input.
//!
//! Stdin is read by one task into a line channel. The command loop and the
//! pairing-code provider both pull from the same `LineSource`, so whoever
//! is waiting gets the next line.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};

use crate::flows::PairingCodeProvider;

#[derive(Clone)]
pub struct LineSource {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl LineSource {
    /// Lines from an arbitrary channel (tests, scripted runs).
    pub fn from_channel(rx: mpsc::Receiver<String>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Spawn the stdin reader. Must be called inside a tokio runtime.
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });
        Self::from_channel(rx)
    }

    /// Next line, `None` once input is closed.
    pub async fn next_line(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }

    /// Print `prompt` and read the answer.
    pub async fn prompt(&self, prompt: &str) -> Option<String> {
        println!("{prompt}");
        self.next_line().await.map(|l| l.trim().to_string())
    }
}

/// Asks the operator for the code shown on the terminal.
pub struct ConsolePairingCodes {
    lines: LineSource,
}

impl ConsolePairingCodes {
    pub fn new(lines: LineSource) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl PairingCodeProvider for ConsolePairingCodes {
    async fn pairing_code(&self, displayed: Option<&str>) -> Option<String> {
        if let Some(code) = displayed {
            println!("terminal reports pairing code {code}");
        }
        self.lines
            .prompt("Enter the pairing code shown on the terminal (empty cancels):")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn provider_reads_the_shared_line_source() {
        let (tx, rx) = mpsc::channel(4);
        let lines = LineSource::from_channel(rx);
        let codes = ConsolePairingCodes::new(lines.clone());

        tx.send("  1234 ".into()).await.unwrap();
        tx.send("next".into()).await.unwrap();
        assert_eq!(codes.pairing_code(None).await.as_deref(), Some("1234"));
        assert_eq!(lines.next_line().await.as_deref(), Some("next"));

        drop(tx);
        assert_eq!(codes.pairing_code(Some("99")).await, None);
    }
}
