//! sibs terminal console.
//!
//! - Config: first argument, default `sibs-terminal.yaml` (strict parsing)
//! - Waits for the payment terminal on `terminal.listen`
//! - Operator menu on stdin; the same input answers pairing-code prompts

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sibs_terminal::console::{self, ConsolePairingCodes, LineSource};
use sibs_terminal::transport::WsServerTransport;
use sibs_terminal::{config, SessionEvent, TerminalSession};

const DEFAULT_CONFIG: &str = "sibs-terminal.yaml";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, path = %path, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let lines = LineSource::stdin();
    let transport = Arc::new(WsServerTransport::new(cfg.terminal.clone()));
    let session = TerminalSession::builder(transport, &cfg)
        .pairing_codes(Arc::new(ConsolePairingCodes::new(lines.clone())))
        .build();

    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            let ev = match events.recv().await {
                Ok(ev) => ev,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event log lagging");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match ev {
                SessionEvent::Connected => tracing::info!("terminal ready"),
                SessionEvent::Diagnostic(d) => {
                    tracing::warn!(code = d.code, detail = %d.detail, "diagnostic")
                }
                SessionEvent::Inbound(msg) => {
                    tracing::info!(msg_type = %msg.message_type(), "terminal message")
                }
                _ => {}
            }
        }
    });

    if let Err(e) = session.start(&cfg.terminal.listen).await {
        tracing::error!(error = %e, "session start failed");
        return ExitCode::FAILURE;
    }

    console::run(&session, &lines).await;

    if let Err(e) = session.stop().await {
        tracing::warn!(error = %e, "session stop failed");
    }
    ExitCode::SUCCESS
}
