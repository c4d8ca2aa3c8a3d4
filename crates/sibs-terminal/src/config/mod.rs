//! Terminal config loader (strict parsing).

pub mod schema;

use std::fs;

use sibs_core::error::{Result, SibsError};

pub use schema::{AutoPayment, BootstrapSection, SessionSection, TerminalConfig, TerminalSection};

pub fn load_from_file(path: &str) -> Result<TerminalConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SibsError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TerminalConfig> {
    let cfg: TerminalConfig = serde_yaml::from_str(s)
        .map_err(|e| SibsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
