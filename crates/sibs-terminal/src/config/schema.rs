use std::time::Duration;

use serde::Deserialize;
use sibs_core::error::{Result, SibsError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalConfig {
    pub version: u32,

    #[serde(default)]
    pub terminal: TerminalSection,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub bootstrap: BootstrapSection,
}

impl TerminalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SibsError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.terminal.validate()?;
        self.session.validate()?;
        self.bootstrap.validate()?;

        Ok(())
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            version: 1,
            terminal: TerminalSection::default(),
            session: SessionSection::default(),
            bootstrap: BootstrapSection::default(),
        }
    }
}

/// Where the terminal connects and how the link is kept alive.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl TerminalSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(SibsError::Config("terminal.path must start with '/'".into()));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(SibsError::Config(
                "terminal.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(SibsError::Config(
                "terminal.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(SibsError::Config(
                "terminal.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:10005".into()
}
fn default_path() -> String {
    "/".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}

/// Bounded waits and observer buffering.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    #[serde(default = "default_pairing_timeout_ms")]
    pub pairing_timeout_ms: u64,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            pairing_timeout_ms: default_pairing_timeout_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600000).contains(&self.reply_timeout_ms) {
            return Err(SibsError::Config(
                "session.reply_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if !(1000..=3600000).contains(&self.pairing_timeout_ms) {
            return Err(SibsError::Config(
                "session.pairing_timeout_ms must be between 1000 and 3600000".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(SibsError::Config("session.event_buffer must be >= 1".into()));
        }
        Ok(())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_millis(self.pairing_timeout_ms)
    }
}

fn default_reply_timeout_ms() -> u64 {
    30000
}
fn default_pairing_timeout_ms() -> u64 {
    180000
}
fn default_event_buffer() -> usize {
    256
}

/// Credential provisioning on connect.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSection {
    /// JSON credential bundle sent when the terminal reports none.
    #[serde(default)]
    pub credentials_path: Option<String>,

    /// Debug hook: pay this amount once credentials are already present.
    #[serde(default)]
    pub auto_payment: Option<AutoPayment>,
}

impl BootstrapSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = &self.auto_payment {
            if !(p.amount.is_finite() && p.amount > 0.0) {
                return Err(SibsError::Config(
                    "bootstrap.auto_payment.amount must be a positive number".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoPayment {
    pub amount: f64,
    #[serde(default)]
    pub reference: Option<String>,
}
