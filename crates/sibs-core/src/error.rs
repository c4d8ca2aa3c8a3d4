//! Shared error type across sibs crates.

use thiserror::Error;

/// Stable error codes (used in diagnostics and test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Send / connect failure on the transport.
    Transport,
    /// Malformed frame or payload.
    Decode,
    /// Envelope carries a version other than `V_1`.
    UnsupportedVersion,
    /// Command rejected before transmission (e.g. refund without a payment).
    ProtocolViolation,
    /// Operator input rejected.
    UserInput,
    /// A bounded wait elapsed.
    Timeout,
    /// The session stopped while a caller was waiting.
    Aborted,
    /// Configuration could not be loaded or validated.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Decode => "DECODE",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::ProtocolViolation => "PROTOCOL_VIOLATION",
            ErrorCode::UserInput => "USER_INPUT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Aborted => "ABORTED",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SibsError>;

/// Unified error type used by core and terminal.
#[derive(Debug, Error)]
pub enum SibsError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("invalid user input: {0}")]
    UserInput(String),
    #[error("timed out waiting for terminal")]
    Timeout,
    #[error("aborted: session stopped")]
    Aborted,
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SibsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SibsError::Transport(_) => ErrorCode::Transport,
            SibsError::Decode(_) => ErrorCode::Decode,
            SibsError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            SibsError::ProtocolViolation(_) => ErrorCode::ProtocolViolation,
            SibsError::UserInput(_) => ErrorCode::UserInput,
            SibsError::Timeout => ErrorCode::Timeout,
            SibsError::Aborted => ErrorCode::Aborted,
            SibsError::Config(_) => ErrorCode::Config,
            SibsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
