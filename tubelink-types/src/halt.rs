//! Reasons a handshake run stops

use std::fmt;

/// Why the handshake engine halted.
///
/// Every variant is terminal for the run: the engine never retries and
/// never resumes once a reason has been recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// No non-heartbeat response arrived within the step window
    Timeout {
        seconds: u64,
    },

    /// Device reported one of the step's known failure tokens
    ExpectedError(String),

    /// Device sent a line the step does not recognise
    UnexpectedResponse(String),

    /// The channel failed underneath the engine (write or read error)
    TransportFailure(String),
}

impl HaltReason {
    /// Short machine-friendly label, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::ExpectedError(_) => "expected_error",
            Self::UnexpectedResponse(_) => "unexpected_response",
            Self::TransportFailure(_) => "transport_failure",
        }
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { seconds } => write!(f, "timeout after {} seconds", seconds),
            Self::ExpectedError(token) => write!(f, "device reported '{}'", token),
            Self::UnexpectedResponse(text) => write!(f, "unexpected response '{}'", text),
            Self::TransportFailure(reason) => write!(f, "transport failure: {}", reason),
        }
    }
}
