//! Engine events
//!
//! Each event renders as exactly one session log line.

use std::fmt;

use chrono::{DateTime, Local};
use tubelink_core::State;
use tubelink_types::HaltReason;

/// Something the engine did or observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LogStarted(DateTime<Local>),

    Connected {
        address: String,
        baud_rate: Option<u32>,
    },

    ConnectionFailed(String),

    ConnectionClosed {
        address: String,
    },

    NoActiveConnection {
        address: String,
    },

    /// 1-based number of the cycle being started
    CycleStarted(u64),

    CommandSent(String),

    /// Sanitized, non-heartbeat response
    Received(String),

    /// A step's success token arrived
    StepSucceeded {
        token: String,
        next: State,
    },

    Timeout {
        seconds: u64,
    },

    ErrorReceived(String),

    UnexpectedResponse {
        expected: &'static str,
        text: String,
    },

    TransportFailure(String),

    Halted {
        state: State,
        reason: HaltReason,
    },

    CycleCompleted {
        total: u64,
    },

    /// The run ended on an engine error rather than a halt
    RunAborted(String),

    StopRequested,
}

impl Event {
    /// Events that describe a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::Timeout { .. }
                | Self::ErrorReceived(_)
                | Self::UnexpectedResponse { .. }
                | Self::TransportFailure(_)
                | Self::Halted { .. }
                | Self::RunAborted(_)
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogStarted(at) => write!(f, "Log started at {}", at.format("%Y-%m-%d %H:%M:%S")),
            Self::Connected { address, baud_rate: Some(baud) } => {
                write!(f, "Connected to {} at {} baud rate.", address, baud)
            }
            Self::Connected { address, baud_rate: None } => write!(f, "Connected to {}.", address),
            Self::ConnectionFailed(reason) => write!(f, "Error opening connection: {}", reason),
            Self::ConnectionClosed { address } => write!(f, "Connection to {} closed.", address),
            Self::NoActiveConnection { address } => write!(f, "No active connection to {}.", address),
            Self::CycleStarted(cycle) => write!(f, "--- Starting cycle {} ---", cycle),
            Self::CommandSent(command) => write!(f, "Command sent: {}", command),
            Self::Received(text) => write!(f, "Received: '{}'", text),
            Self::StepSucceeded { token, next } => match next {
                State::Complete => write!(f, "Received '{}'. Process complete.", token),
                State::SendC => write!(f, "Received '{}'. Now sending 'C'...", token),
                _ => write!(f, "Received '{}'. Now waiting for the next response...", token),
            },
            Self::Timeout { seconds } => write!(f, "Timeout reached after {} seconds.", seconds),
            Self::ErrorReceived(token) => write!(f, "Error received: '{}'.", token),
            Self::UnexpectedResponse { expected, text } => {
                write!(f, "Did not receive '{}', got '{}'.", expected, text)
            }
            Self::TransportFailure(reason) => write!(f, "Transport failure: {}", reason),
            Self::Halted { state, reason } => {
                write!(f, "Stopping the loop: halted in {} ({}).", state, reason)
            }
            Self::CycleCompleted { total } => {
                write!(f, "Cycle complete. Total cycles completed: {}", total)
            }
            Self::RunAborted(reason) => write!(f, "Run aborted: {}", reason),
            Self::StopRequested => write!(f, "Stop requested. Ending run."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_lines() {
        let lines: Vec<String> = [
            Event::Connected {
                address: "COM5".into(),
                baud_rate: Some(9600),
            },
            Event::CycleStarted(1),
            Event::CommandSent("B".into()),
            Event::Received("BOK".into()),
            Event::StepSucceeded {
                token: "BOK".into(),
                next: State::AwaitDecap,
            },
            Event::StepSucceeded {
                token: "DECAP_OK".into(),
                next: State::SendC,
            },
            Event::StepSucceeded {
                token: "RECAP_OK".into(),
                next: State::Complete,
            },
            Event::Timeout { seconds: 120 },
            Event::ConnectionClosed { address: "COM5".into() },
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(
            lines,
            vec![
                "Connected to COM5 at 9600 baud rate.",
                "--- Starting cycle 1 ---",
                "Command sent: B",
                "Received: 'BOK'",
                "Received 'BOK'. Now waiting for the next response...",
                "Received 'DECAP_OK'. Now sending 'C'...",
                "Received 'RECAP_OK'. Process complete.",
                "Timeout reached after 120 seconds.",
                "Connection to COM5 closed.",
            ]
        );
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::ErrorReceived("BNO".into()).is_failure());
        assert!(Event::Timeout { seconds: 60 }.is_failure());
        assert!(!Event::CommandSent("C".into()).is_failure());
        assert!(Event::RunAborted("Device not connected".into()).is_failure());
        assert!(!Event::StopRequested.is_failure());
    }
}
