//! Run summary written at the end of every session log

use std::fmt;

use chrono::{DateTime, Local};

use crate::HaltReason;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    /// The channel could not be opened; no cycle was attempted
    NotStarted(String),

    /// The state machine halted
    Halted {
        state: String,
        reason: HaltReason,
    },

    /// The engine gave up outside the state machine (channel lost mid-run)
    Aborted(String),

    /// Stop signal, cycle limit or shutdown request
    Stopped,
}

/// Final summary of a handshake run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub cycles_completed: u64,
    pub end: RunEnd,
}

impl RunSummary {
    /// Whether the run ended because of a failure
    pub fn is_failure(&self) -> bool {
        !matches!(self.end, RunEnd::Stopped)
    }

    /// Lines of the trailing summary block, in order
    pub fn lines(&self) -> Vec<String> {
        vec![
            String::new(),
            "--- Process Summary ---".to_string(),
            format!("Total cycles completed: {}", self.cycles_completed),
        ]
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycle(s) completed, ", self.cycles_completed)?;
        match &self.end {
            RunEnd::NotStarted(reason) => write!(f, "never started: {}", reason),
            RunEnd::Halted { state, reason } => write!(f, "halted in {}: {}", state, reason),
            RunEnd::Aborted(reason) => write!(f, "aborted: {}", reason),
            RunEnd::Stopped => write!(f, "stopped"),
        }
    }
}
