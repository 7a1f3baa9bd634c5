//! Error types for tubelink-core

use crate::machine::State;

/// Result type alias for tubelink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input does not apply to the current state
    #[error("Invalid transition: {input} in state {state}")]
    InvalidTransition {
        state: State,
        input: &'static str,
    },

    /// Session already halted; it never resumes within a run
    #[error("Session halted in state {state}")]
    SessionHalted {
        state: State,
    },
}
