//! Session state for a handshake run
//!
//! A session tracks:
//! - Current handshake state (and so the current step)
//! - Completed cycle counter
//! - Running/halted status
//! - Start timestamp

use chrono::{DateTime, Local};
use tracing::debug;
use tubelink_types::HaltReason;

use crate::error::{Error, Result};
use crate::machine::{self, Input, State, Transition};
use crate::step::Step;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Cycles may still run
    Running,

    /// Terminal for the run
    Halted,
}

/// Where and why a session halted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    /// State the engine was in when it halted
    pub state: State,
    pub reason: HaltReason,
}

/// Handshake session
#[derive(Debug, Clone)]
pub struct Session {
    state: State,
    cycles_completed: u64,
    started_at: DateTime<Local>,
    halt: Option<Halt>,
}

impl Session {
    /// Create a new session in `Idle`
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            cycles_completed: 0,
            started_at: Local::now(),
            halt: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Current protocol step, if the state belongs to one
    pub fn step(&self) -> Option<&'static Step> {
        self.state.step()
    }

    /// Get running/halted status
    pub fn status(&self) -> SessionState {
        if self.halt.is_some() {
            SessionState::Halted
        } else {
            SessionState::Running
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionState::Running
    }

    pub fn is_halted(&self) -> bool {
        self.status() == SessionState::Halted
    }

    /// Number of cycles that reached `Complete`
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn halt(&self) -> Option<&Halt> {
        self.halt.as_ref()
    }

    /// Apply an input to the current state.
    ///
    /// Reaching `Complete` bumps the cycle counter. A halt records the state
    /// it happened in and moves the session to `Halted` for good.
    pub fn apply(&mut self, input: Input) -> Result<Transition> {
        if let Some(halt) = &self.halt {
            return Err(Error::SessionHalted { state: halt.state });
        }

        let transition = machine::transition(self.state, input)?;

        match &transition {
            Transition::Advance(next) => {
                debug!("{} -> {}", self.state, next);
                if *next == State::Complete {
                    self.cycles_completed += 1;
                }
                self.state = *next;
            }
            Transition::Halt(reason) => {
                debug!("{} -> Halted ({})", self.state, reason);
                self.halt = Some(Halt {
                    state: self.state,
                    reason: reason.clone(),
                });
                self.state = State::Halted;
            }
        }

        Ok(transition)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
