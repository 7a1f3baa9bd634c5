//! Handshake state machine
//!
//! One state per protocol step. [`transition`] is pure: it decides what
//! comes next for a given input, and the engine performs the I/O.
//!
//! ```text
//! Idle -> SendB -> AwaitBok -> AwaitDecap -> SendC -> AwaitCok -> AwaitRecap -> Complete
//!                     |            |                     |           |
//!                     +--> Halted  +--> Halted           +--> Halted +--> Halted
//! ```

use std::fmt;

use tubelink_types::HaltReason;

use crate::error::{Error, Result};
use crate::step::{self, Outcome, Step};

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Idle,
    SendB,
    AwaitBok,
    AwaitDecap,
    SendC,
    AwaitCok,
    AwaitRecap,
    Complete,
    Halted,
}

impl State {
    /// Protocol step this state belongs to
    pub fn step(self) -> Option<&'static Step> {
        match self {
            Self::SendB | Self::AwaitBok => Some(&step::DECAP_REQUEST),
            Self::AwaitDecap => Some(&step::DECAP_RESULT),
            Self::SendC | Self::AwaitCok => Some(&step::RECAP_REQUEST),
            Self::AwaitRecap => Some(&step::RECAP_RESULT),
            Self::Idle | Self::Complete | Self::Halted => None,
        }
    }

    /// States that write a command
    pub fn is_send(self) -> bool {
        matches!(self, Self::SendB | Self::SendC)
    }

    /// States that wait for a device response
    pub fn is_await(self) -> bool {
        matches!(
            self,
            Self::AwaitBok | Self::AwaitDecap | Self::AwaitCok | Self::AwaitRecap
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Halted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::SendB => "SendB",
            Self::AwaitBok => "AwaitBok",
            Self::AwaitDecap => "AwaitDecap",
            Self::SendC => "SendC",
            Self::AwaitCok => "AwaitCok",
            Self::AwaitRecap => "AwaitRecap",
            Self::Complete => "Complete",
            Self::Halted => "Halted",
        }
    }

    /// State reached when this state's step succeeds
    fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::SendB),
            Self::SendB => Some(Self::AwaitBok),
            Self::AwaitBok => Some(Self::AwaitDecap),
            Self::AwaitDecap => Some(Self::SendC),
            Self::SendC => Some(Self::AwaitCok),
            Self::AwaitCok => Some(Self::AwaitRecap),
            Self::AwaitRecap => Some(Self::Complete),
            Self::Complete => Some(Self::Idle),
            Self::Halted => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened in the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Start a new cycle (`Idle`)
    Begin,

    /// The step command was written (`SendB`, `SendC`)
    Sent,

    /// Writing the step command failed
    SendFailed(String),

    /// A non-heartbeat response was classified (`Await*`)
    Response(Outcome),

    /// The step window elapsed without a response
    Elapsed,

    /// The channel broke while waiting
    ReadFailed(String),

    /// Loop back after a completed cycle (`Complete`)
    Restart,
}

impl Input {
    fn name(&self) -> &'static str {
        match self {
            Self::Begin => "Begin",
            Self::Sent => "Sent",
            Self::SendFailed(_) => "SendFailed",
            Self::Response(_) => "Response",
            Self::Elapsed => "Elapsed",
            Self::ReadFailed(_) => "ReadFailed",
            Self::Restart => "Restart",
        }
    }
}

/// Result of applying an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Advance(State),
    Halt(HaltReason),
}

/// Decide the next state.
///
/// Exactly one of advance or halt is produced for every valid input;
/// inputs that make no sense in `state` are rejected.
pub fn transition(state: State, input: Input) -> Result<Transition> {
    let invalid = |input: &Input| Error::InvalidTransition {
        state,
        input: input.name(),
    };

    let advance = || state.successor().map(Transition::Advance);

    let next = match (&input, state) {
        (Input::Begin, State::Idle) => advance(),
        (Input::Restart, State::Complete) => advance(),
        (Input::Sent, s) if s.is_send() => advance(),
        (Input::SendFailed(reason), s) if s.is_send() => {
            Some(Transition::Halt(HaltReason::TransportFailure(reason.clone())))
        }
        (Input::Response(outcome), s) if s.is_await() => match outcome {
            Outcome::Success(_) => advance(),
            Outcome::ExpectedError(token) => {
                Some(Transition::Halt(HaltReason::ExpectedError(token.clone())))
            }
            Outcome::Unexpected(text) => {
                Some(Transition::Halt(HaltReason::UnexpectedResponse(text.clone())))
            }
        },
        (Input::Elapsed, s) if s.is_await() => s
            .step()
            .map(|step| Transition::Halt(HaltReason::Timeout { seconds: step.timeout_secs() })),
        (Input::ReadFailed(reason), s) if s.is_await() => {
            Some(Transition::Halt(HaltReason::TransportFailure(reason.clone())))
        }
        _ => None,
    };

    next.ok_or_else(|| invalid(&input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AWAITS: [State; 4] = [State::AwaitBok, State::AwaitDecap, State::AwaitCok, State::AwaitRecap];

    fn success(state: State) -> Input {
        let token = state.step().map(|s| s.success).unwrap_or_default();
        Input::Response(Outcome::Success(token.to_string()))
    }

    #[test]
    fn test_happy_path() {
        let mut state = State::Idle;
        let mut visited = vec![state];

        while state != State::Complete {
            let input = if state == State::Idle {
                Input::Begin
            } else if state.is_send() {
                Input::Sent
            } else {
                success(state)
            };

            match transition(state, input).unwrap() {
                Transition::Advance(next) => state = next,
                Transition::Halt(reason) => panic!("halted: {}", reason),
            }
            visited.push(state);
        }

        assert_eq!(
            visited,
            vec![
                State::Idle,
                State::SendB,
                State::AwaitBok,
                State::AwaitDecap,
                State::SendC,
                State::AwaitCok,
                State::AwaitRecap,
                State::Complete,
            ]
        );
    }

    #[test]
    fn test_complete_restarts() {
        assert_eq!(
            transition(State::Complete, Input::Restart).unwrap(),
            Transition::Advance(State::Idle)
        );
    }

    #[test]
    fn test_elapsed_always_times_out() {
        for state in AWAITS {
            let expected = state.step().unwrap().timeout_secs();
            assert_eq!(
                transition(state, Input::Elapsed).unwrap(),
                Transition::Halt(HaltReason::Timeout { seconds: expected })
            );
        }
    }

    #[test]
    fn test_error_token_halts() {
        let input = Input::Response(Outcome::ExpectedError("STATUS_WRONG_TUBE".into()));
        assert_eq!(
            transition(State::AwaitDecap, input).unwrap(),
            Transition::Halt(HaltReason::ExpectedError("STATUS_WRONG_TUBE".into()))
        );
    }

    #[test]
    fn test_unexpected_halts() {
        let input = Input::Response(Outcome::Unexpected("GARBAGE".into()));
        assert_eq!(
            transition(State::AwaitCok, input).unwrap(),
            Transition::Halt(HaltReason::UnexpectedResponse("GARBAGE".into()))
        );
    }

    #[test]
    fn test_send_failure_halts() {
        assert_eq!(
            transition(State::SendC, Input::SendFailed("port gone".into())).unwrap(),
            Transition::Halt(HaltReason::TransportFailure("port gone".into()))
        );
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(transition(State::Idle, Input::Sent).is_err());
        assert!(transition(State::SendB, Input::Elapsed).is_err());
        assert!(transition(State::AwaitBok, Input::Begin).is_err());
        assert!(transition(State::Complete, Input::Begin).is_err());

        for input in [Input::Begin, Input::Restart, Input::Elapsed] {
            assert!(transition(State::Halted, input).is_err());
        }
    }

    #[test]
    fn test_step_mapping() {
        assert_eq!(State::SendB.step().unwrap().number, 1);
        assert_eq!(State::AwaitBok.step().unwrap().number, 1);
        assert_eq!(State::AwaitDecap.step().unwrap().number, 2);
        assert_eq!(State::AwaitCok.step().unwrap().number, 3);
        assert_eq!(State::AwaitRecap.step().unwrap().number, 4);
        assert!(State::Idle.step().is_none());
    }
}
