//! The fixed protocol table

use std::time::Duration;

use crate::constants::{commands, tokens};
use crate::response::Response;

/// Classification of a response against a step's acceptance set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The step's success token
    Success(String),

    /// One of the step's known failure tokens
    ExpectedError(String),

    /// Anything else
    Unexpected(String),
}

/// One entry of the protocol table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// 1-based position in the table
    pub number: usize,

    /// Command sent before waiting; `None` for pure wait steps
    pub command: Option<&'static str>,

    pub success: &'static str,
    pub errors: &'static [&'static str],
    pub timeout: Duration,
}

impl Step {
    /// Classify a (non-heartbeat) response
    pub fn classify(&self, response: &Response) -> Outcome {
        let text = response.as_str();

        if text == self.success {
            Outcome::Success(text.to_string())
        } else if self.errors.contains(&text) {
            Outcome::ExpectedError(text.to_string())
        } else {
            Outcome::Unexpected(text.to_string())
        }
    }

    /// Response window in whole seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

/// Step 1: send `B`, expect `BOK`
pub const DECAP_REQUEST: Step = Step {
    number: 1,
    command: Some(commands::B),
    success: tokens::BOK,
    errors: &[tokens::STATUS_WRONG_TUBE, tokens::BNO],
    timeout: Duration::from_secs(60),
};

/// Step 2: wait for the decap result
pub const DECAP_RESULT: Step = Step {
    number: 2,
    command: None,
    success: tokens::DECAP_OK,
    errors: &[tokens::STATUS_WRONG_TUBE, tokens::DECAP_ERR],
    timeout: Duration::from_secs(120),
};

/// Step 3: send `C`, expect `COK`
pub const RECAP_REQUEST: Step = Step {
    number: 3,
    command: Some(commands::C),
    success: tokens::COK,
    errors: &[tokens::CNO],
    timeout: Duration::from_secs(60),
};

/// Step 4: wait for the recap result
pub const RECAP_RESULT: Step = Step {
    number: 4,
    command: None,
    success: tokens::RECAP_OK,
    errors: &[tokens::RECAP_ERR, tokens::STATUS_WRONG_TUBE],
    timeout: Duration::from_secs(120),
};

/// The whole protocol, in order
pub const PROTOCOL: [Step; 4] = [DECAP_REQUEST, DECAP_RESULT, RECAP_REQUEST, RECAP_RESULT];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_order() {
        let numbers: Vec<usize> = PROTOCOL.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(PROTOCOL[0].command, Some("B"));
        assert_eq!(PROTOCOL[1].command, None);
        assert_eq!(PROTOCOL[2].command, Some("C"));
        assert_eq!(PROTOCOL[3].command, None);
    }

    #[test]
    fn test_success_and_errors_disjoint() {
        for step in PROTOCOL {
            assert!(!step.errors.contains(&step.success), "step {}", step.number);
        }
    }

    #[test]
    fn test_timeouts() {
        let secs: Vec<u64> = PROTOCOL.iter().map(Step::timeout_secs).collect();
        assert_eq!(secs, vec![60, 120, 60, 120]);
    }

    #[test]
    fn test_classify() {
        let step = DECAP_RESULT;
        assert_eq!(
            step.classify(&Response::parse("DECAP_OK\r\n")),
            Outcome::Success("DECAP_OK".into())
        );
        assert_eq!(
            step.classify(&Response::parse("STATUS_WRONG_TUBE")),
            Outcome::ExpectedError("STATUS_WRONG_TUBE".into())
        );
        assert_eq!(
            step.classify(&Response::parse("RECAP_OK")),
            Outcome::Unexpected("RECAP_OK".into())
        );
    }

    #[test]
    fn test_cno_only_expected_in_recap_request() {
        let cno = Response::parse("CNO");
        assert_eq!(DECAP_REQUEST.classify(&cno), Outcome::Unexpected("CNO".into()));
        assert_eq!(RECAP_REQUEST.classify(&cno), Outcome::ExpectedError("CNO".into()));
    }
}
