//! Device simulator
//!
//! Models how the decapper answers the host: `B` is acknowledged with
//! `BOK`, followed by `DECAP_OK` once the cap is off; `C` is acknowledged
//! with `COK`, followed by `RECAP_OK`. Faults substitute the matching
//! failure token.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use tubelink_core::constants::{HEARTBEAT, commands, tokens};
use tubelink_core::sanitize;

use crate::script::{ReplyQueue, Transcript};
use crate::{Reply, Transport, error::*};

/// Failure the simulated device injects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `STATUS_WRONG_TUBE` instead of `BOK`
    WrongTube,
    /// `BNO` instead of `BOK`
    RejectB,
    /// `DECAP_ERR` instead of `DECAP_OK`
    DecapError,
    /// `CNO` instead of `COK`
    RejectC,
    /// `RECAP_ERR` instead of `RECAP_OK`
    RecapError,
    /// Never answers
    Silent,
}

impl Fault {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WrongTube => "wrong-tube",
            Self::RejectB => "reject-b",
            Self::DecapError => "decap-error",
            Self::RejectC => "reject-c",
            Self::RecapError => "recap-error",
            Self::Silent => "silent",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fault {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wrong-tube" => Ok(Self::WrongTube),
            "reject-b" => Ok(Self::RejectB),
            "decap-error" => Ok(Self::DecapError),
            "reject-c" => Ok(Self::RejectC),
            "recap-error" => Ok(Self::RecapError),
            "silent" => Ok(Self::Silent),
            other => Err(format!(
                "invalid fault '{}', expected wrong-tube|reject-b|decap-error|reject-c|recap-error|silent",
                other
            )),
        }
    }
}

/// Response model of the device
#[derive(Debug, Clone)]
pub struct Simulator {
    step_delay: Duration,
    heartbeats: usize,
    fault: Option<Fault>,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            step_delay: Duration::from_secs(5),
            heartbeats: 0,
            fault: None,
        }
    }

    /// Time between the acknowledgement and the mechanical result
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Number of `NO` heartbeats sent while the mechanism is busy
    pub fn with_heartbeats(mut self, count: usize) -> Self {
        self.heartbeats = count;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Device output for one host line
    pub fn respond(&self, line: &str) -> Vec<Reply> {
        if self.fault == Some(Fault::Silent) {
            return Vec::new();
        }

        let command = sanitize(line);
        let (ack, result) = match command.as_str() {
            commands::B => (
                self.substitute(tokens::BOK),
                self.substitute(tokens::DECAP_OK),
            ),
            commands::C => (
                self.substitute(tokens::COK),
                self.substitute(tokens::RECAP_OK),
            ),
            other => {
                debug!("Simulator ignoring {:?}", other);
                return Vec::new();
            }
        };

        let mut replies = vec![Reply::line(ack)];

        // A rejected request never reaches the mechanical stage
        if ack == tokens::BOK || ack == tokens::COK {
            let slice = self.step_delay / (self.heartbeats as u32 + 1);
            for _ in 0..self.heartbeats {
                replies.push(Reply::Pause(slice));
                replies.push(Reply::line(HEARTBEAT));
            }
            replies.push(Reply::Pause(slice));
            replies.push(Reply::line(result));
        }

        trace!("Simulator answers {:?} with {:?}", command, replies);
        replies
    }

    fn substitute(&self, token: &'static str) -> &'static str {
        match (self.fault, token) {
            (Some(Fault::WrongTube), tokens::BOK) => tokens::STATUS_WRONG_TUBE,
            (Some(Fault::RejectB), tokens::BOK) => tokens::BNO,
            (Some(Fault::DecapError), tokens::DECAP_OK) => tokens::DECAP_ERR,
            (Some(Fault::RejectC), tokens::COK) => tokens::CNO,
            (Some(Fault::RecapError), tokens::RECAP_OK) => tokens::RECAP_ERR,
            _ => token,
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory channel to a simulated device
#[derive(Debug)]
pub struct SimulatedTransport {
    simulator: Simulator,
    queue: ReplyQueue,
    transcript: Transcript,
}

impl SimulatedTransport {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            simulator,
            queue: ReplyQueue::default(),
            transcript: Transcript::default(),
        }
    }

    /// Handle for inspecting the channel after the transport is moved
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }
        self.transcript.set_open();
        Ok(())
    }

    async fn close(&mut self) {
        if self.transcript.set_closed() {
            self.queue.clear();
        }
    }

    fn is_open(&self) -> bool {
        self.transcript.is_open()
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        if !self.is_open() {
            return Err(Error::not_open());
        }
        self.transcript.record_sent(line);
        self.queue.extend(self.simulator.respond(line));
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        Ok(self.queue.next_line(timeout).await.map(|line| line + "\n"))
    }

    fn address(&self) -> String {
        "simulator".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(replies: &[Reply]) -> Vec<&str> {
        replies
            .iter()
            .filter_map(|r| match r {
                Reply::Line(line) => Some(line.as_str()),
                Reply::Pause(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_default_responses() {
        let sim = Simulator::new();
        assert_eq!(lines(&sim.respond("B\n")), vec!["BOK", "DECAP_OK"]);
        assert_eq!(lines(&sim.respond("C")), vec!["COK", "RECAP_OK"]);
        assert!(sim.respond("X").is_empty());
    }

    #[test]
    fn test_step_delay_between_ack_and_result() {
        let sim = Simulator::new().with_step_delay(Duration::from_secs(4));
        assert_eq!(
            sim.respond("B"),
            vec![
                Reply::line("BOK"),
                Reply::Pause(Duration::from_secs(4)),
                Reply::line("DECAP_OK"),
            ]
        );
    }

    #[test]
    fn test_heartbeats() {
        let sim = Simulator::new().with_heartbeats(2);
        assert_eq!(lines(&sim.respond("C")), vec!["COK", "NO", "NO", "RECAP_OK"]);
    }

    #[test]
    fn test_faults() {
        let respond = |fault, cmd| -> Vec<String> {
            let sim = Simulator::new().with_fault(fault);
            lines(&sim.respond(cmd)).into_iter().map(String::from).collect()
        };

        assert_eq!(respond(Fault::WrongTube, "B"), vec!["STATUS_WRONG_TUBE"]);
        assert_eq!(respond(Fault::RejectB, "B"), vec!["BNO"]);
        assert_eq!(respond(Fault::DecapError, "B"), vec!["BOK", "DECAP_ERR"]);
        assert_eq!(respond(Fault::RejectC, "C"), vec!["CNO"]);
        assert_eq!(respond(Fault::RecapError, "C"), vec!["COK", "RECAP_ERR"]);
        assert!(respond(Fault::Silent, "B").is_empty());
    }

    #[test]
    fn test_fault_parse() {
        assert_eq!("decap-error".parse::<Fault>(), Ok(Fault::DecapError));
        assert_eq!("SILENT".parse::<Fault>(), Ok(Fault::Silent));
        assert!("meltdown".parse::<Fault>().is_err());

        for fault in [Fault::WrongTube, Fault::RejectB, Fault::RecapError] {
            assert_eq!(fault.to_string().parse::<Fault>(), Ok(fault));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_transport_reacts_to_commands() {
        let mut transport = SimulatedTransport::new(Simulator::new());
        let transcript = transport.transcript();
        transport.open().await.unwrap();

        let timeout = Duration::from_secs(10);
        assert_eq!(transport.read_line(timeout).await.unwrap(), None);

        transport.send_line("B").await.unwrap();
        assert_eq!(transport.read_line(timeout).await.unwrap().as_deref(), Some("BOK\n"));
        assert_eq!(transport.read_line(timeout).await.unwrap().as_deref(), Some("DECAP_OK\n"));

        transport.close().await;
        assert_eq!(transcript.sent(), vec!["B"]);
        assert_eq!(transcript.closes(), 1);
    }
}
