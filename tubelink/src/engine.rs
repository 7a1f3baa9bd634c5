//! Handshake engine
//!
//! Drives the fixed decap/recap handshake over a [`Transport`], one state
//! at a time, and reports everything it does to an [`EventSink`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace, warn};

use tubelink_core::{Halt, Input, Response, Session, State, Step, Transition};
use tubelink_transport::Transport;
use tubelink_types::{HaltReason, RunEnd, RunSummary};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::log::EventSink;

/// Cloneable flag that ends the run at the next cycle boundary
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Request the run to end
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEnd {
    Completed { cycles: u64 },
    Halted(Halt),
}

/// Handshake engine
///
/// Owns the transport and the session for the whole run.
///
/// # Examples
///
/// ```no_run
/// use tubelink::{Engine, SessionLog};
/// use tubelink_transport::SerialTransport;
///
/// #[tokio::main]
/// async fn main() -> tubelink::Result<()> {
///     let transport = SerialTransport::new("/dev/ttyUSB0", 9600);
///     let log = SessionLog::create(".")?;
///
///     let mut engine = Engine::new(Box::new(transport), Box::new(log));
///     let summary = engine.run().await;
///     println!("{}", summary);
///     Ok(())
/// }
/// ```
pub struct Engine {
    transport: Box<dyn Transport>,
    sink: Box<dyn EventSink>,
    session: Session,
    config: EngineConfig,
    stop: StopSignal,

    /// Why the channel could not be opened
    connect_error: Option<String>,

    /// Engine error that ended the run outside the state machine
    abort_error: Option<String>,

    /// Set once the run has been finalized
    summary: Option<RunSummary>,
}

impl Engine {
    pub fn new(transport: Box<dyn Transport>, sink: Box<dyn EventSink>) -> Self {
        Self {
            transport,
            sink,
            session: Session::new(),
            config: EngineConfig::default(),
            stop: StopSignal::default(),
            connect_error: None,
            abort_error: None,
            summary: None,
        }
    }

    /// Set engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing stop signal instead of the engine's own
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Get engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle that can stop the run from elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Check if the channel is open
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Open the channel
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.transport.address());

        match self.transport.open().await {
            Ok(()) => {
                self.emit(Event::Connected {
                    address: self.transport.address(),
                    baud_rate: self.transport.baud_rate(),
                });
                self.connect_error = None;
                Ok(())
            }
            Err(e) => {
                self.emit(Event::ConnectionFailed(e.to_string()));
                self.connect_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Perform the current state's action and apply one transition.
    ///
    /// Returns the new state.
    pub async fn step(&mut self) -> Result<State> {
        let state = self.session.state();

        if state == State::Halted {
            return Err(self.halted_error());
        }
        self.ensure_connected()?;

        let input = match (state, state.step()) {
            (State::Idle, _) => {
                self.emit(Event::CycleStarted(self.session.cycles_completed() + 1));
                Input::Begin
            }
            (State::Complete, _) => Input::Restart,
            (s, Some(step)) if s.is_send() => self.send(step).await,
            (s, Some(step)) if s.is_await() => self.await_response(step).await,
            _ => return Err(self.halted_error()),
        };

        match self.session.apply(input)? {
            Transition::Advance(next) => {
                if let Some(step) = state.step().filter(|_| state.is_await()) {
                    self.emit(Event::StepSucceeded {
                        token: step.success.to_string(),
                        next,
                    });
                }
                if next == State::Complete {
                    self.emit(Event::CycleCompleted {
                        total: self.session.cycles_completed(),
                    });
                }
            }
            Transition::Halt(reason) => self.report_halt(state, reason),
        }

        Ok(self.session.state())
    }

    /// Step until the cycle completes or the session halts
    pub async fn run_cycle(&mut self) -> Result<CycleEnd> {
        loop {
            match self.step().await? {
                State::Complete => {
                    return Ok(CycleEnd::Completed {
                        cycles: self.session.cycles_completed(),
                    });
                }
                State::Halted => {
                    return self
                        .session
                        .halt()
                        .cloned()
                        .map(CycleEnd::Halted)
                        .ok_or_else(|| self.halted_error());
                }
                _ => {}
            }
        }
    }

    /// Connect, run cycles until halted or stopped, then shut down.
    ///
    /// Failures end the run; they are reported through the summary and the
    /// session log, never returned.
    pub async fn run(&mut self) -> RunSummary {
        if !self.transport.is_open() && self.connect().await.is_err() {
            return self.shutdown().await;
        }

        while !self.should_stop() {
            match self.run_cycle().await {
                Ok(CycleEnd::Completed { cycles }) => debug!("Cycle {} done", cycles),
                Ok(CycleEnd::Halted(_)) => break,
                Err(e) => {
                    warn!("Run aborted: {}", e);
                    self.emit(Event::RunAborted(e.to_string()));
                    self.abort_error = Some(e.to_string());
                    break;
                }
            }

            if !self.should_stop() {
                sleep(self.config.inter_cycle_pause).await;
            }
        }

        if let Some(max) = self.config.max_cycles {
            if self.session.cycles_completed() >= max {
                info!("Reached cycle limit of {}", max);
            }
        }

        self.shutdown().await
    }

    /// Close the channel and finalize the log.
    ///
    /// Safe to call more than once; later calls return the first summary.
    pub async fn shutdown(&mut self) -> RunSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        if self.stop.is_stopped() && self.session.is_running() {
            self.emit(Event::StopRequested);
        }

        let address = self.transport.address();
        if self.transport.is_open() {
            self.transport.close().await;
            self.emit(Event::ConnectionClosed { address });
        } else {
            self.emit(Event::NoActiveConnection { address });
        }

        let end = match (&self.connect_error, self.session.halt(), &self.abort_error) {
            (Some(reason), _, _) => RunEnd::NotStarted(reason.clone()),
            (None, Some(halt), _) => RunEnd::Halted {
                state: halt.state.to_string(),
                reason: halt.reason.clone(),
            },
            (None, None, Some(reason)) => RunEnd::Aborted(reason.clone()),
            (None, None, None) => RunEnd::Stopped,
        };

        let summary = RunSummary {
            started_at: self.session.started_at(),
            finished_at: Local::now(),
            cycles_completed: self.session.cycles_completed(),
            end,
        };

        self.sink.finish(&summary);
        info!("Run finished: {}", summary);

        self.summary = Some(summary.clone());
        summary
    }

    // Helper methods

    fn emit(&mut self, event: Event) {
        self.sink.record(&event);
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.transport.is_open() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    fn should_stop(&self) -> bool {
        if self.stop.is_stopped() {
            return true;
        }

        self.config
            .max_cycles
            .is_some_and(|max| self.session.cycles_completed() >= max)
    }

    fn halted_error(&self) -> Error {
        let state = self
            .session
            .halt()
            .map_or(self.session.state(), |halt| halt.state);
        tubelink_core::Error::SessionHalted { state }.into()
    }

    async fn send(&mut self, step: &Step) -> Input {
        let Some(command) = step.command else {
            return Input::SendFailed(format!("step {} has no command", step.number));
        };

        match self.transport.send_line(command).await {
            Ok(()) => {
                self.emit(Event::CommandSent(command.to_string()));
                Input::Sent
            }
            Err(e) => Input::SendFailed(e.to_string()),
        }
    }

    /// Wait for a non-heartbeat response within the step window.
    ///
    /// Heartbeats never move the deadline.
    async fn await_response(&mut self, step: &Step) -> Input {
        let deadline = Instant::now() + step.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Input::Elapsed;
            }

            let raw = match self.transport.read_line(remaining).await {
                Ok(Some(raw)) => raw,
                Ok(None) => return Input::Elapsed,
                Err(e) => return Input::ReadFailed(e.to_string()),
            };

            let response = Response::parse(&raw);
            if response.is_heartbeat() {
                trace!("Device not ready ({:?})", response.as_str());
                let pause = self
                    .config
                    .heartbeat_delay
                    .min(deadline.saturating_duration_since(Instant::now()));
                sleep(pause).await;
                continue;
            }

            self.emit(Event::Received(response.to_string()));
            return Input::Response(step.classify(&response));
        }
    }

    fn report_halt(&mut self, state: State, reason: HaltReason) {
        let cause = match &reason {
            HaltReason::Timeout { seconds } => Event::Timeout { seconds: *seconds },
            HaltReason::ExpectedError(token) => Event::ErrorReceived(token.clone()),
            HaltReason::UnexpectedResponse(text) => Event::UnexpectedResponse {
                expected: state.step().map_or("", |step| step.success),
                text: text.clone(),
            },
            HaltReason::TransportFailure(detail) => Event::TransportFailure(detail.clone()),
        };

        warn!(state = %state, reason = reason.kind(), "Handshake halted");
        self.emit(cause);
        self.emit(Event::Halted { state, reason });
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.summary.is_none() && self.transport.is_open() {
            warn!("Engine dropped without shutdown");
        }
    }
}
