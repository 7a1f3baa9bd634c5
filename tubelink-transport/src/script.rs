//! Scripted transport
//!
//! Plays back a fixed device transcript, independent of what the host
//! sends. Used to drive the engine deterministically in tests; pair it with
//! a paused tokio clock so long step windows elapse instantly.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::trace;

use crate::{Transport, error::*};

/// One entry of a device transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A line as it appears on the wire (terminator optional)
    Line(String),

    /// Device stays quiet for this long
    Pause(Duration),
}

impl Reply {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Line(text.to_string())
    }
}

/// Queue of pending device output, consumed with real (or paused) time
#[derive(Debug, Default)]
pub(crate) struct ReplyQueue {
    replies: VecDeque<Reply>,
}

impl ReplyQueue {
    pub(crate) fn extend(&mut self, replies: impl IntoIterator<Item = Reply>) {
        self.replies.extend(replies);
    }

    pub(crate) fn clear(&mut self) {
        self.replies.clear();
    }

    /// Next line within `timeout`, honouring pauses.
    ///
    /// A pause longer than the timeout is shortened by the timeout and left
    /// at the front of the queue. An empty queue is silence.
    pub(crate) async fn next_line(&mut self, timeout: Duration) -> Option<String> {
        let mut remaining = timeout;

        loop {
            match self.replies.pop_front() {
                Some(Reply::Line(line)) => return Some(line),
                Some(Reply::Pause(pause)) if pause > remaining => {
                    sleep(remaining).await;
                    self.replies.push_front(Reply::Pause(pause - remaining));
                    return None;
                }
                Some(Reply::Pause(pause)) => {
                    sleep(pause).await;
                    remaining -= pause;
                }
                None => {
                    sleep(remaining).await;
                    return None;
                }
            }
        }
    }
}

/// Shared view of what happened on a scripted or simulated channel
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    inner: Arc<Mutex<TranscriptInner>>,
}

#[derive(Debug, Default)]
struct TranscriptInner {
    sent: Vec<String>,
    opens: usize,
    closes: usize,
    open: bool,
}

impl Transcript {
    /// Lines written by the host, without terminators
    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().sent.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    /// Number of successful opens
    pub fn opens(&self) -> usize {
        self.inner.lock().opens
    }

    /// Number of closes of an open channel
    pub fn closes(&self) -> usize {
        self.inner.lock().closes
    }

    pub(crate) fn record_sent(&self, line: &str) {
        self.inner.lock().sent.push(line.to_string());
    }

    pub(crate) fn set_open(&self) {
        let mut inner = self.inner.lock();
        inner.open = true;
        inner.opens += 1;
    }

    /// Returns whether the channel was open
    pub(crate) fn set_closed(&self) -> bool {
        let mut inner = self.inner.lock();
        let was_open = inner.open;
        if was_open {
            inner.open = false;
            inner.closes += 1;
        }
        was_open
    }
}

/// Transport that replays a fixed transcript
#[derive(Debug)]
pub struct ScriptedTransport {
    queue: ReplyQueue,
    transcript: Transcript,
    fail_open: bool,
    fail_writes: bool,
}

impl ScriptedTransport {
    /// Create a transport that will emit `replies` in order
    pub fn new<I, R>(replies: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Reply>,
    {
        let mut queue = ReplyQueue::default();
        queue.extend(replies.into_iter().map(Into::into));

        Self {
            queue,
            transcript: Transcript::default(),
            fail_open: false,
            fail_writes: false,
        }
    }

    /// Make `open` fail as if the port were busy
    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Make every `send_line` fail
    pub fn with_write_failure(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Handle for inspecting the channel after the transport is moved
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }
        if self.fail_open {
            return Err(Error::Connection {
                address: self.address(),
                reason: "port busy".into(),
            });
        }
        self.transcript.set_open();
        Ok(())
    }

    async fn close(&mut self) {
        self.transcript.set_closed();
    }

    fn is_open(&self) -> bool {
        self.transcript.is_open()
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        if !self.is_open() {
            return Err(Error::not_open());
        }
        if self.fail_writes {
            return Err(Error::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }

        trace!("Scripted send: {}", line);
        self.transcript.record_sent(line);
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        Ok(self.queue.next_line(timeout).await)
    }

    fn address(&self) -> String {
        "script".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_scripted_lines_in_order() {
        let mut transport = ScriptedTransport::new(["BOK", "DECAP_OK"]);
        transport.open().await.unwrap();

        let timeout = Duration::from_secs(1);
        assert_eq!(transport.read_line(timeout).await.unwrap().as_deref(), Some("BOK"));
        assert_eq!(transport.read_line(timeout).await.unwrap().as_deref(), Some("DECAP_OK"));
        assert_eq!(transport.read_line(timeout).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_waits_full_timeout() {
        let mut transport = ScriptedTransport::new(Vec::<Reply>::new());
        transport.open().await.unwrap();

        let start = Instant::now();
        assert_eq!(transport.read_line(Duration::from_secs(60)).await.unwrap(), None);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_pause_spans_reads() {
        let mut transport = ScriptedTransport::new([
            Reply::Pause(Duration::from_secs(3)),
            Reply::line("COK"),
        ]);
        transport.open().await.unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(transport.read_line(timeout).await.unwrap(), None);
        assert_eq!(transport.read_line(timeout).await.unwrap().as_deref(), Some("COK"));
    }

    #[tokio::test]
    async fn test_transcript_records_sends() {
        let mut transport = ScriptedTransport::new(Vec::<Reply>::new());
        let transcript = transport.transcript();

        assert!(transport.send_line("B").await.is_err());

        transport.open().await.unwrap();
        transport.send_line("B").await.unwrap();
        transport.send_line("C").await.unwrap();
        transport.close().await;
        transport.close().await;

        assert_eq!(transcript.sent(), vec!["B", "C"]);
        assert_eq!(transcript.opens(), 1);
        assert_eq!(transcript.closes(), 1);
        assert!(!transcript.is_open());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let mut transport = ScriptedTransport::new(["BOK"]).with_open_failure();
        assert!(matches!(transport.open().await, Err(Error::Connection { .. })));

        let mut transport = ScriptedTransport::new(["BOK"]).with_write_failure();
        transport.open().await.unwrap();
        assert!(matches!(transport.send_line("B").await, Err(Error::Write(_))));
    }
}
