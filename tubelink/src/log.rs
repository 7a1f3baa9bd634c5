//! Session log
//!
//! An append-only, timestamped text record of one run. Every line is
//! flushed as it is written so the file survives a crash or power loss
//! mid-run. Lines are mirrored to `tracing` for the console.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use tracing::{info, warn};
use tubelink_types::RunSummary;

use crate::error::Result;
use crate::event::Event;

/// Destination for engine events
pub trait EventSink: Send {
    /// Append one event
    fn record(&mut self, event: &Event);

    /// Append the summary block and release the sink
    fn finish(&mut self, summary: &RunSummary);
}

/// File-backed session log
pub struct SessionLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl SessionLog {
    /// Create `log_<YYYYmmdd_HHMMSS>.txt` in `dir` and write the header line
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let started = Local::now();
        let path = dir
            .as_ref()
            .join(format!("log_{}.txt", started.format("%Y%m%d_%H%M%S")));

        let mut log = Self::open(path)?;
        log.record(&Event::LogStarted(started));
        Ok(log)
    }

    /// Open (or create) a log file for appending
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, text: &str) {
        let Some(writer) = self.writer.as_mut() else {
            warn!("Session log already finished, dropping: {}", text);
            return;
        };

        let stamp = Local::now().format("[%Y-%m-%d %H:%M:%S]");
        let result = writeln!(writer, "{} {}", stamp, text).and_then(|_| writer.flush());

        if let Err(e) = result {
            warn!("Failed to write {}: {}", self.path.display(), e);
        }
    }
}

impl EventSink for SessionLog {
    fn record(&mut self, event: &Event) {
        if event.is_failure() {
            warn!("{}", event);
        } else {
            info!("{}", event);
        }
        self.write_line(&event.to_string());
    }

    fn finish(&mut self, summary: &RunSummary) {
        for line in summary.lines() {
            info!("{}", line);
            self.write_line(&line);
        }

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush {}: {}", self.path.display(), e);
            }
        }
    }
}

/// In-memory sink; clones share the same lines
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<MemoryLogInner>>,
}

#[derive(Debug, Default)]
struct MemoryLogInner {
    lines: Vec<String>,
    events: Vec<Event>,
    finished: bool,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines, without timestamps
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    /// Number of lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.inner
            .lock()
            .lines
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }
}

impl EventSink for MemoryLog {
    fn record(&mut self, event: &Event) {
        let mut inner = self.inner.lock();
        inner.lines.push(event.to_string());
        inner.events.push(event.clone());
    }

    fn finish(&mut self, summary: &RunSummary) {
        let mut inner = self.inner.lock();
        inner.lines.extend(summary.lines());
        inner.finished = true;
    }
}
