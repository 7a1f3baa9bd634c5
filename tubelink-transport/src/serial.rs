//! Serial transport
//!
//! The device talks plain ASCII lines terminated by `\n` at 9600 baud,
//! 8 data bits, no parity, 1 stop bit.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, trace, warn};

use tubelink_core::constants::LINE_TERMINATOR;

use crate::{Transport, error::*};

/// Serial port configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port path (`/dev/ttyUSB0`, `COM5`)
    pub port: String,
    pub baud_rate: u32,

    /// Timeout of the underlying `serialport` handle for blocking reads.
    ///
    /// [`Transport::read_line`] is bounded by its own `timeout` argument
    /// instead; this only applies below the async stream.
    pub read_timeout: Duration,

    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            read_timeout: Duration::from_secs(1),
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the driver-level blocking read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Serial transport
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,

    /// Bytes received but not yet terminated by `\n`
    pending: BytesMut,
}

impl SerialTransport {
    /// Create new serial transport with default line settings
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self::with_config(SerialConfig::new(port).with_baud_rate(baud_rate))
    }

    pub fn with_config(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
            pending: BytesMut::with_capacity(256),
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Split the first complete line off the pending buffer
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line = self.pending.split_to(end + 1);
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        let config = &self.config;

        debug!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "Opening serial port"
        );

        let stream = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|e| Error::Connection {
                address: config.port.clone(),
                reason: e.to_string(),
            })?;

        debug!("Opened {}", config.port);

        self.pending.clear();
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Closing {}...", self.config.port);
        }
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(Error::not_open)?;

        let data = format!("{}{}", line, LINE_TERMINATOR);
        trace!("Sending {} bytes: {:?}", data.len(), data);

        stream.write_all(data.as_bytes()).await.map_err(Error::Write)?;
        stream.flush().await.map_err(Error::Write)?;

        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(line) = self.take_line() {
                trace!("Received line: {:?}", line);
                return Ok(Some(line));
            }

            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            // read_buf is cancel safe; partial lines stay in `pending`
            match timeout_at(deadline, stream.read_buf(&mut self.pending)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    warn!("{} reached end of stream", self.config.port);
                    return Err(Error::ConnectionClosed);
                }
                Ok(Ok(n)) => trace!("Read {} bytes", n),
                Ok(Err(e)) => {
                    warn!("Read error on {}: {}", self.config.port, e);
                    return Err(Error::Io(e));
                }
            }
        }
    }

    fn address(&self) -> String {
        self.config.port.clone()
    }

    fn baud_rate(&self) -> Option<u32> {
        Some(self.config.baud_rate)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while still open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("COM5");
        assert_eq!(config.port, "COM5");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
    }

    #[test]
    fn test_read_timeout_is_driver_setting() {
        let config = SerialConfig::new("COM5").with_read_timeout(Duration::from_millis(250));
        let transport = SerialTransport::with_config(config);

        assert_eq!(transport.config().read_timeout, Duration::from_millis(250));
        assert_eq!(transport.baud_rate(), Some(9600));
    }

    #[test]
    fn test_serial_transport_create() {
        let transport = SerialTransport::new("/dev/ttyUSB0", 19200);
        assert!(!transport.is_open());
        assert_eq!(transport.address(), "/dev/ttyUSB0");
        assert_eq!(transport.baud_rate(), Some(19200));
    }

    #[test]
    fn test_take_line_keeps_partial() {
        let mut transport = SerialTransport::new("/dev/null", 9600);
        transport.pending.extend_from_slice(b"BOK\r\nDEC");

        assert_eq!(transport.take_line().as_deref(), Some("BOK\r\n"));
        assert_eq!(transport.take_line(), None);

        transport.pending.extend_from_slice(b"AP_OK\n");
        assert_eq!(transport.take_line().as_deref(), Some("DECAP_OK\n"));
    }

    #[tokio::test]
    async fn test_send_without_open_is_write_error() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 9600);
        let result = transport.send_line("B").await;
        assert!(matches!(result, Err(Error::Write(_))));
    }

    #[tokio::test]
    async fn test_read_without_open() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 9600);
        let result = transport.read_line(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_open_missing_port() {
        let mut transport = SerialTransport::new("/dev/tubelink-missing-port", 9600);
        let result = transport.open().await;
        assert!(matches!(result, Err(Error::Connection { .. })));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 9600);
        transport.close().await;
        transport.close().await;
        assert!(!transport.is_open());
    }
}
