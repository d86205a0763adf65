//! Serial link abstraction
//!
//! The render pipeline only needs a byte sink with blocking writes and an
//! error-reporting contract; [`PanelPort`] is that seam. The default
//! implementation, [`SerialLink`] (feature `serial`), drives the panel's
//! USB-CDC endpoint through the `serialport` crate: 8-N-1 framing, DTR and
//! RTS asserted on open, 921 600 baud unless configured otherwise.
//!
//! The OS-level serial output buffer does the heavy lifting for bulk
//! payloads; size it to at least 512 KiB where configurable so a worst-case
//! full-frame draw (~300 KiB) never blocks user space.

use core::fmt::Debug;
use std::time::Duration;

/// Byte sink carrying packed commands to the panel.
///
/// Implementations must hand the header (and payload, when present) to the
/// underlying sink completely before returning, or report a failure. The
/// driver reacts to a failed write by closing the sink, calling
/// [`reopen`](Self::reopen), and replaying device state.
pub trait PanelPort {
    /// Transport error type.
    type Error: Debug;

    /// Write one command: header, then an optional bulk payload, as a
    /// single logical write.
    fn write_frame(&mut self, header: &[u8], payload: Option<&[u8]>) -> Result<(), Self::Error>;

    /// Close and reattempt the connection until it succeeds or `window`
    /// elapses. A busy port (host session lock) is retried with backoff
    /// inside the window.
    fn reopen(&mut self, window: Duration) -> Result<(), Self::Error>;

    /// Release the sink, ignoring errors. Must be idempotent.
    fn close(&mut self);
}

/// Errors reported by the serial transport.
#[derive(Debug)]
pub enum LinkError {
    /// No connection is currently held at write time.
    Disconnected,
    /// The byte sink reported an I/O failure.
    WriteFailed(std::io::Error),
    /// Opening the port failed with a permission or lock error.
    PortBusy,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "serial link is not connected"),
            Self::WriteFailed(e) => write!(f, "serial write failed: {e}"),
            Self::PortBusy => write!(f, "serial port is busy or locked"),
        }
    }
}

impl std::error::Error for LinkError {}

/// Default line rate for the panel family.
pub const DEFAULT_BAUD: u32 = 921_600;

/// Serial port parameters.
///
/// Framing is fixed at 8-N-1 without flow control, which is what the
/// panel's CDC endpoint expects; only the path, line rate and write timeout
/// vary per host.
#[cfg(feature = "serial")]
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyACM0` or `COM5`.
    pub path: String,
    /// Line rate in baud.
    pub baud_rate: u32,
    /// Blocking-write timeout.
    pub timeout: Duration,
}

#[cfg(feature = "serial")]
impl SerialConfig {
    /// Configuration for `path` with the default baud and a 1 s timeout.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            baud_rate: DEFAULT_BAUD,
            timeout: Duration::from_secs(1),
        }
    }

    /// Set the line rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the blocking-write timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`PanelPort`] over a `serialport` connection.
#[cfg(feature = "serial")]
pub struct SerialLink {
    port: Option<Box<dyn serialport::SerialPort>>,
    config: SerialConfig,
}

#[cfg(feature = "serial")]
impl core::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialLink")
            .field("config", &self.config)
            .field("connected", &self.port.is_some())
            .finish()
    }
}

#[cfg(feature = "serial")]
impl SerialLink {
    /// Open the port described by `config`.
    pub fn open(config: SerialConfig) -> Result<Self, LinkError> {
        let mut link = Self { port: None, config };
        link.connect()?;
        Ok(link)
    }

    /// The configuration this link was opened with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        let mut port = serialport::new(&self.config.path, self.config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.config.timeout)
            .open()
            .map_err(open_error)?;
        port.write_data_terminal_ready(true)
            .map_err(open_error)?;
        port.write_request_to_send(true).map_err(open_error)?;
        log::debug!("opened {} at {} baud", self.config.path, self.config.baud_rate);
        self.port = Some(port);
        Ok(())
    }
}

#[cfg(feature = "serial")]
fn open_error(e: serialport::Error) -> LinkError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => LinkError::Disconnected,
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => LinkError::PortBusy,
        _ => LinkError::WriteFailed(e.into()),
    }
}

#[cfg(feature = "serial")]
impl PanelPort for SerialLink {
    type Error = LinkError;

    fn write_frame(&mut self, header: &[u8], payload: Option<&[u8]>) -> Result<(), LinkError> {
        use std::io::Write;

        let port = self.port.as_mut().ok_or(LinkError::Disconnected)?;
        port.write_all(header).map_err(LinkError::WriteFailed)?;
        if let Some(payload) = payload {
            port.write_all(payload).map_err(LinkError::WriteFailed)?;
        }
        Ok(())
    }

    fn reopen(&mut self, window: Duration) -> Result<(), LinkError> {
        self.close();
        let deadline = std::time::Instant::now() + window;
        let mut delay = Duration::from_millis(20);
        loop {
            match self.connect() {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if std::time::Instant::now() + delay >= deadline {
                        return Err(err);
                    }
                    log::debug!("reopen attempt failed ({err}), retrying");
                    std::thread::sleep(delay);
                    if matches!(err, LinkError::PortBusy) {
                        delay = (delay * 2).min(Duration::from_millis(200));
                    }
                }
            }
        }
    }

    fn close(&mut self) {
        // Dropping the handle releases the device; errors on close are
        // irrelevant because a reopen follows or the driver is shutting down.
        self.port = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_error_messages_are_descriptive() {
        assert_eq!(LinkError::Disconnected.to_string(), "serial link is not connected");
        assert_eq!(LinkError::PortBusy.to_string(), "serial port is busy or locked");
        let e = LinkError::WriteFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert!(e.to_string().contains("pipe closed"));
    }

    #[cfg(feature = "serial")]
    #[test]
    fn serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyACM0");
        assert_eq!(config.path, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[cfg(feature = "serial")]
    #[test]
    fn serial_config_builders() {
        let config = SerialConfig::new("COM5")
            .with_baud_rate(115_200)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
