//! Device session and report I/O.
//!
//! A [`Session`] owns one opened transport and everything the protocol engine
//! tracks about it:
//! 1. The device's current [`Mode`]
//! 2. The report sizes, fixed once the device is open
//! 3. A report buffer allocated once and reused by every read and write
//! 4. The `tracing` span every operation runs in
//!
//! Commands are issued through the methods in [`crate::commands`], which go
//! through [`Session::exchange`].
//!
//! # Example
//!
//! ```
//! use omron_hid::transport::mock::{MockProvider, MockTransport, Reply};
//! use omron_hid::{OmronError, Session, SessionConfig, OMRON_PID, OMRON_VID};
//!
//! let mut provider = MockProvider::new()
//!     .with_device(OMRON_VID, OMRON_PID, MockTransport::new(|_| Reply::Silence));
//! assert_eq!(Session::count_devices(&mut provider).unwrap(), 1);
//!
//! let mut session = Session::open(&mut provider, 0, SessionConfig::default()).unwrap();
//! assert!(session.is_open());
//! session.close().unwrap();
//! assert!(matches!(session.close(), Err(OmronError::NotOpen)));
//! ```

use std::time::Duration;

use crate::config::SessionConfig;
use crate::error::{OmronError, Result};
use crate::protocol::{
    command_chunks, encode_report, trace_hexdump, Mode, Progress, Response, ResponseBuffer,
    MAX_REPORT_SIZE, MIN_REPORT_SIZE, OMRON_PID, OMRON_VID,
};
use crate::transport::{DeviceProvider, ReportTransport};

/// An open connection to one device.
///
/// Not thread-safe by design of the device: one command is in flight at a
/// time, and callers sharing a device must serialize access themselves.
pub struct Session<T: ReportTransport> {
    /// `None` once closed.
    transport: Option<T>,
    /// Mode the device was last switched into.
    pub(crate) mode: Mode,
    input_size: usize,
    output_size: usize,
    /// Sized for the larger of the two reports.
    report_buf: Vec<u8>,
    pub(crate) config: SessionConfig,
    pub(crate) span: tracing::Span,
}

impl<T: ReportTransport> Session<T> {
    /// Number of connected devices with the Omron vendor/product IDs.
    pub fn count_devices<P>(provider: &mut P) -> Result<usize>
    where
        P: DeviceProvider<Transport = T>,
    {
        provider.count(OMRON_VID, OMRON_PID)
    }

    /// Open the `index`-th connected Omron device.
    pub fn open<P>(provider: &mut P, index: usize, config: SessionConfig) -> Result<Self>
    where
        P: DeviceProvider<Transport = T>,
    {
        let count = provider.count(OMRON_VID, OMRON_PID)?;
        if index >= count {
            return Err(OmronError::BadArgument(format!(
                "device index {} out of range, {} connected",
                index, count
            )));
        }
        let transport = provider.open(OMRON_VID, OMRON_PID, index)?;
        Self::from_transport(transport, config)
    }

    /// Wrap an already opened transport.
    ///
    /// Fails with `BadArgument` for an invalid configuration or report sizes
    /// outside the supported range.
    pub fn from_transport(transport: T, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let input_size = transport.input_size();
        let output_size = transport.output_size();
        for (name, size) in [("input", input_size), ("output", output_size)] {
            if !(MIN_REPORT_SIZE..=MAX_REPORT_SIZE).contains(&size) {
                return Err(OmronError::BadArgument(format!(
                    "{} report size {} outside {}..={}",
                    name, size, MIN_REPORT_SIZE, MAX_REPORT_SIZE
                )));
            }
        }

        let span = tracing::debug_span!(
            "omron_session",
            label = %config.label,
            input_size,
            output_size
        );
        span.in_scope(|| tracing::debug!("Session opened"));

        Ok(Self {
            transport: Some(transport),
            mode: Mode::None,
            input_size,
            output_size,
            report_buf: vec![0u8; input_size.max(output_size)],
            config,
            span,
        })
    }

    /// Release the device.
    ///
    /// Every later operation, including a second `close`, fails with
    /// `NotOpen`.
    pub fn close(&mut self) -> Result<()> {
        let mut transport = self.transport.take().ok_or(OmronError::NotOpen)?;
        let _enter = self.span.enter();
        tracing::debug!("Closing session");
        self.mode = Mode::None;
        transport.close()
    }

    /// Whether the session still holds its transport.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Mode the device was last switched into.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Input report size in bytes.
    #[inline]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Output report size in bytes.
    #[inline]
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Session configuration.
    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Span every operation of this session is recorded in.
    #[inline]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// The underlying transport, if still open.
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Mutable access to the underlying transport, if still open.
    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// Read one report into the session buffer, returning its length.
    ///
    /// `Ok(None)` means the timeout elapsed.
    fn poll_report(&mut self, timeout: Duration) -> Result<Option<usize>> {
        let input_size = self.input_size;
        let transport = self.transport.as_mut().ok_or(OmronError::NotOpen)?;
        let buf = &mut self.report_buf[..input_size];
        let read = transport.read_report(buf, timeout)?;
        if let Some(n) = read {
            trace_hexdump("recv", &buf[..n.min(input_size)]);
        }
        Ok(read)
    }

    /// Read one full input report. A timeout or short read is a device error.
    pub(crate) fn read_data_report(&mut self) -> Result<&[u8]> {
        match self.poll_report(self.config.read_timeout())? {
            Some(n) if n == self.input_size => Ok(&self.report_buf[..n]),
            Some(n) => Err(OmronError::DeviceIo(format!(
                "short read: {} of {} bytes",
                n, self.input_size
            ))),
            None => Err(OmronError::DeviceIo(format!(
                "read timed out after {} ms",
                self.config.read_timeout_ms
            ))),
        }
    }

    /// Discard queued input until a read times out or returns nothing.
    ///
    /// Returns the number of reports discarded.
    pub(crate) fn flush_input(&mut self) -> Result<usize> {
        let timeout = self.config.flush_timeout();
        let mut discarded = 0;
        while let Some(n) = self.poll_report(timeout)? {
            if n == 0 {
                break;
            }
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!("Flushed {} stale reports", discarded);
        }
        Ok(discarded)
    }

    /// Write `command` as a sequence of length-prefixed reports.
    pub(crate) fn send_command(&mut self, command: &[u8]) -> Result<()> {
        let output_size = self.output_size;
        let timeout = self.config.write_timeout();
        let transport = self.transport.as_mut().ok_or(OmronError::NotOpen)?;
        let report = &mut self.report_buf[..output_size];

        for chunk in command_chunks(command, output_size)? {
            encode_report(chunk, report);
            trace_hexdump("send", report);
            let written = transport.write_report(report, timeout)?;
            if written != output_size {
                return Err(OmronError::DeviceIo(format!(
                    "short write: {} of {} bytes",
                    written, output_size
                )));
            }
        }
        Ok(())
    }

    /// Read reports until a response of at most `expected_len` bytes is
    /// complete, then validate it.
    pub(crate) fn receive_response(&mut self, expected_len: usize) -> Result<Response> {
        let mut buffer = ResponseBuffer::new(expected_len);
        loop {
            let report = self.read_data_report()?;
            if buffer.push_report(report)? == Progress::Complete {
                break;
            }
        }
        buffer.finish()
    }
}

impl<T: ReportTransport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.config.label)
            .field("open", &self.is_open())
            .field("mode", &self.mode)
            .field("input_size", &self.input_size)
            .field("output_size", &self.output_size)
            .finish()
    }
}
