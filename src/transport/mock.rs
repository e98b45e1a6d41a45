//! Scripted in-memory device.
//!
//! [`MockTransport`] behaves like a device on the other end of the report
//! channel: written reports are accumulated into a command, and the next
//! read hands that command to a responder closure whose [`Reply`] is queued
//! as input reports. The all-zero clear command is acknowledged
//! automatically with `"OK"`.
//!
//! # Example
//!
//! ```
//! use omron_hid::transport::mock::{ok_payload, MockTransport, Reply};
//! use omron_hid::{Session, SessionConfig};
//!
//! let transport = MockTransport::new(|cmd: &[u8]| match cmd {
//!     b"SRL00" => Reply::Payload(ok_payload(b"\x00SN123456")),
//!     _ => Reply::Payload(b"NO".to_vec()),
//! });
//! let mut session = Session::from_transport(transport, SessionConfig::default()).unwrap();
//! assert_eq!(session.device_serial().unwrap(), "SN123456");
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use super::{DeviceProvider, ReportTransport};
use crate::error::{OmronError, Result};
use crate::protocol::{xor_checksum, DEFAULT_REPORT_SIZE, STATUS_OK};

/// What the mock device sends back for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A logical payload, split into length-prefixed reports.
    Payload(Vec<u8>),
    /// Raw reports, each padded to the input report size.
    Reports(Vec<Vec<u8>>),
    /// No answer; reads time out.
    Silence,
    /// The next read fails with a device I/O error.
    Fail(String),
}

/// Responder closure invoked once per received command.
pub type Responder = Box<dyn FnMut(&[u8]) -> Reply>;

/// Everything the mock observed.
#[derive(Debug, Default, Clone)]
pub struct MockLog {
    /// Every output report written, verbatim.
    pub writes: Vec<Vec<u8>>,
    /// Every feature report (mode switch) received.
    pub feature_reports: Vec<Vec<u8>>,
    /// Reassembled commands, excluding clear commands.
    pub commands: Vec<Vec<u8>>,
    /// Number of clear commands acknowledged.
    pub clears: usize,
    /// Number of reads that timed out.
    pub timeouts: usize,
}

/// Build a checksummed `"OK"` payload around `body`.
pub fn ok_payload(body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(body.len() + 3);
    payload.extend_from_slice(STATUS_OK);
    payload.extend_from_slice(body);
    payload.push(xor_checksum(body));
    payload
}

/// Split `payload` into length-prefixed reports of `report_size` bytes.
///
/// With `full_chunk_quirk`, full chunks declare the whole report size as
/// their length, the way some devices do.
pub fn chunk_payload(payload: &[u8], report_size: usize, full_chunk_quirk: bool) -> Vec<Vec<u8>> {
    let capacity = report_size.saturating_sub(1).max(1);
    let mut reports = Vec::new();
    let mut chunks = payload.chunks(capacity).peekable();
    if chunks.peek().is_none() {
        reports.push(vec![0u8; report_size]);
        return reports;
    }
    for chunk in chunks {
        let mut report = vec![0u8; report_size];
        report[0] = if full_chunk_quirk && chunk.len() == capacity {
            report_size as u8
        } else {
            chunk.len() as u8
        };
        report[1..=chunk.len()].copy_from_slice(chunk);
        reports.push(report);
    }
    reports
}

/// In-memory device speaking the report protocol.
pub struct MockTransport {
    input_size: usize,
    output_size: usize,
    pending: Vec<u8>,
    inbox: VecDeque<Vec<u8>>,
    pending_failure: Option<String>,
    responder: Responder,
    full_chunk_quirk: bool,
    fail_feature_reports: bool,
    fail_writes: bool,
    unacknowledged_clears: usize,
    closed: bool,
    log: MockLog,
}

impl MockTransport {
    /// Create a mock with 8-byte reports answering through `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Reply + 'static,
    {
        Self {
            input_size: DEFAULT_REPORT_SIZE,
            output_size: DEFAULT_REPORT_SIZE,
            pending: Vec::new(),
            inbox: VecDeque::new(),
            pending_failure: None,
            responder: Box::new(responder),
            full_chunk_quirk: false,
            fail_feature_reports: false,
            fail_writes: false,
            unacknowledged_clears: 0,
            closed: false,
            log: MockLog::default(),
        }
    }

    /// Use custom report sizes.
    pub fn with_report_sizes(mut self, input_size: usize, output_size: usize) -> Self {
        self.input_size = input_size;
        self.output_size = output_size;
        self
    }

    /// Declare full chunks with the whole report size as their length.
    pub fn with_full_chunk_quirk(mut self) -> Self {
        self.full_chunk_quirk = true;
        self
    }

    /// Make every mode switch fail.
    pub fn with_failing_feature_reports(mut self) -> Self {
        self.fail_feature_reports = true;
        self
    }

    /// Make every report write fail.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Answer the first `count` clear commands with `"NO"`.
    pub fn with_unacknowledged_clears(mut self, count: usize) -> Self {
        self.unacknowledged_clears = count;
        self
    }

    /// Queue a stale input report, as if left over from an earlier exchange.
    pub fn push_stale_report(&mut self, report: Vec<u8>) {
        let report = self.pad(report);
        self.inbox.push_back(report);
    }

    /// Observations so far.
    pub fn log(&self) -> &MockLog {
        &self.log
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of input reports still queued.
    pub fn queued_reports(&self) -> usize {
        self.inbox.len()
    }

    fn pad(&self, mut report: Vec<u8>) -> Vec<u8> {
        report.resize(self.input_size, 0);
        report
    }

    fn answer_pending(&mut self) {
        let command = std::mem::take(&mut self.pending);
        let reply = if command.iter().all(|&b| b == 0) {
            self.log.clears += 1;
            if self.unacknowledged_clears > 0 {
                self.unacknowledged_clears -= 1;
                Reply::Payload(b"NO".to_vec())
            } else {
                Reply::Payload(STATUS_OK.to_vec())
            }
        } else {
            self.log.commands.push(command.clone());
            (self.responder)(&command)
        };

        match reply {
            Reply::Payload(payload) => {
                let reports = chunk_payload(&payload, self.input_size, self.full_chunk_quirk);
                self.inbox.extend(reports);
            }
            Reply::Reports(reports) => {
                for report in reports {
                    let report = self.pad(report);
                    self.inbox.push_back(report);
                }
            }
            Reply::Silence => {}
            Reply::Fail(reason) => self.pending_failure = Some(reason),
        }
    }
}

impl ReportTransport for MockTransport {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn read_report(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<Option<usize>> {
        if self.closed {
            return Err(OmronError::DeviceIo("mock device closed".to_string()));
        }
        if buf.len() < self.input_size {
            return Err(OmronError::BufferTooSmall {
                needed: self.input_size,
                available: buf.len(),
            });
        }
        if !self.pending.is_empty() {
            self.answer_pending();
        }

        if let Some(report) = self.inbox.pop_front() {
            buf[..report.len()].copy_from_slice(&report);
            return Ok(Some(report.len()));
        }
        if let Some(reason) = self.pending_failure.take() {
            return Err(OmronError::DeviceIo(reason));
        }
        self.log.timeouts += 1;
        Ok(None)
    }

    fn write_report(&mut self, report: &[u8], _timeout: Duration) -> Result<usize> {
        if self.closed || self.fail_writes {
            return Err(OmronError::DeviceIo("mock write failed".to_string()));
        }
        if report.is_empty() || report.len() > self.output_size {
            return Err(OmronError::BufferTooSmall {
                needed: report.len(),
                available: self.output_size,
            });
        }
        self.log.writes.push(report.to_vec());
        let len = (report[0] as usize).min(report.len() - 1);
        self.pending.extend_from_slice(&report[1..=len]);
        Ok(report.len())
    }

    fn set_feature_report(&mut self, data: &[u8], _timeout: Duration) -> Result<()> {
        if self.closed || self.fail_feature_reports {
            return Err(OmronError::DeviceIo("mock feature report failed".to_string()));
        }
        self.log.feature_reports.push(data.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Provider handing out mock devices by index.
#[derive(Default)]
pub struct MockProvider {
    devices: Vec<(u16, u16, Option<MockTransport>)>,
}

impl MockProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device with the given IDs.
    pub fn with_device(mut self, vendor_id: u16, product_id: u16, device: MockTransport) -> Self {
        self.devices.push((vendor_id, product_id, Some(device)));
        self
    }
}

impl DeviceProvider for MockProvider {
    type Transport = MockTransport;

    fn count(&mut self, vendor_id: u16, product_id: u16) -> Result<usize> {
        Ok(self
            .devices
            .iter()
            .filter(|(vid, pid, _)| *vid == vendor_id && *pid == product_id)
            .count())
    }

    fn open(&mut self, vendor_id: u16, product_id: u16, index: usize) -> Result<MockTransport> {
        let slot = self
            .devices
            .iter_mut()
            .filter(|(vid, pid, _)| *vid == vendor_id && *pid == product_id)
            .nth(index)
            .ok_or_else(|| {
                OmronError::BadArgument(format!("no device at index {}", index))
            })?;
        slot.2
            .take()
            .ok_or_else(|| OmronError::DeviceIo(format!("device {} already open", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[test]
    fn test_ok_payload_checksums_to_zero() {
        let payload = ok_payload(&[0x01, 0x02, 0x03]);
        assert_eq!(&payload[..2], b"OK");
        assert_eq!(xor_checksum(&payload[2..]), 0);
    }

    #[test]
    fn test_chunk_payload_splits_on_capacity() {
        let reports = chunk_payload(&[1u8; 10], 8, false);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0][0], 7);
        assert_eq!(reports[1][0], 3);
        assert!(reports.iter().all(|r| r.len() == 8));
    }

    #[test]
    fn test_chunk_payload_quirk() {
        let reports = chunk_payload(&[1u8; 10], 8, true);
        assert_eq!(reports[0][0], 8);
        assert_eq!(reports[1][0], 3);
    }

    #[test]
    fn test_command_answered_on_next_read() {
        let mut mock = MockTransport::new(|cmd| {
            assert_eq!(cmd, b"PING");
            Reply::Payload(b"NO".to_vec())
        });
        mock.write_report(&[4, b'P', b'I', b'N', b'G', 0, 0, 0], TIMEOUT)
            .unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(mock.read_report(&mut buf, TIMEOUT).unwrap(), Some(8));
        assert_eq!(&buf[..3], &[2, b'N', b'O']);
        assert_eq!(mock.read_report(&mut buf, TIMEOUT).unwrap(), None);
        assert_eq!(mock.log().commands, vec![b"PING".to_vec()]);
        assert_eq!(mock.log().timeouts, 1);
    }

    #[test]
    fn test_clear_command_acknowledged() {
        let mut mock = MockTransport::new(|_| Reply::Silence);
        mock.write_report(&[3, 0, 0, 0, 0, 0, 0, 0], TIMEOUT).unwrap();

        let mut buf = [0u8; 8];
        mock.read_report(&mut buf, TIMEOUT).unwrap();
        assert_eq!(&buf[1..3], b"OK");
        assert_eq!(mock.log().clears, 1);
        assert!(mock.log().commands.is_empty());
    }

    #[test]
    fn test_fail_reply_surfaces_on_read() {
        let mut mock = MockTransport::new(|_| Reply::Fail("unplugged".into()));
        mock.write_report(&[1, b'X', 0, 0, 0, 0, 0, 0], TIMEOUT).unwrap();

        let mut buf = [0u8; 8];
        let err = mock.read_report(&mut buf, TIMEOUT).unwrap_err();
        assert!(err.to_string().contains("unplugged"));
    }

    #[test]
    fn test_small_read_buffer_rejected() {
        let mut mock = MockTransport::new(|_| Reply::Silence);
        let mut buf = [0u8; 4];
        assert!(matches!(
            mock.read_report(&mut buf, TIMEOUT),
            Err(OmronError::BufferTooSmall { needed: 8, available: 4 })
        ));
    }

    #[test]
    fn test_provider_opens_nth_matching_device() {
        let mut provider = MockProvider::new()
            .with_device(1, 1, MockTransport::new(|_| Reply::Silence))
            .with_device(2, 2, MockTransport::new(|_| Reply::Silence).with_report_sizes(16, 16))
            .with_device(2, 2, MockTransport::new(|_| Reply::Silence).with_report_sizes(32, 32));

        assert_eq!(provider.count(2, 2).unwrap(), 2);
        let second = provider.open(2, 2, 1).unwrap();
        assert_eq!(second.input_size(), 32);
        assert!(provider.open(2, 2, 1).is_err());
        assert!(matches!(
            provider.open(2, 2, 5),
            Err(OmronError::BadArgument(_))
        ));
    }
}
