//! Command framing and the validated response type.
//!
//! A logical command is split into chunks of at most `output_size - 1`
//! bytes; each chunk travels in one report whose first byte is the chunk
//! length. Reports are zero padded to the full output size.
//!
//! # Example
//!
//! ```
//! use omron_hid::protocol::build_reports;
//!
//! let reports = build_reports(b"VER00", 8).unwrap();
//! assert_eq!(reports.len(), 1);
//! assert_eq!(&reports[0][..], &[5, b'V', b'E', b'R', b'0', b'0', 0, 0]);
//! ```

use bytes::Bytes;

use super::wire_format::{MAX_REPORT_SIZE, MIN_REPORT_SIZE, STATUS_LEN};
use crate::error::{OmronError, Result};

/// A reassembled, checksum-validated response payload.
///
/// The payload includes the `"OK"` status token and the trailing checksum
/// byte, so protocol offsets index into it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
}

impl Response {
    /// Wrap validated payload bytes.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Full payload, status token included.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Cheap clone of the payload.
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Number of bytes assembled, status token included.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True for an empty payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes after the status token, checksum excluded.
    pub fn body(&self) -> &[u8] {
        if self.payload.len() <= STATUS_LEN {
            return &[];
        }
        &self.payload[STATUS_LEN..self.payload.len() - 1]
    }

    /// Byte at `offset`, or `UnexpectedEnd` if the response is too short.
    pub fn byte(&self, offset: usize) -> Result<u8> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(OmronError::UnexpectedEnd)
    }

    /// Fail with `UnexpectedEnd` unless at least `len` bytes were assembled.
    pub fn require_len(&self, len: usize) -> Result<()> {
        if self.payload.len() < len {
            return Err(OmronError::UnexpectedEnd);
        }
        Ok(())
    }
}

/// Payload bytes carried by one report of `report_size` bytes.
pub fn chunk_capacity(report_size: usize) -> Result<usize> {
    if !(MIN_REPORT_SIZE..=MAX_REPORT_SIZE).contains(&report_size) {
        return Err(OmronError::BadArgument(format!(
            "report size {} outside {}..={}",
            report_size, MIN_REPORT_SIZE, MAX_REPORT_SIZE
        )));
    }
    Ok(report_size - 1)
}

/// Number of reports needed to carry `command_len` bytes.
///
/// Always at least one, even for an empty command.
pub fn report_count(command_len: usize, report_size: usize) -> Result<usize> {
    let capacity = chunk_capacity(report_size)?;
    Ok(command_len.div_ceil(capacity).max(1))
}

/// Iterator over the chunks of a command, one per report.
#[derive(Debug, Clone)]
pub struct CommandChunks<'a> {
    rest: &'a [u8],
    capacity: usize,
    started: bool,
}

impl<'a> Iterator for CommandChunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.started && self.rest.is_empty() {
            return None;
        }
        self.started = true;
        let take = self.rest.len().min(self.capacity);
        let (chunk, rest) = self.rest.split_at(take);
        self.rest = rest;
        Some(chunk)
    }
}

/// Split `command` into report-sized chunks.
pub fn command_chunks(command: &[u8], report_size: usize) -> Result<CommandChunks<'_>> {
    Ok(CommandChunks {
        rest: command,
        capacity: chunk_capacity(report_size)?,
        started: false,
    })
}

/// Encode one chunk into `report`, zero padding the remainder.
///
/// # Panics
///
/// Panics if `report` cannot hold the length byte plus `chunk`.
pub fn encode_report(chunk: &[u8], report: &mut [u8]) {
    debug_assert!(report.len() > chunk.len());
    report.fill(0);
    report[0] = chunk.len() as u8;
    report[1..=chunk.len()].copy_from_slice(chunk);
}

/// Build every report for `command` as standalone byte vectors.
///
/// The session writes reports from its own buffer; this is the allocating
/// form for inspection and tests.
pub fn build_reports(command: &[u8], report_size: usize) -> Result<Vec<Vec<u8>>> {
    let mut reports = Vec::with_capacity(report_count(command.len(), report_size)?);
    for chunk in command_chunks(command, report_size)? {
        let mut report = vec![0u8; report_size];
        encode_report(chunk, &mut report);
        reports.push(report);
    }
    Ok(reports)
}
