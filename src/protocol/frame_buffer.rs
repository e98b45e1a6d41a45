//! Response reassembly.
//!
//! Uses `bytes::BytesMut` to collect payload chunks from successive input
//! reports. The status token is classified once enough bytes have arrived:
//! - `Unchecked`: fewer than 2 bytes (or a partial `"END\r\n"`) so far
//! - `Checked`: status accepted, keep collecting until the response ends
//!
//! A response ends when `expected_len` bytes are collected or a report
//! carries less than a full chunk. [`ResponseBuffer::finish`] then checks the
//! `"OK"` token and the XOR checksum.
//!
//! # Example
//!
//! ```
//! use omron_hid::protocol::{Progress, ResponseBuffer};
//!
//! let mut buffer = ResponseBuffer::new(4);
//! let progress = buffer.push_report(&[4, b'O', b'K', 0x5a, 0x5a, 0, 0, 0]).unwrap();
//! assert_eq!(progress, Progress::Complete);
//!
//! let response = buffer.finish().unwrap();
//! assert_eq!(response.payload(), b"OK\x5a\x5a");
//! ```

use bytes::BytesMut;

use super::frame::{chunk_capacity, Response};
use super::wire_format::{
    has_ok_status, is_end_marker_prefix, xor_checksum, END_MARKER, STATUS_LEN, STATUS_NO,
};
use crate::error::{OmronError, Result};

/// Whether more reports are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Read another report.
    NeedMore,
    /// The response is complete; call [`ResponseBuffer::finish`].
    Complete,
}

/// Status classification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unchecked,
    Checked,
}

/// Accumulates payload chunks from input reports into one response.
#[derive(Debug)]
pub struct ResponseBuffer {
    buffer: BytesMut,
    expected_len: usize,
    state: State,
}

impl ResponseBuffer {
    /// Create a buffer for a response of at most `expected_len` bytes.
    pub fn new(expected_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(expected_len),
            expected_len,
            state: State::Unchecked,
        }
    }

    /// Bytes collected so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum response length.
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Add the chunk carried by one full input report.
    ///
    /// # Errors
    ///
    /// - `BadData` for an impossible chunk length or a garbled status token
    /// - `NegativeResponse` when the device answered exactly `"NO"`
    pub fn push_report(&mut self, report: &[u8]) -> Result<Progress> {
        let report_size = report.len();
        let capacity = chunk_capacity(report_size)
            .map_err(|_| OmronError::BadData(format!("{}-byte report is too short", report_size)))?;

        let mut chunk_len = report[0] as usize;
        if chunk_len > report_size {
            return Err(OmronError::BadData(format!(
                "chunk length {} exceeds report size {}",
                chunk_len, report_size
            )));
        }
        if chunk_len == report_size {
            // Some devices count the length byte itself in full chunks.
            chunk_len = capacity;
        }
        let full_chunk = chunk_len == capacity;

        let remaining = self.expected_len - self.buffer.len();
        if chunk_len > remaining {
            tracing::warn!(
                "Device sent {} bytes but only {} expected, discarding {}",
                chunk_len,
                remaining,
                chunk_len - remaining
            );
            chunk_len = remaining;
        }
        self.buffer.extend_from_slice(&report[1..=chunk_len]);

        if self.state == State::Unchecked && self.buffer.len() >= STATUS_LEN {
            self.classify()?;
        }

        if self.buffer.len() < self.expected_len && full_chunk {
            Ok(Progress::NeedMore)
        } else {
            Ok(Progress::Complete)
        }
    }

    fn classify(&mut self) -> Result<()> {
        let data = &self.buffer[..];
        if data.len() == STATUS_LEN && &data[..STATUS_LEN] == STATUS_NO {
            return Err(OmronError::NegativeResponse);
        }
        if is_end_marker_prefix(data) {
            if data.len() >= END_MARKER.len() {
                self.state = State::Checked;
            }
            return Ok(());
        }
        if !has_ok_status(data) {
            tracing::warn!(
                "Garbled response status {:02x} {:02x}",
                data[0],
                data[1]
            );
            return Err(OmronError::BadData("garbled response".to_string()));
        }
        self.state = State::Checked;
        Ok(())
    }

    /// Validate the collected payload and return it.
    ///
    /// Requires at least 3 bytes, the `"OK"` token, and a zero XOR over
    /// everything after the token.
    pub fn finish(self) -> Result<Response> {
        let data = &self.buffer[..];
        if data.len() < STATUS_LEN + 1 {
            return Err(OmronError::BadData(format!(
                "response of {} bytes is too short",
                data.len()
            )));
        }
        if !has_ok_status(data) {
            return Err(OmronError::BadData("response is not OK".to_string()));
        }
        let checksum = xor_checksum(&data[STATUS_LEN..]);
        if checksum != 0 {
            tracing::warn!("Bad checksum 0x{:02x}", checksum);
            return Err(OmronError::BadData(format!("bad checksum 0x{:02x}", checksum)));
        }
        Ok(Response::new(self.buffer.freeze()))
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::Unchecked => "Unchecked",
            State::Checked => "Checked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{chunk_payload, ok_payload};
    use proptest::prelude::*;

    /// Push reports until the buffer says it is complete.
    fn assemble(expected_len: usize, reports: &[Vec<u8>]) -> (Result<Response>, usize) {
        let mut buffer = ResponseBuffer::new(expected_len);
        for (i, report) in reports.iter().enumerate() {
            match buffer.push_report(report) {
                Ok(Progress::NeedMore) => continue,
                Ok(Progress::Complete) => return (buffer.finish(), i + 1),
                Err(e) => return (Err(e), i + 1),
            }
        }
        panic!("ran out of reports");
    }

    #[test]
    fn test_single_report_response() {
        let payload = ok_payload(&[0x10, 0x20]);
        let (result, used) = assemble(5, &chunk_payload(&payload, 8, false));
        assert_eq!(used, 1);
        assert_eq!(result.unwrap().payload(), &payload[..]);
    }

    #[test]
    fn test_multi_report_response() {
        let body: Vec<u8> = (1..=14).collect();
        let payload = ok_payload(&body);
        let reports = chunk_payload(&payload, 8, false);
        assert_eq!(reports.len(), 3);

        let (result, used) = assemble(payload.len(), &reports);
        assert_eq!(used, 3);
        assert_eq!(result.unwrap().payload(), &payload[..]);
    }

    #[test]
    fn test_full_chunk_quirk_is_clamped() {
        let body: Vec<u8> = (1..=14).collect();
        let payload = ok_payload(&body);
        let reports = chunk_payload(&payload, 8, true);
        assert_eq!(reports[0][0], 8);

        let (result, _) = assemble(payload.len(), &reports);
        assert_eq!(result.unwrap().payload(), &payload[..]);
    }

    #[test]
    fn test_short_chunk_ends_response_early() {
        let payload = ok_payload(&[0x01, 0x02]);
        let reports = chunk_payload(&payload, 8, false);

        let mut buffer = ResponseBuffer::new(17);
        assert_eq!(buffer.push_report(&reports[0]).unwrap(), Progress::Complete);
        let response = buffer.finish().unwrap();
        assert_eq!(response.len(), 5);
    }

    #[test]
    fn test_negative_response() {
        let mut buffer = ResponseBuffer::new(17);
        let result = buffer.push_report(&[2, b'N', b'O', 0, 0, 0, 0, 0]);
        assert!(matches!(result, Err(OmronError::NegativeResponse)));
    }

    #[test]
    fn test_no_inside_longer_chunk_is_garbled() {
        let mut buffer = ResponseBuffer::new(17);
        let result = buffer.push_report(&[4, b'N', b'O', 1, 1, 0, 0, 0]);
        assert!(matches!(result, Err(OmronError::BadData(_))));
    }

    #[test]
    fn test_garbled_status_rejected_immediately() {
        let mut buffer = ResponseBuffer::new(17);
        let result = buffer.push_report(&[7, b'X', b'Y', 1, 2, 3, 4, 5]);
        assert!(matches!(result, Err(OmronError::BadData(_))));
    }

    #[test]
    fn test_status_split_across_reports() {
        let mut buffer = ResponseBuffer::new(4);
        assert_eq!(buffer.push_report(&[1, b'O']).unwrap(), Progress::NeedMore);
        assert_eq!(buffer.state_name(), "Unchecked");
        assert_eq!(buffer.push_report(&[1, b'K']).unwrap(), Progress::NeedMore);
        assert_eq!(buffer.state_name(), "Checked");
        assert_eq!(buffer.push_report(&[1, 0x33]).unwrap(), Progress::NeedMore);
        assert_eq!(buffer.push_report(&[1, 0x33]).unwrap(), Progress::Complete);
        assert!(buffer.finish().is_ok());
    }

    #[test]
    fn test_end_marker_passes_classification_but_fails_validation() {
        let mut buffer = ResponseBuffer::new(8);
        let progress = buffer
            .push_report(&[5, b'E', b'N', b'D', b'\r', b'\n', 0, 0])
            .unwrap();
        assert_eq!(progress, Progress::Complete);
        assert_eq!(buffer.state_name(), "Checked");
        assert!(matches!(buffer.finish(), Err(OmronError::BadData(_))));
    }

    #[test]
    fn test_partial_end_marker_stays_unchecked() {
        let mut buffer = ResponseBuffer::new(8);
        assert_eq!(
            buffer.push_report(&[1, b'E']).unwrap(),
            Progress::NeedMore
        );
        assert_eq!(
            buffer.push_report(&[1, b'N']).unwrap(),
            Progress::NeedMore
        );
        assert_eq!(buffer.state_name(), "Unchecked");
    }

    #[test]
    fn test_chunk_length_beyond_report_rejected() {
        let mut buffer = ResponseBuffer::new(17);
        let result = buffer.push_report(&[9, b'O', b'K', 0, 0, 0, 0, 0]);
        assert!(matches!(result, Err(OmronError::BadData(_))));
    }

    #[test]
    fn test_excess_bytes_are_discarded() {
        let mut buffer = ResponseBuffer::new(5);
        let progress = buffer
            .push_report(&[7, b'O', b'K', 0x11, 0x22, 0x33, 0xff, 0xff])
            .unwrap();
        assert_eq!(progress, Progress::Complete);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.finish().unwrap().payload(), b"OK\x11\x22\x33");
    }

    #[test]
    fn test_too_short_response_rejected() {
        let mut buffer = ResponseBuffer::new(17);
        buffer.push_report(&[2, b'O', b'K', 0, 0, 0, 0, 0]).unwrap();
        assert!(matches!(buffer.finish(), Err(OmronError::BadData(_))));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut payload = ok_payload(&[0x01, 0x02, 0x03]);
        let last = payload.len() - 1;
        payload[last] ^= 0x01;
        let (result, _) = assemble(payload.len(), &chunk_payload(&payload, 8, false));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_zero_length_chunk_ends_response() {
        let mut buffer = ResponseBuffer::new(8);
        assert_eq!(
            buffer.push_report(&[0, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
            Progress::Complete
        );
        assert!(buffer.finish().is_err());
    }

    proptest! {
        #[test]
        fn prop_single_byte_mutation_rejected(
            body in proptest::collection::vec(any::<u8>(), 1..40),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut payload = ok_payload(&body);
            // Mutate a byte after the status token so classification still passes.
            let pos = STATUS_LEN + index.index(payload.len() - STATUS_LEN);
            payload[pos] ^= flip;

            let reports = chunk_payload(&payload, 8, false);
            let mut buffer = ResponseBuffer::new(payload.len());
            let mut outcome = None;
            for report in &reports {
                match buffer.push_report(report) {
                    Ok(Progress::NeedMore) => continue,
                    Ok(Progress::Complete) => { outcome = Some(buffer.finish()); break; }
                    Err(e) => { outcome = Some(Err(e)); break; }
                }
            }
            let is_bad_data = matches!(outcome, Some(Err(OmronError::BadData(_))));
            prop_assert!(is_bad_data);
        }

        #[test]
        fn prop_valid_payload_accepted(
            body in proptest::collection::vec(any::<u8>(), 1..40),
            quirk in any::<bool>(),
        ) {
            let payload = ok_payload(&body);
            let reports = chunk_payload(&payload, 8, quirk);
            let mut buffer = ResponseBuffer::new(payload.len());
            let mut consumed = 0;
            for report in &reports {
                consumed += 1;
                if buffer.push_report(report).unwrap() == Progress::Complete {
                    break;
                }
            }
            prop_assert_eq!(consumed, reports.len());
            let response = buffer.finish().unwrap();
            prop_assert_eq!(response.payload(), &payload[..]);
        }
    }
}
