//! Device information strings.
//!
//! Info responses are `3 + text_len` bytes: a 3-byte header (`"OK"` plus
//! one byte), then the text, whose last byte is the checksum.

use crate::error::Result;
use crate::protocol::Mode;
use crate::session::Session;
use crate::transport::ReportTransport;

/// Length of the serial number field, checksum included.
pub const SERIAL_LEN: usize = 8;

/// Length of the version field, checksum included.
pub const VERSION_LEN: usize = 12;

/// Length of the profile field, checksum included.
pub const PROFILE_LEN: usize = 11;

const INFO_HEADER_LEN: usize = 3;

/// Text up to the first NUL.
fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

impl<T: ReportTransport> Session<T> {
    fn info_command(&mut self, command: &[u8], text_len: usize) -> Result<String> {
        let expected_len = INFO_HEADER_LEN + text_len;
        let response = self.exchange(Mode::Pedometer, command, expected_len)?;
        response.require_len(expected_len)?;
        Ok(decode_text(
            &response.payload()[INFO_HEADER_LEN..expected_len - 1],
        ))
    }

    /// Device serial number (`SRL00`).
    pub fn device_serial(&mut self) -> Result<String> {
        self.info_command(b"SRL00", SERIAL_LEN)
    }

    /// Firmware version string (`VER00`).
    pub fn device_version(&mut self) -> Result<String> {
        self.info_command(b"VER00", VERSION_LEN)
    }

    /// Blood-pressure profile string (`PRF00`).
    pub fn bp_profile(&mut self) -> Result<String> {
        self.info_command(b"PRF00", PROFILE_LEN)
    }
}
