//! Wire format constants and helpers.
//!
//! Every command and response travels as a sequence of fixed-size reports:
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ Length │ Payload chunk                │
//! │ 1 byte │ report_size - 1 bytes (max)  │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! A reassembled response payload starts with a 2-byte status token
//! (`"OK"` or `"NO"`), except the bare terminator `"END\r\n"`. `"OK"`
//! payloads end with a checksum byte chosen so that the XOR of everything
//! after the status token is zero.

use serde::{Deserialize, Serialize};

/// Report size used by the known devices (HID report descriptor).
pub const DEFAULT_REPORT_SIZE: usize = 8;

/// Smallest usable report: the length byte plus one payload byte.
pub const MIN_REPORT_SIZE: usize = 2;

/// Largest report whose chunk length still fits the length byte.
pub const MAX_REPORT_SIZE: usize = 256;

/// Length of the status token at the start of a response.
pub const STATUS_LEN: usize = 2;

/// Successful response token.
pub const STATUS_OK: &[u8; 2] = b"OK";

/// Negative response token.
pub const STATUS_NO: &[u8; 2] = b"NO";

/// End-of-data terminator.
pub const END_MARKER: &[u8; 5] = b"END\r\n";

/// USB vendor ID shared by all Omron health devices.
pub const OMRON_VID: u16 = 0x0590;

/// USB product ID shared by all Omron health devices.
pub const OMRON_PID: u16 = 0x0028;

/// Device operating mode.
///
/// The device must be switched into the matching mode before it accepts a
/// command. The mode is selected with a 2-byte big-endian feature report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Clearing modes and startup/shutdown.
    #[default]
    None,
    /// Serial number, version and so on.
    DeviceInfo,
    /// Daily blood pressure readings.
    DailyInfo,
    /// Weekly blood pressure averages.
    WeeklyInfo,
    /// Pedometer data.
    Pedometer,
}

impl Mode {
    /// Raw mode code sent to the device.
    pub fn code(self) -> u16 {
        match self {
            Mode::None => 0x0000,
            Mode::DeviceInfo => 0x1111,
            Mode::DailyInfo => 0x74bc,
            Mode::WeeklyInfo => 0x1074,
            Mode::Pedometer => 0x0102,
        }
    }

    /// Mode for a raw code, if known.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(Mode::None),
            0x1111 => Some(Mode::DeviceInfo),
            0x74bc => Some(Mode::DailyInfo),
            0x1074 => Some(Mode::WeeklyInfo),
            0x0102 => Some(Mode::Pedometer),
            _ => None,
        }
    }

    /// Feature report payload for this mode (Big Endian).
    #[inline]
    pub fn encode(self) -> [u8; 2] {
        self.code().to_be_bytes()
    }
}

/// XOR of all bytes.
#[inline]
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Check whether a payload starts with the `"OK"` token.
#[inline]
pub fn has_ok_status(payload: &[u8]) -> bool {
    payload.len() >= STATUS_LEN && &payload[..STATUS_LEN] == STATUS_OK
}

/// Check whether `payload` is a (possibly partial) prefix of `"END\r\n"`.
#[inline]
pub fn is_end_marker_prefix(payload: &[u8]) -> bool {
    let n = payload.len().min(END_MARKER.len());
    payload[..n] == END_MARKER[..n]
}

/// Write a hex dump of `data` to the trace log.
pub(crate) fn trace_hexdump(label: &str, data: &[u8]) {
    if tracing::enabled!(tracing::Level::TRACE) {
        let hex: Vec<String> = data.iter().map(|b| format!("{:02x}", b)).collect();
        tracing::trace!("{}: {}", label, hex.join(" "));
    }
}
