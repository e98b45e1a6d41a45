//! Error types for omron-hid.

use thiserror::Error;

/// Stable numeric error codes, -1 through -7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Transport-level failure.
    DeviceIo = -1,
    /// Caller passed an invalid argument.
    BadArgument = -2,
    /// Device handle is not open.
    NotOpen = -3,
    /// Supplied buffer is too small.
    BufferTooSmall = -4,
    /// Device answered "NO".
    NegativeResponse = -5,
    /// End-of-response marker reached unexpectedly.
    UnexpectedEnd = -6,
    /// Checksum or format violation.
    BadData = -7,
}

impl ErrorCode {
    /// Human-readable description of the code.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::DeviceIo => "device I/O failed",
            ErrorCode::BadArgument => "invalid argument",
            ErrorCode::NotOpen => "device not open",
            ErrorCode::BufferTooSmall => "buffer too small",
            ErrorCode::NegativeResponse => "negative response from device",
            ErrorCode::UnexpectedEnd => "unexpected end of response",
            ErrorCode::BadData => "bad data received from device",
        }
    }

    /// Look up a code from its raw value.
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            -1 => Some(ErrorCode::DeviceIo),
            -2 => Some(ErrorCode::BadArgument),
            -3 => Some(ErrorCode::NotOpen),
            -4 => Some(ErrorCode::BufferTooSmall),
            -5 => Some(ErrorCode::NegativeResponse),
            -6 => Some(ErrorCode::UnexpectedEnd),
            -7 => Some(ErrorCode::BadData),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Main error type for all device operations.
#[derive(Debug, Error)]
pub enum OmronError {
    /// Transport failure (read/write/control transfer, or an unexpected timeout).
    #[error("Device I/O error: {0}")]
    DeviceIo(String),

    /// Caller misuse (bad bank, bad report size, index out of range...).
    #[error("Invalid argument: {0}")]
    BadArgument(String),

    /// The session has been closed.
    #[error("Device not open")]
    NotOpen,

    /// A buffer handed to the transport is smaller than one report.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The device answered "NO".
    #[error("Negative response from device")]
    NegativeResponse,

    /// The response ended before the fields a command needs.
    #[error("Unexpected end of response")]
    UnexpectedEnd,

    /// Garbled response or checksum failure.
    #[error("Bad data: {0}")]
    BadData(String),
}

impl OmronError {
    /// Numeric code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            OmronError::DeviceIo(_) => ErrorCode::DeviceIo,
            OmronError::BadArgument(_) => ErrorCode::BadArgument,
            OmronError::NotOpen => ErrorCode::NotOpen,
            OmronError::BufferTooSmall { .. } => ErrorCode::BufferTooSmall,
            OmronError::NegativeResponse => ErrorCode::NegativeResponse,
            OmronError::UnexpectedEnd => ErrorCode::UnexpectedEnd,
            OmronError::BadData(_) => ErrorCode::BadData,
        }
    }

    /// Only bad data is worth resending the command for.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, OmronError::BadData(_))
    }
}

impl From<std::io::Error> for OmronError {
    fn from(err: std::io::Error) -> Self {
        OmronError::DeviceIo(err.to_string())
    }
}

/// Result type alias using OmronError.
pub type Result<T> = std::result::Result<T, OmronError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_raw() {
        for raw in -7..=-1 {
            let code = ErrorCode::from_raw(raw).unwrap();
            assert_eq!(code as i32, raw);
        }
        assert!(ErrorCode::from_raw(0).is_none());
        assert!(ErrorCode::from_raw(-8).is_none());
    }

    #[test]
    fn test_error_maps_to_code() {
        assert_eq!(OmronError::NotOpen.code(), ErrorCode::NotOpen);
        assert_eq!(
            OmronError::BadData("x".into()).code(),
            ErrorCode::BadData
        );
        assert_eq!(
            OmronError::BufferTooSmall {
                needed: 8,
                available: 4
            }
            .code() as i32,
            -4
        );
    }

    #[test]
    fn test_only_bad_data_is_retryable() {
        assert!(OmronError::BadData("checksum".into()).is_retryable());
        assert!(!OmronError::NegativeResponse.is_retryable());
        assert!(!OmronError::DeviceIo("timeout".into()).is_retryable());
        assert!(!OmronError::UnexpectedEnd.is_retryable());
    }

    #[test]
    fn test_io_error_becomes_device_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: OmronError = io.into();
        assert_eq!(err.code(), ErrorCode::DeviceIo);
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let codes = [
            ErrorCode::DeviceIo,
            ErrorCode::BadArgument,
            ErrorCode::NotOpen,
            ErrorCode::BufferTooSmall,
            ErrorCode::NegativeResponse,
            ErrorCode::UnexpectedEnd,
            ErrorCode::BadData,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a.description(), b.description());
            }
        }
    }
}
