//! Protocol module - wire format, command framing, and response reassembly.
//!
//! This module implements the report-level protocol:
//! - Mode codes, status tokens and checksum helpers
//! - Splitting commands into length-prefixed reports
//! - Reassembling and validating chunked responses

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{
    build_reports, chunk_capacity, command_chunks, encode_report, report_count, CommandChunks,
    Response,
};
pub use frame_buffer::{Progress, ResponseBuffer};
pub(crate) use wire_format::trace_hexdump;
pub use wire_format::{
    has_ok_status, is_end_marker_prefix, xor_checksum, Mode, DEFAULT_REPORT_SIZE, END_MARKER,
    MAX_REPORT_SIZE, MIN_REPORT_SIZE, OMRON_PID, OMRON_VID, STATUS_LEN, STATUS_NO, STATUS_OK,
};
