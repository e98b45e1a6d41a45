//! # omron-hid
//!
//! Command/response protocol engine for Omron health-monitoring USB HID
//! devices (blood-pressure meters and pedometers).
//!
//! The engine talks to the device through fixed-size reports and handles
//! everything above that: mode switching, command framing, chunked response
//! reassembly, checksum validation, retry with resynchronization, and
//! decoding of the device's records.
//!
//! ## Architecture
//!
//! - **Transport** ([`transport`]): the report channel, supplied by the caller
//! - **Protocol** ([`protocol`]): framing, reassembly, wire constants
//! - **Session** ([`Session`]): mode state, retry policy, domain commands
//!
//! ## Example
//!
//! ```
//! use omron_hid::transport::mock::{ok_payload, MockTransport, Reply};
//! use omron_hid::{Session, SessionConfig};
//!
//! let transport = MockTransport::new(|cmd: &[u8]| match cmd {
//!     [b'G', b'M', b'E', ..] => Reply::Payload(ok_payload(&[
//!         0, 9, 3, 15, 7, 30, 0, 0, 0, 120, 80, 65, 0, 0,
//!     ])),
//!     _ => Reply::Payload(b"NO".to_vec()),
//! });
//!
//! let mut session = Session::from_transport(transport, SessionConfig::default())?;
//! let reading = session.daily_bp_data(0, 0)?;
//! assert!(reading.present);
//! assert_eq!((reading.sys, reading.dia, reading.pulse), (120, 80, 65));
//! session.close()?;
//! # Ok::<(), omron_hid::OmronError>(())
//! ```

pub mod bcd;
pub mod commands;
pub mod config;
pub mod error;
pub mod exchange;
pub mod protocol;
pub mod transport;

mod mode;
mod session;

pub use commands::{
    BpDayInfo, BpWeekInfo, PdCountInfo, PdDailyData, PdHourlyData, PdHourlyDay, PdProfile,
    BP_BANKS, PD_MAX_DAYS,
};
pub use config::SessionConfig;
pub use error::{ErrorCode, OmronError, Result};
pub use exchange::RetryTier;
pub use protocol::{Mode, Response, OMRON_PID, OMRON_VID};
pub use session::Session;
pub use transport::{DeviceProvider, ReportTransport};
