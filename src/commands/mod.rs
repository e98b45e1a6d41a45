//! Domain commands.
//!
//! Each command builds a fixed-layout request, runs it through
//! [`Session::exchange`](crate::Session::exchange) in the mode its data class
//! lives in, and decodes the payload at fixed offsets:
//! - [`info`]: serial number, firmware version, profile text
//! - [`blood_pressure`]: daily readings and weekly averages
//! - [`pedometer`]: profile, counts, daily totals and hourly steps
//!
//! Records carrying a `present` flag come back zeroed with `present = false`
//! when the device has nothing valid for the slot. Transport errors and
//! argument errors still propagate.

pub mod blood_pressure;
pub mod info;
pub mod pedometer;

pub use blood_pressure::{BpDayInfo, BpWeekInfo, BP_BANKS};
pub use pedometer::{PdCountInfo, PdDailyData, PdHourlyData, PdHourlyDay, PdProfile, PD_MAX_DAYS};

use crate::error::{OmronError, Result};

/// Collapse "nothing valid here" failures into a default (absent) record.
pub(crate) fn absent_on_failure<R: Default>(what: &str, result: Result<R>) -> Result<R> {
    match result {
        Ok(record) => Ok(record),
        Err(
            err @ (OmronError::NegativeResponse
            | OmronError::BadData(_)
            | OmronError::UnexpectedEnd),
        ) => {
            tracing::debug!("No {} available: {}", what, err);
            Ok(R::default())
        }
        Err(err) => Err(err),
    }
}
