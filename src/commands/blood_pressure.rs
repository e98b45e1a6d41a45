//! Blood-pressure readings.
//!
//! Readings are stored in two banks (one per user). Daily readings live in
//! [`Mode::DailyInfo`], weekly morning/evening averages in
//! [`Mode::WeeklyInfo`].

use serde::Serialize;

use crate::commands::absent_on_failure;
use crate::error::{OmronError, Result};
use crate::protocol::{Mode, Response};
use crate::session::Session;
use crate::transport::ReportTransport;

/// Number of user banks.
pub const BP_BANKS: u8 = 2;

/// Response length of the daily count query.
pub const DAILY_COUNT_LEN: usize = 8;

/// Response length of a daily reading.
pub const DAILY_BP_LEN: usize = 17;

/// Response length of a weekly average.
pub const WEEKLY_BP_LEN: usize = 12;

/// Stored weekly systolic averages are offset by this much.
pub const WEEKLY_SYS_BIAS: u16 = 25;

/// One daily blood-pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BpDayInfo {
    /// Two-digit year.
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Systolic pressure (mmHg).
    pub sys: u16,
    /// Diastolic pressure (mmHg).
    pub dia: u16,
    /// Pulse (beats per minute).
    pub pulse: u16,
    /// True if the device returned a valid reading for this slot.
    pub present: bool,
}

/// A weekly average, morning or evening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BpWeekInfo {
    /// Two-digit year.
    pub year: u8,
    pub month: u8,
    /// Day the week starts on.
    pub day: u8,
    /// Systolic average (mmHg).
    pub sys: u16,
    /// Diastolic average (mmHg).
    pub dia: u16,
    /// Pulse average.
    pub pulse: u16,
    /// True if the week block is filled.
    pub present: bool,
}

fn check_bank(bank: u8) -> Result<()> {
    if bank >= BP_BANKS {
        return Err(OmronError::BadArgument(format!(
            "bank {} out of range 0..{}",
            bank, BP_BANKS
        )));
    }
    Ok(())
}

fn decode_day(response: &Response) -> Result<BpDayInfo> {
    response.require_len(DAILY_BP_LEN)?;
    let data = response.payload();
    Ok(BpDayInfo {
        year: data[3],
        month: data[4],
        day: data[5],
        hour: data[6],
        minute: data[7],
        second: data[8],
        sys: data[11].into(),
        dia: data[12].into(),
        pulse: data[13].into(),
        present: true,
    })
}

fn decode_week(response: &Response) -> Result<BpWeekInfo> {
    response.require_len(WEEKLY_BP_LEN)?;
    let data = response.payload();
    Ok(BpWeekInfo {
        year: data[4],
        month: data[5],
        day: data[6],
        sys: u16::from(data[8]) + WEEKLY_SYS_BIAS,
        dia: data[9].into(),
        pulse: data[10].into(),
        present: true,
    })
}

impl<T: ReportTransport> Session<T> {
    /// Number of daily readings stored in `bank`.
    pub fn daily_data_count(&mut self, bank: u8) -> Result<u8> {
        check_bank(bank)?;
        let command = [b'G', b'D', b'C', 0x00, bank, 0x00, 0x00, bank];
        let response = self.exchange(Mode::DailyInfo, &command, DAILY_COUNT_LEN)?;
        let count = response.byte(6)?;
        tracing::debug!("Bank {} holds {} daily readings", bank, count);
        Ok(count)
    }

    /// Daily reading `index` from `bank`.
    pub fn daily_bp_data(&mut self, bank: u8, index: u8) -> Result<BpDayInfo> {
        check_bank(bank)?;
        let command = [b'G', b'M', b'E', 0x00, bank, 0x00, index, index ^ bank];
        let result = self
            .exchange(Mode::DailyInfo, &command, DAILY_BP_LEN)
            .and_then(|response| decode_day(&response));
        absent_on_failure("daily reading", result)
    }

    /// Weekly average `index` from `bank`, evening or morning.
    pub fn weekly_bp_data(&mut self, bank: u8, index: u8, evening: bool) -> Result<BpWeekInfo> {
        check_bank(bank)?;
        let half = if evening { b'E' } else { b'M' };
        let command = [b'G', half, b'A', 0x00, bank, index, 0x00, 0x00, index ^ bank];
        let result = self
            .exchange(Mode::WeeklyInfo, &command, WEEKLY_BP_LEN)
            .and_then(|response| decode_week(&response));
        absent_on_failure("weekly average", result)
    }
}
