//! Pedometer data.
//!
//! All pedometer commands run in [`Mode::Pedometer`]. Numeric fields are
//! packed decimal, some starting mid-byte, so offsets below are given as
//! byte or nibble positions into the full response payload.

use serde::Serialize;

use crate::bcd::{bcd_to_int, bcd_to_int2};
use crate::commands::absent_on_failure;
use crate::error::{OmronError, Result};
use crate::protocol::{Mode, Response};
use crate::session::Session;
use crate::transport::ReportTransport;

/// Number of days of history the pedometer keeps.
pub const PD_MAX_DAYS: u8 = 42;

/// Hours of data per hourly block.
pub const HOURS_PER_BLOCK: usize = 8;

/// Hourly blocks per day.
pub const BLOCKS_PER_DAY: u8 = 3;

const PROFILE_LEN: usize = 11;
const COUNT_LEN: usize = 6;
const DAILY_LEN: usize = 20;
const HOURLY_LEN: usize = 37;
const CLEAR_LEN: usize = 5;

const HOURLY_FIRST_OFFSET: usize = 4;
const ATTACHED_BIT: u8 = 0x40;
const STEPS_HIGH_MASK: u8 = 0x3f;

/// Wearer profile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PdProfile {
    /// Weight (lbs).
    pub weight: f32,
    /// Stride length (inches).
    pub stride: f32,
}

/// Number of valid daily and hourly packets stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PdCountInfo {
    pub daily_count: u32,
    pub hourly_count: u32,
}

/// Daily totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PdDailyData {
    pub total_steps: u32,
    pub total_aerobic_steps: u32,
    /// Minutes spent walking aerobically.
    pub total_aerobic_walking_time: u32,
    /// Kilocalories burned.
    pub total_calories: u32,
    /// Miles.
    pub total_distance: f32,
    /// Grams of fat burned.
    pub total_fat_burn: f32,
    /// Days before today.
    pub day_serial: u8,
    pub present: bool,
}

/// Steps taken in one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PdHourlyData {
    /// Days before today.
    pub day_serial: u8,
    /// Hour of the day, 0..24.
    pub hour_serial: u8,
    /// The pedometer was worn this hour.
    pub is_attached: bool,
    /// An event was recorded this hour.
    pub event: bool,
    pub regular_steps: u16,
    pub aerobic_steps: u16,
    pub present: bool,
}

/// A full day of hourly data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PdHourlyDay {
    pub day_serial: u8,
    pub hours: [PdHourlyData; 24],
}

impl PdHourlyDay {
    /// Hours with valid data.
    pub fn present_hours(&self) -> impl Iterator<Item = &PdHourlyData> {
        self.hours.iter().filter(|hour| hour.present)
    }

    /// Sum of regular and aerobic steps over all present hours.
    pub fn total_steps(&self) -> u32 {
        self.present_hours()
            .map(|hour| u32::from(hour.regular_steps) + u32::from(hour.aerobic_steps))
            .sum()
    }
}

fn check_day(day: u8) -> Result<()> {
    if day >= PD_MAX_DAYS {
        return Err(OmronError::BadArgument(format!(
            "day {} out of range 0..{}",
            day, PD_MAX_DAYS
        )));
    }
    Ok(())
}

fn decode_daily(response: &Response, day: u8) -> Result<PdDailyData> {
    response.require_len(DAILY_LEN)?;
    let data = response.payload();
    Ok(PdDailyData {
        total_steps: bcd_to_int(data, 3, 5)?,
        total_aerobic_steps: bcd_to_int2(data, 11, 5)?,
        total_aerobic_walking_time: bcd_to_int(data, 8, 4)?,
        total_calories: bcd_to_int(data, 10, 5)?,
        total_distance: bcd_to_int2(data, 25, 5)? as f32 / 100.0,
        total_fat_burn: bcd_to_int(data, 15, 4)? as f32 / 10.0,
        day_serial: day,
        present: true,
    })
}

fn decode_hourly_block(
    response: &Response,
    day: u8,
    block: u8,
) -> Result<[PdHourlyData; HOURS_PER_BLOCK]> {
    response.require_len(HOURLY_LEN)?;
    let data = response.payload();
    let mut hours = [PdHourlyData::default(); HOURS_PER_BLOCK];
    for (j, hour) in hours.iter_mut().enumerate() {
        let offset = HOURLY_FIRST_OFFSET + 4 * j;
        let b = &data[offset..offset + 4];
        *hour = PdHourlyData {
            day_serial: day,
            hour_serial: block * HOURS_PER_BLOCK as u8 + j as u8,
            is_attached: b[0] & ATTACHED_BIT != 0,
            event: b[2] & ATTACHED_BIT != 0,
            regular_steps: (u16::from(b[0] & STEPS_HIGH_MASK) << 8) | u16::from(b[1]),
            aerobic_steps: (u16::from(b[2] & STEPS_HIGH_MASK) << 8) | u16::from(b[3]),
            present: true,
        };
    }
    Ok(hours)
}

impl<T: ReportTransport> Session<T> {
    /// Wearer weight and stride.
    pub fn pd_profile(&mut self) -> Result<PdProfile> {
        let response = self.exchange(Mode::Pedometer, b"PRF00", PROFILE_LEN)?;
        response.require_len(PROFILE_LEN)?;
        let data = response.payload();
        Ok(PdProfile {
            weight: bcd_to_int(data, 2, 4)? as f32 / 10.0,
            stride: bcd_to_int(data, 4, 4)? as f32 / 10.0,
        })
    }

    /// Number of stored daily and hourly packets.
    pub fn pd_data_count(&mut self) -> Result<PdCountInfo> {
        let response = self.exchange(Mode::Pedometer, b"CNT00", COUNT_LEN)?;
        response.require_len(COUNT_LEN)?;
        let data = response.payload();
        Ok(PdCountInfo {
            daily_count: bcd_to_int(data, 2, 3)?,
            hourly_count: bcd_to_int2(data, 7, 3)?,
        })
    }

    /// Daily totals for `day` days ago.
    pub fn pd_daily_data(&mut self, day: u8) -> Result<PdDailyData> {
        check_day(day)?;
        let command = [b'M', b'E', b'S', 0x00, 0x00, day, day];
        let result = self
            .exchange(Mode::Pedometer, &command, DAILY_LEN)
            .and_then(|response| decode_daily(&response, day));
        absent_on_failure("pedometer daily data", result)
    }

    /// Hourly steps for `day` days ago, fetched in three 8-hour blocks.
    ///
    /// A block that cannot be read leaves its hours absent; the other blocks
    /// are still returned.
    pub fn pd_hourly_data(&mut self, day: u8) -> Result<PdHourlyDay> {
        check_day(day)?;
        let mut result = PdHourlyDay {
            day_serial: day,
            ..Default::default()
        };
        for block in 0..BLOCKS_PER_DAY {
            let n = block + 1;
            let command = [b'G', b'T', b'D', 0x00, 0x00, day, n, day ^ n];
            let hours = self
                .exchange(Mode::Pedometer, &command, HOURLY_LEN)
                .and_then(|response| decode_hourly_block(&response, day, block));
            let hours = absent_on_failure("pedometer hourly block", hours)?;

            let start = usize::from(block) * HOURS_PER_BLOCK;
            result.hours[start..start + HOURS_PER_BLOCK].copy_from_slice(&hours);
        }
        Ok(result)
    }

    /// Erase all pedometer history.
    pub fn clear_pd_memory(&mut self) -> Result<()> {
        self.exchange(Mode::Pedometer, b"CTD00", CLEAR_LEN)?;
        tracing::info!("Pedometer memory cleared");
        Ok(())
    }
}
