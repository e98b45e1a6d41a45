//! Mode state machine.
//!
//! The device only accepts a command in the matching [`Mode`]. Switching is a
//! 2-byte feature report followed by the clear handshake: flush queued
//! input, send an all-zero command, and read the status token, repeated
//! until the device acknowledges with `"OK"`. With 2-byte reports the token
//! spans two reports.

use crate::error::{OmronError, Result};
use crate::protocol::{Mode, STATUS_LEN, STATUS_OK};
use crate::session::Session;
use crate::transport::ReportTransport;

impl<T: ReportTransport> Session<T> {
    /// Make sure the device is in `mode`, switching if needed.
    ///
    /// A no-op when the session is already in `mode`, unless
    /// [`SessionConfig::always_switch_mode`](crate::SessionConfig::always_switch_mode)
    /// is set.
    pub fn ensure_mode(&mut self, mode: Mode) -> Result<()> {
        if self.mode == mode && !self.config.always_switch_mode {
            return Ok(());
        }
        self.switch_mode(mode)
    }

    /// Switch into `mode` unconditionally and resynchronize.
    ///
    /// If the feature report fails the error is returned and the recorded
    /// mode is left unchanged.
    pub fn switch_mode(&mut self, mode: Mode) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        let timeout = self.config.mode_timeout();
        let transport = self.transport_mut().ok_or(OmronError::NotOpen)?;
        transport.set_feature_report(&mode.encode(), timeout)?;

        tracing::info!("Switched mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.clear_handshake()
    }

    /// Send clear commands until the device acknowledges one.
    ///
    /// Only a transport error ends the loop early. A read timeout counts as a
    /// transport error here.
    fn clear_handshake(&mut self) -> Result<()> {
        let clear = vec![0u8; self.config.clear_command_len];
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            self.flush_input()?;
            self.send_command(&clear)?;
            if self.read_acknowledgement()? {
                break;
            }
            tracing::debug!("Clear attempt {} not acknowledged", attempts);
        }
        tracing::debug!("Clear handshake done after {} attempts", attempts);
        Ok(())
    }

    /// Read reports until `STATUS_LEN` status bytes are in, then compare.
    fn read_acknowledgement(&mut self) -> Result<bool> {
        let mut status = [0u8; STATUS_LEN];
        let mut filled = 0;
        while filled < STATUS_LEN {
            let report = self.read_data_report()?;
            let capacity = report.len() - 1;
            let declared = usize::from(report[0]);
            let len = if declared == report.len() {
                capacity
            } else {
                declared
            };
            if len == 0 || len > capacity {
                return Ok(false);
            }
            let take = len.min(STATUS_LEN - filled);
            status[filled..filled + take].copy_from_slice(&report[1..=take]);
            filled += take;
        }
        Ok(&status == STATUS_OK)
    }
}
