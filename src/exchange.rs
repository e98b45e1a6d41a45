//! Exchange controller.
//!
//! [`Session::exchange`] is the single entry point for issuing a command:
//! ensure the mode, send, receive. Bad data (garbled status or checksum) is
//! retried with escalating recovery; every other outcome is returned as is.
//!
//! ```text
//! Attempt ──bad data──► FlushRetry ──bad data──► ResyncRetry ──bad data──► Failed
//!                       flush input              forced mode switch
//!                       + resend                 + clear + resend
//! ```

use crate::error::Result;
use crate::protocol::{Mode, Response};
use crate::session::Session;
use crate::transport::ReportTransport;

/// Recovery tier of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryTier {
    /// First send.
    Attempt,
    /// Flush queued input, then resend.
    FlushRetry,
    /// Force a mode switch and clear handshake, then resend.
    ResyncRetry,
    /// Give up and report the bad data.
    Failed,
}

impl RetryTier {
    /// Next tier after a bad-data failure.
    pub fn escalate(self) -> Self {
        match self {
            RetryTier::Attempt => RetryTier::FlushRetry,
            RetryTier::FlushRetry => RetryTier::ResyncRetry,
            RetryTier::ResyncRetry | RetryTier::Failed => RetryTier::Failed,
        }
    }

    /// Send attempts made once this tier is reached.
    pub fn attempts(self) -> usize {
        match self {
            RetryTier::Attempt => 1,
            RetryTier::FlushRetry => 2,
            RetryTier::ResyncRetry | RetryTier::Failed => 3,
        }
    }
}

impl<T: ReportTransport> Session<T> {
    /// Issue `command` in `mode` and return the validated response.
    ///
    /// `expected_len` is the full response length, status token and checksum
    /// included. A shorter response is accepted if its last chunk is short.
    ///
    /// # Errors
    ///
    /// - `NegativeResponse` when the device answers `"NO"`
    /// - `BadData` after three failed attempts
    /// - `DeviceIo` / `NotOpen` from the transport, never retried
    pub fn exchange(&mut self, mode: Mode, command: &[u8], expected_len: usize) -> Result<Response> {
        let span = self.span.clone();
        let _enter = span.enter();

        self.ensure_mode(mode)?;

        let mut tier = RetryTier::Attempt;
        loop {
            match self.transact(command, expected_len) {
                Err(err) if err.is_retryable() => {
                    tier = tier.escalate();
                    match tier {
                        RetryTier::FlushRetry => {
                            tracing::debug!("{}, flushing and resending", err);
                            self.flush_input()?;
                        }
                        RetryTier::ResyncRetry => {
                            tracing::debug!("{}, resynchronizing {:?} and resending", err, mode);
                            self.switch_mode(mode)?;
                        }
                        _ => {
                            tracing::warn!("{} after {} attempts, giving up", err, tier.attempts());
                            return Err(err);
                        }
                    }
                }
                result => return result,
            }
        }
    }

    fn transact(&mut self, command: &[u8], expected_len: usize) -> Result<Response> {
        self.send_command(command)?;
        self.receive_response(expected_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OmronError;
    use crate::transport::mock::{ok_payload, MockTransport, Reply};
    use crate::SessionConfig;

    fn session_with<F>(responder: F) -> Session<MockTransport>
    where
        F: FnMut(&[u8]) -> Reply + 'static,
    {
        Session::from_transport(MockTransport::new(responder), SessionConfig::default()).unwrap()
    }

    /// Responder failing the first `bad` answers with a broken checksum.
    fn flaky(bad: usize) -> impl FnMut(&[u8]) -> Reply {
        let mut answered = 0;
        move |_: &[u8]| {
            answered += 1;
            let mut payload = ok_payload(&[0x01, 0x02, 0x03]);
            if answered <= bad {
                payload[4] ^= 0xff;
            }
            Reply::Payload(payload)
        }
    }

    #[test]
    fn test_tier_escalation_order() {
        assert_eq!(RetryTier::Attempt.escalate(), RetryTier::FlushRetry);
        assert_eq!(RetryTier::FlushRetry.escalate(), RetryTier::ResyncRetry);
        assert_eq!(RetryTier::ResyncRetry.escalate(), RetryTier::Failed);
        assert_eq!(RetryTier::Failed.escalate(), RetryTier::Failed);
        assert_eq!(RetryTier::Failed.attempts(), 3);
    }

    #[test]
    fn test_clean_exchange() {
        let mut session = session_with(flaky(0));
        let response = session.exchange(Mode::DailyInfo, b"GDC", 6).unwrap();
        assert_eq!(response.body(), &[0x01, 0x02, 0x03]);

        let log = session.transport().unwrap().log();
        assert_eq!(log.commands.len(), 1);
        assert_eq!(log.feature_reports.len(), 1);
    }

    #[test]
    fn test_single_bad_response_fixed_by_resend() {
        let mut session = session_with(flaky(1));
        assert!(session.exchange(Mode::DailyInfo, b"GDC", 6).is_ok());

        let log = session.transport().unwrap().log();
        assert_eq!(log.commands.len(), 2);
        assert_eq!(log.feature_reports.len(), 1);
        assert_eq!(log.clears, 1);
    }

    #[test]
    fn test_two_bad_responses_trigger_one_resync() {
        let mut session = session_with(flaky(2));
        assert!(session.exchange(Mode::WeeklyInfo, b"GMA", 6).is_ok());

        let log = session.transport().unwrap().log();
        assert_eq!(log.commands.len(), 3);
        // Initial switch plus exactly one forced resync.
        assert_eq!(log.feature_reports.len(), 2);
        assert_eq!(log.clears, 2);
        assert_eq!(session.mode(), Mode::WeeklyInfo);
    }

    #[test]
    fn test_persistent_bad_data_gives_up_after_three_attempts() {
        let mut session = session_with(flaky(usize::MAX));
        let result = session.exchange(Mode::DailyInfo, b"GDC", 6);
        assert!(matches!(result, Err(OmronError::BadData(_))));

        let log = session.transport().unwrap().log();
        assert_eq!(log.commands.len(), 3);
        assert_eq!(log.feature_reports.len(), 2);
    }

    #[test]
    fn test_negative_response_not_retried() {
        let mut session = session_with(|_| Reply::Payload(b"NO".to_vec()));
        let result = session.exchange(Mode::Pedometer, b"CNT00", 6);
        assert!(matches!(result, Err(OmronError::NegativeResponse)));
        assert_eq!(session.transport().unwrap().log().commands.len(), 1);
    }

    #[test]
    fn test_device_error_not_retried() {
        let mut session = session_with(|_| Reply::Fail("unplugged".to_string()));
        let result = session.exchange(Mode::Pedometer, b"CNT00", 6);
        assert!(matches!(result, Err(OmronError::DeviceIo(_))));
        assert_eq!(session.transport().unwrap().log().commands.len(), 1);
    }

    #[test]
    fn test_garbled_first_report_leftovers_flushed() {
        let mut answered = 0;
        let mut session = session_with(move |_| {
            answered += 1;
            if answered == 1 {
                // Garbled status with a second report still queued.
                Reply::Payload(vec![b'X', b'Y', 1, 2, 3, 4, 5, 6, 7, 8, 9])
            } else {
                Reply::Payload(ok_payload(&[0x07]))
            }
        });
        let response = session.exchange(Mode::DailyInfo, b"GDC", 4).unwrap();
        assert_eq!(response.body(), &[0x07]);
        assert_eq!(session.transport().unwrap().queued_reports(), 0);
    }

    #[test]
    fn test_mode_switch_skipped_when_current() {
        let mut session = session_with(flaky(0));
        session.exchange(Mode::DailyInfo, b"GDC", 6).unwrap();
        session.exchange(Mode::DailyInfo, b"GDC", 6).unwrap();
        session.exchange(Mode::WeeklyInfo, b"GMA", 6).unwrap();

        let log = session.transport().unwrap().log();
        assert_eq!(log.feature_reports, vec![vec![0x74, 0xbc], vec![0x10, 0x74]]);
    }
}
