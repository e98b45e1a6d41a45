//! Transport module - the fixed-size report channel to the device.
//!
//! The protocol engine never talks to USB directly. It consumes:
//! - [`ReportTransport`]: raw report read/write plus the mode feature report
//! - [`DeviceProvider`]: enumeration and opening of matching devices
//!
//! Implementations live outside this crate (libusb, hidapi, OS HID APIs).
//! `mock` (behind the `mock` feature) provides a scripted in-memory device
//! for tests.

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::time::Duration;

use crate::error::Result;

/// A single opened device exchanging fixed-size reports.
pub trait ReportTransport {
    /// Input report size in bytes (device to host).
    fn input_size(&self) -> usize;

    /// Output report size in bytes (host to device).
    fn output_size(&self) -> usize;

    /// Read one input report into `buf`.
    ///
    /// Returns `Ok(None)` when `timeout` elapses without data. Whether that is
    /// an error is up to the caller.
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>>;

    /// Write one output report, returning the number of bytes written.
    fn write_report(&mut self, report: &[u8], timeout: Duration) -> Result<usize>;

    /// Send an out-of-band feature report (used for mode switching).
    fn set_feature_report(&mut self, data: &[u8], timeout: Duration) -> Result<()>;

    /// Release the device.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Enumerates and opens devices by vendor/product ID.
pub trait DeviceProvider {
    /// Transport produced by [`DeviceProvider::open`].
    type Transport: ReportTransport;

    /// Number of connected devices matching the IDs.
    fn count(&mut self, vendor_id: u16, product_id: u16) -> Result<usize>;

    /// Open the `index`-th matching device.
    fn open(&mut self, vendor_id: u16, product_id: u16, index: usize) -> Result<Self::Transport>;
}

impl<T: ReportTransport + ?Sized> ReportTransport for Box<T> {
    fn input_size(&self) -> usize {
        (**self).input_size()
    }

    fn output_size(&self) -> usize {
        (**self).output_size()
    }

    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        (**self).read_report(buf, timeout)
    }

    fn write_report(&mut self, report: &[u8], timeout: Duration) -> Result<usize> {
        (**self).write_report(report, timeout)
    }

    fn set_feature_report(&mut self, data: &[u8], timeout: Duration) -> Result<()> {
        (**self).set_feature_report(data, timeout)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
