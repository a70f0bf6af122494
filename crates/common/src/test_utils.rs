//! Test utilities for pcsensor
//!
//! Helpers for building sensor frames and bounding async tests.
//!
//! # Example
//!
//! ```
//! use common::test_utils::frame_for_celsius;
//!
//! let frame = frame_for_celsius(23.5, -1.0);
//! assert_eq!(&frame[2..6], &[0x17, 0x80, 0xff, 0x00]);
//! ```

use protocol::FRAME_LEN;
use std::future::Future;
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Byte pair a probe reports when it is disconnected
pub const INVALID_PROBE: (u8, u8) = (0xFF, 0xFF);

/// Build an interrupt frame from raw channel byte pairs
///
/// Bytes outside the two channels are filled like a real TEMPer2 frame
/// (report id 0x80, length 0x02 and zero padding).
pub fn sample_frame(inner: (u8, u8), outer: (u8, u8)) -> [u8; FRAME_LEN] {
    [0x80, 0x02, inner.0, inner.1, outer.0, outer.1, 0x00, 0x00]
}

/// Encode a Celsius value as the sensor's signed 8.8 fixed-point pair
pub fn celsius_to_bytes(celsius: f64) -> (u8, u8) {
    let raw = (celsius * 256.0).round() as i16;
    let [hi, lo] = raw.to_be_bytes();
    (hi, lo)
}

/// Build an interrupt frame reporting the given Celsius values
pub fn frame_for_celsius(inner: f64, outer: f64) -> [u8; FRAME_LEN] {
    sample_frame(celsius_to_bytes(inner), celsius_to_bytes(outer))
}

/// Run a future with a timeout
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}
