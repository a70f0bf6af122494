//! Raw interrupt frames and the fixed-point decode
//!
//! Each frame carries two channels as signed big-endian 16-bit values:
//! bytes 2..4 for the inner probe and bytes 4..6 for the outer probe.
//! `0xFF 0xFF` marks a disconnected or invalid probe.

use crate::error::{ProtocolError, Result};
use crate::reading::{Channel, TemperatureReading};
use crate::report::FRAME_LEN;
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

/// Scale used to turn a channel's raw value into degrees Celsius
///
/// Firmware revisions documented two formulas for the same fixed-point
/// field; both are kept so a model can name the one its firmware uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodeScale {
    /// Signed 8.8 fixed point: `raw / 256`
    #[default]
    #[serde(rename = "q8_8")]
    Q8_8,
    /// Older firmware formula: `raw * 125 / 32000`
    #[serde(rename = "legacy")]
    Legacy,
}

impl DecodeScale {
    /// Convert a raw signed channel value to Celsius
    pub fn apply(self, raw: i16) -> f64 {
        match self {
            DecodeScale::Q8_8 => f64::from(raw) / 256.0,
            DecodeScale::Legacy => f64::from(raw) * (125.0 / 32000.0),
        }
    }
}

/// Decode one channel using the 8.8 fixed-point scale
pub fn decode(hi: u8, lo: u8) -> f64 {
    decode_with(DecodeScale::Q8_8, hi, lo)
}

/// Decode one channel with an explicit scale
pub fn decode_with(scale: DecodeScale, hi: u8, lo: u8) -> f64 {
    if hi == 0xFF && lo == 0xFF {
        return f64::NAN;
    }
    scale.apply(BigEndian::read_i16(&[hi, lo]))
}

/// One 8-byte frame read from the sensor's interrupt endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample([u8; FRAME_LEN]);

impl RawSample {
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a sample from a transfer buffer, rejecting short frames
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let bytes: [u8; FRAME_LEN] = data
            .get(..FRAME_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(ProtocolError::ShortFrame {
                expected: FRAME_LEN,
                actual: data.len(),
            })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// The `(hi, lo)` byte pair encoding a channel
    pub fn channel_bytes(&self, channel: Channel) -> (u8, u8) {
        let offset = channel.offset();
        (self.0[offset], self.0[offset + 1])
    }

    /// Decode both channels
    pub fn decode(&self, scale: DecodeScale) -> TemperatureReading {
        let (hi, lo) = self.channel_bytes(Channel::Inner);
        let inner = decode_with(scale, hi, lo);
        let (hi, lo) = self.channel_bytes(Channel::Outer);
        let outer = decode_with(scale, hi, lo);
        TemperatureReading::new(inner, outer)
    }
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for every byte pair except the sentinel
    fn non_sentinel_pair() -> impl Strategy<Value = (u8, u8)> {
        (any::<u8>(), any::<u8>()).prop_filter("sentinel", |&(hi, lo)| hi != 0xFF || lo != 0xFF)
    }

    proptest! {
        /// Property: non-sentinel pairs decode as signed big-endian / 256
        #[test]
        fn prop_decode_is_signed_fixed_point((hi, lo) in non_sentinel_pair()) {
            let expected = f64::from(i16::from_be_bytes([hi, lo])) / 256.0;
            prop_assert_eq!(decode(hi, lo), expected);
        }

        /// Property: only the sentinel pair yields NaN
        #[test]
        fn prop_only_sentinel_is_nan(hi in any::<u8>(), lo in any::<u8>()) {
            prop_assert_eq!(decode(hi, lo).is_nan(), hi == 0xFF && lo == 0xFF);
        }

        /// Property: bytes outside 2..6 never affect the reading
        #[test]
        fn prop_padding_bytes_ignored(
            frame in proptest::array::uniform8(any::<u8>()),
            noise in proptest::array::uniform4(any::<u8>()),
        ) {
            let mut other = frame;
            other[0] = noise[0];
            other[1] = noise[1];
            other[6] = noise[2];
            other[7] = noise[3];

            let a = RawSample::new(frame).decode(DecodeScale::Q8_8);
            let b = RawSample::new(other).decode(DecodeScale::Q8_8);
            prop_assert_eq!(a.inner.to_bits(), b.inner.to_bits());
            prop_assert_eq!(a.outer.to_bits(), b.outer.to_bits());
        }

        /// Property: both firmware formulas agree on every raw value
        #[test]
        fn prop_scales_agree(raw in any::<i16>()) {
            prop_assert_eq!(DecodeScale::Q8_8.apply(raw), DecodeScale::Legacy.apply(raw));
        }
    }
}
