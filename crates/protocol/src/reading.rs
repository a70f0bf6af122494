//! Decoded temperature readings

use serde::Serialize;
use std::fmt;

/// Probe channel of a TEMPer2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Built-in probe
    Inner,
    /// External (cable) probe
    Outer,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Inner, Channel::Outer];

    /// Key used in the output mapping
    pub fn name(self) -> &'static str {
        match self {
            Channel::Inner => "inner",
            Channel::Outer => "outer",
        }
    }

    /// Offset of the channel's high byte in a frame
    pub(crate) fn offset(self) -> usize {
        match self {
            Channel::Inner => 2,
            Channel::Outer => 4,
        }
    }
}

/// Celsius values for both channels; NaN marks an invalid probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub inner: f64,
    pub outer: f64,
}

impl TemperatureReading {
    pub fn new(inner: f64, outer: f64) -> Self {
        Self { inner, outer }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Inner => self.inner,
            Channel::Outer => self.outer,
        }
    }

    /// `(name, celsius)` pairs in channel order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Channel::ALL.into_iter().map(|c| (c.name(), self.get(c)))
    }

    /// True when neither probe reported the invalid sentinel
    pub fn is_complete(&self) -> bool {
        !self.inner.is_nan() && !self.outer.is_nan()
    }
}

impl fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if value.is_nan() {
                write!(f, "{}=n/a", name)?;
            } else {
                write!(f, "{}={:.2}°C", name, value)?;
            }
        }
        Ok(())
    }
}
