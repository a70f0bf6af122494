//! Sensor capability shared by all models

use crate::error::Result;
use crate::model::SensorModel;
use protocol::{DecodeScale, TemperatureReading};

/// An opened sensor of any model
///
/// Implementations are not safe for concurrent use; the `&mut self`
/// receivers keep one caller at a time.
pub trait Sensor {
    fn model(&self) -> SensorModel;

    /// Take one reading
    fn read_temperatures(&mut self) -> Result<TemperatureReading>;

    /// Release the device; later calls return [`crate::SensorError::Closed`]
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Override the decode scale the model's firmware normally uses
    fn set_decode_scale(&mut self, scale: DecodeScale);
}
