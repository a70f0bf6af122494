//! Wire-level definitions for PCsensor TEMPer2 thermometers
//!
//! This crate holds everything about the sensor that is fixed by its
//! firmware: the USB identity, the endpoints to claim, the SET_REPORT
//! commands of the power-on handshake, and the decoding of the 8-byte
//! interrupt frames into Celsius. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use protocol::{DecodeScale, RawSample};
//!
//! let sample = RawSample::new([0x80, 0x02, 0x17, 0x80, 0x01, 0x2c, 0x00, 0x00]);
//! let reading = sample.decode(DecodeScale::Q8_8);
//! assert_eq!(reading.inner, 23.5);
//! assert_eq!(reading.outer, 1.171875);
//! ```

pub mod error;
pub mod identity;
pub mod reading;
pub mod report;
pub mod sample;

pub use error::{ProtocolError, Result};
pub use identity::{DeviceIdentity, TEMPER2};
pub use reading::{Channel, TemperatureReading};
pub use report::{
    ControlRequest, ENABLE_REPORTS, EndpointSpec, FRAME_LEN, HID_SET_REPORT, INIT_CALIBRATION,
    INIT_SECONDARY, READ_ENDPOINT, REQUEST_TEMPERATURE, REQUEST_TYPE_CLASS_INTERFACE_OUT,
    WRITE_ENDPOINT,
};
pub use sample::{DecodeScale, RawSample, decode, decode_with};
