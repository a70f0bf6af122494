//! Driver for PCsensor TEMPer2 USB thermometers
//!
//! Opening a sensor claims its two HID interfaces and runs the fixed
//! power-on handshake; each read then re-arms the sensor with one control
//! write and decodes the 8-byte interrupt frame it answers with.
//!
//! All I/O goes through the [`Transport`] / [`UsbDevice`] traits.
//! [`RusbTransport`] talks to real hardware through libusb, and
//! [`testing::RecordingTransport`] records calls for tests.
//!
//! # Example
//!
//! ```no_run
//! use driver::{RusbTransport, discover, SensorModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = RusbTransport::new()?;
//! for mut sensor in discover(&transport, SensorModel::Temper2)? {
//!     println!("{}", sensor.read_temperatures()?);
//!     sensor.close()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod handle;
mod handshake;
pub mod model;
pub mod sensor;
pub mod testing;
pub mod transport;

pub use discovery::{discover, discover_all, open};
pub use error::{Result, SensorError, Step, TransportError};
pub use handle::SensorHandle;
pub use model::{HandshakeAction, HandshakeOp, SensorModel};
pub use sensor::Sensor;
pub use transport::{DeviceSummary, Endpoint, RusbDevice, RusbTransport, Transport, UsbDevice};
