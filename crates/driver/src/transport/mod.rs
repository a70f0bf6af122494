//! USB transport abstraction
//!
//! The driver needs a very small capability surface from the host USB
//! stack: locate a device by VID/PID, claim endpoints, write control
//! transfers and read interrupt frames. [`Transport`] and [`UsbDevice`]
//! capture exactly that, so the handshake can run against libusb through
//! [`RusbTransport`] or against a recording double in tests.

pub mod libusb;

pub use libusb::{DeviceSummary, RusbDevice, RusbTransport};

use crate::error::TransportError;
use protocol::DeviceIdentity;

/// A claimed endpoint on an open device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Interface the endpoint belongs to
    pub interface: u8,
    /// Endpoint address (bit 7 set = IN)
    pub address: u8,
}

/// Entry point into a USB host stack
pub trait Transport {
    type Device: UsbDevice;

    /// Open the first attached device matching `identity`
    ///
    /// Returns [`TransportError::NotFound`] when none is attached.
    fn open_device(&self, identity: DeviceIdentity) -> Result<Self::Device, TransportError>;

    /// Open every attached device matching `identity`
    fn open_all(&self, identity: DeviceIdentity) -> Result<Vec<Self::Device>, TransportError>;
}

/// An open connection to one physical device
pub trait UsbDevice {
    /// Claim `interface`, select `alt_setting` and hand back the endpoint
    fn claim_endpoint(
        &mut self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> Result<Endpoint, TransportError>;

    /// Host-to-device control transfer; returns the number of bytes written
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransportError>;

    /// Read one interrupt transfer into `buf`; returns the number of bytes read
    fn interrupt_read(&mut self, endpoint: Endpoint, buf: &mut [u8])
    -> Result<usize, TransportError>;

    /// Release claimed interfaces and close the device
    fn close(self) -> Result<(), TransportError>;
}
