//! libusb transport built on rusb
//!
//! Kernel HID drivers grab the TEMPer2 interfaces on Linux, so claiming an
//! endpoint detaches the kernel driver first and closing the device gives
//! the interfaces back to the kernel.

use super::{Endpoint, Transport, UsbDevice};
use crate::error::TransportError;
use crate::model::SensorModel;
use protocol::DeviceIdentity;
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for each USB transfer (1 second)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Transport backed by a libusb context
pub struct RusbTransport {
    context: Context,
    timeout: Duration,
}

/// Summary of a device visible on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub bus_number: u8,
    pub address: u8,
    pub identity: DeviceIdentity,
    /// Supported sensor model, if the identity matches one
    pub model: Option<SensorModel>,
}

impl RusbTransport {
    /// Create a transport with the default transfer timeout
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom transfer timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let context = Context::new().map_err(map_rusb_error)?;
        debug!("libusb context created (timeout={}ms)", timeout.as_millis());
        Ok(Self { context, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List every device visible to libusb
    ///
    /// Devices whose descriptor cannot be read are skipped.
    pub fn list_devices(&self) -> Result<Vec<DeviceSummary>, TransportError> {
        let devices = self.context.devices().map_err(map_rusb_error)?;

        let mut summaries = Vec::new();
        for device in devices.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    debug!(
                        "Skipping device bus={} addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    continue;
                }
            };
            let identity = DeviceIdentity::new(descriptor.vendor_id(), descriptor.product_id());
            summaries.push(DeviceSummary {
                bus_number: device.bus_number(),
                address: device.address(),
                identity,
                model: SensorModel::from_identity(identity),
            });
        }

        Ok(summaries)
    }

    /// Devices on the bus whose descriptor matches `identity`
    fn matching(&self, identity: DeviceIdentity) -> Result<Vec<Device<Context>>, TransportError> {
        let devices = self.context.devices().map_err(map_rusb_error)?;

        Ok(devices
            .iter()
            .filter(|device| {
                device
                    .device_descriptor()
                    .map(|d| identity.matches(d.vendor_id(), d.product_id()))
                    .unwrap_or(false)
            })
            .collect())
    }

    fn open(&self, device: &Device<Context>) -> Result<RusbDevice, TransportError> {
        let handle = device.open().map_err(|e| {
            warn!(
                "Failed to open device bus={} addr={}: {}",
                device.bus_number(),
                device.address(),
                e
            );
            map_rusb_error(e)
        })?;

        debug!(
            "Opened device bus={} addr={}",
            device.bus_number(),
            device.address()
        );

        Ok(RusbDevice {
            handle,
            bus_number: device.bus_number(),
            address: device.address(),
            timeout: self.timeout,
            claimed_interfaces: Vec::new(),
            detached_interfaces: Vec::new(),
        })
    }
}

impl Transport for RusbTransport {
    type Device = RusbDevice;

    fn open_device(&self, identity: DeviceIdentity) -> Result<RusbDevice, TransportError> {
        let device = self
            .matching(identity)?
            .into_iter()
            .next()
            .ok_or(TransportError::NotFound)?;
        self.open(&device)
    }

    fn open_all(&self, identity: DeviceIdentity) -> Result<Vec<RusbDevice>, TransportError> {
        let matching = self.matching(identity)?;
        debug!("Found {} device(s) matching {}", matching.len(), identity);

        let mut opened = Vec::with_capacity(matching.len());
        for device in &matching {
            match self.open(device) {
                Ok(dev) => opened.push(dev),
                Err(e) => {
                    for dev in opened {
                        if let Err(close_err) = dev.close() {
                            debug!("Close after failed enumeration: {}", close_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(opened)
    }
}

/// Open libusb device handle
pub struct RusbDevice {
    handle: DeviceHandle<Context>,
    bus_number: u8,
    address: u8,
    timeout: Duration,
    /// Interfaces claimed by us
    claimed_interfaces: Vec<u8>,
    /// Interfaces we detached a kernel driver from
    detached_interfaces: Vec<u8>,
}

impl RusbDevice {
    pub fn bus_number(&self) -> u8 {
        self.bus_number
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn detach_kernel_driver(&mut self, interface: u8) {
        match self.handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!(
                    "Detaching kernel driver from interface {} on bus={} addr={}",
                    interface, self.bus_number, self.address
                );
                match self.handle.detach_kernel_driver(interface) {
                    Ok(()) => self.detached_interfaces.push(interface),
                    // Claiming will fail next and report the real problem
                    Err(e) => warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    ),
                }
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", interface);
            }
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }
    }

    /// Check the active configuration for `address` on `interface`/`alt_setting`
    fn has_endpoint(&self, interface: u8, alt_setting: u8, address: u8) -> bool {
        let config = match self.handle.device().active_config_descriptor() {
            Ok(c) => c,
            Err(e) => {
                // Let the first transfer surface the problem instead
                debug!("Could not read active config descriptor: {}", e);
                return true;
            }
        };

        config
            .interfaces()
            .filter(|i| i.number() == interface)
            .flat_map(|i| i.descriptors())
            .filter(|d| d.setting_number() == alt_setting)
            .flat_map(|d| d.endpoint_descriptors())
            .any(|ep| ep.address() == address)
    }
}

impl UsbDevice for RusbDevice {
    fn claim_endpoint(
        &mut self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> Result<Endpoint, TransportError> {
        if !self.claimed_interfaces.contains(&interface) {
            self.detach_kernel_driver(interface);

            self.handle.claim_interface(interface).map_err(|e| {
                warn!("Failed to claim interface {}: {}", interface, e);
                map_rusb_error(e)
            })?;
            self.claimed_interfaces.push(interface);
            debug!("Claimed interface {}", interface);
        }

        // Alternate setting 0 is already active after a claim
        if alt_setting != 0 {
            self.handle
                .set_alternate_setting(interface, alt_setting)
                .map_err(map_rusb_error)?;
        }

        if !self.has_endpoint(interface, alt_setting, address) {
            return Err(TransportError::Other {
                message: format!(
                    "endpoint {:#04x} not present on interface {} alt {}",
                    address, interface, alt_setting
                ),
            });
        }

        Ok(Endpoint { interface, address })
    }

    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        debug!(
            "Control transfer: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, data_len={}",
            request_type,
            request,
            value,
            index,
            data.len()
        );

        self.handle
            .write_control(request_type, request, value, index, data, self.timeout)
            .map_err(map_rusb_error)
    }

    fn interrupt_read(
        &mut self,
        endpoint: Endpoint,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        let len = self
            .handle
            .read_interrupt(endpoint.address, buf, self.timeout)
            .map_err(map_rusb_error)?;
        debug!(
            "Interrupt read on endpoint {:#x}: {} bytes",
            endpoint.address, len
        );
        Ok(len)
    }

    fn close(mut self) -> Result<(), TransportError> {
        let mut first_error = None;

        for interface in std::mem::take(&mut self.claimed_interfaces) {
            if let Err(e) = self.handle.release_interface(interface) {
                warn!("Failed to release interface {}: {}", interface, e);
                first_error.get_or_insert(map_rusb_error(e));
            }
        }

        // Give the interfaces back to the kernel HID driver
        for interface in std::mem::take(&mut self.detached_interfaces) {
            match self.handle.attach_kernel_driver(interface) {
                Ok(()) => debug!("Reattached kernel driver to interface {}", interface),
                Err(e) => debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    interface, e
                ),
            }
        }

        debug!(
            "Closed device bus={} addr={}",
            self.bus_number, self.address
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Map rusb::Error to TransportError
pub fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::Pipe => TransportError::Pipe,
        rusb::Error::NoDevice => TransportError::NoDevice,
        rusb::Error::NotFound => TransportError::NotFound,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::Io => TransportError::Io,
        rusb::Error::Access => TransportError::Access,
        _ => TransportError::Other {
            message: err.to_string(),
        },
    }
}
