//! Opened sensor handles

use crate::error::{Result, SensorError, Step, TransportError};
use crate::handshake;
use crate::model::SensorModel;
use crate::sensor::Sensor;
use crate::transport::{Endpoint, Transport, UsbDevice};
use protocol::{DecodeScale, TemperatureReading};
use tracing::{debug, info, warn};

struct OpenDevice<D> {
    device: D,
    read_endpoint: Endpoint,
}

/// One opened and initialized sensor
///
/// Created by [`SensorHandle::open`] after the full handshake succeeded.
/// After [`SensorHandle::close`] every operation returns
/// [`SensorError::Closed`] without touching the transport. A handle that is
/// dropped while still open closes its device.
pub struct SensorHandle<D: UsbDevice> {
    model: SensorModel,
    scale: DecodeScale,
    state: Option<OpenDevice<D>>,
}

impl<D: UsbDevice> SensorHandle<D> {
    /// Locate the first device of `model` and run its handshake
    pub fn open<T>(transport: &T, model: SensorModel) -> Result<Self>
    where
        T: Transport<Device = D>,
    {
        let identity = model.identity();
        let device = transport.open_device(identity).map_err(|e| match e {
            TransportError::NotFound => SensorError::NotFound { identity },
            other => SensorError::Transport(other),
        })?;

        Self::initialize(device, model)
    }

    /// Run the handshake on an already opened device
    ///
    /// On failure the device is closed before the error is returned.
    pub fn initialize(mut device: D, model: SensorModel) -> Result<Self> {
        match handshake::run(&mut device, model) {
            Ok(read_endpoint) => {
                info!("{} initialized", model);
                Ok(Self {
                    model,
                    scale: model.decode_scale(),
                    state: Some(OpenDevice {
                        device,
                        read_endpoint,
                    }),
                })
            }
            Err(e) => {
                warn!("{} handshake failed: {}", model, e);
                release(device);
                Err(e)
            }
        }
    }

    /// Re-arm the sensor and decode one sample
    ///
    /// A failure here leaves the handle open for the next attempt.
    pub fn read_temperatures(&mut self) -> Result<TemperatureReading> {
        let model = self.model;
        let scale = self.scale;
        let open = self.state.as_mut().ok_or(SensorError::Closed)?;

        handshake::send_control(&mut open.device, Step::RearmSensor, &model.rearm_request())?;
        let sample = handshake::read_frame(&mut open.device, open.read_endpoint, Step::ReadSample)?;

        let reading = sample.decode(scale);
        debug!("{} sample {:02x?} -> {}", model.name(), sample.as_bytes(), reading);
        Ok(reading)
    }

    /// Release the device
    ///
    /// Transport errors while closing are logged, not returned.
    pub fn close(&mut self) -> Result<()> {
        let open = self.state.take().ok_or(SensorError::Closed)?;
        release(open.device);
        info!("{} closed", self.model);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn model(&self) -> SensorModel {
        self.model
    }

    pub fn decode_scale(&self) -> DecodeScale {
        self.scale
    }

    /// Override the model's decode scale for this handle
    pub fn set_decode_scale(&mut self, scale: DecodeScale) {
        self.scale = scale;
    }
}

impl<D: UsbDevice> Sensor for SensorHandle<D> {
    fn model(&self) -> SensorModel {
        self.model
    }

    fn read_temperatures(&mut self) -> Result<TemperatureReading> {
        SensorHandle::read_temperatures(self)
    }

    fn close(&mut self) -> Result<()> {
        SensorHandle::close(self)
    }

    fn is_open(&self) -> bool {
        SensorHandle::is_open(self)
    }

    fn set_decode_scale(&mut self, scale: DecodeScale) {
        SensorHandle::set_decode_scale(self, scale)
    }
}

impl<D: UsbDevice> Drop for SensorHandle<D> {
    fn drop(&mut self) {
        if let Some(open) = self.state.take() {
            debug!("{} dropped while open, closing", self.model);
            release(open.device);
        }
    }
}

/// Best-effort close
pub(crate) fn release<D: UsbDevice>(device: D) {
    if let Err(e) = device.close() {
        warn!("Failed to close device cleanly: {}", e);
    }
}
