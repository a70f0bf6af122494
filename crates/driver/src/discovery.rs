//! Sensor discovery
//!
//! Every attached device matching a model identity is opened and
//! initialized, not just the first one on the bus.

use crate::error::{Result, SensorError, TransportError};
use crate::handle::{SensorHandle, release};
use crate::model::SensorModel;
use crate::sensor::Sensor;
use crate::transport::Transport;
use tracing::{debug, info, warn};

/// Open the first TEMPer2 on the bus
pub fn open<T: Transport>(transport: &T) -> Result<SensorHandle<T::Device>> {
    SensorHandle::open(transport, SensorModel::Temper2)
}

/// Open and initialize every attached device of `model`
///
/// Returns an empty list when none is attached. If any handshake fails,
/// the handles opened so far and the devices not yet initialized are all
/// closed and that first error is returned.
pub fn discover<T: Transport>(
    transport: &T,
    model: SensorModel,
) -> Result<Vec<SensorHandle<T::Device>>> {
    let identity = model.identity();
    let devices = match transport.open_all(identity) {
        Ok(devices) => devices,
        Err(TransportError::NotFound) => Vec::new(),
        Err(e) => return Err(SensorError::Transport(e)),
    };
    debug!("{} candidate device(s) for {}", devices.len(), model);

    let mut handles: Vec<SensorHandle<T::Device>> = Vec::with_capacity(devices.len());
    let mut pending = devices.into_iter();

    while let Some(device) = pending.next() {
        match SensorHandle::initialize(device, model) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                warn!(
                    "Discovery of {} aborted after {} sensor(s): {}",
                    model,
                    handles.len(),
                    e
                );
                for mut handle in handles {
                    let _ = handle.close();
                }
                pending.for_each(release);
                return Err(e);
            }
        }
    }

    info!("Discovered {} {} sensor(s)", handles.len(), model.name());
    Ok(handles)
}

/// Discover sensors of every supported model as trait objects
pub fn discover_all<T>(transport: &T) -> Result<Vec<Box<dyn Sensor + Send>>>
where
    T: Transport,
    T::Device: Send + 'static,
{
    let mut sensors: Vec<Box<dyn Sensor + Send>> = Vec::new();

    for &model in SensorModel::ALL {
        match discover(transport, model) {
            Ok(handles) => {
                sensors.extend(
                    handles
                        .into_iter()
                        .map(|h| Box::new(h) as Box<dyn Sensor + Send>),
                );
            }
            Err(e) => {
                for sensor in &mut sensors {
                    let _ = sensor.close();
                }
                return Err(e);
            }
        }
    }

    Ok(sensors)
}
