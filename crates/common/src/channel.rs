//! Async channel bridge between Tokio runtime and the sensor thread
//!
//! Sensor handles do blocking USB I/O, so they live on a dedicated thread.
//! The runtime drives that thread with commands and receives readings back
//! as events.

use async_channel::{Receiver, Sender, bounded};
use protocol::TemperatureReading;
use std::fmt;

/// Index of an opened sensor within the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorId(pub u32);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor{}", self.0)
    }
}

/// Commands from Tokio runtime to the sensor thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorCommand {
    /// Read every open sensor once
    Sample,

    /// Close every sensor and stop the thread
    Shutdown,
}

/// Events from the sensor thread
#[derive(Debug, Clone)]
pub enum SensorEvent {
    /// A sensor produced a reading
    Reading {
        sensor: SensorId,
        reading: TemperatureReading,
    },

    /// A read failed; the sensor stays open for the next sample
    ReadFailed { sensor: SensorId, error: String },

    /// A sensor was closed during shutdown
    Closed { sensor: SensorId },
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct SensorBridge {
    cmd_tx: Sender<SensorCommand>,
    event_rx: Receiver<SensorEvent>,
}

impl SensorBridge {
    /// Send a command to the sensor thread
    pub async fn send_command(&self, cmd: SensorCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the sensor thread
    pub async fn recv_event(&self) -> crate::Result<SensorEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the sensor thread (blocking)
pub struct SensorWorker {
    cmd_rx: Receiver<SensorCommand>,
    event_tx: Sender<SensorEvent>,
}

impl SensorWorker {
    /// Receive a command from Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<SensorCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<SensorCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Send an event to Tokio runtime (blocking)
    pub fn send_event(&self, event: SensorEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and the sensor thread
///
/// Returns (SensorBridge for Tokio, SensorWorker for the sensor thread)
pub fn create_sensor_bridge() -> (SensorBridge, SensorWorker) {
    let (cmd_tx, cmd_rx) = bounded(16);
    let (event_tx, event_rx) = bounded(64);

    (
        SensorBridge { cmd_tx, event_rx },
        SensorWorker { cmd_rx, event_tx },
    )
}
