//! Common utilities for pcsensor
//!
//! This crate provides functionality shared between the driver and the
//! command-line front end: error handling, logging setup, the async channel
//! bridge between the Tokio runtime and the blocking sensor thread, and
//! test helpers.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{
    SensorBridge, SensorCommand, SensorEvent, SensorId, SensorWorker, create_sensor_bridge,
};
pub use error::{Error, Result};
pub use logging::setup_logging;
