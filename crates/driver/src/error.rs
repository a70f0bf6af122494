//! Driver error types

use protocol::DeviceIdentity;
use std::fmt;
use thiserror::Error;

/// Failure reported by a USB transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("device not found")]
    NotFound,

    #[error("access denied (insufficient permissions)")]
    Access,

    #[error("resource busy")]
    Busy,

    #[error("operation timed out")]
    Timeout,

    #[error("endpoint stalled")]
    Pipe,

    #[error("device disconnected")]
    NoDevice,

    #[error("input/output error")]
    Io,

    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("{message}")]
    Other { message: String },
}

/// Point in the sensor protocol where an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    LocateDevice,
    ClaimWriteEndpoint,
    ClaimReadEndpoint,
    EnableReports,
    RequestTemperature,
    DrainTemperature,
    SendCalibration,
    DrainCalibration,
    SendSecondaryInit,
    /// The secondary init command is answered by two frames
    DrainSecondaryInit { frame: u8 },
    RearmSensor,
    ReadSample,
}

impl Step {
    /// True for steps that belong to the power-on handshake
    pub fn is_handshake(self) -> bool {
        !matches!(self, Step::RearmSensor | Step::ReadSample)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::LocateDevice => f.write_str("locate device"),
            Step::ClaimWriteEndpoint => f.write_str("claim write endpoint"),
            Step::ClaimReadEndpoint => f.write_str("claim read endpoint"),
            Step::EnableReports => f.write_str("enable reports"),
            Step::RequestTemperature => f.write_str("request temperature"),
            Step::DrainTemperature => f.write_str("drain temperature response"),
            Step::SendCalibration => f.write_str("send calibration command"),
            Step::DrainCalibration => f.write_str("drain calibration response"),
            Step::SendSecondaryInit => f.write_str("send secondary init command"),
            Step::DrainSecondaryInit { frame } => {
                write!(f, "drain secondary init response {}", frame)
            }
            Step::RearmSensor => f.write_str("re-arm sensor"),
            Step::ReadSample => f.write_str("read sample"),
        }
    }
}

/// Sensor driver errors
#[derive(Debug, Error)]
pub enum SensorError {
    /// No attached device matches the model identity
    #[error("No sensor {identity} found")]
    NotFound { identity: DeviceIdentity },

    /// Claiming an interface/endpoint failed
    #[error("Endpoint claim failed during {step}: {source}")]
    Endpoint { step: Step, source: TransportError },

    /// A control transfer was rejected by the device or bus
    #[error("Control transfer failed during {step}: {source}")]
    Control { step: Step, source: TransportError },

    /// An interrupt read failed or timed out
    #[error("Interrupt read failed during {step}: {source}")]
    Read { step: Step, source: TransportError },

    /// The handle was already closed
    #[error("Sensor handle is closed")]
    Closed,

    /// Enumerating or opening devices failed for a reason other than absence
    #[error("USB transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SensorError {
    /// Step that failed, when the error came from the sensor protocol
    pub fn step(&self) -> Option<Step> {
        match self {
            SensorError::NotFound { .. } => Some(Step::LocateDevice),
            SensorError::Endpoint { step, .. }
            | SensorError::Control { step, .. }
            | SensorError::Read { step, .. } => Some(*step),
            SensorError::Closed | SensorError::Transport(_) => None,
        }
    }

    /// True when the error aborted `open` rather than a steady-state read
    pub fn is_handshake_failure(&self) -> bool {
        self.step().is_some_and(Step::is_handshake)
    }
}

/// Type alias for driver results
pub type Result<T> = std::result::Result<T, SensorError>;
