//! Supported sensor models
//!
//! A model bundles everything that differs between sensor variants: the
//! USB identity, the endpoints to claim, the power-on handshake script,
//! the re-arm command sent before every read and the decode scale of its
//! firmware. Only the TEMPer2 is known today.

use crate::error::Step;
use protocol::{
    ControlRequest, DecodeScale, DeviceIdentity, ENABLE_REPORTS, EndpointSpec, INIT_CALIBRATION,
    INIT_SECONDARY, READ_ENDPOINT, REQUEST_TEMPERATURE, TEMPER2, WRITE_ENDPOINT,
};
use std::fmt;

/// One transfer of a handshake script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOp {
    /// Send a control write
    Control(ControlRequest),
    /// Read one interrupt frame from the read endpoint and discard it
    Drain,
}

/// A handshake transfer tagged with the step it reports failures under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeAction {
    pub step: Step,
    pub op: HandshakeOp,
}

const fn control(step: Step, request: ControlRequest) -> HandshakeAction {
    HandshakeAction {
        step,
        op: HandshakeOp::Control(request),
    }
}

const fn drain(step: Step) -> HandshakeAction {
    HandshakeAction {
        step,
        op: HandshakeOp::Drain,
    }
}

const TEMPER2_HANDSHAKE: &[HandshakeAction] = &[
    control(Step::EnableReports, ENABLE_REPORTS),
    control(Step::RequestTemperature, REQUEST_TEMPERATURE),
    drain(Step::DrainTemperature),
    control(Step::SendCalibration, INIT_CALIBRATION),
    drain(Step::DrainCalibration),
    control(Step::SendSecondaryInit, INIT_SECONDARY),
    drain(Step::DrainSecondaryInit { frame: 1 }),
    drain(Step::DrainSecondaryInit { frame: 2 }),
];

/// Sensor model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorModel {
    /// PCsensor TEMPer2 (0c45:7401), inner and outer probe
    Temper2,
}

impl SensorModel {
    pub const ALL: &'static [SensorModel] = &[SensorModel::Temper2];

    pub fn name(self) -> &'static str {
        match self {
            SensorModel::Temper2 => "TEMPer2",
        }
    }

    pub fn identity(self) -> DeviceIdentity {
        match self {
            SensorModel::Temper2 => TEMPER2,
        }
    }

    /// Endpoint claimed for the handshake but never read
    pub fn write_endpoint(self) -> EndpointSpec {
        match self {
            SensorModel::Temper2 => WRITE_ENDPOINT,
        }
    }

    /// Interrupt endpoint all frames arrive on
    pub fn read_endpoint(self) -> EndpointSpec {
        match self {
            SensorModel::Temper2 => READ_ENDPOINT,
        }
    }

    /// Transfers run after both endpoints are claimed
    pub fn handshake(self) -> &'static [HandshakeAction] {
        match self {
            SensorModel::Temper2 => TEMPER2_HANDSHAKE,
        }
    }

    /// Control write that makes the sensor emit one sample frame
    pub fn rearm_request(self) -> ControlRequest {
        match self {
            SensorModel::Temper2 => REQUEST_TEMPERATURE,
        }
    }

    pub fn decode_scale(self) -> DecodeScale {
        match self {
            SensorModel::Temper2 => DecodeScale::Q8_8,
        }
    }

    /// Look up the model for a VID/PID pair
    pub fn from_identity(identity: DeviceIdentity) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.identity() == identity)
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.identity())
    }
}
