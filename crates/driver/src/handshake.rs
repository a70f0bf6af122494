//! Transfer helpers and the power-on handshake

use crate::error::{Result, SensorError, Step};
use crate::model::{HandshakeOp, SensorModel};
use crate::transport::{Endpoint, UsbDevice};
use protocol::{ControlRequest, EndpointSpec, FRAME_LEN, RawSample};
use tracing::debug;

/// Claim both endpoints and run the model's handshake script
///
/// Returns the read endpoint. The caller owns cleanup on error.
pub(crate) fn run<D: UsbDevice>(device: &mut D, model: SensorModel) -> Result<Endpoint> {
    claim(device, model.write_endpoint(), Step::ClaimWriteEndpoint)?;
    let read_endpoint = claim(device, model.read_endpoint(), Step::ClaimReadEndpoint)?;

    for action in model.handshake() {
        debug!("{}: {}", model.name(), action.step);
        match action.op {
            HandshakeOp::Control(request) => send_control(device, action.step, &request)?,
            HandshakeOp::Drain => drain(device, read_endpoint, action.step)?,
        }
    }

    Ok(read_endpoint)
}

fn claim<D: UsbDevice>(device: &mut D, spec: EndpointSpec, step: Step) -> Result<Endpoint> {
    device
        .claim_endpoint(spec.interface, spec.alt_setting, spec.address)
        .map_err(|source| SensorError::Endpoint { step, source })
}

/// Write a control request; a partial write counts as a failure
pub(crate) fn send_control<D: UsbDevice>(
    device: &mut D,
    step: Step,
    request: &ControlRequest,
) -> Result<()> {
    let written = device
        .control_transfer(
            request.request_type,
            request.request,
            request.value,
            request.index,
            request.data,
        )
        .map_err(|source| SensorError::Control { step, source })?;

    if written < request.data.len() {
        return Err(SensorError::Control {
            step,
            source: crate::TransportError::ShortTransfer {
                expected: request.data.len(),
                actual: written,
            },
        });
    }
    Ok(())
}

/// Read a handshake response frame and throw it away
fn drain<D: UsbDevice>(device: &mut D, endpoint: Endpoint, step: Step) -> Result<()> {
    let mut buf = [0u8; FRAME_LEN];
    let len = device
        .interrupt_read(endpoint, &mut buf)
        .map_err(|source| SensorError::Read { step, source })?
        .min(FRAME_LEN);
    debug!("Discarded {} byte response: {:02x?}", len, &buf[..len]);
    Ok(())
}

/// Read one full sample frame
pub(crate) fn read_frame<D: UsbDevice>(
    device: &mut D,
    endpoint: Endpoint,
    step: Step,
) -> Result<RawSample> {
    let mut buf = [0u8; FRAME_LEN];
    let len = device
        .interrupt_read(endpoint, &mut buf)
        .map_err(|source| SensorError::Read { step, source })?
        .min(FRAME_LEN);

    RawSample::from_slice(&buf[..len]).map_err(|_| SensorError::Read {
        step,
        source: crate::TransportError::ShortTransfer {
            expected: FRAME_LEN,
            actual: len,
        },
    })
}
