//! Recording transport for tests
//!
//! [`RecordingTransport`] logs every call the driver makes, answers
//! interrupt reads from a queue of scripted frames and can fail any single
//! call on demand.
//!
//! # Example
//!
//! ```
//! use driver::testing::{RecordingTransport, TransportCall};
//! use driver::{SensorModel, SensorHandle};
//!
//! let transport = RecordingTransport::new();
//! let mut sensor = SensorHandle::open(&transport, SensorModel::Temper2).unwrap();
//! sensor.close().unwrap();
//! assert_eq!(transport.calls().last(), Some(&TransportCall::Close { device: 0 }));
//! ```

use crate::error::TransportError;
use crate::transport::{Endpoint, Transport, UsbDevice};
use protocol::{ControlRequest, DeviceIdentity, FRAME_LEN};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call observed by the recording transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    OpenDevice {
        identity: DeviceIdentity,
    },
    OpenAll {
        identity: DeviceIdentity,
    },
    ClaimEndpoint {
        interface: u8,
        alt_setting: u8,
        address: u8,
    },
    Control {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
    },
    InterruptRead {
        address: u8,
        length: usize,
    },
    Close {
        device: usize,
    },
}

impl TransportCall {
    /// The call a driver makes to send `request`
    pub fn control(request: &ControlRequest) -> Self {
        TransportCall::Control {
            request_type: request.request_type,
            request: request.request,
            value: request.value,
            index: request.index,
            data: request.data.to_vec(),
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, TransportCall::Close { .. })
    }
}

#[derive(Debug)]
struct State {
    attached: usize,
    calls: Vec<TransportCall>,
    /// Index among non-close calls that fails
    fail_at: Option<usize>,
    failure: TransportError,
    close_failure: Option<TransportError>,
    frames: VecDeque<Vec<u8>>,
    next_device: usize,
}

/// Transport double shared by all devices it opens
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    state: Arc<Mutex<State>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// One matching device attached
    pub fn new() -> Self {
        Self::with_devices(1)
    }

    /// `count` matching devices attached
    pub fn with_devices(count: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                attached: count,
                calls: Vec::new(),
                fail_at: None,
                failure: TransportError::Io,
                close_failure: None,
                frames: VecDeque::new(),
                next_device: 0,
            })),
        }
    }

    /// No matching device attached
    pub fn without_device() -> Self {
        Self::with_devices(0)
    }

    /// Fail the `index`-th call (0-based, close calls not counted)
    pub fn fail_call(&self, index: usize, error: TransportError) {
        let mut state = self.lock();
        state.fail_at = Some(index);
        state.failure = error;
    }

    /// Make every device close report `error`
    pub fn fail_close(&self, error: TransportError) {
        self.lock().close_failure = Some(error);
    }

    /// Queue a frame for the next interrupt read
    ///
    /// Reads with an empty queue return an all-zero frame.
    pub fn push_frame(&self, frame: impl Into<Vec<u8>>) {
        self.lock().frames.push_back(frame.into());
    }

    /// All calls observed so far
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Number of non-close calls observed so far
    pub fn call_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| !c.is_close()).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn close_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_close()).count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        let mut state = self.lock();
        let index = state.calls.iter().filter(|c| !c.is_close()).count();
        state.calls.push(call);
        if state.fail_at == Some(index) {
            return Err(state.failure.clone());
        }
        Ok(())
    }

    fn new_device(&self) -> RecordingDevice {
        let mut state = self.lock();
        let id = state.next_device;
        state.next_device += 1;
        RecordingDevice {
            transport: self.clone(),
            id,
        }
    }
}

impl Transport for RecordingTransport {
    type Device = RecordingDevice;

    fn open_device(&self, identity: DeviceIdentity) -> Result<RecordingDevice, TransportError> {
        self.record(TransportCall::OpenDevice { identity })?;
        if self.lock().attached == 0 {
            return Err(TransportError::NotFound);
        }
        Ok(self.new_device())
    }

    fn open_all(&self, identity: DeviceIdentity) -> Result<Vec<RecordingDevice>, TransportError> {
        self.record(TransportCall::OpenAll { identity })?;
        let attached = self.lock().attached;
        Ok((0..attached).map(|_| self.new_device()).collect())
    }
}

/// Device opened by a [`RecordingTransport`]
#[derive(Debug)]
pub struct RecordingDevice {
    transport: RecordingTransport,
    id: usize,
}

impl UsbDevice for RecordingDevice {
    fn claim_endpoint(
        &mut self,
        interface: u8,
        alt_setting: u8,
        address: u8,
    ) -> Result<Endpoint, TransportError> {
        self.transport.record(TransportCall::ClaimEndpoint {
            interface,
            alt_setting,
            address,
        })?;
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
        self.transport.record(TransportCall::Control {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        })?;
        Ok(data.len())
    }

    fn interrupt_read(
        &mut self,
        endpoint: Endpoint,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.transport.record(TransportCall::InterruptRead {
            address: endpoint.address,
            length: buf.len(),
        })?;

        let frame = self
            .transport
            .lock()
            .frames
            .pop_front()
            .unwrap_or_else(|| vec![0; FRAME_LEN]);
        let len = frame.len().min(buf.len());
        buf[..len].copy_from_slice(&frame[..len]);
        Ok(len)
    }

    fn close(self) -> Result<(), TransportError> {
        let mut state = self.transport.lock();
        state.calls.push(TransportCall::Close { device: self.id });
        state.close_failure.clone().map_or(Ok(()), Err)
    }
}
