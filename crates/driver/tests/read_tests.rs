//! Read and Lifecycle Integration Tests
//!
//! Covers steady-state behaviour of an opened sensor:
//! - One re-arm write and one interrupt read per reading
//! - Decoding only bytes 2..6 of the frame
//! - Read failures leaving the handle usable
//! - Close semantics and the closed state
//!
//! Run with: `cargo test -p driver --test read_tests`

use common::test_utils::{INVALID_PROBE, frame_for_celsius, sample_frame};
use driver::testing::{RecordingDevice, RecordingTransport, TransportCall};
use driver::{Sensor, SensorError, SensorHandle, SensorModel, Step, TransportError};
use protocol::{DecodeScale, REQUEST_TEMPERATURE};

/// Open a sensor and forget the handshake calls
fn open_sensor(transport: &RecordingTransport) -> SensorHandle<RecordingDevice> {
    let sensor = SensorHandle::open(transport, SensorModel::Temper2).expect("open failed");
    transport.clear_calls();
    sensor
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_read_issues_rearm_then_interrupt_read() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);

    transport.push_frame(frame_for_celsius(23.5, 19.25));
    let reading = sensor.read_temperatures().expect("read failed");

    assert_eq!(reading.inner, 23.5);
    assert_eq!(reading.outer, 19.25);
    assert_eq!(
        transport.calls(),
        vec![
            TransportCall::control(&REQUEST_TEMPERATURE),
            TransportCall::InterruptRead {
                address: 0x82,
                length: 8,
            },
        ]
    );
}

#[test]
fn test_read_decodes_spec_values() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);

    transport.push_frame(sample_frame((0x01, 0x2C), (0xFF, 0x9C)));
    let reading = sensor.read_temperatures().expect("read failed");
    assert_eq!(reading.inner, 1.171875);
    assert_eq!(reading.outer, -0.390625);

    transport.push_frame(sample_frame((0x00, 0x00), INVALID_PROBE));
    let reading = sensor.read_temperatures().expect("read failed");
    assert_eq!(reading.inner, 0.0);
    assert!(reading.outer.is_nan());
}

#[test]
fn test_padding_bytes_do_not_affect_reading() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);

    transport.push_frame([0x00, 0x00, 0x10, 0x80, 0xF8, 0x00, 0x00, 0x00]);
    transport.push_frame([0xAB, 0xCD, 0x10, 0x80, 0xF8, 0x00, 0xEF, 0x12]);

    let first = sensor.read_temperatures().expect("read failed");
    let second = sensor.read_temperatures().expect("read failed");
    assert_eq!(first, second);
    assert_eq!(first.inner, 16.5);
    assert_eq!(first.outer, -8.0);
}

#[test]
fn test_repeated_reads_rearm_every_time() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);

    for i in 0..5 {
        transport.push_frame(frame_for_celsius(f64::from(i), 0.0));
        let reading = sensor.read_temperatures().expect("read failed");
        assert_eq!(reading.inner, f64::from(i));
    }

    let rearms = transport
        .calls()
        .iter()
        .filter(|c| **c == TransportCall::control(&REQUEST_TEMPERATURE))
        .count();
    assert_eq!(rearms, 5);
    assert_eq!(transport.call_count(), 10);
}

#[test]
fn test_legacy_scale_override() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);
    assert_eq!(sensor.decode_scale(), DecodeScale::Q8_8);

    sensor.set_decode_scale(DecodeScale::Legacy);
    transport.push_frame(sample_frame((0x01, 0x2C), (0xFF, 0x9C)));
    let reading = sensor.read_temperatures().expect("read failed");
    assert_eq!(reading.inner, 300.0 * 125.0 / 32000.0);
    assert_eq!(reading.outer, -100.0 * 125.0 / 32000.0);
}

// ============================================================================
// Read Failures
// ============================================================================

#[test]
fn test_rearm_failure_is_control_error() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);
    transport.fail_call(0, TransportError::Pipe);

    let err = sensor.read_temperatures().expect_err("read should fail");
    assert!(matches!(
        err,
        SensorError::Control {
            step: Step::RearmSensor,
            source: TransportError::Pipe,
        }
    ));
    assert!(!err.is_handshake_failure());
    // No interrupt read after a failed re-arm
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_read_failure_leaves_handle_open() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);
    transport.fail_call(1, TransportError::Timeout);

    let err = sensor.read_temperatures().expect_err("read should fail");
    assert!(matches!(
        err,
        SensorError::Read {
            step: Step::ReadSample,
            source: TransportError::Timeout,
        }
    ));
    assert!(sensor.is_open());
    assert_eq!(transport.close_count(), 0);

    transport.push_frame(frame_for_celsius(22.0, 22.5));
    let reading = sensor.read_temperatures().expect("retry failed");
    assert_eq!(reading.inner, 22.0);
}

#[test]
fn test_short_sample_is_read_error() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);
    transport.push_frame(vec![0x80, 0x02, 0x17, 0x80]);

    let err = sensor.read_temperatures().expect_err("read should fail");
    match err {
        SensorError::Read {
            step: Step::ReadSample,
            source: TransportError::ShortTransfer { expected, actual },
        } => {
            assert_eq!(expected, 8);
            assert_eq!(actual, 4);
        }
        other => panic!("unexpected error: {}", other),
    }
}

// ============================================================================
// Close
// ============================================================================

#[test]
fn test_close_releases_device_once() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);

    sensor.close().expect("close failed");
    assert!(!sensor.is_open());
    assert_eq!(transport.calls(), vec![TransportCall::Close { device: 0 }]);
}

#[test]
fn test_operations_after_close_fail_without_transport_calls() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);
    sensor.close().expect("close failed");
    transport.clear_calls();

    assert!(matches!(
        sensor.read_temperatures(),
        Err(SensorError::Closed)
    ));
    assert!(matches!(sensor.close(), Err(SensorError::Closed)));
    assert!(transport.calls().is_empty());

    drop(sensor);
    assert!(transport.calls().is_empty());
}

#[test]
fn test_close_error_is_logged_not_returned() {
    let transport = RecordingTransport::new();
    let mut sensor = open_sensor(&transport);
    transport.fail_close(TransportError::NoDevice);

    assert!(sensor.close().is_ok());
    assert!(!sensor.is_open());
    assert_eq!(transport.close_count(), 1);
}

#[test]
fn test_drop_closes_open_handle() {
    let transport = RecordingTransport::new();
    let sensor = open_sensor(&transport);

    drop(sensor);
    assert_eq!(transport.close_count(), 1);
}

// ============================================================================
// Sensor Trait
// ============================================================================

#[test]
fn test_trait_object_dispatch() {
    let transport = RecordingTransport::new();
    let mut sensor: Box<dyn Sensor + Send> = Box::new(open_sensor(&transport));

    assert_eq!(sensor.model(), SensorModel::Temper2);
    transport.push_frame(frame_for_celsius(-5.5, 30.0));
    let reading = sensor.read_temperatures().expect("read failed");
    assert_eq!(reading.inner, -5.5);
    assert_eq!(reading.outer, 30.0);

    sensor.close().expect("close failed");
    assert!(!sensor.is_open());
    assert!(matches!(sensor.close(), Err(SensorError::Closed)));
}
