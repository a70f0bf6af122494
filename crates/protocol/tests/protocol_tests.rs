//! Integration tests for the TEMPer2 wire format
//!
//! Covers the command buffers sent to the sensor and decoding of the
//! interrupt frames it answers with.

use protocol::{
    Channel, DecodeScale, DeviceIdentity, ENABLE_REPORTS, FRAME_LEN, INIT_CALIBRATION,
    INIT_SECONDARY, ProtocolError, READ_ENDPOINT, REQUEST_TEMPERATURE, RawSample, TEMPER2,
    WRITE_ENDPOINT, decode,
};

mod commands {
    use super::*;

    #[test]
    fn test_set_report_requests_share_header() {
        for request in [REQUEST_TEMPERATURE, INIT_CALIBRATION, INIT_SECONDARY] {
            assert_eq!(request.request_type, 0x21);
            assert_eq!(request.request, 0x09);
            assert_eq!(request.value, 0x0200);
            assert_eq!(request.index, 1);
            assert_eq!(request.data.len(), FRAME_LEN);
        }
    }

    #[test]
    fn test_payloads_are_distinct() {
        assert_eq!(
            REQUEST_TEMPERATURE.data,
            &[0x01, 0x80, 0x33, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            INIT_CALIBRATION.data,
            &[0x01, 0x82, 0x77, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            INIT_SECONDARY.data,
            &[0x01, 0x86, 0xff, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_ne!(ENABLE_REPORTS, REQUEST_TEMPERATURE);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            (WRITE_ENDPOINT.interface, WRITE_ENDPOINT.alt_setting, WRITE_ENDPOINT.address),
            (0, 0, 0x81)
        );
        assert_eq!(
            (READ_ENDPOINT.interface, READ_ENDPOINT.alt_setting, READ_ENDPOINT.address),
            (1, 0, 0x82)
        );
    }

    #[test]
    fn test_identity() {
        assert_eq!(TEMPER2, DeviceIdentity::new(0x0c45, 0x7401));
        assert!(TEMPER2.matches(0x0c45, 0x7401));
        assert!(!TEMPER2.matches(0x0c45, 0x7402));
    }
}

mod frames {
    use super::*;

    #[test]
    fn test_decode_captured_frame() {
        // inner 0x1780 = 23.5, outer 0x1540 = 21.25
        let sample = RawSample::from_slice(&[0x80, 0x02, 0x17, 0x80, 0x15, 0x40, 0x00, 0x00])
            .unwrap();
        let reading = sample.decode(DecodeScale::Q8_8);
        assert_eq!(reading.get(Channel::Inner), 23.5);
        assert_eq!(reading.get(Channel::Outer), 21.25);
        assert!(reading.is_complete());
    }

    #[test]
    fn test_disconnected_outer_probe() {
        let sample = RawSample::new([0x80, 0x02, 0x01, 0x2C, 0xFF, 0xFF, 0x00, 0x00]);
        let reading = sample.decode(DecodeScale::Q8_8);
        assert_eq!(reading.inner, 1.171875);
        assert!(reading.outer.is_nan());
        assert!(!reading.is_complete());
    }

    #[test]
    fn test_long_buffer_uses_first_frame() {
        let mut buffer = vec![0u8; 16];
        buffer[2] = 0xFF;
        buffer[3] = 0x9C;
        let sample = RawSample::from_slice(&buffer).unwrap();
        assert_eq!(sample.decode(DecodeScale::Q8_8).inner, -0.390625);
    }

    #[test]
    fn test_short_frame_rejected() {
        let err = RawSample::from_slice(&[0x80, 0x02, 0x17]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ShortFrame {
                expected: FRAME_LEN,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_reading_json_uses_channel_names() {
        let reading = RawSample::new([0, 0, 0x00, 0x00, 0xFF, 0xFF, 0, 0]).decode(DecodeScale::Q8_8);
        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(json, r#"{"inner":0.0,"outer":null}"#);
    }

    #[test]
    fn test_decode_edges() {
        assert_eq!(decode(0x7F, 0xFF), 32767.0 / 256.0);
        assert_eq!(decode(0x80, 0x00), -128.0);
        assert_eq!(decode(0xFF, 0xFE), -2.0 / 256.0);
    }
}
