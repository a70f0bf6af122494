//! HID report constants for the TEMPer2 handshake
//!
//! The sensor is driven entirely through class-specific SET_REPORT control
//! writes on endpoint 0, answered by 8-byte frames on an interrupt IN
//! endpoint of interface 1.

/// bmRequestType: host-to-device, class, interface
pub const REQUEST_TYPE_CLASS_INTERFACE_OUT: u8 = 0x21;

/// bRequest: HID SET_REPORT
pub const HID_SET_REPORT: u8 = 0x09;

/// Length of every interrupt frame the sensor emits
pub const FRAME_LEN: usize = 8;

/// Endpoint to claim on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointSpec {
    /// Interface number
    pub interface: u8,
    /// Alternate setting
    pub alt_setting: u8,
    /// Endpoint address (bit 7 set = IN)
    pub address: u8,
}

/// Interface 0 endpoint; claimed during the handshake, never read
pub const WRITE_ENDPOINT: EndpointSpec = EndpointSpec {
    interface: 0x00,
    alt_setting: 0,
    address: 0x81,
};

/// Interface 1 interrupt endpoint carrying every sensor frame
pub const READ_ENDPOINT: EndpointSpec = EndpointSpec {
    interface: 0x01,
    alt_setting: 0,
    address: 0x82,
};

/// A fixed control write sent to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: &'static [u8],
}

impl ControlRequest {
    /// SET_REPORT on interface 1, output report 0
    const fn set_report(data: &'static [u8]) -> Self {
        Self {
            request_type: REQUEST_TYPE_CLASS_INTERFACE_OUT,
            request: HID_SET_REPORT,
            value: 0x0200,
            index: 0x01,
            data,
        }
    }
}

/// Feature report enabling the sensor's report stream
pub const ENABLE_REPORTS: ControlRequest = ControlRequest {
    request_type: REQUEST_TYPE_CLASS_INTERFACE_OUT,
    request: HID_SET_REPORT,
    value: 0x0201,
    index: 0x00,
    data: &[0x01, 0x01],
};

/// "Request temperature" command; also re-arms the sensor before every read
pub const REQUEST_TEMPERATURE: ControlRequest =
    ControlRequest::set_report(&[0x01, 0x80, 0x33, 0x01, 0x00, 0x00, 0x00, 0x00]);

/// First power-on initialization (calibration) command
pub const INIT_CALIBRATION: ControlRequest =
    ControlRequest::set_report(&[0x01, 0x82, 0x77, 0x01, 0x00, 0x00, 0x00, 0x00]);

/// Second power-on initialization command; the sensor answers with two frames
pub const INIT_SECONDARY: ControlRequest =
    ControlRequest::set_report(&[0x01, 0x86, 0xff, 0x01, 0x00, 0x00, 0x00, 0x00]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_reports_is_bit_exact() {
        assert_eq!(ENABLE_REPORTS.request_type, 0x21);
        assert_eq!(ENABLE_REPORTS.request, 0x09);
        assert_eq!(ENABLE_REPORTS.value, 0x0201);
        assert_eq!(ENABLE_REPORTS.index, 0x00);
        assert_eq!(ENABLE_REPORTS.data, &[0x01, 0x01]);
    }

    #[test]
    fn test_set_report_commands_share_header() {
        for cmd in [REQUEST_TEMPERATURE, INIT_CALIBRATION, INIT_SECONDARY] {
            assert_eq!(cmd.request_type, 0x21);
            assert_eq!(cmd.request, 0x09);
            assert_eq!(cmd.value, 0x0200);
            assert_eq!(cmd.index, 0x01);
            assert_eq!(cmd.data.len(), FRAME_LEN);
        }
    }

    #[test]
    fn test_command_payloads() {
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
    }

    #[test]
    fn test_endpoint_directions() {
        // Both claimed endpoints are IN endpoints
        assert_ne!(WRITE_ENDPOINT.address & 0x80, 0);
        assert_ne!(READ_ENDPOINT.address & 0x80, 0);
        assert_eq!(READ_ENDPOINT.interface, 1);
    }
}
