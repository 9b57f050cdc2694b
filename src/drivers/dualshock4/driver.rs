use std::{error::Error, ffi::CString};

use hidapi::{HidApi, HidDevice, HidError};

use crate::input::transport::{Transport, TransportError};

use super::hid_report::OUTPUT_REPORT_SIZE;

// Hardware ID's
pub const VID: u16 = 0x054c;
pub const PID: u16 = 0x05c4;

/// Size of the scratch buffer used to receive input reports
pub const INPUT_REPORT_BUFFER_SIZE: usize = 1024;
/// How long a single read waits for an input report, in milliseconds
pub const HID_TIMEOUT: i32 = 10;

/// DualShock 4 driver for writing output reports
pub struct Driver {
    device: HidDevice,
    path: String,
}

impl Driver {
    /// Open the controller at the given hidraw path (e.g. /dev/hidraw3)
    pub fn new(api: &HidApi, path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let device = open_checked(api, path)?;
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }

    /// Returns the hidraw path this driver was opened with
    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}

impl Transport for Driver {
    /// Write the given output report. The leading header byte is part of the
    /// checksum but is not sent; the byte after it is the HID report id.
    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        let Some(payload) = report.get(1..) else {
            return Err(TransportError::ShortWrite {
                expected: OUTPUT_REPORT_SIZE - 1,
                written: 0,
            });
        };
        let written = self.device.write(payload)?;
        if written != payload.len() {
            return Err(TransportError::ShortWrite {
                expected: payload.len(),
                written,
            });
        }

        Ok(())
    }
}

/// Reads input reports from a controller. Uses its own handle so reads can
/// block on a separate thread without holding up output reports.
pub struct InputReader {
    device: HidDevice,
    buf: [u8; INPUT_REPORT_BUFFER_SIZE],
}

impl InputReader {
    pub fn new(api: &HidApi, path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let device = open_checked(api, path)?;
        Ok(Self {
            device,
            buf: [0; INPUT_REPORT_BUFFER_SIZE],
        })
    }

    /// Wait up to [HID_TIMEOUT] for the next input report. Returns `None` if
    /// no report arrived in time.
    pub fn poll(&mut self) -> Result<Option<&[u8]>, HidError> {
        let bytes_read = self.device.read_timeout(&mut self.buf[..], HID_TIMEOUT)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buf[..bytes_read]))
    }
}

fn open_checked(api: &HidApi, path: &str) -> Result<HidDevice, Box<dyn Error + Send + Sync>> {
    let c_path = CString::new(path)?;
    let device = api.open_path(&c_path)?;
    let info = device.get_device_info()?;
    let vid = info.vendor_id();
    let pid = info.product_id();
    if vid != VID || pid != PID {
        return Err(
            format!("Device '{path}' is not a DualShock 4 Controller: {vid:04x}:{pid:04x}").into(),
        );
    }

    Ok(device)
}
