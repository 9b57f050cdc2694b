//! DualShock 4 Bluetooth output report layout.
//!
//! The report starts with the `0xa2` transaction header which is covered by
//! the checksum but never written to the device; the transport strips it.
use std::fmt::Display;

use packed_struct::prelude::*;

use super::crc::checksum;

/// Size of the full output report, including the leading header byte
pub const OUTPUT_REPORT_SIZE: usize = 80;
/// Offset of the little-endian CRC-32 trailer
pub const CHECKSUM_OFFSET: usize = 76;

pub const OUTPUT_REPORT_HEADER: u8 = 0xa2;
pub const OUTPUT_REPORT_BT: u8 = 0x11;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Rumble {
    pub left: u8,
    pub right: u8,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Logical state carried by a single output report
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct OutputState {
    pub rumble: Rumble,
    pub color: Color,
}

impl OutputState {
    /// The idle state sent when a controller is released: motors off and a
    /// calm gray lightbar.
    pub const fn neutral() -> Self {
        Self {
            rumble: Rumble { left: 0, right: 0 },
            color: Color {
                r: 127,
                g: 127,
                b: 127,
            },
        }
    }
}

impl Display for OutputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rumble: {}/{}, color: #{:02x}{:02x}{:02x}",
            self.rumble.left, self.rumble.right, self.color.r, self.color.g, self.color.b
        )
    }
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "80")]
pub struct PackedOutputReport {
    // byte 0-3
    #[packed_field(bytes = "0")]
    pub header: u8, // Transaction header (always 0xa2), stripped before sending
    #[packed_field(bytes = "1")]
    pub report_id: u8, // Report ID (always 0x11)
    #[packed_field(bytes = "2")]
    pub bt_flags: u8, // Always 0xc0
    #[packed_field(bytes = "3")]
    pub bt_flags_2: u8, // Always 0x20

    // byte 4-5
    #[packed_field(bytes = "4")]
    pub rumble_left: u8,
    #[packed_field(bytes = "5")]
    pub rumble_right: u8,

    // byte 6-8
    #[packed_field(bytes = "6")]
    pub led_red: u8,
    #[packed_field(bytes = "7")]
    pub led_green: u8,
    #[packed_field(bytes = "8")]
    pub led_blue: u8,

    // byte 9-21
    #[packed_field(bytes = "9..=21")]
    pub _reserved_1: [u8; 13],

    // byte 22-26
    #[packed_field(bytes = "22")]
    pub volume_left: u8, // Always 0x43
    #[packed_field(bytes = "23")]
    pub volume_right: u8, // Always 0x43
    #[packed_field(bytes = "24")]
    pub volume_mic: u8,
    #[packed_field(bytes = "25")]
    pub volume_speaker: u8, // Always 0x4d
    #[packed_field(bytes = "26")]
    pub _unkn_audio: u8, // Always 0x85

    // byte 27-75
    #[packed_field(bytes = "27..=75")]
    pub _reserved_2: [u8; 49],

    // byte 76-79
    #[packed_field(bytes = "76..=79", endian = "lsb")]
    pub checksum: Integer<u32, packed_bits::Bits<32>>, // CRC-32 of bytes 0-75
}

impl Default for PackedOutputReport {
    fn default() -> Self {
        Self {
            header: OUTPUT_REPORT_HEADER,
            report_id: OUTPUT_REPORT_BT,
            bt_flags: 0xc0,
            bt_flags_2: 0x20,
            rumble_left: Default::default(),
            rumble_right: Default::default(),
            led_red: Default::default(),
            led_green: Default::default(),
            led_blue: Default::default(),
            _reserved_1: [0; 13],
            volume_left: 0x43,
            volume_right: 0x43,
            volume_mic: 0x00,
            volume_speaker: 0x4d,
            _unkn_audio: 0x85,
            _reserved_2: [0; 49],
            checksum: Integer::from_primitive(0),
        }
    }
}

impl From<&OutputState> for PackedOutputReport {
    fn from(state: &OutputState) -> Self {
        Self {
            rumble_left: state.rumble.left,
            rumble_right: state.rumble.right,
            led_red: state.color.r,
            led_green: state.color.g,
            led_blue: state.color.b,
            ..Default::default()
        }
    }
}

impl PackedOutputReport {
    /// Returns the logical state carried by this report
    pub fn state(&self) -> OutputState {
        OutputState {
            rumble: Rumble {
                left: self.rumble_left,
                right: self.rumble_right,
            },
            color: Color {
                r: self.led_red,
                g: self.led_green,
                b: self.led_blue,
            },
        }
    }

    /// Pack the report with its checksum trailer filled in
    pub fn pack_with_checksum(&mut self) -> Result<[u8; OUTPUT_REPORT_SIZE], PackingError> {
        let buf = self.pack()?;
        self.checksum = Integer::from_primitive(checksum(0, &buf[..CHECKSUM_OFFSET]));
        self.pack()
    }

    /// Returns true if the checksum field matches the rest of the report
    pub fn is_valid(&self) -> Result<bool, PackingError> {
        let buf = self.pack()?;
        Ok(self.checksum.to_primitive() == checksum(0, &buf[..CHECKSUM_OFFSET]))
    }
}

/// Builds the complete output report for the given state, including the
/// checksum trailer.
pub fn encode(state: &OutputState) -> Result<[u8; OUTPUT_REPORT_SIZE], PackingError> {
    PackedOutputReport::from(state).pack_with_checksum()
}
