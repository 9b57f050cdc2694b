use std::error::Error;

use packed_struct::{
    types::{Integer, SizedInteger},
    PackedStruct, PackedStructSlice,
};

use crate::drivers::dualshock4::crc::checksum;
use crate::drivers::dualshock4::hid_report::{
    encode, Color, OutputState, PackedOutputReport, Rumble, CHECKSUM_OFFSET, OUTPUT_REPORT_SIZE,
};

#[test]
fn test_encode_layout() -> Result<(), Box<dyn Error>> {
    let state = OutputState {
        rumble: Rumble {
            left: 0x10,
            right: 0x20,
        },
        color: Color {
            r: 0xff,
            g: 0x80,
            b: 0x01,
        },
    };
    let report = encode(&state)?;
    assert_eq!(report.len(), OUTPUT_REPORT_SIZE);
    assert_eq!(&report[..4], &[0xa2, 0x11, 0xc0, 0x20]);
    assert_eq!(&report[4..6], &[0x10, 0x20]);
    assert_eq!(&report[6..9], &[0xff, 0x80, 0x01]);
    assert_eq!(&report[22..27], &[0x43, 0x43, 0x00, 0x4d, 0x85]);
    assert!(report[9..22].iter().all(|b| *b == 0));
    assert!(report[27..CHECKSUM_OFFSET].iter().all(|b| *b == 0));

    let unpacked = PackedOutputReport::unpack_from_slice(&report)?;
    assert_eq!(unpacked.state(), state);

    Ok(())
}

#[test]
fn test_default_report() -> Result<(), Box<dyn Error>> {
    let report = PackedOutputReport::default();
    let mut expected = vec![0; OUTPUT_REPORT_SIZE];
    expected[..4].copy_from_slice(&[0xa2, 0x11, 0xc0, 0x20]);
    expected[22..27].copy_from_slice(&[0x43, 0x43, 0x00, 0x4d, 0x85]);
    assert_eq!(report.pack_to_vec()?, expected);

    Ok(())
}

#[test]
fn test_checksum_trailer() -> Result<(), Box<dyn Error>> {
    let states = [
        OutputState::default(),
        OutputState::neutral(),
        OutputState {
            rumble: Rumble {
                left: 255,
                right: 255,
            },
            color: Color {
                r: 255,
                g: 255,
                b: 255,
            },
        },
        OutputState {
            rumble: Rumble { left: 7, right: 0 },
            color: Color { r: 0, g: 42, b: 200 },
        },
    ];
    for state in states {
        let report = encode(&state)?;
        let expected = checksum(0, &report[..CHECKSUM_OFFSET]);
        assert_eq!(&report[CHECKSUM_OFFSET..], &expected.to_le_bytes());

        let unpacked = PackedOutputReport::unpack(&report)?;
        assert_eq!(unpacked.checksum.to_primitive(), expected);
        assert!(unpacked.is_valid()?);
    }

    Ok(())
}

#[test]
fn test_corruption_detected() -> Result<(), Box<dyn Error>> {
    let mut report = encode(&OutputState::neutral())?;
    report[30] ^= 0x01;
    let unpacked = PackedOutputReport::unpack(&report)?;
    assert!(!unpacked.is_valid()?);

    let mut unpacked = PackedOutputReport::unpack(&encode(&OutputState::neutral())?)?;
    unpacked.checksum = Integer::from_primitive(unpacked.checksum.to_primitive() ^ 1);
    assert!(!unpacked.is_valid()?);

    Ok(())
}

#[test]
fn test_encode_is_pure() -> Result<(), Box<dyn Error>> {
    let state = OutputState::neutral();
    assert_eq!(encode(&state)?, encode(&state)?);

    // Only the changed field and the checksum differ
    let mut brighter = state;
    brighter.color.g = 200;
    let a = encode(&state)?;
    let b = encode(&brighter)?;
    let changed: Vec<usize> = (0..OUTPUT_REPORT_SIZE).filter(|i| a[*i] != b[*i]).collect();
    assert_eq!(changed[0], 7);
    assert!(changed[1..].iter().all(|i| *i >= CHECKSUM_OFFSET));

    Ok(())
}
