use thiserror::Error;

/// Possible errors when transmitting an output report
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to write report: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("short write: expected {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },
}

/// A [Transport] delivers complete output reports to a physical device.
/// Reports are handed over with their leading header byte; any framing the
/// underlying channel needs (like stripping that byte) is done by the
/// implementation.
pub trait Transport: Send {
    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError>;
}
