use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use super::transport::{Transport, TransportError};

/// Transport that records every written report. Clones share the same
/// record, so a test can keep one while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    reports: Arc<Mutex<Vec<Vec<u8>>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of all reports written so far
    pub fn reports(&self) -> Vec<Vec<u8>> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.reports().len()
    }
}

impl Transport for RecordingTransport {
    fn write_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::ShortWrite {
                expected: report.len(),
                written: 0,
            });
        }
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.to_vec());
        }
        Ok(())
    }
}
