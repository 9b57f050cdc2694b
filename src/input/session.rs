use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use crate::drivers::dualshock4::hid_report::{encode, OutputState};

use super::{
    animation::Animation,
    timer::{TimerHandle, TimerQueue},
    transport::Transport,
};

/// Lifecycle of a [DeviceSession]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Timer armed, output reports are sent on every tick
    Active,
    /// Teardown has started; no further updates are sent
    Terminating,
    /// All owned resources have been released
    Destroyed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            SessionState::Active => "active",
            SessionState::Terminating => "terminating",
            SessionState::Destroyed => "destroyed",
        };
        write!(f, "{state}")
    }
}

/// A [DeviceSession] owns the connection to one physical controller. While
/// active it sends a freshly computed output report every time its timer
/// expires. Terminating the session consumes it, so it can only happen once.
pub struct DeviceSession {
    id: String,
    state: SessionState,
    transport: Box<dyn Transport>,
    animation: Box<dyn Animation>,
    timer: Option<TimerHandle>,
    reports_sent: u64,
    write_failures: u64,
}

impl DeviceSession {
    /// Create a new active session for the device with the given id and arm
    /// its update timer. The first update is due at `now`.
    pub fn new(
        id: String,
        transport: Box<dyn Transport>,
        animation: Box<dyn Animation>,
        timers: &mut TimerQueue,
        period: Duration,
        now: Instant,
    ) -> Self {
        let timer = timers.schedule_recurring(id.clone(), period, now);
        log::debug!("Started session for {id}");
        Self {
            id,
            state: SessionState::Active,
            transport,
            animation,
            timer: Some(timer),
            reports_sent: 0,
            write_failures: 0,
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of output reports successfully written
    pub fn reports_sent(&self) -> u64 {
        self.reports_sent
    }

    /// Number of output reports the transport failed to write
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Compute the output state for the given time (seconds since the Unix
    /// epoch) and send it to the device. Does nothing unless the session is
    /// active.
    pub fn update(&mut self, time: f64) {
        if self.state != SessionState::Active {
            log::trace!("Ignoring update for {} session {}", self.state, self.id);
            return;
        }
        let state = self.animation.output_state(time);
        self.send(&state);
    }

    /// Handle an input report delivered by the device. Reports are only
    /// logged.
    pub fn on_input_report(&self, report: &[u8]) {
        if self.state != SessionState::Active {
            return;
        }
        let report_id = report.first().copied().unwrap_or_default();
        log::trace!(
            "{}: input report id {report_id:#04x} len {}: {report:02x?}",
            self.id,
            report.len()
        );
    }

    /// Stop the session: cancel the update timer, send one neutral report
    /// and release everything the session owns. The device itself belongs
    /// to the host and is left alone.
    pub fn terminate(mut self, timers: &mut TimerQueue) {
        self.state = SessionState::Terminating;
        if let Some(timer) = self.timer.take() {
            timers.cancel(&timer);
        }

        log::debug!("Resetting {} to neutral state", self.id);
        self.send(&OutputState::neutral());

        self.state = SessionState::Destroyed;
        log::info!(
            "Session for {} {}: {} reports sent, {} failed",
            self.id,
            self.state,
            self.reports_sent,
            self.write_failures
        );
    }

    /// Encode and write a single output report. Failures are logged and
    /// counted; the next tick tries again.
    fn send(&mut self, state: &OutputState) {
        let report = match encode(state) {
            Ok(report) => report,
            Err(e) => {
                self.write_failures += 1;
                log::error!("Failed to pack output report for {}: {e:?}", self.id);
                return;
            }
        };
        log::trace!("{}: sending {state}", self.id);
        match self.transport.write_report(&report) {
            Ok(()) => self.reports_sent += 1,
            Err(e) => {
                self.write_failures += 1;
                log::warn!("Failed to write output report to {}: {e}", self.id);
            }
        }
    }
}
