use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::constants::UPDATE_PERIOD;

use super::{
    animation::ColorCycle,
    session::DeviceSession,
    timer::TimerQueue,
    transport::Transport,
};

/// Possible errors when registering a device
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("device {0} already has a session")]
    AlreadyRegistered(String),
}

/// Vendor and product id a device must have to be managed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

/// The [Registry] owns every live [DeviceSession] and the timers driving
/// them. All methods are expected to be called from a single event loop.
/// Dropping the registry terminates any sessions that are still alive.
pub struct Registry {
    filter: DeviceFilter,
    period: Duration,
    sessions: HashMap<String, DeviceSession>,
    timers: TimerQueue,
}

impl Registry {
    pub fn new(filter: DeviceFilter) -> Self {
        Self::with_period(filter, UPDATE_PERIOD)
    }

    /// Create a registry whose sessions update at the given period
    pub fn with_period(filter: DeviceFilter, period: Duration) -> Self {
        Self {
            filter,
            period,
            sessions: HashMap::new(),
            timers: TimerQueue::new(),
        }
    }

    pub fn filter(&self) -> DeviceFilter {
        self.filter
    }

    /// Create a session for a newly matched device. Its first update is due
    /// at `now`.
    pub fn on_device_matched(
        &mut self,
        id: &str,
        transport: Box<dyn Transport>,
        now: Instant,
    ) -> Result<(), RegistryError> {
        if self.sessions.contains_key(id) {
            return Err(RegistryError::AlreadyRegistered(id.to_string()));
        }
        let session = DeviceSession::new(
            id.to_string(),
            transport,
            Box::new(ColorCycle::default()),
            &mut self.timers,
            self.period,
            now,
        );
        self.sessions.insert(id.to_string(), session);
        log::info!("Managing device {id} ({} total)", self.sessions.len());

        Ok(())
    }

    /// Remove and terminate the session for the given device. Returns false
    /// if there was no such session.
    pub fn on_device_removed(&mut self, id: &str) -> bool {
        let Some(session) = self.sessions.remove(id) else {
            log::debug!("No session for removed device {id}");
            return false;
        };
        session.terminate(&mut self.timers);
        log::info!("Released device {id} ({} remaining)", self.sessions.len());
        true
    }

    /// Pass an input report to the session of the given device
    pub fn on_input_report(&self, id: &str, report: &[u8]) {
        match self.sessions.get(id) {
            Some(session) => session.on_input_report(report),
            None => log::trace!("Dropping input report for unmanaged device {id}"),
        }
    }

    /// Update every session whose timer expired at or before `now`. `time`
    /// is the current wall clock time in seconds since the Unix epoch.
    pub fn fire_timers(&mut self, now: Instant, time: f64) {
        for id in self.timers.expire(now) {
            match self.sessions.get_mut(&id) {
                Some(session) => session.update(time),
                None => log::warn!("Timer fired for unknown device {id}"),
            }
        }
    }

    /// Returns when the next session update is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Terminate every session. The order sessions are terminated in is
    /// unspecified.
    pub fn shutdown(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        log::info!("Releasing {} device(s)", self.sessions.len());
        while let Some(id) = self.sessions.keys().next().cloned() {
            self.on_device_removed(&id);
        }
        log::debug!("{} timer(s) left after shutdown", self.timers.len());
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
