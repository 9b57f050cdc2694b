use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Handle to a timer scheduled on a [TimerQueue]. Only the owner of the
/// handle can cancel the timer.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer {
    key: String,
    period: Duration,
    deadline: Instant,
}

/// Recurring timers for the event loop. The queue never sleeps or spawns
/// anything itself; the loop asks for the next deadline, waits for it and
/// then collects the expired timers.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: HashMap<u64, Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer that first expires at `first_fire` and then once
    /// every `period`. The given key is returned from [TimerQueue::expire]
    /// whenever the timer expires.
    pub fn schedule_recurring(
        &mut self,
        key: String,
        period: Duration,
        first_fire: Instant,
    ) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("Scheduling timer {id} for {key} every {period:?}");
        self.timers.insert(
            id,
            Timer {
                key,
                period,
                deadline: first_fire,
            },
        );
        TimerHandle(id)
    }

    /// Cancel the given timer. Returns false if it was already cancelled.
    pub fn cancel(&mut self, handle: &TimerHandle) -> bool {
        let removed = self.timers.remove(&handle.0);
        if let Some(timer) = removed.as_ref() {
            log::debug!("Cancelled timer {} for {}", handle.0, timer.key);
        }
        removed.is_some()
    }

    /// Returns the earliest deadline of all scheduled timers
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    /// Returns the keys of all timers that expired at or before `now`, the
    /// earliest first, and re-arms each of them for its next period. Periods
    /// that were missed entirely are skipped.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<(Instant, u64)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(id, timer)| (timer.deadline, *id))
            .collect();
        expired.sort();

        let mut keys = Vec::with_capacity(expired.len());
        for (_, id) in expired {
            let Some(timer) = self.timers.get_mut(&id) else {
                continue;
            };
            keys.push(timer.key.clone());
            if timer.period.is_zero() {
                self.timers.remove(&id);
                continue;
            }
            while timer.deadline <= now {
                timer.deadline += timer.period;
            }
        }

        keys
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
