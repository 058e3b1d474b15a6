//! Gravity and lock-check timers
//!
//! Two independent periodic callbacks driven by one clock. Gravity fires at
//! the engine's level-dependent interval, recomputed after every firing; the
//! lock check fires at a fixed, faster period so lock-delay expiry is noticed
//! promptly at any level.

use crate::clock::Clock;
use crate::engine::Engine;
use crate::score::LineClearType;
use std::time::{Duration, Instant};

pub const LOCK_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Which timers fired in one `fire_due` call and what each produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fired {
    pub gravity: Option<LineClearType>,
    pub lock_check: Option<LineClearType>,
}

impl Fired {
    pub fn any(&self) -> bool {
        self.gravity.is_some() || self.lock_check.is_some()
    }

    /// The clear produced by whichever timer locked a piece, if any did
    pub fn clear(&self) -> LineClearType {
        [self.gravity, self.lock_check]
            .into_iter()
            .flatten()
            .find(|clear| *clear != LineClearType::None)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Ticker {
    next_gravity: Instant,
    next_lock_check: Instant,
    paused: bool,
}

impl Ticker {
    /// Schedule both timers one period after `now`
    pub fn new<C: Clock>(engine: &Engine<C>, now: Instant) -> Self {
        Self {
            next_gravity: now + engine.gravity_interval(),
            next_lock_check: now + LOCK_CHECK_INTERVAL,
            paused: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop delivering ticks
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Restart both timers from `now`
    pub fn resume<C: Clock>(&mut self, engine: &Engine<C>, now: Instant) {
        *self = Self::new(engine, now);
    }

    /// Earliest instant at which `fire_due` has work to do.
    /// None while paused.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.paused {
            return None;
        }
        Some(self.next_gravity.min(self.next_lock_check))
    }

    /// How long the caller may wait for input before the next deadline
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire every timer whose deadline has passed, gravity first.
    /// A late timer fires once, not once per missed period.
    pub fn fire_due<C: Clock>(&mut self, engine: &mut Engine<C>, now: Instant) -> Fired {
        let mut fired = Fired::default();
        if self.paused {
            return fired;
        }

        if now >= self.next_gravity {
            fired.gravity = Some(engine.tick());
            // The level may have changed with that tick
            self.next_gravity = now + engine.gravity_interval();
        }
        if now >= self.next_lock_check {
            fired.lock_check = Some(engine.check_lock());
            self.next_lock_check = now + LOCK_CHECK_INTERVAL;
        }
        fired
    }
}
