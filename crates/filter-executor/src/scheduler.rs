//! Tick scheduler driven by host timer callbacks.

use std::fmt;
use std::time::{Duration, SystemTime};

use crate::registry::{TickAction, TickRegistry};

/// An installed tick function.
pub struct TickEntry {
    period: Duration,
    last_fired: SystemTime,
    action: TickAction,
}

impl TickEntry {
    /// Minimum time between firings.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the entry last fired, or when it was armed.
    pub fn last_fired(&self) -> SystemTime {
        self.last_fired
    }

    fn is_due(&self, now: SystemTime) -> bool {
        // A clock that moved backwards never makes an entry due.
        now.duration_since(self.last_fired)
            .map(|elapsed| elapsed >= self.period)
            .unwrap_or(false)
    }
}

impl fmt::Debug for TickEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickEntry")
            .field("period", &self.period)
            .field("last_fired", &self.last_fired)
            .finish_non_exhaustive()
    }
}

/// Fires registered tick functions once their period has elapsed.
///
/// Entries are visited in registration order. There is no cancellation;
/// a new configuration replaces the whole scheduler.
#[derive(Debug, Default)]
pub struct TickScheduler {
    entries: Vec<TickEntry>,
}

impl TickScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install every function from `registry`, counting periods from `now`.
    pub fn arm(registry: TickRegistry, now: SystemTime) -> Self {
        let entries = registry
            .into_pending()
            .into_iter()
            .map(|pending| TickEntry {
                period: pending.period,
                last_fired: now,
                action: pending.action,
            })
            .collect();
        Self { entries }
    }

    /// Handle one host tick. Returns how many entries fired.
    pub fn on_tick(&mut self, now: SystemTime) -> usize {
        let mut fired = 0;
        for entry in &mut self.entries {
            if entry.is_due(now) {
                entry.last_fired = now;
                (entry.action)();
                fired += 1;
            }
        }
        fired
    }

    /// Installed entries in registration order.
    pub fn entries(&self) -> &[TickEntry] {
        &self.entries
    }

    /// Whether nothing is installed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
