//! Tick functions registered during configuration parsing.

use std::fmt;
use std::time::Duration;

use crate::TICK_GRANULARITY;

/// Callback invoked on every firing of a tick entry.
pub type TickAction = Box<dyn FnMut()>;

/// A tick function waiting to be installed.
pub struct PendingTick {
    /// Minimum time between firings.
    pub period: Duration,
    /// Work to run.
    pub action: TickAction,
}

impl PendingTick {
    /// Whether the period lines up with the host tick granularity.
    pub fn is_aligned(&self) -> bool {
        !self.period.is_zero() && self.period.as_nanos() % TICK_GRANULARITY.as_nanos() == 0
    }
}

impl fmt::Debug for PendingTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTick")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

/// Collects tick functions while a configuration is being parsed.
///
/// A fresh registry is used per configuration attempt, so a failed parse
/// leaves the running scheduler untouched.
#[derive(Debug, Default)]
pub struct TickRegistry {
    pending: Vec<PendingTick>,
}

impl TickRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` to run at least `period` apart.
    pub fn register(&mut self, period: Duration, action: impl FnMut() + 'static) {
        self.pending.push(PendingTick {
            period,
            action: Box::new(action),
        });
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Periods that are zero or not a multiple of [`TICK_GRANULARITY`].
    pub fn misaligned_periods(&self) -> Vec<Duration> {
        self.pending
            .iter()
            .filter(|p| !p.is_aligned())
            .map(|p| p.period)
            .collect()
    }

    /// Registered entries in registration order.
    pub fn into_pending(self) -> Vec<PendingTick> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_order() {
        let mut registry = TickRegistry::new();
        assert!(registry.is_empty());

        registry.register(Duration::from_secs(1), || {});
        registry.register(Duration::from_millis(200), || {});

        let periods: Vec<_> = registry.into_pending().iter().map(|p| p.period).collect();
        assert_eq!(
            periods,
            vec![Duration::from_secs(1), Duration::from_millis(200)]
        );
    }

    #[test]
    fn test_misaligned_periods() {
        let mut registry = TickRegistry::new();
        registry.register(Duration::from_millis(300), || {});
        registry.register(Duration::from_millis(150), || {});
        registry.register(Duration::ZERO, || {});

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.misaligned_periods(),
            vec![Duration::from_millis(150), Duration::ZERO]
        );
    }
}
