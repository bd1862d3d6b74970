//! Periodic tick scheduling for plugin background work.
//!
//! This crate provides:
//! - `TickRegistry` - Staging area filled while configuration is parsed
//! - `TickScheduler` - Fires registered callbacks on host ticks

mod registry;
mod scheduler;

pub use registry::*;
pub use scheduler::*;

use std::time::Duration;

/// Period at which the host is asked to deliver ticks.
///
/// Registered periods are effectively rounded up to a multiple of this.
pub const TICK_GRANULARITY: Duration = Duration::from_millis(100);
