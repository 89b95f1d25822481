//! Platform abstraction traits for idle-time scheduling.
//!
//! The engine never measures time itself. The embedder owns the timing
//! source, decides when the host is idle, and hands a [`Deadline`] to
//! [`Reconciler::work_loop`](crate::Reconciler::work_loop).

use std::time::Duration;

/// Registers interest in the next idle period.
///
/// The work loop calls this after every slice, whether or not work remains,
/// so an implementation only has to remember that a callback is wanted.
pub trait IdleScheduler {
    fn request_idle_callback(&self);
}

/// Time left in the current idle period.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

impl Deadline for Duration {
    fn time_remaining(&self) -> Duration {
        *self
    }
}

/// Scheduler for embedders that drive the work loop by polling.
#[derive(Debug, Default)]
pub struct NoopScheduler;

impl IdleScheduler for NoopScheduler {
    fn request_idle_callback(&self) {}
}
