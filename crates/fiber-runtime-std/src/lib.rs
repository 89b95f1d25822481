//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction traits defined in `fiber-core`. Applications can
//! construct a [`StdRuntime`], hand its runtime to
//! [`fiber_core::Reconciler::with_runtime`] and pump idle slices with an
//! [`IdleDriver`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fiber_core::{Deadline, Host, HostError, IdleScheduler, Reconciler, Runtime, RuntimeHandle};

/// Scheduler that records idle callback requests for a polling loop.
pub struct StdIdleScheduler {
    idle_requested: Cell<bool>,
    idle_waker: RefCell<Option<Rc<dyn Fn() + 'static>>>,
}

impl StdIdleScheduler {
    pub fn new() -> Self {
        Self {
            idle_requested: Cell::new(false),
            idle_waker: RefCell::new(None),
        }
    }

    /// Returns whether an idle callback has been requested since the last call.
    pub fn take_idle_request(&self) -> bool {
        self.idle_requested.replace(false)
    }

    /// Registers a waker that will be invoked whenever an idle callback is requested.
    pub fn set_idle_waker(&self, waker: impl Fn() + 'static) {
        *self.idle_waker.borrow_mut() = Some(Rc::new(waker));
    }

    /// Clears any registered idle waker.
    pub fn clear_idle_waker(&self) {
        *self.idle_waker.borrow_mut() = None;
    }

    fn wake(&self) {
        let waker = self.idle_waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdIdleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdIdleScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdIdleScheduler")
            .field("idle_requested", &self.idle_requested.get())
            .finish()
    }
}

impl IdleScheduler for StdIdleScheduler {
    fn request_idle_callback(&self) {
        self.idle_requested.set(true);
        self.wake();
    }
}

/// Deadline measured against [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct StdDeadline {
    started: Instant,
    budget: Duration,
}

impl StdDeadline {
    /// Starts an idle period of `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Deadline for StdDeadline {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

/// Convenience container bundling the standard scheduler and a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Rc<StdIdleScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        let scheduler = Rc::new(StdIdleScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    /// Returns a [`fiber_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Rc<StdIdleScheduler> {
        Rc::clone(&self.scheduler)
    }

    /// Returns whether an idle callback was requested since the last poll.
    pub fn take_idle_request(&self) -> bool {
        self.scheduler.take_idle_request()
    }

    pub fn set_idle_waker(&self, waker: impl Fn() + 'static) {
        self.scheduler.set_idle_waker(waker);
    }

    pub fn clear_idle_waker(&self) {
        self.scheduler.clear_idle_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("phase", &self.runtime.phase())
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs work loop slices, each with a fresh idle period of `budget`.
#[derive(Debug, Clone, Copy)]
pub struct IdleDriver {
    budget: Duration,
}

impl IdleDriver {
    pub const DEFAULT_BUDGET: Duration = Duration::from_millis(16);

    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Runs one slice against a fresh deadline.
    pub fn run_slice<H: Host>(&self, reconciler: &mut Reconciler<H>) -> Result<bool, HostError> {
        let report = reconciler.work_loop(&StdDeadline::new(self.budget))?;
        if let Some(summary) = report.commit {
            log::debug!(
                "committed {} placements, {} updates, {} deletions",
                summary.placements,
                summary.updates,
                summary.deletions
            );
        }
        Ok(report.has_pending_work)
    }

    /// Runs slices until no render pass is in progress and returns how many
    /// slices it took. Host failures are logged and returned.
    pub fn run_until_idle<H: Host>(
        &self,
        reconciler: &mut Reconciler<H>,
    ) -> Result<usize, HostError> {
        let mut slices = 0;
        while reconciler.has_pending_work() {
            slices += 1;
            if let Err(err) = self.run_slice(reconciler) {
                log::error!("render pass failed after {slices} slices: {err}");
                return Err(err);
            }
        }
        Ok(slices)
    }
}

impl Default for IdleDriver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET)
    }
}
