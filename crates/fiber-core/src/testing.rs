use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::element::Element;
use crate::host::{HostError, MemoryHost, NodeId};
use crate::platform::{Deadline, IdleScheduler};
use crate::work_loop::{Reconciler, WorkReport};

/// Deadline that never runs out.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlimitedDeadline;

impl Deadline for UnlimitedDeadline {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Deadline that runs out after a fixed number of expanded units.
///
/// The work loop checks the deadline once after every unit, so
/// `StepDeadline::new(3)` lets exactly three units through before the
/// slice yields. A budget of zero still lets the first unit run.
#[derive(Debug)]
pub struct StepDeadline {
    checks_left: Cell<usize>,
}

impl StepDeadline {
    pub fn new(units: usize) -> Self {
        Self {
            checks_left: Cell::new(units),
        }
    }
}

impl Deadline for StepDeadline {
    fn time_remaining(&self) -> Duration {
        let left = self.checks_left.get();
        if left <= 1 {
            self.checks_left.set(0);
            Duration::ZERO
        } else {
            self.checks_left.set(left - 1);
            Duration::from_millis(50)
        }
    }
}

/// Scheduler that only counts idle callback requests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    requests: Cell<usize>,
}

impl ManualScheduler {
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    /// Returns whether any request arrived since the last call.
    pub fn take_request(&self) -> bool {
        self.requests.replace(0) > 0
    }
}

impl IdleScheduler for ManualScheduler {
    fn request_idle_callback(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

/// Headless harness for exercising render passes in tests.
///
/// Owns a [`Reconciler`] over a [`MemoryHost`] with a single mount point
/// and a [`ManualScheduler`], and offers helpers to run slices with either
/// an unlimited or a unit-counted deadline.
pub struct ReconcilerTestRule {
    reconciler: Reconciler<MemoryHost>,
    scheduler: Rc<ManualScheduler>,
    container: NodeId,
}

impl ReconcilerTestRule {
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Rc::new(ManualScheduler::default());
        let reconciler = Reconciler::with_scheduler(host, scheduler.clone());
        Self {
            reconciler,
            scheduler,
            container,
        }
    }

    /// Schedules `element` without doing any work yet.
    pub fn schedule(&mut self, element: Element) {
        self.reconciler.render(element, self.container);
    }

    /// Schedules `element` and runs until it is committed.
    pub fn render(&mut self, element: Element) -> Result<WorkReport, HostError> {
        self.schedule(element);
        self.run_until_idle()
    }

    /// Runs slices with an unlimited deadline until no generation is in
    /// progress. Returns the report of the last slice.
    pub fn run_until_idle(&mut self) -> Result<WorkReport, HostError> {
        let mut report = WorkReport::default();
        while self.reconciler.has_pending_work() {
            report = self.reconciler.work_loop(&UnlimitedDeadline)?;
        }
        Ok(report)
    }

    /// Runs one slice that yields after `units` expanded units.
    pub fn step(&mut self, units: usize) -> Result<WorkReport, HostError> {
        self.reconciler.work_loop(&StepDeadline::new(units))
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn host(&self) -> &MemoryHost {
        self.reconciler.host()
    }

    pub fn host_mut(&mut self) -> &mut MemoryHost {
        self.reconciler.host_mut()
    }

    pub fn scheduler(&self) -> &ManualScheduler {
        &self.scheduler
    }

    pub fn reconciler(&mut self) -> &mut Reconciler<MemoryHost> {
        &mut self.reconciler
    }

    /// Host tree below the mount point.
    pub fn dump(&self) -> String {
        self.host().dump_tree(Some(self.container))
    }

    pub fn text(&self) -> String {
        self.host().text_content(self.container)
    }
}

impl Default for ReconcilerTestRule {
    fn default() -> Self {
        Self::new()
    }
}
