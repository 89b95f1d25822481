use std::rc::Rc;
use std::time::Duration;

use crate::commit::{commit_root, CommitSummary};
use crate::element::{Element, Props, TEXT_ELEMENT};
use crate::hooks::RenderScope;
use crate::host::{Host, HostError, NodeId};
use crate::platform::{Deadline, IdleScheduler, NoopScheduler};
use crate::props::apply_prop_diff;
use crate::reconcile::reconcile_children;
use crate::runtime::{Runtime, RuntimeHandle, SchedulerPhase};
use crate::unit::{UnitId, UnitKind, UnitTree};

#[derive(Debug, Clone, Copy)]
pub struct WorkLoopOptions {
    /// The loop yields once the deadline reports less time than this.
    pub yield_threshold: Duration,
}

impl Default for WorkLoopOptions {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
        }
    }
}

/// Outcome of one work loop slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkReport {
    pub units_performed: usize,
    /// Set when the slice finished a generation and committed it.
    pub commit: Option<CommitSummary>,
    /// Whether an in-progress generation is still waiting for more slices.
    pub has_pending_work: bool,
}

impl WorkReport {
    pub fn committed(&self) -> bool {
        self.commit.is_some()
    }
}

/// Drives render passes against a host tree.
pub struct Reconciler<H: Host> {
    host: H,
    runtime: Runtime,
    options: WorkLoopOptions,
    last_commit: Option<CommitSummary>,
}

impl<H: Host> Reconciler<H> {
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, Runtime::new(Rc::new(NoopScheduler)))
    }

    pub fn with_scheduler(host: H, scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self::with_runtime(host, Runtime::new(scheduler))
    }

    pub fn with_runtime(host: H, runtime: Runtime) -> Self {
        Self {
            host,
            runtime,
            options: WorkLoopOptions::default(),
            last_commit: None,
        }
    }

    pub fn with_options(mut self, options: WorkLoopOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render(&mut self, element: Element, container: NodeId) {
        self.runtime.render(element, container);
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn options(&self) -> WorkLoopOptions {
        self.options
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.runtime.phase()
    }

    pub fn has_pending_work(&self) -> bool {
        self.runtime.has_pending_work()
    }

    pub fn last_commit(&self) -> Option<CommitSummary> {
        self.last_commit
    }

    /// Read access to the unit arena and the committed root.
    pub fn inspect_units<R>(&self, f: impl FnOnce(&UnitTree, Option<UnitId>) -> R) -> R {
        let state = self.runtime.state();
        f(&state.units, state.current_root)
    }

    /// Pre-order dump of the committed generation with effect tags.
    pub fn dump_units(&self) -> String {
        self.inspect_units(|units, root| match root {
            Some(root) => units.dump(root),
            None => "(no root)\n".to_string(),
        })
    }

    /// Runs one idle slice: expands units until none remain or `deadline`
    /// drops under the yield threshold, commits a finished generation, then
    /// asks the scheduler for the next idle period. The request is made even
    /// when the slice fails.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<WorkReport, HostError> {
        let result = self.run_slice(deadline);
        self.runtime.request_idle_callback();
        result
    }

    fn run_slice(&mut self, deadline: &dyn Deadline) -> Result<WorkReport, HostError> {
        let mut report = WorkReport::default();

        loop {
            let (unit, root) = {
                let state = self.runtime.state();
                match (state.next_unit, state.wip_root) {
                    (Some(unit), Some(root)) => (unit, root),
                    _ => break,
                }
            };

            let next = self.perform_unit_of_work(unit, root)?;
            report.units_performed += 1;

            {
                let mut state = self.runtime.state_mut();
                // A setter fired inside a component has already pointed
                // `next_unit` at a fresh root.
                if state.wip_root == Some(root) {
                    state.next_unit = next;
                }
            }

            if deadline.time_remaining() < self.options.yield_threshold {
                log::trace!(
                    "yielding after {} units with work remaining",
                    report.units_performed
                );
                break;
            }
        }

        let finished_root = {
            let state = self.runtime.state();
            match (state.next_unit, state.wip_root) {
                (None, Some(root)) => Some(root),
                _ => None,
            }
        };
        if let Some(root) = finished_root {
            let summary = self.commit(root)?;
            report.commit = Some(summary);
        }

        report.has_pending_work = self.runtime.has_pending_work();
        Ok(report)
    }

    /// Expands one unit and returns its pre-order successor.
    fn perform_unit_of_work(
        &mut self,
        unit: UnitId,
        root: UnitId,
    ) -> Result<Option<UnitId>, HostError> {
        let kind = self.runtime.state().units[unit].kind.clone();
        log::trace!("performing unit {unit} ({})", kind.label());

        match kind {
            UnitKind::Root => self.update_host_unit(unit, None)?,
            UnitKind::Host(tag) => self.update_host_unit(unit, Some(&*tag))?,
            UnitKind::Component(component) => {
                let (props, previous) = {
                    let state = self.runtime.state();
                    let current = &state.units[unit];
                    let previous = current
                        .alternate
                        .map(|alt| state.units[alt].hooks.clone())
                        .unwrap_or_default();
                    (Rc::clone(&current.props), previous)
                };

                let mut scope = RenderScope::new(unit, previous, self.runtime.handle());
                let output = component.render(&props, &mut scope);

                let mut state = self.runtime.state_mut();
                if state.wip_root != Some(root) {
                    log::debug!("render pass abandoned while expanding {}", component.name());
                    return Ok(None);
                }
                state.units[unit].hooks = scope.into_hooks();
                let pass = state.pass();
                let state = &mut *state;
                reconcile_children(
                    &mut state.units,
                    &mut state.deletions,
                    unit,
                    std::slice::from_ref(&output),
                    pass,
                );
            }
        }

        Ok(self.runtime.state().units.next_in_preorder(unit, root))
    }

    /// Creates the host node on first visit, then reconciles children.
    /// `tag` is `None` for the root, whose node is the mount point.
    fn update_host_unit(&mut self, unit: UnitId, tag: Option<&str>) -> Result<(), HostError> {
        let mut state = self.runtime.state_mut();
        let props = Rc::clone(&state.units[unit].props);

        if let (None, Some(tag)) = (state.units[unit].host_node, tag) {
            let node = if tag == TEXT_ELEMENT {
                self.host.create_text_node()?
            } else {
                self.host.create_node(tag)?
            };
            apply_prop_diff(&mut self.host, node, &Props::default(), &props)?;
            state.units[unit].host_node = Some(node);
        }

        let pass = state.pass();
        let state = &mut *state;
        reconcile_children(
            &mut state.units,
            &mut state.deletions,
            unit,
            props.children(),
            pass,
        );
        Ok(())
    }

    fn commit(&mut self, root: UnitId) -> Result<CommitSummary, HostError> {
        let mut state = self.runtime.state_mut();
        let deletions = std::mem::take(&mut state.deletions);
        let summary = match commit_root(&mut self.host, &state.units, root, &deletions) {
            Ok(summary) => summary,
            Err(err) => {
                state.abandon_pass();
                log::warn!("commit of root {root} failed, dropping the pass: {err}");
                return Err(err);
            }
        };
        let freed = state.finish_commit(root);
        log::debug!(
            "committed root {root}: {} placed, {} updated, {} deleted, {freed} units reclaimed",
            summary.placements,
            summary.updates,
            summary.deletions
        );
        self.last_commit = Some(summary);
        Ok(summary)
    }
}
