use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::element::{Element, Props};
use crate::host::NodeId;
use crate::platform::IdleScheduler;
use crate::unit::{Unit, UnitId, UnitTree};

/// Where the scheduler stands with respect to the in-progress generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Nothing to render.
    Idle,
    /// A render pass was started but its root has not been expanded yet.
    Scheduled,
    /// Part of the in-progress generation has been expanded.
    Running,
}

/// Scheduler context shared by the work loop and state setters.
pub(crate) struct SchedulerState {
    pub(crate) units: UnitTree,
    pub(crate) next_unit: Option<UnitId>,
    pub(crate) current_root: Option<UnitId>,
    pub(crate) wip_root: Option<UnitId>,
    pub(crate) deletions: Vec<UnitId>,
    pass: u64,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            units: UnitTree::new(),
            next_unit: None,
            current_root: None,
            wip_root: None,
            deletions: Vec::new(),
            pass: 0,
        }
    }

    /// Starts a new render pass, replacing any in-progress one.
    fn begin_pass(
        &mut self,
        container: NodeId,
        props: Rc<Props>,
        alternate: Option<UnitId>,
    ) -> UnitId {
        self.pass += 1;
        let root = self
            .units
            .insert(Unit::root(container, props, alternate, self.pass));
        if let Some(abandoned) = self.wip_root.replace(root) {
            log::debug!("render pass replaced in-progress root {abandoned}");
        }
        self.deletions.clear();
        self.next_unit = Some(root);
        root
    }

    pub(crate) fn pass(&self) -> u64 {
        self.pass
    }

    pub(crate) fn phase(&self) -> SchedulerPhase {
        match self.wip_root {
            None => SchedulerPhase::Idle,
            Some(root) if self.next_unit == Some(root) => SchedulerPhase::Scheduled,
            Some(_) => SchedulerPhase::Running,
        }
    }

    /// Drops the in-progress pass after its commit failed. The committed
    /// root stays current and the dropped units go at the next commit.
    pub(crate) fn abandon_pass(&mut self) -> Option<UnitId> {
        self.next_unit = None;
        self.deletions.clear();
        self.wip_root.take()
    }

    /// Promotes the in-progress root to current and reclaims every unit the
    /// new generation no longer needs. Returns the number of units freed.
    pub(crate) fn finish_commit(&mut self, root: UnitId) -> usize {
        self.current_root = Some(root);
        self.wip_root = None;
        self.next_unit = None;
        self.deletions.clear();
        let pass = self.units[root].pass;
        self.units.retain_pass(pass)
    }
}

pub(crate) struct RuntimeInner {
    scheduler: Rc<dyn IdleScheduler>,
    state: RefCell<SchedulerState>,
}

impl RuntimeInner {
    fn new(scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self {
            scheduler,
            state: RefCell::new(SchedulerState::new()),
        }
    }

    fn request_idle_callback(&self) {
        self.scheduler.request_idle_callback();
    }

    fn render(&self, element: Element, container: NodeId) {
        {
            let mut state = self.state.borrow_mut();
            let alternate = state.current_root;
            let props = Rc::new(Props::with_children(vec![element]));
            let root = state.begin_pass(container, props, alternate);
            log::debug!("render scheduled at root {root} into host node {container}");
        }
        self.request_idle_callback();
    }

    fn schedule_rerender(&self) {
        {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                log::warn!("state update arrived during commit; it will apply on the next render");
                return;
            };
            let Some(current) = state.current_root else {
                log::debug!("state update before first commit queued without a render");
                return;
            };
            let previous = &state.units[current];
            let Some(container) = previous.host_node else {
                return;
            };
            let props = Rc::clone(&previous.props);
            let root = state.begin_pass(container, props, Some(current));
            log::debug!("state update scheduled re-render at root {root}");
        }
        self.request_idle_callback();
    }
}

/// Owner of the scheduler context. Lives as long as the embedder keeps it.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    /// Starts rendering `element` into `container`. The previous committed
    /// generation, if any, becomes the alternate.
    pub fn render(&self, element: Element, container: NodeId) {
        self.inner.render(element, container);
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.inner.state.borrow().phase()
    }

    pub fn has_pending_work(&self) -> bool {
        self.inner.state.borrow().wip_root.is_some()
    }

    pub fn current_root(&self) -> Option<UnitId> {
        self.inner.state.borrow().current_root
    }

    pub(crate) fn request_idle_callback(&self) {
        self.inner.request_idle_callback();
    }

    pub(crate) fn state(&self) -> Ref<'_, SchedulerState> {
        self.inner.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, SchedulerState> {
        self.inner.state.borrow_mut()
    }
}

/// Weak reference to a [`Runtime`], held by state setters. Every method is
/// a no-op once the runtime is gone.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn render(&self, element: Element, container: NodeId) {
        if let Some(inner) = self.0.upgrade() {
            inner.render(element, container);
        }
    }

    pub fn schedule_rerender(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule_rerender();
        }
    }

    pub fn has_pending_work(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.state.borrow().wip_root.is_some())
            .unwrap_or(false)
    }
}
