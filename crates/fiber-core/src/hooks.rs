//! Per-unit state cells and the scope components render in.
//!
//! Cells are matched across generations by call position only: the n-th
//! `use_state` call of a component body reads the n-th cell of its
//! alternate. Calling hooks conditionally, or in a different order between
//! renders, breaks that pairing. A mismatched cell type is logged and
//! treated as a fresh cell, nothing more is checked.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::RuntimeHandle;
use crate::unit::UnitId;

type Action<T> = Rc<dyn Fn(&T) -> T>;
type ActionQueue<T> = RefCell<Vec<Action<T>>>;

/// One `use_state` slot. The queue collects actions for the next
/// generation; it is read, never drained, so a render pass that gets
/// abandoned can be restarted from the same committed tree.
#[derive(Clone)]
pub(crate) struct HookCell {
    state: Rc<dyn Any>,
    queue: Rc<dyn Any>,
}

impl HookCell {
    fn typed<T: Clone + 'static>(&self) -> Option<(T, Rc<ActionQueue<T>>)> {
        let state = self.state.downcast_ref::<T>()?.clone();
        let queue = Rc::clone(&self.queue).downcast::<ActionQueue<T>>().ok()?;
        Some((state, queue))
    }
}

/// Render context handed to a component while its unit is expanded.
pub struct RenderScope {
    unit: UnitId,
    cursor: usize,
    previous: Vec<HookCell>,
    hooks: Vec<HookCell>,
    runtime: RuntimeHandle,
}

impl RenderScope {
    pub(crate) fn new(unit: UnitId, previous: Vec<HookCell>, runtime: RuntimeHandle) -> Self {
        Self {
            unit,
            cursor: 0,
            previous,
            hooks: Vec::new(),
            runtime,
        }
    }

    /// Unit being expanded.
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    /// Returns the current value of the next state cell and a setter for it.
    ///
    /// On the first render the value is `initial`. Afterwards it is the
    /// previous generation's value with every queued action applied in
    /// order, each action seeing the result of the one before.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        let index = self.cursor;
        self.cursor += 1;

        let seeded = match self.previous.get(index) {
            Some(cell) => {
                let typed = cell.typed::<T>();
                if typed.is_none() {
                    log::warn!(
                        "hook {index} of unit {} changed type between renders; resetting it",
                        self.unit
                    );
                }
                typed
            }
            None => None,
        };

        let state = match seeded {
            Some((state, queue)) => {
                let actions: Vec<Action<T>> = queue.borrow().clone();
                actions.iter().fold(state, |acc, action| action(&acc))
            }
            None => initial,
        };

        let queue: Rc<ActionQueue<T>> = Rc::new(RefCell::new(Vec::new()));
        self.hooks.push(HookCell {
            state: Rc::new(state.clone()),
            queue: queue.clone(),
        });

        let setter = StateSetter {
            queue,
            runtime: self.runtime.clone(),
        };
        (state, setter)
    }

    /// Like [`use_state`](Self::use_state), building the initial value only
    /// when there is no previous cell.
    pub fn use_state_with<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        if let Some((state, _)) = self.previous.get(self.cursor).and_then(HookCell::typed::<T>) {
            return self.use_state(state);
        }
        self.use_state(init())
    }

    pub(crate) fn into_hooks(self) -> Vec<HookCell> {
        self.hooks
    }
}

/// Queues state updates for the next generation.
///
/// Every call schedules a full re-render from the committed root; calls are
/// not batched. A setter whose runtime has been dropped only queues.
pub struct StateSetter<T> {
    queue: Rc<ActionQueue<T>>,
    runtime: RuntimeHandle,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: 'static> StateSetter<T> {
    pub fn set(&self, action: impl Fn(&T) -> T + 'static) {
        self.queue.borrow_mut().push(Rc::new(action));
        self.runtime.schedule_rerender();
    }

    pub fn set_value(&self, value: T)
    where
        T: Clone,
    {
        self.set(move |_| value.clone());
    }

    /// Actions queued on this cell so far.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}
