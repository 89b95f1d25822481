#![doc = r"Core reconciliation engine for the fiber-rs experiment."]

pub mod collections;
pub mod commit;
pub mod element;
pub mod hooks;
pub mod host;
pub mod platform;
pub mod props;
mod reconcile;
pub mod runtime;
pub mod testing;
pub mod unit;
pub mod work_loop;

pub use commit::CommitSummary;
pub use element::{
    create_element, host, text, Child, Component, Element, ElementBuilder, ElementType, Event,
    EventHandler, PropValue, Props,
};
pub use hooks::{RenderScope, StateSetter};
pub use host::{Host, HostError, HostOp, MemoryHost, MemoryNode, NodeId};
pub use platform::{Deadline, IdleScheduler, NoopScheduler};
pub use props::apply_prop_diff;
pub use runtime::{Runtime, RuntimeHandle, SchedulerPhase};
pub use unit::{Effect, Unit, UnitId, UnitKind, UnitTree};
pub use work_loop::{Reconciler, WorkLoopOptions, WorkReport};

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod reconciler_tests;

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;
