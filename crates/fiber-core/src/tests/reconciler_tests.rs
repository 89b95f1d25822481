use std::cell::RefCell;
use std::rc::Rc;

use crate::testing::{ManualScheduler, ReconcilerTestRule, UnlimitedDeadline};
use crate::{
    host, text, CommitSummary, Component, Element, Event, EventHandler, Host, HostError, HostOp,
    MemoryHost, NodeId, PropValue, Reconciler, SchedulerPhase,
};

fn greeting(value: &str, on_input: &EventHandler) -> Element {
    host("div")
        .child(
            host("input")
                .attr("value", value)
                .attr("onInput", on_input.clone()),
        )
        .child(host("h2").child("Hello ").child(value))
        .build()
}

fn noop_handler() -> EventHandler {
    EventHandler::new(|_| {})
}

#[test]
fn initial_render_mounts_host_tree() {
    let mut rule = ReconcilerTestRule::new();
    let report = rule.render(greeting("World", &noop_handler())).unwrap();

    assert_eq!(
        report.commit,
        Some(CommitSummary {
            placements: 5,
            updates: 0,
            deletions: 0,
        })
    );
    assert_eq!(
        rule.dump(),
        "<root>\n  <div>\n    <input value=\"World\" @input>\n    <h2>\n      \"Hello \"\n      \"World\"\n"
    );
    assert_eq!(rule.text(), "Hello World");
}

#[test]
fn identical_rerender_produces_only_updates_and_no_host_calls() {
    let handler = noop_handler();
    let mut rule = ReconcilerTestRule::new();
    rule.render(greeting("World", &handler)).unwrap();
    rule.host_mut().clear_ops();

    let report = rule.render(greeting("World", &handler)).unwrap();

    assert_eq!(
        report.commit,
        Some(CommitSummary {
            placements: 0,
            updates: 5,
            deletions: 0,
        })
    );
    assert!(rule.host().ops().is_empty(), "{:?}", rule.host().ops());
}

#[test]
fn changed_text_is_a_single_attribute_write() {
    let mut rule = ReconcilerTestRule::new();
    rule.render(host("h2").child("Hello ").child("World").build())
        .unwrap();
    let text_node = rule.host().children(rule.host().children(rule.container())[0])[1];
    rule.host_mut().clear_ops();

    rule.render(host("h2").child("Hello ").child("!").build())
        .unwrap();

    assert_eq!(
        rule.host().ops(),
        &[HostOp::SetAttribute {
            id: text_node,
            name: "value".to_string(),
            value: "!".into(),
        }]
    );
    assert_eq!(rule.text(), "Hello !");
}

#[test]
fn reordering_without_keys_replaces_both_children() {
    let mut rule = ReconcilerTestRule::new();
    rule.render(
        host("div")
            .child(host("section"))
            .child(host("aside"))
            .build(),
    )
    .unwrap();
    rule.host_mut().clear_ops();

    let report = rule
        .render(
            host("div")
                .child(host("aside"))
                .child(host("section"))
                .build(),
        )
        .unwrap();

    assert_eq!(
        report.commit,
        Some(CommitSummary {
            placements: 2,
            updates: 1,
            deletions: 2,
        })
    );
    let removals = rule
        .host()
        .ops()
        .iter()
        .filter(|op| matches!(op, HostOp::RemoveChild { .. }))
        .count();
    let appends = rule
        .host()
        .ops()
        .iter()
        .filter(|op| matches!(op, HostOp::AppendChild { .. }))
        .count();
    assert_eq!((removals, appends), (2, 2));
    assert_eq!(rule.dump(), "<root>\n  <div>\n    <aside>\n    <section>\n");
}

#[test]
fn changing_a_tag_swaps_the_host_node() {
    let mut rule = ReconcilerTestRule::new();
    rule.render(host("div").child(host("h1").child("title")).build())
        .unwrap();
    let div = rule.host().children(rule.container())[0];
    let old_h1 = rule.host().children(div)[0];
    rule.host_mut().clear_ops();

    rule.render(host("div").child(host("h2").child("title")).build())
        .unwrap();

    let new_h2 = rule.host().children(div)[0];
    assert_ne!(old_h1, new_h2);
    assert!(rule.host().ops().contains(&HostOp::RemoveChild {
        parent: div,
        child: old_h1,
    }));
    assert_eq!(rule.dump(), "<root>\n  <div>\n    <h2>\n      \"title\"\n");
}

#[test]
fn growing_and_shrinking_lists() {
    let list = |items: &[&str]| {
        host("ul")
            .children(items.iter().map(|item| host("li").child(*item)))
            .build()
    };
    let mut rule = ReconcilerTestRule::new();
    rule.render(list(&["a"])).unwrap();

    let grown = rule.render(list(&["a", "b", "c"])).unwrap();
    assert_eq!(
        grown.commit,
        Some(CommitSummary {
            placements: 4,
            updates: 3,
            deletions: 0,
        })
    );
    assert_eq!(rule.text(), "abc");

    let shrunk = rule.render(list(&["a"])).unwrap();
    assert_eq!(
        shrunk.commit,
        Some(CommitSummary {
            placements: 0,
            updates: 3,
            deletions: 2,
        })
    );
    assert_eq!(rule.dump(), "<root>\n  <ul>\n    <li>\n      \"a\"\n");
}

#[test]
fn components_are_pierced_when_mounting() {
    let title = Component::new("Title", |props, _scope| {
        let label = props
            .get("label")
            .map(ToString::to_string)
            .unwrap_or_default();
        host("h1").child(label).build()
    });
    let mut rule = ReconcilerTestRule::new();
    rule.render(
        host("main")
            .child(title.element().attr("label", "first"))
            .child(title.element().attr("label", "second"))
            .build(),
    )
    .unwrap();

    assert_eq!(
        rule.dump(),
        "<root>\n  <main>\n    <h1>\n      \"first\"\n    <h1>\n      \"second\"\n"
    );
}

#[test]
fn deleting_a_component_removes_its_host_child() {
    let wrapper = Component::new("Wrapper", |_props, _scope| {
        host("span").child("inside").build()
    });
    let mut rule = ReconcilerTestRule::new();
    rule.render(
        host("div")
            .child(host("p").child("para"))
            .child(wrapper.element())
            .build(),
    )
    .unwrap();
    let div = rule.host().children(rule.container())[0];
    let span = rule.host().children(div)[1];
    rule.host_mut().clear_ops();

    let report = rule
        .render(host("div").child(host("p").child("para")).build())
        .unwrap();

    assert_eq!(report.commit.map(|c| c.deletions), Some(1));
    assert_eq!(
        rule.host().ops(),
        &[HostOp::RemoveChild {
            parent: div,
            child: span,
        }]
    );
    assert_eq!(rule.dump(), "<root>\n  <div>\n    <p>\n      \"para\"\n");
}

#[test]
fn yielding_mid_tree_leaves_host_untouched() {
    let mut rule = ReconcilerTestRule::new();
    rule.render(host("ul").child(host("li").child("one")).build())
        .unwrap();
    let before = rule.dump();
    rule.host_mut().clear_ops();

    rule.schedule(
        host("ul")
            .child(host("li").child("uno"))
            .child(host("li").child("dos"))
            .build(),
    );
    let report = rule.step(2).unwrap();

    assert_eq!(report.units_performed, 2);
    assert!(!report.committed());
    assert!(report.has_pending_work);
    assert_eq!(rule.reconciler().phase(), SchedulerPhase::Running);
    assert_eq!(rule.dump(), before);
    assert!(rule
        .host()
        .ops()
        .iter()
        .all(|op| !matches!(op, HostOp::AppendChild { .. } | HostOp::RemoveChild { .. })));
    assert!(!rule
        .host()
        .ops()
        .iter()
        .any(|op| matches!(op, HostOp::SetAttribute { value, .. } if value.as_str() == Some("uno"))));

    rule.run_until_idle().unwrap();
    assert_eq!(rule.text(), "unodos");
}

#[test]
fn first_render_is_invisible_until_commit() {
    let mut rule = ReconcilerTestRule::new();
    rule.schedule(greeting("World", &noop_handler()));

    let mut slices = 0;
    while rule.reconciler().has_pending_work() {
        let report = rule.step(1).unwrap();
        slices += 1;
        if !report.committed() {
            assert_eq!(rule.dump(), "<root>\n");
        }
    }

    assert_eq!(slices, 6);
    assert_eq!(rule.text(), "Hello World");
}

#[test]
fn newer_render_replaces_an_unfinished_one() {
    let mut rule = ReconcilerTestRule::new();
    rule.schedule(host("div").child(host("p").child("stale")).build());
    rule.step(2).unwrap();

    rule.schedule(host("div").child(host("h3").child("fresh")).build());
    assert_eq!(rule.reconciler().phase(), SchedulerPhase::Scheduled);
    rule.run_until_idle().unwrap();

    assert_eq!(rule.dump(), "<root>\n  <div>\n    <h3>\n      \"fresh\"\n");
}

#[test]
fn scheduler_phases_follow_the_pass() {
    let mut rule = ReconcilerTestRule::new();
    assert_eq!(rule.reconciler().phase(), SchedulerPhase::Idle);

    rule.schedule(host("div").child(host("p")).build());
    assert_eq!(rule.reconciler().phase(), SchedulerPhase::Scheduled);

    rule.step(1).unwrap();
    assert_eq!(rule.reconciler().phase(), SchedulerPhase::Running);

    rule.run_until_idle().unwrap();
    assert_eq!(rule.reconciler().phase(), SchedulerPhase::Idle);
}

#[test]
fn every_slice_requests_another_idle_callback() {
    let mut rule = ReconcilerTestRule::new();
    rule.schedule(host("div").build());
    assert_eq!(rule.scheduler().requests(), 1);

    rule.run_until_idle().unwrap();
    assert_eq!(rule.scheduler().requests(), 2);

    let report = rule.reconciler().work_loop(&UnlimitedDeadline).unwrap();
    assert_eq!(report.units_performed, 0);
    assert!(!report.committed());
    assert_eq!(rule.scheduler().requests(), 3);
}

#[test]
fn committed_generations_are_reclaimed() {
    let mut rule = ReconcilerTestRule::new();
    let tree = || host("div").child(host("h1").child("Hello")).build();

    rule.render(tree()).unwrap();
    let first = rule.reconciler().inspect_units(|units, _| units.len());
    rule.render(tree()).unwrap();
    rule.render(tree()).unwrap();
    let third = rule.reconciler().inspect_units(|units, _| units.len());

    assert_eq!(first, 4);
    assert_eq!(third, 4);
    assert_eq!(
        rule.reconciler().dump_units(),
        "#root None\n  div Update\n    h1 Update\n      \"Hello\" Update\n"
    );
}

#[test]
fn replacing_a_handler_swaps_the_listener() {
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let button = |label: &'static str| {
        let clicks = clicks.clone();
        host("button")
            .on("onClick", move |_| clicks.borrow_mut().push(label))
            .build()
    };
    let mut rule = ReconcilerTestRule::new();
    rule.render(button("first")).unwrap();
    rule.host_mut().clear_ops();

    rule.render(button("second")).unwrap();
    let node = rule.host().children(rule.container())[0];
    assert_eq!(
        rule.host().ops(),
        &[
            HostOp::RemoveListener {
                id: node,
                event: "click".to_string(),
            },
            HostOp::AddListener {
                id: node,
                event: "click".to_string(),
            },
        ]
    );

    let ran = rule
        .host()
        .dispatch_event(node, &Event::new("click"))
        .unwrap();
    assert_eq!(ran, 1);
    assert_eq!(*clicks.borrow(), vec!["second"]);
}

#[test]
fn host_failures_propagate_out_of_the_work_loop() {
    let scheduler = Rc::new(ManualScheduler::default());
    let mut reconciler = Reconciler::with_scheduler(MemoryHost::new(), scheduler.clone());
    reconciler.render(text("orphan"), 999);

    let err = reconciler.work_loop(&UnlimitedDeadline).unwrap_err();

    assert_eq!(err, HostError::MissingNode { id: 999 });
    assert_eq!(scheduler.requests(), 2);
    assert!(!reconciler.has_pending_work());
    assert_eq!(reconciler.phase(), SchedulerPhase::Idle);
}

/// Memory host that refuses the next append under one parent.
struct FlakyHost {
    inner: MemoryHost,
    refuse_append_to: Option<NodeId>,
}

impl Host for FlakyHost {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        self.inner.create_node(tag)
    }

    fn create_text_node(&mut self) -> Result<NodeId, HostError> {
        self.inner.create_text_node()
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        self.inner.set_attribute(node, name, value)
    }

    fn clear_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.inner.clear_attribute(node, name)
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.inner.add_event_listener(node, event, handler)
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.inner.remove_event_listener(node, event, handler)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        if self.refuse_append_to == Some(parent) {
            self.refuse_append_to = None;
            return Err(HostError::MissingNode { id: parent });
        }
        self.inner.append_child(parent, child)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.inner.remove_child(parent, child)
    }
}

#[test]
fn failed_commit_is_dropped_not_replayed() {
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let view = |label: &'static str, extra: bool| {
        let clicks = clicks.clone();
        let mut div = host("div").child(
            host("button").on("onClick", move |_| clicks.borrow_mut().push(label)),
        );
        if extra {
            div = div.child(host("p").child("added"));
        }
        div.build()
    };

    let mut inner = MemoryHost::new();
    let container = inner.create_container("root");
    let mut reconciler = Reconciler::new(FlakyHost {
        inner,
        refuse_append_to: None,
    });
    reconciler.render(view("first", false), container);
    reconciler.work_loop(&UnlimitedDeadline).unwrap();
    let div = reconciler.host().inner.children(container)[0];
    let button = reconciler.host().inner.children(div)[0];
    reconciler.host_mut().refuse_append_to = Some(div);
    reconciler.host_mut().inner.clear_ops();

    reconciler.render(view("second", true), container);
    let err = reconciler.work_loop(&UnlimitedDeadline).unwrap_err();
    assert_eq!(err, HostError::MissingNode { id: div });
    assert!(!reconciler.has_pending_work());
    let ops_after_failure = reconciler.host().inner.ops().len();

    let report = reconciler.work_loop(&UnlimitedDeadline).unwrap();
    assert!(!report.committed());
    assert_eq!(report.units_performed, 0);
    assert_eq!(reconciler.host().inner.ops().len(), ops_after_failure);

    let mem = &reconciler.host().inner;
    assert_eq!(mem.node(button).unwrap().listener_count("click"), 1);
    assert_eq!(mem.dispatch_event(button, &Event::new("click")).unwrap(), 1);
    assert_eq!(*clicks.borrow(), vec!["second"]);
}

#[test]
fn removed_nodes_are_released() {
    let mut rule = ReconcilerTestRule::new();
    for round in 0..50 {
        let tag = if round % 2 == 0 { "div" } else { "span" };
        rule.render(host(tag).child("swap").build()).unwrap();
    }

    // container, element, text
    assert_eq!(rule.host().len(), 3);
    let element = rule.host().children(rule.container())[0];
    assert_eq!(rule.host().node(element).unwrap().tag(), "span");
}

#[test]
fn removing_an_unknown_listener_is_not_logged() {
    let mut mem = MemoryHost::new();
    let node = mem.create_node("button").unwrap();
    mem.clear_ops();

    mem.remove_event_listener(node, "click", &noop_handler())
        .unwrap();

    assert!(mem.ops().is_empty());
}
