use fiber_core::{host, Component, Element, Event, MemoryHost, NodeId, Reconciler, RuntimeHandle};
use fiber_runtime_std::{IdleDriver, StdRuntime};

/// Everything the input listener needs to render the next tree.
#[derive(Clone)]
struct Greeting {
    runtime: RuntimeHandle,
    container: NodeId,
    clicker: Component,
}

impl Greeting {
    /// Text field mirrored into a heading. Every keystroke renders a new
    /// tree through the runtime handle captured by the input listener.
    fn view(&self, value: &str) -> Element {
        let app = self.clone();
        let on_input = move |event: &Event| {
            let next = event
                .value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            app.runtime.render(app.view(&next), app.container);
        };

        host("div")
            .child(host("input").attr("value", value).on("onInput", on_input))
            .child(host("h2").child("Hello ").child(value))
            .child(self.clicker.element())
            .build()
    }
}

fn clicker() -> Component {
    Component::new("Clicker", |_props, scope| {
        let (clicks, set_clicks) = scope.use_state(0_i64);
        host("button")
            .on("onClick", move |_| set_clicks.set(|c| c + 1))
            .child("Clicked ")
            .child(clicks)
            .build()
    })
}

fn main() {
    env_logger::init();

    println!("=== fiber-rs input demo ===");
    println!("Typing into the input re-renders the heading; clicking bumps a counter.");
    println!();

    let runtime = StdRuntime::new();
    let mut mem = MemoryHost::new();
    let container = mem.create_container("root");
    let mut reconciler = Reconciler::with_runtime(mem, runtime.runtime());
    let driver = IdleDriver::default();

    let app = Greeting {
        runtime: runtime.runtime_handle(),
        container,
        clicker: clicker(),
    };
    reconciler.render(app.view("World"), container);
    if let Err(err) = driver.run_until_idle(&mut reconciler) {
        log::error!("initial render failed: {err}");
        return;
    }
    println!("{}", reconciler.host().dump_tree(Some(container)));

    let (Some(input), Some(button)) = (
        reconciler.host().find_by_tag(container, "input"),
        reconciler.host().find_by_tag(container, "button"),
    ) else {
        log::error!("demo tree is missing its input or button");
        return;
    };

    for typed in ["W", "Wo", "Wor", "Worl", "World!"] {
        let event = Event::with_value("input", typed);
        if let Err(err) = reconciler.host().dispatch_event(input, &event) {
            log::error!("dispatching input failed: {err}");
            return;
        }
        match driver.run_until_idle(&mut reconciler) {
            Ok(slices) => println!(
                "typed {typed:?} -> {:?} ({slices} slices)",
                reconciler.host().text_content(container)
            ),
            Err(err) => {
                log::error!("re-render failed: {err}");
                return;
            }
        }
    }

    for _ in 0..3 {
        if let Err(err) = reconciler.host().dispatch_event(button, &Event::new("click")) {
            log::error!("dispatching click failed: {err}");
            return;
        }
        if let Err(err) = driver.run_until_idle(&mut reconciler) {
            log::error!("re-render failed: {err}");
            return;
        }
    }

    println!();
    println!("{}", reconciler.host().dump_tree(Some(container)));
    println!("{}", reconciler.dump_units());
}
