use crate::element::{Props, CHILDREN, EVENT_PREFIX};
use crate::host::{Host, HostError, NodeId};

fn is_event(key: &str) -> bool {
    key.starts_with(EVENT_PREFIX)
}

fn is_property(key: &str) -> bool {
    key != CHILDREN && !is_event(key)
}

/// `"onInput"` -> `"input"`.
pub fn event_name(key: &str) -> String {
    key[EVENT_PREFIX.len()..].to_lowercase()
}

/// Brings `node` from `prev` to `next`.
///
/// Runs in four fixed steps: drop stale listeners, clear removed
/// attributes, write new or changed attributes, add new or changed
/// listeners. Keys whose values compare equal cause no host call.
pub fn apply_prop_diff<H: Host + ?Sized>(
    host: &mut H,
    node: NodeId,
    prev: &Props,
    next: &Props,
) -> Result<(), HostError> {
    for (key, value) in prev.attributes().filter(|(key, _)| is_event(key)) {
        if next.get(key) == Some(value) {
            continue;
        }
        if let Some(handler) = value.as_handler() {
            host.remove_event_listener(node, &event_name(key), handler)?;
        }
    }

    for (key, _) in prev.attributes().filter(|(key, _)| is_property(key)) {
        if !next.contains_key(key) {
            host.clear_attribute(node, key)?;
        }
    }

    for (key, value) in next.attributes().filter(|(key, _)| is_property(key)) {
        if prev.get(key) != Some(value) {
            host.set_attribute(node, key, value)?;
        }
    }

    for (key, value) in next.attributes().filter(|(key, _)| is_event(key)) {
        if prev.get(key) == Some(value) {
            continue;
        }
        if let Some(handler) = value.as_handler() {
            host.add_event_listener(node, &event_name(key), handler)?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/props_tests.rs"]
mod tests;
