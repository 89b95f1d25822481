//! Host tree abstraction and an in-memory implementation.

use std::fmt::Write as _;
use std::rc::Rc;

use thiserror::Error;

use crate::collections::map::HashMap;
use crate::element::{Event, EventHandler, PropValue, TEXT_ELEMENT, TEXT_VALUE};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host node {id} missing")]
    MissingNode { id: NodeId },
    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// Mutation primitives the engine needs from the host render tree.
///
/// Node creation and attribute writes on detached nodes happen while units
/// are expanded; everything that touches a mounted node happens during
/// commit.
pub trait Host {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError>;
    fn create_text_node(&mut self) -> Result<NodeId, HostError>;
    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError>;
    /// Resets an attribute to its empty value.
    fn clear_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;
    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;
}

/// Every call a [`MemoryHost`] received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Create { id: NodeId, tag: String },
    SetAttribute { id: NodeId, name: String, value: PropValue },
    ClearAttribute { id: NodeId, name: String },
    AddListener { id: NodeId, event: String },
    RemoveListener { id: NodeId, event: String },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
}

impl HostOp {
    /// Whether the operation can change what a mounted tree looks like.
    /// Creating a detached node cannot.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, HostOp::Create { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryNode {
    tag: Rc<str>,
    attributes: HashMap<String, PropValue>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl MemoryNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: Rc::from(tag),
            attributes: HashMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_text(&self) -> bool {
        &*self.tag == TEXT_ELEMENT
    }

    pub fn attribute(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }
}

/// Host tree kept entirely in memory, recording each call it receives.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mount point. Not recorded in the operation log.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode::new(tag)));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::MissingNode { id })
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(MemoryNode::children).unwrap_or(&[])
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn mutation_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_mutation()).count()
    }

    /// Concatenated text of every text node under `id`, depth first.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.is_text() {
            if let Some(value) = node.attribute(TEXT_VALUE) {
                let _ = write!(output, "{value}");
            }
        }
        for &child in &node.children {
            self.collect_text(child, output);
        }
    }

    /// Invokes every listener registered on `id` for `event`. Returns how
    /// many listeners ran.
    pub fn dispatch_event(&self, id: NodeId, event: &Event) -> Result<usize, HostError> {
        let node = self.node(id).ok_or(HostError::MissingNode { id })?;
        let handlers: Vec<EventHandler> = node
            .listeners
            .iter()
            .filter(|(name, _)| *name == event.name)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler.call(event);
        }
        Ok(handlers.len())
    }

    /// Finds the first node under `root` (inclusive, depth first) with the
    /// given tag.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        let node = self.node(root)?;
        if node.tag() == tag {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_tag(child, tag))
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        if node.is_text() {
            let value = node
                .attribute(TEXT_VALUE)
                .map(ToString::to_string)
                .unwrap_or_default();
            let _ = writeln!(output, "{indent}{value:?}");
            return;
        }
        let mut line = format!("{indent}<{}", node.tag);
        let mut attributes: Vec<_> = node.attributes.iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in attributes {
            let _ = write!(line, " {name}={:?}", value.to_string());
        }
        let mut events: Vec<_> = node.listeners.iter().map(|(name, _)| name.as_str()).collect();
        events.sort_unstable();
        for event in events {
            let _ = write!(line, " @{event}");
        }
        line.push('>');
        output.push_str(&line);
        output.push('\n');
        for &child in &node.children {
            self.dump_node(output, child, depth + 1);
        }
    }

    /// Releases `id` and everything below it. Slots are not reused.
    fn free_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.free_subtree(child);
        }
    }

    fn push_node(&mut self, tag: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode::new(tag)));
        self.ops.push(HostOp::Create {
            id,
            tag: tag.to_string(),
        });
        id
    }
}

impl Host for MemoryHost {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        Ok(self.push_node(tag))
    }

    fn create_text_node(&mut self) -> Result<NodeId, HostError> {
        Ok(self.push_node(TEXT_ELEMENT))
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        self.node_mut(node)?
            .attributes
            .insert(name.to_string(), value.clone());
        self.ops.push(HostOp::SetAttribute {
            id: node,
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.node_mut(node)?.attributes.remove(name);
        self.ops.push(HostOp::ClearAttribute {
            id: node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.node_mut(node)?
            .listeners
            .push((event.to_string(), handler.clone()));
        self.ops.push(HostOp::AddListener {
            id: node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let listeners = &mut self.node_mut(node)?.listeners;
        let Some(index) = listeners
            .iter()
            .position(|(name, existing)| name == event && existing == handler)
        else {
            return Ok(());
        };
        listeners.remove(index);
        self.ops.push(HostOp::RemoveListener {
            id: node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.node_mut(parent)?;
        let previous = self.node_mut(child)?.parent.take();
        if let Some(previous) = previous {
            self.node_mut(previous)?.children.retain(|&id| id != child);
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.ops.push(HostOp::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        let children = &mut self.node_mut(parent)?.children;
        let index = children
            .iter()
            .position(|&id| id == child)
            .ok_or(HostError::NotAChild { parent, child })?;
        children.remove(index);
        self.free_subtree(child);
        self.ops.push(HostOp::RemoveChild { parent, child });
        Ok(())
    }
}
