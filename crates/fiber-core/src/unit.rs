//! Units: the mutable records mirroring elements across generations.
//!
//! Units live in a slab and refer to each other by [`UnitId`]. Only the
//! `child`/`sibling` edges describe the shape of a generation; `parent` and
//! `alternate` are back-references.

use std::fmt;
use std::fmt::Write as _;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use slab::Slab;

use crate::element::{Component, Element, ElementType, Props, TEXT_ELEMENT, TEXT_VALUE};
use crate::hooks::HookCell;
use crate::host::NodeId;

pub type UnitId = usize;

/// Host mutation a unit asks the commit phase for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Effect {
    #[default]
    None,
    Placement,
    Update,
    Deletion,
}

#[derive(Clone, Debug)]
pub enum UnitKind {
    /// Mount point of a render pass.
    Root,
    Host(Rc<str>),
    Component(Component),
}

impl UnitKind {
    fn from_type(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(tag) => UnitKind::Host(Rc::clone(tag)),
            ElementType::Component(component) => UnitKind::Component(component.clone()),
        }
    }

    /// Type equality used for positional matching.
    pub fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (UnitKind::Host(tag), ElementType::Host(other)) => tag == other,
            (UnitKind::Component(component), ElementType::Component(other)) => component == other,
            _ => false,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            UnitKind::Root => "#root",
            UnitKind::Host(tag) => tag,
            UnitKind::Component(component) => component.name(),
        }
    }
}

pub struct Unit {
    pub(crate) kind: UnitKind,
    pub(crate) props: Rc<Props>,
    pub(crate) host_node: Option<NodeId>,
    pub(crate) parent: Option<UnitId>,
    pub(crate) child: Option<UnitId>,
    pub(crate) sibling: Option<UnitId>,
    pub(crate) alternate: Option<UnitId>,
    pub(crate) effect: Effect,
    pub(crate) hooks: Vec<HookCell>,
    pub(crate) pass: u64,
}

impl Unit {
    pub(crate) fn root(
        container: NodeId,
        props: Rc<Props>,
        alternate: Option<UnitId>,
        pass: u64,
    ) -> Self {
        Self {
            kind: UnitKind::Root,
            props,
            host_node: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: Effect::None,
            hooks: Vec::new(),
            pass,
        }
    }

    /// Fresh unit for a slot with no reusable predecessor.
    pub(crate) fn placement(element: &Element, parent: UnitId, pass: u64) -> Self {
        Self {
            kind: UnitKind::from_type(element.ty()),
            props: element.shared_props(),
            host_node: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: Effect::Placement,
            hooks: Vec::new(),
            pass,
        }
    }

    /// Next-generation unit reusing `old`'s host node.
    pub(crate) fn update(
        old: &Unit,
        old_id: UnitId,
        element: &Element,
        parent: UnitId,
        pass: u64,
    ) -> Self {
        Self {
            kind: old.kind.clone(),
            props: element.shared_props(),
            host_node: old.host_node,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(old_id),
            effect: Effect::Update,
            hooks: Vec::new(),
            pass,
        }
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn host_node(&self) -> Option<NodeId> {
        self.host_node
    }

    pub fn parent(&self) -> Option<UnitId> {
        self.parent
    }

    pub fn child(&self) -> Option<UnitId> {
        self.child
    }

    pub fn sibling(&self) -> Option<UnitId> {
        self.sibling
    }

    pub fn alternate(&self) -> Option<UnitId> {
        self.alternate
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    fn is_text(&self) -> bool {
        matches!(&self.kind, UnitKind::Host(tag) if &**tag == TEXT_ELEMENT)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("kind", &self.kind.label())
            .field("host_node", &self.host_node)
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("alternate", &self.alternate)
            .field("effect", &self.effect)
            .field("hooks", &self.hooks.len())
            .field("pass", &self.pass)
            .finish()
    }
}

/// Arena holding every live unit of the current and in-progress generations.
#[derive(Default)]
pub struct UnitTree {
    units: Slab<Unit>,
}

impl UnitTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, unit: Unit) -> UnitId {
        self.units.insert(unit)
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Children of `id` in sibling order.
    pub fn children(&self, id: UnitId) -> Children<'_> {
        Children {
            tree: self,
            next: self.units.get(id).and_then(|unit| unit.child),
        }
    }

    /// Pre-order successor of `id` within the generation rooted at `root`:
    /// first child, else the nearest sibling found walking up, else `None`
    /// once the walk gets back to `root`.
    pub fn next_in_preorder(&self, id: UnitId, root: UnitId) -> Option<UnitId> {
        if let Some(child) = self[id].child {
            return Some(child);
        }
        let mut cursor = id;
        loop {
            if cursor == root {
                return None;
            }
            let unit = &self[cursor];
            if let Some(sibling) = unit.sibling {
                return Some(sibling);
            }
            cursor = unit.parent?;
        }
    }

    /// Host node of the nearest ancestor that owns one. Components have no
    /// host presence, so the walk passes straight through them.
    pub fn host_parent(&self, id: UnitId) -> Option<NodeId> {
        let mut cursor = self[id].parent;
        while let Some(parent) = cursor {
            let unit = &self[parent];
            if unit.host_node.is_some() {
                return unit.host_node;
            }
            cursor = unit.parent;
        }
        None
    }

    /// Host node standing in for `id`: its own, or the first one found
    /// following first children downwards.
    pub fn nearest_host_node(&self, id: UnitId) -> Option<NodeId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let unit = &self[current];
            if unit.host_node.is_some() {
                return unit.host_node;
            }
            cursor = unit.child;
        }
        None
    }

    /// Drops every unit not created by `pass` and cuts the survivors'
    /// alternate links, which would otherwise point at freed slots.
    pub(crate) fn retain_pass(&mut self, pass: u64) -> usize {
        let before = self.units.len();
        self.units.retain(|_, unit| unit.pass == pass);
        for (_, unit) in self.units.iter_mut() {
            unit.alternate = None;
        }
        before - self.units.len()
    }

    /// Pre-order listing of the generation rooted at `root` with effects,
    /// one unit per line.
    pub fn dump(&self, root: UnitId) -> String {
        let mut output = String::new();
        self.dump_unit(&mut output, root, 0);
        output
    }

    fn dump_unit(&self, output: &mut String, id: UnitId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(unit) = self.units.get(id) else {
            let _ = writeln!(output, "{indent}#{id} (freed)");
            return;
        };
        if unit.is_text() {
            let value = unit
                .props
                .get(TEXT_VALUE)
                .map(ToString::to_string)
                .unwrap_or_default();
            let _ = writeln!(output, "{indent}{value:?} {:?}", unit.effect);
        } else {
            let _ = writeln!(output, "{indent}{} {:?}", unit.kind.label(), unit.effect);
        }
        for child in self.children(id) {
            self.dump_unit(output, child, depth + 1);
        }
    }
}

impl Index<UnitId> for UnitTree {
    type Output = Unit;

    fn index(&self, id: UnitId) -> &Unit {
        &self.units[id]
    }
}

impl IndexMut<UnitId> for UnitTree {
    fn index_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id]
    }
}

pub struct Children<'a> {
    tree: &'a UnitTree,
    next: Option<UnitId>,
}

impl Iterator for Children<'_> {
    type Item = UnitId;

    fn next(&mut self) -> Option<UnitId> {
        let current = self.next?;
        self.next = self.tree.units.get(current).and_then(|unit| unit.sibling);
        Some(current)
    }
}
