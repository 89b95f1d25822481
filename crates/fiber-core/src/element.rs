//! Declarative element descriptions.
//!
//! Elements are rebuilt from scratch on every render and never mutated
//! afterwards. The reconciler only reads them; everything that survives
//! between renders lives on units.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hooks::RenderScope;

/// Host tag used for text leaves.
pub const TEXT_ELEMENT: &str = "TEXT";
/// Attribute carrying the text of a [`TEXT_ELEMENT`] node.
pub const TEXT_VALUE: &str = "value";
/// Reserved key for the children entry of a prop set.
pub const CHILDREN: &str = "children";
/// Prefix marking a prop key as an event binding.
pub const EVENT_PREFIX: &str = "on";

/// Payload handed to event listeners by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub value: Option<PropValue>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Shared event callback. Two handlers are equal only when they are the
/// same allocation, so a closure rebuilt on every render always counts as
/// changed.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", self.addr())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => f.write_str(value),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Handler(_) => f.write_str("<handler>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

/// Attribute map plus the reserved children entry.
#[derive(Clone, Debug, Default)]
pub struct Props {
    attributes: IndexMap<String, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(children: Vec<Element>) -> Self {
        Self {
            attributes: IndexMap::new(),
            children,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.attributes.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Attributes in insertion order. Never yields the children entry.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }
}

type RenderFn = dyn Fn(&Props, &mut RenderScope) -> Element;

/// A function component. Identity is the render function allocation, so
/// clones of one `Component` reconcile as the same type while two
/// components built from identical closures do not.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new(
        name: &'static str,
        render: impl Fn(&Props, &mut RenderScope) -> Element + 'static,
    ) -> Self {
        Self {
            name,
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn render(&self, props: &Props, scope: &mut RenderScope) -> Element {
        (self.render)(props, scope)
    }

    /// Starts an element builder for this component.
    pub fn element(&self) -> ElementBuilder {
        ElementBuilder::new(ElementType::Component(self.clone()))
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.render) as *const ()
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("render", &self.addr())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementType {
    Host(Rc<str>),
    Component(Component),
}

impl ElementType {
    pub fn host(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }

    pub fn is_component(&self) -> bool {
        matches!(self, ElementType::Component(_))
    }

    pub fn label(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Component(component) => component.name(),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::host(tag)
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

impl From<&Component> for ElementType {
    fn from(component: &Component) -> Self {
        ElementType::Component(component.clone())
    }
}

#[derive(Clone, Debug)]
pub struct Element {
    ty: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn new(ty: ElementType, props: Props) -> Self {
        Self {
            ty,
            props: Rc::new(props),
        }
    }

    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> Rc<Props> {
        Rc::clone(&self.props)
    }
}

/// A child slot as written by callers: either a finished element or a bare
/// value that gets wrapped into a text element.
#[derive(Clone, Debug)]
pub enum Child {
    Element(Element),
    Value(PropValue),
}

impl Child {
    fn into_element(self) -> Element {
        match self {
            Child::Element(element) => element,
            Child::Value(value) => text(value),
        }
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Element(builder.build())
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Value(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Value(value.into())
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Value(value.into())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Value(value.into())
    }
}

/// Builds an element from a type, an attribute list and children.
pub fn create_element<K, V>(
    ty: impl Into<ElementType>,
    attributes: impl IntoIterator<Item = (K, V)>,
    children: impl IntoIterator<Item = Child>,
) -> Element
where
    K: Into<String>,
    V: Into<PropValue>,
{
    let mut props = Props::new();
    for (key, value) in attributes {
        props.insert(key, value);
    }
    for child in children {
        props.push_child(child.into_element());
    }
    Element::new(ty.into(), props)
}

/// Text leaf: `{ type: TEXT, props: { value, children: [] } }`.
pub fn text(value: impl Into<PropValue>) -> Element {
    let mut props = Props::new();
    props.insert(TEXT_VALUE, value);
    Element::new(ElementType::host(TEXT_ELEMENT), props)
}

/// Starts a builder for a host element.
pub fn host(tag: &str) -> ElementBuilder {
    ElementBuilder::new(ElementType::host(tag))
}

#[derive(Clone, Debug)]
pub struct ElementBuilder {
    ty: ElementType,
    props: Props,
}

impl ElementBuilder {
    pub fn new(ty: ElementType) -> Self {
        Self {
            ty,
            props: Props::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Binds `handler` under `key`, which should carry the `on` prefix
    /// (`"onClick"`, `"onInput"`).
    pub fn on(self, key: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        self.attr(key, EventHandler::new(handler))
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.props.push_child(child.into().into_element());
        self
    }

    pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        for child in children {
            self.props.push_child(child.into().into_element());
        }
        self
    }

    pub fn build(self) -> Element {
        Element::new(self.ty, self.props)
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}
