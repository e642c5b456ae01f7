//! Virtual nodes: the in-memory description of intended host output.
//!
//! A [`VNode`] is a tagged sum of text leaves, host elements, component
//! references and placeholders. Placeholders stand in for empty render
//! output so an empty spot still owns a host position and can be replaced in
//! place later - it is impossible to mount a component that owns nothing.
//!
//! Nodes carry mutable back-references populated during reconciliation: the
//! host node they own (`dom`) and, for components, the instance they host
//! (`scope`). Keys ride on elements and components and override positional
//! matching during diffs.

use crate::innerlude::*;
use indexmap::IndexMap;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

/// Sentinel element tag: renders its children without a wrapper host node.
pub const FRAGMENT_TAG: &str = "#fragment";

/// Attribute marker opting an element's children out of reconciliation, for
/// host-owned subtrees such as terminal widgets.
pub const PRESERVE_CHILDREN: &str = "preserve-children";

/// A constructor reference. Identity is pointer identity of the definition.
pub type Component = &'static ComponentDef;

/// A possibly-empty render output. `None` is coerced into a placeholder
/// during reconciliation.
pub type Element = Option<VNode>;

#[derive(Clone, Debug)]
pub enum VNode {
    Text(VText),
    Element(VElement),
    Component(VComponent),
    Placeholder(VPlaceholder),
}

#[derive(Clone, Debug)]
pub struct VText {
    pub value: String,
    pub dom: RefCell<Option<Rc<DomNode>>>,
}

#[derive(Clone, Debug)]
pub struct VElement {
    pub tag: String,
    pub key: Option<String>,
    pub attributes: IndexMap<String, AttributeValue>,
    pub children: Vec<VNode>,
    pub dom: RefCell<Option<Rc<DomNode>>>,
}

#[derive(Clone)]
pub struct VComponent {
    pub def: Component,
    pub key: Option<String>,
    pub props: IndexMap<String, AttributeValue>,
    /// Slot content, shared with the instance that renders it.
    pub children: Rc<Vec<VNode>>,
    pub scope: Cell<Option<ScopeId>>,
    /// First host root of the instance's rendered subtree.
    pub dom: RefCell<Option<Rc<DomNode>>>,
}

impl fmt::Debug for VComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VComponent")
            .field("name", &self.def.name)
            .field("key", &self.key)
            .field("scope", &self.scope.get())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct VPlaceholder {
    pub dom: RefCell<Option<Rc<DomNode>>>,
}

impl VNode {
    pub fn text(value: impl fmt::Display) -> VNode {
        VNode::Text(VText {
            value: value.to_string(),
            dom: RefCell::new(None),
        })
    }

    /// Build an element node. The `key` attribute is hoisted onto the node
    /// and `className` is normalised to `class`.
    pub fn element(
        tag: impl Into<String>,
        attributes: IndexMap<String, AttributeValue>,
        children: Vec<VNode>,
    ) -> VNode {
        let mut attributes = attributes;
        let key = match attributes.shift_remove("key") {
            Some(AttributeValue::Text(k)) => Some(k),
            Some(other) => other.as_attr_text(),
            None => None,
        };
        if let Some(class) = attributes.shift_remove("className") {
            attributes.insert("class".to_string(), class);
        }
        VNode::Element(VElement {
            tag: tag.into(),
            key,
            attributes,
            children,
            dom: RefCell::new(None),
        })
    }

    pub fn component(
        def: Component,
        props: IndexMap<String, AttributeValue>,
        children: Vec<VNode>,
    ) -> VNode {
        let mut props = props;
        let key = match props.shift_remove("key") {
            Some(AttributeValue::Text(k)) => Some(k),
            Some(other) => other.as_attr_text(),
            None => None,
        };
        VNode::Component(VComponent {
            def,
            key,
            props,
            children: Rc::new(children),
            scope: Cell::new(None),
            dom: RefCell::new(None),
        })
    }

    /// Multiple siblings without a wrapper host node.
    pub fn fragment(children: Vec<VNode>) -> VNode {
        VNode::element(FRAGMENT_TAG, IndexMap::new(), children)
    }

    pub fn placeholder() -> VNode {
        VNode::Placeholder(VPlaceholder::default())
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element(el) => el.key.as_deref(),
            VNode::Component(comp) => comp.key.as_deref(),
            _ => None,
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, VNode::Element(el) if el.tag == FRAGMENT_TAG)
    }

    /// The first host node this virtual node resolves to, diving through
    /// fragments and components.
    pub fn first_dom(&self) -> Option<Rc<DomNode>> {
        match self {
            VNode::Text(t) => t.dom.borrow().clone(),
            VNode::Placeholder(p) => p.dom.borrow().clone(),
            VNode::Element(el) => {
                if el.tag == FRAGMENT_TAG && !el.children.is_empty() {
                    el.children.iter().find_map(|child| child.first_dom())
                } else {
                    // An empty fragment holds the placeholder that anchors
                    // its spot.
                    el.dom.borrow().clone()
                }
            }
            VNode::Component(comp) => comp.dom.borrow().clone(),
        }
    }

    /// Every host root this virtual node contributes to its parent's child
    /// list. One node for text/elements, possibly many for fragments.
    pub fn root_doms(&self) -> Vec<Rc<DomNode>> {
        match self {
            VNode::Text(t) => t.dom.borrow().iter().cloned().collect(),
            VNode::Placeholder(p) => p.dom.borrow().iter().cloned().collect(),
            VNode::Element(el) => {
                if el.tag == FRAGMENT_TAG && !el.children.is_empty() {
                    el.children
                        .iter()
                        .flat_map(|child| child.root_doms())
                        .collect()
                } else {
                    el.dom.borrow().iter().cloned().collect()
                }
            }
            VNode::Component(comp) => comp.dom.borrow().iter().cloned().collect(),
        }
    }

    pub(crate) fn set_dom(&self, node: Option<Rc<DomNode>>) {
        match self {
            VNode::Text(t) => *t.dom.borrow_mut() = node,
            VNode::Element(el) => *el.dom.borrow_mut() = node,
            VNode::Component(comp) => *comp.dom.borrow_mut() = node,
            VNode::Placeholder(p) => *p.dom.borrow_mut() = node,
        }
    }
}

/// A property on an element or component.
#[derive(Clone)]
pub enum AttributeValue {
    Text(String),
    Int(i64),
    Float(f64),
    /// `true` attaches the attribute presence-only; `false` removes it.
    Bool(bool),
    /// Applied property-by-property rather than as one string.
    Style(IndexMap<String, String>),
    Listener(EventCallback),
    /// Host object handed through to a component.
    Any(Rc<dyn AnyValue>),
    None,
}

impl AttributeValue {
    /// The attribute text this value sets, or `None` when it removes the
    /// attribute instead.
    pub fn as_attr_text(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => Some(s.clone()),
            AttributeValue::Int(n) => Some(n.to_string()),
            AttributeValue::Float(v) => Some(v.to_string()),
            AttributeValue::Bool(true) => Some(String::new()),
            AttributeValue::Bool(false) => None,
            AttributeValue::Style(map) => {
                let mut out = String::new();
                for (name, value) in map {
                    out.push_str(name);
                    out.push(':');
                    out.push_str(value);
                    out.push(';');
                }
                Some(out)
            }
            AttributeValue::Listener(_) => None,
            AttributeValue::Any(_) => None,
            AttributeValue::None => None,
        }
    }

    pub fn is_listener(&self) -> bool {
        matches!(self, AttributeValue::Listener(_))
    }

    /// Convert to the dynamic value space for component props.
    pub fn to_state_value(&self) -> StateValue {
        match self {
            AttributeValue::Text(s) => StateValue::Text(s.clone()),
            AttributeValue::Int(n) => StateValue::Int(*n),
            AttributeValue::Float(v) => StateValue::Float(*v),
            AttributeValue::Bool(b) => StateValue::Bool(*b),
            AttributeValue::Style(map) => {
                let mut out = IndexMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), StateValue::Text(v.clone()));
                }
                StateValue::Map(out)
            }
            AttributeValue::Listener(_) => StateValue::Null,
            AttributeValue::Any(v) => StateValue::Any(v.clone()),
            AttributeValue::None => StateValue::Null,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(l), Self::Text(r)) => l == r,
            (Self::Int(l), Self::Int(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => l == r,
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Style(l), Self::Style(r)) => l == r,
            // Listener closures are not comparable; the side table is
            // re-pointed on every diff regardless.
            (Self::Listener(_), Self::Listener(_)) => true,
            (Self::Any(l), Self::Any(r)) => l.any_cmp(&**r),
            (Self::None, Self::None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Style(v) => f.debug_tuple("Style").field(v).finish(),
            Self::Listener(_) => f.debug_tuple("Listener").finish(),
            Self::Any(_) => f.debug_tuple("Any").finish(),
            Self::None => write!(f, "None"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<StateValue> for AttributeValue {
    fn from(v: StateValue) -> Self {
        match v {
            StateValue::Null => AttributeValue::None,
            StateValue::Bool(b) => AttributeValue::Bool(b),
            StateValue::Int(n) => AttributeValue::Int(n),
            StateValue::Float(f) => AttributeValue::Float(f),
            StateValue::Text(s) => AttributeValue::Text(s),
            StateValue::Any(a) => AttributeValue::Any(a),
            other => AttributeValue::Text(other.to_string()),
        }
    }
}

impl From<EventCallback> for AttributeValue {
    fn from(v: EventCallback) -> Self {
        AttributeValue::Listener(v)
    }
}
