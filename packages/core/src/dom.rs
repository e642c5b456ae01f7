//! The in-memory host document the reconciler commits against.
//!
//! All nodes are addressed by their [`ElementId`]s - indices into an internal
//! slab that holds weak references, so a removed subtree's entries vanish
//! with the nodes themselves. The tree owns its children top-down
//! (`Rc<DomNode>` in the parent's child list, `Weak` back up), which is what
//! breaks the vnode/instance/DOM cycle at drop time.
//!
//! Listeners live in a side table keyed by `(element id, event name)` rather
//! than on the nodes, so replacing a handler never double-binds and dropping
//! a node drops its handlers.
//!
//! Every observable mutation (attribute set/remove, text set, child
//! insert/remove) bumps a counter; the commit-minimality tests assert the
//! counter is untouched by a no-op render.

use crate::innerlude::*;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use slab::Slab;
use std::{
    cell::{Cell, RefCell},
    fmt,
    fmt::Write as _,
    rc::{Rc, Weak},
};

/// An index into the host document's node arena.
///
/// `ElementId(0)` is always the document root.
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-level failures. These abort the current commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The anchor node for an insertion is not a child of the given parent.
    NotAChild(ElementId),
    /// A child operation was attempted on a text or placeholder node.
    NotAnElement(ElementId),
    /// The referenced node has already been removed from the document.
    Detached(ElementId),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NotAChild(id) => write!(f, "node {} is not a child of the parent", id),
            HostError::NotAnElement(id) => write!(f, "node {} cannot hold children", id),
            HostError::Detached(id) => write!(f, "node {} is detached from the document", id),
        }
    }
}

impl std::error::Error for HostError {}

pub(crate) enum DomNodeKind {
    Element {
        tag: String,
        attributes: RefCell<IndexMap<String, String>>,
        children: RefCell<Vec<Rc<DomNode>>>,
    },
    Text {
        value: RefCell<String>,
    },
    /// Anchor for empty render output; renders as nothing.
    Placeholder,
}

/// One node of the host document.
pub struct DomNode {
    id: Cell<ElementId>,
    parent: RefCell<Weak<DomNode>>,
    pub(crate) kind: DomNodeKind,
}

impl DomNode {
    pub fn id(&self) -> ElementId {
        self.id.get()
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            DomNodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, DomNodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, DomNodeKind::Text { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, DomNodeKind::Placeholder)
    }

    pub fn text(&self) -> Option<String> {
        match &self.kind {
            DomNodeKind::Text { value } => Some(value.borrow().clone()),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.kind {
            DomNodeKind::Element { attributes, .. } => attributes.borrow().get(name).cloned(),
            _ => None,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        match &self.kind {
            DomNodeKind::Element { attributes, .. } => attributes.borrow().contains_key(name),
            _ => false,
        }
    }

    pub fn children(&self) -> Vec<Rc<DomNode>> {
        match &self.kind {
            DomNodeKind::Element { children, .. } => children.borrow().clone(),
            _ => Vec::new(),
        }
    }

    pub fn child_count(&self) -> usize {
        match &self.kind {
            DomNodeKind::Element { children, .. } => children.borrow().len(),
            _ => 0,
        }
    }

    pub fn parent(&self) -> Option<Rc<DomNode>> {
        self.parent.borrow().upgrade()
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            DomNodeKind::Text { value } => out.push_str(&value.borrow()),
            DomNodeKind::Element { children, .. } => {
                for child in children.borrow().iter() {
                    child.collect_text(out);
                }
            }
            DomNodeKind::Placeholder => {}
        }
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DomNodeKind::Element { tag, .. } => {
                write!(f, "<{} #{}>", tag, self.id.get())
            }
            DomNodeKind::Text { value } => write!(f, "#text({:?})", value.borrow()),
            DomNodeKind::Placeholder => write!(f, "#placeholder"),
        }
    }
}

/// The host document: node arena, listener side table, mutation counter.
pub struct RealDom {
    nodes: RefCell<Slab<Weak<DomNode>>>,
    listeners: RefCell<FxHashMap<ElementId, FxHashMap<String, EventCallback>>>,
    root: RefCell<Option<Rc<DomNode>>>,
    mutations: Cell<u64>,
}

impl Default for RealDom {
    fn default() -> Self {
        Self::new()
    }
}

impl RealDom {
    pub fn new() -> Self {
        let dom = RealDom {
            nodes: RefCell::new(Slab::with_capacity(64)),
            listeners: RefCell::new(FxHashMap::default()),
            root: RefCell::new(None),
            mutations: Cell::new(0),
        };
        let root = dom.register(DomNodeKind::Element {
            tag: "#document".to_string(),
            attributes: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
        });
        *dom.root.borrow_mut() = Some(root);
        dom
    }

    /// The document root container.
    pub fn root(&self) -> Rc<DomNode> {
        self.root.borrow().as_ref().expect("root exists").clone()
    }

    pub fn get(&self, id: ElementId) -> Option<Rc<DomNode>> {
        self.nodes.borrow().get(id.0).and_then(|w| w.upgrade())
    }

    fn register(&self, kind: DomNodeKind) -> Rc<DomNode> {
        let mut nodes = self.nodes.borrow_mut();
        let entry = nodes.vacant_entry();
        let id = ElementId(entry.key());
        let node = Rc::new(DomNode {
            id: Cell::new(id),
            parent: RefCell::new(Weak::new()),
            kind,
        });
        entry.insert(Rc::downgrade(&node));
        node
    }

    pub fn create_element(&self, tag: impl Into<String>) -> Rc<DomNode> {
        self.register(DomNodeKind::Element {
            tag: tag.into(),
            attributes: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
        })
    }

    pub fn create_text(&self, value: impl Into<String>) -> Rc<DomNode> {
        self.register(DomNodeKind::Text {
            value: RefCell::new(value.into()),
        })
    }

    pub fn create_placeholder(&self) -> Rc<DomNode> {
        self.register(DomNodeKind::Placeholder)
    }

    fn bump(&self) {
        self.mutations.set(self.mutations.get() + 1);
    }

    /// Observable mutations applied so far. Creation of unattached nodes is
    /// not observable and not counted.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.get()
    }

    /// Remove `child` from its current parent without releasing it, so it
    /// can be re-inserted elsewhere (a DOM move).
    pub fn detach(&self, child: &Rc<DomNode>) {
        if let Some(parent) = child.parent() {
            if let DomNodeKind::Element { children, .. } = &parent.kind {
                let before = children.borrow().len();
                children
                    .borrow_mut()
                    .retain(|c| !Rc::ptr_eq(c, child));
                if children.borrow().len() != before {
                    self.bump();
                }
            }
        }
        *child.parent.borrow_mut() = Weak::new();
    }

    pub fn append_child(&self, parent: &Rc<DomNode>, child: &Rc<DomNode>) -> Result<(), HostError> {
        let DomNodeKind::Element { children, .. } = &parent.kind else {
            return Err(HostError::NotAnElement(parent.id()));
        };
        self.detach(child);
        *child.parent.borrow_mut() = Rc::downgrade(parent);
        children.borrow_mut().push(child.clone());
        self.bump();
        Ok(())
    }

    /// Insert `child` into `parent` immediately before `anchor`.
    pub fn insert_before(
        &self,
        parent: &Rc<DomNode>,
        child: &Rc<DomNode>,
        anchor: &Rc<DomNode>,
    ) -> Result<(), HostError> {
        let DomNodeKind::Element { children, .. } = &parent.kind else {
            return Err(HostError::NotAnElement(parent.id()));
        };
        self.detach(child);
        let idx = children
            .borrow()
            .iter()
            .position(|c| Rc::ptr_eq(c, anchor))
            .ok_or(HostError::NotAChild(anchor.id()))?;
        *child.parent.borrow_mut() = Rc::downgrade(parent);
        children.borrow_mut().insert(idx, child.clone());
        self.bump();
        Ok(())
    }

    /// Detach a node and release it and its whole subtree: listeners gone,
    /// arena slots freed.
    pub fn remove(&self, node: &Rc<DomNode>) {
        self.detach(node);
        self.release(node);
    }

    fn release(&self, node: &Rc<DomNode>) {
        self.listeners.borrow_mut().remove(&node.id());
        self.nodes.borrow_mut().try_remove(node.id().0);
        if let DomNodeKind::Element { children, .. } = &node.kind {
            for child in children.borrow().iter() {
                self.release(child);
            }
        }
    }

    pub fn set_attribute(&self, node: &Rc<DomNode>, name: &str, value: &str) {
        if let DomNodeKind::Element { attributes, .. } = &node.kind {
            attributes
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
            self.bump();
        }
    }

    pub fn remove_attribute(&self, node: &Rc<DomNode>, name: &str) {
        if let DomNodeKind::Element { attributes, .. } = &node.kind {
            if attributes.borrow_mut().shift_remove(name).is_some() {
                self.bump();
            }
        }
    }

    /// Set one property of the element's inline style, rewriting the
    /// `style` attribute in place.
    pub fn set_style_property(&self, node: &Rc<DomNode>, name: &str, value: &str) {
        let mut style = parse_style(node.attribute("style").as_deref().unwrap_or(""));
        style.insert(name.to_string(), value.to_string());
        self.set_attribute(node, "style", &render_style(&style));
    }

    pub fn remove_style_property(&self, node: &Rc<DomNode>, name: &str) {
        let mut style = parse_style(node.attribute("style").as_deref().unwrap_or(""));
        if style.shift_remove(name).is_some() {
            if style.is_empty() {
                self.remove_attribute(node, "style");
            } else {
                self.set_attribute(node, "style", &render_style(&style));
            }
        }
    }

    pub fn set_text(&self, node: &Rc<DomNode>, value: &str) {
        if let DomNodeKind::Text { value: slot } = &node.kind {
            *slot.borrow_mut() = value.to_string();
            self.bump();
        }
    }

    /// Bind a listener. Replacing an existing one swaps the side-table entry
    /// in place; the host never sees a double binding, and the swap is not a
    /// DOM mutation.
    pub fn set_listener(&self, id: ElementId, event: &str, callback: EventCallback) {
        self.listeners
            .borrow_mut()
            .entry(id)
            .or_default()
            .insert(event.to_string(), callback);
    }

    pub fn remove_listener(&self, id: ElementId, event: &str) {
        if let Some(table) = self.listeners.borrow_mut().get_mut(&id) {
            table.remove(event);
        }
    }

    pub fn listener(&self, id: ElementId, event: &str) -> Option<EventCallback> {
        self.listeners
            .borrow()
            .get(&id)
            .and_then(|table| table.get(event))
            .cloned()
    }

    pub fn has_listener(&self, id: ElementId, event: &str) -> bool {
        self.listeners
            .borrow()
            .get(&id)
            .map(|table| table.contains_key(event))
            .unwrap_or(false)
    }

    /// Node ids from `id` up to the document root, inclusive of `id`.
    pub fn path_to_root(&self, id: ElementId) -> Vec<ElementId> {
        let mut path = Vec::new();
        let mut cursor = self.get(id);
        while let Some(node) = cursor {
            path.push(node.id());
            cursor = node.parent();
        }
        path
    }

    /// Serialised markup of `node`'s children. A debug/test helper - no
    /// escaping is applied; the ssr crate owns real HTML generation.
    pub fn inner_html(&self, node: &Rc<DomNode>) -> String {
        let mut out = String::new();
        if let DomNodeKind::Element { children, .. } = &node.kind {
            for child in children.borrow().iter() {
                Self::write_node(child, &mut out);
            }
        }
        out
    }

    fn write_node(node: &Rc<DomNode>, out: &mut String) {
        match &node.kind {
            DomNodeKind::Text { value } => out.push_str(&value.borrow()),
            DomNodeKind::Placeholder => {}
            DomNodeKind::Element {
                tag,
                attributes,
                children,
            } => {
                let _ = write!(out, "<{}", tag);
                for (name, value) in attributes.borrow().iter() {
                    if value.is_empty() {
                        let _ = write!(out, " {}", name);
                    } else {
                        let _ = write!(out, " {}=\"{}\"", name, value);
                    }
                }
                out.push('>');
                for child in children.borrow().iter() {
                    Self::write_node(child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

fn parse_style(text: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for decl in text.split(';') {
        if let Some((name, value)) = decl.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                map.insert(name.to_string(), value.trim().to_string());
            }
        }
    }
    map
}

fn render_style(style: &IndexMap<String, String>) -> String {
    let mut out = String::new();
    for (name, value) in style {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push(';');
    }
    out
}
