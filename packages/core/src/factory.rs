//! Ergonomic construction of virtual trees.
//!
//! Compiled components and hand-written Rust both build trees through these
//! helpers; they guarantee the placeholder rule (no empty fragments reach
//! the reconciler) and keep key extraction in one place.

use crate::innerlude::*;
use indexmap::IndexMap;
use std::fmt;

/// Start building a host element.
pub fn el(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        tag: tag.into(),
        attributes: IndexMap::new(),
        children: Vec::new(),
    }
}

/// A text leaf.
pub fn text(value: impl fmt::Display) -> VNode {
    VNode::text(value)
}

/// Multiple siblings without a wrapper node. An empty list becomes a
/// placeholder so the spot can be filled in later.
pub fn fragment(children: impl IntoIterator<Item = VNode>) -> VNode {
    let children: Vec<VNode> = children.into_iter().collect();
    if children.is_empty() {
        return VNode::placeholder();
    }
    VNode::fragment(children)
}

/// Start building a component reference.
pub fn component(def: Component) -> ComponentBuilder {
    ComponentBuilder {
        def,
        props: IndexMap::new(),
        children: Vec::new(),
    }
}

pub struct ElementBuilder {
    tag: String,
    attributes: IndexMap<String, AttributeValue>,
    children: Vec<VNode>,
}

impl ElementBuilder {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn key(self, key: impl fmt::Display) -> Self {
        self.attr("key", key.to_string())
    }

    pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let entry = self
            .attributes
            .entry("style".to_string())
            .or_insert_with(|| AttributeValue::Style(IndexMap::new()));
        if let AttributeValue::Style(map) = entry {
            map.insert(name.into(), value.into());
        }
        self
    }

    pub fn on(mut self, event: impl Into<String>, f: impl FnMut(&Event) + 'static) -> Self {
        self.attributes
            .insert(event.into(), AttributeValue::Listener(EventCallback::new(f)));
        self
    }

    pub fn child(mut self, child: VNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(self) -> VNode {
        VNode::element(self.tag, self.attributes, self.children)
    }
}

pub struct ComponentBuilder {
    def: Component,
    props: IndexMap<String, AttributeValue>,
    children: Vec<VNode>,
}

impl ComponentBuilder {
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn key(self, key: impl fmt::Display) -> Self {
        self.prop("key", key.to_string())
    }

    pub fn child(mut self, child: VNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(self) -> VNode {
        VNode::component(self.def, self.props, self.children)
    }
}
