//! Render Casement trees to HTML strings.
//!
//! A distinct code path from the reconciler: nothing here touches the host
//! document or the scheduler. The renderer walks virtual nodes, resolving
//! component references through their live instances, and writes escaped
//! markup.

use askama_escape::{escape, Html};
use casement_core::{AttributeValue, Scope, VNode, VirtualDom, FRAGMENT_TAG};
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

/// Failures while writing markup.
#[derive(thiserror::Error, Debug)]
pub enum SsrError {
    #[error("formatting failed: {0}")]
    Fmt(#[from] fmt::Error),
    #[error("the virtual dom has no mounted root")]
    NotMounted,
}

/// Elements with no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// The string renderer. Holds no state today; configuration (pretty
/// printing, hydration markers) hangs off this struct as it grows.
#[derive(Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a mounted virtual dom's root component.
    pub fn render(&self, dom: &VirtualDom) -> Result<String, SsrError> {
        let scope = dom.base_scope().ok_or(SsrError::NotMounted)?;
        let mut out = String::new();
        self.render_scope(&mut out, dom, &scope)?;
        Ok(out)
    }

    fn render_scope(
        &self,
        out: &mut String,
        dom: &VirtualDom,
        scope: &Rc<Scope>,
    ) -> Result<(), SsrError> {
        match scope.rendered_root() {
            Some(root) => self.render_node(out, dom, &root),
            None => Ok(()),
        }
    }

    /// Render one virtual node. Component references resolve through their
    /// instances; an uninstantiated component renders nothing.
    pub fn render_node(
        &self,
        out: &mut String,
        dom: &VirtualDom,
        node: &VNode,
    ) -> Result<(), SsrError> {
        match node {
            VNode::Text(t) => {
                write!(out, "{}", escape(&t.value, Html))?;
                Ok(())
            }
            VNode::Placeholder(_) => Ok(()),
            VNode::Element(el) if el.tag == FRAGMENT_TAG => {
                for child in &el.children {
                    self.render_node(out, dom, child)?;
                }
                Ok(())
            }
            VNode::Element(el) => {
                write!(out, "<{}", el.tag)?;
                for (name, value) in &el.attributes {
                    self.render_attribute(out, name, value)?;
                }
                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    write!(out, "/>")?;
                    return Ok(());
                }
                write!(out, ">")?;
                for child in &el.children {
                    self.render_node(out, dom, child)?;
                }
                write!(out, "</{}>", el.tag)?;
                Ok(())
            }
            VNode::Component(vc) => {
                let scope = vc.scope.get().and_then(|id| dom.scope(id));
                match scope {
                    Some(scope) => self.render_scope(out, dom, &scope),
                    None => {
                        log::warn!(
                            "skipping uninstantiated component {} during string render",
                            vc.def.name
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    fn render_attribute(
        &self,
        out: &mut String,
        name: &str,
        value: &AttributeValue,
    ) -> Result<(), SsrError> {
        match value {
            AttributeValue::Listener(_) | AttributeValue::Any(_) | AttributeValue::None => Ok(()),
            AttributeValue::Bool(false) => Ok(()),
            AttributeValue::Bool(true) => {
                write!(out, " {}", name)?;
                Ok(())
            }
            other => {
                let text = other.as_attr_text().unwrap_or_default();
                write!(out, " {}=\"{}\"", name, escape(&text, Html))?;
                Ok(())
            }
        }
    }
}

/// Render a mounted virtual dom to an HTML string.
pub fn render(dom: &VirtualDom) -> Result<String, SsrError> {
    Renderer::new().render(dom)
}

/// Render a free-standing virtual tree (no component instances) to HTML.
pub fn render_element(node: &VNode) -> String {
    // The walk only consults the dom for component resolution, which a
    // free-standing tree does not have; a throwaway dom satisfies the
    // signature.
    let dom = VirtualDom::new(&PLACEHOLDER_DEF);
    let mut out = String::new();
    let _ = Renderer::new().render_node(&mut out, &dom, node);
    out
}

static PLACEHOLDER_DEF: casement_core::ComponentDef =
    casement_core::ComponentDef::new("SsrRoot", |_| Ok(None));
