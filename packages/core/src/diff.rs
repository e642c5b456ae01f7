//! The stateful DiffMachine: diffing virtual nodes, their properties, and
//! their children against the host document.
//!
//! Given the previous and next virtual trees the machine applies the minimum
//! host edits that make the document mirror the next tree, preserving
//! component instance identity and host node identity wherever the trees
//! agree.
//!
//! ## Identity
//!
//! Two nodes at the same position match when variant and type (tag string or
//! component definition pointer) agree and, when both carry keys, the keys
//! are equal. Keys override position: the keyed child path matches keyed
//! pairs first, removes unmatched old nodes, creates unmatched new ones and
//! then corrects order, moving only the nodes outside the longest increasing
//! subsequence of the matched indices.
//!
//! ## Back-reference preservation
//!
//! Before any structural child diff the machine restores `.dom` links on
//! previous-tree nodes that lost them across hand-offs, walking the host
//! child list positionally. When a new subtree arrives without an instance
//! but the host element at that position hosts one of the same constructor,
//! the instance is re-attached rather than recreated - without this, a root
//! update would orphan every component below it.
//!
//! ## Failure policy
//!
//! Render errors never escape this module: the failing component yields a
//! placeholder and the error routes to its nearest boundary. Host errors
//! abort the whole commit and bubble to the caller, which leaves the
//! previous tree in place.

use crate::innerlude::*;
use fxhash::FxHashMap;
use smallvec::{smallvec, SmallVec};
use std::{fmt, rc::Rc};

/// Bound on the cross-structural instance search. Past this many visited
/// nodes a replaced subtree simply remounts.
const CROSS_REUSE_SEARCH_LIMIT: usize = 256;

/// A commit-fatal failure. Render errors are not commit-fatal.
#[derive(Debug)]
pub enum CommitError {
    Host(HostError),
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::Host(err) => write!(f, "host mutation failed: {}", err),
        }
    }
}

impl std::error::Error for CommitError {}

impl From<HostError> for CommitError {
    fn from(err: HostError) -> Self {
        CommitError::Host(err)
    }
}

type DomRoots = SmallVec<[Rc<DomNode>; 4]>;

pub(crate) struct DiffMachine<'b> {
    rt: &'b Rc<Runtime>,
    /// First-commit scopes; `mounted` hooks fire after the commit lands.
    mounted_scopes: Vec<ScopeId>,
    /// Re-rendered scopes; `updated` hooks fire after the commit lands.
    updated_scopes: Vec<ScopeId>,
    /// Instances transferred out of a replaced subtree this pass.
    adopted: Vec<ScopeId>,
    /// Adoption candidates harvested from a subtree about to unmount.
    salvage: Vec<(Component, ScopeId)>,
}

impl<'b> DiffMachine<'b> {
    pub fn new(rt: &'b Rc<Runtime>) -> Self {
        DiffMachine {
            rt,
            mounted_scopes: Vec::new(),
            updated_scopes: Vec::new(),
            adopted: Vec::new(),
            salvage: Vec::new(),
        }
    }

    pub fn note_updated(&mut self, id: ScopeId) {
        self.updated_scopes.push(id);
    }

    // =================================
    //  Creating new nodes
    // =================================

    /// Create `node` and append its roots to `container`.
    pub fn mount(
        &mut self,
        node: &VNode,
        container: &Rc<DomNode>,
        parent_scope: Option<ScopeId>,
    ) -> Result<(), CommitError> {
        let roots = self.create_node(node, parent_scope)?;
        for root in &roots {
            self.rt.dom.append_child(container, root)?;
        }
        Ok(())
    }

    /// Build host nodes for a virtual node, returning the roots it
    /// contributes to its parent's child list.
    fn create_node(
        &mut self,
        node: &VNode,
        parent_scope: Option<ScopeId>,
    ) -> Result<DomRoots, CommitError> {
        match node {
            VNode::Text(t) => {
                let dom = self.rt.dom.create_text(&t.value);
                *t.dom.borrow_mut() = Some(dom.clone());
                Ok(smallvec![dom])
            }
            VNode::Placeholder(p) => {
                let dom = self.rt.dom.create_placeholder();
                *p.dom.borrow_mut() = Some(dom.clone());
                Ok(smallvec![dom])
            }
            VNode::Element(el) if el.tag == FRAGMENT_TAG => {
                if el.children.is_empty() {
                    // A fragment is never left empty: the placeholder
                    // reserves its spot for later children.
                    let dom = self.rt.dom.create_placeholder();
                    *el.dom.borrow_mut() = Some(dom.clone());
                    return Ok(smallvec![dom]);
                }
                let mut roots = DomRoots::new();
                for child in &el.children {
                    roots.extend(self.create_node(child, parent_scope)?);
                }
                Ok(roots)
            }
            VNode::Element(el) => {
                let dom = self.rt.dom.create_element(&el.tag);
                *el.dom.borrow_mut() = Some(dom.clone());
                for (name, value) in &el.attributes {
                    self.apply_attribute(&dom, name, value);
                }
                for child in &el.children {
                    let child_roots = self.create_node(child, parent_scope)?;
                    for root in &child_roots {
                        self.rt.dom.append_child(&dom, root)?;
                    }
                }
                Ok(smallvec![dom])
            }
            VNode::Component(vc) => self.create_component(vc, parent_scope),
        }
    }

    fn create_component(
        &mut self,
        vc: &VComponent,
        parent_scope: Option<ScopeId>,
    ) -> Result<DomRoots, CommitError> {
        // Cross-structural reuse: a matching instance salvaged from the
        // subtree being replaced transfers here instead of remounting.
        if let Some(scope) = self.take_salvaged(vc) {
            return self.adopt_component(vc, scope, parent_scope);
        }

        let scope = self.rt.new_scope(
            vc.def,
            vc.props.clone(),
            vc.children.clone(),
            parent_scope,
        );
        vc.scope.set(Some(scope.id));

        scope.run_hooks(LifecyclePhase::BeforeMount);

        let subtree = self.rt.render_scope(&scope);
        let roots = self.create_node(&subtree, Some(scope.id))?;
        *scope.rendered.borrow_mut() = Some(subtree);

        *vc.dom.borrow_mut() = roots.first().cloned();
        self.register_scope_roots(scope.id, &roots);
        self.mounted_scopes.push(scope.id);

        Ok(roots)
    }

    fn take_salvaged(&mut self, vc: &VComponent) -> Option<Rc<Scope>> {
        let pos = self.salvage.iter().position(|(def, id)| {
            std::ptr::eq(*def, vc.def) && !self.adopted.contains(id)
        })?;
        let (_, id) = self.salvage.remove(pos);
        self.rt.scope(id)
    }

    fn adopt_component(
        &mut self,
        vc: &VComponent,
        scope: Rc<Scope>,
        parent_scope: Option<ScopeId>,
    ) -> Result<DomRoots, CommitError> {
        log::debug!(
            "transferring instance {:?} ({}) across structures",
            scope.id,
            scope.name()
        );
        self.adopted.push(scope.id);
        vc.scope.set(Some(scope.id));

        // Re-hang the instance under its new parent.
        if let Some(old_parent) = scope.parent() {
            old_parent.children.borrow_mut().retain(|c| *c != scope.id);
        }
        match parent_scope.and_then(|id| self.rt.scope(id)) {
            Some(new_parent) => {
                *scope.parent.borrow_mut() = Rc::downgrade(&new_parent);
                new_parent.children.borrow_mut().push(scope.id);
            }
            None => *scope.parent.borrow_mut() = std::rc::Weak::new(),
        }

        scope.set_props(vc.props.clone());
        scope.set_slots(vc.children.clone());

        let old_subtree = scope.rendered.borrow_mut().take();
        let new_subtree = self.rt.render_scope(&scope);
        let roots = match old_subtree {
            Some(old_subtree) => {
                let container = old_subtree
                    .first_dom()
                    .and_then(|d| d.parent())
                    .unwrap_or_else(|| self.rt.dom.root());
                self.unregister_scope_roots(&old_subtree);
                self.diff(&old_subtree, &new_subtree, Some(scope.id), &container)?;
                DomRoots::from_vec(new_subtree.root_doms())
            }
            None => self.create_node(&new_subtree, Some(scope.id))?,
        };
        *scope.rendered.borrow_mut() = Some(new_subtree);

        *vc.dom.borrow_mut() = roots.first().cloned();
        self.register_scope_roots(scope.id, &roots);
        self.updated_scopes.push(scope.id);

        Ok(roots)
    }

    pub(crate) fn register_scope_roots(&self, id: ScopeId, roots: &[Rc<DomNode>]) {
        let mut table = self.rt.dom_scopes.borrow_mut();
        for root in roots {
            table.insert(root.id(), id);
        }
    }

    pub(crate) fn unregister_scope_roots(&self, subtree: &VNode) {
        let mut table = self.rt.dom_scopes.borrow_mut();
        for root in subtree.root_doms() {
            table.remove(&root.id());
        }
    }

    // =================================
    //  Diffing matched nodes
    // =================================

    /// Diff one position of the tree. `container` is the host element the
    /// node's roots live in (an enclosing element, or the document root).
    pub fn diff(
        &mut self,
        old: &VNode,
        new: &VNode,
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        match (old, new) {
            (VNode::Text(o), VNode::Text(n)) => self.diff_text(o, n, container),
            (VNode::Placeholder(o), VNode::Placeholder(n)) => {
                *n.dom.borrow_mut() = o.dom.borrow().clone();
                Ok(())
            }
            (VNode::Element(o), VNode::Element(n))
                if o.tag == n.tag && keys_match(o.key.as_deref(), n.key.as_deref()) =>
            {
                self.diff_element(old, new, parent_scope, container)
            }
            (VNode::Component(o), VNode::Component(n))
                if std::ptr::eq(o.def, n.def)
                    && keys_match(o.key.as_deref(), n.key.as_deref()) =>
            {
                self.diff_component(old, new, parent_scope, container)
            }
            _ => self.replace_node(old, new, parent_scope, container),
        }
    }

    fn diff_text(
        &mut self,
        old: &VText,
        new: &VText,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        match old.dom.borrow().clone() {
            Some(dom) => {
                if old.value != new.value {
                    self.rt.dom.set_text(&dom, &new.value);
                }
                *new.dom.borrow_mut() = Some(dom);
                Ok(())
            }
            None => {
                // Lost node with no recovery: rebuild at the container's
                // end as a best effort.
                let dom = self.rt.dom.create_text(&new.value);
                *new.dom.borrow_mut() = Some(dom.clone());
                self.rt.dom.append_child(container, &dom)?;
                Ok(())
            }
        }
    }

    fn diff_element(
        &mut self,
        old_node: &VNode,
        new_node: &VNode,
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        let (VNode::Element(old), VNode::Element(new)) = (old_node, new_node) else {
            unreachable!("diff_element called on non-elements");
        };

        if old.tag == FRAGMENT_TAG {
            if old.children.is_empty() && new.children.is_empty() {
                *new.dom.borrow_mut() = old.dom.borrow().clone();
                return Ok(());
            }
            if old.children.is_empty() || new.children.is_empty() {
                // Placeholder anchor swaps with real children.
                return self.replace_node(old_node, new_node, parent_scope, container);
            }
            return self.diff_children(&old.children, &new.children, parent_scope, container);
        }

        let recovered = old.dom.borrow().clone();
        let Some(dom) = recovered else {
            return self.replace_node(old_node, new_node, parent_scope, container);
        };
        *new.dom.borrow_mut() = Some(dom.clone());

        self.diff_attributes(old, new, &dom);

        // Host-owned subtrees opt out of child reconciliation entirely;
        // their own properties still reconcile above.
        if has_preserve_children(new) {
            return Ok(());
        }

        self.diff_children(&old.children, &new.children, parent_scope, &dom)
    }

    fn diff_component(
        &mut self,
        old_node: &VNode,
        new_node: &VNode,
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        let (VNode::Component(old), VNode::Component(new)) = (old_node, new_node) else {
            unreachable!("diff_component called on non-components");
        };

        let scope_id = match old.scope.get() {
            Some(id) => Some(id),
            // The instance link was lost across a hand-off; recover it from
            // the host element the subtree still occupies.
            None => old
                .dom
                .borrow()
                .as_ref()
                .and_then(|dom| self.rt.dom_scopes.borrow().get(&dom.id()).copied())
                .filter(|id| {
                    self.rt
                        .scope(*id)
                        .map(|s| std::ptr::eq(s.definition(), new.def))
                        .unwrap_or(false)
                }),
        };

        let resolved = scope_id.and_then(|id| self.rt.scope(id).map(|scope| (id, scope)));
        let Some((scope_id, scope)) = resolved else {
            return self.replace_node(old_node, new_node, parent_scope, container);
        };

        new.scope.set(Some(scope_id));

        let props_changed = scope.set_props(new.props.clone());
        scope.set_slots(new.children.clone());

        // Memoized: an instance with unchanged inputs and a clean render
        // effect keeps its subtree, so a provider update re-renders only
        // actual consumers.
        let must_render = props_changed
            || !new.children.is_empty()
            || scope.render_effect.inner().is_dirty()
            || scope.error.borrow().is_some();

        if must_render {
            let old_subtree = scope.rendered.borrow_mut().take();
            let new_subtree = self.rt.render_scope(&scope);
            match old_subtree {
                Some(old_subtree) => {
                    let subtree_container = old_subtree
                        .first_dom()
                        .and_then(|d| d.parent())
                        .unwrap_or_else(|| container.clone());
                    self.unregister_scope_roots(&old_subtree);
                    self.diff(&old_subtree, &new_subtree, Some(scope_id), &subtree_container)?;
                }
                None => {
                    let roots = self.create_node(&new_subtree, Some(scope_id))?;
                    for root in &roots {
                        self.rt.dom.append_child(container, root)?;
                    }
                }
            }
            let roots: Vec<Rc<DomNode>> = new_subtree.root_doms();
            *scope.rendered.borrow_mut() = Some(new_subtree);
            *new.dom.borrow_mut() = roots.first().cloned();
            self.register_scope_roots(scope_id, &roots);
            self.updated_scopes.push(scope_id);
        } else {
            let first = scope
                .rendered
                .borrow()
                .as_ref()
                .and_then(|subtree| subtree.first_dom())
                .or_else(|| old.dom.borrow().clone());
            *new.dom.borrow_mut() = first;
        }

        Ok(())
    }

    fn replace_node(
        &mut self,
        old: &VNode,
        new: &VNode,
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        let salvage_start = self.salvage.len();
        let mut budget = CROSS_REUSE_SEARCH_LIMIT;
        self.collect_salvage(old, &mut budget);

        let anchor = old.first_dom();
        let roots = self.create_node(new, parent_scope)?;

        match anchor {
            Some(anchor) if anchor.parent().is_some() => {
                let parent = anchor.parent().expect("anchor has a parent");
                for root in &roots {
                    self.rt.dom.insert_before(&parent, root, &anchor)?;
                }
            }
            _ => {
                for root in &roots {
                    self.rt.dom.append_child(container, root)?;
                }
            }
        }

        self.unmount(old, true);
        self.salvage.truncate(salvage_start);
        Ok(())
    }

    /// Harvest adoption candidates from a subtree that is about to be
    /// replaced, diving through rendered component trees.
    fn collect_salvage(&mut self, node: &VNode, budget: &mut usize) {
        if *budget == 0 {
            return;
        }
        *budget -= 1;
        match node {
            VNode::Component(vc) => {
                if let Some(id) = vc.scope.get() {
                    self.salvage.push((vc.def, id));
                    if let Some(scope) = self.rt.scope(id) {
                        let rendered = scope.rendered.borrow().clone();
                        if let Some(rendered) = rendered {
                            self.collect_salvage(&rendered, budget);
                        }
                    }
                }
            }
            VNode::Element(el) => {
                for child in &el.children {
                    self.collect_salvage(child, budget);
                }
            }
            VNode::Text(_) | VNode::Placeholder(_) => {}
        }
    }

    // =================================
    //  Property reconciliation
    // =================================

    fn diff_attributes(&self, old: &VElement, new: &VElement, dom: &Rc<DomNode>) {
        for (name, old_value) in &old.attributes {
            if new.attributes.contains_key(name) {
                continue;
            }
            match old_value {
                AttributeValue::Listener(_) => {
                    self.rt.dom.remove_listener(dom.id(), &event_name(name));
                }
                AttributeValue::Style(_) => self.rt.dom.remove_attribute(dom, "style"),
                _ => self.rt.dom.remove_attribute(dom, name),
            }
        }

        for (name, new_value) in &new.attributes {
            let old_value = old.attributes.get(name);
            match new_value {
                AttributeValue::Listener(callback) => {
                    // Always re-point the side table; the old closure may
                    // capture stale captures even though listeners compare
                    // equal.
                    self.rt
                        .dom
                        .set_listener(dom.id(), &event_name(name), callback.clone());
                }
                AttributeValue::Style(style) => {
                    let empty = indexmap::IndexMap::new();
                    let old_style = match old_value {
                        Some(AttributeValue::Style(map)) => map,
                        _ => &empty,
                    };
                    for (prop, _) in old_style {
                        if !style.contains_key(prop) {
                            self.rt.dom.remove_style_property(dom, prop);
                        }
                    }
                    for (prop, value) in style {
                        if old_style.get(prop) != Some(value) {
                            self.rt.dom.set_style_property(dom, prop, value);
                        }
                    }
                }
                _ => {
                    if old_value == Some(new_value) {
                        continue;
                    }
                    self.apply_attribute(dom, name, new_value);
                }
            }
        }
    }

    fn apply_attribute(&self, dom: &Rc<DomNode>, name: &str, value: &AttributeValue) {
        match value {
            AttributeValue::Listener(callback) => {
                self.rt
                    .dom
                    .set_listener(dom.id(), &event_name(name), callback.clone());
            }
            AttributeValue::Style(style) => {
                for (prop, value) in style {
                    self.rt.dom.set_style_property(dom, prop, value);
                }
            }
            other => match other.as_attr_text() {
                Some(text) => self.rt.dom.set_attribute(dom, name, &text),
                None => self.rt.dom.remove_attribute(dom, name),
            },
        }
    }

    // =================================
    //  Child reconciliation
    // =================================

    fn diff_children(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        self.restore_dom_links(old, container);

        let fully_keyed =
            !old.is_empty() && !new.is_empty() && all_keyed(old) && all_keyed(new);
        if fully_keyed {
            self.diff_keyed_children(old, new, parent_scope, container)
        } else {
            self.diff_unkeyed_children(old, new, parent_scope, container)
        }
    }

    fn diff_unkeyed_children(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        let shared = old.len().min(new.len());

        for i in 0..shared {
            self.diff(&old[i], &new[i], parent_scope, container)?;
        }

        for stale in &old[shared..] {
            self.unmount(stale, true);
        }

        if new.len() > shared {
            let anchor = anchor_after(&old[..shared], container);
            for fresh in &new[shared..] {
                let roots = self.create_node(fresh, parent_scope)?;
                self.insert_roots(&roots, &anchor, container)?;
            }
        }

        Ok(())
    }

    fn diff_keyed_children(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        parent_scope: Option<ScopeId>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        let mut old_by_key: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, node) in old.iter().enumerate() {
            if let Some(key) = node.key() {
                old_by_key.insert(key, i);
            }
        }

        // The sibling following the whole list bounds every insertion; it
        // is outside the list and survives the removals below.
        let tail_anchor = anchor_after(old, container);

        // First pass: match keyed pairs and diff in place; remember each
        // new child's old position.
        let mut matched: Vec<Option<usize>> = Vec::with_capacity(new.len());
        for node in new {
            let old_idx = node
                .key()
                .and_then(|key| old_by_key.get(key).copied())
                .filter(|&i| same_type(&old[i], node));
            if let Some(i) = old_idx {
                self.diff(&old[i], node, parent_scope, container)?;
            }
            matched.push(old_idx);
        }

        // Remove old children that matched nothing.
        for (i, node) in old.iter().enumerate() {
            if !matched.contains(&Some(i)) {
                self.unmount(node, true);
            }
        }

        // Order correction: nodes on the longest increasing subsequence of
        // matched old indices stay put; everything else moves or mounts.
        let sequence: Vec<usize> = matched.iter().filter_map(|m| *m).collect();
        let lis_positions = longest_increasing_subsequence::lis(&sequence);
        let mut stable = vec![false; new.len()];
        {
            let mut seq_cursor = 0usize;
            for (new_idx, m) in matched.iter().enumerate() {
                if m.is_some() {
                    if lis_positions.contains(&seq_cursor) {
                        stable[new_idx] = true;
                    }
                    seq_cursor += 1;
                }
            }
        }

        let mut anchor: Option<Rc<DomNode>> = tail_anchor;
        for (new_idx, node) in new.iter().enumerate().rev() {
            match matched[new_idx] {
                Some(_) if stable[new_idx] => {}
                Some(_) => {
                    // Move the already-diffed roots into place.
                    let roots: DomRoots = DomRoots::from_vec(node.root_doms());
                    self.insert_roots(&roots, &anchor, container)?;
                }
                None => {
                    let roots = self.create_node(node, parent_scope)?;
                    self.insert_roots(&roots, &anchor, container)?;
                }
            }
            if let Some(first) = node.first_dom() {
                anchor = Some(first);
            }
        }

        Ok(())
    }

    fn insert_roots(
        &self,
        roots: &[Rc<DomNode>],
        anchor: &Option<Rc<DomNode>>,
        container: &Rc<DomNode>,
    ) -> Result<(), CommitError> {
        match anchor {
            Some(anchor) => {
                for root in roots {
                    self.rt.dom.insert_before(container, root, anchor)?;
                }
            }
            None => {
                for root in roots {
                    self.rt.dom.append_child(container, root)?;
                }
            }
        }
        Ok(())
    }

    // =================================
    //  Back-reference restoration
    // =================================

    /// Re-link `.dom` references on the previous tree by walking the host
    /// child list positionally, and re-attach instances the host still
    /// knows about. Must run before any structural child diff.
    fn restore_dom_links(&self, old: &[VNode], container: &Rc<DomNode>) {
        let dom_children = container.children();
        let mut cursor = 0usize;
        for node in old {
            self.restore_node(node, &dom_children, &mut cursor);
        }
    }

    fn restore_node(&self, node: &VNode, dom_children: &[Rc<DomNode>], cursor: &mut usize) {
        match node {
            VNode::Text(t) => {
                if t.dom.borrow().is_none() {
                    if let Some(candidate) = dom_children.get(*cursor) {
                        if candidate.is_text() {
                            *t.dom.borrow_mut() = Some(candidate.clone());
                        }
                    }
                }
                *cursor += 1;
            }
            VNode::Placeholder(p) => {
                if p.dom.borrow().is_none() {
                    if let Some(candidate) = dom_children.get(*cursor) {
                        if candidate.is_placeholder() {
                            *p.dom.borrow_mut() = Some(candidate.clone());
                        }
                    }
                }
                *cursor += 1;
            }
            VNode::Element(el) if el.tag == FRAGMENT_TAG => {
                for child in &el.children {
                    self.restore_node(child, dom_children, cursor);
                }
            }
            VNode::Element(el) => {
                if el.dom.borrow().is_none() {
                    if let Some(candidate) = dom_children.get(*cursor) {
                        if candidate.tag() == Some(el.tag.as_str()) {
                            *el.dom.borrow_mut() = Some(candidate.clone());
                        }
                    }
                }
                *cursor += 1;
            }
            VNode::Component(vc) => {
                if vc.scope.get().is_none() {
                    // The host element at this position may still host an
                    // instance of the matching constructor.
                    if let Some(candidate) = dom_children.get(*cursor) {
                        let found = self
                            .rt
                            .dom_scopes
                            .borrow()
                            .get(&candidate.id())
                            .copied()
                            .filter(|id| {
                                self.rt
                                    .scope(*id)
                                    .map(|s| std::ptr::eq(s.definition(), vc.def))
                                    .unwrap_or(false)
                            });
                        if let Some(id) = found {
                            vc.scope.set(Some(id));
                        }
                    }
                }
                let root_count = match vc.scope.get().and_then(|id| self.rt.scope(id)) {
                    Some(scope) => {
                        let rendered = scope.rendered.borrow();
                        let roots = rendered
                            .as_ref()
                            .map(|r| r.root_doms())
                            .unwrap_or_default();
                        if vc.dom.borrow().is_none() {
                            *vc.dom.borrow_mut() = roots.first().cloned();
                        }
                        roots.len().max(1)
                    }
                    None => 1,
                };
                *cursor += root_count;
            }
        }
    }

    // =================================
    //  Unmounting
    // =================================

    /// Tear a subtree down: children first, then disposers, then host
    /// removal. Instances adopted elsewhere this pass are skipped - their
    /// host nodes have already moved.
    pub fn unmount(&mut self, node: &VNode, remove_dom: bool) {
        match node {
            VNode::Text(t) => {
                if remove_dom {
                    if let Some(dom) = t.dom.borrow().clone() {
                        self.rt.dom.remove(&dom);
                    }
                }
            }
            VNode::Placeholder(p) => {
                if remove_dom {
                    if let Some(dom) = p.dom.borrow().clone() {
                        self.rt.dom.remove(&dom);
                    }
                }
            }
            VNode::Element(el) if el.tag == FRAGMENT_TAG => {
                if el.children.is_empty() {
                    if remove_dom {
                        if let Some(dom) = el.dom.borrow().clone() {
                            self.rt.dom.remove(&dom);
                        }
                    }
                    return;
                }
                for child in &el.children {
                    self.unmount(child, remove_dom);
                }
            }
            VNode::Element(el) => {
                // The parent's host removal takes the whole subtree with
                // it; children still need scope teardown.
                for child in &el.children {
                    self.unmount(child, false);
                }
                if remove_dom {
                    if let Some(dom) = el.dom.borrow().clone() {
                        self.rt.dom.remove(&dom);
                    }
                }
            }
            VNode::Component(vc) => self.unmount_component(vc, remove_dom),
        }
    }

    fn unmount_component(&mut self, vc: &VComponent, remove_dom: bool) {
        let Some(id) = vc.scope.get() else {
            return;
        };
        if self.adopted.contains(&id) {
            return;
        }
        let Some(scope) = self.rt.scope(id) else {
            return;
        };

        scope.run_hooks(LifecyclePhase::BeforeUnmount);

        let rendered = scope.rendered.borrow_mut().take();
        if let Some(rendered) = &rendered {
            self.unregister_scope_roots(rendered);
            self.unmount(rendered, remove_dom);
        }

        scope.teardown();
        emit_unmounted(id, scope.name());
        scope.run_hooks(LifecyclePhase::Unmounted);
        self.rt.remove_scope(id);
    }

    // =================================
    //  Post-commit work
    // =================================

    /// Fire `mounted`/`updated` hooks and devtools events for everything
    /// this pass touched. Called once the commit has landed.
    pub fn finish(&mut self) {
        for id in std::mem::take(&mut self.updated_scopes) {
            if let Some(scope) = self.rt.scope(id) {
                emit_updated(id, scope.name());
                scope.run_hooks(LifecyclePhase::Updated);
            }
        }
        // Children were pushed after their parents finished creating them,
        // so this runs leaf-first.
        for id in std::mem::take(&mut self.mounted_scopes) {
            if let Some(scope) = self.rt.scope(id) {
                scope.mounted.set(true);
                emit_mounted(id, scope.name());
                scope.run_hooks(LifecyclePhase::Mounted);
            }
        }
        self.adopted.clear();
        self.salvage.clear();
    }
}

fn keys_match(old: Option<&str>, new: Option<&str>) -> bool {
    match (old, new) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn same_type(old: &VNode, new: &VNode) -> bool {
    let keys_ok = keys_match(old.key(), new.key());
    match (old, new) {
        (VNode::Text(_), VNode::Text(_)) => true,
        (VNode::Placeholder(_), VNode::Placeholder(_)) => true,
        (VNode::Element(o), VNode::Element(n)) => o.tag == n.tag && keys_ok,
        (VNode::Component(o), VNode::Component(n)) => std::ptr::eq(o.def, n.def) && keys_ok,
        _ => false,
    }
}

fn all_keyed(nodes: &[VNode]) -> bool {
    nodes.iter().all(|n| n.key().is_some())
}

fn has_preserve_children(el: &VElement) -> bool {
    match el.attributes.get(PRESERVE_CHILDREN) {
        None => false,
        Some(AttributeValue::Bool(false)) | Some(AttributeValue::None) => false,
        Some(_) => true,
    }
}

/// The host node that follows the last root of `nodes` inside `container`,
/// used as the insertion anchor when appending to a child list that may be
/// followed by unrelated siblings (fragments share their parent's element).
fn anchor_after(nodes: &[VNode], container: &Rc<DomNode>) -> Option<Rc<DomNode>> {
    let last = nodes.iter().rev().find_map(|n| n.root_doms().pop())?;
    let siblings = container.children();
    let idx = siblings.iter().position(|c| Rc::ptr_eq(c, &last))?;
    siblings.get(idx + 1).cloned()
}

/// `onclick`/`onClick` style attribute names map to their event names.
fn event_name(attr: &str) -> String {
    let lower = attr.to_ascii_lowercase();
    match lower.strip_prefix("on") {
        Some(event) if !event.is_empty() => event.to_string(),
        _ => lower,
    }
}
