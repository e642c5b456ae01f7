//! The virtual dom: owns the scope arena, the host document, and the update
//! loop that turns queued invalidations into commits.
//!
//! ## Driving it
//!
//! Mount a root component, then feed it events and frames:
//!
//! ```rust, ignore
//! static APP: ComponentDef = ComponentDef::new("App", |scope| {
//!     Ok(Some(el("div").child(text("hello")).build()))
//! });
//!
//! let mut dom = VirtualDom::new(&APP);
//! dom.rebuild()?;
//!
//! dom.handle_event("click", button_id);
//! dom.flush_frame();
//! ```
//!
//! Every reactive write lands in one unbounded channel. Draining it, child
//! instances with host nodes attached commit synchronously - interactions
//! feel instantaneous - while root instances coalesce into an ordered dirty
//! set that [`VirtualDom::flush_frame`] drains once per frame, parents
//! before children. The reconciler's identity rules make either ordering
//! correct; the height ordering just avoids duplicate work.
//!
//! A commit is synchronous from entry to exit. Reactive writes raised while
//! it runs are collected in the channel and flushed afterwards, so a commit
//! can never nest inside a commit on the same instance.

use crate::innerlude::*;
use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use indexmap::IndexMap;
use std::{collections::BTreeSet, rc::Rc};

pub struct VirtualDom {
    rt: Rc<Runtime>,
    receiver: UnboundedReceiver<SchedulerMsg>,
    dirty_scopes: BTreeSet<DirtyScope>,
    root_def: Component,
    root_props: IndexMap<String, AttributeValue>,
    root_node: Option<VNode>,
}

impl VirtualDom {
    /// Create a virtual dom with a root component and empty props. Nothing
    /// renders until [`VirtualDom::rebuild`].
    pub fn new(root: Component) -> Self {
        Self::new_with_props(root, IndexMap::new())
    }

    pub fn new_with_props(root: Component, props: IndexMap<String, AttributeValue>) -> Self {
        let (sender, receiver) = unbounded::<SchedulerMsg>();
        let dom = Rc::new(RealDom::new());
        let rt = Runtime::new(dom, sender);
        VirtualDom {
            rt,
            receiver,
            dirty_scopes: BTreeSet::new(),
            root_def: root,
            root_props: props,
            root_node: None,
        }
    }

    /// The host document this dom commits against.
    pub fn dom(&self) -> Rc<RealDom> {
        self.rt.dom.clone()
    }

    /// Install the capability registry collaborator.
    pub fn set_capability_registry(&self, registry: Rc<dyn CapabilityRegistry>) {
        self.rt.set_registry(registry);
    }

    /// Set the ambient identity handed to every capability call.
    pub fn set_ambient_identity(
        &self,
        user: Option<String>,
        session: Option<String>,
        tenant: Option<String>,
    ) {
        *self.rt.ambient_user.borrow_mut() = user;
        *self.rt.ambient_session.borrow_mut() = session;
        *self.rt.ambient_tenant.borrow_mut() = tenant;
    }

    pub fn scope(&self, id: ScopeId) -> Option<Rc<Scope>> {
        self.rt.scope(id)
    }

    /// The root component's instance, once mounted.
    pub fn base_scope(&self) -> Option<Rc<Scope>> {
        let id = match &self.root_node {
            Some(VNode::Component(vc)) => vc.scope.get()?,
            _ => return None,
        };
        self.rt.scope(id)
    }

    /// Mount the root component into the (empty) document and flush any
    /// work the first commit raised - boundary fallbacks included.
    pub fn rebuild(&mut self) -> Result<(), CommitError> {
        if self.root_node.is_some() {
            log::warn!("rebuild called on an already-mounted virtual dom; ignoring");
            return Ok(());
        }

        let node = VNode::component(self.root_def, self.root_props.clone(), Vec::new());
        let container = self.rt.dom.root();

        let mut machine = DiffMachine::new(&self.rt);
        untrack(|| machine.mount(&node, &container, None))?;
        machine.finish();

        self.root_node = Some(node);
        self.flush_frame();
        Ok(())
    }

    /// Deliver a host event to an element and run the synchronous part of
    /// the resulting work. Root re-renders stay queued for the next frame.
    pub fn handle_event(&mut self, name: &str, element: ElementId) {
        self.handle_event_with_data(name, element, StateValue::Null);
    }

    pub fn handle_event_with_data(
        &mut self,
        name: &str,
        element: ElementId,
        data: impl Into<StateValue>,
    ) {
        let user = UserEvent::new(name, element).with_data(data);
        dispatch_event(&self.rt.dom, &user);
        self.process_messages();
    }

    /// Drain the channel: child instances commit now, roots queue.
    pub fn process_messages(&mut self) {
        while let Ok(Some(msg)) = self.receiver.try_next() {
            match msg {
                SchedulerMsg::Immediate(id) => self.invalidate(id),
                SchedulerMsg::UiEvent(user) => {
                    dispatch_event(&self.rt.dom, &user);
                }
            }
        }
    }

    fn invalidate(&mut self, id: ScopeId) {
        let Some(scope) = self.rt.scope(id) else {
            return;
        };
        let is_root = scope.parent().is_none();
        if !is_root && scope.is_mounted() {
            // Child with a host node attached: commit synchronously.
            self.perform_update(id);
        } else {
            // Roots coalesce onto the next frame; at most one pending
            // render per instance.
            self.dirty_scopes.insert(DirtyScope {
                height: scope.height(),
                id,
            });
        }
    }

    /// The frame boundary: drain pending work until the dom is quiescent,
    /// parents before children.
    pub fn flush_frame(&mut self) {
        loop {
            self.process_messages();
            let Some(dirty) = self.dirty_scopes.iter().next().copied() else {
                break;
            };
            self.dirty_scopes.remove(&dirty);
            self.perform_update(dirty.id);
        }
    }

    /// Queue a re-render for an instance. Test and embedder support.
    pub fn mark_dirty(&mut self, id: ScopeId) {
        if let Some(scope) = self.rt.scope(id) {
            scope.needs_update();
        }
    }

    /// Render one instance and commit the difference.
    fn perform_update(&mut self, id: ScopeId) {
        let Some(scope) = self.rt.scope(id) else {
            return;
        };
        // A commit must not nest a commit on the same instance.
        if scope.rendering.get() {
            log::warn!("update requested for {} mid-render; deferred", scope.name());
            scope.needs_update();
            return;
        }
        if !scope.is_mounted() {
            return;
        }
        // Stale message: the work was absorbed into an ancestor's diff.
        if !scope.render_effect.inner().is_dirty() && scope.error.borrow().is_none() {
            return;
        }
        if !self.rt.throttle.admit(id, scope.name()) {
            scope.render_effect.inner().clear_dirty();
            return;
        }

        let Some(old) = scope.rendered.borrow_mut().take() else {
            return;
        };
        let container = old
            .first_dom()
            .and_then(|dom| dom.parent())
            .unwrap_or_else(|| self.rt.dom.root());

        let new = self.rt.render_scope(&scope);

        let mut machine = DiffMachine::new(&self.rt);
        machine.unregister_scope_roots(&old);
        let result = untrack(|| machine.diff(&old, &new, Some(id), &container));

        match result {
            Ok(()) => {
                let roots: Vec<_> = new.root_doms();
                machine.register_scope_roots(id, &roots);
                *scope.rendered.borrow_mut() = Some(new);
                machine.note_updated(id);
                machine.finish();
            }
            Err(err) => {
                // Fatal to this commit: leave the previous tree in place
                // and report at the root.
                log::error!("commit failed for {}: {}", scope.name(), err);
                *scope.rendered.borrow_mut() = Some(old);
                dispatch_uncaught(&CapturedError {
                    message: err.to_string(),
                    phase: ErrorPhase::Commit,
                    scope: id,
                });
            }
        }
    }
}

/// Mount `root` into a fresh document and return the running dom.
pub fn render_to_dom(root: Component) -> Result<VirtualDom, CommitError> {
    let mut vdom = VirtualDom::new(root);
    vdom.rebuild()?;
    Ok(vdom)
}
