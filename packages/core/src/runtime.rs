//! Shared resources: the scope arena, host document handle and the
//! collaborator seams (capability registry, ambient identity).
//!
//! Both the virtual dom and the diff machine borrow the same [`Runtime`];
//! everything inside is interior-mutable so the single-threaded commit can
//! thread through it freely.

use crate::innerlude::*;
use futures_channel::mpsc::UnboundedSender;
use futures_util::future::LocalBoxFuture;
use fxhash::FxHashMap;
use slab::Slab;
use std::{cell::RefCell, rc::Rc};

pub(crate) struct Runtime {
    pub scopes: RefCell<Slab<Rc<Scope>>>,
    pub dom: Rc<RealDom>,
    pub sender: UnboundedSender<SchedulerMsg>,
    pub registry: RefCell<Option<Rc<dyn CapabilityRegistry>>>,
    /// DOM root → hosting instance. Lets the reconciler re-attach an
    /// instance when a new virtual subtree arrives without one.
    pub dom_scopes: RefCell<FxHashMap<ElementId, ScopeId>>,
    pub ambient_user: RefCell<Option<String>>,
    pub ambient_session: RefCell<Option<String>>,
    pub ambient_tenant: RefCell<Option<String>>,
    pub throttle: CommitThrottle,
}

impl Runtime {
    pub fn new(dom: Rc<RealDom>, sender: UnboundedSender<SchedulerMsg>) -> Rc<Self> {
        Rc::new(Runtime {
            scopes: RefCell::new(Slab::with_capacity(32)),
            dom,
            sender,
            registry: RefCell::new(None),
            dom_scopes: RefCell::new(FxHashMap::default()),
            ambient_user: RefCell::new(None),
            ambient_session: RefCell::new(None),
            ambient_tenant: RefCell::new(None),
            throttle: CommitThrottle::new(),
        })
    }

    pub fn scope(&self, id: ScopeId) -> Option<Rc<Scope>> {
        self.scopes.borrow().get(id.0).cloned()
    }

    /// Allocate a new instance. `setup` runs once and the state map is
    /// sealed when it returns.
    pub fn new_scope(
        self: &Rc<Self>,
        def: Component,
        props: indexmap::IndexMap<String, AttributeValue>,
        slots: Rc<Vec<VNode>>,
        parent: Option<ScopeId>,
    ) -> Rc<Scope> {
        let parent_scope = parent.and_then(|id| self.scope(id));
        let height = parent_scope.as_ref().map(|p| p.height + 1).unwrap_or(0);

        let id = {
            let mut scopes = self.scopes.borrow_mut();
            let entry = scopes.vacant_entry();
            let id = ScopeId(entry.key());
            let scope = Scope::new(id, def, height, self.sender.clone(), Rc::downgrade(self));
            entry.insert(scope);
            id
        };

        let scope = self.scope(id).expect("scope just inserted");
        scope.set_props(props);
        scope.set_slots(slots);

        if let Some(parent) = &parent_scope {
            *scope.parent.borrow_mut() = Rc::downgrade(parent);
            parent.children.borrow_mut().push(id);
        }

        if let Some(setup) = def.setup {
            setup(&scope);
        }
        scope.state.seal();

        log::trace!("created scope {:?} for {}", id, def.name);
        scope
    }

    /// Drop an instance from the arena after teardown.
    pub fn remove_scope(&self, id: ScopeId) {
        let scope = {
            let mut scopes = self.scopes.borrow_mut();
            if scopes.contains(id.0) {
                Some(scopes.remove(id.0))
            } else {
                None
            }
        };
        if let Some(scope) = scope {
            if let Some(parent) = scope.parent() {
                parent.children.borrow_mut().retain(|c| *c != id);
            }
        }
        // Slot ids are reused; a stale commit log must not throttle the
        // next tenant of this slot.
        self.throttle.forget(id);
    }

    /// Execute the instance's render, tracking reads into its render
    /// effect. Failures route to the nearest boundary; the failed spot
    /// yields a placeholder.
    pub fn render_scope(self: &Rc<Self>, scope: &Rc<Scope>) -> VNode {
        // A captured error switches a boundary to its fallback subtree; the
        // user render is not consulted at all.
        let captured = scope.error.borrow().clone();
        if let Some(err) = captured {
            if let Some(fallback) = scope.def.fallback {
                scope.generation.set(scope.generation.get() + 1);
                return untrack(|| fallback(scope, &err)).unwrap_or_else(VNode::placeholder);
            }
        }

        if scope.is_mounted() {
            scope.run_hooks(LifecyclePhase::BeforeRender);
        }

        scope.rendering.set(true);
        let result = run_with_effect(scope.render_effect.inner(), || (scope.def.render)(scope));
        scope.rendering.set(false);
        scope.generation.set(scope.generation.get() + 1);

        if scope.is_mounted() {
            scope.run_hooks(LifecyclePhase::AfterRender);
        }

        match result {
            Ok(Some(node)) => node,
            Ok(None) => VNode::placeholder(),
            Err(err) => {
                self.capture_error(scope.id, err, ErrorPhase::Render);
                VNode::placeholder()
            }
        }
    }

    /// Route an error to the nearest boundary, or to the process-wide
    /// handlers when none captures it. Render errors start the walk at the
    /// parent - a boundary guards its children, not its own render.
    pub fn capture_error(&self, origin: ScopeId, error: RenderError, phase: ErrorPhase) {
        let Some(_guard) = CaptureGuard::enter() else {
            log::error!(
                "error raised while another error was being handled; swallowed: {}",
                error
            );
            return;
        };

        let captured = CapturedError {
            message: error.message,
            phase: phase.clone(),
            scope: origin,
        };

        let start = match phase {
            ErrorPhase::Render => self.scope(origin).and_then(|s| s.parent()),
            _ => self.scope(origin),
        };

        let mut cursor = start;
        while let Some(scope) = cursor {
            if scope.is_boundary() {
                log::debug!(
                    "boundary {} ({:?}) captured error from {:?}: {}",
                    scope.name(),
                    scope.id,
                    origin,
                    captured
                );
                *scope.error.borrow_mut() = Some(captured);
                scope.needs_update();
                return;
            }
            cursor = scope.parent();
        }

        dispatch_uncaught(&captured);
    }

    // ------------------------------------------------------------------
    // Capability seam
    // ------------------------------------------------------------------

    pub fn set_registry(&self, registry: Rc<dyn CapabilityRegistry>) {
        *self.registry.borrow_mut() = Some(registry);
    }

    pub fn capability_granted(&self, capability: &str) -> bool {
        self.registry
            .borrow()
            .as_ref()
            .map(|r| r.grants(capability))
            .unwrap_or(false)
    }

    fn capability_context(&self, scope: &Rc<Scope>) -> CapabilityContext {
        CapabilityContext {
            scope: scope.id,
            user: self.ambient_user.borrow().clone(),
            session: self.ambient_session.borrow().clone(),
            tenant: self.ambient_tenant.borrow().clone(),
            layer: "component",
            required: scope
                .definition()
                .requires
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn pierce(
        &self,
        scope: &Rc<Scope>,
        capability: &str,
        args: &[StateValue],
    ) -> Option<CapabilityResult> {
        let registry = self.registry.borrow().clone()?;
        let context = self.capability_context(scope);
        Some(registry.pierce(capability, &context, args))
    }

    pub fn pierce_async(
        &self,
        scope: &Rc<Scope>,
        capability: &str,
        args: &[StateValue],
    ) -> Option<LocalBoxFuture<'static, CapabilityResult>> {
        let registry = self.registry.borrow().clone()?;
        let context = self.capability_context(scope);
        let capability = capability.to_string();
        let args = args.to_vec();
        Some(Box::pin(async move {
            registry.pierce_async(&capability, &context, &args).await
        }))
    }
}
