//! Component definitions and per-instance state.
//!
//! Every mounted component is represented by a [`Scope`]: the instance's
//! props, its sealed reactive state, provided contexts, lifecycle hook
//! table, rendered subtree and error slot. Scopes are arena allocated; as
//! components unmount their slots are reused for new instances.
//!
//! A [`ComponentDef`] is the "constructor": a `'static` record whose pointer
//! identity is what the reconciler matches on. Definitions are plain data so
//! both compiled output and hand-written Rust can produce them.

use crate::innerlude::*;
use futures_channel::mpsc::UnboundedSender;
use futures_util::future::LocalBoxFuture;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

/// The ID of a mounted component instance.
///
/// Not unique for the lifetime of the process - slots are reused when
/// components unmount.
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct ScopeId(pub usize);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a component's render produced, or the error it failed with.
pub type RenderResult = Result<Element, RenderError>;

/// A failure raised by user code: render bodies, lifecycle hooks, effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        RenderError {
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RenderError {}

impl From<&str> for RenderError {
    fn from(message: &str) -> Self {
        RenderError::new(message)
    }
}

impl From<String> for RenderError {
    fn from(message: String) -> Self {
        RenderError { message }
    }
}

/// The lifecycle phases hooks can attach to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LifecyclePhase {
    BeforeMount,
    Mounted,
    BeforeRender,
    AfterRender,
    Updated,
    BeforeUnmount,
    Unmounted,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::BeforeMount => "beforeMount",
            LifecyclePhase::Mounted => "mounted",
            LifecyclePhase::BeforeRender => "beforeRender",
            LifecyclePhase::AfterRender => "afterRender",
            LifecyclePhase::Updated => "updated",
            LifecyclePhase::BeforeUnmount => "beforeUnmount",
            LifecyclePhase::Unmounted => "unmounted",
        };
        f.write_str(name)
    }
}

/// Where an error was raised, as surfaced to boundaries and handlers.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ErrorPhase {
    Render,
    Commit,
    Effect,
    Hook(LifecyclePhase),
    Fenestrate(String),
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPhase::Render => f.write_str("render"),
            ErrorPhase::Commit => f.write_str("commit"),
            ErrorPhase::Effect => f.write_str("effect"),
            ErrorPhase::Hook(phase) => write!(f, "hook:{}", phase),
            ErrorPhase::Fenestrate(id) => write!(f, "fenestrate:{}", id),
        }
    }
}

/// An error captured by (or escaping past) a boundary.
#[derive(Clone, Debug)]
pub struct CapturedError {
    pub message: String,
    pub phase: ErrorPhase,
    /// The instance whose code raised the error.
    pub scope: ScopeId,
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)
    }
}

/// A component definition. Statics of this type are the unit of identity
/// the reconciler matches instances by.
pub struct ComponentDef {
    pub name: &'static str,
    /// Runs once at instance creation: declares state, registers hooks.
    /// State is sealed when it returns.
    pub setup: Option<fn(&Scope)>,
    pub render: fn(&Scope) -> RenderResult,
    /// Present on error boundaries: renders in place of `render` while an
    /// error is captured.
    pub fallback: Option<fn(&Scope, &CapturedError) -> Element>,
    /// Capability ids this component needs granted.
    pub requires: &'static [&'static str],
    /// Capability ids this component offers to descendants.
    pub provides: &'static [&'static str],
}

impl ComponentDef {
    pub const fn new(name: &'static str, render: fn(&Scope) -> RenderResult) -> Self {
        ComponentDef {
            name,
            setup: None,
            render,
            fallback: None,
            requires: &[],
            provides: &[],
        }
    }

    pub const fn with_setup(mut self, setup: fn(&Scope)) -> Self {
        self.setup = Some(setup);
        self
    }

    pub const fn with_fallback(mut self, fallback: fn(&Scope, &CapturedError) -> Element) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub const fn with_requires(mut self, requires: &'static [&'static str]) -> Self {
        self.requires = requires;
        self
    }

    pub const fn with_provides(mut self, provides: &'static [&'static str]) -> Self {
        self.provides = provides;
        self
    }

    pub fn is_boundary(&self) -> bool {
        self.fallback.is_some()
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef").field("name", &self.name).finish()
    }
}

/// Registration options for a lifecycle hook.
#[derive(Clone, Debug, Default)]
pub struct HookOptions {
    /// Hooks run in descending priority, then insertion order.
    pub priority: i32,
    /// Deregister after the first run.
    pub once: bool,
    /// Skip the hook unless the registry grants this capability.
    pub required_capability: Option<String>,
}

type HookFn = Rc<dyn Fn(&Scope) -> Result<(), RenderError>>;

pub(crate) struct HookEntry {
    seq: usize,
    priority: i32,
    once: bool,
    required_capability: Option<String>,
    callback: HookFn,
}

/// A mounted component instance.
pub struct Scope {
    pub(crate) id: ScopeId,
    pub(crate) def: Component,
    pub(crate) height: u32,
    pub(crate) parent: RefCell<Weak<Scope>>,
    pub(crate) children: RefCell<Vec<ScopeId>>,

    pub(crate) props: RefCell<IndexMap<String, AttributeValue>>,
    pub(crate) slots: RefCell<Rc<Vec<VNode>>>,
    pub(crate) state: Reactive,

    pub(crate) contexts: RefCell<FxHashMap<ContextKey, ProvidedContext>>,
    pub(crate) hooks: RefCell<FxHashMap<LifecyclePhase, Vec<HookEntry>>>,
    hook_seq: Cell<usize>,

    pub(crate) render_effect: Effect,
    pub(crate) disposers: RefCell<Vec<Effect>>,
    pub(crate) cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,

    pub(crate) rendered: RefCell<Option<VNode>>,

    /// Captured-error slot. Deliberately a dedicated field: user state of
    /// the same name cannot shadow it during fallback rendering.
    pub(crate) error: RefCell<Option<CapturedError>>,

    pub(crate) capability_cache: RefCell<FxHashMap<String, StateValue>>,

    pub(crate) rendering: Cell<bool>,
    pub(crate) mounted: Cell<bool>,
    pub(crate) generation: Cell<u32>,

    pub(crate) sender: UnboundedSender<SchedulerMsg>,
    pub(crate) runtime: Weak<Runtime>,
    /// Weak self-reference so `&self` methods can hand out owned handles.
    self_weak: RefCell<Weak<Scope>>,
}

impl Scope {
    pub(crate) fn new(
        id: ScopeId,
        def: Component,
        height: u32,
        sender: UnboundedSender<SchedulerMsg>,
        runtime: Weak<Runtime>,
    ) -> Rc<Self> {
        let scope = Rc::new(Scope {
            id,
            def,
            height,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            props: RefCell::new(IndexMap::new()),
            slots: RefCell::new(Rc::new(Vec::new())),
            state: Reactive::new(),
            contexts: RefCell::new(FxHashMap::default()),
            hooks: RefCell::new(FxHashMap::default()),
            hook_seq: Cell::new(0),
            render_effect: Effect::new_render(id, sender.clone()),
            disposers: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            rendered: RefCell::new(None),
            error: RefCell::new(None),
            capability_cache: RefCell::new(FxHashMap::default()),
            rendering: Cell::new(false),
            mounted: Cell::new(false),
            generation: Cell::new(0),
            sender,
            runtime,
            self_weak: RefCell::new(Weak::new()),
        });
        *scope.self_weak.borrow_mut() = Rc::downgrade(&scope);
        scope
    }

    /// An owned handle to this instance.
    pub fn handle(&self) -> Rc<Scope> {
        self.self_weak
            .borrow()
            .upgrade()
            .expect("scope outlives its own methods")
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn definition(&self) -> Component {
        self.def
    }

    /// The number of scopes above this one; the root scope has height 0.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn parent(&self) -> Option<Rc<Scope>> {
        self.parent.borrow().upgrade()
    }

    /// Ids of the child instances this scope currently hosts.
    pub fn child_ids(&self) -> Vec<ScopeId> {
        self.children.borrow().clone()
    }

    /// How many times this instance has rendered.
    pub fn generation(&self) -> u32 {
        self.generation.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn is_boundary(&self) -> bool {
        self.def.is_boundary()
    }

    pub(crate) fn rt(&self) -> Option<Rc<Runtime>> {
        self.runtime.upgrade()
    }

    // ------------------------------------------------------------------
    // Props and slots
    // ------------------------------------------------------------------

    /// Read a prop as a dynamic value. Missing props read as `Null`.
    pub fn prop(&self, name: &str) -> StateValue {
        self.props
            .borrow()
            .get(name)
            .map(|v| v.to_state_value())
            .unwrap_or(StateValue::Null)
    }

    /// Read a prop that carries a callback.
    pub fn listener_prop(&self, name: &str) -> Option<EventCallback> {
        match self.props.borrow().get(name) {
            Some(AttributeValue::Listener(cb)) => Some(cb.clone()),
            _ => None,
        }
    }

    pub fn props(&self) -> IndexMap<String, AttributeValue> {
        self.props.borrow().clone()
    }

    /// Replace props wholesale. Returns whether anything changed.
    pub(crate) fn set_props(&self, new: IndexMap<String, AttributeValue>) -> bool {
        let changed = *self.props.borrow() != new;
        if changed {
            *self.props.borrow_mut() = new;
        }
        changed
    }

    /// Slot content passed between the component's tags.
    pub fn slots(&self) -> Rc<Vec<VNode>> {
        self.slots.borrow().clone()
    }

    /// A snapshot of the instance's current rendered subtree. Read-only
    /// consumers (string rendering, devtools) walk the tree through this.
    pub fn rendered_root(&self) -> Option<VNode> {
        self.rendered.borrow().clone()
    }

    pub(crate) fn set_slots(&self, slots: Rc<Vec<VNode>>) {
        *self.slots.borrow_mut() = slots;
    }

    // ------------------------------------------------------------------
    // Reactive state
    // ------------------------------------------------------------------

    pub fn state(&self) -> &Reactive {
        &self.state
    }

    /// Merge a partial update into state. Cells whose value is equal are
    /// untouched, so an all-equal update schedules nothing.
    pub fn set_state<K: AsRef<str>, V: Into<StateValue>>(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) {
        for (key, value) in pairs {
            self.state.set(key.as_ref(), value);
        }
    }

    /// Function form: compute the update from the current state.
    pub fn update_state(&self, f: impl FnOnce(&Reactive)) {
        f(&self.state);
    }

    /// Schedule a re-render of this instance.
    ///
    /// Marks the render effect dirty before queueing, so a message that
    /// arrives after the work was already absorbed into a parent's diff is
    /// recognised as stale and dropped.
    pub fn needs_update(&self) {
        self.render_effect.inner().mark_dirty();
        let _ = self.sender.unbounded_send(SchedulerMsg::Immediate(self.id));
    }

    /// An owned callback that schedules a future render of this instance,
    /// for listeners and async work that outlive the borrow.
    pub fn schedule_update(&self) -> Rc<dyn Fn()> {
        let effect = self.render_effect.clone();
        let sender = self.sender.clone();
        let id = self.id;
        Rc::new(move || {
            effect.inner().mark_dirty();
            let _ = sender.unbounded_send(SchedulerMsg::Immediate(id));
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle hooks
    // ------------------------------------------------------------------

    /// Register a lifecycle hook with default options.
    pub fn on(&self, phase: LifecyclePhase, f: impl Fn(&Scope) + 'static) {
        self.on_with(phase, HookOptions::default(), move |scope| {
            f(scope);
            Ok(())
        });
    }

    /// Register a fallible lifecycle hook with explicit options.
    pub fn on_with(
        &self,
        phase: LifecyclePhase,
        options: HookOptions,
        f: impl Fn(&Scope) -> Result<(), RenderError> + 'static,
    ) {
        let seq = self.hook_seq.get();
        self.hook_seq.set(seq + 1);
        self.hooks
            .borrow_mut()
            .entry(phase)
            .or_default()
            .push(HookEntry {
                seq,
                priority: options.priority,
                once: options.once,
                required_capability: options.required_capability,
                callback: Rc::new(f),
            });
    }

    /// Run every hook of a phase: descending priority, then insertion
    /// order. A failing hook is reported and the rest still run.
    pub(crate) fn run_hooks(&self, phase: LifecyclePhase) {
        let mut entries: Vec<(usize, i32, bool, Option<String>, HookFn)> = {
            let hooks = self.hooks.borrow();
            match hooks.get(&phase) {
                Some(list) => list
                    .iter()
                    .map(|e| {
                        (
                            e.seq,
                            e.priority,
                            e.once,
                            e.required_capability.clone(),
                            e.callback.clone(),
                        )
                    })
                    .collect(),
                None => return,
            }
        };
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let rt = self.rt();
        let mut fired_once: Vec<usize> = Vec::new();

        for (seq, _, once, required, callback) in entries {
            if let Some(cap) = &required {
                let granted = rt
                    .as_ref()
                    .map(|rt| rt.capability_granted(cap))
                    .unwrap_or(false);
                if !granted {
                    log::debug!(
                        "skipping {} hook on {}: capability {:?} not granted",
                        phase,
                        self.def.name,
                        cap
                    );
                    continue;
                }
            }
            if once {
                fired_once.push(seq);
            }
            if let Err(err) = (callback)(self) {
                if let Some(rt) = &rt {
                    rt.capture_error(self.id, err, ErrorPhase::Hook(phase));
                } else {
                    log::error!("hook error on {} with no runtime: {}", self.def.name, err);
                }
            }
        }

        if !fired_once.is_empty() {
            if let Some(list) = self.hooks.borrow_mut().get_mut(&phase) {
                list.retain(|e| !fired_once.contains(&e.seq));
            }
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Create an inline effect owned by this instance. Errors are reported
    /// with phase `effect`; the instance is not unmounted. The effect is
    /// disposed automatically on unmount.
    pub fn effect(
        &self,
        mut f: impl FnMut(&Scope) -> Result<(), RenderError> + 'static,
    ) -> Effect {
        let scope = self.handle();
        let handle = crate::reactive::effect(move || {
            if let Err(err) = f(&scope) {
                if let Some(rt) = scope.rt() {
                    rt.capture_error(scope.id, err, ErrorPhase::Effect);
                }
            }
        });
        self.disposers.borrow_mut().push(handle.clone());
        handle
    }

    /// Register a teardown to run when the instance unmounts.
    pub fn add_cleanup(&self, f: impl FnOnce() + 'static) {
        self.cleanups.borrow_mut().push(Box::new(f));
    }

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------

    /// Expose a value to this instance's descendants.
    pub fn provide_context(&self, context: &Context, value: impl Into<StateValue>) {
        crate::context::provide(&self.handle(), context, value.into());
    }

    /// Look up the nearest provider's value, or the context's default.
    pub fn consume_context(&self, context: &Context) -> Option<StateValue> {
        crate::context::consume(&self.handle(), context, None, None)
    }

    /// Like [`Scope::consume_context`] with a selector deriving the watched
    /// value and an optional comparator deciding when it changed.
    pub fn consume_context_with(
        &self,
        context: &Context,
        selector: ContextSelector,
        comparator: Option<ContextComparator>,
    ) -> Option<StateValue> {
        crate::context::consume(&self.handle(), context, Some(selector), comparator)
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    /// Invoke a capability through the registry. Success is cached per
    /// capability id until unmount; failure is reported with phase
    /// `fenestrate:<id>` and yields `None`.
    pub fn fenestrate(&self, capability: &str, args: &[StateValue]) -> Option<StateValue> {
        if let Some(cached) = self.capability_cache.borrow().get(capability) {
            return Some(cached.clone());
        }

        let rt = self.rt()?;
        let result = rt.pierce(&self.handle(), capability, args)?;
        self.finish_pierce(capability, result, &rt)
    }

    /// Async variant. Resolution after unmount is a no-op yielding `None`.
    pub fn fenestrate_async(
        &self,
        capability: &str,
        args: Vec<StateValue>,
    ) -> LocalBoxFuture<'static, Option<StateValue>> {
        let scope = self.handle();
        let capability = capability.to_string();
        Box::pin(async move {
            if let Some(cached) = scope.capability_cache.borrow().get(&capability) {
                return Some(cached.clone());
            }
            let rt = scope.rt()?;
            let fut = rt.pierce_async(&scope, &capability, &args)?;
            let result = fut.await;
            if !scope.mounted.get() {
                return None;
            }
            scope.finish_pierce(&capability, result, &rt)
        })
    }

    fn finish_pierce(
        &self,
        capability: &str,
        result: CapabilityResult,
        rt: &Rc<Runtime>,
    ) -> Option<StateValue> {
        if result.success {
            self.capability_cache
                .borrow_mut()
                .insert(capability.to_string(), result.data.clone());
            Some(result.data)
        } else {
            let message = result
                .error
                .unwrap_or_else(|| format!("capability {:?} failed", capability));
            rt.capture_error(
                self.id,
                RenderError::new(message),
                ErrorPhase::Fenestrate(capability.to_string()),
            );
            None
        }
    }

    // ------------------------------------------------------------------
    // Error boundary surface
    // ------------------------------------------------------------------

    /// The error this boundary currently holds, if any.
    pub fn captured_error(&self) -> Option<CapturedError> {
        self.error.borrow().clone()
    }

    /// Clear the captured error and re-run children from scratch.
    pub fn reset_error_boundary(&self) {
        if self.error.borrow_mut().take().is_some() {
            self.needs_update();
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Dispose effects, run cleanups, drop caches. Called while unmounting,
    /// after `beforeUnmount` hooks and before DOM detach.
    pub(crate) fn teardown(&self) {
        self.render_effect.dispose();
        for disposer in self.disposers.borrow_mut().drain(..) {
            disposer.dispose();
        }
        for cleanup in self.cleanups.borrow_mut().drain(..) {
            cleanup();
        }
        self.capability_cache.borrow_mut().clear();
        self.contexts.borrow_mut().clear();
        self.mounted.set(false);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("name", &self.def.name)
            .field("height", &self.height)
            .field("generation", &self.generation.get())
            .finish()
    }
}
