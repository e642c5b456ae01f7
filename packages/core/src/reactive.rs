//! Fine-grained reactivity: cells, effects and dependency tracking.
//!
//! Each mutable state field of a component is a [`ReactiveCell`]: a current
//! value plus the set of effects that read it during their last run. Reads
//! performed while an effect is executing subscribe that effect; writes that
//! change the value (by [`StateValue`] equality) notify subscribers.
//!
//! Two kinds of effect exist. *Inline* effects own a closure and re-run it
//! synchronously when a dependency changes. *Render* effects belong to a
//! component instance and never run user code themselves - a write to one of
//! their dependencies marks the instance dirty and hands it to the scheduler,
//! which dedups one render per instance per frame.
//!
//! The currently-running effect is a thread-local stack, which keeps nested
//! effects from leaking their reads into the enclosing effect's dependency
//! set. Before any re-run, an effect clears its previous dependencies, so a
//! dependency set is always exactly the cells read by the last execution.

use crate::innerlude::*;
use futures_channel::mpsc::UnboundedSender;
use fxhash::FxHashMap;
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

thread_local! {
    // `None` entries are untrack markers: capture is suppressed until a
    // deeper effect begins.
    static EFFECT_STACK: RefCell<Vec<Option<Rc<EffectInner>>>> = RefCell::new(Vec::new());
}

/// The effect currently capturing reads, if any.
pub(crate) fn current_effect() -> Option<Rc<EffectInner>> {
    EFFECT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

fn is_current(effect: &Rc<EffectInner>) -> bool {
    current_effect()
        .map(|top| Rc::ptr_eq(&top, effect))
        .unwrap_or(false)
}

/// Run `f` with dependency capture suppressed.
///
/// Reads inside `f` add no subscriptions even when called from inside an
/// effect, but an effect started inside `f` tracks normally. The reconciler
/// wraps host mutation in this so mirroring a value into an attribute never
/// subscribes the render effect to it.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    EFFECT_STACK.with(|stack| stack.borrow_mut().push(None));
    let out = f();
    EFFECT_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
    out
}

pub(crate) enum EffectKind {
    /// Owns user code; re-runs synchronously on change.
    Inline(RefCell<Option<Box<dyn FnMut()>>>),
    /// Marks a component instance dirty; the scheduler performs the render.
    Render {
        scope: ScopeId,
        sender: UnboundedSender<SchedulerMsg>,
    },
}

pub(crate) struct EffectInner {
    pub(crate) kind: EffectKind,
    deps: RefCell<Vec<Weak<ReactiveCell>>>,
    dirty: Cell<bool>,
    disposed: Cell<bool>,
}

impl EffectInner {
    fn new(kind: EffectKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            deps: RefCell::new(Vec::new()),
            dirty: Cell::new(false),
            disposed: Cell::new(false),
        })
    }

    /// Drop every subscription from the last run. Called before each re-run
    /// so dependency sets never accumulate stale entries.
    pub(crate) fn clear_dependencies(self: &Rc<Self>) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps {
            if let Some(cell) = dep.upgrade() {
                cell.remove_subscriber(self);
            }
        }
    }

    fn track_dependency(self: &Rc<Self>, cell: &Rc<ReactiveCell>) {
        let mut deps = self.deps.borrow_mut();
        let already = deps
            .iter()
            .any(|w| w.as_ptr() == Rc::as_ptr(cell));
        if !already {
            deps.push(Rc::downgrade(cell));
        }
    }

    /// Re-execute an inline effect, retracking its reads.
    fn rerun(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        let EffectKind::Inline(slot) = &self.kind else {
            return;
        };

        self.clear_dependencies();
        self.dirty.set(false);

        // Take the closure out while it runs so a re-entrant notification
        // cannot alias the borrow.
        let mut func = slot.borrow_mut().take();
        if let Some(f) = func.as_mut() {
            EFFECT_STACK.with(|stack| stack.borrow_mut().push(Some(self.clone())));
            f();
            EFFECT_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
        if !self.disposed.get() {
            *slot.borrow_mut() = func;
        }
    }

    pub(crate) fn dependency_count(&self) -> usize {
        self.deps.borrow().len()
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(crate) fn clear_dirty(&self) {
        self.dirty.set(false);
    }
}

/// Handle to a running effect. Cloning shares the effect.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    pub(crate) fn new_inline(f: impl FnMut() + 'static) -> Self {
        let inner = EffectInner::new(EffectKind::Inline(RefCell::new(Some(Box::new(f)))));
        inner.rerun();
        Effect { inner }
    }

    pub(crate) fn new_render(scope: ScopeId, sender: UnboundedSender<SchedulerMsg>) -> Self {
        Effect {
            inner: EffectInner::new(EffectKind::Render { scope, sender }),
        }
    }

    /// Remove this effect from every subscriber set and drop its closure.
    /// Safe to call more than once.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.clear_dependencies();
        if let EffectKind::Inline(slot) = &self.inner.kind {
            slot.borrow_mut().take();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of cells this effect currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependency_count()
    }

    pub(crate) fn inner(&self) -> &Rc<EffectInner> {
        &self.inner
    }
}

/// Run `f` immediately, capturing every cell read as a dependency, and
/// re-run it whenever one of those cells changes. The returned handle's
/// [`Effect::dispose`] idempotently tears the subscriptions down.
pub fn effect(f: impl FnMut() + 'static) -> Effect {
    Effect::new_inline(f)
}

/// Run `f` with `render_effect` as the capturing effect, replacing the
/// effect's previous dependency set with exactly the cells `f` reads.
pub(crate) fn run_with_effect<R>(render_effect: &Rc<EffectInner>, f: impl FnOnce() -> R) -> R {
    render_effect.clear_dependencies();
    render_effect.clear_dirty();
    EFFECT_STACK.with(|stack| stack.borrow_mut().push(Some(render_effect.clone())));
    let out = f();
    EFFECT_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
    out
}

/// One mutable state field: current value plus subscriber set.
pub struct ReactiveCell {
    name: String,
    value: RefCell<StateValue>,
    subscribers: RefCell<Vec<Weak<EffectInner>>>,
}

impl ReactiveCell {
    fn new(name: String, value: StateValue) -> Rc<Self> {
        Rc::new(Self {
            name,
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the value, subscribing the active effect if there is one.
    pub fn read(self: &Rc<Self>) -> StateValue {
        if let Some(effect) = current_effect() {
            self.add_subscriber(&effect);
            effect.track_dependency(self);
        }
        self.value.borrow().clone()
    }

    /// Read without subscribing anything.
    pub fn peek(&self) -> StateValue {
        self.value.borrow().clone()
    }

    /// Write the value, notifying subscribers when it actually changed.
    pub fn write(self: &Rc<Self>, new: StateValue) {
        if *self.value.borrow() == new {
            return;
        }
        *self.value.borrow_mut() = new;
        self.notify();
    }

    fn add_subscriber(&self, effect: &Rc<EffectInner>) {
        let mut subs = self.subscribers.borrow_mut();
        let already = subs
            .iter()
            .any(|w| w.as_ptr() == Rc::as_ptr(effect));
        if !already {
            subs.push(Rc::downgrade(effect));
        }
    }

    pub(crate) fn remove_subscriber(&self, effect: &Rc<EffectInner>) {
        self.subscribers
            .borrow_mut()
            .retain(|w| w.as_ptr() != Rc::as_ptr(effect));
    }

    fn notify(self: &Rc<Self>) {
        // Snapshot: effects resubscribe while they run.
        let subs: Vec<Weak<EffectInner>> = self.subscribers.borrow().clone();
        for weak in subs {
            let Some(effect) = weak.upgrade() else {
                continue;
            };
            if effect.disposed.get() {
                continue;
            }
            // A write from inside the effect's own execution must not re-run
            // it synchronously; the dirty flag leaves it to the scheduler.
            if is_current(&effect) {
                effect.mark_dirty();
                continue;
            }
            match &effect.kind {
                EffectKind::Inline(_) => effect.rerun(),
                EffectKind::Render { scope, sender } => {
                    effect.mark_dirty();
                    log::trace!("cell {:?} invalidated {:?}", self.name, scope);
                    let _ = sender.unbounded_send(SchedulerMsg::Immediate(*scope));
                }
            }
        }
        self.subscribers
            .borrow_mut()
            .retain(|w| w.strong_count() > 0);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn has_subscriber(&self, effect: &Effect) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|w| w.as_ptr() == Rc::as_ptr(effect.inner()))
    }
}

struct ReactiveInner {
    cells: RefCell<FxHashMap<String, Rc<ReactiveCell>>>,
    sealed: Cell<bool>,
}

/// A component instance's reactive state: a map of named cells.
///
/// The map is open while the instance initialises and sealed afterwards;
/// writes to unknown fields on a sealed map are rejected with a warning so a
/// typo cannot silently grow state.
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ReactiveInner>,
}

impl Default for Reactive {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactive {
    pub fn new() -> Self {
        Reactive {
            inner: Rc::new(ReactiveInner {
                cells: RefCell::new(FxHashMap::default()),
                sealed: Cell::new(false),
            }),
        }
    }

    /// Declare a field with its initial value. Re-declaring resets the value
    /// without notifying - declaration is not a reactive write.
    pub fn declare(&self, key: impl Into<String>, value: impl Into<StateValue>) {
        let key = key.into();
        if self.inner.sealed.get() {
            log::warn!("declare of {:?} after state was sealed; ignored", key);
            return;
        }
        let cell = ReactiveCell::new(key.clone(), value.into());
        self.inner.cells.borrow_mut().insert(key, cell);
    }

    /// Read a field, subscribing the active effect.
    pub fn get(&self, key: &str) -> StateValue {
        match self.cell(key) {
            Some(cell) => cell.read(),
            None => {
                if !self.inner.sealed.get() {
                    // Implicit declaration keeps first-read-then-write
                    // ordering working during setup.
                    self.declare(key, StateValue::Null);
                    return self.cell(key).expect("cell just declared").read();
                }
                log::debug!("read of undeclared state field {:?}", key);
                StateValue::Null
            }
        }
    }

    /// Write a field, notifying subscribers if the value changed.
    pub fn set(&self, key: &str, value: impl Into<StateValue>) {
        match self.cell(key) {
            Some(cell) => cell.write(value.into()),
            None if !self.inner.sealed.get() => {
                self.declare(key, value);
            }
            None => {
                log::warn!("write to undeclared state field {:?} on sealed state; dropped", key);
            }
        }
    }

    pub fn cell(&self, key: &str) -> Option<Rc<ReactiveCell>> {
        self.inner.cells.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.cells.borrow().contains_key(key)
    }

    /// Close the map to new fields. Called once setup finishes.
    pub fn seal(&self) {
        self.inner.sealed.set(true);
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.get()
    }

    pub fn len(&self) -> usize {
        self.inner.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cells.borrow().is_empty()
    }
}

/// Build a reactive map from key/value pairs.
pub fn reactive<K: Into<String>, V: Into<StateValue>>(
    pairs: impl IntoIterator<Item = (K, V)>,
) -> Reactive {
    let state = Reactive::new();
    for (k, v) in pairs {
        state.declare(k, v);
    }
    state
}
