//! Ambient values looked up the instance chain by symbol key.
//!
//! A provider stores the value on its own scope; consumers walk parent links
//! to the nearest provider or fall back to the context's registered default.
//!
//! Subscription mode (on by default, disabled with
//! `CASEMENT_CONTEXT_SUBSCRIBE=0`) records which instances read each key. A
//! later `provide` of a changed value re-renders exactly the consumers whose
//! selector-derived value differs - siblings that never consumed stay
//! untouched. Subscriptions die with the consumer through its cleanup
//! registry.

use crate::innerlude::*;
use once_cell::sync::Lazy;
use std::{
    cell::Cell,
    fmt,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

static SUBSCRIPTIONS_ENABLED: Lazy<bool> = Lazy::new(|| {
    match std::env::var("CASEMENT_CONTEXT_SUBSCRIBE") {
        Ok(v) => !matches!(v.as_str(), "0" | "false" | "off"),
        Err(_) => true,
    }
});

pub(crate) fn subscriptions_enabled() -> bool {
    *SUBSCRIPTIONS_ENABLED
}

/// The symbol identifying one context. Every [`Context::new`] call mints a
/// fresh key, so two contexts never collide even when they share a name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextKey(u64);

/// Derives the watched value from the provided one.
pub type ContextSelector = Rc<dyn Fn(&StateValue) -> StateValue>;

/// Decides whether two derived values are equal; `true` means unchanged.
pub type ContextComparator = Rc<dyn Fn(&StateValue, &StateValue) -> bool>;

/// A context handle: symbol key, debug name and optional default.
#[derive(Clone)]
pub struct Context {
    key: ContextKey,
    name: &'static str,
    default: Option<StateValue>,
}

impl Context {
    pub fn new(name: &'static str) -> Self {
        Context {
            key: ContextKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed)),
            name,
            default: None,
        }
    }

    pub fn with_default(name: &'static str, default: impl Into<StateValue>) -> Self {
        Context {
            key: ContextKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed)),
            name,
            default: Some(default.into()),
        }
    }

    pub fn key(&self) -> ContextKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

/// Create a context with no default.
pub fn create_context(name: &'static str) -> Context {
    Context::new(name)
}

pub(crate) struct Subscription {
    scope: ScopeId,
    target: Weak<Scope>,
    selector: Option<ContextSelector>,
    comparator: Option<ContextComparator>,
    last_seen: StateValue,
    alive: Rc<Cell<bool>>,
}

/// A value provided on one scope, plus its recorded consumers.
pub(crate) struct ProvidedContext {
    pub(crate) value: StateValue,
    subscribers: Vec<Subscription>,
}

pub(crate) fn provide(scope: &Rc<Scope>, context: &Context, value: StateValue) {
    let mut contexts = scope.contexts.borrow_mut();
    match contexts.get_mut(&context.key()) {
        Some(entry) => {
            if entry.value == value {
                return;
            }
            entry.value = value.clone();
            entry.subscribers.retain(|sub| sub.alive.get());
            for sub in entry.subscribers.iter_mut() {
                let derived = match &sub.selector {
                    Some(selector) => selector(&value),
                    None => value.clone(),
                };
                let unchanged = match &sub.comparator {
                    Some(cmp) => cmp(&derived, &sub.last_seen),
                    None => derived == sub.last_seen,
                };
                if unchanged {
                    continue;
                }
                sub.last_seen = derived;
                log::trace!(
                    "context {:?} update re-renders consumer {:?}",
                    context.name(),
                    sub.scope
                );
                if let Some(consumer) = sub.target.upgrade() {
                    consumer.needs_update();
                }
            }
        }
        None => {
            contexts.insert(
                context.key(),
                ProvidedContext {
                    value,
                    subscribers: Vec::new(),
                },
            );
        }
    }
}

pub(crate) fn consume(
    scope: &Rc<Scope>,
    context: &Context,
    selector: Option<ContextSelector>,
    comparator: Option<ContextComparator>,
) -> Option<StateValue> {
    let mut cursor = Some(scope.clone());
    while let Some(provider) = cursor {
        let value = provider
            .contexts
            .borrow()
            .get(&context.key())
            .map(|entry| entry.value.clone());

        if let Some(value) = value {
            if subscriptions_enabled() && provider.id != scope.id {
                subscribe(scope, &provider, context, &value, selector, comparator);
            }
            return Some(value);
        }
        cursor = provider.parent();
    }

    context.default.clone()
}

fn subscribe(
    consumer: &Rc<Scope>,
    provider: &Rc<Scope>,
    context: &Context,
    value: &StateValue,
    selector: Option<ContextSelector>,
    comparator: Option<ContextComparator>,
) {
    let mut contexts = provider.contexts.borrow_mut();
    let Some(entry) = contexts.get_mut(&context.key()) else {
        return;
    };

    let derived = match &selector {
        Some(sel) => sel(value),
        None => value.clone(),
    };

    // A consumer re-reads on every render; refresh rather than duplicate.
    if let Some(existing) = entry
        .subscribers
        .iter_mut()
        .find(|sub| sub.scope == consumer.id && sub.alive.get())
    {
        existing.last_seen = derived;
        existing.selector = selector;
        existing.comparator = comparator;
        return;
    }

    let alive = Rc::new(Cell::new(true));
    entry.subscribers.push(Subscription {
        scope: consumer.id,
        target: Rc::downgrade(consumer),
        selector,
        comparator,
        last_seen: derived,
        alive: alive.clone(),
    });

    consumer.add_cleanup(move || alive.set(false));
}

/// Count of live subscriptions on a provider for one context. Test support.
pub fn subscriber_count(provider: &Rc<Scope>, context: &Context) -> usize {
    provider
        .contexts
        .borrow()
        .get(&context.key())
        .map(|entry| entry.subscribers.iter().filter(|s| s.alive.get()).count())
        .unwrap_or(0)
}
