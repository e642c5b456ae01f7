//! The devtools bridge boundary.
//!
//! The core only emits; an external bridge consumes. Emission is off by
//! default and turns on when the `CASEMENT_DEVTOOLS` environment variable is
//! set or a bridge is installed explicitly.

use crate::innerlude::*;
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::rc::Rc;

static ENV_ENABLED: Lazy<bool> = Lazy::new(|| {
    match std::env::var("CASEMENT_DEVTOOLS") {
        Ok(v) => !matches!(v.as_str(), "" | "0" | "false" | "off"),
        Err(_) => false,
    }
});

thread_local! {
    static BRIDGE: RefCell<Option<Rc<dyn DevtoolsBridge>>> = RefCell::new(None);
    static FORCED: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

/// The global enable flag. Emission stays off until this is called or the
/// `CASEMENT_DEVTOOLS` environment variable is set.
pub fn enable_devtools() {
    FORCED.with(|f| f.set(true));
}

pub fn devtools_enabled() -> bool {
    *ENV_ENABLED || FORCED.with(|f| f.get())
}

/// Consumed by an external devtools frontend; the core never implements it
/// beyond the implicit no-op of having no bridge installed.
pub trait DevtoolsBridge {
    fn component_mounted(&self, scope: ScopeId, name: &str);
    fn component_updated(&self, scope: ScopeId, name: &str);
    fn component_unmounted(&self, scope: ScopeId, name: &str);

    /// Typed event recording.
    fn record_event(&self, name: &str, payload: &StateValue);

    /// Untyped recording for ad-hoc probes.
    fn record(&self, message: &str) {
        self.record_event(message, &StateValue::Null);
    }
}

/// Install a bridge. Events only flow once devtools are also enabled.
pub fn set_devtools_bridge(bridge: Rc<dyn DevtoolsBridge>) {
    BRIDGE.with(|slot| *slot.borrow_mut() = Some(bridge));
}

pub fn clear_devtools_bridge() {
    BRIDGE.with(|slot| *slot.borrow_mut() = None);
}

fn with_bridge(f: impl FnOnce(&Rc<dyn DevtoolsBridge>)) {
    if !devtools_enabled() {
        return;
    }
    BRIDGE.with(|slot| {
        if let Some(bridge) = slot.borrow().as_ref() {
            f(bridge);
        }
    });
}

pub(crate) fn emit_mounted(scope: ScopeId, name: &str) {
    with_bridge(|bridge| bridge.component_mounted(scope, name));
}

pub(crate) fn emit_updated(scope: ScopeId, name: &str) {
    with_bridge(|bridge| bridge.component_updated(scope, name));
}

pub(crate) fn emit_unmounted(scope: ScopeId, name: &str) {
    with_bridge(|bridge| bridge.component_unmounted(scope, name));
}
