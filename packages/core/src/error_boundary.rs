//! Process-wide error surface and the capture re-entrancy guard.
//!
//! Boundary capture itself is driven by the runtime (it owns the parent
//! links); this module holds the pieces that outlive any one virtual dom:
//! the uncaught-error handler list and the guard that swallows errors
//! raised while another error is already being handled, preventing
//! capture→hook→capture recursion.

use crate::innerlude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

thread_local! {
    static UNCAUGHT_HANDLERS: RefCell<Vec<Rc<dyn Fn(&CapturedError)>>> = RefCell::new(Vec::new());
    static CAPTURING: Cell<bool> = Cell::new(false);
}

/// Register a handler for errors no boundary captured. Handlers stay for
/// the life of the thread.
pub fn on_uncaught_error(f: impl Fn(&CapturedError) + 'static) {
    UNCAUGHT_HANDLERS.with(|handlers| handlers.borrow_mut().push(Rc::new(f)));
}

/// Drop all registered uncaught-error handlers. Test support.
pub fn clear_uncaught_handlers() {
    UNCAUGHT_HANDLERS.with(|handlers| handlers.borrow_mut().clear());
}

pub(crate) fn dispatch_uncaught(error: &CapturedError) {
    let handlers: Vec<Rc<dyn Fn(&CapturedError)>> =
        UNCAUGHT_HANDLERS.with(|handlers| handlers.borrow().clone());
    if handlers.is_empty() {
        log::error!("uncaught error: {}", error);
        return;
    }
    for handler in handlers {
        handler(error);
    }
}

/// Entered for the duration of one `capture_error`. A second error raised
/// while a capture is in flight is swallowed.
pub(crate) struct CaptureGuard;

impl CaptureGuard {
    pub(crate) fn enter() -> Option<CaptureGuard> {
        if CAPTURING.with(|c| c.replace(true)) {
            return None;
        }
        Some(CaptureGuard)
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURING.with(|c| c.set(false));
    }
}
