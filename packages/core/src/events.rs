//! User events and their dispatch through the listener side table.
//!
//! The host hands the framework a [`UserEvent`] naming the event and the
//! element it hit. Dispatch wraps it in an [`Event`] object and walks the
//! bubble path towards the document root, invoking each bound listener until
//! one stops propagation.

use crate::innerlude::*;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

/// A listener bound into the side table. Clones share the callback.
#[derive(Clone)]
pub struct EventCallback {
    inner: Rc<RefCell<dyn FnMut(&Event)>>,
}

impl EventCallback {
    pub fn new(f: impl FnMut(&Event) + 'static) -> Self {
        EventCallback {
            inner: Rc::new(RefCell::new(f)),
        }
    }

    pub fn call(&self, event: &Event) {
        (self.inner.borrow_mut())(event);
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventCallback").finish()
    }
}

/// A raw event as delivered by the host.
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub name: String,
    pub element: ElementId,
    pub data: StateValue,
}

impl UserEvent {
    pub fn new(name: impl Into<String>, element: ElementId) -> Self {
        UserEvent {
            name: name.into(),
            element,
            data: StateValue::Null,
        }
    }

    pub fn with_data(mut self, data: impl Into<StateValue>) -> Self {
        self.data = data.into();
        self
    }
}

/// The event object listeners receive while it bubbles.
pub struct Event {
    name: String,
    data: StateValue,
    target: ElementId,
    current: Cell<ElementId>,
    stopped: Cell<bool>,
}

impl Event {
    pub fn new(user: &UserEvent) -> Self {
        Event {
            name: user.name.clone(),
            data: user.data.clone(),
            target: user.element,
            current: Cell::new(user.element),
            stopped: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &StateValue {
        &self.data
    }

    /// The element the event was originally delivered to.
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// The element whose listener is currently running.
    pub fn current_target(&self) -> ElementId {
        self.current.get()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Bubble `event` from its target to the document root, invoking bound
/// listeners. Returns whether any listener ran.
pub(crate) fn dispatch_event(dom: &RealDom, user: &UserEvent) -> bool {
    let event = Event::new(user);
    let mut handled = false;

    for id in dom.path_to_root(user.element) {
        if event.propagation_stopped() {
            break;
        }
        if let Some(listener) = dom.listener(id, &event.name) {
            event.current.set(id);
            listener.call(&event);
            handled = true;
        }
    }

    if !handled {
        log::warn!(
            "an event {:?} was triggered on {} but there was no listener to handle it",
            user.name,
            user.element
        );
    }

    handled
}
