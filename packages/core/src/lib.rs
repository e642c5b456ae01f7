#![doc = include_str!("../README.md")]

pub(crate) mod capability;
pub(crate) mod context;
pub(crate) mod devtools;
pub(crate) mod diff;
pub(crate) mod dom;
pub(crate) mod error_boundary;
pub(crate) mod events;
pub(crate) mod factory;
pub(crate) mod nodes;
pub(crate) mod reactive;
pub(crate) mod runtime;
pub(crate) mod scheduler;
pub(crate) mod scopes;
pub(crate) mod values;
pub(crate) mod virtual_dom;

pub(crate) mod innerlude {
    pub use crate::capability::*;
    pub use crate::context::*;
    pub use crate::devtools::*;
    pub use crate::diff::*;
    pub use crate::dom::*;
    pub use crate::error_boundary::*;
    pub use crate::events::*;
    pub use crate::factory::*;
    pub use crate::nodes::*;
    pub use crate::reactive::*;
    pub(crate) use crate::runtime::*;
    pub use crate::scheduler::SchedulerMsg;
    pub(crate) use crate::scheduler::{CommitThrottle, DirtyScope};
    pub use crate::scopes::*;
    pub use crate::values::*;
    pub use crate::virtual_dom::*;
}

pub use crate::innerlude::{
    clear_uncaught_handlers, component, create_context, effect, el, fragment, on_uncaught_error,
    reactive, render_to_dom, subscriber_count, text, untrack, value_map, AnyValue, AttributeValue, CapabilityContext, CapabilityRegistry,
    CapabilityResult, CapturedError, CommitError, Component, ComponentBuilder, ComponentDef,
    Context, ContextComparator, ContextKey, ContextSelector, DevtoolsBridge, DomNode, Effect,
    Element, ElementBuilder, ElementId, ErrorPhase, Event, EventCallback, HookOptions, HostError,
    LifecyclePhase, Reactive, ReactiveCell, RealDom, RenderError, RenderResult, Scope, ScopeId,
    SchedulerMsg, StateValue, UserEvent, VComponent, VElement, VNode, VPlaceholder, VText,
    VirtualDom, FRAGMENT_TAG, PRESERVE_CHILDREN,
};

pub mod prelude {
    pub use crate::innerlude::{
        component, create_context, effect, el, fragment, reactive, text, untrack, AttributeValue,
        CapabilityResult, CapturedError, Component, ComponentDef, Context, Element, ElementId,
        ErrorPhase, Event, EventCallback, HookOptions, LifecyclePhase, RenderError, RenderResult,
        Scope, ScopeId, StateValue, VNode, VirtualDom, FRAGMENT_TAG, PRESERVE_CHILDREN,
    };
}

pub mod exports {
    //! Important dependencies that are used by the rest of the library.
    //! Feel free to just add the dependencies in your own Cargo.toml.
    pub use futures_channel;
    pub use futures_util;
    pub use indexmap;
}
