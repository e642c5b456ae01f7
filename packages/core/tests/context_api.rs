//! Context: parent-chain lookup, defaults, and the subscription mode that
//! re-renders exactly the consumers whose derived value changed.

use casement_core::prelude::*;
use std::cell::RefCell;

thread_local! {
    static THEME: Context = Context::with_default("theme", 0);
    static RENDERS: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
}

fn note(name: &'static str) {
    RENDERS.with(|r| r.borrow_mut().push(name));
}

fn take_renders() -> Vec<&'static str> {
    RENDERS.with(|r| r.borrow_mut().drain(..).collect())
}

static CONSUMER: ComponentDef = ComponentDef::new("Consumer", |scope| {
    note("consumer");
    let value = THEME
        .with(|ctx| scope.consume_context(ctx))
        .unwrap_or(StateValue::Null);
    Ok(Some(el("output").child(text(value)).build()))
});

static BYSTANDER: ComponentDef = ComponentDef::new("Bystander", |_| {
    note("bystander");
    Ok(Some(el("aside").child(text("static")).build()))
});

static PROVIDER: ComponentDef = ComponentDef::new("Provider", |scope| {
    note("provider");
    let value = scope.state().get("value");
    THEME.with(|ctx| scope.provide_context(ctx, value));
    Ok(Some(
        el("div")
            .child(component(&CONSUMER).build())
            .child(component(&BYSTANDER).build())
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("value", 1);
});

#[test]
fn provider_updates_rerender_only_consumers() {
    let mut dom = VirtualDom::new(&PROVIDER);
    dom.rebuild().unwrap();

    let real = dom.dom();
    assert_eq!(
        real.inner_html(&real.root()),
        "<div><output>1</output><aside>static</aside></div>"
    );
    assert_eq!(take_renders(), ["provider", "consumer", "bystander"]);

    dom.base_scope().unwrap().set_state([("value", 2)]);
    dom.flush_frame();

    assert_eq!(
        real.inner_html(&real.root()),
        "<div><output>2</output><aside>static</aside></div>"
    );
    // The provider re-rendered (its state changed) and the consumer
    // re-rendered exactly once; the bystander did not run at all.
    assert_eq!(take_renders(), ["provider", "consumer"]);
}

static ORPHAN: ComponentDef = ComponentDef::new("Orphan", |scope| {
    let value = THEME
        .with(|ctx| scope.consume_context(ctx))
        .unwrap_or(StateValue::Null);
    Ok(Some(el("output").child(text(value)).build()))
});

#[test]
fn missing_provider_falls_back_to_the_default() {
    let mut dom = VirtualDom::new(&ORPHAN);
    dom.rebuild().unwrap();

    let real = dom.dom();
    assert_eq!(real.inner_html(&real.root()), "<output>0</output>");
}

thread_local! {
    static SETTINGS: Context = Context::new("settings");
}

static SELECTIVE_CONSUMER: ComponentDef = ComponentDef::new("SelectiveConsumer", |scope| {
    note("selective");
    // Watch only the `size` entry of the settings map.
    let settings = SETTINGS.with(|ctx| {
        scope.consume_context_with(
            ctx,
            std::rc::Rc::new(|value: &StateValue| match value {
                StateValue::Map(map) => map.get("size").cloned().unwrap_or(StateValue::Null),
                _ => StateValue::Null,
            }),
            None,
        )
    });
    let size = match settings {
        Some(StateValue::Map(map)) => map.get("size").cloned().unwrap_or(StateValue::Null),
        _ => StateValue::Null,
    };
    Ok(Some(el("output").child(text(size)).build()))
});

static SELECTIVE_PROVIDER: ComponentDef = ComponentDef::new("SelectiveProvider", |scope| {
    let size = scope.state().get("size");
    let color = scope.state().get("color");
    SETTINGS.with(|ctx| {
        scope.provide_context(
            ctx,
            casement_core::value_map([("size", size), ("color", color)]),
        )
    });
    Ok(Some(component(&SELECTIVE_CONSUMER).build()))
})
.with_setup(|scope| {
    scope.state().declare("size", 12);
    scope.state().declare("color", "red");
});

#[test]
fn selector_subscriptions_ignore_unrelated_changes() {
    let mut dom = VirtualDom::new(&SELECTIVE_PROVIDER);
    dom.rebuild().unwrap();
    take_renders();

    // A change the selector does not project: consumer stays quiet.
    dom.base_scope().unwrap().set_state([("color", "blue")]);
    dom.flush_frame();
    assert!(!take_renders().contains(&"selective"));

    // A projected change re-renders the consumer.
    dom.base_scope().unwrap().set_state([("size", 14)]);
    dom.flush_frame();
    assert!(take_renders().contains(&"selective"));
}
