//! Scheduling: root coalescing, synchronous child commits, and the
//! runaway-update throttle.

use casement_core::prelude::*;

static CHILD: ComponentDef = ComponentDef::new("Child", |scope| {
    let n = scope.state().get("n").as_int().unwrap_or(0);
    let state = scope.state().clone();
    Ok(Some(
        el("button")
            .on("click", move |_| {
                let current = state.get("n").as_int().unwrap_or(0);
                state.set("n", current + 1);
            })
            .child(text(n))
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("n", 0);
});

static PARENT: ComponentDef = ComponentDef::new("Parent", |_| {
    Ok(Some(el("main").child(component(&CHILD).build()).build()))
});

#[test]
fn children_with_attached_dom_commit_synchronously() {
    let mut dom = VirtualDom::new(&PARENT);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let button = real.root().children()[0].children()[0].clone();

    // No flush_frame: the child committed during event handling.
    dom.handle_event("click", button.id());
    assert_eq!(button.text_content(), "1");
}

static ROOT_COUNTER: ComponentDef = ComponentDef::new("RootCounter", |scope| {
    let n = scope.state().get("n").as_int().unwrap_or(0);
    Ok(Some(el("output").child(text(n)).build()))
})
.with_setup(|scope| {
    scope.state().declare("n", 0);
});

#[test]
fn root_writes_coalesce_to_the_frame() {
    let mut dom = VirtualDom::new(&ROOT_COUNTER);
    dom.rebuild().unwrap();

    let scope = dom.base_scope().unwrap();
    let generation = scope.generation();

    // Multiple writes within one turn, no frame yet: nothing committed.
    scope.set_state([("n", 1)]);
    scope.set_state([("n", 2)]);
    scope.set_state([("n", 3)]);
    dom.process_messages();
    assert_eq!(scope.generation(), generation);

    dom.flush_frame();
    assert_eq!(scope.generation(), generation + 1);
    let real = dom.dom();
    assert_eq!(real.inner_html(&real.root()), "<output>3</output>");
}

#[test]
fn runaway_updates_are_throttled() {
    let mut dom = VirtualDom::new(&ROOT_COUNTER);
    dom.rebuild().unwrap();

    let scope = dom.base_scope().unwrap();
    for round in 0..200 {
        scope.set_state([("n", round)]);
        dom.flush_frame();
    }

    // The rolling window admits 60 commits per second; the rest of the
    // burst was dropped instead of spinning.
    assert!(scope.generation() <= 61);
}
