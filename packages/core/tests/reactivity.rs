//! Reactivity invariants: dependency exactness, equality gating, untrack
//! isolation, and conditional-dependency resubscription.

use casement_core::prelude::*;
use casement_core::{effect, reactive, untrack};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn dependency_sets_are_exact() {
    let state = reactive([("a", 1), ("b", 2), ("c", 3)]);

    let handle = {
        let state = state.clone();
        effect(move || {
            let _ = state.get("a");
            let _ = state.get("b");
        })
    };

    assert_eq!(handle.dependency_count(), 2);
    assert!(state.cell("a").unwrap().has_subscriber(&handle));
    assert!(state.cell("b").unwrap().has_subscriber(&handle));
    assert!(!state.cell("c").unwrap().has_subscriber(&handle));

    handle.dispose();
    assert_eq!(handle.dependency_count(), 0);
    assert!(!state.cell("a").unwrap().has_subscriber(&handle));
    assert!(!state.cell("b").unwrap().has_subscriber(&handle));

    // Disposal is idempotent.
    handle.dispose();
    assert!(handle.is_disposed());
}

#[test]
fn equal_writes_trigger_nothing() {
    let state = reactive([("n", 7)]);
    let runs = Rc::new(Cell::new(0));

    let _handle = {
        let state = state.clone();
        let runs = runs.clone();
        effect(move || {
            let _ = state.get("n");
            runs.set(runs.get() + 1);
        })
    };
    assert_eq!(runs.get(), 1);

    state.set("n", 7);
    assert_eq!(runs.get(), 1);

    state.set("n", 8);
    assert_eq!(runs.get(), 2);
}

#[test]
fn untrack_adds_no_subscriptions() {
    let state = reactive([("watched", 0), ("peeked", 0)]);
    let runs = Rc::new(Cell::new(0));

    let handle = {
        let state = state.clone();
        let runs = runs.clone();
        effect(move || {
            let _ = state.get("watched");
            untrack(|| state.get("peeked"));
            runs.set(runs.get() + 1);
        })
    };

    assert_eq!(handle.dependency_count(), 1);
    state.set("peeked", 99);
    assert_eq!(runs.get(), 1);
    state.set("watched", 1);
    assert_eq!(runs.get(), 2);
}

#[test]
fn conditional_reads_resubscribe_exactly() {
    let state = reactive([
        ("flag", StateValue::from(true)),
        ("a", StateValue::from(0)),
        ("b", StateValue::from(0)),
    ]);
    let runs = Rc::new(Cell::new(0));

    let handle = {
        let state = state.clone();
        let runs = runs.clone();
        effect(move || {
            if state.get("flag").is_truthy() {
                let _ = state.get("a");
            } else {
                let _ = state.get("b");
            }
            runs.set(runs.get() + 1);
        })
    };

    // flag=true: a re-runs, b does not.
    state.set("a", 1);
    assert_eq!(runs.get(), 2);
    state.set("b", 1);
    assert_eq!(runs.get(), 2);

    // Toggle: after one re-run, a is forgotten and b is live.
    state.set("flag", false);
    assert_eq!(runs.get(), 3);
    assert!(!state.cell("a").unwrap().has_subscriber(&handle));
    assert!(state.cell("b").unwrap().has_subscriber(&handle));

    state.set("a", 2);
    assert_eq!(runs.get(), 3);
    state.set("b", 2);
    assert_eq!(runs.get(), 4);
}

static CONDITIONAL: ComponentDef = ComponentDef::new("Conditional", |scope| {
    let state = scope.state();
    let shown = if state.get("flag").is_truthy() {
        state.get("a")
    } else {
        state.get("b")
    };
    Ok(Some(el("output").child(text(shown)).build()))
})
.with_setup(|scope| {
    scope.state().declare("flag", true);
    scope.state().declare("a", 10);
    scope.state().declare("b", 20);
});

#[test]
fn component_renders_resubscribe_conditionally() {
    let mut dom = VirtualDom::new(&CONDITIONAL);
    dom.rebuild().unwrap();

    let scope = dom.base_scope().unwrap();
    let real = dom.dom();
    assert_eq!(real.inner_html(&real.root()), "<output>10</output>");

    // flag=true: a re-renders, b does not.
    scope.set_state([("a", 11)]);
    dom.flush_frame();
    assert_eq!(real.inner_html(&real.root()), "<output>11</output>");
    let generation = scope.generation();

    scope.set_state([("b", 21)]);
    dom.flush_frame();
    assert_eq!(scope.generation(), generation);

    // After the toggle renders once, the subscriptions swap.
    scope.set_state([("flag", false)]);
    dom.flush_frame();
    assert_eq!(real.inner_html(&real.root()), "<output>21</output>");
    let generation = scope.generation();

    scope.set_state([("a", 12)]);
    dom.flush_frame();
    assert_eq!(scope.generation(), generation);

    scope.set_state([("b", 22)]);
    dom.flush_frame();
    assert_eq!(real.inner_html(&real.root()), "<output>22</output>");
}
