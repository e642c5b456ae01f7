//! Error boundary protocol: capture, fallback rendering, reset, and the
//! process-wide handler for errors nothing captures.

use casement_core::prelude::*;
use std::cell::{Cell, RefCell};

thread_local! {
    static SHOULD_THROW: Cell<bool> = Cell::new(true);
    static UNCAUGHT: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

static THROWING_CHILD: ComponentDef = ComponentDef::new("ThrowingChild", |_| {
    if SHOULD_THROW.with(|flag| flag.get()) {
        return Err(RenderError::new("kaboom"));
    }
    Ok(Some(el("span").child(text("all good")).build()))
});

static BOUNDARY: ComponentDef = ComponentDef::new("Boundary", |_| {
    Ok(Some(
        el("section").child(component(&THROWING_CHILD).build()).build(),
    ))
})
.with_fallback(|_, error| {
    Some(
        el("div")
            .attr("class", "fallback")
            .child(text(&error.message))
            .build(),
    )
});

#[test]
fn boundary_shows_fallback_then_recovers() {
    casement_core::clear_uncaught_handlers();
    SHOULD_THROW.with(|flag| flag.set(true));

    let mut dom = VirtualDom::new(&BOUNDARY);
    dom.rebuild().unwrap();

    let real = dom.dom();
    // After the first commit the fallback is live and carries the message.
    assert_eq!(
        real.inner_html(&real.root()),
        "<div class=\"fallback\">kaboom</div>"
    );

    let boundary = dom.base_scope().unwrap();
    let captured = boundary.captured_error().expect("boundary holds the error");
    assert_eq!(captured.message, "kaboom");
    assert_eq!(captured.phase, ErrorPhase::Render);

    // Once rendering stops throwing, a reset restores the normal subtree
    // from scratch.
    SHOULD_THROW.with(|flag| flag.set(false));
    boundary.reset_error_boundary();
    dom.flush_frame();

    assert!(boundary.captured_error().is_none());
    assert_eq!(
        real.inner_html(&real.root()),
        "<section><span>all good</span></section>"
    );
}

static NO_BOUNDARY: ComponentDef = ComponentDef::new("NoBoundary", |_| {
    Ok(Some(
        el("main").child(component(&THROWING_CHILD).build()).build(),
    ))
});

#[test]
fn unhandled_errors_reach_the_process_wide_handler() {
    casement_core::clear_uncaught_handlers();
    SHOULD_THROW.with(|flag| flag.set(true));
    UNCAUGHT.with(|u| u.borrow_mut().clear());
    casement_core::on_uncaught_error(|error| {
        UNCAUGHT.with(|u| u.borrow_mut().push(error.message.clone()));
    });

    let mut dom = VirtualDom::new(&NO_BOUNDARY);
    dom.rebuild().unwrap();

    let seen = UNCAUGHT.with(|u| u.borrow().clone());
    assert_eq!(seen, ["kaboom"]);
    casement_core::clear_uncaught_handlers();
}

static EFFECT_ERROR: ComponentDef =
    ComponentDef::new("EffectError", |_| Ok(Some(el("div").build()))).with_setup(|scope| {
        scope.effect(|_| Err(RenderError::new("effect failed")));
    });

static EFFECT_BOUNDARY: ComponentDef = ComponentDef::new("EffectBoundary", |_| {
    Ok(Some(component(&EFFECT_ERROR).build()))
})
.with_fallback(|_, error| Some(text(format!("[{}] {}", error.phase, error.message))));

#[test]
fn effect_errors_report_with_the_effect_phase() {
    casement_core::clear_uncaught_handlers();
    let mut dom = VirtualDom::new(&EFFECT_BOUNDARY);
    dom.rebuild().unwrap();

    let real = dom.dom();
    assert_eq!(real.inner_html(&real.root()), "[effect] effect failed");
}
