//! Unmount completeness: disposers fire, listeners and host nodes go away,
//! caches and subscriptions empty out.

use casement_core::prelude::*;
use casement_core::{subscriber_count, Effect};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

thread_local! {
    static CLEANUPS: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
    static WATCHED_EFFECT: RefCell<Option<Effect>> = RefCell::new(None);
    static CTX: Context = Context::new("ctx");
}

static DOOMED: ComponentDef = ComponentDef::new("Doomed", |scope| {
    let _ = CTX.with(|ctx| scope.consume_context(ctx));
    let state = scope.state().clone();
    Ok(Some(
        el("button")
            .on("click", move |_| state.set("n", 1))
            .child(text("doomed"))
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("n", 0);
    let state = scope.state().clone();
    let handle = scope.effect(move |_| {
        let _ = state.get("n");
        Ok(())
    });
    WATCHED_EFFECT.with(|slot| *slot.borrow_mut() = Some(handle));
    scope.add_cleanup(|| CLEANUPS.with(|c| c.borrow_mut().push("cleanup")));
    scope.on(LifecyclePhase::BeforeUnmount, |_| {
        CLEANUPS.with(|c| c.borrow_mut().push("beforeUnmount"));
    });
    scope.on(LifecyclePhase::Unmounted, |_| {
        CLEANUPS.with(|c| c.borrow_mut().push("unmounted"));
    });
});

static HOST: ComponentDef = ComponentDef::new("Host", |scope| {
    CTX.with(|ctx| scope.provide_context(ctx, 1));
    let keep = scope.state().get("keep").is_truthy();
    let mut node = el("div");
    if keep {
        node = node.child(component(&DOOMED).build());
    } else {
        node = node.child(text("empty"));
    }
    Ok(Some(node.build()))
})
.with_setup(|scope| {
    scope.state().declare("keep", true);
});

#[test]
fn unmount_disposes_everything() {
    CLEANUPS.with(|c| c.borrow_mut().clear());

    let mut dom = VirtualDom::new(&HOST);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let host = dom.base_scope().unwrap();
    let doomed_id = host.child_ids()[0];
    let doomed = dom.scope(doomed_id).unwrap();
    let button = real.root().children()[0].children()[0].clone();
    let button_id = button.id();

    assert!(real.has_listener(button_id, "click"));
    assert_eq!(CTX.with(|ctx| subscriber_count(&host, ctx)), 1);
    let effect = WATCHED_EFFECT.with(|slot| slot.borrow().clone()).unwrap();
    assert!(!effect.is_disposed());

    host.set_state([("keep", false)]);
    dom.flush_frame();

    // Host node gone, listener gone, arena slot free.
    assert!(button.parent().is_none());
    assert!(!real.has_listener(button_id, "click"));
    assert!(real.get(button_id).is_none());
    assert!(dom.scope(doomed_id).is_none());

    // Effects disposed, cleanups ran, context subscription dropped.
    assert!(effect.is_disposed());
    assert_eq!(effect.dependency_count(), 0);
    assert_eq!(CTX.with(|ctx| subscriber_count(&host, ctx)), 0);
    assert!(!doomed.is_mounted());
    assert_eq!(
        CLEANUPS.with(|c| c.borrow().clone()),
        ["beforeUnmount", "cleanup", "unmounted"]
    );

    // A write to the dead instance's state reaches nothing.
    doomed.state().set("n", 99);
    dom.flush_frame();
    assert_eq!(real.inner_html(&real.root()), "<div>empty</div>");
}
