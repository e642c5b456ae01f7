//! Instance identity: matched components keep their scope across renders,
//! and cross-structural reuse carries stateful leaves between pages.

use casement_core::prelude::*;
use std::rc::Rc;

static FIELD: ComponentDef = ComponentDef::new("Field", |scope| {
    let draft = scope.state().get("draft");
    let state = scope.state().clone();
    Ok(Some(
        el("input")
            .attr("value", draft.to_string())
            .on("input", move |event| {
                state.set("draft", event.data().clone());
            })
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("draft", "");
});

static FORM: ComponentDef = ComponentDef::new("Form", |scope| {
    let page = scope.state().get("page").as_int().unwrap_or(1);
    let inner = if page == 1 {
        el("div")
            .attr("class", "page-one")
            .child(el("h2").child(text("Page one")).build())
            .child(component(&FIELD).build())
            .build()
    } else {
        el("section")
            .attr("class", "page-two")
            .child(component(&FIELD).build())
            .child(el("footer").child(text("Page two")).build())
            .build()
    };
    Ok(Some(inner))
})
.with_setup(|scope| {
    scope.state().declare("page", 1);
});

#[test]
fn same_position_same_constructor_keeps_the_instance() {
    let mut dom = VirtualDom::new(&FORM);
    dom.rebuild().unwrap();

    let form = dom.base_scope().unwrap();
    let field_id = form.child_ids()[0];
    let field = dom.scope(field_id).unwrap();

    dom.mark_dirty(form.id());
    dom.flush_frame();
    dom.mark_dirty(form.id());
    dom.flush_frame();

    let field_after = dom.scope(field_id).unwrap();
    assert!(Rc::ptr_eq(&field, &field_after));
}

#[test]
fn leaf_state_survives_a_page_change() {
    let mut dom = VirtualDom::new(&FORM);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let form = dom.base_scope().unwrap();

    // Type into the field on page one.
    let input = real
        .root()
        .children()[0]
        .children()
        .into_iter()
        .find(|n| n.tag() == Some("input"))
        .expect("the field is mounted");
    dom.handle_event_with_data("input", input.id(), "hello");

    let field_id = form.child_ids()[0];
    let field = dom.scope(field_id).unwrap();
    assert_eq!(field.state().get("draft").as_str(), Some("hello"));

    // Navigate: the enclosing element type changes, the field transfers.
    form.set_state([("page", 2)]);
    dom.flush_frame();

    assert_eq!(
        real.root().children()[0].tag(),
        Some("section"),
        "the page wrapper was replaced"
    );
    let transferred = dom.scope(field_id).expect("instance survived the swap");
    assert!(Rc::ptr_eq(&field, &transferred));
    assert_eq!(transferred.state().get("draft").as_str(), Some("hello"));

    // The same host input moved with it.
    let input_after = real
        .root()
        .children()[0]
        .children()
        .into_iter()
        .find(|n| n.tag() == Some("input"))
        .expect("the field is still mounted");
    assert!(Rc::ptr_eq(&input, &input_after));
}

static DOM_REUSE: ComponentDef = ComponentDef::new("DomReuse", |scope| {
    let n = scope.state().get("n");
    Ok(Some(
        el("ul")
            .child(el("li").key("head").child(text("head")).build())
            .child(el("li").key("count").child(text(n)).build())
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("n", 0);
});

#[test]
fn same_tag_same_key_keeps_the_host_node() {
    let mut dom = VirtualDom::new(&DOM_REUSE);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let ul = real.root().children()[0].clone();
    let lis = ul.children();

    for round in 1..4 {
        dom.base_scope().unwrap().set_state([("n", round)]);
        dom.flush_frame();
        let after = ul.children();
        assert!(Rc::ptr_eq(&lis[0], &after[0]));
        assert!(Rc::ptr_eq(&lis[1], &after[1]));
    }
    assert_eq!(ul.children()[1].text_content(), "3");
}
