//! Diffing tests: in-place updates, attribute reconciliation, commit
//! minimality and the preserve-children escape hatch.

use casement_core::prelude::*;
use std::rc::Rc;

static TEXT_APP: ComponentDef = ComponentDef::new("TextApp", |scope| {
    let label = scope.state().get("label");
    Ok(Some(el("p").child(text(label)).build()))
})
.with_setup(|scope| {
    scope.state().declare("label", "before");
});

#[test]
fn text_updates_in_place() {
    let mut dom = VirtualDom::new(&TEXT_APP);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let p = real.root().children()[0].clone();
    let leaf = p.children()[0].clone();
    assert_eq!(leaf.text().as_deref(), Some("before"));

    dom.base_scope().unwrap().set_state([("label", "after")]);
    dom.flush_frame();

    // Same <p>, same text node, new content.
    assert!(Rc::ptr_eq(&p, &real.root().children()[0]));
    assert!(Rc::ptr_eq(&leaf, &p.children()[0]));
    assert_eq!(leaf.text().as_deref(), Some("after"));
}

static ATTR_APP: ComponentDef = ComponentDef::new("AttrApp", |scope| {
    let on = scope.state().get("on").is_truthy();
    let mut node = el("div").attr("id", "box");
    if on {
        node = node.attr("data-on", true).attr("title", "lit");
    }
    Ok(Some(node.build()))
})
.with_setup(|scope| {
    scope.state().declare("on", true);
});

#[test]
fn removed_attributes_are_removed() {
    let mut dom = VirtualDom::new(&ATTR_APP);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let div = real.root().children()[0].clone();
    assert!(div.has_attribute("data-on"));
    assert!(div.has_attribute("title"));

    dom.base_scope().unwrap().set_state([("on", false)]);
    dom.flush_frame();

    assert!(Rc::ptr_eq(&div, &real.root().children()[0]));
    assert!(!div.has_attribute("data-on"));
    assert!(!div.has_attribute("title"));
    assert_eq!(div.attribute("id").as_deref(), Some("box"));
}

static STABLE: ComponentDef = ComponentDef::new("Stable", |_| {
    Ok(Some(
        el("div")
            .attr("class", "fixed")
            .child(el("span").child(text("same")).build())
            .build(),
    ))
});

#[test]
fn identical_renders_commit_nothing() {
    let mut dom = VirtualDom::new(&STABLE);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let before = real.mutation_count();

    let root_id = dom.base_scope().unwrap().id();
    dom.mark_dirty(root_id);
    dom.flush_frame();
    dom.mark_dirty(root_id);
    dom.flush_frame();

    assert_eq!(real.mutation_count(), before);
}

static TAG_SWAP: ComponentDef = ComponentDef::new("TagSwap", |scope| {
    let heading = scope.state().get("heading").is_truthy();
    let tag = if heading { "h1" } else { "p" };
    Ok(Some(el(tag).child(text("content")).build()))
})
.with_setup(|scope| {
    scope.state().declare("heading", false);
});

#[test]
fn a_changed_tag_replaces_the_node() {
    let mut dom = VirtualDom::new(&TAG_SWAP);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let old = real.root().children()[0].clone();
    assert_eq!(old.tag(), Some("p"));

    dom.base_scope().unwrap().set_state([("heading", true)]);
    dom.flush_frame();

    let new = real.root().children()[0].clone();
    assert_eq!(new.tag(), Some("h1"));
    assert!(!Rc::ptr_eq(&old, &new));
    assert_eq!(real.inner_html(&real.root()), "<h1>content</h1>");
}

static TERMINAL: ComponentDef = ComponentDef::new("Terminal", |scope| {
    let generation = scope.state().get("n");
    Ok(Some(
        el("div")
            .attr("preserve-children", true)
            .attr("data-generation", generation.to_string())
            .child(text("managed by the host"))
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("n", 0);
});

#[test]
fn preserve_children_skips_child_reconciliation() {
    let mut dom = VirtualDom::new(&TERMINAL);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let host = real.root().children()[0].clone();

    // The host takes the subtree over and rewrites it out-of-band.
    let foreign = real.create_element("canvas");
    real.append_child(&host, &foreign).unwrap();

    dom.base_scope().unwrap().set_state([("n", 1)]);
    dom.flush_frame();

    // Own properties still reconcile; the children were left alone.
    assert_eq!(host.attribute("data-generation").as_deref(), Some("1"));
    assert_eq!(host.child_count(), 2);
    assert!(Rc::ptr_eq(&host.children()[1], &foreign));
}
