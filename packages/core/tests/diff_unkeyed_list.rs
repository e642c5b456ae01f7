//! Unkeyed child reconciliation matches by index only.

use casement_core::prelude::*;
use std::rc::Rc;

static PLAIN_LIST: ComponentDef = ComponentDef::new("PlainList", |scope| {
    let n = scope.state().get("n").as_int().unwrap_or(0);
    Ok(Some(
        el("ul")
            .children((0..n).map(|i| el("li").child(text(format!("item {}", i))).build()))
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("n", 3);
});

#[test]
fn growing_appends_and_shrinking_truncates() {
    let mut dom = VirtualDom::new(&PLAIN_LIST);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let ul = real.root().children()[0].clone();
    let original = ul.children();
    assert_eq!(original.len(), 3);

    dom.base_scope().unwrap().set_state([("n", 5)]);
    dom.flush_frame();

    let grown = ul.children();
    assert_eq!(grown.len(), 5);
    for i in 0..3 {
        assert!(Rc::ptr_eq(&original[i], &grown[i]), "prefix was recreated");
    }

    dom.base_scope().unwrap().set_state([("n", 2)]);
    dom.flush_frame();

    let shrunk = ul.children();
    assert_eq!(shrunk.len(), 2);
    for i in 0..2 {
        assert!(Rc::ptr_eq(&original[i], &shrunk[i]));
    }
    assert_eq!(
        real.inner_html(&real.root()),
        "<ul><li>item 0</li><li>item 1</li></ul>"
    );
}

static MIXED: ComponentDef = ComponentDef::new("Mixed", |scope| {
    let swap = scope.state().get("swap").is_truthy();
    let middle = if swap {
        el("em").child(text("emphasis")).build()
    } else {
        el("strong").child(text("strong")).build()
    };
    Ok(Some(
        el("p")
            .child(text("start"))
            .child(middle)
            .child(text("end"))
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("swap", false);
});

#[test]
fn type_change_replaces_only_that_index() {
    let mut dom = VirtualDom::new(&MIXED);
    dom.rebuild().unwrap();

    let real = dom.dom();
    let p = real.root().children()[0].clone();
    let children = p.children();

    dom.base_scope().unwrap().set_state([("swap", true)]);
    dom.flush_frame();

    let after = p.children();
    assert_eq!(after.len(), 3);
    assert!(Rc::ptr_eq(&children[0], &after[0]));
    assert!(!Rc::ptr_eq(&children[1], &after[1]));
    assert!(Rc::ptr_eq(&children[2], &after[2]));
    assert_eq!(
        real.inner_html(&real.root()),
        "<p>start<em>emphasis</em>end</p>"
    );
}
