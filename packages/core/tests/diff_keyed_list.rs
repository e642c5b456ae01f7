//! Keyed child reconciliation: moves preserve host nodes, removals and
//! insertions touch only what changed.

use casement_core::prelude::*;
use std::collections::HashMap;
use std::rc::Rc;

static LIST: ComponentDef = ComponentDef::new("List", |scope| {
    let order = scope.state().get("order");
    let keys: Vec<String> = match order {
        StateValue::Text(s) => s.split(',').filter(|k| !k.is_empty()).map(String::from).collect(),
        _ => Vec::new(),
    };
    Ok(Some(
        el("ul")
            .children(
                keys.iter()
                    .map(|k| el("li").key(k).child(text(k)).build()),
            )
            .build(),
    ))
})
.with_setup(|scope| {
    scope.state().declare("order", "a,b,c");
});

fn li_nodes(real: &RealDom) -> HashMap<String, Rc<casement_core::DomNode>> {
    let ul = real.root().children()[0].clone();
    ul.children()
        .into_iter()
        .map(|li| (li.text_content(), li))
        .collect()
}

fn li_order(real: &RealDom) -> Vec<String> {
    let ul = real.root().children()[0].clone();
    ul.children().iter().map(|li| li.text_content()).collect()
}

use casement_core::RealDom;

#[test]
fn reorder_keeps_the_same_host_nodes() {
    let mut dom = VirtualDom::new(&LIST);
    dom.rebuild().unwrap();
    let real = dom.dom();

    let before = li_nodes(&real);
    assert_eq!(li_order(&real), ["a", "b", "c"]);

    dom.base_scope().unwrap().set_state([("order", "c,a,b")]);
    dom.flush_frame();

    let after = li_nodes(&real);
    assert_eq!(li_order(&real), ["c", "a", "b"]);
    for key in ["a", "b", "c"] {
        assert!(
            Rc::ptr_eq(&before[key], &after[key]),
            "node for {:?} was recreated instead of moved",
            key
        );
    }
}

#[test]
fn removals_only_touch_the_removed_key() {
    let mut dom = VirtualDom::new(&LIST);
    dom.rebuild().unwrap();
    let real = dom.dom();
    let before = li_nodes(&real);

    dom.base_scope().unwrap().set_state([("order", "a,c")]);
    dom.flush_frame();

    let after = li_nodes(&real);
    assert_eq!(li_order(&real), ["a", "c"]);
    assert!(Rc::ptr_eq(&before["a"], &after["a"]));
    assert!(Rc::ptr_eq(&before["c"], &after["c"]));
}

#[test]
fn insertions_land_in_position() {
    let mut dom = VirtualDom::new(&LIST);
    dom.rebuild().unwrap();
    let real = dom.dom();
    let before = li_nodes(&real);

    dom.base_scope().unwrap().set_state([("order", "a,x,b,c")]);
    dom.flush_frame();

    let after = li_nodes(&real);
    assert_eq!(li_order(&real), ["a", "x", "b", "c"]);
    for key in ["a", "b", "c"] {
        assert!(Rc::ptr_eq(&before[key], &after[key]));
    }
}

#[test]
fn reverse_is_all_moves() {
    let mut dom = VirtualDom::new(&LIST);
    dom.rebuild().unwrap();
    let real = dom.dom();

    dom.base_scope()
        .unwrap()
        .set_state([("order", "a,b,c,d,e")]);
    dom.flush_frame();
    let before = li_nodes(&real);

    dom.base_scope()
        .unwrap()
        .set_state([("order", "e,d,c,b,a")]);
    dom.flush_frame();

    let after = li_nodes(&real);
    assert_eq!(li_order(&real), ["e", "d", "c", "b", "a"]);
    for key in ["a", "b", "c", "d", "e"] {
        assert!(Rc::ptr_eq(&before[key], &after[key]));
    }
}
