//! Boolean attribute rendering: presence-only when true, omitted when
//! false; listeners never serialise.

use casement_core::prelude::*;

#[test]
fn true_renders_presence_only() {
    let node = el("input").attr("disabled", true).build();
    assert_eq!(casement_ssr::render_element(&node), "<input disabled/>");
}

#[test]
fn false_and_null_render_nothing() {
    let node = el("input")
        .attr("disabled", false)
        .attr("title", AttributeValue::None)
        .build();
    assert_eq!(casement_ssr::render_element(&node), "<input/>");
}

#[test]
fn listeners_are_omitted() {
    let node = el("button")
        .on("click", |_| {})
        .attr("type", "button")
        .build();
    assert_eq!(
        casement_ssr::render_element(&node),
        "<button type=\"button\"></button>"
    );
}
