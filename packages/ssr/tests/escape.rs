//! HTML escaping of text content and attribute values.

use casement_core::prelude::*;

#[test]
fn escapes_text_content() {
    let node = el("div").child(text("\"><div>")).build();
    assert_eq!(
        casement_ssr::render_element(&node),
        "<div>&#34;&#62;&#60;div&#62;</div>"
    );
}

#[test]
fn escapes_attribute_values() {
    let node = el("input").attr("placeholder", "\"><div>").build();
    assert_eq!(
        casement_ssr::render_element(&node),
        "<input placeholder=\"&#34;&#62;&#60;div&#62;\"/>"
    );
}

#[test]
fn escapes_dynamic_state_text() {
    static APP: ComponentDef = ComponentDef::new("App", |scope| {
        let payload = scope.state().get("payload");
        Ok(Some(el("p").child(text(payload)).build()))
    })
    .with_setup(|scope| {
        scope.state().declare("payload", "<script>alert(1)</script>");
    });

    let mut dom = VirtualDom::new(&APP);
    dom.rebuild().unwrap();
    let html = casement_ssr::render(&dom).unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.starts_with("<p>&#60;script&#62;"));
}
