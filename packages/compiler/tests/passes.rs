//! Individual pass behaviour: decorator calls, capability lowering, the
//! props rewrite and TypeScript stripping.

use casement_compiler::{transform, transform_with, TransformOptions};

#[test]
fn lifecycle_decorators_become_post_class_calls() {
    let input = r#"
class Timer extends BaseComponent {
  @onMount
  start() { this.tick(); }

  @onDestroy
  stop() { }
}
"#;
    let output = transform(input).unwrap();
    assert!(!output.contains("@onMount"));
    assert!(!output.contains("@onDestroy"));
    assert!(output.contains(
        "onMount()(Timer.prototype, \"start\", Object.getOwnPropertyDescriptor(Timer.prototype, \"start\"));"
    ));
    assert!(output.contains(
        "onDestroy()(Timer.prototype, \"stop\", Object.getOwnPropertyDescriptor(Timer.prototype, \"stop\"));"
    ));
    // Calls land after the class body, in member order.
    assert!(output.find("onMount()(").unwrap() > output.find("stop()").unwrap());
    assert!(output.find("onMount()(").unwrap() < output.find("onDestroy()(").unwrap());
}

#[test]
fn class_level_service_decorators_lower_to_calls() {
    let input = r#"
@service("analytics")
class Tracker extends BaseComponent {
  render() { return null; }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("service(\"analytics\")(Tracker);"));
    assert!(!output.contains("@service"));
}

#[test]
fn bind_and_capability_decorators_lower_generically() {
    let input = r#"
class Panel extends BaseComponent {
  @bind
  onScroll() { }

  @capability("layout.measure")
  measure() { }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains(
        "bind()(Panel.prototype, \"onScroll\", Object.getOwnPropertyDescriptor(Panel.prototype, \"onScroll\"));"
    ));
    assert!(output.contains(
        "capability(\"layout.measure\")(Panel.prototype, \"measure\", Object.getOwnPropertyDescriptor(Panel.prototype, \"measure\"));"
    ));
}

#[test]
fn capability_annotations_become_static_fields() {
    let input = r#"
const CLIPBOARD = "sys.clipboard";

@requires(CLIPBOARD, "net.fetch")
@provides("widgets.editor")
class Editor extends BaseComponent {
  render() { return null; }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("static requires = [\"sys.clipboard\", \"net.fetch\"];"));
    assert!(output.contains("static provides = [\"widgets.editor\"];"));
    assert!(!output.contains("@requires"));
    assert!(!output.contains("@provides"));
}

#[test]
fn capability_identifiers_resolve_through_imports() {
    let input = r#"
import { CAMERA } from "./caps";

@requires(CAMERA)
class Scanner extends BaseComponent {
  render() { return null; }
}
"#;
    let options = TransformOptions {
        resolve_import: Some(Box::new(|module: &str| {
            if module == "./caps" {
                Some("export const CAMERA = \"device.camera\";".to_string())
            } else {
                None
            }
        })),
    };
    let output = transform_with(input, &options).unwrap();
    assert!(output.contains("static requires = [\"device.camera\"];"));
}

#[test]
fn unresolvable_identifiers_pass_through() {
    let input = r#"
import { UNKNOWN } from "./elsewhere";

@requires(UNKNOWN)
class Widget extends BaseComponent {
  render() { return null; }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("static requires = [UNKNOWN];"));
}

#[test]
fn instance_props_fields_become_static_prop_types() {
    let input = r#"
class Card extends BaseComponent {
  props = { title: "string" };
  render() { return null; }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("static propTypes = { title: \"string\" };"));
    assert!(!output.contains("props = {"));
}

#[test]
fn props_on_unrelated_classes_are_untouched() {
    let input = r#"
class Bag {
  props = { anything: 1 };
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("props = { anything: 1 };"));
}

#[test]
fn interfaces_and_aliases_are_stripped_with_brace_matching() {
    let input = r#"
export interface CardProps {
  title: string;
  meta: {
    nested: boolean;
  };
}

type Handler = (event: { kind: string }) => void;

class Card extends BaseComponent {
  render() { return null; }
}
"#;
    let output = transform(input).unwrap();
    assert!(!output.contains("interface"));
    assert!(!output.contains("CardProps"));
    assert!(!output.contains("Handler"));
    assert!(output.contains("class Card extends BaseComponent"));
}

#[test]
fn annotations_and_modifiers_are_stripped_from_members() {
    let input = r#"
class Form extends BaseComponent {
  private name: string = "";
  readonly limit: number = 10;

  submit(event: SubmitEvent, urgent?: boolean): void {
    this.name = "";
  }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("name = \"\";"));
    assert!(output.contains("limit = 10;"));
    assert!(output.contains("submit(event, urgent) {"));
    assert!(!output.contains("private "));
    assert!(!output.contains(": string"));
    assert!(!output.contains(": void"));
}

#[test]
fn implements_clauses_are_dropped() {
    let input = r#"
class Grid extends BaseComponent implements Sortable, Filterable {
  render() { return null; }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("class Grid extends BaseComponent {"));
    assert!(!output.contains("implements"));
}
