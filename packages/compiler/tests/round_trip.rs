//! End-to-end dialect lowering: a `component` block comes out the other
//! side as a plain class with canonical lifecycle methods.

use casement_compiler::transform;
use pretty_assertions::assert_eq;
use tokens::keyword;

// Does `word` appear as a standalone token (not inside an identifier)?
mod tokens {
    pub fn keyword(haystack: &str, word: &str) -> bool {
        let bytes = haystack.as_bytes();
        let mut from = 0;
        while let Some(at) = haystack[from..].find(word) {
            let start = from + at;
            let end = start + word.len();
            let before_ok = start == 0
                || !(bytes[start - 1].is_ascii_alphanumeric()
                    || bytes[start - 1] == b'_'
                    || bytes[start - 1] == b'$');
            let after_ok = end == haystack.len()
                || !(bytes[end].is_ascii_alphanumeric()
                    || bytes[end] == b'_'
                    || bytes[end] == b'$');
            if before_ok && after_ok {
                return true;
            }
            from = end;
        }
        false
    }
}

#[test]
fn component_block_round_trip() {
    let input = "component C { state { let x: number = 0 } mount { this.x = 1 } render() { return <div>{this.x}</div> } }";
    let output = transform(input).unwrap();

    assert!(output.contains("class C extends"), "output: {}", output);
    assert!(output.contains("x = 0"), "output: {}", output);
    assert!(output.contains("mounted()"), "output: {}", output);
    assert!(output.contains("render()"), "output: {}", output);

    assert!(!keyword(&output, "component"), "output: {}", output);
    assert!(!keyword(&output, "state"), "output: {}", output);
    assert!(!keyword(&output, "mount"), "output: {}", output);
}

#[test]
fn multi_line_components_lower_the_same_way() {
    let input = r#"
component Counter {
  state {
    let count: number = 0;
    let label: string = "clicks";
  }

  mount {
    this.count = 1;
  }

  unmount {
    this.count = 0;
  }

  render() {
    return <button>{this.label}: {this.count}</button>;
  }
}
"#;
    let output = transform(input).unwrap();

    assert!(output.contains("export class Counter extends BaseComponent"));
    assert!(output.contains("count = 0;"));
    assert!(output.contains("label = \"clicks\";"));
    assert!(output.contains("mounted() {"));
    assert!(output.contains("unmount() {"));
    assert!(output.starts_with("import { BaseComponent } from \"@casement/runtime\";"));
}

#[test]
fn reactive_lets_become_fields() {
    let input = "component Toggle { reactive let on: boolean = false; render() { return <div/> } }";
    let output = transform(input).unwrap();
    assert!(output.contains("on = false;"), "output: {}", output);
    assert!(!keyword(&output, "reactive"));
}

#[test]
fn computed_getters_are_lowered_through_the_decorator_path() {
    let input = r#"
component Pricing {
  reactive let price: number = 10;
  computed get doubled() { return this.price * 2; }
  render() { return <span>{this.doubled}</span>; }
}
"#;
    let output = transform(input).unwrap();
    assert!(output.contains("get doubled()"));
    assert!(output.contains(
        "computed()(Pricing.prototype, \"doubled\", Object.getOwnPropertyDescriptor(Pricing.prototype, \"doubled\"));"
    ));
}

#[test]
fn existing_runtime_imports_are_not_duplicated() {
    let input = "import { BaseComponent, reactive } from \"@casement/runtime\";\ncomponent A { render() { return <div/> } }";
    let output = transform(input).unwrap();
    assert_eq!(output.matches("@casement/runtime").count(), 1);
}
