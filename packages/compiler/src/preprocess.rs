//! Phase 1: textual preprocessing of the component dialect.
//!
//! Before any structural pass runs, a series of regex-driven rewrites turn
//! the dialect into valid TypeScript-flavoured class syntax:
//!
//! - `component X {` becomes `export class X extends BaseComponent {`
//! - `state { let x: T = v; }` blocks become private field declarations
//! - `reactive let x: T = v` becomes a private field
//! - `mount {` / `unmount {` / `effect {` blocks become private methods with
//!   their canonical names (`mounted`, `unmount`, `effect`)
//! - `computed get x()` gains its `@computed` decorator
//! - an instance `props = {...}` field becomes `static propTypes = {...}`,
//!   so the instance-level `props` wired by the base class is not shadowed
//!   by a field initialiser that runs after the base constructor
//!
//! File-level validation rejects `<style>` elements outright; components
//! use external stylesheets.

use crate::diagnostics::{CompileError, ErrorCode};
use crate::lexer::Scanner;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_STYLE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<style[\s/>]").unwrap());

static RE_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)component\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\{").unwrap());

// Blocks can sit mid-line in terse sources; a token-prefix guard stands in
// for a word boundary that also rejects member access (`this.state`).
static RE_STATE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^.\w$])state\s*\{").unwrap());

static RE_REACTIVE_LET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^.\w$])reactive\s+(?:let|const|var)\s+").unwrap());

static RE_LIFECYCLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^.\w$])(unmount|mount|effect)\s*\{").unwrap());

static RE_COMPUTED_GET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^.\w$])computed\s+get\s+").unwrap());

static RE_PROPS_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)props\s*=\s*\{").unwrap());

/// Reject `<style>` elements in component source.
pub(crate) fn validate_no_style(source: &str) -> Result<(), CompileError> {
    if let Some(m) = RE_STYLE_TAG.find(source) {
        return Err(CompileError::at_offset(
            ErrorCode::SX1001,
            source,
            m.start(),
            m.end(),
            "<style> elements are not allowed in component source; \
             move the rules to an external stylesheet",
        ));
    }
    Ok(())
}

pub(crate) fn preprocess(source: &str) -> Result<String, CompileError> {
    let mut out = source.to_string();

    rewrite_component_headers(&mut out);
    rewrite_state_blocks(&mut out)?;
    rewrite_reactive_lets(&mut out);
    rewrite_lifecycle_blocks(&mut out);
    rewrite_computed_getters(&mut out);
    rewrite_props_fields(&mut out);

    Ok(out)
}

fn rewrite_component_headers(out: &mut String) {
    // The replacement contains no `component` keyword, so repeated
    // first-match replacement terminates.
    while let Some(caps) = RE_COMPONENT.captures(out) {
        let whole = caps.get(0).unwrap();
        let replacement = format!(
            "{}export class {} extends BaseComponent {{",
            &caps[1], &caps[2]
        );
        out.replace_range(whole.range(), &replacement);
    }
}

fn rewrite_state_blocks(out: &mut String) -> Result<(), CompileError> {
    loop {
        let (whole_start, open, prefix) = {
            let Some(caps) = RE_STATE_BLOCK.captures(out) else {
                return Ok(());
            };
            let whole = caps.get(0).unwrap();
            (whole.start(), whole.end() - 1, caps[1].to_string())
        };

        let scanner = Scanner::new(out);
        let close = scanner.skip_balanced(open, b'{', b'}')?;
        let inner = out[open + 1..close - 1].to_string();

        let mut fields = prefix;
        for decl in inner.split(|c| c == ';' || c == '\n') {
            let decl = decl.trim();
            let rest = ["let ", "const ", "var "]
                .iter()
                .find_map(|kw| decl.strip_prefix(kw));
            if let Some(rest) = rest {
                if !fields.trim().is_empty() {
                    fields.push(' ');
                }
                fields.push_str("private ");
                fields.push_str(rest.trim());
                fields.push(';');
            }
        }

        out.replace_range(whole_start..close, &fields);
    }
}

fn rewrite_reactive_lets(out: &mut String) {
    while let Some(caps) = RE_REACTIVE_LET.captures(out) {
        let whole = caps.get(0).unwrap();
        let replacement = format!("{}private ", &caps[1]);
        out.replace_range(whole.range(), &replacement);
    }
}

fn rewrite_lifecycle_blocks(out: &mut String) {
    while let Some(caps) = RE_LIFECYCLE_BLOCK.captures(out) {
        let whole = caps.get(0).unwrap();
        let canonical = match &caps[2] {
            "mount" => "mounted",
            other => other,
        };
        // The replacement re-emits the block header as a method header, so
        // the pattern can no longer match it.
        let replacement = format!("{}private {}() {{", &caps[1], canonical);
        out.replace_range(whole.range(), &replacement);
    }
}

fn rewrite_computed_getters(out: &mut String) {
    let replaced = RE_COMPUTED_GET.replace_all(out, |caps: &Captures| {
        format!("{}@computed get ", &caps[1])
    });
    *out = replaced.into_owned();
}

fn rewrite_props_fields(out: &mut String) {
    let replaced = RE_PROPS_FIELD.replace_all(out, |caps: &Captures| {
        format!("{}static propTypes = {{", &caps[1])
    });
    *out = replaced.into_owned();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_headers_become_exported_classes() {
        let mut src = "component App {\n}\n".to_string();
        rewrite_component_headers(&mut src);
        assert_eq!(src, "export class App extends BaseComponent {\n}\n");
    }

    #[test]
    fn state_blocks_survive_braces_in_initialisers() {
        let mut src = "state { let map: object = { a: 1 }; }".to_string();
        rewrite_state_blocks(&mut src).unwrap();
        assert_eq!(src, "private map: object = { a: 1 };");
    }

    #[test]
    fn member_access_is_not_a_block() {
        let mut src = "this.state = {};".to_string();
        rewrite_state_blocks(&mut src).unwrap();
        assert_eq!(src, "this.state = {};");
    }

    #[test]
    fn style_tags_are_rejected() {
        assert!(validate_no_style("<style>.a{}</style>").is_err());
        assert!(validate_no_style("const s = 'styled';").is_ok());
    }
}
