//! Pass 2: capability annotation lowering.
//!
//! `@requires(a, b)` and `@provides(x)` on a class become static fields
//! `static requires = [...]` / `static provides = [...]` the runtime reads
//! off the constructor. Identifier arguments are resolved to their
//! initialising string literal by scanning the module, and imported
//! modules when the embedder supplies a resolver; an unresolvable
//! identifier is passed through as a reference.

use crate::diagnostics::CompileError;
use crate::lexer::Scanner;
use crate::passes::find_classes;
use crate::TransformOptions;
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) fn lower(src: &str, options: &TransformOptions) -> Result<String, CompileError> {
    let classes = find_classes(src)?;
    let mut out = src.to_string();

    for class in classes.iter().rev() {
        let mut removals: Vec<(usize, usize)> = Vec::new();
        let mut fields = String::new();

        for dec in &class.decorators {
            if dec.name != "requires" && dec.name != "provides" {
                continue;
            }
            removals.push((dec.start, dec.end));
            let args = split_arguments(dec.args.as_deref().unwrap_or(""))?;
            let resolved: Vec<String> = args
                .iter()
                .map(|arg| resolve_argument(src, arg, options))
                .collect();
            fields.push_str(&format!(
                "\n  static {} = [{}];",
                dec.name,
                resolved.join(", ")
            ));
        }

        if fields.is_empty() {
            continue;
        }
        out.insert_str(class.body_open + 1, &fields);
        removals.sort_by(|a, b| b.0.cmp(&a.0));
        for (start, end) in removals {
            out.replace_range(start..end, "");
        }
    }

    Ok(out)
}

/// Split a decorator argument list on top-level commas.
fn split_arguments(args: &str) -> Result<Vec<String>, CompileError> {
    let sc = Scanner::new(args);
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut pos = 0usize;
    while pos < sc.len() {
        let skipped = sc.skip_trivia(pos);
        if skipped != pos {
            pos = skipped;
            continue;
        }
        if sc.byte(pos) == Some(b',') {
            push_part(args, start, pos, &mut parts);
            pos += 1;
            start = pos;
        } else {
            pos = sc.advance_unit(pos)?;
        }
    }
    push_part(args, start, args.len(), &mut parts);
    Ok(parts)
}

fn push_part(args: &str, start: usize, end: usize, parts: &mut Vec<String>) {
    let part = args[start..end.min(args.len())].trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
}

fn resolve_argument(src: &str, arg: &str, options: &TransformOptions) -> String {
    // Literals pass straight through.
    if arg.starts_with('"') || arg.starts_with('\'') || arg.starts_with('`') {
        return arg.to_string();
    }
    // Only bare identifiers are resolvable.
    let is_ident = arg
        .bytes()
        .enumerate()
        .all(|(i, b)| {
            if i == 0 {
                Scanner::is_ident_start(b)
            } else {
                Scanner::is_ident_continue(b)
            }
        });
    if !is_ident || arg.is_empty() {
        return arg.to_string();
    }

    if let Some(literal) = find_const_literal(src, arg) {
        return literal;
    }

    // Imported identifier: consult the embedder's module resolver.
    if let Some(module) = find_import_module(src, arg) {
        if let Some(resolver) = &options.resolve_import {
            if let Some(imported_src) = resolver(&module) {
                if let Some(literal) = find_const_literal(&imported_src, arg) {
                    return literal;
                }
            }
        }
    }

    log::debug!("capability identifier {:?} not resolvable to a literal", arg);
    arg.to_string()
}

/// Find `const NAME = "literal"` (or `let`/`var`, any quote style).
fn find_const_literal(src: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?m)\b(?:const|let|var)\s+{}\s*(?::[^=\n]+)?=\s*("[^"]*"|'[^']*')"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(src).map(|caps| caps[1].to_string())
}

static RE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+\{([^}]*)\}\s+from\s+["']([^"']+)["']"#).unwrap()
});

fn find_import_module(src: &str, name: &str) -> Option<String> {
    for caps in RE_IMPORT.captures_iter(src) {
        let names = &caps[1];
        if names.split(',').any(|n| n.trim() == name) {
            return Some(caps[2].to_string());
        }
    }
    None
}
