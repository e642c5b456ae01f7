//! Pass 5: TypeScript to JavaScript.
//!
//! Interface and type-alias declarations are removed with proper brace
//! matching - a multi-line body never fools this pass. Class headers lose
//! their `implements` clauses, members lose access modifiers, optional
//! markers and type annotations. What remains is a plain ES2020 module.

use crate::diagnostics::CompileError;
use crate::lexer::Scanner;
use crate::passes::{consume_type, find_classes, scan_members};

pub(crate) fn strip(src: &str) -> Result<String, CompileError> {
    let without_decls = remove_type_declarations(src)?;
    strip_class_annotations(&without_decls)
}

/// Remove `interface X { ... }` and `type X = ...;` declarations, together
/// with a directly preceding `export`.
fn remove_type_declarations(src: &str) -> Result<String, CompileError> {
    let sc = Scanner::new(src);
    let mut removals: Vec<(usize, usize)> = Vec::new();
    let mut export_start: Option<usize> = None;
    let mut prev_dot = false;
    let mut pos = 0usize;

    while pos < sc.len() {
        let next = sc.skip_trivia(pos);
        if next >= sc.len() {
            break;
        }
        pos = next;

        match sc.byte(pos).unwrap() {
            b'.' => {
                prev_dot = true;
                export_start = None;
                pos += 1;
            }
            b if Scanner::is_ident_start(b) => {
                let (ident, end) = sc.read_ident(pos).expect("ident start");
                match ident {
                    "export" if !prev_dot => {
                        export_start = Some(pos);
                        pos = end;
                    }
                    "interface" if !prev_dot => {
                        let start = export_start.take().unwrap_or(pos);
                        let close = remove_interface(&sc, end)?;
                        removals.push((start, close));
                        pos = close;
                    }
                    "type" if !prev_dot => {
                        match try_remove_alias(&sc, end)? {
                            Some(close) => {
                                let start = export_start.take().unwrap_or(pos);
                                removals.push((start, close));
                                pos = close;
                            }
                            None => {
                                // A variable or property named `type`.
                                export_start = None;
                                pos = end;
                            }
                        }
                    }
                    _ => {
                        export_start = None;
                        pos = end;
                    }
                }
                prev_dot = false;
            }
            _ => {
                export_start = None;
                prev_dot = false;
                pos = sc.advance_unit(pos)?;
            }
        }
    }

    let mut out = src.to_string();
    removals.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end) in removals {
        // Swallow one trailing newline so the removal leaves no hole.
        let mut end = end;
        if out.as_bytes().get(end) == Some(&b'\n') {
            end += 1;
        }
        out.replace_range(start..end, "");
    }
    Ok(out)
}

/// `interface` keyword consumed; skip name, type params, extends list and
/// the braced body. Returns one past the closing brace.
fn remove_interface(sc: &Scanner, mut pos: usize) -> Result<usize, CompileError> {
    loop {
        pos = sc.skip_trivia(pos);
        match sc.byte(pos) {
            Some(b'{') => return sc.skip_balanced(pos, b'{', b'}'),
            Some(_) => pos = sc.advance_unit(pos)?,
            None => return Err(sc.unbalanced(pos, "interface declaration never opens a body")),
        }
    }
}

/// `type` keyword consumed. A real alias is `type Name [<...>] = ...;`.
/// Returns the end offset past the terminating `;`, or `None` when this is
/// not an alias.
fn try_remove_alias(sc: &Scanner, after_kw: usize) -> Result<Option<usize>, CompileError> {
    let name_pos = sc.skip_trivia(after_kw);
    let Some((_, name_end)) = sc.read_ident(name_pos) else {
        return Ok(None);
    };
    let mut pos = sc.skip_trivia(name_end);
    if sc.byte(pos) == Some(b'<') {
        // Generic parameters before the `=`.
        let mut depth = 0usize;
        while pos < sc.len() {
            match sc.byte(pos) {
                Some(b'<') => {
                    depth += 1;
                    pos += 1;
                }
                Some(b'>') => {
                    depth -= 1;
                    pos += 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => pos += 1,
                None => return Err(sc.unbalanced(pos, "unbalanced type parameter list")),
            }
        }
        pos = sc.skip_trivia(pos);
    }
    if sc.byte(pos) != Some(b'=') {
        return Ok(None);
    }
    pos += 1;
    loop {
        pos = sc.skip_trivia(pos);
        match sc.byte(pos) {
            Some(b';') => return Ok(Some(pos + 1)),
            Some(_) => pos = sc.advance_unit(pos)?,
            None => return Ok(Some(pos)),
        }
    }
}

/// Strip `implements` clauses, member modifiers, optional markers and type
/// annotations from every class.
fn strip_class_annotations(src: &str) -> Result<String, CompileError> {
    let sc = Scanner::new(src);
    let classes = find_classes(src)?;
    // (start, end, replacement) edits, applied in descending order.
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for class in &classes {
        if let Some(implements_at) = find_implements(&sc, class.class_kw, class.body_open) {
            edits.push((implements_at, class.body_open, String::new()));
        }

        let members = scan_members(src, class.body_open, class.body_close)?;
        for member in &members {
            for (word, start, end) in &member.modifiers {
                if matches!(
                    word.as_str(),
                    "private" | "public" | "protected" | "readonly" | "abstract" | "override"
                ) {
                    let mut strip_end = *end;
                    while sc.byte(strip_end) == Some(b' ') || sc.byte(strip_end) == Some(b'\t') {
                        strip_end += 1;
                    }
                    edits.push((*start, strip_end, String::new()));
                }
            }

            if let Some(colon) = member.field_colon {
                let type_end = consume_type(&sc, colon + 1)?;
                edits.push((colon, type_end, String::new()));
                // Optional marker between name and annotation.
                if let Some(q) = src[member.name_end..colon].find('?') {
                    let q = member.name_end + q;
                    edits.push((q, q + 1, String::new()));
                }
            }

            if let Some(colon) = member.ret_colon {
                let type_end = consume_type(&sc, colon + 1)?;
                edits.push((colon, type_end, String::new()));
            }

            if let Some((open, close)) = member.params {
                let inner = &src[open + 1..close - 1];
                let stripped = strip_parameter_annotations(inner)?;
                if stripped != inner {
                    edits.push((open + 1, close - 1, stripped));
                }
            }
        }
    }

    let mut out = src.to_string();
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end, replacement) in edits {
        out.replace_range(start..end, &replacement);
    }
    Ok(out)
}

fn find_implements(sc: &Scanner, from: usize, until: usize) -> Option<usize> {
    let mut pos = from;
    while pos < until {
        let next = sc.skip_trivia(pos);
        if next >= until {
            return None;
        }
        pos = next;
        match sc.byte(pos)? {
            b if Scanner::is_ident_start(b) => {
                let (ident, end) = sc.read_ident(pos)?;
                if ident == "implements" {
                    return Some(pos);
                }
                pos = end;
            }
            _ => pos = sc.advance_unit(pos).ok()?,
        }
    }
    None
}

/// Strip `?` markers and `: Type` annotations from a parameter list.
fn strip_parameter_annotations(params: &str) -> Result<String, CompileError> {
    let sc = Scanner::new(params);
    let mut out = String::new();
    let mut pos = 0usize;

    while pos < sc.len() {
        let skipped = sc.skip_trivia(pos);
        if skipped != pos {
            out.push_str(&params[pos..skipped]);
            pos = skipped;
            continue;
        }
        match sc.byte(pos) {
            Some(b'?') => {
                let after = sc.skip_trivia(pos + 1);
                if matches!(sc.byte(after), Some(b':') | Some(b',') | Some(b'=') | None) {
                    // Optional marker; drop it.
                    pos += 1;
                } else {
                    out.push('?');
                    pos += 1;
                }
            }
            Some(b':') => {
                pos = consume_type(&sc, pos + 1)?;
            }
            Some(_) => {
                let next = sc.advance_unit(pos)?;
                out.push_str(&params[pos..next]);
                pos = next;
            }
            None => break,
        }
    }
    Ok(out)
}
