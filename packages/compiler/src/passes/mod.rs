//! Phase 2: structural passes over the preprocessed source.
//!
//! The passes share one view of the text: classes found by [`find_classes`]
//! and their members by [`scan_members`]. Offsets always refer to the text
//! the pass received; passes that rewrite re-scan rather than patch stale
//! offsets.

pub(crate) mod capabilities;
pub(crate) mod decorators;
pub(crate) mod imports;
pub(crate) mod props;
pub(crate) mod strip_types;

use crate::diagnostics::CompileError;
use crate::lexer::Scanner;

/// The name the runtime base component is imported under.
pub(crate) const BASE_COMPONENT: &str = "BaseComponent";

/// One `@decorator` or `@decorator(args)` use.
#[derive(Debug, Clone)]
pub(crate) struct DecoratorUse {
    pub name: String,
    pub args: Option<String>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub(crate) struct ClassInfo {
    pub name: String,
    /// Class-level decorators, in source order.
    pub decorators: Vec<DecoratorUse>,
    /// Offset of the `class` keyword.
    pub class_kw: usize,
    pub body_open: usize,
    /// One past the closing brace.
    pub body_close: usize,
    pub extends: Option<String>,
}

/// Locate class declarations reachable at module level.
pub(crate) fn find_classes(src: &str) -> Result<Vec<ClassInfo>, CompileError> {
    let sc = Scanner::new(src);
    let mut classes = Vec::new();
    let mut pending: Vec<DecoratorUse> = Vec::new();
    let mut prev_dot = false;
    let mut pos = 0usize;

    while pos < sc.len() {
        let next = sc.skip_trivia(pos);
        if next >= sc.len() {
            break;
        }
        pos = next;

        match sc.byte(pos).unwrap() {
            b'@' => {
                let (dec, end) = parse_decorator(&sc, pos)?;
                pending.push(dec);
                pos = end;
                prev_dot = false;
            }
            b'.' => {
                prev_dot = true;
                pos += 1;
            }
            b if Scanner::is_ident_start(b) => {
                let (ident, end) = sc.read_ident(pos).expect("ident start");
                if ident == "class" && !prev_dot {
                    match parse_class(&sc, pos, end, std::mem::take(&mut pending))? {
                        Some((class, after)) => {
                            pos = after;
                            classes.push(class);
                        }
                        None => pos = end,
                    }
                } else if matches!(ident, "export" | "default" | "abstract") {
                    // Modifiers between decorators and the class keyword.
                    pos = end;
                } else {
                    pending.clear();
                    pos = end;
                }
                prev_dot = false;
            }
            _ => {
                pending.clear();
                prev_dot = false;
                pos = sc.advance_unit(pos)?;
            }
        }
    }

    Ok(classes)
}

fn parse_decorator(sc: &Scanner, at: usize) -> Result<(DecoratorUse, usize), CompileError> {
    let Some((name, mut end)) = sc.read_ident(at + 1) else {
        return Err(sc.unbalanced(at, "expected a decorator name after '@'"));
    };
    let mut args = None;
    let after = sc.skip_trivia(end);
    if sc.byte(after) == Some(b'(') {
        let close = sc.skip_balanced(after, b'(', b')')?;
        args = Some(sc.src[after + 1..close - 1].to_string());
        end = close;
    }
    Ok((
        DecoratorUse {
            name: name.to_string(),
            args,
            start: at,
            end,
        },
        end,
    ))
}

fn parse_class(
    sc: &Scanner,
    class_kw: usize,
    after_kw: usize,
    decorators: Vec<DecoratorUse>,
) -> Result<Option<(ClassInfo, usize)>, CompileError> {
    let name_pos = sc.skip_trivia(after_kw);
    let Some((name, name_end)) = sc.read_ident(name_pos) else {
        // Anonymous class expression; nothing for the passes to do.
        return Ok(None);
    };

    let mut extends = None;
    let mut cursor = name_end;
    loop {
        cursor = sc.skip_trivia(cursor);
        match sc.byte(cursor) {
            Some(b'{') => break,
            Some(b) if Scanner::is_ident_start(b) => {
                let (ident, end) = sc.read_ident(cursor).expect("ident start");
                if ident == "extends" {
                    let base_pos = sc.skip_trivia(end);
                    if let Some((base, base_end)) = sc.read_ident(base_pos) {
                        extends = Some(base.to_string());
                        cursor = base_end;
                        continue;
                    }
                }
                cursor = end;
            }
            Some(_) => cursor = sc.advance_unit(cursor)?,
            None => return Err(sc.unbalanced(name_pos, "class header never opens a body")),
        }
    }

    let body_open = cursor;
    let body_close = sc.skip_balanced(body_open, b'{', b'}')?;
    Ok(Some((
        ClassInfo {
            name: name.to_string(),
            decorators,
            class_kw,
            body_open,
            body_close,
            extends,
        },
        body_close,
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    Method,
    Getter,
    Setter,
    Field,
}

#[derive(Debug)]
pub(crate) struct MemberInfo {
    pub kind: MemberKind,
    pub name: String,
    pub name_start: usize,
    pub name_end: usize,
    pub decorators: Vec<DecoratorUse>,
    /// Modifier keywords (`static`, `private`, ...) with their spans.
    pub modifiers: Vec<(String, usize, usize)>,
    /// One past the member's last byte (`;` or closing body brace).
    pub end: usize,
    /// Parameter list `(`..`)` span for methods and accessors.
    pub params: Option<(usize, usize)>,
    /// `:` of the return annotation, if present.
    pub ret_colon: Option<usize>,
    /// `:` of a field's type annotation, if present.
    pub field_colon: Option<usize>,
    /// `=` of a field initialiser, if present.
    pub field_eq: Option<usize>,
}

const MODIFIERS: &[&str] = &[
    "static",
    "private",
    "public",
    "protected",
    "readonly",
    "abstract",
    "async",
    "override",
];

/// Scan the members of one class body.
pub(crate) fn scan_members(
    src: &str,
    body_open: usize,
    body_close: usize,
) -> Result<Vec<MemberInfo>, CompileError> {
    let sc = Scanner::new(src);
    let mut members = Vec::new();
    let mut cursor = body_open + 1;
    let body_end = body_close - 1;

    'members: while cursor < body_end {
        cursor = sc.skip_trivia(cursor);
        if cursor >= body_end {
            break;
        }
        if sc.byte(cursor) == Some(b';') {
            cursor += 1;
            continue;
        }

        let mut decorators = Vec::new();
        while sc.byte(cursor) == Some(b'@') {
            let (dec, end) = parse_decorator(&sc, cursor)?;
            decorators.push(dec);
            cursor = sc.skip_trivia(end);
        }

        let mut modifiers = Vec::new();
        let mut kind = MemberKind::Field;
        let (name, name_start, name_end) = loop {
            let Some((ident, end)) = sc.read_ident(cursor) else {
                // Computed names and other shapes this scanner does not
                // model: skip one unit and retry as a fresh member.
                cursor = sc.advance_unit(cursor)?;
                continue 'members;
            };
            let after = sc.skip_trivia(end);

            if MODIFIERS.contains(&ident) && sc.byte(after).map(Scanner::is_ident_start).unwrap_or(false)
            {
                modifiers.push((ident.to_string(), cursor, end));
                cursor = after;
                continue;
            }
            if (ident == "get" || ident == "set")
                && sc.byte(after).map(Scanner::is_ident_start).unwrap_or(false)
            {
                kind = if ident == "get" {
                    MemberKind::Getter
                } else {
                    MemberKind::Setter
                };
                let (name, nend) = sc.read_ident(after).expect("accessor name");
                break (name.to_string(), after, nend);
            }
            break (ident.to_string(), cursor, end);
        };

        cursor = sc.skip_trivia(name_end);
        // Optional marker on fields.
        if sc.byte(cursor) == Some(b'?') {
            cursor = sc.skip_trivia(cursor + 1);
        }

        let mut params = None;
        let mut ret_colon = None;
        let mut field_colon = None;
        let mut field_eq = None;
        let end;

        if sc.byte(cursor) == Some(b'(') {
            if kind == MemberKind::Field {
                kind = MemberKind::Method;
            }
            let params_close = sc.skip_balanced(cursor, b'(', b')')?;
            params = Some((cursor, params_close));
            cursor = sc.skip_trivia(params_close);
            if sc.byte(cursor) == Some(b':') {
                ret_colon = Some(cursor);
                cursor = consume_type(&sc, cursor + 1)?;
                cursor = sc.skip_trivia(cursor);
            }
            if sc.byte(cursor) == Some(b'{') {
                end = sc.skip_balanced(cursor, b'{', b'}')?;
            } else {
                // Declaration without a body.
                end = skip_to_semicolon(&sc, cursor, body_end)?;
            }
        } else {
            if sc.byte(cursor) == Some(b':') {
                field_colon = Some(cursor);
                cursor = consume_type(&sc, cursor + 1)?;
                cursor = sc.skip_trivia(cursor);
            }
            if sc.byte(cursor) == Some(b'=') {
                field_eq = Some(cursor);
                cursor += 1;
            }
            end = skip_to_semicolon(&sc, cursor, body_end)?;
        }

        members.push(MemberInfo {
            kind,
            name,
            name_start,
            name_end,
            decorators,
            modifiers,
            end,
            params,
            ret_colon,
            field_colon,
            field_eq,
        });
        cursor = end;
    }

    Ok(members)
}

/// Find the end of a field that started before `pos`: the `;`, or the end
/// of the logical line when the author relied on semicolon insertion.
fn skip_to_semicolon(sc: &Scanner, mut pos: usize, limit: usize) -> Result<usize, CompileError> {
    loop {
        while matches!(sc.byte(pos), Some(b' ') | Some(b'\t') | Some(b'\r')) {
            pos += 1;
        }
        if sc.starts_with(pos, "//") {
            while pos < limit && sc.byte(pos) != Some(b'\n') {
                pos += 1;
            }
        } else if sc.starts_with(pos, "/*") {
            pos += 2;
            while pos < limit && !sc.starts_with(pos, "*/") {
                pos += 1;
            }
            pos = (pos + 2).min(limit);
            continue;
        }
        if pos >= limit {
            return Ok(pos);
        }
        match sc.byte(pos) {
            Some(b';') => return Ok(pos + 1),
            Some(b'\n') => return Ok(pos),
            Some(_) => pos = sc.advance_unit(pos)?,
            None => return Ok(pos),
        }
    }
}

/// Consume one type expression starting after a `:`. Stops before a method
/// body brace, an initialiser `=`, or any member/list delimiter.
pub(crate) fn consume_type(sc: &Scanner, mut pos: usize) -> Result<usize, CompileError> {
    let mut consumed_any = false;
    loop {
        pos = sc.skip_trivia(pos);
        match sc.byte(pos) {
            Some(b'{') if consumed_any => return Ok(pos),
            Some(b'{') => {
                pos = sc.skip_balanced(pos, b'{', b'}')?;
                consumed_any = true;
            }
            Some(b'(') => {
                pos = sc.skip_balanced(pos, b'(', b')')?;
                consumed_any = true;
            }
            Some(b'[') => {
                pos = sc.skip_balanced(pos, b'[', b']')?;
                consumed_any = true;
            }
            Some(b'<') => {
                pos = skip_angles(sc, pos)?;
                consumed_any = true;
            }
            Some(b'=') if sc.starts_with(pos, "=>") => {
                pos += 2;
            }
            Some(b'|') | Some(b'&') | Some(b'.') => pos += 1,
            Some(b'\'') | Some(b'"') | Some(b'`') => {
                pos = sc.skip_string(pos)?;
                consumed_any = true;
            }
            Some(b) if Scanner::is_ident_continue(b) => {
                pos += 1;
                consumed_any = true;
            }
            _ => return Ok(pos),
        }
    }
}

fn skip_angles(sc: &Scanner, open: usize) -> Result<usize, CompileError> {
    let mut depth = 0usize;
    let mut pos = open;
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
                    return Ok(pos);
                }
            }
            Some(b'\'') | Some(b'"') | Some(b'`') => pos = sc.skip_string(pos)?,
            Some(_) => pos += 1,
            None => break,
        }
    }
    Err(sc.unbalanced(open, "unbalanced type parameter list"))
}
