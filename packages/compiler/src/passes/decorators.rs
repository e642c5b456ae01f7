//! Pass 1: lifecycle/render decorator lowering.
//!
//! Decorators are stripped from their member and re-emitted as post-class
//! calls of the form
//! `Decorator(args)(Class.prototype, "member", Object.getOwnPropertyDescriptor(Class.prototype, "member"))`,
//! which is how a target without a decorator protocol represents them.
//! Class-level decorators become `Decorator(args)(Class)` calls.
//!
//! Shape rules are enforced here: `@render` must decorate a method
//! (LC1001), `@computed` a getter or method (LC1002), and the lifecycle
//! decorators methods (LC1003). `@requires`/`@provides` are left for the
//! capability pass.

use crate::diagnostics::{CompileError, ErrorCode, Span};
use crate::passes::{find_classes, scan_members, ClassInfo, DecoratorUse, MemberInfo, MemberKind};
use std::fmt::Write as _;

const LIFECYCLE_DECORATORS: &[&str] = &["onMount", "onUpdate", "onDestroy", "onError"];
const CAPABILITY_DECORATORS: &[&str] = &["requires", "provides"];

pub(crate) fn lower(src: &str) -> Result<String, CompileError> {
    let classes = find_classes(src)?;
    let mut out = src.to_string();

    // Classes are edited back-to-front so earlier offsets stay valid.
    for class in classes.iter().rev() {
        lower_class(&mut out, src, class)?;
    }
    Ok(out)
}

fn lower_class(out: &mut String, src: &str, class: &ClassInfo) -> Result<(), CompileError> {
    let members = scan_members(src, class.body_open, class.body_close)?;

    let mut removals: Vec<(usize, usize)> = Vec::new();
    let mut calls = String::new();

    for member in &members {
        for dec in &member.decorators {
            validate(dec, member, src)?;
            removals.push((dec.start, dec.end));
            let args = dec.args.as_deref().unwrap_or("");
            let _ = write!(
                calls,
                "\n{dec}({args})({class}.prototype, \"{member}\", \
                 Object.getOwnPropertyDescriptor({class}.prototype, \"{member}\"));",
                dec = dec.name,
                args = args,
                class = class.name,
                member = member.name,
            );
        }
    }

    for dec in &class.decorators {
        if CAPABILITY_DECORATORS.contains(&dec.name.as_str()) {
            continue;
        }
        removals.push((dec.start, dec.end));
        let args = dec.args.as_deref().unwrap_or("");
        let _ = write!(
            calls,
            "\n{dec}({args})({class});",
            dec = dec.name,
            args = args,
            class = class.name,
        );
    }

    // Insert at the largest offset first, then strip decorator spans in
    // descending order.
    if !calls.is_empty() {
        out.insert_str(class.body_close, &calls);
    }
    removals.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end) in removals {
        out.replace_range(start..end, "");
    }
    Ok(())
}

fn validate(dec: &DecoratorUse, member: &MemberInfo, src: &str) -> Result<(), CompileError> {
    let span = Span::of_range(src, dec.start, dec.end);
    let name = dec.name.as_str();

    if name == "render" && member.kind != MemberKind::Method {
        return Err(CompileError::new(
            ErrorCode::LC1001,
            span,
            format!("@render must decorate a method, not the {} `{}`", describe(member), member.name),
        ));
    }
    if name == "computed" && !matches!(member.kind, MemberKind::Getter | MemberKind::Method) {
        return Err(CompileError::new(
            ErrorCode::LC1002,
            span,
            format!(
                "@computed must decorate a getter or method, not the {} `{}`",
                describe(member),
                member.name
            ),
        ));
    }
    if LIFECYCLE_DECORATORS.contains(&name) && member.kind != MemberKind::Method {
        return Err(CompileError::new(
            ErrorCode::LC1003,
            span,
            format!(
                "@{} must decorate a method, not the {} `{}`",
                name,
                describe(member),
                member.name
            ),
        ));
    }
    Ok(())
}

fn describe(member: &MemberInfo) -> &'static str {
    match member.kind {
        MemberKind::Method => "method",
        MemberKind::Getter => "getter",
        MemberKind::Setter => "setter",
        MemberKind::Field => "field",
    }
}
