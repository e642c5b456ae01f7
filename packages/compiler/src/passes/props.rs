//! Pass 3: props-field rewrite.
//!
//! A class extending the runtime base component that declares an instance
//! field named `props` would shadow the instance-level `props` the base
//! class wires up, because field initialisers run after the base
//! constructor. The declaration is rewritten to `static propTypes`, which
//! is what such a field actually means.

use crate::diagnostics::CompileError;
use crate::passes::{find_classes, scan_members, MemberKind, BASE_COMPONENT};

pub(crate) fn rewrite(src: &str) -> Result<String, CompileError> {
    let classes = find_classes(src)?;
    let mut out = src.to_string();

    for class in classes.iter().rev() {
        if class.extends.as_deref() != Some(BASE_COMPONENT) {
            continue;
        }
        let members = scan_members(src, class.body_open, class.body_close)?;
        for member in members.iter().rev() {
            let is_static = member.modifiers.iter().any(|(word, _, _)| word == "static");
            if member.kind == MemberKind::Field && member.name == "props" && !is_static {
                out.replace_range(member.name_start..member.name_end, "static propTypes");
            }
        }
    }

    Ok(out)
}
