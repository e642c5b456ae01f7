//! Pass 4: import injection.
//!
//! Transformed modules reference the runtime base component; when the
//! module never imported from the runtime namespace, the canonical import
//! is added at the top so the output stands alone as an ES module.

use crate::passes::BASE_COMPONENT;
use once_cell::sync::Lazy;
use regex::Regex;

/// The module every compiled component imports the runtime from.
pub const RUNTIME_NAMESPACE: &str = "@casement/runtime";

static RE_BASE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bBaseComponent\b").unwrap());

static RE_RUNTIME_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+[^;]*from\s+["']@casement/runtime["']"#).unwrap()
});

pub(crate) fn inject(src: &str) -> String {
    if RE_BASE_REFERENCE.is_match(src) && !RE_RUNTIME_IMPORT.is_match(src) {
        format!(
            "import {{ {} }} from \"{}\";\n{}",
            BASE_COMPONENT, RUNTIME_NAMESPACE, src
        )
    } else {
        src.to_string()
    }
}
