//! The Casement source transformer.
//!
//! Lowers the declarative component dialect carried by `.ui`/`.uix` files -
//! `component` blocks, `state`/`mount`/`unmount`/`effect` blocks, reactive
//! state fields, lifecycle and capability decorators - into plain ES2020
//! modules that import only from the runtime namespace. Output is
//! consumable by any ES-module-aware bundler.
//!
//! Two phases. Phase 1 is textual preprocessing: regex-driven rewrites turn
//! the dialect into valid TypeScript-flavoured class syntax. Phase 2 runs
//! the structural passes in order: decorator lowering, capability
//! annotation lowering, the props-field rewrite, runtime import injection
//! and TypeScript stripping.
//!
//! Every failure carries an [`ErrorCode`] and a [`Span`]; the transformer
//! never silently succeeds on an input that produced a diagnostic. Given
//! identical input bytes the output bytes are identical - there is no
//! clock- or randomness-dependent codegen.

mod diagnostics;
mod lexer;
mod preprocess;
mod passes;

pub use diagnostics::{CompileError, ErrorCode, LineColumn, Span};
pub use passes::imports::RUNTIME_NAMESPACE;

/// File extensions the dialect parser accepts, treated identically.
pub const DIALECT_EXTENSIONS: &[&str] = &["ui", "uix"];

/// Embedder hooks for the transformer.
#[derive(Default)]
pub struct TransformOptions {
    /// Resolve an imported module specifier to its source text, used to
    /// chase capability identifiers into imported modules. Without it,
    /// imported identifiers pass through unresolved.
    pub resolve_import: Option<Box<dyn Fn(&str) -> Option<String>>>,
}

/// Transform dialect source text into an ES module.
pub fn transform(source: &str) -> Result<String, CompileError> {
    transform_with(source, &TransformOptions::default())
}

pub fn transform_with(source: &str, options: &TransformOptions) -> Result<String, CompileError> {
    preprocess::validate_no_style(source)?;
    let staged = preprocess::preprocess(source)?;

    let staged = passes::decorators::lower(&staged)?;
    let staged = passes::capabilities::lower(&staged, options)?;
    let staged = passes::props::rewrite(&staged)?;
    let staged = passes::imports::inject(&staged);
    let output = passes::strip_types::strip(&staged)?;

    log::trace!(
        "transformed {} bytes of dialect into {} bytes of ES module",
        source.len(),
        output.len()
    );
    Ok(output)
}

/// Transform a named source file, enforcing the dialect extensions.
pub fn transform_file(name: &str, source: &str) -> Result<String, CompileError> {
    let extension = name.rsplit('.').next().unwrap_or("");
    if !DIALECT_EXTENSIONS.contains(&extension) {
        return Err(CompileError::new(
            ErrorCode::SX1003,
            Span::of_range(source, 0, 0),
            format!(
                "{:?} is not a component source file; expected one of: {}",
                name,
                DIALECT_EXTENSIONS.join(", ")
            ),
        ));
    }
    transform_with(source, &TransformOptions::default())
}
