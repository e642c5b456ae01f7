//! Compiler diagnostics: every failure carries an error code and a source
//! position. The transformer never silently succeeds on an input that
//! produced a diagnostic.

use std::fmt;

/// A location in a source file. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// A span of text in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: LineColumn,
    pub end: LineColumn,
}

impl Span {
    pub const fn new(start: LineColumn, end: LineColumn) -> Self {
        Self { start, end }
    }

    /// Compute the span covering `start..end` byte offsets of `source`.
    pub fn of_range(source: &str, start: usize, end: usize) -> Self {
        Span {
            start: line_col(source, start),
            end: line_col(source, end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

pub(crate) fn line_col(source: &str, offset: usize) -> LineColumn {
    let offset = offset.min(source.len());
    let mut line = 1;
    let mut column = 0;
    for byte in source.as_bytes()[..offset].iter() {
        if *byte == b'\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    LineColumn { line, column }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `@render` must decorate a method.
    LC1001,
    /// `@computed` must decorate a getter or method.
    LC1002,
    /// Lifecycle decorators must decorate methods.
    LC1003,
    /// `<style>` elements are forbidden in component source.
    SX1001,
    /// Unbalanced delimiter or unexpected end of input.
    SX1002,
    /// Unsupported source file extension.
    SX1003,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A fatal transformer diagnostic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} at {span}: {message}")]
pub struct CompileError {
    pub code: ErrorCode,
    pub span: Span,
    pub message: String,
}

impl CompileError {
    pub fn new(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        CompileError {
            code,
            span,
            message: message.into(),
        }
    }

    pub fn at_offset(
        code: ErrorCode,
        source: &str,
        start: usize,
        end: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, Span::of_range(source, start, end), message)
    }
}
