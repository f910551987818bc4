//! Diagnostics: the one error-reporting vocabulary shared by the parser,
//! interpreter, reference resolver and schema validator.
//!
//! Parse errors abort the pipeline and carry a [`Span`]; everything else
//! is non-fatal, accumulates, and carries a property [`Path`].

use crate::cursor::Span;
use std::fmt;

/// Stable, user-facing error codes (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TagParseSyntaxError,
    UnresolvedCloneReference,
    CloneReferenceOutOfScope,
    RefWithProperties,
    UnresolvedReference,
    MissingRequired,
    WrongType,
    UnknownProperty,
    InvalidSchema,
    InvalidEnumValue,
    PatternMismatch,
    SessionDisposed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TagParseSyntaxError => "tag-parse-syntax-error",
            ErrorCode::UnresolvedCloneReference => "unresolved-clone-reference",
            ErrorCode::CloneReferenceOutOfScope => "clone-reference-out-of-scope",
            ErrorCode::RefWithProperties => "ref-with-properties",
            ErrorCode::UnresolvedReference => "unresolved-reference",
            ErrorCode::MissingRequired => "missing-required",
            ErrorCode::WrongType => "wrong-type",
            ErrorCode::UnknownProperty => "unknown-property",
            ErrorCode::InvalidSchema => "invalid-schema",
            ErrorCode::InvalidEnumValue => "invalid-enum-value",
            ErrorCode::PatternMismatch => "pattern-mismatch",
            ErrorCode::SessionDisposed => "session-disposed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a diagnostic points: a source span for syntax errors, or a
/// property path for semantic ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Span(Span),
    Path(Vec<String>),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Span(span) => write!(
                f,
                "{}:{}-{}:{}",
                span.begin.line, span.begin.column, span.end.line, span.end.column
            ),
            Location::Path(path) => {
                if path.is_empty() {
                    f.write_str("<root>")
                } else {
                    f.write_str(&path.join("."))
                }
            }
        }
    }
}

/// A single non-fatal (or, for parse errors, pipeline-aborting)
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn span(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            location: Location::Span(span),
        }
    }

    pub fn path(code: ErrorCode, message: impl Into<String>, path: Vec<String>) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            location: Location::Path(path),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.location, self.message)
    }
}

impl std::error::Error for Diagnostic {}
