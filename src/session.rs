//! A thin synchronous wrapper over the core pipeline, matching the
//! public session surface. Deliberately the smallest possible layer —
//! the core is the parser, interpreter, resolver and validator; this
//! type just owns their state.

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::interpreter::apply_statements;
use crate::node::Node;
use crate::parser::parse_source;
use crate::resolver::validate_references as resolve_references;
use crate::schema::validate as validate_schema_tree;

/// Owns one value tree and at most one schema tree. Not `Sync`/shared —
/// callers serialise their own access, as spec.md §5 requires.
pub struct Session {
    tree: Node,
    schema: Option<Node>,
    disposed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            tree: Node::empty(),
            schema: None,
            disposed: false,
        }
    }

    fn disposed_error() -> Vec<Diagnostic> {
        vec![Diagnostic::path(
            ErrorCode::SessionDisposed,
            "session has been disposed",
            Vec::new(),
        )]
    }

    /// Apply `source` to the session's tree. A parser error aborts and
    /// is returned as the sole diagnostic; otherwise returns the
    /// interpreter's accumulated non-fatal diagnostics.
    pub fn parse(&mut self, source: &str) -> Vec<Diagnostic> {
        if self.disposed {
            return Self::disposed_error();
        }
        match parse_source(source) {
            Ok(statements) => apply_statements(&mut self.tree, &statements),
            Err(diag) => vec![diag],
        }
    }

    /// Parse `source` as a schema tree and install it, replacing any
    /// previously installed schema.
    pub fn parse_schema(&mut self, source: &str) -> Vec<Diagnostic> {
        if self.disposed {
            return Self::disposed_error();
        }
        match parse_source(source) {
            Ok(statements) => {
                let mut schema_tree = Node::empty();
                let diags = apply_statements(&mut schema_tree, &statements);
                self.schema = Some(schema_tree);
                diags
            }
            Err(diag) => vec![diag],
        }
    }

    /// Discard the value tree; the installed schema (if any) is kept.
    pub fn reset(&mut self) {
        self.tree = Node::empty();
    }

    /// A deep copy of the value tree, safe for external mutation.
    pub fn get_value(&self) -> Node {
        self.tree.clone()
    }

    /// Run schema validation against the installed schema. Empty if no
    /// schema is installed.
    pub fn validate_schema(&self) -> Vec<Diagnostic> {
        if self.disposed {
            return Self::disposed_error();
        }
        match &self.schema {
            Some(schema) => validate_schema_tree(&self.tree, schema),
            None => Vec::new(),
        }
    }

    /// Run the reference-resolution pass over the current tree.
    pub fn validate_references(&self) -> Vec<Diagnostic> {
        if self.disposed {
            return Self::disposed_error();
        }
        resolve_references(&self.tree)
    }

    /// Mark the session dead. Idempotent; every other method returns a
    /// single `session-disposed` diagnostic afterwards.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Value;

    #[test]
    fn parse_then_get_value_round_trips() {
        let mut session = Session::new();
        assert!(session.parse("host = example").is_empty());
        let tree = session.get_value();
        assert_eq!(
            tree.properties.get("host").unwrap().value,
            Value::String("example".into())
        );
    }

    #[test]
    fn reset_keeps_schema() {
        let mut session = Session::new();
        session.parse_schema("Required { host = string }");
        session.parse("host = x");
        session.reset();
        let diags = session.validate_schema();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::MissingRequired);
    }

    #[test]
    fn disposed_session_reports_on_every_call() {
        let mut session = Session::new();
        session.dispose();
        assert_eq!(session.parse("x = 1")[0].code, ErrorCode::SessionDisposed);
        assert_eq!(
            session.validate_references()[0].code,
            ErrorCode::SessionDisposed
        );
        session.dispose(); // idempotent
    }
}
