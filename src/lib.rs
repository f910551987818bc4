//! A parser, interpreter and validator for MOTLY, a human-friendly
//! configuration language in which every named entry carries two
//! orthogonal slots: a scalar/array/reference **value** and a
//! **properties** map of named child entries.
//!
//! Three assignment operators manipulate the two slots independently —
//! `=` writes the value and merges any trailing properties block, `:`
//! replaces the properties wholesale while preserving the value, and
//! `:=` either clones another node by reference or replaces both slots
//! outright. A source text is a stream of such statements, applied
//! cumulatively to an in-memory tree.
//!
//! # Example
//!
//! ```rust
//! use motly::{Node, Value};
//!
//! let mut tree = Node::empty();
//! let statements = motly::parse_source(
//!     "server = webhost { port = 8080 }\n\
//!      copy := $server",
//! )
//! .unwrap();
//! let diags = motly::apply_statements(&mut tree, &statements);
//! assert!(diags.is_empty());
//!
//! let server = tree.properties.get("server").unwrap();
//! assert_eq!(server.value, Value::String("webhost".to_string()));
//! assert_eq!(
//!     tree.properties.get("copy").unwrap().properties.get("port").unwrap().value,
//!     server.properties.get("port").unwrap().value,
//! );
//! ```

mod cursor;
mod diagnostic;
mod interpreter;
mod lex;
mod node;
mod parser;
mod resolver;
mod schema;
mod session;
mod statement;

pub use cursor::{Position, SourceCursor, Span};
pub use diagnostic::{Diagnostic, ErrorCode, Location};
pub use interpreter::apply_statements;
pub use node::{EnvRef, LinkParseError, LinkRef, MotlyDate, Node, PathSegment, Value};
pub use parser::parse_source;
pub use resolver::validate_references;
pub use schema::validate as validate_schema;
pub use session::Session;
pub use statement::{Path, Statement};
