//! Recursive-descent parser: source text → [`Statement`] IR.
//!
//! Single pass, no lookahead beyond what `starts_with` provides (mirrors
//! the teacher's token-at-a-time `Peekable<Chars>` loop in
//! `src/lossy.rs`, adapted to read cursor-driven lookahead directly
//! rather than through a pre-built token list).

use crate::cursor::SourceCursor;
use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::lex::{self, LexError};
use crate::node::{EnvRef, Node, Value};
use crate::statement::{Path, Statement};

pub struct Parser<'a> {
    cur: SourceCursor<'a>,
}

/// Parse a full MOTLY source text into its statement list.
pub fn parse_source(source: &str) -> Result<Vec<Statement>, Diagnostic> {
    let mut parser = Parser {
        cur: SourceCursor::new(source),
    };
    let stmts = parser.parse_statement_list(None)?;
    Ok(stmts)
}

impl<'a> Parser<'a> {
    fn syntax_error(&self, start: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic::span(
            ErrorCode::TagParseSyntaxError,
            message,
            self.cur.span_from(start),
        )
    }

    fn lex_error(&self, start: usize, err: LexError) -> Diagnostic {
        let message = match err {
            LexError::UnexpectedEof => "unexpected end of input",
            LexError::UnterminatedString => "unterminated string literal",
            LexError::UnterminatedHeredoc => "unterminated heredoc",
            LexError::DanglingMinus => "'-' is not a valid value on its own",
            LexError::InvalidNumber => "invalid number",
            LexError::InvalidDate => "invalid date literal",
            LexError::InvalidReference => "invalid reference",
            LexError::InvalidEscape => "invalid escape sequence",
        };
        self.syntax_error(start, message)
    }

    fn skip(&mut self, absorb_commas: bool) {
        lex::skip_trivia(&mut self.cur, absorb_commas);
    }

    // ---- statement lists -------------------------------------------------

    fn parse_statement_list(&mut self, closing: Option<char>) -> Result<Vec<Statement>, Diagnostic> {
        let mut stmts = Vec::new();
        loop {
            self.skip(true);
            match (self.cur.peek(), closing) {
                (None, None) => break,
                (None, Some(_)) => {
                    let start = self.cur.offset();
                    return Err(self.syntax_error(start, "unterminated block, expected '}'"));
                }
                (Some(c), Some(close)) if c == close => {
                    self.cur.advance();
                    break;
                }
                _ => {}
            }
            let stmt = self.parse_statement()?;
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    fn parse_props_block(&mut self) -> Result<Vec<Statement>, Diagnostic> {
        let start = self.cur.offset();
        if self.cur.peek() != Some('{') {
            return Err(self.syntax_error(start, "expected '{'"));
        }
        self.cur.advance();
        self.parse_statement_list(Some('}'))
    }

    fn parse_optional_props_block(&mut self) -> Result<Option<Vec<Statement>>, Diagnostic> {
        self.skip(false);
        if self.cur.peek() == Some('{') {
            Ok(Some(self.parse_props_block()?))
        } else {
            Ok(None)
        }
    }

    // ---- a single statement -----------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        self.skip(true);

        if self.cur.starts_with("-...") {
            self.cur.advance_literal("-...");
            return Ok(Statement::ClearAll);
        }

        if self.cur.peek() == Some('-') {
            self.cur.advance();
            let path = self.parse_path()?;
            return Ok(Statement::Define {
                path,
                deleted: true,
            });
        }

        let path = self.parse_path()?;
        self.skip(false);

        if self.cur.starts_with(":=") {
            self.cur.advance_literal(":=");
            self.skip(false);
            let value = self.parse_value()?;
            let props = self.parse_optional_props_block()?;
            return Ok(Statement::AssignBoth { path, value, props });
        }

        if self.cur.peek() == Some('=') {
            self.cur.advance();
            self.skip(false);
            if self.cur.peek() == Some('{') {
                let start = self.cur.offset();
                return Err(self.syntax_error(
                    start,
                    "'=' cannot be followed by '{' — use ':' for property-only operations",
                ));
            }
            let value = self.parse_value()?;
            let props = self.parse_optional_props_block()?;
            return Ok(Statement::SetValue { path, value, props });
        }

        if self.cur.peek() == Some(':') {
            self.cur.advance();
            self.skip(true);
            let props = self.parse_props_block()?;
            return Ok(Statement::ReplaceProperties { path, props });
        }

        if self.cur.peek() == Some('{') {
            let props = self.parse_props_block()?;
            return Ok(Statement::MergeProperties { path, props });
        }

        Ok(Statement::Define {
            path,
            deleted: false,
        })
    }

    // ---- paths --------------------------------------------------------

    fn parse_path(&mut self) -> Result<Path, Diagnostic> {
        let mut segments = vec![self.parse_path_segment()?];
        loop {
            self.skip(false);
            if self.cur.peek() == Some('.') {
                self.cur.advance();
                self.skip(false);
                segments.push(self.parse_path_segment()?);
            } else {
                break;
            }
        }
        Ok(segments)
    }

    fn parse_path_segment(&mut self) -> Result<String, Diagnostic> {
        self.skip(false);
        let start = self.cur.offset();
        match self.cur.peek() {
            Some('`') => lex::read_backtick(&mut self.cur).map_err(|e| self.lex_error(start, e)),
            Some(c) if lex::is_bare_ident_char(c) => Ok(lex::read_bare_run(&mut self.cur)),
            _ => Err(self.syntax_error(start, "expected a property name")),
        }
    }

    // ---- values ---------------------------------------------------------

    fn parse_value(&mut self) -> Result<Value, Diagnostic> {
        self.skip(false);
        let start = self.cur.offset();
        if self.cur.starts_with("<<<") {
            return lex::read_heredoc(&mut self.cur)
                .map(Value::String)
                .map_err(|e| self.lex_error(start, e));
        }
        match self.cur.peek() {
            None => Err(self.syntax_error(start, "expected a value")),
            Some('[') => self.parse_array().map(Value::Array),
            Some('@') => self.parse_at_form(),
            Some('$') => lex::read_reference(&mut self.cur)
                .map(Value::Link)
                .map_err(|e| self.lex_error(start, e)),
            Some('"') if self.cur.starts_with("\"\"\"") => lex::read_triple_double(&mut self.cur)
                .map(Value::String)
                .map_err(|e| self.lex_error(start, e)),
            Some('"') => lex::read_double_quoted(&mut self.cur)
                .map(Value::String)
                .map_err(|e| self.lex_error(start, e)),
            Some('\'') if self.cur.starts_with("'''") => {
                lex::read_triple_single_raw(&mut self.cur)
                    .map(Value::String)
                    .map_err(|e| self.lex_error(start, e))
            }
            Some('\'') => lex::read_single_raw(&mut self.cur)
                .map(Value::String)
                .map_err(|e| self.lex_error(start, e)),
            Some(_) => lex::read_number_or_bare(&mut self.cur)
                .map(|tok| match tok {
                    lex::NumberOrBare::Number(n) => Value::Number(n),
                    lex::NumberOrBare::Bare(s) => Value::String(s),
                })
                .map_err(|e| self.lex_error(start, e)),
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Node>, Diagnostic> {
        debug_assert!(self.cur.peek() == Some('['));
        self.cur.advance();
        let mut items = Vec::new();
        loop {
            self.skip(false);
            if self.cur.peek() == Some(']') {
                self.cur.advance();
                break;
            }
            let value = self.parse_value()?;
            items.push(Node::with_value(value));
            self.skip(false);
            match self.cur.peek() {
                Some(',') => {
                    self.cur.advance();
                    self.skip(false);
                    if self.cur.peek() == Some(']') {
                        self.cur.advance();
                        break;
                    }
                }
                Some(']') => {
                    self.cur.advance();
                    break;
                }
                _ => {
                    let start = self.cur.offset();
                    return Err(self.syntax_error(start, "expected ',' or ']' in array"));
                }
            }
        }
        Ok(items)
    }

    /// `@true`, `@false`, `@none`, `@env.NAME`, or a date literal.
    fn parse_at_form(&mut self) -> Result<Value, Diagnostic> {
        debug_assert!(self.cur.peek() == Some('@'));
        let start = self.cur.offset();
        let after = &self.cur.rest()[1..];

        if starts_with_word(after, "true") {
            self.cur.advance_bytes(1 + "true".len());
            return Ok(Value::Boolean(true));
        }
        if starts_with_word(after, "false") {
            self.cur.advance_bytes(1 + "false".len());
            return Ok(Value::Boolean(false));
        }
        if starts_with_word(after, "none") {
            self.cur.advance_bytes(1 + "none".len());
            return Ok(Value::Absent);
        }
        if after.starts_with("env.") {
            self.cur.advance_bytes(1 + "env.".len());
            let name = lex::read_bare_run(&mut self.cur);
            if name.is_empty() {
                return Err(self.syntax_error(start, "expected a name after '@env.'"));
            }
            return Ok(Value::Env(EnvRef { name }));
        }

        lex::read_date(&mut self.cur)
            .map(Value::Date)
            .map_err(|e| self.lex_error(start, e))
    }
}

fn starts_with_word(s: &str, word: &str) -> bool {
    s.starts_with(word)
        && s[word.len()..]
            .chars()
            .next()
            .map(|c| !lex::is_bare_ident_char(c))
            .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_value_with_merge_block() {
        let stmts = parse_source("server = webhost { port = 8080 }").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::SetValue { path, value, props } => {
                assert_eq!(path, &vec!["server".to_string()]);
                assert_eq!(value, &Value::String("webhost".to_string()));
                assert!(props.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn equals_followed_by_brace_is_a_syntax_error() {
        let err = parse_source("server = { port = 1 }").unwrap_err();
        assert_eq!(err.code, ErrorCode::TagParseSyntaxError);
    }

    #[test]
    fn dotted_and_backtick_paths() {
        let stmts = parse_source("a.`b c`.d = 1").unwrap();
        match &stmts[0] {
            Statement::SetValue { path, .. } => {
                assert_eq!(path, &vec!["a".to_string(), "b c".to_string(), "d".to_string()]);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn commas_are_whitespace_between_statements() {
        let stmts = parse_source("a = 1, b = 2").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn arrays_require_commas_between_elements() {
        let stmts = parse_source("a = [1, 2, 3,]").unwrap();
        match &stmts[0] {
            Statement::SetValue { value, .. } => {
                assert_eq!(value.as_array().unwrap().len(), 3);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn clear_all_token() {
        let stmts = parse_source("-...").unwrap();
        assert_eq!(stmts, vec![Statement::ClearAll]);
    }

    #[test]
    fn bare_flag_statement() {
        let stmts = parse_source("enabled").unwrap();
        match &stmts[0] {
            Statement::Define { path, deleted } => {
                assert_eq!(path, &vec!["enabled".to_string()]);
                assert!(!deleted);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn tombstone_statement() {
        let stmts = parse_source("-enabled").unwrap();
        match &stmts[0] {
            Statement::Define { path, deleted } => {
                assert_eq!(path, &vec!["enabled".to_string()]);
                assert!(*deleted);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }
}
