//! Lexical primitives shared by the parser: character classes,
//! whitespace/comment skipping, and the decoders for bare identifiers,
//! numbers, the five string flavours, heredocs, dates and references.

use crate::cursor::SourceCursor;
use crate::node::{LinkRef, MotlyDate, PathSegment};

/// A lexical-level failure. The parser wraps these into a
/// [`crate::diagnostic::Diagnostic`] with a source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedEof,
    UnterminatedString,
    UnterminatedHeredoc,
    DanglingMinus,
    InvalidNumber,
    InvalidDate,
    InvalidReference,
    InvalidEscape,
}

/// `[A-Za-z0-9_]` plus Latin-Extended / Latin-Extended-Additional.
pub fn is_bare_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || ('\u{00C0}'..='\u{024F}').contains(&c)
        || ('\u{1E00}'..='\u{1EFF}').contains(&c)
}

pub fn is_bare_ident_start(c: char) -> bool {
    is_bare_ident_char(c) && !c.is_ascii_digit()
}

fn is_inline_ws(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Skip inline whitespace, newlines, and `#`-to-end-of-line comments.
/// When `absorb_commas` is set (statement-list level), commas are
/// skipped as whitespace too; inside arrays they remain mandatory
/// separators and must not be passed `absorb_commas = true`.
pub fn skip_trivia(cur: &mut SourceCursor, absorb_commas: bool) {
    loop {
        match cur.peek() {
            Some(c) if is_inline_ws(c) || is_newline(c) => {
                cur.advance();
            }
            Some(',') if absorb_commas => {
                cur.advance();
            }
            Some('#') => {
                while let Some(c) = cur.peek() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    cur.advance();
                }
            }
            _ => break,
        }
    }
}

/// Read a run of bare-identifier characters (possibly empty).
pub fn read_bare_run(cur: &mut SourceCursor) -> String {
    let mut s = String::new();
    while let Some(c) = cur.peek() {
        if is_bare_ident_char(c) {
            s.push(c);
            cur.advance();
        } else {
            break;
        }
    }
    s
}

/// The result of resolving the number/bare-identifier tie-break.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberOrBare {
    Number(f64),
    Bare(String),
}

/// Length, in bytes, of the longest prefix of `s` matching
/// `[-]?(digits(.digits)?|.digits)(e[+-]?digits)?`, or `None` if no
/// such prefix exists (not even a bare `-`).
fn match_number_prefix(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0usize;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let had_int = i > int_start;
    let mut had_frac = false;
    if bytes.get(i) == Some(&b'.') {
        let dot = i;
        let mut j = i + 1;
        let frac_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > frac_start {
            had_frac = true;
            i = j;
        } else {
            i = dot;
        }
    }
    if !had_int && !had_frac {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    Some(i)
}

/// Resolve the number-vs-bare-identifier tie-break at the current
/// cursor position (spec.md §4.2). Consumes exactly the matched token.
pub fn read_number_or_bare(cur: &mut SourceCursor) -> Result<NumberOrBare, LexError> {
    let rest = cur.rest();
    let first = rest.chars().next().ok_or(LexError::UnexpectedEof)?;

    if is_bare_ident_start(first) {
        return Ok(NumberOrBare::Bare(read_bare_run(cur)));
    }

    match match_number_prefix(rest) {
        Some(n) if n > 0 => {
            // the bare-identifier character class — NOT digits, which the
            // numeric grammar already consumed greedily.
            let continues = rest[n..]
                .chars()
                .next()
                .map(is_bare_ident_char)
                .unwrap_or(false);
            if continues {
                Ok(NumberOrBare::Bare(read_bare_run(cur)))
            } else {
                let text = &rest[..n];
                let value: f64 = text.parse().map_err(|_| LexError::InvalidNumber)?;
                cur.advance_bytes(n);
                Ok(NumberOrBare::Number(value))
            }
        }
        _ => {
            if first == '-' {
                Err(LexError::DanglingMinus)
            } else {
                Err(LexError::InvalidNumber)
            }
        }
    }
}

/// Decode a `\<escape>` sequence for the double/triple-double/backtick
/// flavours. `chars` is positioned just after the backslash.
fn decode_escape(cur: &mut SourceCursor) -> Result<char, LexError> {
    let c = cur.advance().ok_or(LexError::UnexpectedEof)?;
    Ok(match c {
        'b' => '\u{8}',
        'f' => '\u{C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'u' => {
            let mut code = 0u32;
            for _ in 0..4 {
                let h = cur.advance().ok_or(LexError::InvalidEscape)?;
                let digit = h.to_digit(16).ok_or(LexError::InvalidEscape)?;
                code = code * 16 + digit;
            }
            char::from_u32(code).ok_or(LexError::InvalidEscape)?
        }
        other => other,
    })
}

/// Double-quoted, non-multiline: `"…"`.
pub fn read_double_quoted(cur: &mut SourceCursor) -> Result<String, LexError> {
    debug_assert!(cur.starts_with("\""));
    cur.advance();
    let mut out = String::new();
    loop {
        match cur.peek() {
            None => return Err(LexError::UnterminatedString),
            Some('"') => {
                cur.advance();
                return Ok(out);
            }
            Some(c) if is_newline(c) => return Err(LexError::UnterminatedString),
            Some('\\') => {
                cur.advance();
                out.push(decode_escape(cur)?);
            }
            Some(c) => {
                out.push(c);
                cur.advance();
            }
        }
    }
}

/// Triple-double, multiline: `"""…"""`.
pub fn read_triple_double(cur: &mut SourceCursor) -> Result<String, LexError> {
    debug_assert!(cur.starts_with("\"\"\""));
    cur.advance_literal("\"\"\"");
    let mut out = String::new();
    loop {
        if cur.starts_with("\"\"\"") {
            cur.advance_literal("\"\"\"");
            return Ok(out);
        }
        match cur.peek() {
            None => return Err(LexError::UnterminatedString),
            Some('\\') => {
                cur.advance();
                out.push(decode_escape(cur)?);
            }
            Some(c) => {
                out.push(c);
                cur.advance();
            }
        }
    }
}

/// Single-raw, non-multiline: `'…'`. `\<c>` is a literal two characters;
/// only an unescaped `'` terminates the string.
pub fn read_single_raw(cur: &mut SourceCursor) -> Result<String, LexError> {
    debug_assert!(cur.starts_with("'"));
    cur.advance();
    let mut out = String::new();
    loop {
        match cur.peek() {
            None => return Err(LexError::UnterminatedString),
            Some('\'') => {
                cur.advance();
                return Ok(out);
            }
            Some(c) if is_newline(c) => return Err(LexError::UnterminatedString),
            Some('\\') => {
                out.push('\\');
                cur.advance();
                if let Some(next) = cur.advance() {
                    out.push(next);
                } else {
                    return Err(LexError::UnterminatedString);
                }
            }
            Some(c) => {
                out.push(c);
                cur.advance();
            }
        }
    }
}

/// Triple-single-raw, multiline: `'''…'''`.
pub fn read_triple_single_raw(cur: &mut SourceCursor) -> Result<String, LexError> {
    debug_assert!(cur.starts_with("'''"));
    cur.advance_literal("'''");
    let mut out = String::new();
    loop {
        if cur.starts_with("'''") {
            cur.advance_literal("'''");
            return Ok(out);
        }
        match cur.peek() {
            None => return Err(LexError::UnterminatedString),
            Some('\\') => {
                out.push('\\');
                cur.advance();
                if let Some(next) = cur.advance() {
                    out.push(next);
                } else {
                    return Err(LexError::UnterminatedString);
                }
            }
            Some(c) => {
                out.push(c);
                cur.advance();
            }
        }
    }
}

/// Backtick-quoted: identifier-only flavour, same escapes as double.
pub fn read_backtick(cur: &mut SourceCursor) -> Result<String, LexError> {
    debug_assert!(cur.starts_with("`"));
    cur.advance();
    let mut out = String::new();
    loop {
        match cur.peek() {
            None => return Err(LexError::UnterminatedString),
            Some('`') => {
                cur.advance();
                return Ok(out);
            }
            Some(c) if is_newline(c) => return Err(LexError::UnterminatedString),
            Some('\\') => {
                cur.advance();
                out.push(decode_escape(cur)?);
            }
            Some(c) => {
                out.push(c);
                cur.advance();
            }
        }
    }
}

/// Heredoc: `<<<` newline … line-trimmed-`>>>`, with common-indentation
/// dedent and a trailing newline always appended.
pub fn read_heredoc(cur: &mut SourceCursor) -> Result<String, LexError> {
    debug_assert!(cur.starts_with("<<<"));
    cur.advance_literal("<<<");
    while let Some(c) = cur.peek() {
        if is_inline_ws(c) {
            cur.advance();
        } else {
            break;
        }
    }
    match cur.peek() {
        Some('\n') => {
            cur.advance();
        }
        Some('\r') => {
            cur.advance();
            if cur.peek() == Some('\n') {
                cur.advance();
            }
        }
        _ => return Err(LexError::UnterminatedHeredoc),
    }

    let mut lines: Vec<String> = Vec::new();
    loop {
        if cur.is_eof() {
            return Err(LexError::UnterminatedHeredoc);
        }
        let mut line = String::new();
        loop {
            match cur.peek() {
                None => break,
                Some(c) if is_newline(c) => break,
                Some(c) => {
                    line.push(c);
                    cur.advance();
                }
            }
        }
        // consume the line terminator, if any
        match cur.peek() {
            Some('\r') => {
                cur.advance();
                if cur.peek() == Some('\n') {
                    cur.advance();
                }
            }
            Some('\n') => {
                cur.advance();
            }
            _ => {}
        }
        if line.trim() == ">>>" {
            break;
        }
        lines.push(line);
        if cur.is_eof() {
            return Err(LexError::UnterminatedHeredoc);
        }
    }

    let strip_width = lines
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .unwrap_or(0);

    let mut out = String::new();
    for line in &lines {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        // Clamp the strip to this line's own leading-whitespace run: a
        // line less indented than the baseline must never be sliced past
        // its own whitespace, which would both misbehave and (for a
        // multibyte char right after the whitespace) land off a char
        // boundary. Leading whitespace is single-byte ' '/'\t', so this
        // clamp is always a valid boundary.
        let own_leading_ws = line.len() - line.trim_start_matches([' ', '\t']).len();
        let strip = strip_width.min(own_leading_ws);
        out.push_str(&line[strip..]);
        out.push('\n');
    }
    Ok(out)
}

fn read_n_digits(cur: &mut SourceCursor, n: usize) -> Result<u32, LexError> {
    let mut value = 0u32;
    for _ in 0..n {
        let c = cur.peek().ok_or(LexError::InvalidDate)?;
        let d = c.to_digit(10).ok_or(LexError::InvalidDate)?;
        value = value * 10 + d;
        cur.advance();
    }
    Ok(value)
}

/// `@YYYY-MM-DD[THH:MM[:SS[.fff]][Z|±HH:MM|±HHMM]]`, fixed-width ASCII
/// digit consumption; the original substring is retained verbatim.
pub fn read_date(cur: &mut SourceCursor) -> Result<MotlyDate, LexError> {
    debug_assert!(cur.starts_with("@"));
    let start = cur.offset();
    cur.advance(); // '@'
    let raw_start = cur.offset();

    let year = read_n_digits(cur, 4)?;
    if cur.peek() != Some('-') {
        return Err(LexError::InvalidDate);
    }
    cur.advance();
    let month = read_n_digits(cur, 2)?;
    if cur.peek() != Some('-') {
        return Err(LexError::InvalidDate);
    }
    cur.advance();
    let day = read_n_digits(cur, 2)?;

    let mut hour = 0;
    let mut minute = 0;
    let mut second = 0;
    let mut millisecond = 0;
    let mut offset_minutes = None;

    if cur.peek() == Some('T') {
        cur.advance();
        hour = read_n_digits(cur, 2)?;
        if cur.peek() != Some(':') {
            return Err(LexError::InvalidDate);
        }
        cur.advance();
        minute = read_n_digits(cur, 2)?;
        if cur.peek() == Some(':') {
            cur.advance();
            second = read_n_digits(cur, 2)?;
            if cur.peek() == Some('.') {
                cur.advance();
                let frac_start = cur.offset();
                while cur.peek().is_some_and(|c| c.is_ascii_digit()) {
                    cur.advance();
                }
                let text = cur.rest_between(frac_start, cur.offset());
                millisecond = parse_millis(&text);
            }
        }
        match cur.peek() {
            Some('Z') => {
                cur.advance();
                offset_minutes = Some(0);
            }
            Some(sign @ ('+' | '-')) => {
                cur.advance();
                let oh = read_n_digits(cur, 2)?;
                let om = if cur.peek() == Some(':') {
                    cur.advance();
                    read_n_digits(cur, 2)?
                } else if cur.peek().is_some_and(|c| c.is_ascii_digit()) {
                    read_n_digits(cur, 2)?
                } else {
                    0
                };
                let total = (oh * 60 + om) as i32;
                offset_minutes = Some(if sign == '-' { -total } else { total });
            }
            _ => {}
        }
    }

    let raw = cur.rest_between(raw_start, cur.offset());
    let _ = start;
    Ok(MotlyDate {
        raw,
        year: year as i32,
        month,
        day,
        hour,
        minute,
        second,
        millisecond,
        offset_minutes,
    })
}

fn parse_millis(digits: &str) -> u32 {
    if digits.is_empty() {
        return 0;
    }
    let mut text = digits.to_string();
    text.truncate(3.min(text.len()));
    while text.len() < 3 {
        text.push('0');
    }
    text.parse().unwrap_or(0)
}

/// `$` then `^`* then at least one segment (`name` optionally followed
/// by one or more `[index]` accessors), subsequent segments joined by
/// `.`.
pub fn read_reference(cur: &mut SourceCursor) -> Result<LinkRef, LexError> {
    debug_assert!(cur.starts_with("$"));
    cur.advance();
    let mut ups = 0u32;
    while cur.peek() == Some('^') {
        ups += 1;
        cur.advance();
    }
    let mut segments = Vec::new();
    loop {
        let name = read_bare_run(cur);
        if name.is_empty() {
            return Err(LexError::InvalidReference);
        }
        let mut indices = Vec::new();
        while cur.peek() == Some('[') {
            cur.advance();
            let digit_start = cur.offset();
            while cur.peek().is_some_and(|c| c.is_ascii_digit()) {
                cur.advance();
            }
            if cur.offset() == digit_start || cur.peek() != Some(']') {
                return Err(LexError::InvalidReference);
            }
            let text = cur.rest_between(digit_start, cur.offset());
            let idx: u64 = text.parse().map_err(|_| LexError::InvalidReference)?;
            indices.push(idx);
            cur.advance(); // ']'
        }
        segments.push(PathSegment { name, indices });
        if cur.peek() == Some('.') {
            cur.advance();
            continue;
        }
        break;
    }
    if segments.is_empty() {
        return Err(LexError::InvalidReference);
    }
    Ok(LinkRef { ups, segments })
}
