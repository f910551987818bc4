//! The MOTLY tree: [`Node`], its [`Value`] slot, and link/env references.

use indexmap::IndexMap;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A date or date-time literal. The original source text is retained
/// alongside the decomposed fields so a downstream codec can preserve
/// whatever precision the author wrote, per the design notes on dates.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotlyDate {
    /// Exact substring that followed `@` in the source.
    pub raw: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millisecond: u32,
    /// `None` means no zone offset was given in the source (naive).
    pub offset_minutes: Option<i32>,
}

impl MotlyDate {
    /// Epoch milliseconds, used for schema `eq` comparisons. A naive
    /// (offset-less) date is treated as UTC.
    pub fn epoch_millis(&self) -> i64 {
        use chrono::{NaiveDate, NaiveDateTime};
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        let time = date
            .and_hms_milli_opt(self.hour, self.minute, self.second, self.millisecond)
            .unwrap_or_else(|| date.and_hms_opt(0, 0, 0).unwrap());
        let naive: NaiveDateTime = time;
        let offset_secs = self.offset_minutes.unwrap_or(0) as i64 * 60;
        naive.and_utc().timestamp_millis() - offset_secs * 1000
    }
}

impl PartialEq for MotlyDate {
    fn eq(&self, other: &Self) -> bool {
        self.epoch_millis() == other.epoch_millis()
    }
}

/// An opaque `@env.NAME` placeholder. Never substituted by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvRef {
    pub name: String,
}

/// One component of a link path: a property name, optionally followed
/// by one or more `[index]` array accessors chained directly after it
/// (e.g. the `b[0][1]` in `$a.b[0][1]`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathSegment {
    pub name: String,
    pub indices: Vec<u64>,
}

impl PathSegment {
    pub fn name(name: impl Into<String>) -> Self {
        PathSegment {
            name: name.into(),
            indices: Vec::new(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for idx in &self.indices {
            write!(f, "[{}]", idx)?;
        }
        Ok(())
    }
}

/// `{ linkTo: "$^^path" }` — identity pointer, never a value or
/// property holder of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkRef {
    pub ups: u32,
    pub segments: Vec<PathSegment>,
}

impl LinkRef {
    pub fn absolute(segments: Vec<PathSegment>) -> Self {
        LinkRef { ups: 0, segments }
    }

    /// The canonical `linkTo` string: `$`, then `^` * ups, then segments
    /// joined by `.`.
    pub fn link_to(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LinkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('$')?;
        for _ in 0..self.ups {
            f.write_char('^')?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

/// Error parsing a `linkTo` string outside of the main parser (used by
/// the reference resolver and the schema validator, which both re-parse
/// stored link strings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParseError(pub String);

impl fmt::Display for LinkParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid reference syntax: {}", self.0)
    }
}

impl std::error::Error for LinkParseError {}

impl FromStr for LinkRef {
    type Err = LinkParseError;

    /// Re-parses a canonical `linkTo` string (as produced by `Display`).
    /// Used by the reference resolver and schema validator, which only
    /// ever see strings this crate itself generated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use crate::cursor::SourceCursor;
        use crate::lex::read_reference;

        let mut cur = SourceCursor::new(s);
        if !cur.starts_with("$") {
            return Err(LinkParseError(s.to_string()));
        }
        let link = read_reference(&mut cur).map_err(|_| LinkParseError(s.to_string()))?;
        if !cur.is_eof() {
            return Err(LinkParseError(s.to_string()));
        }
        Ok(link)
    }
}

/// The value held by a node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Absent,
    String(String),
    Number(f64),
    Boolean(bool),
    Date(MotlyDate),
    Array(Vec<Node>),
    Link(LinkRef),
    Env(EnvRef),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_link(&self) -> Option<&LinkRef> {
        match self {
            Value::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// The universal tree element: an optional value, a property bag, and a
/// tombstone flag.
///
/// Invariant: when `value` is `Value::Link(_)`, `properties` is always
/// empty — a link has no own value or properties (spec.md §3).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    pub value: Value,
    pub properties: IndexMap<String, Node>,
    pub deleted: bool,
}

impl Node {
    pub fn empty() -> Self {
        Node {
            value: Value::Absent,
            properties: IndexMap::new(),
            deleted: false,
        }
    }

    pub fn with_value(value: Value) -> Self {
        Node {
            value,
            properties: IndexMap::new(),
            deleted: false,
        }
    }

    pub fn tombstone() -> Self {
        Node {
            value: Value::Absent,
            properties: IndexMap::new(),
            deleted: true,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self.value, Value::Link(_))
    }

    /// Get-or-create a direct child, replacing a link occupant with an
    /// empty node per the "links are opaque, cannot be mutated through"
    /// rule used throughout the interpreter. Any tombstone found at
    /// `key` is un-tombstoned: per spec.md §3, "an operator targeting a
    /// `deleted=true` node overwrites the tombstone".
    pub fn child_mut(&mut self, key: &str) -> &mut Node {
        if let Some(existing) = self.properties.get(key) {
            if existing.is_link() {
                self.properties.insert(key.to_string(), Node::empty());
            }
        }
        let entry = self
            .properties
            .entry(key.to_string())
            .or_insert_with(Node::empty);
        entry.deleted = false;
        entry
    }
}

/// Order-independent structural equality: properties compare as a set
/// of key/value pairs, not as a sequence (spec.md §3).
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.value != other.value || self.deleted != other.deleted {
            return false;
        }
        if self.properties.len() != other.properties.len() {
            return false;
        }
        self.properties
            .iter()
            .all(|(k, v)| other.properties.get(k).is_some_and(|ov| ov == v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_order_does_not_affect_equality() {
        let mut a = Node::empty();
        a.properties
            .insert("x".into(), Node::with_value(Value::Number(1.0)));
        a.properties
            .insert("y".into(), Node::with_value(Value::Number(2.0)));

        let mut b = Node::empty();
        b.properties
            .insert("y".into(), Node::with_value(Value::Number(2.0)));
        b.properties
            .insert("x".into(), Node::with_value(Value::Number(1.0)));

        assert_eq!(a, b);
    }

    #[test]
    fn link_round_trips_through_display_and_from_str() {
        let link = LinkRef {
            ups: 2,
            segments: vec![
                PathSegment::name("a"),
                PathSegment {
                    name: "b".into(),
                    indices: vec![0, 1],
                },
            ],
        };
        let s = link.to_string();
        assert_eq!(s, "$^^a.b[0][1]");
        let parsed: LinkRef = s.parse().unwrap();
        assert_eq!(parsed, link);
    }

    #[test]
    fn child_mut_replaces_link_occupant() {
        let mut root = Node::empty();
        root.properties.insert(
            "a".into(),
            Node::with_value(Value::Link(LinkRef::absolute(vec![PathSegment::name(
                "b",
            )]))),
        );
        let child = root.child_mut("a");
        assert!(!child.is_link());
    }
}
