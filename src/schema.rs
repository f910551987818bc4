//! Schema validator: checks a value tree against a schema tree built
//! from the same [`Node`] shape (spec.md §4.5). `regex` is the same
//! dependency the teacher crate uses for its own pattern matching, here
//! backing `matches` type specs.

use std::collections::HashSet;

use regex::Regex;

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::node::{Node, Value};

/// Validate `tree` against `schema`. The schema root's `Types` section
/// (if any) is the sole source of custom type names for the whole
/// validation pass — it is never re-read from a nested spec.
pub fn validate(tree: &Node, schema: &Node) -> Vec<Diagnostic> {
    let types = schema.properties.get("Types");
    let mut diags = Vec::new();
    let mut path = Vec::new();
    validate_node(tree, schema, types, &mut path, &mut diags);
    diags
}

enum AdditionalPolicy {
    Reject,
    Allow,
    Named(String),
}

fn additional_policy(additional: Option<&Node>) -> AdditionalPolicy {
    match additional {
        None => AdditionalPolicy::Reject,
        Some(node) => match &node.value {
            Value::Absent => AdditionalPolicy::Allow,
            Value::String(s) if s == "allow" => AdditionalPolicy::Allow,
            Value::String(s) if s == "reject" => AdditionalPolicy::Reject,
            Value::String(s) => AdditionalPolicy::Named(s.clone()),
            _ => AdditionalPolicy::Reject,
        },
    }
}

/// Dispatch on the type-spec priority order: union, enum, pattern,
/// named type, nested schema.
///
/// An enum can be spelled two ways: an explicit `eq` sub-property, or —
/// per spec.md §6's wire form and the literal `Lv = [debug, info, warn]`
/// scenario — a type-spec whose own value slot is the candidate array
/// directly. Both dispatch through the same `validate_eq`.
fn validate_node(
    target: &Node,
    spec: &Node,
    types: Option<&Node>,
    path: &mut Vec<String>,
    diags: &mut Vec<Diagnostic>,
) {
    if let Some(one_of) = spec.properties.get("oneOf") {
        validate_one_of(target, one_of, types, path, diags);
        return;
    }
    if let Some(eq) = spec.properties.get("eq") {
        validate_eq(target, eq, path, diags);
        return;
    }
    if let Some(matches_node) = spec.properties.get("matches") {
        validate_pattern(target, matches_node, spec, types, path, diags);
        return;
    }
    if let Value::Array(_) = &spec.value {
        validate_eq(target, spec, path, diags);
        return;
    }
    if let Value::String(name) = &spec.value {
        validate_named(target, name, types, path, diags);
        return;
    }
    validate_nested(target, spec, types, path, diags);
}

fn wrong_type(path: &[String], message: impl Into<String>) -> Diagnostic {
    Diagnostic::path(ErrorCode::WrongType, message, path.to_vec())
}

fn validate_one_of(
    target: &Node,
    one_of: &Node,
    types: Option<&Node>,
    path: &mut Vec<String>,
    diags: &mut Vec<Diagnostic>,
) {
    let names: Vec<String> = match &one_of.value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match &item.value {
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => {
            diags.push(Diagnostic::path(
                ErrorCode::InvalidSchema,
                "'oneOf' must be an array of type names",
                path.clone(),
            ));
            return;
        }
    };

    for name in &names {
        let mut scratch = Vec::new();
        let mut scratch_path = path.clone();
        validate_named(target, name, types, &mut scratch_path, &mut scratch);
        if scratch.is_empty() {
            return;
        }
    }
    diags.push(wrong_type(
        path,
        format!("value does not match any of [{}]", names.join(", ")),
    ));
}

fn validate_eq(target: &Node, eq: &Node, path: &mut Vec<String>, diags: &mut Vec<Diagnostic>) {
    if target.is_link() {
        diags.push(wrong_type(path, "found a link, expected an enum value"));
        return;
    }
    let candidates = match &eq.value {
        Value::Array(items) => items,
        _ => {
            diags.push(Diagnostic::path(
                ErrorCode::InvalidSchema,
                "'eq' must be an array",
                path.clone(),
            ));
            return;
        }
    };
    let matched = candidates.iter().any(|c| c.value == target.value);
    if !matched {
        diags.push(Diagnostic::path(
            ErrorCode::InvalidEnumValue,
            "value is not one of the allowed enum values",
            path.clone(),
        ));
    }
}

fn validate_pattern(
    target: &Node,
    matches_node: &Node,
    spec: &Node,
    types: Option<&Node>,
    path: &mut Vec<String>,
    diags: &mut Vec<Diagnostic>,
) {
    if target.is_link() {
        diags.push(wrong_type(path, "found a link, expected a string"));
        return;
    }
    let pattern = match &matches_node.value {
        Value::String(s) => s,
        _ => {
            diags.push(Diagnostic::path(
                ErrorCode::InvalidSchema,
                "'matches' must be a string",
                path.clone(),
            ));
            return;
        }
    };
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => {
            diags.push(Diagnostic::path(
                ErrorCode::InvalidSchema,
                format!("invalid regex '{}': {}", pattern, err),
                path.clone(),
            ));
            return;
        }
    };
    let text = match &target.value {
        Value::String(s) => s,
        _ => {
            diags.push(wrong_type(path, "expected a string"));
            return;
        }
    };
    if !re.is_match(text) {
        diags.push(Diagnostic::path(
            ErrorCode::PatternMismatch,
            format!("'{}' does not match pattern '{}'", text, pattern),
            path.clone(),
        ));
        return;
    }
    if let Value::String(base_type) = &spec.value {
        validate_named(target, base_type, types, path, diags);
    }
}

fn validate_named(
    target: &Node,
    name: &str,
    types: Option<&Node>,
    path: &mut Vec<String>,
    diags: &mut Vec<Diagnostic>,
) {
    if let Some(inner) = name.strip_suffix("[]") {
        if target.is_link() {
            diags.push(wrong_type(path, "found a link, expected an array"));
            return;
        }
        match target.value.as_array() {
            None => diags.push(wrong_type(path, "expected an array")),
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    path.push(format!("[{}]", i));
                    validate_named(item, inner, types, path, diags);
                    path.pop();
                }
            }
        }
        return;
    }

    match name {
        "any" => {}
        "flag" => {}
        "tag" => {
            if target.is_link() {
                diags.push(wrong_type(path, "found a link, expected a tag"));
            }
        }
        "string" | "number" | "boolean" | "date" => {
            if target.is_link() {
                diags.push(wrong_type(path, format!("found a link, expected {}", name)));
                return;
            }
            let ok = match (name, &target.value) {
                ("string", Value::String(_)) => true,
                ("number", Value::Number(_)) => true,
                ("boolean", Value::Boolean(_)) => true,
                ("date", Value::Date(_)) => true,
                _ => false,
            };
            if !ok {
                diags.push(wrong_type(path, format!("expected {}", name)));
            }
        }
        other => match types.and_then(|t| t.properties.get(other)) {
            None => diags.push(Diagnostic::path(
                ErrorCode::InvalidSchema,
                format!("unknown type '{}'", other),
                path.clone(),
            )),
            Some(type_spec) => validate_node(target, type_spec, types, path, diags),
        },
    }
}

fn validate_nested(
    target: &Node,
    spec: &Node,
    types: Option<&Node>,
    path: &mut Vec<String>,
    diags: &mut Vec<Diagnostic>,
) {
    if target.is_link() {
        diags.push(wrong_type(path, "found a link, expected a structured value"));
        return;
    }

    let required = spec.properties.get("Required");
    let optional = spec.properties.get("Optional");
    let additional = spec.properties.get("Additional");

    let mut known: HashSet<&str> = HashSet::new();

    if let Some(req) = required {
        for (name, sub_spec) in &req.properties {
            known.insert(name.as_str());
            match target.properties.get(name) {
                None => {
                    path.push(name.clone());
                    diags.push(Diagnostic::path(
                        ErrorCode::MissingRequired,
                        format!("missing required property '{}'", name),
                        path.clone(),
                    ));
                    path.pop();
                }
                Some(value) => {
                    path.push(name.clone());
                    validate_node(value, sub_spec, types, path, diags);
                    path.pop();
                }
            }
        }
    }

    if let Some(opt) = optional {
        for (name, sub_spec) in &opt.properties {
            known.insert(name.as_str());
            if let Some(value) = target.properties.get(name) {
                path.push(name.clone());
                validate_node(value, sub_spec, types, path, diags);
                path.pop();
            }
        }
    }

    let policy = additional_policy(additional);
    for (name, value) in &target.properties {
        if known.contains(name.as_str()) {
            continue;
        }
        match &policy {
            AdditionalPolicy::Reject => {
                path.push(name.clone());
                diags.push(Diagnostic::path(
                    ErrorCode::UnknownProperty,
                    format!("unknown property '{}'", name),
                    path.clone(),
                ));
                path.pop();
            }
            AdditionalPolicy::Allow => {}
            AdditionalPolicy::Named(type_name) => {
                path.push(name.clone());
                validate_named(value, type_name, types, path, diags);
                path.pop();
            }
        }
    }
}
