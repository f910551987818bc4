//! Applies a [`Statement`] list to a mutable [`Node`] tree.
//!
//! Implemented as plain recursive tree mutation rather than an arena
//! (spec.md §9 notes an arena as "a viable strategy", not a
//! requirement, for trees this small): every clone first resolves and
//! deep-copies its source through a short-lived immutable borrow of the
//! root, then a separate mutable path-walk installs the result — the
//! two borrows never overlap, so no interior mutability is needed.

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::node::{LinkRef, Node, PathSegment, Value};
use crate::statement::{Path, Statement};

/// Apply `statements` to `root` in source order. Returns the
/// accumulated non-fatal diagnostics (spec.md §7).
pub fn apply_statements(root: &mut Node, statements: &[Statement]) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let scope: Path = Vec::new();
    apply_at(root, &scope, statements, &mut diags);
    diags
}

fn apply_at(root: &mut Node, scope: &[String], statements: &[Statement], diags: &mut Vec<Diagnostic>) {
    for stmt in statements {
        apply_one(root, scope, stmt, diags);
    }
}

fn apply_one(root: &mut Node, scope: &[String], stmt: &Statement, diags: &mut Vec<Diagnostic>) {
    tracing::trace!(?stmt, scope = ?scope, "applying statement");
    match stmt {
        Statement::ClearAll => {
            let node = get_node_mut(root, scope);
            node.value = Value::Absent;
            node.properties.clear();
        }
        Statement::Define { path, deleted } => {
            let full = join(scope, path);
            if *deleted {
                let (parent_path, key) = split_last(&full);
                let parent = get_node_mut(root, &parent_path);
                parent.properties.insert(key, Node::tombstone());
            } else {
                let _ = get_node_mut(root, &full);
            }
        }
        Statement::SetValue { path, value, props } => {
            apply_set_value(root, scope, path, value, props.as_deref(), diags);
        }
        Statement::AssignBoth { path, value, props } => {
            apply_assign_both(root, scope, path, value, props.as_deref(), diags);
        }
        Statement::ReplaceProperties { path, props } => {
            let full = join(scope, path);
            let preserved_value = match get_node_opt(root, &full) {
                Some(existing) if !existing.is_link() => existing.value.clone(),
                _ => Value::Absent,
            };
            let (parent_path, key) = split_last(&full);
            {
                let parent = get_node_mut(root, &parent_path);
                parent
                    .properties
                    .insert(key, Node::with_value(preserved_value));
            }
            apply_at(root, &full, props, diags);
        }
        Statement::MergeProperties { path, props } => {
            let full = join(scope, path);
            let _ = get_node_mut(root, &full);
            apply_at(root, &full, props, diags);
        }
    }
}

fn apply_set_value(
    root: &mut Node,
    scope: &[String],
    path: &Path,
    value: &Value,
    props: Option<&[Statement]>,
    diags: &mut Vec<Diagnostic>,
) {
    let full = join(scope, path);
    if let Value::Link(link) = value {
        if props.is_some() {
            diags.push(Diagnostic::path(
                ErrorCode::RefWithProperties,
                "properties are ignored when a plain reference is assigned with '='",
                full.clone(),
            ));
        }
        let (parent_path, key) = split_last(&full);
        let parent = get_node_mut(root, &parent_path);
        parent
            .properties
            .insert(key, Node::with_value(Value::Link(link.clone())));
        return;
    }
    {
        let node = get_node_mut(root, &full);
        node.value = value.clone();
    }
    if let Some(block) = props {
        apply_at(root, &full, block, diags);
    }
}

fn apply_assign_both(
    root: &mut Node,
    scope: &[String],
    path: &Path,
    value: &Value,
    props: Option<&[Statement]>,
    diags: &mut Vec<Diagnostic>,
) {
    let full = join(scope, path);
    let (parent_path, key) = split_last(&full);

    if let Value::Link(link) = value {
        tracing::debug!(link = %link, target = ?full, "materialising clone");
        let cloned = clone_via_reference(root, &parent_path, &full, link, diags);
        let node = cloned.unwrap_or_else(Node::empty);
        {
            let parent = get_node_mut(root, &parent_path);
            parent.properties.insert(key, node);
        }
        // the trailing block (if any) is applied directly onto the
        // materialised clone, so an override like `{ inner { host = H } }`
        // only touches the path it names and leaves untouched clone
        // properties (e.g. a sibling `shared`) intact.
        if let Some(block) = props {
            apply_at(root, &full, block, diags);
        }
        return;
    }

    let fresh = Node::with_value(value.clone());
    {
        let parent = get_node_mut(root, &parent_path);
        parent.properties.insert(key, fresh);
    }
    if let Some(block) = props {
        apply_at(root, &full, block, diags);
    }
}

/// Resolve `link` (issued from `scope`, the parent of the writeKey) and
/// deep-copy the target, sanitising any relative links that would
/// escape the cloned subtree.
fn clone_via_reference(
    root: &Node,
    scope: &[String],
    write_path: &[String],
    link: &LinkRef,
    diags: &mut Vec<Diagnostic>,
) -> Option<Node> {
    let start_path: Vec<String> = if link.ups == 0 {
        Vec::new()
    } else {
        let ups = link.ups as usize;
        if ups > scope.len() {
            diags.push(Diagnostic::path(
                ErrorCode::UnresolvedCloneReference,
                format!(
                    "'{}' ascends past the root ({} level(s) available)",
                    link,
                    scope.len()
                ),
                write_path.to_vec(),
            ));
            return None;
        }
        scope[..scope.len() - ups].to_vec()
    };

    match resolve_link_segments(root, &start_path, &link.segments) {
        Ok(target) => {
            let mut cloned = target.clone();
            let mut path_acc = write_path.to_vec();
            sanitize_clone_boundary(&mut cloned, 0, diags, &mut path_acc);
            Some(cloned)
        }
        Err(reason) => {
            diags.push(Diagnostic::path(
                ErrorCode::UnresolvedCloneReference,
                format!("cannot resolve '{}': {}", link, reason),
                write_path.to_vec(),
            ));
            None
        }
    }
}

fn resolve_link_segments<'n>(
    root: &'n Node,
    start_path: &[String],
    segments: &[PathSegment],
) -> Result<&'n Node, String> {
    let mut node = get_node_opt(root, start_path).ok_or_else(|| {
        format!(
            "base path '{}' does not exist",
            if start_path.is_empty() {
                "<root>".to_string()
            } else {
                start_path.join(".")
            }
        )
    })?;
    for seg in segments {
        if node.is_link() {
            return Err("cannot follow path through a link".to_string());
        }
        node = node
            .properties
            .get(&seg.name)
            .ok_or_else(|| format!("no property named '{}'", seg.name))?;
        for idx in &seg.indices {
            if node.is_link() {
                return Err("cannot index through a link".to_string());
            }
            let array = node
                .value
                .as_array()
                .ok_or_else(|| format!("'{}' is not an array", seg.name))?;
            node = array
                .get(*idx as usize)
                .ok_or_else(|| format!("index {} out of bounds", idx))?;
        }
    }
    Ok(node)
}

/// Erase any link whose `ups` would reach outside the cloned subtree.
/// `depth` is the number of property levels from the clone root to
/// `node` itself (the clone root is depth 0).
fn sanitize_clone_boundary(
    node: &mut Node,
    depth: u32,
    diags: &mut Vec<Diagnostic>,
    path_acc: &mut Vec<String>,
) {
    if let Value::Link(link) = &node.value {
        if link.ups > depth {
            diags.push(Diagnostic::path(
                ErrorCode::CloneReferenceOutOfScope,
                format!(
                    "relative reference '{}' escapes the cloned subtree",
                    link
                ),
                path_acc.clone(),
            ));
            *node = Node::empty();
        }
        return;
    }
    if let Value::Array(items) = &mut node.value {
        for item in items.iter_mut() {
            sanitize_clone_boundary(item, depth + 1, diags, path_acc);
        }
    }
    let keys: Vec<String> = node.properties.keys().cloned().collect();
    for key in keys {
        path_acc.push(key.clone());
        if let Some(child) = node.properties.get_mut(&key) {
            sanitize_clone_boundary(child, depth + 1, diags, path_acc);
        }
        path_acc.pop();
    }
}

fn join(scope: &[String], path: &Path) -> Vec<String> {
    let mut full = Vec::with_capacity(scope.len() + path.len());
    full.extend_from_slice(scope);
    full.extend(path.iter().cloned());
    full
}

fn split_last(full: &[String]) -> (Vec<String>, String) {
    debug_assert!(!full.is_empty());
    let key = full.last().cloned().unwrap();
    let parent = full[..full.len() - 1].to_vec();
    (parent, key)
}

fn get_node_mut<'n>(root: &'n mut Node, path: &[String]) -> &'n mut Node {
    let mut node = root;
    for seg in path {
        node = node.child_mut(seg);
    }
    node
}

fn get_node_opt<'n>(root: &'n Node, path: &[String]) -> Option<&'n Node> {
    let mut node = root;
    for seg in path {
        node = node.properties.get(seg)?;
    }
    Some(node)
}
