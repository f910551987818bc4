//! Reference resolution: a post-pass validating that every `$`/`$^` link
//! in a tree points at a real, non-link node, without substituting
//! anything.

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::node::{LinkRef, Node, Value};

/// Walk `root` in preorder, tracking an ancestor stack, and emit one
/// `unresolved-reference` diagnostic per link that does not resolve.
/// Returns `[]` iff every link in the tree resolves to a non-link node.
pub fn validate_references(root: &Node) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let mut ancestors: Vec<&Node> = Vec::new();
    let mut path: Vec<String> = Vec::new();
    walk(root, root, &mut ancestors, &mut path, &mut diags);
    diags
}

fn walk<'n>(
    tree_root: &'n Node,
    node: &'n Node,
    ancestors: &mut Vec<&'n Node>,
    path: &mut Vec<String>,
    diags: &mut Vec<Diagnostic>,
) {
    if let Value::Link(link) = &node.value {
        if let Err(reason) = resolve(tree_root, ancestors, link) {
            diags.push(Diagnostic::path(
                ErrorCode::UnresolvedReference,
                reason,
                path.clone(),
            ));
        }
    }

    if let Value::Array(items) = &node.value {
        ancestors.push(node);
        for (i, item) in items.iter().enumerate() {
            path.push(format!("[{}]", i));
            walk(tree_root, item, ancestors, path, diags);
            path.pop();
        }
        ancestors.pop();
    }

    ancestors.push(node);
    for (key, child) in &node.properties {
        path.push(key.clone());
        walk(tree_root, child, ancestors, path, diags);
        path.pop();
    }
    ancestors.pop();
}

/// Resolve `link` against `ancestors` (root first, current node's
/// parent last) and `tree_root`. Does not follow through intermediate
/// links and requires the final target to be a non-link node.
fn resolve(tree_root: &Node, ancestors: &[&Node], link: &LinkRef) -> Result<(), String> {
    let start: &Node = if link.ups == 0 {
        tree_root
    } else {
        let ups = link.ups as usize;
        if ups > ancestors.len() {
            return Err(format!(
                "'{}' ascends past the root ({} level(s) available)",
                link,
                ancestors.len()
            ));
        }
        ancestors[ancestors.len() - ups]
    };

    let mut node = start;
    for seg in &link.segments {
        if node.is_link() {
            return Err("cannot follow path through a link".to_string());
        }
        node = node
            .properties
            .get(&seg.name)
            .ok_or_else(|| format!("no property named '{}'", seg.name))?;
        for idx in &seg.indices {
            if node.is_link() {
                return Err("cannot follow path through a link".to_string());
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

    if node.is_link() {
        return Err("links do not transitively resolve".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::apply_statements;
    use crate::parser::parse_source;

    fn build(source: &str) -> Node {
        let mut root = Node::empty();
        let stmts = parse_source(source).unwrap();
        apply_statements(&mut root, &stmts);
        root
    }

    #[test]
    fn resolved_link_produces_no_diagnostics() {
        let tree = build("a = 1\nb = $a");
        assert!(validate_references(&tree).is_empty());
    }

    #[test]
    fn dangling_link_is_reported() {
        let tree = build("b = $missing");
        let diags = validate_references(&tree);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::UnresolvedReference);
    }

    #[test]
    fn link_to_a_link_does_not_resolve() {
        let tree = build("a = 1\nb = $a\nc = $b");
        let diags = validate_references(&tree);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn ups_beyond_stack_depth_is_reported() {
        // val's ancestor stack is [root, outer, inner] (depth 3); four
        // carets ascends one level past the root.
        let tree = build("outer { inner { val = $^^^^nothing } }");
        let diags = validate_references(&tree);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn relative_ancestor_reference_resolves() {
        // val sits two levels below outer (outer -> inner -> val), so
        // reaching outer's "shared" property needs two carets.
        let tree = build("outer { shared = 1, inner { val = $^^shared } }");
        assert!(validate_references(&tree).is_empty());
    }
}
