//! Property-based tests for the quantified invariants in spec.md §8.
//!
//! Generators stay small and depth-limited: the point is to cover many
//! instances of each invariant, not to stress the parser with fuzzed
//! byte soup (that lives in the parser's own unit tests).

use motly::{
    apply_statements, parse_source, validate_references, validate_schema, ErrorCode, LinkRef,
    Node, PathSegment, Value,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A short lowercase bare identifier — always unambiguous as a path segment.
fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}"
}

/// A scalar value together with the exact MOTLY source text that should
/// parse back to it.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Str(String),
    Num(i32),
    Bool(bool),
}

impl Scalar {
    fn source_repr(&self) -> String {
        match self {
            Scalar::Str(s) => format!("\"{}\"", s),
            Scalar::Num(n) => n.to_string(),
            Scalar::Bool(b) => format!("@{}", b),
        }
    }

    fn expected_value(&self) -> Value {
        match self {
            Scalar::Str(s) => Value::String(s.clone()),
            Scalar::Num(n) => Value::Number(*n as f64),
            Scalar::Bool(b) => Value::Boolean(*b),
        }
    }
}

fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Scalar::Str),
        any::<i16>().prop_map(|n| Scalar::Num(n as i32)),
        any::<bool>().prop_map(Scalar::Bool),
    ]
}

fn build(source: &str) -> (Node, Vec<motly::Diagnostic>) {
    let mut tree = Node::empty();
    let statements = parse_source(source).expect("generated source must parse");
    let diags = apply_statements(&mut tree, &statements);
    (tree, diags)
}

/// Wrap `link_stmt` in `depth` levels of nested property blocks under a
/// top-level `box`, so that the node holding the link sits exactly
/// `depth` property-descents below `box` (the node that gets cloned).
fn nest_under_box(depth: u32, link_stmt: &str) -> String {
    let mut body = link_stmt.to_string();
    for i in (1..depth).rev() {
        body = format!("n{}: {{ {} }}", i, body);
    }
    format!("box: {{ {} }}", body)
}

proptest! {
    /// Parse-roundtrip on scalars: `name = v` yields a node whose value
    /// slot is semantically equal to `v`.
    #[test]
    fn parse_roundtrip_on_scalars(name in arb_ident(), scalar in arb_scalar()) {
        let source = format!("{} = {}", name, scalar.source_repr());
        let (tree, diags) = build(&source);
        prop_assert!(diags.is_empty());
        let node = tree.properties.get(&name).unwrap();
        prop_assert_eq!(&node.value, &scalar.expected_value());
    }

    /// Idempotence of ClearAll: applying `-...` twice in a row at any
    /// scope is the same as applying it once.
    #[test]
    fn clear_all_is_idempotent(name in arb_ident(), scalar in arb_scalar()) {
        let source = format!("{} = {}", name, scalar.source_repr());
        let (mut tree, _) = build(&source);
        let clear = parse_source("-...").unwrap();
        apply_statements(&mut tree, &clear);
        let once = tree.clone();
        apply_statements(&mut tree, &clear);
        prop_assert_eq!(tree, once);
    }

    /// Order-independence: two statement orderings over distinct paths
    /// (no statement shadows another) produce equal trees.
    #[test]
    fn property_order_is_independent(
        pairs in proptest::collection::vec((arb_ident(), arb_scalar()), 1..6)
    ) {
        // de-duplicate names so no statement shadows another
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<(String, Scalar)> = pairs
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect();

        let forward: Vec<String> = unique
            .iter()
            .map(|(n, s)| format!("{} = {}", n, s.source_repr()))
            .collect();
        let backward: Vec<String> = forward.iter().rev().cloned().collect();

        let (tree_forward, _) = build(&forward.join(", "));
        let (tree_backward, _) = build(&backward.join(", "));
        prop_assert_eq!(tree_forward, tree_backward);
    }

    /// Merge is identity-on-empty: merging a set of unique-key
    /// assignments into a fresh object equals replacing with the same
    /// assignments.
    #[test]
    fn merge_identity_on_empty(
        pairs in proptest::collection::vec((arb_ident(), arb_scalar()), 1..6)
    ) {
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<(String, Scalar)> = pairs
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect();
        let body: Vec<String> = unique
            .iter()
            .map(|(n, s)| format!("{} = {}", n, s.source_repr()))
            .collect();
        let body = body.join(", ");

        let (merged, _) = build(&format!("obj {{ {} }}", body));
        let (replaced, _) = build(&format!("obj: {{ {} }}", body));
        prop_assert_eq!(
            merged.properties.get("obj"),
            replaced.properties.get("obj")
        );
    }

    /// Clone detachment: mutating the clone source after `:=` leaves the
    /// already-materialised clone untouched.
    #[test]
    fn clone_detachment(name in arb_ident(), original in arb_scalar(), mutated in arb_scalar()) {
        let source = format!(
            "base: {{ {} = {} }}\ncopy := $base",
            name,
            original.source_repr()
        );
        let (mut tree, diags) = build(&source);
        prop_assert!(diags.is_empty());

        let snapshot = tree
            .properties
            .get("copy")
            .unwrap()
            .properties
            .get(&name)
            .unwrap()
            .value
            .clone();
        prop_assert_eq!(&snapshot, &original.expected_value());

        let base = tree.properties.get_mut("base").unwrap();
        base.properties.get_mut(&name).unwrap().value = mutated.expected_value();

        let after = &tree.properties.get("copy").unwrap().properties.get(&name).unwrap().value;
        prop_assert_eq!(after, &snapshot);
    }

    /// Clone-boundary soundness: a `^`-relative link whose `ups` exceeds
    /// the depth at which it appears in the cloned subtree is erased and
    /// reported, for any nesting depth and any excess of `ups` over that
    /// depth.
    #[test]
    fn clone_boundary_soundness(depth in 1u32..4, excess in 1u32..4, target in arb_ident()) {
        let ups = depth + excess;
        let carets: String = std::iter::repeat('^').take(ups as usize).collect();
        let link_stmt = format!("val = ${}{}", carets, target);
        let source = format!("{}\ncopy := $box", nest_under_box(depth, &link_stmt));

        let (tree, diags) = build(&source);
        let mut node = tree.properties.get("copy").unwrap();
        for i in 1..depth {
            node = node.properties.get(&format!("n{}", i)).unwrap();
        }
        let val = node.properties.get("val").unwrap();
        prop_assert_eq!(&val.value, &Value::Absent);
        prop_assert!(diags
            .iter()
            .any(|d| d.code == ErrorCode::CloneReferenceOutOfScope));
    }

    /// Reference resolver soundness: `validate_references` returns `[]`
    /// iff every link in the tree resolves to a non-link node.
    #[test]
    fn reference_resolver_soundness(
        target_name in arb_ident(),
        other_name in arb_ident(),
        scalar in arb_scalar(),
        points_at_target in any::<bool>(),
    ) {
        prop_assume!(target_name != other_name);

        let mut tree = Node::empty();
        tree.properties
            .insert(target_name.clone(), Node::with_value(scalar.expected_value()));

        let link_target = if points_at_target {
            target_name.clone()
        } else {
            other_name.clone()
        };
        tree.properties.insert(
            "link".to_string(),
            Node::with_value(Value::Link(LinkRef::absolute(vec![PathSegment::name(
                link_target,
            )]))),
        );

        let diags = validate_references(&tree);
        prop_assert_eq!(diags.is_empty(), points_at_target);
    }

    /// Schema union coverage: a value satisfies `oneOf[T1, T2]` iff it
    /// satisfies at least one of T1, T2 in isolation.
    #[test]
    fn schema_union_coverage(scalar in arb_scalar()) {
        let type_names = ["string", "number", "boolean"];
        for t1 in type_names {
            for t2 in type_names {
                let mut schema = Node::empty();
                let mut required = Node::empty();
                let mut spec = Node::empty();
                let mut one_of = Vec::new();
                one_of.push(Node::with_value(Value::String(t1.to_string())));
                one_of.push(Node::with_value(Value::String(t2.to_string())));
                spec.properties
                    .insert("oneOf".to_string(), Node::with_value(Value::Array(one_of)));
                required.properties.insert("v".to_string(), spec);
                schema
                    .properties
                    .insert("Required".to_string(), required);

                let mut tree = Node::empty();
                tree.properties
                    .insert("v".to_string(), Node::with_value(scalar.expected_value()));

                let matches_alone = |t: &str| {
                    let mut s = Node::empty();
                    let mut req = Node::empty();
                    req.properties
                        .insert("v".to_string(), Node::with_value(Value::String(t.to_string())));
                    s.properties.insert("Required".to_string(), req);
                    validate_schema(&tree, &s).is_empty()
                };

                let union_ok = validate_schema(&tree, &schema).is_empty();
                let either_ok = matches_alone(t1) || matches_alone(t2);
                prop_assert_eq!(union_ok, either_ok);
            }
        }
    }
}
