//! Property-based tests for the quantified invariants over the public API:
//! losslessness, span monotonicity, operator associativity and precedence.

use nix_cst::{Node, NodeData, SyntaxKind};
use proptest::prelude::*;

fn assert_spans_monotonic(node: &Node) {
    let mut cursor = node.start();
    for child in node.children() {
        assert!(
            child.start() >= cursor,
            "child at {}..{} overlaps preceding sibling (cursor {})",
            child.start(),
            child.end(),
            cursor
        );
        assert!(child.end() >= child.start());
        cursor = child.end();
        if matches!(child.kind(), NodeData::Branch(_)) {
            assert_spans_monotonic(&child);
        }
    }
    assert!(
        cursor <= node.end(),
        "children overran parent span: cursor {} > {}",
        cursor,
        node.end()
    );
}

proptest! {
    #[test]
    fn losslessness_holds(src in "[a-zA-Z0-9_${}\"'./<> \t\n+*=;,?!:@()\\[\\]-]{0,80}") {
        if let Ok(cst) = nix_cst::parse(src.as_bytes()) {
            prop_assert!(cst.check_lossless());
            prop_assert_eq!(cst.text(&cst.root()), src.as_bytes());
        }
    }

    #[test]
    fn span_monotonicity_holds(src in "[a-zA-Z0-9_${}\"'./<> \t\n+*=;,?!:@()\\[\\]-]{0,80}") {
        if let Ok(cst) = nix_cst::parse(src.as_bytes()) {
            assert_spans_monotonic(&cst.root());
        }
    }
}

fn bin_op(node: &Node) -> Option<(Node, Node)> {
    if node.kind() != NodeData::Branch(SyntaxKind::BIN_OP_NODE) {
        return None;
    }
    let children: Vec<Node> = node
        .children()
        .into_iter()
        .filter(|c| matches!(c.kind(), NodeData::Branch(_)))
        .collect();
    if children.len() == 2 {
        Some((children[0].clone(), children[1].clone()))
    } else {
        None
    }
}

fn root_expr(src: &str) -> Node {
    let cst = nix_cst::parse(src.as_bytes()).unwrap();
    cst.root()
        .children()
        .into_iter()
        .find(|c| matches!(c.kind(), NodeData::Branch(_)))
        .expect("a parsed expression")
}

#[test]
fn left_associative_operator_nests_left() {
    let expr = root_expr("a + b + c");
    let (lhs, _rhs) = bin_op(&expr).expect("outer + is a BIN_OP");
    assert!(bin_op(&lhs).is_some(), "left child of a+b+c must itself be a BIN_OP");
}

#[test]
fn right_associative_operator_nests_right() {
    let expr = root_expr("a // b // c");
    let (_lhs, rhs) = bin_op(&expr).expect("outer // is a BIN_OP");
    assert!(bin_op(&rhs).is_some(), "right child of a//b//c must itself be a BIN_OP");
}

#[test]
fn tighter_operator_binds_first() {
    // `*` (MUL_LV) binds tighter than `+` (ADD_LV): a + b * c == a + (b * c).
    let expr = root_expr("a + b * c");
    let (_lhs, rhs) = bin_op(&expr).expect("outer + is a BIN_OP");
    assert!(bin_op(&rhs).is_some(), "right child of a+b*c must be the b*c BIN_OP");
}

#[test]
fn looser_operator_on_the_left_stays_outermost() {
    // a * b + c == (a * b) + c, the looser `+` is the outer node.
    let expr = root_expr("a * b + c");
    let (lhs, _rhs) = bin_op(&expr).expect("outer + is a BIN_OP");
    assert!(bin_op(&lhs).is_some(), "left child of a*b+c must be the a*b BIN_OP");
}
