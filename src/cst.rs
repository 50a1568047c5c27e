//! The CST node model: owns the tree, recovers source text, and prints the
//! golden-file debug dump.

use crate::kind::{SyntaxElement, SyntaxKind, SyntaxNode};
use rowan::NodeOrToken;

/// A parsed concrete syntax tree. Holds the source bytes it was parsed from
/// (so `text()` can slice them) and the rowan green tree built over them.
/// Dropping the `Cst` frees the whole tree.
pub struct Cst {
    source: Vec<u8>,
    root: SyntaxNode,
}

/// A node in the tree: either a token leaf or a branch with ordered children.
/// Thin wrapper over a rowan `NodeOrToken` so callers never touch rowan
/// directly.
#[derive(Clone)]
pub struct Node(pub(crate) SyntaxElement);

/// What kind of thing a [`Node`] is: a token leaf, or a branch with children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeData {
    Leaf(SyntaxKind),
    Branch(SyntaxKind),
}

impl Cst {
    pub(crate) fn new(source: Vec<u8>, root: SyntaxNode) -> Self {
        Cst { source, root }
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn root(&self) -> Node {
        Node(NodeOrToken::Node(self.root.clone()))
    }

    pub fn text(&self, node: &Node) -> &[u8] {
        &self.source[node.start() as usize..node.end() as usize]
    }

    /// Debug-only: verifies the losslessness invariant, concatenating the
    /// text of in-order leaves of the tree reproduces `source` exactly.
    pub fn check_lossless(&self) -> bool {
        let mut buf = Vec::with_capacity(self.source.len());
        collect_leaf_text(&self.root(), &self.source, &mut buf);
        buf == self.source
    }

    pub fn print_tree(&self, writer: &mut dyn std::fmt::Write) -> std::fmt::Result {
        print_node(&self.root(), &self.source, 0, writer)
    }
}

fn collect_leaf_text(node: &Node, source: &[u8], out: &mut Vec<u8>) {
    match node.kind() {
        NodeData::Leaf(_) => out.extend_from_slice(&source[node.start() as usize..node.end() as usize]),
        NodeData::Branch(_) => {
            for child in node.children() {
                collect_leaf_text(&child, source, out);
            }
        }
    }
}

fn print_node(node: &Node, source: &[u8], depth: usize, writer: &mut dyn std::fmt::Write) -> std::fmt::Result {
    let indent = "  ".repeat(depth);
    match node.kind() {
        NodeData::Branch(kind) => {
            writeln!(writer, "{indent}{}@{}..{}", kind.label(), node.start(), node.end())?;
            for child in node.children() {
                print_node(&child, source, depth + 1, writer)?;
            }
            Ok(())
        }
        NodeData::Leaf(kind) => {
            let text = &source[node.start() as usize..node.end() as usize];
            let escaped = escape(text);
            writeln!(writer, "{indent}{}@{}..{} {escaped}", kind.label(), node.start(), node.end())
        }
    }
}

fn escape(bytes: &[u8]) -> String {
    let mut out = String::from("\"");
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            _ if b.is_ascii() => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('"');
    out
}

impl Node {
    pub fn kind(&self) -> NodeData {
        match &self.0 {
            NodeOrToken::Token(t) => NodeData::Leaf(t.kind()),
            NodeOrToken::Node(n) => NodeData::Branch(n.kind()),
        }
    }

    pub fn start(&self) -> u32 {
        match &self.0 {
            NodeOrToken::Token(t) => t.text_range().start().into(),
            NodeOrToken::Node(n) => n.text_range().start().into(),
        }
    }

    pub fn end(&self) -> u32 {
        match &self.0 {
            NodeOrToken::Token(t) => t.text_range().end().into(),
            NodeOrToken::Node(n) => n.text_range().end().into(),
        }
    }

    pub fn children(&self) -> Vec<Node> {
        match &self.0 {
            NodeOrToken::Token(_) => Vec::new(),
            NodeOrToken::Node(n) => n.children_with_tokens().map(Node).collect(),
        }
    }
}

impl From<SyntaxElement> for Node {
    fn from(elem: SyntaxElement) -> Self {
        Node(elem)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser;

    #[test]
    fn losslessness_holds_for_trivial_input() {
        let cst = parser::parse(b"let x = 1; in x", None).unwrap();
        assert!(cst.check_lossless());
    }

    #[test]
    fn print_tree_escapes_non_ascii_bytes() {
        let src = "\"caf\u{e9}\"".as_bytes();
        let cst = parser::parse(src, None).unwrap();
        let mut out = String::new();
        cst.print_tree(&mut out).unwrap();
        assert!(out.contains("\\xc3\\xa9"), "output was: {out}");
        assert!(!out.contains('\u{e9}'), "output was: {out}");
    }
}
