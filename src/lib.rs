//! A lossless parser for the Nix expression language.
//!
//! Parsing produces a concrete syntax tree (CST) in which every source byte,
//! whitespace and comments included, is preserved as the text of exactly
//! one leaf token, so the source is always fully recoverable from the tree.
//! The tree is intended to underpin tooling: formatters, linters, language
//! servers, refactoring engines, static analyzers.
//!
//! ```
//! use nix_cst::parse;
//!
//! let cst = parse(b"let x = 1; in x").unwrap();
//! assert_eq!(cst.text(&cst.root()), b"let x = 1; in x");
//! ```

mod chars;
mod cst;
mod diagnostic;
mod kind;
mod parser;
mod tokenizer;

pub use cst::{Cst, Node, NodeData};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use kind::SyntaxKind;
pub use parser::ParseError;

/// Parses `source` into a lossless CST. Syntactic problems are reflected as
/// `ERROR` nodes in the tree rather than as an `Err`; `Err` is reserved for
/// the postfix-expansion safeguard, the one case where the tree is
/// discarded outright.
pub fn parse(source: &[u8]) -> Result<Cst, ParseError> {
    parser::parse(source, None)
}

/// Parses `source`, recording at most one [`Diagnostic`] describing the
/// first syntactic surprise encountered.
pub fn parse_with_diagnostic(source: &[u8], diagnostic: &mut Option<Diagnostic>) -> Result<Cst, ParseError> {
    parser::parse(source, Some(diagnostic))
}
