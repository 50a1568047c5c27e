//! The closed set of token and node kinds, and the glue that teaches
//! [`rowan`] how to convert between its `u16`-backed `SyntaxKind` and ours.
//!
//! Token and node kinds share one enum, as rowan expects. Where a node and
//! token share a name (e.g. `IDENT`, `WITH`, `ASSERT`), the node variant
//! carries a `_NODE` suffix here; [`label`] strips it back off and adds the
//! `NODE_`/`TOKEN_` prefix the golden dumps use.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
#[repr(u16)]
pub enum SyntaxKind {
    // --- trivia ---
    WHITESPACE,
    COMMENT,

    // --- literals ---
    INTEGER,
    FLOAT,
    PATH,
    URI,

    // --- string parts ---
    STRING_START,
    STRING_CONTENT,
    STRING_END,

    // --- interpolation ---
    INTERPOL_START,
    INTERPOL_END,

    // --- identifier ---
    IDENT,

    // --- keywords ---
    IF,
    THEN,
    ELSE,
    LET,
    IN,
    REC,
    INHERIT,
    OR,
    ASSERT,
    WITH,

    // --- operators ---
    ADD,
    SUB,
    MUL,
    DIV,
    CONCAT,
    UPDATE,
    EQUAL,
    NOT_EQUAL,
    LESS,
    LESS_OR_EQ,
    MORE,
    MORE_OR_EQ,
    AND_AND,
    OR_OR,
    IMPLICATION,
    PIPE_LEFT,
    PIPE_RIGHT,
    INVERT,
    QUESTION,
    DOT,
    AT,
    ELLIPSIS,

    // --- punctuation ---
    ASSIGN,
    SEMICOLON,
    COLON,
    COMMA,
    L_BRACE,
    R_BRACE,
    L_BRACK,
    R_BRACK,
    L_PAREN,
    R_PAREN,

    ERROR,
    EOF,

    // --- composite nodes ---
    ROOT_NODE,
    ERROR_NODE,
    LITERAL_NODE,
    IDENT_NODE,
    IDENT_PARAM_NODE,
    STRING_NODE,
    PATH_NODE,
    INTERPOL_NODE,
    UNARY_OP_NODE,
    BIN_OP_NODE,
    APPLY_NODE,
    SELECT_NODE,
    HAS_ATTR_NODE,
    PAREN_NODE,
    LIST_NODE,
    ATTR_SET_NODE,
    ATTRPATH_NODE,
    ATTRPATH_VALUE_NODE,
    DYNAMIC_NODE,
    INHERIT_NODE,
    INHERIT_FROM_NODE,
    LAMBDA_NODE,
    PATTERN_NODE,
    PAT_ENTRY_NODE,
    PAT_BIND_NODE,
    LET_IN_NODE,
    LEGACY_LET_NODE,
    IF_ELSE_NODE,
    WITH_NODE,
    ASSERT_NODE,
}

use SyntaxKind::*;

impl SyntaxKind {
    /// True for the trivia kinds that are skipped by lookahead but kept in the tree.
    pub fn is_trivia(self) -> bool {
        matches!(self, WHITESPACE | COMMENT)
    }

    /// Keyword lookup used by the tokenizer's identifier scanner.
    pub fn keyword(ident: &str) -> Option<SyntaxKind> {
        Some(match ident {
            "if" => IF,
            "then" => THEN,
            "else" => ELSE,
            "let" => LET,
            "in" => IN,
            "rec" => REC,
            "inherit" => INHERIT,
            "or" => OR,
            "assert" => ASSERT,
            "with" => WITH,
            _ => return None,
        })
    }

    /// Dump label for golden-file printing: `NODE_FOO` / `TOKEN_FOO`.
    pub fn label(self) -> String {
        let name = format!("{self:?}");
        match name.strip_suffix("_NODE") {
            Some(stripped) => format!("NODE_{stripped}"),
            None => format!("TOKEN_{name}"),
        }
    }
}

/// Converts our `SyntaxKind` into the rowan `SyntaxKind`.
impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Teaches rowan how to convert between its raw `u16` `SyntaxKind` and ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lang {}

impl rowan::Language for Lang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 <= ASSERT_NODE as u16);
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<Lang>;
pub type SyntaxToken = rowan::SyntaxToken<Lang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;
