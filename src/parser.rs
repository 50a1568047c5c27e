//! Tokens to CST: precedence climbing, lookahead across trivia,
//! pattern/attrset disambiguation, inline-lambda recognition, diagnostics.

use crate::cst::Cst;
use crate::diagnostic::Diagnostic;
use crate::kind::SyntaxKind::{self, *};
use crate::kind::SyntaxNode;
use crate::tokenizer::{Token, Tokenizer};
use rowan::{Checkpoint, GreenNodeBuilder};

/// Errors that abort a parse outright rather than being recorded as an
/// `ERROR` node. Everything else, unexpected tokens, unterminated
/// strings/paths/interpolations, stays inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The postfix-expansion safeguard tripped; the partial tree is discarded.
    PostfixLimitExceeded,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PostfixLimitExceeded => write!(f, "postfix expansion safeguard tripped"),
        }
    }
}

impl std::error::Error for ParseError {}

type Result<T> = std::result::Result<T, ParseError>;

const LOWEST: i32 = 0;
const PIPE_LV: i32 = 5;
const IMPLICATION_LV: i32 = 10;
const OR_OR_LV: i32 = 20;
const AND_AND_LV: i32 = 30;
const EQUAL_LV: i32 = 40;
const CMP_LV: i32 = 50;
const UPDATE_LV: i32 = 60;
const NOT_LV: i32 = 70;
const ADD_LV: i32 = 80;
const MUL_LV: i32 = 90;
const CONCAT_LV: i32 = 100;
const HAS_ATTR_LV: i32 = 110;
const NEGATE_LV: i32 = 120;
const APPLY_LV: i32 = 130;
const SELECT_LV: i32 = 140;

/// What an infix continuation does once committed to.
enum Continuation {
    Binary { right_assoc: bool },
    HasAttr,
    Select,
    Apply,
}

fn binop_info(kind: SyntaxKind) -> Option<(i32, bool)> {
    Some(match kind {
        PIPE_RIGHT => (PIPE_LV, false),
        PIPE_LEFT => (PIPE_LV, true),
        IMPLICATION => (IMPLICATION_LV, true),
        OR_OR => (OR_OR_LV, false),
        AND_AND => (AND_AND_LV, false),
        EQUAL | NOT_EQUAL => (EQUAL_LV, false),
        LESS | LESS_OR_EQ | MORE | MORE_OR_EQ => (CMP_LV, false),
        UPDATE => (UPDATE_LV, true),
        ADD | SUB => (ADD_LV, false),
        MUL | DIV => (MUL_LV, false),
        CONCAT => (CONCAT_LV, true),
        _ => return None,
    })
}

fn can_start_expr(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        INTEGER
            | FLOAT
            | URI
            | IDENT
            | OR
            | STRING_START
            | PATH
            | L_PAREN
            | L_BRACK
            | L_BRACE
            | IF
            | LET
            | WITH
            | ASSERT
            | REC
            | SUB
            | INVERT
    )
}

fn classify_continuation(kind: SyntaxKind) -> Option<(i32, Continuation)> {
    if let Some((level, right_assoc)) = binop_info(kind) {
        return Some((level, Continuation::Binary { right_assoc }));
    }
    match kind {
        QUESTION => Some((HAS_ATTR_LV, Continuation::HasAttr)),
        DOT => Some((SELECT_LV, Continuation::Select)),
        _ if can_start_expr(kind) => Some((APPLY_LV, Continuation::Apply)),
        _ => None,
    }
}

fn token_text(bytes: &[u8], tok: Token) -> &str {
    std::str::from_utf8(&bytes[tok.start as usize..tok.end as usize]).unwrap_or("")
}

struct Parser<'a> {
    bytes: &'a [u8],
    tokens: Vec<Token>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    diagnostic: Option<&'a mut Option<Diagnostic>>,
    postfix_budget: u32,
    postfix_budget_initial: u32,
}

impl<'a> Parser<'a> {
    fn current_kind(&self) -> SyntaxKind {
        self.tokens[self.pos].kind
    }

    fn current_span(&self) -> (u32, u32) {
        let t = self.tokens[self.pos];
        (t.start, t.end)
    }

    fn skip_trivia_idx(&self, mut i: usize) -> usize {
        while self.tokens[i].kind.is_trivia() {
            i += 1;
        }
        i
    }

    /// Looks at the next non-trivia token from the current position,
    /// without consuming anything.
    fn peek_after_trivia(&self) -> (SyntaxKind, usize) {
        self.peek_after_trivia_from(self.pos)
    }

    fn peek_after_trivia_from(&self, start: usize) -> (SyntaxKind, usize) {
        let idx = self.skip_trivia_idx(start);
        (self.tokens[idx].kind, idx)
    }

    fn bump(&mut self) {
        let tok = self.tokens[self.pos];
        debug_assert!(tok.kind != EOF, "must not bump the EOF token");
        let text = token_text(self.bytes, tok);
        self.builder.token(tok.kind.into(), text);
        self.pos += 1;
    }

    fn bump_as(&mut self, kind: SyntaxKind) {
        let tok = self.tokens[self.pos];
        let text = token_text(self.bytes, tok);
        self.builder.token(kind.into(), text);
        self.pos += 1;
    }

    fn skip_trivia(&mut self) {
        while self.current_kind().is_trivia() {
            self.bump();
        }
    }

    fn record_diagnostic(&mut self, d: Diagnostic) {
        if let Some(slot) = self.diagnostic.as_deref_mut() {
            if slot.is_none() {
                *slot = Some(d);
            }
        }
    }

    /// Consumes the current token (if any) wrapped in an `ERROR` node, and
    /// records a diagnostic. Used for any required-token mismatch.
    fn wrap_error_one_token(&mut self, note: &str) -> Result<()> {
        let span = self.current_span();
        let got = if self.current_kind() == EOF { None } else { Some(self.current_kind()) };
        self.builder.start_node(ERROR_NODE.into());
        if self.current_kind() != EOF {
            self.bump();
        }
        self.builder.finish_node();
        self.record_diagnostic(Diagnostic::unexpected(span, got, None, note.to_string()));
        Ok(())
    }

    fn expect(&mut self, kind: SyntaxKind, note: &str) -> Result<()> {
        if self.current_kind() == kind {
            self.bump();
            Ok(())
        } else {
            let span = self.current_span();
            let got = if self.current_kind() == EOF { None } else { Some(self.current_kind()) };
            self.builder.start_node(ERROR_NODE.into());
            if self.current_kind() != EOF {
                self.bump();
            }
            self.builder.finish_node();
            self.record_diagnostic(Diagnostic::unexpected(span, got, Some(kind), note.to_string()));
            Ok(())
        }
    }

    // ---- expressions ----

    fn parse_expr(&mut self, min_prec: i32) -> Result<()> {
        let checkpoint = self.builder.checkpoint();
        self.parse_prefix()?;
        self.infix_loop(checkpoint, min_prec)
    }

    fn infix_loop(&mut self, checkpoint: Checkpoint, min_prec: i32) -> Result<()> {
        loop {
            let (kind, _idx) = self.peek_after_trivia();
            let Some((level, continuation)) = classify_continuation(kind) else {
                return Ok(());
            };
            if level <= min_prec {
                return Ok(());
            }
            if self.postfix_budget == 0 {
                let span = self.current_span();
                self.record_diagnostic(Diagnostic::postfix_limit(span, self.postfix_budget_initial));
                return Err(ParseError::PostfixLimitExceeded);
            }
            self.postfix_budget -= 1;

            match continuation {
                Continuation::Binary { right_assoc } => {
                    self.builder.start_node_at(checkpoint, BIN_OP_NODE.into());
                    self.skip_trivia();
                    self.bump(); // operator
                    self.skip_trivia();
                    let rhs_min = if right_assoc { level - 1 } else { level };
                    self.parse_expr(rhs_min)?;
                    self.builder.finish_node();
                }
                Continuation::HasAttr => {
                    self.builder.start_node_at(checkpoint, HAS_ATTR_NODE.into());
                    self.skip_trivia();
                    self.bump(); // ?
                    self.skip_trivia();
                    self.parse_attrpath()?;
                    self.builder.finish_node();
                }
                Continuation::Select => {
                    self.builder.start_node_at(checkpoint, SELECT_NODE.into());
                    self.skip_trivia();
                    self.bump(); // .
                    self.skip_trivia();
                    self.parse_attrpath()?;
                    let (k, _) = self.peek_after_trivia();
                    if k == OR {
                        self.skip_trivia();
                        self.bump_as(OR); // keep the literal `or` token
                        self.skip_trivia();
                        self.parse_expr(APPLY_LV - 1)?;
                    }
                    self.builder.finish_node();
                }
                Continuation::Apply => {
                    self.builder.start_node_at(checkpoint, APPLY_NODE.into());
                    self.skip_trivia();
                    self.parse_expr(APPLY_LV)?;
                    self.builder.finish_node();
                }
            }
        }
    }

    fn parse_prefix(&mut self) -> Result<()> {
        self.skip_trivia();
        match self.current_kind() {
            INTEGER | FLOAT | URI => self.parse_literal(),
            PATH => self.parse_path(),
            IDENT | OR => self.parse_ident_or_lambda(),
            STRING_START => self.parse_string(),
            L_BRACE => {
                if self.looks_like_pattern() {
                    self.parse_lambda_from_brace()
                } else {
                    self.builder.start_node(ATTR_SET_NODE.into());
                    self.bump();
                    self.parse_bindings_until_rbrace()?;
                    self.builder.finish_node();
                    Ok(())
                }
            }
            L_BRACK => self.parse_list(),
            L_PAREN => {
                if self.looks_like_paren_pattern() {
                    self.parse_lambda_from_paren()
                } else {
                    self.parse_paren()
                }
            }
            IF => self.parse_if(),
            LET => self.parse_let(),
            WITH => self.parse_with(),
            ASSERT => self.parse_assert(),
            REC => self.parse_rec_attr_set(),
            SUB => self.parse_unary(NEGATE_LV),
            INVERT => self.parse_unary(NOT_LV),
            _ => self.wrap_error_one_token("expected an expression"),
        }
    }

    fn parse_literal(&mut self) -> Result<()> {
        self.builder.start_node(LITERAL_NODE.into());
        self.bump();
        self.builder.finish_node();
        Ok(())
    }

    fn parse_unary(&mut self, level: i32) -> Result<()> {
        self.builder.start_node(UNARY_OP_NODE.into());
        self.bump();
        self.skip_trivia();
        self.parse_expr(level)?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_interpolation(&mut self, node_kind: SyntaxKind) -> Result<()> {
        self.builder.start_node(node_kind.into());
        self.bump(); // INTERPOL_START
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(INTERPOL_END, "expected '}' closing interpolation")?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_string(&mut self) -> Result<()> {
        self.builder.start_node(STRING_NODE.into());
        self.bump(); // STRING_START
        loop {
            match self.current_kind() {
                STRING_CONTENT => self.bump(),
                INTERPOL_START => self.parse_interpolation(INTERPOL_NODE)?,
                STRING_END => {
                    self.bump();
                    break;
                }
                EOF => break,
                _ => {
                    self.wrap_error_one_token("unexpected token in string")?;
                    break;
                }
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_path(&mut self) -> Result<()> {
        self.builder.start_node(PATH_NODE.into());
        loop {
            match self.current_kind() {
                PATH => self.bump(),
                INTERPOL_START => self.parse_interpolation(INTERPOL_NODE)?,
                _ => break,
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_attr_name(&mut self) -> Result<()> {
        match self.current_kind() {
            IDENT => {
                self.bump();
                Ok(())
            }
            OR => {
                self.bump_as(IDENT);
                Ok(())
            }
            STRING_START => self.parse_string(),
            INTERPOL_START => self.parse_interpolation(DYNAMIC_NODE),
            _ => self.wrap_error_one_token("expected an attribute name"),
        }
    }

    fn parse_attrpath(&mut self) -> Result<()> {
        self.builder.start_node(ATTRPATH_NODE.into());
        self.parse_attr_name()?;
        loop {
            let (k, _) = self.peek_after_trivia();
            if k != DOT {
                break;
            }
            self.skip_trivia();
            self.bump(); // .
            self.skip_trivia();
            self.parse_attr_name()?;
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_attrpath_value(&mut self) -> Result<()> {
        self.builder.start_node(ATTRPATH_VALUE_NODE.into());
        self.parse_attrpath()?;
        self.skip_trivia();
        self.expect(ASSIGN, "expected '='")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(SEMICOLON, "expected ';'")?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_inherit(&mut self) -> Result<()> {
        let (k, _) = self.peek_after_trivia_from(self.pos + 1);
        if k == L_PAREN {
            self.builder.start_node(INHERIT_FROM_NODE.into());
            self.bump(); // inherit
            self.skip_trivia();
            self.bump(); // (
            self.skip_trivia();
            self.parse_expr(LOWEST)?;
            self.skip_trivia();
            self.expect(R_PAREN, "expected ')'")?;
        } else {
            self.builder.start_node(INHERIT_NODE.into());
            self.bump(); // inherit
        }
        loop {
            self.skip_trivia();
            match self.current_kind() {
                SEMICOLON => {
                    self.bump();
                    break;
                }
                EOF => break,
                IDENT | OR | STRING_START | INTERPOL_START => self.parse_attr_name()?,
                _ => self.wrap_error_one_token("expected inherited name")?,
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_bindings_until_rbrace(&mut self) -> Result<()> {
        loop {
            self.skip_trivia();
            match self.current_kind() {
                R_BRACE => {
                    self.bump();
                    break;
                }
                EOF => break,
                INHERIT => self.parse_inherit()?,
                _ => self.parse_attrpath_value()?,
            }
        }
        Ok(())
    }

    fn parse_rec_attr_set(&mut self) -> Result<()> {
        self.builder.start_node(ATTR_SET_NODE.into());
        self.bump(); // rec
        self.skip_trivia();
        if self.current_kind() == L_BRACE {
            self.bump();
        } else {
            self.wrap_error_one_token("expected '{' after 'rec'")?;
        }
        self.parse_bindings_until_rbrace()?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_list(&mut self) -> Result<()> {
        self.builder.start_node(LIST_NODE.into());
        self.bump(); // [
        loop {
            self.skip_trivia();
            match self.current_kind() {
                R_BRACK => {
                    self.bump();
                    break;
                }
                EOF => break,
                _ => self.parse_expr(SELECT_LV - 1)?,
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_if(&mut self) -> Result<()> {
        self.builder.start_node(IF_ELSE_NODE.into());
        self.bump(); // if
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(THEN, "expected 'then'")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(ELSE, "expected 'else'")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_let(&mut self) -> Result<()> {
        let (k, _) = self.peek_after_trivia_from(self.pos + 1);
        if k == L_BRACE {
            self.builder.start_node(LEGACY_LET_NODE.into());
            self.bump(); // let
            self.skip_trivia();
            self.bump(); // {
            self.parse_bindings_until_rbrace()?;
            self.builder.finish_node();
        } else {
            self.builder.start_node(LET_IN_NODE.into());
            self.bump(); // let
            loop {
                self.skip_trivia();
                match self.current_kind() {
                    IN => {
                        self.bump();
                        break;
                    }
                    EOF => break,
                    INHERIT => self.parse_inherit()?,
                    _ => self.parse_attrpath_value()?,
                }
            }
            self.skip_trivia();
            self.parse_expr(LOWEST)?;
            self.builder.finish_node();
        }
        Ok(())
    }

    fn parse_with(&mut self) -> Result<()> {
        self.builder.start_node(WITH_NODE.into());
        self.bump(); // with
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(SEMICOLON, "expected ';'")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_assert(&mut self) -> Result<()> {
        self.builder.start_node(ASSERT_NODE.into());
        self.bump(); // assert
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(SEMICOLON, "expected ';'")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.builder.finish_node();
        Ok(())
    }

    // ---- patterns / lambdas ----

    fn looks_like_pattern(&self) -> bool {
        let (k, idx) = self.peek_after_trivia_from(self.pos + 1);
        match k {
            ELLIPSIS => true,
            IDENT => {
                let (k2, _) = self.peek_after_trivia_from(idx + 1);
                matches!(k2, COMMA | QUESTION | R_BRACE)
            }
            R_BRACE => {
                let (k2, _) = self.peek_after_trivia_from(idx + 1);
                matches!(k2, COLON | AT)
            }
            _ => false,
        }
    }

    fn matching_close_idx(&self, open_idx: usize, open: SyntaxKind, close: SyntaxKind) -> Option<usize> {
        let mut depth = 0i32;
        let mut i = open_idx;
        loop {
            let k = self.tokens[i].kind;
            if k == open {
                depth += 1;
            } else if k == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            } else if k == EOF {
                return None;
            }
            i += 1;
            if i >= self.tokens.len() {
                return None;
            }
        }
    }

    fn looks_like_paren_pattern(&self) -> bool {
        match self.matching_close_idx(self.pos, L_PAREN, R_PAREN) {
            Some(close_idx) => {
                let (k, _) = self.peek_after_trivia_from(close_idx + 1);
                k == COLON
            }
            None => false,
        }
    }

    /// Parses `{ entries }` or `( entries )` into the currently open node
    /// (a `PATTERN` or the entries-container within one).
    fn parse_pattern_entries(&mut self, open: SyntaxKind, close: SyntaxKind) -> Result<()> {
        debug_assert_eq!(self.current_kind(), open);
        self.bump();
        loop {
            self.skip_trivia();
            match self.current_kind() {
                k if k == close => {
                    self.bump();
                    return Ok(());
                }
                ELLIPSIS => {
                    self.bump();
                    self.skip_trivia();
                    return self.expect(close, "expected closing delimiter");
                }
                IDENT => {
                    self.builder.start_node(PAT_ENTRY_NODE.into());
                    self.bump();
                    self.skip_trivia();
                    if self.current_kind() == QUESTION {
                        self.bump();
                        self.skip_trivia();
                        self.parse_expr(LOWEST)?;
                    }
                    self.builder.finish_node();
                    self.skip_trivia();
                    if self.current_kind() == COMMA {
                        self.bump();
                        continue;
                    }
                    self.skip_trivia();
                    return self.expect(close, "expected closing delimiter");
                }
                EOF => {
                    let span = self.current_span();
                    self.record_diagnostic(Diagnostic::unexpected(
                        span,
                        None,
                        Some(close),
                        "unterminated pattern".to_string(),
                    ));
                    return Ok(());
                }
                _ => {
                    self.wrap_error_one_token("expected a pattern entry")?;
                }
            }
        }
    }

    fn parse_pattern_plain(&mut self) -> Result<()> {
        self.builder.start_node(PATTERN_NODE.into());
        self.parse_pattern_entries(L_BRACE, R_BRACE)?;
        self.skip_trivia();
        if self.current_kind() == AT {
            self.bump();
            self.skip_trivia();
            if self.current_kind() == IDENT {
                self.bump();
            } else {
                self.wrap_error_one_token("expected a binder identifier")?;
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_lambda_from_brace(&mut self) -> Result<()> {
        self.builder.start_node(LAMBDA_NODE.into());
        self.parse_pattern_plain()?;
        self.skip_trivia();
        self.expect(COLON, "expected ':'")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_lambda_from_paren(&mut self) -> Result<()> {
        self.builder.start_node(LAMBDA_NODE.into());
        self.builder.start_node(PATTERN_NODE.into());
        self.parse_pattern_entries(L_PAREN, R_PAREN)?;
        self.skip_trivia();
        if self.current_kind() == AT {
            self.bump();
            self.skip_trivia();
            if self.current_kind() == IDENT {
                self.bump();
            } else {
                self.wrap_error_one_token("expected a binder identifier")?;
            }
        }
        self.builder.finish_node(); // PATTERN
        self.skip_trivia();
        self.expect(COLON, "expected ':'")?;
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.builder.finish_node(); // LAMBDA
        Ok(())
    }

    fn parse_ident_node(&mut self) -> Result<()> {
        self.builder.start_node(IDENT_NODE.into());
        if self.current_kind() == OR {
            self.bump_as(IDENT);
        } else {
            self.bump();
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_ident_or_lambda(&mut self) -> Result<()> {
        let (k, _) = self.peek_after_trivia_from(self.pos + 1);
        match k {
            COLON => {
                self.builder.start_node(LAMBDA_NODE.into());
                self.builder.start_node(IDENT_PARAM_NODE.into());
                if self.current_kind() == OR {
                    self.bump_as(IDENT);
                } else {
                    self.bump();
                }
                self.builder.finish_node();
                self.skip_trivia();
                self.expect(COLON, "expected ':'")?;
                self.skip_trivia();
                self.parse_expr(LOWEST)?;
                self.builder.finish_node();
                Ok(())
            }
            AT => {
                self.builder.start_node(LAMBDA_NODE.into());
                self.builder.start_node(PATTERN_NODE.into());
                self.builder.start_node(PAT_BIND_NODE.into());
                if self.current_kind() == OR {
                    self.bump_as(IDENT);
                } else {
                    self.bump();
                }
                self.skip_trivia();
                self.expect(AT, "expected '@'")?;
                self.builder.finish_node(); // PAT_BIND
                self.skip_trivia();
                if self.current_kind() == L_BRACE {
                    self.parse_pattern_entries(L_BRACE, R_BRACE)?;
                } else {
                    self.wrap_error_one_token("expected '{' opening an attribute pattern")?;
                }
                self.skip_trivia();
                if self.current_kind() == AT {
                    // double bind: `x @ {...} @ y`, surface without aborting.
                    let span = self.current_span();
                    self.builder.start_node(ERROR_NODE.into());
                    self.bump();
                    self.skip_trivia();
                    if self.current_kind() == IDENT {
                        self.bump();
                    }
                    self.builder.finish_node();
                    self.record_diagnostic(Diagnostic::unexpected(
                        span,
                        Some(AT),
                        None,
                        "duplicate '@' binder".to_string(),
                    ));
                }
                self.builder.finish_node(); // PATTERN
                self.skip_trivia();
                self.expect(COLON, "expected ':'")?;
                self.skip_trivia();
                self.parse_expr(LOWEST)?;
                self.builder.finish_node(); // LAMBDA
                Ok(())
            }
            _ => self.parse_ident_node(),
        }
    }

    fn parse_paren(&mut self) -> Result<()> {
        self.builder.start_node(PAREN_NODE.into());
        self.bump(); // (
        self.skip_trivia();
        self.parse_expr(LOWEST)?;
        self.skip_trivia();
        self.expect(R_PAREN, "expected ')'")?;
        self.builder.finish_node();
        Ok(())
    }
}

fn lex_all(source: &[u8]) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = tokenizer.next();
        let is_eof = tok.kind == EOF;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

pub fn parse(source: &[u8], diagnostic: Option<&mut Option<Diagnostic>>) -> Result<Cst> {
    let tokens = lex_all(source);
    let budget = source.len() as u32 + 64;
    let mut parser = Parser {
        bytes: source,
        tokens,
        pos: 0,
        builder: GreenNodeBuilder::new(),
        diagnostic,
        postfix_budget: budget,
        postfix_budget_initial: budget,
    };

    parser.builder.start_node(ROOT_NODE.into());
    parser.skip_trivia();
    if parser.current_kind() != EOF {
        parser.parse_expr(LOWEST)?;
    }
    parser.skip_trivia();
    while parser.current_kind() != EOF {
        parser.wrap_error_one_token("unexpected trailing input")?;
        parser.skip_trivia();
    }
    parser.builder.finish_node();

    let green = parser.builder.finish();
    let root = SyntaxNode::new_root(green);
    Ok(Cst::new(source.to_vec(), root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::NodeData;

    fn dump(src: &str) -> String {
        let cst = parse(src.as_bytes(), None).unwrap();
        let mut out = String::new();
        cst.print_tree(&mut out).unwrap();
        out
    }

    fn find_first(node: &crate::cst::Node, kind: SyntaxKind) -> Option<crate::cst::Node> {
        if node.kind() == NodeData::Branch(kind) {
            return Some(node.clone());
        }
        for child in node.children() {
            if let Some(found) = find_first(&child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn integer_literal() {
        let cst = parse(b"42", None).unwrap();
        assert!(cst.check_lossless());
        let lit = find_first(&cst.root(), LITERAL_NODE).unwrap();
        assert_eq!(cst.text(&lit), b"42");
    }

    #[test]
    fn let_in_shape() {
        let cst = parse(b"let x = 1; in x", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), LET_IN_NODE).is_some());
        assert!(find_first(&cst.root(), ATTRPATH_VALUE_NODE).is_some());
    }

    #[test]
    fn legacy_let() {
        let cst = parse(b"let { x = 1; body = x; }", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), LEGACY_LET_NODE).is_some());
    }

    #[test]
    fn lambda_with_pattern() {
        let cst = parse(b"{ a, b ? 1, ... } @ args: a + b", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), LAMBDA_NODE).is_some());
        assert!(find_first(&cst.root(), PATTERN_NODE).is_some());
        let entries: Vec<_> = {
            fn collect(node: &crate::cst::Node, out: &mut Vec<crate::cst::Node>) {
                if node.kind() == NodeData::Branch(PAT_ENTRY_NODE) {
                    out.push(node.clone());
                }
                for c in node.children() {
                    collect(&c, out);
                }
            }
            let mut v = Vec::new();
            collect(&cst.root(), &mut v);
            v
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn string_with_interpolation_shape() {
        let cst = parse(b"\"hello ${name}!\"", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), STRING_NODE).is_some());
        assert!(find_first(&cst.root(), INTERPOL_NODE).is_some());
    }

    #[test]
    fn interpolated_path() {
        let cst = parse(b"./foo${bar}/baz", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), PATH_NODE).is_some());
        assert!(find_first(&cst.root(), INTERPOL_NODE).is_some());
    }

    #[test]
    fn update_is_right_associative() {
        let cst = parse(b"a // b // c", None).unwrap();
        assert!(cst.check_lossless());
        let root_bin = find_first(&cst.root(), BIN_OP_NODE).unwrap();
        // right-assoc: the *second* child-bin-op should be nested on the right.
        let children = root_bin.children();
        let rhs_is_binop = children
            .iter()
            .any(|c| c.kind() == NodeData::Branch(BIN_OP_NODE));
        assert!(rhs_is_binop);
    }

    #[test]
    fn add_is_left_associative() {
        // (a + b) + c: outer BIN_OP's first non-trivia child is itself a BIN_OP.
        let cst = parse(b"a + b + c", None).unwrap();
        assert!(cst.check_lossless());
        let outer = find_first(&cst.root(), BIN_OP_NODE).unwrap();
        let first_child = outer
            .children()
            .into_iter()
            .find(|c| !matches!(c.kind(), NodeData::Leaf(k) if k.is_trivia()))
            .unwrap();
        assert_eq!(first_child.kind(), NodeData::Branch(BIN_OP_NODE));
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let txt = dump("a + b * c");
        // BIN_OP(ADD) should wrap an ident and a nested BIN_OP(MUL), not the reverse.
        assert!(txt.contains("NODE_BIN_OP"));
    }

    #[test]
    fn application_is_left_associative() {
        let cst = parse(b"f a b", None).unwrap();
        assert!(cst.check_lossless());
        let outer = find_first(&cst.root(), APPLY_NODE).unwrap();
        let first_child = outer
            .children()
            .into_iter()
            .find(|c| !matches!(c.kind(), NodeData::Leaf(k) if k.is_trivia()))
            .unwrap();
        assert_eq!(first_child.kind(), NodeData::Branch(APPLY_NODE));
    }

    #[test]
    fn select_with_or_default() {
        let cst = parse(b"a.b or c", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), SELECT_NODE).is_some());
    }

    #[test]
    fn has_attr_binds_looser_than_application() {
        let cst = parse(b"f a ? b", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), HAS_ATTR_NODE).is_some());
        assert!(find_first(&cst.root(), APPLY_NODE).is_some());
    }

    #[test]
    fn list_items_are_not_applications() {
        let cst = parse(b"[ a b c ]", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), APPLY_NODE).is_none());
    }

    #[test]
    fn attr_set_vs_pattern_disambiguation() {
        let attrs = parse(b"{ a = 1; }", None).unwrap();
        assert!(find_first(&attrs.root(), ATTR_SET_NODE).is_some());
        assert!(find_first(&attrs.root(), LAMBDA_NODE).is_none());

        let pat = parse(b"{ a, b }: a", None).unwrap();
        assert!(find_first(&pat.root(), LAMBDA_NODE).is_some());
        assert!(find_first(&pat.root(), ATTR_SET_NODE).is_none());
    }

    #[test]
    fn unterminated_string_is_lossless_with_error() {
        let cst = parse(b"\"abc", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), ERROR_NODE).is_some());
    }

    #[test]
    fn unbalanced_attr_set_is_lossless_with_error() {
        let cst = parse(b"{ a = 1", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), ERROR_NODE).is_some());
    }

    #[test]
    fn with_and_assert() {
        let cst = parse(b"with builtins; assert true; 1", None).unwrap();
        assert!(cst.check_lossless());
        assert!(find_first(&cst.root(), WITH_NODE).is_some());
        assert!(find_first(&cst.root(), ASSERT_NODE).is_some());
    }

    #[test]
    fn diagnostic_on_unexpected_token() {
        let mut diag = None;
        let cst = parse(b"{ a = ; }", Some(&mut diag)).unwrap();
        assert!(cst.check_lossless());
        assert!(diag.is_some());
    }
}
