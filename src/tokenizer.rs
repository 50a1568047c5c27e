//! Byte stream to token stream, with a context stack driving the
//! string/interpolation/path interleaving described in the Nix grammar.

use crate::chars::{is_digit, is_ident_cont, is_ident_start, is_path_terminator, is_whitespace, scan_while};
use crate::kind::SyntaxKind::{self, *};

/// A single token: a kind plus a half-open byte span into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub start: u32,
    pub end: u32,
}

impl Token {
    fn new(kind: SyntaxKind, start: usize, end: usize) -> Self {
        Token { kind, start: start as u32, end: end as u32 }
    }
}

/// The tokenizer's context stack, tracking string body / interpolation
/// nesting. Never larger than the source's interpolation/string nesting
/// depth plus a small constant.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ctx {
    StringBody { multiline: bool },
    StringEnd { multiline: bool },
    Interpol { brace_depth: u32 },
    InterpolStart,
}

/// A snapshot of tokenizer state, cheap to clone.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct State {
    pos: usize,
    stack: Vec<Ctx>,
}

pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
    stack: Vec<Ctx>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Tokenizer { bytes: source, pos: 0, stack: Vec::new() }
    }

    #[allow(dead_code)]
    pub fn save_state(&self) -> State {
        State { pos: self.pos, stack: self.stack.clone() }
    }

    #[allow(dead_code)]
    pub fn restore_state(&mut self, state: State) {
        self.pos = state.pos;
        self.stack = state.stack;
    }

    /// Produces the next token. Never fails; unrecoverable input yields an
    /// `ERROR` token and still advances (or, at true end of input inside an
    /// unterminated string, a zero-length `ERROR`).
    pub fn next(&mut self) -> Token {
        match self.stack.last().cloned() {
            Some(Ctx::StringBody { multiline }) => self.scan_string_body(multiline),
            Some(Ctx::StringEnd { multiline }) => {
                self.stack.pop();
                let start = self.pos;
                let len = if multiline { 2 } else { 1 };
                self.pos += len;
                Token::new(STRING_END, start, self.pos)
            }
            Some(Ctx::InterpolStart) => {
                self.stack.pop();
                self.stack.push(Ctx::Interpol { brace_depth: 0 });
                let start = self.pos;
                self.pos += 2;
                Token::new(INTERPOL_START, start, self.pos)
            }
            _ => self.scan_normal(),
        }
    }

    fn at(&self, i: usize, s: &[u8]) -> bool {
        self.bytes[i..].starts_with(s)
    }

    fn scan_normal(&mut self) -> Token {
        let bytes = self.bytes;
        let len = bytes.len();
        let start = self.pos;
        if start >= len {
            return Token::new(EOF, start, start);
        }
        let b = bytes[start];

        if is_whitespace(b) {
            let end = scan_while(bytes, start, is_whitespace);
            self.pos = end;
            return Token::new(WHITESPACE, start, end);
        }
        if b == b'#' {
            let mut end = start;
            while end < len && bytes[end] != b'\n' {
                end += 1;
            }
            self.pos = end;
            return Token::new(COMMENT, start, end);
        }
        if self.at(start, b"/*") {
            let mut i = start + 2;
            let mut depth = 1u32;
            while i < len && depth > 0 {
                if self.at(i, b"*/") {
                    depth -= 1;
                    i += 2;
                } else if self.at(i, b"/*") {
                    depth += 1;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            self.pos = i;
            return Token::new(COMMENT, start, i);
        }
        if self.at(start, b"${") {
            self.stack.push(Ctx::Interpol { brace_depth: 0 });
            self.pos = start + 2;
            return Token::new(INTERPOL_START, start, self.pos);
        }
        if b == b'"' {
            self.stack.push(Ctx::StringBody { multiline: false });
            self.pos = start + 1;
            return Token::new(STRING_START, start, self.pos);
        }
        if self.at(start, b"''") {
            self.stack.push(Ctx::StringBody { multiline: true });
            self.pos = start + 2;
            return Token::new(STRING_START, start, self.pos);
        }
        if is_digit(b) {
            return self.scan_number(start);
        }
        if is_ident_start(b) {
            return self.scan_ident(start);
        }
        if matches!(b, b'<' | b'~' | b'/' | b'.') {
            if let Some(end) = self.try_path(start) {
                self.pos = end;
                return Token::new(PATH, start, end);
            }
        }
        self.scan_operator(start)
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let bytes = self.bytes;
        let mut i = scan_while(bytes, start, is_digit);
        let mut is_float = false;
        if i < bytes.len() && bytes[i] == b'.' && i + 1 < bytes.len() && is_digit(bytes[i + 1]) {
            is_float = true;
            i = scan_while(bytes, i + 1, is_digit);
            if let Some(j) = self.try_exponent(i) {
                i = j;
            }
        } else if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
            if let Some(j) = self.try_exponent(i) {
                is_float = true;
                i = j;
            }
        }
        self.pos = i;
        Token::new(if is_float { FLOAT } else { INTEGER }, start, i)
    }

    /// Tries to consume `e`/`E` [sign] digit+ starting at `i`. Returns the
    /// new end offset on success, `None` (leaving `i` untouched) otherwise.
    fn try_exponent(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        if i >= bytes.len() || !matches!(bytes[i], b'e' | b'E') {
            return None;
        }
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < bytes.len() && is_digit(bytes[j]) {
            Some(scan_while(bytes, j, is_digit))
        } else {
            None
        }
    }

    fn scan_ident(&mut self, start: usize) -> Token {
        let bytes = self.bytes;
        let mut i = scan_while(bytes, start, is_ident_cont);
        if self.at(i, b"://") {
            i += 3;
            while i < bytes.len() && !is_path_terminator(bytes[i]) {
                i += 1;
            }
            self.pos = i;
            return Token::new(URI, start, i);
        }
        self.pos = i;
        let text = std::str::from_utf8(&bytes[start..i]).unwrap_or("");
        let kind = SyntaxKind::keyword(text).unwrap_or(IDENT);
        Token::new(kind, start, i)
    }

    /// Attempts to scan a path literal starting at `start` (whose first byte
    /// is one of `< ~ / .`). Returns the end offset on success; `None`
    /// leaves the tokenizer unmoved so the caller falls back to operator
    /// scanning.
    fn try_path(&self, start: usize) -> Option<usize> {
        let bytes = self.bytes;
        let len = bytes.len();
        let end = match bytes[start] {
            b'<' => {
                if start + 1 < len && bytes[start + 1].is_ascii_alphabetic() {
                    let mut i = start + 1;
                    while i < len && bytes[i] != b'>' {
                        i += 1;
                    }
                    if i < len {
                        i += 1;
                    }
                    i
                } else {
                    return None;
                }
            }
            b'~' => {
                if start + 1 < len && !bytes[start + 1].is_ascii_alphanumeric() {
                    self.scan_path_run(start + 1)
                } else {
                    return None;
                }
            }
            b'/' => {
                if start + 1 < len && bytes[start + 1] == b'/' {
                    return None;
                }
                self.scan_path_run(start + 1)
            }
            b'.' => {
                if start + 1 < len && bytes[start + 1] == b'/' {
                    self.scan_path_run(start + 2)
                } else if start + 2 < len && bytes[start + 1] == b'.' && bytes[start + 2] == b'/' {
                    self.scan_path_run(start + 3)
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        if end - start >= 2 {
            Some(end)
        } else {
            None
        }
    }

    fn scan_path_run(&self, from: usize) -> usize {
        let bytes = self.bytes;
        let len = bytes.len();
        let mut i = from;
        while i < len {
            if is_path_terminator(bytes[i]) {
                break;
            }
            if bytes[i] == b'$' && i + 1 < len && bytes[i + 1] == b'{' {
                break;
            }
            i += 1;
        }
        i
    }

    const TWO_BYTE_OPS: &'static [(&'static [u8], SyntaxKind)] = &[
        (b"//", UPDATE),
        (b"++", CONCAT),
        (b"==", EQUAL),
        (b"!=", NOT_EQUAL),
        (b"<=", LESS_OR_EQ),
        (b">=", MORE_OR_EQ),
        (b"&&", AND_AND),
        (b"||", OR_OR),
        (b"->", IMPLICATION),
        (b"<|", PIPE_LEFT),
        (b"|>", PIPE_RIGHT),
    ];

    fn scan_operator(&mut self, start: usize) -> Token {
        if self.at(start, b"...") {
            self.pos = start + 3;
            return Token::new(ELLIPSIS, start, self.pos);
        }
        for (pat, kind) in Self::TWO_BYTE_OPS {
            if self.at(start, pat) {
                self.pos = start + 2;
                return Token::new(*kind, start, self.pos);
            }
        }
        let b = self.bytes[start];
        if b == b'{' {
            self.pos = start + 1;
            if let Some(Ctx::Interpol { brace_depth }) = self.stack.last_mut() {
                *brace_depth += 1;
            }
            return Token::new(L_BRACE, start, self.pos);
        }
        if b == b'}' {
            self.pos = start + 1;
            if let Some(Ctx::Interpol { brace_depth }) = self.stack.last_mut() {
                if *brace_depth == 0 {
                    self.stack.pop();
                    return Token::new(INTERPOL_END, start, self.pos);
                }
                *brace_depth -= 1;
                return Token::new(R_BRACE, start, self.pos);
            }
            return Token::new(R_BRACE, start, self.pos);
        }
        let kind = match b {
            b'+' => ADD,
            b'-' => SUB,
            b'*' => MUL,
            b'/' => DIV,
            b'!' => INVERT,
            b'?' => QUESTION,
            b'.' => DOT,
            b'@' => AT,
            b'=' => ASSIGN,
            b';' => SEMICOLON,
            b':' => COLON,
            b',' => COMMA,
            b'[' => L_BRACK,
            b']' => R_BRACK,
            b'(' => L_PAREN,
            b')' => R_PAREN,
            b'<' => LESS,
            b'>' => MORE,
            _ => ERROR,
        };
        self.pos = start + 1;
        Token::new(kind, start, self.pos)
    }

    /// Scans content of a string body until a closing delimiter, an
    /// interpolation start, or true EOF. `STRING_CONTENT` tokens may be
    /// zero-length when a delimiter or interpolation immediately follows
    /// `STRING_START` (or another interpolation), the one deliberate
    /// exception to the "non-EOF tokens are non-empty" rule.
    fn scan_string_body(&mut self, multiline: bool) -> Token {
        let bytes = self.bytes;
        let len = bytes.len();
        let start = self.pos;
        let mut i = start;
        loop {
            if i >= len {
                if i > start {
                    self.pos = i;
                    return Token::new(STRING_CONTENT, start, i);
                }
                self.stack.pop();
                return Token::new(ERROR, start, start);
            }
            if multiline {
                if self.at(i, b"'''") || self.at(i, b"''$") || self.at(i, b"''\\") {
                    i += 3;
                    continue;
                }
                if self.at(i, b"''") {
                    self.pos = i;
                    self.stack.pop();
                    self.stack.push(Ctx::StringEnd { multiline });
                    return Token::new(STRING_CONTENT, start, i);
                }
            } else {
                if bytes[i] == b'"' {
                    self.pos = i;
                    self.stack.pop();
                    self.stack.push(Ctx::StringEnd { multiline });
                    return Token::new(STRING_CONTENT, start, i);
                }
                if bytes[i] == b'\\' {
                    i += if i + 1 < len { 2 } else { 1 };
                    continue;
                }
            }
            if self.at(i, b"${") {
                self.pos = i;
                self.stack.push(Ctx::InterpolStart);
                return Token::new(STRING_CONTENT, start, i);
            }
            i += 1;
        }
    }
}
