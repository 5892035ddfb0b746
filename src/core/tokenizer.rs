// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Tokenizer for assembly source with spans.
//!
//! The tokenizer is one-shot: it scans the whole (preprocessed) source and
//! produces a flat token list with a [`TokenKind::NewLine`] sentinel at every
//! physical line break and a single [`TokenKind::Eof`] at the very end.
//!
//! Mnemonic and register detection are provided via functions passed to
//! [`Tokenizer::with_checkers`], so the scanner itself stays CPU-agnostic.

use crate::core::text_utils::{is_ident_char, is_ident_start, is_space};
use std::sync::Arc;

/// Function type for checking if an identifier belongs to a name set
/// (mnemonics or registers).
pub type NameChecker = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Build a checker from a plain function.
pub fn checker_from_fn(func: fn(&str) -> bool) -> NameChecker {
    Arc::new(func)
}

/// Default checker that matches nothing.
pub fn checker_none() -> NameChecker {
    checker_from_fn(|_| false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub col_start: usize,
    pub col_end: usize,
}

impl Span {
    fn new(line: u32, start: usize, end: usize) -> Self {
        Self {
            line,
            col_start: start + 1,
            col_end: end + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Definition-marker colon, emitted when `:` directly follows an identifier.
    Label,
    /// Instruction or directive, uppercased. Dot-prefixed words (`.Z80`,
    /// `.8080`) keep their leading dot.
    Mnemonic(String),
    /// Register or condition code, uppercased (`B`, `HL`, `NZ`, `AF'`).
    Register(String),
    /// Numeric literal with normalized text: hex forms become `0x…`, binary
    /// keeps its `…b` suffix, decimal stays verbatim.
    Number(String),
    /// Quoted string body, unescaped.
    Str(String),
    /// Symbol reference, canonical case with `$` separators stripped.
    Identifier(String),
    Comma,
    Colon,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Star,
    Slash,
    /// Current program counter.
    Dollar,
    Equals,
    NewLine,
    Eof,
    Unknown(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Render the token back to source-like text for listings and errors.
    pub fn to_source_text(&self) -> String {
        match &self.kind {
            TokenKind::Label => ":".to_string(),
            TokenKind::Mnemonic(name) | TokenKind::Register(name) => name.clone(),
            TokenKind::Number(text) => text.clone(),
            TokenKind::Str(body) => format!("'{body}'"),
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::OpenParen => "(".to_string(),
            TokenKind::CloseParen => ")".to_string(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Dollar => "$".to_string(),
            TokenKind::Equals => "=".to_string(),
            TokenKind::NewLine => "\\n".to_string(),
            TokenKind::Eof => String::new(),
            TokenKind::Unknown(c) => c.to_string(),
        }
    }

    /// True for the identifier kind; constant and label handling key off this.
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier(_))
    }

    /// The mnemonic text if this token is a mnemonic.
    pub fn as_mnemonic(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Mnemonic(name) => Some(name),
            _ => None,
        }
    }
}

pub struct Tokenizer<'a> {
    source: &'a str,
    is_mnemonic: NameChecker,
    is_register: NameChecker,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer with no mnemonic or register detection.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self::with_checkers(source, checker_none(), checker_none())
    }

    /// Create a tokenizer with mnemonic and register set checkers.
    #[must_use]
    pub fn with_checkers(
        source: &'a str,
        is_mnemonic: NameChecker,
        is_register: NameChecker,
    ) -> Self {
        Self {
            source,
            is_mnemonic,
            is_register,
        }
    }

    /// Scan the whole source into a flat token list.
    ///
    /// The scanner is permissive: an unterminated string captures to the end
    /// of its line, and unrecognized characters become [`TokenKind::Unknown`]
    /// tokens for the encoder to reject in context.
    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut line_num: u32 = 1;
        let segments: Vec<&str> = self.source.split('\n').collect();
        let count = segments.len();
        for (index, line) in segments.into_iter().enumerate() {
            // A trailing newline does not open a new physical line.
            if index + 1 == count && line.is_empty() {
                break;
            }
            let line = line.strip_suffix('\r').unwrap_or(line);
            let mut scanner = LineScanner {
                line_num,
                input: line.as_bytes(),
                cursor: 0,
                is_mnemonic: &self.is_mnemonic,
                is_register: &self.is_register,
            };
            scanner.scan_line(&mut tokens);
            tokens.push(Token {
                kind: TokenKind::NewLine,
                span: Span::new(line_num, line.len(), line.len()),
            });
            line_num += 1;
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(line_num.saturating_sub(1), 0, 0),
        });
        tokens
    }
}

struct LineScanner<'a> {
    line_num: u32,
    input: &'a [u8],
    cursor: usize,
    is_mnemonic: &'a NameChecker,
    is_register: &'a NameChecker,
}

impl LineScanner<'_> {
    fn scan_line(&mut self, out: &mut Vec<Token>) {
        loop {
            self.skip_white();
            let start = self.cursor;
            let c = self.current_byte();
            match c {
                0 => return,
                b';' => {
                    // Comment runs to end of line.
                    self.cursor = self.input.len();
                    return;
                }
                _ if is_ident_start(c) => {
                    let token = self.scan_identifier();
                    out.push(token);
                }
                _ if c.is_ascii_digit() => {
                    let token = self.scan_number();
                    out.push(token);
                }
                b'"' | b'\'' => {
                    let token = self.scan_string();
                    out.push(token);
                }
                b'$' => {
                    if self.peek_raw_byte(1).is_ascii_hexdigit() {
                        let token = self.scan_dollar_hex();
                        out.push(token);
                    } else {
                        self.cursor += 1;
                        out.push(self.single(TokenKind::Dollar, start));
                    }
                }
                b'.' => {
                    if is_ident_char(self.peek_raw_byte(1)) {
                        let token = self.scan_dot_word();
                        out.push(token);
                    } else {
                        self.cursor += 1;
                        out.push(self.single(TokenKind::Unknown('.'), start));
                    }
                }
                _ => {
                    self.cursor += 1;
                    let kind = match c {
                        b',' => TokenKind::Comma,
                        b':' => {
                            if matches!(out.last().map(|t| &t.kind), Some(TokenKind::Identifier(_)))
                            {
                                TokenKind::Label
                            } else {
                                TokenKind::Colon
                            }
                        }
                        b'(' => TokenKind::OpenParen,
                        b')' => TokenKind::CloseParen,
                        b'+' => TokenKind::Plus,
                        b'-' => TokenKind::Minus,
                        b'*' => TokenKind::Star,
                        b'/' => TokenKind::Slash,
                        b'=' => TokenKind::Equals,
                        _ => TokenKind::Unknown(c as char),
                    };
                    out.push(self.single(kind, start));
                }
            }
        }
    }

    fn single(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(self.line_num, start, self.cursor),
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.cursor;
        while is_ident_char(self.current_byte()) {
            self.cursor += 1;
        }
        let raw = String::from_utf8_lossy(&self.input[start..self.cursor]).to_string();
        // 8080 sources use `$` as a visual separator inside symbol names.
        let text: String = raw.chars().filter(|&c| c != '$').collect();
        let upper = text.to_ascii_uppercase();

        let kind = if (self.is_mnemonic)(&upper) {
            TokenKind::Mnemonic(upper)
        } else if (self.is_register)(&upper) {
            TokenKind::Register(upper)
        } else {
            TokenKind::Identifier(text)
        };
        Token {
            kind,
            span: Span::new(self.line_num, start, self.cursor),
        }
    }

    fn scan_dot_word(&mut self) -> Token {
        let start = self.cursor;
        self.cursor += 1;
        while is_ident_char(self.current_byte()) {
            self.cursor += 1;
        }
        let text = String::from_utf8_lossy(&self.input[start..self.cursor]).to_ascii_uppercase();
        // Dot-prefixed words keep the dot so the encoder can skip them.
        Token {
            kind: TokenKind::Mnemonic(text),
            span: Span::new(self.line_num, start, self.cursor),
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.cursor;
        while is_num_char(self.current_byte()) {
            self.cursor += 1;
        }
        let raw = String::from_utf8_lossy(&self.input[start..self.cursor]).to_string();
        let text = normalize_number(&raw);
        Token {
            kind: TokenKind::Number(text),
            span: Span::new(self.line_num, start, self.cursor),
        }
    }

    fn scan_dollar_hex(&mut self) -> Token {
        let start = self.cursor;
        self.cursor += 1;
        while self.current_byte().is_ascii_hexdigit() || self.current_byte() == b'$' {
            self.cursor += 1;
        }
        let digits: String = self.input[start + 1..self.cursor]
            .iter()
            .filter(|&&c| c != b'$')
            .map(|&c| (c as char).to_ascii_uppercase())
            .collect();
        Token {
            kind: TokenKind::Number(format!("0x{digits}")),
            span: Span::new(self.line_num, start, self.cursor),
        }
    }

    fn scan_string(&mut self) -> Token {
        let start = self.cursor;
        let quote = self.current_byte();
        self.cursor += 1;
        let body_start = self.cursor;
        while self.current_byte() != 0 && self.current_byte() != quote {
            self.cursor += 1;
        }
        let body = String::from_utf8_lossy(&self.input[body_start..self.cursor]).to_string();
        if self.current_byte() == quote {
            self.cursor += 1;
        }
        Token {
            kind: TokenKind::Str(body),
            span: Span::new(self.line_num, start, self.cursor),
        }
    }

    fn skip_white(&mut self) {
        while is_space(self.current_byte()) {
            self.cursor += 1;
        }
    }

    fn current_byte(&self) -> u8 {
        self.input.get(self.cursor).copied().unwrap_or(0)
    }

    fn peek_raw_byte(&self, offset: usize) -> u8 {
        self.input.get(self.cursor + offset).copied().unwrap_or(0)
    }
}

fn is_num_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'$' || c == b'_'
}

/// Normalize a raw numeric literal to the forms the evaluator accepts.
///
/// `0xFF`, `0FFh` and `$FF` all become `0xFF`; binary keeps a lowercase `b`
/// suffix; decimal stays verbatim. `$` and `_` group separators are dropped.
/// Anything else is kept as-is and rejected later by number parsing.
fn normalize_number(raw: &str) -> String {
    let text: String = raw.chars().filter(|&c| c != '$' && c != '_').collect();
    let upper = text.to_ascii_uppercase();

    if let Some(hex) = upper.strip_prefix("0X") {
        if !hex.is_empty() && hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return format!("0x{hex}");
        }
        return text;
    }
    if let Some(digits) = upper.strip_suffix('H') {
        if !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_hexdigit()) {
            return format!("0x{digits}");
        }
        return text;
    }
    if let Some(digits) = upper.strip_suffix('B') {
        // Strict suffix detection: binary only when every digit is 0 or 1.
        if !digits.is_empty() && digits.bytes().all(|c| c == b'0' || c == b'1') {
            return format!("{digits}b");
        }
        return text;
    }
    text
}
