// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand expression parsing and evaluation.
//!
//! The operand grammar is deliberately small: a number literal in one of the
//! lexer's normalized forms, a symbol reference, the `$` program counter, a
//! one-character string, or any of those followed by a single infix `+`/`-`
//! whose right operand is a pure number (`label+3`, `$-2`).

use crate::core::tokenizer::{Span, Token, TokenKind};

/// A parsed operand expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(String, Span),
    Symbol(String, Span),
    /// Current program counter (`$`).
    Dollar(Span),
    /// One-character string literal, e.g. `'$'` in a `DB` list.
    Char(u8, Span),
    /// `base ± amount` with a pure-number right operand.
    Offset {
        base: Box<Expr>,
        negate: bool,
        amount: String,
        span: Span,
    },
}

impl Expr {
    /// Get the span of this expression for error reporting.
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span)
            | Expr::Symbol(_, span)
            | Expr::Dollar(span)
            | Expr::Char(_, span)
            | Expr::Offset { span, .. } => *span,
        }
    }
}

/// Error from expression parsing or evaluation.
#[derive(Debug, Clone)]
pub enum ExprError {
    /// A symbol that is not (yet) in the symbol table. Pass 2 turns this
    /// into a patch record for 16-bit operand sites.
    Undefined { name: String, span: Span },
    /// Anything else: malformed literal, misplaced token, bad offset.
    Invalid { message: String, span: Span },
}

impl ExprError {
    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        ExprError::Invalid {
            message: message.into(),
            span,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ExprError::Undefined { name, .. } => format!("Undefined symbol: {name}"),
            ExprError::Invalid { message, .. } => message.clone(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ExprError::Undefined { span, .. } | ExprError::Invalid { span, .. } => *span,
        }
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ExprError {}

/// Context for expression evaluation.
pub trait EvalContext {
    /// Look up a symbol's value by name.
    fn lookup_symbol(&self, name: &str) -> Option<i64>;

    /// Get the current address (`$`).
    fn current_address(&self) -> i64;
}

/// Parse an operand token slice into an expression.
pub fn parse_expr(tokens: &[Token]) -> Result<Expr, ExprError> {
    let (expr, used) = parse_prefix(tokens)?;
    match tokens.get(used) {
        None => Ok(expr),
        Some(tok) => {
            let negate = match tok.kind {
                TokenKind::Plus => false,
                TokenKind::Minus => true,
                _ => {
                    return Err(ExprError::invalid(
                        format!("Unexpected token in expression: {}", tok.to_source_text()),
                        tok.span,
                    ))
                }
            };
            let amount = match tokens.get(used + 1) {
                Some(Token {
                    kind: TokenKind::Number(text),
                    ..
                }) => text.clone(),
                Some(other) => {
                    return Err(ExprError::invalid(
                        "Offset must be a number",
                        other.span,
                    ))
                }
                None => return Err(ExprError::invalid("Offset must be a number", tok.span)),
            };
            if tokens.len() > used + 2 {
                return Err(ExprError::invalid(
                    "Unexpected token after offset",
                    tokens[used + 2].span,
                ));
            }
            let span = expr.span();
            Ok(Expr::Offset {
                base: Box::new(expr),
                negate,
                amount,
                span,
            })
        }
    }
}

fn parse_prefix(tokens: &[Token]) -> Result<(Expr, usize), ExprError> {
    let first = tokens.first().ok_or_else(|| {
        ExprError::invalid("Missing operand", Span::default())
    })?;
    match &first.kind {
        TokenKind::Number(text) => Ok((Expr::Number(text.clone(), first.span), 1)),
        TokenKind::Identifier(name) => Ok((Expr::Symbol(name.clone(), first.span), 1)),
        TokenKind::Dollar => Ok((Expr::Dollar(first.span), 1)),
        TokenKind::Str(body) if body.len() == 1 => {
            Ok((Expr::Char(body.as_bytes()[0], first.span), 1))
        }
        TokenKind::Str(_) => Err(ExprError::invalid(
            "Multi-character string not allowed in expression",
            first.span,
        )),
        TokenKind::Minus => {
            // A leading minus is only meaningful before a plain number.
            match tokens.get(1) {
                Some(Token {
                    kind: TokenKind::Number(text),
                    span,
                }) => Ok((Expr::Number(format!("-{text}"), *span), 2)),
                _ => Err(ExprError::invalid("Expected number after '-'", first.span)),
            }
        }
        _ => Err(ExprError::invalid(
            format!("Invalid operand: {}", first.to_source_text()),
            first.span,
        )),
    }
}

/// Evaluate an expression to a numeric value.
pub fn eval_expr(expr: &Expr, ctx: &dyn EvalContext) -> Result<i64, ExprError> {
    match expr {
        Expr::Number(text, span) => parse_number(text)
            .ok_or_else(|| ExprError::invalid(format!("Invalid number: {text}"), *span)),

        Expr::Symbol(name, span) => ctx.lookup_symbol(name).ok_or(ExprError::Undefined {
            name: name.clone(),
            span: *span,
        }),

        Expr::Dollar(_) => Ok(ctx.current_address()),

        Expr::Char(byte, _) => Ok(*byte as i64),

        Expr::Offset {
            base,
            negate,
            amount,
            span,
        } => {
            let base_val = eval_expr(base, ctx)?;
            let offset = parse_number(amount)
                .ok_or_else(|| ExprError::invalid(format!("Invalid number: {amount}"), *span))?;
            Ok(if *negate {
                base_val.wrapping_sub(offset)
            } else {
                base_val.wrapping_add(offset)
            })
        }
    }
}

/// Parse a number literal in one of the lexer's normalized forms.
///
/// Supported: decimal (`42`), hex (`0x2A`, `$2A`, `2Ah`), binary (`101010b`
/// with every digit 0/1). Returns `None` for anything else; callers must not
/// treat an unparseable literal as zero.
pub fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (is_neg, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let val = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(hex) = text.strip_prefix('$') {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(digits) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
        i64::from_str_radix(digits, 16).ok()?
    } else if let Some(digits) = text.strip_suffix('b').or_else(|| text.strip_suffix('B')) {
        if !digits.chars().all(|c| c == '0' || c == '1') {
            return None;
        }
        i64::from_str_radix(digits, 2).ok()?
    } else {
        if !text.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
        text.parse::<i64>().ok()?
    };

    Some(if is_neg { -val } else { val })
}

/// Returns true if the value fits in an unsigned 8-bit byte (or its signed
/// two's-complement reading).
pub fn value_fits_byte(value: i64) -> bool {
    (-128..=0xff).contains(&value)
}

/// Returns true if the value fits in 16 bits (unsigned or signed reading).
pub fn value_fits_word(value: i64) -> bool {
    (-32768..=0xffff).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::Tokenizer;

    struct TestContext {
        addr: i64,
    }

    impl EvalContext for TestContext {
        fn lookup_symbol(&self, name: &str) -> Option<i64> {
            match name.to_ascii_uppercase().as_str() {
                "BDOS" => Some(5),
                "MSG" => Some(0x10B),
                _ => None,
            }
        }

        fn current_address(&self) -> i64 {
            self.addr
        }
    }

    fn parse(src: &str) -> Expr {
        let tokens = Tokenizer::new(src).tokenize();
        let end = tokens
            .iter()
            .position(|t| t.kind == TokenKind::NewLine)
            .unwrap();
        parse_expr(&tokens[..end]).unwrap()
    }

    fn eval(src: &str, addr: i64) -> i64 {
        eval_expr(&parse(src), &TestContext { addr }).unwrap()
    }

    #[test]
    fn parse_number_decimal() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("0"), Some(0));
        assert_eq!(parse_number("-10"), Some(-10));
    }

    #[test]
    fn parse_number_hex() {
        assert_eq!(parse_number("0x2A"), Some(42));
        assert_eq!(parse_number("$2A"), Some(42));
        assert_eq!(parse_number("2Ah"), Some(42));
    }

    #[test]
    fn parse_number_binary_is_strict() {
        assert_eq!(parse_number("101010b"), Some(42));
        // A `b` suffix over non-binary digits is not a number at all.
        assert_eq!(parse_number("12b"), None);
        assert_eq!(parse_number("1A2b"), None);
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12x4"), None);
        assert_eq!(parse_number("xyz"), None);
    }

    #[test]
    fn evaluates_symbols_and_offsets() {
        assert_eq!(eval("BDOS", 0), 5);
        assert_eq!(eval("MSG+2", 0), 0x10D);
        assert_eq!(eval("MSG-1", 0), 0x10A);
    }

    #[test]
    fn evaluates_dollar_as_pc() {
        assert_eq!(eval("$", 0x100), 0x100);
        assert_eq!(eval("$-2", 0x100), 0xFE);
    }

    #[test]
    fn evaluates_char_literal() {
        assert_eq!(eval("'A'", 0), 65);
    }

    #[test]
    fn undefined_symbol_is_distinguished() {
        let err = eval_expr(&parse("NOWHERE"), &TestContext { addr: 0 }).unwrap_err();
        assert!(matches!(err, ExprError::Undefined { .. }));
        assert_eq!(err.message(), "Undefined symbol: NOWHERE");
    }

    #[test]
    fn offset_requires_pure_number() {
        let tokens = Tokenizer::new("MSG+MSG").tokenize();
        let end = tokens
            .iter()
            .position(|t| t.kind == TokenKind::NewLine)
            .unwrap();
        assert!(parse_expr(&tokens[..end]).is_err());
    }

    #[test]
    fn fits_helpers() {
        assert!(value_fits_byte(0xff));
        assert!(value_fits_byte(-128));
        assert!(!value_fits_byte(0x100));
        assert!(value_fits_word(0xffff));
        assert!(!value_fits_word(0x10000));
    }
}
