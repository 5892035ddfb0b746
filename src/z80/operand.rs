// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand types for the Z80/8080 encoders.
//!
//! The parser turns operand token slices into a typed tree; register and
//! condition names stay as uppercased strings because several are only
//! disambiguated by the instruction context (`C` the register vs `C` the
//! carry condition, `M` the memory operand vs `M` the minus condition).

use crate::core::expr::{parse_expr, Expr, ExprError};
use crate::core::tokenizer::{Span, Token, TokenKind};

/// A parsed instruction operand.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Register or condition name: `A`, `HL`, `PSW`, `NZ`, `AF'`.
    Register(String, Span),
    /// Indirect through a register: `(HL)`, `(BC)`, `(DE)`, `(SP)`, `(C)`,
    /// `(IX)`, `(IY)`.
    IndirectReg(String, Span),
    /// Indexed: `(IX+d)` / `(IY-d)`.
    Indexed {
        base: String,
        negate: bool,
        disp: Expr,
        span: Span,
    },
    /// Indirect through an address: `(nn)`.
    IndirectImm(Expr, Span),
    /// Immediate value or address expression.
    Imm(Expr, Span),
    /// Post-increment pseudo operand `(HL+)`.
    HlPostInc(Span),
    /// String literal in a data directive list.
    Str(String, Span),
}

impl Operand {
    pub fn span(&self) -> Span {
        match self {
            Operand::Register(_, span)
            | Operand::IndirectReg(_, span)
            | Operand::Indexed { span, .. }
            | Operand::IndirectImm(_, span)
            | Operand::Imm(_, span)
            | Operand::HlPostInc(span)
            | Operand::Str(_, span) => *span,
        }
    }

    /// The register name if this is a register operand.
    pub fn as_register(&self) -> Option<&str> {
        match self {
            Operand::Register(name, _) => Some(name),
            _ => None,
        }
    }

    /// True when this operand is the given register name.
    pub fn is_register(&self, name: &str) -> bool {
        matches!(self, Operand::Register(n, _) if n == name)
    }

    /// True when this operand is indirect through the given register.
    pub fn is_indirect(&self, name: &str) -> bool {
        matches!(self, Operand::IndirectReg(n, _) if n == name)
    }

    /// True for `(HL)` and its 8080 spelling `M`.
    pub fn is_mem_hl(&self) -> bool {
        self.is_indirect("HL") || self.is_register("M")
    }

    /// The immediate expression if this is an immediate operand.
    pub fn as_imm(&self) -> Option<&Expr> {
        match self {
            Operand::Imm(expr, _) => Some(expr),
            _ => None,
        }
    }
}

/// Split an operand token list at top-level commas.
pub fn split_operands(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                parts.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    if parts.len() == 1 && parts[0].is_empty() {
        parts.clear();
    }
    parts
}

/// Parse a single operand token slice.
pub fn parse_operand(tokens: &[Token]) -> Result<Operand, ExprError> {
    let first = tokens
        .first()
        .ok_or_else(|| ExprError::invalid("Missing operand", Span::default()))?;
    let span = first.span;

    if let TokenKind::Register(name) = &first.kind {
        if tokens.len() == 1 {
            return Ok(Operand::Register(name.clone(), span));
        }
    }

    if let TokenKind::Str(body) = &first.kind {
        if tokens.len() == 1 && body.len() != 1 {
            return Ok(Operand::Str(body.clone(), span));
        }
    }

    if first.kind == TokenKind::OpenParen
        && tokens.last().map(|t| &t.kind) == Some(&TokenKind::CloseParen)
        && balanced_to_end(tokens)
    {
        return parse_paren_operand(&tokens[1..tokens.len() - 1], span);
    }

    Ok(Operand::Imm(parse_expr(tokens)?, span))
}

/// Parse all operands of an instruction line.
pub fn parse_operands(tokens: &[Token]) -> Result<Vec<Operand>, ExprError> {
    split_operands(tokens)
        .into_iter()
        .map(parse_operand)
        .collect()
}

/// True when the opening paren at index 0 closes at the final token, i.e.
/// the parens wrap the whole operand rather than a leading subexpression.
fn balanced_to_end(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth -= 1;
                if depth == 0 {
                    return idx == tokens.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn parse_paren_operand(inner: &[Token], span: Span) -> Result<Operand, ExprError> {
    let first = inner
        .first()
        .ok_or_else(|| ExprError::invalid("Empty parentheses", span))?;

    if let TokenKind::Register(name) = &first.kind {
        match name.as_str() {
            "HL" | "BC" | "DE" | "SP" | "C" | "IX" | "IY" => {
                if inner.len() == 1 {
                    return Ok(Operand::IndirectReg(name.clone(), span));
                }
                if name == "HL" && inner.len() == 2 && inner[1].kind == TokenKind::Plus {
                    return Ok(Operand::HlPostInc(span));
                }
                if (name == "IX" || name == "IY") && inner.len() >= 2 {
                    let negate = match inner[1].kind {
                        TokenKind::Plus => false,
                        TokenKind::Minus => true,
                        _ => {
                            return Err(ExprError::invalid(
                                "Expected '+' or '-' after index register",
                                inner[1].span,
                            ))
                        }
                    };
                    let disp = parse_expr(&inner[2..])?;
                    return Ok(Operand::Indexed {
                        base: name.clone(),
                        negate,
                        disp,
                        span,
                    });
                }
                return Err(ExprError::invalid(
                    format!("Invalid indirect operand: ({name}...)"),
                    span,
                ));
            }
            _ => {
                return Err(ExprError::invalid(
                    format!("Register {name} cannot be used indirectly"),
                    span,
                ))
            }
        }
    }

    Ok(Operand::IndirectImm(parse_expr(inner)?, span))
}

#[cfg(test)]
mod tests {
    use super::{parse_operands, Operand};
    use crate::core::tokenizer::{checker_from_fn, TokenKind, Tokenizer};

    fn registers(name: &str) -> bool {
        crate::z80::is_register(name)
    }

    fn parse(src: &str) -> Vec<Operand> {
        let tokens = Tokenizer::with_checkers(
            src,
            crate::core::tokenizer::checker_none(),
            checker_from_fn(registers),
        )
        .tokenize();
        let end = tokens
            .iter()
            .position(|t| t.kind == TokenKind::NewLine)
            .unwrap();
        parse_operands(&tokens[..end]).unwrap()
    }

    #[test]
    fn splits_at_top_level_commas_only() {
        let ops = parse("A,(IX+5),MSG");
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], Operand::Register(name, _) if name == "A"));
        assert!(matches!(&ops[1], Operand::Indexed { base, .. } if base == "IX"));
        assert!(matches!(&ops[2], Operand::Imm(_, _)));
    }

    #[test]
    fn parses_indirect_registers() {
        let ops = parse("(HL),(BC),(C)");
        assert!(ops[0].is_indirect("HL"));
        assert!(ops[1].is_indirect("BC"));
        assert!(ops[2].is_indirect("C"));
    }

    #[test]
    fn parses_indexed_with_sign() {
        let ops = parse("(IY-3)");
        match &ops[0] {
            Operand::Indexed { base, negate, .. } => {
                assert_eq!(base, "IY");
                assert!(*negate);
            }
            other => panic!("expected indexed, got {other:?}"),
        }
    }

    #[test]
    fn parses_indirect_address() {
        let ops = parse("(1234h)");
        assert!(matches!(&ops[0], Operand::IndirectImm(_, _)));
    }

    #[test]
    fn parses_hl_post_increment() {
        let ops = parse("(HL+)");
        assert!(matches!(&ops[0], Operand::HlPostInc(_)));
    }

    #[test]
    fn mem_hl_covers_8080_m() {
        let ops = parse("M");
        assert!(ops[0].is_mem_hl());
        let ops = parse("(HL)");
        assert!(ops[0].is_mem_hl());
    }

    #[test]
    fn single_char_string_is_immediate() {
        let ops = parse("'$'");
        assert!(matches!(&ops[0], Operand::Imm(_, _)));
    }

    #[test]
    fn longer_string_is_string_operand() {
        let ops = parse("'Hi'");
        assert!(matches!(&ops[0], Operand::Str(body, _) if body == "Hi"));
    }
}
