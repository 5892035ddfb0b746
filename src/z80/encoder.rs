// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Z80 instruction encoding.
//!
//! [`encode`] dispatches on the uppercased mnemonic and returns the byte
//! slice for the instruction, plus patch requests for any operand that
//! references a symbol not yet bound. Returns `NotFound` for mnemonics that
//! belong to the 8080 compatibility layer.
//!
//! Both passes run through here. Pass 1 is lenient: undefined symbols read
//! as 0 and range checks are skipped, so the byte count (which never
//! depends on operand values) is always the final one.

use crate::core::context::{AssemblerContext, EncodeResult, Encoded, PatchRequest};
use crate::core::expr::{Expr, ExprError};
use crate::core::tokenizer::Span;

use super::operand::Operand;
use super::table::{alu_base, bit_base, fixed_bytes, lookup_fixed, rotate_base};
use super::{cond_code, index_half, index_prefix, pair_code, push_pair_code, reg8_code};

/// Encode one instruction line. `mnemonic` must already be uppercased.
pub fn encode(mnemonic: &str, operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    if operands.is_empty() {
        if mnemonic == "RET" {
            return EncodeResult::ok(vec![0xC9]);
        }
        if let Some(entry) = lookup_fixed(mnemonic) {
            return EncodeResult::ok(fixed_bytes(entry));
        }
    }

    match mnemonic {
        "LD" => encode_ld(operands, ctx),
        "PUSH" => encode_push_pop(operands, 0xC5, 0xE5),
        "POP" => encode_push_pop(operands, 0xC1, 0xE1),
        "ADD" | "ADC" | "SUB" | "SBC" | "AND" | "XOR" | "OR" | "CP" => {
            encode_alu(mnemonic, operands, ctx)
        }
        "INC" => encode_inc_dec(operands, ctx, 0x04, 0x03, 0x34),
        "DEC" => encode_inc_dec(operands, ctx, 0x05, 0x0B, 0x35),
        "RLC" | "RRC" | "RL" | "RR" | "SLA" | "SRA" | "SLL" | "SRL" => {
            encode_rotate(mnemonic, operands, ctx)
        }
        "BIT" | "SET" | "RES" => encode_bit_op(mnemonic, operands, ctx),
        "JP" => encode_jp(operands, ctx),
        "JR" => encode_jr(operands, ctx),
        "DJNZ" => encode_djnz(operands, ctx),
        "CALL" => encode_call(operands, ctx),
        "RET" => encode_ret(operands),
        "RST" => encode_rst(operands, ctx),
        "IM" => encode_im(operands, ctx),
        "IN" => encode_in(operands, ctx),
        "OUT" => encode_out(operands, ctx),
        "EX" => encode_ex(operands),
        _ => EncodeResult::NotFound,
    }
}

/// A resolved 16-bit operand: a value, or a symbol to patch later.
pub(crate) enum Word {
    Value(u16),
    Forward(String),
}

pub(crate) fn word_operand(expr: &Expr, ctx: &dyn AssemblerContext) -> Result<Word, String> {
    match ctx.eval(expr) {
        Ok(v) => Ok(Word::Value(v as u16)),
        Err(ExprError::Undefined { name, .. }) => {
            if ctx.pass() == 1 {
                Ok(Word::Value(0))
            } else {
                Ok(Word::Forward(name))
            }
        }
        Err(err) => Err(err.message()),
    }
}

pub(crate) fn byte_operand(expr: &Expr, ctx: &dyn AssemblerContext) -> Result<u8, String> {
    match ctx.eval(expr) {
        Ok(v) => Ok((v & 0xff) as u8),
        Err(ExprError::Undefined { name, .. }) => {
            if ctx.pass() == 1 {
                Ok(0)
            } else {
                Err(format!("Undefined symbol: {name}"))
            }
        }
        Err(err) => Err(err.message()),
    }
}

pub(crate) fn push_word(
    out: &mut Encoded,
    expr: &Expr,
    ctx: &dyn AssemblerContext,
) -> Result<(), String> {
    match word_operand(expr, ctx)? {
        Word::Value(v) => {
            out.bytes.push((v & 0xff) as u8);
            out.bytes.push((v >> 8) as u8);
        }
        Word::Forward(name) => {
            out.patches.push(PatchRequest {
                offset: out.bytes.len(),
                name,
                relative: false,
            });
            out.bytes.push(0);
            out.bytes.push(0);
        }
    }
    Ok(())
}

/// Append a relative displacement: `target - (pc + len_through_disp)`.
fn push_relative(
    out: &mut Encoded,
    expr: &Expr,
    ctx: &dyn AssemblerContext,
) -> Result<(), String> {
    match word_operand(expr, ctx)? {
        Word::Forward(name) => {
            out.patches.push(PatchRequest {
                offset: out.bytes.len(),
                name,
                relative: true,
            });
            out.bytes.push(0);
        }
        Word::Value(target) => {
            let next = ctx.current_address() as i32 + out.bytes.len() as i32 + 1;
            let disp = target as i32 - next;
            if ctx.pass() == 2 && !(-128..=127).contains(&disp) {
                let target_name = match expr {
                    Expr::Symbol(name, _) => name.clone(),
                    _ => String::new(),
                };
                return Err(relative_range_message(&target_name));
            }
            out.bytes.push(disp as u8);
        }
    }
    Ok(())
}

fn relative_range_message(name: &str) -> String {
    if name.is_empty() {
        "Relative jump out of range".to_string()
    } else {
        format!("Relative jump to '{name}' out of range")
    }
}

fn index_disp(
    negate: bool,
    disp: &Expr,
    ctx: &dyn AssemblerContext,
) -> Result<u8, String> {
    let raw = match ctx.eval(disp) {
        Ok(v) => v,
        Err(ExprError::Undefined { name, .. }) => {
            if ctx.pass() == 1 {
                0
            } else {
                return Err(format!("Undefined symbol: {name}"));
            }
        }
        Err(err) => return Err(err.message()),
    };
    let value = if negate { -raw } else { raw };
    if ctx.pass() == 2 && !(-128..=127).contains(&value) {
        return Err(format!("Index displacement {value} out of range"));
    }
    Ok(value as i8 as u8)
}

/// Register field for 8-bit positions; folds `(HL)` and `M` to code 6.
fn operand_reg8(op: &Operand) -> Option<u8> {
    match op {
        Operand::Register(name, _) => reg8_code(name),
        Operand::IndirectReg(name, _) if name == "HL" => Some(6),
        _ => None,
    }
}

fn invalid(mnemonic: &str, span: crate::core::tokenizer::Span) -> EncodeResult {
    EncodeResult::error_with_span(
        format!("Invalid operand combination for {mnemonic}"),
        span,
    )
}

fn fail(message: String, span: crate::core::tokenizer::Span) -> EncodeResult {
    EncodeResult::error_with_span(message, span)
}

// ---------------------------------------------------------------- LD

fn encode_ld(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    let [dst, src] = match operands {
        [dst, src] => [dst, src],
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            return fail("LD requires two operands".to_string(), span);
        }
    };
    let span = dst.span();
    let mut out = Encoded::default();

    // Accumulator special forms come before the generic register paths.
    if dst.is_register("A") {
        match src {
            Operand::IndirectReg(name, _) if name == "BC" => return EncodeResult::ok(vec![0x0A]),
            Operand::IndirectReg(name, _) if name == "DE" => return EncodeResult::ok(vec![0x1A]),
            Operand::IndirectImm(expr, _) => {
                out.bytes.push(0x3A);
                if let Err(msg) = push_word(&mut out, expr, ctx) {
                    return fail(msg, src.span());
                }
                return EncodeResult::Ok(out);
            }
            Operand::Register(name, _) if name == "I" => return EncodeResult::ok(vec![0xED, 0x57]),
            Operand::Register(name, _) if name == "R" => return EncodeResult::ok(vec![0xED, 0x5F]),
            _ => {}
        }
    }
    if src.is_register("A") {
        match dst {
            Operand::IndirectReg(name, _) if name == "BC" => return EncodeResult::ok(vec![0x02]),
            Operand::IndirectReg(name, _) if name == "DE" => return EncodeResult::ok(vec![0x12]),
            Operand::Register(name, _) if name == "I" => return EncodeResult::ok(vec![0xED, 0x47]),
            Operand::Register(name, _) if name == "R" => return EncodeResult::ok(vec![0xED, 0x4F]),
            _ => {}
        }
    }

    // 8-bit destination register or (HL).
    if let Some(d) = operand_reg8(dst) {
        match src {
            _ if operand_reg8(src).is_some() => {
                let s = operand_reg8(src).unwrap();
                if d == 6 && s == 6 {
                    return invalid("LD", span);
                }
                return EncodeResult::ok(vec![0x40 | (d << 3) | s]);
            }
            Operand::Register(name, _) if index_half(name).is_some() => {
                // Index halves pair only with A,B,C,D,E.
                if d >= 4 && d != 7 {
                    return invalid("LD", span);
                }
                let (prefix, half) = index_half(name).unwrap();
                return EncodeResult::ok(vec![prefix, 0x40 | (d << 3) | half]);
            }
            Operand::Indexed {
                base,
                negate,
                disp,
                span: idx_span,
            } => {
                if d == 6 {
                    return invalid("LD", span);
                }
                let prefix = match index_prefix(base) {
                    Some(p) => p,
                    None => return invalid("LD", *idx_span),
                };
                let disp = match index_disp(*negate, disp, ctx) {
                    Ok(d) => d,
                    Err(msg) => return fail(msg, *idx_span),
                };
                return EncodeResult::ok(vec![prefix, 0x46 | (d << 3), disp]);
            }
            Operand::HlPostInc(_) => {
                if d == 6 {
                    return invalid("LD", span);
                }
                // LD r,(HL+)  =>  LD r,(HL); INC HL
                return EncodeResult::ok(vec![0x46 | (d << 3), 0x23]);
            }
            Operand::Imm(expr, imm_span) => {
                let value = match byte_operand(expr, ctx) {
                    Ok(v) => v,
                    Err(msg) => return fail(msg, *imm_span),
                };
                return EncodeResult::ok(vec![0x06 | (d << 3), value]);
            }
            _ => return invalid("LD", src.span()),
        }
    }

    // Index-half destination.
    if let Operand::Register(name, _) = dst {
        if let Some((prefix, half)) = index_half(name) {
            match src {
                Operand::Register(src_name, _) => {
                    if let Some(s) = reg8_code(src_name) {
                        if s >= 4 && s != 7 {
                            return invalid("LD", span);
                        }
                        return EncodeResult::ok(vec![prefix, 0x40 | (half << 3) | s]);
                    }
                    if let Some((src_prefix, src_half)) = index_half(src_name) {
                        if src_prefix != prefix {
                            return invalid("LD", span);
                        }
                        return EncodeResult::ok(vec![prefix, 0x40 | (half << 3) | src_half]);
                    }
                    return invalid("LD", span);
                }
                Operand::Imm(expr, imm_span) => {
                    let value = match byte_operand(expr, ctx) {
                        Ok(v) => v,
                        Err(msg) => return fail(msg, *imm_span),
                    };
                    return EncodeResult::ok(vec![prefix, 0x06 | (half << 3), value]);
                }
                _ => return invalid("LD", src.span()),
            }
        }
    }

    // 16-bit destination.
    if let Operand::Register(dst_name, _) = dst {
        let dst_pair = pair_code(dst_name);
        let dst_index = index_prefix(dst_name);
        if dst_pair.is_some() || dst_index.is_some() {
            match src {
                Operand::Imm(expr, _) => {
                    if let Some(prefix) = dst_index {
                        out.bytes.push(prefix);
                        out.bytes.push(0x21);
                    } else {
                        out.bytes.push(0x01 | (dst_pair.unwrap() << 4));
                    }
                    if let Err(msg) = push_word(&mut out, expr, ctx) {
                        return fail(msg, src.span());
                    }
                    return EncodeResult::Ok(out);
                }
                Operand::IndirectImm(expr, _) => {
                    match dst_name.as_str() {
                        "HL" => out.bytes.push(0x2A),
                        "IX" | "IY" => {
                            out.bytes.push(dst_index.unwrap());
                            out.bytes.push(0x2A);
                        }
                        "BC" => out.bytes.extend_from_slice(&[0xED, 0x4B]),
                        "DE" => out.bytes.extend_from_slice(&[0xED, 0x5B]),
                        "SP" => out.bytes.extend_from_slice(&[0xED, 0x7B]),
                        _ => return invalid("LD", span),
                    }
                    if let Err(msg) = push_word(&mut out, expr, ctx) {
                        return fail(msg, src.span());
                    }
                    return EncodeResult::Ok(out);
                }
                Operand::Register(src_name, _) => {
                    if dst_name == "SP" {
                        match src_name.as_str() {
                            "HL" => return EncodeResult::ok(vec![0xF9]),
                            "IX" => return EncodeResult::ok(vec![0xDD, 0xF9]),
                            "IY" => return EncodeResult::ok(vec![0xFD, 0xF9]),
                            _ => {}
                        }
                    }
                    // Pseudo-op: LD rr,rr' splits into two 8-bit moves. The
                    // flags half of AF is not addressable, so AF is out.
                    if let (Some((dh, dl)), Some((sh, sl))) =
                        (pair_halves(dst_name), pair_halves(src_name))
                    {
                        return EncodeResult::ok(vec![
                            0x40 | (dh << 3) | sh,
                            0x40 | (dl << 3) | sl,
                        ]);
                    }
                    return invalid("LD", span);
                }
                _ => return invalid("LD", src.span()),
            }
        }
    }

    // Memory destinations. `(HL)` went through the register-field path
    // above as code 6, so only indexed and absolute forms remain.
    match dst {
        Operand::Indexed {
            base,
            negate,
            disp,
            span: idx_span,
        } => {
            let prefix = match index_prefix(base) {
                Some(p) => p,
                None => return invalid("LD", *idx_span),
            };
            let disp = match index_disp(*negate, disp, ctx) {
                Ok(d) => d,
                Err(msg) => return fail(msg, *idx_span),
            };
            match src {
                Operand::Register(name, _) if reg8_code(name).map_or(false, |c| c != 6) => {
                    let s = reg8_code(name).unwrap();
                    EncodeResult::ok(vec![prefix, 0x70 | s, disp])
                }
                Operand::Imm(expr, imm_span) => {
                    let value = match byte_operand(expr, ctx) {
                        Ok(v) => v,
                        Err(msg) => return fail(msg, *imm_span),
                    };
                    EncodeResult::ok(vec![prefix, 0x36, disp, value])
                }
                _ => invalid("LD", src.span()),
            }
        }
        Operand::IndirectImm(expr, _) => {
            match src {
                Operand::Register(name, _) => match name.as_str() {
                    "A" => out.bytes.push(0x32),
                    "HL" => out.bytes.push(0x22),
                    "IX" => out.bytes.extend_from_slice(&[0xDD, 0x22]),
                    "IY" => out.bytes.extend_from_slice(&[0xFD, 0x22]),
                    "BC" => out.bytes.extend_from_slice(&[0xED, 0x43]),
                    "DE" => out.bytes.extend_from_slice(&[0xED, 0x53]),
                    "SP" => out.bytes.extend_from_slice(&[0xED, 0x73]),
                    _ => return invalid("LD", src.span()),
                },
                _ => return invalid("LD", src.span()),
            }
            if let Err(msg) = push_word(&mut out, expr, ctx) {
                return fail(msg, dst.span());
            }
            EncodeResult::Ok(out)
        }
        _ => invalid("LD", span),
    }
}

/// High/low 8-bit field codes of a plain register pair.
fn pair_halves(name: &str) -> Option<(u8, u8)> {
    match name {
        "BC" => Some((0, 1)),
        "DE" => Some((2, 3)),
        "HL" => Some((4, 5)),
        _ => None,
    }
}

// ---------------------------------------------------------------- stack

fn encode_push_pop(operands: &[Operand], base: u8, index_op: u8) -> EncodeResult {
    let op = match operands {
        [op] => op,
        _ => return fail("PUSH/POP require one operand".to_string(), Span::default()),
    };
    if let Operand::Register(name, span) = op {
        if let Some(code) = push_pair_code(name) {
            return EncodeResult::ok(vec![base | (code << 4)]);
        }
        if let Some(prefix) = index_prefix(name) {
            return EncodeResult::ok(vec![prefix, index_op]);
        }
        return fail(format!("Invalid register pair: {name}"), *span);
    }
    fail("Invalid register pair".to_string(), op.span())
}

// ---------------------------------------------------------------- ALU

fn encode_alu(
    mnemonic: &str,
    operands: &[Operand],
    ctx: &dyn AssemblerContext,
) -> EncodeResult {
    let base = alu_base(mnemonic).expect("alu mnemonic");

    // 16-bit forms: ADD HL,rr; ADC/SBC HL,rr; ADD IX/IY,rr.
    if let [Operand::Register(dst, span), src] = operands {
        if dst == "HL" || index_prefix(dst).is_some() {
            if let Operand::Register(src_name, _) = src {
                if let Some(code) = alu16_pair_code(dst, src_name) {
                    match (mnemonic, dst.as_str()) {
                        ("ADD", "HL") => {
                            return EncodeResult::ok(vec![0x09 | (code << 4)]);
                        }
                        ("ADD", _) => {
                            return EncodeResult::ok(vec![
                                index_prefix(dst).unwrap(),
                                0x09 | (code << 4),
                            ]);
                        }
                        ("ADC", "HL") => {
                            return EncodeResult::ok(vec![0xED, 0x4A | (code << 4)]);
                        }
                        ("SBC", "HL") => {
                            return EncodeResult::ok(vec![0xED, 0x42 | (code << 4)]);
                        }
                        _ => return invalid(mnemonic, *span),
                    }
                }
                // A pair on both sides with no valid combination.
                if pair_code(src_name).is_some() || index_prefix(src_name).is_some() {
                    return invalid(mnemonic, *span);
                }
            }
        }
    }

    // 8-bit forms; `OP A,x` and the 8080-style single-operand `OP x` are
    // the same instruction.
    let x = match operands {
        [x] => x,
        [a, x] if a.is_register("A") => x,
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            return invalid(mnemonic, span);
        }
    };

    if let Some(code) = operand_reg8(x) {
        return EncodeResult::ok(vec![base | code]);
    }
    if let Operand::Register(name, _) = x {
        if let Some((prefix, half)) = index_half(name) {
            return EncodeResult::ok(vec![prefix, base | half]);
        }
    }
    if let Operand::Indexed {
        base: idx,
        negate,
        disp,
        span,
    } = x
    {
        let prefix = match index_prefix(idx) {
            Some(p) => p,
            None => return invalid(mnemonic, *span),
        };
        let disp = match index_disp(*negate, disp, ctx) {
            Ok(d) => d,
            Err(msg) => return fail(msg, *span),
        };
        return EncodeResult::ok(vec![prefix, base | 6, disp]);
    }
    if let Operand::Imm(expr, span) = x {
        let value = match byte_operand(expr, ctx) {
            Ok(v) => v,
            Err(msg) => return fail(msg, *span),
        };
        return EncodeResult::ok(vec![base | 0x46, value]);
    }
    invalid(mnemonic, x.span())
}

/// Pair field for 16-bit ALU forms. For IX/IY the HL slot means the index
/// register itself; mixing IX with IY or HL is invalid.
fn alu16_pair_code(dst: &str, src: &str) -> Option<u8> {
    match src {
        "BC" => Some(0),
        "DE" => Some(1),
        "SP" => Some(3),
        "HL" if dst == "HL" => Some(2),
        "IX" if dst == "IX" => Some(2),
        "IY" if dst == "IY" => Some(2),
        _ => None,
    }
}

// ---------------------------------------------------------------- INC/DEC

fn encode_inc_dec(
    operands: &[Operand],
    ctx: &dyn AssemblerContext,
    reg_base: u8,
    pair_base: u8,
    mem_op: u8,
) -> EncodeResult {
    let op = match operands {
        [op] => op,
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            return fail("INC/DEC require one operand".to_string(), span);
        }
    };
    if let Some(code) = operand_reg8(op) {
        return EncodeResult::ok(vec![reg_base | (code << 3)]);
    }
    if let Operand::Register(name, span) = op {
        if let Some(code) = pair_code(name) {
            return EncodeResult::ok(vec![pair_base | (code << 4)]);
        }
        if let Some(prefix) = index_prefix(name) {
            return EncodeResult::ok(vec![prefix, pair_base | (2 << 4)]);
        }
        if let Some((prefix, half)) = index_half(name) {
            return EncodeResult::ok(vec![prefix, reg_base | (half << 3)]);
        }
        return fail(format!("Invalid register: {name}"), *span);
    }
    if let Operand::Indexed {
        base,
        negate,
        disp,
        span,
    } = op
    {
        let prefix = match index_prefix(base) {
            Some(p) => p,
            None => return fail(format!("Invalid index register: {base}"), *span),
        };
        let disp = match index_disp(*negate, disp, ctx) {
            Ok(d) => d,
            Err(msg) => return fail(msg, *span),
        };
        return EncodeResult::ok(vec![prefix, mem_op, disp]);
    }
    fail("Invalid operand for INC/DEC".to_string(), op.span())
}

// ---------------------------------------------------------------- CB group

fn encode_rotate(
    mnemonic: &str,
    operands: &[Operand],
    ctx: &dyn AssemblerContext,
) -> EncodeResult {
    if operands.is_empty() {
        // Operand-less RLC/RRC are the 8080 accumulator rotates.
        return EncodeResult::NotFound;
    }
    let base = rotate_base(mnemonic).expect("rotate mnemonic");
    let op = match operands {
        [op] => op,
        _ => return invalid(mnemonic, operands[0].span()),
    };
    if let Some(code) = operand_reg8(op) {
        return EncodeResult::ok(vec![0xCB, base | code]);
    }
    if let Operand::Indexed {
        base: idx,
        negate,
        disp,
        span,
    } = op
    {
        let prefix = match index_prefix(idx) {
            Some(p) => p,
            None => return invalid(mnemonic, *span),
        };
        let disp = match index_disp(*negate, disp, ctx) {
            Ok(d) => d,
            Err(msg) => return fail(msg, *span),
        };
        return EncodeResult::ok(vec![prefix, 0xCB, disp, base | 6]);
    }
    invalid(mnemonic, op.span())
}

fn encode_bit_op(
    mnemonic: &str,
    operands: &[Operand],
    ctx: &dyn AssemblerContext,
) -> EncodeResult {
    let base = bit_base(mnemonic).expect("bit mnemonic");
    let [bit_op, target] = match operands {
        [a, b] => [a, b],
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            return fail(format!("{mnemonic} requires a bit number and a target"), span);
        }
    };
    let bit = match bit_op {
        Operand::Imm(expr, span) => match ctx.eval(expr) {
            Ok(v) if (0..=7).contains(&v) => v as u8,
            Ok(v) => return fail(format!("Bit number {v} out of range (0-7)"), *span),
            Err(err) => return fail(err.message(), *span),
        },
        _ => return fail(format!("{mnemonic} requires a bit number"), bit_op.span()),
    };
    if let Some(code) = operand_reg8(target) {
        return EncodeResult::ok(vec![0xCB, base | (bit << 3) | code]);
    }
    if let Operand::Indexed {
        base: idx,
        negate,
        disp,
        span,
    } = target
    {
        let prefix = match index_prefix(idx) {
            Some(p) => p,
            None => return invalid(mnemonic, *span),
        };
        let disp = match index_disp(*negate, disp, ctx) {
            Ok(d) => d,
            Err(msg) => return fail(msg, *span),
        };
        return EncodeResult::ok(vec![prefix, 0xCB, disp, base | (bit << 3) | 6]);
    }
    invalid(mnemonic, target.span())
}

// ---------------------------------------------------------------- branches

fn encode_jp(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::IndirectReg(name, span)] => match name.as_str() {
            "HL" => EncodeResult::ok(vec![0xE9]),
            "IX" => EncodeResult::ok(vec![0xDD, 0xE9]),
            "IY" => EncodeResult::ok(vec![0xFD, 0xE9]),
            _ => fail(format!("Invalid jump target: ({name})"), *span),
        },
        [Operand::Imm(expr, span)] => {
            let mut out = Encoded::default();
            out.bytes.push(0xC3);
            if let Err(msg) = push_word(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        [Operand::Register(cond, span), Operand::Imm(expr, _)] => {
            let code = match cond_code(cond) {
                Some(code) => code,
                None => return fail(format!("Invalid condition code: {cond}"), *span),
            };
            let mut out = Encoded::default();
            out.bytes.push(0xC2 | (code << 3));
            if let Err(msg) = push_word(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("JP", span)
        }
    }
}

fn encode_jr(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Imm(expr, span)] => {
            let mut out = Encoded::default();
            out.bytes.push(0x18);
            if let Err(msg) = push_relative(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        [Operand::Register(cond, span), Operand::Imm(expr, _)] => {
            // Only NZ, Z, NC, C exist for JR.
            let opcode = match cond.as_str() {
                "NZ" => 0x20,
                "Z" => 0x28,
                "NC" => 0x30,
                "C" => 0x38,
                _ => {
                    return fail(format!("Invalid condition code for JR: {cond}"), *span);
                }
            };
            let mut out = Encoded::default();
            out.bytes.push(opcode);
            if let Err(msg) = push_relative(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("JR", span)
        }
    }
}

fn encode_djnz(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Imm(expr, span)] => {
            let mut out = Encoded::default();
            out.bytes.push(0x10);
            if let Err(msg) = push_relative(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("DJNZ", span)
        }
    }
}

fn encode_call(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Imm(expr, span)] => {
            let mut out = Encoded::default();
            out.bytes.push(0xCD);
            if let Err(msg) = push_word(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        [Operand::Register(cond, span), Operand::Imm(expr, _)] => {
            let code = match cond_code(cond) {
                Some(code) => code,
                None => return fail(format!("Invalid condition code: {cond}"), *span),
            };
            let mut out = Encoded::default();
            out.bytes.push(0xC4 | (code << 3));
            if let Err(msg) = push_word(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("CALL", span)
        }
    }
}

fn encode_ret(operands: &[Operand]) -> EncodeResult {
    match operands {
        [Operand::Register(cond, span)] => match cond_code(cond) {
            Some(code) => EncodeResult::ok(vec![0xC0 | (code << 3)]),
            None => fail(format!("Invalid condition code: {cond}"), *span),
        },
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("RET", span)
        }
    }
}

fn encode_rst(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Imm(expr, span)] => match ctx.eval(expr) {
            Ok(v) => EncodeResult::ok(vec![0xC7 | ((v as u8) & 0x38)]),
            Err(err) => fail(err.message(), *span),
        },
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("RST", span)
        }
    }
}

fn encode_im(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Imm(expr, span)] => {
            let mode = match ctx.eval(expr) {
                Ok(v) => v,
                Err(err) => return fail(err.message(), *span),
            };
            let opcode = match mode {
                0 => 0x46,
                1 => 0x56,
                2 => 0x5E,
                _ => {
                    return fail(
                        format!("Invalid interrupt mode {mode}, expected 0, 1, or 2"),
                        *span,
                    )
                }
            };
            EncodeResult::ok(vec![0xED, opcode])
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("IM", span)
        }
    }
}

// ---------------------------------------------------------------- I/O

fn encode_in(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Register(reg, span), Operand::IndirectImm(expr, _)] => {
            if reg != "A" {
                return fail(format!("IN port form requires A, got {reg}"), *span);
            }
            let value = match byte_operand(expr, ctx) {
                Ok(v) => v,
                Err(msg) => return fail(msg, *span),
            };
            EncodeResult::ok(vec![0xDB, value])
        }
        [Operand::Register(reg, span), Operand::IndirectReg(port, _)] if port == "C" => {
            match reg8_code(reg) {
                Some(code) if code != 6 => EncodeResult::ok(vec![0xED, 0x40 | (code << 3)]),
                _ => fail(format!("Invalid register for IN: {reg}"), *span),
            }
        }
        // Bare `IN n` is the 8080 spelling.
        [Operand::Imm(_, _)] => EncodeResult::NotFound,
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("IN", span)
        }
    }
}

fn encode_out(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::IndirectImm(expr, span), Operand::Register(reg, _)] => {
            if reg != "A" {
                return fail(format!("OUT port form requires A, got {reg}"), *span);
            }
            let value = match byte_operand(expr, ctx) {
                Ok(v) => v,
                Err(msg) => return fail(msg, *span),
            };
            EncodeResult::ok(vec![0xD3, value])
        }
        [Operand::IndirectReg(port, _), Operand::Register(reg, span)] if port == "C" => {
            match reg8_code(reg) {
                Some(code) if code != 6 => EncodeResult::ok(vec![0xED, 0x41 | (code << 3)]),
                _ => fail(format!("Invalid register for OUT: {reg}"), *span),
            }
        }
        [Operand::Imm(_, _)] => EncodeResult::NotFound,
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("OUT", span)
        }
    }
}

// ---------------------------------------------------------------- EX

fn encode_ex(operands: &[Operand]) -> EncodeResult {
    match operands {
        [Operand::Register(a, _), Operand::Register(b, _)] => {
            if a == "DE" && b == "HL" {
                return EncodeResult::ok(vec![0xEB]);
            }
            if a == "AF" && (b == "AF'" || b == "AF") {
                return EncodeResult::ok(vec![0x08]);
            }
            invalid("EX", operands[0].span())
        }
        [Operand::IndirectReg(sp, _), Operand::Register(reg, span)] if sp == "SP" => {
            match reg.as_str() {
                "HL" => EncodeResult::ok(vec![0xE3]),
                "IX" => EncodeResult::ok(vec![0xDD, 0xE3]),
                "IY" => EncodeResult::ok(vec![0xFD, 0xE3]),
                _ => fail(format!("Invalid register for EX (SP): {reg}"), *span),
            }
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            invalid("EX", span)
        }
    }
}
