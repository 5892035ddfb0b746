// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Intel 8080 mnemonic compatibility layer.
//!
//! Every 8080 mnemonic maps to the semantically identical Z80 encoding
//! (`MOV D,E` is the same opcode as `LD D,E`; `LXI H,nn` is `LD HL,nn`).
//! Mnemonics the two CPUs share (`ADD`, `PUSH`, `RST`, ...) are encoded by
//! the Z80 encoder, which also accepts the 8080 operand spellings; this
//! module covers the names only 8080 sources use. Where a shared name is
//! ambiguous (`JP`, `CP`), the Z80 reading wins.

use crate::core::context::{AssemblerContext, EncodeResult, Encoded};
use crate::z80::encoder::{byte_operand, push_word};
use crate::z80::operand::Operand;
use crate::z80::reg8_code;

/// Argument type for a table-encoded 8080 instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    /// No operand.
    None,
    /// 8-bit immediate.
    Byte,
    /// 16-bit immediate or address.
    Word,
}

/// A fixed-opcode 8080 instruction.
pub struct Intel8080Entry {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub arg: ArgType,
}

/// 8080 mnemonics whose encoding is a single opcode plus an optional
/// immediate. Register-field instructions (MOV, MVI, INR, ...) are composed
/// in [`encode`].
pub static INTEL8080_TABLE: &[Intel8080Entry] = &[
    // Implicit
    Intel8080Entry { mnemonic: "RLC", opcode: 0x07, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RRC", opcode: 0x0F, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RAL", opcode: 0x17, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RAR", opcode: 0x1F, arg: ArgType::None },
    Intel8080Entry { mnemonic: "CMA", opcode: 0x2F, arg: ArgType::None },
    Intel8080Entry { mnemonic: "STC", opcode: 0x37, arg: ArgType::None },
    Intel8080Entry { mnemonic: "CMC", opcode: 0x3F, arg: ArgType::None },
    Intel8080Entry { mnemonic: "HLT", opcode: 0x76, arg: ArgType::None },
    Intel8080Entry { mnemonic: "XCHG", opcode: 0xEB, arg: ArgType::None },
    Intel8080Entry { mnemonic: "XTHL", opcode: 0xE3, arg: ArgType::None },
    Intel8080Entry { mnemonic: "SPHL", opcode: 0xF9, arg: ArgType::None },
    Intel8080Entry { mnemonic: "PCHL", opcode: 0xE9, arg: ArgType::None },
    // Conditional returns
    Intel8080Entry { mnemonic: "RNZ", opcode: 0xC0, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RZ", opcode: 0xC8, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RNC", opcode: 0xD0, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RC", opcode: 0xD8, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RPO", opcode: 0xE0, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RPE", opcode: 0xE8, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RP", opcode: 0xF0, arg: ArgType::None },
    Intel8080Entry { mnemonic: "RM", opcode: 0xF8, arg: ArgType::None },
    // Immediate ALU
    Intel8080Entry { mnemonic: "ADI", opcode: 0xC6, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "ACI", opcode: 0xCE, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "SUI", opcode: 0xD6, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "SBI", opcode: 0xDE, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "ANI", opcode: 0xE6, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "XRI", opcode: 0xEE, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "ORI", opcode: 0xF6, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "CPI", opcode: 0xFE, arg: ArgType::Byte },
    // I/O
    Intel8080Entry { mnemonic: "IN", opcode: 0xDB, arg: ArgType::Byte },
    Intel8080Entry { mnemonic: "OUT", opcode: 0xD3, arg: ArgType::Byte },
    // Loads and stores
    Intel8080Entry { mnemonic: "LDA", opcode: 0x3A, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "STA", opcode: 0x32, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "LHLD", opcode: 0x2A, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "SHLD", opcode: 0x22, arg: ArgType::Word },
    // Jumps; JP stays the Z80 unconditional jump, 8080 sources use JM/JPO/JPE
    Intel8080Entry { mnemonic: "JMP", opcode: 0xC3, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JNZ", opcode: 0xC2, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JZ", opcode: 0xCA, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JNC", opcode: 0xD2, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JC", opcode: 0xDA, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JPO", opcode: 0xE2, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JPE", opcode: 0xEA, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "JM", opcode: 0xFA, arg: ArgType::Word },
    // Conditional calls; CP stays the Z80 compare
    Intel8080Entry { mnemonic: "CNZ", opcode: 0xC4, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "CZ", opcode: 0xCC, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "CNC", opcode: 0xD4, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "CC", opcode: 0xDC, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "CPO", opcode: 0xE4, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "CPE", opcode: 0xEC, arg: ArgType::Word },
    Intel8080Entry { mnemonic: "CM", opcode: 0xFC, arg: ArgType::Word },
];

/// Check if a name is an 8080-only mnemonic.
pub fn is_8080_mnemonic(name: &str) -> bool {
    matches!(
        name,
        "MOV" | "MVI" | "LXI" | "LDA" | "STA" | "LHLD" | "SHLD" | "LDAX" | "STAX" | "XCHG"
            | "XTHL" | "SPHL" | "PCHL" | "ADI" | "ACI" | "SUI" | "SBI" | "ANI" | "XRI"
            | "ORI" | "INR" | "DCR" | "INX" | "DCX" | "DAD" | "SBB" | "ANA" | "XRA" | "ORA"
            | "CMP" | "RAL" | "RAR" | "CMA" | "STC" | "CMC" | "HLT" | "JMP" | "JNZ" | "JZ"
            | "JNC" | "JC" | "JPO" | "JPE" | "JM" | "CNZ" | "CZ" | "CNC" | "CC" | "CPO"
            | "CPE" | "CM" | "RNZ" | "RZ" | "RNC" | "RC" | "RPO" | "RPE" | "RP" | "RM"
    )
}

/// Single-letter 8080 pair names: B=BC, D=DE, H=HL; full names accepted too.
fn pair_letter_code(name: &str) -> Option<u8> {
    match name {
        "B" | "BC" => Some(0),
        "D" | "DE" => Some(1),
        "H" | "HL" => Some(2),
        "SP" => Some(3),
        _ => None,
    }
}

fn reg_operand(op: &Operand) -> Option<u8> {
    match op {
        Operand::Register(name, _) => reg8_code(name),
        _ => None,
    }
}

fn fail(message: String, span: crate::core::tokenizer::Span) -> EncodeResult {
    EncodeResult::error_with_span(message, span)
}

/// Encode an 8080-mnemonic instruction; `NotFound` for anything else.
pub fn encode(mnemonic: &str, operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match mnemonic {
        "MOV" => encode_mov(operands),
        "MVI" => encode_mvi(operands, ctx),
        "INR" => encode_inr_dcr(operands, 0x04),
        "DCR" => encode_inr_dcr(operands, 0x05),
        "SBB" => encode_alu_reg(mnemonic, operands, 0x98),
        "ANA" => encode_alu_reg(mnemonic, operands, 0xA0),
        "XRA" => encode_alu_reg(mnemonic, operands, 0xA8),
        "ORA" => encode_alu_reg(mnemonic, operands, 0xB0),
        "CMP" => encode_alu_reg(mnemonic, operands, 0xB8),
        "LXI" => encode_lxi(operands, ctx),
        "LDAX" => encode_ldax_stax(mnemonic, operands, 0x0A, 0x1A),
        "STAX" => encode_ldax_stax(mnemonic, operands, 0x02, 0x12),
        "INX" => encode_pair_op(mnemonic, operands, 0x03),
        "DCX" => encode_pair_op(mnemonic, operands, 0x0B),
        "DAD" => encode_pair_op(mnemonic, operands, 0x09),
        _ => encode_from_table(mnemonic, operands, ctx),
    }
}

fn encode_from_table(
    mnemonic: &str,
    operands: &[Operand],
    ctx: &dyn AssemblerContext,
) -> EncodeResult {
    let entry = match INTEL8080_TABLE.iter().find(|e| e.mnemonic == mnemonic) {
        Some(entry) => entry,
        None => return EncodeResult::NotFound,
    };
    match entry.arg {
        ArgType::None => {
            if !operands.is_empty() {
                return fail(
                    format!("{mnemonic} takes no operands"),
                    operands[0].span(),
                );
            }
            EncodeResult::ok(vec![entry.opcode])
        }
        ArgType::Byte => match operands {
            [Operand::Imm(expr, span)] => match byte_operand(expr, ctx) {
                Ok(value) => EncodeResult::ok(vec![entry.opcode, value]),
                Err(msg) => fail(msg, *span),
            },
            _ => {
                let span = operands.first().map(|op| op.span()).unwrap_or_default();
                fail(format!("{mnemonic} requires an immediate operand"), span)
            }
        },
        ArgType::Word => match operands {
            [Operand::Imm(expr, span)] => {
                let mut out = Encoded::default();
                out.bytes.push(entry.opcode);
                if let Err(msg) = push_word(&mut out, expr, ctx) {
                    return fail(msg, *span);
                }
                EncodeResult::Ok(out)
            }
            _ => {
                let span = operands.first().map(|op| op.span()).unwrap_or_default();
                fail(format!("{mnemonic} requires an address operand"), span)
            }
        },
    }
}

fn encode_mov(operands: &[Operand]) -> EncodeResult {
    let [dst, src] = match operands {
        [dst, src] => [dst, src],
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            return fail("MOV requires two registers".to_string(), span);
        }
    };
    let (d, s) = match (reg_operand(dst), reg_operand(src)) {
        (Some(d), Some(s)) => (d, s),
        _ => return fail("MOV requires two registers".to_string(), dst.span()),
    };
    if d == 6 && s == 6 {
        return fail("Invalid operand combination for MOV".to_string(), dst.span());
    }
    EncodeResult::ok(vec![0x40 | (d << 3) | s])
}

fn encode_mvi(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [reg, Operand::Imm(expr, span)] => {
            let code = match reg_operand(reg) {
                Some(code) => code,
                None => return fail("MVI requires a register".to_string(), reg.span()),
            };
            match byte_operand(expr, ctx) {
                Ok(value) => EncodeResult::ok(vec![0x06 | (code << 3), value]),
                Err(msg) => fail(msg, *span),
            }
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            fail("MVI requires a register and an immediate".to_string(), span)
        }
    }
}

fn encode_inr_dcr(operands: &[Operand], base: u8) -> EncodeResult {
    match operands {
        [reg] => match reg_operand(reg) {
            Some(code) => EncodeResult::ok(vec![base | (code << 3)]),
            None => fail("INR/DCR require a register".to_string(), reg.span()),
        },
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            fail("INR/DCR require a register".to_string(), span)
        }
    }
}

fn encode_alu_reg(mnemonic: &str, operands: &[Operand], base: u8) -> EncodeResult {
    match operands {
        [reg] => match reg_operand(reg) {
            Some(code) => EncodeResult::ok(vec![base | code]),
            None => fail(format!("{mnemonic} requires a register"), reg.span()),
        },
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            fail(format!("{mnemonic} requires a register"), span)
        }
    }
}

fn encode_lxi(operands: &[Operand], ctx: &dyn AssemblerContext) -> EncodeResult {
    match operands {
        [Operand::Register(pair, pair_span), Operand::Imm(expr, span)] => {
            let code = match pair_letter_code(pair) {
                Some(code) => code,
                None => {
                    return fail(format!("Invalid register pair for LXI: {pair}"), *pair_span)
                }
            };
            let mut out = Encoded::default();
            out.bytes.push(0x01 | (code << 4));
            if let Err(msg) = push_word(&mut out, expr, ctx) {
                return fail(msg, *span);
            }
            EncodeResult::Ok(out)
        }
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            fail("LXI requires a register pair and a value".to_string(), span)
        }
    }
}

fn encode_ldax_stax(
    mnemonic: &str,
    operands: &[Operand],
    bc_op: u8,
    de_op: u8,
) -> EncodeResult {
    match operands {
        [Operand::Register(pair, span)] => match pair.as_str() {
            "B" | "BC" => EncodeResult::ok(vec![bc_op]),
            "D" | "DE" => EncodeResult::ok(vec![de_op]),
            _ => fail(
                format!("Invalid register pair for {mnemonic}: {pair}"),
                *span,
            ),
        },
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            fail(format!("{mnemonic} requires B or D"), span)
        }
    }
}

fn encode_pair_op(mnemonic: &str, operands: &[Operand], base: u8) -> EncodeResult {
    match operands {
        [Operand::Register(pair, span)] => match pair_letter_code(pair) {
            Some(code) => EncodeResult::ok(vec![base | (code << 4)]),
            None => fail(
                format!("Invalid register pair for {mnemonic}: {pair}"),
                *span,
            ),
        },
        _ => {
            let span = operands.first().map(|op| op.span()).unwrap_or_default();
            fail(format!("{mnemonic} requires a register pair"), span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{encode, is_8080_mnemonic};
    use crate::core::context::{AssemblerContext, EncodeResult};
    use crate::core::expr::{eval_expr, Expr, ExprError};
    use crate::core::symbol_table::SymbolTable;
    use crate::core::tokenizer::{checker_from_fn, TokenKind, Tokenizer};
    use crate::z80::parse_operands;

    struct TestCtx {
        symbols: SymbolTable,
    }

    impl AssemblerContext for TestCtx {
        fn eval(&self, expr: &Expr) -> Result<i64, ExprError> {
            struct Ctx<'a>(&'a SymbolTable);
            impl crate::core::expr::EvalContext for Ctx<'_> {
                fn lookup_symbol(&self, name: &str) -> Option<i64> {
                    self.0.lookup(name).map(i64::from)
                }
                fn current_address(&self) -> i64 {
                    0
                }
            }
            eval_expr(expr, &Ctx(&self.symbols))
        }

        fn symbols(&self) -> &SymbolTable {
            &self.symbols
        }

        fn current_address(&self) -> u16 {
            0
        }

        fn pass(&self) -> u8 {
            2
        }
    }

    fn is_mnemonic(name: &str) -> bool {
        crate::z80::is_z80_mnemonic(name) || is_8080_mnemonic(name)
    }

    fn asm(line: &str) -> Vec<u8> {
        let ctx = TestCtx {
            symbols: SymbolTable::new(),
        };
        let tokens = Tokenizer::with_checkers(
            line,
            checker_from_fn(is_mnemonic),
            checker_from_fn(crate::z80::is_register),
        )
        .tokenize();
        let end = tokens
            .iter()
            .position(|t| t.kind == TokenKind::NewLine)
            .unwrap();
        let mnemonic = tokens[0].as_mnemonic().expect("mnemonic").to_string();
        let operands = parse_operands(&tokens[1..end]).expect("operands");
        match encode(&mnemonic, &operands, &ctx) {
            EncodeResult::Ok(encoded) => encoded.bytes,
            other => panic!("encode failed for '{line}': {other:?}"),
        }
    }

    #[test]
    fn mov_matches_ld_encoding() {
        assert_eq!(asm("MOV D,E"), [0x53]);
        assert_eq!(asm("MOV A,M"), [0x7E]);
        assert_eq!(asm("MOV M,B"), [0x70]);
    }

    #[test]
    fn mvi_and_immediate_alu() {
        assert_eq!(asm("MVI C,9"), [0x0E, 0x09]);
        assert_eq!(asm("MVI M,0"), [0x36, 0x00]);
        assert_eq!(asm("ADI 41h"), [0xC6, 0x41]);
        assert_eq!(asm("CPI 0Dh"), [0xFE, 0x0D]);
        assert_eq!(asm("ANI 7Fh"), [0xE6, 0x7F]);
    }

    #[test]
    fn lxi_uses_pair_letters() {
        assert_eq!(asm("LXI H,1234h"), [0x21, 0x34, 0x12]);
        assert_eq!(asm("LXI B,5"), [0x01, 0x05, 0x00]);
        assert_eq!(asm("LXI SP,0FFFEh"), [0x31, 0xFE, 0xFF]);
    }

    #[test]
    fn loads_stores_and_pairs() {
        assert_eq!(asm("LDA 1234h"), [0x3A, 0x34, 0x12]);
        assert_eq!(asm("SHLD 1234h"), [0x22, 0x34, 0x12]);
        assert_eq!(asm("LDAX B"), [0x0A]);
        assert_eq!(asm("STAX D"), [0x12]);
        assert_eq!(asm("INX H"), [0x23]);
        assert_eq!(asm("DCX SP"), [0x3B]);
        assert_eq!(asm("DAD B"), [0x09]);
    }

    #[test]
    fn register_alu_group() {
        assert_eq!(asm("INR A"), [0x3C]);
        assert_eq!(asm("DCR B"), [0x05]);
        assert_eq!(asm("SBB C"), [0x99]);
        assert_eq!(asm("ANA M"), [0xA6]);
        assert_eq!(asm("XRA A"), [0xAF]);
        assert_eq!(asm("CMP H"), [0xBC]);
    }

    #[test]
    fn jumps_calls_returns() {
        assert_eq!(asm("JMP 1234h"), [0xC3, 0x34, 0x12]);
        assert_eq!(asm("JC 1234h"), [0xDA, 0x34, 0x12]);
        assert_eq!(asm("JM 1234h"), [0xFA, 0x34, 0x12]);
        assert_eq!(asm("CNZ 1234h"), [0xC4, 0x34, 0x12]);
        assert_eq!(asm("RNZ"), [0xC0]);
        assert_eq!(asm("RM"), [0xF8]);
        assert_eq!(asm("PCHL"), [0xE9]);
        assert_eq!(asm("XCHG"), [0xEB]);
    }

    #[test]
    fn accumulator_rotates() {
        assert_eq!(asm("RLC"), [0x07]);
        assert_eq!(asm("RRC"), [0x0F]);
        assert_eq!(asm("RAL"), [0x17]);
        assert_eq!(asm("RAR"), [0x1F]);
    }

    #[test]
    fn io_forms() {
        assert_eq!(asm("IN 5"), [0xDB, 0x05]);
        assert_eq!(asm("OUT 10h"), [0xD3, 0x10]);
    }

    #[test]
    fn ldax_rejects_other_pairs() {
        let ctx = TestCtx {
            symbols: SymbolTable::new(),
        };
        let tokens = Tokenizer::with_checkers(
            "LDAX H",
            checker_from_fn(is_mnemonic),
            checker_from_fn(crate::z80::is_register),
        )
        .tokenize();
        let end = tokens
            .iter()
            .position(|t| t.kind == TokenKind::NewLine)
            .unwrap();
        let operands = parse_operands(&tokens[1..end]).unwrap();
        match encode("LDAX", &operands, &ctx) {
            EncodeResult::Error(msg, _) => {
                assert!(msg.contains("Invalid register pair for LDAX"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn mnemonic_set_is_8080_only() {
        assert!(is_8080_mnemonic("MOV"));
        assert!(is_8080_mnemonic("JMP"));
        assert!(!is_8080_mnemonic("LD"));
        assert!(!is_8080_mnemonic("JP"));
    }
}
