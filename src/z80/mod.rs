// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Zilog Z80 CPU support module.
//!
//! This module provides the Z80-specific pieces of the assembler:
//! - Register, condition, and mnemonic sets for the tokenizer
//! - Field-code helpers shared by the encoders
//! - The fixed-form opcode table and the per-mnemonic encoder

pub mod encoder;
pub mod operand;
pub mod table;

pub use encoder::encode;
pub use operand::{parse_operand, parse_operands, split_operands, Operand};

/// Check if an identifier is a register, condition code, or other operand
/// keyword. Condition codes live in the register set; the encoders
/// disambiguate by instruction context.
pub fn is_register(name: &str) -> bool {
    matches!(
        name,
        "A" | "B"
            | "C"
            | "D"
            | "E"
            | "H"
            | "L"
            | "M"
            | "I"
            | "R"
            | "BC"
            | "DE"
            | "HL"
            | "SP"
            | "AF"
            | "AF'"
            | "PSW"
            | "IX"
            | "IY"
            | "IXH"
            | "IXL"
            | "IYH"
            | "IYL"
            | "NZ"
            | "Z"
            | "NC"
            | "PO"
            | "PE"
            | "P"
    )
}

/// Check if a name is a Z80 condition code.
pub fn is_condition(name: &str) -> bool {
    cond_code(name).is_some()
}

/// Z80 instruction mnemonics (Zilog names).
pub fn is_z80_mnemonic(name: &str) -> bool {
    matches!(
        name,
        "ADC" | "ADD" | "AND" | "BIT" | "CALL" | "CCF" | "CP" | "CPD" | "CPDR" | "CPI"
            | "CPIR" | "CPL" | "DAA" | "DEC" | "DI" | "DJNZ" | "EI" | "EX" | "EXX" | "HALT"
            | "IM" | "IN" | "INC" | "IND" | "INDR" | "INI" | "INIR" | "JP" | "JR" | "LD"
            | "LDD" | "LDDR" | "LDI" | "LDIR" | "NEG" | "NOP" | "OR" | "OTDR" | "OTIR"
            | "OUT" | "OUTD" | "OUTI" | "POP" | "PUSH" | "RES" | "RET" | "RETI" | "RETN"
            | "RL" | "RLA" | "RLC" | "RLCA" | "RLD" | "RR" | "RRA" | "RRC" | "RRCA" | "RRD"
            | "RST" | "SBC" | "SCF" | "SET" | "SLA" | "SLL" | "SRA" | "SRL" | "SUB" | "XOR"
    )
}

/// 8-bit register field code: B=0, C=1, D=2, E=3, H=4, L=5, (HL)/M=6, A=7.
pub fn reg8_code(name: &str) -> Option<u8> {
    match name {
        "B" => Some(0),
        "C" => Some(1),
        "D" => Some(2),
        "E" => Some(3),
        "H" => Some(4),
        "L" => Some(5),
        "M" => Some(6),
        "A" => Some(7),
        _ => None,
    }
}

/// 16-bit register pair code in most contexts: BC=0, DE=1, HL=2, SP=3.
pub fn pair_code(name: &str) -> Option<u8> {
    match name {
        "BC" => Some(0),
        "DE" => Some(1),
        "HL" => Some(2),
        "SP" => Some(3),
        _ => None,
    }
}

/// Pair code for PUSH/POP, where the fourth slot is AF. The single-letter
/// 8080 pair names and PSW map here too.
pub fn push_pair_code(name: &str) -> Option<u8> {
    match name {
        "BC" | "B" => Some(0),
        "DE" | "D" => Some(1),
        "HL" | "H" => Some(2),
        "AF" | "PSW" => Some(3),
        _ => None,
    }
}

/// Condition code: NZ=0, Z=1, NC=2, C=3, PO=4, PE=5, P=6, M=7.
pub fn cond_code(name: &str) -> Option<u8> {
    match name {
        "NZ" => Some(0),
        "Z" => Some(1),
        "NC" => Some(2),
        "C" => Some(3),
        "PO" => Some(4),
        "PE" => Some(5),
        "P" => Some(6),
        "M" => Some(7),
        _ => None,
    }
}

/// `DD`/`FD` prefix byte for an index register name.
pub fn index_prefix(name: &str) -> Option<u8> {
    match name {
        "IX" => Some(0xDD),
        "IY" => Some(0xFD),
        _ => None,
    }
}

/// Index-register half: prefix byte plus the H/L field code it reuses.
pub fn index_half(name: &str) -> Option<(u8, u8)> {
    match name {
        "IXH" => Some((0xDD, 4)),
        "IXL" => Some((0xDD, 5)),
        "IYH" => Some((0xFD, 4)),
        "IYL" => Some((0xFD, 5)),
        _ => None,
    }
}
