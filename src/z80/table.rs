// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Fixed-form Z80 opcode tables.
//!
//! Instructions with register or immediate fields are composed in the
//! encoder; everything whose encoding is a constant lives here.

/// Opcode prefix selecting the Z80 extension tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    None,
    Ed,
}

/// A fixed-encoding instruction: no operands, constant bytes.
pub struct InstructionEntry {
    pub mnemonic: &'static str,
    pub prefix: Prefix,
    pub opcode: u8,
}

/// Implicit single-byte instructions plus the ED-prefixed extended and
/// block operations. All take no operands.
pub static FIXED_TABLE: &[InstructionEntry] = &[
    // Implicit single-byte
    InstructionEntry { mnemonic: "NOP", prefix: Prefix::None, opcode: 0x00 },
    InstructionEntry { mnemonic: "RLCA", prefix: Prefix::None, opcode: 0x07 },
    InstructionEntry { mnemonic: "RRCA", prefix: Prefix::None, opcode: 0x0F },
    InstructionEntry { mnemonic: "RLA", prefix: Prefix::None, opcode: 0x17 },
    InstructionEntry { mnemonic: "RRA", prefix: Prefix::None, opcode: 0x1F },
    InstructionEntry { mnemonic: "DAA", prefix: Prefix::None, opcode: 0x27 },
    InstructionEntry { mnemonic: "CPL", prefix: Prefix::None, opcode: 0x2F },
    InstructionEntry { mnemonic: "SCF", prefix: Prefix::None, opcode: 0x37 },
    InstructionEntry { mnemonic: "CCF", prefix: Prefix::None, opcode: 0x3F },
    InstructionEntry { mnemonic: "HALT", prefix: Prefix::None, opcode: 0x76 },
    InstructionEntry { mnemonic: "EXX", prefix: Prefix::None, opcode: 0xD9 },
    InstructionEntry { mnemonic: "DI", prefix: Prefix::None, opcode: 0xF3 },
    InstructionEntry { mnemonic: "EI", prefix: Prefix::None, opcode: 0xFB },
    // Extended singles
    InstructionEntry { mnemonic: "NEG", prefix: Prefix::Ed, opcode: 0x44 },
    InstructionEntry { mnemonic: "RETN", prefix: Prefix::Ed, opcode: 0x45 },
    InstructionEntry { mnemonic: "RETI", prefix: Prefix::Ed, opcode: 0x4D },
    InstructionEntry { mnemonic: "RRD", prefix: Prefix::Ed, opcode: 0x67 },
    InstructionEntry { mnemonic: "RLD", prefix: Prefix::Ed, opcode: 0x6F },
    // Block transfer
    InstructionEntry { mnemonic: "LDI", prefix: Prefix::Ed, opcode: 0xA0 },
    InstructionEntry { mnemonic: "LDD", prefix: Prefix::Ed, opcode: 0xA8 },
    InstructionEntry { mnemonic: "LDIR", prefix: Prefix::Ed, opcode: 0xB0 },
    InstructionEntry { mnemonic: "LDDR", prefix: Prefix::Ed, opcode: 0xB8 },
    // Block compare; CPI with an operand is the 8080 compare-immediate
    InstructionEntry { mnemonic: "CPI", prefix: Prefix::Ed, opcode: 0xA1 },
    InstructionEntry { mnemonic: "CPD", prefix: Prefix::Ed, opcode: 0xA9 },
    InstructionEntry { mnemonic: "CPIR", prefix: Prefix::Ed, opcode: 0xB1 },
    InstructionEntry { mnemonic: "CPDR", prefix: Prefix::Ed, opcode: 0xB9 },
    // Block I/O
    InstructionEntry { mnemonic: "INI", prefix: Prefix::Ed, opcode: 0xA2 },
    InstructionEntry { mnemonic: "IND", prefix: Prefix::Ed, opcode: 0xAA },
    InstructionEntry { mnemonic: "INIR", prefix: Prefix::Ed, opcode: 0xB2 },
    InstructionEntry { mnemonic: "INDR", prefix: Prefix::Ed, opcode: 0xBA },
    InstructionEntry { mnemonic: "OUTI", prefix: Prefix::Ed, opcode: 0xA3 },
    InstructionEntry { mnemonic: "OUTD", prefix: Prefix::Ed, opcode: 0xAB },
    InstructionEntry { mnemonic: "OTIR", prefix: Prefix::Ed, opcode: 0xB3 },
    InstructionEntry { mnemonic: "OTDR", prefix: Prefix::Ed, opcode: 0xBB },
];

/// Look up a fixed-form instruction; only valid for operand-less lines.
pub fn lookup_fixed(mnemonic: &str) -> Option<&'static InstructionEntry> {
    FIXED_TABLE.iter().find(|entry| entry.mnemonic == mnemonic)
}

/// Byte sequence for a fixed-form entry.
pub fn fixed_bytes(entry: &InstructionEntry) -> Vec<u8> {
    match entry.prefix {
        Prefix::None => vec![entry.opcode],
        Prefix::Ed => vec![0xED, entry.opcode],
    }
}

/// ALU group base opcode for register forms (`ADD A,r` family): the
/// register field is added, the immediate form is `base | 0x46`.
pub fn alu_base(mnemonic: &str) -> Option<u8> {
    match mnemonic {
        "ADD" => Some(0x80),
        "ADC" => Some(0x88),
        "SUB" => Some(0x90),
        "SBC" => Some(0x98),
        "AND" => Some(0xA0),
        "XOR" => Some(0xA8),
        "OR" => Some(0xB0),
        "CP" => Some(0xB8),
        _ => None,
    }
}

/// CB-prefixed rotate/shift group base opcode; the register field is added.
pub fn rotate_base(mnemonic: &str) -> Option<u8> {
    match mnemonic {
        "RLC" => Some(0x00),
        "RRC" => Some(0x08),
        "RL" => Some(0x10),
        "RR" => Some(0x18),
        "SLA" => Some(0x20),
        "SRA" => Some(0x28),
        "SLL" => Some(0x30),
        "SRL" => Some(0x38),
        _ => None,
    }
}

/// CB-prefixed bit-operation group base opcode; `bit<<3 | reg` is added.
pub fn bit_base(mnemonic: &str) -> Option<u8> {
    match mnemonic {
        "BIT" => Some(0x40),
        "RES" => Some(0x80),
        "SET" => Some(0xC0),
        _ => None,
    }
}
