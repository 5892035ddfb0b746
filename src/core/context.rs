// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The contract between the pass driver and the instruction encoders.

use crate::core::expr::{Expr, ExprError};
use crate::core::symbol_table::SymbolTable;
use crate::core::tokenizer::Span;

/// Context provided to encoders for expression evaluation and symbol lookup.
///
/// Encoders need access to generic assembler services without being coupled
/// to the pass driver. The driver implements this once per pass; Pass 1 is
/// lenient about undefined symbols so that sizing never depends on forward
/// references.
pub trait AssemblerContext {
    /// Evaluate an operand expression to a value.
    fn eval(&self, expr: &Expr) -> Result<i64, ExprError>;

    /// Get the symbol table.
    fn symbols(&self) -> &SymbolTable;

    /// Get the address of the instruction being encoded.
    fn current_address(&self) -> u16;

    /// Get the current assembler pass (1 or 2).
    fn pass(&self) -> u8;
}

/// A forward reference recorded while encoding, relative to the start of the
/// instruction's byte slice. The driver rebases it onto the image buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    /// Offset of the operand byte within the emitted slice.
    pub offset: usize,
    /// Referenced symbol.
    pub name: String,
    /// Relative branch displacement rather than a 16-bit absolute.
    pub relative: bool,
}

/// Encoded instruction bytes plus any forward references they contain.
#[derive(Debug, Clone, Default)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub patches: Vec<PatchRequest>,
}

impl Encoded {
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            patches: Vec::new(),
        }
    }
}

/// Result of an encode attempt.
#[derive(Debug, Clone)]
pub enum EncodeResult {
    /// Successfully encoded.
    Ok(Encoded),
    /// Mnemonic not in this encoder's table (try the next layer).
    NotFound,
    /// Encoding failed with an error.
    Error(String, Option<Span>),
}

impl EncodeResult {
    pub fn ok(bytes: Vec<u8>) -> Self {
        EncodeResult::Ok(Encoded::bytes(bytes))
    }

    pub fn error(message: impl Into<String>) -> Self {
        EncodeResult::Error(message.into(), None)
    }

    pub fn error_with_span(message: impl Into<String>, span: Span) -> Self {
        EncodeResult::Error(message.into(), Some(span))
    }
}
