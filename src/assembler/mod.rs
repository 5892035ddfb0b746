// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Z80/8080 assembler - main entry point.
//!
//! This module ties together the CPU-agnostic core with the Z80 encoder and
//! the Intel 8080 compatibility layer. The pipeline is linear: include
//! preprocessing, tokenization, Pass 1 (label binding), Pass 2 (encoding,
//! listing, patch recording), patch resolution, Intel HEX serialization.

pub mod cli;

use std::fs::{self, File};
use std::path::PathBuf;

use clap::Parser;

use crate::core::assembler::error::{AsmError, AsmErrorKind, Diagnostic, Severity};
use crate::core::assembler::listing::{format_listing_line, ListingWriter};
use crate::core::context::{AssemblerContext, EncodeResult, Encoded};
use crate::core::expr::{eval_expr, parse_expr, EvalContext, Expr, ExprError};
use crate::core::imagestore::ImageStore;
use crate::core::preprocess::Preprocessor;
use crate::core::symbol_table::{SymbolTable, SymbolTableResult};
use crate::core::tokenizer::{checker_from_fn, Token, TokenKind, Tokenizer};
use crate::intel8080;
use crate::z80;
use crate::z80::operand::{parse_operands, split_operands, Operand};

use cli::{resolve_output_path, validate_cli, Cli, CliConfig, VERSION};

/// Directives the assembler acts on or deliberately consumes.
pub fn is_directive(name: &str) -> bool {
    matches!(
        name,
        "ORG" | "EQU" | "SET" | "DEFC" | "DB" | "DEFB" | "DEFM" | "DW" | "DEFW" | "DS"
            | "DEFS" | "END" | "INCLUDE" | "IF" | "ELSE" | "ENDIF" | "PUBLIC" | "EXTERN"
            | "GLOBAL" | "MODULE" | "SECTION" | "TITLE" | "PAGE" | "EJECT" | "NAME" | "MACLIB"
    )
}

/// Directives that are tokenized but assemble to nothing.
fn is_skipped_directive(name: &str) -> bool {
    matches!(
        name,
        "INCLUDE" | "IF" | "ELSE" | "ENDIF" | "PUBLIC" | "EXTERN" | "GLOBAL" | "MODULE"
            | "SECTION" | "TITLE" | "PAGE" | "EJECT" | "NAME" | "MACLIB"
    )
}

/// The full mnemonic set for the tokenizer: directives plus both CPU
/// mnemonic vocabularies.
pub fn is_mnemonic_name(name: &str) -> bool {
    is_directive(name) || z80::is_z80_mnemonic(name) || intel8080::is_8080_mnemonic(name)
}

/// Result of one assembly call.
#[derive(Debug, Default)]
pub struct AssemblyResult {
    /// Assembled image in emission order.
    pub bytes: Vec<u8>,
    /// Intel HEX text; populated only when assembly succeeded.
    pub hex: Option<String>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub symbols: SymbolTable,
    pub listing: Vec<String>,
    pub load_address: u16,
}

impl AssemblyResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A forward reference recorded during Pass 2, rebased onto the image.
#[derive(Debug, Clone)]
struct Patch {
    offset: usize,
    name: String,
    line: u32,
    relative: bool,
}

/// The assembler engine. A single instance may be reused across inputs;
/// all state is reset at the top of each [`Assembler::assemble`] call.
pub struct Assembler {
    symbols: SymbolTable,
    image: ImageStore,
    diagnostics: Vec<Diagnostic>,
    patches: Vec<Patch>,
    listing: Vec<String>,
    include_paths: Vec<PathBuf>,
    origin: PathBuf,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            image: ImageStore::new(),
            diagnostics: Vec::new(),
            patches: Vec::new(),
            listing: Vec::new(),
            include_paths: Vec::new(),
            origin: PathBuf::from("source.asm"),
        }
    }

    #[must_use]
    pub fn with_include_paths(include_paths: Vec<PathBuf>) -> Self {
        Self {
            include_paths,
            ..Self::new()
        }
    }

    /// Set the notional path of the next source; include resolution starts
    /// from its directory.
    pub fn set_origin(&mut self, origin: PathBuf) {
        self.origin = origin;
    }

    /// Assemble one source text into binary, HEX, listing, and symbols.
    pub fn assemble(&mut self, source: &str) -> AssemblyResult {
        self.symbols.clear();
        self.image.clear();
        self.diagnostics.clear();
        self.patches.clear();
        self.listing.clear();

        let mut pp = Preprocessor::new(self.include_paths.clone());
        let (expanded, pp_errors) = pp.expand(source, &self.origin);
        for err in &pp_errors {
            self.diagnostics.push(Diagnostic::new(
                err.line().unwrap_or(0),
                Severity::Error,
                AsmError::new(AsmErrorKind::Preprocess, err.message(), None),
            ));
        }

        let tokens = Tokenizer::with_checkers(
            &expanded,
            checker_from_fn(is_mnemonic_name),
            checker_from_fn(z80::is_register),
        )
        .tokenize();
        let source_lines: Vec<&str> = expanded.lines().collect();

        let load_address = self.run_pass(&tokens, &source_lines, 1);
        self.run_pass(&tokens, &source_lines, 2);
        self.resolve_patches();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for diag in self.diagnostics.drain(..) {
            match diag.severity() {
                Severity::Error => errors.push(diag),
                Severity::Warning => warnings.push(diag),
            }
        }
        errors.sort_by_key(Diagnostic::line);

        let hex = if errors.is_empty() {
            Some(self.image.hex_string())
        } else {
            None
        };

        AssemblyResult {
            bytes: self.image.take_bytes(),
            hex,
            errors,
            warnings,
            symbols: self.symbols.clone(),
            listing: std::mem::take(&mut self.listing),
            load_address,
        }
    }

    /// Walk the token stream once; returns the load address.
    fn run_pass(&mut self, tokens: &[Token], source_lines: &[&str], pass: u8) -> u16 {
        let mut walker = PassWalker {
            symbols: &mut self.symbols,
            diagnostics: &mut self.diagnostics,
            image: &mut self.image,
            patches: &mut self.patches,
            listing: &mut self.listing,
            pc: 0,
            load_addr: 0,
            emitted_any: false,
            org_seen: false,
            pass,
        };
        walker.run(tokens, source_lines);
        walker.load_addr
    }

    fn resolve_patches(&mut self) {
        let load = self.image.load_addr();
        for patch in &self.patches {
            let Some(target) = self.symbols.lookup(&patch.name) else {
                self.diagnostics.push(Diagnostic::new(
                    patch.line,
                    Severity::Error,
                    AsmError::new(AsmErrorKind::Symbol, "Undefined label", Some(&patch.name)),
                ));
                continue;
            };
            if patch.relative {
                // The displacement byte sits at `offset`; the branch target
                // is measured from the byte after it.
                let disp_addr = i32::from(load) + patch.offset as i32;
                let rel = i32::from(target) - (disp_addr + 1);
                if !(-128..=127).contains(&rel) {
                    self.diagnostics.push(Diagnostic::new(
                        patch.line,
                        Severity::Error,
                        AsmError::new(
                            AsmErrorKind::Range,
                            &format!("Relative jump to '{}' out of range", patch.name),
                            None,
                        ),
                    ));
                    continue;
                }
                self.image.patch(patch.offset, rel as u8);
            } else {
                self.image.patch(patch.offset, (target & 0xff) as u8);
                self.image.patch(patch.offset + 1, (target >> 8) as u8);
            }
        }
    }
}

/// Per-pass state threading through the token stream.
struct PassWalker<'a> {
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut Vec<Diagnostic>,
    image: &'a mut ImageStore,
    patches: &'a mut Vec<Patch>,
    listing: &'a mut Vec<String>,
    pc: u16,
    load_addr: u16,
    emitted_any: bool,
    org_seen: bool,
    pass: u8,
}

/// Expression evaluation view for one line.
struct PassCtx<'a> {
    symbols: &'a SymbolTable,
    pc: u16,
    pass: u8,
}

impl EvalContext for PassCtx<'_> {
    fn lookup_symbol(&self, name: &str) -> Option<i64> {
        self.symbols.lookup(name).map(i64::from)
    }

    fn current_address(&self) -> i64 {
        i64::from(self.pc)
    }
}

impl AssemblerContext for PassCtx<'_> {
    fn eval(&self, expr: &Expr) -> Result<i64, ExprError> {
        eval_expr(expr, self)
    }

    fn symbols(&self) -> &SymbolTable {
        self.symbols
    }

    fn current_address(&self) -> u16 {
        self.pc
    }

    fn pass(&self) -> u8 {
        self.pass
    }
}

impl PassWalker<'_> {
    fn run(&mut self, tokens: &[Token], source_lines: &[&str]) {
        if self.pass == 2 {
            self.image.clear();
        }
        let mut line_num: u32 = 0;
        let mut pos = 0usize;
        while pos < tokens.len() {
            if tokens[pos].kind == TokenKind::Eof {
                break;
            }
            line_num += 1;
            let start = pos;
            while pos < tokens.len()
                && !matches!(tokens[pos].kind, TokenKind::NewLine | TokenKind::Eof)
            {
                pos += 1;
            }
            let line = &tokens[start..pos];
            if pos < tokens.len() && tokens[pos].kind == TokenKind::NewLine {
                pos += 1;
            }
            let source = source_lines
                .get(line_num as usize - 1)
                .copied()
                .unwrap_or("");
            if !self.process_line(line, line_num, source) {
                break;
            }
        }
    }

    /// Process one logical line; returns false on END.
    fn process_line(&mut self, line: &[Token], line_num: u32, source: &str) -> bool {
        let line_addr = self.pc;
        let before = self.image.len();
        let keep_going = self.statement(line, line_num);
        if self.pass == 2 {
            let emitted = &self.image.bytes()[before..];
            let listing_line = format_listing_line(line_addr, emitted, source);
            self.listing.push(listing_line.trim_end().to_string());
        }
        keep_going
    }

    fn statement(&mut self, line: &[Token], line_num: u32) -> bool {
        let mut idx = 0usize;

        // Label forms.
        if let Some(TokenKind::Identifier(name)) = line.first().map(|t| &t.kind) {
            let at_column_0 = line[0].span.col_start == 1;
            match line.get(1).map(|t| &t.kind) {
                Some(TokenKind::Label) => {
                    self.bind_label(name, line_num);
                    idx = 2;
                }
                Some(TokenKind::Mnemonic(m)) if m == "EQU" || m == "SET" => {
                    self.constant(name, m == "SET", &line[2..], line_num);
                    return true;
                }
                // 8080 colonless convention: an identifier at column 0
                // followed by a mnemonic, newline, or EOF is a label.
                Some(TokenKind::Mnemonic(_)) | None if at_column_0 => {
                    self.bind_label(name, line_num);
                    idx = 1;
                }
                _ => {
                    self.pass2_error(
                        line_num,
                        AsmErrorKind::Instruction,
                        "Unknown mnemonic",
                        Some(name),
                    );
                    return true;
                }
            }
        }

        let Some(token) = line.get(idx) else {
            return true;
        };
        let rest = &line[idx + 1..];

        match &token.kind {
            TokenKind::Mnemonic(name) if name.starts_with('.') => true,
            TokenKind::Mnemonic(name) if is_skipped_directive(name) => true,
            TokenKind::Mnemonic(name) if is_directive(name) => {
                self.directive(name, rest, line_num)
            }
            TokenKind::Mnemonic(name) => {
                self.instruction(name, rest, line_num);
                true
            }
            _ => {
                self.pass2_error(
                    line_num,
                    AsmErrorKind::Assembler,
                    "Invalid statement",
                    None,
                );
                true
            }
        }
    }

    fn ctx(&self) -> PassCtx<'_> {
        PassCtx {
            symbols: self.symbols,
            pc: self.pc,
            pass: self.pass,
        }
    }

    fn bind_label(&mut self, name: &str, line_num: u32) {
        let result = self.symbols.add(name, self.pc, false);
        if result == SymbolTableResult::Duplicate && self.pass == 1 {
            self.error(
                line_num,
                AsmErrorKind::Symbol,
                "Duplicate label",
                Some(name),
            );
        }
    }

    /// `name EQU expr` / `name SET expr`. Pass 1 binds when the value is
    /// already computable; otherwise Pass 2 binds it in line order and the
    /// patch table heals earlier 16-bit references.
    fn constant(&mut self, name: &str, rw: bool, rest: &[Token], line_num: u32) {
        let expr = match parse_expr(rest) {
            Ok(expr) => expr,
            Err(err) => {
                self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                return;
            }
        };
        let outcome = eval_expr(&expr, &self.ctx());
        match outcome {
            Ok(value) => {
                let result = self.symbols.add(name, value as u16, rw);
                if result == SymbolTableResult::Duplicate && self.pass == 1 {
                    self.error(
                        line_num,
                        AsmErrorKind::Symbol,
                        "Duplicate label",
                        Some(name),
                    );
                }
            }
            Err(ExprError::Undefined { name: sym, .. }) => {
                if self.pass == 2 {
                    self.error(
                        line_num,
                        AsmErrorKind::Symbol,
                        "Undefined symbol",
                        Some(&sym),
                    );
                }
            }
            Err(err) => {
                self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
            }
        }
    }

    /// Returns false when the pass should stop (END).
    fn directive(&mut self, name: &str, rest: &[Token], line_num: u32) -> bool {
        match name {
            "ORG" => self.dir_org(rest, line_num),
            "EQU" => {
                self.pass2_error(
                    line_num,
                    AsmErrorKind::Directive,
                    "EQU requires a label",
                    None,
                );
            }
            // SET with no label to bind is the Z80 bit instruction.
            "SET" => self.instruction(name, rest, line_num),
            "DEFC" => self.dir_defc(rest, line_num),
            "DB" | "DEFB" | "DEFM" => self.dir_db(rest, line_num),
            "DW" | "DEFW" => self.dir_dw(rest, line_num),
            "DS" | "DEFS" => self.dir_ds(rest, line_num),
            "END" => return false,
            _ => {}
        }
        true
    }

    fn dir_org(&mut self, rest: &[Token], line_num: u32) {
        let value = match self.eval_pass1_required(rest, line_num, "ORG") {
            Some(value) => value,
            None => return,
        };
        self.pc = value;
        // Only the first ORG, and only before any emission, sets the load
        // address; later ORG directives move the PC alone.
        if !self.org_seen && !self.emitted_any {
            self.load_addr = value;
            if self.pass == 2 {
                self.image.set_load_addr(value);
            }
        }
        self.org_seen = true;
    }

    /// `DEFC name = expr` binds immediately.
    fn dir_defc(&mut self, rest: &[Token], line_num: u32) {
        let (name, expr_tokens) = match rest {
            [first, second, expr @ ..]
                if first.is_identifier() && second.kind == TokenKind::Equals =>
            {
                match &first.kind {
                    TokenKind::Identifier(name) => (name.clone(), expr),
                    _ => unreachable!(),
                }
            }
            _ => {
                self.pass2_error(
                    line_num,
                    AsmErrorKind::Directive,
                    "DEFC requires 'name = value'",
                    None,
                );
                return;
            }
        };
        self.constant(&name, false, expr_tokens, line_num);
    }

    fn dir_db(&mut self, rest: &[Token], line_num: u32) {
        let mut bytes = Vec::new();
        for part in split_operands(rest) {
            match z80::parse_operand(part) {
                Ok(Operand::Str(body, _)) => bytes.extend_from_slice(body.as_bytes()),
                Ok(Operand::Imm(expr, _)) => match self.byte_value(&expr, line_num) {
                    Some(value) => bytes.push(value),
                    None => return,
                },
                Ok(_) => {
                    self.pass2_error(
                        line_num,
                        AsmErrorKind::Directive,
                        "Invalid value in byte list",
                        None,
                    );
                    return;
                }
                Err(err) => {
                    self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                    return;
                }
            }
        }
        self.emit(&bytes);
    }

    fn dir_dw(&mut self, rest: &[Token], line_num: u32) {
        let mut exprs = Vec::new();
        for part in split_operands(rest) {
            match parse_expr(part) {
                Ok(expr) => exprs.push(expr),
                Err(err) => {
                    self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                    return;
                }
            }
        }
        let mut out = Encoded::default();
        let mut failure = None;
        {
            let ctx = self.ctx();
            for expr in &exprs {
                if let Err(msg) = z80::encoder::push_word(&mut out, expr, &ctx) {
                    failure = Some(msg);
                    break;
                }
            }
        }
        if let Some(msg) = failure {
            self.pass2_error(line_num, AsmErrorKind::Expression, &msg, None);
            return;
        }
        self.emit_encoded(out, line_num);
    }

    fn dir_ds(&mut self, rest: &[Token], line_num: u32) {
        let parts = split_operands(rest);
        if parts.is_empty() || parts.len() > 2 {
            self.pass2_error(
                line_num,
                AsmErrorKind::Directive,
                "DS requires a count and an optional fill byte",
                None,
            );
            return;
        }
        let count = match self.eval_pass1_required(parts[0], line_num, "DS") {
            Some(count) => count,
            None => return,
        };
        let fill = if parts.len() == 2 {
            let expr = match parse_expr(parts[1]) {
                Ok(expr) => expr,
                Err(err) => {
                    self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                    return;
                }
            };
            match self.byte_value(&expr, line_num) {
                Some(value) => value,
                None => return,
            }
        } else {
            0
        };
        let bytes = vec![fill; count as usize];
        self.emit(&bytes);
    }

    /// Evaluate an expression that sizing depends on; it must resolve in
    /// Pass 1, so forward references here are Pass 1 errors.
    fn eval_pass1_required(
        &mut self,
        tokens: &[Token],
        line_num: u32,
        what: &str,
    ) -> Option<u16> {
        let expr = match parse_expr(tokens) {
            Ok(expr) => expr,
            Err(err) => {
                self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                return None;
            }
        };
        let outcome = eval_expr(&expr, &self.ctx());
        match outcome {
            Ok(value) => Some(value as u16),
            Err(ExprError::Undefined { name, .. }) => {
                if self.pass == 1 {
                    self.error(
                        line_num,
                        AsmErrorKind::Directive,
                        &format!("Forward reference in {what}"),
                        Some(&name),
                    );
                }
                None
            }
            Err(err) => {
                self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                None
            }
        }
    }

    fn byte_value(&mut self, expr: &Expr, line_num: u32) -> Option<u8> {
        let outcome = eval_expr(expr, &self.ctx());
        match outcome {
            Ok(value) => Some((value & 0xff) as u8),
            Err(ExprError::Undefined { name, .. }) => {
                if self.pass == 1 {
                    Some(0)
                } else {
                    self.error(
                        line_num,
                        AsmErrorKind::Symbol,
                        "Undefined symbol",
                        Some(&name),
                    );
                    None
                }
            }
            Err(err) => {
                self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                None
            }
        }
    }

    fn instruction(&mut self, mnemonic: &str, rest: &[Token], line_num: u32) {
        let operands = match parse_operands(rest) {
            Ok(operands) => operands,
            Err(err) => {
                self.pass2_error(line_num, AsmErrorKind::Expression, &err.message(), None);
                return;
            }
        };
        let ctx = self.ctx();
        let mut result = z80::encode(mnemonic, &operands, &ctx);
        if matches!(result, EncodeResult::NotFound) {
            result = intel8080::encode(mnemonic, &operands, &ctx);
        }
        match result {
            EncodeResult::Ok(encoded) => self.emit_encoded(encoded, line_num),
            EncodeResult::NotFound => {
                self.pass2_error(
                    line_num,
                    AsmErrorKind::Instruction,
                    "Unknown mnemonic",
                    Some(mnemonic),
                );
            }
            EncodeResult::Error(msg, _) => {
                if self.pass == 2 {
                    self.error(line_num, AsmErrorKind::Instruction, &msg, None);
                    // Keep both passes in lockstep: pad with the lenient
                    // (pass-1 sized) byte count.
                    let size = self.lenient_size(mnemonic, &operands);
                    let padding = vec![0u8; size];
                    self.emit(&padding);
                }
            }
        }
    }

    /// Byte count the instruction would have had with every symbol defined;
    /// 0 when the line cannot encode at all.
    fn lenient_size(&self, mnemonic: &str, operands: &[Operand]) -> usize {
        let ctx = PassCtx {
            symbols: self.symbols,
            pc: self.pc,
            pass: 1,
        };
        let mut result = z80::encode(mnemonic, operands, &ctx);
        if matches!(result, EncodeResult::NotFound) {
            result = intel8080::encode(mnemonic, operands, &ctx);
        }
        match result {
            EncodeResult::Ok(encoded) => encoded.bytes.len(),
            _ => 0,
        }
    }

    fn emit(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.pass == 2 {
            self.image.store_slice(bytes);
        }
        self.pc = self.pc.wrapping_add(bytes.len() as u16);
        self.emitted_any = true;
    }

    fn emit_encoded(&mut self, encoded: Encoded, line_num: u32) {
        if self.pass == 2 {
            let base = self.image.len();
            for req in &encoded.patches {
                self.patches.push(Patch {
                    offset: base + req.offset,
                    name: req.name.clone(),
                    line: line_num,
                    relative: req.relative,
                });
            }
        }
        self.emit(&encoded.bytes);
    }

    fn error(&mut self, line_num: u32, kind: AsmErrorKind, msg: &str, param: Option<&str>) {
        self.diagnostics.push(Diagnostic::new(
            line_num,
            Severity::Error,
            AsmError::new(kind, msg, param),
        ));
    }

    /// Record an error only on Pass 2, where every line is diagnosed; Pass 1
    /// stays quiet so nothing is reported twice.
    fn pass2_error(&mut self, line_num: u32, kind: AsmErrorKind, msg: &str, param: Option<&str>) {
        if self.pass == 2 {
            self.error(line_num, kind, msg, param);
        }
    }
}

/// Assemble a source string with a default engine.
pub fn assemble(source: &str) -> AssemblyResult {
    Assembler::new().assemble(source)
}

/// Report for one input file of a CLI run.
pub struct RunReport {
    pub input: PathBuf,
    pub result: AssemblyResult,
    pub source_lines: Vec<String>,
}

/// Run the assembler with command-line arguments.
pub fn run() -> Result<Vec<RunReport>, AsmError> {
    let cli = Cli::parse();
    let config = validate_cli(&cli)?;
    let mut reports = Vec::new();
    for input in &cli.infiles {
        reports.push(run_one(&cli, &config, input)?);
    }
    Ok(reports)
}

fn run_one(cli: &Cli, config: &CliConfig, input: &PathBuf) -> Result<RunReport, AsmError> {
    let source = fs::read_to_string(input).map_err(|_| {
        AsmError::new(
            AsmErrorKind::Io,
            "Error reading file",
            Some(&input.display().to_string()),
        )
    })?;

    let mut assembler = Assembler::with_include_paths(cli.include_paths.clone());
    assembler.set_origin(input.clone());
    let result = assembler.assemble(&source);

    let base = cli.output_base(input, config.out_dir.as_deref());

    if let Some(hex_path) = resolve_output_path(&base, cli.hex_name.as_deref(), "hex") {
        if let Some(hex) = &result.hex {
            fs::write(&hex_path, hex).map_err(|_| write_error(&hex_path))?;
        }
    }

    if let Some(list_path) = resolve_output_path(&base, cli.list_name.as_deref(), "lst") {
        let file = File::create(&list_path).map_err(|_| write_error(&list_path))?;
        let mut listing = ListingWriter::new(file);
        let title = format!("forge80 Z80 Assembler v{VERSION}");
        listing
            .header(&title)
            .and_then(|()| listing.write_lines(&result.listing))
            .and_then(|()| listing.footer(&result.symbols, result.bytes.len()))
            .map_err(|_| write_error(&list_path))?;
    }

    if let Some(sym_path) = resolve_output_path(&base, cli.symbols_name.as_deref(), "sym") {
        let mut file = File::create(&sym_path).map_err(|_| write_error(&sym_path))?;
        result
            .symbols
            .dump(&mut file)
            .map_err(|_| write_error(&sym_path))?;
    }

    if let Some(bin_path) = resolve_output_path(&base, cli.bin_name.as_deref(), "bin") {
        if result.success() {
            fs::write(&bin_path, &result.bytes).map_err(|_| write_error(&bin_path))?;
        }
    }

    Ok(RunReport {
        input: input.clone(),
        result,
        source_lines: source.lines().map(str::to_string).collect(),
    })
}

fn write_error(path: &str) -> AsmError {
    AsmError::new(AsmErrorKind::Io, "Error opening file for write", Some(path))
}

#[cfg(test)]
mod tests;
