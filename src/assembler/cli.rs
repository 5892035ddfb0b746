// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::core::assembler::error::{AsmError, AsmErrorKind};

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "Z80 assembler with Intel 8080 mnemonic compatibility.

Outputs are opt-in: specify at least one of -x/--hex, -l/--list, -s/--symbols,
or -b/--bin. Use -o/--outfile to set the output base name when filenames are
omitted. With multiple inputs, -o must be a directory and explicit output
filenames are not allowed. Include files are resolved against the source
directory first, then each -I directory in order.";

#[derive(Parser, Debug)]
#[command(
    name = "forge80",
    version = VERSION,
    about = "Z80 assembler with Intel 8080 mnemonic compatibility",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        short = 'i',
        long = "infile",
        value_name = "FILE",
        action = ArgAction::Append,
        long_help = "Input assembly file (repeatable)."
    )]
    pub infiles: Vec<PathBuf>,
    #[arg(
        short = 'x',
        long = "hex",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit an Intel Hex file. FILE is optional; when omitted, the output base is used and a .hex extension is added."
    )]
    pub hex_name: Option<String>,
    #[arg(
        short = 'l',
        long = "list",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit a listing file. FILE is optional; when omitted, the output base is used and a .lst extension is added."
    )]
    pub list_name: Option<String>,
    #[arg(
        short = 's',
        long = "symbols",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit a symbol table file. FILE is optional; when omitted, the output base is used and a .sym extension is added."
    )]
    pub symbols_name: Option<String>,
    #[arg(
        short = 'b',
        long = "bin",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        long_help = "Emit the raw binary image. FILE is optional; when omitted, the output base is used and a .bin extension is added. With an ORG of 0100h the image is a CP/M .com payload."
    )]
    pub bin_name: Option<String>,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "BASE",
        long_help = "Output filename base when -x/-l/-s/-b omit filenames. Defaults to the input base name. With multiple inputs, BASE must be a directory."
    )]
    pub outfile: Option<String>,
    #[arg(
        short = 'I',
        long = "include",
        value_name = "DIR",
        action = ArgAction::Append,
        long_help = "Include search directory (repeatable, searched in order after the source directory)."
    )]
    pub include_paths: Vec<PathBuf>,
}

impl Cli {
    fn requests_output(&self) -> bool {
        self.hex_name.is_some()
            || self.list_name.is_some()
            || self.symbols_name.is_some()
            || self.bin_name.is_some()
    }

    fn has_explicit_output_name(&self) -> bool {
        [
            self.hex_name.as_deref(),
            self.list_name.as_deref(),
            self.symbols_name.as_deref(),
            self.bin_name.as_deref(),
        ]
        .iter()
        .any(|name| name.is_some_and(|name| !name.is_empty()))
    }

    /// Output base name for one input: the resolved output directory joined
    /// with the input's stem, else `-o` when given, else the input path with
    /// its extension dropped.
    pub fn output_base(&self, input: &Path, out_dir: Option<&Path>) -> String {
        if let Some(dir) = out_dir {
            let stem = input
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "out".to_string());
            return dir.join(stem).display().to_string();
        }
        if let Some(base) = &self.outfile {
            return base.clone();
        }
        input.with_extension("").display().to_string()
    }
}

/// Validated output configuration.
#[derive(Debug, Default)]
pub struct CliConfig {
    /// Set when `-o` names a directory; per-input bases resolve inside it.
    pub out_dir: Option<PathBuf>,
}

/// Check argument consistency before any file is touched.
pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmError> {
    if cli.infiles.is_empty() {
        return Err(AsmError::new(
            AsmErrorKind::Cli,
            "No input files; use -i/--infile",
            None,
        ));
    }
    if !cli.requests_output() {
        return Err(AsmError::new(
            AsmErrorKind::Cli,
            "No outputs requested; specify at least one of -x/--hex, -l/--list, -s/--symbols, or -b/--bin",
            None,
        ));
    }

    let multiple = cli.infiles.len() > 1;
    if multiple && cli.has_explicit_output_name() {
        return Err(AsmError::new(
            AsmErrorKind::Cli,
            "Explicit output filenames are not allowed with multiple inputs",
            None,
        ));
    }

    let out_dir = match &cli.outfile {
        Some(base) if Path::new(base).is_dir() => Some(PathBuf::from(base)),
        Some(base) if multiple => {
            return Err(AsmError::new(
                AsmErrorKind::Cli,
                "-o/--outfile must be a directory when multiple inputs are provided",
                Some(base.as_str()),
            ));
        }
        _ => None,
    };

    Ok(CliConfig { out_dir })
}

/// Resolve one output path: `None` when the flag was not given, the default
/// `base.ext` when it was given bare, or the explicit name (with `ext`
/// appended when it has none).
pub fn resolve_output_path(base: &str, name: Option<&str>, ext: &str) -> Option<String> {
    match name {
        None => None,
        Some("") => Some(format!("{base}.{ext}")),
        Some(name) => {
            if Path::new(name).extension().is_some() {
                Some(name.to_string())
            } else {
                Some(format!("{name}.{ext}"))
            }
        }
    }
}
