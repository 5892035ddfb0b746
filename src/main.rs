// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for forge80.

use std::process::ExitCode;

fn main() -> ExitCode {
    let use_color = std::env::var("NO_COLOR").is_err();
    match forge80::assembler::run() {
        Ok(reports) => {
            let mut failed = false;
            for report in &reports {
                for diag in report
                    .result
                    .warnings
                    .iter()
                    .chain(report.result.errors.iter())
                {
                    eprintln!(
                        "{}",
                        diag.format_with_context(Some(&report.source_lines), use_color)
                    );
                }
                if !report.result.success() {
                    eprintln!(
                        "{}: errors detected, no hex output written",
                        report.input.display()
                    );
                    failed = true;
                }
            }
            if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
