// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Preprocessor for INCLUDE directives.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::text_utils::Cursor;

/// Hard limit on include nesting.
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Stub files smaller than this are candidates for pseudo-symlink redirects.
const STUB_SIZE_LIMIT: u64 = 512;

#[derive(Debug, Clone)]
pub struct PreprocessError {
    message: String,
    line: Option<u32>,
    file: Option<String>,
}

impl PreprocessError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            line: None,
            file: None,
        }
    }

    fn with_context(mut self, line: u32, file: &Path) -> Self {
        self.line = Some(line);
        self.file = Some(file.display().to_string());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PreprocessError {}

/// A file found by an include search.
#[derive(Debug, Clone)]
pub struct ResolvedInclude {
    /// The path the search matched, before any stub redirect. Nested
    /// includes resolve relative to this path's directory, so a stub
    /// behaves like the file it stands in for.
    pub path: PathBuf,
    /// The content-bearing path after following redirects; cycle detection
    /// canonicalizes this one.
    pub real_path: PathBuf,
    pub text: String,
}

/// Locates include files for the preprocessor.
pub trait FileResolver {
    /// Find `name` relative to `current_dir` first, then each include
    /// search directory in order. Returns `None` when nothing matches.
    fn resolve(
        &self,
        name: &str,
        current_dir: &Path,
        include_paths: &[PathBuf],
    ) -> Option<ResolvedInclude>;
}

/// Resolver that reads the local filesystem, following Git-checkout
/// symlink surrogates: a tiny regular file whose whole content is a single
/// path-like line redirects to that path.
#[derive(Debug, Default)]
pub struct DiskResolver;

impl FileResolver for DiskResolver {
    fn resolve(
        &self,
        name: &str,
        current_dir: &Path,
        include_paths: &[PathBuf],
    ) -> Option<ResolvedInclude> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        let as_path = Path::new(name);
        if as_path.is_absolute() {
            candidates.push(as_path.to_path_buf());
        } else {
            candidates.push(current_dir.join(name));
            for dir in include_paths {
                candidates.push(dir.join(name));
            }
        }

        for candidate in candidates {
            if candidate.is_file() {
                let (real_path, text) = read_with_redirect(&candidate)?;
                return Some(ResolvedInclude {
                    path: candidate,
                    real_path,
                    text,
                });
            }
        }
        None
    }
}

fn read_with_redirect(path: &Path) -> Option<(PathBuf, String)> {
    let mut current = path.to_path_buf();
    // A stub can point at another stub; bound the chain.
    for _ in 0..8 {
        let bytes = fs::read(&current).ok()?;
        if let Some(target) = stub_target(&current, &bytes) {
            current = target;
            continue;
        }
        return Some((current, String::from_utf8_lossy(&bytes).to_string()));
    }
    None
}

/// Detect a pseudo-symlink stub: small, not an OS symlink, content a single
/// line that reads as a path.
fn stub_target(path: &Path, bytes: &[u8]) -> Option<PathBuf> {
    if bytes.len() as u64 >= STUB_SIZE_LIMIT {
        return None;
    }
    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            return None;
        }
    }
    let text = std::str::from_utf8(bytes).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed.contains(char::is_whitespace)
        || !(trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains('.'))
    {
        return None;
    }
    let target = Path::new(trimmed);
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        path.parent().unwrap_or(Path::new(".")).join(target)
    };
    if resolved.is_file() {
        Some(resolved)
    } else {
        None
    }
}

/// Recursively inlines `INCLUDE "file"` directives.
pub struct Preprocessor {
    include_paths: Vec<PathBuf>,
    resolver: Box<dyn FileResolver>,
    active: Vec<PathBuf>,
    lines: Vec<String>,
    errors: Vec<PreprocessError>,
}

impl Preprocessor {
    #[must_use]
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Self::with_resolver(include_paths, Box::new(DiskResolver))
    }

    #[must_use]
    pub fn with_resolver(include_paths: Vec<PathBuf>, resolver: Box<dyn FileResolver>) -> Self {
        Self {
            include_paths,
            resolver,
            active: Vec::new(),
            lines: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Expand all includes in `source`, which notionally lives at `origin`.
    /// Returns the expanded text and every error encountered; expansion
    /// always runs to the end.
    pub fn expand(&mut self, source: &str, origin: &Path) -> (String, Vec<PreprocessError>) {
        self.active.clear();
        self.lines.clear();
        self.errors.clear();

        if let Ok(canonical) = origin.canonicalize() {
            self.active.push(canonical);
        }
        let origin_dir = origin
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        self.process_source(source, &origin_dir, origin, 0);
        self.active.clear();

        let mut text = self.lines.join("\n");
        text.push('\n');
        (text, std::mem::take(&mut self.errors))
    }

    fn process_source(&mut self, source: &str, current_dir: &Path, file: &Path, depth: usize) {
        let mut line_num: u32 = 0;
        for line in source.lines() {
            line_num += 1;
            let Some(name) = parse_include_directive(line) else {
                self.lines.push(line.to_string());
                continue;
            };
            self.expand_include(&name, current_dir, file, line_num, depth);
        }
    }

    fn expand_include(
        &mut self,
        name: &str,
        current_dir: &Path,
        file: &Path,
        line_num: u32,
        depth: usize,
    ) {
        if depth >= MAX_INCLUDE_DEPTH {
            self.fail(
                format!("Include nesting exceeds {MAX_INCLUDE_DEPTH} levels: {name}"),
                name,
                line_num,
                file,
            );
            return;
        }

        let resolved = match self
            .resolver
            .resolve(name, current_dir, &self.include_paths)
        {
            Some(resolved) => resolved,
            None => {
                self.fail(
                    format!("Include file not found: {name}"),
                    name,
                    line_num,
                    file,
                );
                return;
            }
        };

        let canonical = resolved
            .real_path
            .canonicalize()
            .unwrap_or_else(|_| resolved.real_path.clone());
        if self.active.contains(&canonical) {
            self.fail(
                format!("Circular include: {name}"),
                name,
                line_num,
                file,
            );
            return;
        }

        // Nested includes resolve against the pre-redirect location.
        let nested_dir = resolved
            .path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        self.active.push(canonical);
        self.process_source(&resolved.text, &nested_dir, &resolved.path, depth + 1);
        self.active.pop();
    }

    /// Record the error and splice a marker comment so outer line numbers
    /// keep advancing where the include would have been.
    fn fail(&mut self, message: String, name: &str, line_num: u32, file: &Path) {
        self.lines.push(format!("; include {name} skipped"));
        self.errors
            .push(PreprocessError::new(message).with_context(line_num, file));
    }
}

/// Parse an `INCLUDE "file"` line; mnemonic is case-insensitive, the path
/// may use single or double quotes, and a trailing comment is allowed.
fn parse_include_directive(line: &str) -> Option<String> {
    let mut cursor = Cursor::new(line);
    cursor.skip_ws();
    let word = cursor.take_ident()?;
    if !word.eq_ignore_ascii_case("INCLUDE") {
        return None;
    }
    cursor.skip_ws();
    let name = cursor.take_quoted()?;
    cursor.skip_ws();
    match cursor.peek() {
        None | Some(b';') => Some(name),
        Some(_) => None,
    }
}

/// Expand includes in one call; the optional preprocessor entry point.
pub fn preprocess(
    source: &str,
    origin: &Path,
    include_paths: &[PathBuf],
) -> (String, Vec<PreprocessError>) {
    let mut pp = Preprocessor::new(include_paths.to_vec());
    pp.expand(source, origin)
}

#[cfg(test)]
mod tests {
    use super::{parse_include_directive, preprocess, Preprocessor};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(tag: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("forge80-preproc-{tag}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_include_forms() {
        assert_eq!(
            parse_include_directive("  INCLUDE \"lib.asm\""),
            Some("lib.asm".to_string())
        );
        assert_eq!(
            parse_include_directive("include 'lib.asm' ; boot code"),
            Some("lib.asm".to_string())
        );
        assert_eq!(parse_include_directive("INCLUDES \"lib.asm\""), None);
        assert_eq!(parse_include_directive("LD A,B"), None);
        assert_eq!(parse_include_directive("INCLUDE lib.asm"), None);
    }

    #[test]
    fn inlines_an_include() {
        let dir = temp_dir("inline");
        fs::write(dir.join("lib.asm"), "NOP\nRET\n").unwrap();
        let main = dir.join("main.asm");
        let (text, errors) =
            preprocess("ORG 100h\nINCLUDE \"lib.asm\"\nHALT\n", &main, &[]);
        assert!(errors.is_empty());
        assert_eq!(text, "ORG 100h\nNOP\nRET\nHALT\n");
    }

    #[test]
    fn searches_include_paths_in_order() {
        let dir = temp_dir("order");
        let first = dir.join("first");
        let second = dir.join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("lib.asm"), "DB 1\n").unwrap();
        fs::write(second.join("lib.asm"), "DB 2\n").unwrap();
        let main = dir.join("main.asm");
        let (text, errors) = preprocess(
            "INCLUDE \"lib.asm\"\n",
            &main,
            &[first, second],
        );
        assert!(errors.is_empty());
        assert_eq!(text, "DB 1\n");
    }

    #[test]
    fn missing_include_leaves_marker_line() {
        let dir = temp_dir("missing");
        let main = dir.join("main.asm");
        let (text, errors) = preprocess("NOP\nINCLUDE \"gone.asm\"\nRET\n", &main, &[]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("not found"));
        assert_eq!(errors[0].line(), Some(2));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("; include"));
    }

    #[test]
    fn detects_circular_includes() {
        let dir = temp_dir("cycle");
        fs::write(dir.join("a.asm"), "INCLUDE \"b.asm\"\n").unwrap();
        fs::write(dir.join("b.asm"), "INCLUDE \"a.asm\"\n").unwrap();
        let main = dir.join("a.asm");
        let source = fs::read_to_string(&main).unwrap();
        let (_, errors) = preprocess(&source, &main, &[]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("Circular include"));
    }

    #[test]
    fn enforces_nesting_limit() {
        let dir = temp_dir("deep");
        // A self-include through a different name never revisits the same
        // canonical path twice in a row, so build a deep chain instead.
        for i in 0..70 {
            fs::write(
                dir.join(format!("f{i}.asm")),
                format!("INCLUDE \"f{}.asm\"\n", i + 1),
            )
            .unwrap();
        }
        fs::write(dir.join("f70.asm"), "NOP\n").unwrap();
        let main = dir.join("main.asm");
        let (_, errors) = preprocess("INCLUDE \"f0.asm\"\n", &main, &[]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("nesting"));
    }

    #[test]
    fn follows_pseudo_symlink_stub() {
        let dir = temp_dir("stub");
        let real = dir.join("real");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("impl.asm"), "INCLUDE \"helper.asm\"\n").unwrap();
        // The helper lives next to the stub, not next to the target.
        fs::write(dir.join("helper.asm"), "DB 7\n").unwrap();
        fs::write(dir.join("lib.asm"), "real/impl.asm").unwrap();
        let main = dir.join("main.asm");
        let (text, errors) = preprocess("INCLUDE \"lib.asm\"\n", &main, &[]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(text, "DB 7\n");
    }

    #[test]
    fn reuses_preprocessor_across_inputs() {
        let dir = temp_dir("reuse");
        fs::write(dir.join("lib.asm"), "NOP\n").unwrap();
        let main = dir.join("main.asm");
        let mut pp = Preprocessor::new(Vec::new());
        let (first, errors) = pp.expand("INCLUDE \"lib.asm\"\n", &main);
        assert!(errors.is_empty());
        let (second, errors) = pp.expand("INCLUDE \"lib.asm\"\n", &main);
        assert!(errors.is_empty());
        assert_eq!(first, second);
    }
}
