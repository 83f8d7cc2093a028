//! Shader Preprocessor
//!
//! A small C-style preprocessor that flattens a shader source file and its
//! includes into a single text stream.
//!
//! Supported directives (lowercase):
//!
//! | Directive | Effect |
//! |-----------|--------|
//! | `#include "path"` | Include a file relative to the including file |
//! | `#include <path>` | Include the first match found in the include directories |
//! | `#define NAME [VALUE]` | Define a macro (empty value if omitted) |
//! | `#undef NAME` | Remove a macro |
//! | `#ifdef NAME` / `#ifndef NAME` | Open a conditional scope |
//! | `#else` / `#endif` | Switch / close the innermost scope |
//!
//! Unknown directives are reported with `log::warn!` and dropped. Visible text
//! lines are written out after macro substitution (see [`MacroTable`]).
//!
//! ```rust,ignore
//! use ember::preprocessor::{Preprocessor, ShaderMacro};
//!
//! let output = Preprocessor::new()
//!     .with_include_dir("shaders/src")
//!     .process("shaders/src/basic.hlsl", &[ShaderMacro::flag("USE_FOG")])?;
//!
//! println!("{} ({} files)", output.text, output.dependencies.len());
//! ```

pub mod comments;
pub mod conditional;
pub mod macros;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use comments::strip_comments;
pub use conditional::ConditionStack;
pub use macros::{MacroTable, ShaderMacro};

use crate::errors::{Result, ShaderError};

/// Flattened output of one [`Preprocessor::process`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessedSource {
    /// Fully expanded text. Visible lines keep their own line terminators.
    pub text: String,
    /// Every file read while processing, the root file included.
    pub dependencies: BTreeSet<PathBuf>,
}

/// State shared by the root file and all of its includes.
struct PreprocessState {
    macros: MacroTable,
    include_stack: Vec<PathBuf>,
    dependencies: BTreeSet<PathBuf>,
    output: String,
}

impl PreprocessState {
    fn new(macros: &[ShaderMacro]) -> Self {
        Self {
            macros: MacroTable::from(macros),
            include_stack: Vec::new(),
            dependencies: BTreeSet::new(),
            output: String::new(),
        }
    }

    fn finish(self) -> PreprocessedSource {
        PreprocessedSource {
            text: self.output,
            dependencies: self.dependencies,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IncludeKind {
    /// `"path"`: relative to the including file
    Relative,
    /// `<path>`: searched in the include directories
    Search,
}

/// Preprocessor configuration. Each `process` call starts from a fresh
/// macro table.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    include_dirs: Vec<PathBuf>,
    strip_comments: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_dirs: Vec::new(),
            strip_comments: true,
        }
    }

    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    /// Preprocess a file on disk.
    pub fn process(&self, path: impl AsRef<Path>, macros: &[ShaderMacro]) -> Result<PreprocessedSource> {
        let mut state = PreprocessState::new(macros);
        self.process_file(path.as_ref(), &mut state)?;
        Ok(state.finish())
    }

    /// Preprocess in-memory source. `origin` names the source in diagnostics
    /// and anchors relative includes.
    pub fn process_str(
        &self,
        source: &str,
        origin: impl AsRef<Path>,
        macros: &[ShaderMacro],
    ) -> Result<PreprocessedSource> {
        let origin = origin.as_ref();
        let mut state = PreprocessState::new(macros);

        let anchor = origin.canonicalize().unwrap_or_else(|_| origin.to_path_buf());
        state.include_stack.push(anchor);
        self.process_text(source, origin, &mut state)?;
        state.include_stack.pop();

        Ok(state.finish())
    }

    fn process_file(&self, path: &Path, state: &mut PreprocessState) -> Result<()> {
        let canonical = path.canonicalize().map_err(|_| ShaderError::FileNotFound {
            path: path.to_path_buf(),
        })?;

        if state.include_stack.contains(&canonical) {
            let from = state.include_stack.last().cloned().unwrap_or_default();
            return Err(ShaderError::CircularInclude { path: canonical, from });
        }

        let source = std::fs::read_to_string(&canonical).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ShaderError::FileNotFound {
                path: canonical.clone(),
            },
            _ => ShaderError::Io(err),
        })?;

        log::debug!("Preprocessing {}", canonical.display());

        state.dependencies.insert(canonical.clone());
        state.include_stack.push(canonical.clone());
        let result = self.process_text(&source, &canonical, state);
        state.include_stack.pop();

        result
    }

    fn process_text(&self, source: &str, file: &Path, state: &mut PreprocessState) -> Result<()> {
        let stripped;
        let text = if self.strip_comments {
            stripped = strip_comments(source);
            stripped.as_str()
        } else {
            source
        };

        let mut conditions = ConditionStack::new();

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let (raw, ending) = split_line_ending(line);

            let Some(directive) = raw.trim().strip_prefix('#') else {
                if conditions.is_visible() {
                    let expanded = state.macros.expand(raw);
                    state.output.push_str(&expanded);
                    state.output.push_str(ending);
                }
                continue;
            };

            let (command, args) = split_word(directive.trim_start());
            let visible = conditions.is_visible();

            match command {
                "include" => {
                    if !visible {
                        continue;
                    }
                    let (target, kind) = parse_include(args).ok_or_else(|| {
                        ShaderError::syntax(file, line_no, format!("malformed include statement \"{}\"", raw.trim()))
                    })?;
                    let resolved = self.resolve_include(file, target, kind)?;
                    self.process_file(&resolved, state)?;
                    // An include whose last line is unterminated must not join the next line.
                    if !state.output.is_empty() && !state.output.ends_with('\n') {
                        state.output.push('\n');
                    }
                }
                "define" => {
                    if !visible {
                        continue;
                    }
                    let (name, value) = split_word(args);
                    if name.is_empty() {
                        return Err(ShaderError::syntax(file, line_no, "#define expects a macro name"));
                    }
                    state.macros.set(name, value.trim());
                }
                "undef" => {
                    if !visible {
                        continue;
                    }
                    let (name, _) = split_word(args);
                    if name.is_empty() {
                        return Err(ShaderError::syntax(file, line_no, "#undef expects a macro name"));
                    }
                    state.macros.remove(name);
                }
                "ifdef" | "ifndef" => {
                    let (name, _) = split_word(args);
                    if name.is_empty() {
                        return Err(ShaderError::syntax(file, line_no, format!("#{command} expects a macro name")));
                    }
                    let defined = state.macros.contains(name);
                    conditions.push(if command == "ifdef" { defined } else { !defined });
                }
                "else" => {
                    if !conditions.flip() {
                        return Err(ShaderError::syntax(file, line_no, "#else without matching #ifdef"));
                    }
                }
                "endif" => {
                    if !conditions.pop() {
                        return Err(ShaderError::syntax(file, line_no, "#endif without matching #ifdef"));
                    }
                }
                _ => {
                    if visible {
                        log::warn!(
                            "{}:{}: unknown preprocessor directive \"{}\"",
                            file.display(),
                            line_no,
                            raw.trim()
                        );
                    }
                }
            }
        }

        if conditions.depth() > 1 {
            log::warn!(
                "{}: {} conditional block(s) not closed at end of file",
                file.display(),
                conditions.depth() - 1
            );
        }

        Ok(())
    }

    fn resolve_include(&self, file: &Path, target: &str, kind: IncludeKind) -> Result<PathBuf> {
        match kind {
            IncludeKind::Relative => {
                let path = file.parent().unwrap_or_else(|| Path::new("")).join(target);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(ShaderError::FileNotFound { path })
                }
            }
            IncludeKind::Search => self
                .include_dirs
                .iter()
                .map(|dir| dir.join(target))
                .find(|path| path.is_file())
                .ok_or_else(|| ShaderError::FileNotFound {
                    path: PathBuf::from(target),
                }),
        }
    }
}

/// Separate a line from its `\n` or `\r\n` terminator, if it has one.
fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Split off the leading whitespace-delimited word; the rest is left-trimmed.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim_start()),
        None => (text, ""),
    }
}

fn parse_include(args: &str) -> Option<(&str, IncludeKind)> {
    let delimited = |open: char, close: char| {
        let start = args.find(open)?;
        let end = args.rfind(close)?;
        (end > start).then(|| &args[start + 1..end])
    };

    delimited('"', '"')
        .map(|path| (path, IncludeKind::Relative))
        .or_else(|| delimited('<', '>').map(|path| (path, IncludeKind::Search)))
}
