//! Preprocessor Macro Table
//!
//! Holds the `#define`d names of one preprocessor invocation and performs
//! in-line text substitution.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ember::preprocessor::MacroTable;
//!
//! let mut macros = MacroTable::new();
//! macros.set("MAX_LIGHTS", "8");
//! macros.set("LIGHT_COUNT", "MAX_LIGHTS");
//!
//! assert_eq!(macros.expand("Light lights[LIGHT_COUNT];"), "Light lights[8];");
//! ```
//!
//! # Substitution Rules
//!
//! A line is scanned once from left to right. Every identifier span
//! (`[A-Za-z_][A-Za-z0-9_]*`) naming a macro is replaced by the macro value,
//! which is expanded in turn. A macro is never expanded inside its own
//! expansion, so `#define A A` or mutually recursive pairs terminate.
//! Number literals (`1.0f`, `0x1F`) and double-quoted strings are copied
//! verbatim.

use rustc_hash::FxHashMap;

/// A single `NAME VALUE` definition passed to the preprocessor up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderMacro {
    pub name: String,
    pub value: String,
}

impl ShaderMacro {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A macro defined with an empty value (`#define NAME`).
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, String::new())
    }
}

/// Case-sensitive mapping from macro name to macro value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    macros: FxHashMap<String, String>,
}

impl MacroTable {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            macros: FxHashMap::default(),
        }
    }

    /// Define or redefine a macro.
    pub fn set(&mut self, name: &str, value: &str) {
        self.macros.insert(name.to_owned(), value.to_owned());
    }

    /// Remove a macro. Returns `false` if it was not defined.
    pub fn remove(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Substitute every macro occurrence in `text`.
    #[must_use]
    pub fn expand(&self, text: &str) -> String {
        if self.macros.is_empty() {
            return text.to_owned();
        }

        let mut output = String::with_capacity(text.len());
        let mut active = Vec::new();
        self.expand_into(text, &mut active, &mut output);
        output
    }

    fn expand_into<'a>(&'a self, text: &str, active: &mut Vec<&'a str>, output: &mut String) {
        let bytes = text.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            let start = i;
            let b = bytes[i];

            if b == b'"' {
                i += 1;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' if i + 1 < bytes.len() => i += 2,
                        b'"' => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                output.push_str(&text[start..i.min(bytes.len())]);
            } else if is_ident_start(b) {
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                let word = &text[start..i];

                match self.macros.get_key_value(word) {
                    Some((name, value)) if !active.contains(&name.as_str()) => {
                        active.push(name.as_str());
                        self.expand_into(value, active, output);
                        active.pop();
                    }
                    _ => output.push_str(word),
                }
            } else if b.is_ascii_digit() {
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                output.push_str(&text[start..i]);
            } else {
                // Delimiters are ASCII, so the run always ends on a char boundary.
                i += 1;
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                output.push_str(&text[start..i]);
            }
        }
    }
}

impl From<&[ShaderMacro]> for MacroTable {
    fn from(macros: &[ShaderMacro]) -> Self {
        let mut table = Self::new();
        for m in macros {
            table.set(&m.name, &m.value);
        }
        table
    }
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[inline]
fn is_delimiter(b: u8) -> bool {
    b == b'"' || is_ident_continue(b)
}
