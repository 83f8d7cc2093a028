//! Compiler Settings
//!
//! Directory layout and preprocessing options for a [`ShaderCompileEngine`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ember::settings::CompilerSettings;
//!
//! // Defaults: `shaders/src` -> `shaders/bin`, comments stripped
//! let settings = CompilerSettings::default();
//!
//! let settings = CompilerSettings::default()
//!     .with_source_dir("assets/shaders")
//!     .with_output_dir("target/shaders");
//!
//! // Or from a JSON file
//! let settings = CompilerSettings::from_json_file("shaderc.json")?;
//! ```
//!
//! # Output Layout
//!
//! ```text
//! <output_dir>/
//!     cache/
//!         <backend-id-hex>/
//!             <content-hash-hex>    raw bytecode for one stage
//!     <shader-name>.tsh             multi-stage object header
//! ```
//!
//! [`ShaderCompileEngine`]: crate::compiler::ShaderCompileEngine

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::backend::BackendId;
use crate::errors::Result;

/// File extension of multi-stage shader object files.
pub const OBJECT_EXTENSION: &str = "tsh";

/// Name of the cache directory below the output directory.
pub const CACHE_DIR_NAME: &str = "cache";

/// Configuration for shader compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Root directory that stage source paths are resolved against.
    ///
    /// It is also the only search directory for `#include <...>`.
    pub source_dir: PathBuf,

    /// Directory receiving object files and the bytecode cache.
    pub output_dir: PathBuf,

    /// Strip `/* */` and `//` comments before interpreting directives.
    pub strip_comments: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("shaders/src"),
            output_dir: PathBuf::from("shaders/bin"),
            strip_comments: true,
        }
    }
}

impl CompilerSettings {
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Loads settings from a JSON document. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    #[must_use]
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    /// Cache directory for one backend: `<output>/cache/<id-hex>`.
    #[must_use]
    pub fn cache_dir(&self, backend: BackendId) -> PathBuf {
        self.output_dir
            .join(CACHE_DIR_NAME)
            .join(format!("{:x}", backend.0))
    }

    /// Object file path for a named shader unit: `<output>/<name>.tsh`.
    #[must_use]
    pub fn object_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.{OBJECT_EXTENSION}"))
    }
}
