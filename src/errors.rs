//! Error Types
//!
//! This module defines the error type shared by every stage of the shader
//! pipeline.
//!
//! # Overview
//!
//! [`ShaderError`] covers:
//! - Missing source or include files
//! - Malformed preprocessor directives and circular includes
//! - Metadata parse failures (unexpected tokens, unresolved types)
//! - Backend compiler rejections (error text passed through verbatim)
//! - Cache and object file write failures
//! - Manifest and settings loading errors
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ShaderError>`.
//!
//! ```rust,ignore
//! use ember::errors::{ShaderError, Result};
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::stage::ShaderStage;

/// The main error type for the shader pipeline.
#[derive(Error, Debug)]
pub enum ShaderError {
    // ========================================================================
    // Preprocessor Errors
    // ========================================================================
    /// A source file or a required include file does not exist.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// The path that could not be resolved
        path: PathBuf,
    },

    /// A preprocessor directive is malformed.
    #[error("Syntax error in {}:{line}: {message}", file.display())]
    Syntax {
        /// File containing the directive
        file: PathBuf,
        /// 1-based line number of the directive
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A file includes itself, directly or through other includes.
    #[error("Circular include of {} (included from {})", path.display(), from.display())]
    CircularInclude {
        /// The file that was included again
        path: PathBuf,
        /// The file containing the offending include
        from: PathBuf,
    },

    // ========================================================================
    // Parser Errors
    // ========================================================================
    /// Unexpected token or unresolved type reference during metadata parsing.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// Line of the offending token
        line: u32,
        /// Description of the problem
        message: String,
    },

    // ========================================================================
    // Compilation Errors
    // ========================================================================
    /// The backend compiler rejected the preprocessed source.
    #[error("Backend failed to compile {stage} stage \"{entry_point}\":\n{message}")]
    BackendCompile {
        /// Stage being compiled
        stage: ShaderStage,
        /// Entry point being compiled
        entry_point: String,
        /// Error text produced by the backend, unmodified
        message: String,
    },

    /// A cache or object file could not be created or written.
    #[error("Failed to write {}: {source}", path.display())]
    CacheWrite {
        /// The file being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A shader object file is malformed.
    #[error("Invalid shader object: {0}")]
    InvalidObject(String),

    // ========================================================================
    // Manifest & Configuration Errors
    // ========================================================================
    /// A shader manifest is malformed.
    #[error("Manifest error at line {line}: {message}")]
    Manifest {
        /// Line of the offending token
        line: u32,
        /// Description of the problem
        message: String,
    },

    /// Compiler settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShaderError {
    pub(crate) fn parse(line: u32, message: impl Into<String>) -> Self {
        ShaderError::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn syntax(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        ShaderError::Syntax {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ShaderError {
    fn from(err: serde_json::Error) -> Self {
        ShaderError::Config(err.to_string())
    }
}

/// Alias for `Result<T, ShaderError>`.
pub type Result<T> = std::result::Result<T, ShaderError>;
