#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # Ember Shader
//!
//! Shader source pipeline: preprocessing, metadata reflection and
//! content-addressed multi-stage compilation.
//!
//! ```text
//! source ──► Preprocessor ──► Scanner ──► ShaderParser ──► ShaderReflection
//!                 │
//!                 └─► ContentHash ──► ShaderCache ◄── ShaderBackend
//!                                          │
//!                                          ▼
//!                                  ShaderObjectHeader
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember::prelude::*;
//!
//! let settings = CompilerSettings::new("shaders/src", "shaders/bin");
//! let mut engine = ShaderCompileEngine::new(settings, Box::new(CommandBackend::fxc("fxc.exe")));
//!
//! let info = ShaderInfo::new()
//!     .with_stage(ShaderStage::Vertex, StageSource::new("standard.hlsl", "VS"))
//!     .with_stage(ShaderStage::Pixel, StageSource::new("standard.hlsl", "PS"));
//!
//! let report = engine.compile_shader("Standard", &info)?;
//! assert!(report.is_success());
//! ```

pub mod compiler;
pub mod errors;
pub mod manifest;
pub mod parser;
pub mod preprocessor;
pub mod reflect;
pub mod scanner;
pub mod settings;
pub mod types;

pub use compiler::{
    BackendId, CommandBackend, CompileReport, CompiledStage, ContentHash, ShaderBackend,
    ShaderCache, ShaderCompileEngine, ShaderInfo, ShaderObjectHeader, ShaderStage, StageFlags,
    StageOutcome, StageSource,
};
pub use errors::{Result, ShaderError};
pub use manifest::{ShaderEntry, ShaderManifest};
pub use parser::{ShaderParser, ShaderReflection};
pub use preprocessor::{PreprocessedSource, Preprocessor, ShaderMacro};
pub use reflect::ReflectionReport;
pub use scanner::{Scanner, Token, TokenKind};
pub use settings::CompilerSettings;
pub use types::{MemberType, TypeContext, TypeId};

pub mod prelude {
    pub use crate::compiler::{
        CommandBackend, CompileReport, ShaderBackend, ShaderCompileEngine, ShaderInfo,
        ShaderStage, StageOutcome, StageSource,
    };
    pub use crate::errors::{Result, ShaderError};
    pub use crate::manifest::ShaderManifest;
    pub use crate::parser::ShaderParser;
    pub use crate::preprocessor::{Preprocessor, ShaderMacro};
    pub use crate::settings::CompilerSettings;
}
