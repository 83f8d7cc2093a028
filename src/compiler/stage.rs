//! Shader stages and per-stage compile inputs.

use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::preprocessor::ShaderMacro;

/// Pipeline role of one entry point. Declaration order is the order of the
/// hash records in a shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    /// Tessellation control
    Hull,
    /// Tessellation evaluation
    Domain,
    Geometry,
    Pixel,
}

impl ShaderStage {
    pub const COUNT: usize = 5;

    pub const ALL: [ShaderStage; Self::COUNT] = [
        Self::Vertex,
        Self::Hull,
        Self::Domain,
        Self::Geometry,
        Self::Pixel,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Hull => "hull",
            Self::Domain => "domain",
            Self::Geometry => "geometry",
            Self::Pixel => "pixel",
        }
    }

    /// Accepts the stage names and the `tess_control`/`tess_eval` aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vertex" => Some(Self::Vertex),
            "hull" | "tess_control" => Some(Self::Hull),
            "domain" | "tess_eval" => Some(Self::Domain),
            "geometry" => Some(Self::Geometry),
            "pixel" => Some(Self::Pixel),
            _ => None,
        }
    }

    /// Shader model 5 target profile.
    #[must_use]
    pub const fn profile(self) -> &'static str {
        match self {
            Self::Vertex => "vs_5_0",
            Self::Hull => "hs_5_0",
            Self::Domain => "ds_5_0",
            Self::Geometry => "gs_5_0",
            Self::Pixel => "ps_5_0",
        }
    }

    #[must_use]
    pub const fn flag(self) -> StageFlags {
        match self {
            Self::Vertex => StageFlags::VERTEX,
            Self::Hull => StageFlags::HULL,
            Self::Domain => StageFlags::DOMAIN,
            Self::Geometry => StageFlags::GEOMETRY,
            Self::Pixel => StageFlags::PIXEL,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// One bit per [`ShaderStage`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct StageFlags: u8 {
        const VERTEX   = 1 << 0;
        const HULL     = 1 << 1;
        const DOMAIN   = 1 << 2;
        const GEOMETRY = 1 << 3;
        const PIXEL    = 1 << 4;
    }
}

/// The source of one stage: `{ file, entry point, macros }`.
///
/// An empty `source_file` marks the stage as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSource {
    /// Relative to the configured source directory.
    pub source_file: PathBuf,
    pub entry_point: String,
    pub macros: Vec<ShaderMacro>,
}

impl StageSource {
    #[must_use]
    pub fn new(source_file: impl Into<PathBuf>, entry_point: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            entry_point: entry_point.into(),
            macros: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_macro(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.push(ShaderMacro::new(name, value));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_file.as_os_str().is_empty()
    }

    /// Resolve the source file under `source_dir`.
    #[must_use]
    pub fn source_path(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.source_file)
    }
}

/// A shader unit: up to one [`StageSource`] per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInfo {
    stages: [StageSource; ShaderStage::COUNT],
}

impl ShaderInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stage(mut self, stage: ShaderStage, source: StageSource) -> Self {
        self.set_stage(stage, source);
        self
    }

    pub fn set_stage(&mut self, stage: ShaderStage, source: StageSource) {
        self.stages[stage.index()] = source;
    }

    #[must_use]
    pub fn stage(&self, stage: ShaderStage) -> &StageSource {
        &self.stages[stage.index()]
    }

    pub fn stage_mut(&mut self, stage: ShaderStage) -> &mut StageSource {
        &mut self.stages[stage.index()]
    }

    /// Stages with a source file, in header order.
    pub fn present(&self) -> impl Iterator<Item = (ShaderStage, &StageSource)> {
        ShaderStage::ALL
            .into_iter()
            .map(|stage| (stage, self.stage(stage)))
            .filter(|(_, source)| !source.is_empty())
    }
}
