//! Compile Orchestrator
//!
//! [`ShaderCompileEngine`] compiles a named shader unit of up to five stages.
//! Per present stage:
//!
//! 1. Resolve the source file under the configured source directory
//! 2. Preprocess it with the stage macros, the source directory being the only
//!    include search path
//! 3. Hash entry point and preprocessed text ([`ContentHash`])
//! 4. On a cache miss, run the [`ShaderBackend`] and store the bytecode
//! 5. Record the hash in the [`ShaderObjectHeader`]
//!
//! Stages are independent: a failing stage leaves a zero hash and sets its bit
//! in [`CompileReport::failed`], and the remaining stages still run. The
//! object file is written once every stage has been attempted.

pub mod backend;
pub mod cache;
pub mod object;
pub mod stage;

use std::collections::BTreeSet;
use std::path::PathBuf;

pub use backend::{BackendId, CommandBackend, ShaderBackend};
pub use cache::{ContentHash, ShaderCache};
pub use object::ShaderObjectHeader;
pub use stage::{ShaderInfo, ShaderStage, StageFlags, StageSource};

use crate::errors::{Result, ShaderError};
use crate::preprocessor::{PreprocessedSource, Preprocessor};
use crate::settings::CompilerSettings;

/// A successfully compiled (or cached) stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStage {
    pub hash: ContentHash,
    /// `true` if the backend was not invoked.
    pub cache_hit: bool,
    pub cache_path: PathBuf,
    /// Every file read while preprocessing, the stage source included.
    pub dependencies: BTreeSet<PathBuf>,
}

#[derive(Debug)]
pub enum StageOutcome {
    /// No source file was given.
    Skipped,
    Compiled(CompiledStage),
    Failed(ShaderError),
}

impl StageOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }

    #[must_use]
    pub fn compiled(&self) -> Option<&CompiledStage> {
        match self {
            StageOutcome::Compiled(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&ShaderError> {
        match self {
            StageOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of [`ShaderCompileEngine::compile_shader`].
#[derive(Debug)]
pub struct CompileReport {
    pub name: String,
    pub object_path: PathBuf,
    pub header: ShaderObjectHeader,
    /// Bitwise OR of every failed stage. Empty on success.
    pub failed: StageFlags,
    outcomes: [StageOutcome; ShaderStage::COUNT],
}

impl CompileReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn outcome(&self, stage: ShaderStage) -> &StageOutcome {
        &self.outcomes[stage.index()]
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (ShaderStage, &StageOutcome)> {
        ShaderStage::ALL.into_iter().zip(self.outcomes.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = (ShaderStage, &ShaderError)> {
        self.outcomes()
            .filter_map(|(stage, outcome)| outcome.error().map(|e| (stage, e)))
    }
}

pub struct ShaderCompileEngine {
    settings: CompilerSettings,
    backend: Box<dyn ShaderBackend>,
    cache: ShaderCache,
}

impl ShaderCompileEngine {
    #[must_use]
    pub fn new(settings: CompilerSettings, backend: Box<dyn ShaderBackend>) -> Self {
        let cache = ShaderCache::new(settings.cache_dir(backend.id()));
        Self {
            settings,
            backend,
            cache,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &ShaderCache {
        &self.cache
    }

    #[must_use]
    pub fn backend_id(&self) -> BackendId {
        self.backend.id()
    }

    /// Preprocessor configured for stage sources.
    #[must_use]
    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new()
            .with_include_dir(&self.settings.source_dir)
            .with_strip_comments(self.settings.strip_comments)
    }

    /// Resolve and preprocess one stage source.
    pub fn preprocess_stage(&self, source: &StageSource) -> Result<PreprocessedSource> {
        let path = source.source_path(&self.settings.source_dir);
        if !path.is_file() {
            return Err(ShaderError::FileNotFound { path });
        }

        self.preprocessor().process(&path, &source.macros)
    }

    /// Compile one stage, consulting the cache first.
    pub fn compile_stage(&mut self, stage: ShaderStage, source: &StageSource) -> Result<CompiledStage> {
        let preprocessed = self.preprocess_stage(source)?;
        let hash = ContentHash::of(&source.entry_point, &preprocessed.text);

        let cache_hit = self.cache.contains(&hash);
        let cache_path = if cache_hit {
            log::debug!("Cache hit for {stage} \"{}\": {hash}", source.entry_point);
            self.cache.path_for(&hash)
        } else {
            log::debug!("Cache miss for {stage} \"{}\": {hash}", source.entry_point);

            let bytecode = self
                .backend
                .compile(&preprocessed.text, &source.entry_point, stage)
                .map_err(|message| ShaderError::BackendCompile {
                    stage,
                    entry_point: source.entry_point.clone(),
                    message,
                })?;

            self.cache.store(&hash, &bytecode)?
        };

        Ok(CompiledStage {
            hash,
            cache_hit,
            cache_path,
            dependencies: preprocessed.dependencies,
        })
    }

    /// Compile every present stage of `info` and write `<output>/<name>.tsh`.
    ///
    /// Stage failures are collected in the report. The outer error is only
    /// returned if the object file cannot be written.
    pub fn compile_shader(&mut self, name: &str, info: &ShaderInfo) -> Result<CompileReport> {
        let mut header = ShaderObjectHeader::new();
        let mut failed = StageFlags::empty();

        let outcomes = ShaderStage::ALL.map(|stage| {
            let source = info.stage(stage);

            if source.is_empty() {
                log::debug!("Shader \"{name}\": no {stage} stage");
                return StageOutcome::Skipped;
            }

            match self.compile_stage(stage, source) {
                Ok(compiled) => {
                    header.set_hash(stage, compiled.hash);
                    StageOutcome::Compiled(compiled)
                }
                Err(e) => {
                    log::error!("Shader \"{name}\": {stage} stage failed: {e}");
                    failed |= stage.flag();
                    StageOutcome::Failed(e)
                }
            }
        });

        let object_path = self.settings.object_path(name);
        header.write_to(&object_path)?;

        Ok(CompileReport {
            name: name.to_owned(),
            object_path,
            header,
            failed,
            outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    struct FixedBackend {
        calls: usize,
    }

    impl ShaderBackend for FixedBackend {
        fn id(&self) -> BackendId {
            BackendId(0xa)
        }

        fn compile(
            &mut self,
            source: &str,
            entry_point: &str,
            _stage: ShaderStage,
        ) -> std::result::Result<Vec<u8>, String> {
            self.calls += 1;
            if entry_point == "Broken" {
                return Err("error: Broken is broken".to_owned());
            }
            Ok(source.as_bytes().to_vec())
        }
    }

    fn engine(root: &std::path::Path) -> ShaderCompileEngine {
        let settings = CompilerSettings::new(root.join("src"), root.join("bin"));
        ShaderCompileEngine::new(settings, Box::new(FixedBackend { calls: 0 }))
    }

    #[test]
    fn test_stage_compiles_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.hlsl"), "float4 PS() : SV_Target { return 1; }").unwrap();

        let mut engine = engine(dir.path());
        let compiled = engine
            .compile_stage(ShaderStage::Pixel, &StageSource::new("a.hlsl", "PS"))
            .unwrap();

        assert!(!compiled.cache_hit);
        assert!(compiled.cache_path.starts_with(dir.path().join("bin/cache/a")));
        assert_eq!(
            fs::read_to_string(&compiled.cache_path).unwrap().trim_end(),
            "float4 PS() : SV_Target { return 1; }"
        );
        assert_eq!(compiled.dependencies.len(), 1);
    }

    #[test]
    fn test_backend_error_text_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.hlsl"), "void Broken() {}").unwrap();

        let info = ShaderInfo::new().with_stage(ShaderStage::Vertex, StageSource::new("a.hlsl", "Broken"));
        let report = engine(dir.path()).compile_shader("unit", &info).unwrap();

        assert_eq!(report.failed, StageFlags::VERTEX);
        match report.outcome(ShaderStage::Vertex) {
            StageOutcome::Failed(ShaderError::BackendCompile { message, .. }) => {
                assert_eq!(message, "error: Broken is broken");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(report.header.hash(ShaderStage::Vertex).is_zero());
    }

    #[test]
    fn test_empty_unit_writes_zero_header() {
        let dir = tempfile::tempdir().unwrap();
        let report = engine(dir.path()).compile_shader("empty", &ShaderInfo::new()).unwrap();

        assert!(report.is_success());
        assert!(report.outcomes().all(|(_, o)| matches!(o, StageOutcome::Skipped)));
        assert_eq!(
            ShaderObjectHeader::read_from(&report.object_path).unwrap(),
            ShaderObjectHeader::new()
        );
    }
}
