//! Compile Orchestrator Integration Tests
//!
//! Tests for:
//! - Content-addressed caching (backend invoked once per distinct input)
//! - Per-stage failure isolation and the aggregate failure flags
//! - Object file header contents
//! - Manifest-driven compilation

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use ember::compiler::{
    BackendId, ContentHash, ShaderBackend, ShaderCompileEngine, ShaderInfo, ShaderObjectHeader,
    ShaderStage, StageFlags, StageOutcome, StageSource,
};
use ember::errors::ShaderError;
use ember::manifest::ShaderManifest;
use ember::settings::CompilerSettings;

/// Records every invocation; fails entry points listed in `reject`.
#[derive(Clone, Default)]
struct MockBackend {
    calls: Rc<RefCell<Vec<(ShaderStage, String)>>>,
    reject: Vec<String>,
}

impl MockBackend {
    fn rejecting(entry_point: &str) -> Self {
        Self {
            reject: vec![entry_point.to_owned()],
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ShaderBackend for MockBackend {
    fn id(&self) -> BackendId {
        BackendId(0x5f)
    }

    fn compile(
        &mut self,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> Result<Vec<u8>, String> {
        self.calls.borrow_mut().push((stage, entry_point.to_owned()));

        if self.reject.iter().any(|r| r == entry_point) {
            return Err(format!("{entry_point}: error X3501: entrypoint not found"));
        }

        let mut bytes = format!("{}:{entry_point}:", stage.profile()).into_bytes();
        bytes.extend_from_slice(source.as_bytes());
        Ok(bytes)
    }
}

fn setup(root: &Path, backend: &MockBackend) -> ShaderCompileEngine {
    let settings = CompilerSettings::new(root.join("src"), root.join("bin"));
    ShaderCompileEngine::new(settings, Box::new(backend.clone()))
}

fn write_source(root: &Path, name: &str, contents: &str) {
    let path = root.join("src").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const SHADER: &str = "\
#include <common.h>
float4 VS(float4 p : POSITION) : SV_Position { return p; }
float4 PS() : SV_Target { return COLOR; }
";

// ============================================================================
// Caching
// ============================================================================

#[test]
fn second_compile_hits_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "common.h", "#define COLOR float4(1, 0, 0, 1)\n");
    write_source(dir.path(), "unit.hlsl", SHADER);

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);

    let info = ShaderInfo::new()
        .with_stage(ShaderStage::Vertex, StageSource::new("unit.hlsl", "VS"))
        .with_stage(ShaderStage::Pixel, StageSource::new("unit.hlsl", "PS"));

    let first = engine.compile_shader("Unit", &info).unwrap();
    assert!(first.is_success());
    assert_eq!(backend.call_count(), 2);

    let second = engine.compile_shader("Unit", &info).unwrap();
    assert!(second.is_success());
    assert_eq!(backend.call_count(), 2);

    for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
        let a = first.outcome(stage).compiled().unwrap();
        let b = second.outcome(stage).compiled().unwrap();

        assert!(!a.cache_hit);
        assert!(b.cache_hit);
        assert_eq!(a.cache_path, b.cache_path);
        assert_eq!(a.hash, b.hash);
    }
    assert_eq!(first.header, second.header);
}

#[test]
fn identical_text_through_different_paths_shares_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "a/shader.hlsl", "float4 PS() : SV_Target { return 1; }\n");
    write_source(dir.path(), "b/copy.hlsl", "// a comment that is stripped\nfloat4 PS() : SV_Target { return 1; }\n");

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);

    let a = engine
        .compile_stage(ShaderStage::Pixel, &StageSource::new("a/shader.hlsl", "PS"))
        .unwrap();
    let b = engine
        .compile_stage(ShaderStage::Pixel, &StageSource::new("b/copy.hlsl", "PS"))
        .unwrap();

    // The stripped comment leaves an empty line behind, so the texts differ.
    assert_ne!(a.hash, b.hash);

    write_source(dir.path(), "b/copy.hlsl", "float4 PS() : SV_Target { return 1; }\n");
    let c = engine
        .compile_stage(ShaderStage::Pixel, &StageSource::new("b/copy.hlsl", "PS"))
        .unwrap();

    assert_eq!(a.hash, c.hash);
    assert!(c.cache_hit);
    assert_eq!(backend.call_count(), 2);
}

#[test]
fn macros_and_entry_point_change_the_hash() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "s.hlsl", "#ifdef FAST\nfast\n#endif\nfloat4 E() { return 0; }\n");

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);

    let plain = StageSource::new("s.hlsl", "E");
    let fast = StageSource::new("s.hlsl", "E").with_macro("FAST", "");
    let other_entry = StageSource::new("s.hlsl", "F");

    let h1 = engine.compile_stage(ShaderStage::Vertex, &plain).unwrap().hash;
    let h2 = engine.compile_stage(ShaderStage::Vertex, &fast).unwrap().hash;
    let h3 = engine.compile_stage(ShaderStage::Vertex, &other_entry).unwrap().hash;

    assert_ne!(h1, h2);
    assert_ne!(h1, h3);
    assert_eq!(backend.call_count(), 3);
}

#[test]
fn cache_layout_is_backend_id_then_hash() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "s.hlsl", "float4 PS() { return 0; }\n");

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);
    let compiled = engine
        .compile_stage(ShaderStage::Pixel, &StageSource::new("s.hlsl", "PS"))
        .unwrap();

    let expected = ContentHash::of("PS", "float4 PS() { return 0; }\n");
    assert_eq!(compiled.hash, expected);
    assert_eq!(
        compiled.cache_path,
        dir.path().join("bin").join("cache").join("5f").join(expected.to_hex())
    );

    let bytecode = fs::read(&compiled.cache_path).unwrap();
    assert!(bytecode.starts_with(b"ps_5_0:PS:"));
}

// ============================================================================
// Failure Isolation
// ============================================================================

#[test]
fn missing_stage_file_leaves_zero_hash() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "common.h", "#define COLOR 1\n");
    write_source(dir.path(), "unit.hlsl", SHADER);

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);

    let info = ShaderInfo::new()
        .with_stage(ShaderStage::Vertex, StageSource::new("unit.hlsl", "VS"))
        .with_stage(ShaderStage::Geometry, StageSource::new("missing.hlsl", "GS"))
        .with_stage(ShaderStage::Pixel, StageSource::new("unit.hlsl", "PS"));

    let report = engine.compile_shader("Partial", &info).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed, StageFlags::GEOMETRY);
    assert!(matches!(
        report.outcome(ShaderStage::Geometry),
        StageOutcome::Failed(ShaderError::FileNotFound { .. })
    ));
    assert!(matches!(report.outcome(ShaderStage::Hull), StageOutcome::Skipped));

    let header = ShaderObjectHeader::read_from(&report.object_path).unwrap();
    assert!(!header.hash(ShaderStage::Vertex).is_zero());
    assert!(!header.hash(ShaderStage::Pixel).is_zero());
    assert!(header.hash(ShaderStage::Geometry).is_zero());
    assert!(header.hash(ShaderStage::Hull).is_zero());
    assert!(header.hash(ShaderStage::Domain).is_zero());
    assert_eq!(backend.call_count(), 2);
}

#[test]
fn failures_are_ored_across_stages() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "common.h", "#define COLOR 1\n");
    write_source(dir.path(), "unit.hlsl", SHADER);

    let backend = MockBackend::rejecting("PS");
    let mut engine = setup(dir.path(), &backend);

    let info = ShaderInfo::new()
        .with_stage(ShaderStage::Vertex, StageSource::new("unit.hlsl", "VS"))
        .with_stage(ShaderStage::Hull, StageSource::new("gone.hlsl", "HS"))
        .with_stage(ShaderStage::Pixel, StageSource::new("unit.hlsl", "PS"));

    let report = engine.compile_shader("Broken", &info).unwrap();

    assert_eq!(report.failed, StageFlags::HULL | StageFlags::PIXEL);
    assert_eq!(report.failures().count(), 2);

    match report.outcome(ShaderStage::Pixel) {
        StageOutcome::Failed(ShaderError::BackendCompile { stage, entry_point, message }) => {
            assert_eq!(*stage, ShaderStage::Pixel);
            assert_eq!(entry_point, "PS");
            assert_eq!(message, "PS: error X3501: entrypoint not found");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // A rejected stage is not cached, so a retry invokes the backend again.
    let before = backend.call_count();
    engine.compile_shader("Broken", &info).unwrap();
    assert_eq!(backend.call_count(), before + 1);
}

#[test]
fn preprocessor_error_fails_only_its_stage() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "bad.hlsl", "#include \"nowhere.h\"\n");
    write_source(dir.path(), "good.hlsl", "float4 VS() { return 0; }\n");

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);

    let info = ShaderInfo::new()
        .with_stage(ShaderStage::Vertex, StageSource::new("good.hlsl", "VS"))
        .with_stage(ShaderStage::Pixel, StageSource::new("bad.hlsl", "PS"));

    let report = engine.compile_shader("Mixed", &info).unwrap();
    assert_eq!(report.failed, StageFlags::PIXEL);
    assert!(report.outcome(ShaderStage::Vertex).compiled().is_some());
}

#[test]
fn unwritable_object_path_is_cache_write_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bin"), b"not a directory").unwrap();

    let settings = CompilerSettings::new(dir.path().join("src"), dir.path().join("bin"));
    let mut engine = ShaderCompileEngine::new(settings, Box::new(MockBackend::default()));

    let err = engine.compile_shader("Any", &ShaderInfo::new()).unwrap_err();
    assert!(matches!(err, ShaderError::CacheWrite { .. }));
}

// ============================================================================
// Manifest-Driven Compilation
// ============================================================================

#[test]
fn compiles_every_manifest_entry() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "common.h", "#ifndef COLOR\n#define COLOR 0\n#endif\n");
    write_source(dir.path(), "unit.hlsl", SHADER);

    let manifest = ShaderManifest::parse(
        r#"
        shader Red
        {
            stage vertex { file = "unit.hlsl"; entrypoint = "VS"; }
            stage pixel  { file = "unit.hlsl"; entrypoint = "PS"; define COLOR = "float4(1, 0, 0, 1)"; }
        }
        shader Default
        {
            stage vertex { file = "unit.hlsl"; entrypoint = "VS"; }
            stage pixel  { file = "unit.hlsl"; entrypoint = "PS"; }
        }
        "#,
    )
    .unwrap();

    let backend = MockBackend::default();
    let mut engine = setup(dir.path(), &backend);

    let reports: Vec<_> = manifest
        .shaders()
        .iter()
        .map(|entry| engine.compile_shader(&entry.name, &entry.info).unwrap())
        .collect();

    assert!(reports.iter().all(|r| r.is_success()));
    assert!(dir.path().join("bin/Red.tsh").is_file());
    assert!(dir.path().join("bin/Default.tsh").is_file());

    // Both vertex stages preprocess to the same text.
    assert_eq!(
        reports[0].header.hash(ShaderStage::Vertex),
        reports[1].header.hash(ShaderStage::Vertex)
    );
    assert_ne!(
        reports[0].header.hash(ShaderStage::Pixel),
        reports[1].header.hash(ShaderStage::Pixel)
    );
    assert_eq!(backend.call_count(), 3);
}
