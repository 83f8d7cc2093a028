//! `ember-shaderc`: compiles every shader unit listed in a manifest.
//!
//! ```text
//! ember-shaderc -t shaders.shm -s shaders/src -o shaders/bin --compiler fxc.exe --reflect
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use ember::compiler::backend::FXC_ARGS;
use ember::prelude::*;
use ember::{BackendId, ReflectionReport};

#[derive(Parser, Debug)]
#[command(version, about = "Compile the shader units listed in a manifest")]
struct Args {
    /// Shader manifest (.shm)
    #[arg(short = 't', long = "manifest")]
    manifest: PathBuf,

    /// Source root; overrides the settings file
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Output root for objects and cache; overrides the settings file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compiler settings (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend compiler executable
    #[arg(long, default_value = "fxc")]
    compiler: PathBuf,

    /// Backend argument template, repeatable. Supports {input}, {output},
    /// {entry} and {profile}. Defaults to an fxc command line.
    #[arg(long = "compiler-arg", allow_hyphen_values = true)]
    compiler_args: Vec<String>,

    /// Cache partition id of the backend's bytecode format
    #[arg(long, default_value_t = BackendId::HLSL_SM5.0)]
    backend_id: u32,

    /// Write `<output>/<name>.<stage>.json` reflection for each stage
    #[arg(long)]
    reflect: bool,

    /// Preserve comments in preprocessed source
    #[arg(long)]
    keep_comments: bool,
}

fn load_settings(args: &Args) -> Result<CompilerSettings> {
    let mut settings = match &args.config {
        Some(path) => CompilerSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => CompilerSettings::default(),
    };

    if let Some(source) = &args.source {
        settings = settings.with_source_dir(source);
    }
    if let Some(output) = &args.output {
        settings = settings.with_output_dir(output);
    }
    if args.keep_comments {
        settings = settings.with_strip_comments(false);
    }

    Ok(settings)
}

fn backend(args: &Args, settings: &CompilerSettings) -> CommandBackend {
    let backend = if args.compiler_args.is_empty() {
        CommandBackend::new(&args.compiler, FXC_ARGS.iter().copied())
    } else {
        CommandBackend::new(&args.compiler, args.compiler_args.iter().cloned())
    };

    backend
        .with_id(BackendId(args.backend_id))
        .with_work_dir(settings.output_dir.join("tmp"))
}

fn write_reflection(engine: &ShaderCompileEngine, name: &str, stage: ShaderStage, source: &StageSource) -> Result<()> {
    let preprocessed = engine.preprocess_stage(source)?;
    let reflection = ShaderParser::parse(&preprocessed.text)
        .with_context(|| format!("parsing {}", source.source_file.display()))?;

    let path = engine.settings().output_dir.join(format!("{name}.{stage}.json"));
    ReflectionReport::from(&reflection).write_to(&path)?;

    log::debug!("Wrote reflection {}", path.display());
    Ok(())
}

fn run(args: &Args) -> Result<usize> {
    let settings = load_settings(args)?;
    let manifest = ShaderManifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;

    let backend = backend(args, &settings);
    let mut engine = ShaderCompileEngine::new(settings, Box::new(backend));
    let mut failures = 0;

    for entry in manifest.shaders() {
        let report = engine
            .compile_shader(&entry.name, &entry.info)
            .with_context(|| format!("compiling shader \"{}\"", entry.name))?;

        for (stage, outcome) in report.outcomes() {
            match outcome {
                StageOutcome::Skipped => {}
                StageOutcome::Compiled(compiled) => {
                    let state = if compiled.cache_hit { "cached" } else { "compiled" };
                    println!("{}.{stage}: {state} {}", entry.name, compiled.hash);

                    if args.reflect
                        && let Err(e) = write_reflection(&engine, &entry.name, stage, entry.info.stage(stage))
                    {
                        eprintln!("{}.{stage}: reflection failed: {e:#}", entry.name);
                        failures += 1;
                    }
                }
                StageOutcome::Failed(e) => {
                    eprintln!("{}.{stage}: {e}", entry.name);
                    failures += 1;
                }
            }
        }

        println!("{} -> {}", entry.name, report.object_path.display());
    }

    Ok(failures)
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{failures} stage(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
