//! Backend Compilers
//!
//! A [`ShaderBackend`] turns preprocessed source into bytecode for one stage.
//! The orchestrator treats it as opaque; [`CommandBackend`] is the concrete
//! implementation that drives an external compiler executable.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::stage::ShaderStage;

/// Identifies the bytecode format a backend produces. Cache entries are
/// partitioned by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(pub u32);

impl BackendId {
    /// Shader model 5 bytecode.
    pub const HLSL_SM5: BackendId = BackendId(1);
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Compiles one stage of preprocessed source.
pub trait ShaderBackend {
    fn id(&self) -> BackendId;

    /// Returns the bytecode, or the compiler's error text unmodified.
    fn compile(
        &mut self,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> std::result::Result<Vec<u8>, String>;
}

/// Argument template for `fxc`-style command lines.
pub const FXC_ARGS: &[&str] = &[
    "/nologo", "/T", "{profile}", "/E", "{entry}", "/Fo", "{output}", "{input}",
];

/// Runs an external compiler once per stage.
///
/// Each argument is a template with these placeholders:
///
/// | Placeholder | Replaced with                          |
/// |-------------|----------------------------------------|
/// | `{input}`   | path of the preprocessed source file   |
/// | `{output}`  | path the compiler must write bytecode to |
/// | `{entry}`   | entry point name                       |
/// | `{profile}` | stage profile, e.g. `ps_5_0`           |
///
/// Source and bytecode go through temporary files in `work_dir`, removed
/// after each invocation. A non-zero exit status fails the stage with the
/// compiler's stderr as error text.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    id: BackendId,
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
}

impl CommandBackend {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: BackendId::HLSL_SM5,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            work_dir: std::env::temp_dir(),
        }
    }

    /// A backend using [`FXC_ARGS`].
    #[must_use]
    pub fn fxc(program: impl Into<PathBuf>) -> Self {
        Self::new(program, FXC_ARGS.iter().copied())
    }

    #[must_use]
    pub fn with_id(mut self, id: BackendId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Expand the argument template for one invocation.
    #[must_use]
    pub fn expand_args(
        &self,
        input: &Path,
        output: &Path,
        entry_point: &str,
        stage: ShaderStage,
    ) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{entry}", entry_point)
                    .replace("{profile}", stage.profile())
            })
            .collect()
    }

    fn run(
        &self,
        input: &Path,
        output: &Path,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> std::result::Result<Vec<u8>, String> {
        fs::create_dir_all(&self.work_dir)
            .map_err(|e| format!("cannot create {}: {e}", self.work_dir.display()))?;
        fs::write(input, source).map_err(|e| format!("cannot write {}: {e}", input.display()))?;

        let args = self.expand_args(input, output, entry_point, stage);
        log::debug!("Running {} {}", self.program.display(), args.join(" "));

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| format!("cannot run {}: {e}", self.program.display()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let text = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&result.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            return Err(text);
        }

        fs::read(output).map_err(|e| format!("cannot read {}: {e}", output.display()))
    }
}

impl ShaderBackend for CommandBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn compile(
        &mut self,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> std::result::Result<Vec<u8>, String> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(stage.profile().as_bytes());
        hasher.update(entry_point.as_bytes());
        hasher.update(source.as_bytes());
        let stem = &hasher.finalize().to_hex()[..16];

        let input = self.work_dir.join(format!("{stem}.hlsl"));
        let output = self.work_dir.join(format!("{stem}.bin"));

        let result = self.run(&input, &output, source, entry_point, stage);

        for path in [&input, &output] {
            if let Err(e) = fs::remove_file(path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                log::warn!("Failed to remove {}: {e}", path.display());
            }
        }

        result
    }
}
