//! Shader Manifests
//!
//! A manifest (`.shm`) lists the shader units to build and the source of each
//! of their stages:
//!
//! ```text
//! // Comments are allowed.
//! shader Standard
//! {
//!     stage vertex
//!     {
//!         file = "standard.hlsl";
//!         entrypoint = "VS";
//!         define USE_NORMAL_MAP;
//!         define MAX_LIGHTS = 8;
//!     }
//!     stage pixel { file = "standard.hlsl"; entrypoint = "PS"; }
//! }
//! ```
//!
//! Stage names are `vertex`, `hull` (`tess_control`), `domain` (`tess_eval`),
//! `geometry` and `pixel`. Values are string literals, identifiers or numbers.

use std::fs;
use std::path::Path;

use crate::compiler::stage::{ShaderInfo, ShaderStage, StageSource};
use crate::errors::{Result, ShaderError};
use crate::preprocessor::{ShaderMacro, strip_comments};
use crate::scanner::{Scanner, Token, TokenKind};

/// One `shader Name { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderEntry {
    pub name: String,
    pub info: ShaderInfo,
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderManifest {
    shaders: Vec<ShaderEntry>,
}

impl ShaderManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ShaderError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = strip_comments(text);
        let mut scan = Scanner::new(&text);
        let mut manifest = Self::default();

        while scan.has_next() {
            let entry = parse_shader(&mut scan)?;

            if manifest.find(&entry.name).is_some() {
                return Err(manifest_error(
                    entry.line,
                    format!("shader \"{}\" is defined twice", entry.name),
                ));
            }
            manifest.shaders.push(entry);
        }

        Ok(manifest)
    }

    #[must_use]
    pub fn shaders(&self) -> &[ShaderEntry] {
        &self.shaders
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ShaderEntry> {
        self.shaders.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

fn parse_shader(scan: &mut Scanner<'_>) -> Result<ShaderEntry> {
    let keyword = expect(scan, TokenKind::Identifier)?;
    if !keyword.is("shader") {
        return Err(manifest_error(
            keyword.line,
            format!("expected \"shader\", found \"{keyword}\""),
        ));
    }

    let name = expect(scan, TokenKind::Identifier)?.text;
    let mut info = ShaderInfo::new();

    expect(scan, TokenKind::BlockOpen)?;
    while !scan.next_if(TokenKind::BlockClose) {
        let token = expect(scan, TokenKind::Identifier)?;
        if !token.is("stage") {
            return Err(manifest_error(
                token.line,
                format!("expected \"stage\", found \"{token}\""),
            ));
        }

        let stage_token = expect(scan, TokenKind::Identifier)?;
        let stage = ShaderStage::from_name(&stage_token.text).ok_or_else(|| {
            manifest_error(stage_token.line, format!("unknown stage \"{stage_token}\""))
        })?;

        if !info.stage(stage).is_empty() {
            return Err(manifest_error(
                stage_token.line,
                format!("{stage} stage of \"{name}\" is defined twice"),
            ));
        }

        let source = parse_stage(scan)?;
        if source.is_empty() {
            return Err(manifest_error(
                stage_token.line,
                format!("{stage} stage of \"{name}\" has no file"),
            ));
        }
        info.set_stage(stage, source);
    }
    scan.next_if(TokenKind::Semicolon);

    Ok(ShaderEntry {
        name,
        info,
        line: keyword.line,
    })
}

/// `{ statement; ... }`
fn parse_stage(scan: &mut Scanner<'_>) -> Result<StageSource> {
    let mut source = StageSource::default();

    expect(scan, TokenKind::BlockOpen)?;
    while !scan.next_if(TokenKind::BlockClose) {
        let key = expect(scan, TokenKind::Identifier)?;

        match key.text.as_str() {
            "file" => {
                expect(scan, TokenKind::Equals)?;
                source.source_file = value(scan)?.into();
            }
            "entrypoint" => {
                expect(scan, TokenKind::Equals)?;
                source.entry_point = value(scan)?;
            }
            "define" => {
                let name = expect(scan, TokenKind::Identifier)?.text;
                let macro_value = if scan.next_if(TokenKind::Equals) {
                    value(scan)?
                } else {
                    String::new()
                };
                source.macros.push(ShaderMacro::new(name, macro_value));
            }
            _ => {
                return Err(manifest_error(
                    key.line,
                    format!("unknown statement \"{key}\""),
                ));
            }
        }

        expect(scan, TokenKind::Semicolon)?;
    }

    Ok(source)
}

fn value(scan: &mut Scanner<'_>) -> Result<String> {
    let token = scan.next_token();

    match token.kind {
        TokenKind::String => Ok(unquote(&token.text)),
        TokenKind::Identifier | TokenKind::Integer | TokenKind::Float => Ok(token.text),
        _ => Err(manifest_error(
            token.line,
            format!("expected a value, found {}", describe(&token)),
        )),
    }
}

fn unquote(literal: &str) -> String {
    let inner = literal.strip_prefix('"').unwrap_or(literal);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    inner.replace("\\\"", "\"")
}

fn expect(scan: &mut Scanner<'_>, kind: TokenKind) -> Result<Token> {
    let token = scan.next_token();
    if token.kind == kind {
        return Ok(token);
    }

    Err(manifest_error(
        token.line,
        format!("expected \"{kind}\", found {}", describe(&token)),
    ))
}

fn describe(token: &Token) -> String {
    if token.is_empty() {
        "end of input".to_owned()
    } else {
        format!("\"{token}\"")
    }
}

fn manifest_error(line: u32, message: impl Into<String>) -> ShaderError {
    ShaderError::Manifest {
        line,
        message: message.into(),
    }
}
