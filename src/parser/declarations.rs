//! Declarations extracted by the [`ShaderParser`](super::ShaderParser).

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{StructMember, TypeContext, TypeId};

/// A `register(<prefix><slot>)` binding, e.g. `b0` or `t3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub prefix: char,
    pub slot: u16,
}

impl Register {
    #[must_use]
    pub const fn new(prefix: char, slot: u16) -> Self {
        Self { prefix, slot }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.slot)
    }
}

/// The texture, buffer and sampler types that declare a bindable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    TextureCubeArray,
    Texture2DMS,
    Buffer,
    StructuredBuffer,
    RWTexture2D,
    RWBuffer,
    RWStructuredBuffer,
    SamplerState,
    SamplerComparisonState,
}

impl ResourceKind {
    const ALL: [ResourceKind; 15] = [
        Self::Texture1D,
        Self::Texture2D,
        Self::Texture3D,
        Self::TextureCube,
        Self::Texture1DArray,
        Self::Texture2DArray,
        Self::TextureCubeArray,
        Self::Texture2DMS,
        Self::Buffer,
        Self::StructuredBuffer,
        Self::RWTexture2D,
        Self::RWBuffer,
        Self::RWStructuredBuffer,
        Self::SamplerState,
        Self::SamplerComparisonState,
    ];

    /// Resource kind named by a type keyword.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == word)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Texture1D => "Texture1D",
            Self::Texture2D => "Texture2D",
            Self::Texture3D => "Texture3D",
            Self::TextureCube => "TextureCube",
            Self::Texture1DArray => "Texture1DArray",
            Self::Texture2DArray => "Texture2DArray",
            Self::TextureCubeArray => "TextureCubeArray",
            Self::Texture2DMS => "Texture2DMS",
            Self::Buffer => "Buffer",
            Self::StructuredBuffer => "StructuredBuffer",
            Self::RWTexture2D => "RWTexture2D",
            Self::RWBuffer => "RWBuffer",
            Self::RWStructuredBuffer => "RWStructuredBuffer",
            Self::SamplerState => "SamplerState",
            Self::SamplerComparisonState => "SamplerComparisonState",
        }
    }

    #[must_use]
    pub const fn is_sampler(self) -> bool {
        matches!(self, Self::SamplerState | Self::SamplerComparisonState)
    }

    /// Read-write resources bind to `u` registers.
    #[must_use]
    pub const fn is_read_write(self) -> bool {
        matches!(self, Self::RWTexture2D | Self::RWBuffer | Self::RWStructuredBuffer)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `cbuffer Name : register(b0) { ... };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantsDeclaration {
    pub name: String,
    pub register: Option<Register>,
    pub members: Vec<StructMember>,
    /// Sum of member sizes in bytes.
    pub size: usize,
    pub line: u32,
}

/// `Texture2D<float4> Name[N] : register(t0);`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDeclaration {
    pub name: String,
    pub kind: ResourceKind,
    /// Template argument, e.g. `float4` in `Texture2D<float4>`.
    pub element_type: Option<String>,
    pub array_size: u32,
    pub register: Option<Register>,
    pub line: u32,
}

/// A function signature; a candidate stage entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    /// `None` for `void`.
    pub return_type: Option<TypeId>,
    pub return_semantic: Option<String>,
    pub parameters: Vec<StructMember>,
    pub line: u32,
}

/// Everything a successful parse extracted from one source text.
#[derive(Debug, Clone, Default)]
pub struct ShaderReflection {
    pub types: TypeContext,
    pub(crate) constants: BTreeMap<String, ConstantsDeclaration>,
    pub(crate) resources: BTreeMap<String, ResourceDeclaration>,
    pub(crate) functions: BTreeMap<String, FunctionDeclaration>,
}

impl ShaderReflection {
    #[must_use]
    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.functions.values()
    }

    #[must_use]
    pub fn is_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceDeclaration> {
        self.resources.get(name)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDeclaration> {
        self.resources.values()
    }

    #[must_use]
    pub fn is_constant_buffer(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    #[must_use]
    pub fn constant_buffer(&self, name: &str) -> Option<&ConstantsDeclaration> {
        self.constants.get(name)
    }

    pub fn constant_buffers(&self) -> impl Iterator<Item = &ConstantsDeclaration> {
        self.constants.values()
    }
}
