//! Reflection export.
//!
//! [`ReflectionReport`] is a self-contained, serializable view of a
//! [`ShaderReflection`]: type handles resolved to names and sizes computed.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ShaderError};
use crate::parser::ShaderReflection;
use crate::types::{StructMember, TypeContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReport {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
    pub array_size: u32,
    /// Total size in bytes, array elements included.
    pub size: usize,
}

impl MemberReport {
    fn new(types: &TypeContext, member: &StructMember) -> Self {
        Self {
            name: member.name.clone(),
            type_name: types.type_name(member.ty).to_owned(),
            semantic: member.semantic.clone(),
            array_size: member.array_size,
            size: types.size(member.ty) * member.array_size as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructReport {
    pub name: String,
    pub size: usize,
    pub members: Vec<MemberReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantBufferReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,
    pub size: usize,
    pub members: Vec<MemberReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    pub array_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    /// `None` for `void`.
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_semantic: Option<String>,
    pub parameters: Vec<MemberReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionReport {
    pub structs: Vec<StructReport>,
    pub constant_buffers: Vec<ConstantBufferReport>,
    pub resources: Vec<ResourceReport>,
    pub functions: Vec<FunctionReport>,
}

impl ReflectionReport {
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionReport> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| ShaderError::CacheWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl From<&ShaderReflection> for ReflectionReport {
    fn from(reflection: &ShaderReflection) -> Self {
        let types = &reflection.types;
        let members = |list: &[StructMember]| {
            list.iter()
                .map(|m| MemberReport::new(types, m))
                .collect::<Vec<_>>()
        };

        Self {
            structs: types
                .composites()
                .map(|(_, ty)| StructReport {
                    name: ty.name().to_owned(),
                    size: ty.size(),
                    members: members(ty.members()),
                })
                .collect(),
            constant_buffers: reflection
                .constant_buffers()
                .map(|cb| ConstantBufferReport {
                    name: cb.name.clone(),
                    register: cb.register.map(|r| r.to_string()),
                    size: cb.size,
                    members: members(&cb.members),
                })
                .collect(),
            resources: reflection
                .resources()
                .map(|res| ResourceReport {
                    name: res.name.clone(),
                    kind: res.kind.to_string(),
                    element_type: res.element_type.clone(),
                    array_size: res.array_size,
                    register: res.register.map(|r| r.to_string()),
                })
                .collect(),
            functions: reflection
                .functions()
                .map(|f| FunctionReport {
                    name: f.name.clone(),
                    return_type: f.return_type.map(|id| types.type_name(id).to_owned()),
                    return_semantic: f.return_semantic.clone(),
                    parameters: members(&f.parameters),
                })
                .collect(),
        }
    }
}
