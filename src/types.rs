//! Type System
//!
//! A [`TypeContext`] is the registry of every type a parse can reference.
//! It is seeded with the primitive shading-language types and grows as struct
//! definitions are parsed. Types live in an arena owned by the context and are
//! referenced by a copyable [`TypeId`]; nothing is ever removed.
//!
//! Struct members must reference types that already exist, so struct
//! definitions have to appear in dependency order.

use rustc_hash::FxHashMap;

/// Primitive types and their sizes in bytes.
const PRIMITIVES: &[(&str, usize)] = &[
    ("int", 4),
    ("int2", 8),
    ("int3", 12),
    ("int4", 16),
    ("uint", 4),
    ("uint2", 8),
    ("uint3", 12),
    ("uint4", 16),
    ("float", 4),
    ("scalar", 4),
    ("bool", 4),
    ("double", 8),
    ("float2", 8),
    ("float3", 12),
    ("float4", 16),
    ("vector", 16),
    ("double2", 16),
    ("double3", 24),
    ("double4", 32),
    ("float2x2", 16),
    ("float3x3", 32),
    ("float4x4", 64),
    ("matrix", 64),
];

/// Handle to a [`MemberType`] inside its [`TypeContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named member of a struct, constant buffer or parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub ty: TypeId,
    pub name: String,
    /// Binding tag, e.g. `POSITION` or `SV_Target`.
    pub semantic: Option<String>,
    /// Element count; 1 for non-array members.
    pub array_size: u32,
}

/// Unresolved member description, as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMemberInfo {
    pub type_name: String,
    pub name: String,
    pub semantic: Option<String>,
    pub array_size: u32,
}

impl StructMemberInfo {
    #[must_use]
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            semantic: None,
            array_size: 1,
        }
    }

    #[must_use]
    pub fn with_semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    #[must_use]
    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberType {
    /// Primitive type with a fixed size.
    Basic { name: String, size: usize },
    /// Struct type. `size` is computed once at definition.
    Composite {
        name: String,
        members: Vec<StructMember>,
        size: usize,
    },
}

impl MemberType {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MemberType::Basic { name, .. } | MemberType::Composite { name, .. } => name,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            MemberType::Basic { size, .. } | MemberType::Composite { size, .. } => *size,
        }
    }

    #[must_use]
    pub fn is_basic(&self) -> bool {
        matches!(self, MemberType::Basic { .. })
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, MemberType::Composite { .. })
    }

    /// Struct members in declaration order. Empty for basic types.
    #[must_use]
    pub fn members(&self) -> &[StructMember] {
        match self {
            MemberType::Basic { .. } => &[],
            MemberType::Composite { members, .. } => members,
        }
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members().len()
    }
}

/// Arena of every [`MemberType`] known to one parse.
#[derive(Debug, Clone)]
pub struct TypeContext {
    types: Vec<MemberType>,
    by_name: FxHashMap<String, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    /// Create a context holding only the primitive types.
    #[must_use]
    pub fn new() -> Self {
        let mut ctx = Self {
            types: Vec::with_capacity(PRIMITIVES.len() + 8),
            by_name: FxHashMap::default(),
        };

        for &(name, size) in PRIMITIVES {
            ctx.insert(MemberType::Basic {
                name: name.to_owned(),
                size,
            });
        }

        ctx
    }

    #[must_use]
    pub fn is_type(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    #[must_use]
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Look up a type by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MemberType> {
        self.type_id(name).map(|id| self.get(id))
    }

    /// Resolve a handle. Handles are only minted by this context, so every
    /// id it returned stays valid.
    #[must_use]
    pub fn get(&self, id: TypeId) -> &MemberType {
        &self.types[id.index()]
    }

    #[must_use]
    pub fn type_name(&self, id: TypeId) -> &str {
        self.get(id).name()
    }

    #[must_use]
    pub fn size(&self, id: TypeId) -> usize {
        self.get(id).size()
    }

    #[must_use]
    pub fn is_basic(&self, id: TypeId) -> bool {
        self.get(id).is_basic()
    }

    #[must_use]
    pub fn is_composite(&self, id: TypeId) -> bool {
        self.get(id).is_composite()
    }

    #[must_use]
    pub fn members(&self, id: TypeId) -> &[StructMember] {
        self.get(id).members()
    }

    #[must_use]
    pub fn member_count(&self, id: TypeId) -> usize {
        self.get(id).member_count()
    }

    /// Number of registered types, primitives included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// User-defined struct types in definition order.
    pub fn composites(&self) -> impl Iterator<Item = (TypeId, &MemberType)> {
        self.types
            .iter()
            .enumerate()
            .filter(|(_, ty)| ty.is_composite())
            .map(|(i, ty)| (TypeId(i as u32), ty))
    }

    /// Resolve a member description against the registered types.
    #[must_use]
    pub fn resolve_member(&self, info: &StructMemberInfo) -> Option<StructMember> {
        Some(StructMember {
            ty: self.type_id(&info.type_name)?,
            name: info.name.clone(),
            semantic: info.semantic.clone(),
            array_size: info.array_size,
        })
    }

    /// Total size in bytes of a resolved member list.
    #[must_use]
    pub fn members_size(&self, members: &[StructMember]) -> usize {
        members
            .iter()
            .map(|m| self.size(m.ty) * m.array_size as usize)
            .sum()
    }

    /// Register a struct type.
    ///
    /// Returns `None` without touching the context if `name` is already
    /// registered or any member type does not resolve.
    pub fn define_type(&mut self, name: &str, members: &[StructMemberInfo]) -> Option<TypeId> {
        if self.is_type(name) {
            return None;
        }

        let members = members
            .iter()
            .map(|info| self.resolve_member(info))
            .collect::<Option<Vec<_>>>()?;

        let size = self.members_size(&members);

        Some(self.insert(MemberType::Composite {
            name: name.to_owned(),
            members,
            size,
        }))
    }

    fn insert(&mut self, ty: MemberType) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.by_name.insert(ty.name().to_owned(), id);
        self.types.push(ty);
        id
    }
}
