//! Metadata Parser
//!
//! A single-pass recursive-descent parser that extracts the external
//! interface of a shader from preprocessed source text:
//!
//! - `struct` definitions, registered in the [`TypeContext`](crate::types::TypeContext)
//! - `cbuffer`/`tbuffer` declarations with optional `register(bN)` bindings
//! - texture, buffer and sampler declarations with optional `register(tN)`
//! - function signatures (candidate stage entry points)
//!
//! Function bodies are skipped by counting braces and never interpreted.
//! Top-level tokens that start none of the above are ignored, and an unknown
//! template type such as `RWTexture3D<float4> t;` is skipped with its
//! statement. Any error aborts the whole parse; no partial result is
//! returned.

pub mod declarations;

use std::collections::BTreeMap;

pub use declarations::{
    ConstantsDeclaration, FunctionDeclaration, Register, ResourceDeclaration, ResourceKind,
    ShaderReflection,
};

use crate::errors::{Result, ShaderError};
use crate::scanner::{Scanner, TokenKind};
use crate::types::{StructMember, StructMemberInfo};

/// Keywords accepted and ignored in front of a member or parameter type.
const TYPE_MODIFIERS: &[&str] = &[
    "in",
    "out",
    "inout",
    "uniform",
    "const",
    "linear",
    "centroid",
    "nointerpolation",
    "noperspective",
    "row_major",
    "column_major",
    "precise",
];

/// Geometry shader input primitive types, written in front of a parameter.
const PRIMITIVE_MODIFIERS: &[&str] = &["point", "line", "triangle", "lineadj", "triangleadj"];

/// Stream-output and patch parameter types. Accepted but not reflected.
const STAGE_IO_TYPES: &[&str] = &[
    "PointStream",
    "LineStream",
    "TriangleStream",
    "InputPatch",
    "OutputPatch",
];

const CBUFFER_REGISTERS: &str = "bt";
const RESOURCE_REGISTERS: &str = "tsu";

pub struct ShaderParser<'a> {
    scan: Scanner<'a>,
    out: ShaderReflection,
}

impl<'a> ShaderParser<'a> {
    /// Parse preprocessed shader text.
    pub fn parse(source: &'a str) -> Result<ShaderReflection> {
        let mut parser = Self {
            scan: Scanner::new(source),
            out: ShaderReflection::default(),
        };

        parser.parse_declarations()?;

        Ok(parser.out)
    }

    fn parse_declarations(&mut self) -> Result<()> {
        while self.scan.has_next() {
            let token = self.scan.peek();

            match token.kind {
                TokenKind::Struct => self.parse_struct()?,
                TokenKind::CBuffer => self.parse_constants()?,
                TokenKind::Identifier => {
                    if let Some(kind) = ResourceKind::from_keyword(&token.text) {
                        self.parse_resource(kind)?;
                    } else if token.is("void") || self.out.types.is_type(&token.text) {
                        self.parse_function()?;
                    } else {
                        self.scan.next_token();
                        if self.scan.peek().is("<") {
                            self.parse_template_argument()?;
                            self.skip_statement(token.line)?;
                        }
                    }
                }
                _ => {
                    self.scan.next_token();
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Structs & Constant Buffers
    // ========================================================================

    fn parse_struct(&mut self) -> Result<()> {
        let line = self.scan.try_next(TokenKind::Struct)?.line;
        let name = self.scan.try_next(TokenKind::Identifier)?.text;

        let members = self.parse_member_list()?;
        self.scan.try_next(TokenKind::Semicolon)?;

        if self.out.types.is_type(&name) {
            return Err(ShaderError::parse(line, format!("redefinition of type \"{name}\"")));
        }

        match self.out.types.define_type(&name, &members) {
            Some(_) => Ok(()),
            None => Err(self.unresolved(&members, line)),
        }
    }

    fn parse_constants(&mut self) -> Result<()> {
        let line = self.scan.try_next(TokenKind::CBuffer)?.line;
        let name = self.scan.try_next(TokenKind::Identifier)?.text;

        let register = if self.scan.next_if(TokenKind::Colon) {
            Some(self.parse_register(CBUFFER_REGISTERS)?)
        } else {
            None
        };

        let infos = self.parse_member_list()?;
        self.scan.next_if(TokenKind::Semicolon);

        let members = self.resolve_members(&infos, line)?;
        let size = self.out.types.members_size(&members);

        let decl = ConstantsDeclaration {
            name: name.clone(),
            register,
            members,
            size,
            line,
        };
        insert_first(&mut self.out.constants, name, decl, "constant buffer");

        Ok(())
    }

    /// `{ member; member; ... }`
    fn parse_member_list(&mut self) -> Result<Vec<StructMemberInfo>> {
        self.scan.try_next(TokenKind::BlockOpen)?;

        let mut members = Vec::new();
        while !self.scan.next_if(TokenKind::BlockClose) {
            members.push(self.parse_member()?);
            self.scan.try_next(TokenKind::Semicolon)?;
        }

        Ok(members)
    }

    /// `[modifiers] type name [ '[' N ']' ] [: SEMANTIC]`
    fn parse_member(&mut self) -> Result<StructMemberInfo> {
        self.skip_modifiers(TYPE_MODIFIERS);

        let type_name = self.scan.try_next(TokenKind::Identifier)?.text;
        let name = self.scan.try_next(TokenKind::Identifier)?.text;
        let mut member = StructMemberInfo::new(type_name, name);

        if let Some(size) = self.parse_array_size()? {
            member.array_size = size;
        }

        if self.scan.next_if(TokenKind::Colon) {
            member.semantic = Some(self.scan.try_next(TokenKind::Identifier)?.text);
        }

        Ok(member)
    }

    fn parse_array_size(&mut self) -> Result<Option<u32>> {
        if !self.scan.next_if(TokenKind::SquareOpen) {
            return Ok(None);
        }

        let token = self.scan.try_next(TokenKind::Integer)?;
        let size = token
            .text
            .parse::<u32>()
            .map_err(|_| ShaderError::parse(token.line, format!("invalid array size \"{token}\"")))?;

        self.scan.try_next(TokenKind::SquareClose)?;
        Ok(Some(size))
    }

    fn skip_modifiers(&mut self, modifiers: &[&str]) {
        loop {
            let token = self.scan.peek();
            if token.kind != TokenKind::Identifier || !modifiers.contains(&token.text.as_str()) {
                break;
            }
            self.scan.next_token();
        }
    }

    // ========================================================================
    // Resources
    // ========================================================================

    fn parse_resource(&mut self, kind: ResourceKind) -> Result<()> {
        let line = self.scan.next_token().line;

        let element_type = self.parse_template_argument()?;
        let name = self.scan.try_next(TokenKind::Identifier)?.text;
        let array_size = self.parse_array_size()?.unwrap_or(1);

        let register = if self.scan.next_if(TokenKind::Colon) {
            Some(self.parse_register(RESOURCE_REGISTERS)?)
        } else {
            None
        };

        self.scan.try_next(TokenKind::Semicolon)?;

        let decl = ResourceDeclaration {
            name: name.clone(),
            kind,
            element_type,
            array_size,
            register,
            line,
        };
        insert_first(&mut self.out.resources, name, decl, "resource");

        Ok(())
    }

    /// `<float4>` after a resource type keyword. Nested `<...>` pairs are
    /// kept in the argument text.
    fn parse_template_argument(&mut self) -> Result<Option<String>> {
        if !self.scan.peek().is("<") {
            return Ok(None);
        }
        self.scan.next_token();

        let mut argument = String::new();
        let mut depth = 1usize;
        loop {
            let token = self.scan.next_token();
            if token.is_empty() {
                return Err(ShaderError::parse(token.line, "unterminated template argument"));
            }
            if token.is("<") {
                depth += 1;
            } else if token.is(">") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            argument.push_str(&token.text);
        }

        Ok(Some(argument))
    }

    /// `register(<prefix><slot>)`; the leading `:` is already consumed.
    fn parse_register(&mut self, prefixes: &str) -> Result<Register> {
        self.scan.try_next(TokenKind::Register)?;
        self.scan.try_next(TokenKind::BracketOpen)?;

        let token = self.scan.try_next(TokenKind::Identifier)?;
        let mut chars = token.text.chars();

        let prefix = chars.next().filter(|c| prefixes.contains(*c)).ok_or_else(|| {
            ShaderError::parse(
                token.line,
                format!("invalid register \"{token}\", expected one of \"{prefixes}\""),
            )
        })?;

        let slot = chars.as_str().parse::<u16>().map_err(|_| {
            ShaderError::parse(token.line, format!("invalid register slot in \"{token}\""))
        })?;

        self.scan.try_next(TokenKind::BracketClose)?;

        Ok(Register::new(prefix, slot))
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// `type name ( params ) [: SEMANTIC] { body }`
    ///
    /// A `type name` pair not followed by `(` is a global variable and is
    /// skipped up to its `;`.
    fn parse_function(&mut self) -> Result<()> {
        let return_token = self.scan.next_token();
        let line = return_token.line;

        let return_type = if return_token.is("void") {
            None
        } else {
            let id = self.out.types.type_id(&return_token.text).ok_or_else(|| {
                ShaderError::parse(line, format!("unknown type \"{return_token}\""))
            })?;
            Some(id)
        };

        let name = self.scan.try_next(TokenKind::Identifier)?.text;

        if !self.scan.is_next(TokenKind::BracketOpen) {
            return self.skip_statement(line);
        }

        let parameters = self.parse_parameters()?;

        let return_semantic = if self.scan.next_if(TokenKind::Colon) {
            Some(self.scan.try_next(TokenKind::Identifier)?.text)
        } else {
            None
        };

        // Prototypes have no body.
        if !self.scan.next_if(TokenKind::Semicolon) {
            self.scan.try_next(TokenKind::BlockOpen)?;
            self.skip_body(&name, line)?;
        }

        let decl = FunctionDeclaration {
            name: name.clone(),
            return_type,
            return_semantic,
            parameters,
            line,
        };
        insert_first(&mut self.out.functions, name, decl, "function");

        Ok(())
    }

    /// Resource, stream and patch parameters are accepted but not reflected.
    fn parse_parameters(&mut self) -> Result<Vec<StructMember>> {
        self.scan.try_next(TokenKind::BracketOpen)?;

        let mut parameters = Vec::new();

        if self.scan.next_if(TokenKind::BracketClose) {
            return Ok(parameters);
        }
        if self.scan.peek().is("void") {
            self.scan.next_token();
            self.scan.try_next(TokenKind::BracketClose)?;
            return Ok(parameters);
        }

        loop {
            self.skip_modifiers(TYPE_MODIFIERS);
            self.skip_modifiers(PRIMITIVE_MODIFIERS);

            let next = self.scan.peek();
            if ResourceKind::from_keyword(&next.text).is_some()
                || STAGE_IO_TYPES.contains(&next.text.as_str())
            {
                self.scan.next_token();
                self.parse_template_argument()?;
                self.scan.try_next(TokenKind::Identifier)?;
                self.parse_array_size()?;
                if self.scan.next_if(TokenKind::Colon) {
                    self.scan.try_next(TokenKind::Identifier)?;
                }
            } else {
                let info = self.parse_member()?;
                let param = self
                    .out
                    .types
                    .resolve_member(&info)
                    .ok_or_else(|| unknown_type(&info, next.line))?;
                parameters.push(param);
            }

            if !self.scan.next_if(TokenKind::Comma) {
                break;
            }
        }

        self.scan.try_next(TokenKind::BracketClose)?;

        Ok(parameters)
    }

    /// Discard tokens up to the `}` matching an already consumed `{`.
    fn skip_body(&mut self, function: &str, line: u32) -> Result<()> {
        let mut depth = 1usize;

        while depth > 0 {
            let token = self.scan.next_token();
            match token.kind {
                TokenKind::BlockOpen => depth += 1,
                TokenKind::BlockClose => depth -= 1,
                TokenKind::Empty => {
                    return Err(ShaderError::parse(
                        line,
                        format!("unexpected end of input in body of \"{function}\""),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn skip_statement(&mut self, line: u32) -> Result<()> {
        loop {
            match self.scan.next_token().kind {
                TokenKind::Semicolon => return Ok(()),
                TokenKind::Empty => {
                    return Err(ShaderError::parse(line, "unterminated global declaration"));
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn resolve_members(&self, infos: &[StructMemberInfo], line: u32) -> Result<Vec<StructMember>> {
        infos
            .iter()
            .map(|info| {
                self.out
                    .types
                    .resolve_member(info)
                    .ok_or_else(|| unknown_type(info, line))
            })
            .collect()
    }

    fn unresolved(&self, infos: &[StructMemberInfo], line: u32) -> ShaderError {
        infos
            .iter()
            .find(|info| !self.out.types.is_type(&info.type_name))
            .map_or_else(
                || ShaderError::parse(line, "invalid struct definition"),
                |info| unknown_type(info, line),
            )
    }
}

fn unknown_type(info: &StructMemberInfo, line: u32) -> ShaderError {
    ShaderError::parse(
        line,
        format!("unknown type \"{}\" for \"{}\"", info.type_name, info.name),
    )
}

/// Keep the first declaration of a name.
fn insert_first<T>(map: &mut BTreeMap<String, T>, name: String, decl: T, what: &str) {
    if map.contains_key(&name) {
        log::warn!("Duplicate {what} \"{name}\" ignored");
        return;
    }
    map.insert(name, decl);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_definition() {
        let src = "struct VSInput { float a; int b; float4 c : COLOR; };";
        let reflection = ShaderParser::parse(src).unwrap();

        let ty = reflection.types.lookup("VSInput").unwrap();
        assert_eq!(ty.size(), 24);
        assert_eq!(ty.member_count(), 3);
        assert_eq!(ty.members()[2].semantic.as_deref(), Some("COLOR"));
    }

    #[test]
    fn test_duplicate_struct_fails() {
        let src = "struct S { float a; }; struct S { float4 a; };";
        let err = ShaderParser::parse(src).unwrap_err();
        assert!(matches!(err, ShaderError::Parse { .. }));
    }

    #[test]
    fn test_unknown_member_type_fails() {
        let err = ShaderParser::parse("struct S { half a; };").unwrap_err();
        assert!(err.to_string().contains("half"));
    }

    #[test]
    fn test_constant_buffer() {
        let src = "
            cbuffer Scene : register(b1)
            {
                float4x4 viewProj;
                float4 lights[4];
            };
            tbuffer Extra { uint count; }
        ";
        let reflection = ShaderParser::parse(src).unwrap();

        let scene = reflection.constant_buffer("Scene").unwrap();
        assert_eq!(scene.register, Some(Register::new('b', 1)));
        assert_eq!(scene.members.len(), 2);
        assert_eq!(scene.members[1].array_size, 4);
        assert_eq!(scene.size, 128);
        assert_eq!(scene.line, 2);

        assert!(reflection.is_constant_buffer("Extra"));
        assert_eq!(reflection.constant_buffer("Extra").unwrap().register, None);
    }

    #[test]
    fn test_resources() {
        let src = "
            Texture2D<float4> albedo : register(t0);
            TextureCube sky;
            SamplerState linearSampler : register(s2);
            Texture2D shadowMaps[3] : register(t4);
        ";
        let reflection = ShaderParser::parse(src).unwrap();

        let albedo = reflection.resource("albedo").unwrap();
        assert_eq!(albedo.kind, ResourceKind::Texture2D);
        assert_eq!(albedo.element_type.as_deref(), Some("float4"));
        assert_eq!(albedo.register, Some(Register::new('t', 0)));

        assert_eq!(reflection.resource("sky").unwrap().register, None);
        assert!(reflection.resource("linearSampler").unwrap().kind.is_sampler());
        assert_eq!(reflection.resource("shadowMaps").unwrap().array_size, 3);
        assert_eq!(reflection.resources().count(), 4);
    }

    #[test]
    fn test_register_prefix_checked() {
        let err = ShaderParser::parse("cbuffer C : register(t0x) { float a; };").unwrap_err();
        assert!(err.to_string().contains("slot"));

        let err = ShaderParser::parse("Texture2D t : register(b0);").unwrap_err();
        assert!(err.to_string().contains("invalid register"));
    }

    #[test]
    fn test_function_signature() {
        let src = "
            struct PSInput { float4 pos : SV_Position; float2 uv : TEXCOORD0; };

            float4 PS(PSInput input, in float2 offset : TEXCOORD1) : SV_Target
            {
                if (input.uv.x > 0.5) { return float4(1, 0, 0, 1); }
                return float4(offset, 0, 1);
            }

            void Nothing() {}
        ";
        let reflection = ShaderParser::parse(src).unwrap();

        let ps = reflection.function("PS").unwrap();
        assert_eq!(ps.return_semantic.as_deref(), Some("SV_Target"));
        assert_eq!(ps.parameters.len(), 2);
        assert_eq!(reflection.types.type_name(ps.parameters[0].ty), "PSInput");
        assert_eq!(ps.parameters[1].semantic.as_deref(), Some("TEXCOORD1"));
        assert_eq!(reflection.types.type_name(ps.return_type.unwrap()), "float4");

        let nothing = reflection.function("Nothing").unwrap();
        assert_eq!(nothing.return_type, None);
        assert!(nothing.parameters.is_empty());
        assert!(!reflection.is_function("PSInput"));
    }

    #[test]
    fn test_resource_parameters_are_skipped() {
        let src = "float4 Sample(Texture2D<float4> tex, SamplerState s, float2 uv) { return 0; }";
        let reflection = ShaderParser::parse(src).unwrap();
        assert_eq!(reflection.function("Sample").unwrap().parameters.len(), 1);
    }

    #[test]
    fn test_geometry_shader_signature() {
        let src = "
            struct V { float4 pos : SV_Position; };

            [maxvertexcount(3)]
            void GS(triangle V input[3], inout TriangleStream<V> stream)
            {
                stream.Append(input[0]);
            }

            [maxvertexcount(2)]
            void GSLines(lineadj V input[4], inout LineStream<V> stream) { }

            [maxvertexcount(1)]
            void GSPoints(point V input[1], inout PointStream<V> stream) { }
        ";
        let reflection = ShaderParser::parse(src).unwrap();

        let gs = reflection.function("GS").unwrap();
        assert_eq!(gs.parameters.len(), 1);
        assert_eq!(gs.parameters[0].name, "input");
        assert_eq!(gs.parameters[0].array_size, 3);
        assert_eq!(reflection.types.type_name(gs.parameters[0].ty), "V");

        assert_eq!(reflection.function("GSLines").unwrap().parameters[0].array_size, 4);
        assert!(reflection.is_function("GSPoints"));
    }

    #[test]
    fn test_tessellation_signatures() {
        let src = r#"
            struct VSOut { float4 pos : SV_Position; };
            struct PatchTess { float edges[3] : SV_TessFactor; float inside : SV_InsideTessFactor; };

            PatchTess Constants(InputPatch<VSOut, 3> patch, uint id : SV_PrimitiveID)
            {
                PatchTess t;
                return t;
            }

            [domain("tri")]
            [partitioning("fractional_odd")]
            [outputtopology("triangle_cw")]
            [outputcontrolpoints(3)]
            [patchconstantfunc("Constants")]
            VSOut HS(InputPatch<VSOut, 3> patch, uint i : SV_OutputControlPointID)
            {
                return patch[i];
            }

            [domain("tri")]
            VSOut DS(PatchTess tess, float3 bary : SV_DomainLocation, const OutputPatch<VSOut, 3> patch)
            {
                VSOut o;
                return o;
            }
        "#;
        let reflection = ShaderParser::parse(src).unwrap();

        let hs = reflection.function("HS").unwrap();
        assert_eq!(hs.parameters.len(), 1);
        assert_eq!(hs.parameters[0].semantic.as_deref(), Some("SV_OutputControlPointID"));

        let ds = reflection.function("DS").unwrap();
        assert_eq!(ds.parameters.len(), 2);
        assert_eq!(reflection.types.type_name(ds.parameters[0].ty), "PatchTess");

        assert_eq!(reflection.function("Constants").unwrap().parameters.len(), 1);
    }

    #[test]
    fn test_unknown_template_resources_skipped() {
        let src = "
            RWTexture2DArray<float4> outTex : register(u0);
            AppendStructuredBuffer<uint> visible;
            RWStructuredBuffer<vector<float, 4>> points : register(u1);
            Texture2D<float4> albedo : register(t0);
            [numthreads(8, 8, 1)]
            void CS(uint3 id : SV_DispatchThreadID) { }
        ";
        let reflection = ShaderParser::parse(src).unwrap();

        assert!(!reflection.is_resource("outTex"));
        assert!(!reflection.is_resource("visible"));
        assert_eq!(
            reflection.resource("points").unwrap().element_type.as_deref(),
            Some("vector<float,4>")
        );
        assert!(reflection.is_resource("albedo"));
        assert!(reflection.is_function("CS"));
    }

    #[test]
    fn test_unbalanced_body_fails() {
        let err = ShaderParser::parse("float4 VS() { { return 0; }").unwrap_err();
        assert!(matches!(err, ShaderError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_unknown_parameter_type_fails() {
        let err = ShaderParser::parse("float4 VS(Missing m) { }").unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_globals_and_unknown_tokens_skipped() {
        let src = "
            static const float PI = 3.14159;
            float3 offsets[2] = { float3(1, 0, 0), float3(0, 1, 0) };
            [numthreads(8, 8, 1)]
            void CS(uint3 id : SV_DispatchThreadID) { }
        ";
        let reflection = ShaderParser::parse(src).unwrap();

        assert_eq!(reflection.functions().count(), 1);
        assert!(reflection.is_function("CS"));
    }

    #[test]
    fn test_duplicate_function_keeps_first() {
        let src = "float4 F(float a); float4 F(float a, float b) { return 0; }";
        let reflection = ShaderParser::parse(src).unwrap();
        assert_eq!(reflection.function("F").unwrap().parameters.len(), 1);
    }
}
