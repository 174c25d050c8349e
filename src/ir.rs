// Closed, validated schema model. Built once by `lower`, read-only afterwards.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::error::Location;
use crate::naming::Names;

/// Index into [`Schema::types`]. Types are sorted by wire name, so ids are
/// stable for a given set of declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Any,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 9] = [
        ScalarKind::String,
        ScalarKind::Bool,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Uint32,
        ScalarKind::Uint64,
        ScalarKind::Float32,
        ScalarKind::Float64,
        ScalarKind::Any,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
            ScalarKind::Any => "any",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarKind::Int32 | ScalarKind::Int64 | ScalarKind::Uint32 | ScalarKind::Uint64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(ScalarKind),
    Named(TypeId),
    List(Box<TypeRef>),
    /// String-keyed map.
    Map(Box<TypeRef>),
    Nullable(Box<TypeRef>),
}

impl TypeRef {
    pub fn strip_nullable(&self) -> &TypeRef {
        match self {
            TypeRef::Nullable(inner) => inner,
            other => other,
        }
    }

    /// The named type reached without going through a list/map/nullable wrapper.
    pub fn by_value_target(&self) -> Option<TypeId> {
        match self {
            TypeRef::Named(id) => Some(*id),
            _ => None,
        }
    }

    /// Innermost named type, if any, looking through every wrapper.
    pub fn innermost_named(&self) -> Option<TypeId> {
        match self {
            TypeRef::Scalar(_) => None,
            TypeRef::Named(id) => Some(*id),
            TypeRef::List(inner) | TypeRef::Map(inner) | TypeRef::Nullable(inner) => {
                inner.innermost_named()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    pub id: TypeId,
    pub names: Names,
    pub kind: TypeKind,
    pub comments: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Struct(StructDef),
    Disjunction(Vec<Variant>),
    Alias(TypeRef),
    Enum(EnumDef),
}

#[derive(Debug, Clone, Default)]
pub struct StructDef {
    /// Declaration order.
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub names: Names,
    pub ty: TypeRef,
    pub required: bool,
    pub default: Option<Value>,
    /// Checked by builder setters before the value is stored.
    pub constraints: Vec<Constraint>,
    pub comments: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// String length, in characters.
    MinLength,
    MaxLength,
}

impl ConstraintOp {
    pub const ALL: [ConstraintOp; 8] = [
        ConstraintOp::Eq,
        ConstraintOp::NotEq,
        ConstraintOp::Lt,
        ConstraintOp::LtEq,
        ConstraintOp::Gt,
        ConstraintOp::GtEq,
        ConstraintOp::MinLength,
        ConstraintOp::MaxLength,
    ];

    /// Spelling used in schema documents.
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintOp::Eq => "==",
            ConstraintOp::NotEq => "!=",
            ConstraintOp::Lt => "<",
            ConstraintOp::LtEq => "<=",
            ConstraintOp::Gt => ">",
            ConstraintOp::GtEq => ">=",
            ConstraintOp::MinLength => "minLength",
            ConstraintOp::MaxLength => "maxLength",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Comparison operator shared by every target language.
    pub fn comparison(&self) -> &'static str {
        match self {
            ConstraintOp::MinLength => ">=",
            ConstraintOp::MaxLength => "<=",
            other => other.name(),
        }
    }

    pub fn is_length(&self) -> bool {
        matches!(self, ConstraintOp::MinLength | ConstraintOp::MaxLength)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub value: serde_json::Number,
}

impl Constraint {
    /// `must be >= 0`, `must have length <= 8`
    pub fn describe(&self) -> String {
        if self.op.is_length() {
            format!("must have length {} {}", self.op.comparison(), self.value)
        } else {
            format!("must be {} {}", self.op.comparison(), self.value)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub names: Names,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumValueKind {
    Int,
    Str,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub value_kind: EnumValueKind,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumValue {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub names: Names,
    pub value: EnumValue,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub package: String,
    pub types: Vec<TypeDef>,
    pub(crate) by_name: IndexMap<String, TypeId>,
}

impl Schema {
    pub fn get(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0]
    }

    pub fn lookup(&self, wire_name: &str) -> Option<&TypeDef> {
        self.by_name.get(wire_name).map(|id| self.get(*id))
    }

    pub fn structs(&self) -> impl Iterator<Item = (&TypeDef, &StructDef)> {
        self.types.iter().filter_map(|def| match &def.kind {
            TypeKind::Struct(s) => Some((def, s)),
            _ => None,
        })
    }

    /// Follow alias chains to the first non-alias type reference.
    pub fn resolve_alias<'a>(&'a self, ty: &'a TypeRef) -> &'a TypeRef {
        let mut current = ty;
        // lowering rejects alias cycles, the bound is only a guard
        for _ in 0..=self.types.len() {
            match current {
                TypeRef::Named(id) => match &self.get(*id).kind {
                    TypeKind::Alias(target) => current = target,
                    _ => return current,
                },
                _ => return current,
            }
        }
        current
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Struct(_))
    }

    /// The struct a value of `ty` is, looking through aliases and nullable
    /// wrappers but not through lists or maps.
    pub fn struct_target(&self, ty: &TypeRef) -> Option<TypeId> {
        match self.resolve_alias(ty) {
            TypeRef::Nullable(inner) => self.struct_target(inner),
            TypeRef::Named(id) if self.is_struct(*id) => Some(*id),
            _ => None,
        }
    }

    pub fn fields(&self, id: TypeId) -> &[FieldDef] {
        match &self.get(id).kind {
            TypeKind::Struct(s) => &s.fields,
            _ => &[],
        }
    }

    /// True when `from` can reach `to` without crossing a list or map.
    ///
    /// Nullable wrappers are followed: an `Option<T>` still stores `T`
    /// inline, so generated Rust must box such references.
    pub fn inline_reaches(&self, from: TypeId, to: TypeId) -> bool {
        let mut seen = vec![false; self.types.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            for ty in self.edges(id) {
                collect_inline(ty, &mut stack);
            }
        }
        false
    }

    /// Every type reference held directly by a definition.
    pub fn edges(&self, id: TypeId) -> Vec<&TypeRef> {
        match &self.get(id).kind {
            TypeKind::Struct(s) => s.fields.iter().map(|f| &f.ty).collect(),
            TypeKind::Disjunction(variants) => variants.iter().map(|v| &v.ty).collect(),
            TypeKind::Alias(target) => vec![target],
            TypeKind::Enum(_) => Vec::new(),
        }
    }

    pub fn describe(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Scalar(kind) => kind.name().to_string(),
            TypeRef::Named(id) => self.get(*id).names.wire.clone(),
            TypeRef::List(inner) => format!("list<{}>", self.describe(inner)),
            TypeRef::Map(inner) => format!("map<{}>", self.describe(inner)),
            TypeRef::Nullable(inner) => format!("nullable<{}>", self.describe(inner)),
        }
    }

    /// Debug view of the model, used by `cogjen ir`.
    pub fn to_json(&self) -> Value {
        let types: Vec<Value> = self
            .types
            .iter()
            .map(|def| {
                let mut out = json!({
                    "name": def.names.wire,
                    "identifiers": identifiers(&def.names),
                });
                match &def.kind {
                    TypeKind::Struct(s) => {
                        out["kind"] = Value::from("struct");
                        out["fields"] = Value::Array(
                            s.fields
                                .iter()
                                .map(|f| {
                                    let mut field = json!({
                                        "name": f.names.wire,
                                        "identifiers": identifiers(&f.names),
                                        "type": self.describe(&f.ty),
                                        "required": f.required,
                                    });
                                    if let Some(default) = &f.default {
                                        field["default"] = default.clone();
                                    }
                                    if !f.constraints.is_empty() {
                                        field["constraints"] = f
                                            .constraints
                                            .iter()
                                            .map(|c| json!({ "op": c.op.name(), "value": c.value }))
                                            .collect();
                                    }
                                    field
                                })
                                .collect(),
                        );
                    }
                    TypeKind::Disjunction(variants) => {
                        out["kind"] = Value::from("disjunction");
                        out["variants"] = Value::Array(
                            variants
                                .iter()
                                .map(|v| json!({ "label": v.names.wire, "type": self.describe(&v.ty) }))
                                .collect(),
                        );
                    }
                    TypeKind::Alias(target) => {
                        out["kind"] = Value::from("alias");
                        out["type"] = Value::from(self.describe(target));
                    }
                    TypeKind::Enum(e) => {
                        out["kind"] = Value::from("enum");
                        out["members"] = Value::Array(
                            e.members
                                .iter()
                                .map(|m| {
                                    let value = match &m.value {
                                        EnumValue::Int(i) => Value::from(*i),
                                        EnumValue::Str(s) => Value::from(s.clone()),
                                    };
                                    json!({ "name": m.names.wire, "value": value })
                                })
                                .collect(),
                        );
                    }
                }
                out
            })
            .collect();
        json!({ "package": self.package, "types": types })
    }
}

fn collect_inline(ty: &TypeRef, out: &mut Vec<TypeId>) {
    match ty {
        TypeRef::Named(id) => out.push(*id),
        TypeRef::Nullable(inner) => collect_inline(inner, out),
        TypeRef::Scalar(_) | TypeRef::List(_) | TypeRef::Map(_) => {}
    }
}

fn identifiers(names: &Names) -> Value {
    json!({
        "rust": names.rust,
        "python": names.python,
        "typescript": names.typescript,
    })
}
