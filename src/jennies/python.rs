//! Python target: one models module and one builders module per package,
//! plus the small `cog.runtime` support module they import.
use serde_json::Value;

use super::{Context, File, Files, Jenny, Writer, GENERATED_HEADER};
use crate::builders::{
    resolve_path, tracked_required, Argument, AssignmentMethod, AssignmentValue, BuilderOption, BuilderSpec, Builders,
};
use crate::error::Result;
use crate::ir::{EnumDef, EnumValue, FieldDef, ScalarKind, Schema, StructDef, TypeDef, TypeKind, TypeRef, Variant};
use crate::naming::snake_case;

const INDENT: &str = "    ";

pub struct RuntimeJenny;
pub struct ModelsJenny;
pub struct BuildersJenny;

impl Jenny for RuntimeJenny {
    fn name(&self) -> &'static str {
        "PythonRuntime"
    }

    fn generate(&self, _ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        files.push(File::new("__init__.py", init_file(), self.name()));
        files.push(File::new("cog/__init__.py", init_file(), self.name()));
        files.push(File::new("cog/runtime.py", format!("# {GENERATED_HEADER}\n{RUNTIME}"), self.name()));
        Ok(files)
    }
}

impl Jenny for ModelsJenny {
    fn name(&self) -> &'static str {
        "PythonModels"
    }

    fn generate(&self, ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        files.push(File::new("models/__init__.py", init_file(), self.name()));
        for package in &ctx.packages {
            let schema = package.schema;
            files.push(File::new(format!("models/{}.py", schema.package), models_module(schema), self.name()));
        }
        Ok(files)
    }
}

impl Jenny for BuildersJenny {
    fn name(&self) -> &'static str {
        "PythonBuilders"
    }

    fn generate(&self, ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        files.push(File::new("builders/__init__.py", init_file(), self.name()));
        for package in &ctx.packages {
            let schema = package.schema;
            files.push(File::new(
                format!("builders/{}.py", schema.package),
                builders_module(schema, package.builders),
                self.name(),
            ));
        }
        Ok(files)
    }
}

const RUNTIME: &str = r#"from __future__ import annotations

import enum
import json
import typing

T = typing.TypeVar("T")


class TypeMismatchError(TypeError):
    def __init__(self, subject: str, expected: str, value: object) -> None:
        super().__init__(f"{subject}: expected {expected}, got {type(value).__name__}")
        self.subject = subject
        self.expected = expected
        self.value = value


class ConstraintError(ValueError):
    def __init__(self, subject: str, message: str, value: object) -> None:
        super().__init__(f"{subject} {message}, got {value!r}")
        self.subject = subject
        self.value = value


class BuildError(ValueError):
    def __init__(self, type_name: str, missing: list[str]) -> None:
        super().__init__(f"{type_name}: required fields never set: {', '.join(missing)}")
        self.type_name = type_name
        self.missing = missing


class Builder(typing.Generic[T]):
    def build(self) -> T:
        raise NotImplementedError()


def resolve(value: typing.Any) -> typing.Any:
    if isinstance(value, Builder):
        return value.build()
    return value


def to_json(value: typing.Any) -> typing.Any:
    if isinstance(value, enum.Enum):
        return value.value
    if isinstance(value, list):
        return [to_json(item) for item in value]
    if isinstance(value, dict):
        return {key: to_json(item) for key, item in value.items()}
    if hasattr(value, "to_json"):
        return value.to_json()
    return value


class JSONEncoder(json.JSONEncoder):
    def __init__(
        self,
        *,
        sort_keys: bool = True,
        indent: typing.Optional[int] = 2,
        **kwargs: typing.Any,
    ) -> None:
        if indent is not None and indent > 0:
            super().__init__(sort_keys=sort_keys, indent=indent, **kwargs)
        else:
            if kwargs.get("separators") is None:
                kwargs["separators"] = (",", ":")
            super().__init__(sort_keys=sort_keys, **kwargs)

    def default(self, o: typing.Any) -> typing.Any:
        if isinstance(o, enum.Enum) or hasattr(o, "to_json"):
            return to_json(o)
        return super().default(o)
"#;

fn init_file() -> String {
    format!("# {GENERATED_HEADER}\n")
}

// ————————————————————————————————————————————————————————————————————————————
// MODELS
// ————————————————————————————————————————————————————————————————————————————

fn models_module(schema: &Schema) -> String {
    let mut w = Writer::new(INDENT);
    w.line(0, format!("# {GENERATED_HEADER}"));
    w.line(0, "from __future__ import annotations");
    w.blank();
    w.line(0, "import enum");
    w.line(0, "import typing");
    w.blank();
    w.line(0, "from ..cog import runtime as cogruntime");
    for def in &schema.types {
        w.blank();
        w.blank();
        match &def.kind {
            TypeKind::Struct(s) => write_class(&mut w, schema, def, s),
            TypeKind::Enum(e) => write_enum(&mut w, def, e),
            TypeKind::Disjunction(variants) => write_disjunction(&mut w, schema, def, variants),
            TypeKind::Alias(target) => write_alias(&mut w, schema, def, target),
        }
    }
    w.finish()
}

fn write_class(w: &mut Writer, schema: &Schema, def: &TypeDef, s: &StructDef) {
    let name = &def.names.python;
    w.line(0, format!("class {name}:"));
    docstring(w, 1, &def.comments);
    for field in &s.fields {
        w.line(1, format!("{}: {}", field.names.python, field_type(schema, field, "")));
    }
    if !s.fields.is_empty() {
        w.blank();
    }

    if s.fields.is_empty() {
        w.line(1, "def __init__(self) -> None:");
        w.line(2, "pass");
    } else {
        w.line(1, "def __init__(");
        w.line(2, "self,");
        for field in &s.fields {
            let ty = py_type(schema, strip_nullable(&field.ty), "");
            w.line(2, format!("{}: typing.Optional[{ty}] = None,", field.names.python));
        }
        w.line(1, ") -> None:");
        for field in &s.fields {
            let ident = &field.names.python;
            let fallback = match &field.default {
                Some(default) => literal(schema, &field.ty, default, ""),
                None if field.required => zero_value(schema, &field.ty, ""),
                None => "None".to_string(),
            };
            if fallback == "None" {
                w.line(2, format!("self.{ident} = {ident}"));
            } else {
                w.line(2, format!("self.{ident} = {ident} if {ident} is not None else {fallback}"));
            }
        }
    }

    w.blank();
    w.line(1, "def to_json(self) -> dict[str, object]:");
    w.line(2, "payload: dict[str, object] = {}");
    for field in &s.fields {
        let ident = &field.names.python;
        let wire = json_string(&field.names.wire);
        if field.required {
            w.line(2, format!("payload[{wire}] = cogruntime.to_json(self.{ident})"));
        } else {
            w.line(2, format!("if self.{ident} is not None:"));
            w.line(3, format!("payload[{wire}] = cogruntime.to_json(self.{ident})"));
        }
    }
    w.line(2, "return payload");

    w.blank();
    w.line(1, "@classmethod");
    w.line(1, "def from_json(cls, data: dict[str, typing.Any]) -> typing.Self:");
    w.line(2, "args: dict[str, typing.Any] = {}");
    for field in &s.fields {
        let wire = json_string(&field.names.wire);
        w.line(2, format!("if {wire} in data:"));
        let value = format!("data[{wire}]");
        let decoded = decode_expr(schema, &field.ty, &value, 0);
        w.line(3, format!("args[{:?}] = {decoded}", field.names.python));
    }
    w.line(2, "return cls(**args)");

    w.blank();
    w.line(1, "def __eq__(self, other: object) -> bool:");
    w.line(2, format!("return isinstance(other, {name}) and vars(self) == vars(other)"));
    w.blank();
    w.line(1, "def __repr__(self) -> str:");
    w.line(2, format!("return f\"{name}({{vars(self)!r}})\""));
}

fn write_enum(w: &mut Writer, def: &TypeDef, e: &EnumDef) {
    w.line(0, format!("class {}(enum.Enum):", def.names.python));
    docstring(w, 1, &def.comments);
    for member in &e.members {
        let value = match &member.value {
            EnumValue::Int(i) => i.to_string(),
            EnumValue::Str(s) => json_string(s),
        };
        w.line(1, format!("{} = {value}", member.names.python));
    }
}

fn write_disjunction(w: &mut Writer, schema: &Schema, def: &TypeDef, variants: &[Variant]) {
    let name = &def.names.python;
    let union: Vec<String> = variants.iter().map(|v| py_type(schema, &v.ty, "")).collect();
    w.line(0, format!("{name}: typing.TypeAlias = \"typing.Union[{}]\"", union.join(", ")));
    w.blank();
    w.blank();
    w.line(0, format!("def is_{}(value: typing.Any) -> bool:", snake_case(name)));
    let checks: Vec<String> = variants.iter().map(|v| py_check(schema, &v.ty, "value", 0, "")).collect();
    w.line(1, format!("return {}", checks.join(" or ")));
    w.blank();
    w.blank();
    w.line(0, format!("def decode_{}(data: typing.Any) -> {name}:", snake_case(name)));
    for variant in variants {
        w.line(1, format!("if {}:", json_check(schema, &variant.ty, "data")));
        w.line(2, format!("return {}", decode_expr(schema, &variant.ty, "data", 0)));
    }
    w.line(1, format!("raise cogruntime.TypeMismatchError({:?}, {:?}, data)", def.names.wire, def.names.wire));
}

fn write_alias(w: &mut Writer, schema: &Schema, def: &TypeDef, target: &TypeRef) {
    let name = &def.names.python;
    w.line(0, format!("{name}: typing.TypeAlias = \"{}\"", py_type(schema, target, "")));
    w.blank();
    w.blank();
    w.line(0, format!("def is_{}(value: typing.Any) -> bool:", snake_case(name)));
    w.line(1, format!("return {}", py_check(schema, target, "value", 0, "")));
    w.blank();
    w.blank();
    w.line(0, format!("def decode_{}(data: typing.Any) -> {name}:", snake_case(name)));
    w.line(1, format!("return {}", decode_expr(schema, target, "data", 0)));
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

fn builders_module(schema: &Schema, builders: &Builders) -> String {
    let mut w = Writer::new(INDENT);
    w.line(0, format!("# {GENERATED_HEADER}"));
    w.line(0, "from __future__ import annotations");
    w.blank();
    w.line(0, "import copy");
    w.line(0, "import typing");
    w.blank();
    w.line(0, "from ..cog import runtime as cogruntime");
    w.line(0, format!("from ..models import {} as models", schema.package));
    for spec in &builders.specs {
        w.blank();
        w.blank();
        write_builder(&mut w, schema, builders, spec);
    }
    w.finish()
}

fn write_builder(w: &mut Writer, schema: &Schema, builders: &Builders, spec: &BuilderSpec) {
    let def = schema.get(spec.for_type);
    let name = &def.names.python;
    let model = format!("models.{name}");

    w.line(0, format!("class {name}(cogruntime.Builder[{model}]):"));
    docstring(w, 1, &def.comments);
    w.line(1, format!("_internal: {model}"));
    w.line(1, "_missing: set[str]");
    w.blank();

    let promoted: Vec<&BuilderOption> = spec.options.iter().filter(|o| o.is_constructor_arg).collect();
    let mut params = vec!["self".to_string()];
    for option in &promoted {
        for arg in &option.args {
            params.push(format!("{}: {}", arg.names.python, arg_type(schema, builders, &arg.ty)));
        }
    }
    w.line(1, format!("def __init__({}) -> None:", params.join(", ")));
    w.line(2, format!("self._internal = {model}()"));
    let required: Vec<String> =
        tracked_required(schema, spec).iter().map(|f| json_string(&f.names.wire)).collect();
    if required.is_empty() {
        w.line(2, "self._missing = set()");
    } else {
        w.line(2, format!("self._missing = {{{}}}", required.join(", ")));
    }
    for option in &promoted {
        let args: Vec<&str> = option.args.iter().map(|a| a.names.python.as_str()).collect();
        w.line(2, format!("self.{}({})", option.names.python, args.join(", ")));
    }

    w.blank();
    w.line(1, format!("def build(self) -> {model}:"));
    w.line(2, "if self._missing:");
    w.line(3, format!("raise cogruntime.BuildError({}, sorted(self._missing))", json_string(&def.names.wire)));
    w.line(2, "return copy.deepcopy(self._internal)");

    for option in &spec.options {
        w.blank();
        write_option(w, schema, builders, def, option);
    }
}

fn write_option(w: &mut Writer, schema: &Schema, builders: &Builders, def: &TypeDef, option: &BuilderOption) {
    let mut params = vec!["self".to_string()];
    for arg in &option.args {
        params.push(format!("{}: {}", arg.names.python, arg_type(schema, builders, &arg.ty)));
    }
    w.line(1, format!("def {}({}) -> typing.Self:", option.names.python, params.join(", ")));
    docstring(w, 2, &option.comments);
    let subject = json_string(&format!("{}.{}", def.names.wire, option.names.wire));

    for assignment in &option.assignments {
        let Some(steps) = resolve_path(schema, def.id, &assignment.path) else { continue };
        let Some((last, parents)) = steps.split_last() else { continue };
        let field = last.field;
        let mut target = "self._internal".to_string();
        for step in parents {
            target.push('.');
            target.push_str(&step.field.names.python);
            if let Some(id) = step.target {
                w.line(2, format!("if {target} is None:"));
                w.line(3, format!("{target} = models.{}()", schema.get(id).names.python));
            }
        }
        let target = format!("{target}.{}", field.names.python);

        let value = match &assignment.value {
            AssignmentValue::Constant(value) => literal(schema, &field.ty, value, "models."),
            AssignmentValue::Argument(index) => {
                let Some(arg) = option.args.get(*index) else { continue };
                let ident = &arg.names.python;
                let resolved = match resolution(schema, builders, &arg.ty, ident) {
                    Some(expr) => {
                        w.line(2, format!("resolved = {expr}"));
                        "resolved".to_string()
                    }
                    None => ident.clone(),
                };
                let check = py_check(schema, &arg.ty, &resolved, 0, "models.");
                if check != "True" {
                    w.line(2, format!("if not {check}:"));
                    w.line(
                        3,
                        format!(
                            "raise cogruntime.TypeMismatchError({subject}, {}, {resolved})",
                            json_string(&schema.describe(&arg.ty)),
                        ),
                    );
                }
                write_constraints(w, arg, &subject, &resolved);
                resolved
            }
        };
        match assignment.method {
            AssignmentMethod::Set => w.line(2, format!("{target} = {value}")),
            AssignmentMethod::Append => {
                if !field.required || matches!(field.ty, TypeRef::Nullable(_)) {
                    w.line(2, format!("if {target} is None:"));
                    w.line(3, format!("{target} = []"));
                }
                w.line(2, format!("{target}.append({value})"));
            }
        }
        let top = steps[0].field;
        if top.required && top.default.is_none() {
            w.line(2, format!("self._missing.discard({})", json_string(&top.names.wire)));
        }
    }
    w.line(2, "return self");
}

fn write_constraints(w: &mut Writer, arg: &Argument, subject: &str, var: &str) {
    for constraint in &arg.constraints {
        let op = constraint.op.comparison();
        let subject_value = if constraint.op.is_length() { format!("len({var})") } else { var.to_string() };
        w.line(2, format!("if not {subject_value} {op} {}:", constraint.value));
        w.line(
            3,
            format!("raise cogruntime.ConstraintError({subject}, {}, {var})", json_string(&constraint.describe())),
        );
    }
}

/// Expression turning an argument that may hold builders into plain values.
fn resolution(schema: &Schema, builders: &Builders, ty: &TypeRef, ident: &str) -> Option<String> {
    if builders.has_builder(schema, ty) {
        return Some(format!("cogruntime.resolve({ident})"));
    }
    match ty {
        TypeRef::List(item) if builders.has_builder(schema, item) => {
            Some(format!("[cogruntime.resolve(item) for item in {ident}]"))
        }
        TypeRef::Map(item) if builders.has_builder(schema, item) => {
            Some(format!("{{key: cogruntime.resolve(item) for key, item in {ident}.items()}}"))
        }
        _ => None,
    }
}

fn arg_type(schema: &Schema, builders: &Builders, ty: &TypeRef) -> String {
    let value_or_builder = |t: &TypeRef| {
        let inner = py_type(schema, t, "models.");
        format!("typing.Union[{inner}, cogruntime.Builder[{inner}]]")
    };
    if builders.has_builder(schema, ty) {
        return value_or_builder(ty);
    }
    match ty {
        TypeRef::List(item) if builders.has_builder(schema, item) => format!("list[{}]", value_or_builder(item)),
        TypeRef::Map(item) if builders.has_builder(schema, item) => {
            format!("dict[str, {}]", value_or_builder(item))
        }
        other => py_type(schema, other, "models."),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn py_type(schema: &Schema, ty: &TypeRef, prefix: &str) -> String {
    match ty {
        TypeRef::Scalar(kind) => match kind {
            ScalarKind::String => "str".into(),
            ScalarKind::Bool => "bool".into(),
            ScalarKind::Int32 | ScalarKind::Int64 | ScalarKind::Uint32 | ScalarKind::Uint64 => "int".into(),
            ScalarKind::Float32 | ScalarKind::Float64 => "float".into(),
            ScalarKind::Any => "typing.Any".into(),
        },
        TypeRef::Named(id) => format!("{prefix}{}", schema.get(*id).names.python),
        TypeRef::List(inner) => format!("list[{}]", py_type(schema, inner, prefix)),
        TypeRef::Map(inner) => format!("dict[str, {}]", py_type(schema, inner, prefix)),
        TypeRef::Nullable(inner) => format!("typing.Optional[{}]", py_type(schema, inner, prefix)),
    }
}

fn field_type(schema: &Schema, field: &FieldDef, prefix: &str) -> String {
    match &field.ty {
        TypeRef::Nullable(_) => py_type(schema, &field.ty, prefix),
        ty if !field.required => format!("typing.Optional[{}]", py_type(schema, ty, prefix)),
        ty => py_type(schema, ty, prefix),
    }
}

fn strip_nullable(ty: &TypeRef) -> &TypeRef {
    match ty {
        TypeRef::Nullable(inner) => inner,
        other => other,
    }
}

/// Boolean expression checking an in-memory value against `ty`.
fn py_check(schema: &Schema, ty: &TypeRef, var: &str, depth: usize, prefix: &str) -> String {
    match ty {
        TypeRef::Scalar(kind) => match kind {
            ScalarKind::String => format!("isinstance({var}, str)"),
            ScalarKind::Bool => format!("isinstance({var}, bool)"),
            ScalarKind::Int32 | ScalarKind::Int64 | ScalarKind::Uint32 | ScalarKind::Uint64 => {
                format!("(isinstance({var}, int) and not isinstance({var}, bool))")
            }
            ScalarKind::Float32 | ScalarKind::Float64 => {
                format!("(isinstance({var}, (int, float)) and not isinstance({var}, bool))")
            }
            ScalarKind::Any => "True".into(),
        },
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            match def.kind {
                TypeKind::Struct(_) | TypeKind::Enum(_) => {
                    format!("isinstance({var}, {prefix}{})", def.names.python)
                }
                TypeKind::Disjunction(_) | TypeKind::Alias(_) => {
                    format!("{prefix}is_{}({var})", snake_case(&def.names.python))
                }
            }
        }
        TypeRef::List(inner) => {
            let item = format!("x{depth}");
            match py_check(schema, inner, &item, depth + 1, prefix).as_str() {
                "True" => format!("isinstance({var}, list)"),
                check => format!("(isinstance({var}, list) and all({check} for {item} in {var}))"),
            }
        }
        TypeRef::Map(inner) => {
            let (key, item) = (format!("k{depth}"), format!("x{depth}"));
            let check = match py_check(schema, inner, &item, depth + 1, prefix).as_str() {
                "True" => format!("isinstance({key}, str)"),
                check => format!("isinstance({key}, str) and {check}"),
            };
            format!("(isinstance({var}, dict) and all({check} for {key}, {item} in {var}.items()))")
        }
        TypeRef::Nullable(inner) => match py_check(schema, inner, var, depth, prefix).as_str() {
            "True" => "True".into(),
            check => format!("({var} is None or {check})"),
        },
    }
}

/// Shallow check deciding which disjunction variant decoded JSON belongs to.
fn json_check(schema: &Schema, ty: &TypeRef, var: &str) -> String {
    match schema.resolve_alias(ty) {
        TypeRef::Scalar(_) => py_check(schema, schema.resolve_alias(ty), var, 0, ""),
        TypeRef::List(_) => format!("isinstance({var}, list)"),
        TypeRef::Map(_) => format!("isinstance({var}, dict)"),
        TypeRef::Nullable(inner) => match json_check(schema, inner, var).as_str() {
            "True" => "True".into(),
            check => format!("({var} is None or {check})"),
        },
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            match &def.kind {
                TypeKind::Struct(_) => format!("isinstance({var}, dict)"),
                TypeKind::Enum(e) => {
                    let guard = match e.members.first().map(|m| &m.value) {
                        Some(EnumValue::Int(_)) => format!("not isinstance({var}, bool) and "),
                        _ => String::new(),
                    };
                    format!("({guard}{var} in [member.value for member in {}])", def.names.python)
                }
                TypeKind::Disjunction(_) | TypeKind::Alias(_) => "True".into(),
            }
        }
    }
}

/// Expression decoding JSON data held in `var` into model values.
fn decode_expr(schema: &Schema, ty: &TypeRef, var: &str, depth: usize) -> String {
    match ty {
        TypeRef::Scalar(_) => var.to_string(),
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            let name = &def.names.python;
            match def.kind {
                TypeKind::Struct(_) => format!("{name}.from_json({var})"),
                TypeKind::Enum(_) => format!("{name}({var})"),
                TypeKind::Disjunction(_) | TypeKind::Alias(_) => format!("decode_{}({var})", snake_case(name)),
            }
        }
        TypeRef::List(inner) => {
            let item = format!("x{depth}");
            match decode_expr(schema, inner, &item, depth + 1) {
                decoded if decoded == item => format!("list({var})"),
                decoded => format!("[{decoded} for {item} in {var}]"),
            }
        }
        TypeRef::Map(inner) => {
            let (key, item) = (format!("k{depth}"), format!("x{depth}"));
            match decode_expr(schema, inner, &item, depth + 1) {
                decoded if decoded == item => format!("dict({var})"),
                decoded => format!("{{{key}: {decoded} for {key}, {item} in {var}.items()}}"),
            }
        }
        TypeRef::Nullable(inner) => match decode_expr(schema, inner, var, depth) {
            decoded if decoded == var => decoded,
            decoded => format!("None if {var} is None else {decoded}"),
        },
    }
}

fn zero_value(schema: &Schema, ty: &TypeRef, prefix: &str) -> String {
    match ty {
        TypeRef::Scalar(kind) => match kind {
            ScalarKind::String => "\"\"".into(),
            ScalarKind::Bool => "False".into(),
            ScalarKind::Float32 | ScalarKind::Float64 => "0.0".into(),
            ScalarKind::Any => "None".into(),
            _ => "0".into(),
        },
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            match &def.kind {
                TypeKind::Struct(_) => format!("{prefix}{}()", def.names.python),
                TypeKind::Enum(e) => match e.members.first() {
                    Some(first) => format!("{prefix}{}.{}", def.names.python, first.names.python),
                    None => "None".into(),
                },
                TypeKind::Disjunction(variants) => match variants.first() {
                    Some(first) => zero_value(schema, &first.ty, prefix),
                    None => "None".into(),
                },
                TypeKind::Alias(target) => zero_value(schema, target, prefix),
            }
        }
        TypeRef::List(_) => "[]".into(),
        TypeRef::Map(_) => "{}".into(),
        TypeRef::Nullable(_) => "None".into(),
    }
}

fn literal(schema: &Schema, ty: &TypeRef, value: &Value, prefix: &str) -> String {
    if value.is_null() {
        return "None".into();
    }
    match schema.resolve_alias(ty) {
        TypeRef::Nullable(inner) => literal(schema, inner, value, prefix),
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            let TypeKind::Enum(e) = &def.kind else { return py_value(value) };
            e.members
                .iter()
                .find(|m| match &m.value {
                    EnumValue::Int(i) => value.as_i64() == Some(*i),
                    EnumValue::Str(s) => value.as_str() == Some(s.as_str()),
                })
                .map(|m| format!("{prefix}{}.{}", def.names.python, m.names.python))
                .unwrap_or_else(|| py_value(value))
        }
        TypeRef::Scalar(ScalarKind::Float32 | ScalarKind::Float64) => {
            format!("{:?}", value.as_f64().unwrap_or_default())
        }
        _ => py_value(value),
    }
}

fn py_value(value: &Value) -> String {
    match value {
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => json_string(s),
        Value::Array(items) => format!("[{}]", items.iter().map(py_value).collect::<Vec<_>>().join(", ")),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", json_string(k), py_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// JSON string literals are valid Python string literals.
fn json_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn docstring(w: &mut Writer, depth: usize, comments: &[String]) {
    if comments.is_empty() {
        return;
    }
    w.line(depth, "\"\"\"");
    for line in comments.iter().flat_map(|c| c.lines()) {
        w.line(depth, line.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\""));
    }
    w.line(depth, "\"\"\"");
    w.blank();
}
