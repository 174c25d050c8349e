//! Rust target: one serde model file and one builder file per type.
use serde_json::Value;

use super::{Context, File, Files, Jenny, Writer, GENERATED_HEADER};
use crate::builders::{
    path_key, resolve_path, tracked_required, Argument, AssignmentMethod, AssignmentValue, BuilderOption, BuilderSpec,
    Builders, PathStep,
};
use crate::error::{GenError, Result};
use crate::ir::{
    Constraint, EnumDef, EnumValue, EnumValueKind, FieldDef, ScalarKind, Schema, StructDef, TypeDef, TypeId, TypeKind,
    TypeRef, Variant,
};
use crate::naming::is_valid_identifier;

const INDENT: &str = "    ";
const DERIVE_DATA: &str = "Debug, Clone, PartialEq";
const DERIVE_SERDE: &str = "::serde::Serialize, ::serde::Deserialize";

pub struct ModelsJenny;
pub struct BuildersJenny;

impl Jenny for ModelsJenny {
    fn name(&self) -> &'static str {
        "RustModels"
    }

    fn generate(&self, ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        for package in &ctx.packages {
            let schema = package.schema;
            let pkg = &schema.package;
            let mut modules = Vec::with_capacity(schema.types.len());
            for def in &schema.types {
                let module = def.names.rust_module();
                files.push(File::new(
                    format!("{pkg}/models/{}.rs", unraw(&module)),
                    model_file(schema, def),
                    self.name(),
                ));
                modules.push(module);
            }
            files.push(File::new(format!("{pkg}/models/mod.rs"), module_index(&modules), self.name()));

            let mut w = Writer::new(INDENT);
            w.line(0, format!("// {GENERATED_HEADER}"));
            w.blank();
            w.line(0, "pub mod builders;");
            w.line(0, "pub mod models;");
            files.push(File::new(format!("{pkg}/mod.rs"), w.finish(), self.name()));
        }
        Ok(files)
    }
}

impl Jenny for BuildersJenny {
    fn name(&self) -> &'static str {
        "RustBuilders"
    }

    fn generate(&self, ctx: &Context<'_>) -> Result<Files> {
        let runtime = ctx.config.rust_runtime_path.trim();
        let mut files = Files::default();
        for package in &ctx.packages {
            let schema = package.schema;
            let pkg = &schema.package;
            let mut modules = Vec::with_capacity(package.builders.specs.len());
            for spec in &package.builders.specs {
                let def = schema.get(spec.for_type);
                let module = def.names.rust_module();
                files.push(File::new(
                    format!("{pkg}/builders/{}.rs", unraw(&module)),
                    builder_file(schema, package.builders, spec, runtime),
                    self.name(),
                ));
                modules.push(module);
            }
            files.push(File::new(format!("{pkg}/builders/mod.rs"), module_index(&modules), self.name()));
        }
        Ok(files)
    }
}

/// Validate a `use` path before it is pasted into generated code.
pub fn check_use_path(path: &str) -> Result<()> {
    let trimmed = path.trim();
    let segments = trimmed.strip_prefix("::").unwrap_or(trimmed);
    let valid = !segments.is_empty()
        && segments
            .split("::")
            .all(|segment| is_valid_identifier(segment.strip_prefix("r#").unwrap_or(segment)));
    if valid {
        Ok(())
    } else {
        Err(GenError::InvalidConfig(format!("`{trimmed}` is not a valid Rust use path")))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MODELS
// ————————————————————————————————————————————————————————————————————————————

fn model_file(schema: &Schema, def: &TypeDef) -> String {
    let mut w = Writer::new(INDENT);
    w.line(0, format!("// {GENERATED_HEADER}"));
    w.blank();
    w.line(0, "#[allow(unused_imports)]");
    w.line(0, "use super::*;");
    w.blank();
    doc_comments(&mut w, 0, &def.comments);
    match &def.kind {
        TypeKind::Struct(s) => write_struct(&mut w, schema, def, s),
        TypeKind::Enum(e) => write_enum(&mut w, def, e),
        TypeKind::Disjunction(variants) => write_disjunction(&mut w, schema, def, variants),
        TypeKind::Alias(target) => {
            let shape = Shape::of(schema, def.id, target, false, "");
            w.line(0, format!("pub type {} = {};", def.names.rust, shape.render()));
        }
    }
    w.finish()
}

fn write_struct(w: &mut Writer, schema: &Schema, def: &TypeDef, s: &StructDef) {
    let name = &def.names.rust;
    let has_defaults = s.fields.iter().any(|f| f.default.is_some());
    if has_defaults {
        w.line(0, format!("#[derive({DERIVE_DATA}, {DERIVE_SERDE})]"));
    } else {
        w.line(0, format!("#[derive({DERIVE_DATA}, Default, {DERIVE_SERDE})]"));
    }
    w.line(0, format!("pub struct {name} {{"));
    for field in &s.fields {
        doc_comments(w, 1, &field.comments);
        let mut attrs = Vec::new();
        if unraw(&field.names.rust) != field.names.wire {
            attrs.push(format!("rename = {:?}", field.names.wire));
        }
        if !field.required {
            attrs.push("skip_serializing_if = \"Option::is_none\"".to_string());
        }
        if !attrs.is_empty() {
            w.line(1, format!("#[serde({})]", attrs.join(", ")));
        }
        let shape = Shape::for_field(schema, def.id, field, "");
        w.line(1, format!("pub {}: {},", field.names.rust, shape.render()));
    }
    w.line(0, "}");

    if has_defaults {
        w.blank();
        w.line(0, format!("impl Default for {name} {{"));
        w.line(1, "fn default() -> Self {");
        w.line(2, "Self {");
        for field in &s.fields {
            let value = match &field.default {
                Some(default) => {
                    let shape = Shape::for_field(schema, def.id, field, "");
                    field_literal(schema, &shape, &field.ty, default, "")
                }
                None => "Default::default()".to_string(),
            };
            w.line(3, format!("{}: {value},", field.names.rust));
        }
        w.line(2, "}");
        w.line(1, "}");
        w.line(0, "}");
    }
}

fn write_enum(w: &mut Writer, def: &TypeDef, e: &EnumDef) {
    let name = &def.names.rust;
    w.line(0, format!("#[derive({DERIVE_DATA}, Copy, Eq, Hash, Default, {DERIVE_SERDE})]"));
    if e.value_kind == EnumValueKind::Int {
        w.line(0, "#[serde(into = \"i64\", try_from = \"i64\")]");
    }
    w.line(0, format!("pub enum {name} {{"));
    for (index, member) in e.members.iter().enumerate() {
        if index == 0 {
            w.line(1, "#[default]");
        }
        if let EnumValue::Str(value) = &member.value {
            w.line(1, format!("#[serde(rename = {value:?})]"));
        }
        w.line(1, format!("{},", member.names.rust));
    }
    w.line(0, "}");

    if e.value_kind != EnumValueKind::Int {
        return;
    }
    w.blank();
    w.line(0, format!("impl From<{name}> for i64 {{"));
    w.line(1, format!("fn from(value: {name}) -> Self {{"));
    w.line(2, "match value {");
    for member in &e.members {
        if let EnumValue::Int(value) = member.value {
            w.line(3, format!("{name}::{} => {value},", member.names.rust));
        }
    }
    w.line(2, "}");
    w.line(1, "}");
    w.line(0, "}");
    w.blank();
    w.line(0, format!("impl TryFrom<i64> for {name} {{"));
    w.line(1, "type Error = String;");
    w.blank();
    w.line(1, "fn try_from(value: i64) -> Result<Self, Self::Error> {");
    w.line(2, "match value {");
    for member in &e.members {
        if let EnumValue::Int(value) = member.value {
            w.line(3, format!("{value} => Ok({name}::{}),", member.names.rust));
        }
    }
    w.line(3, format!("other => Err(format!(\"unknown {} value {{other}}\")),", def.names.wire));
    w.line(2, "}");
    w.line(1, "}");
    w.line(0, "}");
}

fn write_disjunction(w: &mut Writer, schema: &Schema, def: &TypeDef, variants: &[Variant]) {
    let name = &def.names.rust;
    w.line(0, format!("#[derive({DERIVE_DATA}, {DERIVE_SERDE})]"));
    w.line(0, "#[serde(untagged)]");
    w.line(0, format!("pub enum {name} {{"));
    for variant in variants {
        let shape = Shape::of(schema, def.id, &variant.ty, false, "");
        w.line(1, format!("{}({}),", variant.names.rust, shape.render()));
    }
    w.line(0, "}");
    if let Some(first) = variants.first() {
        w.blank();
        w.line(0, format!("impl Default for {name} {{"));
        w.line(1, "fn default() -> Self {");
        w.line(2, format!("{name}::{}(Default::default())", first.names.rust));
        w.line(1, "}");
        w.line(0, "}");
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

fn builder_file(schema: &Schema, builders: &Builders, spec: &BuilderSpec, runtime: &str) -> String {
    let def = schema.get(spec.for_type);
    let model = format!("models::{}", def.names.rust);
    let builder = format!("{}Builder", def.names.rust);

    let mut w = Writer::new(INDENT);
    w.line(0, format!("// {GENERATED_HEADER}"));
    w.blank();
    w.line(0, "use ::std::collections::{BTreeMap, BTreeSet};");
    w.blank();
    w.line(0, "#[allow(unused_imports)]");
    w.line(0, format!("use {runtime}::{{resolve_list, resolve_map, BuildError, Builder, Nested}};"));
    w.blank();
    w.line(0, "use super::super::models;");
    w.blank();

    doc_comments(&mut w, 0, &def.comments);
    w.line(0, "#[derive(Debug, Clone)]");
    w.line(0, format!("pub struct {builder} {{"));
    w.line(1, format!("internal: {model},"));
    w.line(1, "missing: BTreeSet<&'static str>,");
    w.line(1, "errors: BTreeMap<&'static str, BuildError>,");
    w.line(0, "}");
    w.blank();

    w.line(0, format!("impl {builder} {{"));
    write_constructor(&mut w, schema, builders, spec, &model);
    for option in &spec.options {
        w.blank();
        write_option(&mut w, schema, builders, def, option);
    }
    w.blank();
    w.line(1, format!("pub fn build(&self) -> Result<{model}, BuildError> {{"));
    w.line(2, "if let Some(error) = self.errors.values().next() {");
    w.line(3, "return Err(error.clone());");
    w.line(2, "}");
    w.line(2, "if let Some(field) = self.missing.iter().next() {");
    w.line(3, format!("return Err(BuildError::missing_field({:?}, field));", def.names.wire));
    w.line(2, "}");
    w.line(2, "Ok(self.internal.clone())");
    w.line(1, "}");
    w.line(0, "}");
    w.blank();

    w.line(0, format!("impl Builder<{model}> for {builder} {{"));
    w.line(1, format!("fn build(&self) -> Result<{model}, BuildError> {{"));
    w.line(2, format!("{builder}::build(self)"));
    w.line(1, "}");
    w.line(0, "}");
    w.blank();
    w.line(0, format!("impl From<{builder}> for Nested<{model}> {{"));
    w.line(1, format!("fn from(builder: {builder}) -> Self {{"));
    w.line(2, "Nested::from_builder(&builder)");
    w.line(1, "}");
    w.line(0, "}");
    w.blank();
    w.line(0, format!("impl From<&{builder}> for Nested<{model}> {{"));
    w.line(1, format!("fn from(builder: &{builder}) -> Self {{"));
    w.line(2, "Nested::from_builder(builder)");
    w.line(1, "}");
    w.line(0, "}");
    w.finish()
}

fn write_constructor(
    w: &mut Writer,
    schema: &Schema,
    builders: &Builders,
    spec: &BuilderSpec,
    model: &str,
) {
    let mut params = Vec::new();
    let mut generics = Vec::new();
    let mut bounds = Vec::new();
    let mut calls = Vec::new();
    for option in spec.options.iter().filter(|o| o.is_constructor_arg) {
        let mut call_args = Vec::new();
        for arg in &option.args {
            let rendered = ArgKind::of(schema, builders, arg).render(&arg.names.rust, &generics.len().to_string());
            params.push(rendered.param);
            generics.extend(rendered.generics);
            bounds.extend(rendered.bounds);
            call_args.push(arg.names.rust.clone());
        }
        calls.push(format!(".{}({})", option.names.rust, call_args.join(", ")));
    }

    let required: Vec<String> =
        tracked_required(schema, spec).iter().map(|f| format!("{:?}", f.names.wire)).collect();
    let missing = if required.is_empty() {
        "BTreeSet::new()".to_string()
    } else {
        format!("BTreeSet::from([{}])", required.join(", "))
    };

    write_signature(w, "new", "", &generics, &params, "Self", &bounds);
    w.line(2, "Self {");
    w.line(3, format!("internal: {model}::default(),"));
    w.line(3, format!("missing: {missing},"));
    w.line(3, "errors: BTreeMap::new(),");
    w.line(2, "}");
    for call in &calls {
        w.line(2, call);
    }
    w.line(1, "}");
}

fn write_option(w: &mut Writer, schema: &Schema, builders: &Builders, def: &TypeDef, option: &BuilderOption) {
    let mut params = Vec::new();
    let mut generics = Vec::new();
    let mut bounds = Vec::new();
    let mut kinds = Vec::new();
    for arg in &option.args {
        let suffix = if option.args.len() == 1 { String::new() } else { generics.len().to_string() };
        let kind = ArgKind::of(schema, builders, arg);
        let rendered = kind.render(&arg.names.rust, &suffix);
        params.push(rendered.param);
        generics.extend(rendered.generics);
        bounds.extend(rendered.bounds);
        kinds.push(kind);
    }

    doc_comments(w, 1, &option.comments);
    write_signature(w, &option.names.rust, "mut self", &generics, &params, "Self", &bounds);
    for (index, (arg, kind)) in option.args.iter().zip(kinds.iter_mut()).enumerate() {
        if arg.constraints.is_empty() {
            continue;
        }
        let ident = &arg.names.rust;
        if let ArgKind::IntoString(ty) = kind {
            let ty = ty.clone();
            w.line(2, format!("let {ident}: {ty} = {ident}.into();"));
            *kind = ArgKind::Plain(ty);
        }
        let key = argument_key(schema, def.id, option, index);
        for constraint in &arg.constraints {
            w.line(2, format!("if !({}) {{", guard(schema, arg, constraint)));
            w.line(
                3,
                format!(
                    "self.errors.insert({key:?}, BuildError::invalid_value({:?}, {key:?}, {:?}));",
                    def.names.wire,
                    constraint.describe()
                ),
            );
            w.line(3, "return self;");
            w.line(2, "}");
        }
    }

    for assignment in &option.assignments {
        let Some(steps) = resolve_path(schema, def.id, &assignment.path) else { continue };
        let Some((last, _)) = steps.split_last() else { continue };
        let shape = Shape::for_field(schema, last.owner, last.field, "models::");
        let target = place(schema, &steps);
        let key = path_key(&steps);
        match &assignment.value {
            AssignmentValue::Constant(value) => {
                let literal = field_literal(schema, &shape, &last.field.ty, value, "models::");
                w.line(2, format!("{target} = {literal};"));
            }
            AssignmentValue::Argument(index) => {
                let (Some(arg), Some(kind)) = (option.args.get(*index), kinds.get(*index)) else { continue };
                let ident = &arg.names.rust;
                match kind.resolution(ident, &key) {
                    Resolution::Infallible(expr) => {
                        w.line(2, store(&shape, &target, assignment.method, &expr));
                        if !arg.constraints.is_empty() && assignment.method == AssignmentMethod::Set {
                            w.line(2, format!("self.errors.remove({key:?});"));
                        }
                    }
                    Resolution::Fallible(expr) => {
                        w.line(2, format!("match {expr} {{"));
                        w.line(3, "Ok(value) => {");
                        w.line(4, store(&shape, &target, assignment.method, "value"));
                        if assignment.method == AssignmentMethod::Set {
                            w.line(4, format!("self.errors.remove({key:?});"));
                        }
                        w.line(3, "}");
                        w.line(3, "Err(error) => {");
                        w.line(4, format!("self.errors.insert({key:?}, error);"));
                        w.line(3, "}");
                        w.line(2, "}");
                    }
                }
            }
        }
        let top = steps[0].field;
        if top.required && top.default.is_none() {
            w.line(2, format!("self.missing.remove({:?});", top.names.wire));
        }
    }
    w.line(2, "self");
    w.line(1, "}");
}

/// Place expression for the field at the end of `steps`. Optional
/// structs along the way are created on first write.
fn place(schema: &Schema, steps: &[PathStep<'_>]) -> String {
    let mut target = "self.internal".to_string();
    for (depth, step) in steps.iter().enumerate() {
        target.push('.');
        target.push_str(&step.field.names.rust);
        if depth + 1 == steps.len() {
            break;
        }
        let shape = Shape::for_field(schema, step.owner, step.field, "models::");
        if shape.option {
            target.push_str(".get_or_insert_with(Default::default)");
        }
        let stored = match &step.field.ty {
            TypeRef::Nullable(inner) => inner.as_ref(),
            other => other,
        };
        if matches!(schema.resolve_alias(stored), TypeRef::Nullable(_)) {
            target.push_str(".get_or_insert_with(Default::default)");
        }
    }
    target
}

/// Error key for argument `index`: the path it is first assigned to.
fn argument_key(schema: &Schema, owner: TypeId, option: &BuilderOption, index: usize) -> String {
    option
        .assignments
        .iter()
        .find(|a| a.value == AssignmentValue::Argument(index))
        .and_then(|a| resolve_path(schema, owner, &a.path))
        .map(|steps| path_key(&steps))
        .unwrap_or_else(|| option.args[index].names.wire.clone())
}

fn guard(schema: &Schema, arg: &Argument, constraint: &Constraint) -> String {
    let ident = &arg.names.rust;
    let op = constraint.op.comparison();
    if constraint.op.is_length() {
        return format!("{ident}.chars().count() {op} {}", constraint.value);
    }
    let bound = match schema.resolve_alias(&arg.ty) {
        TypeRef::Scalar(ScalarKind::Float32 | ScalarKind::Float64) => {
            format!("{:?}", constraint.value.as_f64().unwrap_or_default())
        }
        _ => constraint.value.to_string(),
    };
    format!("{ident} {op} {bound}")
}

fn write_signature(
    w: &mut Writer,
    name: &str,
    receiver: &str,
    generics: &[String],
    params: &[String],
    ret: &str,
    bounds: &[String],
) {
    let mut all = Vec::new();
    if !receiver.is_empty() {
        all.push(receiver.to_string());
    }
    all.extend(params.iter().cloned());
    let generics = if generics.is_empty() { String::new() } else { format!("<{}>", generics.join(", ")) };
    if bounds.is_empty() {
        w.line(1, format!("pub fn {name}{generics}({}) -> {ret} {{", all.join(", ")));
        return;
    }
    w.line(1, format!("pub fn {name}{generics}({}) -> {ret}", all.join(", ")));
    w.line(1, "where");
    for bound in bounds {
        w.line(2, format!("{bound},"));
    }
    w.line(1, "{");
}

fn store(shape: &Shape, target: &str, method: AssignmentMethod, expr: &str) -> String {
    match method {
        AssignmentMethod::Set => format!("{target} = {};", shape.wrap(expr)),
        AssignmentMethod::Append if shape.option => {
            format!("{target}.get_or_insert_with(Default::default).push({expr});")
        }
        AssignmentMethod::Append => format!("{target}.push({expr});"),
    }
}

/// How a builder option accepts one argument.
enum ArgKind {
    Plain(String),
    IntoString(String),
    Nested(String),
    NestedList(String),
    NestedMap(String),
}

struct RenderedArg {
    param: String,
    generics: Vec<String>,
    bounds: Vec<String>,
}

enum Resolution {
    Infallible(String),
    Fallible(String),
}

impl ArgKind {
    fn of(schema: &Schema, builders: &Builders, arg: &Argument) -> Self {
        let ty = |t: &TypeRef| rust_type(schema, t, "models::");
        if builders.has_builder(schema, &arg.ty) {
            return ArgKind::Nested(ty(&arg.ty));
        }
        match &arg.ty {
            TypeRef::List(item) if builders.has_builder(schema, item) => ArgKind::NestedList(ty(item)),
            TypeRef::Map(item) if builders.has_builder(schema, item) => ArgKind::NestedMap(ty(item)),
            other if schema.resolve_alias(other) == &TypeRef::Scalar(ScalarKind::String) => {
                ArgKind::IntoString(ty(other))
            }
            other => ArgKind::Plain(ty(other)),
        }
    }

    fn render(&self, ident: &str, suffix: &str) -> RenderedArg {
        let (i, k, v) = (format!("I{suffix}"), format!("K{suffix}"), format!("V{suffix}"));
        match self {
            ArgKind::Plain(ty) => RenderedArg { param: format!("{ident}: {ty}"), generics: vec![], bounds: vec![] },
            ArgKind::IntoString(ty) => RenderedArg {
                param: format!("{ident}: impl Into<{ty}>"),
                generics: vec![],
                bounds: vec![],
            },
            ArgKind::Nested(ty) => RenderedArg {
                param: format!("{ident}: impl Into<Nested<{ty}>>"),
                generics: vec![],
                bounds: vec![],
            },
            ArgKind::NestedList(ty) => RenderedArg {
                param: format!("{ident}: {i}"),
                bounds: vec![format!("{i}: IntoIterator<Item = {v}>"), format!("{v}: Into<Nested<{ty}>>")],
                generics: vec![i, v],
            },
            ArgKind::NestedMap(ty) => RenderedArg {
                param: format!("{ident}: {i}"),
                bounds: vec![
                    format!("{i}: IntoIterator<Item = ({k}, {v})>"),
                    format!("{k}: Into<String>"),
                    format!("{v}: Into<Nested<{ty}>>"),
                ],
                generics: vec![i, k, v],
            },
        }
    }

    fn resolution(&self, ident: &str, wire: &str) -> Resolution {
        match self {
            ArgKind::Plain(_) => Resolution::Infallible(ident.to_string()),
            ArgKind::IntoString(_) => Resolution::Infallible(format!("{ident}.into()")),
            ArgKind::Nested(ty) => {
                Resolution::Fallible(format!("Into::<Nested<{ty}>>::into({ident}).resolve({wire:?})"))
            }
            ArgKind::NestedList(ty) => Resolution::Fallible(format!("resolve_list::<{ty}, _, _>({wire:?}, {ident})")),
            ArgKind::NestedMap(ty) => {
                Resolution::Fallible(format!("resolve_map::<{ty}, _, _, _>({wire:?}, {ident})"))
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Storage of one field, variant payload or alias target: an optional
/// wrapper, boxed when the value would otherwise contain its owner.
struct Shape {
    option: bool,
    boxed: bool,
    inner: String,
}

impl Shape {
    fn of(schema: &Schema, owner: TypeId, ty: &TypeRef, optional: bool, prefix: &str) -> Self {
        match ty {
            TypeRef::Nullable(inner) => Shape {
                option: true,
                boxed: inner.by_value_target().is_some_and(|id| schema.inline_reaches(id, owner)),
                inner: rust_type(schema, inner, prefix),
            },
            other => Shape { option: optional, boxed: false, inner: rust_type(schema, other, prefix) },
        }
    }

    fn for_field(schema: &Schema, owner: TypeId, field: &FieldDef, prefix: &str) -> Self {
        Self::of(schema, owner, &field.ty, !field.required, prefix)
    }

    fn render(&self) -> String {
        match (self.option, self.boxed) {
            (true, true) => format!("Option<Box<{}>>", self.inner),
            (true, false) => format!("Option<{}>", self.inner),
            (false, _) => self.inner.clone(),
        }
    }

    fn wrap(&self, expr: &str) -> String {
        match (self.option, self.boxed) {
            (true, true) => format!("Some(Box::new({expr}))"),
            (true, false) => format!("Some({expr})"),
            (false, _) => expr.to_string(),
        }
    }
}

fn rust_type(schema: &Schema, ty: &TypeRef, prefix: &str) -> String {
    match ty {
        TypeRef::Scalar(kind) => scalar_type(*kind).to_string(),
        TypeRef::Named(id) => format!("{prefix}{}", schema.get(*id).names.rust),
        TypeRef::List(inner) => format!("Vec<{}>", rust_type(schema, inner, prefix)),
        TypeRef::Map(inner) => {
            format!("::std::collections::BTreeMap<String, {}>", rust_type(schema, inner, prefix))
        }
        TypeRef::Nullable(inner) => format!("Option<{}>", rust_type(schema, inner, prefix)),
    }
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "String",
        ScalarKind::Bool => "bool",
        ScalarKind::Int32 => "i32",
        ScalarKind::Int64 => "i64",
        ScalarKind::Uint32 => "u32",
        ScalarKind::Uint64 => "u64",
        ScalarKind::Float32 => "f32",
        ScalarKind::Float64 => "f64",
        ScalarKind::Any => "::serde_json::Value",
    }
}

/// A checked default or constant, stored into a field of the given shape.
fn field_literal(schema: &Schema, shape: &Shape, ty: &TypeRef, value: &Value, prefix: &str) -> String {
    if shape.option && value.is_null() {
        return "None".to_string();
    }
    let inner = match ty {
        TypeRef::Nullable(inner) => inner,
        other => other,
    };
    shape.wrap(&literal(schema, inner, value, prefix))
}

fn literal(schema: &Schema, ty: &TypeRef, value: &Value, prefix: &str) -> String {
    match schema.resolve_alias(ty) {
        TypeRef::Nullable(inner) => {
            if value.is_null() {
                "None".to_string()
            } else {
                format!("Some({})", literal(schema, inner, value, prefix))
            }
        }
        TypeRef::Scalar(kind) => match kind {
            ScalarKind::String => format!("String::from({:?})", value.as_str().unwrap_or_default()),
            ScalarKind::Bool => value.as_bool().unwrap_or_default().to_string(),
            ScalarKind::Float32 | ScalarKind::Float64 => format!("{:?}", value.as_f64().unwrap_or_default()),
            ScalarKind::Any => format!("::serde_json::json!({value})"),
            _ => value.to_string(),
        },
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            match &def.kind {
                TypeKind::Enum(e) => e
                    .members
                    .iter()
                    .find(|m| match &m.value {
                        EnumValue::Int(i) => value.as_i64() == Some(*i),
                        EnumValue::Str(s) => value.as_str() == Some(s.as_str()),
                    })
                    .map(|m| format!("{prefix}{}::{}", def.names.rust, m.names.rust))
                    .unwrap_or_else(|| "Default::default()".to_string()),
                _ => "Default::default()".to_string(),
            }
        }
        TypeRef::List(_) | TypeRef::Map(_) => "Default::default()".to_string(),
    }
}

fn module_index(modules: &[String]) -> String {
    let mut w = Writer::new(INDENT);
    w.line(0, format!("// {GENERATED_HEADER}"));
    if modules.is_empty() {
        return w.finish();
    }
    w.blank();
    for module in modules {
        w.line(0, format!("mod {module};"));
    }
    w.blank();
    for module in modules {
        w.line(0, format!("pub use {module}::*;"));
    }
    w.finish()
}

fn doc_comments(w: &mut Writer, depth: usize, comments: &[String]) {
    for line in comments.iter().flat_map(|c| c.lines()) {
        if line.is_empty() {
            w.line(depth, "///");
        } else {
            w.line(depth, format!("/// {line}"));
        }
    }
}

fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jennies::{GenerateConfig, Package};
    use crate::lower::lower_schema;
    use crate::schema::SchemaDoc;
    use crate::veneers::Rewriter;

    fn generate(yaml: &str, veneers: &str) -> Files {
        let doc = SchemaDoc::from_yaml_str(yaml, "test.yaml").unwrap();
        let schema = lower_schema(&doc).unwrap();
        let rewriter = Rewriter::from_yaml_str(veneers, "veneers.yaml").unwrap();
        let builders = rewriter.rewrite(std::slice::from_ref(&schema)).unwrap();
        let config = GenerateConfig::default();
        let ctx = Context {
            packages: vec![Package { schema: &schema, builders: &builders[0] }],
            config: &config,
        };
        let mut files = ModelsJenny.generate(&ctx).unwrap();
        files.extend(BuildersJenny.generate(&ctx).unwrap());
        files
    }

    fn dashboard() -> String {
        std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/dashboard.yaml")).unwrap()
    }

    fn contents<'a>(files: &'a Files, path: &str) -> &'a str {
        &files.get(path).unwrap_or_else(|| panic!("missing {path}")).contents
    }

    #[test]
    fn models_keep_wire_names_and_field_order() {
        let files = generate(&dashboard(), "{}");
        let model = contents(&files, "dashboard/models/dashboard.rs");
        let title = model.find("pub title: String,").unwrap();
        let tooltip = model.find("pub graph_tooltip: DashboardCursorSync,").unwrap();
        let links = model.find("pub links: Option<Vec<DashboardLink>>,").unwrap();
        assert!(title < tooltip && tooltip < links);
        assert!(model.contains("#[serde(rename = \"graphTooltip\")]"));
        assert!(model.contains("graph_tooltip: DashboardCursorSync::Off,"));
        assert!(model.contains("style: DashboardStyle::Dark,"));
        assert!(model.contains("pub timepicker: Option<TimePicker>,"));
    }

    #[test]
    fn enums_and_unions_are_closed() {
        let files = generate(&dashboard(), "{}");
        let sync = contents(&files, "dashboard/models/dashboard_cursor_sync.rs");
        assert!(sync.contains("#[serde(into = \"i64\", try_from = \"i64\")]"));
        assert!(sync.contains("2 => Ok(DashboardCursorSync::Tooltip),"));
        let style = contents(&files, "dashboard/models/dashboard_style.rs");
        assert!(style.contains("#[serde(rename = \"light\")]"));
        let union = contents(&files, "dashboard/models/string_or_bool.rs");
        assert!(union.contains("#[serde(untagged)]"));
        assert!(union.contains("    Bool(bool),"));
        assert_eq!(
            contents(&files, "dashboard/models/uid.rs").lines().last(),
            Some("pub type Uid = String;")
        );
    }

    #[test]
    fn builders_accept_nested_builders() {
        let files = generate(&dashboard(), "{}");
        let builder = contents(&files, "dashboard/builders/dashboard.rs");
        assert!(builder.contains("pub struct DashboardBuilder {"));
        assert!(builder.contains("missing: BTreeSet::from([\"title\"]),"));
        assert!(builder.contains("V: Into<Nested<models::DashboardLink>>,"));
        assert!(builder.contains("match resolve_list::<models::DashboardLink, _, _>(\"links\", links) {"));
        assert!(builder.contains("pub fn timepicker(mut self, timepicker: impl Into<Nested<models::TimePicker>>) -> Self {"));
        assert!(builder.contains("impl From<&DashboardBuilder> for Nested<models::Dashboard> {"));
    }

    #[test]
    fn veneers_reshape_the_builder_api() {
        let veneers = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/veneers.yaml")).unwrap();
        let files = generate(&dashboard(), &veneers);
        assert!(files.get("dashboard/builders/time_picker.rs").is_none());
        let builder = contents(&files, "dashboard/builders/dashboard.rs");
        assert!(builder.contains("pub fn new(title: impl Into<String>) -> Self {"));
        assert!(builder.contains("        .title(title)"));
        assert!(builder.contains("pub fn readonly(mut self) -> Self {"));
        assert!(builder.contains("self.internal.editable = false;"));
        assert!(builder.contains("self.internal.links.get_or_insert_with(Default::default).push(value);"));
        assert!(builder.contains("pub fn timepicker(mut self, timepicker: models::TimePicker) -> Self {"));
    }

    #[test]
    fn omitted_options_no_longer_count_as_missing() {
        let files = generate(&dashboard(), "options:\n  - omit: { by_name: DashboardLink.url }\n");
        let builder = contents(&files, "dashboard/builders/dashboard_link.rs");
        assert!(builder.contains("missing: BTreeSet::from([\"title\"]),"));
        assert!(!builder.contains("\"url\""));
    }

    #[test]
    fn merged_options_write_through_optional_structs() {
        let veneers = "builders:\n  - merge_into: { by_name: Dashboard, source: TimePicker, under: timepicker }\n";
        let files = generate(&dashboard(), veneers);
        let builder = contents(&files, "dashboard/builders/dashboard.rs");
        assert!(builder.contains("pub fn hidden(mut self, hidden: bool) -> Self {"));
        assert!(builder.contains("self.internal.timepicker.get_or_insert_with(Default::default).hidden = hidden;"));
        assert!(builder.contains(
            "self.internal.timepicker.get_or_insert_with(Default::default).refresh_intervals = Some(refresh_intervals);"
        ));
        assert!(!builder.contains("self.missing.remove(\"timepicker\")"));
    }

    #[test]
    fn constrained_arguments_are_checked_before_assignment() {
        let yaml = r#"
package: p
types:
  - name: Link
    kind: struct
    fields:
      - { name: title, type: string, required: true, constraints: [{ op: minLength, value: 1 }] }
      - { name: ratio, type: float64, constraints: [{ op: ">=", value: 0 }, { op: "<", value: 1 }] }
"#;
        let files = generate(yaml, "{}");
        let builder = contents(&files, "p/builders/link.rs");
        assert!(builder.contains("        let title: String = title.into();\n        if !(title.chars().count() >= 1) {"));
        assert!(builder.contains(
            "self.errors.insert(\"title\", BuildError::invalid_value(\"Link\", \"title\", \"must have length >= 1\"));"
        ));
        assert!(builder.contains("        self.internal.title = title;\n        self.errors.remove(\"title\");"));
        assert!(builder.contains("if !(ratio >= 0.0) {"));
        assert!(builder.contains("if !(ratio < 1.0) {"));
    }

    #[test]
    fn nullable_self_references_are_boxed() {
        let files = generate(
            "package: p\ntypes:\n  - name: Node\n    kind: struct\n    fields:\n      - { name: next, type: \"Node?\", required: true }\n",
            "{}",
        );
        let model = contents(&files, "p/models/node.rs");
        assert!(model.contains("pub next: Option<Box<Node>>,"));
        let builder = contents(&files, "p/builders/node.rs");
        assert!(builder.contains("self.internal.next = Some(Box::new(value));"));
    }

    #[test]
    fn use_paths_are_validated() {
        assert!(check_use_path("cogjen::runtime").is_ok());
        assert!(check_use_path("::my_crate::r#gen::runtime").is_ok());
        assert!(check_use_path("").is_err());
        assert!(check_use_path("a::b; fn evil()").is_err());
    }
}
