//! TypeScript target: a directory per type holding `types_gen.ts` and, when
//! the type has one, `builder_gen.ts`.
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::{Context, File, Files, Jenny, Writer, GENERATED_HEADER};
use crate::builders::{resolve_path, tracked_required, Argument, AssignmentMethod, AssignmentValue, BuilderSpec, Builders};
use crate::error::Result;
use crate::ir::{EnumDef, EnumValue, ScalarKind, Schema, StructDef, TypeDef, TypeId, TypeKind, TypeRef, Variant};
use crate::naming::{is_valid_identifier, Target};

const INDENT: &str = "\t";

pub struct RuntimeJenny;
pub struct ModelsJenny;
pub struct BuildersJenny;

impl Jenny for RuntimeJenny {
    fn name(&self) -> &'static str {
        "TypeScriptRuntime"
    }

    fn generate(&self, _ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        files.push(File::new("options_builder_gen.ts", format!("// {GENERATED_HEADER}\n\n{RUNTIME}"), self.name()));
        Ok(files)
    }
}

impl Jenny for ModelsJenny {
    fn name(&self) -> &'static str {
        "TypeScriptModels"
    }

    fn generate(&self, ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        for package in &ctx.packages {
            let schema = package.schema;
            let mut index = Writer::new(INDENT);
            index.line(0, format!("// {GENERATED_HEADER}"));
            index.blank();
            for def in &schema.types {
                let dir = stem(def);
                files.push(File::new(
                    format!("{}/{dir}/types_gen.ts", schema.package),
                    types_file(schema, def),
                    self.name(),
                ));
                index.line(0, format!("export * from \"./{dir}/types_gen\";"));
                if package.builders.for_type(def.id).is_some() {
                    index.line(0, format!("export * from \"./{dir}/builder_gen\";"));
                }
            }
            files.push(File::new(format!("{}/index.ts", schema.package), index.finish(), self.name()));
        }
        Ok(files)
    }
}

impl Jenny for BuildersJenny {
    fn name(&self) -> &'static str {
        "TypeScriptBuilders"
    }

    fn generate(&self, ctx: &Context<'_>) -> Result<Files> {
        let mut files = Files::default();
        for package in &ctx.packages {
            let schema = package.schema;
            for spec in &package.builders.specs {
                let def = schema.get(spec.for_type);
                files.push(File::new(
                    format!("{}/{}/builder_gen.ts", schema.package, stem(def)),
                    builder_file(schema, package.builders, spec),
                    self.name(),
                ));
            }
        }
        Ok(files)
    }
}

const RUNTIME: &str = r#"export interface OptionsBuilder<T> {
	build: () => T;
}

export class BuildError extends Error {
	readonly typeName: string;
	readonly missing: string[];

	constructor(typeName: string, missing: string[]) {
		super(`${typeName}: required fields never set: ${missing.join(", ")}`);
		this.name = "BuildError";
		this.typeName = typeName;
		this.missing = missing;
	}
}

export class ConstraintError extends Error {
	readonly subject: string;

	constructor(subject: string, message: string) {
		super(`${subject} ${message}`);
		this.name = "ConstraintError";
		this.subject = subject;
	}
}

export type ValueOrBuilder<T> = T | OptionsBuilder<T>;

export const isBuilder = <T>(value: ValueOrBuilder<T>): value is OptionsBuilder<T> => {
	return typeof value === "object" && value !== null && typeof (value as OptionsBuilder<T>).build === "function";
};

export const resolve = <T>(value: ValueOrBuilder<T>): T => {
	return isBuilder(value) ? value.build() : value;
};

export interface EncodeOptions {
	sortKeys?: boolean;
	indent?: number;
}

const sortKeys = (value: unknown): unknown => {
	if (Array.isArray(value)) {
		return value.map(sortKeys);
	}
	if (typeof value === "object" && value !== null) {
		const sorted: Record<string, unknown> = {};
		for (const key of Object.keys(value).sort()) {
			sorted[key] = sortKeys((value as Record<string, unknown>)[key]);
		}
		return sorted;
	}
	return value;
};

export const encode = (value: unknown, options: EncodeOptions = {}): string => {
	const indent = options.indent ?? 2;
	const data = options.sortKeys ? sortKeys(value) : value;
	return indent > 0 ? JSON.stringify(data, null, indent) : JSON.stringify(data);
};
"#;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

fn types_file(schema: &Schema, def: &TypeDef) -> String {
    let mut imports = Imports::new(stem(def), true);
    let mut w = Writer::new(INDENT);
    let name = &def.names.typescript;
    doc_comment(&mut w, 0, &def.comments);
    match &def.kind {
        TypeKind::Struct(s) => write_interface(&mut w, schema, &mut imports, name, s),
        TypeKind::Enum(e) => write_enum(&mut w, name, e),
        TypeKind::Disjunction(variants) => write_union(&mut w, schema, &mut imports, name, variants),
        TypeKind::Alias(target) => {
            let ty = ts_type(schema, &mut imports, target);
            w.line(0, format!("export type {name} = {ty};"));
            w.blank();
            let zero = zero_value(schema, &mut imports, target);
            w.line(0, format!("export const default{name} = (): {name} => ({zero});"));
        }
    }
    with_header(imports, w)
}

fn write_interface(w: &mut Writer, schema: &Schema, imports: &mut Imports, name: &str, s: &StructDef) {
    w.line(0, format!("export interface {name} {{"));
    for field in &s.fields {
        doc_comment(w, 1, &field.comments);
        let optional = if field.required { "" } else { "?" };
        let ty = ts_type(schema, imports, &field.ty);
        w.line(1, format!("{}{optional}: {ty};", property(&field.names.wire)));
    }
    w.line(0, "}");
    w.blank();
    w.line(0, format!("export const default{name} = (): {name} => ({{"));
    for field in s.fields.iter().filter(|f| f.required) {
        let value = match &field.default {
            Some(default) => literal(schema, imports, &field.ty, default),
            None => zero_value(schema, imports, &field.ty),
        };
        w.line(1, format!("{}: {value},", property(&field.names.wire)));
    }
    w.line(0, "});");
}

fn write_enum(w: &mut Writer, name: &str, e: &EnumDef) {
    w.line(0, format!("export enum {name} {{"));
    for member in &e.members {
        let value = match &member.value {
            EnumValue::Int(i) => i.to_string(),
            EnumValue::Str(s) => json_string(s),
        };
        w.line(1, format!("{} = {value},", member.names.typescript));
    }
    w.line(0, "}");
}

fn write_union(w: &mut Writer, schema: &Schema, imports: &mut Imports, name: &str, variants: &[Variant]) {
    let branches: Vec<String> = variants.iter().map(|v| ts_type(schema, imports, &v.ty)).collect();
    w.line(0, format!("export type {name} = {};", branches.join(" | ")));
    w.blank();
    let zero = match variants.first() {
        Some(first) => zero_value(schema, imports, &first.ty),
        None => "null".to_string(),
    };
    w.line(0, format!("export const default{name} = (): {name} => ({zero});"));
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

fn builder_file(schema: &Schema, builders: &Builders, spec: &BuilderSpec) -> String {
    let def = schema.get(spec.for_type);
    let mut imports = Imports::new(stem(def), false);
    let model = imports.name(schema, def.id);
    let default_fn = imports.default_fn(schema, def.id);

    let mut w = Writer::new(INDENT);
    doc_comment(&mut w, 0, &def.comments);
    w.line(0, format!("export class {model}Builder implements cog.OptionsBuilder<{model}> {{"));
    w.line(1, format!("private readonly internal: {model};"));
    let required: Vec<String> =
        tracked_required(schema, spec).iter().map(|f| json_string(&f.names.wire)).collect();
    w.line(1, format!("private readonly missing = new Set<string>([{}]);", required.join(", ")));
    w.blank();

    let promoted: Vec<_> = spec.options.iter().filter(|o| o.is_constructor_arg).collect();
    let mut params = Vec::new();
    for option in &promoted {
        for arg in &option.args {
            params.push(format!("{}: {}", arg.names.typescript, arg_type(schema, builders, &mut imports, &arg.ty)));
        }
    }
    w.line(1, format!("constructor({}) {{", params.join(", ")));
    w.line(2, format!("this.internal = {default_fn}();"));
    for option in &promoted {
        let args: Vec<&str> = option.args.iter().map(|a| a.names.typescript.as_str()).collect();
        w.line(2, format!("this.{}({});", option.names.typescript, args.join(", ")));
    }
    w.line(1, "}");
    w.blank();

    w.line(1, format!("build(): {model} {{"));
    w.line(2, "if (this.missing.size > 0) {");
    w.line(3, format!("throw new cog.BuildError({}, [...this.missing].sort());", json_string(&def.names.wire)));
    w.line(2, "}");
    w.line(2, "return structuredClone(this.internal);");
    w.line(1, "}");

    for option in &spec.options {
        w.blank();
        doc_comment(&mut w, 1, &option.comments);
        let params: Vec<String> = option
            .args
            .iter()
            .map(|arg| format!("{}: {}", arg.names.typescript, arg_type(schema, builders, &mut imports, &arg.ty)))
            .collect();
        w.line(1, format!("{}({}): this {{", option.names.typescript, params.join(", ")));
        let subject = format!("{}.{}", def.names.wire, option.names.wire);
        for arg in &option.args {
            write_constraints(&mut w, arg, &subject);
        }
        for assignment in &option.assignments {
            let Some(steps) = resolve_path(schema, def.id, &assignment.path) else { continue };
            let Some((last, parents)) = steps.split_last() else { continue };
            let field = last.field;
            let mut target = "this.internal".to_string();
            for step in parents {
                target.push_str(&accessor(&step.field.names.wire));
                if let Some(id) = step.target {
                    let default_fn = imports.default_fn(schema, id);
                    w.line(2, format!("if (!{target}) {{"));
                    w.line(3, format!("{target} = {default_fn}();"));
                    w.line(2, "}");
                }
            }
            let target = format!("{target}{}", accessor(&field.names.wire));
            let value = match &assignment.value {
                AssignmentValue::Constant(value) => literal(schema, &mut imports, &field.ty, value),
                AssignmentValue::Argument(index) => {
                    let Some(arg) = option.args.get(*index) else { continue };
                    resolution(schema, builders, &arg.ty, &arg.names.typescript)
                }
            };
            match assignment.method {
                AssignmentMethod::Set => w.line(2, format!("{target} = {value};")),
                AssignmentMethod::Append => {
                    if !field.required || matches!(field.ty, TypeRef::Nullable(_)) {
                        w.line(2, format!("if (!{target}) {{"));
                        w.line(3, format!("{target} = [];"));
                        w.line(2, "}");
                    }
                    w.line(2, format!("{target}.push({value});"));
                }
            }
            let top = steps[0].field;
            if top.required && top.default.is_none() {
                w.line(2, format!("this.missing.delete({});", json_string(&top.names.wire)));
            }
        }
        w.line(2, "return this;");
        w.line(1, "}");
    }
    w.line(0, "}");

    let mut out = format!("// {GENERATED_HEADER}\n\nimport * as cog from \"../../options_builder_gen\";\n");
    out.push_str(&imports.render());
    out.push('\n');
    out.push_str(&w.finish());
    out
}

fn write_constraints(w: &mut Writer, arg: &Argument, subject: &str) {
    let ident = &arg.names.typescript;
    for constraint in &arg.constraints {
        let value = if constraint.op.is_length() { format!("{ident}.length") } else { ident.clone() };
        let op = match constraint.op.comparison() {
            "==" => "===",
            "!=" => "!==",
            other => other,
        };
        w.line(2, format!("if (!({value} {op} {})) {{", constraint.value));
        w.line(
            3,
            format!("throw new cog.ConstraintError({}, {});", json_string(subject), json_string(&constraint.describe())),
        );
        w.line(2, "}");
    }
}

fn arg_type(schema: &Schema, builders: &Builders, imports: &mut Imports, ty: &TypeRef) -> String {
    if builders.has_builder(schema, ty) {
        return format!("cog.ValueOrBuilder<{}>", ts_type(schema, imports, ty));
    }
    match ty {
        TypeRef::List(item) if builders.has_builder(schema, item) => {
            format!("cog.ValueOrBuilder<{}>[]", ts_type(schema, imports, item))
        }
        TypeRef::Map(item) if builders.has_builder(schema, item) => {
            format!("Record<string, cog.ValueOrBuilder<{}>>", ts_type(schema, imports, item))
        }
        other => ts_type(schema, imports, other),
    }
}

fn resolution(schema: &Schema, builders: &Builders, ty: &TypeRef, ident: &str) -> String {
    if builders.has_builder(schema, ty) {
        return format!("cog.resolve({ident})");
    }
    match ty {
        TypeRef::List(item) if builders.has_builder(schema, item) => {
            format!("{ident}.map((item) => cog.resolve(item))")
        }
        TypeRef::Map(item) if builders.has_builder(schema, item) => format!(
            "Object.fromEntries(Object.entries({ident}).map(([key, item]) => [key, cog.resolve(item)]))"
        ),
        _ => ident.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Names a generated file pulls in from sibling type directories.
struct Imports {
    here: String,
    /// Skip names declared in the file being generated.
    skip_here: bool,
    modules: BTreeMap<String, BTreeSet<String>>,
}

impl Imports {
    fn new(here: String, skip_here: bool) -> Self {
        Self { here, skip_here, modules: BTreeMap::new() }
    }

    fn add(&mut self, schema: &Schema, id: TypeId, name: String) -> String {
        let dir = stem(schema.get(id));
        if dir == self.here && self.skip_here {
            return name;
        }
        let module = if dir == self.here { "./types_gen".to_string() } else { format!("../{dir}/types_gen") };
        self.modules.entry(module).or_default().insert(name.clone());
        name
    }

    fn name(&mut self, schema: &Schema, id: TypeId) -> String {
        let name = schema.get(id).names.typescript.clone();
        self.add(schema, id, name)
    }

    fn default_fn(&mut self, schema: &Schema, id: TypeId) -> String {
        let name = format!("default{}", schema.get(id).names.typescript);
        self.add(schema, id, name)
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (module, names) in &self.modules {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            out.push_str(&format!("import {{ {} }} from \"{module}\";\n", names.join(", ")));
        }
        out
    }
}

fn with_header(imports: Imports, w: Writer) -> String {
    let mut out = format!("// {GENERATED_HEADER}\n\n");
    let rendered = imports.render();
    if !rendered.is_empty() {
        out.push_str(&rendered);
        out.push('\n');
    }
    out.push_str(&w.finish());
    out
}

fn stem(def: &TypeDef) -> String {
    def.names.file_stem(Target::TypeScript).unwrap_or_default()
}

fn ts_type(schema: &Schema, imports: &mut Imports, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Scalar(kind) => match kind {
            ScalarKind::String => "string".into(),
            ScalarKind::Bool => "boolean".into(),
            ScalarKind::Any => "unknown".into(),
            _ => "number".into(),
        },
        TypeRef::Named(id) => imports.name(schema, *id),
        TypeRef::List(inner) => {
            let item = ts_type(schema, imports, inner);
            if item.contains(' ') { format!("({item})[]") } else { format!("{item}[]") }
        }
        TypeRef::Map(inner) => format!("Record<string, {}>", ts_type(schema, imports, inner)),
        TypeRef::Nullable(inner) => format!("{} | null", ts_type(schema, imports, inner)),
    }
}

fn zero_value(schema: &Schema, imports: &mut Imports, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Scalar(kind) => match kind {
            ScalarKind::String => "\"\"".into(),
            ScalarKind::Bool => "false".into(),
            ScalarKind::Any => "null".into(),
            _ => "0".into(),
        },
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            match &def.kind {
                TypeKind::Enum(e) => match e.members.first() {
                    Some(first) => format!("{}.{}", imports.name(schema, *id), first.names.typescript),
                    None => "null".into(),
                },
                _ => format!("{}()", imports.default_fn(schema, *id)),
            }
        }
        TypeRef::List(_) => "[]".into(),
        TypeRef::Map(_) => "{}".into(),
        TypeRef::Nullable(_) => "null".into(),
    }
}

fn literal(schema: &Schema, imports: &mut Imports, ty: &TypeRef, value: &Value) -> String {
    if value.is_null() {
        return "null".into();
    }
    match schema.resolve_alias(ty) {
        TypeRef::Nullable(inner) => literal(schema, imports, inner, value),
        TypeRef::Named(id) => {
            let def = schema.get(*id);
            let TypeKind::Enum(e) = &def.kind else { return value.to_string() };
            match e.members.iter().find(|m| match &m.value {
                EnumValue::Int(i) => value.as_i64() == Some(*i),
                EnumValue::Str(s) => value.as_str() == Some(s.as_str()),
            }) {
                Some(member) => format!("{}.{}", imports.name(schema, *id), member.names.typescript),
                None => value.to_string(),
            }
        }
        _ => value.to_string(),
    }
}

fn property(wire: &str) -> String {
    if is_valid_identifier(wire) { wire.to_string() } else { json_string(wire) }
}

fn accessor(wire: &str) -> String {
    if is_valid_identifier(wire) { format!(".{wire}") } else { format!("[{}]", json_string(wire)) }
}

fn json_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn doc_comment(w: &mut Writer, depth: usize, comments: &[String]) {
    if comments.is_empty() {
        return;
    }
    w.line(depth, "/**");
    for line in comments.iter().flat_map(|c| c.lines()) {
        w.line(depth, format!(" * {}", line.replace("*/", "*\\/")));
    }
    w.line(depth, " */");
}
