//! Language-neutral builder descriptions.
//!
//! A [`BuilderSpec`] lists the options (setters) a generated builder exposes
//! and which model fields each option writes. Jennies only render these;
//! veneers reshape them before rendering.
use crate::ir::{Constraint, FieldDef, Schema, StructDef, TypeDef, TypeId, TypeRef};
use crate::naming::Names;

#[derive(Debug, Clone)]
pub struct BuilderSpec {
    pub for_type: TypeId,
    pub options: Vec<BuilderOption>,
}

#[derive(Debug, Clone)]
pub struct BuilderOption {
    pub names: Names,
    pub args: Vec<Argument>,
    pub assignments: Vec<Assignment>,
    pub is_constructor_arg: bool,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub names: Names,
    /// Declared field type with a top-level nullable wrapper removed: an
    /// unset option already means "no value".
    pub ty: TypeRef,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    /// Field indices from the built struct down to the assigned field.
    /// Every step but the last goes through a struct-valued field, which
    /// setters create on first use.
    pub path: Vec<usize>,
    pub value: AssignmentValue,
    pub method: AssignmentMethod,
}

impl Assignment {
    pub fn field(field: usize, value: AssignmentValue) -> Self {
        Self { path: vec![field], value, method: AssignmentMethod::Set }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentValue {
    /// Index into the option's arguments.
    Argument(usize),
    Constant(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMethod {
    Set,
    Append,
}

/// Builders for one package.
#[derive(Debug, Clone)]
pub struct Builders {
    pub specs: Vec<BuilderSpec>,
}

impl Builders {
    pub fn for_type(&self, id: TypeId) -> Option<&BuilderSpec> {
        self.specs.iter().find(|b| b.for_type == id)
    }

    /// True when a builder for the struct behind `ty` (aliases resolved)
    /// will be generated.
    pub fn has_builder(&self, schema: &Schema, ty: &TypeRef) -> bool {
        match schema.resolve_alias(ty) {
            TypeRef::Named(id) => schema.is_struct(*id) && self.for_type(*id).is_some(),
            _ => false,
        }
    }
}

pub fn derive_builders(schema: &Schema) -> Builders {
    let specs = schema
        .structs()
        .map(|(def, s)| derive_builder(def, s))
        .collect();
    Builders { specs }
}

pub(crate) fn derive_builder(def: &TypeDef, s: &StructDef) -> BuilderSpec {
    BuilderSpec {
        for_type: def.id,
        options: s
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| option_for_field(index, field))
            .collect(),
    }
}

fn option_for_field(index: usize, field: &FieldDef) -> BuilderOption {
    BuilderOption {
        names: option_names(&field.names.wire),
        args: vec![Argument::for_field(field)],
        assignments: vec![Assignment::field(index, AssignmentValue::Argument(0))],
        is_constructor_arg: false,
        comments: field.comments.clone(),
    }
}

impl Argument {
    /// An argument carrying one field's value.
    pub fn for_field(field: &FieldDef) -> Self {
        Argument {
            names: Names::for_field(&field.names.wire),
            ty: field.ty.strip_nullable().clone(),
            constraints: field.constraints.clone(),
        }
    }
}

/// Field names, minus the identifiers builders already use for themselves.
pub fn option_names(wire: &str) -> Names {
    let mut names = Names::for_field(wire);
    if matches!(names.rust.as_str(), "new" | "build") {
        names.rust.push_str("_val");
    }
    if names.python == "build" {
        names.python.push_str("_val");
    }
    names
}

/// Field lookup shared by the builder jennies.
pub fn struct_fields<'a>(schema: &'a Schema, spec: &BuilderSpec) -> &'a [FieldDef] {
    schema.fields(spec.for_type)
}

/// One hop of an assignment path.
#[derive(Debug, Clone, Copy)]
pub struct PathStep<'a> {
    /// Struct holding `field`.
    pub owner: TypeId,
    pub field: &'a FieldDef,
    /// Struct stored in `field`, when the path continues through it.
    pub target: Option<TypeId>,
}

/// Walk `path` from `root`. `None` when an index is out of range or an
/// intermediate field does not hold a struct.
pub fn resolve_path<'a>(schema: &'a Schema, root: TypeId, path: &[usize]) -> Option<Vec<PathStep<'a>>> {
    let mut steps = Vec::with_capacity(path.len());
    let mut owner = root;
    for (depth, index) in path.iter().enumerate() {
        let field = schema.fields(owner).get(*index)?;
        let target = schema.struct_target(&field.ty);
        steps.push(PathStep { owner, field, target });
        if depth + 1 < path.len() {
            owner = target?;
        }
    }
    if steps.is_empty() { None } else { Some(steps) }
}

/// Dotted wire names of a path, such as `timepicker.hidden`.
pub fn path_key(steps: &[PathStep<'_>]) -> String {
    steps.iter().map(|s| s.field.names.wire.as_str()).collect::<Vec<_>>().join(".")
}

/// Required fields without a default that some option of `spec` still
/// assigns. Only these are reported as missing by `build()`: a field no
/// option can reach keeps its model default instead.
pub fn tracked_required<'a>(schema: &'a Schema, spec: &BuilderSpec) -> Vec<&'a FieldDef> {
    struct_fields(schema, spec)
        .iter()
        .enumerate()
        .filter(|(_, field)| field.required && field.default.is_none())
        .filter(|(index, _)| {
            spec.options
                .iter()
                .flat_map(|option| &option.assignments)
                .any(|assignment| assignment.path.first() == Some(index))
        })
        .map(|(_, field)| field)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_schema;
    use crate::schema::SchemaDoc;

    #[test]
    fn one_option_per_field_in_declaration_order() {
        let doc = SchemaDoc::from_yaml_str(
            r#"
package: p
types:
  - name: Panel
    kind: struct
    fields:
      - { name: type, type: string, required: true }
      - { name: build, type: "int64?" }
      - { name: gridPos, type: GridPos }
  - name: GridPos
    kind: struct
    fields:
      - { name: x, type: int32 }
"#,
            "p.yaml",
        )
        .unwrap();
        let schema = lower_schema(&doc).unwrap();
        let builders = derive_builders(&schema);
        assert_eq!(builders.specs.len(), 2);

        let panel = schema.lookup("Panel").unwrap();
        let spec = builders.for_type(panel.id).unwrap();
        let names: Vec<&str> = spec.options.iter().map(|o| o.names.rust.as_str()).collect();
        assert_eq!(names, ["r#type", "build_val", "grid_pos"]);
        // nullable wrapper is dropped from the argument
        assert_eq!(spec.options[1].args[0].ty, TypeRef::Scalar(crate::ir::ScalarKind::Int64));
        assert!(builders.has_builder(&schema, &spec.options[2].args[0].ty));
    }

    #[test]
    fn only_reachable_required_fields_are_tracked() {
        let doc = SchemaDoc::from_yaml_str(
            r#"
package: p
types:
  - name: Link
    kind: struct
    fields:
      - { name: title, type: string, required: true }
      - { name: url, type: string, required: true }
      - { name: rank, type: int32, required: true, default: 0 }
"#,
            "p.yaml",
        )
        .unwrap();
        let schema = lower_schema(&doc).unwrap();
        let mut spec = derive_builders(&schema).specs.remove(0);
        let tracked: Vec<&str> = tracked_required(&schema, &spec).iter().map(|f| f.names.wire.as_str()).collect();
        assert_eq!(tracked, ["title", "url"]);

        spec.options.retain(|o| o.names.wire != "url");
        let tracked: Vec<&str> = tracked_required(&schema, &spec).iter().map(|f| f.names.wire.as_str()).collect();
        assert_eq!(tracked, ["title"]);
    }

    #[test]
    fn paths_walk_through_struct_fields() {
        let doc = SchemaDoc::from_yaml_str(
            r#"
package: p
types:
  - name: Panel
    kind: struct
    fields:
      - { name: title, type: string }
      - { name: fieldConfig, type: "FieldConfigSource?" }
  - name: FieldConfigSource
    kind: struct
    fields:
      - { name: defaults, type: Defaults, required: true }
  - { name: Defaults, kind: alias, type: FieldConfig }
  - name: FieldConfig
    kind: struct
    fields:
      - { name: unit, type: string }
"#,
            "p.yaml",
        )
        .unwrap();
        let schema = lower_schema(&doc).unwrap();
        let panel = schema.lookup("Panel").unwrap().id;
        let steps = resolve_path(&schema, panel, &[1, 0, 0]).unwrap();
        assert_eq!(path_key(&steps), "fieldConfig.defaults.unit");
        assert_eq!(steps[1].target, Some(schema.lookup("FieldConfig").unwrap().id));
        assert_eq!(steps[2].owner, schema.lookup("FieldConfig").unwrap().id);

        assert!(resolve_path(&schema, panel, &[0, 0]).is_none());
        assert!(resolve_path(&schema, panel, &[5]).is_none());
    }
}
