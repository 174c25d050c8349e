//! Lowering: raw schema documents → closed, validated [`ir::Schema`].
//!
//! Output depends only on the set of declarations, never on their order in
//! the input: types are placed in the arena sorted by wire name.
use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{CycleKind, GenError, Location, Result};
use crate::ir::{
    Constraint, ConstraintOp, EnumDef, EnumMember, EnumValue, EnumValueKind, FieldDef, ScalarKind,
    Schema, StructDef, TypeDef, TypeId, TypeKind, TypeRef, Variant,
};
use crate::naming::{is_valid_identifier, Names, Target};
use crate::schema::{RawEnumValue, RawField, RawType, SchemaDoc, TypeExpr};

pub fn lower_schema(doc: &SchemaDoc) -> Result<Schema> {
    let root = doc.location();
    if !is_valid_identifier(&doc.package) {
        return Err(GenError::InvalidIdentifier {
            name: doc.package.clone(),
            location: root.child("package"),
        });
    }
    if doc.types.is_empty() {
        return Err(GenError::EmptySchema { package: doc.package.clone(), location: root.child("types") });
    }

    // 1) names → ids, sorted so ids do not depend on declaration order
    let mut declared: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, raw) in doc.types.iter().enumerate() {
        let location = root.child(format!("types[{index}]"));
        let name = raw.name();
        if !is_valid_identifier(name) {
            return Err(GenError::InvalidIdentifier { name: name.to_string(), location });
        }
        if ScalarKind::from_name(name).is_some() {
            return Err(GenError::DuplicateName {
                name: name.to_string(),
                scope: "type".into(),
                previous: Some("built-in scalar".into()),
                location,
            });
        }
        if let Some(previous) = declared.insert(name, index) {
            return Err(GenError::DuplicateName {
                name: name.to_string(),
                scope: "type".into(),
                previous: Some(root.child(format!("types[{previous}]")).to_string()),
                location,
            });
        }
    }
    let by_name: IndexMap<String, TypeId> = declared
        .keys()
        .enumerate()
        .map(|(id, name)| (name.to_string(), TypeId(id)))
        .collect();

    // 2) resolve every definition
    let mut types = Vec::with_capacity(declared.len());
    for (id, (_, &index)) in declared.iter().enumerate() {
        let raw = &doc.types[index];
        let location = root.child(format!("types[{index}]"));
        let kind = lower_kind(raw, &by_name, &location)?;
        tracing::debug!(package = %doc.package, name = raw.name(), "lowered type");
        types.push(TypeDef {
            id: TypeId(id),
            names: Names::for_type(raw.name()),
            kind,
            comments: raw.comments().to_vec(),
            location,
        });
    }

    let schema = Schema { package: doc.package.clone(), types, by_name };

    check_type_identifiers(&schema)?;
    check_defaults(&schema)?;
    check_constraints(&schema)?;
    check_cycles(&schema)?;
    check_alias_cycles(&schema)?;

    Ok(schema)
}

/// Lower and merge nothing: every document is its own package.
pub fn lower_all(docs: &[SchemaDoc]) -> Result<Vec<Schema>> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        if let Some(previous) = seen.insert(&doc.package, &doc.source) {
            return Err(GenError::DuplicateName {
                name: doc.package.clone(),
                scope: "package".into(),
                previous: Some(previous.to_string()),
                location: doc.location().child("package"),
            });
        }
        out.push(lower_schema(doc)?);
    }
    out.sort_by(|a, b| a.package.cmp(&b.package));
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// DEFINITIONS
// ————————————————————————————————————————————————————————————————————————————

fn lower_kind(raw: &RawType, by_name: &IndexMap<String, TypeId>, location: &Location) -> Result<TypeKind> {
    match raw {
        RawType::Struct { name, fields, .. } => {
            let mut out = StructDef::default();
            let mut wire_seen: HashMap<&str, usize> = HashMap::new();
            for (index, field) in fields.iter().enumerate() {
                let field_location = location.child(format!("fields[{index}]"));
                if let Some(previous) = wire_seen.insert(&field.name, index) {
                    return Err(GenError::DuplicateName {
                        name: field.name.clone(),
                        scope: format!("field in `{name}`"),
                        previous: Some(location.child(format!("fields[{previous}]")).to_string()),
                        location: field_location,
                    });
                }
                out.fields.push(lower_field(name, field, by_name, field_location)?);
            }
            check_field_identifiers(name, &out.fields)?;
            Ok(TypeKind::Struct(out))
        }
        RawType::Disjunction { name, variants, .. } => {
            if variants.is_empty() {
                return Err(GenError::InvalidTypeExpr {
                    expr: name.clone(),
                    reason: "a disjunction needs at least one variant".into(),
                    location: location.clone(),
                });
            }
            let mut out: Vec<Variant> = Vec::with_capacity(variants.len());
            for (index, src) in variants.iter().enumerate() {
                let variant_location = location.child(format!("variants[{index}]"));
                let ty = resolve(src, name, by_name, &variant_location)?;
                let label = variant_label(&ty, by_name);
                if out.iter().any(|v| v.names.wire == label) {
                    return Err(GenError::DuplicateName {
                        name: label,
                        scope: format!("variant in `{name}`"),
                        previous: None,
                        location: variant_location,
                    });
                }
                out.push(Variant { names: Names::for_variant(&label), ty });
            }
            Ok(TypeKind::Disjunction(out))
        }
        RawType::Alias { name, target, .. } => {
            Ok(TypeKind::Alias(resolve(target, name, by_name, &location.child("type"))?))
        }
        RawType::Enum { name, members, .. } => lower_enum(name, members, location),
    }
}

fn lower_field(
    owner: &str,
    field: &RawField,
    by_name: &IndexMap<String, TypeId>,
    location: Location,
) -> Result<FieldDef> {
    if !is_valid_identifier(&field.name) {
        return Err(GenError::InvalidIdentifier { name: field.name.clone(), location });
    }
    let from = format!("{owner}.{}", field.name);
    let ty = resolve(&field.ty, &from, by_name, &location.child("type"))?;
    let mut constraints = Vec::with_capacity(field.constraints.len());
    for (index, raw) in field.constraints.iter().enumerate() {
        let Some(op) = ConstraintOp::from_name(&raw.op) else {
            return Err(GenError::TypeMismatch {
                subject: from,
                expected: format!(
                    "a constraint operator ({})",
                    ConstraintOp::ALL.map(|op| op.name()).join(", ")
                ),
                found: raw.op.clone(),
                location: location.child(format!("constraints[{index}]")),
            });
        };
        constraints.push(Constraint { op, value: raw.value.clone() });
    }
    Ok(FieldDef {
        names: Names::for_field(&field.name),
        ty,
        required: field.required,
        default: field.default.clone(),
        constraints,
        comments: field.comments.clone(),
        location,
    })
}

fn lower_enum(name: &str, members: &[crate::schema::RawEnumMember], location: &Location) -> Result<TypeKind> {
    let Some(first) = members.first() else {
        return Err(GenError::InvalidTypeExpr {
            expr: name.to_string(),
            reason: "an enum needs at least one member".into(),
            location: location.clone(),
        });
    };
    let value_kind = match first.value {
        RawEnumValue::Int(_) => EnumValueKind::Int,
        RawEnumValue::Str(_) => EnumValueKind::Str,
    };
    let mut out: Vec<EnumMember> = Vec::with_capacity(members.len());
    for (index, member) in members.iter().enumerate() {
        let member_location = location.child(format!("members[{index}]"));
        if !is_valid_identifier(&member.name) {
            return Err(GenError::InvalidIdentifier { name: member.name.clone(), location: member_location });
        }
        let value = match (&member.value, value_kind) {
            (RawEnumValue::Int(i), EnumValueKind::Int) => EnumValue::Int(*i),
            (RawEnumValue::Str(s), EnumValueKind::Str) => EnumValue::Str(s.clone()),
            (other, _) => {
                return Err(GenError::TypeMismatch {
                    subject: format!("{name}.{}", member.name),
                    expected: match value_kind {
                        EnumValueKind::Int => "an integer value".into(),
                        EnumValueKind::Str => "a string value".into(),
                    },
                    found: format!("{other:?}"),
                    location: member_location,
                });
            }
        };
        let names = Names::for_enum_member(&member.name);
        if let Some(clash) = out.iter().find(|m| {
            m.names.wire == names.wire || m.value == value || Target::ALL.iter().any(|t| m.names.get(*t) == names.get(*t))
        }) {
            return Err(GenError::DuplicateName {
                name: member.name.clone(),
                scope: format!("member of `{name}`"),
                previous: Some(clash.names.wire.clone()),
                location: member_location,
            });
        }
        out.push(EnumMember { names, value });
    }
    Ok(TypeKind::Enum(EnumDef { value_kind, members: out }))
}

// ————————————————————————————————————————————————————————————————————————————
// REFERENCES
// ————————————————————————————————————————————————————————————————————————————

fn resolve(src: &str, from: &str, by_name: &IndexMap<String, TypeId>, location: &Location) -> Result<TypeRef> {
    let expr = TypeExpr::parse(src).map_err(|reason| GenError::InvalidTypeExpr {
        expr: src.to_string(),
        reason,
        location: location.clone(),
    })?;
    resolve_expr(&expr, from, by_name, location)
}

fn resolve_expr(expr: &TypeExpr, from: &str, by_name: &IndexMap<String, TypeId>, location: &Location) -> Result<TypeRef> {
    Ok(match expr {
        TypeExpr::Named(name) => {
            if let Some(kind) = ScalarKind::from_name(name) {
                TypeRef::Scalar(kind)
            } else if let Some(id) = by_name.get(name) {
                TypeRef::Named(*id)
            } else {
                return Err(GenError::UnresolvedReference {
                    name: name.clone(),
                    from: from.to_string(),
                    location: location.clone(),
                });
            }
        }
        TypeExpr::List(inner) => TypeRef::List(Box::new(resolve_expr(inner, from, by_name, location)?)),
        TypeExpr::Map(inner) => TypeRef::Map(Box::new(resolve_expr(inner, from, by_name, location)?)),
        TypeExpr::Nullable(inner) => {
            let inner = resolve_expr(inner, from, by_name, location)?;
            // nullable<nullable<T>> carries no extra meaning
            if matches!(inner, TypeRef::Nullable(_)) {
                inner
            } else {
                TypeRef::Nullable(Box::new(inner))
            }
        }
    })
}

fn variant_label(ty: &TypeRef, by_name: &IndexMap<String, TypeId>) -> String {
    match ty {
        TypeRef::Scalar(kind) => crate::naming::pascal_case(kind.name()),
        TypeRef::Named(id) => by_name
            .get_index(id.0)
            .map(|(name, _)| name.clone())
            .unwrap_or_default(),
        TypeRef::List(inner) => format!("ListOf{}", variant_label(inner, by_name)),
        TypeRef::Map(inner) => format!("MapOf{}", variant_label(inner, by_name)),
        TypeRef::Nullable(inner) => format!("Nullable{}", variant_label(inner, by_name)),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

fn check_field_identifiers(owner: &str, fields: &[FieldDef]) -> Result<()> {
    for target in Target::ALL {
        let mut seen: HashMap<&str, &FieldDef> = HashMap::new();
        for field in fields {
            if let Some(previous) = seen.insert(field.names.get(target), field) {
                return Err(GenError::DuplicateName {
                    name: field.names.get(target).to_string(),
                    scope: format!("{target} identifier in `{owner}`"),
                    previous: Some(previous.names.wire.clone()),
                    location: field.location.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_type_identifiers(schema: &Schema) -> Result<()> {
    for target in Target::ALL {
        let mut seen: HashMap<String, &TypeDef> = HashMap::new();
        for def in &schema.types {
            let ident = def.names.get(target).to_string();
            let mut candidates = vec![ident.clone()];
            // builders live next to models in every target
            if matches!(def.kind, TypeKind::Struct(_)) {
                candidates.push(format!("{ident}Builder"));
            }
            if let Some(stem) = def.names.file_stem(target) {
                candidates.push(format!("{stem} (file)"));
            }
            for candidate in candidates {
                if let Some(previous) = seen.insert(candidate.clone(), def) {
                    return Err(GenError::DuplicateName {
                        name: candidate,
                        scope: format!("{target} type identifier"),
                        previous: Some(previous.names.wire.clone()),
                        location: def.location.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_defaults(schema: &Schema) -> Result<()> {
    for (def, s) in schema.structs() {
        for field in &s.fields {
            let Some(default) = &field.default else { continue };
            if let Err(expected) = check_default(schema, &field.ty, default) {
                return Err(GenError::TypeMismatch {
                    subject: format!("{}.{}", def.names.wire, field.names.wire),
                    expected,
                    found: default.to_string(),
                    location: field.location.child("default"),
                });
            }
        }
    }
    Ok(())
}

/// `Err` carries a description of what the declared type accepts.
fn check_default(schema: &Schema, ty: &TypeRef, value: &Value) -> std::result::Result<(), String> {
    match schema.resolve_alias(ty) {
        TypeRef::Nullable(inner) => {
            if value.is_null() {
                Ok(())
            } else {
                check_default(schema, inner, value)
            }
        }
        TypeRef::Scalar(kind) => {
            let ok = match kind {
                ScalarKind::String => value.is_string(),
                ScalarKind::Bool => value.is_boolean(),
                ScalarKind::Int32 => value.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
                ScalarKind::Int64 => value.is_i64(),
                ScalarKind::Uint32 => value.as_u64().is_some_and(|v| u32::try_from(v).is_ok()),
                ScalarKind::Uint64 => value.is_u64(),
                ScalarKind::Float32 | ScalarKind::Float64 => value.is_number(),
                ScalarKind::Any => true,
            };
            if ok { Ok(()) } else { Err(format!("a {} default", kind.name())) }
        }
        TypeRef::Named(id) => match &schema.get(*id).kind {
            TypeKind::Enum(e) => {
                let matches = e.members.iter().any(|m| match &m.value {
                    EnumValue::Int(i) => value.as_i64() == Some(*i),
                    EnumValue::Str(s) => value.as_str() == Some(s.as_str()),
                });
                if matches {
                    Ok(())
                } else {
                    Err(format!("a member value of enum `{}`", schema.get(*id).names.wire))
                }
            }
            _ => Err("a scalar or enum type (defaults are not supported here)".into()),
        },
        TypeRef::List(_) | TypeRef::Map(_) => {
            Err("a scalar or enum type (defaults are not supported here)".into())
        }
    }
}

/// Numeric comparisons apply to numbers, length bounds to strings. Bounds
/// must be representable in the field's type so every target can compare
/// against them without a cast.
fn check_constraints(schema: &Schema) -> Result<()> {
    for (def, s) in schema.structs() {
        for field in &s.fields {
            for (index, constraint) in field.constraints.iter().enumerate() {
                if let Err(expected) = check_constraint(schema, &field.ty, constraint) {
                    return Err(GenError::TypeMismatch {
                        subject: format!("{}.{}", def.names.wire, field.names.wire),
                        expected,
                        found: format!("{} {}", constraint.op.name(), constraint.value),
                        location: field.location.child(format!("constraints[{index}]")),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_constraint(schema: &Schema, ty: &TypeRef, constraint: &Constraint) -> std::result::Result<(), String> {
    let kind = match schema.resolve_alias(ty.strip_nullable()) {
        TypeRef::Scalar(kind) => *kind,
        TypeRef::Nullable(inner) => return check_constraint(schema, inner, constraint),
        _ => return Err("a constraint on a string or number field".into()),
    };
    let value = Value::Number(constraint.value.clone());
    if constraint.op.is_length() {
        return match kind {
            ScalarKind::String if constraint.value.is_u64() => Ok(()),
            ScalarKind::String => Err("a non-negative integer length".into()),
            _ => Err(format!("a string field for `{}`", constraint.op.name())),
        };
    }
    match kind {
        ScalarKind::String | ScalarKind::Bool | ScalarKind::Any => {
            Err(format!("a number field for `{}`", constraint.op.name()))
        }
        _ => check_default(schema, &TypeRef::Scalar(kind), &value)
            .map_err(|_| format!("a bound that fits {}", kind.name())),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

type Edges = fn(&Schema, TypeId) -> Vec<(TypeId, Location)>;

/// Reject cycles made only of by-value edges (struct fields, disjunction
/// variants, alias targets). Any list/map/nullable wrapper breaks a cycle.
fn check_cycles(schema: &Schema) -> Result<()> {
    find_cycles(schema, by_value_edges, CycleKind::ByValue)
}

/// Reject aliases that name themselves, even through a wrapper: an alias
/// is expanded in place, so `Tree = list<Tree>` has no finite spelling.
/// Structs and disjunctions are nominal and end the chain.
fn check_alias_cycles(schema: &Schema) -> Result<()> {
    find_cycles(schema, alias_edges, CycleKind::Alias)
}

fn find_cycles(schema: &Schema, edges: Edges, kind: CycleKind) -> Result<()> {
    let mut marks = vec![Mark::Unvisited; schema.types.len()];
    let mut stack: Vec<TypeId> = Vec::new();
    for def in &schema.types {
        visit(schema, def.id, edges, kind, &mut marks, &mut stack)?;
    }
    Ok(())
}

fn visit(
    schema: &Schema,
    id: TypeId,
    edges: Edges,
    kind: CycleKind,
    marks: &mut [Mark],
    stack: &mut Vec<TypeId>,
) -> Result<()> {
    match marks[id.0] {
        Mark::Done => return Ok(()),
        Mark::InProgress => unreachable!("in-progress nodes are handled by the caller"),
        Mark::Unvisited => {}
    }
    marks[id.0] = Mark::InProgress;
    stack.push(id);

    for (target, location) in edges(schema, id) {
        match marks[target.0] {
            Mark::InProgress => {
                let start = stack.iter().position(|s| *s == target).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..]
                    .iter()
                    .map(|s| schema.get(*s).names.wire.clone())
                    .collect();
                cycle.push(schema.get(target).names.wire.clone());
                return Err(GenError::IllegalCycle { cycle, kind, location });
            }
            Mark::Unvisited => visit(schema, target, edges, kind, marks, stack)?,
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[id.0] = Mark::Done;
    Ok(())
}

fn by_value_edges(schema: &Schema, id: TypeId) -> Vec<(TypeId, Location)> {
    let def = schema.get(id);
    match &def.kind {
        TypeKind::Struct(s) => s
            .fields
            .iter()
            .filter_map(|f| f.ty.by_value_target().map(|t| (t, f.location.clone())))
            .collect(),
        TypeKind::Disjunction(variants) => variants
            .iter()
            .enumerate()
            .filter_map(|(index, v)| {
                v.ty.by_value_target().map(|t| (t, def.location.child(format!("variants[{index}]"))))
            })
            .collect(),
        TypeKind::Alias(target) => target
            .by_value_target()
            .map(|t| vec![(t, def.location.child("type"))])
            .unwrap_or_default(),
        TypeKind::Enum(_) => Vec::new(),
    }
}

fn alias_edges(schema: &Schema, id: TypeId) -> Vec<(TypeId, Location)> {
    let def = schema.get(id);
    let TypeKind::Alias(target) = &def.kind else { return Vec::new() };
    let mut named = Vec::new();
    collect_named(target, &mut named);
    named
        .into_iter()
        .filter(|t| matches!(schema.get(*t).kind, TypeKind::Alias(_)))
        .map(|t| (t, def.location.child("type")))
        .collect()
}

fn collect_named(ty: &TypeRef, out: &mut Vec<TypeId>) {
    match ty {
        TypeRef::Scalar(_) => {}
        TypeRef::Named(id) => out.push(*id),
        TypeRef::List(inner) | TypeRef::Map(inner) | TypeRef::Nullable(inner) => collect_named(inner, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> SchemaDoc {
        SchemaDoc::from_yaml_str(yaml, "test.yaml").unwrap()
    }

    const DASHBOARD: &str = r#"
package: dashboard
types:
  - name: Dashboard
    kind: struct
    fields:
      - { name: title, type: string, required: true }
      - { name: links, type: "list<DashboardLink>" }
      - { name: graphTooltip, type: CursorSync, default: 0 }
  - name: DashboardLink
    kind: struct
    fields:
      - { name: title, type: string }
      - { name: url, type: string }
  - name: CursorSync
    kind: enum
    members:
      - { name: off, value: 0 }
      - { name: crosshair, value: 1 }
"#;

    #[test]
    fn types_are_sorted_and_fields_keep_declaration_order() {
        let schema = lower_schema(&doc(DASHBOARD)).unwrap();
        let names: Vec<&str> = schema.types.iter().map(|t| t.names.wire.as_str()).collect();
        assert_eq!(names, ["CursorSync", "Dashboard", "DashboardLink"]);

        let dashboard = schema.lookup("Dashboard").unwrap();
        let TypeKind::Struct(s) = &dashboard.kind else { panic!("not a struct") };
        let fields: Vec<&str> = s.fields.iter().map(|f| f.names.wire.as_str()).collect();
        assert_eq!(fields, ["title", "links", "graphTooltip"]);
        assert_eq!(s.fields[2].names.rust, "graph_tooltip");
        assert_eq!(
            s.fields[1].ty,
            TypeRef::List(Box::new(TypeRef::Named(schema.lookup("DashboardLink").unwrap().id)))
        );
    }

    #[test]
    fn unresolved_reference_names_the_field() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: b, type: "list<Missing>" }
"#,
        ))
        .unwrap_err();
        match err {
            GenError::UnresolvedReference { name, from, location } => {
                assert_eq!(name, "Missing");
                assert_eq!(from, "A.b");
                assert_eq!(location.to_string(), "test.yaml: types[0].fields[0].type");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn direct_self_embedding_is_an_illegal_cycle() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: me, type: A }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GenError::IllegalCycle { ref cycle, .. } if cycle == &["A", "A"]));
    }

    #[test]
    fn indirect_by_value_cycles_are_rejected_too() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: b, type: B }
  - name: B
    kind: disjunction
    variants: [string, A]
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GenError::IllegalCycle { ref cycle, .. } if cycle == &["A", "B", "A"]));
    }

    #[test]
    fn cycles_through_a_wrapper_are_legal() {
        let schema = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: children, type: "list<A>" }
      - { name: parent, type: "A?" }
      - { name: byName, type: "map<A>" }
"#,
        ))
        .unwrap();
        let a = schema.lookup("A").unwrap().id;
        assert!(schema.inline_reaches(a, a));
        let TypeKind::Struct(s) = &schema.get(a).kind else { unreachable!() };
        assert_eq!(s.fields[1].ty, TypeRef::Nullable(Box::new(TypeRef::Named(a))));
    }

    #[test]
    fn optional_fields_do_not_break_cycles() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: me, type: A, required: false }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GenError::IllegalCycle { .. }));
    }

    #[test]
    fn aliases_cannot_contain_themselves() {
        let err = lower_schema(&doc("package: p\ntypes:\n  - { name: Tree, kind: alias, type: \"list<Tree>\" }\n"))
            .unwrap_err();
        match err {
            GenError::IllegalCycle { cycle, kind, location } => {
                assert_eq!(cycle, ["Tree", "Tree"]);
                assert_eq!(kind, CycleKind::Alias);
                assert_eq!(location.to_string(), "test.yaml: types[0].type");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = lower_schema(&doc(
            r#"
package: p
types:
  - { name: Node, kind: alias, type: "Next?" }
  - { name: Next, kind: alias, type: "map<Node>" }
"#,
        ))
        .unwrap_err();
        assert!(
            matches!(err, GenError::IllegalCycle { ref cycle, kind: CycleKind::Alias, .. } if cycle == &["Next", "Node", "Next"])
        );
    }

    #[test]
    fn aliases_may_recurse_through_a_struct() {
        let schema = lower_schema(&doc(
            r#"
package: p
types:
  - { name: Forest, kind: alias, type: "list<Tree>" }
  - name: Tree
    kind: struct
    fields:
      - { name: children, type: Forest }
"#,
        ))
        .unwrap();
        assert!(schema.lookup("Forest").is_some());
    }

    #[test]
    fn constraints_must_suit_the_field_type() {
        let schema = lower_schema(&doc(
            r#"
package: p
types:
  - { name: Count, kind: alias, type: uint32 }
  - name: A
    kind: struct
    fields:
      - { name: count, type: "Count?", constraints: [{ op: ">=", value: 1 }, { op: "<", value: 10 }] }
      - { name: label, type: string, constraints: [{ op: maxLength, value: 8 }] }
"#,
        ))
        .unwrap();
        let fields = schema.fields(schema.lookup("A").unwrap().id);
        assert_eq!(fields[0].constraints[0].op, ConstraintOp::GtEq);
        assert_eq!(fields[1].constraints[0].describe(), "must have length <= 8");
        assert_eq!(schema.to_json()["types"][0]["fields"][0]["constraints"][1]["op"], "<");

        for (field, expected) in [
            ("{ name: x, type: bool, constraints: [{ op: \">\", value: 1 }] }", "a number field for `>`"),
            ("{ name: x, type: int32, constraints: [{ op: minLength, value: 1 }] }", "a string field for `minLength`"),
            ("{ name: x, type: uint32, constraints: [{ op: \">=\", value: -1 }] }", "a bound that fits uint32"),
            ("{ name: x, type: int32, constraints: [{ op: \">=\", value: 0.5 }] }", "a bound that fits int32"),
            ("{ name: x, type: string, constraints: [{ op: \"~\", value: 1 }] }", "a constraint operator"),
        ] {
            let yaml = format!("package: p\ntypes:\n  - name: A\n    kind: struct\n    fields:\n      - {field}\n");
            match lower_schema(&doc(&yaml)).unwrap_err() {
                GenError::TypeMismatch { expected: found, location, .. } => {
                    assert!(found.starts_with(expected), "{found}");
                    assert!(location.path.starts_with("types[0].fields[0]"), "{location}");
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn empty_schemas_point_at_their_types() {
        let err = lower_schema(&doc("package: p\ntypes: []\n")).unwrap_err();
        match err {
            GenError::EmptySchema { package, location } => {
                assert_eq!(package, "p");
                assert_eq!(location.to_string(), "test.yaml: types");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_types_and_fields_are_rejected() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - { name: A, kind: alias, type: string }
  - { name: A, kind: alias, type: bool }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GenError::DuplicateName { ref scope, .. } if scope == "type"));

        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: x, type: string }
      - { name: x, type: bool }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GenError::DuplicateName { ref name, .. } if name == "x"));
    }

    #[test]
    fn normalized_identifier_collisions_are_rejected() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: fooBar, type: string }
      - { name: foo_bar, type: string }
"#,
        ))
        .unwrap_err();
        assert!(
            matches!(err, GenError::DuplicateName { ref name, ref previous, .. } if name == "foo_bar" && previous.as_deref() == Some("fooBar"))
        );
    }

    #[test]
    fn defaults_must_match_the_declared_type() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: A
    kind: struct
    fields:
      - { name: count, type: int32, default: "ten" }
"#,
        ))
        .unwrap_err();
        match err {
            GenError::TypeMismatch { subject, found, .. } => {
                assert_eq!(subject, "A.count");
                assert_eq!(found, "\"ten\"");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = lower_schema(&doc(&DASHBOARD.replace("default: 0", "default: 7"))).unwrap_err();
        assert!(matches!(err, GenError::TypeMismatch { .. }));
    }

    #[test]
    fn declaration_order_does_not_change_the_model() {
        let mut shuffled = doc(DASHBOARD);
        shuffled.types.reverse();
        let a = lower_schema(&doc(DASHBOARD)).unwrap();
        let b = lower_schema(&shuffled).unwrap();
        assert_eq!(a.to_json(), b.to_json());
    }

    #[test]
    fn scalar_names_cannot_be_redeclared() {
        let err = lower_schema(&doc("package: p\ntypes:\n  - { name: string, kind: alias, type: bool }\n"))
            .unwrap_err();
        assert!(matches!(err, GenError::DuplicateName { .. }));
    }

    #[test]
    fn mixed_enum_values_are_rejected() {
        let err = lower_schema(&doc(
            r#"
package: p
types:
  - name: E
    kind: enum
    members:
      - { name: a, value: 1 }
      - { name: b, value: "b" }
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, GenError::TypeMismatch { .. }));
    }

    #[test]
    fn generated_file_names_must_not_collide() {
        let err = lower_schema(&doc(
            "package: p\ntypes:\n  - { name: URLPath, kind: alias, type: string }\n  - { name: UrlPath, kind: alias, type: string }\n",
        ))
        .unwrap_err();
        match err {
            GenError::DuplicateName { name, .. } => assert_eq!(name, "url_path (file)"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
