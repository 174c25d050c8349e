//! Veneers: rewrite rules that reshape builders without touching models.
//!
//! Rules are authored in YAML, converted to typed rules up front (so a
//! malformed rule fails before any schema is looked at), then applied in
//! file order: builder rules first, option rules second. Errors point at
//! the rule's position in the file (`options[2]`).
use std::path::Path;

use serde::Deserialize;

use crate::builders::{
    derive_builders, option_names, resolve_path, Argument, Assignment, AssignmentMethod, AssignmentValue,
    BuilderOption, Builders,
};
use crate::error::{GenError, Location, Result};
use crate::ir::{ScalarKind, Schema, TypeId, TypeRef};
use crate::naming::{is_valid_identifier, Target};

// ————————————————————————————————————————————————————————————————————————————
// TYPED RULES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub enum BuilderRule {
    Omit(BuilderSelector),
    /// Copy the options of `source`'s builder into the selected builder,
    /// writing below the field path `under` instead of at the root.
    MergeInto {
        selector: BuilderSelector,
        source: String,
        under: Vec<String>,
        exclude: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderSelector {
    pub object: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionRule {
    Omit(OptionSelector),
    PromoteToConstructor(OptionSelector),
    Rename { selector: OptionSelector, to: String },
    UnfoldBoolean { selector: OptionSelector, true_as: String, false_as: String },
    ArrayToAppend { selector: OptionSelector, to: Option<String> },
    /// Replace a struct-valued argument with one argument per field of the
    /// struct (all of them when `fields` is empty).
    StructFieldsAsArguments { selector: OptionSelector, fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSelector {
    pub object: String,
    pub options: Vec<String>,
}

impl OptionSelector {
    pub fn by_name(object: &str, options: &[&str]) -> Self {
        Self {
            object: object.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// Position of the selector name matching `option`.
    fn matches(&self, option: &BuilderOption) -> Option<usize> {
        self.options.iter().position(|name| *name == option.names.wire)
    }
}

impl BuilderRule {
    fn selector(&self) -> &BuilderSelector {
        match self {
            BuilderRule::Omit(selector) | BuilderRule::MergeInto { selector, .. } => selector,
        }
    }

    fn describe(&self) -> String {
        match self {
            BuilderRule::Omit(selector) => format!("omit {}", selector.object),
            BuilderRule::MergeInto { selector, source, .. } => {
                format!("merge_into {} from {source}", selector.object)
            }
        }
    }
}

impl OptionRule {
    fn selector(&self) -> &OptionSelector {
        match self {
            OptionRule::Omit(selector)
            | OptionRule::PromoteToConstructor(selector)
            | OptionRule::Rename { selector, .. }
            | OptionRule::UnfoldBoolean { selector, .. }
            | OptionRule::ArrayToAppend { selector, .. }
            | OptionRule::StructFieldsAsArguments { selector, .. } => selector,
        }
    }

    fn describe(&self) -> String {
        let selector = self.selector();
        let what = match self {
            OptionRule::Omit(_) => "omit",
            OptionRule::PromoteToConstructor(_) => "promote_to_constructor",
            OptionRule::Rename { .. } => "rename",
            OptionRule::UnfoldBoolean { .. } => "unfold_boolean",
            OptionRule::ArrayToAppend { .. } => "array_to_append",
            OptionRule::StructFieldsAsArguments { .. } => "struct_fields_as_arguments",
        };
        format!("{what} {}.{}", selector.object, selector.options.join(","))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    builder_rules: Vec<BuilderRule>,
    option_rules: Vec<OptionRule>,
    /// File the rules came from, for diagnostics.
    source: String,
}

impl Rewriter {
    pub fn new(builder_rules: Vec<BuilderRule>, option_rules: Vec<OptionRule>) -> Self {
        Self { builder_rules, option_rules, source: String::new() }
    }

    pub fn from_yaml_str(src: &str, source: &str) -> Result<Self> {
        let doc: VeneerDoc = crate::path_de::from_yaml_with_path(src)
            .map_err(|message| GenError::Parse { file: source.to_string(), message })?;
        let mut rewriter = doc.into_rewriter(source)?;
        rewriter.source = source.to_string();
        Ok(rewriter)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = path.to_string_lossy().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|error| GenError::Parse { file: source.clone(), message: error.to_string() })?;
        Self::from_yaml_str(&text, &source)
    }

    pub fn is_empty(&self) -> bool {
        self.builder_rules.is_empty() && self.option_rules.is_empty()
    }

    fn builder_location(&self, index: usize) -> Location {
        Location::new(self.source.clone(), format!("builders[{index}]"))
    }

    fn option_location(&self, index: usize) -> Location {
        Location::new(self.source.clone(), format!("options[{index}]"))
    }

    /// Derive builders for every package and apply the rules. A rule, or
    /// any option name listed in a rule's selector, that matches nothing
    /// in any package is an error.
    pub fn rewrite(&self, schemas: &[Schema]) -> Result<Vec<Builders>> {
        let mut builder_hits = vec![0usize; self.builder_rules.len()];
        let mut option_hits: Vec<Vec<usize>> =
            self.option_rules.iter().map(|rule| vec![0; rule.selector().options.len()]).collect();
        let mut out = Vec::with_capacity(schemas.len());

        for schema in schemas {
            let mut builders = derive_builders(schema);

            for (index, rule) in self.builder_rules.iter().enumerate() {
                let location = self.builder_location(index);
                builder_hits[index] += apply_builder_rule(schema, &mut builders, rule, &location)?;
            }

            for (index, rule) in self.option_rules.iter().enumerate() {
                let location = self.option_location(index);
                let hits = apply_option_rule(schema, &mut builders, rule, &location)?;
                for (total, hit) in option_hits[index].iter_mut().zip(hits) {
                    *total += hit;
                }
            }

            check_option_names(schema, &builders)?;
            tracing::debug!(package = %schema.package, builders = builders.specs.len(), "veneers applied");
            out.push(builders);
        }

        if let Some(index) = builder_hits.iter().position(|hits| *hits == 0) {
            return Err(GenError::invalid_rule(
                format!("builder rule #{index} ({}) matched nothing", self.builder_rules[index].describe()),
                &self.builder_location(index),
            ));
        }
        for (index, hits) in option_hits.iter().enumerate() {
            let rule = &self.option_rules[index];
            if let Some(unmatched) = hits.iter().position(|hits| *hits == 0) {
                return Err(GenError::invalid_rule(
                    format!(
                        "option rule #{index} ({}) matched nothing for `{}.{}`",
                        rule.describe(),
                        rule.selector().object,
                        rule.selector().options[unmatched]
                    ),
                    &self.option_location(index),
                ));
            }
        }
        Ok(out)
    }
}

fn apply_builder_rule(
    schema: &Schema,
    builders: &mut Builders,
    rule: &BuilderRule,
    location: &Location,
) -> Result<usize> {
    let object = &rule.selector().object;
    match rule {
        BuilderRule::Omit(_) => {
            let before = builders.specs.len();
            builders.specs.retain(|spec| schema.get(spec.for_type).names.wire != *object);
            Ok(before - builders.specs.len())
        }
        BuilderRule::MergeInto { source, under, exclude, .. } => {
            let Some(target) = builders.specs.iter().position(|spec| schema.get(spec.for_type).names.wire == *object)
            else {
                return Ok(0);
            };
            let Some(source_spec) = builders.specs.iter().find(|spec| schema.get(spec.for_type).names.wire == *source)
            else {
                return Err(GenError::invalid_rule(
                    format!("`{source}` has no builder to merge into `{object}`"),
                    location,
                ));
            };
            let prefix = field_path(schema, builders.specs[target].for_type, under, location)?;
            let end = prefix
                .last()
                .and_then(|_| resolve_path(schema, builders.specs[target].for_type, &prefix))
                .and_then(|steps| steps.last().and_then(|step| step.target));
            if end != Some(source_spec.for_type) {
                return Err(GenError::invalid_rule(
                    format!("`{object}.{}` does not hold a `{source}`", under.join(".")),
                    location,
                ));
            }
            if let Some(unknown) = exclude.iter().find(|name| !source_spec.options.iter().any(|o| o.names.wire == **name)) {
                return Err(GenError::invalid_rule(format!("`{source}` has no option `{unknown}`"), location));
            }

            let merged: Vec<BuilderOption> = source_spec
                .options
                .iter()
                .filter(|option| !exclude.contains(&option.names.wire))
                .map(|option| {
                    let mut option = option.clone();
                    option.is_constructor_arg = false;
                    for assignment in &mut option.assignments {
                        assignment.path = prefix.iter().chain(&assignment.path).copied().collect();
                    }
                    option
                })
                .collect();
            builders.specs[target].options.extend(merged);
            Ok(1)
        }
    }
}

/// Field indices for a dotted wire path below `root`.
fn field_path(schema: &Schema, root: TypeId, names: &[String], location: &Location) -> Result<Vec<usize>> {
    let mut owner = Some(root);
    let mut path = Vec::with_capacity(names.len());
    for name in names {
        let fields = owner.map(|id| schema.fields(id)).unwrap_or_default();
        let Some(index) = fields.iter().position(|f| f.names.wire == *name) else {
            return Err(GenError::invalid_rule(
                format!("no struct field `{name}` along `{}`", names.join(".")),
                location,
            ));
        };
        owner = schema.struct_target(&fields[index].ty);
        path.push(index);
    }
    Ok(path)
}

/// Hits per selector option name.
fn apply_option_rule(
    schema: &Schema,
    builders: &mut Builders,
    rule: &OptionRule,
    location: &Location,
) -> Result<Vec<usize>> {
    let selector = rule.selector();
    let mut hits = vec![0; selector.options.len()];
    let Some(spec) = builders
        .specs
        .iter_mut()
        .find(|spec| schema.get(spec.for_type).names.wire == selector.object)
    else {
        return Ok(hits);
    };
    let owner = spec.for_type;

    let mut rewritten: Vec<BuilderOption> = Vec::with_capacity(spec.options.len());
    for option in std::mem::take(&mut spec.options) {
        let Some(matched) = selector.matches(&option) else {
            rewritten.push(option);
            continue;
        };
        hits[matched] += 1;
        let at = format!("{}.{}", selector.object, option.names.wire);
        match rule {
            OptionRule::Omit(_) => {}
            OptionRule::PromoteToConstructor(_) => {
                if option.args.is_empty() {
                    return Err(GenError::invalid_rule(
                        format!("`{at}` takes no argument and cannot be promoted to the constructor"),
                        location,
                    ));
                }
                rewritten.push(BuilderOption { is_constructor_arg: true, ..option });
            }
            OptionRule::Rename { to, .. } => {
                rewritten.push(BuilderOption { names: option_names(to), ..option });
            }
            OptionRule::UnfoldBoolean { true_as, false_as, .. } => {
                let is_bool = option.args.len() == 1
                    && matches!(schema.resolve_alias(&option.args[0].ty), TypeRef::Scalar(ScalarKind::Bool));
                if !is_bool {
                    return Err(GenError::invalid_rule(format!("`{at}` is not a boolean option"), location));
                }
                for (name, value) in [(true_as, true), (false_as, false)] {
                    rewritten.push(BuilderOption {
                        names: option_names(name),
                        args: Vec::new(),
                        assignments: option
                            .assignments
                            .iter()
                            .map(|a| Assignment {
                                value: AssignmentValue::Constant(serde_json::Value::Bool(value)),
                                ..a.clone()
                            })
                            .collect(),
                        is_constructor_arg: false,
                        comments: option.comments.clone(),
                    });
                }
            }
            OptionRule::ArrayToAppend { to, .. } => {
                let item = match option.args.as_slice() {
                    [arg] => match schema.resolve_alias(&arg.ty) {
                        TypeRef::List(item) => (**item).clone(),
                        _ => return Err(GenError::invalid_rule(format!("`{at}` is not a list option"), location)),
                    },
                    _ => return Err(GenError::invalid_rule(format!("`{at}` is not a list option"), location)),
                };
                let mut option = option;
                option.args[0].ty = item;
                for assignment in &mut option.assignments {
                    assignment.method = AssignmentMethod::Append;
                }
                if let Some(to) = to {
                    option.names = option_names(to);
                }
                rewritten.push(option);
            }
            OptionRule::StructFieldsAsArguments { fields, .. } => {
                rewritten.push(struct_fields_as_arguments(schema, owner, option, fields, &at, location)?);
            }
        }
    }
    spec.options = rewritten;
    Ok(hits)
}

fn struct_fields_as_arguments(
    schema: &Schema,
    owner: TypeId,
    option: BuilderOption,
    wanted: &[String],
    at: &str,
    location: &Location,
) -> Result<BuilderOption> {
    let not_a_struct = || GenError::invalid_rule(format!("`{at}` does not take a single struct argument"), location);
    let (base, struct_id) = match (option.args.as_slice(), option.assignments.as_slice()) {
        ([arg], [assignment])
            if assignment.value == AssignmentValue::Argument(0) && assignment.method == AssignmentMethod::Set =>
        {
            let target = resolve_path(schema, owner, &assignment.path)
                .and_then(|steps| steps.last().and_then(|step| step.target));
            match (schema.struct_target(&arg.ty), target) {
                (Some(id), Some(target)) if id == target => (assignment.path.clone(), id),
                _ => return Err(not_a_struct()),
            }
        }
        _ => return Err(not_a_struct()),
    };

    let fields = schema.fields(struct_id);
    let selected: Vec<usize> = if wanted.is_empty() {
        (0..fields.len()).collect()
    } else {
        wanted
            .iter()
            .map(|name| {
                fields.iter().position(|f| f.names.wire == *name).ok_or_else(|| {
                    GenError::invalid_rule(
                        format!("`{}` has no field `{name}`", schema.get(struct_id).names.wire),
                        location,
                    )
                })
            })
            .collect::<Result<_>>()?
    };
    if selected.is_empty() {
        return Err(GenError::invalid_rule(
            format!("`{}` has no fields to pass as arguments", schema.get(struct_id).names.wire),
            location,
        ));
    }

    let args = selected.iter().map(|index| Argument::for_field(&fields[*index])).collect();
    let assignments = selected
        .iter()
        .enumerate()
        .map(|(arg, field)| Assignment {
            path: base.iter().copied().chain([*field]).collect(),
            value: AssignmentValue::Argument(arg),
            method: AssignmentMethod::Set,
        })
        .collect();
    Ok(BuilderOption { args, assignments, ..option })
}

fn check_option_names(schema: &Schema, builders: &Builders) -> Result<()> {
    for spec in &builders.specs {
        let def = schema.get(spec.for_type);
        for target in Target::ALL {
            let mut seen: Vec<&str> = Vec::new();
            for option in &spec.options {
                let ident = option.names.get(target);
                if seen.contains(&ident) {
                    return Err(GenError::DuplicateName {
                        name: ident.to_string(),
                        scope: format!("{target} option of `{}` builder", def.names.wire),
                        previous: None,
                        location: def.location.clone(),
                    });
                }
                seen.push(ident);
            }
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// YAML DOCUMENT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VeneerDoc {
    #[serde(default)]
    builders: Vec<BuilderRuleDoc>,
    #[serde(default)]
    options: Vec<OptionRuleDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuilderRuleDoc {
    omit: Option<BuilderSelectorDoc>,
    merge_into: Option<MergeIntoDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuilderSelectorDoc {
    by_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MergeIntoDoc {
    by_name: String,
    source: String,
    /// Dotted field path, `fieldConfig.defaults`.
    under: String,
    #[serde(default)]
    exclude_options: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionRuleDoc {
    omit: Option<OptionSelectorDoc>,
    promote_to_constructor: Option<OptionSelectorDoc>,
    rename: Option<RenameDoc>,
    unfold_boolean: Option<UnfoldBooleanDoc>,
    array_to_append: Option<ArrayToAppendDoc>,
    struct_fields_as_arguments: Option<StructFieldsAsArgumentsDoc>,
}

#[derive(Debug, Deserialize)]
struct OptionSelectorDoc {
    /// `Object.option`
    by_name: Option<String>,
    by_names: Option<ByNamesDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ByNamesDoc {
    object: String,
    options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RenameDoc {
    #[serde(flatten)]
    selector: OptionSelectorDoc,
    #[serde(rename = "as")]
    to: String,
}

#[derive(Debug, Deserialize)]
struct UnfoldBooleanDoc {
    #[serde(flatten)]
    selector: OptionSelectorDoc,
    true_as: String,
    false_as: String,
}

#[derive(Debug, Deserialize)]
struct ArrayToAppendDoc {
    #[serde(flatten)]
    selector: OptionSelectorDoc,
    #[serde(rename = "as")]
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructFieldsAsArgumentsDoc {
    #[serde(flatten)]
    selector: OptionSelectorDoc,
    #[serde(default)]
    fields: Vec<String>,
}

impl VeneerDoc {
    fn into_rewriter(self, source: &str) -> Result<Rewriter> {
        let builder_rules = self
            .builders
            .into_iter()
            .enumerate()
            .map(|(index, rule)| rule.into_rule(&Location::new(source, format!("builders[{index}]"))))
            .collect::<Result<Vec<_>>>()?;
        let option_rules = self
            .options
            .into_iter()
            .enumerate()
            .map(|(index, rule)| rule.into_rule(&Location::new(source, format!("options[{index}]"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Rewriter::new(builder_rules, option_rules))
    }
}

impl BuilderRuleDoc {
    fn into_rule(self, location: &Location) -> Result<BuilderRule> {
        if let Some(selector) = self.omit {
            return Ok(BuilderRule::Omit(BuilderSelector { object: selector.by_name }));
        }
        if let Some(rule) = self.merge_into {
            let under: Vec<String> = rule.under.split('.').map(str::to_string).collect();
            if under.iter().any(|segment| segment.is_empty()) {
                return Err(GenError::invalid_rule(format!("`{}` is not a field path", rule.under), location));
            }
            return Ok(BuilderRule::MergeInto {
                selector: BuilderSelector { object: rule.by_name },
                source: rule.source,
                under,
                exclude: rule.exclude_options,
            });
        }
        Err(GenError::invalid_rule("empty builder rule", location))
    }
}

impl OptionRuleDoc {
    fn into_rule(self, location: &Location) -> Result<OptionRule> {
        if let Some(selector) = self.omit {
            return Ok(OptionRule::Omit(selector.into_selector(location)?));
        }
        if let Some(selector) = self.promote_to_constructor {
            return Ok(OptionRule::PromoteToConstructor(selector.into_selector(location)?));
        }
        if let Some(rule) = self.rename {
            return Ok(OptionRule::Rename {
                selector: rule.selector.into_selector(location)?,
                to: checked_identifier(rule.to, location)?,
            });
        }
        if let Some(rule) = self.unfold_boolean {
            return Ok(OptionRule::UnfoldBoolean {
                selector: rule.selector.into_selector(location)?,
                true_as: checked_identifier(rule.true_as, location)?,
                false_as: checked_identifier(rule.false_as, location)?,
            });
        }
        if let Some(rule) = self.array_to_append {
            return Ok(OptionRule::ArrayToAppend {
                selector: rule.selector.into_selector(location)?,
                to: rule.to.map(|to| checked_identifier(to, location)).transpose()?,
            });
        }
        if let Some(rule) = self.struct_fields_as_arguments {
            return Ok(OptionRule::StructFieldsAsArguments {
                selector: rule.selector.into_selector(location)?,
                fields: rule.fields,
            });
        }
        Err(GenError::invalid_rule("empty rule", location))
    }
}

impl OptionSelectorDoc {
    fn into_selector(self, location: &Location) -> Result<OptionSelector> {
        if let Some(by_name) = self.by_name {
            let Some((object, option)) = by_name.split_once('.') else {
                return Err(GenError::invalid_rule(
                    format!("option name '{by_name}' is incorrect: no object name found"),
                    location,
                ));
            };
            return Ok(OptionSelector::by_name(object, &[option]));
        }
        if let Some(by_names) = self.by_names {
            if by_names.object.is_empty() {
                return Err(GenError::invalid_rule("`object` is required", location));
            }
            if by_names.options.is_empty() {
                return Err(GenError::invalid_rule("`options` lists no option", location));
            }
            return Ok(OptionSelector { object: by_names.object, options: by_names.options });
        }
        Err(GenError::invalid_rule("empty selector", location))
    }
}

fn checked_identifier(name: String, location: &Location) -> Result<String> {
    if is_valid_identifier(&name) {
        Ok(name)
    } else {
        Err(GenError::InvalidIdentifier { name, location: location.clone() })
    }
}
