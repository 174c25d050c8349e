//! Generation-time error taxonomy.
//!
//! Every variant is fatal: a generation run either produces the full set of
//! builders and models or nothing at all.
use std::fmt;

/// Where in the schema input a definition came from.
///
/// `path` uses the document structure (`types[2].fields[0]`) so the location
/// stays meaningful for both JSON and YAML inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: String,
    pub path: String,
}

impl Location {
    pub fn new(file: impl Into<String>, path: impl Into<String>) -> Self {
        Self { file: file.into(), path: path.into() }
    }

    pub fn child(&self, segment: impl fmt::Display) -> Self {
        let path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.path, segment)
        };
        Self { file: self.file.clone(), path }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file.is_empty(), self.path.is_empty()) {
            (true, true) => f.write_str("<input>"),
            (true, false) => f.write_str(&self.path),
            (false, true) => f.write_str(&self.file),
            (false, false) => write!(f, "{}: {}", self.file, self.path),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("{location}: `{from}` references undeclared type `{name}`")]
    UnresolvedReference {
        name: String,
        from: String,
        location: Location,
    },

    #[error("{location}: illegal {kind} cycle {}", .cycle.join(" -> "))]
    IllegalCycle {
        cycle: Vec<String>,
        kind: CycleKind,
        location: Location,
    },

    #[error("{location}: duplicate {scope} name `{name}`{}", describe_previous(.previous))]
    DuplicateName {
        name: String,
        scope: String,
        previous: Option<String>,
        location: Location,
    },

    #[error("{location}: `{subject}` expects {expected}, found {found}")]
    TypeMismatch {
        subject: String,
        expected: String,
        found: String,
        location: Location,
    },

    #[error("{location}: `{name}` is not a valid identifier")]
    InvalidIdentifier { name: String, location: Location },

    #[error("{location}: invalid type expression `{expr}`: {reason}")]
    InvalidTypeExpr {
        expr: String,
        reason: String,
        location: Location,
    },

    #[error("{file}: {message}")]
    Parse { file: String, message: String },

    #[error("{location}: invalid veneer rule: {message}")]
    InvalidRule { message: String, location: Location },

    #[error("{location}: schema `{package}` declares no types")]
    EmptySchema { package: String, location: Location },

    #[error("invalid generator configuration: {0}")]
    InvalidConfig(String),
}

/// What a rejected cycle runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Struct fields, disjunction variants and alias targets stored inline.
    ByValue,
    /// Alias definitions only, through any wrapper.
    Alias,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleKind::ByValue => f.write_str("by-value"),
            CycleKind::Alias => f.write_str("alias"),
        }
    }
}

impl GenError {
    pub fn invalid_rule(message: impl Into<String>, location: &Location) -> Self {
        GenError::InvalidRule { message: message.into(), location: location.clone() }
    }
}

fn describe_previous(previous: &Option<String>) -> String {
    match previous {
        Some(prev) => format!(" (conflicts with `{prev}`)"),
        None => String::new(),
    }
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_renders_file_and_path() {
        let loc = Location::new("dash.yaml", "types[1]").child("fields[0]");
        assert_eq!(loc.to_string(), "dash.yaml: types[1].fields[0]");
        assert_eq!(Location::default().to_string(), "<input>");
    }

    #[test]
    fn cycle_message_lists_the_path() {
        let err = GenError::IllegalCycle {
            cycle: vec!["A".into(), "B".into(), "A".into()],
            kind: CycleKind::ByValue,
            location: Location::new("s.json", "types[0].fields[1]"),
        };
        assert_eq!(
            err.to_string(),
            "s.json: types[0].fields[1]: illegal by-value cycle A -> B -> A"
        );
    }

    #[test]
    fn rule_and_schema_errors_carry_their_location() {
        let err = GenError::invalid_rule("empty rule", &Location::new("veneers.yaml", "options[2]"));
        assert_eq!(err.to_string(), "veneers.yaml: options[2]: invalid veneer rule: empty rule");

        let err = GenError::EmptySchema {
            package: "sandbox".into(),
            location: Location::new("sandbox.yaml", "types"),
        };
        assert_eq!(err.to_string(), "sandbox.yaml: types: schema `sandbox` declares no types");
    }
}
