//! Identifier conventions for every target language.
//!
//! Wire names are never touched here; these helpers only produce the
//! identifiers used in generated source.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Target {
    Rust,
    Python,
    #[value(name = "typescript", alias = "ts")]
    TypeScript,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Rust, Target::Python, Target::TypeScript];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Rust => "rust",
            Target::Python => "python",
            Target::TypeScript => "typescript",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub fn is_valid_identifier(name: &str) -> bool {
    IDENT_RE.is_match(name)
}

/// A schema name plus the identifier each target uses for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Names {
    pub wire: String,
    pub rust: String,
    pub python: String,
    pub typescript: String,
}

impl Names {
    pub fn for_type(wire: &str) -> Self {
        let pascal = pascal_case(wire);
        Self {
            wire: wire.to_string(),
            rust: escape_rust_type(&pascal),
            python: escape_python(&pascal),
            typescript: escape_typescript(&pascal),
        }
    }

    pub fn for_field(wire: &str) -> Self {
        Self {
            wire: wire.to_string(),
            rust: escape_rust_value(&snake_case(wire)),
            python: escape_python(&snake_case(wire)),
            typescript: escape_typescript(&lower_camel(wire)),
        }
    }

    pub fn for_enum_member(wire: &str) -> Self {
        let pascal = pascal_case(wire);
        Self {
            wire: wire.to_string(),
            rust: escape_rust_type(&pascal),
            python: escape_python(&snake_case(wire).to_uppercase()),
            typescript: escape_typescript(&pascal),
        }
    }

    /// Label used for a disjunction branch; the wire form is the label itself.
    pub fn for_variant(label: &str) -> Self {
        let mut names = Self::for_type(label);
        // variants live in their enum's namespace, prelude names are fine there
        names.rust = leading_digit_guard(&pascal_case(label));
        names.python = escape_python(&snake_case(label));
        names
    }

    /// Rust module (and file stem) for a type's generated files.
    pub fn rust_module(&self) -> String {
        escape_rust_value(&snake_case(&self.rust))
    }

    /// File or directory stem for targets that emit one file per type.
    pub fn file_stem(&self, target: Target) -> Option<String> {
        match target {
            Target::Rust => Some(self.rust_module().trim_start_matches("r#").to_string()),
            Target::TypeScript => Some(self.typescript.to_lowercase()),
            Target::Python => None,
        }
    }

    pub fn get(&self, target: Target) -> &str {
        match target {
            Target::Rust => &self.rust,
            Target::Python => &self.python,
            Target::TypeScript => &self.typescript,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CASE CONVERSION
// ————————————————————————————————————————————————————————————————————————————

pub fn pascal_case(name: &str) -> String {
    split_words(name).iter().map(|w| capitalize(w)).collect()
}

pub fn lower_camel(name: &str) -> String {
    let words = split_words(name);
    let mut iter = words.iter();
    let mut result = iter.next().map(|w| w.to_lowercase()).unwrap_or_default();
    for w in iter {
        result.push_str(&capitalize(w));
    }
    result
}

pub fn snake_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Split on separators, lower→upper transitions, and the end of an acronym
/// run (`URLPath` → `URL`, `Path`). Digits stay attached to the word before.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        if ch == '_' || ch == '-' || ch == '.' || ch == ' ' || ch == '/' || ch == ':' {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).map(|c| c.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let rest = chars.as_str();
            // keep acronyms as written
            if rest.chars().all(|c| c.is_uppercase() || c.is_ascii_digit()) && first.is_uppercase() {
                word.to_string()
            } else {
                format!("{}{}", first.to_uppercase(), rest.to_lowercase())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RESERVED WORDS
// ————————————————————————————————————————————————————————————————————————————

static RUST_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn",
        "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
        "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while", "async", "await", "dyn", "gen", "abstract",
        "become", "box", "do", "final", "macro", "override", "priv", "typeof", "unsized",
        "virtual", "yield", "try",
    ]
    .into_iter()
    .collect()
});

// Keywords plus the builtins generated code would otherwise shadow.
static PYTHON_RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from",
        "global", "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass",
        "raise", "return", "try", "while", "with", "yield", "id", "type", "list", "dict",
        "str", "int", "float", "bool", "object", "format", "hash", "input", "len", "map",
        "filter", "range", "set", "self", "typing", "copy", "enum", "models", "cogruntime",
    ]
    .into_iter()
    .collect()
});

static TYPESCRIPT_RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
        "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
        "implements", "interface", "let", "package", "private", "protected", "public",
        "static", "yield", "any", "boolean", "number", "string", "symbol", "type", "build",
        "internal", "missing", "constructor", "cog",
    ]
    .into_iter()
    .collect()
});

fn escape_rust_value(name: &str) -> String {
    let name = leading_digit_guard(name);
    match name.as_str() {
        // not allowed as raw identifiers
        "self" | "Self" | "super" | "crate" | "_" => format!("{name}_val"),
        other if RUST_KEYWORDS.contains(other) => format!("r#{other}"),
        _ => name,
    }
}

fn escape_rust_type(name: &str) -> String {
    let name = leading_digit_guard(name);
    if RUST_KEYWORDS.contains(name.as_str()) || is_rust_prelude_type(&name) {
        format!("{name}Val")
    } else {
        name
    }
}

fn is_rust_prelude_type(name: &str) -> bool {
    matches!(
        name,
        "Option" | "Some" | "None" | "Result" | "Ok" | "Err" | "String" | "Vec" | "Box"
            | "Default" | "Clone" | "From" | "Into" | "TryFrom"
    )
}

fn escape_python(name: &str) -> String {
    let name = leading_digit_guard(name);
    if PYTHON_RESERVED.contains(name.as_str()) {
        format!("{name}_val")
    } else {
        name
    }
}

fn escape_typescript(name: &str) -> String {
    let name = leading_digit_guard(name);
    if TYPESCRIPT_RESERVED.contains(name.as_str()) {
        format!("{name}Val")
    } else {
        name
    }
}

fn leading_digit_guard(name: &str) -> String {
    match name.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{name}"),
        Some(_) => name.to_string(),
    }
}
