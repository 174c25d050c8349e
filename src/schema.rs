//! Raw schema documents, as authored.
//!
//! Nothing here is validated beyond what serde enforces; resolution,
//! naming and cycle checks happen in [`crate::lower`].
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Location, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    pub package: String,
    #[serde(default)]
    pub types: Vec<RawType>,
    /// Source file the document was read from; filled in by the loader.
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawType {
    Struct {
        name: String,
        #[serde(default)]
        comments: Vec<String>,
        #[serde(default)]
        fields: Vec<RawField>,
    },
    Disjunction {
        name: String,
        #[serde(default)]
        comments: Vec<String>,
        variants: Vec<String>,
    },
    Alias {
        name: String,
        #[serde(default)]
        comments: Vec<String>,
        #[serde(rename = "type")]
        target: String,
    },
    Enum {
        name: String,
        #[serde(default)]
        comments: Vec<String>,
        members: Vec<RawEnumMember>,
    },
}

impl RawType {
    pub fn name(&self) -> &str {
        match self {
            RawType::Struct { name, .. }
            | RawType::Disjunction { name, .. }
            | RawType::Alias { name, .. }
            | RawType::Enum { name, .. } => name,
        }
    }

    pub fn comments(&self) -> &[String] {
        match self {
            RawType::Struct { comments, .. }
            | RawType::Disjunction { comments, .. }
            | RawType::Alias { comments, .. }
            | RawType::Enum { comments, .. } => comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<RawConstraint>,
    #[serde(default)]
    pub comments: Vec<String>,
}

/// `{ op: ">=", value: 0 }` or `{ op: maxLength, value: 8 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConstraint {
    pub op: String,
    pub value: serde_json::Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEnumMember {
    pub name: String,
    pub value: RawEnumValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEnumValue {
    Int(i64),
    Str(String),
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl SchemaDoc {
    pub fn from_json_str(src: &str, source: &str) -> Result<Self> {
        let mut doc: SchemaDoc = crate::path_de::from_json_with_path(src).map_err(|message| {
            GenError::Parse { file: source.to_string(), message }
        })?;
        doc.source = source.to_string();
        Ok(doc)
    }

    pub fn from_yaml_str(src: &str, source: &str) -> Result<Self> {
        let mut doc: SchemaDoc = crate::path_de::from_yaml_with_path(src).map_err(|message| {
            GenError::Parse { file: source.to_string(), message }
        })?;
        doc.source = source.to_string();
        Ok(doc)
    }

    /// Read a schema document, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let source = path.to_string_lossy().to_string();
        let text = std::fs::read_to_string(path).map_err(|error| GenError::Parse {
            file: source.clone(),
            message: error.to_string(),
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text, &source),
            _ => Self::from_json_str(&text, &source),
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.source.clone(), "")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

/// Parsed form of a field or variant type string such as `list<DashboardLink>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn parse(src: &str) -> std::result::Result<Self, String> {
        let mut parser = ExprParser { src, pos: 0 };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.pos != src.len() {
            return Err(format!("unexpected trailing input at offset {}", parser.pos));
        }
        Ok(expr)
    }
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> std::result::Result<&'a str, String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            self.pos += ch.len_utf8();
        }
        if start == self.pos {
            return Err(format!("expected a type name at offset {start}"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn expr(&mut self) -> std::result::Result<TypeExpr, String> {
        let name = self.ident()?;
        let mut expr = if self.eat('<') {
            let inner = Box::new(self.expr()?);
            if !self.eat('>') {
                return Err(format!("expected `>` at offset {}", self.pos));
            }
            match name {
                "list" => TypeExpr::List(inner),
                "map" => TypeExpr::Map(inner),
                "nullable" => TypeExpr::Nullable(inner),
                other => return Err(format!("unknown type constructor `{other}`")),
            }
        } else {
            TypeExpr::Named(name.to_string())
        };
        while self.eat('?') {
            expr = TypeExpr::Nullable(Box::new(expr));
        }
        Ok(expr)
    }
}
