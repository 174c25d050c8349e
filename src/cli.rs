//! CLI: schema → (generated sources | schema model view), plus the encoder.
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::encoder::{Encoder, EncoderConfig};
use crate::jennies::{self, GenerateConfig};
use crate::lower::lower_all;
use crate::naming::Target;
use crate::schema::SchemaDoc;
use crate::veneers::Rewriter;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate typed models and fluent builders from a language-neutral schema
#[derive(Parser, Debug)]
#[command(name = "cogjen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate models and builders for one or more target languages
    Generate(GenerateOut),
    /// lower the schemas and print the schema model debug view
    Ir(IrOut),
    /// re-encode a JSON document (declaration order or sorted keys)
    Encode(EncodeOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// One or more schema documents (.json, .yaml, .yml). May be literal
    /// paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    schema: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output directory; every target gets its own subdirectory
    #[arg(short, long)]
    out: PathBuf,

    /// target languages (all of them if omitted)
    #[arg(long, short, value_enum, num_args = 1..)]
    target: Vec<Target>,

    /// YAML file with builder rewrite rules
    #[arg(long)]
    veneers: Option<PathBuf>,

    /// module path generated Rust builders import their runtime from
    #[arg(long, default_value = "cogjen::runtime")]
    rust_runtime_path: String,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct IrOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct EncodeOut {
    /// JSON document to encode, or '-' for stdin
    #[arg(long, short)]
    input: String,

    /// sort object keys at every level
    #[arg(long, default_value_t = false)]
    sort_keys: bool,

    /// spaces per nesting level, 0 for compact output
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> anyhow::Result<Vec<SchemaDoc>> {
        let source_paths = resolve_file_path_patterns(&self.schema).context("failed to resolve schema file paths")?;
        source_paths
            .iter()
            .map(|path| SchemaDoc::load(path).with_context(|| format!("failed to load schema {}", path.display())))
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let docs = target.schema_settings.load()?;
                let schemas = lower_all(&docs)?;
                let rewriter = match target.veneers.as_ref() {
                    Some(path) => Rewriter::load(path)
                        .with_context(|| format!("failed to load veneers {}", path.display()))?,
                    None => Rewriter::default(),
                };
                let config = GenerateConfig {
                    targets: if target.target.is_empty() { Target::ALL.to_vec() } else { target.target.clone() },
                    rust_runtime_path: target.rust_runtime_path.clone(),
                };

                let files = jennies::generate(&schemas, &rewriter, &config)?;
                files
                    .write_to(&target.out)
                    .with_context(|| format!("failed to write generated files to {}", target.out.display()))?;
                tracing::info!(files = files.len(), out = %target.out.display(), "files written");
                eprintln!(
                    "{} {} files for {} package(s) into {}",
                    "generated".green().bold(),
                    files.len(),
                    schemas.len(),
                    target.out.display()
                );
                Ok(())
            }
            Command::Ir(target) => {
                let docs = target.schema_settings.load()?;
                let schemas = lower_all(&docs)?;
                let view = serde_json::Value::Array(schemas.iter().map(|schema| schema.to_json()).collect());
                let view_src = serde_json::to_string_pretty(&view)?;
                write_or_print(target.out.as_deref(), &view_src)
            }
            Command::Encode(target) => {
                let source = if target.input == "-" {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer).context("failed to read stdin")?;
                    buffer
                } else {
                    std::fs::read_to_string(&target.input)
                        .with_context(|| format!("failed to read {}", target.input))?
                };
                let encoder = Encoder::new(EncoderConfig { sort_keys: target.sort_keys, indent: target.indent });
                let value: serde_json::Value = encoder
                    .decode(source.as_bytes())
                    .with_context(|| format!("failed to parse {}", target.input))?;
                let encoded = String::from_utf8(encoder.encode_value(&value)?)?;
                write_or_print(target.out.as_deref(), &encoded)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_or_print(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

pub(crate) fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    // the same file through two patterns is loaded once
    out.sort();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["b.yaml", "a.yaml", "b.yaml"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
    }

    #[test]
    fn unmatched_globs_are_errors() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.yaml"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn parses_generate_arguments() {
        let cli = CommandLineInterface::try_parse_from([
            "cogjen", "generate", "--schema", "a.yaml", "--out", "gen", "--target", "rust", "ts",
        ])
        .unwrap();
        let Command::Generate(target) = cli.cmd else { panic!("expected generate") };
        assert_eq!(target.target, vec![Target::Rust, Target::TypeScript]);
        assert_eq!(target.rust_runtime_path, "cogjen::runtime");
    }
}
