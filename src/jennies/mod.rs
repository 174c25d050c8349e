//! Code emitters ("jennies") and the generation pipeline.
//!
//! Every jenny turns the lowered schemas plus their builder specs into an
//! in-memory [`Files`] set. Nothing touches the disk until every target has
//! been generated.
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::builders::Builders;
use crate::error::{GenError, Result};
use crate::ir::Schema;
use crate::naming::Target;
use crate::veneers::Rewriter;

pub mod python;
pub mod rust;
pub mod typescript;

pub(crate) const GENERATED_HEADER: &str = "Code generated by cogjen. DO NOT EDIT.";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Relative, `/`-separated.
    pub path: String,
    pub contents: String,
    pub jenny: &'static str,
}

impl File {
    pub fn new(path: impl Into<String>, contents: impl Into<String>, jenny: &'static str) -> Self {
        Self { path: path.into(), contents: contents.into(), jenny }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files(Vec<File>);

/// One package ready for emission.
#[derive(Debug, Clone, Copy)]
pub struct Package<'a> {
    pub schema: &'a Schema,
    pub builders: &'a Builders,
}

pub struct Context<'a> {
    pub packages: Vec<Package<'a>>,
    pub config: &'a GenerateConfig,
}

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub targets: Vec<Target>,
    /// `use` path generated Rust builders import `BuildError`, `Builder`
    /// and `Nested` from.
    pub rust_runtime_path: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self { targets: Target::ALL.to_vec(), rust_runtime_path: "cogjen::runtime".into() }
    }
}

pub trait Jenny: Sync {
    fn name(&self) -> &'static str;
    fn generate(&self, ctx: &Context<'_>) -> Result<Files>;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Files {
    pub fn push(&mut self, file: File) {
        self.0.push(file);
    }

    pub fn extend(&mut self, other: Files) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, File> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&File> {
        self.0.iter().find(|file| file.path == path)
    }

    fn prefixed(self, prefix: &str) -> Files {
        Files(
            self.0
                .into_iter()
                .map(|file| File { path: format!("{prefix}/{}", file.path), ..file })
                .collect(),
        )
    }

    /// Write every file below `root`. Files are staged in a temporary
    /// directory beside `root` and moved into place once all of them were
    /// written, so a failed write leaves `root` as it was.
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        let parent = match root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new().prefix(".cogjen-").tempdir_in(&parent)?;
        for file in &self.0 {
            let path = staging.path().join(&file.path);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, &file.contents)?;
        }

        if !root.exists() {
            std::fs::rename(staging.path(), root)?;
            tracing::debug!(root = %root.display(), files = self.0.len(), "output written");
            return Ok(());
        }
        for file in &self.0 {
            let path = root.join(&file.path);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::rename(staging.path().join(&file.path), &path)?;
        }
        tracing::debug!(root = %root.display(), files = self.0.len(), "output merged");
        Ok(())
    }
}

impl IntoIterator for Files {
    type Item = File;
    type IntoIter = std::vec::IntoIter<File>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<File> for Files {
    fn from_iter<I: IntoIterator<Item = File>>(iter: I) -> Self {
        Files(iter.into_iter().collect())
    }
}

pub fn jennies_for(target: Target) -> Vec<Box<dyn Jenny>> {
    match target {
        Target::Rust => vec![Box::new(rust::ModelsJenny), Box::new(rust::BuildersJenny)],
        Target::Python => vec![
            Box::new(python::RuntimeJenny),
            Box::new(python::ModelsJenny),
            Box::new(python::BuildersJenny),
        ],
        Target::TypeScript => vec![
            Box::new(typescript::RuntimeJenny),
            Box::new(typescript::ModelsJenny),
            Box::new(typescript::BuildersJenny),
        ],
    }
}

/// Run the whole pipeline: veneers, then every jenny of every requested
/// target. Output paths are prefixed with the target name and sorted, so
/// the result does not depend on scheduling.
pub fn generate(schemas: &[Schema], rewriter: &Rewriter, config: &GenerateConfig) -> Result<Files> {
    if config.targets.is_empty() {
        return Err(GenError::InvalidConfig("no target selected".into()));
    }
    rust::check_use_path(&config.rust_runtime_path)?;

    let builders = rewriter.rewrite(schemas)?;
    let ctx = Context {
        packages: schemas
            .iter()
            .zip(builders.iter())
            .map(|(schema, builders)| Package { schema, builders })
            .collect(),
        config,
    };

    let mut targets = config.targets.clone();
    targets.sort();
    targets.dedup();

    let per_target = targets
        .par_iter()
        .map(|target| {
            let mut files = Files::default();
            for jenny in jennies_for(*target) {
                let generated = jenny.generate(&ctx)?;
                tracing::debug!(jenny = jenny.name(), files = generated.len(), "jenny finished");
                files.extend(generated);
            }
            tracing::info!(target = %target, files = files.len(), "target generated");
            Ok(files.prefixed(target.as_str()))
        })
        .collect::<Result<Vec<Files>>>()?;

    let mut out: Vec<File> = per_target.into_iter().flatten().collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    if let Some(pair) = out.windows(2).find(|pair| pair[0].path == pair[1].path) {
        return Err(GenError::DuplicateName {
            name: pair[0].path.clone(),
            scope: "output file".into(),
            previous: Some(pair[0].jenny.to_string()),
            location: Default::default(),
        });
    }
    Ok(Files(out))
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Accumulates generated source with a fixed indentation unit.
pub(crate) struct Writer {
    out: String,
    unit: &'static str,
}

impl Writer {
    pub(crate) fn new(unit: &'static str) -> Self {
        Self { out: String::new(), unit }
    }

    /// Push `text` indented `depth` levels, followed by a newline.
    pub(crate) fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..depth {
                self.out.push_str(self.unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_schema;
    use crate::schema::SchemaDoc;

    fn schemas() -> Vec<Schema> {
        let doc = SchemaDoc::from_yaml_str(
            r#"
package: sandbox
types:
  - name: Point
    kind: struct
    fields:
      - { name: x, type: int64, required: true }
      - { name: label, type: "string?" }
"#,
            "sandbox.yaml",
        )
        .unwrap();
        vec![lower_schema(&doc).unwrap()]
    }

    #[test]
    fn output_is_prefixed_by_target_and_sorted() {
        let files = generate(&schemas(), &Rewriter::default(), &GenerateConfig::default()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert!(files.get("rust/sandbox/models/point.rs").is_some());
        assert!(files.get("python/models/sandbox.py").is_some());
        assert!(files.get("typescript/sandbox/point/types_gen.ts").is_some());
    }

    #[test]
    fn generation_is_repeatable() {
        let config = GenerateConfig::default();
        let a = generate(&schemas(), &Rewriter::default(), &config).unwrap();
        let b = generate(&schemas(), &Rewriter::default(), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn a_failing_stage_produces_no_files() {
        let rewriter = Rewriter::from_yaml_str("options:\n  - omit: { by_name: Point.nope }\n", "v.yaml").unwrap();
        let err = generate(&schemas(), &rewriter, &GenerateConfig::default()).unwrap_err();
        assert!(matches!(err, GenError::InvalidRule { .. }));
    }

    #[test]
    fn rejects_a_broken_runtime_path() {
        let config = GenerateConfig { rust_runtime_path: "cogjen::runtime;\nfn".into(), ..Default::default() };
        let err = generate(&schemas(), &Rewriter::default(), &config).unwrap_err();
        assert!(matches!(err, GenError::InvalidConfig(_)));
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".cogjen-"))
            .collect()
    }

    #[test]
    fn a_failed_write_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("gen");
        let files: Files = [File::new("a", "file", "test"), File::new("a/b", "nested", "test")].into_iter().collect();

        assert!(files.write_to(&root).is_err());
        assert!(!root.exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn writing_into_an_existing_root_keeps_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("gen");
        std::fs::create_dir_all(root.join("rust")).unwrap();
        std::fs::write(root.join("keep.txt"), "mine").unwrap();
        std::fs::write(root.join("rust/old.rs"), "old").unwrap();

        let files = generate(&schemas(), &Rewriter::default(), &GenerateConfig::default()).unwrap();
        files.write_to(&root).unwrap();

        assert_eq!(std::fs::read_to_string(root.join("keep.txt")).unwrap(), "mine");
        assert_eq!(std::fs::read_to_string(root.join("rust/old.rs")).unwrap(), "old");
        let model = std::fs::read_to_string(root.join("rust/sandbox/models/point.rs")).unwrap();
        assert_eq!(model, files.get("rust/sandbox/models/point.rs").unwrap().contents);
        assert!(leftovers(dir.path()).is_empty());
    }
}
