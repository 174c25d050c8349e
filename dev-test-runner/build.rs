//! Generates Rust models and builders for `fixtures/dashboard.yaml` into
//! `OUT_DIR`: as derived, with `fixtures/veneers.yaml` applied, and
//! reshaped by the rules below.
use std::path::PathBuf;

use anyhow::Context;
use cogjen::lower::lower_all;
use cogjen::schema::SchemaDoc;
use cogjen::veneers::Rewriter;
use cogjen::{GenerateConfig, Target};

/// Moves the time picker's options onto the dashboard and drops the
/// link URL option.
const RESHAPED: &str = r#"
builders:
  - merge_into: { by_name: Dashboard, source: TimePicker, under: timepicker, exclude_options: [refresh_intervals] }
options:
  - omit: { by_name: DashboardLink.url }
  - struct_fields_as_arguments: { by_name: Dashboard.timepicker, fields: [hidden] }
"#;

fn main() -> anyhow::Result<()> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let fixtures = manifest_dir.join("..").join("fixtures");
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    println!("cargo:rerun-if-changed={}", fixtures.display());

    let doc = SchemaDoc::load(&fixtures.join("dashboard.yaml"))?;
    let schemas = lower_all(std::slice::from_ref(&doc))?;
    let config = GenerateConfig { targets: vec![Target::Rust], ..Default::default() };

    let variants = [
        ("plain", Rewriter::default()),
        ("veneered", Rewriter::load(&fixtures.join("veneers.yaml"))?),
        ("reshaped", Rewriter::from_yaml_str(RESHAPED, "reshaped.yaml")?),
    ];
    let mut index = String::new();
    for (name, rewriter) in variants {
        let root = out_dir.join(name);
        cogjen::generate(&schemas, &rewriter, &config)?
            .write_to(&root)
            .with_context(|| format!("failed to write {}", root.display()))?;
        let entry = root.join("rust").join("dashboard").join("mod.rs");
        index.push_str(&format!(
            "pub mod {name} {{\n    #[path = {:?}]\n    pub mod dashboard;\n}}\n",
            entry.display().to_string()
        ));
    }
    std::fs::write(out_dir.join("generated.rs"), index)?;
    Ok(())
}
