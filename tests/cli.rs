use std::path::{Path, PathBuf};

use clap::Parser;
use cogjen::cli::CommandLineInterface;

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name).display().to_string()
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["cogjen"];
    argv.extend_from_slice(args);
    CommandLineInterface::try_parse_from(argv)?.run()
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn generate_writes_every_target() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("gen");
    run(&["generate", "--schema", &fixture("dashboard.yaml"), "--out", &path_str(&out)]).unwrap();

    for path in [
        "rust/dashboard/mod.rs",
        "rust/dashboard/models/dashboard_link.rs",
        "rust/dashboard/builders/dashboard.rs",
        "python/cog/runtime.py",
        "python/models/dashboard.py",
        "python/builders/dashboard.py",
        "typescript/options_builder_gen.ts",
        "typescript/dashboard/dashboard/types_gen.ts",
        "typescript/dashboard/dashboard/builder_gen.ts",
    ] {
        assert!(out.join(path).is_file(), "missing {path}");
    }
    let model = std::fs::read_to_string(out.join("rust/dashboard/models/dashboard.rs")).unwrap();
    assert!(model.starts_with("// Code generated by cogjen. DO NOT EDIT."));
}

#[test]
fn generate_honours_targets_and_veneers() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("gen");
    run(&[
        "generate",
        "--schema",
        &fixture("dashboard.yaml"),
        "--out",
        &path_str(&out),
        "--target",
        "rust",
        "--veneers",
        &fixture("veneers.yaml"),
        "--rust-runtime-path",
        "crate::runtime",
    ])
    .unwrap();

    assert!(!out.join("python").exists());
    assert!(!out.join("typescript").exists());
    assert!(!out.join("rust/dashboard/builders/time_picker.rs").exists());
    let builder = std::fs::read_to_string(out.join("rust/dashboard/builders/dashboard.rs")).unwrap();
    assert!(builder.contains("use crate::runtime::{resolve_list, resolve_map, BuildError, Builder, Nested};"));
    assert!(builder.contains("pub fn with_link("));
}

#[test]
fn a_failing_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let veneers = dir.path().join("veneers.yaml");
    std::fs::write(&veneers, "options:\n  - omit: { by_name: Dashboard.nope }\n").unwrap();
    let out = dir.path().join("gen");

    let err = run(&[
        "generate",
        "--schema",
        &fixture("dashboard.yaml"),
        "--out",
        &path_str(&out),
        "--veneers",
        &path_str(&veneers),
    ])
    .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("matched nothing for `Dashboard.nope`"), "{message}");
    assert!(message.contains("veneers.yaml: options[0]: invalid veneer rule"), "{message}");
    assert!(!out.exists());
}

#[test]
fn schema_globs_expand_to_every_document() {
    let dir = tempfile::tempdir().unwrap();
    let schemas = dir.path().join("schemas");
    std::fs::create_dir_all(&schemas).unwrap();
    std::fs::copy(fixture("dashboard.yaml"), schemas.join("dashboard.yaml")).unwrap();
    std::fs::write(
        schemas.join("common.json"),
        r#"{"package": "common", "types": [{"name": "Ref", "kind": "struct", "fields": [{"name": "uid", "type": "string"}]}]}"#,
    )
    .unwrap();
    let pattern = path_str(&schemas.join("*"));
    let view = dir.path().join("ir.json");

    run(&["ir", "--schema", &pattern, "--out", &path_str(&view)]).unwrap();

    let ir: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&view).unwrap()).unwrap();
    let packages: Vec<&str> = ir.as_array().unwrap().iter().map(|p| p["package"].as_str().unwrap()).collect();
    assert_eq!(packages, ["common", "dashboard"]);
    assert_eq!(ir[1]["types"][0]["fields"][1]["type"], "Uid");
}

#[test]
fn encode_sorts_keys_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let input: PathBuf = dir.path().join("in.json");
    std::fs::write(&input, r#"{"title": "X", "links": [{"url": "u1", "title": "A"}]}"#).unwrap();
    let out = dir.path().join("out.json");

    run(&[
        "encode",
        "--input",
        &path_str(&input),
        "--sort-keys",
        "--indent",
        "0",
        "--out",
        &path_str(&out),
    ])
    .unwrap();

    let encoded = std::fs::read_to_string(&out).unwrap();
    assert_eq!(encoded, r#"{"links":[{"title":"A","url":"u1"}],"title":"X"}"#);
}
