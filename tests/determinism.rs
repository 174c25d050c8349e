use proptest::prelude::*;

use cogjen::lower::{lower_all, lower_schema};
use cogjen::schema::SchemaDoc;
use cogjen::veneers::Rewriter;
use cogjen::{generate, GenerateConfig, Target};

fn dashboard() -> SchemaDoc {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/dashboard.yaml");
    SchemaDoc::load(&path).unwrap()
}

fn common() -> SchemaDoc {
    SchemaDoc::from_yaml_str(
        r#"
package: common
types:
  - name: Ref
    kind: struct
    fields:
      - { name: uid, type: string, required: true }
      - { name: kind, type: "string?" }
"#,
        "common.yaml",
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn declaration_order_does_not_change_output(
        order in Just((0..dashboard().types.len()).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let doc = dashboard();
        let mut shuffled = doc.clone();
        shuffled.types = order.iter().map(|&i| doc.types[i].clone()).collect();

        let config = GenerateConfig::default();
        let baseline = generate(&[lower_schema(&doc).unwrap()], &Rewriter::default(), &config).unwrap();
        let permuted = generate(&[lower_schema(&shuffled).unwrap()], &Rewriter::default(), &config).unwrap();

        prop_assert_eq!(baseline.len(), permuted.len());
        for (base, perm) in baseline.iter().zip(permuted.iter()) {
            prop_assert_eq!(&base.path, &perm.path);
            prop_assert_eq!(&base.contents, &perm.contents, "{} differs", base.path);
        }
        prop_assert_eq!(baseline, permuted);
    }

    #[test]
    fn package_and_target_order_do_not_matter(
        swap_packages in any::<bool>(),
        targets in Just(vec![Target::TypeScript, Target::Rust, Target::Python, Target::Rust]).prop_shuffle(),
    ) {
        let docs = if swap_packages { vec![common(), dashboard()] } else { vec![dashboard(), common()] };
        let schemas = lower_all(&docs).unwrap();
        let config = GenerateConfig { targets, ..Default::default() };
        let files = generate(&schemas, &Rewriter::default(), &config).unwrap();

        let reference_schemas = lower_all(&[dashboard(), common()]).unwrap();
        let reference = generate(&reference_schemas, &Rewriter::default(), &GenerateConfig::default()).unwrap();
        prop_assert_eq!(files, reference);
    }
}

#[test]
fn targets_can_be_generated_alone() {
    let schemas = lower_all(&[dashboard()]).unwrap();
    let config = GenerateConfig { targets: vec![Target::Python], ..Default::default() };
    let files = generate(&schemas, &Rewriter::default(), &config).unwrap();
    assert!(files.iter().all(|f| f.path.starts_with("python/")));
    assert!(!files.is_empty());
}
