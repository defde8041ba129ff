use std::fs;
use std::path::Path;

use squall_config::{CollectionCatalog, ParserSpec};
use squall_domain::{FieldType, VendorTag};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture_catalog() -> (tempfile::TempDir, CollectionCatalog) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        &root.join("cpu/cisco_ios.yaml"),
        r#"
command: show processes cpu sorted
interval: 30
parsers:
  - type: textfsm
    templates:
      - cisco_ios_show_processes_cpu_sorted.textfsm
  - type: regex
    pattern: 'CPU utilization for five seconds:\s+(\d+)%'
    flags: DOTALL
    groups:
      five_sec_total: 1
normalize:
  five_sec: five_sec_total
"#,
    );
    write(
        &root.join("cpu/_schema.yaml"),
        r#"
fields:
  five_sec:
    type: float
  one_min:
    type: float
"#,
    );
    write(
        &root.join("interfaces/arista_eos.yaml"),
        "command: show ip interface brief\nparsers: []\n",
    );

    let catalog = CollectionCatalog::open(root);
    (dir, catalog)
}

#[test]
fn loads_spec_with_parsers_and_normalize() {
    let (_dir, catalog) = fixture_catalog();
    let spec = catalog
        .spec("cpu", &VendorTag::new("cisco_ios"))
        .expect("cpu config should load");

    assert_eq!(spec.command, "show processes cpu sorted");
    assert_eq!(spec.interval, Some(30));
    assert_eq!(spec.parsers.len(), 2);
    assert!(matches!(spec.parsers[0], ParserSpec::TextFsm { .. }));
    match &spec.parsers[1] {
        ParserSpec::Regex { flags, groups, .. } => {
            assert_eq!(flags, "DOTALL");
            assert_eq!(groups.get("five_sec_total"), Some(&1));
        }
        other => panic!("expected regex parser, got {:?}", other),
    }
    assert_eq!(spec.normalize.get("five_sec").map(String::as_str), Some("five_sec_total"));
}

#[test]
fn vendor_fallback_resolves_base_platform() {
    let (_dir, catalog) = fixture_catalog();
    // No cisco_ios_xe.yaml on disk; must fall back to cisco_ios.yaml.
    let spec = catalog.spec("cpu", &VendorTag::new("cisco_ios_xe"));
    assert!(spec.is_some(), "cisco_ios_xe should inherit cisco_ios config");
}

#[test]
fn schema_parses_field_types() {
    let (_dir, catalog) = fixture_catalog();
    let schema = catalog.schema("cpu").expect("schema should load");
    assert_eq!(schema.field_type("five_sec"), Some(FieldType::Float));
    assert_eq!(schema.field_type("missing"), None);
}

#[test]
fn list_collections_filters_by_vendor() {
    let (_dir, catalog) = fixture_catalog();
    assert_eq!(catalog.list_collections(&VendorTag::new("cisco_ios")), vec!["cpu"]);
    assert_eq!(
        catalog.list_collections(&VendorTag::new("arista_eos")),
        vec!["interfaces"]
    );
    assert!(catalog.list_collections(&VendorTag::new("juniper_junos")).is_empty());
}

#[test]
fn interval_defaults_per_collection() {
    let (_dir, catalog) = fixture_catalog();
    // Explicit value wins.
    assert_eq!(catalog.interval("cpu", &VendorTag::new("cisco_ios")), 30);
    // interfaces yaml has no interval, so the default of 60 applies.
    assert_eq!(catalog.interval("interfaces", &VendorTag::new("arista_eos")), 60);
    // Unknown collection falls back to the generic default.
    assert_eq!(catalog.interval("nonexistent", &VendorTag::new("cisco_ios")), 60);
}

#[test]
fn missing_collection_returns_none() {
    let (_dir, catalog) = fixture_catalog();
    assert!(catalog.spec("bgp_summary", &VendorTag::new("cisco_ios")).is_none());
}
