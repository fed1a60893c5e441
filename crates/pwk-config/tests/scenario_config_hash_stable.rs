//! Scenario: layered config hash stability
//!
//! GREEN when:
//! - the same inputs hash identically across calls;
//! - key order inside YAML does not change the hash;
//! - an overlay that changes a value changes the hash;
//! - leaves outside the consumed registry are reported, and fail in Fail mode.

use pwk_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy,
};

const BASE_YAML: &str = r#"
products:
  ids: [premium.monthly, premium.yearly]
storage:
  key: is_premium
  path: ./pwk-entitlement.json
"#;

const BASE_YAML_REORDERED: &str = r#"
storage:
  path: ./pwk-entitlement.json
  key: is_premium
products:
  ids: [premium.monthly, premium.yearly]
"#;

const OVERLAY_YAML: &str = r#"
storage:
  key: premium_v2
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex digest");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    let settings = layered.settings().unwrap();
    assert_eq!(settings.storage.key, "premium_v2");
    assert_eq!(settings.storage.path, "./pwk-entitlement.json");
}

#[test]
fn files_load_in_merge_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let loaded = load_layered_yaml(&[base.to_str().unwrap(), overlay.to_str().unwrap()]).unwrap();
    assert_eq!(loaded.settings().unwrap().storage.key, "premium_v2");

    let missing = dir.path().join("missing.yaml");
    assert!(load_layered_yaml(&[missing.to_str().unwrap()]).is_err());
}

#[test]
fn unused_keys_warn_or_fail() {
    let yaml = format!("{BASE_YAML}\nui:\n  theme: dark\n");
    let loaded = load_layered_yaml_from_strings(&[yaml.as_str()]).unwrap();

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/ui/theme".to_string()]);

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));

    // Check intervals are passed by the host, not read from config.
    let yaml = format!("{BASE_YAML}\nchecks:\n  short_interval_secs: 60\n");
    let loaded = load_layered_yaml_from_strings(&[yaml.as_str()]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/checks/short_interval_secs".to_string()]
    );

    let clean = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert!(report_unused_keys(&clean.config_json, UnusedKeyPolicy::Fail)
        .unwrap()
        .is_clean());
}
