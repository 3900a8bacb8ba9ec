use account_normalizer::core::config::{
    CollisionStrategy, ConfigLoader, ScopeMode, SecretHandling,
};
use account_normalizer::core::types::{ErrorCategory, ResourceType};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn clear_normalizer_env() {
    for v in &[
        "ACCOUNT_NORMALIZER_SCOPE_MODE",
        "ACCOUNT_NORMALIZER_SECRET_HANDLING",
        "ACCOUNT_NORMALIZER_STRIP_SOURCE_IDS",
        "ACCOUNT_NORMALIZER_INCLUDE_INACTIVE",
        "ACCOUNT_NORMALIZER_OUTPUT_DIR",
    ] {
        env::remove_var(v);
    }
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("importer_mapping.yml");
    fs::write(&path, content).unwrap();
    path
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Full mapping document with every section populated
#[test]
#[serial]
fn test_config_loading_integration() {
    clear_normalizer_env();
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        temp_dir.path(),
        r#"
version: 1
scope:
  mode: specific_projects
  project_keys: [analytics]
  project_ids: [501]
resource_filters:
  connections:
    exclude_keys: [legacy_conn]
  service_tokens:
    include: false
  groups:
    include_only_keys: [analysts, admins]
  projects:
    exclude_element_ids: [PRJ_009]
normalization_options:
  strip_source_ids: false
  include_inactive: true
  secret_handling: placeholder
  name_collision_strategy: suffix
  yaml_style:
    sort_keys: true
output:
  output_directory: out/normalized
  generate_manifests:
    lookups: true
    exclusions: false
    diff_json: false
"#,
    );

    let config = ConfigLoader::load(Some(&path)).unwrap();

    assert_eq!(config.scope_mode(), ScopeMode::SpecificProjects);
    assert_eq!(config.project_keys(), &["analytics".to_string()]);
    assert_eq!(config.project_ids(), &[501]);
    assert!(config
        .exclude_keys(ResourceType::Connections)
        .contains("legacy_conn"));
    assert!(!config.is_resource_included(ResourceType::ServiceTokens));
    assert_eq!(config.include_only_keys(ResourceType::Groups).len(), 2);
    assert!(config
        .exclude_element_ids(ResourceType::Projects)
        .contains("PRJ_009"));
    assert!(!config.strip_source_ids());
    assert!(config.include_inactive());
    assert_eq!(config.secret_handling(), SecretHandling::Placeholder);
    assert_eq!(config.collision_strategy(), CollisionStrategy::Suffix);
    assert!(config.sort_keys());
    assert_eq!(config.output_directory(), Path::new("out/normalized"));
    assert!(config.generate_lookups_manifest());
    assert!(!config.generate_exclusions_report());
    assert!(!config.generate_diff_json());
}

#[test]
#[serial]
fn test_fixture_mapping_loads() {
    clear_normalizer_env();
    let config = ConfigLoader::load(Some(&fixture("importer_mapping.yml"))).unwrap();
    assert_eq!(config.scope_mode(), ScopeMode::AllProjects);
    assert!(config
        .exclude_keys(ResourceType::Repositories)
        .contains("legacy_repo"));
    assert_eq!(config.secret_handling(), SecretHandling::Redact);
}

/// Absent sections and resource types fall back to documented defaults
#[test]
#[serial]
fn test_partial_config_uses_defaults() {
    clear_normalizer_env();
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(temp_dir.path(), "version: 1\n");

    let config = ConfigLoader::load(Some(&path)).unwrap();
    assert_eq!(config.scope_mode(), ScopeMode::AllProjects);
    assert!(config.strip_source_ids());
    assert!(!config.include_inactive());
    assert_eq!(config.secret_handling(), SecretHandling::Redact);
    assert!(!config.sort_keys());
    for resource in ResourceType::ALL {
        assert!(config.is_resource_included(resource));
        assert!(config.exclude_element_ids(resource).is_empty());
    }
    assert!(config.generate_lookups_manifest());
    assert!(config.generate_exclusions_report());
    assert!(config.generate_diff_json());
}

#[test]
#[serial]
fn test_env_overrides_take_precedence_over_file() {
    clear_normalizer_env();
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        temp_dir.path(),
        "version: 1\nnormalization_options:\n  secret_handling: redact\n  strip_source_ids: true\n",
    );

    env::set_var("ACCOUNT_NORMALIZER_SECRET_HANDLING", "omit");
    env::set_var("ACCOUNT_NORMALIZER_STRIP_SOURCE_IDS", "false");
    env::set_var("ACCOUNT_NORMALIZER_INCLUDE_INACTIVE", "true");
    env::set_var("ACCOUNT_NORMALIZER_SCOPE_MODE", "account_level_only");
    env::set_var("ACCOUNT_NORMALIZER_OUTPUT_DIR", "/tmp/normalized-out");

    let config = ConfigLoader::load(Some(&path)).unwrap();
    clear_normalizer_env();

    assert_eq!(config.secret_handling(), SecretHandling::Omit);
    assert!(!config.strip_source_ids());
    assert!(config.include_inactive());
    assert_eq!(config.scope_mode(), ScopeMode::AccountLevelOnly);
    assert_eq!(config.output_directory(), Path::new("/tmp/normalized-out"));
}

#[test]
#[serial]
fn test_invalid_env_override_is_rejected() {
    clear_normalizer_env();
    env::set_var("ACCOUNT_NORMALIZER_SCOPE_MODE", "some_projects");
    let err = ConfigLoader::load(None).unwrap_err();
    clear_normalizer_env();

    assert_eq!(err.code, "CFG-ENV-001");
    assert!(err.message.contains("some_projects"));
}

/// An env override can make an otherwise valid file fail validation
#[test]
#[serial]
fn test_validation_runs_after_overrides() {
    clear_normalizer_env();
    env::set_var("ACCOUNT_NORMALIZER_SCOPE_MODE", "specific_projects");
    let err = ConfigLoader::load(None).unwrap_err();
    clear_normalizer_env();

    assert_eq!(err.code, "CFG-VAL-002");
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
}

#[test]
#[serial]
fn test_unsupported_version_rejected() {
    clear_normalizer_env();
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(temp_dir.path(), "version: 2\n");
    let err = ConfigLoader::load(Some(&path)).unwrap_err();
    assert_eq!(err.code, "CFG-VAL-001");
}

#[test]
#[serial]
fn test_reserved_collision_strategy_rejected() {
    clear_normalizer_env();
    let temp_dir = TempDir::new().unwrap();
    for strategy in ["hash", "error", "prefix_project"] {
        let path = write_config(
            temp_dir.path(),
            &format!(
                "version: 1\nnormalization_options:\n  name_collision_strategy: {}\n",
                strategy
            ),
        );
        let err = ConfigLoader::load(Some(&path)).unwrap_err();
        assert_eq!(err.code, "CFG-LOAD-002");
        assert!(err.message.contains("reserved and not implemented"));
        assert_eq!(
            err.context.get("path"),
            Some(&path.display().to_string())
        );
    }
}

#[test]
#[serial]
fn test_malformed_yaml_and_missing_file() {
    clear_normalizer_env();
    let temp_dir = TempDir::new().unwrap();

    let path = write_config(temp_dir.path(), "version: 1\nscope: [unterminated\n");
    let err = ConfigLoader::load(Some(&path)).unwrap_err();
    assert_eq!(err.code, "CFG-LOAD-002");

    let missing = temp_dir.path().join("absent.yml");
    let err = ConfigLoader::load(Some(&missing)).unwrap_err();
    assert_eq!(err.code, "CFG-LOAD-001");
    assert!(err.message.contains("does not exist"));
}

#[test]
fn test_env_var_documentation_lists_every_override() {
    let docs = ConfigLoader::env_var_documentation();
    assert_eq!(docs.len(), 5);
    assert!(docs
        .iter()
        .any(|line| line.starts_with("ACCOUNT_NORMALIZER_SECRET_HANDLING")));
}
