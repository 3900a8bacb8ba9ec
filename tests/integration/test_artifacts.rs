use account_normalizer::core::config::MappingConfig;
use account_normalizer::core::context::{ExclusionReason, NormalizationContext};
use account_normalizer::core::pipeline::run_normalization;
use account_normalizer::core::run_tracker::{NormRunInfo, NormalizationRunTracker, CONTROL_FILE_NAME};
use account_normalizer::core::snapshot::AccountSnapshot;
use account_normalizer::core::types::ResourceType;
use account_normalizer::core::writer::{artifact_file_name, ArtifactKind, ArtifactWriter};
use chrono::TimeZone;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn fixture_snapshot() -> AccountSnapshot {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("account_snapshot.json");
    AccountSnapshot::load(&path).unwrap()
}

fn fixed_run() -> NormRunInfo {
    NormRunInfo {
        norm_run_id: 4,
        timestamp: "20260102_030405".to_string(),
        account_id: 12345,
        source_fetch_run_id: Some(9),
        started_at: chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
    }
}

/// First line of the YAML body, after the comment header
fn first_body_line(yaml: &str) -> &str {
    yaml.lines()
        .find(|line| !line.starts_with('#') && !line.trim().is_empty())
        .unwrap()
}

#[test]
fn test_write_all_artifacts_with_tracked_run() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("normalized");
    let policy = MappingConfig::default();
    let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();

    let tracker = NormalizationRunTracker::in_directory(&out);
    let run = tracker.start_run(12345, Some(3)).unwrap();
    assert_eq!(run.norm_run_id, 1);

    let written = ArtifactWriter::new(&policy, &outcome.context)
        .write_all_artifacts(&outcome.document, &out, &run)
        .unwrap();

    assert_eq!(written.len(), 4);
    for (kind, path) in &written {
        assert!(path.exists(), "{} missing", kind);
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            artifact_file_name(*kind, &run)
        );
    }
    let yaml_name = written[&ArtifactKind::Yaml]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();
    assert!(yaml_name.starts_with("account_12345_norm_001__yaml__"));
    assert!(yaml_name.ends_with(".yml"));
    assert!(out.join(CONTROL_FILE_NAME).exists());

    // no temp files left behind
    let leftovers = fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
        .count();
    assert_eq!(leftovers, 0);

    let second = tracker.start_run(12345, None).unwrap();
    assert_eq!(second.norm_run_id, 2);
}

#[test]
fn test_manifest_toggles_limit_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let mut policy = MappingConfig::default();
    policy.output.generate_manifests.lookups = false;
    policy.output.generate_manifests.exclusions = false;
    policy.output.generate_manifests.diff_json = false;
    let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();

    let written = ArtifactWriter::new(&policy, &outcome.context)
        .write_all_artifacts(&outcome.document, temp_dir.path(), &fixed_run())
        .unwrap();
    assert_eq!(written.keys().copied().collect::<Vec<_>>(), vec![ArtifactKind::Yaml]);
}

#[test]
fn test_yaml_header_and_key_order() {
    let policy = MappingConfig::default();
    let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();
    let yaml = ArtifactWriter::new(&policy, &outcome.context)
        .render_yaml(&outcome.document, &fixed_run())
        .unwrap();

    let mut lines = yaml.lines();
    assert_eq!(lines.next(), Some("# dbt Cloud Configuration (v2 Schema)"));
    assert_eq!(lines.next(), Some("# Generated: 2026-01-02 03:04:05 UTC"));
    assert_eq!(lines.next(), Some("# Normalization Run: 004"));
    assert_eq!(lines.next(), Some("# Source Account: 12345"));
    assert_eq!(first_body_line(&yaml), "version: 2");

    let body: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(body["account"]["name"], serde_yaml::Value::from("Acme Analytics"));
    assert!(body["metadata"]["placeholders"].is_sequence());
}

#[test]
fn test_sort_keys_orders_mappings_alphabetically() {
    let mut policy = MappingConfig::default();
    policy.normalization_options.yaml_style.sort_keys = true;
    let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();
    let yaml = ArtifactWriter::new(&policy, &outcome.context)
        .render_yaml(&outcome.document, &fixed_run())
        .unwrap();

    assert_eq!(first_body_line(&yaml), "account:");
    let top_level: Vec<&str> = yaml
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with(' ') && !line.starts_with('-'))
        .filter(|line| !line.is_empty())
        .collect();
    let mut sorted = top_level.clone();
    sorted.sort();
    assert_eq!(top_level, sorted);
}

#[test]
fn test_lookups_manifest_and_diff_json() {
    let policy = MappingConfig::default();
    let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();
    let writer = ArtifactWriter::new(&policy, &outcome.context);

    let lookups: serde_json::Value =
        serde_json::from_str(&writer.render_lookups_manifest(&fixed_run()).unwrap()).unwrap();
    assert_eq!(lookups["_metadata"]["run_id"], 4);
    assert_eq!(lookups["_metadata"]["account_id"], 12345);
    assert_eq!(
        lookups["_metadata"]["total_placeholders"],
        outcome.context.placeholders().len()
    );
    assert!(lookups["instructions"].as_str().unwrap().contains("LOOKUP:"));

    let diff: serde_json::Value = serde_json::from_str(
        &writer
            .render_diff_json(&outcome.document, &fixed_run())
            .unwrap(),
    )
    .unwrap();
    assert_eq!(diff["normalized"]["version"], 2);
    assert_eq!(
        diff["normalized"],
        serde_json::to_value(&outcome.document).unwrap()
    );
}

#[test]
fn test_exclusions_report_layout() {
    let policy = MappingConfig::default();
    let mut ctx = NormalizationContext::default();
    ctx.record_exclusion(
        ResourceType::ServiceTokens,
        "old_token",
        ExclusionReason::Inactive,
        Some("TOK_002"),
    );
    ctx.record_exclusion(
        ResourceType::Repositories,
        "legacy_repo",
        ExclusionReason::KeyFilter,
        Some("REP_002"),
    );

    let report = ArtifactWriter::new(&policy, &ctx).render_exclusions_report(&fixed_run());
    insta::assert_snapshot!(report, @r"
# Normalization Exclusions Report

**Generated:** 2026-01-02 03:04:05 UTC
**Normalization Run:** 004
**Source Account:** 12345

## Summary

**Total Exclusions:** 2

### By Resource Type

- **repository:** 1
- **service_token:** 1

### By Reason

- **Excluded by key filter:** 1
- **Inactive/soft-deleted:** 1

---

## Detailed Exclusions

### Repository

| Key | Element Mapping ID | Reason |
|-----|-------------------|--------|
| `legacy_repo` | `REP_002` | Excluded by key filter |

### Service Token

| Key | Element Mapping ID | Reason |
|-----|-------------------|--------|
| `old_token` | `TOK_002` | Inactive/soft-deleted |
");
}

#[test]
fn test_exclusions_report_reasons_by_count() {
    let policy = MappingConfig::default();
    let mut ctx = NormalizationContext::default();
    for key in ["a", "b"] {
        ctx.record_exclusion(ResourceType::Jobs, key, ExclusionReason::ParentProjectExcluded, None);
    }
    ctx.record_exclusion(ResourceType::Projects, "p", ExclusionReason::NotInScope, None);

    let report = ArtifactWriter::new(&policy, &ctx).render_exclusions_report(&fixed_run());
    let parent = report.find("- **Parent project excluded:** 2").unwrap();
    let scope = report.find("- **Not in scope filter:** 1").unwrap();
    assert!(parent < scope);
    assert!(report.contains("| `a` | `N/A` | Parent project excluded |"));
}
