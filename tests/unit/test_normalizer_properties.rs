use account_normalizer::core::config::{MappingConfig, ResourceFilter, ScopeMode, SecretHandling};
use account_normalizer::core::document::NormalizedDocument;
use account_normalizer::core::normalizer::secrets::{self, REDACTED};
use account_normalizer::core::pipeline::run_normalization;
use account_normalizer::core::snapshot::AccountSnapshot;
use account_normalizer::core::types::ResourceType;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;

fn fixture_snapshot() -> AccountSnapshot {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("account_snapshot.json");
    AccountSnapshot::load(&path).unwrap()
}

fn input_entity_count(snapshot: &AccountSnapshot) -> usize {
    let g = &snapshot.globals;
    g.connections.len()
        + g.repositories.len()
        + g.service_tokens.len()
        + g.groups.len()
        + g.notifications.len()
        + g.webhooks.len()
        + g.privatelink_endpoints.len()
        + snapshot.projects.len()
        + snapshot.project_entity_count()
}

fn output_entity_count(doc: &NormalizedDocument) -> usize {
    fn len<T>(records: &Option<Vec<T>>) -> usize {
        records.as_ref().map(Vec::len).unwrap_or(0)
    }
    let g = &doc.globals;
    let globals = len(&g.connections)
        + len(&g.repositories)
        + len(&g.service_tokens)
        + len(&g.groups)
        + len(&g.notifications)
        + len(&g.webhooks)
        + len(&g.privatelink_endpoints);
    let projects: usize = doc
        .projects
        .iter()
        .map(|p| 1 + len(&p.environments) + len(&p.jobs) + len(&p.environment_variables))
        .sum();
    globals + projects
}

fn policies() -> Vec<MappingConfig> {
    let mut policies = vec![MappingConfig::default()];

    let mut filtered = MappingConfig::default();
    filtered.resource_filters.insert(
        ResourceType::Repositories,
        ResourceFilter {
            exclude_keys: ["legacy_repo".to_string()].into_iter().collect(),
            ..Default::default()
        },
    );
    filtered.resource_filters.insert(
        ResourceType::Connections,
        ResourceFilter {
            exclude_ids: ["CON_002".to_string()].into_iter().collect(),
            ..Default::default()
        },
    );
    filtered.resource_filters.insert(
        ResourceType::Jobs,
        ResourceFilter {
            include: false,
            ..Default::default()
        },
    );
    policies.push(filtered);

    let mut omit = MappingConfig::default();
    omit.normalization_options.secret_handling = SecretHandling::Omit;
    policies.push(omit);

    let mut scoped = MappingConfig::default();
    scoped.scope.mode = ScopeMode::SpecificProjects;
    scoped.scope.project_keys = vec!["marketing".to_string()];
    policies.push(scoped);

    let mut account_only = MappingConfig::default();
    account_only.scope.mode = ScopeMode::AccountLevelOnly;
    policies.push(account_only);

    let mut inactive = MappingConfig::default();
    inactive.normalization_options.include_inactive = true;
    policies.push(inactive);

    policies
}

/// Every input entity is either emitted or excluded, never both, never neither
#[test]
fn test_every_entity_is_emitted_or_excluded() {
    let snapshot = fixture_snapshot();
    let total = input_entity_count(&snapshot);
    for policy in policies() {
        let outcome = run_normalization(&snapshot, &policy).unwrap();
        assert_eq!(
            output_entity_count(&outcome.document) + outcome.context.exclusions().len(),
            total,
            "scope {:?}",
            policy.scope_mode()
        );
    }
}

#[test]
fn test_document_references_are_all_placeholders() {
    let snapshot = fixture_snapshot();
    for policy in policies() {
        let outcome = run_normalization(&snapshot, &policy).unwrap();
        let recorded: HashSet<&str> = outcome
            .context
            .placeholders()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        for token in outcome.document.lookup_tokens() {
            assert!(recorded.contains(token), "unrecorded reference {}", token);
        }
        match &outcome.document.metadata {
            Some(metadata) => assert_eq!(metadata.placeholders, outcome.context.placeholders()),
            None => assert!(!outcome.context.has_placeholders()),
        }
    }
}

#[test]
fn test_normalization_is_deterministic() {
    let snapshot = fixture_snapshot();
    let policy = MappingConfig::default();
    let first = run_normalization(&snapshot, &policy).unwrap();
    let second = run_normalization(&snapshot, &policy).unwrap();
    assert_eq!(first.document, second.document);
    assert_eq!(first.context.exclusions(), second.context.exclusions());
    assert_eq!(
        serde_yaml::to_string(&first.document).unwrap(),
        serde_yaml::to_string(&second.document).unwrap()
    );
}

#[test]
fn test_emitted_keys_are_unique_per_namespace() {
    let outcome = run_normalization(&fixture_snapshot(), &MappingConfig::default()).unwrap();
    let keys: Vec<&str> = outcome
        .document
        .globals
        .connections
        .iter()
        .flatten()
        .map(|c| c.key.as_str())
        .collect();
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len());
}

#[test]
fn test_source_ids_follow_strip_option() {
    let snapshot = fixture_snapshot();
    let stripped = run_normalization(&snapshot, &MappingConfig::default()).unwrap();
    let yaml = serde_yaml::to_string(&stripped.document).unwrap();
    assert!(!yaml.contains("id: 100"));
    assert!(stripped.document.account.id.is_none());

    let mut keep = MappingConfig::default();
    keep.normalization_options.strip_source_ids = false;
    let kept = run_normalization(&snapshot, &keep).unwrap();
    assert_eq!(kept.document.account.id, Some(12345));
    assert_eq!(kept.document.projects[0].id, Some(500));
}

#[test]
fn test_redaction_is_idempotent() {
    let mut details = IndexMap::new();
    details.insert("account".to_string(), json!("acme"));
    details.insert("password".to_string(), json!("hunter2"));
    details.insert("private_key".to_string(), json!("-----BEGIN"));

    let once = secrets::mask_details(&details, SecretHandling::Redact);
    let twice = secrets::mask_details(&once, SecretHandling::Redact);
    assert_eq!(once, twice);
    assert_eq!(once["password"], Value::String(REDACTED.to_string()));
    assert_eq!(once["account"], json!("acme"));
}

#[test]
fn test_omit_removes_secret_keys_entirely() {
    let mut policy = MappingConfig::default();
    policy.normalization_options.secret_handling = SecretHandling::Omit;
    let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();

    let connections = outcome.document.globals.connections.as_ref().unwrap();
    let details = connections[0].details.as_ref().unwrap();
    assert!(!details.contains_key("password"));
    assert!(details.contains_key("warehouse"));

    let vars = outcome.document.projects[0]
        .environment_variables
        .as_ref()
        .unwrap();
    assert!(vars.iter().all(|v| !secrets::is_secret_variable(&v.name)));
    assert!(outcome
        .context
        .exclusions()
        .iter()
        .any(|e| e.key == "DBT_ENV_SECRET_API_KEY"));
}

#[test]
fn test_no_secret_value_survives_any_handling() {
    for handling in [
        SecretHandling::Redact,
        SecretHandling::Placeholder,
        SecretHandling::Omit,
    ] {
        let mut policy = MappingConfig::default();
        policy.normalization_options.secret_handling = handling;
        let outcome = run_normalization(&fixture_snapshot(), &policy).unwrap();
        let yaml = serde_yaml::to_string(&outcome.document).unwrap();
        assert!(!yaml.contains("hunter2"), "{:?}", handling);
        assert!(!yaml.contains("prod-secret"), "{:?}", handling);
        assert!(!yaml.contains("default-secret"), "{:?}", handling);
    }
}
