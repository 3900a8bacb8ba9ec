#![allow(clippy::result_large_err)]

//! Run-scoped normalization bookkeeping.
//!
//! A [`NormalizationContext`] is created for exactly one run, mutated by the
//! single traversal that performs the run, and then handed read-only to the
//! artifact writer. It is never shared between runs.

use crate::core::config::{CollisionStrategy, MappingConfig};
use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, ResourceType};
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};
use std::fmt;

/// A reference that could not be resolved during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    /// `LOOKUP:<identifier>` token written into the document
    pub id: String,
    pub description: String,
}

/// Why an entity was left out of the normalized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExclusionReason {
    KeyFilter,
    ElementIdFilter,
    NotInAllowList,
    Inactive,
    ResourceTypeDisabled,
    NotInScope,
    AccountLevelOnly,
    ParentProjectExcluded,
    SecretOmitted,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::KeyFilter => "Excluded by key filter",
            ExclusionReason::ElementIdFilter => "Excluded by element ID filter",
            ExclusionReason::NotInAllowList => "Not in include_only whitelist",
            ExclusionReason::Inactive => "Inactive/soft-deleted",
            ExclusionReason::ResourceTypeDisabled => "Resource type disabled",
            ExclusionReason::NotInScope => "Not in scope filter",
            ExclusionReason::AccountLevelOnly => "Account-level-only scope",
            ExclusionReason::ParentProjectExcluded => "Parent project excluded",
            ExclusionReason::SecretOmitted => "Secret variable omitted",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExclusionReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn serialize_singular<S: Serializer>(resource: &ResourceType, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(resource.singular())
}

/// One recorded exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    #[serde(serialize_with = "serialize_singular")]
    pub resource_type: ResourceType,
    pub key: String,
    pub element_mapping_id: Option<String>,
    pub reason: ExclusionReason,
}

/// A base key that was requested more than once in a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionRecord {
    pub namespace: String,
    pub base_key: String,
    pub occurrences: u32,
}

#[derive(Debug, Default)]
pub struct NormalizationContext {
    strategy: CollisionStrategy,
    placeholders: Vec<Placeholder>,
    exclusions: Vec<Exclusion>,
    /// namespace -> (base key -> times requested)
    collisions: IndexMap<String, IndexMap<String, u32>>,
    /// namespace -> every key handed out so far
    issued: IndexMap<String, IndexSet<String>>,
    /// element mapping id -> output key
    element_registry: IndexMap<String, String>,
}

impl NormalizationContext {
    pub fn new(strategy: CollisionStrategy) -> Self {
        NormalizationContext {
            strategy,
            ..Default::default()
        }
    }

    pub fn for_policy(policy: &MappingConfig) -> Self {
        Self::new(policy.collision_strategy())
    }

    /// Record an excluded resource.
    pub fn record_exclusion(
        &mut self,
        resource: ResourceType,
        key: &str,
        reason: ExclusionReason,
        element_id: Option<&str>,
    ) {
        tracing::info!(
            resource = resource.singular(),
            key,
            reason = reason.as_str(),
            "excluded resource"
        );
        self.exclusions.push(Exclusion {
            resource_type: resource,
            key: key.to_string(),
            element_mapping_id: element_id.map(str::to_string),
            reason,
        });
    }

    /// Return a key that is unique inside `namespace`.
    ///
    /// The first request for a base key returns it unchanged; the k-th
    /// request returns `<base>_<k>`. A generated key is never handed out twice,
    /// even when a later entity's natural key happens to equal it.
    pub fn resolve_collision(&mut self, candidate: &str, namespace: &str) -> String {
        match self.strategy {
            CollisionStrategy::Suffix => self.resolve_with_suffix(candidate, namespace),
        }
    }

    fn resolve_with_suffix(&mut self, candidate: &str, namespace: &str) -> String {
        let counters = self.collisions.entry(namespace.to_string()).or_default();
        let issued = self.issued.entry(namespace.to_string()).or_default();
        let count = counters.entry(candidate.to_string()).or_insert(0);
        *count += 1;

        if *count == 1 && issued.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        // `count` stays the number of requests; taken suffixes only move the cursor
        let mut suffix = (*count).max(2);
        loop {
            let key = format!("{}_{}", candidate, suffix);
            if issued.insert(key.clone()) {
                tracing::warn!(namespace, from = candidate, to = %key, "key collision resolved");
                return key;
            }
            suffix += 1;
        }
    }

    /// Associate an element mapping id with its output key.
    ///
    /// Registering the same id twice in one run is an integrity error: the id
    /// is the join key for reference resolution and must stay unambiguous.
    pub fn register_element(&mut self, element_id: Option<&str>, key: &str) -> Result<(), AppError> {
        let Some(element_id) = element_id else {
            return Ok(());
        };
        if let Some(existing) = self.element_registry.get(element_id) {
            let mut err = AppError::new(
                ErrorCategory::IntegrityError,
                format!(
                    "element id '{}' registered twice ('{}' and '{}')",
                    element_id, existing, key
                ),
            )
            .with_code("NORM-REG-001")
            .with_suggestion("element mapping ids must be unique across the snapshot");
            err.add_context("element_id", element_id);
            return Err(err);
        }
        tracing::debug!(element_id, key, "registered element");
        self.element_registry
            .insert(element_id.to_string(), key.to_string());
        Ok(())
    }

    /// Look up the output key registered for an element id.
    pub fn resolve_reference(&self, element_id: &str) -> Option<&str> {
        if element_id.is_empty() {
            return None;
        }
        self.element_registry.get(element_id).map(String::as_str)
    }

    /// Record a LOOKUP placeholder.
    pub fn add_placeholder(&mut self, lookup_id: impl Into<String>, description: impl Into<String>) {
        let placeholder = Placeholder {
            id: lookup_id.into(),
            description: description.into(),
        };
        tracing::info!(id = %placeholder.id, description = %placeholder.description, "added placeholder");
        self.placeholders.push(placeholder);
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn has_placeholders(&self) -> bool {
        !self.placeholders.is_empty()
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Times `base_key` was requested in `namespace`, if ever.
    pub fn collision_count(&self, namespace: &str, base_key: &str) -> Option<u32> {
        self.collisions
            .get(namespace)
            .and_then(|counters| counters.get(base_key))
            .copied()
    }

    /// Base keys that needed disambiguation, in first-seen order.
    pub fn collision_summary(&self) -> Vec<CollisionRecord> {
        self.collisions
            .iter()
            .flat_map(|(namespace, counters)| {
                counters
                    .iter()
                    .filter(|(_, count)| **count > 1)
                    .map(move |(base_key, count)| CollisionRecord {
                        namespace: namespace.clone(),
                        base_key: base_key.clone(),
                        occurrences: *count,
                    })
            })
            .collect()
    }

    pub fn element_registry(&self) -> &IndexMap<String, String> {
        &self.element_registry
    }
}
