#![allow(clippy::result_large_err)]

//! Entity normalizers.
//!
//! Every resource type goes through the same steps: filter, key
//! resolution, registration, projection, then reference resolution.
//! [`EntityNormalizer`] owns the shared steps; the per-type modules only
//! supply the projection.

pub mod globals;
pub mod notifications;
pub mod projects;
pub mod secrets;

use crate::core::config::MappingConfig;
use crate::core::context::{ExclusionReason, NormalizationContext};
use crate::core::error::AppError;
use crate::core::snapshot::{Identifiable, Includable};
use crate::core::types::{ErrorCategory, ResourceType};

/// Prefix of deferred reference tokens in the normalized document.
pub const LOOKUP_PREFIX: &str = "LOOKUP:";

pub fn lookup_token(identifier: &str) -> String {
    format!("{}{}", LOOKUP_PREFIX, identifier)
}

/// Output key handed to a projection.
///
/// For global entities both fields are equal. For project-scoped entities
/// `qualified` carries the project prefix used for collision tracking and
/// registration while `local` is what the record shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedKey {
    pub qualified: String,
    pub local: String,
}

pub struct EntityNormalizer<'a> {
    policy: &'a MappingConfig,
    ctx: &'a mut NormalizationContext,
}

impl<'a> EntityNormalizer<'a> {
    pub fn new(policy: &'a MappingConfig, ctx: &'a mut NormalizationContext) -> Self {
        EntityNormalizer { policy, ctx }
    }

    pub fn policy(&self) -> &MappingConfig {
        self.policy
    }

    pub fn context(&self) -> &NormalizationContext {
        self.ctx
    }

    /// Filter step. Records exactly one exclusion when the entity is rejected.
    pub fn admit<E: Identifiable + Includable>(
        &mut self,
        resource: ResourceType,
        key: &str,
        entity: &E,
    ) -> bool {
        match self.rejection(resource, key, entity) {
            Some(reason) => {
                self.ctx
                    .record_exclusion(resource, key, reason, entity.element_id());
                false
            }
            None => true,
        }
    }

    fn rejection<E: Identifiable + Includable>(
        &self,
        resource: ResourceType,
        key: &str,
        entity: &E,
    ) -> Option<ExclusionReason> {
        if self.policy.exclude_keys(resource).contains(key) {
            return Some(ExclusionReason::KeyFilter);
        }
        if let Some(element_id) = entity.element_id() {
            if self.policy.exclude_element_ids(resource).contains(element_id) {
                return Some(ExclusionReason::ElementIdFilter);
            }
        }
        let allow_list = self.policy.include_only_keys(resource);
        if !allow_list.is_empty() && !allow_list.contains(key) {
            return Some(ExclusionReason::NotInAllowList);
        }
        if !self.policy.include_inactive() && !entity.included() {
            return Some(ExclusionReason::Inactive);
        }
        None
    }

    /// Record an exclusion decided outside the filter step.
    pub fn exclude<E: Identifiable>(
        &mut self,
        resource: ResourceType,
        key: &str,
        reason: ExclusionReason,
        entity: &E,
    ) {
        self.ctx
            .record_exclusion(resource, key, reason, entity.element_id());
    }

    /// Key resolution and registration.
    ///
    /// `scope` is the owning project key for project-scoped entities.
    pub fn claim_key<E: Identifiable>(
        &mut self,
        resource: ResourceType,
        scope: Option<&str>,
        key: &str,
        entity: &E,
    ) -> Result<AssignedKey, AppError> {
        let assigned = match scope {
            None => {
                let resolved = self.ctx.resolve_collision(key, resource.namespace());
                AssignedKey {
                    qualified: resolved.clone(),
                    local: resolved,
                }
            }
            Some(project_key) => {
                let prefix = format!("{}_", project_key);
                let resolved = self
                    .ctx
                    .resolve_collision(&format!("{}{}", prefix, key), resource.namespace());
                let local = resolved
                    .strip_prefix(&prefix)
                    .unwrap_or(&resolved)
                    .to_string();
                AssignedKey {
                    qualified: resolved,
                    local,
                }
            }
        };
        self.ctx
            .register_element(entity.element_id(), &assigned.qualified)?;
        Ok(assigned)
    }

    /// Resolve a reference by element id, deferring it as a placeholder
    /// when the target is unknown in this run.
    pub fn resolve_or_defer(&mut self, element_id: &str, describe: impl FnOnce() -> String) -> String {
        if let Some(key) = self.ctx.resolve_reference(element_id) {
            return key.to_string();
        }
        self.defer(element_id, describe())
    }

    /// Emit a placeholder token for an identifier that cannot be resolved.
    pub fn defer(&mut self, identifier: &str, description: String) -> String {
        let token = lookup_token(identifier);
        self.ctx.add_placeholder(token.clone(), description);
        token
    }

    /// Source ids survive only when the policy keeps them.
    pub fn source_id<T>(&self, id: Option<T>) -> Option<T> {
        if self.policy.strip_source_ids() {
            None
        } else {
            id
        }
    }

    /// Run the shared steps over a keyed collection and project survivors.
    ///
    /// Returns `None` when the whole resource type is disabled; every entity
    /// is then recorded as excluded.
    pub fn normalize_each<'e, E, R, I, F>(
        &mut self,
        resource: ResourceType,
        scope: Option<&str>,
        entries: I,
        mut project: F,
    ) -> Result<Option<Vec<R>>, AppError>
    where
        E: Identifiable + Includable + 'e,
        I: IntoIterator<Item = (&'e str, &'e E)>,
        F: FnMut(&mut Self, AssignedKey, &'e E) -> Result<R, AppError>,
    {
        if !self.policy.is_resource_included(resource) {
            for (key, entity) in entries {
                self.exclude(resource, key, ExclusionReason::ResourceTypeDisabled, entity);
            }
            return Ok(None);
        }

        let mut records = Vec::new();
        for (key, entity) in entries {
            if !self.admit(resource, key, entity) {
                continue;
            }
            let assigned = self.claim_key(resource, scope, key, entity)?;
            records.push(project(self, assigned, entity)?);
        }
        tracing::debug!(
            resource = resource.namespace(),
            count = records.len(),
            "normalized resource type"
        );
        Ok(Some(records))
    }
}

/// Reject empty required fields.
pub(crate) fn require<'v>(
    value: &'v str,
    resource: ResourceType,
    key: &str,
    field: &str,
) -> Result<&'v str, AppError> {
    if value.trim().is_empty() {
        let mut err = AppError::new(
            ErrorCategory::ValidationError,
            format!(
                "{} '{}' is missing required field '{}'",
                resource.singular(),
                key,
                field
            ),
        )
        .with_code("NORM-FIELD-001");
        err.add_context("resource_type", resource.singular());
        err.add_context("field", field);
        return Err(err);
    }
    Ok(value)
}
