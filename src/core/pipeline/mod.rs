#![allow(clippy::result_large_err)]

//! Pipeline orchestration for one normalization run.
//!
//! Phases only move forward:
//! `Init -> NormalizeGlobals -> NormalizeProjects -> Finalize -> Done`.
//! Globals complete before any project is visited so that project
//! references can resolve against registered global elements.

use crate::core::config::MappingConfig;
use crate::core::context::{CollisionRecord, NormalizationContext};
use crate::core::document::{
    AccountRecord, DocumentMetadata, GlobalsRecord, NormalizedDocument, DEFAULT_HOST_URL,
    SCHEMA_VERSION,
};
use crate::core::error::AppError;
use crate::core::normalizer::{globals, notifications, projects, EntityNormalizer};
use crate::core::snapshot::AccountSnapshot;
use crate::core::types::ErrorCategory;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelinePhase {
    Init,
    NormalizeGlobals,
    NormalizeProjects,
    Finalize,
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Init => "init",
            PipelinePhase::NormalizeGlobals => "normalize_globals",
            PipelinePhase::NormalizeProjects => "normalize_projects",
            PipelinePhase::Finalize => "finalize",
            PipelinePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Single-use driver for one run.
pub struct NormalizationPipeline<'a> {
    policy: &'a MappingConfig,
    phase: PipelinePhase,
}

impl<'a> NormalizationPipeline<'a> {
    pub fn new(policy: &'a MappingConfig) -> Self {
        NormalizationPipeline {
            policy,
            phase: PipelinePhase::Init,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    fn advance(&mut self, next: PipelinePhase) {
        tracing::debug!(from = %self.phase, to = %next, "pipeline phase");
        self.phase = next;
    }

    /// Normalize `snapshot` into a document, mutating `ctx` along the way.
    ///
    /// Any error aborts the run; no partial document is returned.
    pub fn run(
        &mut self,
        snapshot: &AccountSnapshot,
        ctx: &mut NormalizationContext,
    ) -> Result<NormalizedDocument, AppError> {
        if self.phase != PipelinePhase::Init {
            return Err(AppError::new(
                ErrorCategory::InternalError,
                format!("pipeline already ran (phase {})", self.phase),
            )
            .with_code("NORM-PIPE-001"));
        }

        tracing::info!(
            account_id = snapshot.account_id,
            projects = snapshot.projects.len(),
            "starting normalization"
        );

        let account = AccountRecord {
            name: snapshot
                .account_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Account {}", snapshot.account_id)),
            host_url: snapshot
                .host_url
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST_URL.to_string()),
            id: (!self.policy.strip_source_ids()).then_some(snapshot.account_id),
        };

        let mut normalizer = EntityNormalizer::new(self.policy, ctx);

        self.advance(PipelinePhase::NormalizeGlobals);
        let source = &snapshot.globals;
        // privatelink first: connections refer to endpoints
        let privatelink_endpoints =
            globals::normalize_privatelink_endpoints(&mut normalizer, &source.privatelink_endpoints)?;
        let connections = globals::normalize_connections(&mut normalizer, &source.connections)?;
        let repositories = globals::normalize_repositories(&mut normalizer, &source.repositories)?;
        let service_tokens =
            globals::normalize_service_tokens(&mut normalizer, &source.service_tokens)?;
        let groups = globals::normalize_groups(&mut normalizer, &source.groups)?;
        let notifications =
            notifications::normalize_notifications(&mut normalizer, &source.notifications)?;
        let webhooks = globals::normalize_webhooks(&mut normalizer, &source.webhooks)?;
        let globals = GlobalsRecord {
            connections,
            repositories,
            privatelink_endpoints,
            service_tokens,
            groups,
            notifications,
            webhooks,
        };

        self.advance(PipelinePhase::NormalizeProjects);
        let projects = projects::normalize_projects(&mut normalizer, &snapshot.projects)?;

        self.advance(PipelinePhase::Finalize);
        let metadata = ctx.has_placeholders().then(|| DocumentMetadata {
            placeholders: ctx.placeholders().to_vec(),
        });

        self.advance(PipelinePhase::Done);
        tracing::info!(
            projects = projects.len(),
            placeholders = ctx.placeholders().len(),
            exclusions = ctx.exclusions().len(),
            "normalization complete"
        );

        Ok(NormalizedDocument {
            version: SCHEMA_VERSION,
            account,
            globals,
            projects,
            metadata,
        })
    }
}

/// Normalize with an explicitly supplied context.
pub fn normalize_snapshot(
    snapshot: &AccountSnapshot,
    policy: &MappingConfig,
    ctx: &mut NormalizationContext,
) -> Result<NormalizedDocument, AppError> {
    NormalizationPipeline::new(policy).run(snapshot, ctx)
}

/// Document plus the run context it was produced with.
#[derive(Debug)]
pub struct NormalizationOutcome {
    pub document: NormalizedDocument,
    pub context: NormalizationContext,
}

/// Counts printed after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub account_id: i64,
    pub projects: usize,
    pub placeholders: usize,
    pub exclusions: usize,
    pub collisions: Vec<CollisionRecord>,
}

impl NormalizationOutcome {
    pub fn summary(&self, account_id: i64) -> RunSummary {
        RunSummary {
            account_id,
            projects: self.document.projects.len(),
            placeholders: self.context.placeholders().len(),
            exclusions: self.context.exclusions().len(),
            collisions: self.context.collision_summary(),
        }
    }
}

/// Run with a freshly constructed context.
pub fn run_normalization(
    snapshot: &AccountSnapshot,
    policy: &MappingConfig,
) -> Result<NormalizationOutcome, AppError> {
    let mut context = NormalizationContext::for_policy(policy);
    let document = normalize_snapshot(snapshot, policy, &mut context)?;
    Ok(NormalizationOutcome { document, context })
}
