#![allow(clippy::result_large_err)]

//! Projects and the entities they own.

use super::{require, secrets, EntityNormalizer};
use crate::core::config::{ScopeMode, SecretHandling};
use crate::core::context::ExclusionReason;
use crate::core::document::{
    CredentialRecord, EnvironmentRecord, EnvironmentVariableRecord, JobRecord, ProjectRecord,
};
use crate::core::error::AppError;
use crate::core::snapshot::{Environment, EnvironmentVariable, Job, Project};
use crate::core::types::ResourceType;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Job settings copied into the job record when present.
const JOB_SETTING_FIELDS: &[&str] = &[
    "schedule_type",
    "schedule_hours",
    "schedule_days",
    "schedule_cron",
    "num_threads",
    "timeout_seconds",
    "target_name",
    "dbt_version",
    "generate_docs",
    "run_lint",
    "run_generate_sources",
    "run_compare_changes",
];

pub fn normalize_projects(
    normalizer: &mut EntityNormalizer<'_>,
    projects: &[Project],
) -> Result<Vec<ProjectRecord>, AppError> {
    let mut records = Vec::new();
    let type_included = normalizer.policy().is_resource_included(ResourceType::Projects);

    for project in projects {
        let skipped = match normalizer.policy().scope_mode() {
            ScopeMode::AccountLevelOnly => Some(ExclusionReason::AccountLevelOnly),
            _ if !type_included => Some(ExclusionReason::ResourceTypeDisabled),
            _ if !in_scope(normalizer, project) => Some(ExclusionReason::NotInScope),
            _ => None,
        };
        if let Some(reason) = skipped {
            normalizer.exclude(ResourceType::Projects, &project.key, reason, project);
            exclude_children(normalizer, project);
            continue;
        }
        if !normalizer.admit(ResourceType::Projects, &project.key, project) {
            exclude_children(normalizer, project);
            continue;
        }
        records.push(normalize_project(normalizer, project)?);
    }

    Ok(records)
}

fn in_scope(normalizer: &EntityNormalizer<'_>, project: &Project) -> bool {
    let policy = normalizer.policy();
    match policy.scope_mode() {
        ScopeMode::AllProjects => true,
        ScopeMode::SpecificProjects => {
            policy.project_keys().contains(&project.key)
                || project
                    .id
                    .map(|id| policy.project_ids().contains(&id))
                    .unwrap_or(false)
        }
        ScopeMode::AccountLevelOnly => false,
    }
}

/// One exclusion per environment, job and variable of a skipped project.
fn exclude_children(normalizer: &mut EntityNormalizer<'_>, project: &Project) {
    let reason = ExclusionReason::ParentProjectExcluded;
    for env in &project.environments {
        normalizer.exclude(ResourceType::Environments, &env.key, reason, env);
    }
    for job in &project.jobs {
        normalizer.exclude(ResourceType::Jobs, &job.key, reason, job);
    }
    for var in &project.environment_variables {
        normalizer.exclude(ResourceType::EnvironmentVariables, &var.name, reason, var);
    }
}

fn normalize_project(
    normalizer: &mut EntityNormalizer<'_>,
    project: &Project,
) -> Result<ProjectRecord, AppError> {
    // registered before children so they can refer back to it
    let key = normalizer.claim_key(ResourceType::Projects, None, &project.key, project)?;
    let name = require(&project.name, ResourceType::Projects, &key.local, "name")?;

    let repository = project
        .repository_key
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(|id| {
            normalizer.resolve_or_defer(id, || format!("Repository for project '{}'", key.local))
        });

    let mut environment_keys = HashMap::new();
    let environments =
        normalize_environments(normalizer, &key.local, &project.environments, &mut environment_keys)?;
    let jobs = normalize_jobs(normalizer, &key.local, &project.jobs, &environment_keys)?;
    let environment_variables =
        normalize_environment_variables(normalizer, &key.local, &project.environment_variables)?;

    Ok(ProjectRecord {
        name: name.to_string(),
        repository,
        environments,
        jobs,
        environment_variables,
        id: normalizer.source_id(project.id),
        key: key.local,
    })
}

/// `environment_keys` receives source key -> emitted key for job lookups.
fn normalize_environments<'p>(
    normalizer: &mut EntityNormalizer<'_>,
    project_key: &str,
    environments: &'p [Environment],
    environment_keys: &mut HashMap<&'p str, String>,
) -> Result<Option<Vec<EnvironmentRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Environments,
        Some(project_key),
        environments.iter().map(|env| (env.key.as_str(), env)),
        |n, key, env| {
            let name = require(&env.name, ResourceType::Environments, &key.local, "name")?;
            let connection = env
                .connection_key
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(|id| {
                    n.resolve_or_defer(id, || {
                        format!("Connection for environment '{}/{}'", project_key, key.local)
                    })
                });
            let credential = env.credential.as_ref().map(|cred| CredentialRecord {
                token_name: cred.token_name.clone(),
                schema: cred.schema.clone(),
                catalog: cred.catalog.clone(),
            });
            // first environment claiming a source key owns it
            environment_keys
                .entry(env.key.as_str())
                .or_insert_with(|| key.local.clone());
            Ok(EnvironmentRecord {
                name: name.to_string(),
                environment_type: env.environment_type.clone(),
                connection,
                credential,
                dbt_version: env.dbt_version.clone(),
                custom_branch: env.custom_branch.clone(),
                enable_model_query_history: env.enable_model_query_history,
                id: n.source_id(env.id),
                key: key.local,
            })
        },
    )
}

fn normalize_jobs(
    normalizer: &mut EntityNormalizer<'_>,
    project_key: &str,
    jobs: &[Job],
    environment_keys: &HashMap<&str, String>,
) -> Result<Option<Vec<JobRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Jobs,
        Some(project_key),
        jobs.iter().map(|job| (job.key.as_str(), job)),
        |n, key, job| {
            let name = require(&job.name, ResourceType::Jobs, &key.local, "name")?;
            let environment_key = match environment_keys.get(job.environment_key.as_str()) {
                Some(resolved) => resolved.clone(),
                None => n.defer(
                    &job.environment_key,
                    format!(
                        "Environment '{}' for job '{}/{}'",
                        job.environment_key, project_key, key.local
                    ),
                ),
            };
            let settings: IndexMap<_, _> = JOB_SETTING_FIELDS
                .iter()
                .filter_map(|field| {
                    job.settings
                        .get(*field)
                        .filter(|value| !value.is_null())
                        .map(|value| (field.to_string(), value.clone()))
                })
                .collect();
            Ok(JobRecord {
                name: name.to_string(),
                environment_key,
                execute_steps: job.execute_steps.clone(),
                triggers: job.triggers.clone(),
                settings,
                id: n.source_id(job.id),
                key: key.local,
            })
        },
    )
}

fn normalize_environment_variables(
    normalizer: &mut EntityNormalizer<'_>,
    project_key: &str,
    variables: &[EnvironmentVariable],
) -> Result<Option<Vec<EnvironmentVariableRecord>>, AppError> {
    let handling = normalizer.policy().secret_handling();
    let type_included = normalizer
        .policy()
        .is_resource_included(ResourceType::EnvironmentVariables);

    let mut candidates = Vec::with_capacity(variables.len());
    for var in variables {
        if type_included && handling == SecretHandling::Omit && secrets::is_secret_variable(&var.name) {
            // filters decide first; admit records their reason on rejection
            if normalizer.admit(ResourceType::EnvironmentVariables, &var.name, var) {
                normalizer.exclude(
                    ResourceType::EnvironmentVariables,
                    &var.name,
                    ExclusionReason::SecretOmitted,
                    var,
                );
            }
            continue;
        }
        candidates.push((var.name.as_str(), var));
    }

    normalizer.normalize_each(
        ResourceType::EnvironmentVariables,
        Some(project_key),
        candidates,
        |_, key, var| {
            require(&var.name, ResourceType::EnvironmentVariables, &key.local, "name")?;
            let secret = secrets::is_secret_variable(&var.name);
            let value_of = |value: &String| -> String {
                if secret {
                    secrets::mask(handling, &var.name).unwrap_or_default()
                } else {
                    value.clone()
                }
            };
            Ok(EnvironmentVariableRecord {
                project_default: var.project_default.as_ref().map(value_of),
                environment_values: var
                    .environment_values
                    .iter()
                    .map(|(env_name, value)| (env_name.clone(), value_of(value)))
                    .collect(),
                name: key.local,
            })
        },
    )
}
