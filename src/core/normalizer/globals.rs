#![allow(clippy::result_large_err)]

//! Account-wide resource types.

use super::{require, secrets, EntityNormalizer};
use crate::core::document::{
    ConnectionRecord, GroupRecord, PrivateLinkRecord, RepositoryRecord, ServiceTokenRecord,
    WebhookRecord,
};
use crate::core::error::AppError;
use crate::core::snapshot::{
    Connection, Group, PrivateLinkEndpoint, Repository, ServiceToken, WebhookSubscription,
};
use crate::core::types::ResourceType;
use indexmap::IndexMap;
use serde_json::Value;

const UNKNOWN: &str = "unknown";

/// Repository metadata fields carried into the record when set.
const REPOSITORY_PROVIDER_FIELDS: &[&str] = &[
    "github_installation_id",
    "gitlab_project_id",
    "azure_active_directory_project_id",
    "azure_active_directory_repository_id",
];

pub fn normalize_privatelink_endpoints(
    normalizer: &mut EntityNormalizer<'_>,
    endpoints: &IndexMap<String, PrivateLinkEndpoint>,
) -> Result<Option<Vec<PrivateLinkRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::PrivatelinkEndpoints,
        None,
        endpoints.values().map(|e| (e.key.as_str(), e)),
        |_, key, endpoint| {
            let region = endpoint
                .metadata
                .get("region")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN);
            Ok(PrivateLinkRecord {
                key: key.local,
                name: endpoint.name.clone(),
                cloud: endpoint
                    .endpoint_type
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                region: region.to_string(),
                endpoint_id: endpoint.id.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            })
        },
    )
}

pub fn normalize_connections(
    normalizer: &mut EntityNormalizer<'_>,
    connections: &IndexMap<String, Connection>,
) -> Result<Option<Vec<ConnectionRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Connections,
        None,
        connections.values().map(|e| (e.key.as_str(), e)),
        |n, key, conn| {
            let name = conn.name.clone().unwrap_or_else(|| key.local.clone());
            let private_link_endpoint_key = conn
                .private_link_endpoint_key
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(|id| {
                    n.resolve_or_defer(id, || {
                        format!("PrivateLink endpoint for connection '{}'", key.local)
                    })
                });
            let details = if conn.details.is_empty() {
                None
            } else {
                Some(secrets::mask_details(
                    &conn.details,
                    n.policy().secret_handling(),
                ))
            };
            Ok(ConnectionRecord {
                name,
                connection_type: conn
                    .connection_type
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                id: n.source_id(conn.id),
                private_link_endpoint_key,
                details,
                key: key.local,
            })
        },
    )
}

pub fn normalize_repositories(
    normalizer: &mut EntityNormalizer<'_>,
    repositories: &IndexMap<String, Repository>,
) -> Result<Option<Vec<RepositoryRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Repositories,
        None,
        repositories.values().map(|e| (e.key.as_str(), e)),
        |n, key, repo| {
            let remote_url = require(&repo.remote_url, ResourceType::Repositories, &key.local, "remote_url")?;
            let provider_ids = REPOSITORY_PROVIDER_FIELDS
                .iter()
                .filter_map(|field| {
                    repo.metadata
                        .get(*field)
                        .filter(|value| !value.is_null())
                        .map(|value| (field.to_string(), value.clone()))
                })
                .collect();
            Ok(RepositoryRecord {
                remote_url: remote_url.to_string(),
                git_clone_strategy: repo.git_clone_strategy.clone(),
                provider_ids,
                id: n.source_id(repo.id),
                key: key.local,
            })
        },
    )
}

pub fn normalize_service_tokens(
    normalizer: &mut EntityNormalizer<'_>,
    tokens: &IndexMap<String, ServiceToken>,
) -> Result<Option<Vec<ServiceTokenRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::ServiceTokens,
        None,
        tokens.values().map(|e| (e.key.as_str(), e)),
        |n, key, token| {
            let name = require(&token.name, ResourceType::ServiceTokens, &key.local, "name")?;
            Ok(ServiceTokenRecord {
                name: name.to_string(),
                scopes: token.permission_sets.clone(),
                project_ids: n.source_id(Some(token.project_ids.clone())).unwrap_or_default(),
                id: n.source_id(token.id),
                key: key.local,
            })
        },
    )
}

pub fn normalize_groups(
    normalizer: &mut EntityNormalizer<'_>,
    groups: &IndexMap<String, Group>,
) -> Result<Option<Vec<GroupRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Groups,
        None,
        groups.values().map(|e| (e.key.as_str(), e)),
        |n, key, group| {
            let name = require(&group.name, ResourceType::Groups, &key.local, "name")?;
            Ok(GroupRecord {
                name: name.to_string(),
                // membership is not part of the snapshot
                members: Vec::new(),
                assign_by_default: group.assign_by_default,
                sso_mapping_groups: group.sso_mapping_groups.clone(),
                permission_sets: group.permission_sets.clone(),
                id: n.source_id(group.id),
                key: key.local,
            })
        },
    )
}

pub fn normalize_webhooks(
    normalizer: &mut EntityNormalizer<'_>,
    webhooks: &IndexMap<String, WebhookSubscription>,
) -> Result<Option<Vec<WebhookRecord>>, AppError> {
    normalizer.normalize_each(
        ResourceType::Webhooks,
        None,
        webhooks.values().map(|e| (e.key.as_str(), e)),
        |n, key, hook| {
            Ok(WebhookRecord {
                name: hook.name.clone(),
                client_url: hook.client_url.clone(),
                event_types: hook.event_types.clone(),
                job_ids: n.source_id(Some(hook.job_ids.clone())),
                id: n.source_id(hook.id.clone()),
                key: key.local,
            })
        },
    )
}
