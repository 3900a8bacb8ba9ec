//! Typed records of the normalized (v2) account document.
//!
//! Optional sections and fields are skipped when absent so that "not
//! present" and "present but empty" stay distinguishable in the output.

use crate::core::context::Placeholder;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Schema version of the normalized document.
pub const SCHEMA_VERSION: u32 = 2;

pub const DEFAULT_HOST_URL: &str = "https://cloud.getdbt.com";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDocument {
    pub version: u32,
    pub account: AccountRecord,
    pub globals: GlobalsRecord,
    pub projects: Vec<ProjectRecord>,
    /// Only present when at least one placeholder was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub name: String,
    pub host_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Global resource arrays; a disabled resource type has no array at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<ConnectionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<RepositoryRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privatelink_endpoints: Option<Vec<PrivateLinkRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tokens: Option<Vec<ServiceTokenRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<NotificationRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhooks: Option<Vec<WebhookRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionRecord {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link_endpoint_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryRecord {
    pub key: String,
    pub remote_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_clone_strategy: Option<String>,
    /// Provider specific identifiers carried over from repository metadata
    #[serde(flatten)]
    pub provider_ids: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrivateLinkRecord {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cloud: String,
    pub region: String,
    pub endpoint_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceTokenRecord {
    pub key: String,
    pub name: String,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub key: String,
    pub name: String,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_by_default: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sso_mapping_groups: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permission_sets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Notification channel, derived once from which target fields are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Email,
    Slack,
    Webhook,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub target: NotificationTarget,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on_cancel: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookRecord {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_url: Option<String>,
    pub event_types: Vec<String>,
    /// Source job ids; only kept together with source ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<EnvironmentRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Vec<EnvironmentVariableRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialRecord {
    pub token_name: String,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentRecord {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbt_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_model_query_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub key: String,
    pub name: String,
    pub environment_key: String,
    pub execute_steps: Vec<String>,
    pub triggers: IndexMap<String, Value>,
    /// Schedule and run settings copied from the source job
    #[serde(flatten)]
    pub settings: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentVariableRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_default: Option<String>,
    pub environment_values: IndexMap<String, String>,
}

impl NormalizedDocument {
    /// Every string in the document that is a deferred `LOOKUP:` reference.
    pub fn lookup_tokens<'a>(&'a self) -> Vec<&'a str> {
        let mut tokens = Vec::new();
        let mut push = |value: Option<&'a String>| {
            if let Some(value) = value {
                if value.starts_with(crate::core::normalizer::LOOKUP_PREFIX) {
                    tokens.push(value.as_str());
                }
            }
        };
        for conn in self.globals.connections.iter().flatten() {
            push(conn.private_link_endpoint_key.as_ref());
        }
        for project in &self.projects {
            push(project.repository.as_ref());
            for env in project.environments.iter().flatten() {
                push(env.connection.as_ref());
            }
            for job in project.jobs.iter().flatten() {
                push(Some(&job.environment_key));
            }
        }
        tokens
    }
}
