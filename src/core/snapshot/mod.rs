//! In-memory account snapshot produced by the fetcher.
//!
//! The snapshot is immutable during a run. Global collections are kept in
//! insertion order so traversal order always equals document order.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// State value the source API uses for deactivated tokens and notifications.
const STATE_INACTIVE: i64 = 2;

/// Access to an entity's opaque element mapping id.
pub trait Identifiable {
    fn element_id(&self) -> Option<&str>;
}

/// Whether an entity is active / flagged for conversion.
pub trait Includable {
    fn included(&self) -> bool;
}

fn default_true() -> bool {
    true
}

macro_rules! flagged_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Identifiable for $ty {
                fn element_id(&self) -> Option<&str> {
                    self.element_id.as_deref()
                }
            }

            impl Includable for $ty {
                fn included(&self) -> bool {
                    self.include_in_conversion
                }
            }
        )+
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub details: IndexMap<String, Value>,
    /// Element id of the PrivateLink endpoint this connection routes through
    #[serde(default)]
    pub private_link_endpoint_key: Option<String>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub remote_url: String,
    #[serde(default)]
    pub git_clone_strategy: Option<String>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceToken {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub permission_sets: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<i64>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub assign_by_default: Option<bool>,
    #[serde(default)]
    pub sso_mapping_groups: Vec<String>,
    #[serde(default)]
    pub permission_sets: Vec<String>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub slack_channel_name: Option<String>,
    #[serde(default)]
    pub slack_channel_id: Option<String>,
    #[serde(default)]
    pub external_email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub on_success: Vec<i64>,
    #[serde(default)]
    pub on_failure: Vec<i64>,
    #[serde(default)]
    pub on_cancel: Vec<i64>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub key: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub client_url: Option<String>,
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub job_ids: Vec<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateLinkEndpoint {
    pub key: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Cloud flavour, e.g. `snowflake` or `databricks`
    #[serde(default, rename = "type")]
    pub endpoint_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub cidr_range: Option<String>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token_name: String,
    pub schema: String,
    #[serde(default)]
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: String,
    /// Element id of the connection used by this environment
    #[serde(default)]
    pub connection_key: Option<String>,
    #[serde(default)]
    pub credential: Option<Credential>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub custom_branch: Option<String>,
    #[serde(default)]
    pub enable_model_query_history: Option<bool>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    /// Local key of the environment (within the owning project)
    pub environment_key: String,
    #[serde(default)]
    pub execute_steps: Vec<String>,
    #[serde(default)]
    pub triggers: IndexMap<String, Value>,
    #[serde(default)]
    pub settings: IndexMap<String, Value>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    #[serde(default)]
    pub project_default: Option<String>,
    /// Values keyed by environment name
    #[serde(default)]
    pub environment_values: IndexMap<String, String>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    /// Element id of the repository backing the project
    #[serde(default)]
    pub repository_key: Option<String>,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default, rename = "element_mapping_id")]
    pub element_id: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_conversion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Globals {
    #[serde(default)]
    pub connections: IndexMap<String, Connection>,
    #[serde(default)]
    pub repositories: IndexMap<String, Repository>,
    #[serde(default)]
    pub service_tokens: IndexMap<String, ServiceToken>,
    #[serde(default)]
    pub groups: IndexMap<String, Group>,
    #[serde(default)]
    pub notifications: IndexMap<String, Notification>,
    #[serde(default)]
    pub webhooks: IndexMap<String, WebhookSubscription>,
    #[serde(default)]
    pub privatelink_endpoints: IndexMap<String, PrivateLinkEndpoint>,
}

/// Root of the fetched account snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: i64,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub host_url: Option<String>,
    #[serde(default)]
    pub globals: Globals,
    #[serde(default)]
    pub projects: Vec<Project>,
}

flagged_entity!(
    Connection,
    Repository,
    Group,
    PrivateLinkEndpoint,
    Environment,
    Job,
    EnvironmentVariable,
    Project,
);

impl Identifiable for ServiceToken {
    fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }
}

impl Includable for ServiceToken {
    fn included(&self) -> bool {
        self.include_in_conversion && self.state != Some(STATE_INACTIVE)
    }
}

impl Identifiable for Notification {
    fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }
}

impl Includable for Notification {
    fn included(&self) -> bool {
        self.include_in_conversion && self.state != Some(STATE_INACTIVE)
    }
}

impl Identifiable for WebhookSubscription {
    fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }
}

impl Includable for WebhookSubscription {
    fn included(&self) -> bool {
        self.include_in_conversion && self.active
    }
}

/// Failures while reading a snapshot from disk.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        let (category, code) = match err {
            SnapshotError::Read { .. } => (ErrorCategory::IoError, "SNAP-001"),
            SnapshotError::Parse { .. } => (ErrorCategory::ValidationError, "SNAP-002"),
        };
        let message = err.to_string();
        AppError::with_source(category, message, Box::new(err)).with_code(code)
    }
}

impl AccountSnapshot {
    /// Read a snapshot JSON document written by the fetcher.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of project-scoped entities (environments, jobs, variables).
    pub fn project_entity_count(&self) -> usize {
        self.projects
            .iter()
            .map(|p| p.environments.len() + p.jobs.len() + p.environment_variables.len())
            .sum()
    }
}
