use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    ConfigurationError,
    IntegrityError,
    SerializationError,
    IoError,
    InternalError,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}

/// Every resource type the normalizer knows about.
///
/// The snake_case plural form doubles as the collision namespace and as the
/// key used in `resource_filters` of the mapping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Connections,
    Repositories,
    PrivatelinkEndpoints,
    ServiceTokens,
    Groups,
    Notifications,
    Webhooks,
    Projects,
    Environments,
    Jobs,
    EnvironmentVariables,
}

impl ResourceType {
    pub const ALL: [ResourceType; 11] = [
        ResourceType::Connections,
        ResourceType::Repositories,
        ResourceType::PrivatelinkEndpoints,
        ResourceType::ServiceTokens,
        ResourceType::Groups,
        ResourceType::Notifications,
        ResourceType::Webhooks,
        ResourceType::Projects,
        ResourceType::Environments,
        ResourceType::Jobs,
        ResourceType::EnvironmentVariables,
    ];

    /// Collision namespace (and configuration key) for this type.
    pub fn namespace(self) -> &'static str {
        match self {
            ResourceType::Connections => "connections",
            ResourceType::Repositories => "repositories",
            ResourceType::PrivatelinkEndpoints => "privatelink_endpoints",
            ResourceType::ServiceTokens => "service_tokens",
            ResourceType::Groups => "groups",
            ResourceType::Notifications => "notifications",
            ResourceType::Webhooks => "webhooks",
            ResourceType::Projects => "projects",
            ResourceType::Environments => "environments",
            ResourceType::Jobs => "jobs",
            ResourceType::EnvironmentVariables => "environment_variables",
        }
    }

    /// Singular label used in exclusion entries.
    pub fn singular(self) -> &'static str {
        match self {
            ResourceType::Connections => "connection",
            ResourceType::Repositories => "repository",
            ResourceType::PrivatelinkEndpoints => "privatelink_endpoint",
            ResourceType::ServiceTokens => "service_token",
            ResourceType::Groups => "group",
            ResourceType::Notifications => "notification",
            ResourceType::Webhooks => "webhook",
            ResourceType::Projects => "project",
            ResourceType::Environments => "environment",
            ResourceType::Jobs => "job",
            ResourceType::EnvironmentVariables => "environment_variable",
        }
    }

    /// Whether the type lives inside a project rather than at account level.
    pub fn is_project_scoped(self) -> bool {
        matches!(
            self,
            ResourceType::Environments | ResourceType::Jobs | ResourceType::EnvironmentVariables
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}
