//! Mapping configuration (the normalization policy).
//!
//! The document is loaded once per run and is read-only afterwards; every
//! accessor is total and falls back to the documented default when a
//! section or a resource type is absent.

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

use crate::core::types::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

static EMPTY_SET: BTreeSet<String> = BTreeSet::new();

/// Mapping configuration loaded from `importer_mapping.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Schema version of the mapping document
    #[serde(default = "default_version")]
    pub version: u32,

    /// Which projects participate in the run
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Per resource type filters
    #[serde(default)]
    pub resource_filters: BTreeMap<ResourceType, ResourceFilter>,

    /// Normalization switches
    #[serde(default)]
    pub normalization_options: NormalizationOptions,

    /// Artifact output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Project scope selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScopeConfig {
    #[serde(default)]
    pub mode: ScopeMode,
    #[serde(default)]
    pub project_keys: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    #[default]
    AllProjects,
    SpecificProjects,
    AccountLevelOnly,
}

/// Filter block for a single resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// Type-level on/off switch
    #[serde(default = "default_true")]
    pub include: bool,
    #[serde(default)]
    pub exclude_keys: BTreeSet<String>,
    /// Element mapping ids to drop
    #[serde(default, alias = "exclude_element_ids")]
    pub exclude_ids: BTreeSet<String>,
    /// Allow-list; when non-empty every other key is excluded
    #[serde(default)]
    pub include_only_keys: BTreeSet<String>,
}

impl Default for ResourceFilter {
    fn default() -> Self {
        ResourceFilter {
            include: true,
            exclude_keys: BTreeSet::new(),
            exclude_ids: BTreeSet::new(),
            include_only_keys: BTreeSet::new(),
        }
    }
}

/// How secret values are written to the normalized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecretHandling {
    /// Replace the value with the fixed `REDACTED` sentinel
    #[default]
    Redact,
    /// Replace the value with a `${var.<name>}` template token
    Placeholder,
    /// Drop the value (and its field) entirely
    Omit,
}

impl FromStr for SecretHandling {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "redact" => Ok(SecretHandling::Redact),
            "placeholder" => Ok(SecretHandling::Placeholder),
            "omit" => Ok(SecretHandling::Omit),
            _ => Err(format!(
                "invalid secret_handling '{}'; supported values are redact, placeholder, omit",
                value
            )),
        }
    }
}

impl FromStr for ScopeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all_projects" => Ok(ScopeMode::AllProjects),
            "specific_projects" => Ok(ScopeMode::SpecificProjects),
            "account_level_only" => Ok(ScopeMode::AccountLevelOnly),
            _ => Err(format!(
                "invalid scope mode '{}'; supported values are all_projects, specific_projects, account_level_only",
                value
            )),
        }
    }
}

/// Naming collision strategy.
///
/// Only `suffix` has defined behavior. Other names that show up in mapping
/// files are reserved and rejected when the configuration is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum CollisionStrategy {
    #[default]
    Suffix,
}

impl TryFrom<String> for CollisionStrategy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "suffix" => Ok(CollisionStrategy::Suffix),
            other => Err(format!(
                "name_collision_strategy '{}' is reserved and not implemented; supported values are: suffix",
                other
            )),
        }
    }
}

impl From<CollisionStrategy> for String {
    fn from(value: CollisionStrategy) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CollisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionStrategy::Suffix => write!(f, "suffix"),
        }
    }
}

/// Normalization switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationOptions {
    #[serde(default = "default_true")]
    pub strip_source_ids: bool,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub secret_handling: SecretHandling,
    #[serde(default)]
    pub name_collision_strategy: CollisionStrategy,
    #[serde(default)]
    pub yaml_style: YamlStyle,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        NormalizationOptions {
            strip_source_ids: true,
            include_inactive: false,
            secret_handling: SecretHandling::default(),
            name_collision_strategy: CollisionStrategy::default(),
            yaml_style: YamlStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct YamlStyle {
    /// Sort mapping keys alphabetically in the YAML artifact
    #[serde(default)]
    pub sort_keys: bool,
}

/// Artifact output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default)]
    pub generate_manifests: ManifestToggles,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            output_directory: default_output_directory(),
            generate_manifests: ManifestToggles::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestToggles {
    #[serde(default = "default_true")]
    pub lookups: bool,
    #[serde(default = "default_true")]
    pub exclusions: bool,
    #[serde(default = "default_true")]
    pub diff_json: bool,
}

impl Default for ManifestToggles {
    fn default() -> Self {
        ManifestToggles {
            lookups: true,
            exclusions: true,
            diff_json: true,
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("normalized")
}

impl Default for MappingConfig {
    fn default() -> Self {
        MappingConfig {
            version: default_version(),
            scope: ScopeConfig::default(),
            resource_filters: BTreeMap::new(),
            normalization_options: NormalizationOptions::default(),
            output: OutputConfig::default(),
        }
    }
}

impl MappingConfig {
    pub fn scope_mode(&self) -> ScopeMode {
        self.scope.mode
    }

    pub fn project_keys(&self) -> &[String] {
        &self.scope.project_keys
    }

    pub fn project_ids(&self) -> &[i64] {
        &self.scope.project_ids
    }

    fn filter(&self, resource: ResourceType) -> Option<&ResourceFilter> {
        self.resource_filters.get(&resource)
    }

    /// Type-level gate; types without a filter block are included.
    pub fn is_resource_included(&self, resource: ResourceType) -> bool {
        self.filter(resource).map(|f| f.include).unwrap_or(true)
    }

    pub fn exclude_keys(&self, resource: ResourceType) -> &BTreeSet<String> {
        self.filter(resource)
            .map(|f| &f.exclude_keys)
            .unwrap_or(&EMPTY_SET)
    }

    pub fn exclude_element_ids(&self, resource: ResourceType) -> &BTreeSet<String> {
        self.filter(resource)
            .map(|f| &f.exclude_ids)
            .unwrap_or(&EMPTY_SET)
    }

    /// Allow-list of keys; empty means "everything".
    pub fn include_only_keys(&self, resource: ResourceType) -> &BTreeSet<String> {
        self.filter(resource)
            .map(|f| &f.include_only_keys)
            .unwrap_or(&EMPTY_SET)
    }

    /// Defaults to `true`: source ids are dropped from the output.
    pub fn strip_source_ids(&self) -> bool {
        self.normalization_options.strip_source_ids
    }

    /// Defaults to `false`: inactive or soft-deleted entities are excluded.
    pub fn include_inactive(&self) -> bool {
        self.normalization_options.include_inactive
    }

    /// Defaults to [`SecretHandling::Redact`].
    pub fn secret_handling(&self) -> SecretHandling {
        self.normalization_options.secret_handling
    }

    /// Defaults to [`CollisionStrategy::Suffix`].
    pub fn collision_strategy(&self) -> CollisionStrategy {
        self.normalization_options.name_collision_strategy
    }

    pub fn sort_keys(&self) -> bool {
        self.normalization_options.yaml_style.sort_keys
    }

    pub fn output_directory(&self) -> &Path {
        &self.output.output_directory
    }

    pub fn generate_lookups_manifest(&self) -> bool {
        self.output.generate_manifests.lookups
    }

    pub fn generate_exclusions_report(&self) -> bool {
        self.output.generate_manifests.exclusions
    }

    pub fn generate_diff_json(&self) -> bool {
        self.output.generate_manifests.diff_json
    }
}
