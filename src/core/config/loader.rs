#![allow(clippy::result_large_err)]

use super::{ConfigValidator, MappingConfig, ScopeMode, SecretHandling};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the mapping config used for one run.
    ///
    /// Without a path the built-in defaults are used. Environment variables
    /// override file values, and the result is validated before it is
    /// returned, so a malformed policy never reaches the normalizer.
    pub fn load(path: Option<&Path>) -> Result<MappingConfig, AppError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => MappingConfig::default(),
        };
        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Parse a mapping config file without applying overrides.
    pub fn load_from_file(path: &Path) -> Result<MappingConfig, AppError> {
        if !path.exists() {
            return Err(AppError::new(
                ErrorCategory::ConfigurationError,
                format!("mapping config {} does not exist", path.display()),
            )
            .with_code("CFG-LOAD-001"));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read mapping config {}: {}", path.display(), e),
            )
            .with_code("CFG-LOAD-001")
        })?;

        Self::parse(&content).map_err(|mut err| {
            err.add_context("path", &path.display().to_string());
            err
        })
    }

    /// Parse a mapping config from YAML text.
    pub fn parse(content: &str) -> Result<MappingConfig, AppError> {
        serde_yaml::from_str(content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse mapping config: {}", e),
            )
            .with_code("CFG-LOAD-002")
        })
    }

    /// Apply environment variable overrides to the configuration.
    /// Unparseable values are rejected instead of ignored.
    fn apply_env_overrides(config: &mut MappingConfig) -> Result<(), AppError> {
        if let Ok(mode) = env::var("ACCOUNT_NORMALIZER_SCOPE_MODE") {
            config.scope.mode = mode.parse::<ScopeMode>().map_err(override_error)?;
        }

        if let Ok(handling) = env::var("ACCOUNT_NORMALIZER_SECRET_HANDLING") {
            config.normalization_options.secret_handling =
                handling.parse::<SecretHandling>().map_err(override_error)?;
        }

        if let Ok(strip) = env::var("ACCOUNT_NORMALIZER_STRIP_SOURCE_IDS") {
            config.normalization_options.strip_source_ids =
                parse_bool("ACCOUNT_NORMALIZER_STRIP_SOURCE_IDS", &strip)?;
        }

        if let Ok(inactive) = env::var("ACCOUNT_NORMALIZER_INCLUDE_INACTIVE") {
            config.normalization_options.include_inactive =
                parse_bool("ACCOUNT_NORMALIZER_INCLUDE_INACTIVE", &inactive)?;
        }

        if let Ok(dir) = env::var("ACCOUNT_NORMALIZER_OUTPUT_DIR") {
            config.output.output_directory = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "ACCOUNT_NORMALIZER_SCOPE_MODE - Override scope.mode (all_projects/specific_projects/account_level_only)",
            "ACCOUNT_NORMALIZER_SECRET_HANDLING - Override secret handling (redact/placeholder/omit)",
            "ACCOUNT_NORMALIZER_STRIP_SOURCE_IDS - Override strip_source_ids (true/false)",
            "ACCOUNT_NORMALIZER_INCLUDE_INACTIVE - Override include_inactive (true/false)",
            "ACCOUNT_NORMALIZER_OUTPUT_DIR - Override output.output_directory",
        ]
    }
}

fn override_error(message: String) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code("CFG-ENV-001")
}

fn parse_bool(name: &str, value: &str) -> Result<bool, AppError> {
    value.trim().parse::<bool>().map_err(|_| {
        override_error(format!("{} must be true or false, got '{}'", name, value))
    })
}
