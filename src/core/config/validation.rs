#![allow(clippy::result_large_err)]

use super::{MappingConfig, ScopeMode};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

const SUPPORTED_VERSION: u32 = 1;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &MappingConfig) -> Result<(), AppError> {
        if config.version != SUPPORTED_VERSION {
            return Err(AppError::new(
                ErrorCategory::ConfigurationError,
                format!(
                    "unsupported mapping config version {} (expected {})",
                    config.version, SUPPORTED_VERSION
                ),
            )
            .with_code("CFG-VAL-001"));
        }

        if config.scope.mode == ScopeMode::SpecificProjects
            && config.scope.project_keys.is_empty()
            && config.scope.project_ids.is_empty()
        {
            return Err(AppError::new(
                ErrorCategory::ConfigurationError,
                "scope.mode specific_projects requires scope.project_keys or scope.project_ids",
            )
            .with_code("CFG-VAL-002"));
        }

        if config.output.output_directory.as_os_str().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ConfigurationError,
                "output.output_directory cannot be empty",
            )
            .with_code("CFG-VAL-003"));
        }

        Ok(())
    }
}
