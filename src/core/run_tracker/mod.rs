#![allow(clippy::result_large_err)]

use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use crate::core::types::ErrorCategory;
use crate::utils::serialization::{FileSerializer, FileUtils, JsonSerializer};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONTROL_FILE_NAME: &str = "normalization_runs.json";

/// Timestamp format used in artifact file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormRunInfo {
    pub norm_run_id: u32,
    /// `YYYYMMDD_HHMMSS`, used in artifact file names
    pub timestamp: String,
    pub account_id: i64,
    #[serde(default)]
    pub source_fetch_run_id: Option<u32>,
    pub started_at: DateTime<Utc>,
}

type ControlData = BTreeMap<String, Vec<NormRunInfo>>;

/// Sequential normalization run ids per account, kept in a JSON control file.
pub struct NormalizationRunTracker {
    control_file: PathBuf,
    reporter: Box<dyn ErrorReporter>,
}

impl NormalizationRunTracker {
    pub fn new(control_file: PathBuf) -> Self {
        NormalizationRunTracker {
            control_file,
            reporter: Box::new(DefaultErrorReporter),
        }
    }

    /// Tracker using the default control file inside `output_dir`.
    pub fn in_directory(output_dir: &Path) -> Self {
        Self::new(output_dir.join(CONTROL_FILE_NAME))
    }

    pub fn control_file(&self) -> &Path {
        &self.control_file
    }

    /// Where an unreadable control file is moved before numbering restarts.
    pub fn backup_file(&self) -> PathBuf {
        let mut name = self
            .control_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CONTROL_FILE_NAME.into());
        name.push(".bak");
        self.control_file.with_file_name(name)
    }

    /// Parsed control data; `None` when the file exists but cannot be parsed.
    fn read_control_data(&self) -> Option<ControlData> {
        if !self.control_file.exists() {
            return Some(ControlData::new());
        }
        match FileUtils.load_from_file(&self.control_file, &JsonSerializer) {
            Ok(data) => Some(data),
            Err(err) => {
                self.reporter.report_warning(
                    &format!(
                        "unreadable run control file {}",
                        self.control_file.display()
                    ),
                    Some(err.to_string()),
                );
                None
            }
        }
    }

    /// Move an unreadable control file aside so its history survives the restart.
    fn preserve_unreadable(&self) -> Result<(), AppError> {
        let backup = self.backup_file();
        std::fs::rename(&self.control_file, &backup).map_err(|err| {
            AppError::with_source(
                ErrorCategory::IoError,
                format!(
                    "Failed to move unreadable run control file {} aside: {}",
                    self.control_file.display(),
                    err
                ),
                Box::new(err),
            )
            .with_code("RUN-002")
        })?;
        self.reporter.report_warning(
            &format!("run numbering restarts; previous control file kept at {}", backup.display()),
            None,
        );
        Ok(())
    }

    /// Allocate the next run id for `account_id` and persist it.
    pub fn start_run(
        &self,
        account_id: i64,
        source_fetch_run_id: Option<u32>,
    ) -> Result<NormRunInfo, AppError> {
        let mut data = match self.read_control_data() {
            Some(data) => data,
            None => {
                self.preserve_unreadable()?;
                ControlData::new()
            }
        };
        let runs = data.entry(account_id.to_string()).or_default();
        let norm_run_id = runs.iter().map(|r| r.norm_run_id).max().unwrap_or(0) + 1;

        let started_at = Utc::now().trunc_subsecs(0);
        let info = NormRunInfo {
            norm_run_id,
            timestamp: started_at.format(FILE_TIMESTAMP_FORMAT).to_string(),
            account_id,
            source_fetch_run_id,
            started_at,
        };
        runs.push(info.clone());

        FileUtils
            .save_to_file(&self.control_file, &data, &JsonSerializer)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!(
                        "Failed to write run control file {}: {}",
                        self.control_file.display(),
                        err
                    ),
                )
                .with_code("RUN-001")
            })?;

        tracing::info!(account_id, norm_run_id, "started normalization run");
        Ok(info)
    }

    /// All recorded runs for an account, oldest first.
    pub fn runs_for(&self, account_id: i64) -> Vec<NormRunInfo> {
        self.read_control_data()
            .and_then(|mut data| data.remove(&account_id.to_string()))
            .unwrap_or_default()
    }
}
