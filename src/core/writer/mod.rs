#![allow(clippy::result_large_err)]

//! Artifact writer: the normalized YAML plus its companion reports.

use crate::core::config::MappingConfig;
use crate::core::context::{Exclusion, NormalizationContext};
use crate::core::document::NormalizedDocument;
use crate::core::error::AppError;
use crate::core::run_tracker::NormRunInfo;
use crate::core::types::ErrorCategory;
use crate::utils::serialization::atomic_write;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const LOOKUP_INSTRUCTIONS: &str = "This file lists all LOOKUP: placeholders in the generated YAML. \
Each placeholder represents a resource that must exist in the target account. \
To resolve: 1) Create the resource in target if it doesn't exist, \
2) Note its ID or key, 3) Update the YAML to reference it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Yaml,
    Lookups,
    Exclusions,
    DiffJson,
}

impl ArtifactKind {
    /// Label used inside artifact file names.
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Yaml => "yaml",
            ArtifactKind::Lookups => "lookups",
            ArtifactKind::Exclusions => "exclusions",
            ArtifactKind::DiffJson => "diff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Yaml => "yml",
            ArtifactKind::Lookups | ArtifactKind::DiffJson => "json",
            ArtifactKind::Exclusions => "md",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `account_<id>_norm_<NNN>__<kind>__<timestamp>.<ext>`
pub fn artifact_file_name(kind: ArtifactKind, run: &NormRunInfo) -> String {
    format!(
        "account_{}_norm_{:03}__{}__{}.{}",
        run.account_id,
        run.norm_run_id,
        kind.label(),
        run.timestamp,
        kind.extension()
    )
}

fn human_time(run: &NormRunInfo) -> String {
    run.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn iso_time(run: &NormRunInfo) -> String {
    run.started_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `environment_variable` -> `Environment Variable`
fn title_case(value: &str) -> String {
    value
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn serialization_error(kind: ArtifactKind, err: impl fmt::Display) -> AppError {
    AppError::new(
        ErrorCategory::SerializationError,
        format!("Failed to render {} artifact: {}", kind, err),
    )
    .with_code("WRITE-001")
}

/// Renders artifacts from a finished run. Holds the context read-only.
pub struct ArtifactWriter<'a> {
    policy: &'a MappingConfig,
    context: &'a NormalizationContext,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(policy: &'a MappingConfig, context: &'a NormalizationContext) -> Self {
        ArtifactWriter { policy, context }
    }

    /// Write every enabled artifact into `output_dir`.
    pub fn write_all_artifacts(
        &self,
        document: &NormalizedDocument,
        output_dir: &Path,
        run: &NormRunInfo,
    ) -> Result<BTreeMap<ArtifactKind, PathBuf>, AppError> {
        let mut rendered = vec![(ArtifactKind::Yaml, self.render_yaml(document, run)?)];
        if self.policy.generate_lookups_manifest() {
            rendered.push((ArtifactKind::Lookups, self.render_lookups_manifest(run)?));
        }
        if self.policy.generate_exclusions_report() {
            rendered.push((ArtifactKind::Exclusions, self.render_exclusions_report(run)));
        }
        if self.policy.generate_diff_json() {
            rendered.push((ArtifactKind::DiffJson, self.render_diff_json(document, run)?));
        }

        let mut written = BTreeMap::new();
        for (kind, content) in rendered {
            let path = output_dir.join(artifact_file_name(kind, run));
            atomic_write(&path, content.as_bytes()).map_err(|err| {
                AppError::new(ErrorCategory::IoError, err.to_string()).with_code("WRITE-002")
            })?;
            tracing::info!(artifact = %kind, path = %path.display(), "wrote artifact");
            written.insert(kind, path);
        }
        Ok(written)
    }

    /// Commented header followed by the YAML document.
    pub fn render_yaml(&self, document: &NormalizedDocument, run: &NormRunInfo) -> Result<String, AppError> {
        let rendered = if self.policy.sort_keys() {
            // serde_json maps are ordered by key
            let value = serde_json::to_value(document)
                .map_err(|e| serialization_error(ArtifactKind::Yaml, e))?;
            serde_yaml::to_string(&value)
        } else {
            serde_yaml::to_string(document)
        };
        let body = rendered.map_err(|e| serialization_error(ArtifactKind::Yaml, e))?;

        let mut out = String::new();
        out.push_str("# dbt Cloud Configuration (v2 Schema)\n");
        out.push_str(&format!("# Generated: {}\n", human_time(run)));
        out.push_str(&format!("# Normalization Run: {:03}\n", run.norm_run_id));
        out.push_str(&format!("# Source Account: {}\n", run.account_id));
        out.push('\n');
        out.push_str(&body);
        Ok(out)
    }

    pub fn render_lookups_manifest(&self, run: &NormRunInfo) -> Result<String, AppError> {
        let manifest = json!({
            "_metadata": {
                "generated_at": iso_time(run),
                "run_id": run.norm_run_id,
                "account_id": run.account_id,
                "total_placeholders": self.context.placeholders().len(),
            },
            "placeholders": self.context.placeholders(),
            "instructions": LOOKUP_INSTRUCTIONS,
        });
        serde_json::to_string_pretty(&manifest)
            .map_err(|e| serialization_error(ArtifactKind::Lookups, e))
    }

    pub fn render_exclusions_report(&self, run: &NormRunInfo) -> String {
        let exclusions = self.context.exclusions();
        let mut lines = vec![
            "# Normalization Exclusions Report".to_string(),
            String::new(),
            format!("**Generated:** {}", human_time(run)),
            format!("**Normalization Run:** {:03}", run.norm_run_id),
            format!("**Source Account:** {}", run.account_id),
            String::new(),
            "## Summary".to_string(),
            String::new(),
            format!("**Total Exclusions:** {}", exclusions.len()),
            String::new(),
        ];

        if exclusions.is_empty() {
            lines.push("*No resources were excluded during normalization.*".to_string());
            return lines.join("\n");
        }

        let mut by_type: BTreeMap<&str, Vec<&Exclusion>> = BTreeMap::new();
        let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
        for exclusion in exclusions {
            by_type
                .entry(exclusion.resource_type.singular())
                .or_default()
                .push(exclusion);
            *by_reason.entry(exclusion.reason.as_str()).or_default() += 1;
        }

        lines.push("### By Resource Type".to_string());
        lines.push(String::new());
        for (resource_type, entries) in &by_type {
            lines.push(format!("- **{}:** {}", resource_type, entries.len()));
        }

        lines.push(String::new());
        lines.push("### By Reason".to_string());
        lines.push(String::new());
        let mut reasons: Vec<_> = by_reason.into_iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (reason, count) in reasons {
            lines.push(format!("- **{}:** {}", reason, count));
        }

        lines.extend(
            ["", "---", "", "## Detailed Exclusions", ""]
                .iter()
                .map(|s| s.to_string()),
        );
        for (resource_type, entries) in &by_type {
            lines.push(format!("### {}", title_case(resource_type)));
            lines.push(String::new());
            lines.push("| Key | Element Mapping ID | Reason |".to_string());
            lines.push("|-----|-------------------|--------|".to_string());
            for exclusion in entries {
                lines.push(format!(
                    "| `{}` | `{}` | {} |",
                    exclusion.key,
                    exclusion.element_mapping_id.as_deref().unwrap_or("N/A"),
                    exclusion.reason
                ));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Key-sorted JSON for diffing runs against each other.
    pub fn render_diff_json(&self, document: &NormalizedDocument, run: &NormRunInfo) -> Result<String, AppError> {
        let diff = json!({
            "_metadata": {
                "generated_at": iso_time(run),
                "run_id": run.norm_run_id,
                "account_id": run.account_id,
                "purpose": "Diff-friendly JSON for regression testing normalized YAML output",
            },
            "normalized": document,
        });
        serde_json::to_string_pretty(&diff).map_err(|e| serialization_error(ArtifactKind::DiffJson, e))
    }
}
