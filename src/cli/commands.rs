use crate::cli::args::{BatchArgs, CheckConfigArgs, NormalizeArgs};
use crate::core::config::{ConfigLoader, MappingConfig};
use crate::core::error::AppError;
use crate::core::pipeline::{run_normalization, NormalizationOutcome, RunSummary};
use crate::core::run_tracker::NormalizationRunTracker;
use crate::core::snapshot::AccountSnapshot;
use crate::core::writer::{ArtifactKind, ArtifactWriter};
use crate::Result;
use anyhow::anyhow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

fn resolve_output_dir(policy: &MappingConfig, override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| policy.output_directory().to_path_buf())
}

fn load_and_normalize(
    path: &Path,
    policy: &MappingConfig,
) -> std::result::Result<(i64, NormalizationOutcome), AppError> {
    let snapshot = AccountSnapshot::load(path).map_err(AppError::from)?;
    let outcome = run_normalization(&snapshot, policy)?;
    Ok((snapshot.account_id, outcome))
}

/// Allocate a run id and write every enabled artifact for it.
fn persist_run(
    policy: &MappingConfig,
    outcome: &NormalizationOutcome,
    output_dir: &Path,
    account_id: i64,
    fetch_run_id: Option<u32>,
) -> std::result::Result<BTreeMap<ArtifactKind, PathBuf>, AppError> {
    let tracker = NormalizationRunTracker::in_directory(output_dir);
    let run = tracker.start_run(account_id, fetch_run_id)?;
    ArtifactWriter::new(policy, &outcome.context).write_all_artifacts(
        &outcome.document,
        output_dir,
        &run,
    )
}

fn print_summary(source: &Path, summary: &RunSummary, written: &BTreeMap<ArtifactKind, PathBuf>) {
    println!(
        "Normalized account {} from {}",
        summary.account_id,
        source.display()
    );
    println!("  Projects:     {}", summary.projects);
    println!("  Placeholders: {}", summary.placeholders);
    println!("  Exclusions:   {}", summary.exclusions);
    println!("  Collisions:   {}", summary.collisions.len());
    for collision in &summary.collisions {
        println!(
            "    {}/{} x{}",
            collision.namespace, collision.base_key, collision.occurrences
        );
    }
    if written.is_empty() {
        println!("  Dry run: no artifacts written");
    }
    for (kind, path) in written {
        println!("  Wrote {}: {}", kind, path.display());
    }
    if summary.placeholders > 0 {
        println!("  LOOKUP placeholders need manual resolution before import");
    }
}

pub async fn normalize(args: NormalizeArgs) -> Result<()> {
    let policy = ConfigLoader::load(args.config.as_deref())?;
    let output_dir = resolve_output_dir(&policy, args.output_dir.clone());
    tracing::info!(snapshot = %args.snapshot.display(), "normalize command");

    let (account_id, outcome) = load_and_normalize(&args.snapshot, &policy)?;
    let written = if args.dry_run {
        BTreeMap::new()
    } else {
        persist_run(&policy, &outcome, &output_dir, account_id, args.fetch_run_id)?
    };

    print_summary(&args.snapshot, &outcome.summary(account_id), &written);
    Ok(())
}

/// Normalize every snapshot on the blocking pool. Each run owns its own
/// policy clone and context; run ids and artifacts are allocated
/// afterwards, one run at a time, in argument order.
pub async fn batch(args: BatchArgs) -> Result<()> {
    let policy = ConfigLoader::load(args.config.as_deref())?;
    let output_dir = resolve_output_dir(&policy, args.output_dir.clone());
    let total = args.snapshots.len();
    tracing::info!(snapshots = total, "batch command");

    let mut tasks = JoinSet::new();
    for (index, path) in args.snapshots.iter().cloned().enumerate() {
        let policy = policy.clone();
        tasks.spawn_blocking(move || {
            let result = load_and_normalize(&path, &policy);
            (index, path, result)
        });
    }

    let mut finished = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let item = joined.map_err(|err| anyhow!("normalization task failed: {}", err))?;
        finished.push(item);
    }
    finished.sort_by_key(|(index, _, _)| *index);

    let mut failures = 0usize;
    for (_, path, result) in finished {
        let outcome = result.and_then(|(account_id, outcome)| {
            let written = if args.dry_run {
                BTreeMap::new()
            } else {
                persist_run(&policy, &outcome, &output_dir, account_id, None)?
            };
            Ok((outcome.summary(account_id), written))
        });
        match outcome {
            Ok((summary, written)) => print_summary(&path, &summary, &written),
            Err(err) => {
                failures += 1;
                tracing::error!(snapshot = %path.display(), code = %err.code, "{}", err.message);
                eprintln!("Failed to normalize {}: {}", path.display(), err);
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} snapshots failed to normalize", failures, total));
    }
    Ok(())
}

pub async fn check_config(args: CheckConfigArgs) -> Result<()> {
    let policy = ConfigLoader::load(Some(&args.file))?;
    println!("Configuration valid: {}", args.file.display());
    print!("{}", serde_yaml::to_string(&policy)?);
    Ok(())
}
