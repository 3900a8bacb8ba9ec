use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Account snapshot JSON produced by the fetcher
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Mapping configuration (YAML); built-in defaults when omitted
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override output.output_directory from the mapping configuration
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Fetch run this snapshot came from, recorded with the normalization run
    #[arg(long, value_name = "N")]
    pub fetch_run_id: Option<u32>,

    /// Normalize and print the summary without writing artifacts
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Snapshots to normalize; each gets its own independent run
    #[arg(value_name = "SNAPSHOT", required = true, num_args = 1..)]
    pub snapshots: Vec<PathBuf>,

    /// Mapping configuration shared by every run
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override output.output_directory from the mapping configuration
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Normalize and print summaries without writing artifacts
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Mapping configuration (YAML) to validate
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}
