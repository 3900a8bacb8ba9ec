pub mod args;
pub mod commands;

pub use args::{BatchArgs, CheckConfigArgs, NormalizeArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "account-normalizer")]
#[command(version = crate::VERSION)]
#[command(about = "Normalize account configuration snapshots into the v2 schema")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: check the mapping config, normalize a snapshot, then resolve the LOOKUP placeholders listed in the lookups manifest."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Normalize one account snapshot",
        long_about = "Normalize applies the mapping policy to a snapshot, writes the normalized YAML plus lookups, exclusions and diff artifacts, and prints a run summary.",
        after_help = "Example:\n    account-normalizer normalize snapshot.json --config importer_mapping.yml"
    )]
    Normalize(NormalizeArgs),
    #[command(
        about = "Normalize several snapshots concurrently",
        long_about = "Batch runs one independent normalization per snapshot. Runs share the mapping policy but nothing else.",
        after_help = "Example:\n    account-normalizer batch acct_1.json acct_2.json --output-dir out"
    )]
    Batch(BatchArgs),
    #[command(
        about = "Validate a mapping configuration",
        long_about = "Check-config loads and validates a mapping configuration, applies environment overrides, and prints the effective policy.",
        after_help = "Example:\n    account-normalizer check-config importer_mapping.yml"
    )]
    CheckConfig(CheckConfigArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Normalize(normalize_args) => commands::normalize(normalize_args).await,
        Command::Batch(batch_args) => commands::batch(batch_args).await,
        Command::CheckConfig(check_args) => commands::check_config(check_args).await,
    }
}
