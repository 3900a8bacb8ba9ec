use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A single command driven from a terminal.
    Interactive,
    /// Multi-snapshot runs that should be quiet on the console.
    Batch,
}

impl ExecutionContext {
    /// Returns `true` when console sinks should be disabled.
    pub fn disables_console(self) -> bool {
        matches!(self, ExecutionContext::Batch)
    }
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if batch_override_enabled() {
        return ExecutionContext::Batch;
    }

    match command {
        Command::Batch(_) => ExecutionContext::Batch,
        Command::Normalize(_) | Command::CheckConfig(_) => ExecutionContext::Interactive,
    }
}

fn batch_override_enabled() -> bool {
    env::var("ACCOUNT_NORMALIZER_BATCH")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
