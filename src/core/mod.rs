pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod run_tracker;
pub mod snapshot;
pub mod types;
pub mod writer;

pub use config::{ConfigLoader, MappingConfig};
pub use context::{Exclusion, ExclusionReason, NormalizationContext, Placeholder};
pub use document::NormalizedDocument;
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use pipeline::{normalize_snapshot, run_normalization, NormalizationOutcome, PipelinePhase};
pub use run_tracker::{NormRunInfo, NormalizationRunTracker};
pub use snapshot::{AccountSnapshot, Identifiable, Includable};
pub use types::*;
pub use writer::{ArtifactKind, ArtifactWriter};
