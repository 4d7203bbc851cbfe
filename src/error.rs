//! Run-fatal error type
//!
//! Only conditions that abort the whole run before (or instead of) processing
//! live here. Per-file failures are not errors; they are `OutcomeKind`
//! variants so a single bad file can never take the batch down.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("required tool `{}` not found on PATH or in {}", .tool, .searched.display())]
    ToolMissing {
        tool: &'static str,
        searched: PathBuf,
    },

    #[error("source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to prepare {}: {}", .path.display(), .source)]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
