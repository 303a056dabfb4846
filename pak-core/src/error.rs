use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PakError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported container data. Always fatal for the
    /// container being parsed or extracted; never retried.
    #[error("Format error: {0}")]
    Format(String),

    /// The cooperative abort flag was observed. Reported as a distinct
    /// aborted outcome, not as a failure.
    #[error("operation aborted")]
    Cancelled,

    /// Raised before any byte is written when the destination cannot hold
    /// the selection plus the safety margin.
    #[error("insufficient disk space: need at least {required} free bytes")]
    InsufficientSpace { required: u64 },

    /// One or more requested paths are not present in any loaded container.
    /// All offenders are reported at once.
    #[error("unknown packed file paths: {}", format_paths(.0))]
    UnknownPaths(Vec<PathBuf>),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, PakError>;
