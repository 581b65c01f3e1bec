//! Errors raised while discovering fragments or syncing the generated file.

use std::path::PathBuf;

/// Errors that can occur while aggregating style imports.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Managed style region is missing its closing marker")]
    UnterminatedRegion,

    #[error("Invalid import pattern: {0}")]
    Pattern(#[from] regex::Error),
}
